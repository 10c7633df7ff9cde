//! Registry actor - owns the online map and processes commands.
//!
//! The actor is the single owner of the name → session map. It receives
//! commands via an mpsc channel and processes them sequentially, which is
//! what makes the registry's high-level operations atomic: between two
//! commands there is no intermediate state for anyone to observe.

use std::collections::HashMap;

use relay_core::{DomainError, DomainResult, UserName};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::session::SessionHandle;

use super::commands::RegistryCommand;

/// The registry actor - owns all online-user state.
///
/// # Thread Safety
///
/// The actor runs in a single task and processes commands sequentially.
/// All state mutations happen within this single task.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Online users: display name → session. Keys are unique; a collision
    /// is rejected, never overwritten.
    online: HashMap<UserName, SessionHandle>,
}

impl RegistryActor {
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>) -> Self {
        Self {
            receiver,
            online: HashMap::new(),
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    pub async fn run(mut self) {
        info!("registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(online = self.online.len(), "registry actor stopped");
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Add {
                name,
                session,
                respond_to,
            } => {
                let result = self.handle_add(name, session);
                // Ignore send error - caller may have dropped the receiver
                let _ = respond_to.send(result);
            }
            RegistryCommand::Remove { name, respond_to } => {
                self.handle_remove(&name);
                let _ = respond_to.send(());
            }
            RegistryCommand::Rename {
                old,
                new,
                respond_to,
            } => {
                let result = self.handle_rename(old, new);
                let _ = respond_to.send(result);
            }
            RegistryCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.handle_snapshot());
            }
            RegistryCommand::Lookup { name, respond_to } => {
                let _ = respond_to.send(self.online.get(&name).cloned());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Inserts `name` only if absent.
    fn handle_add(&mut self, name: UserName, session: SessionHandle) -> DomainResult<()> {
        if self.online.contains_key(&name) {
            debug!(name = %name, "add rejected: name already online");
            return Err(DomainError::NameTaken { name });
        }

        info!(
            name = %name,
            addr = %session.addr(),
            online = self.online.len() + 1,
            "user online"
        );
        self.online.insert(name, session);
        Ok(())
    }

    /// Removes `name`; absent names are a no-op.
    fn handle_remove(&mut self, name: &UserName) {
        if self.online.remove(name).is_some() {
            info!(name = %name, online = self.online.len(), "user offline");
        } else {
            debug!(name = %name, "remove for absent name ignored");
        }
    }

    /// Moves the session under `old` to `new`.
    ///
    /// Ordering: availability of `new` is checked first, then the swap.
    /// The check runs against the live map, so a session renaming to the
    /// name it currently holds sees that name occupied and gets a conflict.
    fn handle_rename(&mut self, old: UserName, new: UserName) -> DomainResult<()> {
        if self.online.contains_key(&new) {
            debug!(old = %old, new = %new, "rename rejected: name taken");
            return Err(DomainError::NameTaken { name: new });
        }

        let Some(session) = self.online.remove(&old) else {
            debug!(old = %old, "rename rejected: old name not online");
            return Err(DomainError::UserNotFound { name: old });
        };

        info!(old = %old, new = %new, "user renamed");
        self.online.insert(new, session);
        Ok(())
    }

    /// Defensive copy of the online map.
    fn handle_snapshot(&self) -> Vec<(UserName, SessionHandle)> {
        self.online
            .iter()
            .map(|(name, session)| (name.clone(), session.clone()))
            .collect()
    }
}
