//! Shared application state.
//!
//! [`AppState`] owns the two values several views care about: who is signed in, and the
//! most recently fetched user list. It is created once by the caller and handed to views
//! by reference (usually an `Arc`). Views that need to react to changes take a
//! [`Subscription`]; dropping it is all the cleanup there is.

use log::{info, warn};
use tokio::sync::watch;

use crate::models::User;
use crate::session::{SessionError, SessionStore};

/// Scoped view onto one observable value.
///
/// The subscription is released when this handle is dropped, whichever way the owner
/// goes out of scope.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Latest published value; marks it as seen.
    pub fn current(&mut self) -> T {
        self.rx.borrow_and_update().clone()
    }

    /// True if a value was published since the last [`current`](Self::current) or
    /// [`changed`](Self::changed).
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next publish and return it. `None` once the state is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

pub struct AppState {
    store: SessionStore,
    connected_user: watch::Sender<Option<User>>,
    users: watch::Sender<Vec<User>>,
}

impl AppState {
    /// State with nobody signed in. Call [`restore`](Self::restore) to pick up a saved session.
    pub fn new(store: SessionStore) -> Self {
        let (connected_user, _) = watch::channel(None);
        let (users, _) = watch::channel(Vec::new());
        Self {
            store,
            connected_user,
            users,
        }
    }

    /// Load the remembered user from the session store and publish it.
    ///
    /// A corrupt session file is logged and treated as signed out.
    pub fn restore(&self) -> Option<User> {
        let user = match self.store.load() {
            Ok(user) => user,
            Err(e) => {
                warn!("Ignoring session file {}: {}", self.store.path().display(), e);
                None
            }
        };
        self.connected_user.send_replace(user.clone());
        user
    }

    pub fn sign_in(&self, user: User) -> Result<(), SessionError> {
        let user = user.without_password();
        self.store.save(&user)?;
        info!("Signed in as {}", user.username);
        self.connected_user.send_replace(Some(user));
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), SessionError> {
        self.store.clear()?;
        if let Some(previous) = self.connected_user.send_replace(None) {
            info!("Signed out {}", previous.username);
        }
        Ok(())
    }

    pub fn connected_user(&self) -> Option<User> {
        self.connected_user.borrow().clone()
    }

    pub fn is_admin(&self) -> bool {
        self.connected_user
            .borrow()
            .as_ref()
            .map(|u| u.admin)
            .unwrap_or(false)
    }

    pub fn users(&self) -> Vec<User> {
        self.users.borrow().clone()
    }

    pub fn set_users(&self, users: Vec<User>) {
        self.users.send_replace(users);
    }

    /// Replace the entry with the same id. Returns false when no entry matched.
    pub fn replace_user(&self, user: User) -> bool {
        let id = user.id;
        self.users.send_if_modified(|users| {
            match users.iter_mut().find(|u| u.id.is_some() && u.id == id) {
                Some(slot) => {
                    *slot = user;
                    true
                }
                None => false,
            }
        })
    }

    /// Drop the entry with `id`. Returns false when no entry matched.
    pub fn remove_user(&self, id: i64) -> bool {
        self.users.send_if_modified(|users| {
            let before = users.len();
            users.retain(|u| u.id != Some(id));
            users.len() != before
        })
    }

    pub fn subscribe_connected_user(&self) -> Subscription<Option<User>> {
        Subscription {
            rx: self.connected_user.subscribe(),
        }
    }

    pub fn subscribe_users(&self) -> Subscription<Vec<User>> {
        Subscription {
            rx: self.users.subscribe(),
        }
    }

    /// Live subscriptions across both values.
    pub fn subscriber_count(&self) -> usize {
        self.connected_user.receiver_count() + self.users.receiver_count()
    }
}
