//! Debounced "is this username taken" lookup.
//!
//! Every call to [`UniqueNameCheck::request`] supersedes the previous one: the older task
//! is aborted, and a generation counter guards the publish so a response that was already
//! on its way can never overwrite a newer answer. The lookup itself only starts after the
//! debounce delay, so a burst of keystrokes costs one request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::ForumApi;
use crate::validation::FieldError;

/// Outcome of the latest unique-name request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameCheck {
    /// Nothing requested yet.
    Idle,
    /// Waiting for the debounce delay or the backend.
    Pending(String),
    Available(String),
    Taken(String),
    /// The lookup failed; the name is neither confirmed free nor taken.
    Failed { name: String, reason: String },
}

impl NameCheck {
    pub fn is_settled(&self) -> bool {
        !matches!(self, NameCheck::Pending(_))
    }

    /// Map onto a form error: only `Taken` blocks submission.
    pub fn as_field_result(&self) -> Result<(), FieldError> {
        match self {
            NameCheck::Taken(_) => Err(FieldError::UniqueName),
            _ => Ok(()),
        }
    }
}

pub struct UniqueNameCheck<A: ForumApi> {
    api: Arc<A>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    in_flight: Option<JoinHandle<()>>,
    tx: Arc<watch::Sender<NameCheck>>,
    rx: watch::Receiver<NameCheck>,
}

impl<A: ForumApi> UniqueNameCheck<A> {
    pub fn new(api: Arc<A>, debounce: Duration) -> Self {
        let (tx, rx) = watch::channel(NameCheck::Idle);
        Self {
            api,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: None,
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Start checking `candidate`, cancelling any earlier check.
    ///
    /// `current` is the name the edited record already has; keeping it is always allowed
    /// and answered without a lookup.
    pub fn request(&mut self, candidate: &str, current: Option<&str>) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if current == Some(candidate) {
            self.tx.send_replace(NameCheck::Available(candidate.to_string()));
            return;
        }

        self.tx.send_replace(NameCheck::Pending(candidate.to_string()));

        let api = Arc::clone(&self.api);
        let tx = Arc::clone(&self.tx);
        let latest = Arc::clone(&self.generation);
        let debounce = self.debounce;
        let name = candidate.to_string();
        self.in_flight = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            debug!("Checking username availability: {}", name);
            let outcome = match api.list_users().await {
                Ok(users) => {
                    if users.iter().any(|u| u.username == name) {
                        NameCheck::Taken(name)
                    } else {
                        NameCheck::Available(name)
                    }
                }
                Err(e) => {
                    warn!("Username lookup for {} failed: {}", name, e);
                    NameCheck::Failed {
                        name,
                        reason: e.to_string(),
                    }
                }
            };
            tx.send_if_modified(|slot| {
                if latest.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *slot = outcome;
                true
            });
        }));
    }

    /// Latest state without waiting.
    pub fn status(&self) -> NameCheck {
        self.rx.borrow().clone()
    }

    /// Wait until the latest request settles and return its outcome.
    pub async fn wait(&mut self) -> NameCheck {
        loop {
            let status = self.rx.borrow_and_update().clone();
            if status.is_settled() {
                return status;
            }
            if self.rx.changed().await.is_err() {
                return status;
            }
        }
    }

    /// Convenience: request and wait in one go.
    pub async fn check(&mut self, candidate: &str, current: Option<&str>) -> NameCheck {
        self.request(candidate, current);
        self.wait().await
    }
}

impl<A: ForumApi> Drop for UniqueNameCheck<A> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
