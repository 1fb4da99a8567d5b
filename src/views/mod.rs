//! # View controllers
//!
//! Each controller binds one screen's actions to the backend and the shared state:
//!
//! - [`topic`] - read a topic, post/edit/delete messages, background refresh
//! - [`users`] - administrator user management (filter, edit, delete)
//! - [`account`] - sign in, register, sign out
//!
//! Controllers report every failed remote call twice: as an error notice through the
//! [`Notifier`](crate::ui::Notifier), and as an `Err` to the caller.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiError, ForumApi};
use crate::config::Config;
use crate::session::SessionError;
use crate::state::AppState;
use crate::ui::{Confirm, Notice, Notifier};
use crate::validation::{FieldError, FormRules};

pub mod account;
pub mod topic;
pub mod users;

pub use account::AccountView;
pub use topic::{RenderedMessage, SubmitOutcome, TopicView, TopicWatch};
pub use users::{ManageUsersView, UserForm};

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Invalid(#[from] FieldError),

    #[error("you must be signed in to do that")]
    NotSignedIn,

    #[error("you are not allowed to do that")]
    Forbidden,

    #[error("no topic is open")]
    NoTopic,

    #[error("message {0} is not part of this topic")]
    UnknownMessage(i64),

    #[error("user {0} is not in the list")]
    UnknownUser(i64),

    #[error("no user is selected")]
    NothingSelected,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type ViewResult<T> = std::result::Result<T, ViewError>;

/// Everything a controller needs from its surroundings.
pub struct ViewContext<A: ForumApi, N: Notifier, C: Confirm> {
    pub api: Arc<A>,
    pub state: Arc<AppState>,
    pub notifier: N,
    pub confirm: C,
    pub rules: FormRules,
    pub notice_duration: Duration,
    pub name_check_debounce: Duration,
}

impl<A: ForumApi, N: Notifier, C: Confirm> ViewContext<A, N, C> {
    pub fn new(api: Arc<A>, state: Arc<AppState>, notifier: N, confirm: C) -> Self {
        let defaults = Config::default();
        Self {
            api,
            state,
            notifier,
            confirm,
            rules: FormRules::from(&defaults.validation),
            notice_duration: defaults.notifications.duration(),
            name_check_debounce: defaults.validation.unique_name_debounce(),
        }
    }

    /// Take limits and timings from a loaded configuration.
    pub fn configured(mut self, config: &Config) -> Self {
        self.rules = FormRules::from(&config.validation);
        self.notice_duration = config.notifications.duration();
        self.name_check_debounce = config.validation.unique_name_debounce();
        self
    }

    pub(crate) fn info(&self, text: &str) {
        self.notifier
            .notify(&Notice::info(text, self.notice_duration));
    }

    pub(crate) fn error(&self, text: &str) {
        self.notifier
            .notify(&Notice::error(text, self.notice_duration));
    }
}

pub(crate) const GENERIC_ERROR: &str = "An error occurred";
pub(crate) const INPUT_ERROR: &str = "An error occurred. Please check your input";
