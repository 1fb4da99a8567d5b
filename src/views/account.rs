//! Sign in, registration and sign out.

use log::info;

use crate::api::ForumApi;
use crate::models::User;
use crate::ui::{Confirm, Notifier};
use crate::validation::{FieldError, UniqueNameCheck};
use crate::views::{ViewContext, ViewResult, GENERIC_ERROR};

pub struct AccountView<A: ForumApi, N: Notifier, C: Confirm> {
    ctx: ViewContext<A, N, C>,
}

impl<A: ForumApi, N: Notifier, C: Confirm> AccountView<A, N, C> {
    pub fn new(ctx: ViewContext<A, N, C>) -> Self {
        Self { ctx }
    }

    /// Currently signed-in user.
    pub fn whoami(&self) -> Option<User> {
        self.ctx.state.connected_user()
    }

    /// Exchange credentials for a user record and remember it.
    pub async fn login(&self, username: &str, password: &str) -> ViewResult<User> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(FieldError::Required.into());
        }
        let user = match self
            .ctx
            .api
            .login(&User::with_password(username, password))
            .await
        {
            Ok(user) => user,
            Err(e) => {
                self.ctx.error("Sign in failed");
                return Err(e.into());
            }
        };
        self.ctx.state.sign_in(user.clone())?;
        self.ctx.info(&format!("Welcome, {}", user.username));
        Ok(user.without_password())
    }

    /// Create an account. The name is validated locally and checked for uniqueness first.
    pub async fn register(&self, username: &str, password: &str) -> ViewResult<User> {
        self.ctx.rules.validate_username(username)?;
        if password.is_empty() {
            return Err(FieldError::Required.into());
        }
        let mut check = UniqueNameCheck::new(self.ctx.api.clone(), self.ctx.name_check_debounce);
        check.check(username, None).await.as_field_result()?;

        match self
            .ctx
            .api
            .create_user(&User::with_password(username, password))
            .await
        {
            Ok(user) => {
                info!("Registered user {}", user.username);
                self.ctx.info("Your account has been created");
                Ok(user.without_password())
            }
            Err(e) => {
                self.ctx.error(GENERIC_ERROR);
                Err(e.into())
            }
        }
    }

    pub fn logout(&self) -> ViewResult<()> {
        self.ctx.state.sign_out()?;
        Ok(())
    }
}
