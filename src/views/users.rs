//! User management screen (administrators only).

use log::{debug, info};

use crate::api::ForumApi;
use crate::models::{User, UserUpdate};
use crate::state::Subscription;
use crate::ui::{Confirm, ConfirmPrompt, Notifier};
use crate::validation::{NameCheck, UniqueNameCheck};
use crate::views::{ViewContext, ViewError, ViewResult, GENERIC_ERROR};

/// Values of the edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserForm {
    pub username: String,
    pub is_admin: bool,
}

impl From<&User> for UserForm {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            is_admin: user.admin,
        }
    }
}

pub struct ManageUsersView<A: ForumApi, N: Notifier, C: Confirm> {
    ctx: ViewContext<A, N, C>,
    users: Subscription<Vec<User>>,
    filter: String,
    selected: Option<i64>,
    name_check: UniqueNameCheck<A>,
}

impl<A: ForumApi, N: Notifier, C: Confirm> ManageUsersView<A, N, C> {
    pub fn new(ctx: ViewContext<A, N, C>) -> Self {
        let users = ctx.state.subscribe_users();
        let name_check = UniqueNameCheck::new(ctx.api.clone(), ctx.name_check_debounce);
        Self {
            ctx,
            users,
            filter: String::new(),
            selected: None,
            name_check,
        }
    }

    /// Fetch the user list and publish it to every subscriber.
    pub async fn load(&mut self) -> ViewResult<usize> {
        match self.ctx.api.list_users().await {
            Ok(users) => {
                let count = users.len();
                debug!("Loaded {} users", count);
                self.ctx.state.set_users(users);
                Ok(count)
            }
            Err(e) => {
                self.ctx.error(GENERIC_ERROR);
                Err(e.into())
            }
        }
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.to_string();
    }

    /// Users whose name contains the filter text (case-sensitive); all when empty.
    pub fn filtered(&mut self) -> Vec<User> {
        let users = self.users.current();
        if self.filter.is_empty() {
            return users;
        }
        users
            .into_iter()
            .filter(|u| u.username.contains(self.filter.as_str()))
            .collect()
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    /// Toggle selection of user `id`, returning the form prefill when selected.
    pub fn select_user(&mut self, id: i64) -> ViewResult<Option<UserForm>> {
        if self.selected == Some(id) {
            self.selected = None;
            return Ok(None);
        }
        let user = self.find_user(id)?;
        self.selected = Some(id);
        Ok(Some(UserForm::from(&user)))
    }

    /// Start (debounced) checking whether `candidate` is free for the selected user.
    pub fn request_name_check(&mut self, candidate: &str) {
        let current = self
            .selected
            .and_then(|id| self.find_user(id).ok())
            .map(|u| u.username);
        self.name_check.request(candidate, current.as_deref());
    }

    /// Outcome of the latest name check, waiting for it to settle.
    pub async fn name_check(&mut self) -> NameCheck {
        self.name_check.wait().await
    }

    /// Save the form for the selected user.
    pub async fn edit_user(&mut self, form: &UserForm) -> ViewResult<User> {
        let actor = self.require_admin()?;
        let id = self.selected.ok_or(ViewError::NothingSelected)?;
        let target = self.find_user(id)?;

        self.ctx.rules.validate_username(&form.username)?;
        self.name_check
            .check(&form.username, Some(target.username.as_str()))
            .await
            .as_field_result()?;

        let update = UserUpdate::for_user(&target, Some(form.username.clone()), Some(form.is_admin))
            .acting_as(&actor);
        if let Err(e) = self.ctx.api.update_user(id, &update).await {
            self.ctx.error(GENERIC_ERROR);
            return Err(e.into());
        }

        let updated = update.apply_to(&target);
        self.ctx.state.replace_user(updated.clone());
        if actor.id == updated.id {
            // Keep the remembered session in step with our own record.
            self.ctx.state.sign_in(updated.clone())?;
        }
        self.selected = None;
        info!("User {} updated by {}", updated.username, actor.username);
        self.ctx.info("This user has been updated");
        Ok(updated)
    }

    /// Delete user `id` after confirmation. `Ok(false)` means the admin declined.
    pub async fn delete_user(&mut self, id: i64) -> ViewResult<bool> {
        let actor = self.require_admin()?;
        let target = self.find_user(id)?;
        if !self
            .ctx
            .confirm
            .confirm(&ConfirmPrompt::delete("user"))
            .await
        {
            return Ok(false);
        }
        if let Err(e) = self.ctx.api.delete_user(id).await {
            self.ctx.error(GENERIC_ERROR);
            return Err(e.into());
        }
        self.ctx.state.remove_user(id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        info!("User {} deleted by {}", target.username, actor.username);
        self.ctx.info("This user has been deleted");
        Ok(true)
    }

    fn require_admin(&self) -> ViewResult<User> {
        let user = self
            .ctx
            .state
            .connected_user()
            .ok_or(ViewError::NotSignedIn)?;
        if !user.admin {
            return Err(ViewError::Forbidden);
        }
        Ok(user)
    }

    fn find_user(&self, id: i64) -> ViewResult<User> {
        self.ctx
            .state
            .users()
            .into_iter()
            .find(|u| u.id == Some(id))
            .ok_or(ViewError::UnknownUser(id))
    }
}
