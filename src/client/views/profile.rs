use crate::client::models::app_state::Route;
use crate::client::models::ui_state::UiState;
use crate::client::services::session::MIN_PASSWORD_LEN;
use crate::client::views::ViewContext;
use crate::common::error::FormError;
use crate::common::models::{UserPatch, UserSummary};

/// Profile page: name/email edits and an optional password change.
pub struct ProfileForm {
    ctx: ViewContext,
    pub name: String,
    pub email: String,
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
    pub ui: UiState,
}

impl ProfileForm {
    pub fn new(ctx: ViewContext) -> Self {
        let user = ctx.store().handle().user();
        Self {
            name: user.as_ref().map(|u| u.name.clone()).unwrap_or_default(),
            email: user.as_ref().map(|u| u.email.clone()).unwrap_or_default(),
            ctx,
            current_password: String::new(),
            new_password: String::new(),
            confirm_password: String::new(),
            ui: UiState::default(),
        }
    }

    /// Only the fields that differ from the cached identity end up in the patch.
    pub fn patch(&self, current: &UserSummary) -> Result<UserPatch, FormError> {
        let mut patch = UserPatch::default();
        let name = self.name.trim();
        let email = self.email.trim();
        if name.is_empty() {
            return Err(FormError::MissingField("name"));
        }
        if !email.contains('@') {
            return Err(FormError::Invalid("a valid email is required".into()));
        }
        if name != current.name {
            patch.name = Some(name.to_string());
        }
        if email != current.email {
            patch.email = Some(email.to_string());
        }
        if !self.new_password.is_empty() || !self.confirm_password.is_empty() {
            if self.new_password != self.confirm_password {
                return Err(FormError::PasswordMismatch);
            }
            if self.new_password.len() < MIN_PASSWORD_LEN {
                return Err(FormError::Invalid(format!(
                    "password must be at least {} characters",
                    MIN_PASSWORD_LEN
                )));
            }
            if self.current_password.is_empty() {
                return Err(FormError::MissingField("current password"));
            }
            patch.current_password = Some(self.current_password.clone());
            patch.new_password = Some(self.new_password.clone());
        }
        Ok(patch)
    }

    /// Pushes the changes and replaces the session's user snapshot with the server echo.
    pub async fn submit(&mut self) -> Result<UserSummary, FormError> {
        let session = self.ctx.require(&Route::Profile)?;
        let Some(current) = session.user else {
            return Err(FormError::NotPermitted(Route::Login));
        };
        let patch = match self.patch(&current) {
            Ok(p) => p,
            Err(e) => {
                self.ui.fail(e.to_string());
                return Err(e);
            }
        };
        if patch == UserPatch::default() {
            self.ui.succeed("Nothing to update");
            return Ok(current);
        }
        self.ui.start();
        let generation = self.ctx.generation();
        match self.ctx.users().update(current.id, &patch).await {
            Ok(record) => {
                let summary = record.summary();
                self.ctx.store().replace_user(summary.clone());
                self.current_password.clear();
                self.new_password.clear();
                self.confirm_password.clear();
                self.ui.succeed("Profile updated successfully");
                Ok(summary)
            }
            Err(e) => {
                self.ui.fail("Failed to update profile");
                Err(self.ctx.fail(e, generation))
            }
        }
    }
}
