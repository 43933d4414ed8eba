use futures_util::future;

use crate::client::models::app_state::Route;
use crate::client::models::listing::{matches_search, PageView, Pagination};
use crate::client::models::ui_state::UiState;
use crate::client::models::view_state::Loadable;
use crate::client::views::{LoadOutcome, Screen, ViewContext};
use crate::common::error::{ApiError, FormError};
use crate::common::models::{Case, CaseQuery, Role, UserId, UserRecord, UserStatus};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub search: String,
}

impl UserFilter {
    pub fn matches(&self, user: &UserRecord) -> bool {
        if self.role.is_some_and(|r| r != user.role) || self.status.is_some_and(|s| s != user.status) {
            return false;
        }
        let specialization = user.specialization.as_deref().unwrap_or("");
        matches_search(&self.search, &[&user.name, &user.email, specialization])
    }
}

/// Things an admin can do to an account from the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Verify,
    Suspend,
    Activate,
}

impl UserAction {
    pub fn target(&self) -> UserStatus {
        match self {
            UserAction::Verify | UserAction::Activate => UserStatus::Active,
            UserAction::Suspend => UserStatus::Suspended,
        }
    }

    /// Verification is for lawyers awaiting review; activation for suspended accounts.
    pub fn applies_to(&self, user: &UserRecord) -> bool {
        let status_ok = user.status.can_transition_to(self.target());
        match self {
            UserAction::Verify => status_ok && user.role == Role::Lawyer && user.status == UserStatus::Pending,
            UserAction::Activate => status_ok && user.status == UserStatus::Suspended,
            UserAction::Suspend => status_ok,
        }
    }
}

pub struct UsersAdminView {
    ctx: ViewContext,
    users: Loadable<Vec<UserRecord>>,
    pub filter: UserFilter,
    pub pagination: Pagination,
    pub ui: UiState,
}

impl UsersAdminView {
    pub fn new(ctx: ViewContext) -> Self {
        let pagination = Pagination::new(ctx.page_size());
        Self { ctx, users: Loadable::default(), filter: UserFilter::default(), pagination, ui: UiState::default() }
    }

    pub fn render(&self) -> Screen<'_, Vec<UserRecord>> {
        self.ctx.screen(&Route::AdminUsers, &self.users)
    }

    pub async fn load(&mut self) -> LoadOutcome {
        let users = self.ctx.users();
        self.ctx
            .load_into(&Route::AdminUsers, &mut self.users, "users", async move { users.list(None).await })
            .await
    }

    pub fn all(&self) -> &[UserRecord] {
        self.users.value().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn filtered(&self) -> Vec<&UserRecord> {
        self.all().iter().filter(|u| self.filter.matches(u)).collect()
    }

    pub fn set_filter(&mut self, filter: UserFilter) {
        self.filter = filter;
        self.pagination.page = 1;
    }

    pub fn with_page<R>(&self, f: impl FnOnce(PageView<'_, &UserRecord>) -> R) -> R {
        let rows = self.filtered();
        f(self.pagination.slice(&rows))
    }

    pub async fn apply(&mut self, id: UserId, action: UserAction) -> Result<UserRecord, FormError> {
        self.ctx.require(&Route::AdminUsers)?;
        let user = self
            .all()
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| FormError::Invalid(format!("user {} is not in the list", id)))?;
        if !action.applies_to(user) {
            return Err(FormError::Invalid(format!("cannot {:?} a {} account", action, user.status).to_lowercase()));
        }
        self.ui.start();
        let generation = self.ctx.generation();
        let users = self.ctx.users();
        let updated = match action {
            UserAction::Verify => users.verify(id).await,
            UserAction::Suspend => users.suspend(id).await,
            UserAction::Activate => users.transition(id, action.target()).await,
        };
        match updated {
            Ok(updated) => {
                self.ui.succeed(format!("{} is now {}", updated.name, updated.status));
                self.load().await;
                Ok(updated)
            }
            Err(e) => {
                self.ui.fail("Failed to update user status");
                Err(self.ctx.fail(e, generation))
            }
        }
    }

    pub async fn delete(&mut self, id: UserId) -> Result<(), FormError> {
        let session = self.ctx.require(&Route::AdminUsers)?;
        if session.user_id() == Some(id) {
            return Err(FormError::Invalid("admins cannot delete their own account".into()));
        }
        self.ui.start();
        let generation = self.ctx.generation();
        match self.ctx.users().delete(id).await {
            Ok(()) => {
                self.ui.succeed("User deleted");
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.ui.fail("Failed to delete user");
                Err(self.ctx.fail(e, generation))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserDetail {
    pub user: UserRecord,
    pub cases: Vec<Case>,
}

/// `/admin/users/:id`: the account plus the cases it owns (best-effort).
pub struct UserDetailView {
    ctx: ViewContext,
    id: UserId,
    detail: Loadable<UserDetail>,
}

impl UserDetailView {
    pub fn new(ctx: ViewContext, id: UserId) -> Self {
        Self { ctx, id, detail: Loadable::default() }
    }

    pub fn render(&self) -> Screen<'_, UserDetail> {
        self.ctx.screen(&Route::AdminUserDetail(self.id), &self.detail)
    }

    pub async fn load(&mut self) -> LoadOutcome {
        let route = Route::AdminUserDetail(self.id);
        let id = self.id;
        let users = self.ctx.users();
        let cases = self.ctx.cases();
        let ctx = self.ctx.clone();
        let generation = self.ctx.generation();
        let fetch = async move {
            let owned = CaseQuery { user_id: Some(id), ..Default::default() };
            let (user, cases) = future::join(users.get(id), cases.list(Some(&owned))).await;
            let user = user?;
            let cases = match cases {
                Ok(mut list) => {
                    list.retain(|c| c.user_id == id);
                    list
                }
                Err(e) => {
                    log::warn!("cases of user {} unavailable: {}", id, e);
                    ctx.absorb(&e, generation);
                    Vec::new()
                }
            };
            Ok::<_, ApiError>(UserDetail { user, cases })
        };
        self.ctx.load_into(&route, &mut self.detail, "user", fetch).await
    }
}
