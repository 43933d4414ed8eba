use std::fmt;

use crate::common::models::{CaseId, Role, UserId};

const CLIENT_ONLY: &[Role] = &[Role::Client];
const ADMIN_ONLY: &[Role] = &[Role::Admin];
const ANY_ROLE: &[Role] = &[];

/// Every view the application can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    #[default]
    Home,
    Login,
    Register,
    Cases,
    NewCase,
    CaseDetail(CaseId),
    EditCase(CaseId),
    Profile,
    AdminDashboard,
    AdminUsers,
    AdminUserDetail(UserId),
    AdminCases,
    AdminNewCase,
    AdminBids,
    NotFound,
}

impl Route {
    /// The capability set guarding this route. `None` means public; an empty set
    /// means any authenticated user.
    pub fn required_roles(&self) -> Option<&'static [Role]> {
        match self {
            Route::Home | Route::Login | Route::Register | Route::NotFound => None,
            Route::Cases | Route::CaseDetail(_) | Route::EditCase(_) | Route::Profile => Some(ANY_ROLE),
            Route::NewCase => Some(CLIENT_ONLY),
            Route::AdminDashboard
            | Route::AdminUsers
            | Route::AdminUserDetail(_)
            | Route::AdminCases
            | Route::AdminNewCase
            | Route::AdminBids => Some(ADMIN_ONLY),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Cases => "/cases".to_string(),
            Route::NewCase => "/cases/new".to_string(),
            Route::CaseDetail(id) => format!("/cases/{}", id),
            Route::EditCase(id) => format!("/cases/{}/edit", id),
            Route::Profile => "/profile".to_string(),
            Route::AdminDashboard => "/admin/dashboard".to_string(),
            Route::AdminUsers => "/admin/users".to_string(),
            Route::AdminUserDetail(id) => format!("/admin/users/{}", id),
            Route::AdminCases => "/admin/cases".to_string(),
            Route::AdminNewCase => "/admin/cases/new".to_string(),
            Route::AdminBids => "/admin/bids".to_string(),
            Route::NotFound => "/404".to_string(),
        }
    }

    /// Resolves a path to a route; anything unknown is `NotFound`.
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["cases"] => Route::Cases,
            ["cases", "new"] => Route::NewCase,
            ["cases", id] => id.parse().map(Route::CaseDetail).unwrap_or(Route::NotFound),
            ["cases", id, "edit"] => id.parse().map(Route::EditCase).unwrap_or(Route::NotFound),
            ["profile"] => Route::Profile,
            ["admin"] | ["admin", "dashboard"] => Route::AdminDashboard,
            ["admin", "users"] => Route::AdminUsers,
            ["admin", "users", id] => id.parse().map(Route::AdminUserDetail).unwrap_or(Route::NotFound),
            ["admin", "cases"] => Route::AdminCases,
            ["admin", "cases", "new"] => Route::AdminNewCase,
            ["admin", "cases", id] => id.parse().map(Route::CaseDetail).unwrap_or(Route::NotFound),
            ["admin", "cases", id, "edit"] => id.parse().map(Route::EditCase).unwrap_or(Route::NotFound),
            ["admin", "bids"] => Route::AdminBids,
            _ => Route::NotFound,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
