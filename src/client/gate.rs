//! Authorization gate and the role affordances derived from it.
//!
//! Everything here is a pure function of its inputs and is evaluated on every
//! render. These checks only decide what the UI offers; the backend is the real
//! enforcement point.

use crate::client::models::app_state::Route;
use crate::common::models::{Bid, BidStatus, Case, CaseStatus, Role, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(Route),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decides whether guarded content may render.
///
/// No user: redirect to login. A non-empty `required_roles` that does not contain
/// the user's role: redirect home. Otherwise allow.
pub fn permit(session: &Session, required_roles: &[Role]) -> Decision {
    let Some(user) = &session.user else {
        return Decision::RedirectTo(Route::Login);
    };
    if !required_roles.is_empty() && !required_roles.contains(&user.role) {
        return Decision::RedirectTo(Route::Home);
    }
    Decision::Allow
}

/// Gate for a whole route; public routes always render.
pub fn permit_route(session: &Session, route: &Route) -> Decision {
    match route.required_roles() {
        None => Decision::Allow,
        Some(roles) => permit(session, roles),
    }
}

fn is_owner(session: &Session, case: &Case) -> bool {
    session.user_id() == Some(case.user_id)
}

pub fn can_create_case(session: &Session) -> bool {
    permit_route(session, &Route::NewCase).is_allowed()
}

/// Edit, delete and status changes: admins, or the client who owns the case.
pub fn can_manage_case(session: &Session, case: &Case) -> bool {
    match session.role() {
        Some(Role::Admin) => true,
        Some(Role::Client) => is_owner(session, case),
        _ => false,
    }
}

pub fn can_transition_case(session: &Session, case: &Case, next: CaseStatus) -> bool {
    can_manage_case(session, case) && case.status.can_transition_to(next)
}

/// Lawyers bid on open cases only.
pub fn can_bid(session: &Session, case: &Case) -> bool {
    session.role() == Some(Role::Lawyer) && case.status == CaseStatus::Open
}

/// Accept/reject: the owning client (admins bypass ownership) on an open case.
pub fn can_decide_bids(session: &Session, case: &Case) -> bool {
    case.status == CaseStatus::Open && can_manage_case(session, case)
}

pub fn can_decide_bid(session: &Session, case: &Case, bid: &Bid, next: BidStatus) -> bool {
    bid.case_id == case.id && can_decide_bids(session, case) && bid.status.can_transition_to(next)
}

/// Header links for the current session.
pub fn nav_links(session: &Session) -> Vec<(&'static str, Route)> {
    let mut links = vec![("Home", Route::Home)];
    match session.role() {
        None => {
            links.push(("Login", Route::Login));
            links.push(("Register", Route::Register));
        }
        Some(role) => {
            links.push(("My Cases", Route::Cases));
            if can_create_case(session) {
                links.push(("Create Case", Route::NewCase));
            }
            if role == Role::Admin {
                links.push(("Admin", Route::AdminDashboard));
            }
            links.push(("Profile", Route::Profile));
        }
    }
    links
}
