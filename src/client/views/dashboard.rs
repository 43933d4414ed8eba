use futures_util::future;

use crate::client::models::app_state::Route;
use crate::client::models::view_state::Loadable;
use crate::client::views::{LoadOutcome, Screen, ViewContext};
use crate::common::error::ApiError;
use crate::common::models::{BidQuery, BidStatus, Case, CaseQuery, CaseStatus, Role, Session};

const RECENT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
    /// Sum of the budgets of open cases
    pub open_budget: f64,
    pub recent: Vec<Case>,
    // admin-only sections, None when not requested or unavailable
    pub users: Option<usize>,
    pub pending_bids: Option<usize>,
}

impl DashboardData {
    pub fn from_cases(mut cases: Vec<Case>) -> Self {
        let count = |s: CaseStatus| cases.iter().filter(|c| c.status == s).count();
        let (open, in_progress, closed) = (count(CaseStatus::Open), count(CaseStatus::InProgress), count(CaseStatus::Closed));
        let open_budget: f64 = cases
            .iter()
            .filter(|c| c.status == CaseStatus::Open)
            .filter_map(|c| c.budget)
            .sum();
        let total = cases.len();
        cases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        cases.truncate(RECENT);
        Self { total, open, in_progress, closed, open_budget, recent: cases, users: None, pending_bids: None }
    }
}

/// Which cases a role's dashboard summarizes.
fn scope(session: &Session) -> Option<CaseQuery> {
    match session.role() {
        Some(Role::Client) => Some(CaseQuery { user_id: session.user_id(), ..Default::default() }),
        Some(Role::Lawyer) => Some(CaseQuery { status: Some(CaseStatus::Open), ..Default::default() }),
        _ => None,
    }
}

pub struct DashboardView {
    ctx: ViewContext,
    route: Route,
    data: Loadable<DashboardData>,
}

impl DashboardView {
    /// Personal dashboard for any signed-in user.
    pub fn new(ctx: ViewContext) -> Self {
        Self { ctx, route: Route::Cases, data: Loadable::default() }
    }

    pub fn admin(ctx: ViewContext) -> Self {
        Self { ctx, route: Route::AdminDashboard, data: Loadable::default() }
    }

    pub fn render(&self) -> Screen<'_, DashboardData> {
        self.ctx.screen(&self.route, &self.data)
    }

    pub async fn load(&mut self) -> LoadOutcome {
        let session = self.ctx.session();
        let query = scope(&session);
        let cases = self.ctx.cases();
        if self.route != Route::AdminDashboard {
            let owner = query.as_ref().and_then(|q| q.user_id);
            let fetch = async move {
                let mut list = cases.list(query.as_ref()).await?;
                // the server may ignore filters, so apply the owner scope here too
                if let Some(owner) = owner {
                    list.retain(|c| c.user_id == owner);
                }
                Ok::<_, ApiError>(DashboardData::from_cases(list))
            };
            return self.ctx.load_into(&self.route, &mut self.data, "dashboard", fetch).await;
        }

        let users = self.ctx.users();
        let bids = self.ctx.bids();
        let ctx = self.ctx.clone();
        let generation = self.ctx.generation();
        let fetch = async move {
            let pending = BidQuery { status: Some(BidStatus::Pending), ..Default::default() };
            let (cases, users, bids) = future::join3(cases.list(None), users.list(None), bids.list(Some(&pending))).await;
            let mut data = DashboardData::from_cases(cases?);
            // optional sections: failures only leave them empty
            data.users = match users {
                Ok(u) => Some(u.len()),
                Err(e) => {
                    log::warn!("dashboard: user count unavailable: {}", e);
                    ctx.absorb(&e, generation);
                    None
                }
            };
            data.pending_bids = match bids {
                Ok(b) => Some(b.iter().filter(|b| b.status == BidStatus::Pending).count()),
                Err(e) => {
                    log::warn!("dashboard: bid count unavailable: {}", e);
                    ctx.absorb(&e, generation);
                    None
                }
            };
            Ok::<_, ApiError>(data)
        };
        self.ctx.load_into(&self.route, &mut self.data, "dashboard", fetch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn case(id: i64, status: CaseStatus, budget: Option<f64>, age_days: i64) -> Case {
        let at = Utc::now() - Duration::days(age_days);
        Case {
            id,
            title: format!("Case {}", id),
            description: String::new(),
            category: "Tax Law".into(),
            status,
            budget,
            currency: "USD".into(),
            user_id: 1,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn counts_and_recent() {
        let cases = vec![
            case(1, CaseStatus::Open, Some(100.0), 10),
            case(2, CaseStatus::Open, None, 9),
            case(3, CaseStatus::InProgress, Some(50.0), 8),
            case(4, CaseStatus::Closed, Some(75.0), 7),
            case(5, CaseStatus::Open, Some(25.5), 6),
            case(6, CaseStatus::Closed, None, 5),
            case(7, CaseStatus::Open, None, 1),
        ];
        let data = DashboardData::from_cases(cases);
        assert_eq!(data.total, 7);
        assert_eq!((data.open, data.in_progress, data.closed), (4, 1, 2));
        assert_eq!(data.open_budget, 125.5);
        assert_eq!(data.recent.iter().map(|c| c.id).collect::<Vec<_>>(), vec![7, 6, 5, 4, 3]);
    }
}
