use chrono::{DateTime, Utc};
use std::future::Future;

use crate::client::gate;
use crate::client::models::app_state::Route;
use crate::client::models::listing::{matches_search, DateWindow, PageView, Pagination};
use crate::client::models::ui_state::UiState;
use crate::client::models::view_state::{Loadable, Settled, Ticket};
use crate::client::views::{LoadOutcome, Screen, ViewContext};
use crate::common::error::{ApiError, FormError};
use crate::common::models::{Case, CaseId, CaseStatus};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub category: Option<String>,
    pub window: DateWindow,
    pub search: String,
}

impl CaseFilter {
    pub fn matches(&self, case: &Case, now: DateTime<Utc>) -> bool {
        if self.status.is_some_and(|s| s != case.status) {
            return false;
        }
        if let Some(category) = &self.category {
            if !case.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        self.window.contains(case.created_at, now) && matches_search(&self.search, &[&case.title, &case.description])
    }

    pub fn is_active(&self) -> bool {
        self != &CaseFilter::default()
    }
}

/// The case list, for users (`/cases`) and admins (`/admin/cases`).
pub struct CasesListView {
    ctx: ViewContext,
    route: Route,
    cases: Loadable<Vec<Case>>,
    pub filter: CaseFilter,
    pub pagination: Pagination,
    pub ui: UiState,
}

impl CasesListView {
    pub fn new(ctx: ViewContext) -> Self {
        Self::for_route(ctx, Route::Cases)
    }

    pub fn admin(ctx: ViewContext) -> Self {
        Self::for_route(ctx, Route::AdminCases)
    }

    fn for_route(ctx: ViewContext, route: Route) -> Self {
        let pagination = Pagination::new(ctx.page_size());
        Self { ctx, route, cases: Loadable::default(), filter: CaseFilter::default(), pagination, ui: UiState::default() }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn render(&self) -> Screen<'_, Vec<Case>> {
        self.ctx.screen(&self.route, &self.cases)
    }

    /// Starts a load and returns its ticket, or the redirect the gate demands.
    pub fn begin_load(&mut self) -> Result<Ticket, Route> {
        if let gate::Decision::RedirectTo(to) = self.ctx.permit(&self.route) {
            self.cases.reset();
            return Err(to);
        }
        Ok(self.cases.begin(self.ctx.generation()))
    }

    /// The request itself, detached from the view so it can run while the view
    /// keeps handling other events.
    pub fn fetch(&self) -> impl Future<Output = Result<Vec<Case>, ApiError>> + Send + 'static {
        let cases = self.ctx.cases();
        async move { cases.list(None).await }
    }

    pub fn finish_load(&mut self, ticket: Ticket, result: Result<Vec<Case>, ApiError>) -> Settled {
        let settled = self.ctx.settle(&mut self.cases, ticket, "cases", result);
        if settled == Settled::Applied {
            if let Some(cases) = self.cases.value_mut() {
                cases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            let total = self.filtered().len();
            self.pagination.go_to(self.pagination.page, total);
        }
        settled
    }

    pub async fn load(&mut self) -> LoadOutcome {
        let ticket = match self.begin_load() {
            Ok(t) => t,
            Err(to) => return LoadOutcome::Redirect(to),
        };
        let result = self.fetch().await;
        LoadOutcome::Done(self.finish_load(ticket, result))
    }

    pub fn all(&self) -> &[Case] {
        self.cases.value().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn filtered(&self) -> Vec<&Case> {
        let now = Utc::now();
        self.all().iter().filter(|c| self.filter.matches(c, now)).collect()
    }

    pub fn set_filter(&mut self, filter: CaseFilter) {
        self.filter = filter;
        self.pagination.page = 1;
    }

    pub fn go_to_page(&mut self, page: usize) {
        let total = self.filtered().len();
        self.pagination.go_to(page, total);
    }

    pub fn with_page<R>(&self, f: impl FnOnce(PageView<'_, &Case>) -> R) -> R {
        let rows = self.filtered();
        f(self.pagination.slice(&rows))
    }

    pub fn empty_message(&self) -> &'static str {
        if self.filter.is_active() {
            "No cases match your filters."
        } else if gate::can_create_case(&self.ctx.session()) {
            "Create your first case to get started."
        } else {
            "No cases available at the moment."
        }
    }

    fn find(&self, id: CaseId) -> Result<&Case, FormError> {
        self.all()
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| FormError::Invalid(format!("case {} is not in the list", id)))
    }

    pub async fn delete(&mut self, id: CaseId) -> Result<(), FormError> {
        let session = self.ctx.require(&self.route)?;
        if !gate::can_manage_case(&session, self.find(id)?) {
            return Err(FormError::NotAvailable("deleting this case"));
        }
        self.ui.start();
        let generation = self.ctx.generation();
        match self.ctx.cases().delete(id).await {
            Ok(()) => {
                self.ui.succeed("Case deleted");
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.ui.fail("Failed to delete case");
                Err(self.ctx.fail(e, generation))
            }
        }
    }

    pub async fn set_status(&mut self, id: CaseId, next: CaseStatus) -> Result<(), FormError> {
        let session = self.ctx.require(&self.route)?;
        if !gate::can_transition_case(&session, self.find(id)?, next) {
            return Err(FormError::NotAvailable("this status change"));
        }
        self.ui.start();
        let generation = self.ctx.generation();
        match self.ctx.cases().transition(id, next).await {
            Ok(_) => {
                self.ui.succeed(format!("Case status updated to {}", next.as_str().replace('_', " ")));
                self.load().await;
                Ok(())
            }
            Err(e) => {
                self.ui.fail("Failed to update case status");
                Err(self.ctx.fail(e, generation))
            }
        }
    }
}
