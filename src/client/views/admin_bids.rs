use std::cmp::Ordering;

use crate::client::models::app_state::Route;
use crate::client::models::listing::{matches_search, PageView, Pagination, SortOrder};
use crate::client::models::ui_state::UiState;
use crate::client::models::view_state::Loadable;
use crate::client::views::{LoadOutcome, Screen, ViewContext};
use crate::common::error::FormError;
use crate::common::models::{Bid, BidId, BidStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BidSortKey {
    #[default]
    Date,
    Amount,
    Lawyer,
    Case,
}

impl BidSortKey {
    fn compare(&self, a: &Bid, b: &Bid) -> Ordering {
        match self {
            // bids without a timestamp sort as oldest
            BidSortKey::Date => a.created_at.cmp(&b.created_at),
            BidSortKey::Amount => a.amount.total_cmp(&b.amount),
            BidSortKey::Lawyer => a.lawyer_name.to_lowercase().cmp(&b.lawyer_name.to_lowercase()),
            BidSortKey::Case => case_title(a).to_lowercase().cmp(&case_title(b).to_lowercase()),
        }
    }
}

fn case_title(bid: &Bid) -> &str {
    bid.case_title.as_deref().unwrap_or("")
}

/// Every bid on the platform, for admins.
pub struct BidsAdminView {
    ctx: ViewContext,
    bids: Loadable<Vec<Bid>>,
    pub search: String,
    pub status: Option<BidStatus>,
    sort_by: BidSortKey,
    order: SortOrder,
    pub pagination: Pagination,
    pub ui: UiState,
}

impl BidsAdminView {
    pub fn new(ctx: ViewContext) -> Self {
        let pagination = Pagination::new(ctx.page_size());
        Self {
            ctx,
            bids: Loadable::default(),
            search: String::new(),
            status: None,
            sort_by: BidSortKey::Date,
            order: SortOrder::Desc,
            pagination,
            ui: UiState::default(),
        }
    }

    pub fn render(&self) -> Screen<'_, Vec<Bid>> {
        self.ctx.screen(&Route::AdminBids, &self.bids)
    }

    pub async fn load(&mut self) -> LoadOutcome {
        let bids = self.ctx.bids();
        self.ctx
            .load_into(&Route::AdminBids, &mut self.bids, "bids", async move { bids.list(None).await })
            .await
    }

    pub fn sorting(&self) -> (BidSortKey, SortOrder) {
        (self.sort_by, self.order)
    }

    /// Clicking the active column flips the order; a new column starts ascending.
    pub fn sort_on(&mut self, key: BidSortKey) {
        if self.sort_by == key {
            self.order = self.order.toggled();
        } else {
            self.sort_by = key;
            self.order = SortOrder::Asc;
        }
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.pagination.page = 1;
    }

    pub fn set_status(&mut self, status: Option<BidStatus>) {
        self.status = status;
        self.pagination.page = 1;
    }

    pub fn visible(&self) -> Vec<&Bid> {
        let mut rows: Vec<&Bid> = self
            .bids
            .value()
            .map(|v| v.iter().collect())
            .unwrap_or_default();
        rows.retain(|b| {
            self.status.map_or(true, |s| b.status == s)
                && matches_search(&self.search, &[case_title(b), &b.lawyer_name, &b.message])
        });
        rows.sort_by(|a, b| self.order.apply(self.sort_by.compare(a, b)));
        rows
    }

    pub fn with_page<R>(&self, f: impl FnOnce(PageView<'_, &Bid>) -> R) -> R {
        let rows = self.visible();
        f(self.pagination.slice(&rows))
    }

    pub fn go_to_page(&mut self, page: usize) {
        let total = self.visible().len();
        self.pagination.go_to(page, total);
    }

    pub fn empty_message(&self) -> &'static str {
        if self.search.trim().is_empty() && self.status.is_none() {
            "There are no bids in the system yet."
        } else {
            "Try adjusting your search or filter criteria."
        }
    }

    /// Admin override of a pending bid.
    pub async fn decide(&mut self, id: BidId, next: BidStatus) -> Result<Bid, FormError> {
        self.ctx.require(&Route::AdminBids)?;
        let current = self
            .bids
            .value()
            .and_then(|v| v.iter().find(|b| b.id == id))
            .map(|b| b.status)
            .ok_or_else(|| FormError::Invalid(format!("bid {} is not in the list", id)))?;
        if !current.can_transition_to(next) {
            return Err(FormError::Invalid(format!("a {} bid cannot become {}", current, next)));
        }
        self.ui.start();
        let generation = self.ctx.generation();
        match self.ctx.bids().transition(id, next).await {
            Ok(bid) => {
                self.ui.succeed(format!("Bid {}", next));
                self.load().await;
                Ok(bid)
            }
            Err(e) => {
                self.ui.fail("Failed to update bid status");
                Err(self.ctx.fail(e, generation))
            }
        }
    }
}
