use futures_util::future;

use crate::client::gate;
use crate::client::models::app_state::Route;
use crate::client::models::ui_state::UiState;
use crate::client::models::view_state::{Loadable, Settled};
use crate::client::views::{parse_amount, required, LoadOutcome, Screen, ViewContext};
use crate::common::error::FormError;
use crate::common::models::{Bid, BidId, BidStatus, Case, CaseId, CaseStatus, NewBid};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BidForm {
    pub amount: String,
    pub message: String,
}

impl BidForm {
    pub fn validate(&self, case_id: CaseId) -> Result<NewBid, FormError> {
        let amount = parse_amount(&self.amount, "amount", false)?;
        let message = required(&self.message, "message")?;
        Ok(NewBid { case_id, amount, message })
    }
}

/// One case with its bids. The case is required; bids are best-effort.
pub struct CaseDetailView {
    ctx: ViewContext,
    id: CaseId,
    case: Loadable<Case>,
    bids: Vec<Bid>,
    pub bid_form: BidForm,
    pub ui: UiState,
}

impl CaseDetailView {
    pub fn new(ctx: ViewContext, id: CaseId) -> Self {
        Self { ctx, id, case: Loadable::default(), bids: Vec::new(), bid_form: BidForm::default(), ui: UiState::default() }
    }

    pub fn route(&self) -> Route {
        Route::CaseDetail(self.id)
    }

    pub fn render(&self) -> Screen<'_, Case> {
        self.ctx.screen(&self.route(), &self.case)
    }

    pub fn case(&self) -> Option<&Case> {
        self.case.value()
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    /// Fetches the case and its bids concurrently.
    pub async fn load(&mut self) -> LoadOutcome {
        let route = self.route();
        if let gate::Decision::RedirectTo(to) = self.ctx.permit(&route) {
            self.case.reset();
            self.bids.clear();
            return LoadOutcome::Redirect(to);
        }
        let ticket = self.case.begin(self.ctx.generation());
        let cases = self.ctx.cases();
        let bids = self.ctx.bids();
        let (case_result, bids_result) = future::join(cases.get(self.id), bids.list_for_case(self.id)).await;

        let settled = self.ctx.settle(&mut self.case, ticket, "case details", case_result);
        if settled != Settled::Applied {
            self.bids.clear();
            return LoadOutcome::Done(settled);
        }
        self.bids = match bids_result {
            Ok(bids) => bids,
            Err(e) => {
                log::warn!("failed to fetch bids for case {}: {}", self.id, e);
                self.ctx.absorb(&e, ticket.generation());
                Vec::new()
            }
        };
        LoadOutcome::Done(settled)
    }

    fn loaded_case(&self) -> Result<Case, FormError> {
        self.case.value().cloned().ok_or_else(|| FormError::Invalid("case is not loaded".into()))
    }

    pub fn can_bid(&self) -> bool {
        self.case().is_some_and(|c| gate::can_bid(&self.ctx.session(), c))
    }

    pub fn can_decide_bids(&self) -> bool {
        self.case().is_some_and(|c| gate::can_decide_bids(&self.ctx.session(), c))
    }

    pub fn can_manage(&self) -> bool {
        self.case().is_some_and(|c| gate::can_manage_case(&self.ctx.session(), c))
    }

    pub async fn submit_bid(&mut self) -> Result<Bid, FormError> {
        let session = self.ctx.require(&self.route())?;
        let case = self.loaded_case()?;
        if !gate::can_bid(&session, &case) {
            return Err(FormError::NotAvailable("bidding on this case"));
        }
        let payload = match self.bid_form.validate(case.id) {
            Ok(p) => p,
            Err(e) => {
                self.ui.fail(e.to_string());
                return Err(e);
            }
        };
        self.ui.start();
        let generation = self.ctx.generation();
        match self.ctx.bids().create(&payload).await {
            Ok(bid) => {
                self.bid_form = BidForm::default();
                self.ui.succeed("Bid submitted");
                self.load().await;
                Ok(bid)
            }
            Err(e) => {
                self.ui.fail(format!("Failed to submit bid: {}", e));
                Err(self.ctx.fail(e, generation))
            }
        }
    }

    pub async fn decide_bid(&mut self, bid_id: BidId, next: BidStatus) -> Result<Bid, FormError> {
        let session = self.ctx.require(&self.route())?;
        let case = self.loaded_case()?;
        let bid = self
            .bids
            .iter()
            .find(|b| b.id == bid_id)
            .ok_or_else(|| FormError::Invalid(format!("bid {} is not on this case", bid_id)))?;
        if !gate::can_decide_bid(&session, &case, bid, next) {
            return Err(FormError::NotAvailable("deciding this bid"));
        }
        self.ui.start();
        let generation = self.ctx.generation();
        let bids = self.ctx.bids();
        let decided = match next {
            BidStatus::Accepted => bids.accept(bid_id).await,
            BidStatus::Rejected => bids.reject(bid_id).await,
            other => bids.transition(bid_id, other).await,
        };
        match decided {
            Ok(bid) => {
                self.ui.succeed(format!("Bid {}", next));
                self.load().await;
                Ok(bid)
            }
            Err(e) => {
                self.ui.fail(format!("Failed to update bid: {}", e));
                Err(self.ctx.fail(e, generation))
            }
        }
    }

    pub async fn accept_bid(&mut self, bid_id: BidId) -> Result<Bid, FormError> {
        self.decide_bid(bid_id, BidStatus::Accepted).await
    }

    pub async fn reject_bid(&mut self, bid_id: BidId) -> Result<Bid, FormError> {
        self.decide_bid(bid_id, BidStatus::Rejected).await
    }

    pub async fn transition(&mut self, next: CaseStatus) -> Result<Case, FormError> {
        let session = self.ctx.require(&self.route())?;
        let case = self.loaded_case()?;
        if !gate::can_transition_case(&session, &case, next) {
            return Err(FormError::NotAvailable("this status change"));
        }
        self.ui.start();
        let generation = self.ctx.generation();
        match self.ctx.cases().transition(case.id, next).await {
            Ok(updated) => {
                self.ui.succeed(format!("Case is now {}", next.as_str().replace('_', " ")));
                self.load().await;
                Ok(updated)
            }
            Err(e) => {
                self.ui.fail(format!("Failed to update case: {}", e));
                Err(self.ctx.fail(e, generation))
            }
        }
    }

    /// Deletes the case; on success the caller should navigate to the returned route.
    pub async fn delete(&mut self) -> Result<Route, FormError> {
        let session = self.ctx.require(&self.route())?;
        let case = self.loaded_case()?;
        if !gate::can_manage_case(&session, &case) {
            return Err(FormError::NotAvailable("deleting this case"));
        }
        self.ui.start();
        let generation = self.ctx.generation();
        match self.ctx.cases().delete(case.id).await {
            Ok(()) => {
                self.ui.succeed("Case deleted");
                self.case.reset();
                self.bids.clear();
                Ok(Route::Cases)
            }
            Err(e) => {
                self.ui.fail("Failed to delete case");
                Err(self.ctx.fail(e, generation))
            }
        }
    }
}
