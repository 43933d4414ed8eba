use crate::client::services::resources::{Resource, ResourceClient};
use crate::common::error::ApiError;
use crate::common::models::{Bid, BidId, BidQuery, BidStatus, BidUpdate, CaseId, NewBid};

impl Resource for Bid {
    const KIND: &'static str = "bid";
    const COLLECTION: &'static str = "bids";

    type Id = BidId;
    type Status = BidStatus;
    type Create = NewBid;
    type Update = BidUpdate;
    type Query = BidQuery;
}

pub type BidsService = ResourceClient<Bid>;

impl ResourceClient<Bid> {
    /// `GET /bids/case/:id`
    pub async fn list_for_case(&self, case_id: CaseId) -> Result<Vec<Bid>, ApiError> {
        self.list_at(&format!("/bids/case/{}", case_id), None).await
    }

    pub async fn accept(&self, id: BidId) -> Result<Bid, ApiError> {
        self.transition(id, BidStatus::Accepted).await
    }

    pub async fn reject(&self, id: BidId) -> Result<Bid, ApiError> {
        self.transition(id, BidStatus::Rejected).await
    }
}
