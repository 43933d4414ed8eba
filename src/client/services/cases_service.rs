use crate::client::services::resources::{Resource, ResourceClient};
use crate::common::models::{Case, CaseId, CaseQuery, CaseStatus, CaseUpdate, NewCase};

impl Resource for Case {
    const KIND: &'static str = "case";
    const COLLECTION: &'static str = "cases";

    type Id = CaseId;
    type Status = CaseStatus;
    type Create = NewCase;
    type Update = CaseUpdate;
    type Query = CaseQuery;
}

pub type CasesService = ResourceClient<Case>;

pub const CATEGORIES: [&str; 9] = [
    "Family Law",
    "Criminal Law",
    "Corporate Law",
    "Real Estate",
    "Intellectual Property",
    "Employment Law",
    "Immigration",
    "Tax Law",
    "Other",
];

pub const CURRENCIES: [&str; 4] = ["USD", "EUR", "GBP", "INR"];
