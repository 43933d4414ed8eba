use crate::client::services::resources::{Resource, ResourceClient};
use crate::common::error::ApiError;
use crate::common::models::{NewUser, UserId, UserPatch, UserQuery, UserRecord, UserStatus};

impl Resource for UserRecord {
    const KIND: &'static str = "user";
    const COLLECTION: &'static str = "users";

    type Id = UserId;
    type Status = UserStatus;
    type Create = NewUser;
    type Update = UserPatch;
    type Query = UserQuery;
}

pub type UsersService = ResourceClient<UserRecord>;

impl ResourceClient<UserRecord> {
    /// Marks a pending lawyer as verified and active.
    pub async fn verify(&self, id: UserId) -> Result<UserRecord, ApiError> {
        self.transition(id, UserStatus::Active).await
    }

    pub async fn suspend(&self, id: UserId) -> Result<UserRecord, ApiError> {
        self.transition(id, UserStatus::Suspended).await
    }
}
