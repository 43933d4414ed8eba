use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

use crate::client::services::api_client::ApiClient;
use crate::common::error::ApiError;
use crate::common::models::StatusChange;

/// A backend-owned entity reachable through the uniform CRUD routes
/// `/{collection}`, `/{collection}/{id}` and `/{collection}/{id}/status`.
pub trait Resource: DeserializeOwned + Send + 'static {
    /// Singular name used in errors and logs.
    const KIND: &'static str;
    const COLLECTION: &'static str;

    type Id: fmt::Display + Copy + Send + Sync;
    type Status: Serialize + Copy + Send + Sync;
    type Create: Serialize + Send + Sync;
    type Update: Serialize + Send + Sync;
    type Query: Serialize + Send + Sync;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<R> {
    Bare(Vec<R>),
    Wrapped { data: Vec<R> },
}

impl<R> ListBody<R> {
    fn into_vec(self) -> Vec<R> {
        match self {
            ListBody::Bare(v) | ListBody::Wrapped { data: v } => v,
        }
    }
}

/// Typed operations for one resource kind.
pub struct ResourceClient<R> {
    api: ApiClient,
    _kind: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceClient<R> {
    fn clone(&self) -> Self {
        Self { api: self.api.clone(), _kind: PhantomData }
    }
}

impl<R: Resource> ResourceClient<R> {
    pub fn new(api: ApiClient) -> Self {
        Self { api, _kind: PhantomData }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn collection_path() -> String {
        format!("/{}", R::COLLECTION)
    }

    fn item_path(id: R::Id) -> String {
        format!("/{}/{}", R::COLLECTION, id)
    }

    pub(crate) async fn list_at(&self, path: &str, query: Option<&R::Query>) -> Result<Vec<R>, ApiError> {
        let body: ListBody<R> = match query {
            Some(q) => self.api.get_with_query(R::KIND, path, q).await?,
            None => self.api.get(R::KIND, path).await?,
        };
        Ok(body.into_vec())
    }

    pub async fn list(&self, query: Option<&R::Query>) -> Result<Vec<R>, ApiError> {
        self.list_at(&Self::collection_path(), query).await
    }

    /// Fails with `NotFound` when the id does not resolve.
    pub async fn get(&self, id: R::Id) -> Result<R, ApiError> {
        self.api.get(R::KIND, &Self::item_path(id)).await
    }

    pub async fn create(&self, payload: &R::Create) -> Result<R, ApiError> {
        self.api.post(R::KIND, &Self::collection_path(), payload).await
    }

    pub async fn update(&self, id: R::Id, payload: &R::Update) -> Result<R, ApiError> {
        self.api.put(R::KIND, &Self::item_path(id), payload).await
    }

    pub async fn delete(&self, id: R::Id) -> Result<(), ApiError> {
        self.api.delete(R::KIND, &Self::item_path(id)).await
    }

    pub async fn transition(&self, id: R::Id, status: R::Status) -> Result<R, ApiError> {
        let path = format!("{}/status", Self::item_path(id));
        self.api.put(R::KIND, &path, &StatusChange { status }).await
    }
}
