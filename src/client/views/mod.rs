//! View controllers: one per page family.
//!
//! Each controller owns the local state of its page, gates itself on every render,
//! loads through the resource client, and refetches after every successful
//! mutation. Server echoes are never patched into local lists.

pub mod admin_bids;
pub mod admin_users;
pub mod auth_forms;
pub mod case_detail;
pub mod case_form;
pub mod cases_list;
pub mod dashboard;
pub mod profile;

use std::future::Future;
use std::sync::Arc;

use crate::client::gate::{self, Decision};
use crate::client::models::app_state::Route;
use crate::client::models::view_state::{Loadable, Settled, Ticket, ViewState};
use crate::client::services::api_client::ApiClient;
use crate::client::services::bids_service::BidsService;
use crate::client::services::cases_service::CasesService;
use crate::client::services::session::{SessionHandle, SessionStore};
use crate::client::services::users_service::UsersService;
use crate::client::utils::session_store::SessionStorage;
use crate::common::config::ClientConfig;
use crate::common::error::{ApiError, FormError};
use crate::common::models::Session;

/// What a guarded view shows right now.
#[derive(Debug, PartialEq)]
pub enum Screen<'a, T> {
    Redirect(Route),
    Show(&'a ViewState<T>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The gate refused the view; nothing was requested.
    Redirect(Route),
    Done(Settled),
}

/// Everything a controller needs: the session store and the API client.
#[derive(Clone)]
pub struct ViewContext {
    store: SessionStore,
    api: ApiClient,
    page_size: usize,
}

impl ViewContext {
    /// Wires storage, session store and API client together and restores any
    /// stored session.
    pub fn bootstrap(config: &ClientConfig, storage: Arc<dyn SessionStorage>) -> anyhow::Result<Self> {
        let api = ApiClient::new(config, SessionHandle::default())?;
        let store = SessionStore::init(api.clone(), storage);
        Ok(Self { store, api, page_size: config.page_size })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn session(&self) -> Session {
        self.store.current_session()
    }

    pub fn generation(&self) -> u64 {
        self.store.handle().generation()
    }

    pub fn cases(&self) -> CasesService {
        CasesService::new(self.api.clone())
    }

    pub fn bids(&self) -> BidsService {
        BidsService::new(self.api.clone())
    }

    pub fn users(&self) -> UsersService {
        UsersService::new(self.api.clone())
    }

    pub fn permit(&self, route: &Route) -> Decision {
        gate::permit_route(&self.session(), route)
    }

    /// Gate for actions: the current session, or the redirect the gate demands.
    pub fn require(&self, route: &Route) -> Result<Session, FormError> {
        let session = self.session();
        match gate::permit_route(&session, route) {
            Decision::Allow => Ok(session),
            Decision::RedirectTo(to) => Err(FormError::NotPermitted(to)),
        }
    }

    pub fn screen<'a, T>(&self, route: &Route, slot: &'a Loadable<T>) -> Screen<'a, T> {
        match self.permit(route) {
            Decision::Allow => Screen::Show(slot.state()),
            Decision::RedirectTo(to) => Screen::Redirect(to),
        }
    }

    /// Reacts to a failed call issued under session `generation`. A rejected
    /// token ends that session, so the next render of any guarded view redirects
    /// to login. A session established after the call went out is left alone.
    pub fn absorb(&self, err: &ApiError, generation: u64) {
        if !err.is_unauthorized() || !self.store.handle().is_authenticated() {
            return;
        }
        if self.store.logout_if(generation) {
            log::info!("server rejected the session token, logged out");
        } else {
            log::debug!("ignoring 401 for a session that has since changed");
        }
    }

    /// Same as [`ViewContext::absorb`], but hands the error back as a form error.
    pub fn fail(&self, err: ApiError, generation: u64) -> FormError {
        self.absorb(&err, generation);
        FormError::Api(err)
    }

    pub fn settle<T>(
        &self,
        slot: &mut Loadable<T>,
        ticket: Ticket,
        what: &str,
        result: Result<T, ApiError>,
    ) -> Settled {
        let result = result.map_err(|e| {
            self.absorb(&e, ticket.generation());
            format!("Failed to load {}: {}", what, e)
        });
        let settled = slot.complete(ticket, self.generation(), result);
        if settled != Settled::Applied {
            log::warn!("dropped stale {} response ({:?})", what, settled);
        }
        settled
    }

    /// Gate, start, await and settle one load.
    pub async fn load_into<T, F>(&self, route: &Route, slot: &mut Loadable<T>, what: &str, fetch: F) -> LoadOutcome
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if let Decision::RedirectTo(to) = self.permit(route) {
            slot.reset();
            return LoadOutcome::Redirect(to);
        }
        let ticket = slot.begin(self.generation());
        let result = fetch.await;
        LoadOutcome::Done(self.settle(slot, ticket, what, result))
    }
}

/// Parses a money amount typed into a form.
pub(crate) fn parse_amount(raw: &str, field: &'static str, allow_zero: bool) -> Result<f64, FormError> {
    let expected = if allow_zero { "a non-negative number" } else { "a positive number" };
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| FormError::InvalidNumber { field, expected })?;
    let ok = value.is_finite() && if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !ok {
        return Err(FormError::InvalidNumber { field, expected });
    }
    Ok(value)
}

pub(crate) fn required(raw: &str, field: &'static str) -> Result<String, FormError> {
    let v = raw.trim();
    if v.is_empty() {
        Err(FormError::MissingField(field))
    } else {
        Ok(v.to_string())
    }
}
