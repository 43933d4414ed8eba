use parking_lot::RwLock;
use std::sync::Arc;

use crate::client::services::api_client::ApiClient;
use crate::client::services::auth_service::AuthService;
use crate::client::utils::session_store::SessionStorage;
use crate::common::error::{ApiError, AuthError};
use crate::common::models::{Credentials, RegisterProfile, Role, Session, UserPatch, UserSummary};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Default)]
struct SessionSlot {
    session: Session,
    // bumped whenever the identity behind the session changes
    generation: u64,
}

/// Shared, read-mostly view of the current session.
///
/// Cloning is cheap and every clone observes the same state. Only `SessionStore`
/// writes through it; everything else reads.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<SessionSlot>>,
}

impl SessionHandle {
    /// A handle pre-loaded with a fabricated session.
    pub fn with_session(session: Session) -> Self {
        Self { inner: Arc::new(RwLock::new(SessionSlot { session, generation: 0 })) }
    }

    pub fn snapshot(&self) -> Session {
        self.inner.read().session.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().session.bearer().map(str::to_string)
    }

    pub fn user(&self) -> Option<UserSummary> {
        self.inner.read().session.user.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.inner.read().session.role()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().session.is_authenticated()
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    fn replace(&self, session: Session, identity_changed: bool) {
        let mut slot = self.inner.write();
        slot.session = session;
        if identity_changed {
            slot.generation += 1;
        }
    }
}

/// Owner of the session: the only component that creates, refreshes or destroys it.
#[derive(Clone)]
pub struct SessionStore {
    handle: SessionHandle,
    auth: AuthService,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// Restores whatever the durable storage holds without touching the network,
    /// so the first render can be optimistic. Call [`SessionStore::validate`] later.
    pub fn init(api: ApiClient, storage: Arc<dyn SessionStorage>) -> Self {
        let handle = api.session().clone();
        match storage.load() {
            Ok(Some(session)) => {
                log::info!(
                    "restored stored session for {}",
                    session.user.as_ref().map(|u| u.email.as_str()).unwrap_or("unknown user")
                );
                handle.replace(session, true);
            }
            Ok(None) => log::debug!("no stored session"),
            Err(e) => log::warn!("ignoring unreadable stored session: {}", e),
        }
        Self { handle, auth: AuthService::new(api), storage }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn current_session(&self) -> Session {
        self.handle.snapshot()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("email and password are required".into()));
        }
        let credentials = Credentials { email: email.to_string(), password: password.to_string() };
        let resp = self.auth.login(&credentials).await.map_err(|e| match e {
            ApiError::Unauthorized(_) => AuthError::InvalidCredentials,
            other => AuthError::Api(other),
        })?;
        log::info!("logged in as {} ({})", resp.user.email, resp.user.role);
        Ok(self.establish(Session::new(resp.token, resp.user)))
    }

    pub async fn register(&self, profile: RegisterProfile) -> Result<Session, AuthError> {
        validate_profile(&profile)?;
        let resp = self.auth.register(&profile).await?;
        log::info!("registered {} as {}", resp.user.email, resp.user.role);
        Ok(self.establish(Session::new(resp.token, resp.user)))
    }

    /// Clears durable and in-memory state. Never fails.
    pub fn logout(&self) {
        if let Err(e) = self.storage.clear() {
            log::warn!("failed to clear stored session: {}", e);
        }
        if self.handle.is_authenticated() {
            log::info!("logged out");
        }
        self.handle.replace(Session::anonymous(), true);
    }

    /// Logs out only while the session is still the one issued under `generation`.
    /// Returns whether it did.
    pub fn logout_if(&self, generation: u64) -> bool {
        if self.handle.generation() != generation {
            return false;
        }
        self.logout();
        true
    }

    /// Replaces the user snapshot with an authoritative one (e.g. a server echo).
    pub fn replace_user(&self, user: UserSummary) {
        let mut session = self.handle.snapshot();
        if session.user.is_none() {
            return;
        }
        let identity_changed = session.user_id() != Some(user.id);
        session.user = Some(user);
        self.persist(&session);
        self.handle.replace(session, identity_changed);
    }

    /// Applies the name/email parts of a profile patch to the cached identity.
    pub fn update_user(&self, patch: &UserPatch) {
        let Some(mut user) = self.handle.user() else { return };
        if let Some(name) = &patch.name {
            user.name = name.clone();
        }
        if let Some(email) = &patch.email {
            user.email = email.clone();
        }
        self.replace_user(user);
    }

    /// Checks the stored token against `/auth/me`.
    ///
    /// An `Unauthorized` answer destroys the session and yields `Ok(None)`; any other
    /// failure leaves the session untouched and is returned.
    pub async fn validate(&self) -> Result<Option<UserSummary>, ApiError> {
        if self.handle.token().is_none() {
            return Ok(None);
        }
        let generation = self.handle.generation();
        match self.auth.me().await {
            Ok(user) => {
                if self.handle.generation() == generation {
                    self.replace_user(user.clone());
                }
                Ok(Some(user))
            }
            Err(ApiError::Unauthorized(reason)) => {
                log::info!("stored session rejected by server: {}", reason);
                self.logout_if(generation);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn establish(&self, session: Session) -> Session {
        self.persist(&session);
        self.handle.replace(session.clone(), true);
        session
    }

    fn persist(&self, session: &Session) {
        // keeping the in-memory session is still useful when storage is broken
        if let Err(e) = self.storage.save(session) {
            log::warn!("failed to persist session: {}", e);
        }
    }
}

fn validate_profile(profile: &RegisterProfile) -> Result<(), AuthError> {
    if profile.name.trim().is_empty() {
        return Err(AuthError::Validation("name is required".into()));
    }
    if !profile.email.contains('@') {
        return Err(AuthError::Validation("a valid email is required".into()));
    }
    if profile.password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if profile.role == Role::Admin {
        return Err(AuthError::Validation("admin accounts cannot be self-registered".into()));
    }
    Ok(())
}
