use crate::client::models::app_state::Route;
use crate::client::models::ui_state::UiState;
use crate::client::views::{required, ViewContext};
use crate::common::error::{AuthError, FormError};
use crate::common::models::{RegisterProfile, Role, Session};

/// Where a freshly authenticated user lands.
pub fn landing_route(session: &Session) -> Route {
    match session.role() {
        Some(Role::Admin) => Route::AdminDashboard,
        Some(_) => Route::Cases,
        None => Route::Login,
    }
}

pub struct LoginForm {
    ctx: ViewContext,
    pub email: String,
    pub password: String,
    pub ui: UiState,
}

impl LoginForm {
    pub fn new(ctx: ViewContext) -> Self {
        Self { ctx, email: String::new(), password: String::new(), ui: UiState::default() }
    }

    /// Logs in and returns the landing route. A failed attempt leaves the previous
    /// session exactly as it was.
    pub async fn submit(&mut self) -> Result<Route, FormError> {
        let email = required(&self.email, "email")?;
        if self.password.is_empty() {
            return Err(FormError::MissingField("password"));
        }
        self.ui.start();
        match self.ctx.store().login(&email, &self.password).await {
            Ok(session) => {
                self.password.clear();
                self.ui.succeed("Logged in");
                Ok(landing_route(&session))
            }
            Err(e) => {
                self.ui.fail(match &e {
                    AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                    other => format!("Failed to log in: {}", other),
                });
                Err(FormError::Auth(e))
            }
        }
    }
}

pub struct RegisterForm {
    ctx: ViewContext,
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    pub ui: UiState,
}

impl RegisterForm {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            name: String::new(),
            email: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            role: Role::Client,
            ui: UiState::default(),
        }
    }

    pub fn profile(&self) -> Result<RegisterProfile, FormError> {
        let name = required(&self.name, "name")?;
        let email = required(&self.email, "email")?;
        if self.password.is_empty() {
            return Err(FormError::MissingField("password"));
        }
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        Ok(RegisterProfile { name, email, password: self.password.clone(), role: self.role })
    }

    pub async fn submit(&mut self) -> Result<Route, FormError> {
        let profile = match self.profile() {
            Ok(p) => p,
            Err(e) => {
                self.ui.fail(e.to_string());
                return Err(e);
            }
        };
        self.ui.start();
        match self.ctx.store().register(profile).await {
            Ok(session) => {
                self.password.clear();
                self.confirm_password.clear();
                self.ui.succeed("Account created");
                Ok(landing_route(&session))
            }
            Err(e) => {
                self.ui.fail(format!("Failed to create an account: {}", e));
                Err(FormError::Auth(e))
            }
        }
    }
}
