use crate::client::gate;
use crate::client::models::app_state::Route;
use crate::client::models::ui_state::UiState;
use crate::client::services::cases_service::{CATEGORIES, CURRENCIES};
use crate::client::views::{parse_amount, required, ViewContext};
use crate::common::error::FormError;
use crate::common::models::{Case, CaseId, CaseUpdate, NewCase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(CaseId),
}

/// Create/edit form for a case.
pub struct CaseForm {
    ctx: ViewContext,
    mode: FormMode,
    route: Route,
    pub title: String,
    pub description: String,
    pub category: String,
    pub currency: String,
    pub budget: String,
    pub ui: UiState,
}

impl CaseForm {
    /// Blank form for `/cases/new` (clients).
    pub fn create(ctx: ViewContext) -> Self {
        Self::blank(ctx, Route::NewCase)
    }

    /// Blank form for `/admin/cases/new`.
    pub fn admin_create(ctx: ViewContext) -> Self {
        Self::blank(ctx, Route::AdminNewCase)
    }

    fn blank(ctx: ViewContext, route: Route) -> Self {
        Self {
            ctx,
            mode: FormMode::Create,
            route,
            title: String::new(),
            description: String::new(),
            category: CATEGORIES[0].to_string(),
            currency: CURRENCIES[0].to_string(),
            budget: String::new(),
            ui: UiState::default(),
        }
    }

    /// Loads the case and pre-fills the form. Only the owner or an admin may edit.
    pub async fn edit(ctx: ViewContext, id: CaseId) -> Result<Self, FormError> {
        let route = Route::EditCase(id);
        let session = ctx.require(&route)?;
        let generation = ctx.generation();
        let case = ctx.cases().get(id).await.map_err(|e| ctx.fail(e, generation))?;
        if !gate::can_manage_case(&session, &case) {
            return Err(FormError::NotAvailable("editing this case"));
        }
        Ok(Self::prefilled(ctx, route, &case))
    }

    fn prefilled(ctx: ViewContext, route: Route, case: &Case) -> Self {
        Self {
            ctx,
            mode: FormMode::Edit(case.id),
            route,
            title: case.title.clone(),
            description: case.description.clone(),
            category: case.category.clone(),
            currency: case.currency.clone(),
            budget: case.budget.map(|b| b.to_string()).unwrap_or_default(),
            ui: UiState::default(),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn categories() -> &'static [&'static str] {
        &CATEGORIES
    }

    pub fn currencies() -> &'static [&'static str] {
        &CURRENCIES
    }

    pub fn validate(&self) -> Result<NewCase, FormError> {
        let title = required(&self.title, "title")?;
        let category = required(&self.category, "category")?;
        let description = required(&self.description, "description")?;
        let currency = match self.currency.trim() {
            "" => CURRENCIES[0].to_string(),
            c => c.to_ascii_uppercase(),
        };
        let budget = match self.budget.trim() {
            "" => None,
            raw => Some(parse_amount(raw, "budget", true)?),
        };
        Ok(NewCase { title, description, category, currency, budget })
    }

    /// Sends the form. The gate runs first, so a refused account never reaches
    /// the network. Returns the route of the saved case.
    pub async fn submit(&mut self) -> Result<Route, FormError> {
        self.ctx.require(&self.route)?;
        let payload = match self.validate() {
            Ok(p) => p,
            Err(e) => {
                self.ui.fail(e.to_string());
                return Err(e);
            }
        };
        self.ui.start();
        let generation = self.ctx.generation();
        let saved = match self.mode {
            FormMode::Create => self.ctx.cases().create(&payload).await,
            FormMode::Edit(id) => {
                let update = CaseUpdate {
                    title: Some(payload.title),
                    description: Some(payload.description),
                    category: Some(payload.category),
                    currency: Some(payload.currency),
                    budget: payload.budget,
                };
                self.ctx.cases().update(id, &update).await
            }
        };
        match saved {
            Ok(case) => {
                self.ui.succeed(match self.mode {
                    FormMode::Create => "Case created",
                    FormMode::Edit(_) => "Case updated",
                });
                Ok(Route::CaseDetail(case.id))
            }
            Err(e) => {
                self.ui.fail(match self.mode {
                    FormMode::Create => "Failed to create case",
                    FormMode::Edit(_) => "Failed to update case",
                });
                Err(self.ctx.fail(e, generation))
            }
        }
    }
}
