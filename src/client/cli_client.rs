use std::collections::HashMap;
use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::client::gate;
use crate::client::models::app_state::Route;
use crate::client::models::view_state::ViewState;
use crate::client::views::admin_bids::{BidSortKey, BidsAdminView};
use crate::client::views::admin_users::{UserAction, UserDetailView, UserFilter, UsersAdminView};
use crate::client::views::auth_forms::{LoginForm, RegisterForm};
use crate::client::views::case_detail::CaseDetailView;
use crate::client::views::case_form::CaseForm;
use crate::client::views::cases_list::{CaseFilter, CasesListView};
use crate::client::views::dashboard::DashboardView;
use crate::client::views::profile::ProfileForm;
use crate::client::views::{LoadOutcome, Screen, ViewContext};
use crate::common::error::FormError;
use crate::common::models::{BidId, BidStatus, CaseId, CaseStatus, Role, UserId};

const HELP: &str = "\
/login <email> <password>
/register <name> <email> <password> [client|lawyer]
/logout                               /me
/cases [status=..] [category=..] [window=today|week|month] [page=N] [search words]
/case <id>
/new_case <title> | <category> | <budget> | <description>
/edit_case <id> <title> | <category> | <budget> | <description>
/delete_case <id>                     /case_status <id> <open|in_progress|closed>
/bid <case_id> <amount> <message>
/accept <case_id> <bid_id>            /reject <case_id> <bid_id>
/dashboard
/users [role=..] [status=..] [page=N] [search]     /user <id>
/user_status <id> <verify|suspend|activate>
/bids [status=..] [sort=date|amount|lawyer|case] [page=N] [search]
/bid_status <bid_id> <accepted|rejected>
/profile [name <new name> | email <new email> | password <current> <new>]
/help  /quit";

/// Case fields typed as `title | category | budget | description`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseFields {
    pub title: String,
    pub category: String,
    pub budget: String,
    pub description: String,
}

/// `key=value` options plus free search text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListArgs {
    pub options: HashMap<String, String>,
    pub search: String,
}

impl ListArgs {
    fn page(&self) -> Result<usize, String> {
        match self.options.get("page") {
            None => Ok(1),
            Some(p) => p.parse().map_err(|_| format!("invalid page '{}'", p)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileArgs {
    Show,
    Name(String),
    Email(String),
    Password { current: String, new: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: String, password: String },
    Register { name: String, email: String, password: String, role: Role },
    Logout,
    Me,
    Cases(ListArgs),
    Case(CaseId),
    NewCase(CaseFields),
    EditCase(CaseId, CaseFields),
    DeleteCase(CaseId),
    CaseStatus(CaseId, CaseStatus),
    Bid { case_id: CaseId, amount: String, message: String },
    Accept { case_id: CaseId, bid_id: BidId },
    Reject { case_id: CaseId, bid_id: BidId },
    Dashboard,
    Users(ListArgs),
    User(UserId),
    UserStatus(UserId, UserAction),
    Bids(ListArgs),
    BidStatus(BidId, BidStatus),
    Profile(ProfileArgs),
    Help,
    Quit,
}

fn id_arg(raw: Option<&&str>, what: &str) -> Result<i64, String> {
    let raw = raw.ok_or_else(|| format!("missing {}", what))?;
    raw.parse().map_err(|_| format!("invalid {} '{}'", what, raw))
}

fn list_args(args: &[&str]) -> ListArgs {
    let mut out = ListArgs::default();
    let mut words = Vec::new();
    for arg in args {
        match arg.split_once('=') {
            Some((k, v)) if !k.is_empty() => {
                // multi-word values are typed with underscores, e.g. category=Real_Estate
                let v = if k == "category" { v.replace('_', " ") } else { v.to_string() };
                out.options.insert(k.to_ascii_lowercase(), v);
            }
            _ => words.push(*arg),
        }
    }
    out.search = words.join(" ");
    out
}

fn case_fields(rest: &str) -> Result<CaseFields, String> {
    let mut parts = rest.splitn(4, '|').map(str::trim);
    let mut next = || parts.next().unwrap_or("").to_string();
    let fields = CaseFields { title: next(), category: next(), budget: next(), description: next() };
    if fields.title.is_empty() {
        return Err("usage: <title> | <category> | <budget> | <description>".into());
    }
    Ok(fields)
}

/// Parses one input line. Unknown commands and bad arguments come back as a message.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();
    let cmd = match command {
        "/login" if args.len() == 2 => Command::Login { email: args[0].into(), password: args[1].into() },
        "/register" if args.len() >= 3 => {
            // name may contain spaces: the email is the first token with an '@'
            let at = args.iter().position(|a| a.contains('@')).ok_or("missing email")?;
            if at == 0 || at + 1 >= args.len() {
                return Err("usage: /register <name> <email> <password> [client|lawyer]".into());
            }
            let role = match args.get(at + 2) {
                Some(r) => r.parse::<Role>().map_err(|e| e.to_string())?,
                None => Role::Client,
            };
            Command::Register {
                name: args[..at].join(" "),
                email: args[at].into(),
                password: args[at + 1].into(),
                role,
            }
        }
        "/logout" => Command::Logout,
        "/me" => Command::Me,
        "/cases" => Command::Cases(list_args(&args)),
        "/case" => Command::Case(id_arg(args.first(), "case id")?),
        "/new_case" => Command::NewCase(case_fields(rest)?),
        "/edit_case" => {
            let id = id_arg(args.first(), "case id")?;
            let fields = rest.split_once(char::is_whitespace).map(|(_, f)| f).unwrap_or("");
            Command::EditCase(id, case_fields(fields)?)
        }
        "/delete_case" => Command::DeleteCase(id_arg(args.first(), "case id")?),
        "/case_status" if args.len() == 2 => Command::CaseStatus(id_arg(args.first(), "case id")?, args[1].parse()?),
        "/bid" if args.len() >= 3 => Command::Bid {
            case_id: id_arg(args.first(), "case id")?,
            amount: args[1].into(),
            message: args[2..].join(" "),
        },
        "/accept" | "/reject" if args.len() == 2 => {
            let case_id = id_arg(args.first(), "case id")?;
            let bid_id = id_arg(args.get(1), "bid id")?;
            if command == "/accept" {
                Command::Accept { case_id, bid_id }
            } else {
                Command::Reject { case_id, bid_id }
            }
        }
        "/dashboard" => Command::Dashboard,
        "/users" => Command::Users(list_args(&args)),
        "/user" => Command::User(id_arg(args.first(), "user id")?),
        "/user_status" if args.len() == 2 => {
            let action = match args[1].to_ascii_lowercase().as_str() {
                "verify" => UserAction::Verify,
                "suspend" => UserAction::Suspend,
                "activate" => UserAction::Activate,
                other => return Err(format!("unknown action '{}'", other)),
            };
            Command::UserStatus(id_arg(args.first(), "user id")?, action)
        }
        "/bids" => Command::Bids(list_args(&args)),
        "/bid_status" if args.len() == 2 => Command::BidStatus(id_arg(args.first(), "bid id")?, args[1].parse()?),
        "/profile" => match args.as_slice() {
            [] => Command::Profile(ProfileArgs::Show),
            ["name", name @ ..] if !name.is_empty() => Command::Profile(ProfileArgs::Name(name.join(" "))),
            ["email", email] => Command::Profile(ProfileArgs::Email(email.to_string())),
            ["password", current, new] => Command::Profile(ProfileArgs::Password {
                current: current.to_string(),
                new: new.to_string(),
            }),
            _ => return Err("usage: /profile [name <name> | email <email> | password <current> <new>]".into()),
        },
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ if command.starts_with('/') => return Err(format!("invalid syntax for {} (try /help)", command)),
        _ => return Err("commands start with '/', try /help".into()),
    };
    Ok(cmd)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

fn say(msg: impl std::fmt::Display) {
    println!("[ADVOSIA] {}", msg);
}

fn report(err: FormError) {
    match err {
        FormError::NotPermitted(to) => say(format!("Not allowed here, redirected to {}", to)),
        other => println!("[ADVOSIA][ERROR] {}", other),
    }
}

/// Prints what a guarded screen shows; returns the loaded value when there is one.
fn shown<'a, T>(screen: Screen<'a, T>) -> Option<&'a T> {
    match screen {
        Screen::Redirect(to) => {
            say(format!("Redirected to {}", to));
            None
        }
        Screen::Show(ViewState::Loaded(v)) => Some(v),
        Screen::Show(ViewState::Errored(e)) => {
            println!("[ADVOSIA][ERROR] {}", e);
            None
        }
        Screen::Show(_) => {
            say("Loading...");
            None
        }
    }
}

fn loaded(outcome: LoadOutcome) -> bool {
    !matches!(outcome, LoadOutcome::Redirect(_))
}

fn money(amount: Option<f64>, currency: &str) -> String {
    match amount {
        Some(a) => format!("{:.2} {}", a, currency),
        None => "-".to_string(),
    }
}

/// Interactive terminal front end over the view controllers.
pub struct Shell {
    ctx: ViewContext,
}

impl Shell {
    pub fn new(ctx: ViewContext) -> Self {
        Self { ctx }
    }

    fn prompt(&self) {
        let session = self.ctx.session();
        match &session.user {
            Some(u) => print!("{} ({})> ", u.name, u.role),
            None => print!("> "),
        }
        let _ = std::io::stdout().flush();
    }

    /// Reads commands until `/quit` or end of input.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) -> anyhow::Result<()> {
        say("Welcome to Advosia. Type /help for the list of commands.");
        let mut lines = input.lines();
        loop {
            self.prompt();
            let Some(line) = lines.next_line().await? else { break };
            if line.trim().is_empty() {
                continue;
            }
            match parse(&line) {
                Ok(cmd) => {
                    if self.execute(cmd).await == Flow::Quit {
                        break;
                    }
                }
                Err(msg) => println!("[ADVOSIA][ERROR] {}", msg),
            }
        }
        say("Bye");
        Ok(())
    }

    pub async fn execute(&mut self, cmd: Command) -> Flow {
        let ctx = self.ctx.clone();
        match cmd {
            Command::Help => println!("{}", HELP),
            Command::Quit => return Flow::Quit,
            Command::Login { email, password } => {
                let mut form = LoginForm::new(ctx);
                form.email = email;
                form.password = password;
                match form.submit().await {
                    Ok(to) => say(format!("Logged in, continue at {}", to)),
                    Err(e) => report(e),
                }
            }
            Command::Register { name, email, password, role } => {
                let mut form = RegisterForm::new(ctx);
                form.name = name;
                form.email = email;
                form.confirm_password = password.clone();
                form.password = password;
                form.role = role;
                match form.submit().await {
                    Ok(to) => say(format!("Account created, continue at {}", to)),
                    Err(e) => report(e),
                }
            }
            Command::Logout => {
                ctx.store().logout();
                say("Logged out");
            }
            Command::Me => match ctx.store().validate().await {
                Ok(Some(u)) => say(format!("#{} {} <{}> {}", u.id, u.name, u.email, u.role)),
                Ok(None) => say("Not logged in"),
                Err(e) => println!("[ADVOSIA][ERROR] {}", e),
            },
            Command::Cases(args) => self.cases(args).await,
            Command::Case(id) => self.case(id).await,
            Command::NewCase(fields) => {
                let mut form = if ctx.session().role() == Some(Role::Admin) {
                    CaseForm::admin_create(ctx)
                } else {
                    CaseForm::create(ctx)
                };
                fill(&mut form, fields);
                match form.submit().await {
                    Ok(to) => say(format!("Case saved: {}", to)),
                    Err(e) => report(e),
                }
            }
            Command::EditCase(id, fields) => match CaseForm::edit(ctx, id).await {
                Ok(mut form) => {
                    fill(&mut form, fields);
                    match form.submit().await {
                        Ok(to) => say(format!("Case saved: {}", to)),
                        Err(e) => report(e),
                    }
                }
                Err(e) => report(e),
            },
            Command::DeleteCase(id) => {
                let mut view = CaseDetailView::new(ctx, id);
                if loaded(view.load().await) && shown(view.render()).is_some() {
                    match view.delete().await {
                        Ok(to) => say(format!("Case deleted, back to {}", to)),
                        Err(e) => report(e),
                    }
                }
            }
            Command::CaseStatus(id, next) => {
                let mut view = CaseDetailView::new(ctx, id);
                if loaded(view.load().await) && shown(view.render()).is_some() {
                    match view.transition(next).await {
                        Ok(case) => say(format!("Case #{} is now {}", case.id, next)),
                        Err(e) => report(e),
                    }
                }
            }
            Command::Bid { case_id, amount, message } => {
                let mut view = CaseDetailView::new(ctx, case_id);
                if loaded(view.load().await) && shown(view.render()).is_some() {
                    view.bid_form.amount = amount;
                    view.bid_form.message = message;
                    match view.submit_bid().await {
                        Ok(bid) => say(format!("Bid #{} submitted ({})", bid.id, bid.status)),
                        Err(e) => report(e),
                    }
                }
            }
            Command::Accept { case_id, bid_id } => self.decide(case_id, bid_id, BidStatus::Accepted).await,
            Command::Reject { case_id, bid_id } => self.decide(case_id, bid_id, BidStatus::Rejected).await,
            Command::Dashboard => self.dashboard().await,
            Command::Users(args) => self.users(args).await,
            Command::User(id) => {
                let mut view = UserDetailView::new(ctx, id);
                view.load().await;
                if let Some(d) = shown(view.render()) {
                    let u = &d.user;
                    say(format!("#{} {} <{}> {} [{}]", u.id, u.name, u.email, u.role, u.status));
                    if let Some(s) = &u.specialization {
                        println!("  specialization: {}", s);
                    }
                    println!("  cases: {}", d.cases.len());
                    for c in &d.cases {
                        println!("  #{:<5} {:<12} {}", c.id, c.status, c.title);
                    }
                }
            }
            Command::UserStatus(id, action) => {
                let mut view = UsersAdminView::new(ctx);
                if loaded(view.load().await) && shown(view.render()).is_some() {
                    match view.apply(id, action).await {
                        Ok(u) => say(format!("{} is now {}", u.name, u.status)),
                        Err(e) => report(e),
                    }
                }
            }
            Command::Bids(args) => self.bids(args).await,
            Command::BidStatus(id, next) => {
                let mut view = BidsAdminView::new(ctx);
                if loaded(view.load().await) && shown(view.render()).is_some() {
                    match view.decide(id, next).await {
                        Ok(bid) => say(format!("Bid #{} {}", bid.id, bid.status)),
                        Err(e) => report(e),
                    }
                }
            }
            Command::Profile(args) => self.profile(args).await,
        }
        Flow::Continue
    }

    async fn cases(&mut self, args: ListArgs) {
        let mut filter = CaseFilter { search: args.search.clone(), ..Default::default() };
        let parsed = (|| -> Result<usize, String> {
            if let Some(s) = args.options.get("status") {
                filter.status = Some(s.parse()?);
            }
            if let Some(w) = args.options.get("window") {
                filter.window = w.parse()?;
            }
            filter.category = args.options.get("category").cloned();
            args.page()
        })();
        let page = match parsed {
            Ok(p) => p,
            Err(e) => return println!("[ADVOSIA][ERROR] {}", e),
        };
        let mut view = CasesListView::new(self.ctx.clone());
        view.load().await;
        if shown(view.render()).is_none() {
            return;
        }
        view.set_filter(filter);
        view.go_to_page(page);
        let empty = view.empty_message();
        view.with_page(|page| {
            if page.total == 0 {
                return say(empty);
            }
            for c in page.items {
                println!(
                    "#{:<5} {:<12} {:<22} {:>14}  {}",
                    c.id,
                    c.status,
                    c.category,
                    money(c.budget, &c.currency),
                    c.title
                );
            }
            say(format!("{} (page {}/{})", page.summary(), page.page, page.total_pages));
        });
    }

    async fn case(&mut self, id: CaseId) {
        let mut view = CaseDetailView::new(self.ctx.clone(), id);
        view.load().await;
        let Some(c) = shown(view.render()) else { return };
        say(format!("#{} {} [{}]", c.id, c.title, c.status));
        println!("  category: {}", c.category);
        println!("  budget:   {}", money(c.budget, &c.currency));
        println!("  posted:   {}", c.created_at.format("%Y-%m-%d %H:%M"));
        println!("  {}", c.description);
        if view.bids().is_empty() {
            println!("  no bids yet");
        }
        for b in view.bids() {
            println!(
                "  bid #{:<4} {:<9} {:>14}  {} <{}>: {}",
                b.id,
                b.status,
                money(Some(b.amount), &b.currency),
                b.lawyer_name,
                b.lawyer_email,
                b.message
            );
        }
        let mut actions = Vec::new();
        if view.can_bid() {
            actions.push("/bid");
        }
        if view.can_decide_bids() {
            actions.push("/accept /reject");
        }
        if view.can_manage() {
            actions.push("/edit_case /delete_case /case_status");
        }
        if !actions.is_empty() {
            println!("  actions: {}", actions.join(" "));
        }
    }

    async fn decide(&mut self, case_id: CaseId, bid_id: BidId, next: BidStatus) {
        let mut view = CaseDetailView::new(self.ctx.clone(), case_id);
        if loaded(view.load().await) && shown(view.render()).is_some() {
            match view.decide_bid(bid_id, next).await {
                Ok(bid) => say(format!("Bid #{} {}", bid.id, bid.status)),
                Err(e) => report(e),
            }
        }
    }

    async fn dashboard(&mut self) {
        let session = self.ctx.session();
        let mut view = if session.role() == Some(Role::Admin) {
            DashboardView::admin(self.ctx.clone())
        } else {
            DashboardView::new(self.ctx.clone())
        };
        view.load().await;
        let Some(d) = shown(view.render()) else { return };
        say(format!(
            "{} cases: {} open, {} in progress, {} closed",
            d.total, d.open, d.in_progress, d.closed
        ));
        println!("  open budget: {:.2}", d.open_budget);
        if let Some(users) = d.users {
            println!("  users: {}", users);
        }
        if let Some(pending) = d.pending_bids {
            println!("  pending bids: {}", pending);
        }
        for c in &d.recent {
            println!("  #{:<5} {:<12} {}", c.id, c.status, c.title);
        }
        let links: Vec<String> = gate::nav_links(&session).into_iter().map(|(n, r)| format!("{} {}", n, r)).collect();
        println!("  nav: {}", links.join(" | "));
    }

    async fn users(&mut self, args: ListArgs) {
        let mut filter = UserFilter { search: args.search.clone(), ..Default::default() };
        let parsed = (|| -> Result<usize, String> {
            if let Some(r) = args.options.get("role") {
                filter.role = Some(r.parse::<Role>().map_err(|e| e.to_string())?);
            }
            if let Some(s) = args.options.get("status") {
                filter.status = Some(s.parse()?);
            }
            args.page()
        })();
        let page = match parsed {
            Ok(p) => p,
            Err(e) => return println!("[ADVOSIA][ERROR] {}", e),
        };
        let mut view = UsersAdminView::new(self.ctx.clone());
        view.load().await;
        if shown(view.render()).is_none() {
            return;
        }
        view.set_filter(filter);
        view.pagination.page = page;
        view.with_page(|page| {
            for u in page.items {
                println!("#{:<5} {:<7} {:<10} {} <{}>", u.id, u.role, u.status, u.name, u.email);
            }
            say(page.summary());
        });
    }

    async fn bids(&mut self, args: ListArgs) {
        let mut view = BidsAdminView::new(self.ctx.clone());
        if let Some(s) = args.options.get("status") {
            match s.parse() {
                Ok(s) => view.set_status(Some(s)),
                Err(e) => return println!("[ADVOSIA][ERROR] {}", e),
            }
        }
        if let Some(key) = args.options.get("sort") {
            let key = match key.as_str() {
                "date" => BidSortKey::Date,
                "amount" => BidSortKey::Amount,
                "lawyer" => BidSortKey::Lawyer,
                "case" => BidSortKey::Case,
                other => return println!("[ADVOSIA][ERROR] unknown sort key '{}'", other),
            };
            view.sort_on(key);
        }
        view.set_search(args.search.clone());
        let page = match args.page() {
            Ok(p) => p,
            Err(e) => return println!("[ADVOSIA][ERROR] {}", e),
        };
        view.load().await;
        if shown(view.render()).is_none() {
            return;
        }
        view.go_to_page(page);
        let empty = view.empty_message();
        view.with_page(|page| {
            if page.total == 0 {
                return say(empty);
            }
            for b in page.items {
                println!(
                    "#{:<5} {:<9} {:>14}  {:<20} {}",
                    b.id,
                    b.status,
                    money(Some(b.amount), &b.currency),
                    b.lawyer_name,
                    b.case_title.as_deref().unwrap_or("-")
                );
            }
            say(page.summary());
        });
    }

    async fn profile(&mut self, args: ProfileArgs) {
        let mut form = ProfileForm::new(self.ctx.clone());
        match args {
            ProfileArgs::Show => {
                if let Err(e) = self.ctx.require(&Route::Profile) {
                    return report(e);
                }
                return say(format!("{} <{}>", form.name, form.email));
            }
            ProfileArgs::Name(name) => form.name = name,
            ProfileArgs::Email(email) => form.email = email,
            ProfileArgs::Password { current, new } => {
                form.current_password = current;
                form.confirm_password = new.clone();
                form.new_password = new;
            }
        }
        match form.submit().await {
            Ok(u) => say(format!("{} ({})", form.ui.notice.as_deref().unwrap_or("Saved"), u.name)),
            Err(e) => report(e),
        }
    }
}

fn fill(form: &mut CaseForm, fields: CaseFields) {
    form.title = fields.title;
    if !fields.category.is_empty() {
        form.category = fields.category;
    }
    form.budget = fields.budget;
    form.description = fields.description;
}
