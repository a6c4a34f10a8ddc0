//! Panel navigation and the application state behind it.
//!
//! [`Dashboard`] owns every piece of mutable state the front end has: the raw
//! and filtered payment rows, the cached user list and log page, the open
//! modals, and pending notices. Handlers take `&mut self`, so state changes
//! happen one at a time in the order the user triggered them.

pub mod modals;

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::engine::{self, FilterCriteria, GrandTotals};
use crate::gateway::{ApiError, Gateway, ImportOutcome, LogQuery, RiderOrder};
use crate::model::{DashboardStats, LogPage, PaymentRecord, Profile, UserRecord};
use crate::output::{self, ExportError, ExportFormat, PdfFonts};
use crate::session::{Session, SessionError, SessionStore};
use crate::view::{self, TableView};

use modals::{PasswordModal, ProfileModal, UserModal, UserModalMode};

pub const ADMINS_ONLY: &str = "Admins only";
pub const SESSION_EXPIRED: &str = "Session expired, please log in again";
pub const IMPORT_IN_PROGRESS: &str = "Import already in progress";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Panel {
    #[default]
    Dashboard,
    AdminPanel,
    Reports,
    Accounts,
}

impl Panel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "dashboard" | "home" => Some(Self::Dashboard),
            "admin" | "adminpanel" | "admin-panel" | "users" => Some(Self::AdminPanel),
            "reports" | "logs" => Some(Self::Reports),
            "accounts" | "account" | "profile" => Some(Self::Accounts),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::AdminPanel => "Admin Panel",
            Self::Reports => "Reports",
            Self::Accounts => "Accounts",
        }
    }

    pub fn requires_admin(self) -> bool {
        matches!(self, Self::AdminPanel | Self::Reports)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast: one line of feedback for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Loaded<T> {
    Idle,
    Ready(T),
    Failed(String),
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Loaded::Idle
    }
}

impl<T> Loaded<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Loaded::Ready(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadKind {
    Payments,
    Stats,
    Users,
    Logs,
    Profile,
}

impl LoadKind {
    /// Panel whose display the result feeds, if it is tied to one.
    fn panel(self) -> Option<Panel> {
        match self {
            LoadKind::Payments | LoadKind::Stats => None,
            LoadKind::Users => Some(Panel::AdminPanel),
            LoadKind::Logs => Some(Panel::Reports),
            LoadKind::Profile => Some(Panel::Accounts),
        }
    }
}

/// Issued when a load starts. A result is applied only if its ticket is still
/// the newest of its kind and, for panel-bound loads, that panel is showing.
///
/// The built-in loaders await with `&mut self` held, so they never see a
/// superseded ticket. The check is there for results handed to the
/// `apply_*` methods by callers that run requests themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    pub kind: LoadKind,
    pub generation: u64,
}

#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub panel: Panel,
    pub raw: Vec<PaymentRecord>,
    pub filtered: Vec<PaymentRecord>,
    pub criteria: FilterCriteria,
    pub order: RiderOrder,
    pub payments_loaded: bool,
    pub payments_error: Option<String>,
    pub stats: Loaded<DashboardStats>,
    pub users: Loaded<Vec<UserRecord>>,
    pub logs: Loaded<LogPage>,
    pub log_query: LogQuery,
    pub import_in_flight: bool,
    generations: HashMap<LoadKind, u64>,
}

pub struct Dashboard<G: Gateway> {
    gateway: G,
    session: Session,
    state: AppState,
    notices: Vec<Notice>,
    session_expired: bool,
    pub user_modal: UserModal,
    pub password_modal: PasswordModal,
    pub profile_modal: ProfileModal,
}

impl<G: Gateway> Dashboard<G> {
    pub fn new(gateway: G, session: Session) -> Self {
        Self {
            gateway,
            session,
            state: AppState::default(),
            notices: Vec::new(),
            session_expired: false,
            user_modal: UserModal::default(),
            password_modal: PasswordModal::default(),
            profile_modal: ProfileModal::default(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn panel(&self) -> Panel {
        self.state.panel
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Set once the API has answered 401; the caller should drop the session.
    pub fn session_expired(&self) -> bool {
        self.session_expired
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?level, %message, "notice");
        self.notices.push(Notice { level, message });
    }

    fn require_admin(&mut self) -> bool {
        if self.session.is_admin() {
            return true;
        }
        self.notify(NoticeLevel::Warning, ADMINS_ONLY);
        false
    }

    fn note_unauthorized(&mut self, err: &ApiError) -> bool {
        if !err.is_unauthorized() {
            return false;
        }
        if !self.session_expired {
            self.session_expired = true;
            self.notify(NoticeLevel::Error, SESSION_EXPIRED);
        }
        true
    }

    /// Read failures are logged and shown as a placeholder; only 401 speaks up.
    fn read_failed(&mut self, what: &str, err: &ApiError) -> String {
        if !self.note_unauthorized(err) {
            tracing::error!(error = %err, "failed to load {what}");
        }
        format!("Failed to load {what}: {}", err.user_message())
    }

    /// Write failures become an error notice carrying the server's detail.
    fn write_failed(&mut self, action: &str, err: &ApiError) {
        if self.note_unauthorized(err) {
            return;
        }
        tracing::warn!(error = %err, "{action} failed");
        let level = match err {
            ApiError::Forbidden { .. } => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        self.notify(level, format!("{action} failed: {}", err.user_message()));
    }

    pub fn begin_load(&mut self, kind: LoadKind) -> LoadTicket {
        let generation = self.state.generations.entry(kind).or_insert(0);
        *generation += 1;
        LoadTicket {
            kind,
            generation: *generation,
        }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        let latest = self
            .state
            .generations
            .get(&ticket.kind)
            .copied()
            .unwrap_or(0);
        if ticket.generation != latest {
            return false;
        }
        match ticket.kind.panel() {
            Some(panel) => self.state.panel == panel,
            None => true,
        }
    }

    fn accept(&self, ticket: LoadTicket) -> bool {
        let current = self.is_current(ticket);
        if !current {
            tracing::debug!(?ticket, panel = ?self.state.panel, "discarding stale response");
        }
        current
    }

    /// Switches panels, running the panel's load. Role-gated panels refuse
    /// non-admins with a warning and leave the current panel in place.
    pub async fn navigate(&mut self, target: Panel) -> bool {
        if target.requires_admin() && !self.require_admin() {
            tracing::info!(panel = target.label(), "navigation refused");
            return false;
        }
        tracing::info!(from = self.state.panel.label(), to = target.label(), "navigate");
        if target != Panel::Accounts {
            self.profile_modal.close();
        }
        self.state.panel = target;
        match target {
            Panel::Dashboard => {
                if !self.state.payments_loaded {
                    self.reload().await;
                }
            }
            Panel::AdminPanel => self.refresh_users().await,
            Panel::Reports => {
                let query = self.state.log_query.clone();
                self.load_logs(query).await;
            }
            Panel::Accounts => self.open_profile().await,
        }
        true
    }

    /// Reloads stats and the payment row set.
    pub async fn reload(&mut self) {
        self.load_stats().await;
        self.load_payments().await;
    }

    pub async fn load_stats(&mut self) {
        let ticket = self.begin_load(LoadKind::Stats);
        let stats = self.gateway.dashboard_stats().await;
        self.apply_stats(ticket, stats);
    }

    pub async fn load_payments(&mut self) {
        let ticket = self.begin_load(LoadKind::Payments);
        let rows = self
            .gateway
            .payments(self.session.role(), self.state.order)
            .await;
        self.apply_payments(ticket, rows);
    }

    /// Server-side row order used by the next payments load.
    pub fn set_order(&mut self, order: RiderOrder) {
        self.state.order = order;
    }

    pub fn apply_stats(
        &mut self,
        ticket: LoadTicket,
        result: Result<DashboardStats, ApiError>,
    ) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        match result {
            Ok(stats) => self.state.stats = Loaded::Ready(stats),
            Err(e) => {
                let message = self.read_failed("dashboard stats", &e);
                // the last good numbers stay on screen
                if self.state.stats.ready().is_none() {
                    self.state.stats = Loaded::Failed(message);
                }
            }
        }
        true
    }

    pub fn apply_payments(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<PaymentRecord>, ApiError>,
    ) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        match result {
            Ok(rows) => {
                tracing::info!(rows = rows.len(), "payments loaded");
                self.state.raw = rows;
                self.state.payments_loaded = true;
                self.state.payments_error = None;
                self.refilter();
            }
            Err(e) => {
                let message = self.read_failed("payments", &e);
                self.state.payments_error = Some(message);
            }
        }
        true
    }

    pub async fn refresh_users(&mut self) {
        let ticket = self.begin_load(LoadKind::Users);
        let users = self.gateway.list_users().await;
        self.apply_users(ticket, users);
    }

    pub fn apply_users(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<UserRecord>, ApiError>,
    ) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.state.users = match result {
            Ok(users) => Loaded::Ready(users),
            Err(e) => Loaded::Failed(self.read_failed("users", &e)),
        };
        true
    }

    /// Query used the next time the Reports panel is entered.
    pub fn set_log_query(&mut self, query: LogQuery) {
        self.state.log_query = query;
    }

    pub async fn load_logs(&mut self, query: LogQuery) {
        if !self.require_admin() {
            return;
        }
        self.state.log_query = query.clone();
        let ticket = self.begin_load(LoadKind::Logs);
        let page = self.gateway.list_logs(&query).await;
        self.apply_logs(ticket, page);
    }

    pub fn apply_logs(&mut self, ticket: LoadTicket, result: Result<LogPage, ApiError>) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.state.logs = match result {
            Ok(page) => Loaded::Ready(page),
            Err(e) => Loaded::Failed(self.read_failed("audit logs", &e)),
        };
        true
    }

    pub async fn open_profile(&mut self) {
        self.profile_modal.open();
        let ticket = self.begin_load(LoadKind::Profile);
        let profile = self.gateway.profile().await;
        self.apply_profile(ticket, profile);
    }

    pub fn apply_profile(&mut self, ticket: LoadTicket, result: Result<Profile, ApiError>) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.profile_modal.profile = match result {
            Ok(profile) => {
                if self.session.username.is_none() && !profile.username.is_empty() {
                    self.session.username = Some(profile.username.clone());
                }
                Loaded::Ready(profile)
            }
            Err(e) => Loaded::Failed(self.read_failed("profile", &e)),
        };
        true
    }

    fn refilter(&mut self) {
        self.state.filtered = engine::apply_filter(&self.state.raw, &self.state.criteria);
    }

    pub fn set_filter(&mut self, criteria: FilterCriteria) {
        self.state.criteria = criteria;
        self.refilter();
    }

    pub fn set_search(&mut self, term: &str) {
        let criteria = FilterCriteria {
            term: term.to_string(),
            ..self.state.criteria.clone()
        };
        self.set_filter(criteria);
    }

    pub fn set_date_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        let criteria = FilterCriteria {
            start,
            end,
            ..self.state.criteria.clone()
        };
        self.set_filter(criteria);
    }

    pub fn clear_filter(&mut self) {
        self.set_filter(FilterCriteria::default());
    }

    /// Rows on screen: the filtered set while a filter is active, else all rows.
    pub fn visible_rows(&self) -> &[PaymentRecord] {
        if self.state.criteria.is_empty() {
            &self.state.raw
        } else {
            &self.state.filtered
        }
    }

    pub fn grand_totals(&self) -> GrandTotals {
        engine::compute_grand_totals(self.visible_rows())
    }

    pub fn payments_view(&self) -> TableView {
        if !self.state.payments_loaded {
            if let Some(message) = self.state.payments_error.as_deref() {
                return view::payments_shell().failed(message);
            }
        }
        let totals = self.session.is_admin().then(|| self.grand_totals());
        view::payments_table(self.visible_rows(), totals.as_ref())
    }

    pub fn users_view(&self) -> TableView {
        match &self.state.users {
            Loaded::Ready(users) => view::users_table(users),
            Loaded::Failed(message) => view::users_shell().failed(message),
            Loaded::Idle => view::users_table(&[]),
        }
    }

    pub fn logs_view(&self) -> TableView {
        match &self.state.logs {
            Loaded::Ready(page) => view::logs_table(&page.logs),
            Loaded::Failed(message) => view::logs_shell().failed(message),
            Loaded::Idle => view::logs_table(&[]),
        }
    }

    /// Encodes the visible rows; an empty set yields a warning and no bytes.
    pub fn export(&mut self, format: ExportFormat, fonts: &PdfFonts) -> Option<Vec<u8>> {
        let result = output::export_payments(self.visible_rows(), format, fonts);
        match result {
            Ok(bytes) => Some(bytes),
            Err(ExportError::NoData) => {
                self.notify(NoticeLevel::Warning, output::NO_DATA_MESSAGE);
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "export failed");
                self.notify(NoticeLevel::Error, e.to_string());
                None
            }
        }
    }

    /// Claims the import slot; `false` while another import is running.
    pub fn try_begin_import(&mut self) -> bool {
        if self.state.import_in_flight {
            self.notify(NoticeLevel::Warning, IMPORT_IN_PROGRESS);
            return false;
        }
        self.state.import_in_flight = true;
        true
    }

    pub async fn import_data(&mut self) -> Option<ImportOutcome> {
        if !self.require_admin() || !self.try_begin_import() {
            return None;
        }
        let result = self.gateway.import_data().await;
        self.state.import_in_flight = false;
        match result {
            Ok(outcome) => {
                match &outcome {
                    ImportOutcome::Imported { message } => {
                        self.notify(NoticeLevel::Success, message.clone());
                        self.reload().await;
                    }
                    ImportOutcome::AlreadyImported { message } => {
                        self.notify(NoticeLevel::Info, message.clone());
                    }
                }
                Some(outcome)
            }
            Err(e) => {
                self.write_failed("Import", &e);
                None
            }
        }
    }

    pub fn open_create_user(&mut self) -> bool {
        if !self.require_admin() {
            return false;
        }
        self.user_modal.open_create();
        true
    }

    /// Opens the edit form for a listed user; unknown names get a warning.
    pub fn open_edit_user(&mut self, username: &str) -> bool {
        if !self.require_admin() {
            return false;
        }
        let found = self
            .state
            .users
            .ready()
            .and_then(|users| users.iter().find(|u| u.username == username))
            .cloned();
        match found {
            Some(user) => {
                self.user_modal.open_edit(&user);
                true
            }
            None => {
                self.notify(
                    NoticeLevel::Warning,
                    format!("User '{username}' is not in the list"),
                );
                false
            }
        }
    }

    pub async fn submit_user_modal(&mut self) -> bool {
        if !self.require_admin() {
            return false;
        }
        if let Err(message) = self.user_modal.validate() {
            self.notify(NoticeLevel::Warning, message);
            return false;
        }
        let draft = self.user_modal.draft.clone();
        let (action, result) = match self.user_modal.mode() {
            UserModalMode::Create => (
                "Create user",
                self.gateway
                    .register_user(draft.username.trim(), &draft.password, draft.role)
                    .await,
            ),
            UserModalMode::Edit => (
                "Update user",
                self.gateway
                    .update_user(draft.username.trim(), draft.role)
                    .await,
            ),
        };
        match result {
            Ok(message) => {
                self.user_modal.close();
                self.notify(NoticeLevel::Success, message);
                self.refresh_users().await;
                true
            }
            Err(e) => {
                self.write_failed(action, &e);
                false
            }
        }
    }

    pub async fn delete_user(&mut self, username: &str) -> bool {
        if !self.require_admin() {
            return false;
        }
        match self.gateway.delete_user(username).await {
            Ok(message) => {
                self.notify(NoticeLevel::Success, message);
                self.refresh_users().await;
                true
            }
            Err(e) => {
                self.write_failed("Delete user", &e);
                false
            }
        }
    }

    pub fn open_password_modal(&mut self) {
        self.password_modal.open();
    }

    pub async fn submit_password(&mut self) -> bool {
        if let Err(message) = self.password_modal.validate() {
            self.notify(NoticeLevel::Warning, message);
            return false;
        }
        let result = self
            .gateway
            .update_password(
                &self.password_modal.old_password,
                &self.password_modal.new_password,
            )
            .await;
        match result {
            Ok(message) => {
                self.password_modal.close();
                self.notify(NoticeLevel::Success, message);
                true
            }
            Err(e) => {
                self.write_failed("Password change", &e);
                false
            }
        }
    }
}

/// Logs out remotely if possible, then always drops the local session.
pub async fn sign_out<G: Gateway, S: SessionStore>(
    gateway: &G,
    store: &S,
    session: &Session,
) -> Result<(), SessionError> {
    if let Some(token) = session.token() {
        let refresh = session.refresh_token.as_deref().unwrap_or_default();
        if let Err(e) = gateway.logout(token, refresh).await {
            tracing::warn!(error = %e, "remote logout failed, clearing local session anyway");
        }
    }
    store.clear()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::Role;
    use crate::session::MemorySessionStore;
    use crate::tests::fake::FakeGateway;

    fn session(role: Role) -> Session {
        Session {
            access_token: "tok".to_string(),
            refresh_token: Some("ref".to_string()),
            role,
            username: Some("ops".to_string()),
        }
    }

    fn rows() -> Vec<PaymentRecord> {
        serde_json::from_value(json!([
            {"careem_captain_id": "C1", "name": "Ali", "doj": "2024-01-10", "net_salary": 100},
            {"careem_captain_id": "C2", "name": "Sara", "doj": "2024-02-15", "net_salary": "50.5"},
            {"careem_captain_id": "C3", "name": "Omar", "doj": "2024-03-20", "net_salary": null}
        ]))
        .unwrap()
    }

    fn levels(dash: &Dashboard<FakeGateway>) -> Vec<NoticeLevel> {
        dash.notices().iter().map(|n| n.level).collect()
    }

    #[test]
    fn panel_names_parse_loosely() {
        assert_eq!(Panel::parse(" Admin "), Some(Panel::AdminPanel));
        assert_eq!(Panel::parse("logs"), Some(Panel::Reports));
        assert_eq!(Panel::parse("nowhere"), None);
        assert!(!Panel::Accounts.requires_admin());
    }

    #[tokio::test]
    async fn non_admin_is_kept_out_of_admin_panel() {
        let mut dash = Dashboard::new(FakeGateway::default(), session(Role::User));
        assert!(!dash.navigate(Panel::AdminPanel).await);
        assert_eq!(dash.panel(), Panel::Dashboard);
        assert_eq!(dash.notices()[0].message, ADMINS_ONLY);
        assert!(!dash.gateway().calls().contains(&"list_users".to_string()));
    }

    #[tokio::test]
    async fn dashboard_load_picks_payment_route_by_role() {
        let mut dash = Dashboard::new(FakeGateway::with_rows(rows()), session(Role::User));
        dash.navigate(Panel::Dashboard).await;
        assert!(dash.gateway().calls().contains(&"payments:user".to_string()));
        assert_eq!(dash.visible_rows().len(), 3);
        assert!(dash.payments_view().footer.is_none());
    }

    #[tokio::test]
    async fn chosen_order_reaches_the_payments_request() {
        let mut dash = Dashboard::new(FakeGateway::with_rows(rows()), session(Role::Admin));
        dash.set_order(RiderOrder::Desc);
        dash.load_payments().await;
        assert_eq!(dash.gateway().calls(), vec!["payments:admin:desc".to_string()]);
    }

    #[tokio::test]
    async fn admin_sees_grand_totals_of_visible_rows() {
        let mut dash = Dashboard::new(FakeGateway::with_rows(rows()), session(Role::Admin));
        dash.reload().await;
        dash.set_search("sara");
        assert_eq!(dash.visible_rows().len(), 1);
        let totals = dash.grand_totals();
        assert!((totals.get(crate::model::NumericField::NetSalary) - 50.5).abs() < 1e-9);
        assert!(dash.payments_view().footer.is_some());

        dash.clear_filter();
        assert_eq!(dash.visible_rows().len(), 3);
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut dash = Dashboard::new(FakeGateway::default(), session(Role::Admin));
        let first = dash.begin_load(LoadKind::Payments);
        let second = dash.begin_load(LoadKind::Payments);
        assert!(dash.apply_payments(second, Ok(rows())));
        assert!(!dash.apply_payments(first, Ok(Vec::new())));
        assert_eq!(dash.state().raw.len(), 3);
    }

    #[test]
    fn panel_bound_load_is_dropped_after_leaving_the_panel() {
        let mut dash = Dashboard::new(FakeGateway::default(), session(Role::Admin));
        dash.state.panel = Panel::AdminPanel;
        let ticket = dash.begin_load(LoadKind::Users);
        dash.state.panel = Panel::Dashboard;
        assert!(!dash.apply_users(ticket, Ok(vec![UserRecord::default()])));
        assert_eq!(dash.state().users, Loaded::Idle);
    }

    #[tokio::test]
    async fn leaving_accounts_closes_the_profile() {
        let mut dash = Dashboard::new(FakeGateway::default(), session(Role::User));
        dash.navigate(Panel::Accounts).await;
        assert!(dash.profile_modal.is_open());
        assert!(dash.profile_modal.profile.ready().is_some());

        dash.navigate(Panel::Dashboard).await;
        assert!(!dash.profile_modal.is_open());
    }

    #[tokio::test]
    async fn stats_failure_keeps_previous_numbers() {
        let mut gateway = FakeGateway::default();
        gateway.stats.total_riders = Some(12);
        let mut dash = Dashboard::new(gateway, session(Role::Admin));
        dash.reload().await;
        let ticket = dash.begin_load(LoadKind::Stats);
        dash.apply_stats(
            ticket,
            Err(ApiError::Status {
                status: 500,
                detail: "boom".to_string(),
            }),
        );
        assert_eq!(
            dash.state().stats.ready().and_then(|s| s.total_riders),
            Some(12)
        );
    }

    #[tokio::test]
    async fn read_failure_shows_placeholder_without_toast() {
        let gateway = FakeGateway {
            fail_reads: true,
            ..Default::default()
        };
        let mut dash = Dashboard::new(gateway, session(Role::Admin));
        dash.navigate(Panel::AdminPanel).await;
        let view = dash.users_view();
        assert!(view
            .placeholder
            .as_deref()
            .is_some_and(|p| p.contains("database offline")));
        assert!(dash.notices().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_marks_session_expired_once() {
        let gateway = FakeGateway {
            unauthorized: true,
            ..Default::default()
        };
        let mut dash = Dashboard::new(gateway, session(Role::Admin));
        dash.reload().await;
        assert!(dash.session_expired());
        assert_eq!(levels(&dash), vec![NoticeLevel::Error]);
    }

    #[tokio::test]
    async fn second_import_is_refused_while_one_runs() {
        let mut dash = Dashboard::new(FakeGateway::default(), session(Role::Admin));
        assert!(dash.try_begin_import());
        assert!(dash.import_data().await.is_none());
        assert_eq!(dash.notices()[0].message, IMPORT_IN_PROGRESS);
        assert!(!dash.gateway().calls().contains(&"import_data".to_string()));
    }

    #[tokio::test]
    async fn already_imported_is_informational() {
        let gateway = FakeGateway {
            already_imported: true,
            ..Default::default()
        };
        let mut dash = Dashboard::new(gateway, session(Role::Admin));
        let outcome = dash.import_data().await;
        assert!(matches!(outcome, Some(ImportOutcome::AlreadyImported { .. })));
        assert_eq!(levels(&dash), vec![NoticeLevel::Info]);
        assert!(!dash.state().import_in_flight);
    }

    #[tokio::test]
    async fn failed_create_keeps_modal_and_draft() {
        let gateway = FakeGateway {
            fail_writes: true,
            ..Default::default()
        };
        let mut dash = Dashboard::new(gateway, session(Role::Admin));
        assert!(dash.open_create_user());
        dash.user_modal.draft.username = "dup".to_string();
        dash.user_modal.draft.password = "pw".to_string();
        assert!(!dash.submit_user_modal().await);
        assert!(dash.user_modal.is_open());
        assert_eq!(dash.user_modal.draft.username, "dup");
        assert!(dash.notices()[0].message.contains("Username already exists"));
    }

    #[tokio::test]
    async fn successful_edit_closes_modal_and_refreshes_users() {
        let gateway = FakeGateway {
            users: vec![UserRecord {
                username: "sam".to_string(),
                role: "user".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut dash = Dashboard::new(gateway, session(Role::Admin));
        dash.navigate(Panel::AdminPanel).await;
        assert!(dash.open_edit_user("sam"));
        dash.user_modal.draft.role = Role::Admin;
        assert!(dash.submit_user_modal().await);
        assert!(!dash.user_modal.is_open());
        let calls = dash.gateway().calls();
        assert!(calls.contains(&"update:sam:admin".to_string()));
        assert_eq!(calls.iter().filter(|c| *c == "list_users").count(), 2);
    }

    #[tokio::test]
    async fn password_mismatch_never_reaches_the_api() {
        let mut dash = Dashboard::new(FakeGateway::default(), session(Role::User));
        dash.open_password_modal();
        dash.password_modal.old_password = "a".to_string();
        dash.password_modal.new_password = "b".to_string();
        dash.password_modal.confirm_password = "x".to_string();
        assert!(!dash.submit_password().await);
        assert!(dash.password_modal.is_open());
        assert!(dash.gateway().calls().is_empty());
    }

    #[test]
    fn empty_export_warns_and_yields_nothing() {
        let mut dash = Dashboard::new(FakeGateway::default(), session(Role::Admin));
        assert!(dash
            .export(ExportFormat::Csv, &PdfFonts::default())
            .is_none());
        assert_eq!(dash.notices()[0].message, output::NO_DATA_MESSAGE);
        assert_eq!(dash.take_notices().len(), 1);
        assert!(dash.notices().is_empty());
    }

    #[tokio::test]
    async fn sign_out_clears_store_even_when_remote_fails() {
        let gateway = FakeGateway {
            fail_logout: true,
            ..Default::default()
        };
        let store = MemorySessionStore::new(Some(session(Role::Admin)));
        sign_out(&gateway, &store, &session(Role::Admin))
            .await
            .unwrap();
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(gateway.calls(), vec!["logout".to_string()]);
    }
}
