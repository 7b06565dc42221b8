// src/cli/state.rs
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::ListState;
use tokio::sync::watch;

use crate::cli::api::{self, Client};
use crate::cli::imaging::{self, Cropper, RECEIPT_MAX_SIDE};
use crate::cli::input::LineEdit;
use crate::cli::session::SessionStore;
use crate::cli::util::object_name;
use crate::cli::validate;
use crate::database::models::{Comment, Expense, Income, Profile, ProfileUpdate, Role, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Wallet,
    Expenses,
    Comments,
    Settings,
}

pub const TABS: [Tab; 5] = [Tab::Dashboard, Tab::Wallet, Tab::Expenses, Tab::Comments, Tab::Settings];

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Wallet => "Wallet",
            Self::Expenses => "Expenses",
            Self::Comments => "Comments",
            Self::Settings => "Settings",
        }
    }

    pub fn index(&self) -> usize {
        TABS.iter().position(|t| t == self).unwrap_or(0)
    }

    fn shifted(&self, delta: isize) -> Tab {
        let n = TABS.len() as isize;
        TABS[(self.index() as isize + delta).rem_euclid(n) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Email,
    Password,
}

pub struct AuthForm {
    pub email: LineEdit,
    pub password: LineEdit,
    pub focus: AuthField,
    pub sign_up: bool,
    pub loading: bool,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            email: LineEdit::default(),
            password: LineEdit::masked(),
            focus: AuthField::Email,
            sign_up: false,
            loading: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    Title,
    Amount,
    Receipt,
}

/// Add-expense / add-income form. `focus` is `Some` while typing.
#[derive(Default)]
pub struct EntryForm {
    pub title: LineEdit,
    pub amount: LineEdit,
    pub receipt: LineEdit,     // path to an image file, expenses only
    pub focus: Option<EntryField>,
    pub with_receipt: bool,
    pub saving: bool,
}

impl EntryForm {
    fn with_receipt() -> Self {
        Self { with_receipt: true, ..Default::default() }
    }

    fn field_mut(&mut self, f: EntryField) -> &mut LineEdit {
        match f {
            EntryField::Title => &mut self.title,
            EntryField::Amount => &mut self.amount,
            EntryField::Receipt => &mut self.receipt,
        }
    }

    fn next(&self, f: EntryField) -> EntryField {
        use EntryField::*;
        match (f, self.with_receipt) {
            (Title, _) => Amount,
            (Amount, true) => Receipt,
            (Amount, false) | (Receipt, _) => Title,
        }
    }

    fn prev(&self, f: EntryField) -> EntryField {
        use EntryField::*;
        match (f, self.with_receipt) {
            (Title, true) => Receipt,
            (Title, false) => Amount,
            (Amount, _) => Title,
            (Receipt, _) => Amount,
        }
    }

    fn clear(&mut self) {
        self.title.clear();
        self.amount.clear();
        self.receipt.clear();
        self.focus = None;
    }
}

#[derive(Default)]
pub struct CommentsPage {
    pub thread: Vec<Comment>,
    pub loaded_for: Option<i64>,
    pub draft: LineEdit,
    pub writing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Username,
    AvatarPath,
}

#[derive(Default)]
pub struct SettingsPage {
    pub username: LineEdit,
    pub avatar_path: LineEdit,
    pub editing: Option<SettingsField>,
    pub cropper: Option<Cropper>,
    pub uploading: bool,
}

/// Destructive actions wait for a yes/no.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    DeleteIncome(i64),
    DeleteExpense(i64),
}

impl Confirm {
    pub fn message(&self) -> &'static str {
        match self {
            Self::DeleteIncome(_) => "Delete this income? The balance will be reduced automatically.",
            Self::DeleteExpense(_) => "Delete this expense? Its amount returns to the balance.",
        }
    }
}

/// Slow calls run after the next frame so their busy flag is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    Auth,
    AddExpense,
    AddIncome,
    SaveAvatar,
}

pub struct App {
    pub api: Client,
    sessions: SessionStore,
    session_rx: watch::Receiver<Option<Session>>,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub auth: AuthForm,
    pub tab: Tab,
    pub balance: i64,
    pub expenses: Vec<Expense>,
    pub exp_sel: ListState,
    pub incomes: Vec<Income>,
    pub inc_sel: ListState,
    pub expense_form: EntryForm,
    pub income_form: EntryForm,
    pub detail: Option<Expense>,
    pub comments: CommentsPage,
    pub settings: SettingsPage,
    pub dark_mode: bool,
    pub alert: Option<String>,
    pub confirm: Option<Confirm>,
    pub pending: Option<Pending>,
    pub status: String,
    pub quit: bool,
}

impl App {
    pub fn new(api: Client, sessions: SessionStore) -> Self {
        let session_rx = sessions.subscribe();
        Self {
            api,
            sessions,
            session_rx,
            session: None,
            profile: None,
            auth: AuthForm::default(),
            tab: Tab::Dashboard,
            balance: 0,
            expenses: Vec::new(),
            exp_sel: ListState::default(),
            incomes: Vec::new(),
            inc_sel: ListState::default(),
            expense_form: EntryForm::with_receipt(),
            income_form: EntryForm::default(),
            detail: None,
            comments: CommentsPage::default(),
            settings: SettingsPage::default(),
            dark_mode: false,
            alert: None,
            confirm: None,
            pending: None,
            status: "1-5: switch tab | r: refresh | o: sign out | q: quit".into(),
            quit: false,
        }
    }

    pub fn role(&self) -> Role {
        self.profile.as_ref().map(|p| p.role).unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role().is_admin()
    }

    pub fn signed_in(&self) -> bool {
        self.session.is_some()
    }

    /// Blocking message; view state stays as it was.
    fn fail(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::warn!(%msg, "operation failed");
        self.alert = Some(msg);
    }

    // ============= session =============

    /// Restores the saved session if the platform still accepts it.
    pub async fn start(&mut self) {
        let Some(saved) = self.sessions.get_session() else { return };
        self.api.set_token(Some(saved.access_token.clone()));
        match self.api.current_user().await {
            Ok(_) => self.apply_session(Some(saved)).await,
            Err(e) if api::is_unauthorized(&e) => {
                tracing::info!(error = %e, "saved session rejected, signing out");
                self.api.set_token(None);
                if let Err(e) = self.sessions.set(None) {
                    self.fail(format!("Could not clear saved session: {e}"));
                }
            }
            // platform unreachable: stay signed in, `r` retries
            Err(e) => {
                self.session = Some(saved);
                self.fail(format!("Could not reach the platform: {e}"));
            }
        }
    }

    /// Reacts to sign-in / sign-out published by the session store.
    pub async fn sync_session(&mut self) {
        if !self.session_rx.has_changed().unwrap_or(false) {
            return;
        }
        let session = self.session_rx.borrow_and_update().clone();
        self.apply_session(session).await;
    }

    async fn apply_session(&mut self, session: Option<Session>) {
        self.api.set_token(session.as_ref().map(|s| s.access_token.clone()));
        self.session = session;

        if self.session.is_some() {
            self.fetch_profile().await;
            self.refresh_tab().await;
        } else {
            self.profile = None;
            self.balance = 0;
            self.expenses.clear();
            self.incomes.clear();
            self.exp_sel.select(None);
            self.inc_sel.select(None);
            self.comments = CommentsPage::default();
            self.settings = SettingsPage::default();
            self.expense_form.clear();
            self.income_form.clear();
            self.detail = None;
            self.tab = Tab::Dashboard;
        }
    }

    async fn fetch_profile(&mut self) {
        match self.api.my_profile().await {
            Ok(p) => self.profile = Some(p),
            Err(e) => self.fail(format!("Could not load profile: {e}")),
        }
    }

    async fn sign_out(&mut self) {
        if let Err(e) = self.api.sign_out().await {
            tracing::warn!(error = %e, "platform sign-out failed");
        }
        if let Err(e) = self.sessions.set(None) {
            self.fail(format!("Could not clear saved session: {e}"));
        }
    }

    // ============= data =============

    pub async fn refresh_wallet(&mut self) {
        match self.api.wallet().await {
            Ok(w) => self.balance = w.current_balance,
            Err(e) => self.fail(format!("Could not load balance: {e}")),
        }
    }

    pub async fn refresh_expenses(&mut self) {
        match self.api.list_expenses().await {
            Ok(rows) => {
                self.expenses = rows;
                clamp_sel(&mut self.exp_sel, self.expenses.len());
            }
            Err(e) => self.fail(format!("Could not load expenses: {e}")),
        }
    }

    pub async fn refresh_incomes(&mut self) {
        match self.api.list_incomes().await {
            Ok(rows) => {
                self.incomes = rows;
                clamp_sel(&mut self.inc_sel, self.incomes.len());
            }
            Err(e) => self.fail(format!("Could not load incomes: {e}")),
        }
    }

    pub async fn refresh_comments(&mut self) {
        let Some(id) = self.selected_expense().map(|e| e.id) else {
            self.comments.thread.clear();
            self.comments.loaded_for = None;
            return;
        };
        match self.api.list_comments(id).await {
            Ok(rows) => {
                self.comments.thread = rows;
                self.comments.loaded_for = Some(id);
            }
            Err(e) => {
                self.comments.thread.clear();
                self.comments.loaded_for = None;
                self.fail(format!("Could not load comments: {e}"));
            }
        }
    }

    /// The thread on screen, but only if it belongs to the selected expense.
    pub fn visible_thread(&self) -> Option<&[Comment]> {
        let selected = self.selected_expense()?.id;
        (self.comments.loaded_for == Some(selected)).then_some(self.comments.thread.as_slice())
    }

    /// Balance and expenses are reloaded on every tab change, plus whatever
    /// the tab itself shows.
    pub async fn refresh_tab(&mut self) {
        self.refresh_wallet().await;
        self.refresh_expenses().await;
        match self.tab {
            Tab::Wallet => self.refresh_incomes().await,
            Tab::Comments => self.refresh_comments().await,
            _ => {}
        }
    }

    async fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.refresh_tab().await;
    }

    pub fn selected_expense(&self) -> Option<&Expense> {
        self.exp_sel.selected().and_then(|i| self.expenses.get(i))
    }

    pub fn selected_income(&self) -> Option<&Income> {
        self.inc_sel.selected().and_then(|i| self.incomes.get(i))
    }

    // ============= keys =============

    pub async fn handle_key(&mut self, k: KeyEvent) {
        if k.kind != KeyEventKind::Press {
            return;
        }
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }
        if self.alert.is_some() {
            if matches!(k.code, KeyCode::Enter | KeyCode::Esc) {
                self.alert = None;
            }
            return;
        }
        if let Some(action) = self.confirm {
            match k.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.confirm = None;
                    self.run_confirmed(action).await;
                }
                KeyCode::Char('n') | KeyCode::Esc => self.confirm = None,
                _ => {}
            }
            return;
        }
        if self.pending.is_some() {
            return;
        }
        if !self.signed_in() {
            self.handle_auth_key(k);
            return;
        }
        if self.detail.is_some() {
            if matches!(k.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('b')) {
                self.detail = None;
            }
            return;
        }
        if self.settings.cropper.is_some() {
            self.handle_cropper_key(k);
            return;
        }
        if self.is_typing() {
            self.handle_typing_key(k).await;
            return;
        }

        match k.code {
            KeyCode::Char('q') => {
                self.quit = true;
                return;
            }
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.set_tab(TABS[idx]).await;
                return;
            }
            KeyCode::Left => {
                self.set_tab(self.tab.shifted(-1)).await;
                return;
            }
            KeyCode::Right => {
                self.set_tab(self.tab.shifted(1)).await;
                return;
            }
            KeyCode::Char('r') => {
                if self.profile.is_none() {
                    self.fetch_profile().await;
                }
                self.refresh_tab().await;
                return;
            }
            KeyCode::Char('o') => {
                self.sign_out().await;
                return;
            }
            _ => {}
        }

        match self.tab {
            Tab::Dashboard => self.handle_dashboard_key(k).await,
            Tab::Wallet => self.handle_wallet_key(k),
            Tab::Expenses => self.handle_expenses_key(k).await,
            Tab::Comments => self.handle_comments_key(k).await,
            Tab::Settings => self.handle_settings_key(k),
        }
    }

    fn is_typing(&self) -> bool {
        self.expense_form.focus.is_some()
            || self.income_form.focus.is_some()
            || self.comments.writing
            || self.settings.editing.is_some()
    }

    fn handle_auth_key(&mut self, k: KeyEvent) {
        let form = &mut self.auth;
        match k.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::F(2) => form.sign_up = !form.sign_up,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                form.focus = match form.focus {
                    AuthField::Email => AuthField::Password,
                    AuthField::Password => AuthField::Email,
                };
            }
            KeyCode::Enter => {
                if form.email.value.trim().is_empty() || form.password.value.is_empty() {
                    self.fail("Email and password are required");
                } else {
                    form.loading = true;
                    self.pending = Some(Pending::Auth);
                }
            }
            code => {
                let field = match form.focus {
                    AuthField::Email => &mut form.email,
                    AuthField::Password => &mut form.password,
                };
                field.handle_key(code);
            }
        }
    }

    async fn handle_typing_key(&mut self, k: KeyEvent) {
        let admin = self.is_admin();

        if let Some(field) = self.expense_form.focus {
            match k.code {
                KeyCode::Esc => self.expense_form.focus = None,
                KeyCode::Tab => self.expense_form.focus = Some(self.expense_form.next(field)),
                KeyCode::BackTab => self.expense_form.focus = Some(self.expense_form.prev(field)),
                KeyCode::Enter if admin => self.pending = Some(Pending::AddExpense),
                code => {
                    self.expense_form.field_mut(field).handle_key(code);
                }
            }
            return;
        }

        if let Some(field) = self.income_form.focus {
            match k.code {
                KeyCode::Esc => self.income_form.focus = None,
                KeyCode::Tab => self.income_form.focus = Some(self.income_form.next(field)),
                KeyCode::BackTab => self.income_form.focus = Some(self.income_form.prev(field)),
                KeyCode::Enter if admin => self.pending = Some(Pending::AddIncome),
                code => {
                    self.income_form.field_mut(field).handle_key(code);
                }
            }
            return;
        }

        if self.comments.writing {
            match k.code {
                KeyCode::Esc => self.comments.writing = false,
                KeyCode::Enter => self.submit_comment().await,
                code => {
                    self.comments.draft.handle_key(code);
                }
            }
            return;
        }

        if let Some(field) = self.settings.editing {
            match (k.code, field) {
                (KeyCode::Esc, _) => self.settings.editing = None,
                (KeyCode::Enter, SettingsField::Username) => self.save_username().await,
                (KeyCode::Enter, SettingsField::AvatarPath) => self.open_cropper().await,
                (code, SettingsField::Username) => {
                    self.settings.username.handle_key(code);
                }
                (code, SettingsField::AvatarPath) => {
                    self.settings.avatar_path.handle_key(code);
                }
            }
        }
    }

    async fn handle_dashboard_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Up => move_sel(&mut self.exp_sel, self.expenses.len(), -1),
            KeyCode::Down => move_sel(&mut self.exp_sel, self.expenses.len(), 1),
            KeyCode::Char('a') if self.is_admin() => {
                self.expense_form.focus = Some(EntryField::Title);
            }
            // viewers jump straight to the thread of the selected expense
            KeyCode::Char('c') if !self.is_admin() && self.selected_expense().is_some() => {
                self.set_tab(Tab::Comments).await;
            }
            _ => {}
        }
    }

    fn handle_wallet_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Up => move_sel(&mut self.inc_sel, self.incomes.len(), -1),
            KeyCode::Down => move_sel(&mut self.inc_sel, self.incomes.len(), 1),
            KeyCode::Char('a') if self.is_admin() => {
                self.income_form.focus = Some(EntryField::Title);
            }
            KeyCode::Char('x') | KeyCode::Delete if self.is_admin() => {
                if let Some(id) = self.selected_income().map(|i| i.id) {
                    self.confirm = Some(Confirm::DeleteIncome(id));
                }
            }
            _ => {}
        }
    }

    async fn handle_expenses_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Up => move_sel(&mut self.exp_sel, self.expenses.len(), -1),
            KeyCode::Down => move_sel(&mut self.exp_sel, self.expenses.len(), 1),
            KeyCode::Enter => self.detail = self.selected_expense().cloned(),
            KeyCode::Char('c') if self.selected_expense().is_some() => {
                self.set_tab(Tab::Comments).await;
            }
            KeyCode::Char('x') | KeyCode::Delete if self.is_admin() => {
                if let Some(id) = self.selected_expense().map(|e| e.id) {
                    self.confirm = Some(Confirm::DeleteExpense(id));
                }
            }
            _ => {}
        }
    }

    async fn handle_comments_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Up => {
                move_sel(&mut self.exp_sel, self.expenses.len(), -1);
                self.refresh_comments().await;
            }
            KeyCode::Down => {
                move_sel(&mut self.exp_sel, self.expenses.len(), 1);
                self.refresh_comments().await;
            }
            KeyCode::Char('w') | KeyCode::Enter if self.selected_expense().is_some() => {
                self.comments.writing = true;
            }
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, k: KeyEvent) {
        match k.code {
            KeyCode::Char('d') => self.dark_mode = !self.dark_mode,
            KeyCode::Char('n') => {
                let current = self
                    .profile
                    .as_ref()
                    .and_then(|p| p.username.clone())
                    .unwrap_or_default();
                self.settings.username.set(current);
                self.settings.editing = Some(SettingsField::Username);
            }
            KeyCode::Char('p') => self.settings.editing = Some(SettingsField::AvatarPath),
            _ => {}
        }
    }

    fn handle_cropper_key(&mut self, k: KeyEvent) {
        let Some(cropper) = self.settings.cropper.as_mut() else { return };
        const PAN_STEP: f32 = 0.1;
        match k.code {
            KeyCode::Left => cropper.pan_by(-PAN_STEP, 0.0),
            KeyCode::Right => cropper.pan_by(PAN_STEP, 0.0),
            KeyCode::Up => cropper.pan_by(0.0, -PAN_STEP),
            KeyCode::Down => cropper.pan_by(0.0, PAN_STEP),
            KeyCode::Char('+') | KeyCode::Char('=') => cropper.zoom_by(0.1),
            KeyCode::Char('-') => cropper.zoom_by(-0.1),
            KeyCode::Enter => {
                self.settings.uploading = true;
                self.pending = Some(Pending::SaveAvatar);
            }
            KeyCode::Esc => {
                self.settings.cropper = None;
                self.settings.avatar_path.clear();
            }
            _ => {}
        }
    }

    // ============= actions =============

    pub async fn run_pending(&mut self) {
        let Some(pending) = self.pending.take() else { return };
        match pending {
            Pending::Auth => self.submit_auth().await,
            Pending::AddExpense => self.submit_expense().await,
            Pending::AddIncome => self.submit_income().await,
            Pending::SaveAvatar => self.save_avatar().await,
        }
    }

    async fn submit_auth(&mut self) {
        let email = self.auth.email.value.trim().to_string();
        let password = self.auth.password.value.clone();

        if self.auth.sign_up {
            match self.api.sign_up(&email, &password).await {
                Ok(_) => {
                    self.alert = Some("Registration successful! Please sign in.".into());
                    self.auth.sign_up = false;
                }
                Err(e) => self.fail(format!("Sign-up failed: {e}")),
            }
        } else {
            match self.api.sign_in(&email, &password).await {
                Ok(session) => {
                    self.auth.password.clear();
                    if let Err(e) = self.sessions.set(Some(session)) {
                        self.fail(format!("Could not save session: {e}"));
                    }
                }
                Err(e) => self.fail(format!("Sign-in failed: {e}")),
            }
        }
        self.auth.loading = false;
    }

    async fn submit_expense(&mut self) {
        let checked = validate::validate_expense(
            self.role(),
            &self.expense_form.title.value,
            &self.expense_form.amount.value,
            self.balance,
        );
        let mut expense = match checked {
            Ok(e) => e,
            Err(e) => return self.fail(e.to_string()),
        };

        self.expense_form.saving = true;
        let receipt = self.expense_form.receipt.value.trim().to_string();
        if !receipt.is_empty() {
            match self.upload_receipt(&receipt).await {
                Ok(url) => expense.image_url = Some(url),
                Err(e) => {
                    self.expense_form.saving = false;
                    return self.fail(format!("Receipt upload failed: {e}"));
                }
            }
        }

        match self.api.create_expense(&expense).await {
            Ok(saved) => {
                tracing::info!(expense_id = saved.id, "expense saved");
                self.alert = Some("Saved!".into());
                self.expense_form.clear();
                self.refresh_wallet().await;
                self.refresh_expenses().await;
            }
            Err(e) => self.fail(e.to_string()),
        }
        self.expense_form.saving = false;
    }

    async fn upload_receipt(&self, path: &str) -> anyhow::Result<String> {
        let raw = tokio::fs::read(path).await?;
        let jpeg = imaging::resize_to_jpeg(&raw, RECEIPT_MAX_SIDE)?;
        let user_id = self.session.as_ref().map(|s| s.user.id.as_str()).unwrap_or("anon");
        self.api
            .upload_jpeg("receipts", &object_name(user_id, Utc::now()), jpeg)
            .await
    }

    async fn submit_income(&mut self) {
        let checked = validate::validate_income(
            self.role(),
            &self.income_form.title.value,
            &self.income_form.amount.value,
        );
        let income = match checked {
            Ok(i) => i,
            Err(e) => return self.fail(e.to_string()),
        };

        self.income_form.saving = true;
        match self.api.create_income(&income).await {
            Ok(_) => {
                self.income_form.clear();
                self.refresh_incomes().await;
                self.refresh_wallet().await;
                self.alert = Some("Balance topped up!".into());
            }
            Err(e) => self.fail(e.to_string()),
        }
        self.income_form.saving = false;
    }

    async fn run_confirmed(&mut self, action: Confirm) {
        if !self.is_admin() {
            return;
        }
        match action {
            Confirm::DeleteIncome(id) => match self.api.delete_income(id).await {
                Ok(()) => {
                    self.refresh_incomes().await;
                    self.refresh_wallet().await;
                }
                Err(e) => self.fail(format!("Delete failed: {e}")),
            },
            Confirm::DeleteExpense(id) => match self.api.delete_expense(id).await {
                Ok(()) => {
                    self.refresh_expenses().await;
                    self.refresh_wallet().await;
                }
                Err(e) => self.fail(format!("Delete failed: {e}")),
            },
        }
    }

    async fn submit_comment(&mut self) {
        let Some(expense_id) = self.selected_expense().map(|e| e.id) else { return };
        let comment = match validate::validate_comment(&self.comments.draft.value) {
            Ok(c) => c,
            Err(e) => return self.fail(e.to_string()),
        };
        match self.api.create_comment(expense_id, &comment).await {
            Ok(_) => {
                self.comments.draft.clear();
                self.comments.writing = false;
                self.refresh_comments().await;
            }
            Err(e) => self.fail(format!("Could not send comment: {e}")),
        }
    }

    async fn save_username(&mut self) {
        let update = ProfileUpdate {
            username: Some(self.settings.username.value.trim().to_string()),
            avatar_url: None,
        };
        match self.api.update_profile(&update).await {
            Ok(p) => {
                self.profile = Some(p);
                self.settings.editing = None;
            }
            Err(e) => self.fail(format!("Could not update name: {e}")),
        }
    }

    async fn open_cropper(&mut self) {
        let path = self.settings.avatar_path.value.trim().to_string();
        if path.is_empty() {
            return self.fail("Enter the path of an image file");
        }
        let loaded = match tokio::fs::read(&path).await {
            Ok(raw) => imaging::decode(&raw),
            Err(e) => Err(e.into()),
        };
        match loaded {
            Ok(img) => {
                self.settings.cropper = Some(Cropper::new(img));
                self.settings.editing = None;
            }
            Err(e) => self.fail(format!("Cannot open {path}: {e}")),
        }
    }

    async fn save_avatar(&mut self) {
        let result = self.upload_avatar().await;
        self.settings.uploading = false;
        match result {
            Ok(profile) => {
                self.profile = Some(profile);
                self.settings.cropper = None;
                self.settings.avatar_path.clear();
                self.alert = Some("Profile photo updated!".into());
            }
            Err(e) => self.fail(format!("Upload failed: {e}")),
        }
    }

    async fn upload_avatar(&self) -> anyhow::Result<Profile> {
        let cropper = self
            .settings
            .cropper
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no image selected"))?;
        let jpeg = cropper.render()?;
        let user_id = self.session.as_ref().map(|s| s.user.id.as_str()).unwrap_or("anon");
        let url = self
            .api
            .upload_jpeg("avatars", &object_name(user_id, Utc::now()), jpeg)
            .await?;
        let update = ProfileUpdate { username: None, avatar_url: Some(url) };
        self.api.update_profile(&update).await
    }
}

fn move_sel(sel: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        sel.select(None);
        return;
    }
    let cur = sel.selected().unwrap_or(0) as isize;
    let next = (cur + delta).rem_euclid(len as isize) as usize;
    sel.select(Some(next));
}

fn clamp_sel(sel: &mut ListState, len: usize) {
    match (len, sel.selected()) {
        (0, _) => sel.select(None),
        (_, None) => sel.select(Some(0)),
        (n, Some(i)) if i >= n => sel.select(Some(n - 1)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::User;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionStore::load(dir.path().join("session.json"));
        // nothing listens here; these tests never reach the network
        (App::new(Client::new("http://127.0.0.1:9"), sessions), dir)
    }

    fn signed_in(app: &mut App, role: Role) {
        app.session = Some(saved_session());
        app.profile = Some(Profile {
            id: "u1".into(),
            email: "ani@example.com".into(),
            username: None,
            role,
            avatar_url: None,
        });
    }

    #[test]
    fn tabs_wrap_around() {
        assert_eq!(Tab::Dashboard.shifted(-1), Tab::Settings);
        assert_eq!(Tab::Settings.shifted(1), Tab::Dashboard);
        assert_eq!(Tab::Comments.index(), 3);
    }

    #[test]
    fn selection_helpers() {
        let mut sel = ListState::default();
        move_sel(&mut sel, 3, -1);
        assert_eq!(sel.selected(), Some(2));
        clamp_sel(&mut sel, 2);
        assert_eq!(sel.selected(), Some(1));
        clamp_sel(&mut sel, 0);
        assert_eq!(sel.selected(), None);
    }

    #[test]
    fn entry_form_cycles_its_fields() {
        let f = EntryForm::with_receipt();
        assert_eq!(f.next(EntryField::Amount), EntryField::Receipt);
        assert_eq!(f.prev(EntryField::Title), EntryField::Receipt);
        let f = EntryForm::default();
        assert_eq!(f.next(EntryField::Amount), EntryField::Title);
    }

    #[tokio::test]
    async fn auth_screen_types_and_toggles() {
        let (mut app, _dir) = app();
        for c in "ani@x.id".chars() {
            app.handle_key(key(KeyCode::Char(c))).await;
        }
        app.handle_key(key(KeyCode::Tab)).await;
        for c in "secret".chars() {
            app.handle_key(key(KeyCode::Char(c))).await;
        }
        assert_eq!(app.auth.email.value, "ani@x.id");
        assert_eq!(app.auth.password.rendered(), "******");

        app.handle_key(key(KeyCode::F(2))).await;
        assert!(app.auth.sign_up);

        app.handle_key(key(KeyCode::Enter)).await;
        assert!(app.auth.loading);
        assert_eq!(app.pending, Some(Pending::Auth));
    }

    #[tokio::test]
    async fn empty_credentials_raise_an_alert() {
        let (mut app, _dir) = app();
        app.handle_key(key(KeyCode::Enter)).await;
        assert!(app.alert.is_some());
        assert_eq!(app.pending, None);
        // the alert swallows keys until dismissed
        app.handle_key(key(KeyCode::Char('x'))).await;
        assert_eq!(app.auth.email.value, "");
        app.handle_key(key(KeyCode::Esc)).await;
        assert!(app.alert.is_none());
    }

    #[tokio::test]
    async fn viewers_get_no_mutation_controls() {
        let (mut app, _dir) = app();
        signed_in(&mut app, Role::User);
        app.handle_key(key(KeyCode::Char('a'))).await;
        assert_eq!(app.expense_form.focus, None);

        app.tab = Tab::Wallet;
        app.incomes = vec![Income {
            id: 7,
            source: "Salary".into(),
            amount: 10,
            created_by: None,
            created_at: Utc::now(),
        }];
        app.inc_sel.select(Some(0));
        app.handle_key(key(KeyCode::Char('a'))).await;
        app.handle_key(key(KeyCode::Char('x'))).await;
        assert_eq!(app.income_form.focus, None);
        assert_eq!(app.confirm, None);
    }

    #[tokio::test]
    async fn admins_can_open_forms_and_confirm_deletes() {
        let (mut app, _dir) = app();
        signed_in(&mut app, Role::Admin);
        app.handle_key(key(KeyCode::Char('a'))).await;
        assert_eq!(app.expense_form.focus, Some(EntryField::Title));
        for c in "Rice".chars() {
            app.handle_key(key(KeyCode::Char(c))).await;
        }
        app.handle_key(key(KeyCode::Tab)).await;
        app.handle_key(key(KeyCode::Char('5'))).await;
        assert_eq!(app.expense_form.title.value, "Rice");
        assert_eq!(app.expense_form.amount.value, "5");
        app.handle_key(key(KeyCode::Esc)).await;

        app.tab = Tab::Wallet;
        app.incomes = vec![Income {
            id: 7,
            source: "Salary".into(),
            amount: 10,
            created_by: None,
            created_at: Utc::now(),
        }];
        app.inc_sel.select(Some(0));
        app.handle_key(key(KeyCode::Char('x'))).await;
        assert_eq!(app.confirm, Some(Confirm::DeleteIncome(7)));
        app.handle_key(key(KeyCode::Char('n'))).await;
        assert_eq!(app.confirm, None);
    }

    #[tokio::test]
    async fn invalid_expense_never_leaves_the_client() {
        let (mut app, _dir) = app();
        signed_in(&mut app, Role::Admin);
        app.balance = 100;
        app.expense_form.title.set("TV");
        app.expense_form.amount.set("0");
        app.pending = Some(Pending::AddExpense);
        app.run_pending().await;
        assert_eq!(app.alert.as_deref(), Some("Amount must be greater than 0!"));
        // form is left as typed
        assert_eq!(app.expense_form.title.value, "TV");

        app.alert = None;
        app.expense_form.amount.set("500");
        app.pending = Some(Pending::AddExpense);
        app.run_pending().await;
        assert_eq!(app.alert.as_deref(), Some("Insufficient balance: only Rp 100 left"));
    }

    #[tokio::test]
    async fn settings_toggle_dark_mode() {
        let (mut app, _dir) = app();
        signed_in(&mut app, Role::User);
        app.tab = Tab::Settings;
        app.handle_key(key(KeyCode::Char('d'))).await;
        assert!(app.dark_mode);
        app.handle_key(key(KeyCode::Char('p'))).await;
        assert_eq!(app.settings.editing, Some(SettingsField::AvatarPath));
    }

    fn saved_session() -> Session {
        Session {
            access_token: "t".into(),
            user: User { id: "u1".into(), email: "ani@example.com".into() },
        }
    }

    #[tokio::test]
    async fn unreachable_platform_keeps_the_saved_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        SessionStore::load(&path).set(Some(saved_session())).unwrap();

        let mut app = App::new(Client::new("http://127.0.0.1:9"), SessionStore::load(&path));
        app.start().await;

        assert!(path.exists());
        assert!(app.signed_in());
        assert!(app.alert.as_deref().unwrap_or("").starts_with("Could not reach the platform"));
    }

    #[tokio::test]
    async fn cancelling_the_cropper_drops_the_image() {
        let (mut app, _dir) = app();
        signed_in(&mut app, Role::User);
        app.tab = Tab::Settings;
        app.settings.avatar_path.set("/tmp/me.png");
        app.settings.cropper = Some(Cropper::new(image::DynamicImage::ImageRgb8(
            image::RgbImage::new(40, 20),
        )));

        app.handle_key(key(KeyCode::Char('+'))).await;
        assert_eq!(app.settings.cropper.as_ref().map(|c| c.zoom), Some(1.1));

        app.handle_key(key(KeyCode::Esc)).await;
        assert!(app.settings.cropper.is_none());
        assert_eq!(app.settings.avatar_path.value, "");
        assert_eq!(app.pending, None);
    }

    #[tokio::test]
    async fn thread_is_shown_only_under_its_expense() {
        let (mut app, _dir) = app();
        signed_in(&mut app, Role::User);
        let exp = |id: i64| Expense {
            id,
            title: format!("E{id}"),
            amount: 10,
            image_url: None,
            created_by: None,
            created_at: Utc::now(),
        };
        app.expenses = vec![exp(1), exp(2)];
        app.exp_sel.select(Some(0));
        app.comments.thread = vec![Comment {
            id: 9,
            expense_id: 1,
            user_id: "u1".into(),
            author: "ani@example.com".into(),
            content: "ok".into(),
            created_at: Utc::now(),
        }];
        app.comments.loaded_for = Some(1);
        assert_eq!(app.visible_thread().map(|t| t.len()), Some(1));

        // selection moved but the reload failed
        app.exp_sel.select(Some(1));
        assert!(app.visible_thread().is_none());
    }

    #[tokio::test]
    async fn detail_opens_on_enter_and_closes_on_esc() {
        let (mut app, _dir) = app();
        signed_in(&mut app, Role::User);
        app.tab = Tab::Expenses;
        app.expenses = vec![Expense {
            id: 1,
            title: "Rice".into(),
            amount: 10,
            image_url: None,
            created_by: None,
            created_at: Utc::now(),
        }];
        app.exp_sel.select(Some(0));
        app.handle_key(key(KeyCode::Enter)).await;
        assert_eq!(app.detail.as_ref().map(|e| e.id), Some(1));
        app.handle_key(key(KeyCode::Esc)).await;
        assert!(app.detail.is_none());
    }
}
