use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::cli::input::LineEdit;
use crate::cli::state::{App, AuthField, EntryField, EntryForm, SettingsField, Tab, TABS};
use crate::cli::util::{fmt_date, fmt_date_long, fmt_rupiah, fmt_time_wib};

struct Theme {
    base: Style,
    accent: Color,
    income: Color,
    expense: Color,
    muted: Color,
}

impl Theme {
    fn new(dark: bool) -> Self {
        if dark {
            Self {
                base: Style::default().fg(Color::Gray).bg(Color::Black),
                accent: Color::Cyan,
                income: Color::LightGreen,
                expense: Color::LightRed,
                muted: Color::DarkGray,
            }
        } else {
            Self {
                base: Style::default(),
                accent: Color::Blue,
                income: Color::Green,
                expense: Color::Red,
                muted: Color::Gray,
            }
        }
    }

    fn block<'a>(&self, title: &'a str) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(self.base)
    }
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let theme = Theme::new(app.dark_mode);
    let size = f.size();
    f.render_widget(Block::default().style(theme.base), size);

    if app.session.is_none() {
        draw_auth(f, size, app, &theme);
    } else {
        // top tabs | main content | bottom status bar
        let root = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(1)])
            .split(size);

        let titles = TABS
            .iter()
            .enumerate()
            .map(|(i, t)| Line::from(format!("{} {}", i + 1, t.title())))
            .collect::<Vec<_>>();
        let tabs = Tabs::new(titles)
            .select(app.tab.index())
            .block(theme.block("Budget Tracker"))
            .highlight_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD));
        f.render_widget(tabs, root[0]);

        match app.tab {
            Tab::Dashboard => draw_dashboard(f, root[1], app, &theme),
            Tab::Wallet => draw_wallet(f, root[1], app, &theme),
            Tab::Expenses => draw_expenses(f, root[1], app, &theme),
            Tab::Comments => draw_comments(f, root[1], app, &theme),
            Tab::Settings => draw_settings(f, root[1], app, &theme),
        }

        let status = Paragraph::new(app.status.as_str()).style(Style::default().fg(theme.muted));
        f.render_widget(status, root[2]);

        if app.detail.is_some() {
            draw_detail(f, root[1], app, &theme);
        }
        if app.settings.cropper.is_some() {
            draw_cropper(f, root[1], app, &theme);
        }
    }

    if let Some(confirm) = app.confirm {
        let lines = vec![
            Line::from(confirm.message()),
            Line::from(""),
            Line::from("y / Enter: confirm    n / Esc: cancel"),
        ];
        popup(f, size, "Confirm", lines, theme.expense, &theme);
    }
    if let Some(msg) = &app.alert {
        let lines = vec![Line::from(msg.as_str()), Line::from(""), Line::from("Enter: OK")];
        popup(f, size, "Notice", lines, theme.accent, &theme);
    }
}

/* ========== auth ========== */

fn draw_auth(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let form = &app.auth;
    let (title, button) = if form.sign_up {
        ("Create an account", "Sign up")
    } else {
        ("Sign in to Budget Tracker", "Sign in")
    };
    let button = if form.loading { "Please wait..." } else { button };

    let lines = vec![
        field_line("Email   ", &form.email, form.focus == AuthField::Email, theme),
        field_line("Password", &form.password, form.focus == AuthField::Password, theme),
        Line::from(""),
        Line::from(Span::styled(
            format!("[ {button} ]"),
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            if form.sign_up {
                "F2: I already have an account"
            } else {
                "F2: I don't have an account yet"
            },
            Style::default().fg(theme.muted),
        )),
        Line::from(Span::styled(
            "Tab: switch field | Enter: submit | Esc: quit",
            Style::default().fg(theme.muted),
        )),
    ];

    let p = Paragraph::new(lines)
        .block(theme.block(title))
        .alignment(Alignment::Left);
    f.render_widget(p, center_rect(area, 56, 11));
}

/* ========== dashboard ========== */

fn draw_dashboard(f: &mut Frame, area: Rect, app: &mut App, theme: &Theme) {
    let admin = app.is_admin();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(5)])
        .split(area);

    draw_balance_card(f, rows[0], app, theme);

    if admin {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);
        draw_entry_form(f, cols[0], &app.expense_form, "Record expense (a)", "Title", theme);
        draw_expense_list(f, cols[1], app, "Expense history", theme);
    } else {
        draw_expense_list(f, rows[1], app, "Expense history  (c: comment)", theme);
    }
}

fn draw_balance_card(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let (name, role) = match &app.profile {
        Some(p) => (p.display_name().to_string(), p.role),
        None => ("...".to_string(), Default::default()),
    };
    let lines = vec![
        Line::from(vec![
            Span::raw(format!("Hello, {name}  ")),
            Span::styled(
                format!("[{}]", role.label()),
                Style::default().fg(if role.is_admin() { theme.accent } else { theme.muted }),
            ),
        ]),
        Line::from(Span::styled(
            fmt_rupiah(app.balance),
            Style::default().fg(theme.income).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("current balance", Style::default().fg(theme.muted))),
    ];
    f.render_widget(Paragraph::new(lines).block(theme.block("Wallet")), area);
}

fn draw_expense_list(f: &mut Frame, area: Rect, app: &mut App, title: &str, theme: &Theme) {
    let items: Vec<ListItem> = app
        .expenses
        .iter()
        .map(|e| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("{}  ", fmt_date(&e.created_at))),
                Span::raw(format!("{:<24}", e.title)),
                Span::styled(
                    format!("- {}", fmt_rupiah(e.amount)),
                    Style::default().fg(theme.expense),
                ),
                Span::styled(
                    if e.image_url.is_some() { "  [receipt]" } else { "" },
                    Style::default().fg(theme.muted),
                ),
            ]))
        })
        .collect();

    let list = if items.is_empty() {
        List::new(vec![ListItem::new("No expenses yet.")])
    } else {
        List::new(items)
    };
    let list = list
        .block(theme.block(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.exp_sel);
}

fn draw_entry_form(
    f: &mut Frame,
    area: Rect,
    form: &EntryForm,
    title: &str,
    label: &str,
    theme: &Theme,
) {
    let mut lines = vec![
        field_line(
            &format!("{label:<8}"),
            &form.title,
            form.focus == Some(EntryField::Title),
            theme,
        ),
        field_line("Amount  ", &form.amount, form.focus == Some(EntryField::Amount), theme),
    ];
    if form.with_receipt {
        lines.push(field_line(
            "Receipt ",
            &form.receipt,
            form.focus == Some(EntryField::Receipt),
            theme,
        ));
        lines.push(Line::from(Span::styled(
            "  (optional path to an image file)",
            Style::default().fg(theme.muted),
        )));
    }
    lines.push(Line::from(""));
    let hint = if form.saving {
        "Saving..."
    } else if form.focus.is_some() {
        "Tab: next field | Enter: save | Esc: done"
    } else {
        "press a to start typing"
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(theme.muted))));

    let p = Paragraph::new(lines)
        .block(theme.block(title))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

/* ========== wallet ========== */

fn draw_wallet(f: &mut Frame, area: Rect, app: &mut App, theme: &Theme) {
    let admin = app.is_admin();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(5)])
        .split(area);
    draw_balance_card(f, rows[0], app, theme);

    let list_area = if admin {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);
        draw_entry_form(f, cols[0], &app.income_form, "Top up balance (a)", "Source", theme);
        cols[1]
    } else {
        rows[1]
    };

    let items: Vec<ListItem> = app
        .incomes
        .iter()
        .map(|i| {
            ListItem::new(Line::from(vec![
                Span::raw(format!("{}  ", fmt_date(&i.created_at))),
                Span::raw(format!("{:<24}", i.source)),
                Span::styled(
                    format!("+ {}", fmt_rupiah(i.amount)),
                    Style::default().fg(theme.income),
                ),
            ]))
        })
        .collect();
    let list = if items.is_empty() {
        List::new(vec![ListItem::new("No income yet.")])
    } else {
        List::new(items)
    };
    let title = if admin { "Income history  (x: delete)" } else { "Income history" };
    let list = list
        .block(theme.block(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, list_area, &mut app.inc_sel);
}

/* ========== expenses ========== */

fn draw_expenses(f: &mut Frame, area: Rect, app: &mut App, theme: &Theme) {
    let title = if app.is_admin() {
        "Expenses  (Enter: detail, c: comments, x: delete)"
    } else {
        "Expenses  (Enter: detail, c: comments)"
    };
    draw_expense_list(f, area, app, title, theme);
}

fn draw_detail(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let Some(e) = &app.detail else { return };
    let lines = vec![
        Line::from(Span::styled(
            e.title.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("- {}", fmt_rupiah(e.amount)),
            Style::default().fg(theme.expense),
        )),
        Line::from(""),
        Line::from(format!("Date : {}", fmt_date_long(&e.created_at))),
        Line::from(format!("Time : {}", fmt_time_wib(&e.created_at))),
        Line::from(""),
        Line::from(match &e.image_url {
            Some(url) => format!("Receipt: {url}"),
            None => "No image attached".to_string(),
        }),
        Line::from(""),
        Line::from(Span::styled("Esc: close", Style::default().fg(theme.muted))),
    ];
    let rect = center_rect(area, 64, 12);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines)
            .block(theme.block("Expense detail"))
            .wrap(Wrap { trim: false }),
        rect,
    );
}

/* ========== comments ========== */

fn draw_comments(f: &mut Frame, area: Rect, app: &mut App, theme: &Theme) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let items: Vec<ListItem> = app
        .expenses
        .iter()
        .map(|e| ListItem::new(format!("{}  {}", e.title, fmt_rupiah(e.amount))))
        .collect();
    let list = List::new(items)
        .block(theme.block("Expenses"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, cols[0], &mut app.exp_sel);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(cols[1]);

    let mut lines: Vec<Line> = Vec::new();
    let thread = app.visible_thread().unwrap_or_default();
    if app.selected_expense().is_none() {
        lines.push(Line::from("Select an expense to see its discussion."));
    } else if app.visible_thread().is_none() {
        lines.push(Line::from(Span::styled(
            "Comments not loaded. r: retry",
            Style::default().fg(theme.expense),
        )));
    } else if thread.is_empty() {
        lines.push(Line::from(Span::styled(
            "No comments yet.",
            Style::default().fg(theme.muted),
        )));
    }
    for c in thread {
        lines.push(Line::from(vec![
            Span::styled(c.author.as_str(), Style::default().fg(theme.accent)),
            Span::styled(
                format!("  {} {}", fmt_date(&c.created_at), fmt_time_wib(&c.created_at)),
                Style::default().fg(theme.muted),
            ),
        ]));
        lines.push(Line::from(format!("  {}", c.content)));
    }
    f.render_widget(
        Paragraph::new(lines)
            .block(theme.block("Discussion"))
            .wrap(Wrap { trim: false }),
        right[0],
    );

    let draft_title = if app.comments.writing {
        "Write a comment  (Enter: send, Esc: cancel)"
    } else {
        "w: write a comment"
    };
    let draft = Paragraph::new(app.comments.draft.rendered()).block(theme.block(draft_title));
    f.render_widget(draft, right[1]);
}

/* ========== settings ========== */

fn draw_settings(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let s = &app.settings;
    let mut lines = Vec::new();

    if let Some(p) = &app.profile {
        lines.push(Line::from(format!("Email       : {}", p.email)));
        if s.editing == Some(SettingsField::Username) {
            lines.push(field_line("Display name", &s.username, true, theme));
        } else {
            lines.push(Line::from(format!("Display name: {}", p.display_name())));
        }
        lines.push(Line::from(format!("Role        : {}", p.role.label())));
        lines.push(Line::from(format!(
            "Avatar      : {}",
            p.avatar_url.as_deref().unwrap_or("(none)")
        )));
    }
    lines.push(Line::from(format!(
        "Dark mode   : {}",
        if app.dark_mode { "on" } else { "off" }
    )));
    lines.push(Line::from(""));

    if s.editing == Some(SettingsField::AvatarPath) {
        lines.push(field_line("Image file  ", &s.avatar_path, true, theme));
        lines.push(Line::from(Span::styled(
            "Enter: open cropper | Esc: cancel",
            Style::default().fg(theme.muted),
        )));
    }
    lines.push(Line::from(Span::styled(
        "n: change name | p: change photo | d: toggle dark mode",
        Style::default().fg(theme.muted),
    )));

    f.render_widget(
        Paragraph::new(lines)
            .block(theme.block("Settings"))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_cropper(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let Some(c) = &app.settings.cropper else { return };
    let a = c.area();
    let lines = vec![
        Line::from(format!("Image : {} x {}", c.image.width(), c.image.height())),
        Line::from(format!("Zoom  : {:.1}x", c.zoom)),
        Line::from(format!("Pan   : {:+.1}, {:+.1}", c.pan_x, c.pan_y)),
        Line::from(format!("Crop  : {}x{} at ({}, {})", a.width, a.height, a.x, a.y)),
        Line::from(""),
        Line::from(if app.settings.uploading { "Uploading..." } else { "" }),
        Line::from(Span::styled(
            "arrows: pan | +/-: zoom | Enter: save | Esc: cancel",
            Style::default().fg(theme.muted),
        )),
    ];
    let rect = center_rect(area, 58, 10);
    f.render_widget(Clear, rect);
    f.render_widget(Paragraph::new(lines).block(theme.block("Crop profile photo")), rect);
}

/* ========== shared ========== */

fn field_line<'a>(label: &str, field: &LineEdit, focused: bool, theme: &Theme) -> Line<'a> {
    let marker = if focused { "> " } else { "  " };
    let style = if focused {
        Style::default().fg(theme.accent)
    } else {
        Style::default()
    };
    let cursor = if focused { "_" } else { "" };
    Line::from(vec![
        Span::styled(format!("{marker}{label}: "), style),
        Span::raw(format!("{}{cursor}", field.rendered())),
    ])
}

fn popup(f: &mut Frame, area: Rect, title: &str, lines: Vec<Line>, color: Color, theme: &Theme) {
    let rect = center_rect(area, 60, 7);
    f.render_widget(Clear, rect);
    let p = Paragraph::new(lines)
        .block(theme.block(title).border_style(Style::default().fg(color)))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(p, rect);
}

fn center_rect(rect: Rect, w: u16, h: u16) -> Rect {
    let x = rect.x + rect.width.saturating_sub(w) / 2;
    let y = rect.y + rect.height.saturating_sub(h) / 2;
    Rect { x, y, width: w.min(rect.width), height: h.min(rect.height) }
}
