//! Terminal front-end (Ratatui + Crossterm)
//! - Talks to the platform over HTTP
//! - Keeps the signed-in session on disk between runs

use std::io::Stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::config::ClientConfig;
use crate::logging;

pub mod api;
pub mod imaging;
pub mod input;
pub mod session;
pub mod state;
pub mod ui;
pub mod util;
pub mod validate;

type Term = Terminal<CrosstermBackend<Stdout>>;

pub async fn run() -> Result<()> {
    let config = ClientConfig::from_env();
    logging::init_client(&config.log_file)?;
    tracing::info!(api_url = %config.api_url, "client starting");

    let sessions = session::SessionStore::load(config.session_file.clone());
    let mut app = state::App::new(api::Client::new(&config.api_url), sessions);
    app.start().await;

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, &mut app).await;

    // restore the terminal even when the loop failed
    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "client stopped with an error");
    }
    result
}

async fn event_loop(terminal: &mut Term, app: &mut state::App) -> Result<()> {
    let tick_rate = Duration::from_millis(200);

    while !app.quit {
        app.sync_session().await;
        terminal.draw(|f| ui::draw(f, app))?;

        if app.pending.is_some() {
            app.run_pending().await;
            continue;
        }

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key).await;
            }
        }
    }
    Ok(())
}
