pub mod app;
pub mod ui;

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use kcovid_core::domain::monthly::Cutoff;
use kcovid_core::ingest::provider::CaseSource;
use kcovid_core::load::{load_dashboard, FetchOutcome};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;

use crate::tui::app::App;

/// Owns the terminal while the dashboard is on screen.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    pub fn enter() -> Result<Self> {
        prepare_terminal(
            enable_raw_mode,
            || execute!(io::stdout(), EnterAlternateScreen),
            disable_raw_mode,
        )?;

        let terminal = match Terminal::new(CrosstermBackend::new(io::stdout())) {
            Ok(terminal) => terminal,
            Err(err) => {
                reset_terminal();
                return Err(err).context("failed to create terminal");
            }
        };
        install_panic_hook();

        Ok(Self { terminal })
    }

    pub fn restore(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

/// Raw mode is rolled back when the alternate screen cannot be entered.
fn prepare_terminal(
    enable_raw: impl FnOnce() -> io::Result<()>,
    enter_alternate: impl FnOnce() -> io::Result<()>,
    disable_raw: impl FnOnce() -> io::Result<()>,
) -> Result<()> {
    enable_raw().context("failed to enable raw mode")?;
    if let Err(err) = enter_alternate() {
        if let Err(restore_err) = disable_raw() {
            tracing::warn!(error = %restore_err, "failed to disable raw mode");
        }
        return Err(err).context("failed to enter alternate screen");
    }
    Ok(())
}

fn reset_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// A panic while the dashboard is up would otherwise leave the shell in raw mode.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        reset_terminal();
        previous(info);
    }));
}

pub async fn run(source: Arc<dyn CaseSource>, cutoff: Option<Cutoff>, country: String) -> Result<()> {
    let cancel = CancellationToken::new();
    let (tx, mut rx) = oneshot::channel::<FetchOutcome>();

    let task_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Some(outcome) = load_dashboard(source.as_ref(), cutoff, &task_cancel).await {
            if tx.send(outcome).is_err() {
                tracing::debug!("dashboard closed before load finished; result dropped");
            }
        }
    });

    let mut app = App::new(country);
    let mut tui = Tui::enter()?;
    let res = tokio::task::block_in_place(|| event_loop(&mut tui, &mut app, &mut rx));
    let restored = tui.restore();
    cancel.cancel();

    res?;
    restored
}

fn event_loop(tui: &mut Tui, app: &mut App, rx: &mut oneshot::Receiver<FetchOutcome>) -> Result<()> {
    let mut waiting = true;

    while !app.should_quit {
        if waiting {
            match rx.try_recv() {
                Ok(outcome) => {
                    app.apply(outcome);
                    waiting = false;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Closed) => {
                    app.load_lost();
                    waiting = false;
                }
            }
        }

        tui.terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.on_key(key);
            }
        }
    }

    Ok(())
}
