use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use kcovid_core::load::{DashboardState, FetchOutcome};

pub struct App {
    pub country: String,
    pub state: DashboardState,
    pub should_quit: bool,
}

impl App {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            state: DashboardState::Pending,
            should_quit: false,
        }
    }

    pub fn apply(&mut self, outcome: FetchOutcome) {
        if let FetchOutcome::Failed { reason } = &outcome {
            tracing::warn!(%reason, "showing fetch failure on dashboard");
        }
        self.state.apply(outcome);
    }

    /// The load task went away without reporting anything.
    pub fn load_lost(&mut self) {
        if self.state.is_pending() {
            self.state = DashboardState::Failed {
                reason: "load task ended without a result".to_string(),
            };
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            _ => {}
        }
    }
}
