//! Conversation state machine: menu selections set a pending plot mode,
//! the next formula text is plotted in that mode.

use std::sync::PoisonError;

use anyhow::Context;
use tracing::{info, warn};

use crate::menu::{Keyboard, MenuItem};
use crate::render::{Dispatcher, PlotMode, Plotter, RenderArtifact};
use crate::session::{PendingMode, Session, SessionId, SessionStore};

pub const GREETING: &str =
  "Hi! This bot draws plots of formulas. Choose a category:";
pub const HELP: &str = "Commands:\n\
  - /start: start the bot\n\
  - /help: show this help\n\
  - Use the buttons to work with plots.";
pub const SELECT_MODE_FIRST: &str =
  "Select a plot type first, for example '2D Graphics' or '3D Graphics'.";
pub const UNKNOWN_COMMAND: &str =
  "I don't understand this command. Please try again.";
pub const CLEARED: &str = "Plot cleared. You can add new functions.";
pub const BACK: &str = "You are back in the main menu.";
const MENU_2D: &str = "You chose 2D graphics. What would you like to do?";
const MENU_3D: &str = "You chose 3D graphics. What would you like to do?";

/// Prompt shown after a plot mode is selected.
pub fn prompt(mode: PlotMode) -> &'static str {
  match mode {
    PlotMode::Explicit => {
      "Enter an explicit function in the form: y = x**2 or y = sin(x)."
    }
    PlotMode::Implicit => {
      "Enter an implicit function in the form: x**2 + y**2 - 1 = 0."
    }
    PlotMode::Surface => {
      "Enter a 3D function in the form: z = sin(x) * cos(y)."
    }
  }
}

/// Where replies go. Implemented by each chat transport.
pub trait Sink {
  fn send_image(
    &self,
    session: &SessionId,
    artifact: &RenderArtifact,
  ) -> anyhow::Result<()>;

  fn send_text(&self, session: &SessionId, message: &str)
  -> anyhow::Result<()>;

  /// Text with a reply keyboard. Transports without keyboards only show
  /// the text.
  fn send_menu(
    &self,
    session: &SessionId,
    message: &str,
    keyboard: &Keyboard,
  ) -> anyhow::Result<()> {
    let _ = keyboard;
    self.send_text(session, message)
  }
}

pub struct Controller<P: Plotter = Dispatcher> {
  plotter: P,
  sessions: SessionStore,
}

impl Default for Controller<Dispatcher> {
  fn default() -> Self {
    Controller::new(Dispatcher::default())
  }
}

impl<P: Plotter> Controller<P> {
  pub fn new(plotter: P) -> Self {
    Controller {
      plotter,
      sessions: SessionStore::new(),
    }
  }

  pub fn plotter(&self) -> &P {
    &self.plotter
  }

  pub fn sessions(&self) -> &SessionStore {
    &self.sessions
  }

  pub fn pending_mode(&self, session: &SessionId) -> PendingMode {
    self.sessions.pending_mode(session)
  }

  /// Handle a free-text message. Menu labels and commands are routed to
  /// [`Controller::on_menu_select`]; anything else is formula text.
  pub fn on_text<S: Sink + ?Sized>(
    &self,
    session: &SessionId,
    text: &str,
    sink: &S,
  ) -> anyhow::Result<()> {
    let text = text.trim();
    if let Some(item) = MenuItem::from_label(text) {
      return self.on_menu_select(session, item, sink);
    }
    if text.starts_with('/') {
      info!(%session, command = text, "unknown command");
      return delivered(session, sink.send_text(session, UNKNOWN_COMMAND));
    }

    let handle = self.sessions.session(session);
    let mut state = handle.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(mode) = state.take_pending().plot_mode() else {
      return delivered(session, sink.send_text(session, SELECT_MODE_FIRST));
    };

    match self.plotter.plot(mode, text) {
      Ok(artifact) => {
        info!(%session, %mode, formula = text, "plot ready");
        delivered(session, sink.send_image(session, &artifact))
      }
      Err(e) => {
        warn!(%session, %mode, formula = text, error = %e, "plot failed");
        delivered(session, sink.send_text(session, &format!("Error: {e}")))
      }
    }
  }

  pub fn on_menu_select<S: Sink + ?Sized>(
    &self,
    session: &SessionId,
    item: MenuItem,
    sink: &S,
  ) -> anyhow::Result<()> {
    let handle = self.sessions.session(session);
    let mut state = handle.lock().unwrap_or_else(PoisonError::into_inner);

    let sent = match item {
      MenuItem::Start => sink.send_menu(session, GREETING, &Keyboard::main()),
      MenuItem::Help => sink.send_text(session, HELP),
      MenuItem::Graphics2D => {
        sink.send_menu(session, MENU_2D, &Keyboard::graphics_2d())
      }
      MenuItem::Graphics3D => {
        sink.send_menu(session, MENU_3D, &Keyboard::graphics_3d())
      }
      MenuItem::AddExplicit => {
        await_formula(&mut state, session, PlotMode::Explicit, sink)
      }
      MenuItem::AddImplicit => {
        await_formula(&mut state, session, PlotMode::Implicit, sink)
      }
      MenuItem::AddSurface => {
        await_formula(&mut state, session, PlotMode::Surface, sink)
      }
      MenuItem::Clear => {
        state.select(PendingMode::Idle);
        sink.send_text(session, CLEARED)
      }
      MenuItem::Back => sink.send_menu(session, BACK, &Keyboard::main()),
    };
    delivered(session, sent)
  }
}

fn await_formula<S: Sink + ?Sized>(
  state: &mut Session,
  session: &SessionId,
  mode: PlotMode,
  sink: &S,
) -> anyhow::Result<()> {
  state.select(mode.into());
  info!(%session, %mode, "waiting for formula");
  sink.send_text(session, prompt(mode))
}

fn delivered(
  session: &SessionId,
  result: anyhow::Result<()>,
) -> anyhow::Result<()> {
  result
    .inspect_err(|e| warn!(%session, error = %e, "reply not delivered"))
    .with_context(|| format!("failed to reply to session {session}"))
}
