//! Line-based local chat transport.
//!
//! Every stdin line is one message. A line starting with `@name ` is sent
//! as session `name`; other lines use a session generated at startup.
//! Images are written to an output directory, text replies to stdout.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::config::RenderConfig;
use crate::controller::{Controller, Sink};
use crate::menu::Keyboard;
use crate::render::{Plotter, RenderArtifact};
use crate::session::SessionId;

/// Writes images as PNG files and text replies as lines to `out`.
pub struct DirectorySink<W: Write> {
  dir: PathBuf,
  out: Mutex<W>,
  images: AtomicUsize,
}

impl<W: Write> DirectorySink<W> {
  pub fn new(dir: impl Into<PathBuf>, out: W) -> Self {
    DirectorySink {
      dir: dir.into(),
      out: Mutex::new(out),
      images: AtomicUsize::new(0),
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn into_output(self) -> W {
    self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
  }

  fn write_line(&self, session: &SessionId, line: &str) -> anyhow::Result<()> {
    let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
    writeln!(out, "[{session}] {line}")?;
    out.flush()?;
    Ok(())
  }
}

impl<W: Write> Sink for DirectorySink<W> {
  fn send_image(
    &self,
    session: &SessionId,
    artifact: &RenderArtifact,
  ) -> anyhow::Result<()> {
    let n = self.images.fetch_add(1, Ordering::Relaxed) + 1;
    let name = format!(
      "{}-{n:04}-{}.png",
      file_stem(session.as_str()),
      artifact.mode
    );
    let path = self.dir.join(name);
    fs::write(&path, &artifact.png)
      .with_context(|| format!("could not write {}", path.display()))?;
    self.write_line(
      session,
      &format!(
        "{} ({}x{}) -> {}",
        artifact.title,
        artifact.width,
        artifact.height,
        path.display()
      ),
    )
  }

  fn send_text(
    &self,
    session: &SessionId,
    message: &str,
  ) -> anyhow::Result<()> {
    for line in message.lines() {
      self.write_line(session, line)?;
    }
    Ok(())
  }

  fn send_menu(
    &self,
    session: &SessionId,
    message: &str,
    keyboard: &Keyboard,
  ) -> anyhow::Result<()> {
    self.send_text(session, message)?;
    self.send_text(session, &keyboard.to_string())
  }
}

/// Session ids as safe file name parts.
fn file_stem(id: &str) -> String {
  id.chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
        c
      } else {
        '_'
      }
    })
    .collect()
}

/// Split an optional `@name` prefix off an input line.
pub fn parse_line<'a>(
  line: &'a str,
  default_session: &SessionId,
) -> (SessionId, &'a str) {
  let line = line.trim();
  if let Some(rest) = line.strip_prefix('@') {
    let (name, text) = match rest.split_once(char::is_whitespace) {
      Some((name, text)) => (name, text.trim()),
      None => (rest, ""),
    };
    if !name.is_empty() {
      return (SessionId::from(name), text);
    }
  }
  (default_session.clone(), line)
}

/// Route one input line through the controller. Blank lines are ignored.
pub fn handle_line<P: Plotter, S: Sink + ?Sized>(
  controller: &Controller<P>,
  sink: &S,
  default_session: &SessionId,
  line: &str,
) -> anyhow::Result<()> {
  let (session, text) = parse_line(line, default_session);
  if text.is_empty() {
    return Ok(());
  }
  controller.on_text(&session, text, sink)
}

pub fn run(output_dir: PathBuf, config: RenderConfig) -> anyhow::Result<()> {
  tokio::runtime::Runtime::new()?
    .block_on(async { run_impl(output_dir, config).await })
}

async fn run_impl(
  output_dir: PathBuf,
  config: RenderConfig,
) -> anyhow::Result<()> {
  tokio::fs::create_dir_all(&output_dir)
    .await
    .with_context(|| format!("could not create {}", output_dir.display()))?;

  let controller = Arc::new(Controller::new(config.dispatcher()));
  let sink = Arc::new(DirectorySink::new(output_dir, std::io::stdout()));
  let default_session = SessionId::generate();
  info!(
    session = %default_session,
    dir = %sink.dir().display(),
    "chat started, type /start"
  );

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  loop {
    tokio::select! {
      line = lines.next_line() => {
        let Some(line) = line.context("could not read stdin")? else {
          break;
        };
        let controller = Arc::clone(&controller);
        let sink = Arc::clone(&sink);
        let session = default_session.clone();
        let handled = tokio::task::spawn_blocking(move || {
          handle_line(controller.as_ref(), sink.as_ref(), &session, &line)
        })
        .await?;
        if let Err(e) = handled {
          error!(error = %format!("{e:#}"), "message not handled");
        }
      }
      _ = tokio::signal::ctrl_c() => {
        info!("interrupted");
        break;
      }
    }
  }

  info!(sessions = controller.sessions().len(), "chat finished");
  Ok(())
}
