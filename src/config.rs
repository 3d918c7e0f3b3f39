//! Render settings from command-line flags and `PLOTBOT_*` variables.

use std::ops::RangeInclusive;
use std::time::Duration;

use clap::Args;
use thiserror::Error;

use crate::render::{DEFAULT_HEIGHT, DEFAULT_WIDTH, Dispatcher, Style};

pub const SIZE_LIMITS: RangeInclusive<u32> = 200..=4096;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
  #[error("{name} must be between {min} and {max} pixels, got {value}")]
  SizeOutOfRange {
    name: &'static str,
    value: u32,
    min: u32,
    max: u32,
  },
}

/// Flags shared by every subcommand that renders.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RenderArgs {
  /// Image width in pixels
  #[arg(long, env = "PLOTBOT_WIDTH", default_value_t = DEFAULT_WIDTH)]
  pub width: u32,

  /// Image height in pixels
  #[arg(long, env = "PLOTBOT_HEIGHT", default_value_t = DEFAULT_HEIGHT)]
  pub height: u32,

  /// Give up on a plot after this many milliseconds (0 disables)
  #[arg(long, env = "PLOTBOT_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
  pub timeout_ms: u64,
}

impl Default for RenderArgs {
  fn default() -> Self {
    RenderArgs {
      width: DEFAULT_WIDTH,
      height: DEFAULT_HEIGHT,
      timeout_ms: DEFAULT_TIMEOUT_MS,
    }
  }
}

impl RenderArgs {
  pub fn validate(&self) -> Result<RenderConfig, ConfigError> {
    let width = check_size("width", self.width)?;
    let height = check_size("height", self.height)?;
    Ok(RenderConfig {
      style: Style { width, height },
      timeout: (self.timeout_ms > 0)
        .then(|| Duration::from_millis(self.timeout_ms)),
    })
  }
}

fn check_size(name: &'static str, value: u32) -> Result<u32, ConfigError> {
  if SIZE_LIMITS.contains(&value) {
    Ok(value)
  } else {
    Err(ConfigError::SizeOutOfRange {
      name,
      value,
      min: *SIZE_LIMITS.start(),
      max: *SIZE_LIMITS.end(),
    })
  }
}

/// Validated render settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
  pub style: Style,
  pub timeout: Option<Duration>,
}

impl RenderConfig {
  pub fn dispatcher(&self) -> Dispatcher {
    Dispatcher::new(self.style, self.timeout)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let config = RenderArgs::default().validate().unwrap();
    assert_eq!(config.style, Style::default());
    assert_eq!(config.timeout, Some(Duration::from_secs(10)));
  }

  #[test]
  fn zero_timeout_disables_deadline() {
    let args = RenderArgs {
      timeout_ms: 0,
      ..RenderArgs::default()
    };
    assert_eq!(args.validate().unwrap().timeout, None);
  }

  #[test]
  fn rejects_tiny_images() {
    let args = RenderArgs {
      width: 50,
      ..RenderArgs::default()
    };
    assert_eq!(
      args.validate().unwrap_err(),
      ConfigError::SizeOutOfRange {
        name: "width",
        value: 50,
        min: 200,
        max: 4096,
      }
    );
  }
}
