use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use plotbot::config::RenderArgs;
use plotbot::{Expression, PlotMode, Plotter, chat};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Talk to the bot on stdin; plots are written to a directory
  Chat {
    /// Directory for rendered images
    #[arg(long, env = "PLOTBOT_OUTPUT_DIR", default_value = "plots")]
    output_dir: PathBuf,

    #[command(flatten)]
    render: RenderArgs,
  },
  /// Render one formula to a PNG file
  Render {
    #[arg(value_enum)]
    mode: ModeArg,

    /// The formula, e.g. "y = sin(x)" or "x**2 + y**2 = 1"
    formula: String,

    /// Output file
    #[arg(short, long, default_value = "plot.png")]
    output: PathBuf,

    #[command(flatten)]
    render: RenderArgs,
  },
  /// Evaluate a formula at a point
  Eval {
    /// The formula, in x and optionally y
    formula: String,

    #[arg(long, allow_hyphen_values = true)]
    x: f64,

    #[arg(long, allow_hyphen_values = true)]
    y: Option<f64>,
  },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
  Explicit,
  Implicit,
  Surface,
}

impl From<ModeArg> for PlotMode {
  fn from(mode: ModeArg) -> Self {
    match mode {
      ModeArg::Explicit => PlotMode::Explicit,
      ModeArg::Implicit => PlotMode::Implicit,
      ModeArg::Surface => PlotMode::Surface,
    }
  }
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("plotbot=info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Chat { output_dir, render } => {
      chat::run(output_dir, render.validate()?)
    }
    Commands::Render {
      mode,
      formula,
      output,
      render,
    } => {
      let dispatcher = render.validate()?.dispatcher();
      let artifact = dispatcher.plot(mode.into(), &formula)?;
      fs::write(&output, &artifact.png)
        .with_context(|| format!("could not write {}", output.display()))?;
      println!("{} -> {}", artifact.title, output.display());
      Ok(())
    }
    Commands::Eval { formula, x, y } => {
      let (variables, point) = match y {
        Some(y) => (vec!["x", "y"], vec![x, y]),
        None => (vec!["x"], vec![x]),
      };
      let expr = Expression::parse(&formula, &variables)?;
      println!("{}", expr.evaluate_at(&point)?);
      Ok(())
    }
  }
}
