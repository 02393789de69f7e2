use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use sprig_compiler::{GenerateConfig, ResolveConfig, SessionConfig};
use tracing::Level;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Diagnostics go to stderr, so that is the stream checked in auto mode.
    pub fn should_colorize(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sprig", bin_name = "sprig", version)]
#[command(about = "Compile Sprig programs to Go")]
#[command(after_help = r#"EXAMPLES:
  sprig main.sprig
  sprig main.sprig -o main.go
  sprig app/main.sprig -vv --color never"#)]
pub struct Cli {
    /// Entry source file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write Go source to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Colorize diagnostics (auto-detected by default)
    #[arg(long, default_value = "auto", value_name = "WHEN")]
    pub color: ColorChoice,

    /// Name of the generated Go package
    #[arg(long, default_value = "main", value_name = "NAME")]
    pub package: String,
}

impl Cli {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            resolve: ResolveConfig::default(),
            generate: GenerateConfig::new().package_name(&self.package),
        }
    }

    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
