//! Command line arguments

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "deck")]
#[command(about = "Present a slide deck headlessly, printing what the audience would see", long_about = None)]
pub struct Args {
    /// Deck description (JSON)
    pub deck: PathBuf,

    /// Show configuration (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Length of each hide and show animation phase, e.g. "250ms"
    #[arg(short, long, default_value = "250ms", value_parser = humantime::parse_duration)]
    pub transition: Duration,

    /// Comma separated commands: next, prev, seek:<slide-id>, stop
    #[arg(short, long, value_delimiter = ',')]
    pub script: Vec<ScriptCommand>,

    /// Pause between scripted commands
    #[arg(long, default_value = "0s", value_parser = humantime::parse_duration)]
    pub pace: Duration,

    /// Slide to start on instead of the first one
    #[arg(long)]
    pub start: Option<String>,

    /// Keep running after the show ends
    #[arg(long)]
    pub keep_open: bool,
}

/// One scripted presenter action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Next,
    Previous,
    Seek(String),
    Stop,
}

impl FromStr for ScriptCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "next" | "n" => Ok(Self::Next),
            "prev" | "previous" | "p" => Ok(Self::Previous),
            "stop" => Ok(Self::Stop),
            other => match other.strip_prefix("seek:") {
                Some(id) if !id.is_empty() => Ok(Self::Seek(id.to_string())),
                _ => Err(format!("unknown command '{other}'")),
            },
        }
    }
}
