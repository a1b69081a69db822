use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "mediactl",
    version,
    about = "Multi-session playback controller with position tracking and fades"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Data directory (defaults to the platform's local data dir)
    #[arg(long, global = true, env = "MEDIACTL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log directory (defaults to `{data_dir}/logs`)
    #[arg(long, global = true, env = "MEDIACTL_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log filter, same syntax as RUST_LOG
    #[arg(long, global = true, env = "RUST_LOG")]
    pub log_filter: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Play a source on the simulated engine until it stops or ends
    Play(PlayArgs),

    /// Print the effective settings as JSON
    Settings {
        /// Also write them to the settings file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct PlayArgs {
    pub source: String,

    #[arg(long)]
    pub fade_in: bool,

    #[arg(long)]
    pub fade_out: bool,

    /// Fade window in seconds
    #[arg(long, value_parser = positive_secs)]
    pub fade_secs: Option<f64>,

    /// Length of the simulated clip in seconds
    #[arg(long, value_parser = positive_secs)]
    pub duration: Option<f64>,

    /// Intended volume, 0.0 to 1.0
    #[arg(long, value_parser = unit_volume)]
    pub volume: Option<f64>,

    /// Force a fade-out after this many seconds
    #[arg(long, value_parser = secs)]
    pub force_fade_after: Option<f64>,
}

/// A non-negative number of seconds that fits a [`Duration`].
fn secs(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(v).map_err(|_| format!("`{s}` is not a usable number of seconds"))?;
    Ok(v)
}

fn positive_secs(s: &str) -> Result<f64, String> {
    let v = secs(s)?;
    if v == 0.0 {
        return Err("must be greater than zero".to_owned());
    }
    Ok(v)
}

fn unit_volume(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=1.0).contains(&v) {
        return Err(format!("`{s}` is outside 0.0 to 1.0"));
    }
    Ok(v)
}
