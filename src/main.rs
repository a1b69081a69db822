use clap::Parser;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use mediactl::cli::{Cli, Command, PlayArgs};
use mediactl::core::spawn_controller;
use mediactl::engine::PlayOptions;
use mediactl::engine::sim::{SimConfig, spawn_sim_engine};
use mediactl::error::{ControllerError, EngineError};
use mediactl::logging;
use mediactl::media::{MediaState, SessionCallbacks};
use mediactl::settings::{ControllerSettings, load_settings, save_settings};

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("dev", "mediactl", "mediactl")
        .map(|d| d.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".mediactl"))
}

enum Outcome {
    Finished(MediaState),
    Failed(EngineError),
}

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);

    let _log_guard = logging::init(
        &data_dir,
        logging::LogConfig {
            dir: cli.log_dir.clone(),
            filter: cli.log_filter.clone(),
        },
    );
    tracing::info!(data_dir = %data_dir.display(), "mediactl starting");

    let settings = load_settings(&data_dir);
    match cli.command {
        Command::Play(args) => play(args, settings).await,
        Command::Settings { save } => {
            let json = serde_json::to_string_pretty(&settings)
                .map_err(|e| ControllerError::Other(e.to_string()))?;
            println!("{json}");
            if save {
                save_settings(&data_dir, &settings)?;
                tracing::info!("settings saved");
            }
            Ok(())
        }
    }
}

async fn play(args: PlayArgs, mut settings: ControllerSettings) -> Result<(), ControllerError> {
    if let Some(d) = args.duration {
        settings.sim_duration_secs = d;
    }
    let engine = spawn_sim_engine(SimConfig {
        duration_secs: settings.sim_duration_secs,
    });
    let (handle, task) = spawn_controller(settings, engine);

    let (tx_done, mut rx_done) = mpsc::channel::<Outcome>(4);
    let tx_err = tx_done.clone();
    let callbacks = SessionCallbacks::new()
        .on_status(move |s| {
            println!("status: {s}");
            if matches!(s, MediaState::Stopped | MediaState::Ended) {
                let _ = tx_done.try_send(Outcome::Finished(s));
            }
        })
        .on_position(|remaining| tracing::debug!(remaining, "position"))
        .on_success(|| println!("playback finished"))
        .on_error(move |e| {
            eprintln!("error: {e}");
            let _ = tx_err.try_send(Outcome::Failed(e.clone()));
        });

    let id = handle.create(args.source.as_str(), callbacks).await?;
    handle.set_fade_in(id, args.fade_in).await?;
    handle.set_fade_out(id, args.fade_out).await?;
    if let Some(secs) = args.fade_secs {
        handle.set_fade_time(id, secs).await?;
    }
    if let Some(v) = args.volume {
        handle.set_volume(id, v).await?;
    }
    handle.play(id, PlayOptions::default()).await?;

    let force_at = args
        .force_fade_after
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .and_then(|d| Instant::now().checked_add(d));
    let mut forced = false;
    let outcome = loop {
        let far = Instant::now() + Duration::from_secs(3600);
        tokio::select! {
            Some(o) = rx_done.recv() => break Some(o),
            _ = sleep_until(force_at.unwrap_or(far)), if force_at.is_some() && !forced => {
                forced = true;
                println!("forcing fade-out");
                handle.set_force_fade_out(id, true).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                handle.stop(id).await?;
                break None;
            }
        }
    };

    if let Ok(pos) = handle.get_current_position(id).await {
        tracing::info!(position = pos, "final position");
    }
    handle.release(id).await?;
    handle.shutdown().await?;
    let _ = task.await;

    match outcome {
        Some(Outcome::Failed(e)) => Err(e.into()),
        Some(Outcome::Finished(state)) => {
            tracing::info!(state = %state, "session finished");
            Ok(())
        }
        None => Ok(()),
    }
}
