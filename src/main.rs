mod cli;

use theatre::{
    backend::{Backend, HttpBackend},
    config,
    headless::{self, HeadlessElement},
    player::{
        CloseReason, Command, FailureReporter, NoticeBus, NoticePayload, Player, PlayerEvent,
        PlayerHandle, Resume, TracingReporter,
    },
};
use theatre_common::{MediaId, MediaKind, MediaReference, SeriesId, Timecode};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, Simulation};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

async fn play(
    config_path: Option<&std::path::Path>,
    command: Command,
    simulation: Simulation,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    headless::configure(&mut config);

    tracing::info!("Using backend at {}", config.backend.base_url);

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config.backend)?);
    let reporter: Arc<dyn FailureReporter> = Arc::new(TracingReporter);
    let element = HeadlessElement::new(Some(simulation.duration), simulation.bitrate as f64);

    let mut player = Player::new(&config, backend, reporter, element.clone());
    let handle = player.handle();

    let watcher = spawn_notice_printer(player.notices(), handle.clone());

    player.dispatch(PlayerEvent::Command(command)).await;
    if player.session().is_none() {
        watcher.abort();
        anyhow::bail!("Playback did not start");
    }

    let clock = headless::spawn_clock(
        element,
        handle.clone(),
        Duration::from_millis(simulation.tick_ms.max(1)),
    );
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, closing session");
            handle.command(Command::Shutdown);
        }
    });

    player.run().await;

    // Cleanup
    clock.abort();
    interrupt.abort();
    watcher.abort();

    Ok(())
}

/// Print notices and stop the player once nothing is left to play.
fn spawn_notice_printer(notices: Arc<NoticeBus>, player: PlayerHandle) -> JoinHandle<()> {
    let mut rx = notices.subscribe();

    tokio::spawn(async move {
        loop {
            let notice = match rx.recv().await {
                Ok(notice) => notice,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Notice printer lagged by {}", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            match notice.payload {
                NoticePayload::SessionOpened { reference, .. } => {
                    println!("Playing {} from {}", reference, reference.resume_offset);
                }
                NoticePayload::SessionClosed {
                    reference,
                    reason,
                    position,
                    ..
                } => {
                    println!("Closed {} at {}", reference, position);
                    if reason == CloseReason::NaturalEnd && reference.kind == MediaKind::Movie {
                        player.command(Command::Shutdown);
                    }
                }
                NoticePayload::SequenceAdvanced { series, index } => {
                    println!("Series {}: advancing to episode {}", series, index + 1);
                }
                NoticePayload::SequenceFinished { series } => {
                    println!("Series {} finished", series);
                    player.command(Command::Shutdown);
                }
                NoticePayload::PlaybackStarted { .. } | NoticePayload::ControlsVisibility { .. } => {}
            }
        }
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "theatre=trace,theatre_common=debug,reqwest=debug".to_string()
        } else {
            "theatre=info,theatre_common=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::PlayMovie {
            id,
            file,
            resume,
            simulation,
        } => {
            let reference = MediaReference::movie(MediaId::new(id), file, Timecode::from_raw(resume));
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(play(config_path, Command::PlayMovie(reference), simulation))
        }
        Commands::PlayEpisode {
            series,
            index,
            restart,
            simulation,
        } => {
            let command = Command::PlayEpisode {
                series: SeriesId::new(series),
                index,
                resume: if restart { Resume::Restart } else { Resume::Saved },
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(play(config_path, command, simulation))
        }
        Commands::Continue { series, simulation } => {
            let command = Command::ContinueSeries(SeriesId::new(series));
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(play(config_path, command, simulation))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("theatre {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Backend: {}{}", config.backend.base_url, config.backend.media_path);
    println!(
        "  Segment size: {} bytes ({:?})",
        config.scheduler.segment_size_bytes, config.scheduler.buffering
    );
    println!("  Low watermark: {}s", config.scheduler.low_watermark_secs);
    println!("  Heartbeat: every {}s", config.heartbeat.interval_secs);
    if config.keep_alive.enabled {
        println!("  Keep-alive: {}", config.keep_alive.interval);
    } else {
        println!("  Keep-alive: disabled");
    }
    println!("  Startup delay: {}ms", config.session.startup_delay_ms);

    Ok(())
}
