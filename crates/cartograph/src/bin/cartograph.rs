//! # Cartograph
//!
//! Renders the configured worlds once, reporting surface statistics per
//! world, then optionally keeps watching the region directories.
//!
//! ## Usage
//!
//! ```bash
//! cartograph --config cartograph.toml --world overworld --watch
//! ```

use std::collections::HashSet;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use cartograph::{init_logging, AppConfig, SurfaceStatsRenderer};
use cartograph_render::{RenderScheduler, SchedulerEvent};
use cartograph_world::{World, WorldConfig};
use crossbeam_channel::RecvTimeoutError;

/// Progress is logged when no event arrives for this long.
const REPORT_INTERVAL: Duration = Duration::from_secs(10);

struct Args {
    config: PathBuf,
    worlds: Vec<String>,
    watch: bool,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config: PathBuf::from("cartograph.toml"),
        worlds: Vec::new(),
        watch: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.get(i + 1) {
                    parsed.config = PathBuf::from(path);
                    i += 1;
                }
            }
            "--world" | "-w" => {
                if let Some(name) = args.get(i + 1) {
                    parsed.worlds.push(name.clone());
                    i += 1;
                }
            }
            "--watch" => parsed.watch = true,
            "--help" | "-h" => {
                println!("Usage: cartograph [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>   Configuration file (default: cartograph.toml)");
                println!("  -w, --world <NAME>    Render only this world (repeatable)");
                println!("      --watch           Keep running and re-render changed regions");
                println!("  -h, --help            Show this help");
                return None;
            }
            other => eprintln!("ignoring unknown argument: {other}"),
        }
        i += 1;
    }
    Some(parsed)
}

fn selected_worlds<'a>(config: &'a AppConfig, names: &[String]) -> Result<Vec<&'a WorldConfig>, String> {
    if names.is_empty() {
        return Ok(config.worlds.iter().collect());
    }
    names
        .iter()
        .map(|name| config.world(name).ok_or_else(|| format!("world '{name}' is not configured")))
        .collect()
}

fn run(config: &AppConfig, args: &Args) -> Result<(), Box<dyn Error>> {
    let blocks = Arc::new(config.block_registry()?);
    let worlds = selected_worlds(config, &args.worlds)?;
    if worlds.is_empty() {
        tracing::warn!("no worlds configured");
        return Ok(());
    }
    if args.watch && config.scheduler.watch_interval().is_none() {
        tracing::warn!("--watch given but scheduler.watch_interval_ms is 0, nothing will be watched");
    }

    let renderer = SurfaceStatsRenderer::new();
    let scheduler = RenderScheduler::new(config.scheduler.clone(), renderer.clone())?;
    let events = scheduler.events();

    let mut pending = HashSet::new();
    for world_config in worlds {
        let world = World::new(world_config.clone(), Arc::clone(&blocks), &config.cache);
        scheduler.register_world(Arc::new(world));
        let queued = scheduler.add_world(&world_config.name)?;
        tracing::info!(world = %world_config.name, regions = queued, "world queued");
        if queued > 0 {
            pending.insert(world_config.name.clone());
        }
    }

    while args.watch || !pending.is_empty() {
        match events.recv_timeout(REPORT_INTERVAL) {
            Ok(SchedulerEvent::WorldFinished { progress }) => {
                let stats = renderer.take(&progress.world).unwrap_or_default();
                tracing::info!(world = %progress.world, "{}", stats.summary(&blocks));
                tracing::info!("{progress}");
                pending.remove(&progress.world);
            }
            Ok(SchedulerEvent::WorldCancelled { world, reason }) => {
                tracing::warn!(%world, %reason, "world render cancelled");
                pending.remove(&world);
            }
            Ok(SchedulerEvent::RegionFailed { world, region, error }) => {
                tracing::debug!(%world, %region, %error, "region failed");
            }
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {
                if let Some(progress) = scheduler.get_progress() {
                    tracing::info!("{progress}");
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    scheduler.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    let Some(args) = parse_args() else {
        return ExitCode::SUCCESS;
    };
    init_logging();

    let config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "cannot load configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(&config, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "render failed");
            ExitCode::FAILURE
        }
    }
}
