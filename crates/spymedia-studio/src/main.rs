mod cli;

use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use log::info;

use spymedia_engine::device::GpuInit;
use spymedia_engine::headless::{HeadlessHost, drive_frames};
use spymedia_engine::lifecycle::{MountedScene, SceneFactory};
use spymedia_engine::logging::{LoggingConfig, init_logging};
use spymedia_engine::window::{LogicalSize, Runtime, RuntimeConfig, WindowScene};
use spymedia_scenes::SceneKind;

use cli::Cli;

const FRAME_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        env_filter: cli.log_filter.clone(),
        ..LoggingConfig::default()
    });

    let kinds = cli.scene.kinds();
    match cli.headless_frames {
        Some(frames) => run_headless(&cli, &kinds, frames),
        None => run_windowed(&cli, &kinds),
    }
}

fn run_windowed(cli: &Cli, kinds: &[SceneKind]) -> Result<()> {
    let scenes = kinds
        .iter()
        .map(|&kind| WindowScene {
            config: RuntimeConfig {
                title: format!("SPYMEDIA {kind}"),
                initial_size: LogicalSize::new(f64::from(cli.width), f64::from(cli.height)),
                transparent: kind == SceneKind::Hero,
            },
            factory: kind.factory(cli.seed),
        })
        .collect();

    info!("opening {} scene window(s); Space remounts, Escape quits", kinds.len());
    Runtime::run(scenes, GpuInit::default())
}

fn run_headless(cli: &Cli, kinds: &[SceneKind], frames: u32) -> Result<()> {
    let host = Rc::new(HeadlessHost::new(cli.width, cli.height));

    let mut scenes: Vec<Box<dyn MountedScene>> = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let scene = kind
            .factory(cli.seed)
            .mount(host.clone())
            .with_context(|| format!("failed to mount {kind}"))?;
        scenes.push(scene);
    }

    let rendered = drive_frames(&host, &mut scenes, Instant::now(), frames, FRAME_INTERVAL)?;
    info!(
        "rendered {rendered} frame(s) across {} scene(s) in {:.2}s of scene time",
        scenes.len(),
        (FRAME_INTERVAL * frames).as_secs_f32()
    );

    for scene in &mut scenes {
        scene.finalize();
    }
    drop(scenes);

    let snapshot = host.snapshot();
    info!("after unmount: {snapshot:?}");
    ensure!(snapshot.is_clean(), "scenes leaked resources: {snapshot:?}");
    Ok(())
}
