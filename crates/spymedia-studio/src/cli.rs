use clap::{Parser, ValueEnum};

use spymedia_scenes::SceneKind;

#[derive(ValueEnum, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SceneSelection {
    Hero,
    Drone,
    All,
}

impl SceneSelection {
    pub fn kinds(self) -> Vec<SceneKind> {
        match self {
            SceneSelection::Hero => vec![SceneKind::Hero],
            SceneSelection::Drone => vec![SceneKind::Drone],
            SceneSelection::All => SceneKind::ALL.to_vec(),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "spymedia-studio")]
#[command(about = "Runs the SPYMEDIA hero and drone scenes", long_about = None)]
pub struct Cli {
    /// Scene(s) to run, one window each
    #[arg(long, value_enum, default_value_t = SceneSelection::All)]
    pub scene: SceneSelection,

    /// Window (or headless container) width in logical pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Window (or headless container) height in logical pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Run without a window for N frames at 60 Hz, then unmount and report
    #[arg(long = "headless-frames", value_name = "N")]
    pub headless_frames: Option<u32>,

    /// Seed for the hero's streaks and particles
    #[arg(long)]
    pub seed: Option<u64>,

    /// env_logger filter, overrides RUST_LOG
    #[arg(long = "log-filter", value_name = "FILTER")]
    pub log_filter: Option<String>,
}
