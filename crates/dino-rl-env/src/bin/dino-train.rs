// dino-train
// Plays runner episodes and trains the agent between them

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dino_rl_core::StalePolicy;
use dino_rl_env::{Runner, SessionConfig};

#[derive(Parser)]
#[command(name = "dino-train")]
#[command(about = "Train a runner agent from crashes and coached key presses", version)]
struct Cli {
    /// Session configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Episodes to play
    #[arg(short, long)]
    episodes: Option<usize>,

    /// Frame cap per episode
    #[arg(long)]
    max_frames: Option<usize>,

    /// Seed for the game, the policy gate and the network
    #[arg(long)]
    seed: Option<u64>,

    /// Chance per frame that the scripted coach presses a key
    #[arg(long)]
    coach_rate: Option<f64>,

    /// Apply every prediction, even ones from a finished episode
    #[arg(long)]
    legacy_predictions: bool,

    /// Print the session summary as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => SessionConfig::default(),
        };

        if let Some(episodes) = self.episodes {
            config.session.episodes = episodes;
        }
        if let Some(max_frames) = self.max_frames {
            config.session.max_frames = max_frames;
        }
        if let Some(seed) = self.seed {
            config.learner.seed = Some(seed);
        }
        if let Some(rate) = self.coach_rate {
            config.session.coach_rate = rate;
        }
        if self.legacy_predictions {
            config.learner.stale_policy = StalePolicy::ApplyAll;
        }

        config.validate().context("Invalid session configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.session_config()?;

    let mut runner = Runner::from_config(&config).context("Failed to set up the session")?;
    let summary = runner
        .run(config.session.episodes)
        .await
        .context("Training session failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for episode in &summary.episodes {
            println!(
                "Episode {}: frames = {}, passed = {}, crashed = {}, buffer = {}",
                episode.episode,
                episode.frames,
                episode.obstacles_passed,
                episode.crashed,
                episode.buffer_len
            );
        }
        println!(
            "\nBest: {} frames, mean: {:.1} frames over {} episodes",
            summary.best_frames,
            summary.mean_frames,
            summary.episodes.len()
        );
        println!(
            "Predictions: {} issued, {} applied, {} discarded; trainings: {}",
            summary.stats.predictions_issued,
            summary.stats.predictions_applied,
            summary.stats.predictions_discarded,
            summary.stats.trainings
        );
    }

    Ok(())
}
