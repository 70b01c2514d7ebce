//! Overture CLI
//!
//! Simulate the intro sequence and inspect its configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use overture_animation::IntroConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod simulate;

use simulate::SimulationOptions;

#[derive(Parser)]
#[command(name = "overture")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Overture intro choreography CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the intro on a headless platform and print its timeline
    Simulate {
        /// Text to reveal
        #[arg(default_value = "Hello, world")]
        text: String,

        /// Intro configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Start with reduced motion requested
        #[arg(long)]
        reduced_motion: bool,

        /// Start with the session flag already set
        #[arg(long)]
        played: bool,

        /// Make every session storage access fail
        #[arg(long)]
        storage_fails: bool,

        /// Seed for the reveal jitter
        #[arg(long, default_value = "1")]
        seed: u64,

        /// Press Escape after this many milliseconds
        #[arg(long)]
        skip_at: Option<u64>,

        /// Flip the reduced-motion preference after this many milliseconds
        #[arg(long)]
        toggle_motion_at: Option<u64>,

        /// Navigate to another page after this many milliseconds
        #[arg(long)]
        navigate_at: Option<u64>,

        /// Text revealed on the navigated page
        #[arg(long, default_value = "Projects")]
        navigate_text: String,

        /// Milliseconds between a navigation and its page load
        #[arg(long, default_value = "200")]
        load_delay: u64,

        /// Simulated duration in milliseconds
        #[arg(short, long, default_value = "3000")]
        duration: u64,

        /// Frame interval in milliseconds
        #[arg(long, default_value = "16.667")]
        frame_ms: f64,

        /// Print the timeline as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as TOML
    Config,

    /// Validate a configuration file
    Check {
        /// Configuration file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate {
            text,
            config,
            reduced_motion,
            played,
            storage_fails,
            seed,
            skip_at,
            toggle_motion_at,
            navigate_at,
            navigate_text,
            load_delay,
            duration,
            frame_ms,
            json,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => IntroConfig::default(),
            };
            let frame_interval = parse_frame_interval(frame_ms)?;

            let options = SimulationOptions {
                text,
                config,
                reduced_motion,
                played,
                storage_fails,
                seed,
                skip_at: skip_at.map(Duration::from_millis),
                toggle_motion_at: toggle_motion_at.map(Duration::from_millis),
                navigate_at: navigate_at.map(Duration::from_millis),
                navigate_text,
                load_delay: Duration::from_millis(load_delay),
                duration: Duration::from_millis(duration),
                frame_interval,
            };
            cmd_simulate(&options, json)
        }

        Commands::Config => cmd_config(),

        Commands::Check { path } => cmd_check(&path),
    }
}

fn load_config(path: &Path) -> Result<IntroConfig> {
    IntroConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Convert `--frame-ms` into a non-zero interval
fn parse_frame_interval(frame_ms: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(frame_ms / 1000.0)
        .ok()
        .filter(|interval| !interval.is_zero())
        .with_context(|| {
            format!("Invalid frame interval {frame_ms}ms: must be a positive, representable duration")
        })
}

fn cmd_simulate(options: &SimulationOptions, json: bool) -> Result<()> {
    info!(
        "Simulating {:?} for {:?} (reduced motion: {})",
        options.text, options.duration, options.reduced_motion
    );

    let timeline = simulate::run(options);
    if json {
        let output =
            serde_json::to_string_pretty(&timeline).context("Failed to serialize timeline")?;
        println!("{output}");
    } else {
        simulate::print_timeline(&timeline);
    }

    Ok(())
}

fn cmd_config() -> Result<()> {
    let toml = IntroConfig::default()
        .to_toml_string()
        .context("Failed to serialize default config")?;
    print!("{toml}");
    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let config = load_config(path)?;

    info!("{} is valid", path.display());
    println!(
        "overlay:    hold {}ms, fade {}ms",
        config.overlay.hold_duration_ms, config.overlay.fade_duration_ms
    );
    println!(
        "reveal:     {}ms + up to {}ms per character, session key {:?}",
        config.reveal.base_delay_ms, config.reveal.jitter_ms, config.reveal.session_key
    );
    println!(
        "background: {} contour group(s), {} octave(s), stroke {}",
        config.background.contours.len(),
        config.background.noise_octaves,
        config.background.stroke_color
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval_parsing() {
        assert_eq!(
            parse_frame_interval(500.0).unwrap(),
            Duration::from_millis(500)
        );
        assert!(parse_frame_interval(0.0).is_err());
        assert!(parse_frame_interval(-1.0).is_err());
        assert!(parse_frame_interval(f64::NAN).is_err());
        assert!(parse_frame_interval(1e-10).is_err());
        assert!(parse_frame_interval(1e300).is_err());
    }
}
