//! Shake Dice CLI
//!
//! Terminal host for the shake-to-roll dice core. Without a phone to shake,
//! the accelerometer is either simulated or replayed from a JSON script.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::Level;

use shakedice::dice::{
    DieFace, IntervalMotionSource, MotionSampleSource, RollArbiter, RollSnapshot, RollTrigger,
    ScriptedMotion, ShakeDetector, ShakeSettings, SimulatedShaker, UnavailableMotionSource,
    VisualSink,
};

/// Shake Dice - shake-to-roll six-sided die
#[derive(Parser)]
#[command(name = "shakedice")]
#[command(author, version, about = "Shake Dice - shake (or press) to roll a die")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to the per-user app data folder)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Override the shake threshold (1.5 = sensitive, 2.0 = less sensitive)
    #[arg(long, global = true)]
    threshold: Option<f32>,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll with the button, no sensor involved
    Roll {
        /// How many rolls to perform back to back
        #[arg(short, long, default_value = "1")]
        count: u32,

        /// Seed for reproducible rolls
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Listen to a simulated or scripted accelerometer and roll on every shake
    Shake {
        /// JSON file with an array of {"x","y","z"} samples to replay
        #[arg(long)]
        script: Option<PathBuf>,

        /// Replay the script forever instead of once
        #[arg(long = "loop", requires = "script")]
        looping: bool,

        /// How long to listen before exiting
        #[arg(long, default_value = "10")]
        seconds: u64,

        /// Pretend the device has no accelerometer
        #[arg(long, conflicts_with = "script")]
        no_sensor: bool,

        /// Seed for the simulated sensor and the rolls
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Inspect or reset the settings file
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the effective settings as JSON
    Show,
    /// Print where the settings file lives
    Path,
    /// Write the effective settings (including overrides) to the file
    Save,
    /// Overwrite the settings file with defaults
    Reset,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings_path = cli.settings.clone().or_else(|| ShakeSettings::default_path().ok());
    let settings = load_settings(settings_path.as_ref(), cli.threshold);

    let result = match cli.command {
        Commands::Roll { count, seed } => run_manual_rolls(&settings, count, seed).await,
        Commands::Shake {
            script,
            looping,
            seconds,
            no_sensor,
            seed,
        } => run_shake_session(&settings, script, looping, seconds, no_sensor, seed).await,
        Commands::Settings { action } => run_settings(action, &settings, settings_path),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&PathBuf>, threshold: Option<f32>) -> ShakeSettings {
    let mut settings = match path {
        Some(path) => ShakeSettings::load_from(path),
        None => ShakeSettings::default(),
    };
    if let Some(threshold) = threshold {
        settings.threshold = threshold;
    }
    settings.sanitized()
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_manual_rolls(
    settings: &ShakeSettings,
    count: u32,
    seed: Option<u64>,
) -> Result<(), String> {
    let arbiter = RollArbiter::with_rng(settings, TerminalSink, make_rng(seed));

    print_banner("Magic Dice", "Use the button");
    for _ in 0..count {
        arbiter.try_roll(RollTrigger::Manual);
        arbiter.wait_idle().await;
    }
    print_total(arbiter.completed_rolls());
    Ok(())
}

async fn run_shake_session(
    settings: &ShakeSettings,
    script: Option<PathBuf>,
    looping: bool,
    seconds: u64,
    no_sensor: bool,
    seed: Option<u64>,
) -> Result<(), String> {
    let seed = seed.unwrap_or_else(rand::random);
    let interval = settings.sensor_interval();

    let source: Box<dyn MotionSampleSource> = if no_sensor {
        Box::new(UnavailableMotionSource::new())
    } else if let Some(path) = script {
        let script = ScriptedMotion::load(&path)?;
        if script.is_empty() {
            return Err(format!("Motion script {} has no samples", path.display()));
        }
        Box::new(IntervalMotionSource::new(script.looping(looping), interval))
    } else {
        Box::new(IntervalMotionSource::new(SimulatedShaker::new(seed), interval))
    };

    let arbiter = RollArbiter::with_rng(settings, TerminalSink, make_rng(Some(seed)));
    let trigger = arbiter.clone();
    let mut detector = ShakeDetector::start(source.as_ref(), settings, move || {
        trigger.try_roll(RollTrigger::Shake);
    });

    print_banner("Magic Dice", detector.availability_notice());

    if detector.is_available() {
        println!(
            "{} listening for {}s (threshold {:.2}, cooldown {} ms) - Ctrl+C to stop",
            "Sensor:".bold().white(),
            seconds,
            detector.threshold(),
            settings.cooldown_ms
        );
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
            _ = tokio::signal::ctrl_c() => {
                println!();
            }
        }
    } else {
        println!("{}", "Accelerometer not available".yellow());
        arbiter.try_roll(RollTrigger::Manual);
        arbiter.wait_idle().await;
    }

    detector.stop();
    arbiter.shutdown();

    let stats = detector.stats();
    println!(
        "{} {} samples, {} above threshold, {} shakes",
        "Sensor:".bold().white(),
        stats.samples_seen,
        stats.above_threshold,
        stats.shakes_accepted
    );
    print_total(arbiter.completed_rolls());
    Ok(())
}

fn run_settings(
    action: SettingsAction,
    settings: &ShakeSettings,
    path: Option<PathBuf>,
) -> Result<(), String> {
    match action {
        SettingsAction::Show => {
            let json = serde_json::to_string_pretty(settings)
                .map_err(|e| format!("Failed to encode settings: {e}"))?;
            println!("{json}");
        }
        SettingsAction::Path => {
            let path = path.ok_or("Unable to determine settings path")?;
            println!("{}", path.display());
        }
        SettingsAction::Save => {
            let path = path.ok_or("Unable to determine settings path")?;
            settings.save_to(&path)?;
            println!("{} {}", "Saved".green().bold(), path.display());
        }
        SettingsAction::Reset => {
            let path = path.ok_or("Unable to determine settings path")?;
            ShakeSettings::default().save_to(&path)?;
            println!("{} {}", "Reset".green().bold(), path.display());
        }
    }
    Ok(())
}

// ============================================================================
// Terminal Rendering
// ============================================================================

/// Prints every roll update to stdout.
struct TerminalSink;

impl VisualSink for TerminalSink {
    fn on_roll_update(&self, snapshot: RollSnapshot) {
        if snapshot.is_rolling {
            println!(
                "  {} {}",
                "Rolling...".dimmed(),
                format!("[{}]", snapshot.displayed_value).bright_white()
            );
            return;
        }

        for line in render_face(snapshot.displayed_value) {
            println!("  {}", line.bright_white());
        }
        println!(
            "{} {}",
            "Result:".bold().white(),
            snapshot.displayed_value.to_string().bright_blue().bold()
        );
        println!("{}", "═══════════════════════════════════════".cyan());
    }
}

/// Draw a die face as five lines of box-drawing text.
fn render_face(face: DieFace) -> Vec<String> {
    let mut grid = [[' '; 3]; 3];
    for &(row, col) in face.pips() {
        grid[usize::from(row)][usize::from(col)] = '●';
    }

    let mut lines = Vec::with_capacity(5);
    lines.push("┌───────┐".to_string());
    for row in grid {
        lines.push(format!("│ {} {} {} │", row[0], row[1], row[2]));
    }
    lines.push("└───────┘".to_string());
    lines
}

fn print_banner(title: &str, notice: &str) {
    println!("\n{}", "═══════════════════════════════════════".cyan());
    println!("{}", title.yellow().bold());
    println!("{}", notice.dimmed());
    println!("{}", "═══════════════════════════════════════".cyan());
}

fn print_total(completed: u64) {
    println!("{} {}", "Total rolls:".bold().white(), completed);
}

// ============================================================================
// Tests
// ============================================================================
