//! a11y-analytics CLI
//!
//! Runs the decorator against scripted environments and shows what it
//! would attach to analytics events.

use a11y_analytics::{
    config::Config,
    environment::{FocusFeed, Scenario},
    gtag::gtag_config,
    install,
    interceptor::{AnalyticsGlobal, DecorationEnvironment},
    probe::MediaFeatureSpec,
    schedule::TokioScheduler,
    DetectionState, DATA_DECLARATION, VERSION,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "a11y-analytics")]
#[command(version = VERSION)]
#[command(about = "Accessibility context for analytics events", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decorate a stub gtag function inside a scripted environment
    Simulate {
        /// Scenario file (JSON); a built-in example is used when omitted
        #[arg(long, short)]
        scenario: Option<PathBuf>,

        /// Stop after this many detection ticks
        #[arg(long)]
        max_ticks: Option<usize>,
    },

    /// List the tracked media features
    Features,

    /// Display the data declaration
    Declaration,

    /// Show configuration
    Config {
        /// Write the current settings to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    });
    init_tracing(&config.log_filter);

    match cli.command {
        Commands::Simulate {
            scenario,
            max_ticks,
        } => cmd_simulate(&config, scenario, max_ticks),
        Commands::Features => {
            cmd_features(&config);
            Ok(())
        }
        Commands::Declaration => {
            println!("{DATA_DECLARATION}");
            Ok(())
        }
        Commands::Config { init } => cmd_config(&config, init),
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}

fn format_call(args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
    format!("gtag({})", rendered.join(", "))
}

fn cmd_simulate(
    config: &Config,
    scenario_path: Option<PathBuf>,
    max_ticks: Option<usize>,
) -> anyhow::Result<()> {
    let scenario = match scenario_path {
        Some(path) => Scenario::load(&path)
            .with_context(|| format!("loading scenario {}", path.display()))?,
        None => Scenario::example(),
    };

    println!("a11y-analytics v{VERSION}");
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")?;

    let gtag = AnalyticsGlobal::with_function(|args: &[Value]| {
        println!("  -> {}", format_call(args));
    });

    let (feed, observer) = FocusFeed::new();
    let environment = DecorationEnvironment::new(
        Arc::new(scenario.media_environment()),
        Arc::new(observer),
        Arc::new(TokioScheduler::new(runtime.handle().clone())),
    );

    println!("Installing decorator...");
    let installation = install(config.apply(gtag_config(&gtag)), &environment)?;
    println!("Instance ID: {}", installation.instance_id());

    let report = installation.probe_report();
    println!(
        "Media features: {} resolved, {} skipped",
        report.resolved.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  skipped: {failure}");
    }
    println!();

    for call in &scenario.calls {
        println!("{}", format_call(call));
        gtag.call(call);
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")?;

    if config.keyboard_detection && !scenario.focus_timeline.is_empty() {
        println!();
        println!("Replaying focus timeline (Ctrl+C to stop)...");

        // Apply each change mid-interval so it lands before the next tick.
        let interval = config.poll_interval;
        runtime.block_on(tokio::time::sleep(interval / 2));

        let ticks = max_ticks.unwrap_or(scenario.focus_timeline.len());
        for (tick, change) in scenario.focus_timeline.iter().take(ticks).enumerate() {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            if let Some(change) = change {
                tracing::debug!(tick, ?change, "Applying focus change");
                feed.push(change.clone());
            }
            runtime.block_on(tokio::time::sleep(interval));

            if installation.detection_state() == Some(DetectionState::Detected) {
                println!("Keyboard usage detected on tick {}", tick + 1);
                break;
            }
        }

        if installation.detection_state() != Some(DetectionState::Detected) {
            println!("Keyboard usage not detected");
        }

        println!();
        for call in &scenario.calls {
            println!("{}", format_call(call));
            gtag.call(call);
        }
    }

    installation.cancel_keyboard_detection();
    runtime.shutdown_timeout(Duration::from_millis(100));

    println!();
    println!("{}", installation.transparency_log().summary());
    Ok(())
}

fn cmd_features(config: &Config) {
    println!("Tracked media features");
    println!("======================");
    println!();
    for spec in &config.features {
        print_feature(spec);
    }
    println!("  {:<28} true (once detected)", "uses_keyboard");
}

fn print_feature(spec: &MediaFeatureSpec) {
    println!("  {:<28} {}", spec.key(), spec.possible_values.join(" | "));
}

fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    if init {
        let path = config.save().context("writing config file")?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
