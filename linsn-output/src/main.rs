//! Linsn RV9 playback daemon entry point.
//!
//! ```text
//! linsn-output                   Stream the configured pattern
//! linsn-output --config <path>   Load a custom config TOML
//! linsn-output --gen-config      Write default config to stdout
//! linsn-output --dry-run         Record frames instead of sending
//! linsn-output --ticks <n>       Stop after n ticks
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use linsn_output::config::DaemonConfig;
use linsn_output::pattern::Pattern;
use linsn_output::service::PlaybackService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "linsn-output", about = "Linsn RV9 raw-Ethernet LED panel output")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "linsn-output.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Record frames in memory instead of opening a raw socket.
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many ticks.
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the configured test pattern.
    #[arg(long)]
    pattern: Option<Pattern>,

    /// Override the configured network interface.
    #[arg(short, long)]
    interface: Option<String>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&DaemonConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = DaemonConfig::load(&cli.config);
    if let Some(pattern) = cli.pattern {
        config.playback.pattern = pattern;
    }
    if let Some(interface) = cli.interface {
        config.output.interface = interface;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("linsn-output v{}", env!("CARGO_PKG_VERSION"));
    info!("interface: {}", config.output.interface);
    info!("panels: {}", config.output.panels.len());
    info!("target FPS: {}", config.fps());

    let service = PlaybackService::new(config)
        .dry_run(cli.dry_run)
        .max_ticks(cli.ticks);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    let stats = service.run().await?;
    if cli.dry_run {
        info!("recorded {} frames", stats.frames_recorded);
    }

    Ok(())
}
