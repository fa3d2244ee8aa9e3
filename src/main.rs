use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use sysmon::config::{self, Config, ConfigHandle};
use sysmon::monitor::Monitor;
use sysmon::system::collector::SysinfoSource;
use sysmon::system::process::{ProcessFilter, ProcessQuery, SortKey};
use sysmon::system::snapshot::Snapshot;
use sysmon::theme::{ColorFgBg, ThemeMode};
use sysmon::ui;

/// Samples used for the rolling CPU average in the status line.
const MEAN_WINDOW: usize = 10;

#[derive(Parser)]
#[command(
    name = "sysmon",
    about = "System metrics sampler with a ranked process table"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling interval in seconds (0.25 to 10)
    #[arg(long)]
    interval: Option<f64>,

    /// Theme: dark, light, auto
    #[arg(long)]
    theme: Option<String>,

    /// Sort processes by: cpu, mem, pid
    #[arg(long, default_value = "cpu")]
    sort: String,

    /// Only show processes owned by this user
    #[arg(long)]
    user: Option<String>,

    /// Only show processes whose name or command contains this text
    #[arg(long)]
    name: Option<String>,

    /// Maximum process rows per snapshot
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Stop after this many snapshots
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    count: Option<u64>,

    /// Print each snapshot as a JSON line instead of text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Write the effective settings back to the config file
    #[arg(long, default_value_t = false)]
    save: bool,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_config_for_cli(&cli)?;
    if cli.save {
        let path = cli
            .config
            .clone()
            .or_else(config::config_path)
            .ok_or_else(|| eyre!("no config directory available, pass --config"))?;
        config::save_config(&path, &config)?;
    }

    let query = ProcessQuery {
        sort: SortKey::from_str_config(&cli.sort),
        filter: ProcessFilter {
            user: cli.user.clone(),
            name: cli.name.clone(),
        },
        limit: Some(cli.limit),
    };

    let theme = config.theme.resolve(&ColorFgBg);
    let source = SysinfoSource::new();
    let host = source.host_info().clone();
    if !cli.json {
        for line in ui::header::render(&host, host.uptime(), theme) {
            println!("{line}");
        }
    }

    let monitor = Monitor::spawn(source, ConfigHandle::new(config));
    let (tx, mut rx) = mpsc::unbounded_channel::<Arc<Snapshot>>();
    monitor.subscribe(move |snapshot: &Arc<Snapshot>| {
        let _ = tx.send(Arc::clone(snapshot));
    });

    pump(&mut rx, tokio::signal::ctrl_c(), cli.count, |snapshot| {
        if cli.json {
            println!("{}", serde_json::to_string(snapshot)?);
        } else {
            print_snapshot(&monitor, snapshot, &query);
        }
        Ok(())
    })
    .await?;

    monitor.shutdown().await;
    Ok(())
}

/// Emit snapshots until `stop` resolves, the channel closes, or `count`
/// snapshots were emitted. `stop` is polled first and lives across
/// iterations, so a signal that lands during `emit` is not lost.
async fn pump<S: Future>(
    rx: &mut mpsc::UnboundedReceiver<Arc<Snapshot>>,
    stop: S,
    count: Option<u64>,
    mut emit: impl FnMut(&Snapshot) -> Result<()>,
) -> Result<u64> {
    tokio::pin!(stop);
    let mut emitted = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            next = rx.recv() => {
                let Some(snapshot) = next else { break };
                emit(&snapshot)?;
                emitted += 1;
                if count.is_some_and(|count| emitted >= count) {
                    break;
                }
            }
        }
    }
    Ok(emitted)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("SYSMON_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config_for_cli(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => config::load_config_from_path(path),
        None => config::load_config(),
    };

    if let Some(secs) = cli.interval {
        config = config.with_interval(secs);
    }
    if let Some(ref theme) = cli.theme {
        let mode = ThemeMode::from_str_config(theme)
            .ok_or_else(|| eyre!("unknown theme `{theme}`, expected dark, light or auto"))?;
        config = config.with_theme(mode);
    }

    Ok(config)
}

fn print_snapshot(monitor: &Monitor, snapshot: &Snapshot, query: &ProcessQuery) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let rows = sysmon::system::process::build_process_table(snapshot, query);

    println!();
    for line in ui::gauges::render(snapshot) {
        println!("{line}");
    }
    for line in ui::table::render(&rows, now) {
        println!("{line}");
    }
    println!(
        "{}",
        ui::statusbar::render(
            snapshot,
            monitor.config().current().interval(),
            monitor.stats(),
            monitor.mean_cpu(MEAN_WINDOW),
        )
    );
}
