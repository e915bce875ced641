//! VitalWatch - Serial Sensor Dashboard Binary
//!
//! Watches a serial-connected sensor board and serves a live status dashboard.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vital_watch::{
    parse_line, start_web_server, DeviceLocator, IntervalScheduler, MonitorConfig, Presenter,
    SessionLog, SystemSerial, ThresholdTable, SENSOR_KEYS,
};

#[derive(Parser)]
#[command(name = "vital_watch")]
#[command(about = "🩺 VitalWatch - Serial Sensor Dashboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Austin Couch")]
#[command(
    long_about = "Reads KEY:VALUE telemetry from a serial sensor board, classifies each sensor and serves a live dashboard"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Web server bind address
    #[arg(long)]
    host: Option<String>,

    /// Web server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Serial line speed
    #[arg(long)]
    baud: Option<u32>,

    /// Open this serial port instead of searching by description
    #[arg(long)]
    serial_port: Option<String>,

    /// Port description substring to search for (repeatable)
    #[arg(long = "port-match")]
    port_match: Vec<String>,

    /// Session log CSV file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard (default)
    Serve(ServeArgs),

    /// List serial ports and mark the ones that look like the sensor board
    Ports,

    /// Parse and evaluate a single telemetry line, then exit
    Check(CheckArgs),
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Directory with a custom index.html (optional)
    #[arg(long)]
    static_dir: Option<String>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Maximum WebSocket connections
    #[arg(long)]
    max_connections: Option<usize>,
}

#[derive(Args)]
struct CheckArgs {
    /// Telemetry line, e.g. "TEMP:36.2°C,FLAME:Fire Detected"
    line: String,

    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve(args)) => {
            print_banner();
            serve_command(&cli, args).await?;
        }
        Some(Commands::Ports) => {
            ports_command(&cli)?;
        }
        Some(Commands::Check(args)) => {
            check_command(args)?;
        }
        None => {
            print_banner();
            serve_command(&cli, &ServeArgs::default()).await?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let filter = log_filter(cli, std::env::var("RUST_LOG").ok().as_deref());

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// `RUST_LOG` wins when set and valid; otherwise the level comes from the flags.
fn log_filter(cli: &Cli, rust_log: Option<&str>) -> EnvFilter {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| {
            EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
        })
}

fn print_banner() {
    println!("🩺 VitalWatch - Serial Sensor Dashboard");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!("   Press Ctrl-C to stop");
    println!();
}

/// File settings first, then command-line overrides.
fn build_config(
    cli: &Cli,
    args: Option<&ServeArgs>,
) -> Result<MonitorConfig, Box<dyn std::error::Error>> {
    let mut config = MonitorConfig::load_or_default(cli.config.as_deref())?;

    if let Some(host) = &cli.host {
        config.web = config.web.with_host(host.clone());
    }
    if let Some(port) = cli.port {
        config.web = config.web.with_port(port);
    }
    if let Some(baud) = cli.baud {
        config = config.with_baud_rate(baud);
    }
    if cli.serial_port.is_some() {
        config = config.with_port(cli.serial_port.clone());
    }
    if !cli.port_match.is_empty() {
        config = config.with_port_matchers(cli.port_match.iter().cloned());
    }
    if let Some(log_file) = &cli.log_file {
        config = config.with_log_path(log_file.clone());
    }

    if let Some(args) = args {
        if args.static_dir.is_some() {
            config.web = config.web.with_static_path(args.static_dir.clone());
        }
        if args.no_cors {
            config.web = config.web.with_cors(false);
        }
        if let Some(max) = args.max_connections {
            config.web = config.web.with_max_websocket_connections(max);
        }
    }

    config.validate()?;
    Ok(config)
}

async fn serve_command(cli: &Cli, args: &ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting VitalWatch...");

    let config = build_config(cli, Some(args))?;

    let log = SessionLog::open(&config.log.path)?;
    info!("Logging readings to {}", config.log.path.display());

    let presenter = Presenter::new(&config, Box::new(SystemSerial::new()), log);
    let (snapshot_tx, snapshot_rx) = watch::channel(presenter.snapshot());
    let scheduler = IntervalScheduler::from_config(&config.dashboard);

    info!("Dashboard configuration:");
    match &config.serial.port {
        Some(port) => info!("  - Serial port: {}", port),
        None => info!("  - Port matchers: {:?}", config.serial.port_matchers),
    }
    info!("  - Baud rate: {}", config.serial.baud_rate);
    info!("  - Data interval: {}ms", config.dashboard.data_interval_ms);
    info!("  - Bind address: {}", config.web.bind_address());
    info!("  - CORS enabled: {}", config.web.enable_cors);
    info!(
        "  - Max WebSocket connections: {}",
        config.web.max_websocket_connections
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        let _ = stop_tx.send(true);
    });

    let presenter_task = tokio::spawn(presenter.run(
        scheduler,
        snapshot_tx,
        stopped(stop_rx.clone()),
    ));

    info!("Starting web server...");
    if let Err(e) = start_web_server(config.web, snapshot_rx, stopped(stop_rx)).await {
        error!("Web server failed: {}", e);
        presenter_task.abort();
        return Err(e.into());
    }

    match presenter_task.await {
        Ok(result) => result?,
        Err(e) if e.is_cancelled() => warn!("Presenter task cancelled"),
        Err(e) => return Err(e.into()),
    }

    println!("Session log closed: {}", config.log.path.display());
    Ok(())
}

/// Resolves once the stop flag flips or its sender is gone.
async fn stopped(mut stop: watch::Receiver<bool>) {
    loop {
        let stopping = *stop.borrow_and_update();
        if stopping || stop.changed().await.is_err() {
            return;
        }
    }
}

fn ports_command(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(cli, None)?;
    let locator = DeviceLocator::new(config.serial.port_matchers.iter().cloned());
    let ports = locator.list_ports(&SystemSerial::new())?;

    println!("🔌 Serial Ports");
    println!("===============");
    if ports.is_empty() {
        println!("  (none found)");
        return Ok(());
    }

    for port in &ports {
        let marker = if locator.matches(port) { "*" } else { " " };
        println!("{} {:<20} {}", marker, port.name, port.description);
    }
    println!();
    println!("* matches {:?}", locator.matchers());

    Ok(())
}

fn check_command(args: &CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let thresholds = ThresholdTable::default();
    let readings = parse_line(&args.line);

    match args.format.as_str() {
        "json" => {
            let rows: Vec<_> = readings
                .iter()
                .map(|reading| {
                    let evaluation = thresholds.evaluate(&reading.key, &reading.raw_value);
                    serde_json::json!({
                        "key": reading.key,
                        "value": reading.raw_value,
                        "tracked": SENSOR_KEYS.contains(&reading.key.as_str()),
                        "status": evaluation.level,
                        "color": evaluation.color,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        "pretty" => {
            if readings.is_empty() {
                println!("No KEY:VALUE fields found");
                return Ok(());
            }
            for reading in &readings {
                let evaluation = thresholds.evaluate(&reading.key, &reading.raw_value);
                let note = if SENSOR_KEYS.contains(&reading.key.as_str()) {
                    ""
                } else {
                    "  (not shown on dashboard)"
                };
                println!(
                    "{:<8} {:<20} {}{}",
                    reading.key, reading.raw_value, evaluation.level, note
                );
            }
        }
        _ => {
            error!("Unsupported format: {}. Use 'json' or 'pretty'", args.format);
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vital_watch::DEFAULT_WEB_PORT;

    fn enabled_levels(filter: EnvFilter) -> [bool; 4] {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            [
                tracing::enabled!(Level::DEBUG),
                tracing::enabled!(Level::INFO),
                tracing::enabled!(Level::WARN),
                tracing::enabled!(Level::ERROR),
            ]
        })
    }

    #[test]
    fn test_debug_flag_enables_debug() {
        let cli = Cli::try_parse_from(["vital_watch", "--debug"]).unwrap();
        assert_eq!(enabled_levels(log_filter(&cli, None)), [true, true, true, true]);
    }

    #[test]
    fn test_default_logging_keeps_warnings() {
        let cli = Cli::try_parse_from(["vital_watch"]).unwrap();
        assert_eq!(enabled_levels(log_filter(&cli, None)), [false, false, true, true]);

        let cli = Cli::try_parse_from(["vital_watch", "--verbose"]).unwrap();
        assert_eq!(enabled_levels(log_filter(&cli, None)), [false, true, true, true]);
    }

    #[test]
    fn test_rust_log_overrides_flags() {
        let cli = Cli::try_parse_from(["vital_watch", "--debug"]).unwrap();
        assert_eq!(
            enabled_levels(log_filter(&cli, Some("error"))),
            [false, false, false, true]
        );
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["vital_watch", "--port", "9090", "--baud", "115200"]).unwrap();
        assert_eq!(cli.port, Some(9090));
        assert_eq!(cli.baud, Some(115200));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["vital_watch"]).unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.web.port, DEFAULT_WEB_PORT);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_repeatable_port_match() {
        let cli = Cli::try_parse_from([
            "vital_watch",
            "--port-match",
            "CP210",
            "--port-match",
            "FTDI",
            "ports",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.serial.port_matchers, vec!["CP210", "FTDI"]);
        assert!(matches!(cli.command, Some(Commands::Ports)));
    }

    #[test]
    fn test_serve_args_override_web_config() {
        let cli = Cli::try_parse_from([
            "vital_watch",
            "serve",
            "--no-cors",
            "--max-connections",
            "5",
        ])
        .unwrap();
        let Some(Commands::Serve(args)) = &cli.command else {
            panic!("expected serve");
        };
        let config = build_config(&cli, Some(args)).unwrap();
        assert!(!config.web.enable_cors);
        assert_eq!(config.web.max_websocket_connections, 5);
    }

    #[test]
    fn test_check_subcommand() {
        let cli = Cli::try_parse_from(["vital_watch", "check", "TEMP:36", "--format", "json"])
            .unwrap();
        let Some(Commands::Check(args)) = &cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.line, "TEMP:36");
        assert_eq!(args.format, "json");
        assert!(check_command(args).is_ok());
    }
}
