use clap::{Parser, Subcommand};
use duplimon::config::ConfigLoader;
use duplimon::metrics::registry::SENSORS;
use duplimon::metrics::values::ReconciledMetrics;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "duplimon")]
#[command(version = "0.1.0")]
#[command(about = "Duplicati backup status monitor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the backup job on an interval and display its sensors
    Run {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Show a live status line (stderr)
        #[arg(short, long, default_value_t = true)]
        progress: bool,
    },
    /// Validate a configuration file and probe the server
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Fetch and print the current backup status once
    Status {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Ask the server to start a backup run now
    Trigger {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn status_line(metrics: &ReconciledMetrics) -> String {
    let status = metrics
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "No data".to_string());
    let execution = metrics
        .last_execution
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    format!("Status: {} | Last run: {}", status, execution)
}

fn print_metrics(metrics: &ReconciledMetrics) {
    for sensor in SENSORS {
        let value = match metrics.get(sensor.id) {
            Some(value) => value.to_string(),
            None => "-".to_string(),
        };
        println!("   {}: {}", sensor.name, value);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let multi = Arc::new(indicatif::MultiProgress::new());

    match cli.command {
        Commands::Run { config, progress } => {
            if progress {
                let multi_clone = multi.clone();
                indicatif_log_bridge::LogWrapper::new((*multi_clone).clone(), logger)
                    .try_init()
                    .unwrap();
            } else {
                log::set_boxed_logger(Box::new(logger)).unwrap();
                log::set_max_level(log::LevelFilter::Info);
            }

            log::info!("Loading config from {:?}", config);
            let config_data = ConfigLoader::load(&config)?;
            let engine = ConfigLoader::create_engine(&config_data, Some(multi.clone()))?;

            let mut _status_task = None;
            if progress {
                let pb = multi.add(ProgressBar::new_spinner());
                pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
                pb.enable_steady_tick(Duration::from_millis(250));
                pb.set_message("Waiting for first poll...");

                let mut updates = engine.subscribe();
                _status_task = Some(tokio::spawn(async move {
                    while updates.changed().await.is_ok() {
                        let latest = updates.borrow().clone();
                        if let Some(metrics) = latest {
                            pb.set_message(status_line(&metrics));
                        }
                    }
                }));
            }

            engine.run().await;

            if let Some(task) = _status_task {
                task.abort();
            }
            if let Some(metrics) = engine.current().await {
                println!("\nLast known state:");
                print_metrics(&metrics);
            }
        }
        Commands::Check { config } => {
            log::set_boxed_logger(Box::new(logger)).unwrap();
            log::set_max_level(log::LevelFilter::Info);

            match ConfigLoader::load(&config) {
                Ok(cfg) => {
                    println!("✅ Config is valid:");
                    println!("   Server: {}", cfg.base_url);
                    println!("   Backup ID: {}", cfg.backup_id);
                    println!("   Poll interval: {}s", cfg.poll_interval_secs);

                    let client = ConfigLoader::create_client(&cfg)?;
                    match client.get_system_info().await {
                        Ok(info) => {
                            let version =
                                info.server_version.unwrap_or_else(|| "Unknown".to_string());
                            match info.api_version {
                                Some(api) => {
                                    println!("   Server version: {} (API v{})", version, api)
                                }
                                None => println!("   Server version: {}", version),
                            }
                        }
                        Err(e) => {
                            eprintln!("❌ Server unreachable: {}", e);
                            std::process::exit(1);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Status { config } => {
            log::set_boxed_logger(Box::new(logger)).unwrap();
            log::set_max_level(log::LevelFilter::Info);

            let cfg = ConfigLoader::load(&config)?;
            let client = ConfigLoader::create_client(&cfg)?;
            let entry = client.get_backup(&cfg.backup_id).await?;
            let metrics = duplimon::reconcile(&entry.metadata)?;
            let name = entry.name.unwrap_or_else(|| cfg.backup_id.clone());
            println!("Backup '{}':", name);
            print_metrics(&metrics);
        }
        Commands::Trigger { config } => {
            log::set_boxed_logger(Box::new(logger)).unwrap();
            log::set_max_level(log::LevelFilter::Info);

            let cfg = ConfigLoader::load(&config)?;
            let client = ConfigLoader::create_client(&cfg)?;
            client.start_backup(&cfg.backup_id).await?;
            println!("✅ Backup run requested for job {}", cfg.backup_id);
        }
    }

    Ok(())
}
