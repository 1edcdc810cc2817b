use clap::Parser;
use phasegate::cli::{self, Cli, Commands, RunOverrides};
use phasegate::config::AppConfig;
use phasegate::error::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;
    init_logging(&config);

    match cli.command {
        Commands::Run {
            sentiment_index,
            volume_ratio,
            flows,
            flows_file,
            price,
            kappa,
            trap_cutoff,
            experiment_id,
            lite_starve_cycles,
        } => {
            let overrides = RunOverrides {
                sentiment_index,
                volume_ratio,
                flows,
                flows_file,
                price,
                kappa,
                trap_cutoff,
                experiment_id,
                lite_starve_cycles,
            };
            let decision = cli::run_once(config, overrides)?;
            cli::print_decision(&decision);
        }
        Commands::Tail { count } => {
            cli::show_tail(&config, count)?;
        }
        Commands::Fixture { seed } => {
            cli::write_fixtures(&config, seed)?;
        }
    }

    Ok(())
}

fn init_logging(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},phasegate=debug", config.logging.level))
    });

    // Optional file output when PHASEGATE_LOG_DIR is set.
    //
    // Important: `tracing_appender::rolling::daily` will panic (and in our
    // release build, abort) if it can't create the initial log file. So we
    // must preflight writability.
    let file_layer = std::env::var("PHASEGATE_LOG_DIR").ok().and_then(|log_dir| {
        if std::fs::create_dir_all(&log_dir).is_err() {
            eprintln!("Warning: could not create log directory {log_dir}, file logging disabled");
            return None;
        }
        let test_path = std::path::Path::new(&log_dir).join(".phasegate_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(&log_dir, "phasegate.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the duration of the process
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false) // No color codes in file
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: could not write to log directory {log_dir} ({e}), file logging disabled"
                );
                None
            }
        }
    });

    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init();
    }
}
