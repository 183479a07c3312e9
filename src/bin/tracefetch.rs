//! tracefetch CLI: walk JSON trace extracts in order with read-ahead loading.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracefetch::config::Config;
use tracefetch::model::{ExtractSet, JsonExtract};
use tracefetch::prefetch::Prefetcher;
use tracefetch::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "tracefetch", about = "Read-ahead loader for trace extracts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print one summary line per extract file, in the given order
    Summarize {
        /// JSON extract files, oldest first
        files: Vec<PathBuf>,
        /// Maximum work items loading at once
        #[arg(long)]
        max_parallel: Option<usize>,
        /// Maximum work items loaded ahead of the one being printed
        #[arg(long)]
        gap_threshold: Option<usize>,
        /// Number of consecutive files that form one test
        #[arg(long, default_value_t = 1)]
        test_size: usize,
        /// Only prefetch files whose name contains this text; others are
        /// loaded when printed
        #[arg(long)]
        prefetch_only: Option<String>,
        /// Stop at the first file that cannot be loaded
        #[arg(long)]
        fail_fast: bool,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Summarize {
            files,
            max_parallel,
            gap_threshold,
            test_size,
            prefetch_only,
            fail_fast,
        } => {
            let _guard = init_telemetry(TelemetryConfig {
                endpoint: config.otel_endpoint.clone(),
                service_name: "tracefetch".to_string(),
                log_level: config.log_level.clone(),
            })?;

            let mut prefetch = config.prefetch;
            if let Some(n) = max_parallel {
                prefetch = prefetch.with_max_parallel(n);
            }
            if let Some(n) = gap_threshold {
                prefetch = prefetch.with_gap_threshold(n);
            }

            let options = SummarizeOptions {
                test_size,
                prefetch_only,
                fail_fast,
            };
            cmd_summarize(files, prefetch, options).await
        }
        Command::Config => cmd_config(&config),
    }
}

struct SummarizeOptions {
    test_size: usize,
    prefetch_only: Option<String>,
    fail_fast: bool,
}

async fn cmd_summarize(
    files: Vec<PathBuf>,
    prefetch: tracefetch::PrefetchConfig,
    options: SummarizeOptions,
) -> anyhow::Result<()> {
    if files.is_empty() {
        eprintln!("No files to process were found.");
        return Ok(());
    }
    if options.test_size == 0 {
        anyhow::bail!("--test-size must be at least 1");
    }

    let tests: Vec<ExtractSet<Value>> = files
        .chunks(options.test_size)
        .enumerate()
        .map(|(n, chunk)| ExtractSet::new(format!("test-{n}"), chunk.iter().cloned()))
        .collect();

    let prefetch_only = options.prefetch_only;
    let filter = move |file: &JsonExtract<Value>| match &prefetch_only {
        Some(needle) => file_name(file.path()).contains(needle.as_str()),
        None => true,
    };

    let mut prefetched = Prefetcher::start(tests, filter, prefetch)?;
    let mut failures = 0usize;

    while let Some(test) = prefetched.next().await {
        let test = match test {
            Ok(test) => test,
            Err(e) if options.fail_fast => return Err(e.into()),
            Err(e) => {
                eprintln!("error: {e}");
                failures += 1;
                continue;
            }
        };

        // `test` releases its extracts when it goes out of scope
        for file in test.files() {
            // Files the filter skipped are read and parsed here.
            match file.extract_in_place() {
                Ok(value) => println!(
                    "{:<10}  {:<40}  {}",
                    test.name(),
                    file_name(file.path()),
                    describe(&value)
                ),
                Err(e) if options.fail_fast => return Err(e.into()),
                Err(e) => {
                    eprintln!("error: {}: {e}", file.path().display());
                    failures += 1;
                }
            }
        }
    }

    let stats = prefetched.stats();
    eprintln!(
        "{} test(s), peak {} loading at once, {} failure(s)",
        stats.items, stats.peak_in_flight, failures
    );
    Ok(())
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    println!("Max Parallel:   {}", config.prefetch.max_parallel);
    println!("Gap Threshold:  {}", config.prefetch.gap_threshold);
    println!("Log Level:      {}", config.log_level);
    println!(
        "OTLP Endpoint:  {}",
        config.otel_endpoint.as_deref().unwrap_or("-")
    );
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn describe(value: &Value) -> String {
    match value {
        Value::Object(map) => format!("object, {} key(s)", map.len()),
        Value::Array(items) => format!("array, {} element(s)", items.len()),
        Value::String(_) => "string".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Null => "null".to_string(),
    }
}
