use clap::{Args, Parser, Subcommand};
use primecache::config::Config;
use primecache::engine::{Engine, ExtensionMethod, GenerateOptions, Method};
use primecache::error::{EngineError, EngineResult};
use primecache::import::parse_prime_list;
use primecache::planner::Algorithm;
use primecache::storage::IncrementalCacheStore;
use primecache::verify::{VerifyOptions, VerifyReport};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "primecache")]
#[command(
    version,
    about = "Incremental prime cache - generate, verify and extend a persistent prime list",
    long_about = None
)]
struct Cli {
    #[arg(long, global = true, help = "Path of the prime store (default: data dir)")]
    store: Option<PathBuf>,
    #[arg(long, global = true, help = "Path of the config file")]
    config: Option<PathBuf>,
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "More output (-v info, -vv debug)"
    )]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Make sure every prime up to a bound is cached")]
    Generate(GenerateArgs),
    #[command(about = "Show statistics for the stored cache")]
    Stats,
    #[command(about = "Check the stored cache for structure, primality and completeness")]
    Verify {
        #[arg(short, long, help = "Only check values up to this limit")]
        limit: Option<u64>,
        #[arg(long, help = "Skip primality and completeness checks")]
        structure_only: bool,
        #[arg(long, help = "Skip the reference sieve comparison")]
        no_completeness: bool,
    },
    #[command(about = "Merge a published prime list into the cache")]
    Import {
        #[arg(help = "Text file with primes separated by whitespace")]
        file: PathBuf,
        #[arg(long, help = "The list holds every prime up to this value")]
        verified_up_to: u64,
    },
    #[command(about = "Print cached primes, one per line")]
    List {
        #[arg(short, long, help = "Stop at this value")]
        up_to: Option<u64>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(help = "The upper bound (inclusive)")]
    bound: u64,
    #[arg(short, long, help = "Number of worker threads")]
    workers: Option<usize>,
    #[arg(short, long, help = "Numbers per sieve segment")]
    segment: Option<u64>,
    #[arg(long, help = "Ignore the stored cache and start over")]
    force_rebuild: bool,
    #[arg(long, conflicts_with = "trial_division", help = "Always sieve the new range")]
    sieve: bool,
    #[arg(long, help = "Always use trial division for the new range")]
    trial_division: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("Hint: {}", hint);
            } else if e.is_retryable() {
                eprintln!("Hint: The cache was left unchanged; run the command again");
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> EngineResult<ExitCode> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("primecache=warn"),
        1 => EnvFilter::new("primecache=info"),
        _ => EnvFilter::new("primecache=debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let store_path = cli
        .store
        .or_else(|| config.store.path.clone())
        .unwrap_or_else(IncrementalCacheStore::default_location);
    debug!("Using store {}", store_path.display());
    let engine = Engine::new(IncrementalCacheStore::new(store_path), &config);

    match cli.command {
        Commands::Generate(args) => generate(&engine, args),
        Commands::Stats => {
            match engine.stats() {
                Some(stats) => print!("{}", stats),
                None => println!("No prime cache at {}", engine.store().path().display()),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify {
            limit,
            structure_only,
            no_completeness,
        } => {
            let mut opts = if structure_only {
                VerifyOptions::structure_only()
            } else {
                VerifyOptions::default()
            };
            opts.limit = limit;
            if no_completeness {
                opts.check_completeness = false;
            }
            let report = engine.verify_cache(&opts);
            print_report(&report);
            Ok(if report.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Import { file, verified_up_to } => {
            let text = fs::read_to_string(&file)
                .map_err(|e| EngineError::io(format!("reading {}", file.display()), e))?;
            let primes = parse_prime_list(&text);
            println!("Read {} values from {}", primes.len(), file.display());

            let outcome = engine.merge_external(&primes, verified_up_to)?;
            if outcome.written {
                println!(
                    "Added {} primes ({} already cached); cache complete up to {}",
                    outcome.added, outcome.duplicates, outcome.max_checked
                );
            } else {
                println!(
                    "Nothing new: cache already complete up to {} ({} values confirmed)",
                    outcome.max_checked, outcome.duplicates
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::List { up_to } => {
            list(&engine, up_to).map_err(|e| EngineError::io("writing primes to stdout", e))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn generate(engine: &Engine, args: GenerateArgs) -> EngineResult<ExitCode> {
    let start = Instant::now();
    let method = if args.sieve {
        Method::Sieve
    } else if args.trial_division {
        Method::TrialDivision
    } else {
        Method::Auto
    };
    let opts = GenerateOptions {
        worker_count: args.workers,
        segment_size: args.segment,
        force_rebuild: args.force_rebuild,
        method,
    };

    println!("Finding primes up to {}...", args.bound);
    let view = engine.ensure_primes_up_to(args.bound, &opts)?;

    match &view.computed {
        Some(run) => {
            if let ExtensionMethod::Sieve(plan) = run.method {
                println!("Strategy: {}", plan.describe());
                if plan.algorithm != Algorithm::Plain {
                    let segments = plan.estimated_segments(run.end - run.start + 1);
                    println!("Segments: {}", segments);
                }
            } else {
                println!("Strategy: trial division");
            }
            println!("Computed [{}, {}]: {} new primes", run.start, run.end, run.new_primes);
        }
        None => println!("Already cached, nothing to compute"),
    }
    println!("\nTotal: {} primes up to {}", view.primes.len(), view.max_checked);

    let duration_us = start.elapsed().as_micros();
    println!(
        "Execution time: {}us ({:.2}ms)",
        duration_us,
        duration_us as f64 / 1000.0
    );
    Ok(ExitCode::SUCCESS)
}

fn list(engine: &Engine, up_to: Option<u64>) -> io::Result<()> {
    let cache = engine.store().load();
    let bound = up_to.unwrap_or(u64::MAX);

    let stdout = io::stdout();
    let mut writer = BufWriter::with_capacity(256 * 1024, stdout.lock());
    let mut itoa_buf = itoa::Buffer::new();
    for &prime in cache.primes.range(0..=bound) {
        writer.write_all(itoa_buf.format(prime).as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

fn print_report(report: &VerifyReport) {
    if !report.store_found {
        println!("No prime cache found");
        return;
    }
    println!(
        "Structure:    {}",
        if report.is_structurally_valid { "ok" } else { "INVALID" }
    );
    for problem in &report.structural_problems {
        println!("  - {}", problem);
    }
    for warning in &report.warnings {
        println!("Warning:      {}", warning);
    }
    if report.checked_primes > 0 {
        println!(
            "Primality:    {} checked, {} failed",
            report.checked_primes,
            report.primes_failing_primality.len()
        );
        print_sample("  not prime:", &report.primes_failing_primality);
    }
    if report.checked_up_to > 0 {
        println!(
            "Completeness: up to {}, {} missing, {} superfluous",
            report.checked_up_to,
            report.missing_in_range.len(),
            report.superfluous.len()
        );
        print_sample("  missing:", &report.missing_in_range);
        print_sample("  superfluous:", &report.superfluous);
    }
    println!("\nResult:       {}", if report.is_ok() { "OK" } else { "FAILED" });
}

fn print_sample(label: &str, values: &[u64]) {
    if values.is_empty() {
        return;
    }
    let shown: Vec<String> = values.iter().take(10).map(|v| v.to_string()).collect();
    let more = if values.len() > 10 { ", ..." } else { "" };
    println!("{} {}{}", label, shown.join(", "), more);
}
