use log::LevelFilter;
use mediaduration::{
    BatchQueue, DurationResolver, ItemStatus, QueueConfig, RemoteConfig, ResolverConfig,
};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;

struct Args {
    sources: Vec<String>,
    verbose: bool,
    parallel: usize,
    probe: bool,
    config_path: Option<String>,
}

fn usage() {
    println!("Usage: duration_scanner <path-or-url>... [-v] [--parallel N] [--no-probe] [--config FILE]");
    println!("Example: duration_scanner clips/*.mp4 --parallel 4");
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        sources: Vec::new(),
        verbose: false,
        parallel: QueueConfig::default().max_parallel,
        probe: true,
        config_path: None,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => args.verbose = true,
            "--no-probe" => args.probe = false,
            "--parallel" => {
                let value = iter.next().ok_or("--parallel needs a value")?;
                args.parallel = value
                    .parse()
                    .map_err(|_| format!("invalid --parallel value: {}", value))?;
            }
            "--config" => {
                args.config_path = Some(iter.next().ok_or("--config needs a file")?);
            }
            flag if flag.starts_with('-') => return Err(format!("unknown option: {}", flag)),
            _ => args.sources.push(arg),
        }
    }

    if args.sources.is_empty() {
        return Err("no input given".to_string());
    }
    Ok(args)
}

fn load_config(args: &Args) -> Result<ResolverConfig, String> {
    let mut config = match &args.config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path, e))?;
            ResolverConfig::from_json_str(&json).map_err(|e| e.to_string())?
        }
        None => ResolverConfig::default(),
    };

    if config.remote.api_key.is_none() {
        let from_env = RemoteConfig::from_env();
        config.remote.api_key = from_env.api_key;
    }
    if !args.probe {
        config.probe.enabled = false;
    }
    config.queue.max_parallel = args.parallel;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// `info` unless `-v` asks for `debug`; `RUST_LOG` overrides both.
fn default_log_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn display_name(source: &str) -> String {
    source
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(source)
        .to_string()
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            usage();
            return ExitCode::from(2);
        }
    };

    env_logger::Builder::new()
        .filter_level(default_log_level(args.verbose))
        .parse_default_env()
        .init();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let resolver = Arc::new(DurationResolver::from_config(&config));
    let queue = Arc::new(BatchQueue::new(resolver, &config.queue));
    for source in &args.sources {
        let size = std::fs::metadata(source).map(|m| m.len()).unwrap_or(0);
        queue.enqueue(display_name(source), source.clone(), size);
    }

    let stats = queue.process_all().await;

    for item in queue.snapshot().iter() {
        match item.status {
            ItemStatus::Completed => println!(
                "{}\tok\t{:.3}\t{}",
                item.name,
                item.duration,
                item.source.map(|s| s.name()).unwrap_or("-")
            ),
            _ => println!(
                "{}\terror\t-\t{}",
                item.name,
                item.error.as_deref().unwrap_or("not processed")
            ),
        }
    }

    println!();
    println!("completed: {}  errors: {}", stats.completed, stats.errored);
    println!("sum: {:.3}s", stats.sum_seconds);
    if let (Some(avg), Some(max), Some(min)) =
        (stats.average_seconds, stats.max_seconds, stats.min_seconds)
    {
        println!("avg: {:.3}s  max: {:.3}s  min: {:.3}s", avg, max, min);
    }

    if stats.errored > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
