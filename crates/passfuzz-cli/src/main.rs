//! Fuzz the bundled demo pipeline from the command line.

mod demo;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use passfuzz::{
    EventCollector, EventSink, FuzzConfig, FuzzRunRecord, Fuzzer, MultiplexSink, Presets,
    TracingSink,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "passfuzz")]
#[command(about = "Differential fuzzing of a demo tree-rewriting pipeline")]
struct Args {
    /// First seed; random when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Seeds per stage and root
    #[arg(short = 'n', long)]
    seed_count: Option<u64>,

    /// Maximum depth of generated trees
    #[arg(short, long)]
    depth: Option<usize>,

    /// Stop at the first failure
    #[arg(long)]
    failfast: bool,

    /// Check pass properties as well as output schemas
    #[arg(long)]
    check_props: bool,

    /// First stage to fuzz (1-based)
    #[arg(long)]
    start_index: Option<usize>,

    /// Last stage to fuzz, inclusive
    #[arg(long)]
    end_index: Option<usize>,

    /// Start from a preset (quick, standard, exhaustive)
    #[arg(long)]
    preset: Option<String>,

    /// Plant a defect in the folding pass
    #[arg(long, value_enum, default_value = "none")]
    bug: demo::Bug,

    /// Write a JSON record of the run to this file
    #[arg(long)]
    record: Option<PathBuf>,

    /// Log every generated and rewritten tree
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// List presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "passfuzz=info",
        1 => "passfuzz=debug",
        _ => "passfuzz=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> anyhow::Result<i32> {
    if args.list_presets {
        for (name, config) in Presets::all() {
            println!(
                "{name:<12} depth={} seeds={} failfast={} props={}",
                config.max_depth, config.seed_count, config.failfast, config.check_props
            );
        }
        return Ok(0);
    }

    let config = build_config(args)?;
    let collector = args.record.as_ref().map(|_| Arc::new(EventCollector::new()));
    let sink: Arc<dyn EventSink> = match &collector {
        Some(collector) => Arc::new(MultiplexSink::new(vec![
            Box::new(TracingSink::new()),
            Box::new(collector.clone()),
        ])),
        None => Arc::new(TracingSink::new()),
    };

    let pipeline = demo::pipeline(args.bug);
    let fuzzer = Fuzzer::from_rewriter(&pipeline, demo::generators())
        .with_config(config)
        .context("invalid fuzz configuration")?
        .with_sink(sink);

    println!(
        "Fuzzing `{}` stages {}..={} from seed {}",
        pipeline.name,
        fuzzer.start_index(),
        fuzzer.end_index(),
        fuzzer.start_seed()
    );
    let result = fuzzer.run();

    println!(
        "{} seeds over {} stage(s), {} skipped, {} not applicable, {} failure(s) in {:?}",
        result.seeds_run,
        result.stages_tested.len(),
        result.stages_skipped.len(),
        result.not_applicable,
        result.failures.len(),
        result.total_duration
    );
    if let Some(first) = result.first_failure() {
        println!("First failure: {}", first.key);
    }
    if result.stopped_early {
        println!("Stopped early (failfast)");
    }

    let status = result.status();
    if let (Some(path), Some(collector)) = (&args.record, collector) {
        let record = FuzzRunRecord::new(fuzzer.config().clone(), result, collector.take());
        record
            .export_to_file(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(target: "passfuzz", path = %path.display(), "Run record written");
    }

    Ok(status)
}

fn build_config(args: &Args) -> anyhow::Result<FuzzConfig> {
    let mut config = match &args.preset {
        Some(name) => Presets::by_name(name)?,
        None => FuzzConfig::default(),
    };

    if let Some(seed) = args.seed {
        config = config.with_start_seed(seed);
    }
    if let Some(count) = args.seed_count {
        config = config.with_seed_count(count);
    }
    if let Some(depth) = args.depth {
        config = config.with_max_depth(depth);
    }
    if args.failfast {
        config = config.with_failfast(true);
    }
    if args.check_props {
        config = config.with_check_props(true);
    }
    if let Some(start) = args.start_index {
        config = config.with_start_index(start)?;
    }
    if let Some(end) = args.end_index {
        config = config.with_end_index(end);
    }
    Ok(config)
}
