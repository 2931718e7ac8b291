use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

// Use library instead of local modules
use event_enrichment::{
    init_tracing, samples, EventPipeline, MemorySink, PipelineConfig, RawEvent, SharedSink,
    TracingSink,
};

struct Options {
    event_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    trace: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options {
        event_path: None,
        config_path: None,
        trace: false,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "process" => {
                let path = iter.next().context("process needs an event file")?;
                options.event_path = Some(PathBuf::from(path));
            }
            "--config" => {
                let path = iter.next().context("--config needs a file")?;
                options.config_path = Some(PathBuf::from(path));
            }
            "--trace" => options.trace = true,
            other => bail!("unknown argument: {}", other),
        }
    }

    Ok(options)
}

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args)?;

    run(options)
}

fn run(options: Options) -> Result<()> {
    eprintln!("📨 Event Enrichment Pipeline v{}", event_enrichment::VERSION);
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Config
    let config = match &options.config_path {
        Some(path) => {
            let config = PipelineConfig::from_file(path)?;
            eprintln!("✓ Config loaded from {:?}", path);
            config
        }
        None => PipelineConfig::default(),
    };

    // 2. Event
    let raw: RawEvent = match &options.event_path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read event file: {:?}", path))?;
            serde_json::from_str(&content).context("Failed to parse event JSON")?
        }
        None => {
            eprintln!("ℹ️  No event file given, using the sample LOGIN event");
            samples::login_event()
        }
    };

    // 3. Pipeline
    let memory = MemorySink::new();
    let sink: SharedSink = if options.trace {
        Arc::new(memory.clone())
    } else {
        Arc::new(TracingSink)
    };
    let pipeline = EventPipeline::from_config(&config, sink);

    for stage in pipeline.describe() {
        eprintln!("   • {}", stage);
    }

    // 4. Run
    let processed = pipeline.run(raw)?;

    if options.trace {
        eprintln!("\n🔍 Log entries:");
        for entry in memory.entries() {
            eprintln!("   {} = {}", entry.label, entry.value);
        }
    }

    eprintln!("\n✅ Final processed event:");
    println!("{}", serde_json::to_string_pretty(&processed)?);

    Ok(())
}
