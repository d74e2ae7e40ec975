use anyhow::{bail, Context};
use avi_adapters::steps::ProcessDataStep;
use avi_adapters::{AviConfig, AviPipeline, TaskParams};
use avi_core::FlowEventKind;
use avi_tap::HttpTapService;
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "aviflow")]
#[command(version)]
#[command(about = "Pipeline AVI: placeholder, consulta ADQL remota y análisis del VOTable.", long_about = None)]
struct Cli {
    /// Más detalle en el log (-v debug, -vv trace). RUST_LOG tiene prioridad.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ejecuta la cadena completa de tres steps
    Run {
        /// Consulta ADQL
        #[arg(short, long)]
        query: String,
        /// Nombre base de los ficheros de salida
        #[arg(short, long)]
        output_file: String,
        /// Directorio de salida (AVI_OUTPUT_PATH)
        #[arg(long)]
        output_path: Option<PathBuf>,
        /// Endpoint TAP (AVI_TAP_URL)
        #[arg(long)]
        tap_url: Option<String>,
        /// Re-ejecuta aunque las salidas existan
        #[arg(long, action)]
        force: bool,
    },

    /// Analiza un VOTable local y escribe la figura JSON
    Analyze {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = env_logger::Builder::new().filter_level(level).parse_default_env().try_init();
}

fn run(query: String,
       output_file: String,
       output_path: Option<PathBuf>,
       tap_url: Option<String>,
       force: bool)
       -> anyhow::Result<()> {
    let mut config = AviConfig::from_env().context("invalid configuration")?;
    if let Some(path) = output_path {
        config.output_path = path;
    }
    if let Some(url) = tap_url {
        config.tap_url = url;
    }
    config.force |= force;

    let service = HttpTapService::new(&config.tap_url, config.http_timeout).context("cannot build TAP client")?;
    info!("using TAP service {}", service.base_url());
    let params = TaskParams::new(query, output_file);
    let mut engine = AviPipeline::new(&config, &params, Arc::new(service)).into_engine();

    let outcome = engine.run();
    for event in engine.events().unwrap_or_default() {
        match &event.kind {
            FlowEventKind::StepFinished { step_id, .. } => println!("[{}] {step_id} ok", event.seq),
            FlowEventKind::StepFailed { step_id, error, .. } => println!("[{}] {step_id} FAILED: {error}", event.seq),
            FlowEventKind::StepSignal { step_id, signal, data, .. } => {
                println!("[{}] {step_id} {signal} {data}", event.seq)
            }
            _ => {}
        }
    }
    println!("events: {}", engine.event_variants().unwrap_or_default().join(" "));

    match outcome {
        Ok(_) => {
            if let Some(fp) = engine.flow_fingerprint() {
                println!("flow fingerprint: {fp}");
            }
            println!("figure: {}", config.process_output(&params.output_file).display());
            Ok(())
        }
        Err(e) => bail!("pipeline failed: {e}"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { query,
                        output_file,
                        output_path,
                        tap_url,
                        force, } => run(query, output_file, output_path, tap_url, force),
        Commands::Analyze { input, output } => {
            let (artifact, _) = ProcessDataStep::analyze_file(&input, &output)
                .with_context(|| format!("analysis of {} failed", input.display()))?;
            println!("{} points, columns {:?} -> {}", artifact.n_points, artifact.columns, artifact.path);
            Ok(())
        }
    }
}
