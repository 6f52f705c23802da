//! CLI: Run one rowharvest step over a CSV row file.
//!
//! Reads a step definition (JSON), pulls rows from the input CSV, runs the
//! step, and writes the result rows as CSV. With no `--input` the step runs
//! in generator mode off a single synthetic row; with no `--output` rows go
//! to stdout.
//!
//! Usage: `run_step --step <step.json> [--input rows.csv] [--output out.csv]`
//!
//! Set RUST_LOG=rowharvest=trace for TRACE-level span enter/exit and events.

use clap::Parser;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use rowharvest::cache::{CacheInputStep, CacheOutputStep, CachePool, PooledBackend};
use rowharvest::csvio;
use rowharvest::error::StepError;
use rowharvest::io::{CollectRowSink, StreamRowSource};
use rowharvest::steps::{HarvestRunner, StepReport};
use rowharvest::transport::{AttemptScript, HttpTransport, ScriptedTransport, TransportClient};
use rowharvest::types::{Record, RowSchema};
use rowharvest::{HarvestConfig, StepSpec};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

const DEFAULT_SERVICE_URL: &str = "http://localhost:4020";

/// Run one rowharvest step over CSV rows.
#[derive(Parser, Debug)]
#[command(name = "run_step")]
#[command(
  after_help = r#"Environment variables (override flags when set):
  HARVEST_SERVICE_URL   Base URL of the extraction service (overrides --service-url).

Examples:
  run_step --step extract.json --input urls.csv --output prices.csv
  run_step --step search.json
  run_step --step extract.json --input urls.csv --demo"#
)]
struct Args {
  /// Step definition JSON file
  #[arg(long, value_name = "FILE")]
  step: PathBuf,

  /// Input rows CSV. Omit to run the step with no input rows.
  #[arg(long, value_name = "FILE")]
  input: Option<PathBuf>,

  /// Output rows CSV. Omit to print to stdout.
  #[arg(long, value_name = "FILE")]
  output: Option<PathBuf>,

  /// Base URL of the extraction service. Overridden by HARVEST_SERVICE_URL if set.
  #[arg(long, value_name = "URL", default_value = DEFAULT_SERVICE_URL)]
  service_url: String,

  /// Run harvest queries against a built-in scripted transport instead of
  /// the live service. Cache steps are unaffected.
  #[arg(long)]
  demo: bool,
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .init();

  let args = Args::parse();
  let service_url = env::var("HARVEST_SERVICE_URL").unwrap_or_else(|_| args.service_url.clone());

  let spec_text = match fs::read_to_string(&args.step) {
    Ok(s) => s,
    Err(e) => {
      eprintln!("Error reading {}: {}", args.step.display(), e);
      process::exit(1);
    }
  };
  let spec: StepSpec = match serde_json::from_str(&spec_text) {
    Ok(s) => s,
    Err(e) => {
      eprintln!("Error parsing step definition: {}", e);
      process::exit(1);
    }
  };

  let (schema, rows) = match &args.input {
    Some(path) => match csvio::read_rows(path) {
      Ok(loaded) => loaded,
      Err(e) => {
        eprintln!("Error reading {}: {}", path.display(), e);
        process::exit(1);
      }
    },
    None => (RowSchema::empty(), vec![]),
  };

  // Mode follows the rows, not the flag: a headered file with no data rows
  // still runs the step as a generator.
  let generator = rows.is_empty();
  let input_schema = if generator { None } else { Some(schema.clone()) };
  let mut source = if generator {
    StreamRowSource::generator()
  } else {
    StreamRowSource::from_rows(schema.clone(), rows)
  };
  let mut sink = CollectRowSink::new();

  info!(step = %args.step.display(), generator, service_url = %service_url, "run_step starting");

  let outcome = run_spec(
    spec,
    &service_url,
    args.demo,
    input_schema.as_ref(),
    &mut source,
    &mut sink,
  )
  .await;
  let (report, output_schema) = match outcome {
    Ok(finished) => finished,
    Err(e) => {
      eprintln!("Step error: {}", e);
      process::exit(1);
    }
  };

  let written = match &args.output {
    Some(path) => csvio::write_rows(path, &output_schema, &sink.rows),
    None => csvio::write_rows_to(std::io::stdout(), &output_schema, &sink.rows),
  };
  if let Err(e) = written {
    eprintln!("Error writing output rows: {}", e);
    process::exit(1);
  }

  info!(
    rows_read = report.rows_read,
    rows_written = report.rows_written,
    attempts = report.attempts,
    retries = report.retries,
    "run_step finished"
  );
  println!("Step completed.");
  println!("  Rows read: {}", report.rows_read);
  println!("  Rows written: {}", report.rows_written);
  if report.attempts > 0 {
    println!("  Queries: {} ({} retries)", report.attempts, report.retries);
  }
}

/// Scripted stand-in for the live service: every query succeeds with one
/// record that fills each configured output field.
fn demo_transport(config: &HarvestConfig) -> ScriptedTransport {
  let record: Record = config
    .output_fields
    .iter()
    .map(|field| {
      (
        field.service_field.clone(),
        serde_json::Value::String(format!("demo-{}", field.service_field)),
      )
    })
    .collect();
  ScriptedTransport::repeating(AttemptScript::success(vec![record]))
}

fn harvest_transport(
  config: &HarvestConfig,
  service_url: &str,
  demo: bool,
) -> Arc<dyn TransportClient> {
  if demo {
    Arc::new(demo_transport(config))
  } else {
    Arc::new(HttpTransport::new(service_url))
  }
}

async fn run_spec(
  spec: StepSpec,
  service_url: &str,
  demo: bool,
  input_schema: Option<&RowSchema>,
  source: &mut StreamRowSource,
  sink: &mut CollectRowSink,
) -> Result<(StepReport, RowSchema), StepError> {
  match spec {
    StepSpec::UrlExtract(config) => {
      let output_schema = config.harvest.output_schema(input_schema);
      let transport = harvest_transport(&config.harvest, service_url, demo);
      let report = HarvestRunner::url_extract(config, transport)
        .run(source, sink)
        .await?;
      Ok((report, output_schema))
    }
    StepSpec::ParamQuery(config) => {
      let output_schema = config.harvest.output_schema(input_schema);
      let transport = harvest_transport(&config.harvest, service_url, demo);
      let report = HarvestRunner::param_query(config, transport)
        .run(source, sink)
        .await?;
      Ok((report, output_schema))
    }
    StepSpec::CacheInput(config) => {
      let pool = CachePool::acquire(&config.host, &config.port)?;
      let step = CacheInputStep::new(config, PooledBackend::new(pool))?;
      let output_schema = step.output_schema(input_schema);
      let report = step.run(source, sink).await?;
      Ok((report, output_schema))
    }
    StepSpec::CacheOutput(config) => {
      let output_schema = input_schema.cloned().unwrap_or_else(RowSchema::empty);
      let pool = CachePool::acquire(&config.host, &config.port)?;
      let step = CacheOutputStep::new(config, PooledBackend::new(pool))?;
      let report = step.run(source, sink).await?;
      Ok((report, output_schema))
    }
  }
}
