//! CLI: List the input or output fields of a step's extractor.
//!
//! Reads the same step definition JSON that `run_step` takes, asks the
//! extraction service which fields the configured extractor consumes or
//! produces, and prints one field name per line. Handy when wiring a step's
//! `output_fields` table.
//!
//! Usage: `list_fields --step <step.json> [--kind input|output]`

use clap::Parser;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use rowharvest::transport::{FieldKind, HttpTransport, TransportClient};
use rowharvest::{HarvestConfig, StepSpec, ValueSource};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};
use uuid::Uuid;

const DEFAULT_SERVICE_URL: &str = "http://localhost:4020";

/// Print an extractor's field names, one per line.
#[derive(Parser, Debug)]
#[command(name = "list_fields")]
#[command(
  after_help = r#"Environment variables (override flags when set):
  HARVEST_SERVICE_URL   Base URL of the extraction service (overrides --service-url).

Only steps that query the service have service-side fields; cache steps are
rejected. The step's target must be a literal extractor id, a per-row
field-sourced target has nothing to introspect."#
)]
struct Args {
  /// Step definition JSON file
  #[arg(long, value_name = "FILE")]
  step: PathBuf,

  /// Which field list to print: "input" or "output"
  #[arg(long, value_name = "KIND", default_value = "output")]
  kind: String,

  /// Base URL of the extraction service. Overridden by HARVEST_SERVICE_URL if set.
  #[arg(long, value_name = "URL", default_value = DEFAULT_SERVICE_URL)]
  service_url: String,
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .init();

  let args = Args::parse();
  let service_url = env::var("HARVEST_SERVICE_URL").unwrap_or_else(|_| args.service_url.clone());

  let kind = match args.kind.as_str() {
    "input" => FieldKind::Input,
    "output" => FieldKind::Output,
    other => {
      eprintln!("Unknown field kind `{}` (expected input or output)", other);
      process::exit(1);
    }
  };

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

  let harvest: HarvestConfig = match spec {
    StepSpec::UrlExtract(config) => config.harvest,
    StepSpec::ParamQuery(config) => config.harvest,
    StepSpec::CacheInput(_) | StepSpec::CacheOutput(_) => {
      eprintln!("Cache steps do not query the extraction service");
      process::exit(1);
    }
  };
  let target = match &harvest.target {
    ValueSource::Literal(id) => match Uuid::parse_str(id.trim()) {
      Ok(parsed) => parsed,
      Err(e) => {
        eprintln!("Extractor id `{}` is not a UUID: {}", id, e);
        process::exit(1);
      }
    },
    ValueSource::FromField(field) => {
      eprintln!(
        "Target comes from input field `{}`; only literal targets can be introspected",
        field
      );
      process::exit(1);
    }
  };

  let transport = HttpTransport::new(&service_url);
  let fields = match transport.list_fields(&harvest.credentials, target, kind).await {
    Ok(fields) => fields,
    Err(e) => {
      eprintln!("Error listing fields: {}", e);
      process::exit(1);
    }
  };
  for field in fields {
    println!("{}", field);
  }
}
