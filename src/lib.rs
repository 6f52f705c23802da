//! # rowharvest
//!
//! Pipeline steps that enrich row streams with records harvested from a
//! remote data-extraction service, plus cache steps over a shared
//! key-value store.
//!
//! ## Architecture
//!
//! Each harvest step runs one blocking query per input row: the
//! [`QueryExecutor`] opens a session, submits, and waits on a
//! [`QueryCollector`] gate until the service marks the query finished or
//! the attempt times out. The per-row loop in [`steps`] retries failed
//! attempts and flattens the returned records into output rows. What
//! varies between steps is only how a row becomes a query, captured by
//! `QueryStrategy`.

pub mod cache;
pub mod collector;
pub mod config;
#[cfg(test)]
mod config_test;
pub mod csvio;
pub mod error;
pub mod executor;
#[cfg(test)]
mod executor_test;
pub mod io;
pub mod steps;
pub mod transport;
pub mod types;

pub use collector::QueryCollector;
pub use config::{HarvestConfig, StepSpec, ValueSource};
pub use error::{CacheError, StepError, TransportError};
pub use executor::{AttemptOutcome, QueryExecutor};
pub use steps::{HarvestRunner, ParamQuery, StepReport, UrlExtract};
pub use transport::{HttpTransport, ScriptedTransport, TransportClient};
pub use types::{QueryRequest, Record, Row, RowSchema, ServerMessage};
