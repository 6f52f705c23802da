//! First-row detection shared by every step.

use crate::io::RowSource;
use crate::types::Row;

/// What the pump handed back for this iteration.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum PumpEvent {
  /// The first row of the run. In generator mode this is a synthesized
  /// empty row, not one pulled from upstream.
  First(Row),
  /// Any later row.
  Row(Row),
  /// Upstream is exhausted.
  End,
}

/// Pulls rows and resolves the generator/reader duality at the first pull.
///
/// A step whose upstream yields nothing at all still has work to do: it
/// runs once off an empty synthetic row. That decision can only be made at
/// the first pull, so the pump owns it and the step loops on [`PumpEvent`]s
/// without caring which mode it landed in.
#[derive(Debug, Default)]
pub(crate) struct RowPump {
  started: bool,
  generator: bool,
}

impl RowPump {
  pub fn new() -> Self {
    Self::default()
  }

  /// True once the first pull came back empty. Meaningless before the
  /// first [`next`](RowPump::next) call.
  pub fn generator_mode(&self) -> bool {
    self.generator
  }

  pub async fn next<S: RowSource>(&mut self, source: &mut S) -> PumpEvent {
    match source.pull().await {
      Some(row) if !self.started => {
        self.started = true;
        PumpEvent::First(row)
      }
      Some(row) => PumpEvent::Row(row),
      None if !self.started => {
        self.started = true;
        self.generator = true;
        PumpEvent::First(Row::new())
      }
      None => PumpEvent::End,
    }
  }
}
