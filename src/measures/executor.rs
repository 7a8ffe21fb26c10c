//! Ordered measure execution with per-measure failure isolation.

use log::warn;

use crate::measures::Measure;
use crate::session::Session;
use crate::types::QualityMeasureResult;

/// Runs configured measures in configuration order.
///
/// A failing measure is recorded as `FailureToAssess` for each of its result
/// keys and never blocks the remaining measures — the opposite of the
/// all-or-nothing preprocessing policy.
pub struct Executor {
    measures: Vec<Box<dyn Measure>>,
}

impl Executor {
    /// Build an executor over an ordered measure list.
    pub fn new(measures: Vec<Box<dyn Measure>>) -> Self {
        Self { measures }
    }

    /// Number of measures to run.
    pub fn len(&self) -> usize {
        self.measures.len()
    }

    /// Whether no measures are configured.
    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    /// Execute every measure against the session.
    pub fn execute_all(&self, session: &mut Session) {
        for measure in &self.measures {
            if let Err(err) = measure.execute(session) {
                warn!(
                    "measure {} failed on {}: {err}",
                    measure.id().as_str(),
                    session.id()
                );
                for &key in measure.id().result_keys() {
                    session
                        .assessments_mut()
                        .insert(key, QualityMeasureResult::failure());
                }
            }
        }
    }
}
