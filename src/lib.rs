//! Face image quality assessment: preprocessing orchestration plus a set of
//! standardized quality measures over portrait captures.
//!
//! The engine owns no inference code. Embedders supply model adapters for the
//! pipeline collaborators (face detection, pose, landmarks, segmentation);
//! the engine sequences them, caches their artifacts per session, and runs
//! the configured measures to produce per-measure raw and scalar scores.
//!
//! # Example
//!
//! ```no_run
//! use faceqa::{QualityEngine, types::Image};
//! # fn adapters() -> faceqa::pipeline::Collaborators { unimplemented!() }
//!
//! let engine = QualityEngine::initialize(
//!     std::path::Path::new("config"),
//!     "faceqa.json",
//!     adapters(),
//! ).unwrap();
//!
//! let bytes = std::fs::read("portrait.jpg").unwrap();
//! let image = Image::from_bytes(&bytes).unwrap();
//! let report = engine.vector_quality(&image);
//! for (id, result) in &report.assessments {
//!     println!("{}: {} ({})", id.as_str(), result.scalar, result.raw_score);
//! }
//! let (overall, status) = engine.scalar_quality(&image);
//! println!("overall: {overall} ({status:?})");
//! ```
#![warn(missing_docs)]

pub mod alignment;
pub mod color;
pub mod config;
mod error;
pub mod geometry;
pub mod histogram;
pub mod landmarks;
pub mod measures;
pub mod pipeline;
mod session;
pub mod types;

/// Error type returned by faceqa operations.
pub use error::{FaceQaError, StatusCode};
/// Per-request artifact container.
pub use session::Session;

use std::path::Path;

use log::{info, warn};

use crate::config::Settings;
use crate::measures::{Executor, MeasureFactory};
use crate::pipeline::Collaborators;
use crate::types::{
    AssessmentStatus, Image, MeasureId, QualityAssessments, SCALAR_UNASSIGNED,
};

/// Outcome of one [`QualityEngine::vector_quality`] call.
///
/// `status` is [`StatusCode::Success`] when preprocessing completed; the
/// assessment map is populated either way (failed requests carry
/// `FailureToAssess` entries for every configured measure).
#[derive(Debug, Clone)]
pub struct QualityReport {
    /// Machine-readable outcome of the call.
    pub status: StatusCode,
    /// Human-readable detail when `status` is not `Success`.
    pub message: String,
    /// One entry per result key of every configured measure.
    pub assessments: QualityAssessments,
}

/// The assessment engine: configuration, collaborators, and the configured
/// measure set, created once and shared by all requests.
pub struct QualityEngine {
    settings: Settings,
    collaborators: Collaborators,
    configured: Vec<MeasureId>,
    executor: Executor,
}

impl QualityEngine {
    /// Load configuration from `config_dir/config_file` and build the
    /// configured measure set over the supplied collaborators.
    pub fn initialize(
        config_dir: &Path,
        config_file: &str,
        collaborators: Collaborators,
    ) -> Result<Self, FaceQaError> {
        let settings = Settings::from_file(config_dir, config_file)?;
        Self::with_settings(settings, collaborators)
    }

    /// Build the engine from already-parsed settings.
    pub fn with_settings(
        settings: Settings,
        collaborators: Collaborators,
    ) -> Result<Self, FaceQaError> {
        let (configured, measures) = MeasureFactory::create_configured(&settings)?;
        info!(
            "engine initialized with {} measure(s): {}",
            configured.len(),
            configured
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self {
            settings,
            collaborators,
            configured,
            executor: Executor::new(measures),
        })
    }

    /// The engine's configuration.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Identifiers of the configured measures, in execution order.
    pub fn configured_measures(&self) -> &[MeasureId] {
        &self.configured
    }

    /// Assess one image against every configured measure.
    ///
    /// Never panics across this boundary: preprocessing failures are
    /// reported through [`QualityReport::status`] with every configured
    /// measure marked `FailureToAssess`.
    pub fn vector_quality(&self, image: &Image) -> QualityReport {
        let mut session = Session::new(image);
        match pipeline::preprocess(&self.collaborators, &mut session, &self.configured) {
            Ok(()) => {
                self.executor.execute_all(&mut session);
                QualityReport {
                    status: StatusCode::Success,
                    message: String::new(),
                    assessments: session.into_assessments(),
                }
            }
            Err(err) => QualityReport {
                status: err.code(),
                message: err.to_string(),
                assessments: session.into_assessments(),
            },
        }
    }

    /// Assess one image and fold the per-measure scalars into a single
    /// score in [0, 100], paired with the call's status.
    ///
    /// When a `UnifiedQualityScore` result is present and successful, its
    /// scalar is returned; otherwise the mean over successful entries with
    /// an assigned scalar. The score is 0 when nothing was assessable; the
    /// status distinguishes that case from a genuinely zero-quality image.
    pub fn scalar_quality(&self, image: &Image) -> (f64, StatusCode) {
        let report = self.vector_quality(image);
        if let Some(unified) = report.assessments.get(&MeasureId::UnifiedQualityScore) {
            if unified.status == AssessmentStatus::Success {
                return (unified.scalar, report.status);
            }
        }
        let eligible: Vec<f64> = report
            .assessments
            .values()
            .filter(|r| r.status == AssessmentStatus::Success && r.scalar > SCALAR_UNASSIGNED)
            .map(|r| r.scalar)
            .collect();
        if eligible.is_empty() {
            warn!("no successful measure results, scalar quality defaults to 0");
            return (0.0, report.status);
        }
        let mean = eligible.iter().sum::<f64>() / eligible.len() as f64;
        (mean, report.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QualityMeasureResult;

    fn report_with(entries: &[(MeasureId, QualityMeasureResult)]) -> QualityAssessments {
        entries.iter().cloned().collect()
    }

    fn mean_of(assessments: &QualityAssessments) -> f64 {
        // Mirrors the scalar_quality fold without needing collaborators
        let eligible: Vec<f64> = assessments
            .values()
            .filter(|r| r.status == AssessmentStatus::Success && r.scalar > SCALAR_UNASSIGNED)
            .map(|r| r.scalar)
            .collect();
        if eligible.is_empty() {
            0.0
        } else {
            eligible.iter().sum::<f64>() / eligible.len() as f64
        }
    }

    #[test]
    fn fold_averages_successful_scalars() {
        let a = report_with(&[
            (MeasureId::SingleFacePresent, QualityMeasureResult::success(1.0, 100.0)),
            (MeasureId::DynamicRange, QualityMeasureResult::success(4.0, 50.0)),
        ]);
        assert_eq!(mean_of(&a), 75.0);
    }

    #[test]
    fn fold_skips_failed_and_unassigned_entries() {
        let a = report_with(&[
            (MeasureId::SingleFacePresent, QualityMeasureResult::success(1.0, 100.0)),
            (MeasureId::DynamicRange, QualityMeasureResult::failure()),
            (
                MeasureId::HeadPoseYaw,
                QualityMeasureResult {
                    raw_score: 0.0,
                    scalar: SCALAR_UNASSIGNED,
                    status: AssessmentStatus::Success,
                },
            ),
        ]);
        assert_eq!(mean_of(&a), 100.0);
    }

    #[test]
    fn fold_of_nothing_is_zero() {
        let a = report_with(&[(MeasureId::DynamicRange, QualityMeasureResult::failure())]);
        assert_eq!(mean_of(&a), 0.0);
    }
}
