//! Quality measures and their execution framework.
//!
//! A [`Measure`] reads cached pipeline artifacts from the [`Session`] and
//! writes one result per result key into the session's assessment map. The
//! [`Executor`] runs the configured measures in configuration order with
//! per-measure failure isolation; the [`MeasureFactory`] maps configured
//! identifiers to constructors.

mod background;
mod crop;
mod dynamic_range;
mod executor;
mod factory;
mod head_pose;
mod luminance;
mod presence;
mod sigmoid;

pub use background::BackgroundUniformity;
pub use crop::CropOfTheFaceImage;
pub use dynamic_range::DynamicRange;
pub use executor::Executor;
pub use factory::MeasureFactory;
pub use head_pose::HeadPose;
pub use luminance::Luminance;
pub use presence::SingleFacePresent;
pub use sigmoid::SigmoidParameters;

use crate::error::FaceQaError;
use crate::session::Session;
use crate::types::{MeasureId, QualityMeasureResult};

/// One quality measure.
///
/// `execute` reads from the session's preprocessing artifacts and writes a
/// [`QualityMeasureResult`] for each of the measure's result keys. An `Err`
/// marks only this measure as failed; other measures still run.
pub trait Measure: Send + Sync {
    /// The configured identifier of this measure.
    fn id(&self) -> MeasureId;

    /// Assess the session and record results in its assessment map.
    fn execute(&self, session: &mut Session) -> Result<(), FaceQaError>;
}

/// Record a successful result for one key.
pub(crate) fn write_result(session: &mut Session, key: MeasureId, raw: f64, scalar: f64) {
    session
        .assessments_mut()
        .insert(key, QualityMeasureResult::success(raw, scalar));
}
