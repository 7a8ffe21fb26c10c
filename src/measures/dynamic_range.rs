//! Dynamic range of the face region.
//!
//! Shannon entropy of the luminance histogram over the landmarked face region
//! of the aligned image. Entropy ranges over [0, 8] bits for 8-bit luminance,
//! so the scalar is the linear mapping `clamp(round(12.5 · raw), 0, 100)`.

use crate::color::luminance_image;
use crate::error::FaceQaError;
use crate::histogram::{normalized_histogram, shannon_entropy};
use crate::measures::{write_result, Measure};
use crate::session::Session;
use crate::types::MeasureId;

/// Entropy gain: 100 / 8 bits.
const SCALAR_PER_BIT: f64 = 12.5;

/// Scores the tonal dynamic range of the face region.
#[derive(Debug, Default)]
pub struct DynamicRange;

impl Measure for DynamicRange {
    fn id(&self) -> MeasureId {
        MeasureId::DynamicRange
    }

    fn execute(&self, session: &mut Session) -> Result<(), FaceQaError> {
        let aligned = session.aligned_image();
        let mask = session.face_region_mask();
        if aligned.is_empty() || mask.is_empty() {
            return Err(FaceQaError::QualityAssessment(
                "dynamic range requires the aligned image and face region mask".into(),
            ));
        }
        let luma = luminance_image(&aligned);
        let hist = normalized_histogram(&luma, Some(&mask));
        if hist.iter().all(|&p| p == 0.0) {
            return Err(FaceQaError::QualityAssessment(
                "face region mask selects no pixels".into(),
            ));
        }
        let raw = shannon_entropy(&hist);
        let scalar = (SCALAR_PER_BIT * raw).round().clamp(0.0, 100.0);
        write_result(session, self.id(), raw, scalar);
        Ok(())
    }
}
