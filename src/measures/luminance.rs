//! Face-region luminance statistics.
//!
//! Compound measure over the CIELAB lightness (L*) of the landmarked face
//! region of the aligned image: `LuminanceMean` penalizes under-exposed
//! captures, `LuminanceVariance` penalizes flat, shadowless lighting. Raw
//! scores are normalized to [0, 1] (L* divided by 100) before calibration.

use crate::color::cielab_lightness;
use crate::config::Settings;
use crate::error::FaceQaError;
use crate::measures::{write_result, Measure, SigmoidParameters};
use crate::session::Session;
use crate::types::MeasureId;

/// Scores mean and spread of face-region lightness.
#[derive(Debug)]
pub struct Luminance {
    mean_sigmoid: SigmoidParameters,
    variance_sigmoid: SigmoidParameters,
}

impl Luminance {
    /// Build with per-key sigmoid defaults, overridable from configuration.
    pub fn new(settings: &Settings) -> Self {
        Self {
            mean_sigmoid: SigmoidParameters::new(0.2, 0.05)
                .load_overrides(settings, MeasureId::LuminanceMean),
            variance_sigmoid: SigmoidParameters::new(0.1, 0.03)
                .load_overrides(settings, MeasureId::LuminanceVariance),
        }
    }
}

impl Measure for Luminance {
    fn id(&self) -> MeasureId {
        MeasureId::Luminance
    }

    fn execute(&self, session: &mut Session) -> Result<(), FaceQaError> {
        let aligned = session.aligned_image();
        let mask = session.face_region_mask();
        if aligned.is_empty() || mask.is_empty() {
            return Err(FaceQaError::QualityAssessment(
                "luminance requires the aligned image and face region mask".into(),
            ));
        }
        let lightness = cielab_lightness(&aligned, Some(&mask));
        if lightness.is_empty() {
            return Err(FaceQaError::QualityAssessment(
                "face region mask selects no pixels".into(),
            ));
        }

        let n = lightness.len() as f64;
        let mean: f64 = lightness.iter().sum::<f64>() / n;
        let variance: f64 = lightness.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n;

        let mean_raw = mean / 100.0;
        let std_raw = variance.sqrt() / 100.0;
        write_result(
            session,
            MeasureId::LuminanceMean,
            mean_raw,
            self.mean_sigmoid.map(mean_raw),
        );
        write_result(
            session,
            MeasureId::LuminanceVariance,
            std_raw,
            self.variance_sigmoid.map(std_raw),
        );
        Ok(())
    }
}
