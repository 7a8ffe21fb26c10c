//! Crop margins of the face within the capture frame.
//!
//! Compound measure with one component per direction. Horizontal margins are
//! the distance from the eye midpoint to the left/right image edge in units
//! of the inter-eye distance; vertical margins use the T-metric as the unit.
//! Tight crops (face too close to an edge) push the raw margin below the
//! sigmoid center and score low.

use crate::config::Settings;
use crate::error::FaceQaError;
use crate::geometry::{eye_midpoint, inter_eye_distance, tmetric};
use crate::measures::{write_result, Measure, SigmoidParameters};
use crate::session::Session;
use crate::types::MeasureId;

/// Scores the margins between the face and the four image edges.
#[derive(Debug)]
pub struct CropOfTheFaceImage {
    left: SigmoidParameters,
    right: SigmoidParameters,
    above: SigmoidParameters,
    below: SigmoidParameters,
}

impl CropOfTheFaceImage {
    /// Build with per-direction sigmoid defaults, overridable from
    /// configuration.
    pub fn new(settings: &Settings) -> Self {
        Self {
            left: SigmoidParameters::new(0.9, 0.1)
                .load_overrides(settings, MeasureId::LeftwardCropOfTheFaceImage),
            right: SigmoidParameters::new(0.9, 0.1)
                .load_overrides(settings, MeasureId::RightwardCropOfTheFaceImage),
            above: SigmoidParameters::new(1.4, 0.1)
                .load_overrides(settings, MeasureId::MarginAboveOfTheFaceImage),
            below: SigmoidParameters::new(1.8, 0.1)
                .load_overrides(settings, MeasureId::MarginBelowOfTheFaceImage),
        }
    }
}

impl Measure for CropOfTheFaceImage {
    fn id(&self) -> MeasureId {
        MeasureId::CropOfTheFaceImage
    }

    fn execute(&self, session: &mut Session) -> Result<(), FaceQaError> {
        let landmarks = session.landmarks();
        if landmarks.points.is_empty() {
            return Err(FaceQaError::QualityAssessment(
                "crop measure requires landmarks in original-image coordinates".into(),
            ));
        }
        let (mx, my) = eye_midpoint(&landmarks)?;
        let ied = inter_eye_distance(&landmarks)?;
        let t = tmetric(&landmarks)?;
        if ied <= 0.0 || t <= 0.0 {
            return Err(FaceQaError::QualityAssessment(
                "degenerate landmark geometry (zero inter-eye distance or T-metric)".into(),
            ));
        }

        let width = session.image().width() as f64;
        let height = session.image().height() as f64;
        for (key, params, raw) in [
            (MeasureId::LeftwardCropOfTheFaceImage, &self.left, mx / ied),
            (
                MeasureId::RightwardCropOfTheFaceImage,
                &self.right,
                (width - mx) / ied,
            ),
            (MeasureId::MarginAboveOfTheFaceImage, &self.above, my / t),
            (
                MeasureId::MarginBelowOfTheFaceImage,
                &self.below,
                (height - my) / t,
            ),
        ] {
            write_result(session, key, raw, params.map(raw));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FaceLandmarks, Image, LandmarkPoint, LandmarkType};

    /// Eyes at (cx ± 25, cy), chin 60 below the eye midpoint.
    fn landmarks_at(cx: i16, cy: i16) -> FaceLandmarks {
        let mut pts = vec![LandmarkPoint::new(cx, cy); 98];
        pts[96] = LandmarkPoint::new(cx - 25, cy);
        pts[97] = LandmarkPoint::new(cx + 25, cy);
        pts[16] = LandmarkPoint::new(cx, cy + 60);
        FaceLandmarks::new(LandmarkType::Wflw98, pts)
    }

    fn run(image: &Image, landmarks: FaceLandmarks) -> crate::types::QualityAssessments {
        let mut session = Session::new(image);
        session.set_landmarks(landmarks);
        CropOfTheFaceImage::new(&Settings::new())
            .execute(&mut session)
            .unwrap();
        session.into_assessments()
    }

    #[test]
    fn centered_face_scores_high_in_all_directions() {
        // 400x400, eye midpoint at center: margins 200/50 = 4 IEDs wide,
        // 200/60 ≈ 3.3 T-metrics tall — far above every sigmoid center
        let img = Image::new_grey(400, 400, vec![0; 400 * 400]).unwrap();
        let results = run(&img, landmarks_at(200, 200));
        for key in [
            MeasureId::LeftwardCropOfTheFaceImage,
            MeasureId::RightwardCropOfTheFaceImage,
            MeasureId::MarginAboveOfTheFaceImage,
            MeasureId::MarginBelowOfTheFaceImage,
        ] {
            assert!(results[&key].scalar > 95.0, "{key:?}: {:?}", results[&key]);
        }
    }

    #[test]
    fn face_near_left_edge_scores_low_leftward_only() {
        let img = Image::new_grey(400, 400, vec![0; 400 * 400]).unwrap();
        // Eye midpoint 10 px from the left edge: 10/50 = 0.2 IEDs
        let results = run(&img, landmarks_at(10, 200));
        assert!(results[&MeasureId::LeftwardCropOfTheFaceImage].scalar < 5.0);
        assert!(results[&MeasureId::RightwardCropOfTheFaceImage].scalar > 95.0);
    }

    #[test]
    fn raw_margins_use_the_documented_units() {
        let img = Image::new_grey(400, 400, vec![0; 400 * 400]).unwrap();
        let results = run(&img, landmarks_at(200, 120));
        // Above: 120 / 60 T-metrics = 2.0
        let above = results[&MeasureId::MarginAboveOfTheFaceImage];
        assert!((above.raw_score - 2.0).abs() < 1e-9);
        // Leftward: 200 / 50 IEDs = 4.0
        let left = results[&MeasureId::LeftwardCropOfTheFaceImage];
        assert!((left.raw_score - 4.0).abs() < 1e-9);
    }

    #[test]
    fn missing_landmarks_are_an_error() {
        let img = Image::new_grey(10, 10, vec![0; 100]).unwrap();
        let mut session = Session::new(&img);
        assert!(CropOfTheFaceImage::new(&Settings::new())
            .execute(&mut session)
            .is_err());
    }
}
