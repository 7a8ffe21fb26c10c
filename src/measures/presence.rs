//! Single-face presence.
//!
//! Exactly one detected face scores 100. With multiple faces the raw score is
//! the face count but the scalar is 0: the capture subject is ambiguous.

use crate::error::FaceQaError;
use crate::measures::{write_result, Measure};
use crate::session::Session;
use crate::types::MeasureId;

/// Scores whether exactly one face is present in the image.
#[derive(Debug, Default)]
pub struct SingleFacePresent;

impl Measure for SingleFacePresent {
    fn id(&self) -> MeasureId {
        MeasureId::SingleFacePresent
    }

    fn execute(&self, session: &mut Session) -> Result<(), FaceQaError> {
        let faces = session.detected_faces();
        if faces.is_empty() {
            return Err(FaceQaError::QualityAssessment(
                "presence measure requires face detection results".into(),
            ));
        }
        let raw = faces.len() as f64;
        let scalar = if faces.len() == 1 { 100.0 } else { 0.0 };
        write_result(session, self.id(), raw, scalar);
        Ok(())
    }
}
