//! Preprocessing orchestration.
//!
//! Runs the collaborator calls in strict sequence, writing each artifact into
//! the session. Any failure is terminal for the whole request: preprocessing
//! stops, every configured measure (compound measures expanded into their
//! component keys) is marked [`FailureToAssess`], and the originating error is
//! returned to the caller. This is deliberately different from the per-measure
//! isolation of the executor: a half-preprocessed session must never produce
//! partial scores.
//!
//! [`FailureToAssess`]: crate::types::AssessmentStatus::FailureToAssess

use log::{debug, error};

use crate::alignment::{
    fit_similarity_lmeds, transform_landmarks, warp_image, ALIGNED_SIZE, REFERENCE_LANDMARKS,
};
use crate::error::FaceQaError;
use crate::geometry::{landmark_region_mask, tmetric};
use crate::landmarks::alignment_points;
use crate::pipeline::Collaborators;
use crate::session::Session;
use crate::types::{MeasureId, QualityMeasureResult};

/// Fraction of the T-metric by which the landmarked region grows upward, so
/// the region covers the forehead above the topmost landmark.
const REGION_FOREHEAD_EXTEND: f64 = 0.3;

/// Populate the session's pipeline artifacts, fail-fast.
///
/// On error, synthesizes a `FailureToAssess` result for every key of every
/// configured measure and returns the originating error.
pub fn preprocess(
    collaborators: &Collaborators,
    session: &mut Session,
    configured: &[MeasureId],
) -> Result<(), FaceQaError> {
    match run_steps(collaborators, session) {
        Ok(()) => Ok(()),
        Err(err) => {
            error!("preprocessing failed for {}: {err}", session.id());
            for measure in configured {
                for &key in measure.result_keys() {
                    session
                        .assessments_mut()
                        .insert(key, QualityMeasureResult::failure());
                }
            }
            Err(err)
        }
    }
}

fn run_steps(collaborators: &Collaborators, session: &mut Session) -> Result<(), FaceQaError> {
    // 1. Detect faces; no face is a terminal failure.
    let faces = collaborators.detector.detect_faces(session)?;
    if faces.is_empty() {
        return Err(FaceQaError::FaceDetection("no face detected".into()));
    }
    debug!("{}: {} face(s) detected", session.id(), faces.len());
    session.set_detected_faces(faces);

    // 2. Head pose of the subject (largest) face.
    let pose = collaborators.pose.estimate_pose(session)?;
    debug!(
        "{}: pose yaw {:.1} pitch {:.1} roll {:.1}",
        session.id(),
        pose.yaw,
        pose.pitch,
        pose.roll
    );
    session.set_pose(pose);

    // 3. Landmarks in original-image coordinates (wrapper clamps to bounds).
    let landmarks = collaborators.landmarks.extract_landmarks(session)?;
    if landmarks.points.is_empty() {
        return Err(FaceQaError::FaceLandmarkExtraction(
            "extractor returned no landmarks".into(),
        ));
    }
    session.set_landmarks(landmarks.clone());

    // 4. Align: similarity fit of the five canonical points onto the
    //    reference template, then warp image and landmarks.
    let source_points = alignment_points(&landmarks)?;
    let transform = fit_similarity_lmeds(&source_points, &REFERENCE_LANDMARKS)?;
    let aligned = warp_image(session.image(), &transform, ALIGNED_SIZE, ALIGNED_SIZE)?;
    let aligned_landmarks =
        transform_landmarks(&landmarks, &transform, ALIGNED_SIZE, ALIGNED_SIZE);
    session.set_aligned_image(aligned);
    session.set_aligned_landmarks(aligned_landmarks.clone());
    session.set_alignment_transform(transform);

    // 5. Face parsing on the aligned image.
    let parsing_map = collaborators.face_parser.class_map(session)?;
    session.set_face_parsing_map(parsing_map);

    // 6. Occlusion segmentation on the aligned image.
    let occlusion_mask = collaborators.occlusion.class_map(session)?;
    session.set_occlusion_mask(occlusion_mask);

    // 7. Landmarked region: convex hull of the aligned landmarks, extended
    //    upward to cover the forehead.
    let extend_up = (REGION_FOREHEAD_EXTEND * tmetric(&aligned_landmarks)?).round() as u32;
    let region = landmark_region_mask(&aligned_landmarks, ALIGNED_SIZE, ALIGNED_SIZE, extend_up)?;
    session.set_face_region_mask(region);

    debug!("{}: preprocessing complete", session.id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{
        FaceDetector, LandmarkExtractor, PoseEstimator, SegmentationExtractor,
    };
    use crate::types::{
        AssessmentStatus, BoundingBox, FaceDetectorKind, FaceLandmarks, Image, LandmarkPoint,
        LandmarkType, PoseAngles,
    };
    use std::sync::Arc;

    struct NoFaces;
    impl FaceDetector for NoFaces {
        fn detect_faces(&self, _s: &Session) -> Result<Vec<BoundingBox>, FaceQaError> {
            Ok(vec![])
        }
    }

    struct OneFace;
    impl FaceDetector for OneFace {
        fn detect_faces(&self, _s: &Session) -> Result<Vec<BoundingBox>, FaceQaError> {
            Ok(vec![BoundingBox::new(40, 40, 120, 120, FaceDetectorKind::Ssd)])
        }
    }

    struct FrontalPose;
    impl PoseEstimator for FrontalPose {
        fn estimate_pose(&self, _s: &Session) -> Result<PoseAngles, FaceQaError> {
            Ok(PoseAngles::default())
        }
    }

    /// Synthetic frontal-face landmark set inside a 200x200 image.
    pub(crate) fn synthetic_landmarks() -> FaceLandmarks {
        let mut pts = vec![LandmarkPoint::new(100, 100); 98];
        // Contour: half circle around the face, chin at the bottom
        for i in 0..33 {
            let angle = std::f64::consts::PI * (i as f64 / 32.0);
            pts[i] = LandmarkPoint::new(
                (100.0 - 55.0 * angle.cos()) as i16,
                (95.0 + 65.0 * angle.sin()) as i16,
            );
        }
        pts[16] = LandmarkPoint::new(100, 160); // chin
        for (i, p) in pts.iter_mut().enumerate().take(68).skip(60) {
            // left eye ring
            let angle = 2.0 * std::f64::consts::PI * ((i - 60) as f64 / 8.0);
            *p = LandmarkPoint::new(
                (75.0 + 8.0 * angle.cos()) as i16,
                (85.0 + 4.0 * angle.sin()) as i16,
            );
        }
        for (i, p) in pts.iter_mut().enumerate().take(76).skip(68) {
            // right eye ring
            let angle = 2.0 * std::f64::consts::PI * ((i - 68) as f64 / 8.0);
            *p = LandmarkPoint::new(
                (125.0 + 8.0 * angle.cos()) as i16,
                (85.0 + 4.0 * angle.sin()) as i16,
            );
        }
        pts[54] = LandmarkPoint::new(100, 115); // nose tip
        pts[76] = LandmarkPoint::new(82, 135); // left mouth corner
        pts[82] = LandmarkPoint::new(118, 135); // right mouth corner
        pts[96] = LandmarkPoint::new(75, 85); // left pupil
        pts[97] = LandmarkPoint::new(125, 85); // right pupil
        FaceLandmarks::new(LandmarkType::Wflw98, pts)
    }

    struct FixedLandmarks;
    impl LandmarkExtractor for FixedLandmarks {
        fn extract_landmarks(&self, _s: &Session) -> Result<FaceLandmarks, FaceQaError> {
            Ok(synthetic_landmarks())
        }
    }

    struct HalfSkin;
    impl SegmentationExtractor for HalfSkin {
        fn segment(&self, s: &Session) -> Result<Image, FaceQaError> {
            let aligned = s.aligned_image();
            let (w, h) = (aligned.width(), aligned.height());
            // Top half background, bottom half skin
            let data = (0..w as usize * h as usize)
                .map(|i| {
                    if i / w as usize > h as usize / 2 {
                        crate::pipeline::parsing::FACE_SKIN
                    } else {
                        crate::pipeline::parsing::BACKGROUND
                    }
                })
                .collect();
            Image::new_grey(w, h, data)
        }
    }

    struct FailingSegmenter;
    impl SegmentationExtractor for FailingSegmenter {
        fn segment(&self, _s: &Session) -> Result<Image, FaceQaError> {
            Err(FaceQaError::FaceParsing("model unavailable".into()))
        }
    }

    fn test_image() -> Image {
        Image::new_rgb(200, 200, vec![180; 200 * 200 * 3]).unwrap()
    }

    fn collaborators(
        detector: Arc<dyn FaceDetector>,
        parser: Arc<dyn SegmentationExtractor>,
    ) -> Collaborators {
        Collaborators::new(
            detector,
            Arc::new(FrontalPose),
            Arc::new(FixedLandmarks),
            parser,
            Arc::new(HalfSkin),
        )
    }

    #[test]
    fn populates_all_artifacts_on_success() {
        let img = test_image();
        let mut session = Session::new(&img);
        let collabs = collaborators(Arc::new(OneFace), Arc::new(HalfSkin));
        preprocess(&collabs, &mut session, &[MeasureId::SingleFacePresent]).unwrap();

        assert_eq!(session.detected_faces().len(), 1);
        assert_eq!(session.aligned_image().width(), ALIGNED_SIZE);
        assert_eq!(session.aligned_landmarks().points.len(), 98);
        assert!(!session.face_parsing_map().is_empty());
        assert!(!session.occlusion_mask().is_empty());
        assert!(!session.face_region_mask().is_empty());
        assert!(session.assessments().is_empty());
    }

    #[test]
    fn no_face_is_a_detection_error() {
        let img = test_image();
        let mut session = Session::new(&img);
        let collabs = collaborators(Arc::new(NoFaces), Arc::new(HalfSkin));
        let err = preprocess(&collabs, &mut session, &[MeasureId::DynamicRange]).unwrap_err();
        assert!(matches!(err, FaceQaError::FaceDetection(_)));
    }

    #[test]
    fn failure_marks_all_configured_measures_with_compound_expansion() {
        let img = test_image();
        let mut session = Session::new(&img);
        let collabs = collaborators(Arc::new(OneFace), Arc::new(FailingSegmenter));
        let configured = [MeasureId::SingleFacePresent, MeasureId::HeadPose];
        let err = preprocess(&collabs, &mut session, &configured).unwrap_err();
        assert!(matches!(err, FaceQaError::FaceParsing(_)));

        // 1 simple + 3 head-pose components
        assert_eq!(session.assessments().len(), 4);
        for result in session.assessments().values() {
            assert_eq!(result.status, AssessmentStatus::FailureToAssess);
        }
        assert!(session
            .assessments()
            .contains_key(&MeasureId::HeadPoseYaw));
    }

    #[test]
    fn aligned_eyes_land_near_reference_positions() {
        let img = test_image();
        let mut session = Session::new(&img);
        let collabs = collaborators(Arc::new(OneFace), Arc::new(HalfSkin));
        preprocess(&collabs, &mut session, &[]).unwrap();

        let aligned = session.aligned_landmarks();
        let left_pupil = aligned.points[96];
        let (rx, ry) = REFERENCE_LANDMARKS[0];
        let d = ((left_pupil.x as f64 - rx).powi(2) + (left_pupil.y as f64 - ry).powi(2)).sqrt();
        assert!(d < 12.0, "left pupil {left_pupil:?} vs reference ({rx}, {ry})");
    }
}
