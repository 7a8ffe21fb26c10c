//! Per-request data container for one image assessment.
//!
//! A [`Session`] is created per `vector_quality` call, carries the input image
//! and the output assessment map, and caches the preprocessing artifacts that
//! measures read. Artifacts are written once by the orchestrator and read many
//! times by measures; getters hand out clones so no measure can mutate the
//! shared snapshot. A getter called before the matching setter yields an
//! empty/zero value — the orchestrator's strict step ordering is what prevents
//! that in practice.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::alignment::SimilarityTransform;
use crate::types::{
    BoundingBox, FaceLandmarks, Image, PoseAngles, QualityAssessments,
};

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Per-image assessment session. Not internally synchronized; one session
/// belongs to exactly one in-flight assessment call.
#[derive(Debug)]
pub struct Session<'a> {
    image: &'a Image,
    id: String,
    assessments: QualityAssessments,

    detected_faces: Option<Vec<BoundingBox>>,
    pose: Option<PoseAngles>,
    landmarks: Option<FaceLandmarks>,
    aligned_image: Option<Image>,
    aligned_landmarks: Option<FaceLandmarks>,
    alignment_transform: Option<SimilarityTransform>,
    face_region_mask: Option<Image>,
    face_parsing_map: Option<Image>,
    occlusion_mask: Option<Image>,
}

impl<'a> Session<'a> {
    /// Create a session for one input image. The id is unique per
    /// construction (monotonically incrementing process-wide counter).
    pub fn new(image: &'a Image) -> Self {
        let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            image,
            id: format!("session-{n}"),
            assessments: QualityAssessments::new(),
            detected_faces: None,
            pose: None,
            landmarks: None,
            aligned_image: None,
            aligned_landmarks: None,
            alignment_transform: None,
            face_region_mask: None,
            face_parsing_map: None,
            occlusion_mask: None,
        }
    }

    /// The immutable input image.
    pub fn image(&self) -> &Image {
        self.image
    }

    /// Unique session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The output assessment map.
    pub fn assessments(&self) -> &QualityAssessments {
        &self.assessments
    }

    /// Mutable access to the output assessment map (measures write here).
    pub fn assessments_mut(&mut self) -> &mut QualityAssessments {
        &mut self.assessments
    }

    /// Consume the session, yielding the assessment map.
    pub fn into_assessments(self) -> QualityAssessments {
        self.assessments
    }

    /// Detected faces, area-descending. Empty if detection has not run.
    pub fn detected_faces(&self) -> Vec<BoundingBox> {
        self.detected_faces.clone().unwrap_or_default()
    }

    /// Record the detection result.
    pub fn set_detected_faces(&mut self, faces: Vec<BoundingBox>) {
        self.detected_faces = Some(faces);
    }

    /// The subject (largest) face box, if any face was detected.
    pub fn face_bounding_box(&self) -> Option<BoundingBox> {
        self.detected_faces.as_ref().and_then(|f| f.first().copied())
    }

    /// Head pose angles in degrees; zeros if pose estimation has not run.
    pub fn pose(&self) -> PoseAngles {
        self.pose.unwrap_or_default()
    }

    /// Record the estimated pose.
    pub fn set_pose(&mut self, pose: PoseAngles) {
        self.pose = Some(pose);
    }

    /// Landmarks in original-image coordinates; empty if extraction has not
    /// run.
    pub fn landmarks(&self) -> FaceLandmarks {
        self.landmarks.clone().unwrap_or_else(FaceLandmarks::empty)
    }

    /// Record landmarks in original-image coordinates.
    pub fn set_landmarks(&mut self, landmarks: FaceLandmarks) {
        self.landmarks = Some(landmarks);
    }

    /// The aligned face image; empty if alignment has not run.
    pub fn aligned_image(&self) -> Image {
        self.aligned_image.clone().unwrap_or_else(Image::empty)
    }

    /// Record the aligned face image.
    pub fn set_aligned_image(&mut self, image: Image) {
        self.aligned_image = Some(image);
    }

    /// Landmarks in aligned-image coordinates; empty if alignment has not
    /// run.
    pub fn aligned_landmarks(&self) -> FaceLandmarks {
        self.aligned_landmarks
            .clone()
            .unwrap_or_else(FaceLandmarks::empty)
    }

    /// Record landmarks in aligned-image coordinates.
    pub fn set_aligned_landmarks(&mut self, landmarks: FaceLandmarks) {
        self.aligned_landmarks = Some(landmarks);
    }

    /// Original→aligned similarity transform; identity if alignment has not
    /// run.
    pub fn alignment_transform(&self) -> SimilarityTransform {
        self.alignment_transform
            .unwrap_or_else(SimilarityTransform::identity)
    }

    /// Record the alignment transform.
    pub fn set_alignment_transform(&mut self, transform: SimilarityTransform) {
        self.alignment_transform = Some(transform);
    }

    /// Landmarked-region mask (convex hull of aligned landmarks) on the
    /// aligned image; empty if not derived.
    pub fn face_region_mask(&self) -> Image {
        self.face_region_mask.clone().unwrap_or_else(Image::empty)
    }

    /// Record the landmarked-region mask.
    pub fn set_face_region_mask(&mut self, mask: Image) {
        self.face_region_mask = Some(mask);
    }

    /// Per-pixel face-parsing class map on the aligned image; empty if
    /// parsing has not run.
    pub fn face_parsing_map(&self) -> Image {
        self.face_parsing_map.clone().unwrap_or_else(Image::empty)
    }

    /// Record the face-parsing class map.
    pub fn set_face_parsing_map(&mut self, map: Image) {
        self.face_parsing_map = Some(map);
    }

    /// Binary non-occluded mask on the aligned image; empty if occlusion
    /// segmentation has not run.
    pub fn occlusion_mask(&self) -> Image {
        self.occlusion_mask.clone().unwrap_or_else(Image::empty)
    }

    /// Record the occlusion mask.
    pub fn set_occlusion_mask(&mut self, mask: Image) {
        self.occlusion_mask = Some(mask);
    }
}
