//! Pipeline collaborator contracts and their compute-once wrappers.
//!
//! Each collaborator (detector, pose estimator, landmark extractor, the two
//! segmentation extractors) is a trait implemented by an embedder-provided
//! model adapter, wrapped by a caching struct that enforces *compute at most
//! once per session*: the wrapper compares the current session id against the
//! id recorded at the last invocation and replays the cached result when they
//! match. Measures may therefore call any wrapper repeatedly without paying
//! for repeated inference.

mod orchestrator;

pub use orchestrator::preprocess;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::FaceQaError;
use crate::session::Session;
use crate::types::{BoundingBox, FaceLandmarks, Image, PoseAngles};

/// Pixel class labels of the face-parsing map.
pub mod parsing {
    /// Background (neither face nor any facial covering).
    pub const BACKGROUND: u8 = 0;
    /// Facial skin.
    pub const FACE_SKIN: u8 = 1;
}

/// Face detection backend.
///
/// Returns one box per detected face, in any order; the wrapper sorts by area
/// descending so the first box is the subject face.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in the session's input image.
    fn detect_faces(&self, session: &Session) -> Result<Vec<BoundingBox>, FaceQaError>;
}

/// Head pose estimation backend. Angles are degrees; zero means frontal.
pub trait PoseEstimator: Send + Sync {
    /// Estimate the pose of the session's subject face.
    fn estimate_pose(&self, session: &Session) -> Result<PoseAngles, FaceQaError>;
}

/// Facial landmark extraction backend.
///
/// Operates on the (possibly squared and padded) crop of the session's
/// largest detected face and returns landmarks in *original image*
/// coordinates; the wrapper clamps them to image bounds.
pub trait LandmarkExtractor: Send + Sync {
    /// Extract landmarks for the session's subject face.
    fn extract_landmarks(&self, session: &Session) -> Result<FaceLandmarks, FaceQaError>;
}

/// Segmentation backend over the aligned image.
///
/// Produces a single-channel per-pixel class map (for face parsing) or a
/// binary map (for occlusion segmentation). Per-label binary masks are
/// derived and cached by the wrapper.
pub trait SegmentationExtractor: Send + Sync {
    /// Segment the session's aligned image.
    fn segment(&self, session: &Session) -> Result<Image, FaceQaError>;
}

/// Explicit per-session cache: the recorded session id plus the value
/// computed for it. Kept as its own struct so the compute-once contract is
/// visible and testable in isolation.
#[derive(Debug)]
pub struct SessionCache<T: Clone> {
    last_id: Option<String>,
    value: Option<T>,
}

// Manual impl: an empty cache needs no `T: Default`.
impl<T: Clone> Default for SessionCache<T> {
    fn default() -> Self {
        Self {
            last_id: None,
            value: None,
        }
    }
}

impl<T: Clone> SessionCache<T> {
    /// Return the cached value when `session_id` matches the recorded id;
    /// otherwise invoke `compute`, record the id, and cache the result.
    pub fn get_or_compute<E>(
        &mut self,
        session_id: &str,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        if self.last_id.as_deref() == Some(session_id) {
            if let Some(value) = &self.value {
                return Ok(value.clone());
            }
        }
        let value = compute()?;
        self.last_id = Some(session_id.to_string());
        self.value = Some(value.clone());
        Ok(value)
    }
}

/// [`SessionCache`] variant keyed by session id *and* a secondary label.
/// Changing the session id drops all labels.
#[derive(Debug)]
pub struct KeyedSessionCache<T: Clone> {
    last_id: Option<String>,
    values: HashMap<u8, T>,
}

impl<T: Clone> Default for KeyedSessionCache<T> {
    fn default() -> Self {
        Self {
            last_id: None,
            values: HashMap::new(),
        }
    }
}

impl<T: Clone> KeyedSessionCache<T> {
    /// Per-label variant of [`SessionCache::get_or_compute`].
    pub fn get_or_compute<E>(
        &mut self,
        session_id: &str,
        label: u8,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        if self.last_id.as_deref() != Some(session_id) {
            self.values.clear();
            self.last_id = Some(session_id.to_string());
        }
        if let Some(value) = self.values.get(&label) {
            return Ok(value.clone());
        }
        let value = compute()?;
        self.values.insert(label, value.clone());
        Ok(value)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Compute-once wrapper around a [`FaceDetector`].
pub struct CachedFaceDetector {
    inner: Arc<dyn FaceDetector>,
    cache: Mutex<SessionCache<Vec<BoundingBox>>>,
}

impl CachedFaceDetector {
    /// Wrap a detector adapter.
    pub fn new(inner: Arc<dyn FaceDetector>) -> Self {
        Self {
            inner,
            cache: Mutex::new(SessionCache::default()),
        }
    }

    /// Detected faces sorted by box area descending. Cached per session id.
    pub fn detect_faces(&self, session: &Session) -> Result<Vec<BoundingBox>, FaceQaError> {
        lock(&self.cache).get_or_compute(session.id(), || {
            let mut faces = self.inner.detect_faces(session)?;
            faces.sort_by_key(|b| std::cmp::Reverse(b.area()));
            Ok(faces)
        })
    }
}

/// Compute-once wrapper around a [`PoseEstimator`].
pub struct CachedPoseEstimator {
    inner: Arc<dyn PoseEstimator>,
    cache: Mutex<SessionCache<PoseAngles>>,
}

impl CachedPoseEstimator {
    /// Wrap a pose-estimator adapter.
    pub fn new(inner: Arc<dyn PoseEstimator>) -> Self {
        Self {
            inner,
            cache: Mutex::new(SessionCache::default()),
        }
    }

    /// Head pose of the subject face. Cached per session id.
    pub fn estimate_pose(&self, session: &Session) -> Result<PoseAngles, FaceQaError> {
        lock(&self.cache).get_or_compute(session.id(), || self.inner.estimate_pose(session))
    }
}

/// Compute-once wrapper around a [`LandmarkExtractor`].
pub struct CachedLandmarkExtractor {
    inner: Arc<dyn LandmarkExtractor>,
    cache: Mutex<SessionCache<FaceLandmarks>>,
}

impl CachedLandmarkExtractor {
    /// Wrap a landmark-extractor adapter.
    pub fn new(inner: Arc<dyn LandmarkExtractor>) -> Self {
        Self {
            inner,
            cache: Mutex::new(SessionCache::default()),
        }
    }

    /// Landmarks of the subject face in original-image coordinates, clamped
    /// to image bounds. Cached per session id.
    pub fn extract_landmarks(&self, session: &Session) -> Result<FaceLandmarks, FaceQaError> {
        lock(&self.cache).get_or_compute(session.id(), || {
            let mut landmarks = self.inner.extract_landmarks(session)?;
            let max_x = session.image().width().saturating_sub(1) as i32;
            let max_y = session.image().height().saturating_sub(1) as i32;
            for p in &mut landmarks.points {
                p.x = (p.x as i32).clamp(0, max_x) as i16;
                p.y = (p.y as i32).clamp(0, max_y) as i16;
            }
            Ok(landmarks)
        })
    }
}

/// Compute-once wrapper around a [`SegmentationExtractor`].
///
/// The underlying class map is computed once per session; per-label binary
/// masks are derived from it and cached per (session id, label).
pub struct CachedSegmentation {
    inner: Arc<dyn SegmentationExtractor>,
    map_cache: Mutex<SessionCache<Image>>,
    mask_cache: Mutex<KeyedSessionCache<Image>>,
}

impl CachedSegmentation {
    /// Wrap a segmentation adapter.
    pub fn new(inner: Arc<dyn SegmentationExtractor>) -> Self {
        Self {
            inner,
            map_cache: Mutex::new(SessionCache::default()),
            mask_cache: Mutex::new(KeyedSessionCache::default()),
        }
    }

    /// The full single-channel class map. Cached per session id.
    pub fn class_map(&self, session: &Session) -> Result<Image, FaceQaError> {
        lock(&self.map_cache).get_or_compute(session.id(), || self.inner.segment(session))
    }

    /// Binary mask (255 where the class map equals `label`, else 0).
    /// Cached per session id and label.
    pub fn get_mask(&self, session: &Session, label: u8) -> Result<Image, FaceQaError> {
        let map = self.class_map(session)?;
        lock(&self.mask_cache).get_or_compute(session.id(), label, || {
            let data = map
                .data()
                .iter()
                .map(|&c| if c == label { 255u8 } else { 0u8 })
                .collect();
            Image::new_grey(map.width(), map.height(), data)
        })
    }
}

/// The loaded collaborator set, created once at initialization and shared by
/// all sessions. Adapters are assumed stateless after loading.
pub struct Collaborators {
    /// Face detection backend.
    pub detector: CachedFaceDetector,
    /// Head pose estimation backend.
    pub pose: CachedPoseEstimator,
    /// Facial landmark extraction backend.
    pub landmarks: CachedLandmarkExtractor,
    /// Face parsing (semantic class map) backend.
    pub face_parser: CachedSegmentation,
    /// Occlusion segmentation backend.
    pub occlusion: CachedSegmentation,
}

impl Collaborators {
    /// Wrap a set of model adapters in their compute-once caches.
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        pose: Arc<dyn PoseEstimator>,
        landmarks: Arc<dyn LandmarkExtractor>,
        face_parser: Arc<dyn SegmentationExtractor>,
        occlusion: Arc<dyn SegmentationExtractor>,
    ) -> Self {
        Self {
            detector: CachedFaceDetector::new(detector),
            pose: CachedPoseEstimator::new(pose),
            landmarks: CachedLandmarkExtractor::new(landmarks),
            face_parser: CachedSegmentation::new(face_parser),
            occlusion: CachedSegmentation::new(occlusion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FaceDetectorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDetector {
        calls: AtomicUsize,
        boxes: Vec<BoundingBox>,
    }

    impl FaceDetector for CountingDetector {
        fn detect_faces(&self, _session: &Session) -> Result<Vec<BoundingBox>, FaceQaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.boxes.clone())
        }
    }

    fn boxes() -> Vec<BoundingBox> {
        vec![
            BoundingBox::new(0, 0, 10, 10, FaceDetectorKind::Ssd),
            BoundingBox::new(0, 0, 40, 40, FaceDetectorKind::Ssd),
        ]
    }

    #[test]
    fn detector_caches_per_session_id() {
        let inner = Arc::new(CountingDetector {
            calls: AtomicUsize::new(0),
            boxes: boxes(),
        });
        let cached = CachedFaceDetector::new(inner.clone());
        let img = Image::new_grey(1, 1, vec![0]).unwrap();
        let session = Session::new(&img);

        let first = cached.detect_faces(&session).unwrap();
        let second = cached.detect_faces(&session).unwrap();
        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        // A new session id triggers recomputation
        let other = Session::new(&img);
        cached.detect_faces(&other).unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn detector_sorts_by_area_descending() {
        let cached = CachedFaceDetector::new(Arc::new(CountingDetector {
            calls: AtomicUsize::new(0),
            boxes: boxes(),
        }));
        let img = Image::new_grey(1, 1, vec![0]).unwrap();
        let session = Session::new(&img);
        let faces = cached.detect_faces(&session).unwrap();
        assert_eq!(faces[0].width, 40);
        assert_eq!(faces[1].width, 10);
    }

    struct CountingSegmenter {
        calls: AtomicUsize,
    }

    impl SegmentationExtractor for CountingSegmenter {
        fn segment(&self, _session: &Session) -> Result<Image, FaceQaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Image::new_grey(2, 1, vec![parsing::BACKGROUND, parsing::FACE_SKIN])
        }
    }

    #[test]
    fn segmentation_caches_map_and_per_label_masks() {
        let inner = Arc::new(CountingSegmenter {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedSegmentation::new(inner.clone());
        let img = Image::new_grey(1, 1, vec![0]).unwrap();
        let session = Session::new(&img);

        let skin = cached.get_mask(&session, parsing::FACE_SKIN).unwrap();
        assert_eq!(skin.data(), &[0, 255]);
        let bg = cached.get_mask(&session, parsing::BACKGROUND).unwrap();
        assert_eq!(bg.data(), &[255, 0]);
        // Same labels again: served from cache
        cached.get_mask(&session, parsing::FACE_SKIN).unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    struct ClampingLandmarks;

    impl LandmarkExtractor for ClampingLandmarks {
        fn extract_landmarks(&self, _session: &Session) -> Result<FaceLandmarks, FaceQaError> {
            Ok(FaceLandmarks::new(
                crate::types::LandmarkType::Wflw98,
                vec![crate::types::LandmarkPoint::new(-5, 300)],
            ))
        }
    }

    #[test]
    fn caches_start_empty_for_value_types_without_default() {
        // Image and FaceLandmarks carry no Default; empty caches must not
        // require one.
        let mut plain = SessionCache::<Image>::default();
        let img = plain
            .get_or_compute::<FaceQaError>("s1", || Image::new_grey(1, 1, vec![7]))
            .unwrap();
        assert_eq!(img.data(), &[7]);

        let mut keyed = KeyedSessionCache::<FaceLandmarks>::default();
        let lm = keyed
            .get_or_compute::<FaceQaError>("s1", 0, || Ok(FaceLandmarks::empty()))
            .unwrap();
        assert!(lm.points.is_empty());
    }

    #[test]
    fn landmarks_are_clamped_to_image_bounds() {
        let cached = CachedLandmarkExtractor::new(Arc::new(ClampingLandmarks));
        let img = Image::new_grey(100, 100, vec![0; 100 * 100]).unwrap();
        let session = Session::new(&img);
        let lm = cached.extract_landmarks(&session).unwrap();
        assert_eq!(lm.points[0].x, 0);
        assert_eq!(lm.points[0].y, 99);
    }
}
