//! Core data model: images, bounding boxes, landmarks, and assessment results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FaceQaError;

/// An owned raster image, immutable once constructed.
///
/// Either 8-bit single-channel grey or 24-bit interleaved RGB, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    /// Bits per pixel: 8 (grey) or 24 (RGB).
    depth: u8,
    data: Vec<u8>,
}

impl Image {
    /// Create an 8-bit grey image from a row-major buffer.
    pub fn new_grey(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FaceQaError> {
        Self::new(width, height, 8, data)
    }

    /// Create a 24-bit RGB image from a row-major interleaved buffer.
    pub fn new_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FaceQaError> {
        Self::new(width, height, 24, data)
    }

    fn new(width: u32, height: u32, depth: u8, data: Vec<u8>) -> Result<Self, FaceQaError> {
        let expected = width as usize * height as usize * depth as usize / 8;
        if data.len() != expected {
            return Err(FaceQaError::ImageDecode(format!(
                "buffer length {} does not match {}x{}x{}bpp (expected {})",
                data.len(),
                width,
                height,
                depth,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            depth,
            data,
        })
    }

    /// Decode an image from encoded bytes (PNG, JPEG, ...).
    ///
    /// Greyscale sources decode to 8-bit grey; everything else to 24-bit RGB.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FaceQaError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| FaceQaError::ImageDecode(e.to_string()))?;
        match decoded {
            image::DynamicImage::ImageLuma8(grey) => {
                let (w, h) = (grey.width(), grey.height());
                Self::new_grey(w, h, grey.into_raw())
            }
            other => {
                let rgb = other.to_rgb8();
                let (w, h) = (rgb.width(), rgb.height());
                Self::new_rgb(w, h, rgb.into_raw())
            }
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bits per pixel: 8 for grey, 24 for RGB.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Number of channels: 1 for grey, 3 for RGB.
    pub fn channels(&self) -> usize {
        self.depth as usize / 8
    }

    /// Total buffer size in bytes (`width * height * depth / 8`).
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Raw row-major pixel buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Zero-sized placeholder image.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            depth: 8,
            data: Vec::new(),
        }
    }

    /// Whether the image has zero area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel channels at (x, y). Grey images yield one byte, RGB three.
    /// Out-of-bounds coordinates yield black.
    pub fn pixel(&self, x: i32, y: i32) -> [u8; 3] {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return [0, 0, 0];
        }
        let c = self.channels();
        let idx = (y as usize * self.width as usize + x as usize) * c;
        if c == 1 {
            let v = self.data[idx];
            [v, v, v]
        } else {
            [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
        }
    }

    /// Extract a sub-image. The region must lie fully inside the image.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Result<Image, FaceQaError> {
        // Widen before adding so huge arguments cannot overflow u32
        if x as u64 + width as u64 > self.width as u64
            || y as u64 + height as u64 > self.height as u64
        {
            return Err(FaceQaError::Unknown(format!(
                "crop {}x{}+{}+{} exceeds {}x{} image",
                width, height, x, y, self.width, self.height
            )));
        }
        let c = self.channels();
        let mut data = Vec::with_capacity(width as usize * height as usize * c);
        for row in y..y + height {
            let start = (row as usize * self.width as usize + x as usize) * c;
            data.extend_from_slice(&self.data[start..start + width as usize * c]);
        }
        Image::new(width, height, self.depth, data)
    }

    /// Copy the image into a larger canvas with constant black borders.
    ///
    /// `left`/`top`/`right`/`bottom` are the border widths in pixels.
    pub fn pad(&self, left: u32, top: u32, right: u32, bottom: u32) -> Image {
        let c = self.channels();
        let new_w = self.width + left + right;
        let new_h = self.height + top + bottom;
        let mut data = vec![0u8; new_w as usize * new_h as usize * c];
        for row in 0..self.height {
            let src = (row as usize * self.width as usize) * c;
            let dst = ((row + top) as usize * new_w as usize + left as usize) * c;
            data[dst..dst + self.width as usize * c]
                .copy_from_slice(&self.data[src..src + self.width as usize * c]);
        }
        Image {
            width: new_w,
            height: new_h,
            depth: self.depth,
            data,
        }
    }
}

/// Which detector produced a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceDetectorKind {
    /// Single-shot-detector style CNN backend.
    Ssd,
    /// Embedder-provided backend.
    External,
}

/// Axis-aligned face bounding box in pixel coordinates.
///
/// Coordinates may be negative or out of image range transiently, before
/// squaring and clamping (see [`crate::geometry`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X coordinate of the top-left corner.
    pub x: i32,
    /// Y coordinate of the top-left corner.
    pub y: i32,
    /// Box width in pixels.
    pub width: i32,
    /// Box height in pixels.
    pub height: i32,
    /// Backend that produced this box.
    pub detector: FaceDetectorKind,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub const fn new(x: i32, y: i32, width: i32, height: i32, detector: FaceDetectorKind) -> Self {
        Self {
            x,
            y,
            width,
            height,
            detector,
        }
    }

    /// Box area in square pixels.
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Center of the box, in floating-point pixel coordinates.
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// One facial landmark in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    /// Horizontal pixel coordinate.
    pub x: i16,
    /// Vertical pixel coordinate.
    pub y: i16,
}

impl LandmarkPoint {
    /// Create a landmark at (x, y).
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another landmark.
    pub fn distance(&self, other: &LandmarkPoint) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Which landmark index scheme a [`FaceLandmarks`] instance uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LandmarkType {
    /// 98-point WFLW scheme (contour, brows, nose, eyes, mouth, pupils).
    Wflw98,
    /// No scheme assigned; part extraction is unavailable.
    Unknown,
}

/// An ordered sequence of facial landmarks plus the scheme that interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    /// Index scheme tag.
    pub kind: LandmarkType,
    /// Landmark points, ordered per the scheme.
    pub points: Vec<LandmarkPoint>,
}

impl FaceLandmarks {
    /// Create landmarks with the given scheme.
    pub fn new(kind: LandmarkType, points: Vec<LandmarkPoint>) -> Self {
        Self { kind, points }
    }

    /// Empty landmark set with no scheme.
    pub fn empty() -> Self {
        Self {
            kind: LandmarkType::Unknown,
            points: Vec::new(),
        }
    }
}

/// Sentinel scalar meaning "unassigned or failed".
pub const SCALAR_UNASSIGNED: f64 = -1.0;

/// Outcome status of one quality measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentStatus {
    /// The measure produced a valid raw score and scalar.
    Success,
    /// The measure ran but could not assess this image.
    FailureToAssess,
    /// The measure has not run yet.
    NotInitialized,
}

/// Result triple of one quality measure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMeasureResult {
    /// Native score in algorithm-specific units, unbounded.
    pub raw_score: f64,
    /// Calibrated quality in [0, 100], or [`SCALAR_UNASSIGNED`].
    pub scalar: f64,
    /// Outcome status; distinguishes failure from a genuine zero score.
    pub status: AssessmentStatus,
}

impl QualityMeasureResult {
    /// Successful result with a raw score and calibrated scalar.
    pub fn success(raw_score: f64, scalar: f64) -> Self {
        Self {
            raw_score,
            scalar,
            status: AssessmentStatus::Success,
        }
    }

    /// Failed assessment; raw score is forced to 0.
    pub fn failure() -> Self {
        Self {
            raw_score: 0.0,
            scalar: SCALAR_UNASSIGNED,
            status: AssessmentStatus::FailureToAssess,
        }
    }
}

impl Default for QualityMeasureResult {
    fn default() -> Self {
        Self {
            raw_score: 0.0,
            scalar: SCALAR_UNASSIGNED,
            status: AssessmentStatus::NotInitialized,
        }
    }
}

/// Identifier of a quality measure or of one component of a compound measure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum MeasureId {
    /// Exactly one face in the capture.
    SingleFacePresent,
    /// Entropy-based tonal range of the face region.
    DynamicRange,
    /// Compound over face-region lightness statistics.
    Luminance,
    /// Mean face-region lightness component.
    LuminanceMean,
    /// Lightness spread component.
    LuminanceVariance,
    /// Compound over the three head rotation axes.
    HeadPose,
    /// Yaw frontality component.
    HeadPoseYaw,
    /// Pitch frontality component.
    HeadPosePitch,
    /// Roll frontality component.
    HeadPoseRoll,
    /// Compound over the four face-to-edge margins.
    CropOfTheFaceImage,
    /// Margin from the eye midpoint to the left image edge.
    LeftwardCropOfTheFaceImage,
    /// Margin from the eye midpoint to the right image edge.
    RightwardCropOfTheFaceImage,
    /// Margin from the eye midpoint to the top image edge.
    MarginAboveOfTheFaceImage,
    /// Margin from the eye midpoint to the bottom image edge.
    MarginBelowOfTheFaceImage,
    /// Gradient flatness of the capture background.
    BackgroundUniformity,
    /// Single fused quality score, when an embedder provides one.
    UnifiedQualityScore,
}

impl MeasureId {
    /// Canonical configuration-file spelling of the identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureId::SingleFacePresent => "SingleFacePresent",
            MeasureId::DynamicRange => "DynamicRange",
            MeasureId::Luminance => "Luminance",
            MeasureId::LuminanceMean => "LuminanceMean",
            MeasureId::LuminanceVariance => "LuminanceVariance",
            MeasureId::HeadPose => "HeadPose",
            MeasureId::HeadPoseYaw => "HeadPoseYaw",
            MeasureId::HeadPosePitch => "HeadPosePitch",
            MeasureId::HeadPoseRoll => "HeadPoseRoll",
            MeasureId::CropOfTheFaceImage => "CropOfTheFaceImage",
            MeasureId::LeftwardCropOfTheFaceImage => "LeftwardCropOfTheFaceImage",
            MeasureId::RightwardCropOfTheFaceImage => "RightwardCropOfTheFaceImage",
            MeasureId::MarginAboveOfTheFaceImage => "MarginAboveOfTheFaceImage",
            MeasureId::MarginBelowOfTheFaceImage => "MarginBelowOfTheFaceImage",
            MeasureId::BackgroundUniformity => "BackgroundUniformity",
            MeasureId::UnifiedQualityScore => "UnifiedQualityScore",
        }
    }

    /// Parse a configuration-file identifier. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<MeasureId> {
        const ALL: &[MeasureId] = &[
            MeasureId::SingleFacePresent,
            MeasureId::DynamicRange,
            MeasureId::Luminance,
            MeasureId::LuminanceMean,
            MeasureId::LuminanceVariance,
            MeasureId::HeadPose,
            MeasureId::HeadPoseYaw,
            MeasureId::HeadPosePitch,
            MeasureId::HeadPoseRoll,
            MeasureId::CropOfTheFaceImage,
            MeasureId::LeftwardCropOfTheFaceImage,
            MeasureId::RightwardCropOfTheFaceImage,
            MeasureId::MarginAboveOfTheFaceImage,
            MeasureId::MarginBelowOfTheFaceImage,
            MeasureId::BackgroundUniformity,
            MeasureId::UnifiedQualityScore,
        ];
        ALL.iter().copied().find(|id| id.as_str() == name)
    }

    /// Result-map keys this measure writes. Compound measures expand into
    /// their component keys; simple measures yield themselves.
    pub fn result_keys(&self) -> &'static [MeasureId] {
        match self {
            MeasureId::HeadPose => &[
                MeasureId::HeadPoseYaw,
                MeasureId::HeadPosePitch,
                MeasureId::HeadPoseRoll,
            ],
            MeasureId::CropOfTheFaceImage => &[
                MeasureId::LeftwardCropOfTheFaceImage,
                MeasureId::RightwardCropOfTheFaceImage,
                MeasureId::MarginAboveOfTheFaceImage,
                MeasureId::MarginBelowOfTheFaceImage,
            ],
            MeasureId::Luminance => &[MeasureId::LuminanceMean, MeasureId::LuminanceVariance],
            MeasureId::SingleFacePresent => &[MeasureId::SingleFacePresent],
            MeasureId::DynamicRange => &[MeasureId::DynamicRange],
            MeasureId::LuminanceMean => &[MeasureId::LuminanceMean],
            MeasureId::LuminanceVariance => &[MeasureId::LuminanceVariance],
            MeasureId::HeadPoseYaw => &[MeasureId::HeadPoseYaw],
            MeasureId::HeadPosePitch => &[MeasureId::HeadPosePitch],
            MeasureId::HeadPoseRoll => &[MeasureId::HeadPoseRoll],
            MeasureId::LeftwardCropOfTheFaceImage => &[MeasureId::LeftwardCropOfTheFaceImage],
            MeasureId::RightwardCropOfTheFaceImage => &[MeasureId::RightwardCropOfTheFaceImage],
            MeasureId::MarginAboveOfTheFaceImage => &[MeasureId::MarginAboveOfTheFaceImage],
            MeasureId::MarginBelowOfTheFaceImage => &[MeasureId::MarginBelowOfTheFaceImage],
            MeasureId::BackgroundUniformity => &[MeasureId::BackgroundUniformity],
            MeasureId::UnifiedQualityScore => &[MeasureId::UnifiedQualityScore],
        }
    }
}

/// Mapping from measure identifier to its latest result.
///
/// Keys are unique; iteration order is by key and carries no meaning.
pub type QualityAssessments = BTreeMap<MeasureId, QualityMeasureResult>;

/// Head pose angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseAngles {
    /// Rotation around the vertical axis (left/right turn).
    pub yaw: f64,
    /// Rotation around the horizontal axis (up/down nod).
    pub pitch: f64,
    /// In-plane rotation (head tilt).
    pub roll: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size_is_width_height_depth() {
        let img = Image::new_rgb(4, 3, vec![0; 4 * 3 * 3]).unwrap();
        assert_eq!(img.size(), 36); // 4 * 3 * 24 / 8
        let grey = Image::new_grey(4, 3, vec![0; 12]).unwrap();
        assert_eq!(grey.size(), 12);
    }

    #[test]
    fn image_rejects_mismatched_buffer() {
        assert!(Image::new_rgb(4, 3, vec![0; 10]).is_err());
    }

    #[test]
    fn pixel_out_of_bounds_is_black() {
        let img = Image::new_grey(2, 2, vec![200; 4]).unwrap();
        assert_eq!(img.pixel(-1, 0), [0, 0, 0]);
        assert_eq!(img.pixel(0, 0), [200, 200, 200]);
    }

    #[test]
    fn pad_translates_content() {
        let img = Image::new_grey(2, 2, vec![9, 9, 9, 9]).unwrap();
        let padded = img.pad(1, 2, 3, 4);
        assert_eq!(padded.width(), 6);
        assert_eq!(padded.height(), 8);
        assert_eq!(padded.pixel(0, 0), [0, 0, 0]);
        assert_eq!(padded.pixel(1, 2), [9, 9, 9]);
    }

    #[test]
    fn crop_extracts_region() {
        // 3x3 grey ramp 0..9
        let img = Image::new_grey(3, 3, (0..9).collect()).unwrap();
        let sub = img.crop(1, 1, 2, 2).unwrap();
        assert_eq!(sub.data(), &[4, 5, 7, 8]);
        assert!(img.crop(2, 2, 2, 2).is_err());
    }

    #[test]
    fn crop_rejects_huge_regions_without_overflowing() {
        let img = Image::new_grey(3, 3, (0..9).collect()).unwrap();
        assert!(img.crop(2, 0, u32::MAX, 1).is_err());
        assert!(img.crop(0, 2, 1, u32::MAX).is_err());
    }

    #[test]
    fn bounding_box_area_and_center() {
        let b = BoundingBox::new(10, 20, 30, 40, FaceDetectorKind::Ssd);
        assert_eq!(b.area(), 1200);
        assert_eq!(b.center(), (25.0, 40.0));
    }

    #[test]
    fn measure_id_round_trips_through_names() {
        for id in [
            MeasureId::SingleFacePresent,
            MeasureId::HeadPose,
            MeasureId::BackgroundUniformity,
        ] {
            assert_eq!(MeasureId::parse(id.as_str()), Some(id));
        }
        assert_eq!(MeasureId::parse("NoSuchMeasure"), None);
    }

    #[test]
    fn compound_ids_expand_to_components() {
        assert_eq!(MeasureId::HeadPose.result_keys().len(), 3);
        assert_eq!(MeasureId::CropOfTheFaceImage.result_keys().len(), 4);
        assert_eq!(
            MeasureId::DynamicRange.result_keys(),
            &[MeasureId::DynamicRange]
        );
    }

    #[test]
    fn default_result_is_not_initialized() {
        let r = QualityMeasureResult::default();
        assert_eq!(r.status, AssessmentStatus::NotInitialized);
        assert_eq!(r.scalar, SCALAR_UNASSIGNED);
    }
}
