//! Named facial part extraction from scheme-specific landmark indices.
//!
//! Each [`LandmarkType`] carries a static index table that maps named
//! [`FacePart`]s to point indices (or index pairs for corner parts). Measures
//! never hard-code indices; they go through [`extract_part`].

use crate::error::FaceQaError;
use crate::types::{FaceLandmarks, LandmarkPoint, LandmarkType};

/// Named facial parts resolvable from a landmark scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacePart {
    /// Full left-eye outline.
    LeftEye,
    /// Full right-eye outline.
    RightEye,
    /// Outer and inner corner of the left eye.
    LeftEyeCorners,
    /// Outer and inner corner of the right eye.
    RightEyeCorners,
    /// Left pupil / eye center.
    LeftEyeCenter,
    /// Right pupil / eye center.
    RightEyeCenter,
    /// Outer mouth outline.
    MouthOuter,
    /// Inner mouth outline.
    MouthInner,
    /// Left and right mouth corners.
    MouthCorners,
    /// Jaw/face contour.
    Contour,
    /// Chin bottom point.
    Chin,
    /// Nose tip point.
    NoseTip,
}

/// WFLW 98-point layout:
/// contour 0–32, eyebrows 33–50, nose 51–59, left eye 60–67, right eye 68–75,
/// mouth outer 76–87, mouth inner 88–95, pupils 96–97.
mod wflw98 {
    pub const COUNT: usize = 98;
    pub const CONTOUR: (usize, usize) = (0, 32);
    pub const CHIN: usize = 16;
    pub const NOSE_TIP: usize = 54;
    pub const LEFT_EYE: (usize, usize) = (60, 67);
    pub const RIGHT_EYE: (usize, usize) = (68, 75);
    pub const LEFT_EYE_CORNERS: [usize; 2] = [60, 64];
    pub const RIGHT_EYE_CORNERS: [usize; 2] = [68, 72];
    pub const LEFT_PUPIL: usize = 96;
    pub const RIGHT_PUPIL: usize = 97;
    pub const MOUTH_OUTER: (usize, usize) = (76, 87);
    pub const MOUTH_INNER: (usize, usize) = (88, 95);
    pub const MOUTH_CORNERS: [usize; 2] = [76, 82];
}

fn indices_for(kind: LandmarkType, part: FacePart) -> Result<Vec<usize>, FaceQaError> {
    match kind {
        LandmarkType::Wflw98 => Ok(match part {
            FacePart::LeftEye => range(wflw98::LEFT_EYE),
            FacePart::RightEye => range(wflw98::RIGHT_EYE),
            FacePart::LeftEyeCorners => wflw98::LEFT_EYE_CORNERS.to_vec(),
            FacePart::RightEyeCorners => wflw98::RIGHT_EYE_CORNERS.to_vec(),
            FacePart::LeftEyeCenter => vec![wflw98::LEFT_PUPIL],
            FacePart::RightEyeCenter => vec![wflw98::RIGHT_PUPIL],
            FacePart::MouthOuter => range(wflw98::MOUTH_OUTER),
            FacePart::MouthInner => range(wflw98::MOUTH_INNER),
            FacePart::MouthCorners => wflw98::MOUTH_CORNERS.to_vec(),
            FacePart::Contour => range(wflw98::CONTOUR),
            FacePart::Chin => vec![wflw98::CHIN],
            FacePart::NoseTip => vec![wflw98::NOSE_TIP],
        }),
        LandmarkType::Unknown => Err(FaceQaError::FaceLandmarkExtraction(
            "no landmark scheme assigned".into(),
        )),
    }
}

/// Number of points a landmark scheme requires.
pub fn expected_point_count(kind: LandmarkType) -> Option<usize> {
    match kind {
        LandmarkType::Wflw98 => Some(wflw98::COUNT),
        LandmarkType::Unknown => None,
    }
}

fn range((lo, hi): (usize, usize)) -> Vec<usize> {
    (lo..=hi).collect()
}

/// Extract the points of a named facial part.
///
/// Fails when the landmark set has no scheme or fewer points than the scheme
/// requires.
pub fn extract_part(
    landmarks: &FaceLandmarks,
    part: FacePart,
) -> Result<Vec<LandmarkPoint>, FaceQaError> {
    if let Some(count) = expected_point_count(landmarks.kind) {
        if landmarks.points.len() < count {
            return Err(FaceQaError::FaceLandmarkExtraction(format!(
                "scheme needs {} points, got {}",
                count,
                landmarks.points.len()
            )));
        }
    }
    let idx = indices_for(landmarks.kind, part)?;
    Ok(idx.into_iter().map(|i| landmarks.points[i]).collect())
}

/// Centroid of a named facial part, in floating-point pixel coordinates.
pub fn part_center(
    landmarks: &FaceLandmarks,
    part: FacePart,
) -> Result<(f64, f64), FaceQaError> {
    let pts = extract_part(landmarks, part)?;
    if pts.is_empty() {
        return Err(FaceQaError::FaceLandmarkExtraction(format!(
            "part {:?} resolves to no points",
            part
        )));
    }
    let n = pts.len() as f64;
    let sx: f64 = pts.iter().map(|p| p.x as f64).sum();
    let sy: f64 = pts.iter().map(|p| p.y as f64).sum();
    Ok((sx / n, sy / n))
}

/// The five canonical alignment points: left eye center, right eye center,
/// nose tip, right mouth corner, left mouth corner.
pub fn alignment_points(landmarks: &FaceLandmarks) -> Result<[(f64, f64); 5], FaceQaError> {
    let left_eye = part_center(landmarks, FacePart::LeftEyeCenter)?;
    let right_eye = part_center(landmarks, FacePart::RightEyeCenter)?;
    let nose = part_center(landmarks, FacePart::NoseTip)?;
    let mouth = extract_part(landmarks, FacePart::MouthCorners)?;
    let left_mouth = (mouth[0].x as f64, mouth[0].y as f64);
    let right_mouth = (mouth[1].x as f64, mouth[1].y as f64);
    Ok([left_eye, right_eye, nose, left_mouth, right_mouth])
}
