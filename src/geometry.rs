//! Bounding-box and landmark geometry shared by the preprocessing pipeline
//! and the measures: box squaring with optional image padding, the T-metric
//! normalization length, and the convex-hull landmark-region mask.

use crate::error::FaceQaError;
use crate::landmarks::{part_center, FacePart};
use crate::types::{BoundingBox, FaceLandmarks, Image};

/// Extend the shorter dimension of a box symmetrically around its center so
/// the result is square.
///
/// The low edge moves by `floor(delta / 2)` and the high edge by
/// `ceil(delta / 2)`, so the output side equals the longer input side exactly
/// and the center drifts by at most half a pixel.
pub fn make_square_bounding_box(bbox: &BoundingBox) -> BoundingBox {
    let side = bbox.width.max(bbox.height);
    let dx = side - bbox.width;
    let dy = side - bbox.height;
    BoundingBox {
        // div_euclid floors for non-negative deltas; the remainder goes to
        // the high edge.
        x: bbox.x - dx.div_euclid(2),
        y: bbox.y - dy.div_euclid(2),
        width: side,
        height: side,
        detector: bbox.detector,
    }
}

/// A squared box together with the padded image it refers to.
#[derive(Debug, Clone)]
pub struct PaddedCrop {
    /// The input image, black-padded just enough to contain the square box.
    pub image: Image,
    /// The square box, translated into padded-image coordinates.
    pub bbox: BoundingBox,
    /// Translation applied to coordinates: (left, top) padding in pixels.
    /// Subtract this to map padded-image points back to the original image.
    pub translation: (i32, i32),
}

/// Square the box, then pad the image with black borders wherever the square
/// box overflows it, translating the box accordingly.
///
/// The returned translation lets downstream landmark coordinates be mapped
/// back into original-image space.
pub fn make_square_bounding_box_with_padding(
    image: &Image,
    bbox: &BoundingBox,
) -> PaddedCrop {
    let square = make_square_bounding_box(bbox);
    let left = (-square.x).max(0);
    let top = (-square.y).max(0);
    let right = (square.x + square.width - image.width() as i32).max(0);
    let bottom = (square.y + square.height - image.height() as i32).max(0);

    let padded = if left | top | right | bottom != 0 {
        image.pad(left as u32, top as u32, right as u32, bottom as u32)
    } else {
        image.clone()
    };

    PaddedCrop {
        image: padded,
        bbox: BoundingBox {
            x: square.x + left,
            y: square.y + top,
            ..square
        },
        translation: (left, top),
    }
}

/// T-metric: Euclidean distance from the midpoint of the two eye centers to
/// the chin landmark. Used as a normalization length by several measures.
pub fn tmetric(landmarks: &FaceLandmarks) -> Result<f64, FaceQaError> {
    let (lx, ly) = part_center(landmarks, FacePart::LeftEyeCenter)?;
    let (rx, ry) = part_center(landmarks, FacePart::RightEyeCenter)?;
    let (cx, cy) = part_center(landmarks, FacePart::Chin)?;
    let mx = (lx + rx) / 2.0;
    let my = (ly + ry) / 2.0;
    Ok(((mx - cx).powi(2) + (my - cy).powi(2)).sqrt())
}

/// Distance between the two eye centers.
pub fn inter_eye_distance(landmarks: &FaceLandmarks) -> Result<f64, FaceQaError> {
    let (lx, ly) = part_center(landmarks, FacePart::LeftEyeCenter)?;
    let (rx, ry) = part_center(landmarks, FacePart::RightEyeCenter)?;
    Ok(((lx - rx).powi(2) + (ly - ry).powi(2)).sqrt())
}

/// Midpoint of the two eye centers.
pub fn eye_midpoint(landmarks: &FaceLandmarks) -> Result<(f64, f64), FaceQaError> {
    let (lx, ly) = part_center(landmarks, FacePart::LeftEyeCenter)?;
    let (rx, ry) = part_center(landmarks, FacePart::RightEyeCenter)?;
    Ok(((lx + rx) / 2.0, (ly + ry) / 2.0))
}

/// Convex hull of a point set via Andrew's monotone chain.
///
/// Returns hull vertices in counter-clockwise order. Collinear points on the
/// hull boundary are dropped.
pub fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut pts: Vec<(f64, f64)> = points.to_vec();
    pts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    }

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Rasterize the convex hull of the landmark points into a binary mask
/// (255 inside, 0 outside) of the given dimensions.
///
/// `extend_up` grows the hull upward by that many pixels before filling, so
/// the region can cover the forehead above the topmost landmark.
pub fn landmark_region_mask(
    landmarks: &FaceLandmarks,
    width: u32,
    height: u32,
    extend_up: u32,
) -> Result<Image, FaceQaError> {
    if landmarks.points.len() < 3 {
        return Err(FaceQaError::FaceLandmarkExtraction(
            "landmark region needs at least 3 points".into(),
        ));
    }
    let mut pts: Vec<(f64, f64)> = landmarks
        .points
        .iter()
        .map(|p| (p.x as f64, p.y as f64))
        .collect();
    if extend_up > 0 {
        // Duplicate every point shifted upward; the hull of the union is the
        // vertical extension of the original hull.
        let shifted: Vec<(f64, f64)> = pts.iter().map(|&(x, y)| (x, y - extend_up as f64)).collect();
        pts.extend(shifted);
    }
    let hull = convex_hull(&pts);

    let mut data = vec![0u8; width as usize * height as usize];
    if hull.len() >= 3 {
        for y in 0..height {
            for x in 0..width {
                if point_in_convex_polygon((x as f64 + 0.5, y as f64 + 0.5), &hull) {
                    data[y as usize * width as usize + x as usize] = 255;
                }
            }
        }
    }
    Image::new_grey(width, height, data)
}

/// Point-in-polygon test for a counter-clockwise convex polygon.
fn point_in_convex_polygon(p: (f64, f64), hull: &[(f64, f64)]) -> bool {
    let n = hull.len();
    for i in 0..n {
        let a = hull[i];
        let b = hull[(i + 1) % n];
        let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
        if cross < 0.0 {
            return false;
        }
    }
    true
}
