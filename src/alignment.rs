//! Geometric face alignment.
//!
//! Fits a 4-DOF similarity transform (scale, rotation, translation) that maps
//! the five canonical face points (eye centers, nose tip, mouth corners) onto
//! a fixed reference template, then warps image and landmarks into a canonical
//! canvas. The fit is least-median-of-squares: every 2-point minimal solution
//! is scored by its median squared residual and the best one is refined by
//! least squares over its inliers, so a single bad landmark cannot skew the
//! transform.

use crate::error::FaceQaError;
use crate::types::{FaceLandmarks, Image, LandmarkPoint};

/// Side length of the canonical aligned image.
pub const ALIGNED_SIZE: u32 = 224;

/// Reference positions of the five canonical points on the aligned canvas:
/// left eye, right eye, nose tip, left mouth corner, right mouth corner.
///
/// The ArcFace 112×112 five-point template scaled ×2, which keeps the face
/// framing of the 112 crop while leaving background margin on the 224 canvas.
pub const REFERENCE_LANDMARKS: [(f64, f64); 5] = [
    (76.5892, 103.3926),
    (147.0636, 103.0028),
    (112.0504, 143.4732),
    (83.0986, 184.7310),
    (141.4598, 184.4082),
];

/// Inlier gate for the least-squares refinement step, in units of the best
/// median residual (squared distances compare against `GATE²·median`).
const LMEDS_INLIER_GATE: f64 = 2.5;

/// A 2-D similarity transform `(x, y) → (a·x − b·y + tx, b·x + a·y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityTransform {
    /// Linear term: `scale · cos(θ)`.
    pub a: f64,
    /// Linear term: `scale · sin(θ)`.
    pub b: f64,
    /// Horizontal translation.
    pub tx: f64,
    /// Vertical translation.
    pub ty: f64,
}

impl SimilarityTransform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Apply the transform to a point.
    pub fn apply(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    /// Isotropic scale factor.
    pub fn scale(&self) -> f64 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Inverse transform. `None` for degenerate (zero-scale) transforms.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.a + self.b * self.b;
        if det < 1e-12 {
            return None;
        }
        let ia = self.a / det;
        let ib = -self.b / det;
        Some(Self {
            a: ia,
            b: ib,
            tx: -(ia * self.tx - ib * self.ty),
            ty: -(ib * self.tx + ia * self.ty),
        })
    }
}

/// Exact similarity from two point correspondences (complex-division form).
fn fit_two_points(
    s0: (f64, f64),
    s1: (f64, f64),
    d0: (f64, f64),
    d1: (f64, f64),
) -> Option<SimilarityTransform> {
    let (dsx, dsy) = (s1.0 - s0.0, s1.1 - s0.1);
    let (ddx, ddy) = (d1.0 - d0.0, d1.1 - d0.1);
    let denom = dsx * dsx + dsy * dsy;
    if denom < 1e-12 {
        return None;
    }
    let a = (ddx * dsx + ddy * dsy) / denom;
    let b = (ddy * dsx - ddx * dsy) / denom;
    Some(SimilarityTransform {
        a,
        b,
        tx: d0.0 - (a * s0.0 - b * s0.1),
        ty: d0.1 - (b * s0.0 + a * s0.1),
    })
}

/// Least-squares similarity over all correspondences via the 4×4 normal
/// equations, solved by Gaussian elimination with partial pivoting.
fn fit_least_squares(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<SimilarityTransform> {
    if src.len() < 2 || src.len() != dst.len() {
        return None;
    }
    let mut ata = [[0.0f64; 4]; 4];
    let mut atb = [0.0f64; 4];
    for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst.iter()) {
        // sx·a − sy·b + tx = dx
        // sy·a + sx·b + ty = dy
        let r1 = [sx, -sy, 1.0, 0.0];
        let r2 = [sy, sx, 0.0, 1.0];
        for j in 0..4 {
            for k in 0..4 {
                ata[j][k] += r1[j] * r1[k] + r2[j] * r2[k];
            }
            atb[j] += r1[j] * dx + r2[j] * dy;
        }
    }
    let x = solve_4x4(&mut ata, &mut atb)?;
    Some(SimilarityTransform {
        a: x[0],
        b: x[1],
        tx: x[2],
        ty: x[3],
    })
}

fn solve_4x4(a: &mut [[f64; 4]; 4], b: &mut [f64; 4]) -> Option<[f64; 4]> {
    for col in 0..4 {
        let mut pivot_row = col;
        for row in col + 1..4 {
            if a[row][col].abs() > a[pivot_row][col].abs() {
                pivot_row = row;
            }
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);
        let pivot = a[col][col];
        if pivot.abs() < 1e-12 {
            return None;
        }
        for row in col + 1..4 {
            let factor = a[row][col] / pivot;
            for k in col..4 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0f64; 4];
    for i in (0..4).rev() {
        let mut v = b[i];
        for j in i + 1..4 {
            v -= a[i][j] * x[j];
        }
        x[i] = v / a[i][i];
    }
    Some(x)
}

fn median_of(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values[values.len() / 2]
}

/// Fit a similarity transform from `src` to `dst` by least median of squares.
///
/// All `C(n, 2)` minimal 2-point solutions are enumerated (n = 5 canonical
/// points, so 10 candidates); the candidate with the smallest median squared
/// residual wins and is refined by least squares over its inliers.
pub fn fit_similarity_lmeds(
    src: &[(f64, f64)],
    dst: &[(f64, f64)],
) -> Result<SimilarityTransform, FaceQaError> {
    if src.len() < 2 || src.len() != dst.len() {
        return Err(FaceQaError::QualityAssessment(format!(
            "similarity fit needs matching point sets of >= 2 points, got {} and {}",
            src.len(),
            dst.len()
        )));
    }

    let mut best: Option<(f64, SimilarityTransform)> = None;
    for i in 0..src.len() {
        for j in i + 1..src.len() {
            let Some(candidate) = fit_two_points(src[i], src[j], dst[i], dst[j]) else {
                continue;
            };
            let residuals: Vec<f64> = src
                .iter()
                .zip(dst.iter())
                .map(|(&s, &d)| {
                    let (px, py) = candidate.apply(s);
                    (px - d.0).powi(2) + (py - d.1).powi(2)
                })
                .collect();
            let med = median_of(residuals);
            if best.map_or(true, |(best_med, _)| med < best_med) {
                best = Some((med, candidate));
            }
        }
    }

    let (med, candidate) =
        best.ok_or_else(|| FaceQaError::QualityAssessment("degenerate point set".into()))?;

    // Refine over inliers of the winning candidate
    let gate = (LMEDS_INLIER_GATE * LMEDS_INLIER_GATE * med).max(1e-9);
    let (inlier_src, inlier_dst): (Vec<_>, Vec<_>) = src
        .iter()
        .zip(dst.iter())
        .filter(|&(&s, &d)| {
            let (px, py) = candidate.apply(s);
            (px - d.0).powi(2) + (py - d.1).powi(2) <= gate
        })
        .map(|(&s, &d)| (s, d))
        .unzip();

    Ok(fit_least_squares(&inlier_src, &inlier_dst).unwrap_or(candidate))
}

/// Warp an image through a similarity transform into a `width`×`height`
/// canvas, with bilinear sampling and black fill outside the source.
pub fn warp_image(
    image: &Image,
    transform: &SimilarityTransform,
    width: u32,
    height: u32,
) -> Result<Image, FaceQaError> {
    let inverse = transform
        .inverse()
        .ok_or_else(|| FaceQaError::QualityAssessment("degenerate alignment transform".into()))?;

    let channels = image.channels();
    let mut data = vec![0u8; width as usize * height as usize * channels];
    for oy in 0..height {
        for ox in 0..width {
            let (sx, sy) = inverse.apply((ox as f64, oy as f64));
            let x0 = sx.floor() as i32;
            let y0 = sy.floor() as i32;
            let fx = sx - x0 as f64;
            let fy = sy - y0 as f64;

            let p00 = image.pixel(x0, y0);
            let p10 = image.pixel(x0 + 1, y0);
            let p01 = image.pixel(x0, y0 + 1);
            let p11 = image.pixel(x0 + 1, y0 + 1);

            let base = (oy as usize * width as usize + ox as usize) * channels;
            for c in 0..channels {
                let v = p00[c] as f64 * (1.0 - fx) * (1.0 - fy)
                    + p10[c] as f64 * fx * (1.0 - fy)
                    + p01[c] as f64 * (1.0 - fx) * fy
                    + p11[c] as f64 * fx * fy;
                data[base + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    if channels == 1 {
        Image::new_grey(width, height, data)
    } else {
        Image::new_rgb(width, height, data)
    }
}

/// Transform landmarks by the similarity and clamp them into the
/// `width`×`height` target bounds.
pub fn transform_landmarks(
    landmarks: &FaceLandmarks,
    transform: &SimilarityTransform,
    width: u32,
    height: u32,
) -> FaceLandmarks {
    let max_x = width.saturating_sub(1) as f64;
    let max_y = height.saturating_sub(1) as f64;
    let points = landmarks
        .points
        .iter()
        .map(|p| {
            let (x, y) = transform.apply((p.x as f64, p.y as f64));
            LandmarkPoint::new(
                x.round().clamp(0.0, max_x) as i16,
                y.round().clamp(0.0, max_y) as i16,
            )
        })
        .collect();
    FaceLandmarks::new(landmarks.kind, points)
}
