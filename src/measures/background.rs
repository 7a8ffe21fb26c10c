//! Background uniformity.
//!
//! Builds a background mask from the face-parsing map of the aligned image
//! (background class, minus alignment padding that never existed in the
//! source capture), erodes it by one pixel, and scores the mean Sobel
//! gradient magnitude over that region. A flat, featureless background has
//! near-zero gradient and maps to a high scalar through an inverted sigmoid.

use crate::color::luminance_image;
use crate::config::Settings;
use crate::error::FaceQaError;
use crate::measures::{write_result, Measure, SigmoidParameters};
use crate::pipeline::parsing;
use crate::session::Session;
use crate::types::{Image, MeasureId};

/// Scores how uniform the capture background is.
#[derive(Debug)]
pub struct BackgroundUniformity {
    sigmoid: SigmoidParameters,
}

impl BackgroundUniformity {
    /// Build with inverted-sigmoid defaults, overridable from configuration.
    pub fn new(settings: &Settings) -> Self {
        Self {
            sigmoid: SigmoidParameters::new(30.0, 10.0)
                .set_inverse()
                .load_overrides(settings, MeasureId::BackgroundUniformity),
        }
    }
}

/// One-pixel binary erosion: a pixel survives only if its full 3×3
/// neighborhood is set. Border pixels never survive.
fn erode(mask: &Image) -> Image {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let mut data = vec![0u8; (w * h) as usize];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut keep = true;
            'probe: for dy in -1..=1 {
                for dx in -1..=1 {
                    if mask.pixel(x + dx, y + dy)[0] == 0 {
                        keep = false;
                        break 'probe;
                    }
                }
            }
            if keep {
                data[(y * w + x) as usize] = 255;
            }
        }
    }
    Image::new_grey(mask.width(), mask.height(), data)
        .unwrap_or_else(|_| unreachable!("erosion preserves dimensions"))
}

/// Sobel gradient magnitude at (x, y) of a luminance plane.
fn sobel_magnitude(luma: &Image, x: i32, y: i32) -> f64 {
    let p = |dx: i32, dy: i32| luma.pixel(x + dx, y + dy)[0] as f64;
    let gx = -p(-1, -1) - 2.0 * p(-1, 0) - p(-1, 1) + p(1, -1) + 2.0 * p(1, 0) + p(1, 1);
    let gy = -p(-1, -1) - 2.0 * p(0, -1) - p(1, -1) + p(-1, 1) + 2.0 * p(0, 1) + p(1, 1);
    (gx * gx + gy * gy).sqrt()
}

impl Measure for BackgroundUniformity {
    fn id(&self) -> MeasureId {
        MeasureId::BackgroundUniformity
    }

    fn execute(&self, session: &mut Session) -> Result<(), FaceQaError> {
        let aligned = session.aligned_image();
        let parsing_map = session.face_parsing_map();
        if aligned.is_empty() || parsing_map.is_empty() {
            return Err(FaceQaError::QualityAssessment(
                "background uniformity requires the aligned image and parsing map".into(),
            ));
        }

        // Background = background class, excluding pixels the alignment warp
        // filled from outside the source image.
        let inverse = session.alignment_transform().inverse().ok_or_else(|| {
            FaceQaError::QualityAssessment("degenerate alignment transform".into())
        })?;
        let (src_w, src_h) = (
            session.image().width() as f64,
            session.image().height() as f64,
        );
        let (w, h) = (aligned.width(), aligned.height());
        let mut mask_data = vec![0u8; (w * h) as usize];
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                if parsing_map.pixel(x, y)[0] != parsing::BACKGROUND {
                    continue;
                }
                let (sx, sy) = inverse.apply((x as f64, y as f64));
                if sx >= 0.0 && sx < src_w && sy >= 0.0 && sy < src_h {
                    mask_data[(y * w as i32 + x) as usize] = 255;
                }
            }
        }
        let mask = erode(&Image::new_grey(w, h, mask_data)?);

        let luma = luminance_image(&aligned);
        let mut sum = 0.0;
        let mut count = 0u64;
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                if mask.pixel(x, y)[0] != 0 {
                    sum += sobel_magnitude(&luma, x, y);
                    count += 1;
                }
            }
        }
        if count == 0 {
            return Err(FaceQaError::QualityAssessment(
                "no background pixels remain after erosion".into(),
            ));
        }

        let raw = sum / count as f64;
        write_result(session, self.id(), raw, self.sigmoid.map(raw));
        Ok(())
    }
}
