//! Colour conversions used by the luminance-based measures: Rec.601 luma and
//! sRGB → CIELAB (D65 reference white).

use crate::types::Image;

/// Rec.601 luma weights.
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// D65 reference white in XYZ, normalized to Y = 100.
const D65_X: f64 = 95.047;
const D65_Y: f64 = 100.0;
const D65_Z: f64 = 108.883;

/// Rec.601 luminance of one pixel, in [0, 255].
pub fn luminance(rgb: [u8; 3]) -> f64 {
    LUMA_R * rgb[0] as f64 + LUMA_G * rgb[1] as f64 + LUMA_B * rgb[2] as f64
}

/// Convert an image to an 8-bit luminance plane.
///
/// Grey images pass through unchanged; RGB images are weighted per Rec.601.
pub fn luminance_image(image: &Image) -> Image {
    if image.channels() == 1 {
        return image.clone();
    }
    let mut data = Vec::with_capacity(image.width() as usize * image.height() as usize);
    for chunk in image.data().chunks(3) {
        let y = luminance([chunk[0], chunk[1], chunk[2]]);
        data.push(y.round().clamp(0.0, 255.0) as u8);
    }
    Image::new_grey(image.width(), image.height(), data)
        .unwrap_or_else(|_| unreachable!("luma buffer length matches source dimensions"))
}

/// Inverse sRGB companding: 8-bit channel to linear [0, 1].
fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// CIELAB f() with the standard linear segment near zero.
fn lab_f(t: f64) -> f64 {
    const DELTA: f64 = 6.0 / 29.0;
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

/// Convert one sRGB pixel to CIELAB (L* in [0, 100], a*/b* roughly ±128).
pub fn srgb_to_cielab(rgb: [u8; 3]) -> [f64; 3] {
    let r = srgb_to_linear(rgb[0]);
    let g = srgb_to_linear(rgb[1]);
    let b = srgb_to_linear(rgb[2]);

    // Linear sRGB to XYZ (D65), scaled to Y in [0, 100]
    let x = (0.4124564 * r + 0.3575761 * g + 0.1804375 * b) * 100.0;
    let y = (0.2126729 * r + 0.7151522 * g + 0.0721750 * b) * 100.0;
    let z = (0.0193339 * r + 0.1191920 * g + 0.9503041 * b) * 100.0;

    let fx = lab_f(x / D65_X);
    let fy = lab_f(y / D65_Y);
    let fz = lab_f(z / D65_Z);

    [
        116.0 * fy - 16.0,
        500.0 * (fx - fy),
        200.0 * (fy - fz),
    ]
}

/// CIELAB L* of every pixel selected by the mask (non-zero mask byte).
///
/// A `None` mask selects all pixels. Returns an empty vector when the mask
/// selects nothing.
pub fn cielab_lightness(image: &Image, mask: Option<&Image>) -> Vec<f64> {
    let mut values = Vec::new();
    for y in 0..image.height() as i32 {
        for x in 0..image.width() as i32 {
            if let Some(m) = mask {
                if m.pixel(x, y)[0] == 0 {
                    continue;
                }
            }
            values.push(srgb_to_cielab(image.pixel(x, y))[0]);
        }
    }
    values
}
