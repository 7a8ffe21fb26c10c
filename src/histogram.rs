//! Normalized histograms and Shannon entropy over 8-bit planes.

use crate::types::Image;

/// Number of bins for 8-bit histograms.
pub const BINS: usize = 256;

/// Normalized 256-bin histogram of an 8-bit plane, restricted to pixels where
/// the mask byte is non-zero (`None` selects all pixels).
///
/// Bins sum to 1 when any pixel is selected; an empty selection yields an
/// all-zero histogram.
pub fn normalized_histogram(plane: &Image, mask: Option<&Image>) -> [f64; BINS] {
    debug_assert_eq!(plane.channels(), 1, "histogram expects a single-channel plane");
    let mut counts = [0u64; BINS];
    let mut total = 0u64;
    for y in 0..plane.height() as i32 {
        for x in 0..plane.width() as i32 {
            if let Some(m) = mask {
                if m.pixel(x, y)[0] == 0 {
                    continue;
                }
            }
            counts[plane.pixel(x, y)[0] as usize] += 1;
            total += 1;
        }
    }
    let mut hist = [0.0f64; BINS];
    if total > 0 {
        for (h, c) in hist.iter_mut().zip(counts.iter()) {
            *h = *c as f64 / total as f64;
        }
    }
    hist
}

/// Shannon entropy `-Σ p·log2 p` of a normalized histogram, in bits.
///
/// Zero-probability bins contribute nothing. Ranges from 0 (single bin) to 8
/// (uniform over 256 bins).
pub fn shannon_entropy(hist: &[f64]) -> f64 {
    hist.iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_sums_to_one() {
        let plane = Image::new_grey(4, 2, vec![0, 0, 128, 128, 255, 255, 7, 9]).unwrap();
        let hist = normalized_histogram(&plane, None);
        let sum: f64 = hist.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((hist[128] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn mask_restricts_counted_pixels() {
        let plane = Image::new_grey(2, 1, vec![10, 200]).unwrap();
        let mask = Image::new_grey(2, 1, vec![0, 1]).unwrap();
        let hist = normalized_histogram(&plane, Some(&mask));
        assert_eq!(hist[10], 0.0);
        assert_eq!(hist[200], 1.0);
    }

    #[test]
    fn empty_selection_is_all_zero() {
        let plane = Image::new_grey(2, 1, vec![10, 200]).unwrap();
        let mask = Image::new_grey(2, 1, vec![0, 0]).unwrap();
        let hist = normalized_histogram(&plane, Some(&mask));
        assert!(hist.iter().all(|&p| p == 0.0));
        assert_eq!(shannon_entropy(&hist), 0.0);
    }

    #[test]
    fn single_bin_has_zero_entropy() {
        let plane = Image::new_grey(4, 4, vec![42; 16]).unwrap();
        let hist = normalized_histogram(&plane, None);
        assert_eq!(shannon_entropy(&hist), 0.0);
    }

    #[test]
    fn mass_split_over_power_of_two_bins_yields_k_bits() {
        // 2^3 = 8 bins with equal mass → entropy 3 bits
        let mut hist = [0.0f64; BINS];
        for bin in hist.iter_mut().take(8) {
            *bin = 1.0 / 8.0;
        }
        assert!((shannon_entropy(&hist) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn uniform_histogram_is_eight_bits() {
        let hist = [1.0 / BINS as f64; BINS];
        assert!((shannon_entropy(&hist) - 8.0).abs() < 1e-12);
    }
}
