//! Pure pixel transforms shared by the background worker and the in-process
//! fallback path.
//!
//! All stages mutate an RGBA buffer in place. Stages that read a pixel's
//! neighborhood take a snapshot of the buffer first and read original values
//! exclusively from it, so partially-written output never feeds back into
//! the same pass. Arithmetic is done in `f64` and each channel is rounded
//! and clamped back to a byte on write.

use crate::error::KernelError;
use crate::types::{EnhancementOptions, PixelBuffer, BYTES_PER_PIXEL};

/// Neutral midpoint for the contrast remap.
const CONTRAST_CENTER: f64 = 128.0;

/// Unsharp amount at strength 100.
const SHARPEN_GAIN: f64 = 1.5;

/// Contrast factor boost at strength 100.
const CONTRAST_GAIN: f64 = 0.5;

/// Denoise color-distance threshold at strength 100.
const DENOISE_RANGE: f64 = 30.0;

/// Round a channel value and clamp it to the valid byte range.
pub fn clamp_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Box-average the R, G and B channels over the `(2*radius+1)^2`
/// neighborhood centered on `(x, y)`.
///
/// Only used as the blurred reference for the unsharp mask. The caller
/// guarantees the whole neighborhood lies inside the buffer.
pub fn blur_estimate(original: &[u8], width: usize, x: usize, y: usize, radius: usize) -> [f64; 3] {
    let mut sums = [0.0f64; 3];
    let mut count = 0u32;

    for dy in -(radius as isize)..=(radius as isize) {
        for dx in -(radius as isize)..=(radius as isize) {
            let ny = (y as isize + dy) as usize;
            let nx = (x as isize + dx) as usize;
            let idx = (ny * width + nx) * BYTES_PER_PIXEL;
            sums[0] += original[idx] as f64;
            sums[1] += original[idx + 1] as f64;
            sums[2] += original[idx + 2] as f64;
            count += 1;
        }
    }

    let count = count as f64;
    [sums[0] / count, sums[1] / count, sums[2] / count]
}

/// Range-only weighted average of the neighborhood around `(x, y)`.
///
/// Each neighbor is weighted by color similarity to the center pixel: weight
/// 1 when its Euclidean color distance is below `threshold`, otherwise
/// `exp(-distance / threshold)`. There is no spatial falloff term, which is
/// what preserves sharp color boundaries: dissimilar neighbors contribute
/// almost nothing.
///
/// Returns the weighted channel sums and the weight total. The center pixel
/// always matches itself with weight 1, so for any `threshold > 0` the total
/// is at least 1.
pub fn range_weighted_average(
    original: &[u8],
    width: usize,
    x: usize,
    y: usize,
    radius: usize,
    threshold: f64,
) -> ([f64; 3], f64) {
    let center_idx = (y * width + x) * BYTES_PER_PIXEL;
    let center = [
        original[center_idx] as f64,
        original[center_idx + 1] as f64,
        original[center_idx + 2] as f64,
    ];

    let mut sums = [0.0f64; 3];
    let mut weight_total = 0.0f64;

    for dy in -(radius as isize)..=(radius as isize) {
        for dx in -(radius as isize)..=(radius as isize) {
            let ny = (y as isize + dy) as usize;
            let nx = (x as isize + dx) as usize;
            let idx = (ny * width + nx) * BYTES_PER_PIXEL;
            let r = original[idx] as f64;
            let g = original[idx + 1] as f64;
            let b = original[idx + 2] as f64;

            let distance = ((r - center[0]).powi(2)
                + (g - center[1]).powi(2)
                + (b - center[2]).powi(2))
            .sqrt();
            let weight = if distance < threshold {
                1.0
            } else {
                (-distance / threshold).exp()
            };

            sums[0] += r * weight;
            sums[1] += g * weight;
            sums[2] += b * weight;
            weight_total += weight;
        }
    }

    (sums, weight_total)
}

/// Sharpen by amplifying each interior pixel's distance from its local box
/// blur: `out = clamp(v + (v - blur) * amount)` with `amount =
/// strength/100 * 1.5` at a fixed radius of 1.
///
/// Pixels within `radius` of any edge keep their original value. That is the
/// boundary policy, not an approximation.
pub fn unsharp_mask(buffer: &mut PixelBuffer, strength: i32) -> Result<(), KernelError> {
    buffer.check_geometry()?;
    if strength <= 0 {
        return Ok(());
    }

    let radius = 1usize;
    let amount = strength as f64 / 100.0 * SHARPEN_GAIN;
    let width = buffer.width as usize;
    let height = buffer.height as usize;
    if width <= 2 * radius || height <= 2 * radius {
        // No interior pixels to sharpen
        return Ok(());
    }

    let original = buffer.data.clone();
    for y in radius..height - radius {
        for x in radius..width - radius {
            let idx = (y * width + x) * BYTES_PER_PIXEL;
            let blur = blur_estimate(&original, width, x, y, radius);
            for channel in 0..3 {
                let value = original[idx + channel] as f64;
                buffer.data[idx + channel] =
                    clamp_channel(value + (value - blur[channel]) * amount);
            }
        }
    }
    Ok(())
}

/// Edge-preserving smoothing over interior pixels.
///
/// Strength selects the neighborhood radius (2 above 50, else 1) and the
/// color-distance threshold (`strength/100 * 30`). Each interior pixel is
/// replaced by its range-weighted neighborhood average; edge pixels keep
/// their original value, same boundary policy as the unsharp mask.
pub fn denoise(buffer: &mut PixelBuffer, strength: i32) -> Result<(), KernelError> {
    buffer.check_geometry()?;
    if strength <= 0 {
        return Ok(());
    }

    let radius = if strength > 50 { 2usize } else { 1usize };
    let threshold = strength as f64 / 100.0 * DENOISE_RANGE;
    let width = buffer.width as usize;
    let height = buffer.height as usize;
    if width <= 2 * radius || height <= 2 * radius {
        return Ok(());
    }

    let original = buffer.data.clone();
    for y in radius..height - radius {
        for x in radius..width - radius {
            let (sums, weight_total) =
                range_weighted_average(&original, width, x, y, radius, threshold);
            debug_assert!(
                weight_total >= 1.0,
                "center pixel always contributes weight 1"
            );
            // The total can't actually reach zero (the center matches
            // itself), but a zero-weight pixel must stay untouched rather
            // than divide by zero.
            if weight_total > 0.0 {
                let idx = (y * width + x) * BYTES_PER_PIXEL;
                for channel in 0..3 {
                    buffer.data[idx + channel] = clamp_channel(sums[channel] / weight_total);
                }
            }
        }
    }
    Ok(())
}

/// Linear tonal remap about the midpoint, applied to every pixel:
/// `out = clamp((v - 128) * factor + 128)` with `factor =
/// 1 + strength/100 * 0.5`.
pub fn contrast(buffer: &mut PixelBuffer, strength: i32) -> Result<(), KernelError> {
    buffer.check_geometry()?;
    if strength <= 0 {
        return Ok(());
    }

    let factor = 1.0 + strength as f64 / 100.0 * CONTRAST_GAIN;
    for pixel in buffer.data.chunks_exact_mut(BYTES_PER_PIXEL) {
        for channel in &mut pixel[..3] {
            *channel = clamp_channel((*channel as f64 - CONTRAST_CENTER) * factor + CONTRAST_CENTER);
        }
    }
    Ok(())
}

/// Run the requested stages in the fixed order: denoise, then sharpen, then
/// contrast. Denoising first avoids amplifying noise into false edges, and
/// contrast is a global remap that scales the already-cleaned result.
///
/// Stages with an intensity of zero or less are skipped. This is the single
/// implementation behind both the background worker and the local fallback.
pub fn run_stages(buffer: &mut PixelBuffer, options: &EnhancementOptions) -> Result<(), KernelError> {
    buffer.check_geometry()?;

    if options.denoise > 0 {
        denoise(buffer, options.denoise)?;
    }
    if options.sharpness > 0 {
        unsharp_mask(buffer, options.sharpness)?;
    }
    if options.contrast > 0 {
        contrast(buffer, options.contrast)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_pixel(buffer: &mut PixelBuffer, x: u32, y: u32, rgba: [u8; 4]) {
        let idx = buffer.pixel_offset(x, y);
        buffer.data[idx..idx + 4].copy_from_slice(&rgba);
    }

    fn pixel(buffer: &PixelBuffer, x: u32, y: u32) -> [u8; 4] {
        let idx = buffer.pixel_offset(x, y);
        [
            buffer.data[idx],
            buffer.data[idx + 1],
            buffer.data[idx + 2],
            buffer.data[idx + 3],
        ]
    }

    /// Deterministic non-uniform content for identity and parity checks.
    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut buffer = PixelBuffer::filled(width, height, [0, 0, 0, 255]);
        for y in 0..height {
            for x in 0..width {
                let idx = buffer.pixel_offset(x, y);
                buffer.data[idx] = (x * 37 % 256) as u8;
                buffer.data[idx + 1] = (y * 53 % 256) as u8;
                buffer.data[idx + 2] = ((x + y) * 11 % 256) as u8;
            }
        }
        buffer
    }

    #[test]
    fn test_zero_options_leave_pixels_untouched() {
        let mut buffer = gradient(8, 8);
        let before = buffer.clone();
        run_stages(&mut buffer, &EnhancementOptions::default()).unwrap();
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_geometry_mismatch_rejected() {
        let mut buffer = PixelBuffer {
            width: 2,
            height: 2,
            data: vec![0; 12],
        };
        let options = EnhancementOptions {
            contrast: 50,
            ..Default::default()
        };
        assert!(run_stages(&mut buffer, &options).is_err());
    }

    #[test]
    fn test_contrast_anchor_values() {
        let mut buffer = PixelBuffer::filled(1, 3, [0, 0, 0, 255]);
        set_pixel(&mut buffer, 0, 1, [200, 200, 200, 255]);
        set_pixel(&mut buffer, 0, 2, [128, 128, 128, 255]);

        contrast(&mut buffer, 100).unwrap();

        // (0 - 128) * 1.5 + 128 = -64, clamped
        assert_eq!(pixel(&buffer, 0, 0), [0, 0, 0, 255]);
        // (200 - 128) * 1.5 + 128 = 236
        assert_eq!(pixel(&buffer, 0, 1), [236, 236, 236, 255]);
        // The midpoint is a fixed point
        assert_eq!(pixel(&buffer, 0, 2), [128, 128, 128, 255]);
    }

    #[test]
    fn test_contrast_touches_every_pixel() {
        let mut buffer = PixelBuffer::filled(3, 3, [200, 200, 200, 255]);
        contrast(&mut buffer, 100).unwrap();
        for y in 0..3 {
            for x in 0..3 {
                assert_eq!(pixel(&buffer, x, y), [236, 236, 236, 255]);
            }
        }
    }

    #[test]
    fn test_unsharp_mask_uniform_region_is_fixed_point() {
        let mut buffer = PixelBuffer::filled(5, 5, [90, 120, 150, 255]);
        let before = buffer.clone();
        unsharp_mask(&mut buffer, 100).unwrap();
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_denoise_uniform_region_is_fixed_point() {
        let mut buffer = PixelBuffer::filled(6, 6, [90, 120, 150, 255]);
        let before = buffer.clone();
        denoise(&mut buffer, 80).unwrap();
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_denoise_4x4_gray_unchanged() {
        // radius 1, threshold 15 at strength 50
        let mut buffer = PixelBuffer::filled(4, 4, [128, 128, 128, 255]);
        let before = buffer.clone();
        denoise(&mut buffer, 50).unwrap();
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_unsharp_mask_amplifies_toward_extremes() {
        let mut buffer = PixelBuffer::filled(5, 5, [100, 100, 100, 255]);
        set_pixel(&mut buffer, 2, 2, [255, 255, 255, 255]);

        unsharp_mask(&mut buffer, 100).unwrap();

        // The bright pixel overshoots its blur estimate and clamps at 255
        assert_eq!(pixel(&buffer, 2, 2), [255, 255, 255, 255]);
        // An interior neighbor sits below its blur estimate and is darkened:
        // blur = (8*100 + 255)/9 = 117.2, 100 + (100 - 117.2) * 1.5 = 74
        assert_eq!(pixel(&buffer, 1, 2), [74, 74, 74, 255]);
        // Edge pixels are outside the interior and keep their value
        assert_eq!(pixel(&buffer, 0, 2), [100, 100, 100, 255]);
    }

    #[test]
    fn test_unsharp_mask_leaves_border_untouched() {
        let mut buffer = gradient(6, 6);
        let before = buffer.clone();
        unsharp_mask(&mut buffer, 100).unwrap();

        for y in 0..6 {
            for x in 0..6 {
                if x == 0 || y == 0 || x == 5 || y == 5 {
                    assert_eq!(pixel(&buffer, x, y), pixel(&before, x, y));
                }
            }
        }
    }

    #[test]
    fn test_denoise_radius_two_border_untouched() {
        // strength > 50 widens the radius to 2
        let mut buffer = gradient(7, 7);
        let before = buffer.clone();
        denoise(&mut buffer, 80).unwrap();

        for y in 0..7 {
            for x in 0..7 {
                if x < 2 || y < 2 || x > 4 || y > 4 {
                    assert_eq!(pixel(&buffer, x, y), pixel(&before, x, y));
                }
            }
        }
    }

    #[test]
    fn test_denoise_preserves_strong_edge() {
        // Left half black, right half white: across the boundary the color
        // distance dwarfs the threshold, so each side keeps its value.
        let mut buffer = PixelBuffer::filled(6, 6, [0, 0, 0, 255]);
        for y in 0..6 {
            for x in 3..6 {
                set_pixel(&mut buffer, x, y, [255, 255, 255, 255]);
            }
        }
        let before = buffer.clone();
        denoise(&mut buffer, 50).unwrap();
        assert_eq!(buffer, before);
    }

    #[test]
    fn test_denoise_smooths_similar_neighbors() {
        let mut buffer = PixelBuffer::filled(3, 3, [100, 100, 100, 255]);
        set_pixel(&mut buffer, 1, 1, [104, 104, 104, 255]);

        denoise(&mut buffer, 50).unwrap();

        // All nine neighbors are within the threshold (15), so the center
        // becomes the plain average: (8*100 + 104)/9 = 100.4 -> 100
        assert_eq!(pixel(&buffer, 1, 1), [100, 100, 100, 255]);
    }

    #[test]
    fn test_weight_total_is_at_least_one() {
        let buffer = gradient(5, 5);
        for y in 1..4usize {
            for x in 1..4usize {
                let (_, weight_total) =
                    range_weighted_average(&buffer.data, 5, x, y, 1, 0.5);
                assert!(weight_total >= 1.0);
            }
        }
    }

    #[test]
    fn test_blur_estimate_of_uniform_region_is_center() {
        let buffer = PixelBuffer::filled(3, 3, [42, 84, 126, 255]);
        let blur = blur_estimate(&buffer.data, 3, 1, 1, 1);
        assert_eq!(blur, [42.0, 84.0, 126.0]);
    }

    #[test]
    fn test_alpha_channel_never_modified() {
        let mut buffer = gradient(6, 6);
        let options = EnhancementOptions {
            sharpness: 100,
            denoise: 100,
            contrast: 100,
        };
        run_stages(&mut buffer, &options).unwrap();
        for y in 0..6 {
            for x in 0..6 {
                assert_eq!(pixel(&buffer, x, y)[3], 255);
            }
        }
    }

    #[test]
    fn test_tiny_buffers_are_noops_for_neighborhood_stages() {
        let mut buffer = PixelBuffer::filled(1, 1, [10, 20, 30, 255]);
        let before = buffer.clone();
        denoise(&mut buffer, 100).unwrap();
        unsharp_mask(&mut buffer, 100).unwrap();
        assert_eq!(buffer, before);

        // Contrast has no boundary exclusion even on a 1x1 buffer
        contrast(&mut buffer, 100).unwrap();
        assert_ne!(buffer, before);
    }

    #[test]
    fn test_clamp_channel() {
        assert_eq!(clamp_channel(-0.4), 0);
        assert_eq!(clamp_channel(-64.0), 0);
        assert_eq!(clamp_channel(127.5), 128);
        assert_eq!(clamp_channel(254.5), 255);
        assert_eq!(clamp_channel(400.0), 255);
    }
}
