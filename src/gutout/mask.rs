/// Mask construction from saliency maps
///
/// Each per-example saliency map is resized to the image resolution with
/// bilinear interpolation, normalized by its maximum, and thresholded into a
/// {0, 1} mask where 1 marks a position selected for suppression.
use candle_core::{Result, Tensor};

/// Which side of the threshold gets suppressed.
///
/// The interface exposes a single scalar threshold, which leaves the
/// suppression direction ambiguous; it is therefore an explicit policy
/// rather than a silent default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MaskPolicy {
    /// Suppress positions whose normalized saliency exceeds the threshold,
    /// cutting out the evidence the network currently leans on.
    #[default]
    MostSalient,
    /// Suppress positions whose normalized saliency falls below the
    /// threshold, pruning the background instead.
    LeastSalient,
}

/// Build one suppression mask per example.
///
/// `saliency` has shape (batch, h, w); the result has shape
/// (batch, `height`, `width`) with values in {0, 1}. An all-zero or
/// non-finite map produces an all-zero no-op mask for that example instead
/// of an error.
pub fn build_masks(
    saliency: &Tensor,
    height: usize,
    width: usize,
    threshold: f32,
    policy: MaskPolicy,
) -> Result<Tensor> {
    let (batch, _h, _w) = saliency.dims3()?;

    let mut masks = Vec::with_capacity(batch);
    for example in 0..batch {
        let map = saliency.get(example)?.to_vec2::<f32>()?;
        let resized = bilinear_resize(&map, height, width);
        let mask = match normalize_unit_max(resized) {
            Some(normalized) => threshold_mask(&normalized, threshold, policy),
            None => {
                log::debug!(
                    "degenerate saliency map for example {}; emitting no-op mask",
                    example
                );
                vec![0.0; height * width]
            }
        };
        masks.push(Tensor::from_vec(mask, (height, width), saliency.device())?);
    }

    Tensor::stack(&masks, 0)
}

/// Bilinear resize of a single map, corner-aligned.
///
/// Interpolation weights are convex, so a constant map stays constant at any
/// target resolution. Non-finite samples are clamped to zero.
fn bilinear_resize(map: &[Vec<f32>], out_height: usize, out_width: usize) -> Vec<f32> {
    let in_height = map.len();
    let in_width = if in_height > 0 { map[0].len() } else { 0 };
    if in_height == 0 || in_width == 0 {
        return vec![0.0; out_height * out_width];
    }

    let scale_y = if out_height > 1 {
        (in_height - 1) as f32 / (out_height - 1) as f32
    } else {
        0.0
    };
    let scale_x = if out_width > 1 {
        (in_width - 1) as f32 / (out_width - 1) as f32
    } else {
        0.0
    };

    let mut resized = Vec::with_capacity(out_height * out_width);
    for y in 0..out_height {
        let src_y = y as f32 * scale_y;
        let y0 = src_y.floor() as usize;
        let y1 = (y0 + 1).min(in_height - 1);
        let fy = src_y - y0 as f32;

        for x in 0..out_width {
            let src_x = x as f32 * scale_x;
            let x0 = src_x.floor() as usize;
            let x1 = (x0 + 1).min(in_width - 1);
            let fx = src_x - x0 as f32;

            let top = map[y0][x0] * (1.0 - fx) + map[y0][x1] * fx;
            let bottom = map[y1][x0] * (1.0 - fx) + map[y1][x1] * fx;
            let value = top * (1.0 - fy) + bottom * fy;

            resized.push(if value.is_finite() { value } else { 0.0 });
        }
    }

    resized
}

/// Scale a map so its maximum is 1.
///
/// Returns `None` for the degenerate case of a map with no positive finite
/// maximum, which callers turn into a no-op mask.
fn normalize_unit_max(mut values: Vec<f32>) -> Option<Vec<f32>> {
    let max = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0f32, f32::max);
    if max <= 0.0 {
        return None;
    }

    for value in values.iter_mut() {
        let scaled = *value / max;
        *value = if scaled.is_finite() { scaled } else { 0.0 };
    }
    Some(values)
}

fn threshold_mask(normalized: &[f32], threshold: f32, policy: MaskPolicy) -> Vec<f32> {
    normalized
        .iter()
        .map(|&value| {
            let suppress = match policy {
                MaskPolicy::MostSalient => value > threshold,
                MaskPolicy::LeastSalient => value < threshold,
            };
            if suppress {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn suppressed_count(masks: &Tensor) -> Result<usize> {
        Ok(masks.flatten_all()?.sum(0)?.to_scalar::<f32>()? as usize)
    }

    #[test]
    fn test_constant_map_resizes_to_constant() {
        let map = vec![vec![0.4f32; 3]; 2];

        for &(h, w) in &[(1usize, 1usize), (2, 3), (5, 5), (8, 16)] {
            let resized = bilinear_resize(&map, h, w);
            assert_eq!(resized.len(), h * w);
            for value in resized {
                assert!(
                    (value - 0.4).abs() < 1e-6,
                    "constant map must stay constant, got {}",
                    value
                );
            }
        }
    }

    #[test]
    fn test_degenerate_map_yields_noop_mask() -> Result<()> {
        let device = Device::Cpu;
        let saliency = Tensor::zeros((2, 2, 2), candle_core::DType::F32, &device)?;

        let masks = build_masks(&saliency, 8, 8, 0.5, MaskPolicy::MostSalient)?;
        assert_eq!(masks.dims(), &[2, 8, 8]);
        assert_eq!(suppressed_count(&masks)?, 0);

        Ok(())
    }

    #[test]
    fn test_threshold_zero_flags_all_nonzero_saliency() -> Result<()> {
        let device = Device::Cpu;
        // 2x2 map with one zero corner; resized to itself
        let saliency = Tensor::new(&[[[0.0f32, 0.5], [0.5, 1.0]]], &device)?;

        let masks = build_masks(&saliency, 2, 2, 0.0, MaskPolicy::MostSalient)?;
        let values = masks.get(0)?.to_vec2::<f32>()?;

        assert_eq!(values[0][0], 0.0);
        assert_eq!(values[0][1], 1.0);
        assert_eq!(values[1][0], 1.0);
        assert_eq!(values[1][1], 1.0);

        Ok(())
    }

    #[test]
    fn test_threshold_one_flags_nothing() -> Result<()> {
        let device = Device::Cpu;
        let saliency = Tensor::new(&[[[0.2f32, 0.5], [0.7, 1.0]]], &device)?;

        let masks = build_masks(&saliency, 2, 2, 1.0, MaskPolicy::MostSalient)?;
        assert_eq!(suppressed_count(&masks)?, 0);

        Ok(())
    }

    #[test]
    fn test_most_salient_monotone_in_threshold() -> Result<()> {
        let device = Device::Cpu;
        let saliency = Tensor::new(&[[[0.1f32, 0.3, 0.5], [0.6, 0.8, 1.0], [0.2, 0.4, 0.9]]], &device)?;

        let mut previous = usize::MAX;
        for threshold in [0.0f32, 0.25, 0.5, 0.75, 1.0] {
            let masks = build_masks(&saliency, 3, 3, threshold, MaskPolicy::MostSalient)?;
            let count = suppressed_count(&masks)?;
            assert!(
                count <= previous,
                "raising the threshold must never suppress more pixels"
            );
            previous = count;
        }

        Ok(())
    }

    #[test]
    fn test_least_salient_suppresses_background() -> Result<()> {
        let device = Device::Cpu;
        let saliency = Tensor::new(&[[[0.0f32, 1.0], [1.0, 1.0]]], &device)?;

        let masks = build_masks(&saliency, 2, 2, 0.5, MaskPolicy::LeastSalient)?;
        let values = masks.get(0)?.to_vec2::<f32>()?;

        // Only the zero-saliency corner falls below the threshold
        assert_eq!(values[0][0], 1.0);
        assert_eq!(values[0][1], 0.0);
        assert_eq!(values[1][0], 0.0);
        assert_eq!(values[1][1], 0.0);

        Ok(())
    }

    #[test]
    fn test_upscaled_peak_flags_about_half_at_half_threshold() -> Result<()> {
        let device = Device::Cpu;
        // Linear ramp along one axis: normalized values span [0, 1], so a
        // 0.5 threshold splits the resized map roughly in half.
        let saliency = Tensor::new(&[[[0.0f32, 1.0], [0.0, 1.0]]], &device)?;

        let masks = build_masks(&saliency, 8, 8, 0.5, MaskPolicy::MostSalient)?;
        let count = suppressed_count(&masks)?;

        // Columns past the midpoint of the ramp are flagged: interpolated
        // column values are x/7 for x in 0..8, of which 4 exceed 0.5.
        assert_eq!(count, 4 * 8);

        Ok(())
    }

    #[test]
    fn test_non_finite_values_are_contained() -> Result<()> {
        let device = Device::Cpu;
        let saliency = Tensor::new(&[[[f32::NAN, 0.0], [0.0, 0.0]]], &device)?;

        // The NaN map has no positive finite maximum: no-op mask, no panic
        let masks = build_masks(&saliency, 4, 4, 0.5, MaskPolicy::MostSalient)?;
        assert_eq!(suppressed_count(&masks)?, 0);

        Ok(())
    }
}
