/// Fixed-geometry cutout baseline
///
/// The classic augmentation Gutout is measured against: per example, zero
/// one or more axis-aligned squares at uniformly random centers, clipped at
/// the image borders. Geometry ignores the image content entirely.
use candle_core::{Result, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::gutout::apply_masks;

/// Configuration for the cutout baseline
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CutoutConfig {
    /// Number of square holes per image
    pub n_holes: usize,
    /// Side length of each hole, in pixels
    pub length: usize,
    /// RNG seed for hole placement
    pub seed: u64,
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            n_holes: 1,
            length: 16,
            seed: 0,
        }
    }
}

/// Random square cutout over an image batch.
///
/// Hole placement is drawn from an owned, seeded RNG, so two transforms
/// built from the same configuration produce the same sequence of masks and
/// independent runs never share random state.
pub struct Cutout {
    config: CutoutConfig,
    rng: StdRng,
}

impl Cutout {
    pub fn new(n_holes: usize, length: usize) -> Self {
        Self::from_config(CutoutConfig {
            n_holes,
            length,
            ..Default::default()
        })
    }

    pub fn from_config(config: CutoutConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    /// Cut random holes out of each image in the batch.
    ///
    /// Returns a new batch; the input is left untouched. Hole centers are
    /// sampled uniformly over the image, so holes near the border are
    /// clipped and cover fewer pixels.
    pub fn apply(&mut self, images: &Tensor) -> Result<Tensor> {
        let (batch, _channels, height, width) = images.dims4()?;
        let half = self.config.length / 2;

        let mut masks = Vec::with_capacity(batch);
        for _ in 0..batch {
            let mut mask = vec![0.0f32; height * width];
            for _ in 0..self.config.n_holes {
                let center_y = self.rng.gen_range(0..height);
                let center_x = self.rng.gen_range(0..width);

                let y0 = center_y.saturating_sub(half);
                let y1 = (center_y + half).min(height);
                let x0 = center_x.saturating_sub(half);
                let x1 = (center_x + half).min(width);

                for y in y0..y1 {
                    for x in x0..x1 {
                        mask[y * width + x] = 1.0;
                    }
                }
            }
            masks.push(Tensor::from_vec(mask, (height, width), images.device())?);
        }

        apply_masks(images, &Tensor::stack(&masks, 0)?)
    }
}
