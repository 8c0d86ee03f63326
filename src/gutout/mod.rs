/// Saliency-guided mask engine
///
/// The orchestrator ties the pipeline together for one batch: instrumented
/// forward pass, per-example target selection, backward capture, saliency,
/// mask construction, mask application. It runs once per training iteration,
/// strictly before the caller's real forward/backward/optimizer step, and
/// never touches model parameters or optimizer state.
use candle_core::{Tensor, D};

use crate::config::GutoutConfig;
use crate::Result;

pub mod apply;
pub mod mask;
pub mod saliency;
pub mod tap;

pub use apply::apply_masks;
pub use mask::{build_masks, MaskPolicy};
pub use saliency::{channel_importance, saliency_maps};
pub use tap::{LayerTap, TapCapture, TappableClassifier};

/// Saliency-guided cutout engine.
///
/// Holds only immutable run-wide configuration; all per-batch state lives in
/// values scoped to a single [`Gutout::augment`] call, so independent
/// engines (or concurrent calls on separate batches) cannot interfere.
pub struct Gutout {
    config: GutoutConfig,
}

impl Gutout {
    /// Create an engine, validating the configuration up front
    pub fn new(config: GutoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GutoutConfig {
        &self.config
    }

    /// Augment one image batch.
    ///
    /// Returns a new batch of the same shape and example order; the input is
    /// left untouched. Model evaluation failures propagate uncaught, and a
    /// failure on any example aborts the whole batch: batched tensor
    /// operations are inseparable by example.
    pub fn augment<M: TappableClassifier>(&self, model: &M, images: &Tensor) -> Result<Tensor> {
        let (batch, _channels, height, width) = images.dims4()?;

        let tap = LayerTap::attach(model, &self.config.layer_path)?;
        let capture = tap.capture_forward(images)?;

        // Unsupervised target: the class the model currently favors
        let targets = capture.scores().argmax(D::Minus1)?;
        let selected = capture.scores().gather(&targets.unsqueeze(1)?, 1)?;

        log::debug!(
            "gutout: batch of {} images, tap '{}', targets {:?}",
            batch,
            self.config.layer_path,
            targets.to_vec1::<u32>()?
        );

        let activation = capture.activation();
        let gradient = capture.capture_backward(&selected)?;

        let saliency = saliency_maps(&activation, &gradient)?;
        let masks = build_masks(
            &saliency,
            height,
            width,
            self.config.threshold,
            self.config.policy,
        )?;

        Ok(apply_masks(images, &masks)?)
    }
}
