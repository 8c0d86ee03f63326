/// Layer instrumentation for saliency capture
use candle_core::{Tensor, Var};

use crate::{GutoutError, Result};

/// Contract the mask engine needs from a classifier.
///
/// The model exposes its forward evaluation split at named tap points, so an
/// internal layer's output can be observed without modifying the model. For
/// every tap point `p`, `forward_from(forward_until(x, p), p)` must equal the
/// model's ordinary forward pass on `x`, and both halves must keep examples
/// independent (no cross-example statistics during instrumented passes).
pub trait TappableClassifier {
    /// All layer paths that can be tapped, in evaluation order
    fn tap_points(&self) -> Vec<String>;

    /// Run the model up to and including the tapped layer, returning its
    /// activation of shape (batch, channels, h, w)
    fn forward_until(&self, images: &Tensor, tap_point: &str) -> candle_core::Result<Tensor>;

    /// Run the rest of the model from the tapped activation to the
    /// per-class score batch of shape (batch, num_classes)
    fn forward_from(&self, activation: &Tensor, tap_point: &str) -> candle_core::Result<Tensor>;
}

/// A tap attached to one layer of a model.
///
/// Attachment only validates the layer path; all capture state lives in the
/// [`TapCapture`] value returned by [`LayerTap::capture_forward`], so
/// concurrent captures on separate batches cannot share a buffer.
pub struct LayerTap<'m, M: TappableClassifier> {
    model: &'m M,
    layer_path: String,
}

impl<'m, M: TappableClassifier> LayerTap<'m, M> {
    /// Attach to `layer_path`, failing fast if it does not resolve
    pub fn attach(model: &'m M, layer_path: &str) -> Result<Self> {
        let tap_points = model.tap_points();
        if !tap_points.iter().any(|p| p == layer_path) {
            return Err(GutoutError::Config(format!(
                "layer path '{}' does not resolve to a tap point (available: {})",
                layer_path,
                tap_points.join(", ")
            )));
        }

        Ok(Self {
            model,
            layer_path: layer_path.to_string(),
        })
    }

    /// Run the forward pass, capturing the tapped layer's activation.
    ///
    /// The activation is re-introduced into the graph as a fresh autograd
    /// leaf. The later backward pass therefore stops at the tap: gradients
    /// for the layers below it are never computed, and nothing accumulates
    /// into state the caller's real training step could observe.
    pub fn capture_forward(&self, images: &Tensor) -> Result<TapCapture> {
        let features = self.model.forward_until(images, &self.layer_path)?;
        let tapped = Var::from_tensor(&features.detach())?;
        let scores = self.model.forward_from(tapped.as_tensor(), &self.layer_path)?;

        Ok(TapCapture { scores, tapped })
    }
}

/// Activation and scores captured during one instrumented forward pass.
///
/// Scoped to a single orchestrator call: the backward capture consumes the
/// value, so a capture can never be reused across batches.
pub struct TapCapture {
    scores: Tensor,
    tapped: Var,
}

impl TapCapture {
    /// Per-class scores, in the same example order as the input batch
    pub fn scores(&self) -> &Tensor {
        &self.scores
    }

    /// The captured activation, shape (batch, channels, h, w)
    pub fn activation(&self) -> Tensor {
        self.tapped.as_tensor().clone()
    }

    /// Backward pass seeded with one selected score per example, returning
    /// the gradient of each example's score with respect to that example's
    /// activation.
    ///
    /// `selected_scores` has shape (batch, 1). Because examples do not mix
    /// above the tap, the returned (batch, channels, h, w) gradient is
    /// exactly the per-example gradient of the per-example seeds.
    pub fn capture_backward(self, selected_scores: &Tensor) -> Result<Tensor> {
        let grads = selected_scores.backward()?;
        let gradient = grads.get(self.tapped.as_tensor()).ok_or_else(|| {
            GutoutError::Model(
                "no gradient reached the tapped activation; the selected scores do not \
                 depend on the capture"
                    .to_string(),
            )
        })?;

        Ok(gradient.clone())
    }
}
