/// Gradient-weighted saliency maps
///
/// Standard gradient-weighted class activation mapping restricted to a
/// single tapped layer: the gradient's spatial mean weights each channel of
/// the activation, the weighted channels are summed, and negative values are
/// clamped away.
use candle_core::{Error, Result, Tensor};

/// Spatial mean of the gradient, one weight per channel.
///
/// Input shape (batch, channels, h, w), output shape (batch, channels).
pub fn channel_importance(gradient: &Tensor) -> Result<Tensor> {
    gradient.mean((2, 3))
}

/// Combine a captured activation and gradient into per-example saliency maps.
///
/// Both inputs have shape (batch, channels, h, w); the output has shape
/// (batch, h, w) and is non-negative. An all-zero gradient yields an
/// all-zero map, which downstream mask construction treats as a no-op.
pub fn saliency_maps(activation: &Tensor, gradient: &Tensor) -> Result<Tensor> {
    if activation.dims() != gradient.dims() {
        return Err(Error::Msg(format!(
            "activation shape {:?} does not match gradient shape {:?}",
            activation.dims(),
            gradient.dims()
        )));
    }
    let (batch, channels, _h, _w) = activation.dims4()?;

    let weights = channel_importance(gradient)?;
    let weighted = activation.broadcast_mul(&weights.reshape((batch, channels, 1, 1))?)?;

    weighted.sum(1)?.relu()
}
