/// Mask application
use candle_core::{Error, Result, Tensor};

/// Multiply each image by `(1 - mask)`, broadcasting the single-channel mask
/// across image channels.
///
/// Pure function: `images` has shape (batch, channels, height, width),
/// `masks` has shape (batch, height, width) with values in [0, 1]. The
/// result keeps the input's shape and dtype; a zero mask returns the image
/// unchanged, a one mask zeroes the position in every channel.
pub fn apply_masks(images: &Tensor, masks: &Tensor) -> Result<Tensor> {
    let (batch, _channels, height, width) = images.dims4()?;
    let mask_dims = masks.dims3()?;
    if mask_dims != (batch, height, width) {
        return Err(Error::Msg(format!(
            "mask shape {:?} does not match image batch ({}, {}, {})",
            mask_dims, batch, height, width
        )));
    }

    let keep = masks
        .to_dtype(images.dtype())?
        .affine(-1.0, 1.0)?
        .unsqueeze(1)?;

    images.broadcast_mul(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_zero_mask_is_identity() -> Result<()> {
        let device = Device::Cpu;
        let images = Tensor::randn(0f32, 1.0, (2, 3, 4, 4), &device)?;
        let masks = Tensor::zeros((2, 4, 4), DType::F32, &device)?;

        let augmented = apply_masks(&images, &masks)?;
        assert_eq!(augmented.dims(), images.dims());
        assert_eq!(augmented.dtype(), images.dtype());

        let diff = (augmented - images)?
            .abs()?
            .flatten_all()?
            .max(0)?
            .to_scalar::<f32>()?;
        assert_eq!(diff, 0.0);

        Ok(())
    }

    #[test]
    fn test_full_mask_zeroes_everything() -> Result<()> {
        let device = Device::Cpu;
        let images = Tensor::randn(0f32, 1.0, (2, 3, 4, 4), &device)?;
        let masks = Tensor::ones((2, 4, 4), DType::F32, &device)?;

        let augmented = apply_masks(&images, &masks)?;
        let max = augmented.abs()?.flatten_all()?.max(0)?.to_scalar::<f32>()?;
        assert_eq!(max, 0.0);

        Ok(())
    }

    #[test]
    fn test_mask_broadcasts_across_channels() -> Result<()> {
        let device = Device::Cpu;
        let images = Tensor::ones((1, 3, 2, 2), DType::F32, &device)?;
        // Suppress only the top-left position
        let masks = Tensor::new(&[[[1.0f32, 0.0], [0.0, 0.0]]], &device)?;

        let augmented = apply_masks(&images, &masks)?;
        for channel in 0..3 {
            let plane = augmented.get(0)?.get(channel)?.to_vec2::<f32>()?;
            assert_eq!(plane[0][0], 0.0);
            assert_eq!(plane[0][1], 1.0);
            assert_eq!(plane[1][0], 1.0);
            assert_eq!(plane[1][1], 1.0);
        }

        Ok(())
    }

    #[test]
    fn test_batch_mismatch_is_rejected() -> Result<()> {
        let device = Device::Cpu;
        let images = Tensor::randn(0f32, 1.0, (2, 3, 4, 4), &device)?;
        let masks = Tensor::zeros((3, 4, 4), DType::F32, &device)?;

        assert!(apply_masks(&images, &masks).is_err());

        Ok(())
    }
}
