/// Weight loading from safetensors files
use std::path::Path;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;

use super::resnet::ResNet;

/// Load a pretrained ResNet-18 to drive mask generation.
///
/// The file must be a safetensors export using the `conv1`/`layerN.B`/`fc`
/// naming that [`ResNet`] declares.
///
/// # Arguments
/// * `num_classes` - Size of the classification head
/// * `weights_path` - Path to the safetensors file
/// * `device` - Device to load the weights on
pub fn load_resnet18<P: AsRef<Path>>(
    num_classes: usize,
    weights_path: P,
    device: &Device,
) -> crate::Result<ResNet> {
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path.as_ref()], DType::F32, device)?
    };

    Ok(ResNet::resnet18(num_classes, vb)?)
}
