/// Convolutional building blocks for residual classifiers
use candle_core::{Result, Tensor};
use candle_nn::{
    batch_norm, conv2d_no_bias, BatchNorm, BatchNormConfig, Conv2d, Conv2dConfig, Module, ModuleT,
    VarBuilder,
};

/// Convolution followed by batch normalization.
///
/// Batch normalization is evaluated with running statistics (inference mode)
/// so that instrumented passes never mutate normalization state; the training
/// loop owns any train-mode evaluation of the model it builds.
pub struct ConvBn {
    conv: Conv2d,
    bn: BatchNorm,
}

impl ConvBn {
    /// 3x3 convolution with padding 1, no bias, plus batch norm
    pub fn conv3x3(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let cfg = Conv2dConfig {
            padding: 1,
            stride,
            ..Default::default()
        };
        let conv = conv2d_no_bias(in_channels, out_channels, 3, cfg, vb.pp("conv"))?;
        let bn = batch_norm(out_channels, BatchNormConfig::default(), vb.pp("bn"))?;
        Ok(Self { conv, bn })
    }

    /// 1x1 projection convolution plus batch norm, used on residual shortcuts
    pub fn conv1x1(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let cfg = Conv2dConfig {
            stride,
            ..Default::default()
        };
        let conv = conv2d_no_bias(in_channels, out_channels, 1, cfg, vb.pp("conv"))?;
        let bn = batch_norm(out_channels, BatchNormConfig::default(), vb.pp("bn"))?;
        Ok(Self { conv, bn })
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.bn.forward_t(&self.conv.forward(x)?, false)
    }
}

/// Residual basic block: two 3x3 conv/bn pairs with an identity or projected
/// shortcut, ReLU after the residual addition.
pub struct BasicBlock {
    conv1: ConvBn,
    conv2: ConvBn,
    shortcut: Option<ConvBn>,
}

impl BasicBlock {
    /// Create a basic block
    ///
    /// # Arguments
    /// * `in_planes` - Input channel count
    /// * `planes` - Output channel count
    /// * `stride` - Stride of the first convolution (2 halves the resolution)
    /// * `vb` - VarBuilder for parameter initialization
    pub fn new(in_planes: usize, planes: usize, stride: usize, vb: VarBuilder) -> Result<Self> {
        let conv1 = ConvBn::conv3x3(in_planes, planes, stride, vb.pp("conv1"))?;
        let conv2 = ConvBn::conv3x3(planes, planes, 1, vb.pp("conv2"))?;

        // Project the shortcut whenever the shapes diverge
        let shortcut = if stride != 1 || in_planes != planes {
            Some(ConvBn::conv1x1(in_planes, planes, stride, vb.pp("shortcut"))?)
        } else {
            None
        };

        Ok(Self {
            conv1,
            conv2,
            shortcut,
        })
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let out = self.conv1.forward(x)?.relu()?;
        let out = self.conv2.forward(&out)?;

        let residual = match &self.shortcut {
            Some(projection) => projection.forward(x)?,
            None => x.clone(),
        };

        (out + residual)?.relu()
    }
}
