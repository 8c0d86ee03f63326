/// CIFAR-style residual classifier
use candle_core::{Error, Result, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};

use crate::gutout::TappableClassifier;
use crate::layers::{BasicBlock, ConvBn};

/// Residual network over 32x32 RGB images: a 3x3 stem (no max-pooling),
/// four stages of basic blocks with channel doubling, global average
/// pooling and a linear classification head.
///
/// Weight names follow the usual `layerN.B.*` scheme, and the same names
/// address tap points for the mask engine: `conv1`, `layerN` (end of a
/// stage) or `layerN.B` (single block).
pub struct ResNet {
    stem: ConvBn,
    stages: Vec<Vec<BasicBlock>>,
    fc: Linear,
}

/// Resolved tap location inside the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TapSite {
    Stem,
    Block { stage: usize, block: usize },
}

impl ResNet {
    /// ResNet-18: two basic blocks per stage
    pub fn resnet18(num_classes: usize, vb: VarBuilder) -> Result<Self> {
        Self::new(&[2, 2, 2, 2], num_classes, vb)
    }

    /// Build a residual network with the given number of blocks per stage.
    /// Stage `i` carries `64 << i` channels; every stage past the first
    /// halves the spatial resolution.
    pub fn new(blocks_per_stage: &[usize], num_classes: usize, vb: VarBuilder) -> Result<Self> {
        if blocks_per_stage.is_empty() {
            return Err(Error::Msg("at least one stage is required".to_string()));
        }

        let stem = ConvBn::conv3x3(3, 64, 1, vb.pp("conv1"))?;

        let mut stages = Vec::with_capacity(blocks_per_stage.len());
        let mut in_planes = 64;
        for (idx, &count) in blocks_per_stage.iter().enumerate() {
            let planes = 64 << idx;
            let stage_vb = vb.pp(format!("layer{}", idx + 1));

            let mut blocks = Vec::with_capacity(count);
            for block in 0..count {
                let stride = if block == 0 && idx > 0 { 2 } else { 1 };
                blocks.push(BasicBlock::new(
                    in_planes,
                    planes,
                    stride,
                    stage_vb.pp(block.to_string()),
                )?);
                in_planes = planes;
            }
            stages.push(blocks);
        }

        let fc = linear(in_planes, num_classes, vb.pp("fc"))?;

        Ok(Self { stem, stages, fc })
    }

    /// Full forward pass to per-class scores
    pub fn forward(&self, images: &Tensor) -> Result<Tensor> {
        let mut x = self.stem.forward(images)?.relu()?;
        for stage in &self.stages {
            for block in stage {
                x = block.forward(&x)?;
            }
        }
        self.head(&x)
    }

    /// Global average pooling plus the linear head
    fn head(&self, features: &Tensor) -> Result<Tensor> {
        self.fc.forward(&features.mean((2, 3))?)
    }

    fn resolve(&self, tap_point: &str) -> Result<TapSite> {
        if tap_point == "conv1" {
            return Ok(TapSite::Stem);
        }

        let unknown = || Error::Msg(format!("unknown tap point '{}'", tap_point));

        let rest = tap_point.strip_prefix("layer").ok_or_else(unknown)?;
        let (stage_str, block_str) = match rest.split_once('.') {
            Some((stage, block)) => (stage, Some(block)),
            None => (rest, None),
        };

        let stage: usize = stage_str.parse().map_err(|_| unknown())?;
        if stage == 0 || stage > self.stages.len() {
            return Err(unknown());
        }
        let stage = stage - 1;

        let block = match block_str {
            Some(block) => {
                let block: usize = block.parse().map_err(|_| unknown())?;
                if block >= self.stages[stage].len() {
                    return Err(unknown());
                }
                block
            }
            // A bare "layerN" taps the stage's final block
            None => self.stages[stage].len() - 1,
        };

        Ok(TapSite::Block { stage, block })
    }
}

impl TappableClassifier for ResNet {
    fn tap_points(&self) -> Vec<String> {
        let mut points = vec!["conv1".to_string()];
        for (idx, stage) in self.stages.iter().enumerate() {
            for block in 0..stage.len() {
                points.push(format!("layer{}.{}", idx + 1, block));
            }
            points.push(format!("layer{}", idx + 1));
        }
        points
    }

    fn forward_until(&self, images: &Tensor, tap_point: &str) -> Result<Tensor> {
        let site = self.resolve(tap_point)?;

        let mut x = self.stem.forward(images)?.relu()?;
        if let TapSite::Block { stage, block } = site {
            for s in 0..=stage {
                let last = if s == stage {
                    block
                } else {
                    self.stages[s].len() - 1
                };
                for b in 0..=last {
                    x = self.stages[s][b].forward(&x)?;
                }
            }
        }

        Ok(x)
    }

    fn forward_from(&self, activation: &Tensor, tap_point: &str) -> Result<Tensor> {
        let site = self.resolve(tap_point)?;

        let (resume_stage, resume_block) = match site {
            TapSite::Stem => (0, 0),
            TapSite::Block { stage, block } => (stage, block + 1),
        };

        let mut x = activation.clone();
        for s in resume_stage..self.stages.len() {
            let begin = if s == resume_stage { resume_block } else { 0 };
            for b in begin..self.stages[s].len() {
                x = self.stages[s][b].forward(&x)?;
            }
        }

        self.head(&x)
    }
}
