use candle_core::Device;
use std::path::Path;

use crate::gutout::MaskPolicy;

/// Run-wide configuration for the Gutout mask engine.
///
/// All settings are fixed once at startup and passed explicitly into the
/// orchestrator, so several runs or tests can execute independently in the
/// same process without touching ambient state.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GutoutConfig {
    /// Path of the tapped layer, e.g. "layer3" or "layer3.0" for a single
    /// residual block. Must resolve to one of the model's tap points.
    pub layer_path: String,

    /// Saliency threshold in [0, 1] applied to the normalized map.
    pub threshold: f32,

    /// Which side of the threshold gets suppressed.
    #[serde(default)]
    pub policy: MaskPolicy,

    /// Seed for the stochastic baseline transforms.
    pub seed: u64,

    /// Enables CUDA when available.
    pub use_cuda: bool,
}

impl Default for GutoutConfig {
    fn default() -> Self {
        Self {
            layer_path: "layer3.0".to_string(),
            threshold: 0.7,
            policy: MaskPolicy::default(),
            seed: 0,
            use_cuda: false,
        }
    }
}

impl GutoutConfig {
    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.layer_path.is_empty() {
            return Err(crate::GutoutError::Config(
                "layer_path must not be empty".to_string(),
            ));
        }

        if !self.threshold.is_finite() || !(0.0..=1.0).contains(&self.threshold) {
            return Err(crate::GutoutError::Config(format!(
                "threshold must be in [0, 1], got {}",
                self.threshold
            )));
        }

        Ok(())
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Device to run on, honoring `use_cuda`
    pub fn device(&self) -> crate::Result<Device> {
        if self.use_cuda {
            Ok(Device::new_cuda(0)?)
        } else {
            Ok(Device::Cpu)
        }
    }
}
