//! Gutout - saliency-guided cutout augmentation
//!
//! Before each real training step, Gutout runs an instrumented forward and
//! backward pass through the classifier being trained, locates the image
//! regions the network currently leans on via a gradient-weighted class
//! activation map, and cuts a region out of the input batch. The training
//! loop then consumes the augmented batch instead of the original one.
//!
//! # Pipeline
//!
//! - **Layer tap**: capture one internal layer's activation and the gradient
//!   of the selected class score with respect to it
//! - **Saliency**: combine activation and gradient into a per-example map
//! - **Mask**: resize to input resolution, normalize, threshold
//! - **Apply**: zero the selected region of each image
//!
//! # Example
//!
//! ```ignore
//! use gutout::{Gutout, GutoutConfig};
//!
//! let gutout = Gutout::new(GutoutConfig::default())?;
//! let augmented = gutout.augment(&model, &images)?;
//! ```

pub mod config;
pub mod cutout;
pub mod gutout;
pub mod layers;
pub mod models;

// Re-export commonly used items
pub use config::GutoutConfig;
pub use gutout::{Gutout, MaskPolicy, TappableClassifier};

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum GutoutError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GutoutError>;
