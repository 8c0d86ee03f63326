/// Neural network layer primitives
///
/// Building blocks for the bundled reference classifier:
/// - 3x3 convolutions with batch normalization
/// - Residual basic blocks

pub mod conv;

pub use conv::{BasicBlock, ConvBn};
