/// Reference classifier implementations
///
/// The mask engine treats the classifier as an opaque collaborator reached
/// through the [`TappableClassifier`](crate::gutout::TappableClassifier)
/// contract; the CIFAR-style ResNet here is the bundled implementation of
/// that contract.

pub mod loader;
pub mod resnet;

pub use resnet::ResNet;
