/// Crossentropy between one-hot labels and softmax output
pub mod categorical_cross_entropy;

pub use categorical_cross_entropy::*;
