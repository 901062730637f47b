use crate::error::ModelError;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};

/// One-hot encoding helpers: `to_categorical` and `argmax_rows`
pub mod label_encoding;

pub use label_encoding::*;
