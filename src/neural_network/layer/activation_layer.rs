use super::*;
use ndarray::{Array2, ArrayD, ArrayView1, ArrayViewMut1, Axis, Zip};
use rayon::prelude::*;

/// Shape of the last batch, e.g. `(128, 256)`, or "Unknown" before the first forward pass.
fn format_output_shape(shape: Option<&[usize]>) -> String {
    match shape {
        Some(dims) => {
            let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", dims.join(", "))
        }
        None => "Unknown".to_string(),
    }
}

/// Rejects empty inputs and inputs with NaN or infinite values.
fn validate_activation_input(input: &Tensor) -> Result<(), ModelError> {
    if input.is_empty() {
        return Err(ModelError::InputValidationError(
            "Input tensor is empty".to_string(),
        ));
    }

    if input.iter().any(|x| !x.is_finite()) {
        return Err(ModelError::InputValidationError(
            "Input tensor contains NaN or infinite values".to_string(),
        ));
    }

    Ok(())
}

/// ReLU (Rectified Linear Unit) activation layer
pub mod relu;
/// Softmax activation layer
pub mod softmax;

pub use relu::*;
pub use softmax::*;
