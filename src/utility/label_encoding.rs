use super::*;

/// Converts integer class labels to categorical (one-hot encoded) format
///
/// Each label becomes a row of length `num_classes` holding 1.0 at the label's index and
/// 0.0 everywhere else, so every output row sums to exactly 1.
///
/// # Parameters
///
/// * `labels` - A 1D array of class indices (e.g., \[5, 0, 4, 1, 9\])
/// * `num_classes` - Width of each encoded row; every label must be smaller than it
///
/// # Returns
///
/// - `Ok(Array2<f32>)` - A one-hot matrix of shape (n_samples, num_classes)
/// - `Err(ModelError::InputValidationError)` - If `num_classes` is 0 or a label is out of range
///
/// # Examples
///
/// ```rust
/// use ndarray::array;
/// use mnist_dnn::utility::to_categorical;
///
/// let labels = array![0u8, 2, 1];
/// let categorical = to_categorical(&labels, 3).unwrap();
/// assert_eq!(categorical.row(1).to_vec(), vec![0.0, 0.0, 1.0]);
/// ```
pub fn to_categorical<S>(labels: &ArrayBase<S, Ix1>, num_classes: usize) -> Result<Array2<f32>, ModelError>
where
    S: Data<Elem = u8>,
{
    if num_classes == 0 {
        return Err(ModelError::InputValidationError(
            "num_classes must be greater than 0".to_string(),
        ));
    }

    let mut categorical = Array2::<f32>::zeros((labels.len(), num_classes));

    for (i, &label) in labels.iter().enumerate() {
        let class_index = label as usize;
        if class_index >= num_classes {
            return Err(ModelError::InputValidationError(format!(
                "Label {} at index {} is out of range for {} classes",
                label, i, num_classes
            )));
        }
        categorical[[i, class_index]] = 1.0;
    }

    Ok(categorical)
}

/// Returns the column index of the largest value in each row
///
/// Works for both one-hot targets and softmax probabilities. Ties resolve to the lowest
/// index, and NaN entries never win.
///
/// # Parameters
///
/// * `matrix` - A 2D array of shape (n_samples, n_classes)
///
/// # Returns
///
/// * `Array1<usize>` - The predicted (or true) class of every row
///
/// # Examples
///
/// ```rust
/// use ndarray::array;
/// use mnist_dnn::utility::argmax_rows;
///
/// let probabilities = array![[0.1f32, 0.7, 0.2], [0.6, 0.3, 0.1]];
/// assert_eq!(argmax_rows(&probabilities).to_vec(), vec![1, 0]);
/// ```
pub fn argmax_rows<S>(matrix: &ArrayBase<S, Ix2>) -> Array1<usize>
where
    S: Data<Elem = f32>,
{
    matrix
        .rows()
        .into_iter()
        .map(|row| {
            let mut max_index = 0;
            let mut max_value = f32::NEG_INFINITY;

            for (j, &value) in row.iter().enumerate() {
                if value > max_value {
                    max_value = value;
                    max_index = j;
                }
            }

            max_index
        })
        .collect()
}
