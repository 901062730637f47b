use crate::error::ModelError;
use crate::utility::argmax_rows;
use ndarray::Data;
use ndarray::prelude::*;

/// Calculate categorical accuracy between one-hot targets and class probabilities.
///
/// A sample counts as correct when the index of the largest predicted probability equals
/// the index of the 1.0 entry in its target row.
///
/// # Parameters
///
/// - `y_true` - One-hot targets of shape (n_samples, n_classes)
/// - `y_pred` - Predicted probabilities of the same shape
///
/// # Returns
///
/// - `Ok(f32)` - Accuracy in the range \[0.0, 1.0\]
/// - `Err(ModelError::InputValidationError)` - If the shapes differ or the arrays are empty
///
/// # Examples
/// ```rust
/// use mnist_dnn::metric::categorical_accuracy;
/// use ndarray::array;
///
/// let y_true = array![[1.0f32, 0.0], [0.0, 1.0], [0.0, 1.0]];
/// let y_pred = array![[0.8f32, 0.2], [0.3, 0.7], [0.9, 0.1]];
/// let acc = categorical_accuracy(&y_true, &y_pred).unwrap();
/// assert!((acc - 2.0 / 3.0).abs() < 1e-6);
/// ```
pub fn categorical_accuracy<S1, S2>(
    y_true: &ArrayBase<S1, Ix2>,
    y_pred: &ArrayBase<S2, Ix2>,
) -> Result<f32, ModelError>
where
    S1: Data<Elem = f32>,
    S2: Data<Elem = f32>,
{
    if y_true.dim() != y_pred.dim() {
        return Err(ModelError::InputValidationError(format!(
            "Target shape {:?} does not match prediction shape {:?}",
            y_true.dim(),
            y_pred.dim()
        )));
    }

    if y_true.is_empty() {
        return Err(ModelError::InputValidationError(
            "Input arrays must not be empty".to_string(),
        ));
    }

    let correct_predictions = argmax_rows(y_true)
        .iter()
        .zip(argmax_rows(y_pred).iter())
        .filter(|&(t, p)| t == p)
        .count();

    Ok(correct_predictions as f32 / y_true.nrows() as f32)
}

/// Multi-class confusion matrix.
///
/// `counts[[i, j]]` holds the number of samples whose true class is `i` and whose
/// predicted class is `j`, so the diagonal holds the correct predictions and the sum of
/// all cells equals the number of samples.
///
/// # Fields
///
/// - `counts` - Square table of shape (num_classes, num_classes)
///
/// # Examples
/// ```rust
/// use ndarray::arr1;
/// use mnist_dnn::metric::ConfusionMatrix;
///
/// let actual = arr1(&[0usize, 1, 2, 2, 1]);
/// let predicted = arr1(&[0usize, 2, 2, 2, 1]);
/// let cm = ConfusionMatrix::new(&actual, &predicted, 3).unwrap();
///
/// assert_eq!(cm.total(), 5);
/// assert_eq!(cm.counts()[[1, 2]], 1);
/// println!("Accuracy: {:.2}", cm.accuracy());
/// println!("{}", cm.summary());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    counts: Array2<u64>,
}

impl ConfusionMatrix {
    /// Create a new confusion matrix by tallying (actual, predicted) pairs.
    ///
    /// # Parameters
    ///
    /// - `actual` - Ground-truth class indices
    /// - `predicted` - Predicted class indices
    /// - `num_classes` - Number of classes, i.e. the side length of the table
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - Confusion matrix with populated counts
    /// - `Err(ModelError::InputValidationError)` - If the lengths differ, the inputs are empty,
    ///   `num_classes` is 0 or a class index is out of range
    pub fn new<S1, S2>(
        actual: &ArrayBase<S1, Ix1>,
        predicted: &ArrayBase<S2, Ix1>,
        num_classes: usize,
    ) -> Result<Self, ModelError>
    where
        S1: Data<Elem = usize>,
        S2: Data<Elem = usize>,
    {
        if actual.len() != predicted.len() {
            return Err(ModelError::InputValidationError(format!(
                "Input arrays must have the same length. Actual: {}, Predicted: {}",
                actual.len(),
                predicted.len()
            )));
        }

        if actual.is_empty() {
            return Err(ModelError::InputValidationError(
                "Input arrays must not be empty".to_string(),
            ));
        }

        if num_classes == 0 {
            return Err(ModelError::InputValidationError(
                "num_classes must be greater than 0".to_string(),
            ));
        }

        let mut counts = Array2::<u64>::zeros((num_classes, num_classes));

        for (&a, &p) in actual.iter().zip(predicted.iter()) {
            if a >= num_classes || p >= num_classes {
                return Err(ModelError::InputValidationError(format!(
                    "Class pair ({}, {}) is out of range for {} classes",
                    a, p, num_classes
                )));
            }
            counts[[a, p]] += 1;
        }

        Ok(Self { counts })
    }

    /// Get the raw count table indexed by (true class, predicted class).
    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    /// Number of classes (side length of the table).
    pub fn num_classes(&self) -> usize {
        self.counts.nrows()
    }

    /// Total number of samples tallied.
    pub fn total(&self) -> u64 {
        self.counts.sum()
    }

    /// Calculate accuracy: trace / total.
    ///
    /// # Returns
    ///
    /// - `f64` - Accuracy in the range \[0.0, 1.0\]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.counts.diag().sum() as f64 / total as f64
    }

    /// Calculate precision of one class: correct predictions of `class` / all predictions of `class`.
    ///
    /// # Returns
    ///
    /// - `f64` - Precision in the range \[0.0, 1.0\] (returns 0.0 when the class is never predicted
    ///   or `class` is out of range)
    pub fn precision(&self, class: usize) -> f64 {
        if class >= self.num_classes() {
            return 0.0;
        }
        let predicted = self.counts.column(class).sum();
        if predicted == 0 {
            return 0.0;
        }
        self.counts[[class, class]] as f64 / predicted as f64
    }

    /// Calculate recall of one class: correct predictions of `class` / all samples of `class`.
    ///
    /// # Returns
    ///
    /// - `f64` - Recall in the range \[0.0, 1.0\] (returns 0.0 when the class has no samples
    ///   or `class` is out of range)
    pub fn recall(&self, class: usize) -> f64 {
        if class >= self.num_classes() {
            return 0.0;
        }
        let actual = self.counts.row(class).sum();
        if actual == 0 {
            return 0.0;
        }
        self.counts[[class, class]] as f64 / actual as f64
    }

    /// Divide every row by its sum, giving per-class prediction rates.
    ///
    /// Rows of classes with no samples stay all zero.
    pub fn row_normalized(&self) -> Array2<f64> {
        let mut normalized = self.counts.mapv(|c| c as f64);
        for mut row in normalized.rows_mut() {
            let sum = row.sum();
            if sum > 0.0 {
                row.mapv_inplace(|v| v / sum);
            }
        }
        normalized
    }

    /// Generate a formatted text table of the counts followed by per-class metrics.
    ///
    /// # Returns
    ///
    /// - `String` - Rows are true classes and columns are predicted classes
    pub fn summary(&self) -> String {
        let n = self.num_classes();
        let mut out = String::from("Confusion Matrix (rows: actual, columns: predicted):\n");

        out.push_str("      ");
        for j in 0..n {
            out.push_str(&format!("{:>7}", j));
        }
        out.push('\n');

        for i in 0..n {
            out.push_str(&format!("{:>5} ", i));
            for j in 0..n {
                out.push_str(&format!("{:>7}", self.counts[[i, j]]));
            }
            out.push('\n');
        }

        out.push_str(&format!("\nAccuracy: {:.4}\n", self.accuracy()));
        for c in 0..n {
            out.push_str(&format!(
                "- Class {}: Precision {:.4}, Recall {:.4}\n",
                c,
                self.precision(c),
                self.recall(c)
            ));
        }

        out
    }
}
