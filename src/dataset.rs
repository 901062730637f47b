use crate::error::{ModelError, TrainingError};
use crate::neural_network::Tensor;
use crate::utility::to_categorical;
use ndarray::{Array1, Array2, Array3, Axis};
use ndarray_rand::RandomExt;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use std::path::Path;

/// Reading the MNIST handwritten-digit dataset from IDX files
pub mod mnist;

pub use mnist::*;

/// One dataset split ready for training: flattened features and one-hot labels.
///
/// # Fields
///
/// - `x` - Features of shape (n_samples, num_features), pixel values cast to f32
/// - `y` - One-hot labels of shape (n_samples, num_classes)
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub x: Array2<f32>,
    pub y: Array2<f32>,
}

impl Split {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    /// Features and labels as dynamic-dimension tensors, the form `Sequential` consumes.
    pub fn to_tensors(&self) -> (Tensor, Tensor) {
        (self.x.clone().into_dyn(), self.y.clone().into_dyn())
    }
}

/// Turns raw images and labels into a `Split`.
///
/// Every image is flattened row by row into `num_features` values and cast to f32 without
/// any rescaling; every label is one-hot encoded into `num_classes` columns.
///
/// # Parameters
///
/// - `images` - Images of shape (n_samples, rows, cols)
/// - `labels` - Class index of every image
/// - `num_features` - Must equal rows * cols
/// - `num_classes` - Width of the one-hot rows
///
/// # Returns
///
/// - `Ok(Split)` - The prepared split
/// - `Err(ModelError::InputValidationError)` - Sample counts differ, `num_features` does not
///   match the image size, or a label is out of range
pub fn prepare_split(
    images: &Array3<u8>,
    labels: &Array1<u8>,
    num_features: usize,
    num_classes: usize,
) -> Result<Split, ModelError> {
    let (n_samples, rows, cols) = images.dim();

    if n_samples != labels.len() {
        return Err(ModelError::InputValidationError(format!(
            "Got {} images but {} labels",
            n_samples,
            labels.len()
        )));
    }

    if rows * cols != num_features {
        return Err(ModelError::InputValidationError(format!(
            "Images of {}x{} pixels cannot be flattened into {} features",
            rows, cols, num_features
        )));
    }

    let x = images
        .to_shape((n_samples, num_features))
        .map_err(|e| ModelError::ProcessingError(format!("Failed to flatten images: {}", e)))?
        .mapv(f32::from);
    let y = to_categorical(labels, num_classes)?;

    Ok(Split { x, y })
}

/// Loads the MNIST train and test splits from `dir` and prepares them for training.
///
/// # Parameters
///
/// - `dir` - Directory holding the four IDX files (plain or `.gz`)
/// - `num_features` - Flattened image length, 784 for MNIST
/// - `num_classes` - Number of classes, 10 for MNIST
///
/// # Returns
///
/// - `Ok((Split, Split))` - The train and test splits
/// - `Err(TrainingError::Io)` - A file is missing or malformed
/// - `Err(TrainingError::Model)` - The data does not fit `num_features` / `num_classes`
pub fn get_dataset<P: AsRef<Path>>(
    dir: P,
    num_features: usize,
    num_classes: usize,
) -> Result<(Split, Split), TrainingError> {
    let data = load_data(dir)?;

    let train = prepare_split(&data.train_images, &data.train_labels, num_features, num_classes)?;
    let test = prepare_split(&data.test_images, &data.test_labels, num_features, num_classes)?;

    Ok((train, test))
}

/// Builds a small, learnable stand-in for MNIST.
///
/// Every class owns the features whose index is congruent to the class modulo
/// `num_classes`; those features are bright (192..256) and all others are dim noise (0..64).
/// Values stay in the 0..255 pixel range so the data looks like unscaled images.
///
/// # Parameters
///
/// - `n_train` / `n_test` - Number of samples in each split
/// - `num_features` - Feature count, at least `num_classes`
/// - `num_classes` - Number of classes, between 1 and 256
/// - `seed` - Seed of the generator
///
/// # Returns
///
/// - `Ok((Split, Split))` - The train and test splits
/// - `Err(ModelError::InputValidationError)` - Invalid sizes
pub fn synthetic_splits(
    n_train: usize,
    n_test: usize,
    num_features: usize,
    num_classes: usize,
    seed: u64,
) -> Result<(Split, Split), ModelError> {
    if num_classes == 0 || num_classes > 256 {
        return Err(ModelError::InputValidationError(format!(
            "num_classes must be between 1 and 256, got {}",
            num_classes
        )));
    }

    if num_features < num_classes {
        return Err(ModelError::InputValidationError(format!(
            "num_features ({}) must be at least num_classes ({})",
            num_features, num_classes
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut make_split = |n_samples: usize| -> Result<Split, ModelError> {
        let labels: Array1<u8> = (0..n_samples)
            .map(|_| rng.gen_range(0..num_classes) as u8)
            .collect();

        let mut x = Array2::random_using((n_samples, num_features), Uniform::new(0.0f32, 64.0), &mut rng);
        for (mut row, &label) in x.axis_iter_mut(Axis(0)).zip(labels.iter()) {
            for j in (label as usize..num_features).step_by(num_classes) {
                row[j] += 192.0;
            }
        }

        let y = to_categorical(&labels, num_classes)?;
        Ok(Split { x, y })
    };

    let train = make_split(n_train)?;
    let test = make_split(n_test)?;

    Ok((train, test))
}
