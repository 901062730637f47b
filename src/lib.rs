//! Feed-forward digit classification on MNIST.
//!
//! The crate bundles a small Keras-style neural network layer (dense layers, activations,
//! optimizers, a categorical cross-entropy loss and a `Sequential` container), an MNIST IDX
//! loader, JSON-lines training summaries and a per-epoch confusion-matrix callback. The two
//! binaries `mnist_dense` and `mnist_confusion_matrix` wire these together.

/// Error types shared by every module: `ModelError`, `IoError` and `TrainingError`.
mod error;

pub use error::*;

/// Core traits of the neural network layer (`Layer`, `LossFunction`, `Optimizer`,
/// `ActivationLayer`, `Callback`).
pub mod traits;

/// Training configuration and the presets used by the binaries.
///
/// # Examples
/// ```rust
/// use mnist_dnn::config::{ModelArchitecture, TrainingConfig};
///
/// let config = TrainingConfig::confusion_matrix_model(5, 256, 0.001);
/// assert_eq!(config.architecture, ModelArchitecture::ThreeHidden);
/// assert_eq!(config.run_name, "mnist_cm");
/// config.validate().unwrap();
/// ```
pub mod config;

/// Dataset access: the MNIST IDX reader, split preparation and a synthetic stand-in.
///
/// # Examples
/// ```rust
/// use mnist_dnn::dataset::synthetic_splits;
///
/// let (train, test) = synthetic_splits(100, 20, 16, 4, 7).unwrap();
/// assert_eq!(train.x.shape(), &[100, 16]);
/// assert_eq!(test.y.shape(), &[20, 4]);
/// ```
pub mod dataset;

/// File and stderr logging for the binaries, built on `tracing-subscriber`.
pub mod logging;

/// Classification metrics: categorical accuracy and the multi-class confusion matrix.
///
/// # Examples
/// ```rust
/// use mnist_dnn::metric::*;
/// use ndarray::{array, arr1};
///
/// let y_true = array![[1.0f32, 0.0], [0.0, 1.0]];
/// let y_pred = array![[0.9f32, 0.1], [0.8, 0.2]];
/// assert_eq!(categorical_accuracy(&y_true, &y_pred).unwrap(), 0.5);
///
/// let cm = ConfusionMatrix::new(&arr1(&[0usize, 1]), &arr1(&[0usize, 0]), 2).unwrap();
/// assert_eq!(cm.total(), 2);
/// ```
pub mod metric;

/// A Keras-style neural network layer.
///
/// # Components
///
/// ## Layers
/// - **Dense**: Fully connected layer with configurable initializers
/// - **ReLU** and **Softmax**: Activation layers
///
/// ## Optimization Algorithms
/// - **SGD**: Stochastic Gradient Descent
/// - **Adam**: Adaptive moment estimation optimizer
/// - **RMSprop**: Root Mean Square Propagation optimizer
///
/// ## Loss Functions
/// - **CategoricalCrossEntropy**: For multi-class classification
///
/// ## Model Architecture
/// - **Sequential**: Linear stack of layers with `fit`, `evaluate` and `predict`
/// - **Tensor**: Type alias for n-dimensional arrays used throughout the framework
///
/// ## Callbacks
/// - **TensorBoard**: Scalar and histogram summaries plus the layer graph
/// - **ConfusionMatrixCallback**: Confusion-matrix image after every epoch
pub mod neural_network;

/// Convenient re-exports of the commonly used types.
///
/// # Examples
/// ```rust
/// use mnist_dnn::prelude::*;
///
/// let model = build_model(784, 10, ModelArchitecture::TwoHidden, Some(42)).unwrap();
/// assert_eq!(model.count_params(), 784 * 256 + 256 + 256 * 128 + 128 + 128 * 10 + 10);
/// ```
pub mod prelude;

/// The training driver: directory setup, model construction, fit and evaluation.
pub mod trainer;

/// Label encoding helpers.
pub mod utility;
