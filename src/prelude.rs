pub use crate::config::{ModelArchitecture, OptimizerConfig, TrainingConfig};
pub use crate::dataset::{MnistData, Split, get_dataset, prepare_split, synthetic_splits};
pub use crate::error::{IoError, ModelError, TrainingError};
pub use crate::metric::{ConfusionMatrix, categorical_accuracy};
pub use crate::neural_network::Tensor;
pub use crate::neural_network::callback::*;
pub use crate::neural_network::layer::activation_layer::*;
pub use crate::neural_network::layer::{Dense, Initializer, LayerWeight};
pub use crate::neural_network::loss_function::*;
pub use crate::neural_network::optimizer::{Adam, RMSprop, SGD};
pub use crate::neural_network::sequential::*;
pub use crate::trainer::{
    LOG_FILE_NAME, MODEL_FILE_NAME, RunPaths, TrainingReport, build_model, format_shape,
    prepare_directories, run, run_with_splits,
};
pub use crate::traits::*;
pub use crate::utility::{argmax_rows, to_categorical};
