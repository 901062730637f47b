use crate::error::{IoError, ModelError};
use crate::neural_network::{Adam, Optimizer, RMSprop, SGD};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Environment variable overriding `TrainingConfig::data_dir` in the binaries.
pub const DATA_DIR_ENV: &str = "MNIST_DATA_DIR";

/// Hidden-layer layout of the classifier.
///
/// # Variants
///
/// - `TwoHidden` - Dense 256 and Dense 128
/// - `ThreeHidden` - Dense 256, Dense 128 and Dense 64
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelArchitecture {
    TwoHidden,
    ThreeHidden,
}

impl ModelArchitecture {
    /// Units of every hidden layer, input side first.
    pub fn hidden_units(&self) -> &'static [usize] {
        match self {
            ModelArchitecture::TwoHidden => &[256, 128],
            ModelArchitecture::ThreeHidden => &[256, 128, 64],
        }
    }
}

/// Optimizer choice and its hyperparameters.
///
/// # Variants
///
/// - `Adam` - Adaptive moment estimation
/// - `Sgd` - Plain stochastic gradient descent
/// - `RmsProp` - Root mean square propagation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    Sgd {
        learning_rate: f32,
    },
    RmsProp {
        learning_rate: f32,
        rho: f32,
        epsilon: f32,
    },
}

impl OptimizerConfig {
    /// Adam with the usual defaults (β1 0.9, β2 0.999, ε 1e-7).
    pub fn adam(learning_rate: f32) -> Self {
        OptimizerConfig::Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }

    pub fn sgd(learning_rate: f32) -> Self {
        OptimizerConfig::Sgd { learning_rate }
    }

    /// RMSprop with the usual defaults (ρ 0.9, ε 1e-7).
    pub fn rms_prop(learning_rate: f32) -> Self {
        OptimizerConfig::RmsProp {
            learning_rate,
            rho: 0.9,
            epsilon: 1e-7,
        }
    }

    pub fn learning_rate(&self) -> f32 {
        match *self {
            OptimizerConfig::Adam { learning_rate, .. }
            | OptimizerConfig::Sgd { learning_rate }
            | OptimizerConfig::RmsProp { learning_rate, .. } => learning_rate,
        }
    }

    /// Creates the optimizer.
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Optimizer>)` - Ready to pass to `Sequential::compile_boxed`
    /// - `Err(ModelError::InputValidationError)` - A hyperparameter is out of range
    pub fn build(&self) -> Result<Box<dyn Optimizer>, ModelError> {
        let optimizer: Box<dyn Optimizer> = match *self {
            OptimizerConfig::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Box::new(Adam::new(learning_rate, beta1, beta2, epsilon)?),
            OptimizerConfig::Sgd { learning_rate } => Box::new(SGD::new(learning_rate)?),
            OptimizerConfig::RmsProp {
                learning_rate,
                rho,
                epsilon,
            } => Box::new(RMSprop::new(learning_rate, rho, epsilon)?),
        };
        Ok(optimizer)
    }
}

/// Everything one training run needs.
///
/// Missing fields fall back to `TrainingConfig::dense_model()` when loading from JSON.
///
/// # Fields
///
/// - `num_features` - Flattened image length
/// - `num_classes` - Number of classes
/// - `architecture` - Hidden-layer layout
/// - `optimizer` - Optimizer and hyperparameters
/// - `epochs` - Number of training epochs
/// - `batch_size` - Samples per gradient update
/// - `data_dir` - Directory with the MNIST IDX files
/// - `models_dir` - Directory for saved weights
/// - `logs_dir` - Root directory of all runs' logs
/// - `run_name` - Sub-directory of `logs_dir` for this run
/// - `histogram_freq` - Epochs between weight histograms; 0 disables them
/// - `write_graph` - Write the layer graph at train begin
/// - `confusion_matrix` - Attach the per-epoch confusion-matrix callback
/// - `save_model` - Save the trained weights to `models_dir`
/// - `seed` - Seed of weight initialisation and shuffling; `None` is nondeterministic
/// - `verbose` - Show the progress bar and per-epoch lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub num_features: usize,
    pub num_classes: usize,
    pub architecture: ModelArchitecture,
    pub optimizer: OptimizerConfig,
    pub epochs: u32,
    pub batch_size: usize,
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub run_name: String,
    pub histogram_freq: usize,
    pub write_graph: bool,
    pub confusion_matrix: bool,
    pub save_model: bool,
    pub seed: Option<u64>,
    pub verbose: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::dense_model()
    }
}

impl TrainingConfig {
    /// Two hidden layers, 10 epochs of batch 128, Adam at 0.001, logged to `logs/mnist_model2`.
    pub fn dense_model() -> Self {
        Self {
            num_features: 784,
            num_classes: 10,
            architecture: ModelArchitecture::TwoHidden,
            optimizer: OptimizerConfig::adam(0.001),
            epochs: 10,
            batch_size: 128,
            data_dir: PathBuf::from("data/mnist"),
            models_dir: PathBuf::from("models"),
            logs_dir: PathBuf::from("logs"),
            run_name: "mnist_model2".to_string(),
            histogram_freq: 1,
            write_graph: true,
            confusion_matrix: false,
            save_model: false,
            seed: None,
            verbose: true,
        }
    }

    /// Three hidden layers with the confusion-matrix callback, logged to `logs/mnist_cm`.
    ///
    /// The program runs it with 5 epochs, batch size 256 and learning rate 0.001.
    pub fn confusion_matrix_model(epochs: u32, batch_size: usize, learning_rate: f32) -> Self {
        Self {
            architecture: ModelArchitecture::ThreeHidden,
            optimizer: OptimizerConfig::adam(learning_rate),
            epochs,
            batch_size,
            run_name: "mnist_cm".to_string(),
            confusion_matrix: true,
            ..Self::dense_model()
        }
    }

    /// Replaces `data_dir` with the value of `MNIST_DATA_DIR` when it is set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    /// Directory of this run's summaries, `logs_dir/run_name`.
    pub fn run_dir(&self) -> PathBuf {
        self.logs_dir.join(&self.run_name)
    }

    /// Checks that the values describe a runnable configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - All values are usable
    /// - `Err(ModelError::InputValidationError)` - The first problem found
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_features == 0 {
            return Err(ModelError::InputValidationError(
                "num_features must be greater than 0".to_string(),
            ));
        }
        if self.num_classes < 2 {
            return Err(ModelError::InputValidationError(format!(
                "num_classes must be at least 2, got {}",
                self.num_classes
            )));
        }
        if self.epochs == 0 {
            return Err(ModelError::InputValidationError(
                "epochs must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ModelError::InputValidationError(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.run_name.trim().is_empty() {
            return Err(ModelError::InputValidationError(
                "run_name must not be empty".to_string(),
            ));
        }
        self.optimizer.build().map(|_| ())
    }

    /// Reads a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        Ok(serde_json::from_reader(reader)?)
    }

    /// Writes the configuration as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
