use super::*;
use crate::error::{IoError, ModelError, TrainingError};
use crate::metric::categorical_accuracy;
use crate::utility::argmax_rows;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array1, ArrayViewD, Axis, Ix2, concatenate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::{from_reader, to_writer_pretty};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Batch size used by `Sequential::predict`.
pub const DEFAULT_PREDICT_BATCH_SIZE: usize = 32;

/// Loss and accuracy of a model on a dataset, as returned by `Sequential::evaluate`.
///
/// Displays as `[loss, accuracy]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub loss: f32,
    pub accuracy: f32,
}

impl std::fmt::Display for Scores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.loss, self.accuracy)
    }
}

/// Settings of one `Sequential::fit` call.
///
/// # Fields
///
/// - `epochs` - Number of passes over the training data
/// - `batch_size` - Samples per gradient update; the last batch of an epoch may be smaller
/// - `validation_data` - Features and one-hot labels evaluated after every epoch
/// - `shuffle` - Shuffle the sample order at the start of every epoch (default true)
/// - `seed` - Seed of the shuffling; `None` draws from OS entropy
/// - `verbose` - Show the progress bar and per-epoch lines (default true)
#[derive(Debug, Clone, Copy)]
pub struct FitOptions<'a> {
    epochs: u32,
    batch_size: usize,
    validation_data: Option<(&'a Tensor, &'a Tensor)>,
    shuffle: bool,
    seed: Option<u64>,
    verbose: bool,
}

impl<'a> FitOptions<'a> {
    pub fn new(epochs: u32, batch_size: usize) -> Self {
        Self {
            epochs,
            batch_size,
            validation_data: None,
            shuffle: true,
            seed: None,
            verbose: true,
        }
    }

    pub fn with_validation_data(mut self, x: &'a Tensor, y: &'a Tensor) -> Self {
        self.validation_data = Some((x, y));
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn get_epochs(&self) -> u32 {
        self.epochs
    }

    pub fn get_batch_size(&self) -> usize {
        self.batch_size
    }
}

/// Linear stack of layers, the Rust counterpart of a Keras `Sequential` model.
///
/// # Fields
///
/// - `layers` - Layers in forward order
/// - `optimizer` - Optimizer used by `fit`, set by `compile`
/// - `loss` - Loss function used by `fit` and `evaluate`, set by `compile`
///
/// # Example
/// ```rust
/// use mnist_dnn::prelude::*;
/// use ndarray::Array;
///
/// let x = Array::<f32, _>::ones((8, 16)).into_dyn();
/// let mut y = Array::<f32, _>::zeros((8, 4));
/// for i in 0..8 {
///     y[[i, i % 4]] = 1.0;
/// }
/// let y = y.into_dyn();
///
/// let mut model = Sequential::new();
/// model
///     .add(Dense::new(16, 8).unwrap())
///     .add(ReLU::new())
///     .add(Dense::new(8, 4).unwrap())
///     .add(Softmax::new())
///     .compile(Adam::with_learning_rate(0.001).unwrap(), CategoricalCrossEntropy::new());
///
/// model.summary();
///
/// let options = FitOptions::new(2, 4).with_validation_data(&x, &y).with_verbose(false);
/// let history = model.fit(&x, &y, &options, &mut []).unwrap();
/// assert_eq!(history.epochs.len(), 2);
///
/// let scores = model.evaluate(&x, &y, 4).unwrap();
/// println!("Scores: {}", scores);
/// ```
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
    optimizer: Option<Box<dyn Optimizer>>,
    loss: Option<Box<dyn LossFunction>>,
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequential {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            optimizer: None,
            loss: None,
        }
    }

    /// Appends `layer` after the current last layer. Chainable.
    pub fn add<L: 'static + Layer>(&mut self, layer: L) -> &mut Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Sets the optimizer used by `fit` and the loss reported by `fit` and `evaluate`.
    /// Chainable; compiling again replaces both.
    pub fn compile<O, LFunc>(&mut self, optimizer: O, loss: LFunc) -> &mut Self
    where
        O: 'static + Optimizer,
        LFunc: 'static + LossFunction,
    {
        self.optimizer = Some(Box::new(optimizer));
        self.loss = Some(Box::new(loss));
        self
    }

    /// Same as `compile`, for an optimizer chosen at runtime.
    pub fn compile_boxed<LFunc>(&mut self, optimizer: Box<dyn Optimizer>, loss: LFunc) -> &mut Self
    where
        LFunc: 'static + LossFunction,
    {
        self.optimizer = Some(optimizer);
        self.loss = Some(Box::new(loss));
        self
    }

    /// Layers of the model, in order.
    pub fn get_layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    /// Name of the configured optimizer, if the model has been compiled.
    pub fn get_optimizer_name(&self) -> Option<&str> {
        self.optimizer.as_ref().map(|o| o.name())
    }

    fn validate_training_inputs(&self, x: &Tensor, y: &Tensor) -> Result<(), ModelError> {
        if self.optimizer.is_none() {
            return Err(ModelError::InputValidationError(
                "Optimizer not specified".to_string(),
            ));
        }

        if self.loss.is_none() {
            return Err(ModelError::InputValidationError(
                "Loss function not specified".to_string(),
            ));
        }

        validate_dataset(&self.layers, x, y)
    }

    /// Forward, loss, backward and optimizer update on one mini-batch.
    ///
    /// # Returns
    ///
    /// - `Ok((f32, f32))` - Loss and accuracy of the batch, measured before the update
    /// - `Err(ModelError)` - If a layer fails
    fn train_batch(&mut self, x: &Tensor, y: &Tensor) -> Result<(f32, f32), ModelError> {
        let mut output = x.clone();
        for layer in &mut self.layers {
            output = layer.forward(&output)?;
        }

        let loss_fn = self
            .loss
            .as_ref()
            .ok_or_else(|| ModelError::InputValidationError("Loss function not specified".to_string()))?;
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or_else(|| ModelError::InputValidationError("Optimizer not specified".to_string()))?;

        let loss_value = loss_fn.compute_loss(y, &output);
        let accuracy = batch_accuracy(y, &output)?;

        let mut grad = loss_fn.compute_grad(y, &output);

        optimizer.begin_step();
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
            optimizer.update(&mut **layer);
        }

        Ok((loss_value, accuracy))
    }

    /// Trains the model with mini-batch gradient descent.
    ///
    /// Every epoch shuffles the samples (unless disabled), trains on consecutive batches of
    /// `batch_size`, evaluates the validation data when present and then calls
    /// `on_epoch_end` of every callback in order.
    ///
    /// # Parameters
    ///
    /// - `x` - Training features of shape (n_samples, n_features)
    /// - `y` - One-hot training labels of shape (n_samples, n_classes)
    /// - `options` - Epochs, batch size, validation data and shuffling
    /// - `callbacks` - Hooks run at train begin, after each epoch and at train end
    ///
    /// # Returns
    ///
    /// - `Ok(History)` - Loss and accuracy of every epoch
    /// - `Err(TrainingError::Model)` - Invalid inputs, an uncompiled model or a layer failure
    /// - `Err(TrainingError::Io)` - A callback failed to write its output
    pub fn fit(
        &mut self,
        x: &Tensor,
        y: &Tensor,
        options: &FitOptions,
        callbacks: &mut [&mut dyn Callback],
    ) -> Result<History, TrainingError> {
        self.validate_training_inputs(x, y)?;

        if options.batch_size == 0 {
            return Err(TrainingError::Model(ModelError::InputValidationError(
                "Batch size must be greater than 0".to_string(),
            )));
        }

        if let Some((x_val, y_val)) = options.validation_data {
            validate_dataset(&self.layers, x_val, y_val)?;
        }

        let n_samples = x.shape()[0];
        let epochs = options.epochs;
        let total_batches = n_samples.div_ceil(options.batch_size);

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let progress_bar = if options.verbose {
            let bar = ProgressBar::new(epochs as u64 * total_batches as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} | Epoch {msg}")
                    .map_err(|e| {
                        ModelError::ProcessingError(format!("Invalid progress bar template: {}", e))
                    })?
                    .progress_chars("█▓░"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        log::info!(
            "Training on {} samples for {} epochs (batch size {}, {} batches per epoch, optimizer {})",
            n_samples,
            epochs,
            options.batch_size,
            total_batches,
            self.get_optimizer_name().unwrap_or("none")
        );

        for callback in callbacks.iter_mut() {
            callback.on_train_begin(self)?;
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut history = History::default();

        for epoch in 0..epochs as usize {
            if options.shuffle {
                indices.shuffle(&mut rng);
            }

            let mut loss_sum = 0.0f64;
            let mut accuracy_sum = 0.0f64;
            let mut seen = 0usize;

            for batch_indices in indices.chunks(options.batch_size) {
                let batch_x = x.select(Axis(0), batch_indices);
                let batch_y = y.select(Axis(0), batch_indices);

                let (batch_loss, batch_accuracy) = self.train_batch(&batch_x, &batch_y)?;

                // weight by batch size so a short last batch counts proportionally
                let m = batch_indices.len();
                loss_sum += batch_loss as f64 * m as f64;
                accuracy_sum += batch_accuracy as f64 * m as f64;
                seen += m;

                progress_bar.set_message(format!(
                    "{}/{} | loss: {:.4} - accuracy: {:.4}",
                    epoch + 1,
                    epochs,
                    loss_sum / seen as f64,
                    accuracy_sum / seen as f64
                ));
                progress_bar.inc(1);
            }

            let loss = (loss_sum / n_samples as f64) as f32;
            let accuracy = (accuracy_sum / n_samples as f64) as f32;

            let (val_loss, val_accuracy) = match options.validation_data {
                Some((x_val, y_val)) => {
                    let scores = self.evaluate(x_val, y_val, options.batch_size)?;
                    (Some(scores.loss), Some(scores.accuracy))
                }
                None => (None, None),
            };

            let logs = EpochLogs {
                loss,
                accuracy,
                val_loss,
                val_accuracy,
            };

            let line = format_epoch_line(epoch, epochs, &logs);
            if options.verbose {
                progress_bar.println(&line);
            }
            log::info!("{}", line);

            if !loss.is_finite() {
                log::warn!("Loss became non-finite at epoch {}", epoch + 1);
            }

            for callback in callbacks.iter_mut() {
                callback.on_epoch_end(epoch, &logs, self)?;
            }

            history.epochs.push(logs);
        }

        progress_bar.finish_with_message("Training completed");

        for callback in callbacks.iter_mut() {
            callback.on_train_end(self)?;
        }

        Ok(history)
    }

    /// Computes the loss and accuracy of the model on a labelled dataset.
    ///
    /// # Parameters
    ///
    /// - `x` - Features of shape (n_samples, n_features)
    /// - `y` - One-hot labels of shape (n_samples, n_classes)
    /// - `batch_size` - Samples per forward pass
    ///
    /// # Returns
    ///
    /// - `Ok(Scores)` - Mean loss and accuracy over all samples
    /// - `Err(ModelError)` - No loss configured, invalid inputs or a layer failure
    pub fn evaluate(&mut self, x: &Tensor, y: &Tensor, batch_size: usize) -> Result<Scores, ModelError> {
        if self.loss.is_none() {
            return Err(ModelError::InputValidationError(
                "Loss function not specified".to_string(),
            ));
        }
        validate_dataset(&self.layers, x, y)?;

        let predictions = self.predict_with_batch_size(x, batch_size)?;

        let loss = match self.loss.as_ref() {
            Some(loss_fn) => loss_fn.compute_loss(y, &predictions),
            None => 0.0,
        };
        let accuracy = batch_accuracy(y, &predictions)?;

        log::debug!("Evaluated {} samples: loss {:.6}, accuracy {:.6}", x.shape()[0], loss, accuracy);

        Ok(Scores { loss, accuracy })
    }

    /// Runs the forward pass over `x` in batches of `DEFAULT_PREDICT_BATCH_SIZE`.
    ///
    /// # Returns
    ///
    /// - `Ok(Tensor)` - The model's output for every sample
    /// - `Err(ModelError)` - Empty input, an empty model or a layer failure
    pub fn predict(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        self.predict_with_batch_size(x, DEFAULT_PREDICT_BATCH_SIZE)
    }

    /// Same as `predict` with an explicit batch size.
    pub fn predict_with_batch_size(&mut self, x: &Tensor, batch_size: usize) -> Result<Tensor, ModelError> {
        if x.is_empty() {
            return Err(ModelError::InputValidationError(
                "Input tensor cannot be empty".to_string(),
            ));
        }

        if batch_size == 0 {
            return Err(ModelError::InputValidationError(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.layers.is_empty() {
            return Err(ModelError::InputValidationError(
                "Layers not specified".to_string(),
            ));
        }

        let mut outputs = Vec::with_capacity(x.shape()[0].div_ceil(batch_size));
        for chunk in x.axis_chunks_iter(Axis(0), batch_size) {
            let mut output = chunk.to_owned();
            for layer in &mut self.layers {
                output = layer.forward(&output)?;
            }
            outputs.push(output);
        }

        let views: Vec<ArrayViewD<f32>> = outputs.iter().map(|o| o.view()).collect();
        concatenate(Axis(0), &views)
            .map_err(|e| ModelError::ProcessingError(format!("Failed to join predictions: {}", e)))
    }

    /// Predicts the class index (arg-max of the output) of every sample.
    pub fn predict_classes(&mut self, x: &Tensor) -> Result<Array1<usize>, ModelError> {
        let predictions = self.predict(x)?;
        let predictions = predictions.into_dimensionality::<Ix2>().map_err(|e| {
            ModelError::ProcessingError(format!("Model output must be 2D: {}", e))
        })?;
        Ok(argmax_rows(&predictions))
    }

    /// Prints a summary of the model's structure
    ///
    /// Displays each layer's information and parameter statistics in a tabular format
    pub fn summary(&self) {
        println!("{}", self.summary_string());
    }

    /// The table printed by `summary`.
    pub fn summary_string(&self) -> String {
        let col1_width = 33;
        let col2_width = 24;
        let col3_width = 15;

        let mut out = String::from("Model: \"sequential\"\n");
        out.push_str(&format!(
            "┏{}┳{}┳{}┓\n",
            "━".repeat(col1_width),
            "━".repeat(col2_width),
            "━".repeat(col3_width)
        ));
        out.push_str(&format!(
            "┃ {:<31} ┃ {:<22} ┃ {:>13} ┃\n",
            "Layer (type)", "Output Shape", "Param #"
        ));
        out.push_str(&format!(
            "┡{}╇{}╇{}┩\n",
            "━".repeat(col1_width),
            "━".repeat(col2_width),
            "━".repeat(col3_width)
        ));

        let mut total_params: usize = 0;

        for (layer, info) in self.layers.iter().zip(self.graph()) {
            let param_count_num = match layer.param_count() {
                TrainingParameters::Trainable(count) => count,
                TrainingParameters::NoTrainable => 0,
            };
            total_params += param_count_num;

            out.push_str(&format!(
                "│ {:<31} │ {:<22} │ {:>13} │\n",
                format!("{} ({})", info.name, info.layer_type),
                info.output_shape,
                param_count_num
            ));
        }

        out.push_str(&format!(
            "└{}┴{}┴{}┘\n",
            "─".repeat(col1_width),
            "─".repeat(col2_width),
            "─".repeat(col3_width)
        ));
        // f32 parameters, 4 bytes each
        out.push_str(&format!(" Total params: {} ({} B)\n", total_params, total_params * 4));
        out.push_str(&format!(
            " Trainable params: {} ({} B)\n",
            total_params,
            total_params * 4
        ));
        out.push_str(" Non-trainable params: 0 (0 B)");

        out
    }

    /// Total number of parameters over all layers.
    pub fn count_params(&self) -> usize {
        self.layers
            .iter()
            .map(|layer| match layer.param_count() {
                TrainingParameters::Trainable(count) => count,
                TrainingParameters::NoTrainable => 0,
            })
            .sum()
    }

    /// Borrowed parameters of every layer, in forward order.
    pub fn get_weights(&self) -> Vec<LayerWeight<'_>> {
        self.layers.iter().map(|layer| layer.get_weights()).collect()
    }

    /// Keras-style names of the layers in order: `dense`, `relu`, `dense_1`, ...
    pub fn layer_names(&self) -> Vec<String> {
        let mut name_counts: HashMap<String, usize> = HashMap::new();

        self.layers
            .iter()
            .map(|layer| {
                let base = layer_base_name(layer.layer_type());
                let seen = name_counts.entry(base.clone()).or_insert(0);
                let name = if *seen == 0 {
                    base
                } else {
                    format!("{}_{}", base, seen)
                };
                *seen += 1;
                name
            })
            .collect()
    }

    /// Name, type and output shape of every layer, in order.
    ///
    /// Parameterless layers keep the width of the layer before them, so an activation after
    /// `Dense(784, 256)` reads `(None, 256)` whether or not a batch has gone through the model.
    pub fn graph(&self) -> Vec<LayerInfo> {
        let mut previous_shape: Option<String> = None;

        self.layers
            .iter()
            .zip(self.layer_names())
            .map(|(layer, name)| {
                let output_shape = match (layer.param_count(), previous_shape.take()) {
                    (TrainingParameters::NoTrainable, Some(shape)) => shape,
                    _ => layer.output_shape(),
                };
                previous_shape = Some(output_shape.clone());

                LayerInfo {
                    name,
                    layer_type: layer.layer_type().to_string(),
                    output_shape,
                }
            })
            .collect()
    }

    /// Writes the layer graph and all parameters as JSON, e.g. to `models/mnist_model.json`.
    ///
    /// Optimizer state is not part of the file; compile again after loading to keep training.
    ///
    /// # Errors
    ///
    /// - `IoError::StdIoError` - The file cannot be created or written
    /// - `IoError::JsonError` - Encoding failed
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        let layers = self
            .graph()
            .into_iter()
            .zip(self.get_weights())
            .map(|(info, weights)| SerializableLayer {
                info,
                weights: SerializableLayerWeight::from_layer_weight(&weights),
            })
            .collect();

        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        to_writer_pretty(&mut writer, &SerializableSequential { layers })?;
        writer.flush()?;

        log::info!("Model weights saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Copies parameters saved by `save_to_path` into this model.
    ///
    /// The model has to be built with the same layer sequence and widths first.
    ///
    /// # Errors
    ///
    /// - `IoError::StdIoError` - The file cannot be opened
    /// - `IoError::JsonError` - The file is not a saved model
    /// - `IoError::InvalidData` - Layer count, a layer type or a matrix shape differs
    pub fn load_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), IoError> {
        let reader = IoError::load_in_buf_reader(path.as_ref())?;
        let saved: SerializableSequential = from_reader(reader)?;

        if saved.layers.len() != self.layers.len() {
            return Err(IoError::InvalidData(format!(
                "Model has {} layers but the file holds {}",
                self.layers.len(),
                saved.layers.len()
            )));
        }

        for (layer, saved_layer) in self.layers.iter_mut().zip(&saved.layers) {
            apply_weights_to_layer(&mut **layer, &saved_layer.weights, &saved_layer.info.layer_type)?;
        }

        log::info!("Model weights loaded from {}", path.as_ref().display());
        Ok(())
    }
}

/// Checks that a labelled dataset is non-empty, 2D and consistent with itself.
fn validate_dataset(layers: &[Box<dyn Layer>], x: &Tensor, y: &Tensor) -> Result<(), ModelError> {
    if layers.is_empty() {
        return Err(ModelError::InputValidationError(
            "Layers not specified".to_string(),
        ));
    }

    if x.is_empty() || y.is_empty() {
        return Err(ModelError::InputValidationError(
            "Input tensors cannot be empty".to_string(),
        ));
    }

    if y.ndim() != 2 {
        return Err(ModelError::InputValidationError(format!(
            "Targets must be 2D one-hot labels, got shape {:?}",
            y.shape()
        )));
    }

    if x.shape()[0] != y.shape()[0] {
        return Err(ModelError::InputValidationError(format!(
            "Batch size mismatch: input has {} samples, target has {} samples",
            x.shape()[0],
            y.shape()[0]
        )));
    }

    Ok(())
}

fn batch_accuracy(y_true: &Tensor, y_pred: &Tensor) -> Result<f32, ModelError> {
    let y_true = y_true
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|e| ModelError::InputValidationError(format!("Targets must be 2D: {}", e)))?;
    let y_pred = y_pred
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|e| ModelError::ProcessingError(format!("Model output must be 2D: {}", e)))?;
    categorical_accuracy(&y_true, &y_pred)
}

fn format_epoch_line(epoch: usize, epochs: u32, logs: &EpochLogs) -> String {
    let mut line = format!(
        "Epoch {}/{} - loss: {:.4} - accuracy: {:.4}",
        epoch + 1,
        epochs,
        logs.loss,
        logs.accuracy
    );
    if let (Some(val_loss), Some(val_accuracy)) = (logs.val_loss, logs.val_accuracy) {
        line.push_str(&format!(
            " - val_loss: {:.4} - val_accuracy: {:.4}",
            val_loss, val_accuracy
        ));
    }
    line
}

/// Converts a CamelCase layer type into a snake_case base name ("MaxPooling" becomes "max_pooling").
fn layer_base_name(layer_type: &str) -> String {
    let chars: Vec<char> = layer_type.chars().collect();
    let mut name = String::with_capacity(layer_type.len() + 2);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if i > 0 && next_is_lower {
                name.push('_');
            }
            name.extend(c.to_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}
