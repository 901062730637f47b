use super::*;
use crate::neural_network::optimizer::*;
use ndarray::{Array2, Axis, Ix2};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;

/// Fully connected layer computing `input · kernel + bias` for each row of a batch.
///
/// Non-linearities are separate layers (`ReLU`, `Softmax`) stacked after it, the same
/// way a Keras model adds `Dense` followed by `Activation`.
///
/// By default the kernel uses Glorot uniform initialization and the bias starts at zero.
/// Use `Dense::with_initializers` to choose other strategies, e.g. a fixed
/// `RandomUniform { minval: -0.05, maxval: 0.05 }` kernel with a `Constant(0.0)` bias.
///
/// A batch of shape (batch_size, input_dim) becomes (batch_size, output_dim).
///
/// # Fields
///
/// - `weights` - Kernel of shape (input_dim, output_dim)
/// - `bias` - Row of shape (1, output_dim) added to every output row
/// - `input_cache` - Batch of the last forward pass, consumed by `backward`
/// - `grad_weights` - Kernel gradient of the last backward pass
/// - `grad_bias` - Bias gradient of the last backward pass
/// - `optimizer_cache` - Moment estimates kept by Adam or RMSprop
///
/// # Example
/// ```rust
/// use mnist_dnn::prelude::*;
/// use ndarray::Array;
///
/// let x = Array::<f32, _>::ones((2, 4)).into_dyn();
/// let y = Array::from_shape_vec((2, 3), vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
///     .unwrap()
///     .into_dyn();
///
/// let mut model = Sequential::new();
/// model
///     .add(Dense::new(4, 3).unwrap())
///     .add(Softmax::new())
///     .compile(SGD::new(0.01).unwrap(), CategoricalCrossEntropy::new());
///
/// model.fit(&x, &y, &FitOptions::new(3, 2), &mut []).unwrap();
/// let prediction = model.predict(&x).unwrap();
/// assert_eq!(prediction.shape(), &[2, 3]);
/// ```
pub struct Dense {
    input_dim: usize,
    output_dim: usize,
    weights: Array2<f32>,
    bias: Array2<f32>,
    input_cache: Option<Array2<f32>>,
    grad_weights: Option<Array2<f32>>,
    grad_bias: Option<Array2<f32>>,
    optimizer_cache: OptimizerCache,
}

impl Dense {
    /// Glorot uniform kernel and zero bias, seeded from OS entropy.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - `input_dim` or `output_dim` is zero
    pub fn new(input_dim: usize, output_dim: usize) -> Result<Self, ModelError> {
        Self::with_initializers(
            input_dim,
            output_dim,
            Initializer::GlorotUniform,
            Initializer::Zeros,
            None,
        )
    }

    /// Layer whose kernel and bias are drawn from the given initializers.
    ///
    /// # Parameters
    ///
    /// - `input_dim` - Width of the incoming batch
    /// - `output_dim` - Number of units
    /// - `kernel_initializer` - Strategy for the weight matrix
    /// - `bias_initializer` - Strategy for the bias vector
    /// - `seed` - Seed for the random strategies; `None` draws from OS entropy
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - The initialized layer
    /// - `Err(ModelError::InputValidationError)` - Zero dimension or invalid initializer
    pub fn with_initializers(
        input_dim: usize,
        output_dim: usize,
        kernel_initializer: Initializer,
        bias_initializer: Initializer,
        seed: Option<u64>,
    ) -> Result<Self, ModelError> {
        if input_dim == 0 || output_dim == 0 {
            return Err(ModelError::InputValidationError(format!(
                "Dense dimensions must be greater than 0, got input_dim={}, output_dim={}",
                input_dim, output_dim
            )));
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let weights = kernel_initializer.initialize((input_dim, output_dim), &mut rng)?;
        let bias = bias_initializer.initialize((1, output_dim), &mut rng)?;

        Ok(Self {
            input_dim,
            output_dim,
            weights,
            bias,
            input_cache: None,
            grad_weights: None,
            grad_bias: None,
            optimizer_cache: OptimizerCache::default(),
        })
    }

    pub fn get_input_dim(&self) -> usize {
        self.input_dim
    }

    /// Number of units.
    pub fn get_output_dim(&self) -> usize {
        self.output_dim
    }

    /// Kernel of shape (input_dim, output_dim).
    pub fn get_kernel(&self) -> &Array2<f32> {
        &self.weights
    }

    /// Bias of shape (1, output_dim).
    pub fn get_bias(&self) -> &Array2<f32> {
        &self.bias
    }

    /// Replaces the weights and bias, resetting optimizer state.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Weights replaced
    /// - `Err(ModelError::InputValidationError)` - Shapes do not match the layer
    pub fn set_weights(&mut self, weights: Array2<f32>, bias: Array2<f32>) -> Result<(), ModelError> {
        if weights.dim() != (self.input_dim, self.output_dim) {
            return Err(ModelError::InputValidationError(format!(
                "Weight shape {:?} does not match layer shape {:?}",
                weights.dim(),
                (self.input_dim, self.output_dim)
            )));
        }
        if bias.dim() != (1, self.output_dim) {
            return Err(ModelError::InputValidationError(format!(
                "Bias shape {:?} does not match layer shape {:?}",
                bias.dim(),
                (1, self.output_dim)
            )));
        }

        self.weights = weights;
        self.bias = bias;
        self.optimizer_cache = OptimizerCache::default();
        Ok(())
    }
}

impl Layer for Dense {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        let input_2d = input
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|e| {
                ModelError::InputValidationError(format!(
                    "Dense layer expects a 2D input, got shape {:?}: {}",
                    input.shape(),
                    e
                ))
            })?;

        if input_2d.ncols() != self.input_dim {
            return Err(ModelError::InputValidationError(format!(
                "Dense layer expects {} input features, got {}",
                self.input_dim,
                input_2d.ncols()
            )));
        }

        let z = input_2d.dot(&self.weights) + &self.bias;
        self.input_cache = Some(input_2d.to_owned());

        Ok(z.into_dyn())
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let grad_upstream = grad_output
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|e| {
                ModelError::ProcessingError(format!("Dense gradient must be 2D: {}", e))
            })?;

        let input = self.input_cache.take().ok_or_else(|| {
            ModelError::ProcessingError("Dense backward called before forward".to_string())
        })?;

        if grad_upstream.dim() != (input.nrows(), self.output_dim) {
            return Err(ModelError::ProcessingError(format!(
                "Gradient shape {:?} does not match expected {:?}",
                grad_upstream.dim(),
                (input.nrows(), self.output_dim)
            )));
        }

        let grad_w = input.t().dot(&grad_upstream);
        let grad_b = grad_upstream.sum_axis(Axis(0)).insert_axis(Axis(0));
        let grad_input = grad_upstream.dot(&self.weights.t());

        self.grad_weights = Some(grad_w);
        self.grad_bias = Some(grad_b);

        Ok(grad_input.into_dyn())
    }

    fn layer_type(&self) -> &str {
        "Dense"
    }

    fn output_shape(&self) -> String {
        format!("(None, {})", self.output_dim)
    }

    fn param_count(&self) -> TrainingParameters {
        TrainingParameters::Trainable(self.input_dim * self.output_dim + self.output_dim)
    }

    fn update_parameters_sgd(&mut self, lr: f32) {
        if let (Some(grad_w), Some(grad_b)) = (&self.grad_weights, &self.grad_bias) {
            self.weights.scaled_add(-lr, grad_w);
            self.bias.scaled_add(-lr, grad_b);
        }
    }

    fn update_parameters_adam(&mut self, lr: f32, beta1: f32, beta2: f32, epsilon: f32, t: u64) {
        if let (Some(grad_w), Some(grad_b)) = (&self.grad_weights, &self.grad_bias) {
            let (input_dim, output_dim) = (self.input_dim, self.output_dim);
            let adam_states = self
                .optimizer_cache
                .adam_states
                .get_or_insert_with(|| AdamStates::new((input_dim, output_dim), (1, output_dim)));

            let (w_update, b_update) =
                adam_states.update_parameter(grad_w, grad_b, beta1, beta2, epsilon, t, lr);

            self.weights -= &w_update;
            self.bias -= &b_update;
        }
    }

    fn update_parameters_rmsprop(&mut self, lr: f32, rho: f32, epsilon: f32) {
        if let (Some(grad_w), Some(grad_b)) = (&self.grad_weights, &self.grad_bias) {
            let (input_dim, output_dim) = (self.input_dim, self.output_dim);
            let cache = self
                .optimizer_cache
                .rmsprop_cache
                .get_or_insert_with(|| RMSpropCache::new((input_dim, output_dim), (1, output_dim)));

            cache.update_parameters(
                &mut self.weights,
                &mut self.bias,
                grad_w,
                grad_b,
                rho,
                lr,
                epsilon,
            );
        }
    }

    fn get_weights(&self) -> LayerWeight<'_> {
        LayerWeight::Dense(DenseLayerWeight {
            kernel: &self.weights,
            bias: &self.bias,
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
