use crate::error::ModelError;
use crate::neural_network::optimizer::hyperparameter::{Bound, check_hyperparameters};
use crate::neural_network::{Layer, Optimizer};
use ndarray::{Array2, Zip};

/// Parameter matrices at least this large are updated in parallel.
const RMS_PROP_PARALLEL_THRESHOLD: usize = 1024;

/// RMSprop optimizer.
///
/// Every parameter is scaled by the inverse root of a running mean of its squared
/// gradients, so parameters with large gradients take smaller steps.
///
/// # Fields
///
/// - `learning_rate` - Base step size
/// - `rho` - Weight of the previous running mean
/// - `epsilon` - Added to the root before dividing
pub struct RMSprop {
    learning_rate: f32,
    rho: f32,
    epsilon: f32,
}

impl RMSprop {
    /// Creates the optimizer. Keras defaults are `rho = 0.9` and `epsilon = 1e-7`.
    ///
    /// # Parameters
    ///
    /// - `learning_rate` - Base step size
    /// - `rho` - Weight of the previous running mean, in `[0, 1)`
    /// - `epsilon` - Added to the root of the running mean
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If any hyperparameter is out of range
    pub fn new(learning_rate: f32, rho: f32, epsilon: f32) -> Result<Self, ModelError> {
        check_hyperparameters(&[
            ("learning_rate", learning_rate, Bound::Positive),
            ("rho", rho, Bound::Decay),
            ("epsilon", epsilon, Bound::Positive),
        ])?;

        Ok(Self {
            learning_rate,
            rho,
            epsilon,
        })
    }
}

impl Optimizer for RMSprop {
    fn update(&mut self, layer: &mut dyn Layer) {
        layer.update_parameters_rmsprop(self.learning_rate, self.rho, self.epsilon);
    }

    fn name(&self) -> &str {
        "RMSprop"
    }
}

/// RMSprop cache for dense layers.
///
/// # Fields
///
/// - `cache` - Moving average of squared gradients for the weights
/// - `bias` - Moving average of squared gradients for the bias
#[derive(Debug, Clone, Default)]
pub struct RMSpropCache {
    pub cache: Array2<f32>,
    pub bias: Array2<f32>,
}

impl RMSpropCache {
    /// Creates a zeroed cache for a weight matrix and bias of the given dimensions.
    pub fn new(dims: (usize, usize), bias_dims: (usize, usize)) -> Self {
        Self {
            cache: Array2::<f32>::zeros(dims),
            bias: Array2::<f32>::zeros(bias_dims),
        }
    }

    /// Updates a parameter and its cache:
    /// `cache = rho*cache + (1-rho)*g^2`, `param -= lr * g / (sqrt(cache) + epsilon)`
    pub fn update_param(
        param: &mut Array2<f32>,
        grad: &Array2<f32>,
        cache: &mut Array2<f32>,
        rho: f32,
        lr: f32,
        epsilon: f32,
    ) {
        let update = |p: &mut f32, c: &mut f32, &g: &f32| {
            *c = rho * *c + (1.0 - rho) * g * g;
            *p -= lr * g / (c.sqrt() + epsilon);
        };

        if param.len() >= RMS_PROP_PARALLEL_THRESHOLD {
            Zip::from(param).and(cache).and(grad).par_for_each(update);
        } else {
            Zip::from(param).and(cache).and(grad).for_each(update);
        }
    }

    /// Updates the weights and the bias of a dense layer.
    pub fn update_parameters(
        &mut self,
        weights: &mut Array2<f32>,
        bias: &mut Array2<f32>,
        grad_w: &Array2<f32>,
        grad_b: &Array2<f32>,
        rho: f32,
        lr: f32,
        epsilon: f32,
    ) {
        Self::update_param(weights, grad_w, &mut self.cache, rho, lr, epsilon);
        Self::update_param(bias, grad_b, &mut self.bias, rho, lr, epsilon);
    }
}
