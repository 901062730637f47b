use crate::error::ModelError;
use crate::neural_network::optimizer::hyperparameter::{Bound, check_hyperparameters};
use crate::neural_network::{Layer, Optimizer};

/// Plain mini-batch gradient descent, `param -= learning_rate * grad`. Stateless.
pub struct SGD {
    learning_rate: f32,
}

impl SGD {
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - `learning_rate` is not positive and finite
    pub fn new(learning_rate: f32) -> Result<Self, ModelError> {
        check_hyperparameters(&[("learning_rate", learning_rate, Bound::Positive)])?;
        Ok(Self { learning_rate })
    }

    pub fn get_learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl Optimizer for SGD {
    fn update(&mut self, layer: &mut dyn Layer) {
        layer.update_parameters_sgd(self.learning_rate);
    }

    fn name(&self) -> &str {
        "SGD"
    }
}
