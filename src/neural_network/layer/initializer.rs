use crate::error::ModelError;
use ndarray::Array2;
use ndarray_rand::RandomExt;
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::Uniform;
use serde::{Deserialize, Serialize};

/// Strategy used to fill a weight matrix or bias vector when a layer is created.
///
/// # Variants
///
/// - `RandomUniform` - Values drawn uniformly from `[minval, maxval)`
/// - `Constant` - Every value set to the given constant
/// - `Zeros` - Every value set to zero
/// - `GlorotUniform` - Values drawn uniformly from `[-limit, limit)` with
///   `limit = sqrt(6 / (fan_in + fan_out))`, where the matrix shape is `(fan_in, fan_out)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    RandomUniform { minval: f32, maxval: f32 },
    Constant(f32),
    Zeros,
    GlorotUniform,
}

impl Initializer {
    /// Checks that the initializer parameters are usable.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - The initializer can produce values
    /// - `Err(ModelError::InputValidationError)` - Bounds are not finite or `minval >= maxval`,
    ///   or the constant is not finite
    pub fn validate(&self) -> Result<(), ModelError> {
        match *self {
            Initializer::RandomUniform { minval, maxval } => {
                if !(minval.is_finite() && maxval.is_finite()) || minval >= maxval {
                    return Err(ModelError::InputValidationError(format!(
                        "RandomUniform requires finite minval < maxval, got [{}, {})",
                        minval, maxval
                    )));
                }
                Ok(())
            }
            Initializer::Constant(value) => {
                if !value.is_finite() {
                    return Err(ModelError::InputValidationError(format!(
                        "Constant initializer value must be finite, got {}",
                        value
                    )));
                }
                Ok(())
            }
            Initializer::Zeros | Initializer::GlorotUniform => Ok(()),
        }
    }

    /// Creates a matrix of the given shape filled according to this strategy.
    ///
    /// # Parameters
    ///
    /// - `shape` - Matrix shape, read as `(fan_in, fan_out)` by `GlorotUniform`
    /// - `rng` - Random source used by the random strategies
    ///
    /// # Returns
    ///
    /// - `Ok(Array2<f32>)` - The initialized matrix
    /// - `Err(ModelError::InputValidationError)` - If `validate` fails
    pub fn initialize<R: Rng + ?Sized>(
        &self,
        shape: (usize, usize),
        rng: &mut R,
    ) -> Result<Array2<f32>, ModelError> {
        self.validate()?;

        let values = match *self {
            Initializer::RandomUniform { minval, maxval } => {
                Array2::random_using(shape, Uniform::new(minval, maxval), rng)
            }
            Initializer::Constant(value) => Array2::from_elem(shape, value),
            Initializer::Zeros => Array2::zeros(shape),
            Initializer::GlorotUniform => {
                let (fan_in, fan_out) = shape;
                let fan_sum = (fan_in + fan_out).max(1) as f32;
                let limit = (6.0 / fan_sum).sqrt();
                Array2::random_using(shape, Uniform::new(-limit, limit), rng)
            }
        };

        Ok(values)
    }
}
