use crate::error::ModelError;
use crate::neural_network::optimizer::hyperparameter::{Bound, check_hyperparameters};
use crate::neural_network::{Layer, Optimizer};
use ndarray::Array2;

/// Adam, the optimizer both MNIST programs compile with.
///
/// Keeps running means of each gradient and of its square, corrects both for their zero
/// start, and steps each parameter by the ratio of the two.
///
/// `t` advances once per mini-batch in `Optimizer::begin_step`, so every layer updated
/// within one batch uses the same bias correction.
///
/// # Fields
///
/// - `learning_rate` - Step size, 0.001 in both programs
/// - `beta1` - Decay of the gradient mean
/// - `beta2` - Decay of the squared-gradient mean
/// - `epsilon` - Added to the denominator
/// - `t` - Number of batches stepped so far
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
}

impl Adam {
    /// Creates the optimizer with its step counter at 0.
    ///
    /// Keras uses `beta1 = 0.9`, `beta2 = 0.999` and `epsilon = 1e-7`;
    /// `OptimizerConfig::adam` fills those in.
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - A rate is not positive or a decay is outside `[0, 1)`
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Result<Self, ModelError> {
        check_hyperparameters(&[
            ("learning_rate", learning_rate, Bound::Positive),
            ("beta1", beta1, Bound::Decay),
            ("beta2", beta2, Bound::Decay),
            ("epsilon", epsilon, Bound::Positive),
        ])?;

        Ok(Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
        })
    }

    /// Creates an Adam optimizer with the given learning rate and the usual
    /// defaults `beta1 = 0.9`, `beta2 = 0.999`, `epsilon = 1e-7`.
    pub fn with_learning_rate(learning_rate: f32) -> Result<Self, ModelError> {
        Self::new(learning_rate, 0.9, 0.999, 1e-7)
    }

    /// Returns the learning rate
    pub fn get_learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Returns the number of optimization steps taken so far
    pub fn get_step(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn update(&mut self, layer: &mut dyn Layer) {
        // update() outside of a fit loop still needs t >= 1 for bias correction
        let t = self.t.max(1);
        layer.update_parameters_adam(self.learning_rate, self.beta1, self.beta2, self.epsilon, t);
    }

    fn name(&self) -> &str {
        "Adam"
    }
}

/// Running means kept by one dense layer under Adam.
///
/// # Fields
///
/// - `m` - Gradient mean of the kernel
/// - `v` - Squared-gradient mean of the kernel
/// - `m_bias` - Gradient mean of the bias
/// - `v_bias` - Squared-gradient mean of the bias
#[derive(Debug, Clone, Default)]
pub struct AdamStates {
    pub m: Array2<f32>,
    pub v: Array2<f32>,
    pub m_bias: Array2<f32>,
    pub v_bias: Array2<f32>,
}

impl AdamStates {
    /// Zeroed means for a kernel of `dims_param` and a bias of `dims_bias`.
    pub fn new(dims_param: (usize, usize), dims_bias: (usize, usize)) -> Self {
        Self {
            m: Array2::zeros(dims_param),
            v: Array2::zeros(dims_param),
            m_bias: Array2::zeros(dims_bias),
            v_bias: Array2::zeros(dims_bias),
        }
    }

    /// Folds the new gradients into the means and computes the step.
    ///
    /// # Parameters
    ///
    /// - `grad_param` - Kernel gradient
    /// - `grad_bias` - Bias gradient
    /// - `t` - One-based batch counter used for bias correction
    /// - `lr` - Step size
    ///
    /// # Returns
    ///
    /// - `(Array2<f32>, Array2<f32>)` - Updates for the weights and the bias
    pub fn update_parameter(
        &mut self,
        grad_param: &Array2<f32>,
        grad_bias: &Array2<f32>,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        t: u64,
        lr: f32,
    ) -> (Array2<f32>, Array2<f32>) {
        Self::update_adam_param(&mut self.m, &mut self.v, grad_param, beta1, beta2);
        Self::update_adam_param(&mut self.m_bias, &mut self.v_bias, grad_bias, beta1, beta2);

        let correction1 = 1.0 - beta1.powi(t as i32);
        let correction2 = 1.0 - beta2.powi(t as i32);

        let step = |m: &Array2<f32>, v: &Array2<f32>| {
            let m_hat = m / correction1;
            let v_hat = v / correction2;
            lr * &m_hat / &(v_hat.mapv(f32::sqrt) + epsilon)
        };

        rayon::join(|| step(&self.m, &self.v), || step(&self.m_bias, &self.v_bias))
    }

    /// m = beta1*m + (1-beta1)*g and v = beta2*v + (1-beta2)*g^2, in place
    fn update_adam_param(
        m: &mut Array2<f32>,
        v: &mut Array2<f32>,
        g: &Array2<f32>,
        beta1: f32,
        beta2: f32,
    ) {
        rayon::join(
            || {
                m.zip_mut_with(g, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
            },
            || {
                v.zip_mut_with(g, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);
            },
        );
    }
}
