use super::*;

/// Tensors with fewer elements are processed sequentially.
const RELU_PARALLEL_THRESHOLD: usize = 10_000;

/// Rectifier used after every hidden `Dense` layer: `max(0, x)` element by element.
///
/// # Examples
///
/// ```rust
/// use mnist_dnn::prelude::*;
/// use ndarray::Array2;
///
/// let x = Array2::from_shape_vec((2, 3), vec![-1.0, 2.0, -3.0, 4.0, -5.0, 6.0])
///     .unwrap()
///     .into_dyn();
///
/// let mut relu = ReLU::new();
/// let output = relu.forward(&x).unwrap();
/// assert_eq!(output.as_slice().unwrap(), &[0.0, 2.0, 0.0, 4.0, 0.0, 6.0]);
/// ```
pub struct ReLU {
    /// Positions where the last input was positive; these pass the gradient through.
    active: Option<ArrayD<bool>>,
}

impl ReLU {
    pub fn new() -> Self {
        ReLU { active: None }
    }
}

impl Default for ReLU {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for ReLU {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        validate_activation_input(input)?;

        let mut output = input.clone();
        if output.len() >= RELU_PARALLEL_THRESHOLD {
            output.par_mapv_inplace(|x| x.max(0.0));
        } else {
            output.mapv_inplace(|x| x.max(0.0));
        }

        self.active = Some(input.mapv(|x| x > 0.0));
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let active = self.active.as_ref().ok_or_else(|| {
            ModelError::ProcessingError("ReLU backward called before forward".to_string())
        })?;

        if grad_output.shape() != active.shape() {
            return Err(ModelError::ProcessingError(format!(
                "ReLU got a gradient of shape {:?} for an input of shape {:?}",
                grad_output.shape(),
                active.shape()
            )));
        }

        let mut grad_input = grad_output.clone();
        let mask = |grad: &mut f32, &on: &bool| {
            if !on {
                *grad = 0.0;
            }
        };
        if grad_input.len() >= RELU_PARALLEL_THRESHOLD {
            Zip::from(&mut grad_input).and(active).par_for_each(mask);
        } else {
            Zip::from(&mut grad_input).and(active).for_each(mask);
        }

        Ok(grad_input)
    }

    fn layer_type(&self) -> &str {
        "ReLU"
    }

    fn output_shape(&self) -> String {
        format_output_shape(self.active.as_ref().map(|a| a.shape()))
    }

    no_trainable_parameters_layer_functions!();
}

impl ActivationLayer for ReLU {}
