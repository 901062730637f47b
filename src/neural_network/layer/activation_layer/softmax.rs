use super::*;

/// Floor for the row sum to avoid division by zero.
const EPSILON: f32 = 1e-8;

/// Batches with more rows than this are processed in parallel.
const SOFTMAX_PARALLEL_THRESHOLD: usize = 8;

/// Softmax activation layer.
///
/// Converts each row of a `[batch_size, num_classes]` tensor into a probability
/// distribution:
///
/// softmax(x_i) = exp(x_i - max(x)) / sum_j(exp(x_j - max(x)))
///
/// Every output row is non-negative and sums to 1.
pub struct Softmax {
    output_cache: Option<Tensor>,
}

impl Softmax {
    /// Creates a new Softmax activation layer.
    pub fn new() -> Self {
        Softmax { output_cache: None }
    }
}

impl Default for Softmax {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a dynamic tensor into a 2D `[rows, classes]` array.
fn to_rows(tensor: &Tensor, what: &str) -> Result<Array2<f32>, ModelError> {
    tensor
        .clone()
        .into_dimensionality::<ndarray::Ix2>()
        .map_err(|e| {
            ModelError::InputValidationError(format!(
                "Softmax expects a 2D {}, got shape {:?}: {}",
                what,
                tensor.shape(),
                e
            ))
        })
}

impl Layer for Softmax {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, ModelError> {
        validate_activation_input(input)?;

        let mut output = to_rows(input, "input")?;

        let apply_softmax = |mut row: ArrayViewMut1<f32>| {
            let max_val = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            row.mapv_inplace(|x| (x - max_val).exp());
            let sum = row.sum().max(EPSILON);
            row.mapv_inplace(|x| x / sum);
        };

        if output.nrows() > SOFTMAX_PARALLEL_THRESHOLD {
            output
                .axis_iter_mut(Axis(0))
                .into_par_iter()
                .for_each(apply_softmax);
        } else {
            output.axis_iter_mut(Axis(0)).for_each(apply_softmax);
        }

        let output = output.into_dyn();
        self.output_cache = Some(output.clone());
        Ok(output)
    }

    fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let output = match &self.output_cache {
            Some(output) => to_rows(output, "cached output")?,
            None => {
                return Err(ModelError::ProcessingError(
                    "Forward pass has not been run yet".to_string(),
                ));
            }
        };
        let grad_output = to_rows(grad_output, "gradient")?;

        if grad_output.dim() != output.dim() {
            return Err(ModelError::ProcessingError(format!(
                "Gradient output shape {:?} doesn't match output shape {:?}",
                grad_output.dim(),
                output.dim()
            )));
        }

        // grad_input[i] = s[i] * (g[i] - sum_j(s[j] * g[j]))
        let mut grad_input = Array2::<f32>::zeros(output.raw_dim());
        let compute_gradient =
            |mut grad_row: ArrayViewMut1<f32>, out_row: ArrayView1<f32>, up_row: ArrayView1<f32>| {
                let dot = out_row.dot(&up_row);
                Zip::from(&mut grad_row)
                    .and(&out_row)
                    .and(&up_row)
                    .for_each(|g, &s, &u| *g = s * (u - dot));
            };

        if output.nrows() > SOFTMAX_PARALLEL_THRESHOLD {
            Zip::from(grad_input.axis_iter_mut(Axis(0)))
                .and(output.axis_iter(Axis(0)))
                .and(grad_output.axis_iter(Axis(0)))
                .par_for_each(compute_gradient);
        } else {
            Zip::from(grad_input.axis_iter_mut(Axis(0)))
                .and(output.axis_iter(Axis(0)))
                .and(grad_output.axis_iter(Axis(0)))
                .for_each(compute_gradient);
        }

        Ok(grad_input.into_dyn())
    }

    fn layer_type(&self) -> &str {
        "Softmax"
    }

    fn output_shape(&self) -> String {
        format_output_shape(self.output_cache.as_ref().map(|t| t.shape()))
    }

    no_trainable_parameters_layer_functions!();
}

impl ActivationLayer for Softmax {}
