use super::*;

fn dense_with(weights: Array2<f32>, bias: Array2<f32>) -> Dense {
    let mut dense = Dense::new(weights.nrows(), weights.ncols()).unwrap();
    dense.set_weights(weights, bias).unwrap();
    dense
}

#[test]
fn dense_forward_test() {
    let mut dense = dense_with(
        array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
        array![[0.5, -0.5]],
    );
    let x = array![[1.0f32, 0.0, 1.0], [0.0, 1.0, 0.0]].into_dyn();

    let output = dense.forward(&x).unwrap();

    assert_eq!(output, array![[6.5f32, 7.5], [3.5, 3.5]].into_dyn());
}

#[test]
fn dense_backward_test() {
    let mut dense = dense_with(array![[1.0, 2.0], [3.0, 4.0]], array![[0.0, 0.0]]);
    let x = array![[1.0f32, 2.0], [3.0, 4.0]].into_dyn();
    dense.forward(&x).unwrap();

    let grad_input = dense
        .backward(&array![[1.0f32, 0.0], [0.0, 1.0]].into_dyn())
        .unwrap();

    // grad_input = grad_output * W^T
    assert_eq!(grad_input, array![[1.0f32, 3.0], [2.0, 4.0]].into_dyn());

    // plain SGD with lr 1 subtracts the raw gradients: X^T * G and the column sums of G
    dense.update_parameters_sgd(1.0);
    assert_eq!(dense.get_kernel(), &array![[0.0f32, -1.0], [1.0, 0.0]]);
    assert_eq!(dense.get_bias(), &array![[-1.0f32, -1.0]]);
}

#[test]
fn dense_rejects_wrong_width_test() {
    let mut dense = Dense::new(4, 2).unwrap();
    let x = Array2::<f32>::ones((3, 5)).into_dyn();
    assert!(matches!(
        dense.forward(&x),
        Err(ModelError::InputValidationError(_))
    ));
}

#[test]
fn dense_backward_before_forward_test() {
    let mut dense = Dense::new(2, 2).unwrap();
    let result = dense.backward(&Array2::<f32>::ones((1, 2)).into_dyn());
    assert!(matches!(result, Err(ModelError::ProcessingError(_))));
}

#[test]
fn dense_zero_dimension_test() {
    assert!(Dense::new(0, 3).is_err());
    assert!(Dense::new(3, 0).is_err());
}

#[test]
fn dense_param_count_and_shape_test() {
    let dense = Dense::new(784, 256).unwrap();
    assert_eq!(dense.param_count(), TrainingParameters::Trainable(200_960));
    assert_eq!(dense.output_shape(), "(None, 256)");
    assert_eq!(dense.layer_type(), "Dense");
}

#[test]
fn dense_hidden_initialization_test() {
    let dense = Dense::with_initializers(
        784,
        256,
        Initializer::RandomUniform {
            minval: -0.05,
            maxval: 0.05,
        },
        Initializer::Constant(0.0),
        Some(3),
    )
    .unwrap();

    assert!(dense.get_kernel().iter().all(|&w| (-0.05..0.05).contains(&w)));
    assert!(dense.get_bias().iter().all(|&b| b == 0.0));
    assert_eq!(dense.get_bias().dim(), (1, 256));
}

#[test]
fn dense_set_weights_shape_check_test() {
    let mut dense = Dense::new(3, 2).unwrap();
    assert!(
        dense
            .set_weights(Array2::<f32>::zeros((2, 3)), Array2::<f32>::zeros((1, 2)))
            .is_err()
    );
    assert!(
        dense
            .set_weights(Array2::<f32>::zeros((3, 2)), Array2::<f32>::zeros((1, 3)))
            .is_err()
    );
}

#[test]
fn dense_get_weights_test() {
    let dense = dense_with(array![[1.0], [2.0]], array![[0.5]]);
    match dense.get_weights() {
        LayerWeight::Dense(w) => {
            assert_eq!(w.kernel, &array![[1.0f32], [2.0]]);
            assert_eq!(w.bias, &array![[0.5f32]]);
        }
        LayerWeight::Empty => panic!("Dense layer reported no weights"),
    }
}

#[test]
fn layer_weight_len_test() {
    let dense = Dense::new(4, 3).unwrap();
    let weights = dense.get_weights();
    assert_eq!(weights.len(), 4 * 3 + 3);
    assert!(weights.as_dense().is_some());

    let relu = ReLU::new();
    assert!(relu.get_weights().is_empty());
    assert!(relu.get_weights().as_dense().is_none());
}
