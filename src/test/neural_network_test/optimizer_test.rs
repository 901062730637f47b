use super::*;

/// A 1x1 dense layer with weight 1 and bias 0 after a forward/backward pass that leaves
/// a weight gradient of 6 and a bias gradient of 3.
fn layer_with_gradients() -> Dense {
    let mut dense = Dense::new(1, 1).unwrap();
    dense.set_weights(array![[1.0]], array![[0.0]]).unwrap();
    dense.forward(&array![[2.0f32]].into_dyn()).unwrap();
    dense.backward(&array![[3.0f32]].into_dyn()).unwrap();
    dense
}

#[test]
fn sgd_update_test() {
    let mut dense = layer_with_gradients();
    let mut sgd = SGD::new(0.1).unwrap();

    sgd.update(&mut dense);

    assert_relative_eq!(dense.get_kernel()[[0, 0]], 0.4, epsilon = 1e-6);
    assert_relative_eq!(dense.get_bias()[[0, 0]], -0.3, epsilon = 1e-6);
    assert_eq!(sgd.name(), "SGD");
}

#[test]
fn adam_first_step_test() {
    let mut dense = layer_with_gradients();
    let mut adam = Adam::new(0.1, 0.9, 0.999, 1e-7).unwrap();

    adam.begin_step();
    adam.update(&mut dense);

    // with bias correction the first step moves every parameter by about lr
    assert_relative_eq!(dense.get_kernel()[[0, 0]], 0.9, epsilon = 1e-5);
    assert_relative_eq!(dense.get_bias()[[0, 0]], -0.1, epsilon = 1e-5);
}

#[test]
fn adam_step_counts_batches_test() {
    let mut adam = Adam::with_learning_rate(0.001).unwrap();
    let mut first = layer_with_gradients();
    let mut second = layer_with_gradients();

    assert_eq!(adam.get_step(), 0);

    // two layers updated in the same batch share one step
    adam.begin_step();
    adam.update(&mut first);
    adam.update(&mut second);
    assert_eq!(adam.get_step(), 1);

    adam.begin_step();
    assert_eq!(adam.get_step(), 2);
    assert_relative_eq!(adam.get_learning_rate(), 0.001);
    assert_eq!(adam.name(), "Adam");
}

#[test]
fn rms_prop_update_test() {
    let mut dense = layer_with_gradients();
    let mut rms_prop = RMSprop::new(0.1, 0.9, 1e-7).unwrap();

    rms_prop.update(&mut dense);

    let expected_w = 1.0 - 0.1 * 6.0 / (0.1f32 * 36.0).sqrt();
    let expected_b = -0.1 * 3.0 / (0.1f32 * 9.0).sqrt();
    assert_relative_eq!(dense.get_kernel()[[0, 0]], expected_w, epsilon = 1e-5);
    assert_relative_eq!(dense.get_bias()[[0, 0]], expected_b, epsilon = 1e-5);
}

#[test]
fn optimizers_skip_parameterless_layers_test() {
    let mut relu = ReLU::new();
    let mut adam = Adam::with_learning_rate(0.01).unwrap();
    adam.begin_step();
    adam.update(&mut relu);
    assert_eq!(relu.param_count(), TrainingParameters::NoTrainable);
}

#[test]
fn optimizer_hyperparameter_validation_test() {
    assert!(SGD::new(0.0).is_err());
    assert!(SGD::new(f32::NAN).is_err());
    assert!(Adam::new(0.001, 1.0, 0.999, 1e-7).is_err());
    assert!(Adam::new(0.001, 0.9, -0.1, 1e-7).is_err());
    assert!(Adam::new(0.001, 0.9, 0.999, 0.0).is_err());
    assert!(RMSprop::new(-0.01, 0.9, 1e-7).is_err());
    assert!(RMSprop::new(0.01, 1.5, 1e-7).is_err());
}
