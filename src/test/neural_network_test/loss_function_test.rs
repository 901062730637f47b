use super::*;

#[test]
fn categorical_cross_entropy_loss_test() {
    let loss_fn = CategoricalCrossEntropy::new();
    let y_true = array![[1.0f32, 0.0, 0.0], [0.0, 1.0, 0.0]].into_dyn();
    let y_pred = array![[0.7f32, 0.2, 0.1], [0.1, 0.8, 0.1]].into_dyn();

    let loss = loss_fn.compute_loss(&y_true, &y_pred);

    let expected = -(0.7f32.ln() + 0.8f32.ln()) / 2.0;
    assert_relative_eq!(loss, expected, epsilon = 1e-6);
}

#[test]
fn categorical_cross_entropy_perfect_prediction_test() {
    let loss_fn = CategoricalCrossEntropy::new();
    let y = array![[0.0f32, 1.0], [1.0, 0.0]].into_dyn();

    let loss = loss_fn.compute_loss(&y, &y);

    assert!(loss >= 0.0);
    assert!(loss < 1e-5);
}

#[test]
fn categorical_cross_entropy_clips_zero_probability_test() {
    let loss_fn = CategoricalCrossEntropy::new();
    let y_true = array![[1.0f32, 0.0]].into_dyn();
    let y_pred = array![[0.0f32, 1.0]].into_dyn();

    let loss = loss_fn.compute_loss(&y_true, &y_pred);
    let grad = loss_fn.compute_grad(&y_true, &y_pred);

    assert!(loss.is_finite());
    assert_relative_eq!(loss, -(1e-7f32).ln(), epsilon = 1e-3);
    assert!(grad.iter().all(|g| g.is_finite()));
}

#[test]
fn categorical_cross_entropy_grad_test() {
    let loss_fn = CategoricalCrossEntropy::new();
    let y_true = array![[0.0f32, 1.0], [1.0, 0.0]].into_dyn();
    let y_pred = array![[0.5f32, 0.5], [0.25, 0.75]].into_dyn();

    let grad = loss_fn.compute_grad(&y_true, &y_pred);

    // -y / p averaged over the 2 samples
    assert_relative_eq!(grad[[0, 0]], 0.0);
    assert_relative_eq!(grad[[0, 1]], -1.0, epsilon = 1e-6);
    assert_relative_eq!(grad[[1, 0]], -2.0, epsilon = 1e-6);
    assert_relative_eq!(grad[[1, 1]], 0.0);
}

#[test]
fn categorical_cross_entropy_with_softmax_gradient_test() {
    // through softmax the gradient simplifies to (p - y) / n
    let loss_fn = CategoricalCrossEntropy::new();
    let mut softmax = Softmax::new();
    let logits = array![[0.3f32, -0.2, 1.1], [2.0, 0.1, -1.0]].into_dyn();
    let y_true = array![[0.0f32, 0.0, 1.0], [0.0, 1.0, 0.0]].into_dyn();

    let p = softmax.forward(&logits).unwrap();
    let grad_p = loss_fn.compute_grad(&y_true, &p);
    let grad_logits = softmax.backward(&grad_p).unwrap();

    for ((&g, &pi), &yi) in grad_logits.iter().zip(p.iter()).zip(y_true.iter()) {
        assert_relative_eq!(g, (pi - yi) / 2.0, epsilon = 1e-5);
    }
}
