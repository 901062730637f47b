use super::*;

const NUM_FEATURES: usize = 6;
const NUM_CLASSES: usize = 4;

fn compiled_classifier(seed: u64) -> Sequential {
    let mut model = small_classifier(NUM_FEATURES, NUM_CLASSES, seed);
    model.compile(
        Adam::with_learning_rate(0.05).unwrap(),
        CategoricalCrossEntropy::new(),
    );
    model
}

/// Records the order in which `fit` calls the hooks.
#[derive(Default)]
struct RecordingCallback {
    events: Vec<String>,
}

impl Callback for RecordingCallback {
    fn on_train_begin(&mut self, _model: &mut Sequential) -> Result<(), TrainingError> {
        self.events.push("begin".to_string());
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        epoch: usize,
        logs: &EpochLogs,
        _model: &mut Sequential,
    ) -> Result<(), TrainingError> {
        assert!(logs.val_loss.is_some());
        self.events.push(format!("epoch {}", epoch));
        Ok(())
    }

    fn on_train_end(&mut self, _model: &mut Sequential) -> Result<(), TrainingError> {
        self.events.push("end".to_string());
        Ok(())
    }
}

#[test]
fn fit_learns_separable_data_test() {
    let x = separable_inputs(40, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(40, NUM_CLASSES);
    let mut model = compiled_classifier(11);

    let options = FitOptions::new(60, 8).with_seed(Some(5)).with_verbose(false);
    let history = model.fit(&x, &y, &options, &mut []).unwrap();

    assert_eq!(history.epochs.len(), 60);
    let losses = history.loss();
    assert!(losses.iter().all(|l| l.is_finite()));
    assert!(losses[59] < losses[0]);
    assert!(history.last().unwrap().accuracy >= 0.9);
    assert!(history.last().unwrap().val_loss.is_none());

    let scores = model.evaluate(&x, &y, 16).unwrap();
    assert!(scores.accuracy >= 0.9);
}

#[test]
fn fit_runs_callbacks_in_order_test() {
    let x = separable_inputs(10, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(10, NUM_CLASSES);
    let mut model = compiled_classifier(1);
    let mut recorder = RecordingCallback::default();

    let options = FitOptions::new(3, 4)
        .with_validation_data(&x, &y)
        .with_verbose(false);
    let history = model.fit(&x, &y, &options, &mut [&mut recorder]).unwrap();

    assert_eq!(
        recorder.events,
        vec!["begin", "epoch 0", "epoch 1", "epoch 2", "end"]
    );
    assert!(history.epochs.iter().all(|e| e.val_accuracy.is_some()));
}

#[test]
fn fit_batch_larger_than_dataset_test() {
    let x = separable_inputs(5, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(5, NUM_CLASSES);
    let mut model = compiled_classifier(2);

    let options = FitOptions::new(2, 256).with_verbose(false);
    let history = model.fit(&x, &y, &options, &mut []).unwrap();

    assert_eq!(history.epochs.len(), 2);
}

#[test]
fn fit_is_reproducible_with_seed_test() {
    let x = separable_inputs(16, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(16, NUM_CLASSES);
    let options = FitOptions::new(3, 4).with_seed(Some(9)).with_verbose(false);

    let mut a = compiled_classifier(4);
    let mut b = compiled_classifier(4);
    let history_a = a.fit(&x, &y, &options, &mut []).unwrap();
    let history_b = b.fit(&x, &y, &options, &mut []).unwrap();

    assert_eq!(history_a, history_b);
}

#[test]
fn fit_requires_compile_test() {
    let x = separable_inputs(4, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(4, NUM_CLASSES);
    let mut model = small_classifier(NUM_FEATURES, NUM_CLASSES, 0);

    let result = model.fit(&x, &y, &FitOptions::new(1, 2).with_verbose(false), &mut []);

    assert!(matches!(
        result,
        Err(TrainingError::Model(ModelError::InputValidationError(_)))
    ));
}

#[test]
fn fit_rejects_bad_inputs_test() {
    let x = separable_inputs(4, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(3, NUM_CLASSES);
    let mut model = compiled_classifier(0);
    let quiet = FitOptions::new(1, 2).with_verbose(false);

    // sample counts differ
    assert!(model.fit(&x, &y, &quiet, &mut []).is_err());

    // zero batch size
    let y = one_hot_cycle(4, NUM_CLASSES);
    let zero_batch = FitOptions::new(1, 0).with_verbose(false);
    assert!(model.fit(&x, &y, &zero_batch, &mut []).is_err());

    // wrong feature width
    let narrow = Array2::<f32>::ones((4, NUM_FEATURES - 1)).into_dyn();
    assert!(model.fit(&narrow, &y, &quiet, &mut []).is_err());
}

#[test]
fn predict_outputs_probabilities_test() {
    let x = separable_inputs(70, NUM_FEATURES, NUM_CLASSES);
    let mut model = compiled_classifier(3);

    let predictions = model.predict(&x).unwrap();

    assert_eq!(predictions.shape(), &[70, NUM_CLASSES]);
    for row in predictions.outer_iter() {
        assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-5);
    }

    // batching does not change the result
    let single_batch = model.predict_with_batch_size(&x, 70).unwrap();
    for (a, b) in predictions.iter().zip(single_batch.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }

    let classes = model.predict_classes(&x).unwrap();
    assert_eq!(classes.len(), 70);
    assert!(classes.iter().all(|&c| c < NUM_CLASSES));
}

#[test]
fn predict_errors_test() {
    let mut empty_model = Sequential::new();
    let x = Array2::<f32>::ones((2, NUM_FEATURES)).into_dyn();
    assert!(empty_model.predict(&x).is_err());

    let mut model = compiled_classifier(0);
    let empty = Array2::<f32>::zeros((0, NUM_FEATURES)).into_dyn();
    assert!(model.predict(&empty).is_err());
    assert!(model.predict_with_batch_size(&x, 0).is_err());
}

#[test]
fn evaluate_scores_test() {
    let x = separable_inputs(8, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(8, NUM_CLASSES);
    let mut model = compiled_classifier(6);

    let scores = model.evaluate(&x, &y, 3).unwrap();

    assert!(scores.loss.is_finite() && scores.loss > 0.0);
    assert!((0.0..=1.0).contains(&scores.accuracy));
    assert_eq!(
        scores.to_string(),
        format!("[{}, {}]", scores.loss, scores.accuracy)
    );
}

#[test]
fn summary_names_layers_test() {
    let mut model = Sequential::new();
    model
        .add(Dense::new(784, 256).unwrap())
        .add(ReLU::new())
        .add(Dense::new(256, 128).unwrap())
        .add(ReLU::new())
        .add(Dense::new(128, 10).unwrap())
        .add(Softmax::new());

    let summary = model.summary_string();

    assert!(summary.contains("dense (Dense)"));
    assert!(summary.contains("dense_1 (Dense)"));
    assert!(summary.contains("dense_2 (Dense)"));
    assert!(summary.contains("relu (ReLU)"));
    assert!(summary.contains("relu_1 (ReLU)"));
    assert!(summary.contains("softmax (Softmax)"));
    assert!(summary.contains("Total params: 235146"));
    assert_eq!(model.count_params(), 235_146);
}

#[test]
fn activation_shapes_follow_previous_layer_test() {
    let mut model = small_classifier(NUM_FEATURES, NUM_CLASSES, 4);

    let shapes = |model: &Sequential| -> Vec<String> {
        model.graph().into_iter().map(|l| l.output_shape).collect()
    };
    let expected = vec![
        "(None, 8)".to_string(),
        "(None, 8)".to_string(),
        format!("(None, {})", NUM_CLASSES),
        format!("(None, {})", NUM_CLASSES),
    ];

    assert_eq!(shapes(&model), expected);
    assert!(!model.summary_string().contains("Unknown"));

    // a forward pass does not leak the batch size into the table
    model.predict(&separable_inputs(3, NUM_FEATURES, NUM_CLASSES)).unwrap();
    assert_eq!(shapes(&model), expected);
    assert!(!model.summary_string().contains("(3, "));
}

#[test]
fn layer_names_test() {
    let model = small_classifier(NUM_FEATURES, NUM_CLASSES, 0);
    assert_eq!(model.layer_names(), vec!["dense", "relu", "dense_1", "softmax"]);

    let names: Vec<String> = model.graph().into_iter().map(|l| l.name).collect();
    assert_eq!(names, model.layer_names());
}

#[test]
fn graph_lists_layers_test() {
    let model = small_classifier(NUM_FEATURES, NUM_CLASSES, 0);
    let graph = model.graph();

    let types: Vec<&str> = graph.iter().map(|l| l.layer_type.as_str()).collect();
    assert_eq!(types, vec!["Dense", "ReLU", "Dense", "Softmax"]);
    assert_eq!(graph[0].output_shape, "(None, 8)");
}

#[test]
fn save_and_load_weights_test() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let x = separable_inputs(6, NUM_FEATURES, NUM_CLASSES);

    let mut original = compiled_classifier(21);
    original.save_to_path(&path).unwrap();
    let expected = original.predict(&x).unwrap();

    let mut restored = small_classifier(NUM_FEATURES, NUM_CLASSES, 99);
    restored.load_from_path(&path).unwrap();
    let actual = restored.predict(&x).unwrap();

    for (a, b) in expected.iter().zip(actual.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn load_into_different_architecture_test() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    small_classifier(NUM_FEATURES, NUM_CLASSES, 0)
        .save_to_path(&path)
        .unwrap();

    let mut wider = small_classifier(NUM_FEATURES + 1, NUM_CLASSES, 0);
    assert!(matches!(
        wider.load_from_path(&path),
        Err(IoError::InvalidData(_))
    ));

    let mut shorter = Sequential::new();
    shorter.add(Dense::new(NUM_FEATURES, 8).unwrap());
    assert!(matches!(
        shorter.load_from_path(&path),
        Err(IoError::InvalidData(_))
    ));
}
