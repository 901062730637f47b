use super::*;
use crate::metric::ConfusionMatrix;

const NUM_FEATURES: usize = 5;
const NUM_CLASSES: usize = 3;

fn trained_with(
    epochs: u32,
    x: &Tensor,
    y: &Tensor,
    callbacks: &mut [&mut dyn Callback],
) -> History {
    let mut model = small_classifier(NUM_FEATURES, NUM_CLASSES, 8);
    model.compile(SGD::new(0.1).unwrap(), CategoricalCrossEntropy::new());
    let options = FitOptions::new(epochs, 4)
        .with_validation_data(x, y)
        .with_verbose(false);
    model.fit(x, y, &options, callbacks).unwrap()
}

#[test]
fn history_accessors_test() {
    let logs = |loss: f32| EpochLogs {
        loss,
        accuracy: 1.0 - loss,
        val_loss: None,
        val_accuracy: None,
    };
    let history = History {
        epochs: vec![logs(0.75), logs(0.5)],
    };

    assert_eq!(history.loss(), vec![0.75, 0.5]);
    assert_eq!(history.accuracy(), vec![0.25, 0.5]);
    assert_eq!(history.last().unwrap().loss, 0.5);
    assert!(History::default().last().is_none());
}

#[test]
fn tensor_board_writes_scalars_and_histograms_test() {
    let dir = tempfile::tempdir().unwrap();
    let x = separable_inputs(8, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(8, NUM_CLASSES);
    let mut tensorboard = TensorBoard::new(dir.path()).with_histogram_freq(1);

    trained_with(2, &x, &y, &mut [&mut tensorboard]);

    let train = read_events(tensorboard.train_dir().join(EVENTS_FILE_NAME)).unwrap();
    let scalar_tags: Vec<&str> = train
        .iter()
        .filter(|e| matches!(e.value, SummaryValue::Scalar { .. }))
        .map(|e| e.tag.as_str())
        .collect();
    assert_eq!(
        scalar_tags,
        vec!["epoch_loss", "epoch_accuracy", "epoch_loss", "epoch_accuracy"]
    );

    // two dense layers, kernel and bias each, for both epochs
    let histograms: Vec<&SummaryEvent> = train
        .iter()
        .filter(|e| matches!(e.value, SummaryValue::Histogram(_)))
        .collect();
    assert_eq!(histograms.len(), 8);
    // tags follow the summary's layer names
    assert!(histograms.iter().any(|e| e.tag == "dense/kernel"));
    assert!(histograms.iter().any(|e| e.tag == "dense_1/bias"));
    assert!(!histograms.iter().any(|e| e.tag.starts_with("dense_2")));

    let validation = read_events(tensorboard.validation_dir().join(EVENTS_FILE_NAME)).unwrap();
    assert_eq!(validation.len(), 4);
    assert_eq!(validation[3].step, 1);

    let graph = std::fs::read_to_string(tensorboard.train_dir().join(GRAPH_FILE_NAME)).unwrap();
    let layers: Vec<LayerInfo> = serde_json::from_str(&graph).unwrap();
    assert_eq!(layers.len(), 4);
    assert_eq!(layers[1].name, "relu");
    assert_eq!(layers[1].output_shape, "(None, 8)");
    assert_eq!(layers[3].output_shape, format!("(None, {})", NUM_CLASSES));
}

#[test]
fn tensor_board_histogram_frequency_test() {
    let dir = tempfile::tempdir().unwrap();
    let x = separable_inputs(8, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(8, NUM_CLASSES);
    let mut tensorboard = TensorBoard::new(dir.path())
        .with_histogram_freq(2)
        .with_write_graph(false);

    trained_with(3, &x, &y, &mut [&mut tensorboard]);

    let train = read_events(tensorboard.train_dir().join(EVENTS_FILE_NAME)).unwrap();
    let histogram_steps: Vec<u64> = train
        .iter()
        .filter(|e| matches!(e.value, SummaryValue::Histogram(_)))
        .map(|e| e.step)
        .collect();
    // epochs 0 and 2, four histograms each
    assert_eq!(histogram_steps, vec![0, 0, 0, 0, 2, 2, 2, 2]);
    assert!(!tensorboard.train_dir().join(GRAPH_FILE_NAME).exists());
}

#[test]
fn tensor_board_without_histograms_test() {
    let dir = tempfile::tempdir().unwrap();
    let x = separable_inputs(4, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(4, NUM_CLASSES);
    let mut tensorboard = TensorBoard::new(dir.path());
    assert_eq!(tensorboard.get_histogram_freq(), 0);
    assert!(tensorboard.get_write_graph());

    trained_with(1, &x, &y, &mut [&mut tensorboard]);

    let train = read_events(tensorboard.train_dir().join(EVENTS_FILE_NAME)).unwrap();
    assert_eq!(train.len(), 2);
}

#[test]
fn confusion_matrix_callback_validation_test() {
    let dir = tempfile::tempdir().unwrap();
    let x = separable_inputs(6, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(6, NUM_CLASSES);
    let names = |n: usize| (0..n).map(|c| c.to_string()).collect::<Vec<_>>();

    assert!(ConfusionMatrixCallback::new(x.clone(), y.clone(), names(2), dir.path()).is_err());
    assert!(
        ConfusionMatrixCallback::new(
            x.clone(),
            one_hot_cycle(5, NUM_CLASSES),
            names(NUM_CLASSES),
            dir.path()
        )
        .is_err()
    );
    assert!(
        ConfusionMatrixCallback::new(
            Array1::<f32>::zeros(6).into_dyn(),
            y.clone(),
            names(NUM_CLASSES),
            dir.path()
        )
        .is_err()
    );

    let callback = ConfusionMatrixCallback::new(x, y, names(NUM_CLASSES), dir.path()).unwrap();
    assert_eq!(callback.get_class_names(), &["0", "1", "2"]);
    assert!(callback.last_matrix().is_none());
}

#[test]
fn confusion_matrix_callback_logs_every_epoch_test() {
    let dir = tempfile::tempdir().unwrap();
    let x = separable_inputs(9, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(9, NUM_CLASSES);
    let names = (0..NUM_CLASSES).map(|c| c.to_string()).collect();
    let mut tensorboard = TensorBoard::new(dir.path());
    let mut callback =
        ConfusionMatrixCallback::new(x.clone(), y.clone(), names, dir.path()).unwrap();

    trained_with(2, &x, &y, &mut [&mut tensorboard, &mut callback]);

    let matrix = callback.last_matrix().unwrap();
    assert_eq!(matrix.total(), 9);
    assert_eq!(matrix.num_classes(), NUM_CLASSES);

    for epoch in 0..2 {
        let image = callback
            .images_dir()
            .join(format!("confusion_matrix_epoch_{}.png", epoch));
        assert!(image.is_file());
    }

    // the image events share the validation stream with the scalar summaries
    let validation = read_events(tensorboard.validation_dir().join(EVENTS_FILE_NAME)).unwrap();
    let images: Vec<&SummaryEvent> = validation
        .iter()
        .filter(|e| e.tag == CONFUSION_MATRIX_TAG)
        .collect();
    assert_eq!(images.len(), 2);
    assert_eq!(images[1].step, 1);
    assert!(matches!(
        &images[0].value,
        SummaryValue::Image { path, .. } if path == "images/confusion_matrix_epoch_0.png"
    ));
    assert_eq!(validation.len(), 6);
}

#[test]
fn confusion_matrix_compute_test() {
    let dir = tempfile::tempdir().unwrap();
    let x = separable_inputs(12, NUM_FEATURES, NUM_CLASSES);
    let y = one_hot_cycle(12, NUM_CLASSES);
    let names = (0..NUM_CLASSES).map(|c| format!("class {}", c)).collect();
    let callback = ConfusionMatrixCallback::new(x.clone(), y, names, dir.path()).unwrap();
    let mut model = small_classifier(NUM_FEATURES, NUM_CLASSES, 0);

    let matrix = callback.compute(&mut model).unwrap();

    // every row holds the samples of one true class
    for class in 0..NUM_CLASSES {
        assert_eq!(matrix.counts().row(class).sum(), 4);
    }
    let predicted = model.predict_classes(&x).unwrap();
    for class in 0..NUM_CLASSES {
        let count = predicted.iter().filter(|&&p| p == class).count() as u64;
        assert_eq!(matrix.counts().column(class).sum(), count);
    }
}

#[test]
fn render_confusion_matrix_test() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cm.png");
    let matrix = ConfusionMatrix::new(
        &Array1::from(vec![0usize, 0, 1, 1]),
        &Array1::from(vec![0usize, 1, 1, 1]),
        2,
    )
    .unwrap();

    let names = vec!["0".to_string(), "1".to_string()];

    let (width, height) = render_confusion_matrix(&matrix, &names, &path).unwrap();

    // 18 px of row labels and 22 px of column labels around a 67 px grid
    assert_eq!((width, height), (85, 89));
    let image = image::open(&path).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (85, 89));

    // a 100% cell is darker than a 50% cell
    let full = image.get_pixel(18 + 1 + 33 + 16, 22 + 1 + 33 + 16);
    let half = image.get_pixel(18 + 1 + 16, 22 + 1 + 16);
    assert!(full[0] < half[0]);

    // top stroke of the "0" left of the first row, of the "1" above the second column
    assert_eq!(image.get_pixel(6, 32).0, [0, 0, 0]);
    assert_eq!(image.get_pixel(4, 32).0, [255, 255, 255]);
    assert_eq!(image.get_pixel(67, 4).0, [0, 0, 0]);
    assert_eq!(image.get_pixel(63, 4).0, [255, 255, 255]);

    let three_names = vec!["0".to_string(), "1".to_string(), "2".to_string()];
    assert!(render_confusion_matrix(&matrix, &three_names, &path).is_err());
}

#[test]
fn render_confusion_matrix_long_names_test() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cm.png");
    let matrix = ConfusionMatrix::new(
        &Array1::from(vec![0usize, 1, 2]),
        &Array1::from(vec![0usize, 1, 2]),
        3,
    )
    .unwrap();
    let names: Vec<String> = ["T-shirt", "Trouser", "Pullover sweater"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let (width, height) = render_confusion_matrix(&matrix, &names, &path).unwrap();

    // row labels are cut to 8 characters: 8 * 12 - 2 px plus padding
    let grid = 3 * 32 + 4;
    assert_eq!((width, height), (8 + 94 + grid, 22 + grid));
}
