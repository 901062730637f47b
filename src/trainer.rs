use crate::config::{ModelArchitecture, TrainingConfig};
use crate::dataset::{Split, get_dataset};
use crate::error::{IoError, ModelError, TrainingError};
use crate::metric::ConfusionMatrix;
use crate::neural_network::*;
use std::fs::create_dir_all;
use std::path::PathBuf;

/// File name of the saved weights inside `models_dir`.
pub const MODEL_FILE_NAME: &str = "mnist_model.json";
/// File name of the experiment log inside the run directory.
pub const LOG_FILE_NAME: &str = "experiment.log";

/// Half-width of the uniform range the hidden kernels are drawn from.
const HIDDEN_KERNEL_LIMIT: f32 = 0.05;

/// Locations used by one run, created by `prepare_directories`.
///
/// # Fields
///
/// - `models_dir` - Directory of saved weights
/// - `logs_dir` - Root of all runs' logs
/// - `run_dir` - `logs_dir/run_name`, receiving this run's summaries
/// - `model_file` - Where the weights are saved when `save_model` is set
/// - `log_file` - Experiment log of this run
#[derive(Debug, Clone, PartialEq)]
pub struct RunPaths {
    pub models_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub run_dir: PathBuf,
    pub model_file: PathBuf,
    pub log_file: PathBuf,
}

/// Outcome of a full run.
///
/// # Fields
///
/// - `history` - Per-epoch training and validation metrics
/// - `scores` - Loss and accuracy on the test split after training
/// - `confusion_matrix` - Matrix of the last epoch, when the callback was attached
/// - `paths` - Directories and files used by the run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub history: History,
    pub scores: Scores,
    pub confusion_matrix: Option<ConfusionMatrix>,
    pub paths: RunPaths,
}

/// Creates `models_dir`, `logs_dir` and the run directory if they do not exist yet.
///
/// # Returns
///
/// - `Ok(RunPaths)` - The directories and the file locations derived from them
/// - `Err(IoError::StdIoError)` - A directory could not be created
pub fn prepare_directories(config: &TrainingConfig) -> Result<RunPaths, IoError> {
    let run_dir = config.run_dir();

    for dir in [&config.models_dir, &config.logs_dir, &run_dir] {
        create_dir_all(dir)?;
    }

    Ok(RunPaths {
        models_dir: config.models_dir.clone(),
        logs_dir: config.logs_dir.clone(),
        model_file: config.models_dir.join(MODEL_FILE_NAME),
        log_file: run_dir.join(LOG_FILE_NAME),
        run_dir,
    })
}

/// Builds the digit classifier.
///
/// Every hidden layer is a `Dense` layer with a `RandomUniform(-0.05, 0.05)` kernel and a
/// zero bias, followed by `ReLU`. The output is a `Dense` layer of `num_classes` units with a
/// Glorot uniform kernel and zero bias, followed by `Softmax`.
///
/// # Parameters
///
/// - `num_features` - Input width
/// - `num_classes` - Output width
/// - `architecture` - Hidden-layer layout
/// - `seed` - Seed of the initial weights; `None` draws from OS entropy
///
/// # Returns
///
/// - `Ok(Sequential)` - The uncompiled model
/// - `Err(ModelError::InputValidationError)` - A width is zero
pub fn build_model(
    num_features: usize,
    num_classes: usize,
    architecture: ModelArchitecture,
    seed: Option<u64>,
) -> Result<Sequential, ModelError> {
    let kernel = Initializer::RandomUniform {
        minval: -HIDDEN_KERNEL_LIMIT,
        maxval: HIDDEN_KERNEL_LIMIT,
    };
    let bias = Initializer::Constant(0.0);
    // each layer gets its own stream so layers of equal shape do not start identical
    let layer_seed = |i: usize| seed.map(|s| s.wrapping_add(i as u64));

    let mut model = Sequential::new();
    let mut input_dim = num_features;

    for (i, &units) in architecture.hidden_units().iter().enumerate() {
        model
            .add(Dense::with_initializers(input_dim, units, kernel, bias, layer_seed(i))?)
            .add(ReLU::new());
        input_dim = units;
    }

    let output_seed = layer_seed(architecture.hidden_units().len());
    model
        .add(Dense::with_initializers(
            input_dim,
            num_classes,
            Initializer::GlorotUniform,
            Initializer::Zeros,
            output_seed,
        )?)
        .add(Softmax::new());

    Ok(model)
}

/// Formats an array shape like `(60000, 784)`.
pub fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("({})", dims.join(", "))
}

/// Runs the whole program: directories, MNIST loading, training, evaluation.
///
/// # Returns
///
/// - `Ok(TrainingReport)` - Scores, history and output locations
/// - `Err(TrainingError)` - Invalid configuration, missing data, or a failure while training
///   or writing logs
pub fn run(config: &TrainingConfig) -> Result<TrainingReport, TrainingError> {
    config.validate()?;
    let paths = prepare_directories(config)?;
    print_directories(&paths);

    let (train, test) = get_dataset(&config.data_dir, config.num_features, config.num_classes)?;
    train_and_evaluate(config, paths, &train, &test)
}

/// Same as `run` on splits that are already in memory, e.g. from `synthetic_splits`.
pub fn run_with_splits(
    config: &TrainingConfig,
    train: &Split,
    test: &Split,
) -> Result<TrainingReport, TrainingError> {
    config.validate()?;
    let paths = prepare_directories(config)?;
    print_directories(&paths);

    train_and_evaluate(config, paths, train, test)
}

fn print_directories(paths: &RunPaths) {
    println!("Model directory: {}", paths.models_dir.display());
    println!("Log directory: {}", paths.logs_dir.display());
}

fn train_and_evaluate(
    config: &TrainingConfig,
    paths: RunPaths,
    train: &Split,
    test: &Split,
) -> Result<TrainingReport, TrainingError> {
    for (name, split) in [("train", train), ("test", test)] {
        if split.x.ncols() != config.num_features || split.y.ncols() != config.num_classes {
            return Err(TrainingError::Model(ModelError::InputValidationError(format!(
                "The {} split has {} features and {} classes, expected {} and {}",
                name,
                split.x.ncols(),
                split.y.ncols(),
                config.num_features,
                config.num_classes
            ))));
        }
    }

    println!("x_train shape: {}", format_shape(train.x.shape()));
    println!("y_train shape: {}", format_shape(train.y.shape()));
    println!("x_test shape: {}", format_shape(test.x.shape()));
    println!("y_test shape: {}", format_shape(test.y.shape()));

    let mut model = build_model(
        config.num_features,
        config.num_classes,
        config.architecture,
        config.seed,
    )?;
    model.summary();

    model.compile_boxed(config.optimizer.build()?, CategoricalCrossEntropy::new());
    log::info!(
        "Compiled {:?} model with {} (learning rate {})",
        config.architecture,
        model.get_optimizer_name().unwrap_or("no optimizer"),
        config.optimizer.learning_rate()
    );

    let (x_train, y_train) = train.to_tensors();
    let (x_test, y_test) = test.to_tensors();

    let mut tensorboard = TensorBoard::new(&paths.run_dir)
        .with_histogram_freq(config.histogram_freq)
        .with_write_graph(config.write_graph);

    let mut confusion_callback = if config.confusion_matrix {
        let class_names = (0..config.num_classes).map(|c| c.to_string()).collect();
        Some(ConfusionMatrixCallback::new(
            x_test.clone(),
            y_test.clone(),
            class_names,
            &paths.run_dir,
        )?)
    } else {
        None
    };

    let mut callbacks: Vec<&mut dyn Callback> = vec![&mut tensorboard];
    if let Some(callback) = confusion_callback.as_mut() {
        callbacks.push(callback);
    }

    let options = FitOptions::new(config.epochs, config.batch_size)
        .with_validation_data(&x_test, &y_test)
        .with_seed(config.seed)
        .with_verbose(config.verbose);

    let history = model.fit(&x_train, &y_train, &options, &mut callbacks)?;

    let scores = model.evaluate(&x_test, &y_test, DEFAULT_PREDICT_BATCH_SIZE)?;
    println!("Scores: {}", scores);
    log::info!("Test loss {:.6}, test accuracy {:.6}", scores.loss, scores.accuracy);

    if config.save_model {
        model.save_to_path(&paths.model_file)?;
    }

    Ok(TrainingReport {
        history,
        scores,
        confusion_matrix: confusion_callback.and_then(|c| c.last_matrix().cloned()),
        paths,
    })
}
