use mnist_dnn::config::TrainingConfig;
use mnist_dnn::logging::install_file_logger;
use mnist_dnn::trainer::{LOG_FILE_NAME, run};

const EPOCHS: u32 = 5;
const BATCH_SIZE: usize = 256;
const LEARNING_RATE: f32 = 0.001;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config =
        TrainingConfig::confusion_matrix_model(EPOCHS, BATCH_SIZE, LEARNING_RATE).with_env_overrides();
    install_file_logger(config.run_dir().join(LOG_FILE_NAME))?;

    let report = run(&config)?;
    if let Some(matrix) = &report.confusion_matrix {
        log::info!("Final epoch {}", matrix.summary());
    }

    Ok(())
}
