use mnist_dnn::config::TrainingConfig;
use mnist_dnn::logging::install_file_logger;
use mnist_dnn::trainer::{LOG_FILE_NAME, run};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = TrainingConfig::dense_model().with_env_overrides();
    install_file_logger(config.run_dir().join(LOG_FILE_NAME))?;

    let report = run(&config)?;
    log::info!(
        "Finished {} epochs, test accuracy {:.4}",
        report.history.epochs.len(),
        report.scores.accuracy
    );

    Ok(())
}
