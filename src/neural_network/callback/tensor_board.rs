use super::*;
use std::fs::File;
use std::io::BufWriter;

/// Sub-directory of the run directory receiving training summaries.
pub const TRAIN_DIR_NAME: &str = "train";
/// Sub-directory of the run directory receiving validation summaries.
pub const VALIDATION_DIR_NAME: &str = "validation";
/// File name of the layer graph written at train begin.
pub const GRAPH_FILE_NAME: &str = "graph.json";

/// Opens the writer of a summary stream on first use.
fn open_writer<'a>(
    slot: &'a mut Option<SummaryWriter>,
    dir: &Path,
) -> Result<&'a mut SummaryWriter, IoError> {
    if slot.is_none() {
        *slot = Some(SummaryWriter::new(dir)?);
    }
    slot.as_mut()
        .ok_or_else(|| IoError::InvalidData(format!("No summary writer for {}", dir.display())))
}

/// Callback that records the progress of `Sequential::fit` under a run directory.
///
/// Layout written below `log_dir`:
///
/// - `train/events.jsonl` - `epoch_loss`, `epoch_accuracy` and weight histograms
/// - `validation/events.jsonl` - `epoch_loss` and `epoch_accuracy` of the validation data
/// - `train/graph.json` - layer list of the model, when `write_graph` is set
///
/// # Fields
///
/// - `log_dir` - Run directory, e.g. `logs/mnist_model2`
/// - `histogram_freq` - Write weight histograms every this many epochs; 0 disables them
/// - `write_graph` - Whether to write the layer graph at train begin
///
/// # Example
/// ```rust
/// use mnist_dnn::neural_network::TensorBoard;
///
/// let tensorboard = TensorBoard::new("logs/mnist_model2")
///     .with_histogram_freq(1)
///     .with_write_graph(true);
/// assert_eq!(tensorboard.get_histogram_freq(), 1);
/// ```
pub struct TensorBoard {
    log_dir: PathBuf,
    histogram_freq: usize,
    write_graph: bool,
    train_writer: Option<SummaryWriter>,
    validation_writer: Option<SummaryWriter>,
}

impl TensorBoard {
    /// Creates the callback with histograms disabled and graph writing enabled.
    pub fn new<P: AsRef<Path>>(log_dir: P) -> Self {
        Self {
            log_dir: log_dir.as_ref().to_path_buf(),
            histogram_freq: 0,
            write_graph: true,
            train_writer: None,
            validation_writer: None,
        }
    }

    /// Sets how often (in epochs) weight histograms are written.
    pub fn with_histogram_freq(mut self, histogram_freq: usize) -> Self {
        self.histogram_freq = histogram_freq;
        self
    }

    /// Sets whether the layer graph is written at train begin.
    pub fn with_write_graph(mut self, write_graph: bool) -> Self {
        self.write_graph = write_graph;
        self
    }

    pub fn get_log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn get_histogram_freq(&self) -> usize {
        self.histogram_freq
    }

    pub fn get_write_graph(&self) -> bool {
        self.write_graph
    }

    /// Directory of the training stream.
    pub fn train_dir(&self) -> PathBuf {
        self.log_dir.join(TRAIN_DIR_NAME)
    }

    /// Directory of the validation stream.
    pub fn validation_dir(&self) -> PathBuf {
        self.log_dir.join(VALIDATION_DIR_NAME)
    }

    fn write_graph_file(&self, model: &Sequential) -> Result<(), IoError> {
        let path = self.train_dir().join(GRAPH_FILE_NAME);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, &model.graph())?;
        log::debug!("Model graph written to {}", path.display());
        Ok(())
    }

    fn write_histograms(&mut self, model: &Sequential, step: u64) -> Result<(), IoError> {
        let train_dir = self.train_dir();
        let writer = open_writer(&mut self.train_writer, &train_dir)?;

        for (name, weights) in model.layer_names().iter().zip(model.get_weights()) {
            if let Some(dense) = weights.as_dense() {
                writer.add_histogram(
                    &format!("{}/kernel", name),
                    dense.kernel.iter().cloned(),
                    step,
                )?;
                writer.add_histogram(
                    &format!("{}/bias", name),
                    dense.bias.iter().cloned(),
                    step,
                )?;
            }
        }

        Ok(())
    }
}

impl Callback for TensorBoard {
    fn on_train_begin(&mut self, model: &mut Sequential) -> Result<(), TrainingError> {
        let train_dir = self.train_dir();
        let validation_dir = self.validation_dir();
        open_writer(&mut self.train_writer, &train_dir)?;
        open_writer(&mut self.validation_writer, &validation_dir)?;

        if self.write_graph {
            self.write_graph_file(model)?;
        }

        log::info!("TensorBoard summaries go to {}", self.log_dir.display());
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        epoch: usize,
        logs: &EpochLogs,
        model: &mut Sequential,
    ) -> Result<(), TrainingError> {
        let step = epoch as u64;

        let train_dir = self.train_dir();
        let train = open_writer(&mut self.train_writer, &train_dir)?;
        train.add_scalar("epoch_loss", logs.loss, step)?;
        train.add_scalar("epoch_accuracy", logs.accuracy, step)?;

        if let (Some(val_loss), Some(val_accuracy)) = (logs.val_loss, logs.val_accuracy) {
            let validation_dir = self.validation_dir();
            let validation = open_writer(&mut self.validation_writer, &validation_dir)?;
            validation.add_scalar("epoch_loss", val_loss, step)?;
            validation.add_scalar("epoch_accuracy", val_accuracy, step)?;
        }

        if self.histogram_freq > 0 && epoch % self.histogram_freq == 0 {
            self.write_histograms(model, step)?;
        }

        Ok(())
    }

    fn on_train_end(&mut self, _model: &mut Sequential) -> Result<(), TrainingError> {
        self.train_writer = None;
        self.validation_writer = None;
        Ok(())
    }
}
