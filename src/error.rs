use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Failure while building, training or running a model.
///
/// # Variants
///
/// - `InputValidationError` - A shape, count or hyperparameter passed in is unusable
/// - `ProcessingError` - Layers were called out of order or produced mismatched shapes
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    InputValidationError(String),
    ProcessingError(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InputValidationError(msg) => write!(f, "Input validation error: {}", msg),
            ModelError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

/// Failure touching the file system: IDX files, summaries, PNGs, configs and saved weights.
///
/// # Variants
///
/// - `StdIoError` - Opening, reading or writing a file failed
/// - `JsonError` - A JSON document could not be encoded or decoded
/// - `ImageError` - Encoding a rendered PNG failed
/// - `InvalidData` - A file was read but its content is malformed, e.g. a bad IDX magic number
#[derive(Debug)]
pub enum IoError {
    StdIoError(std::io::Error),
    JsonError(serde_json::Error),
    ImageError(image::ImageError),
    InvalidData(String),
}

impl IoError {
    /// Opens `path` for buffered reading.
    pub fn load_in_buf_reader<P: AsRef<Path>>(path: P) -> Result<BufReader<File>, IoError> {
        let file = File::open(path).map_err(IoError::StdIoError)?;
        Ok(BufReader::new(file))
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::StdIoError(e) => write!(f, "IO error: {}", e),
            IoError::JsonError(e) => write!(f, "JSON error: {}", e),
            IoError::ImageError(e) => write!(f, "Image error: {}", e),
            IoError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::StdIoError(e) => Some(e),
            IoError::JsonError(e) => Some(e),
            IoError::ImageError(e) => Some(e),
            IoError::InvalidData(_) => None,
        }
    }
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::StdIoError(e)
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::JsonError(e)
    }
}

impl From<image::ImageError> for IoError {
    fn from(e: image::ImageError) -> Self {
        IoError::ImageError(e)
    }
}

/// Errors raised by a training run, which mixes numerical work with file output
///
/// # Variants
///
/// - `Model` - A layer, loss, optimizer or shape check failed
/// - `Io` - Reading the dataset or writing logs, images or weights failed
#[derive(Debug)]
pub enum TrainingError {
    Model(ModelError),
    Io(IoError),
}

impl std::fmt::Display for TrainingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainingError::Model(e) => write!(f, "{}", e),
            TrainingError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TrainingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrainingError::Model(e) => Some(e),
            TrainingError::Io(e) => Some(e),
        }
    }
}

impl From<ModelError> for TrainingError {
    fn from(e: ModelError) -> Self {
        TrainingError::Model(e)
    }
}

impl From<IoError> for TrainingError {
    fn from(e: IoError) -> Self {
        TrainingError::Io(e)
    }
}

impl From<std::io::Error> for TrainingError {
    fn from(e: std::io::Error) -> Self {
        TrainingError::Io(IoError::StdIoError(e))
    }
}
