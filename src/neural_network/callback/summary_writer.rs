use super::*;
use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{BufWriter, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Name of the event file inside every summary directory.
pub const EVENTS_FILE_NAME: &str = "events.jsonl";

/// Number of equal-width buckets used by `Histogram::from_values`.
pub const HISTOGRAM_BUCKETS: usize = 30;

/// Distribution summary of a set of values, e.g. the entries of a kernel matrix.
///
/// `bucket_limits[i]` is the upper edge of bucket `i`; the lower edge of bucket 0 is `min`.
///
/// # Fields
///
/// - `min` - Smallest value
/// - `max` - Largest value
/// - `num` - Number of values
/// - `sum` - Sum of the values
/// - `sum_squares` - Sum of the squared values
/// - `bucket_limits` - Upper edge of each bucket
/// - `bucket_counts` - Number of values in each bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub num: u64,
    pub sum: f64,
    pub sum_squares: f64,
    pub bucket_limits: Vec<f64>,
    pub bucket_counts: Vec<u64>,
}

impl Histogram {
    /// Builds a histogram with `HISTOGRAM_BUCKETS` equal-width buckets between min and max.
    ///
    /// # Returns
    ///
    /// - `Ok(Histogram)` - The summary of all values
    /// - `Err(ModelError::InputValidationError)` - If there are no values or a value is not finite
    pub fn from_values<I>(values: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = f32>,
    {
        let values: Vec<f64> = values.into_iter().map(f64::from).collect();

        if values.is_empty() {
            return Err(ModelError::InputValidationError(
                "Cannot build a histogram from no values".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InputValidationError(
                "Histogram values must be finite".to_string(),
            ));
        }

        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let width = (max - min) / HISTOGRAM_BUCKETS as f64;

        let mut bucket_limits: Vec<f64> = (1..=HISTOGRAM_BUCKETS)
            .map(|i| min + width * i as f64)
            .collect();
        // keep the last edge exact so the maximum always falls inside it
        bucket_limits[HISTOGRAM_BUCKETS - 1] = max;

        let mut bucket_counts = vec![0u64; HISTOGRAM_BUCKETS];
        for &v in &values {
            let index = if width > 0.0 {
                (((v - min) / width) as usize).min(HISTOGRAM_BUCKETS - 1)
            } else {
                0
            };
            bucket_counts[index] += 1;
        }

        Ok(Self {
            min,
            max,
            num: values.len() as u64,
            sum: values.iter().sum(),
            sum_squares: values.iter().map(|v| v * v).sum(),
            bucket_limits,
            bucket_counts,
        })
    }
}

/// Payload of a summary event, tagged by `kind` in the serialized form.
///
/// # Variants
///
/// - `Scalar` - A single number such as `epoch_loss`
/// - `Histogram` - A value distribution
/// - `Image` - A PNG file, referenced relative to the summary directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SummaryValue {
    Scalar { value: f32 },
    Histogram(Histogram),
    Image { path: String, width: u32, height: u32 },
}

/// One line of an `events.jsonl` file.
///
/// # Fields
///
/// - `wall_time` - Seconds since the Unix epoch when the event was written
/// - `step` - Training step the value belongs to (the epoch index for epoch summaries)
/// - `tag` - Series name, e.g. `epoch_accuracy`
/// - `value` - The payload, flattened into the same JSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEvent {
    pub wall_time: f64,
    pub step: u64,
    pub tag: String,
    #[serde(flatten)]
    pub value: SummaryValue,
}

/// Appends summary events to `<dir>/events.jsonl`, one JSON object per line.
///
/// Several writers may share the same directory: every event is flushed as soon as it is
/// written, so the lines of different writers never interleave.
///
/// # Example
/// ```rust
/// use mnist_dnn::neural_network::SummaryWriter;
///
/// let dir = std::env::temp_dir().join("mnist_dnn_summary_doc");
/// let mut writer = SummaryWriter::new(&dir).unwrap();
/// writer.add_scalar("epoch_loss", 0.25, 0).unwrap();
/// writer.add_histogram("dense/kernel", vec![0.1, -0.2, 0.05], 0).unwrap();
/// ```
pub struct SummaryWriter {
    dir: PathBuf,
    writer: BufWriter<File>,
}

impl SummaryWriter {
    /// Opens (creating if needed) the event file of a summary directory.
    ///
    /// # Parameters
    ///
    /// - `dir` - Summary directory, e.g. `logs/mnist_cm/validation`
    ///
    /// # Returns
    ///
    /// - `Ok(SummaryWriter)` - Writer positioned at the end of the event file
    /// - `Err(IoError::StdIoError)` - The directory or file could not be created
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, IoError> {
        let dir = dir.as_ref().to_path_buf();
        create_dir_all(&dir)?;

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(dir.join(EVENTS_FILE_NAME))?;

        Ok(Self {
            dir,
            writer: BufWriter::new(file),
        })
    }

    /// Summary directory of this writer.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the event file.
    pub fn events_path(&self) -> PathBuf {
        self.dir.join(EVENTS_FILE_NAME)
    }

    /// Writes a single event line and flushes it.
    pub fn write_event(&mut self, event: &SummaryEvent) -> Result<(), IoError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Records a scalar value.
    pub fn add_scalar(&mut self, tag: &str, value: f32, step: u64) -> Result<(), IoError> {
        self.write_event(&SummaryEvent {
            wall_time: wall_time(),
            step,
            tag: tag.to_string(),
            value: SummaryValue::Scalar { value },
        })
    }

    /// Records the distribution of `values`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Event written
    /// - `Err(IoError::InvalidData)` - No values, or a value is not finite
    /// - `Err(IoError::StdIoError)` / `Err(IoError::JsonError)` - Writing failed
    pub fn add_histogram<I>(&mut self, tag: &str, values: I, step: u64) -> Result<(), IoError>
    where
        I: IntoIterator<Item = f32>,
    {
        let histogram =
            Histogram::from_values(values).map_err(|e| IoError::InvalidData(e.to_string()))?;

        self.write_event(&SummaryEvent {
            wall_time: wall_time(),
            step,
            tag: tag.to_string(),
            value: SummaryValue::Histogram(histogram),
        })
    }

    /// Records an image that has already been written to disk.
    ///
    /// # Parameters
    ///
    /// - `tag` - Series name, e.g. `Confusion Matrix`
    /// - `image_path` - Location of the PNG; stored relative to the summary directory when
    ///   it lies inside it
    /// - `width` / `height` - Image size in pixels
    /// - `step` - Training step
    pub fn add_image(
        &mut self,
        tag: &str,
        image_path: &Path,
        width: u32,
        height: u32,
        step: u64,
    ) -> Result<(), IoError> {
        let relative = image_path.strip_prefix(&self.dir).unwrap_or(image_path);

        self.write_event(&SummaryEvent {
            wall_time: wall_time(),
            step,
            tag: tag.to_string(),
            value: SummaryValue::Image {
                path: relative.to_string_lossy().replace('\\', "/"),
                width,
                height,
            },
        })
    }
}

/// Reads every event of an event file, in write order.
///
/// # Returns
///
/// - `Ok(Vec<SummaryEvent>)` - The parsed events
/// - `Err(IoError)` - The file is missing or a line is not a valid event
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<SummaryEvent>, IoError> {
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(IoError::JsonError))
        .collect()
}

fn wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
