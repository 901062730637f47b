use super::*;
use crate::metric::ConfusionMatrix;
use crate::utility::argmax_rows;
use image::{Rgb, RgbImage};
use ndarray::Ix2;
use std::fs::create_dir_all;

/// Bitmap font for the axis labels
mod glyph;

use glyph::{GLYPH_HEIGHT, GLYPH_WIDTH, bitmap, is_lit};

/// Tag of the image events written by `ConfusionMatrixCallback`.
pub const CONFUSION_MATRIX_TAG: &str = "Confusion Matrix";

/// Side length in pixels of one cell of the rendered matrix.
const CELL_SIZE: u32 = 32;
/// Width in pixels of the grid lines and the outer frame.
const GRID_WIDTH: u32 = 1;
/// Every glyph pixel is drawn as a square of this side.
const LABEL_SCALE: u32 = 2;
/// Space between a label and the image border or the grid.
const LABEL_PAD: u32 = 4;
/// Row labels longer than this are cut.
const MAX_ROW_LABEL_CHARS: usize = 8;

const BACKGROUND_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const GRID_COLOR: Rgb<u8> = Rgb([160, 160, 160]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
/// Colour of a cell holding 0% of its row.
const LOW_COLOR: [f64; 3] = [247.0, 251.0, 255.0];
/// Colour of a cell holding 100% of its row.
const HIGH_COLOR: [f64; 3] = [8.0, 48.0, 107.0];

/// Horizontal distance between the starts of two glyphs.
const fn glyph_advance() -> u32 {
    (GLYPH_WIDTH + 1) * LABEL_SCALE
}

/// Pixel width of `chars` glyphs.
fn text_width(chars: usize) -> u32 {
    (chars as u32 * glyph_advance()).saturating_sub(LABEL_SCALE)
}

/// Draws `text` with its top-left corner at `(x, y)`, cut to `max_chars` characters.
fn draw_label(img: &mut RgbImage, text: &str, x: u32, y: u32, max_chars: usize) {
    for (i, c) in text.chars().take(max_chars).enumerate() {
        let left = x + i as u32 * glyph_advance();

        for (row, &bits) in bitmap(c).iter().enumerate() {
            for col in (0..GLYPH_WIDTH).filter(|&col| is_lit(bits, col)) {
                let px = left + col * LABEL_SCALE;
                let py = y + row as u32 * LABEL_SCALE;
                fill_rect(img, px, py, LABEL_SCALE, TEXT_COLOR);
            }
        }
    }
}

/// Fills a `side` x `side` square, clipped to the image.
fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, side: u32, color: Rgb<u8>) {
    let x_end = (x0 + side).min(img.width());
    let y_end = (y0 + side).min(img.height());
    for y in y0..y_end {
        for x in x0..x_end {
            img.put_pixel(x, y, color);
        }
    }
}

/// Renders a confusion matrix as a row-normalised heat-map PNG with labelled axes.
///
/// Row `i` of the grid is true class `i` and column `j` is predicted class `j`. A cell is
/// shaded from light to dark blue by the share of class `i` predicted as `j`. The name of
/// each true class is written left of its row and the name of each predicted class above
/// its column; column names are cut to what fits in one cell.
///
/// # Parameters
///
/// - `matrix` - The table to draw
/// - `class_names` - One name per class, in class-index order
/// - `path` - Destination PNG file; its parent directory must exist
///
/// # Returns
///
/// - `Ok((width, height))` - Size of the written image in pixels
/// - `Err(IoError::InvalidData)` - `class_names` does not have one entry per class
/// - `Err(IoError::ImageError)` - Encoding or writing the PNG failed
pub fn render_confusion_matrix(
    matrix: &ConfusionMatrix,
    class_names: &[String],
    path: &Path,
) -> Result<(u32, u32), IoError> {
    if class_names.len() != matrix.num_classes() {
        return Err(IoError::InvalidData(format!(
            "Got {} class names for a {}-class confusion matrix",
            class_names.len(),
            matrix.num_classes()
        )));
    }

    let n = matrix.num_classes() as u32;
    let grid_side = n * CELL_SIZE + (n + 1) * GRID_WIDTH;
    let row_label_chars = class_names
        .iter()
        .map(|name| name.chars().count().min(MAX_ROW_LABEL_CHARS))
        .max()
        .unwrap_or(0);
    let column_label_chars = ((CELL_SIZE + LABEL_SCALE) / glyph_advance()) as usize;

    let left = 2 * LABEL_PAD + text_width(row_label_chars);
    let top = 2 * LABEL_PAD + GLYPH_HEIGHT * LABEL_SCALE;
    let (width, height) = (left + grid_side, top + grid_side);

    let mut img = RgbImage::from_pixel(width, height, BACKGROUND_COLOR);
    for y in top..height {
        for x in left..width {
            img.put_pixel(x, y, GRID_COLOR);
        }
    }

    let cell_origin = |index: usize| GRID_WIDTH + index as u32 * (CELL_SIZE + GRID_WIDTH);

    for ((row, col), &share) in matrix.row_normalized().indexed_iter() {
        fill_rect(
            &mut img,
            left + cell_origin(col),
            top + cell_origin(row),
            CELL_SIZE,
            shade(share),
        );
    }

    let label_offset = (CELL_SIZE - GLYPH_HEIGHT * LABEL_SCALE) / 2;
    for (index, name) in class_names.iter().enumerate() {
        draw_label(
            &mut img,
            name,
            LABEL_PAD,
            top + cell_origin(index) + label_offset,
            MAX_ROW_LABEL_CHARS,
        );

        let shown = name.chars().count().min(column_label_chars);
        let x = left + cell_origin(index) + (CELL_SIZE - text_width(shown)) / 2;
        draw_label(&mut img, name, x, LABEL_PAD, column_label_chars);
    }

    img.save(path)?;
    Ok((width, height))
}

/// Linear blend between the low and high colour.
fn shade(share: f64) -> Rgb<u8> {
    let t = share.clamp(0.0, 1.0);
    let channel = |i: usize| (LOW_COLOR[i] + (HIGH_COLOR[i] - LOW_COLOR[i]) * t).round() as u8;
    Rgb([channel(0), channel(1), channel(2)])
}

/// Callback that builds a confusion matrix of a fixed evaluation set after every epoch and
/// logs it as an image summary.
///
/// At every epoch end the callback predicts `x_eval`, compares the arg-max class of each
/// prediction with the arg-max class of `y_eval`, renders the resulting table to
/// `<log_dir>/validation/images/confusion_matrix_epoch_<epoch>.png` and appends an image
/// event tagged `Confusion Matrix` to the validation stream. `<epoch>` is the zero-based
/// epoch index, the same value as the event step.
///
/// # Fields
///
/// - `x_eval` - Evaluation features of shape (n, num_features)
/// - `y_eval` - One-hot evaluation labels of shape (n, num_classes)
/// - `class_names` - Axis labels of the rendered image, in class-index order
/// - `log_dir` - Run directory shared with the `TensorBoard` callback
/// - `last_matrix` - Matrix of the most recent epoch
pub struct ConfusionMatrixCallback {
    x_eval: Tensor,
    y_eval: Tensor,
    class_names: Vec<String>,
    log_dir: PathBuf,
    writer: Option<SummaryWriter>,
    last_matrix: Option<ConfusionMatrix>,
}

impl ConfusionMatrixCallback {
    /// Creates the callback.
    ///
    /// # Parameters
    ///
    /// - `x_eval` - Evaluation features
    /// - `y_eval` - One-hot evaluation labels
    /// - `class_names` - One name per label column
    /// - `log_dir` - Run directory, e.g. `logs/mnist_cm`
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - The callback
    /// - `Err(ModelError::InputValidationError)` - Inputs are not 2D, are empty, disagree on
    ///   the sample count, or `class_names` does not have one entry per label column
    pub fn new<P: AsRef<Path>>(
        x_eval: Tensor,
        y_eval: Tensor,
        class_names: Vec<String>,
        log_dir: P,
    ) -> Result<Self, ModelError> {
        if x_eval.ndim() != 2 || y_eval.ndim() != 2 {
            return Err(ModelError::InputValidationError(format!(
                "Evaluation data must be 2D, got shapes {:?} and {:?}",
                x_eval.shape(),
                y_eval.shape()
            )));
        }

        if x_eval.shape()[0] == 0 {
            return Err(ModelError::InputValidationError(
                "Evaluation data must not be empty".to_string(),
            ));
        }

        if x_eval.shape()[0] != y_eval.shape()[0] {
            return Err(ModelError::InputValidationError(format!(
                "Evaluation data has {} samples but {} labels",
                x_eval.shape()[0],
                y_eval.shape()[0]
            )));
        }

        if class_names.len() != y_eval.shape()[1] {
            return Err(ModelError::InputValidationError(format!(
                "Got {} class names for {} label columns",
                class_names.len(),
                y_eval.shape()[1]
            )));
        }

        Ok(Self {
            x_eval,
            y_eval,
            class_names,
            log_dir: log_dir.as_ref().to_path_buf(),
            writer: None,
            last_matrix: None,
        })
    }

    pub fn get_class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Confusion matrix computed at the most recent epoch end, if any.
    pub fn last_matrix(&self) -> Option<&ConfusionMatrix> {
        self.last_matrix.as_ref()
    }

    /// Directory receiving the rendered images.
    pub fn images_dir(&self) -> PathBuf {
        self.log_dir.join(VALIDATION_DIR_NAME).join("images")
    }

    /// Predicts the evaluation set with `model` and tallies the confusion matrix.
    ///
    /// # Returns
    ///
    /// - `Ok(ConfusionMatrix)` - Table whose counts sum to the number of evaluation samples
    /// - `Err(ModelError)` - Prediction failed or its width does not match the labels
    pub fn compute(&self, model: &mut Sequential) -> Result<ConfusionMatrix, ModelError> {
        let predictions = model.predict(&self.x_eval)?;

        let predictions = predictions.into_dimensionality::<Ix2>().map_err(|e| {
            ModelError::ProcessingError(format!("Model predictions must be 2D: {}", e))
        })?;
        let labels = self.y_eval.view().into_dimensionality::<Ix2>().map_err(|e| {
            ModelError::ProcessingError(format!("Evaluation labels must be 2D: {}", e))
        })?;

        if predictions.ncols() != self.class_names.len() {
            return Err(ModelError::ProcessingError(format!(
                "Model predicts {} classes but the evaluation set has {}",
                predictions.ncols(),
                self.class_names.len()
            )));
        }

        let predicted = argmax_rows(&predictions);
        let actual = argmax_rows(&labels);

        ConfusionMatrix::new(&actual, &predicted, self.class_names.len())
    }
}

impl Callback for ConfusionMatrixCallback {
    fn on_epoch_end(
        &mut self,
        epoch: usize,
        _logs: &EpochLogs,
        model: &mut Sequential,
    ) -> Result<(), TrainingError> {
        let matrix = self.compute(model)?;

        let images_dir = self.images_dir();
        create_dir_all(&images_dir)?;
        let image_path = images_dir.join(format!("confusion_matrix_epoch_{}.png", epoch));
        let (width, height) = render_confusion_matrix(&matrix, &self.class_names, &image_path)?;

        let validation_dir = self.log_dir.join(VALIDATION_DIR_NAME);
        if self.writer.is_none() {
            self.writer = Some(SummaryWriter::new(&validation_dir)?);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.add_image(CONFUSION_MATRIX_TAG, &image_path, width, height, epoch as u64)?;
        }

        log::debug!("Epoch {} {}", epoch + 1, matrix.summary());
        log::info!(
            "Confusion matrix for epoch {} written to {} ({} samples, accuracy {:.4})",
            epoch + 1,
            image_path.display(),
            matrix.total(),
            matrix.accuracy()
        );

        self.last_matrix = Some(matrix);
        Ok(())
    }
}
