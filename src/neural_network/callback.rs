use crate::error::{IoError, ModelError, TrainingError};
use crate::neural_network::{Callback, Sequential, Tensor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-epoch confusion matrix rendered as an image summary
pub mod confusion_matrix;
/// Append-only JSON-lines event files for scalars, histograms and images
pub mod summary_writer;
/// Writes loss, accuracy, weight histograms and the layer graph for every epoch
pub mod tensor_board;

pub use confusion_matrix::*;
pub use summary_writer::*;
pub use tensor_board::*;

/// Metrics of one finished epoch, as handed to `Callback::on_epoch_end`.
///
/// # Fields
///
/// - `loss` - Mean training loss over the epoch
/// - `accuracy` - Training categorical accuracy over the epoch
/// - `val_loss` - Loss on the validation data, if any was given
/// - `val_accuracy` - Accuracy on the validation data, if any was given
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochLogs {
    pub loss: f32,
    pub accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
}

/// Record of a training run returned by `Sequential::fit`, one entry per epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub epochs: Vec<EpochLogs>,
}

impl History {
    /// Logs of the last finished epoch.
    pub fn last(&self) -> Option<&EpochLogs> {
        self.epochs.last()
    }

    /// Training loss of every epoch, in order.
    pub fn loss(&self) -> Vec<f32> {
        self.epochs.iter().map(|e| e.loss).collect()
    }

    /// Training accuracy of every epoch, in order.
    pub fn accuracy(&self) -> Vec<f32> {
        self.epochs.iter().map(|e| e.accuracy).collect()
    }
}
