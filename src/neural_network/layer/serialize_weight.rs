use super::*;
use crate::error::IoError;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Owned copy of a dense layer's parameters, stored row by row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableDenseWeight {
    pub kernel: Vec<Vec<f32>>,
    pub bias: Vec<Vec<f32>>,
}

/// Parameters of one saved layer, tagged by `type` in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SerializableLayerWeight {
    Dense(SerializableDenseWeight),
    Empty,
}

impl SerializableLayerWeight {
    /// Copies borrowed parameters into their saved form.
    pub fn from_layer_weight(weight: &LayerWeight) -> Self {
        match weight.as_dense() {
            Some(dense) => SerializableLayerWeight::Dense(SerializableDenseWeight {
                kernel: rows_of(dense.kernel),
                bias: rows_of(dense.bias),
            }),
            None => SerializableLayerWeight::Empty,
        }
    }
}

/// Name, type and output shape of a layer. Used both in saved models and in the graph summary.
///
/// # Fields
///
/// - `name` - Keras-style name unique within the model, e.g. `dense_1`
/// - `layer_type` - Type name, e.g. `Dense`
/// - `output_shape` - Shape with the batch axis as `None`, e.g. `(None, 256)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    #[serde(default)]
    pub name: String,
    pub layer_type: String,
    pub output_shape: String,
}

/// One layer of a saved model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableLayer {
    pub info: LayerInfo,
    pub weights: SerializableLayerWeight,
}

/// Layout of the JSON file written by `Sequential::save_to_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableSequential {
    pub layers: Vec<SerializableLayer>,
}

fn rows_of(matrix: &Array2<f32>) -> Vec<Vec<f32>> {
    matrix.rows().into_iter().map(|row| row.to_vec()).collect()
}

fn matrix_from_rows(rows: &[Vec<f32>]) -> Result<Array2<f32>, IoError> {
    let width = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().position(|row| row.len() != width) {
        return Err(IoError::InvalidData(format!(
            "Row {} has {} values, expected {}",
            bad,
            rows[bad].len(),
            width
        )));
    }

    let flat: Vec<f32> = rows.concat();
    Array2::from_shape_vec((rows.len(), width), flat).map_err(|e| IoError::InvalidData(e.to_string()))
}

/// Copies saved parameters into a layer of the model being loaded.
///
/// # Parameters
///
/// - `layer` - Receiving layer
/// - `weights` - Parameters read from the file
/// - `expected_type` - Layer type recorded next to them
///
/// # Returns
///
/// - `Ok(())` - Parameters copied; parameterless layers only have their type checked
/// - `Err(IoError::InvalidData)` - The layer type or a matrix shape differs from the file
pub fn apply_weights_to_layer(
    layer: &mut dyn Layer,
    weights: &SerializableLayerWeight,
    expected_type: &str,
) -> Result<(), IoError> {
    if layer.layer_type() != expected_type {
        return Err(IoError::InvalidData(format!(
            "Layer type mismatch: model has {}, file has {}",
            layer.layer_type(),
            expected_type
        )));
    }

    let SerializableLayerWeight::Dense(saved) = weights else {
        return Ok(());
    };

    let dense = layer
        .as_any_mut()
        .downcast_mut::<Dense>()
        .ok_or_else(|| IoError::InvalidData(format!("{} layer cannot hold a kernel", expected_type)))?;

    dense
        .set_weights(matrix_from_rows(&saved.kernel)?, matrix_from_rows(&saved.bias)?)
        .map_err(|e| IoError::InvalidData(e.to_string()))
}
