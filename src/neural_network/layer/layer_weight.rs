use ndarray::Array2;

/// Parameters of one layer, borrowed from the layer that owns them.
///
/// # Variants
///
/// - `Dense` - Kernel and bias of a `Dense` layer
/// - `Empty` - The layer has nothing to train
pub enum LayerWeight<'a> {
    Dense(DenseLayerWeight<'a>),
    Empty,
}

impl<'a> LayerWeight<'a> {
    /// The dense parameters, or `None` for parameterless layers.
    pub fn as_dense(&self) -> Option<&DenseLayerWeight<'a>> {
        match self {
            LayerWeight::Dense(dense) => Some(dense),
            LayerWeight::Empty => None,
        }
    }

    /// Number of scalars held, 0 for `Empty`.
    pub fn len(&self) -> usize {
        self.as_dense()
            .map_or(0, |dense| dense.kernel.len() + dense.bias.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// # Fields
///
/// - `kernel` - Shape (input_dim, units)
/// - `bias` - Shape (1, units)
pub struct DenseLayerWeight<'a> {
    pub kernel: &'a Array2<f32>,
    pub bias: &'a Array2<f32>,
}
