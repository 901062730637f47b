/// Adam optimizer and its per-layer state
pub mod adam;
/// Range checks of optimizer hyperparameters
mod hyperparameter;
/// RMSprop optimizer and its per-layer cache
pub mod rms_prop;
/// Stochastic Gradient Descent optimizer
pub mod sgd;

pub use adam::*;
pub use rms_prop::*;
pub use sgd::*;

/// Optimizer state kept inside a layer between updates.
///
/// # Fields
///
/// - `adam_states` - Moment estimates, created on the first Adam update
/// - `rmsprop_cache` - Squared-gradient averages, created on the first RMSprop update
#[derive(Debug, Clone, Default)]
pub struct OptimizerCache {
    pub adam_states: Option<AdamStates>,
    pub rmsprop_cache: Option<RMSpropCache>,
}
