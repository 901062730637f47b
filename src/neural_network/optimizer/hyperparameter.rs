use crate::error::ModelError;

/// Range an optimizer hyperparameter has to fall in.
///
/// # Variants
///
/// - `Positive` - Finite and strictly above zero (learning rates, epsilon)
/// - `Decay` - Finite and in `[0, 1)` (moment decay rates)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Bound {
    Positive,
    Decay,
}

impl Bound {
    fn admits(self, value: f32) -> bool {
        value.is_finite()
            && match self {
                Bound::Positive => value > 0.0,
                Bound::Decay => (0.0..1.0).contains(&value),
            }
    }

    fn describe(self) -> &'static str {
        match self {
            Bound::Positive => "positive and finite",
            Bound::Decay => "in range [0, 1)",
        }
    }
}

/// Checks `(name, value, bound)` triples in order and reports the first one out of range.
///
/// # Returns
///
/// - `Ok(())` - Every value is admissible
/// - `Err(ModelError::InputValidationError)` - Names the offending hyperparameter
pub(super) fn check_hyperparameters(params: &[(&str, f32, Bound)]) -> Result<(), ModelError> {
    match params.iter().find(|(_, value, bound)| !bound.admits(*value)) {
        Some((name, value, bound)) => Err(ModelError::InputValidationError(format!(
            "{} must be {}, got {}",
            name,
            bound.describe(),
            value
        ))),
        None => Ok(()),
    }
}
