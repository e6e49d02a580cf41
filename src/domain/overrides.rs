//! Reference cost parameters for the active region plus the user's audit trail
//! of edited fields.

use std::collections::BTreeSet;

use tracing::debug;

use super::entities::{CostField, CostParameterSet, Entitlement};

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterOverrideTracker {
    parameters: CostParameterSet,
    overridden: BTreeSet<CostField>,
}

impl ParameterOverrideTracker {
    pub fn new(defaults: CostParameterSet) -> Self {
        Self {
            parameters: defaults.system_defaults(),
            overridden: BTreeSet::new(),
        }
    }

    /// Replaces every parameter with freshly fetched reference values and
    /// forgets all previous edits.
    pub fn load_system_defaults(&mut self, defaults: CostParameterSet) {
        self.parameters = defaults.system_defaults();
        self.overridden.clear();
    }

    /// Writes a user value for `field`. Ignored unless the account is premium.
    ///
    /// Returns whether the write was accepted.
    pub fn set_override(&mut self, field: CostField, raw: &str, entitlement: Entitlement) -> bool {
        if !entitlement.is_premium() {
            debug!(field = field.key(), "override ignored without premium entitlement");
            return false;
        }

        let value = parse_override(raw);
        self.parameters.get_mut(field).user_value = value;
        self.overridden.insert(field);
        debug!(field = field.key(), value, "cost override applied");
        true
    }

    pub fn is_overridden(&self, field: CostField) -> bool {
        self.overridden.contains(&field)
    }

    pub fn parameters(&self) -> &CostParameterSet {
        &self.parameters
    }

    /// Edited fields in stable display order.
    pub fn overrides(&self) -> Vec<CostField> {
        self.overridden.iter().copied().collect()
    }

    pub fn override_count(&self) -> usize {
        self.overridden.len()
    }
}

/// Lenient numeric parsing for form input: everything but digits and `.` is
/// dropped, then the leading `digits[.digits]` run is parsed. Anything that
/// does not yield a finite number becomes 0.
pub fn parse_override(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut seen_dot = false;
    let end = cleaned
        .char_indices()
        .find(|(_, c)| {
            if *c == '.' {
                if seen_dot {
                    return true;
                }
                seen_dot = true;
            }
            false
        })
        .map(|(idx, _)| idx)
        .unwrap_or(cleaned.len());

    cleaned[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
