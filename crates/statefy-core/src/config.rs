//! Container configuration

use crate::{StatefyError, StatefyResult};

/// Default property name written with the new state by `bind_instance`
pub const DEFAULT_STATE_FIELD: &str = "state";
/// Default property name written with the previous state by `bind_instance`
pub const DEFAULT_OLD_STATE_FIELD: &str = "oldState";

/// Statefy container configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatefyConfig {
    /// Fire change notifications even when the new value equals the current one
    pub override_equality: bool,
    /// Re-adding a present list value refreshes its entry instead of duplicating it
    pub list_rewrite: bool,
    /// Property written with the new state by instance bindings
    pub state_field: String,
    /// Property written with the previous state by instance bindings
    pub old_state_field: String,
}

impl Default for StatefyConfig {
    fn default() -> Self {
        StatefyConfig {
            override_equality: false,
            list_rewrite: true,
            state_field: DEFAULT_STATE_FIELD.to_string(),
            old_state_field: DEFAULT_OLD_STATE_FIELD.to_string(),
        }
    }
}

impl StatefyConfig {
    /// Every `set` notifies, including reassignment of the same value
    pub fn forced() -> Self {
        StatefyConfig {
            override_equality: true,
            ..Self::default()
        }
    }

    /// Re-adding a list value stacks a second, independently timed entry
    pub fn stacking() -> Self {
        StatefyConfig {
            list_rewrite: false,
            ..Self::default()
        }
    }

    pub fn with_override_equality(mut self, enabled: bool) -> Self {
        self.override_equality = enabled;
        self
    }

    pub fn with_list_rewrite(mut self, enabled: bool) -> Self {
        self.list_rewrite = enabled;
        self
    }

    /// Rename the properties written by instance bindings
    pub fn with_binding_fields(
        mut self,
        state_field: impl Into<String>,
        old_state_field: impl Into<String>,
    ) -> Self {
        self.state_field = state_field.into();
        self.old_state_field = old_state_field.into();
        self
    }

    /// Check the configuration for values the container cannot honor
    pub fn validate(&self) -> StatefyResult<()> {
        if self.state_field.is_empty() || self.old_state_field.is_empty() {
            return Err(StatefyError::InvalidConfig(
                "binding field names must not be empty".to_string(),
            ));
        }
        if self.state_field == self.old_state_field {
            return Err(StatefyError::InvalidConfig(format!(
                "binding fields must differ, both are {:?}",
                self.state_field
            )));
        }
        Ok(())
    }
}
