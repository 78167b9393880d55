//! Password policy configuration.

use serde::{Deserialize, Serialize};

/// Policy applied to new passwords (change and reset flows).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Minimum password length.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
        }
    }
}

fn default_min_length() -> usize {
    8
}
