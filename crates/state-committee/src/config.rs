use serde::Deserialize;

/// Number of rotated epochs whose committee pair stays queryable, by default
pub const DEFAULT_HISTORY_EPOCHS: usize = 16;

/// Runtime settings shared by every chain
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommitteeConfig {
    /// Rotated epochs kept per chain besides the live one
    pub history_epochs: usize,
    /// Reject aggregate evidence when the committee has more members than the routed
    /// circuit's bucket
    pub enforce_bucket_capacity: bool,
}

impl Default for CommitteeConfig {
    fn default() -> Self {
        Self {
            history_epochs: DEFAULT_HISTORY_EPOCHS,
            enforce_bucket_capacity: true,
        }
    }
}

impl CommitteeConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
