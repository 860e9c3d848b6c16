use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Upper bound on wrap passes per turn; stops runaway cascades.
    pub cyclical_pass_limit: u32,
    /// Re-asserted changes smaller than this are applied but not reported.
    pub change_epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cyclical_pass_limit: 10,
            change_epsilon: 0.01,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct GameSettings {
    pub round_name: String,
    pub round_text: String,
}

impl GameSettings {
    pub fn round_label(&self) -> &str {
        if self.round_name.is_empty() {
            "Turn"
        } else {
            &self.round_name
        }
    }

    pub fn round_message(&self) -> Option<&str> {
        if self.round_text.is_empty() {
            None
        } else {
            Some(&self.round_text)
        }
    }
}
