// Registry configuration: streaming pace and persistence policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Pause between two mutating lines when a patch is not instant.
    #[serde(default = "default_line_delay_ms")]
    pub line_delay_ms: u64,
    /// Write the document through the surface after a whole-file accept/reject.
    #[serde(default = "default_true")]
    pub persist_on_resolve_all: bool,
    /// Default for callers that do not choose instant mode themselves.
    #[serde(default)]
    pub instant: bool,
}

fn default_line_delay_ms() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            line_delay_ms: default_line_delay_ms(),
            persist_on_resolve_all: true,
            instant: false,
        }
    }
}

impl RegistryConfig {
    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }
}
