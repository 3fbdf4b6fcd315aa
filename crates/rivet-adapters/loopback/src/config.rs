//! Configuration for the loopback connector.

use serde::{Deserialize, Serialize};

/// Loopback connector settings.
///
/// ```json
/// { "auto_spawn": true, "greeting": ["[系統] 歡迎來到廢土伺服器"] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopbackConfig {
    /// Emit `Spawned` as soon as a session opens.
    pub auto_spawn: bool,

    /// Chat lines delivered right after spawning.
    pub greeting: Vec<String>,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            auto_spawn: true,
            greeting: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_missing_fields() {
        let config: LoopbackConfig = serde_json::from_str("{}").unwrap();
        assert!(config.auto_spawn);
        assert!(config.greeting.is_empty());
    }
}
