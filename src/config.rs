use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::exporter::DEFAULT_EXPORT_NAME;

const CONFIG_FILENAME: &str = "rusty-roster.json";
const DEFAULT_MEMBERSHIP_LIMIT: usize = 100;

/// Viewer settings, stored as `rusty-roster.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewerConfig {
    /// File name suggested by the export dialog.
    #[serde(default = "default_export_name")]
    pub default_export_name: String,

    /// Columns with fewer distinct values than this get a pick list.
    #[serde(default = "default_membership_limit")]
    pub membership_limit: usize,
}

fn default_export_name() -> String {
    DEFAULT_EXPORT_NAME.to_string()
}

fn default_membership_limit() -> usize {
    DEFAULT_MEMBERSHIP_LIMIT
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_export_name: default_export_name(),
            membership_limit: DEFAULT_MEMBERSHIP_LIMIT,
        }
    }
}

impl ViewerConfig {
    /// Load config from the given directory, or return defaults if not found.
    pub fn load<P: AsRef<Path>>(config_dir: P) -> anyhow::Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: ViewerConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("parsing {}: {e}", config_path.display()))?;
        Ok(config)
    }

    /// Save config to the given directory.
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> anyhow::Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }
}
