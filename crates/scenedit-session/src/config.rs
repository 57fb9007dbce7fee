use scenedit_engine::DatasetLayout;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// What to do with selected entities whose schedule fetch failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Any failure in the selection blocks merging and editing.
    #[default]
    RequireAll,
    /// Failed entities are left out of the grid and of edits.
    ExcludeFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub layout: DatasetLayout,
    pub selection_policy: SelectionPolicy,
    /// Check row/feature pairing of every geometry-backed table on load and
    /// after discard.
    pub verify_on_load: bool,
    pub enable_change_log: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::strict()
    }
}

impl SessionConfig {
    pub fn strict() -> Self {
        Self {
            layout: DatasetLayout::cea(),
            selection_policy: SelectionPolicy::RequireAll,
            verify_on_load: true,
            enable_change_log: true,
        }
    }

    /// Partial selections allowed; no load-time verification.
    pub fn lenient() -> Self {
        Self {
            layout: DatasetLayout::cea(),
            selection_policy: SelectionPolicy::ExcludeFailed,
            verify_on_load: false,
            enable_change_log: false,
        }
    }

    pub fn with_layout(mut self, layout: DatasetLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_selection_policy(mut self, policy: SelectionPolicy) -> Self {
        self.selection_policy = policy;
        self
    }

    /// Parse a JSON config. Missing fields take their strict defaults.
    pub fn from_json_str(s: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(s)?)
    }
}
