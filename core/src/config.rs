//! Runtime configuration for the hub.

use serde::{Deserialize, Serialize};

/// Administrative options recognised by the hub. Loaded from JSON by the
/// host (the loader front-end lives outside this crate) or built in code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubConfig {
    /// Cap on Inputs plus Outputs a single client may own. Exceeding it
    /// fails creation with `NoMemory`.
    #[serde(default = "default_max_resources")]
    pub max_resources_per_client: usize,
    /// Default FIFO cap for new observation buffers. `0` disables
    /// buffering until configured administratively.
    #[serde(default = "default_buffer_count")]
    pub obs_buffer_max_count: usize,
    /// Default time-window cap in seconds for new observation buffers.
    /// `0.0` means no window cap.
    #[serde(default)]
    pub obs_buffer_max_window_secs: f64,
    /// Initial units string for observations and placeholders.
    #[serde(default)]
    pub default_units: String,
}

fn default_max_resources() -> usize {
    100
}

fn default_buffer_count() -> usize {
    1000
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            max_resources_per_client: default_max_resources(),
            obs_buffer_max_count: default_buffer_count(),
            obs_buffer_max_window_secs: 0.0,
            default_units: String::new(),
        }
    }
}
