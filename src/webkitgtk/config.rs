use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::process_service::ServiceSettings;

/// Default executable, resolved through `PATH`
pub const DEFAULT_EXECUTABLE_PATH: &str = "WebKitWebDriver";

/// `WebKitWebDriver` service configuration
///
/// Every field may be left out of the JSON representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebKitGtkConfig {
    /// Install path of the driver executable
    pub executable_path: PathBuf,

    /// Port for the driver to listen on, 0 lets the OS decide
    pub port: u16,

    /// Deprecated alias of `log_output`, wins over it when both are set
    pub log_path: Option<PathBuf>,

    /// File receiving the driver's stdout and stderr
    pub log_output: Option<PathBuf>,

    /// Extra arguments appended after the port flag
    pub service_args: Vec<String>,

    /// Environment of the driver, inherited from this process when unset
    pub env: Option<HashMap<String, String>>,

    /// Process lifecycle tunables
    pub settings: ServiceSettings,
}

impl Default for WebKitGtkConfig {
    fn default() -> Self {
        Self {
            executable_path: PathBuf::from(DEFAULT_EXECUTABLE_PATH),
            port: 0,
            log_path: None,
            log_output: None,
            service_args: Vec::new(),
            env: None,
            settings: ServiceSettings::default(),
        }
    }
}
