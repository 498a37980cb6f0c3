#![warn(missing_docs)]

//! Launcher for `WebKitWebDriver`, the WebDriver implementation of WebKitGTK.
//!
//! [`WebKitGtkService`] turns a [`WebKitGtkConfig`] into a running driver
//! process, while [`ProcessService`] owns the generic subprocess lifecycle
//! (spawning, waiting for the port, stopping).

pub use crate::error::{Error, Result};
pub use crate::process_service::{
    CommandLine, LOOPBACK_HOST, LogOutput, ProcessService, ServiceSettings,
};
pub use crate::webkitgtk::{DEFAULT_EXECUTABLE_PATH, WebKitGtkConfig, WebKitGtkService};

pub mod error;
pub mod process_service;
pub mod webkitgtk;
