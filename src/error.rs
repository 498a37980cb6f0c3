//! Error types shared by the library and the binary

pub use eyre::{Report as Error, Result};
