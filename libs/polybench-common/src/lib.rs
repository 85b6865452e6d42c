pub mod config;
pub mod dockerfile;
pub mod error;
pub mod naming;
pub mod types;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::{BuildError, Result};
pub use naming::ImageName;
pub use types::{BuildOutcome, InstanceDescriptor, Language, LogTail};
