use crate::types::Language;
use std::path::PathBuf;

/// Result type alias for build pipeline operations
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors the build pipeline can surface
/// Every variant maps to exit status 1 at the binary boundary; the
/// orchestrator decides which ones get extra console diagnostics
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The registry existence query itself failed
    /// Never folded into "image absent" - a daemon outage must not
    /// trigger a spurious rebuild
    #[error("registry query failed for image '{image}': {reason}")]
    RegistryQuery { image: String, reason: String },

    /// Base image build failed - fatal before any instance work starts
    #[error("failed to build base image for {language}: {reason}")]
    BaseBuild { language: Language, reason: String },

    /// Repository clone failed
    #[error("failed to clone repository '{repo}': {reason}")]
    CloneFailed { repo: String, reason: String },

    /// Commit could not be checked out in the cloned tree
    #[error("failed to check out commit '{commit}': {reason}")]
    CheckoutFailed { commit: String, reason: String },

    /// Instance image build failed
    /// Carries the captured log tail for the failure excerpt
    #[error("failed to build image for {instance_id}")]
    InstanceBuild {
        instance_id: String,
        tail: Vec<String>,
    },

    /// Workspace directory could not be created or removed
    #[error("workspace error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
