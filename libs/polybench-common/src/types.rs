use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

/// Most recent build-log lines kept in memory per build
pub const CAPTURED_LOG_LINES: usize = 50;

/// Log lines surfaced in a failure excerpt
pub const LOG_TAIL_LINES: usize = 10;

/// Strongly-typed language enum
/// The dataset ships exactly these four - unrecognized names are rejected
/// at the parse boundary, never defaulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    JavaScript,
    TypeScript,
}

impl Language {
    /// Returns all language variants
    /// This is the single source of truth for supported languages
    pub fn all_variants() -> &'static [Language] {
        &[
            Language::Python,
            Language::Java,
            Language::JavaScript,
            Language::TypeScript,
        ]
    }

    /// Parse a language from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Language> {
        match s.to_lowercase().as_str() {
            "python" => Some(Language::Python),
            "java" => Some(Language::Java),
            "javascript" => Some(Language::JavaScript),
            "typescript" => Some(Language::TypeScript),
            _ => None,
        }
    }

    /// Whether instance images for this language build on a shared base image
    /// Python instance images are self-contained
    pub fn requires_base_image(&self) -> bool {
        !matches!(self, Language::Python)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::Java => write!(f, "java"),
            Language::JavaScript => write!(f, "javascript"),
            Language::TypeScript => write!(f, "typescript"),
        }
    }
}

/// Instance Build Input (Immutable)
/// One record per benchmark instance - everything a single build needs
///
/// ## Field Semantics:
/// - `dockerfile` carries the full build-file text inline; the build never
///   reads a Dockerfile out of the cloned tree
/// - `base_commit` is an exact commit hash, not a branch or tag
/// - `repo_path` is the directory clone workspaces are created under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDescriptor {
    pub instance_id: String,
    pub language: Language,
    pub repo: String,
    pub base_commit: String,
    pub dockerfile: String,
    pub repo_path: PathBuf,
}

impl InstanceDescriptor {
    /// Image name this instance's build will be tagged with
    pub fn instance_image(&self) -> crate::naming::ImageName {
        crate::naming::instance_image(self.language, &self.instance_id)
    }

    /// Base image name for this instance's language, if the language uses one
    pub fn base_image(&self) -> Option<crate::naming::ImageName> {
        self.language
            .requires_base_image()
            .then(|| crate::naming::base_image(self.language))
    }
}

/// Image Build Outcome
/// Written by the engine boundary, read by the orchestrator
///
/// ## Result Semantics:
/// - `success` is true iff the engine reported a zero build result
/// - engine-thrown errors fold into `success = false` with `error_message`
///   populated, so a build call never panics the run
/// - `tail_log` holds the final captured log lines in original order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub success: bool,
    pub tail_log: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BuildOutcome {
    pub fn ok(tail: LogTail) -> Self {
        Self {
            success: true,
            tail_log: tail.into_lines(),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>, tail: LogTail) -> Self {
        Self {
            success: false,
            tail_log: tail.into_lines(),
            error_message: Some(message.into()),
        }
    }
}

/// Bounded Build-Log Collector
/// Keeps the most recent lines only - the truncation point is always
/// "last N", never "first N"
#[derive(Debug, Default)]
pub struct LogTail {
    lines: VecDeque<String>,
}

impl LogTail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line, discarding the oldest once the bound is reached
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == CAPTURED_LOG_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Append a raw stream chunk, splitting it into lines
    /// Trailing newlines and blank fragments are dropped
    pub fn push_chunk(&mut self, chunk: &str) {
        for line in chunk.lines() {
            let line = line.trim_end();
            if !line.is_empty() {
                self.push(line);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines.into()
    }
}

/// Final slice of captured log lines surfaced in failure diagnostics
/// At most [`LOG_TAIL_LINES`] lines, original order preserved
pub fn log_excerpt(lines: &[String]) -> &[String] {
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    &lines[start..]
}
