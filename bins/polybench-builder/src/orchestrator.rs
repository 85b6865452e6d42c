use polybench_common::error::{BuildError, Result};
use polybench_common::types::{log_excerpt, InstanceDescriptor};
use tracing::{debug, warn};

use crate::engine::ContainerEngine;
use crate::repo::RepoSource;

/// Build Orchestrator - the per-instance state machine
///
/// Drives one instance build through its phases in a fixed order:
/// base image check/build, instance skip check, clone + checkout,
/// instance build, workspace release. Generic over both boundaries so
/// the phase logic is testable without a daemon or a network.
///
/// **Ordering guarantees:**
/// 1. A missing base image is built before anything touches the repository
/// 2. A failed base build aborts the run with no clone and no instance build
/// 3. An existing instance image short-circuits to success with no clone
/// 4. The workspace is released on every path that cloned one
pub struct BuildOrchestrator<E, R> {
    engine: E,
    repos: R,
}

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Instance image was already present; nothing was built
    Skipped,
    /// Instance image was built and tagged
    Built,
}

impl<E: ContainerEngine, R: RepoSource> BuildOrchestrator<E, R> {
    pub fn new(engine: E, repos: R) -> Self {
        BuildOrchestrator { engine, repos }
    }

    /// Run one instance build end to end
    ///
    /// Returns the process exit status the driver scripts consume: 0 for
    /// built-or-already-present, 1 for any failure. Exactly one line
    /// announcing success or failure is printed per run, plus the bounded
    /// log excerpt when the instance build itself failed.
    pub async fn run(&self, instance: &InstanceDescriptor) -> i32 {
        let image = instance.instance_image();

        match self.run_instance(instance).await {
            Ok(RunStatus::Skipped) => {
                println!("Image {image} already exists locally");
                0
            }
            Ok(RunStatus::Built) => {
                println!("Successfully built image {image}");
                0
            }
            Err(BuildError::InstanceBuild { instance_id, tail }) => {
                println!("Failed to build image for {instance_id}");
                if !tail.is_empty() {
                    println!("Build logs:");
                    for line in log_excerpt(&tail) {
                        println!("  {line}");
                    }
                }
                1
            }
            Err(e) => {
                println!("Error building image for {}: {e}", instance.instance_id);
                1
            }
        }
    }

    /// The phase sequence proper; every failure maps to a taxonomy error
    pub async fn run_instance(&self, instance: &InstanceDescriptor) -> Result<RunStatus> {
        self.ensure_base_image(instance).await?;

        let image = instance.instance_image();
        if self.engine.image_exists(&image).await? {
            return Ok(RunStatus::Skipped);
        }

        println!(
            "Cloning repository {} and checking out {}...",
            instance.repo,
            short_commit(&instance.base_commit)
        );
        let mut workspace = self
            .repos
            .clone_repo(&instance.repo, &instance.repo_path)
            .await?;

        // A checkout failure propagates here; the workspace guard still
        // removes the clone on the way out
        self.repos
            .checkout_commit(&workspace, &instance.base_commit)
            .await?;

        println!("Building Docker image {image}...");
        let outcome = self
            .engine
            .build_instance_image(workspace.path(), &instance.dockerfile, &image)
            .await;

        // Released before the outcome is reported, success and failure alike
        if let Err(e) = workspace.release() {
            warn!(error = %e, "failed to release workspace");
        }

        if outcome.success {
            Ok(RunStatus::Built)
        } else {
            debug!(error = ?outcome.error_message, "instance build failed");
            Err(BuildError::InstanceBuild {
                instance_id: instance.instance_id.clone(),
                tail: outcome.tail_log,
            })
        }
    }

    /// Ensure the per-language base image exists before any instance work
    ///
    /// No cross-process lock: concurrent runs can both observe the base as
    /// absent and both build it. Both build the identical recipe, so the
    /// duplicate work converges on the same tag.
    async fn ensure_base_image(&self, instance: &InstanceDescriptor) -> Result<()> {
        let Some(base) = instance.base_image() else {
            return Ok(());
        };

        if self.engine.image_exists(&base).await? {
            println!("Base image for {} already exists", instance.language);
            return Ok(());
        }

        println!("Building base image for {}...", instance.language);
        let outcome = self.engine.build_base_image(instance.language).await;
        if outcome.success {
            Ok(())
        } else {
            Err(BuildError::BaseBuild {
                language: instance.language,
                reason: outcome
                    .error_message
                    .unwrap_or_else(|| "build failed".to_string()),
            })
        }
    }
}

/// Leading characters of a commit hash, for progress lines
fn short_commit(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::Workspace;
    use async_trait::async_trait;
    use polybench_common::naming::ImageName;
    use polybench_common::types::{BuildOutcome, Language, LogTail, LOG_TAIL_LINES};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    type Calls = Arc<Mutex<Vec<String>>>;

    struct ScriptedEngine {
        calls: Calls,
        base_exists: bool,
        instance_exists: bool,
        base_build_ok: bool,
        instance_build_ok: bool,
        build_log: Vec<String>,
        registry_error: bool,
    }

    impl ScriptedEngine {
        fn new(calls: &Calls) -> Self {
            ScriptedEngine {
                calls: calls.clone(),
                base_exists: false,
                instance_exists: false,
                base_build_ok: true,
                instance_build_ok: true,
                build_log: Vec::new(),
                registry_error: false,
            }
        }
    }

    #[async_trait]
    impl ContainerEngine for ScriptedEngine {
        async fn image_exists(&self, image: &ImageName) -> polybench_common::Result<bool> {
            self.calls.lock().unwrap().push(format!("exists:{image}"));
            if self.registry_error {
                return Err(BuildError::RegistryQuery {
                    image: image.as_str().to_string(),
                    reason: "daemon unavailable".to_string(),
                });
            }
            if image.as_str().ends_with("_base") {
                Ok(self.base_exists)
            } else {
                Ok(self.instance_exists)
            }
        }

        async fn build_base_image(&self, language: Language) -> BuildOutcome {
            self.calls.lock().unwrap().push(format!("build_base:{language}"));
            if self.base_build_ok {
                BuildOutcome::ok(LogTail::new())
            } else {
                BuildOutcome::failed("base recipe failed", LogTail::new())
            }
        }

        async fn build_instance_image(
            &self,
            _workspace: &Path,
            _dockerfile: &str,
            image: &ImageName,
        ) -> BuildOutcome {
            self.calls.lock().unwrap().push(format!("build:{image}"));
            let mut tail = LogTail::new();
            for line in &self.build_log {
                tail.push(line.clone());
            }
            if self.instance_build_ok {
                BuildOutcome::ok(tail)
            } else {
                BuildOutcome::failed("exit code 1", tail)
            }
        }
    }

    struct TempRepoSource {
        calls: Calls,
        cloned_path: Arc<Mutex<Option<PathBuf>>>,
        checkout_ok: bool,
    }

    impl TempRepoSource {
        fn new(calls: &Calls) -> Self {
            TempRepoSource {
                calls: calls.clone(),
                cloned_path: Arc::new(Mutex::new(None)),
                checkout_ok: true,
            }
        }
    }

    #[async_trait]
    impl RepoSource for TempRepoSource {
        async fn clone_repo(&self, repo: &str, base: &Path) -> polybench_common::Result<Workspace> {
            self.calls.lock().unwrap().push(format!("clone:{repo}"));
            let dir = base.join(format!("clone-{}", Uuid::new_v4()));
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("README.md"), "fixture").unwrap();
            *self.cloned_path.lock().unwrap() = Some(dir.clone());
            Ok(Workspace::new(dir))
        }

        async fn checkout_commit(
            &self,
            _workspace: &Workspace,
            commit: &str,
        ) -> polybench_common::Result<()> {
            self.calls.lock().unwrap().push(format!("checkout:{commit}"));
            if self.checkout_ok {
                Ok(())
            } else {
                Err(BuildError::CheckoutFailed {
                    commit: commit.to_string(),
                    reason: "unknown revision".to_string(),
                })
            }
        }
    }

    fn descriptor(language: Language, base: &Path) -> InstanceDescriptor {
        InstanceDescriptor {
            instance_id: "org__pkg-1".to_string(),
            language,
            repo: "org/pkg".to_string(),
            base_commit: "a300148003e3a067875b1444e8267b6962426fff".to_string(),
            dockerfile: "FROM polybench_java_base\nCOPY . /testbed\n".to_string(),
            repo_path: base.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_skip_when_instance_exists() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ScriptedEngine::new(&calls);
        engine.base_exists = true;
        engine.instance_exists = true;
        let repos = TempRepoSource::new(&calls);
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, repos);
        let status = orchestrator
            .run_instance(&descriptor(Language::Java, tmp.path()))
            .await
            .unwrap();

        assert_eq!(status, RunStatus::Skipped);
        let calls = calls.lock().unwrap();
        assert!(calls.iter().all(|c| c.starts_with("exists:")));
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_skip_exit_status_is_success() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ScriptedEngine::new(&calls);
        engine.base_exists = true;
        engine.instance_exists = true;
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, TempRepoSource::new(&calls));
        let code = orchestrator.run(&descriptor(Language::Java, tmp.path())).await;

        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_base_built_before_clone() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let engine = ScriptedEngine::new(&calls);
        let repos = TempRepoSource::new(&calls);
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, repos);
        let status = orchestrator
            .run_instance(&descriptor(Language::Java, tmp.path()))
            .await
            .unwrap();

        assert_eq!(status, RunStatus::Built);
        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "exists:polybench_java_base".to_string(),
                "build_base:java".to_string(),
                "exists:polybench_java_org__pkg-1".to_string(),
                "clone:org/pkg".to_string(),
                "checkout:a300148003e3a067875b1444e8267b6962426fff".to_string(),
                "build:polybench_java_org__pkg-1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_base_build_failure_aborts_before_clone() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ScriptedEngine::new(&calls);
        engine.base_build_ok = false;
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, TempRepoSource::new(&calls));
        let instance = descriptor(Language::TypeScript, tmp.path());
        let err = orchestrator.run_instance(&instance).await.unwrap_err();

        assert!(matches!(
            err,
            BuildError::BaseBuild {
                language: Language::TypeScript,
                ..
            }
        ));
        let recorded = calls.lock().unwrap().clone();
        assert!(recorded.iter().all(|c| !c.starts_with("clone:")));
        assert!(recorded.iter().all(|c| !c.starts_with("build:")));

        assert_eq!(orchestrator.run(&instance).await, 1);
    }

    #[tokio::test]
    async fn test_existing_base_is_not_rebuilt() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ScriptedEngine::new(&calls);
        engine.base_exists = true;
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, TempRepoSource::new(&calls));
        orchestrator
            .run_instance(&descriptor(Language::JavaScript, tmp.path()))
            .await
            .unwrap();

        let recorded = calls.lock().unwrap();
        assert!(recorded.iter().all(|c| !c.starts_with("build_base:")));
    }

    #[tokio::test]
    async fn test_python_skips_base_phase_entirely() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let engine = ScriptedEngine::new(&calls);
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, TempRepoSource::new(&calls));
        orchestrator
            .run_instance(&descriptor(Language::Python, tmp.path()))
            .await
            .unwrap();

        let recorded = calls.lock().unwrap();
        assert_eq!(recorded[0], "exists:polybench_python_org__pkg-1");
        assert!(recorded.iter().all(|c| !c.contains("_base")));
    }

    #[tokio::test]
    async fn test_registry_error_propagates() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ScriptedEngine::new(&calls);
        engine.registry_error = true;
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, TempRepoSource::new(&calls));
        let instance = descriptor(Language::Java, tmp.path());
        let err = orchestrator.run_instance(&instance).await.unwrap_err();

        assert!(matches!(err, BuildError::RegistryQuery { .. }));
        let recorded = calls.lock().unwrap().clone();
        assert!(recorded.iter().all(|c| !c.starts_with("clone:")));

        assert_eq!(orchestrator.run(&instance).await, 1);
    }

    #[tokio::test]
    async fn test_workspace_released_after_success() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let engine = ScriptedEngine::new(&calls);
        let repos = TempRepoSource::new(&calls);
        let cloned = repos.cloned_path.clone();
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, repos);
        let code = orchestrator.run(&descriptor(Language::Python, tmp.path())).await;

        assert_eq!(code, 0);
        let path = cloned.lock().unwrap().clone().unwrap();
        assert!(!path.exists(), "workspace survived a successful run");
    }

    #[tokio::test]
    async fn test_workspace_released_after_failed_build() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ScriptedEngine::new(&calls);
        engine.instance_build_ok = false;
        engine.build_log = vec!["npm ERR! missing script: build".to_string()];
        let repos = TempRepoSource::new(&calls);
        let cloned = repos.cloned_path.clone();
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, repos);
        let code = orchestrator.run(&descriptor(Language::Python, tmp.path())).await;

        assert_eq!(code, 1);
        let path = cloned.lock().unwrap().clone().unwrap();
        assert!(!path.exists(), "workspace survived a failed build");
    }

    #[tokio::test]
    async fn test_workspace_released_after_checkout_failure() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let engine = ScriptedEngine::new(&calls);
        let mut repos = TempRepoSource::new(&calls);
        repos.checkout_ok = false;
        let cloned = repos.cloned_path.clone();
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, repos);
        let instance = descriptor(Language::Python, tmp.path());
        let err = orchestrator.run_instance(&instance).await.unwrap_err();

        assert!(matches!(err, BuildError::CheckoutFailed { .. }));
        let path = cloned.lock().unwrap().clone().unwrap();
        assert!(!path.exists(), "workspace survived a checkout failure");

        let recorded = calls.lock().unwrap();
        assert!(recorded.iter().all(|c| !c.starts_with("build:")));
    }

    #[tokio::test]
    async fn test_failure_carries_final_log_lines() {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let mut engine = ScriptedEngine::new(&calls);
        engine.instance_build_ok = false;
        engine.build_log = (0..25).map(|i| format!("line {i}")).collect();
        let tmp = tempfile::tempdir().unwrap();

        let orchestrator = BuildOrchestrator::new(engine, TempRepoSource::new(&calls));
        let err = orchestrator
            .run_instance(&descriptor(Language::Python, tmp.path()))
            .await
            .unwrap_err();

        let BuildError::InstanceBuild { instance_id, tail } = err else {
            panic!("expected an instance build failure");
        };
        assert_eq!(instance_id, "org__pkg-1");
        assert_eq!(tail.len(), 25);

        let excerpt = log_excerpt(&tail);
        assert_eq!(excerpt.len(), LOG_TAIL_LINES);
        assert_eq!(excerpt[0], "line 15");
        assert_eq!(excerpt[LOG_TAIL_LINES - 1], "line 24");
    }

    #[test]
    fn test_short_commit() {
        assert_eq!(short_commit("a300148003e3a067875b1444e8267b6962426fff"), "a3001480");
        assert_eq!(short_commit("ab12"), "ab12");
    }
}
