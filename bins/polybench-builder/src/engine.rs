use async_trait::async_trait;
use bollard::image::BuildImageOptions;
use bollard::Docker;
use futures_util::StreamExt;
use polybench_common::error::{BuildError, Result};
use polybench_common::naming::ImageName;
use polybench_common::types::{BuildOutcome, Language, LogTail};
use polybench_common::Config;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::recipes;

/// Container Engine - Abstraction over the image daemon
///
/// **Critical Architectural Boundary:**
/// - Engine knows HOW to query and build images (Docker today)
/// - Engine does NOT know phase ordering or skip rules
/// - Engine folds its own failures into `BuildOutcome`, so build calls
///   never abort the run with a raw transport error
///
/// Any implementation must guarantee:
/// 1. `image_exists` errors propagate - a failed query is never "absent"
/// 2. Build outcomes report success iff the daemon tagged the image
/// 3. The captured log tail preserves original line order
#[async_trait]
pub trait ContainerEngine {
    /// Whether an image with this exact name exists locally
    async fn image_exists(&self, image: &ImageName) -> Result<bool>;

    /// Build the per-language base image from its fixed recipe
    async fn build_base_image(&self, language: Language) -> BuildOutcome;

    /// Build an instance image from a cloned workspace
    ///
    /// The inline dockerfile payload is staged into the workspace first,
    /// replacing any Dockerfile the repository itself ships
    async fn build_instance_image(
        &self,
        workspace: &Path,
        dockerfile: &str,
        image: &ImageName,
    ) -> BuildOutcome;
}

/// Docker-backed engine over a shared daemon client
///
/// The client is constructed once by the caller and injected; the daemon
/// only applies the target tag when a build completes, so a failed build
/// never leaves the instance name behind
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    pub fn new(docker: Docker) -> Self {
        DockerEngine { docker }
    }

    /// Connect to the daemon described by the config
    ///
    /// The configured timeout must cover a full cold-cache base-image
    /// build, not just quick API calls
    pub fn connect(config: &Config) -> anyhow::Result<Self> {
        use anyhow::Context;

        let docker = if config.docker_host.starts_with("tcp://")
            || config.docker_host.starts_with("http://")
        {
            Docker::connect_with_http(
                &config.docker_host,
                config.docker_timeout_secs,
                bollard::API_DEFAULT_VERSION,
            )
        } else {
            Docker::connect_with_local(
                &config.docker_host,
                config.docker_timeout_secs,
                bollard::API_DEFAULT_VERSION,
            )
        }
        .context("Failed to connect to Docker daemon")?;

        Ok(DockerEngine::new(docker))
    }

    /// Run one build against the daemon, streaming log output into a
    /// bounded tail
    async fn run_build(&self, tar: Vec<u8>, image: &ImageName) -> BuildOutcome {
        let options = BuildImageOptions::<String> {
            dockerfile: "Dockerfile".to_string(),
            t: image.as_str().to_string(),
            rm: true,
            ..Default::default()
        };

        let mut stream = self.docker.build_image(options, None, Some(tar.into()));
        let mut tail = LogTail::new();
        let mut failure: Option<String> = None;

        while let Some(message) = stream.next().await {
            match message {
                Ok(info) => {
                    if let Some(chunk) = info.stream {
                        tail.push_chunk(&chunk);
                    }
                    if let Some(aux) = info.aux {
                        debug!(image_id = ?aux.id, "daemon reported image id");
                    }
                    if info.error.is_some() || info.error_detail.is_some() {
                        let detail = info
                            .error_detail
                            .and_then(|d| d.message)
                            .or(info.error)
                            .unwrap_or_else(|| "build failed".to_string());
                        failure.get_or_insert(detail);
                    }
                }
                Err(e) => {
                    failure.get_or_insert(e.to_string());
                    break;
                }
            }
        }

        match failure {
            None => BuildOutcome::ok(tail),
            Some(reason) => BuildOutcome::failed(reason, tail),
        }
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn image_exists(&self, image: &ImageName) -> Result<bool> {
        match self.docker.inspect_image(image.as_str()).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(BuildError::RegistryQuery {
                image: image.as_str().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn build_base_image(&self, language: Language) -> BuildOutcome {
        let Some(recipe) = recipes::base_dockerfile(language) else {
            return BuildOutcome::failed(
                format!("no base image recipe for {language}"),
                LogTail::new(),
            );
        };

        let image = polybench_common::naming::base_image(language);
        let tar = match tar_dockerfile_only(recipe) {
            Ok(tar) => tar,
            Err(e) => {
                return BuildOutcome::failed(
                    format!("failed to stage build context: {e}"),
                    LogTail::new(),
                )
            }
        };

        debug!(image = %image, context_bytes = tar.len(), "starting base image build");
        self.run_build(tar, &image).await
    }

    async fn build_instance_image(
        &self,
        workspace: &Path,
        dockerfile: &str,
        image: &ImageName,
    ) -> BuildOutcome {
        // The inline payload replaces whatever Dockerfile the repo ships
        if let Err(e) = fs::write(workspace.join("Dockerfile"), dockerfile) {
            return BuildOutcome::failed(
                format!("failed to stage Dockerfile into workspace: {e}"),
                LogTail::new(),
            );
        }

        let tar = match tar_directory(workspace) {
            Ok(tar) => tar,
            Err(e) => {
                return BuildOutcome::failed(
                    format!("failed to stage build context: {e}"),
                    LogTail::new(),
                )
            }
        };

        debug!(image = %image, context_bytes = tar.len(), "starting instance image build");
        self.run_build(tar, image).await
    }
}

/// Tar up a whole directory as a build context
/// The cloned tree goes in as-is, `.git` included - instance Dockerfiles
/// are free to inspect repository history
fn tar_directory(dir: &Path) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.append_dir_all(".", dir)?;
    builder.into_inner()
}

/// Build context holding only a Dockerfile entry
/// Base recipes reference no local files, so nothing else ships
fn tar_dockerfile_only(dockerfile: &str) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(dockerfile.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, "Dockerfile", dockerfile.as_bytes())?;
    builder.into_inner()
}
