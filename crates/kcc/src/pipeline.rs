//! Pipeline runner: drives a build profile's tools in order against one map
//! profile, stops at the first failure, and places the compiled map.
//!
//! Every tool is resolved before anything runs, so a bad profile aborts the
//! run without touching the filesystem. After the last tool succeeds the
//! compiled artifact (`<map_source stem>.<ext>` next to the source) is copied
//! into `map_dest`, replacing any earlier copy.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::EngineError;
use crate::invoker::ToolInvoker;
use crate::model::{BuildProfile, MapProfile, compiled_artifact, map_stem, placed_artifact};
use crate::resolver::{PathResolver, ResolvedCommand};

/// One executed tool.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub tool: String,
    pub command: String,
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

/// Outcome of a pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    pub succeeded: bool,
    /// Tool that stopped the run, if a tool did.
    pub failed_at: Option<String>,
    pub copied: bool,
    /// Where the artifact was placed on a clean run.
    pub artifact: Option<PathBuf>,
    pub stages: Vec<StageReport>,
    pub error: Option<EngineError>,
}

impl PipelineResult {
    fn failed(stages: Vec<StageReport>, failed_at: Option<String>, error: EngineError) -> Self {
        Self {
            succeeded: false,
            failed_at,
            copied: false,
            artifact: None,
            stages,
            error: Some(error),
        }
    }
}

pub struct PipelineRunner<I: ToolInvoker> {
    resolver: PathResolver,
    invoker: I,
}

impl<I: ToolInvoker> PipelineRunner<I> {
    pub fn new(resolver: PathResolver, invoker: I) -> Self {
        Self { resolver, invoker }
    }

    pub async fn run(&self, build: &BuildProfile, map: &MapProfile) -> PipelineResult {
        tracing::info!(
            "pipeline start: build='{}' ({} tool(s)), map='{}'",
            build.name,
            build.tools.len(),
            map.name
        );

        let commands = match self.prepare(build, map) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("pipeline aborted before running tools: {}", e);
                return PipelineResult::failed(Vec::new(), None, e);
            }
        };

        let mut stages = Vec::with_capacity(commands.len());
        for (idx, cmd) in commands.iter().enumerate() {
            tracing::debug!("stage {}/{}: {}", idx + 1, commands.len(), cmd.tool);
            let outcome = match self.invoker.invoke(cmd).await {
                Ok(result) => {
                    stages.push(StageReport {
                        tool: cmd.tool.clone(),
                        command: cmd.to_string(),
                        exit_code: result.exit_code,
                        duration: result.duration,
                    });
                    result.into_outcome(cmd).map(|_| ())
                }
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                tracing::warn!("pipeline failed at '{}': {}", cmd.tool, e);
                return PipelineResult::failed(stages, Some(cmd.tool.clone()), e);
            }
        }

        match self.place_artifact(map).await {
            Ok(placed) => {
                tracing::info!("placed {}", placed.display());
                PipelineResult {
                    succeeded: true,
                    failed_at: None,
                    copied: true,
                    artifact: Some(placed),
                    stages,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!("tools succeeded but artifact placement failed: {}", e);
                PipelineResult::failed(stages, None, e)
            }
        }
    }

    fn prepare(
        &self,
        build: &BuildProfile,
        map: &MapProfile,
    ) -> Result<Vec<ResolvedCommand>, EngineError> {
        if map.map_source.trim().is_empty() {
            return Err(EngineError::config(&map.name, "map_source", "is empty"));
        }
        if map.map_dest.trim().is_empty() {
            return Err(EngineError::config(&map.name, "map_dest", "is empty"));
        }
        self.resolver.resolve_all(&build.tools, map)
    }

    async fn place_artifact(&self, map: &MapProfile) -> Result<PathBuf, EngineError> {
        let ext = self.resolver.artifact_extension();
        let source = Path::new(&map.map_source);
        if !source.is_file() {
            return Err(EngineError::Artifact {
                path: source.to_path_buf(),
                reason: "map source not found".into(),
            });
        }
        let compiled = compiled_artifact(&map.map_source, ext);
        if !compiled.is_file() {
            return Err(EngineError::Artifact {
                path: compiled,
                reason: "compiled map not found".into(),
            });
        }
        let stem = map_stem(&map.map_source).ok_or_else(|| EngineError::Artifact {
            path: source.to_path_buf(),
            reason: "map source has no file name".into(),
        })?;

        let dest_dir = Path::new(&map.map_dest);
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| EngineError::Artifact {
                path: dest_dir.to_path_buf(),
                reason: format!("cannot create destination: {e}"),
            })?;
        let placed = placed_artifact(&map.map_dest, &stem, ext);
        if same_file(&compiled, &placed).await {
            tracing::debug!("{} is already in place", placed.display());
            return Ok(placed);
        }

        // Stage beside the target, then rename over it.
        let copy_err = |e: std::io::Error| EngineError::Artifact {
            path: placed.clone(),
            reason: format!("copy from {} failed: {e}", compiled.display()),
        };
        let staged = tempfile::NamedTempFile::new_in(dest_dir).map_err(copy_err)?;
        tokio::fs::copy(&compiled, staged.path()).await.map_err(copy_err)?;
        staged.persist(&placed).map_err(|e| copy_err(e.error))?;
        Ok(placed)
    }
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
