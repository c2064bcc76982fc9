//! Launcher for `play`: starts the game on the last compiled map without
//! running the pipeline.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use crate::config::{GameCfg, expand_home};
use crate::error::EngineError;
use crate::model::{MapProfile, map_stem, placed_artifact};
use crate::resolver::placeholder::{MAP, PlaceholderValues, substitute};

/// Executable and argument template for one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSpec {
    pub exec: String,
    /// May contain `<MAP>` (map stem) and `<BSP>` (placed artifact path).
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GameTable {
    pub by_game: HashMap<String, GameSpec>,
}

impl Default for GameTable {
    fn default() -> Self {
        let mut by_game = HashMap::new();
        by_game.insert(
            "quake".to_string(),
            GameSpec {
                exec: "quake".to_string(),
                args: vec!["+map".to_string(), MAP.to_string()],
            },
        );
        Self { by_game }
    }
}

impl GameTable {
    /// Built-in entries overlaid with the user's `[games.*]` tables.
    pub fn from_config(games: &HashMap<String, GameCfg>) -> Self {
        let mut table = Self::default();
        for (game, cfg) in games {
            table.by_game.insert(
                game.clone(),
                GameSpec {
                    exec: expand_home(&cfg.path).display().to_string(),
                    args: cfg.args.clone(),
                },
            );
        }
        table
    }
}

/// Starts a process without waiting for it.
pub trait GameSpawner {
    /// Returns the child's pid.
    fn spawn_detached(&self, exec: &str, argv: &[String]) -> std::io::Result<u32>;
}

/// Spawns the game with stdio detached in its own process group.
pub struct DetachedSpawner;

impl GameSpawner for DetachedSpawner {
    fn spawn_detached(&self, exec: &str, argv: &[String]) -> std::io::Result<u32> {
        let mut cmd = std::process::Command::new(exec);
        cmd.args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        let child = cmd.spawn()?;
        Ok(child.id())
    }
}

/// What was started.
#[derive(Debug, Clone)]
pub struct LaunchResult {
    pub exec: String,
    pub argv: Vec<String>,
    pub artifact: PathBuf,
    pub pid: u32,
}

pub struct Launcher<S: GameSpawner> {
    games: GameTable,
    artifact_extension: String,
    spawner: S,
}

impl<S: GameSpawner> Launcher<S> {
    pub fn new(games: GameTable, artifact_extension: &str, spawner: S) -> Self {
        Self {
            games,
            artifact_extension: artifact_extension.to_string(),
            spawner,
        }
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn play(&self, map: &MapProfile) -> Result<LaunchResult, EngineError> {
        if map.map_dest.trim().is_empty() {
            return Err(EngineError::config(&map.name, "map_dest", "is empty"));
        }
        let stem = map_stem(&map.map_source)
            .ok_or_else(|| EngineError::config(&map.name, "map_source", "is empty"))?;

        let artifact = placed_artifact(&map.map_dest, &stem, &self.artifact_extension);
        if !artifact.is_file() {
            return Err(EngineError::NotFound {
                profile: map.name.clone(),
                path: artifact,
            });
        }

        if map.game.trim().is_empty() {
            return Err(EngineError::config(&map.name, "game", "is empty"));
        }
        let spec = self.games.by_game.get(&map.game).ok_or_else(|| {
            EngineError::config(
                &map.name,
                "game",
                format!("'{}' has no launch settings", map.game),
            )
        })?;

        let values = PlaceholderValues {
            src: map.map_source.clone(),
            dest: map.map_dest.clone(),
            bsp: artifact.display().to_string(),
            map: stem,
        };
        let argv = spec
            .args
            .iter()
            .map(|a| substitute(a, &values, &map.name))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("launching {} {}", spec.exec, argv.join(" "));
        let pid = self
            .spawner
            .spawn_detached(&spec.exec, &argv)
            .map_err(|e| EngineError::Spawn {
                tool: map.game.clone(),
                exec: spec.exec.clone(),
                source: e,
            })?;
        tracing::debug!("game started pid={}", pid);

        Ok(LaunchResult {
            exec: spec.exec.clone(),
            argv,
            artifact,
            pid,
        })
    }
}
