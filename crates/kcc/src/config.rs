use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub pipeline: Option<PipelineCfg>,
    /// Default lookup per tool name, e.g. `[tools.qbsp]`.
    #[serde(default)]
    pub tools: HashMap<String, ToolLookupCfg>,
    /// Game launch settings per game id, e.g. `[games.quake]`.
    #[serde(default)]
    pub games: HashMap<String, GameCfg>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PipelineCfg {
    /// Per-tool timeout; 0 or absent means wait indefinitely.
    pub timeout_secs: Option<u64>,
    pub artifact_extension: Option<String>,
}

/// At most one of `executable` / `directory`; neither means search path.
#[derive(Debug, Default, Deserialize)]
pub struct ToolLookupCfg {
    pub executable: Option<String>,
    pub directory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GameCfg {
    pub path: String,
    #[serde(default)]
    pub args: Vec<String>,
}

pub fn load_user_config(kcc_home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = kcc_home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)?;
    let cfg: UserConfig = toml::from_str(&s)?;
    Ok(Some(cfg))
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}
