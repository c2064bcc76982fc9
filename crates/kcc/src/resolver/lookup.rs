//! Default executable lookup per tool name.
//!
//! Tools without a `path` override are located through this table. Entries
//! come from the user config; names with no entry use the OS search path.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::{ToolLookupCfg, expand_home};

/// How to find a tool's executable when the profile does not name one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DefaultLookup {
    /// Run the tool name itself and let the OS search `PATH`.
    #[default]
    SearchPath,
    /// A fixed executable for this tool name.
    Executable(PathBuf),
    /// `<dir>/<tool name>`.
    Directory(PathBuf),
}

impl DefaultLookup {
    pub fn exec_for(&self, tool_name: &str) -> String {
        match self {
            DefaultLookup::SearchPath => tool_name.to_string(),
            DefaultLookup::Executable(p) => p.display().to_string(),
            DefaultLookup::Directory(d) => d.join(tool_name).display().to_string(),
        }
    }
}

/// Tool name to lookup strategy.
#[derive(Debug, Clone, Default)]
pub struct ToolLookupTable {
    pub by_name: HashMap<String, DefaultLookup>,
}

impl ToolLookupTable {
    pub fn get(&self, tool_name: &str) -> &DefaultLookup {
        static SEARCH_PATH: DefaultLookup = DefaultLookup::SearchPath;
        self.by_name.get(tool_name).unwrap_or(&SEARCH_PATH)
    }

    pub fn from_config(tools: &HashMap<String, ToolLookupCfg>) -> Self {
        let mut by_name = HashMap::new();
        for (name, cfg) in tools {
            let lookup = match (cfg.executable.as_deref(), cfg.directory.as_deref()) {
                (Some(exe), dir) => {
                    if dir.is_some() {
                        tracing::warn!(
                            "tool '{}' sets both executable and directory; using executable",
                            name
                        );
                    }
                    DefaultLookup::Executable(expand_home(exe))
                }
                (None, Some(dir)) => DefaultLookup::Directory(expand_home(dir)),
                (None, None) => DefaultLookup::SearchPath,
            };
            tracing::debug!("tool lookup: {} -> {:?}", name, lookup);
            by_name.insert(name.clone(), lookup);
        }
        Self { by_name }
    }
}
