//! Path resolver: turns a tool spec plus the bound map profile into a
//! concrete executable and argument vector.
//!
//! Resolution is pure. The executable is not checked for existence here; a
//! missing binary surfaces as a spawn error when the invoker runs it.

pub mod lookup;
pub mod placeholder;

pub use lookup::{DefaultLookup, ToolLookupTable};
pub use placeholder::PlaceholderValues;

use crate::error::EngineError;
use crate::model::{DEFAULT_ARTIFACT_EXTENSION, MapProfile, ToolSpec};

/// Executable and literal argv for one tool, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Logical tool name from the profile.
    pub tool: String,
    pub exec: String,
    pub argv: Vec<String>,
}

impl std::fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.exec)?;
        for a in &self.argv {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    lookups: ToolLookupTable,
    artifact_extension: String,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(ToolLookupTable::default(), DEFAULT_ARTIFACT_EXTENSION)
    }
}

impl PathResolver {
    pub fn new(lookups: ToolLookupTable, artifact_extension: &str) -> Self {
        Self {
            lookups,
            artifact_extension: artifact_extension.to_string(),
        }
    }

    pub fn artifact_extension(&self) -> &str {
        &self.artifact_extension
    }

    pub fn resolve(
        &self,
        tool: &ToolSpec,
        map: &MapProfile,
    ) -> Result<ResolvedCommand, EngineError> {
        let values = PlaceholderValues::for_map(map, &self.artifact_extension);
        self.resolve_with(tool, map, &values)
    }

    fn resolve_with(
        &self,
        tool: &ToolSpec,
        map: &MapProfile,
        values: &PlaceholderValues,
    ) -> Result<ResolvedCommand, EngineError> {
        if tool.name.trim().is_empty() {
            return Err(EngineError::config(&map.name, "tool name", "is empty"));
        }
        let exec = match tool.path.as_deref() {
            Some(p) => p.to_string(),
            None => self.lookups.get(&tool.name).exec_for(&tool.name),
        };
        let argv = tool
            .args
            .iter()
            .map(|a| placeholder::substitute(a, values, &map.name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResolvedCommand {
            tool: tool.name.clone(),
            exec,
            argv,
        })
    }

    /// Resolve a whole tool list, failing on the first config error.
    pub fn resolve_all(
        &self,
        tools: &[ToolSpec],
        map: &MapProfile,
    ) -> Result<Vec<ResolvedCommand>, EngineError> {
        let values = PlaceholderValues::for_map(map, &self.artifact_extension);
        tools
            .iter()
            .map(|t| self.resolve_with(t, map, &values))
            .collect()
    }
}
