//! Error taxonomy for the pipeline engine and the profile store.

use std::path::PathBuf;
use std::time::Duration;

/// Failures surfaced by the resolver, invoker, runner, and launcher.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A profile field the engine needs is missing or empty.
    #[error("config error in profile '{profile}': {field} {reason}")]
    Config {
        profile: String,
        field: String,
        reason: String,
    },

    /// The executable could not be started.
    #[error("failed to start '{tool}' ({exec}): {source}")]
    Spawn {
        tool: String,
        exec: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and reported failure.
    #[error("tool '{tool}' ({exec}) failed with {}", describe_code(.code))]
    ToolFailure {
        tool: String,
        exec: String,
        code: Option<i32>,
    },

    /// The tool exceeded the configured timeout and was killed.
    #[error("tool '{tool}' timed out after {}s and was terminated", .timeout.as_secs())]
    ToolTimeout { tool: String, timeout: Duration },

    /// The run was interrupted while the tool was running.
    #[error("tool '{tool}' interrupted; partial output left in place")]
    Cancelled { tool: String },

    /// The compiled output could not be placed.
    #[error("artifact error at {}: {reason}", .path.display())]
    Artifact { path: PathBuf, reason: String },

    /// Nothing to launch for this map profile.
    #[error("no compiled map for profile '{profile}' at {}", .path.display())]
    NotFound { profile: String, path: PathBuf },
}

impl EngineError {
    pub fn config(profile: &str, field: &str, reason: impl Into<String>) -> Self {
        EngineError::Config {
            profile: profile.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Which profile table a store error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Build,
    Map,
}

impl std::fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileKind::Build => f.write_str("build"),
            ProfileKind::Map => f.write_str("map"),
        }
    }
}

/// Failures from the JSON-backed profile store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} profile '{name}' not found")]
    NotFound { kind: ProfileKind, name: String },

    #[error("{kind} profile '{name}' already exists")]
    AlreadyExists { kind: ProfileKind, name: String },

    #[error("{kind} profile name must not be empty")]
    EmptyName { kind: ProfileKind },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid profile file {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode profiles: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failure_message_names_tool_and_code() {
        let e = EngineError::ToolFailure {
            tool: "qbsp".into(),
            exec: "qbsp".into(),
            code: Some(1),
        };
        assert_eq!(e.to_string(), "tool 'qbsp' (qbsp) failed with exit code 1");

        let e = EngineError::ToolFailure {
            tool: "vis".into(),
            exec: "/opt/vis".into(),
            code: None,
        };
        assert!(e.to_string().contains("terminated by signal"));
    }

    #[test]
    fn config_error_names_field() {
        let e = EngineError::config("e1m1", "map_source", "is empty");
        assert_eq!(
            e.to_string(),
            "config error in profile 'e1m1': map_source is empty"
        );
    }

    #[test]
    fn store_errors_name_profile_kind() {
        let e = StoreError::AlreadyExists {
            kind: ProfileKind::Build,
            name: "fast".into(),
        };
        assert_eq!(e.to_string(), "build profile 'fast' already exists");
    }
}
