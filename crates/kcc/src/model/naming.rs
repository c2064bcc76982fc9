//! Artifact naming shared by the runner and the launcher.

use std::path::{Path, PathBuf};

/// Extension of the compiled map when none is configured.
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "bsp";

/// File stem of the map source (`/maps/e1m1.map` -> `e1m1`).
pub fn map_stem(map_source: &str) -> Option<String> {
    Path::new(map_source)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Compiled output written next to the source by the compile tools.
pub fn compiled_artifact(map_source: &str, extension: &str) -> PathBuf {
    Path::new(map_source).with_extension(extension)
}

/// Location of the placed artifact inside the game's maps folder.
pub fn placed_artifact(map_dest: &str, stem: &str, extension: &str) -> PathBuf {
    Path::new(map_dest).join(format!("{stem}.{extension}"))
}
