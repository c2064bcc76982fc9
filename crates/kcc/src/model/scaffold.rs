//! Default shapes for freshly created profiles.

use super::types::{BuildProfile, MapProfile, ToolSpec};

/// Tools every new build profile starts with, in pipeline order.
pub const SCAFFOLD_TOOLS: [&str; 3] = ["qbsp", "light", "vis"];

pub fn scaffold_build(name: &str) -> BuildProfile {
    BuildProfile {
        name: name.to_string(),
        tools: SCAFFOLD_TOOLS
            .iter()
            .map(|t| ToolSpec {
                name: (*t).to_string(),
                path: None,
                args: Vec::new(),
            })
            .collect(),
    }
}

pub fn scaffold_map(name: &str) -> MapProfile {
    MapProfile {
        name: name.to_string(),
        game: String::new(),
        map_source: String::new(),
        map_dest: String::new(),
    }
}
