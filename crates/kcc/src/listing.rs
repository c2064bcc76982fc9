//! Human-readable listings for `buildProfiles` and `mapProfiles`.

use std::fmt::Write as _;

use crate::model::{BuildProfile, MapProfile};

pub fn format_builds(builds: &[BuildProfile]) -> String {
    if builds.is_empty() {
        return "No build profiles. Create one with newBuild:<name>\n".to_string();
    }
    let mut out = String::new();
    for build in builds {
        let _ = writeln!(out, "BUILD: --> {} <--", build.name);
        if build.tools.is_empty() {
            let _ = writeln!(out, "\t(no tools)");
            out.push('\n');
        }
        for tool in &build.tools {
            let path = tool.path.as_deref().unwrap_or("Using Default");
            let _ = writeln!(out, "\tTOOL: {}", tool.name);
            let _ = writeln!(out, "\tPATH: {}", path);
            let _ = writeln!(out, "\tARGS: {}", tool.args.join(" "));
            out.push('\n');
        }
    }
    out
}

pub fn format_maps(maps: &[MapProfile]) -> String {
    if maps.is_empty() {
        return "No map profiles. Create one with newMap:<name>\n".to_string();
    }
    let unset = |s: &str| if s.is_empty() { "<unset>".to_string() } else { s.to_string() };
    let mut out = String::new();
    for map in maps {
        let _ = writeln!(out, "MAP: --> {} <--", map.name);
        let _ = writeln!(out, "\tGAME: {}", unset(&map.game));
        let _ = writeln!(out, "\tSOURCE: {}", unset(&map.map_source));
        let _ = writeln!(out, "\tDEST: {}", unset(&map.map_dest));
        out.push('\n');
    }
    out
}
