//! Argument placeholders filled from the bound map profile.

use crate::error::EngineError;
use crate::model::{MapProfile, compiled_artifact, map_stem};

pub const SRC: &str = "<SRC>";
pub const DEST: &str = "<DEST>";
pub const BSP: &str = "<BSP>";
pub const MAP: &str = "<MAP>";

/// Values available for substitution, computed once per map profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderValues {
    pub src: String,
    pub dest: String,
    pub bsp: String,
    pub map: String,
}

impl PlaceholderValues {
    pub fn for_map(map: &MapProfile, artifact_extension: &str) -> Self {
        let bsp = if map.map_source.is_empty() {
            String::new()
        } else {
            compiled_artifact(&map.map_source, artifact_extension)
                .display()
                .to_string()
        };
        Self {
            src: map.map_source.clone(),
            dest: map.map_dest.clone(),
            bsp,
            map: map_stem(&map.map_source).unwrap_or_default(),
        }
    }
}

/// Replace every placeholder inside `token` in one left-to-right pass, so
/// substituted values are never rescanned. A placeholder whose backing value
/// is missing is a config error naming the field.
pub fn substitute(
    token: &str,
    values: &PlaceholderValues,
    profile: &str,
) -> Result<String, EngineError> {
    if !token.contains('<') {
        return Ok(token.to_string());
    }
    let table: [(&str, &str, &str); 4] = [
        (SRC, values.src.as_str(), "map_source"),
        (DEST, values.dest.as_str(), "map_dest"),
        (BSP, values.bsp.as_str(), "map_source"),
        (MAP, values.map.as_str(), "map_source"),
    ];

    let mut out = String::with_capacity(token.len());
    let mut rest = token;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match table.iter().find(|(marker, ..)| tail.starts_with(marker)) {
            Some(&(marker, value, field)) => {
                if value.is_empty() {
                    let state = if marker == MAP && !values.src.is_empty() {
                        "has no file name"
                    } else {
                        "is empty"
                    };
                    return Err(EngineError::config(
                        profile,
                        field,
                        format!("{state} but argument '{token}' uses {marker}"),
                    ));
                }
                out.push_str(value);
                rest = &tail[marker.len()..];
            }
            None => {
                out.push('<');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> PlaceholderValues {
        PlaceholderValues::for_map(
            &MapProfile {
                name: "e1m1".into(),
                game: "quake".into(),
                map_source: "/src/e1m1.map".into(),
                map_dest: "/game/maps".into(),
            },
            "bsp",
        )
    }

    #[test]
    fn whole_and_embedded_tokens() {
        let v = values();
        assert_eq!(substitute("<SRC>", &v, "e1m1").unwrap(), "/src/e1m1.map");
        assert_eq!(substitute("<BSP>", &v, "e1m1").unwrap(), "/src/e1m1.bsp");
        assert_eq!(
            substitute("-out=<DEST>/<MAP>.bsp", &v, "e1m1").unwrap(),
            "-out=/game/maps/e1m1.bsp"
        );
    }

    #[test]
    fn literals_and_unknown_markers_pass_through() {
        let v = values();
        assert_eq!(substitute("-nofill", &v, "e1m1").unwrap(), "-nofill");
        assert_eq!(substitute("<OTHER>", &v, "e1m1").unwrap(), "<OTHER>");
    }

    #[test]
    fn empty_field_is_config_error() {
        let v = PlaceholderValues::for_map(
            &MapProfile {
                name: "blank".into(),
                game: String::new(),
                map_source: String::new(),
                map_dest: String::new(),
            },
            "bsp",
        );
        let err = substitute("<DEST>", &v, "blank").unwrap_err();
        match err {
            EngineError::Config { profile, field, .. } => {
                assert_eq!(profile, "blank");
                assert_eq!(field, "map_dest");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(substitute("<MAP>", &v, "blank").is_err());
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let v = PlaceholderValues::for_map(
            &MapProfile {
                name: "odd".into(),
                game: "quake".into(),
                map_source: "/maps/<DEST>/e1m1.map".into(),
                map_dest: "/game/maps".into(),
            },
            "bsp",
        );
        assert_eq!(
            substitute("<SRC>", &v, "odd").unwrap(),
            "/maps/<DEST>/e1m1.map"
        );
        assert_eq!(
            substitute("<DEST>|<SRC>", &v, "odd").unwrap(),
            "/game/maps|/maps/<DEST>/e1m1.map"
        );
        assert_eq!(substitute("a<b<SRC>", &v, "odd").unwrap(), "a<b/maps/<DEST>/e1m1.map");
    }

    #[test]
    fn source_without_file_name_is_reported_as_such() {
        let v = PlaceholderValues::for_map(
            &MapProfile {
                name: "root".into(),
                game: "quake".into(),
                map_source: "/".into(),
                map_dest: "/game/maps".into(),
            },
            "bsp",
        );
        match substitute("+map <MAP>", &v, "root").unwrap_err() {
            EngineError::Config { field, reason, .. } => {
                assert_eq!(field, "map_source");
                assert!(reason.starts_with("has no file name"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
