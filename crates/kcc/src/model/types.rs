use serde::{Deserialize, Serialize};

/// Named, ordered list of tool invocations. Order is execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProfile {
    pub name: String,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

/// One step of a build profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Logical tool id (`qbsp`, `light`, `vis`); selects the default lookup.
    pub name: String,
    /// Executable override. Persisted as `false` when unset.
    #[serde(default, with = "path_or_false")]
    pub path: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

/// A map's source file, the game's maps folder, and the target game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapProfile {
    pub name: String,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub map_source: String,
    #[serde(default)]
    pub map_dest: String,
}

/// On-disk profile file: `{ "builds": [...], "maps": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFile {
    #[serde(default)]
    pub builds: Vec<BuildProfile>,
    #[serde(default)]
    pub maps: Vec<MapProfile>,
}

/// `path` accepts a string, `null`, or `false`; unset is written back as `false`.
mod path_or_false {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Path(String),
        Flag(bool),
    }

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(p) => s.serialize_str(p),
            None => s.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        match Option::<Raw>::deserialize(d)? {
            Some(Raw::Path(p)) if !p.trim().is_empty() => Ok(Some(p)),
            Some(Raw::Flag(true)) => Err(serde::de::Error::custom(
                "tool path must be a string or false",
            )),
            _ => Ok(None),
        }
    }
}
