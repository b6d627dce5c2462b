//! Configuration document: the five top-level declaration lists

use serde::Deserialize;
use serde_yaml::Value;

/// A parsed configuration document
///
/// Declarations are kept as raw value trees; the loader turns them into entities.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    /// `None` when the document has no `areas` key at all
    #[serde(default)]
    pub areas: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub robots: Vec<Value>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub packages: Vec<Value>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub images: Vec<Value>,
    /// Global images, owned by no robot
    #[serde(default, deserialize_with = "nullable_list")]
    pub globals: Vec<Value>,
}

impl Document {
    /// Parse a YAML document
    pub fn from_str(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }
}

/// An empty key (`robots:`) parses as null; treat it as an empty list
fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}
