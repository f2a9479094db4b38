use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

// --- Identifiers ---
pub type FeatureId = i64;
pub type Tags = BTreeMap<String, String>;

// --- Geographic Space ---
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

// --- Block Space ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockCoordinate {
    pub x: i32,
    pub z: i32,
}

impl BlockCoordinate {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// True when `other` is one of the 8 neighbours of this cell.
    pub fn touches(&self, other: &BlockCoordinate) -> bool {
        let dx = (self.x - other.x).abs();
        let dz = (self.z - other.z).abs();
        dx <= 1 && dz <= 1 && (dx + dz) > 0
    }
}

// --- Features ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Node,
    Way,
    Relation,
}

impl FeatureKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "node" => Some(FeatureKind::Node),
            "way" => Some(FeatureKind::Way),
            "relation" => Some(FeatureKind::Relation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Node => "node",
            FeatureKind::Way => "way",
            FeatureKind::Relation => "relation",
        }
    }
}

/// Identity of a geographic entity, independent of where it projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub kind: FeatureKind,
    pub id: FeatureId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub kind: Option<FeatureKind>,
    pub reference: Option<FeatureId>,
    pub role: Option<String>,
    pub geometry: Vec<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub kind: FeatureKind,
    pub id: Option<FeatureId>,
    pub tags: Tags,
    /// Own position, only ever set for nodes.
    pub position: Option<GeoPoint>,
    pub geometry: Vec<GeoPoint>,
    pub members: Vec<Member>,
}

impl Feature {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|v| v.as_str())
    }

    pub fn entity_key(&self) -> Option<EntityKey> {
        self.id.map(|id| EntityKey { kind: self.kind, id })
    }

    /// Decodes one element of the input schema.
    pub fn from_value(value: Value) -> Result<Self, ElementError> {
        if !value.is_object() {
            return Err(ElementError::NotAnObject);
        }
        let raw: RawElement = serde_json::from_value(value).map_err(ElementError::Shape)?;
        raw.try_into()
    }
}

#[derive(Debug, Error)]
pub enum ElementError {
    #[error("element is not a JSON object")]
    NotAnObject,
    #[error("unknown element type: {0}")]
    UnknownKind(String),
    #[error("malformed element: {0}")]
    Shape(#[source] serde_json::Error),
}

// --- Wire Schema ---
#[derive(Debug, Clone, Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<FeatureId>,
    #[serde(default)]
    tags: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    geometry: Vec<GeoPoint>,
    #[serde(default)]
    members: Vec<RawMember>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawMember {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "ref", default)]
    reference: Option<FeatureId>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    geometry: Vec<GeoPoint>,
}

impl TryFrom<RawElement> for Feature {
    type Error = ElementError;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        let kind = FeatureKind::parse(&raw.kind).ok_or(ElementError::UnknownKind(raw.kind))?;

        let position = match (kind, raw.lat, raw.lon) {
            (FeatureKind::Node, Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        };

        let members = raw
            .members
            .into_iter()
            .map(|m| Member {
                kind: m.kind.as_deref().and_then(FeatureKind::parse),
                reference: m.reference,
                role: m.role,
                geometry: m.geometry,
            })
            .collect();

        Ok(Feature {
            kind,
            id: raw.id,
            tags: raw.tags.map(stringify_tags).unwrap_or_default(),
            position,
            geometry: raw.geometry,
            members,
        })
    }
}

fn stringify_tags(map: serde_json::Map<String, Value>) -> Tags {
    map.into_iter()
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::String(s) => Some((k, s)),
            other => Some((k, other.to_string())),
        })
        .collect()
}
