//! Wire schema shared with the orchestration runtime.
//!
//! A `Space` message carries a one-of (`kind`) selecting among `discrete`,
//! `box`, `multi_binary`, `multi_discrete` and `dict`; numeric payloads are
//! `Array` messages. The byte transport is JSON. Changing any of these shapes
//! is a breaking schema change.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::array::DType;
use crate::core::{Result, SpaceError};

/// Encoded numeric array. Exactly one of the payload fields is filled by the
/// encoder; see `crate::array::serialization`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Array {
    #[serde(default)]
    pub dtype: Option<DType>,
    #[serde(default)]
    pub shape: Vec<u64>,
    #[serde(default)]
    pub raw_data: Vec<u8>,
    #[serde(default, with = "double_data")]
    pub double_data: Vec<f64>,
    #[serde(default)]
    pub int32_data: Vec<i32>,
    #[serde(default)]
    pub int64_data: Vec<i64>,
    #[serde(default)]
    pub uint32_data: Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Discrete {
    pub n: i64,
    #[serde(default)]
    pub start: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    pub low: Array,
    pub high: Array,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiBinary {
    pub n: Array,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiDiscrete {
    pub nvec: Array,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubSpace {
    pub key: String,
    pub space: Space,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dict {
    #[serde(default)]
    pub spaces: Vec<SubSpace>,
}

/// The populated one-of of a `Space`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceKind {
    Discrete(Discrete),
    Box(BoxSpace),
    MultiBinary(MultiBinary),
    MultiDiscrete(MultiDiscrete),
    Dict(Dict),
}

/// Tags understood by this schema version.
pub const SPACE_TAGS: [&str; 5] = ["discrete", "box", "multi_binary", "multi_discrete", "dict"];

impl SpaceKind {
    pub fn tag(&self) -> &'static str {
        match self {
            SpaceKind::Discrete(_) => "discrete",
            SpaceKind::Box(_) => "box",
            SpaceKind::MultiBinary(_) => "multi_binary",
            SpaceKind::MultiDiscrete(_) => "multi_discrete",
            SpaceKind::Dict(_) => "dict",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Space {
    #[serde(default)]
    pub kind: Option<SpaceKind>,
}

impl Space {
    pub fn new(kind: SpaceKind) -> Self { Self { kind: Some(kind) } }

    /// Name of the populated one-of field, if any.
    pub fn which_one_of(&self) -> Option<&'static str> {
        self.kind.as_ref().map(SpaceKind::tag)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a JSON-encoded space. A tag this schema does not know, anywhere
    /// in the tree, is reported as `UnsupportedSpaceType` carrying the tag.
    ///
    /// Nesting depth is bounded by the stack only, matching what `to_json_vec`
    /// can produce.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let mut de = serde_json::Deserializer::from_slice(bytes);
        de.disable_recursion_limit();
        let value = Value::deserialize(&mut de)?;
        de.end()?;
        if let Some(tag) = find_unknown_tag(&value) {
            return Err(SpaceError::UnsupportedSpaceType(tag));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// First tag outside `SPACE_TAGS`, walking dict children depth-first in order.
fn find_unknown_tag(root: &Value) -> Option<String> {
    let mut pending = vec![root];
    while let Some(space) = pending.pop() {
        let Some(kind) = space.get("kind").and_then(Value::as_object) else { continue };
        for (tag, body) in kind {
            if !SPACE_TAGS.contains(&tag.as_str()) {
                return Some(tag.clone());
            }
            if tag == "dict" {
                let subs = body.get("spaces").and_then(Value::as_array);
                let children: Vec<&Value> = subs.into_iter().flatten().filter_map(|sub| sub.get("space")).collect();
                pending.extend(children.into_iter().rev());
            }
        }
    }
    None
}
