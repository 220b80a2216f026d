//! The schema graph: content types, regions and field definitions.
//!
//! A freshly discovered graph carries no storage identity: `id`, `created` and
//! `last_modified` stay `None` until the synchronizer persists it. Identity
//! across rebuilds is the `internal_id`, unique within its parent.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Free-form per-field settings (select options, max length, placeholder...).
pub type Settings = BTreeMap<String, serde_json::Value>;

/// Whether `value` may be used as an internal id.
///
/// Internal ids name files in directory-backed stores, so they are limited to
/// ASCII alphanumerics, `_` and `-`.
pub fn is_valid_internal_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A named schema for a category of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Ulid>,
    pub internal_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<String>,
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ContentType {
    pub fn new(internal_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: None,
            internal_id: internal_id.into(),
            display_name: display_name.into(),
            description: None,
            routes: Vec::new(),
            regions: Vec::new(),
            created: None,
            last_modified: None,
        }
    }

    pub fn region(&self, internal_id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.internal_id == internal_id)
    }

    pub fn region_mut(&mut self, internal_id: &str) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.internal_id == internal_id)
    }

    /// A copy without regions, as written by a type-level upsert.
    pub fn header(&self) -> ContentType {
        ContentType {
            regions: Vec::new(),
            ..self.clone()
        }
    }

    /// Compare the declared attributes, ignoring identity, timestamps and regions.
    pub fn same_header(&self, other: &ContentType) -> bool {
        self.internal_id == other.internal_id
            && self.display_name == other.display_name
            && self.description == other.description
            && self.routes == other.routes
    }

    /// Sort regions and their fields by `(sort_order, internal_id)`.
    pub fn normalize_order(&mut self) {
        self.regions
            .sort_by(|a, b| (a.sort_order, &a.internal_id).cmp(&(b.sort_order, &b.internal_id)));
        for region in &mut self.regions {
            region.fields.sort_by(|a, b| {
                (a.sort_order, &a.internal_id).cmp(&(b.sort_order, &b.internal_id))
            });
        }
    }
}

/// A named group of fields within a content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Ulid>,
    pub internal_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_collection: bool,
    #[serde(default)]
    pub sort_order: u32,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl Region {
    pub fn field(&self, internal_id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.internal_id == internal_id)
    }

    /// A simple region carries exactly one field sharing the region's internal id.
    pub fn is_simple(&self) -> bool {
        self.fields.len() == 1 && self.fields[0].internal_id == self.internal_id
    }

    /// A copy without fields, as written by a region-level upsert.
    pub fn header(&self) -> Region {
        Region {
            fields: Vec::new(),
            ..self.clone()
        }
    }

    /// Compare the declared attributes, ignoring identity and fields.
    pub fn same_header(&self, other: &Region) -> bool {
        self.internal_id == other.internal_id
            && self.title == other.title
            && self.description == other.description
            && self.is_collection == other.is_collection
            && self.sort_order == other.sort_order
    }
}

/// A single typed value slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Ulid>,
    pub internal_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field kind name in the registry
    pub kind: String,
    /// Discriminator written next to stored values of this field
    pub discriminator: String,
    #[serde(default)]
    pub sort_order: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: Settings,
}

impl FieldDefinition {
    /// Compare the declared attributes, ignoring identity.
    pub fn same_definition(&self, other: &FieldDefinition) -> bool {
        self.internal_id == other.internal_id
            && self.title == other.title
            && self.description == other.description
            && self.kind == other.kind
            && self.discriminator == other.discriminator
            && self.sort_order == other.sort_order
            && self.settings == other.settings
    }
}

/// An ordered collection of content types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaGraph {
    pub types: Vec<ContentType>,
}

impl SchemaGraph {
    pub fn new(types: Vec<ContentType>) -> Self {
        Self { types }
    }

    pub fn content_type(&self, internal_id: &str) -> Option<&ContentType> {
        self.types.iter().find(|t| t.internal_id == internal_id)
    }

    pub fn internal_ids(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.internal_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Total number of regions across all types.
    pub fn region_count(&self) -> usize {
        self.types.iter().map(|t| t.regions.len()).sum()
    }

    /// Total number of field definitions across all types.
    pub fn field_count(&self) -> usize {
        self.types
            .iter()
            .flat_map(|t| &t.regions)
            .map(|r| r.fields.len())
            .sum()
    }
}
