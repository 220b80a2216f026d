//! Shape descriptors and the providers that supply them.
//!
//! A shape is the declarative description of one content type: its name,
//! optional overrides, and an ordered list of members. Each member is either a
//! single field kind (a simple region) or a nested list of fields (a complex
//! region), optionally repeated as a collection.
//!
//! On disk a shape is one YAML document:
//!
//! ```yaml
//! name: Article
//! routes: [/article]
//! members:
//!   - name: Body
//!     kind: Markdown
//!   - name: Hero
//!     fields:
//!       - name: Title
//!         kind: String
//!       - name: Image
//!         kind: Image
//!   - name: Gallery
//!     collection: true
//!     kind: Image
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, trace};

use crate::error::{Result, SchemaError};
use crate::types::Settings;

/// Declarative description of one content type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<String>,
    #[serde(default)]
    pub members: Vec<MemberDescriptor>,
}

impl ShapeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            internal_id: None,
            title: None,
            description: None,
            routes: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn internal_id(mut self, id: impl Into<String>) -> Self {
        self.internal_id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.routes.push(route.into());
        self
    }

    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }
}

/// One declared member of a shape; becomes a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMember", into = "RawMember")]
pub struct MemberDescriptor {
    pub name: String,
    pub internal_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
    pub collection: bool,
    pub shape: MemberShape,
}

/// What a member exposes.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberShape {
    /// A single field kind
    Field { kind: String, settings: Settings },
    /// A nested shape whose members are fields
    Nested { fields: Vec<FieldMember> },
}

impl MemberDescriptor {
    /// A simple member exposing one field kind.
    pub fn field(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::with_shape(
            name,
            MemberShape::Field {
                kind: kind.into(),
                settings: Settings::new(),
            },
        )
    }

    /// A complex member exposing a nested list of fields.
    pub fn nested(name: impl Into<String>, fields: Vec<FieldMember>) -> Self {
        Self::with_shape(name, MemberShape::Nested { fields })
    }

    fn with_shape(name: impl Into<String>, shape: MemberShape) -> Self {
        Self {
            name: name.into(),
            internal_id: None,
            title: None,
            description: None,
            sort_order: None,
            collection: false,
            shape,
        }
    }

    pub fn collection(mut self) -> Self {
        self.collection = true;
        self
    }

    pub fn sort_order(mut self, order: i32) -> Self {
        self.sort_order = Some(order);
        self
    }

    pub fn internal_id(mut self, id: impl Into<String>) -> Self {
        self.internal_id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a setting to a simple member. Ignored for nested members.
    pub fn setting(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        if let MemberShape::Field { settings, .. } = &mut self.shape {
            settings.insert(key.into(), value);
        }
        self
    }
}

/// A field inside a nested member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMember {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub settings: Settings,
}

impl FieldMember {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            internal_id: None,
            title: None,
            description: None,
            sort_order: None,
            settings: Settings::new(),
        }
    }

    pub fn sort_order(mut self, order: i32) -> Self {
        self.sort_order = Some(order);
        self
    }

    pub fn internal_id(mut self, id: impl Into<String>) -> Self {
        self.internal_id = Some(id.into());
        self
    }

    pub fn setting(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }
}

/// Flat on-disk form of a member: exactly one of `kind` or `fields`.
#[derive(Serialize, Deserialize)]
struct RawMember {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    internal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_order: Option<i32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    collection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldMember>>,
}

impl TryFrom<RawMember> for MemberDescriptor {
    type Error = String;

    fn try_from(raw: RawMember) -> std::result::Result<Self, Self::Error> {
        let shape = match (raw.kind, raw.fields) {
            (Some(kind), None) => MemberShape::Field {
                kind,
                settings: raw.settings,
            },
            (None, Some(fields)) => MemberShape::Nested { fields },
            (Some(_), Some(_)) => {
                return Err(format!(
                    "member '{}' declares both 'kind' and 'fields'",
                    raw.name
                ))
            }
            (None, None) => {
                return Err(format!(
                    "member '{}' must declare either 'kind' or 'fields'",
                    raw.name
                ))
            }
        };
        Ok(MemberDescriptor {
            name: raw.name,
            internal_id: raw.internal_id,
            title: raw.title,
            description: raw.description,
            sort_order: raw.sort_order,
            collection: raw.collection,
            shape,
        })
    }
}

impl From<MemberDescriptor> for RawMember {
    fn from(m: MemberDescriptor) -> Self {
        let (kind, settings, fields) = match m.shape {
            MemberShape::Field { kind, settings } => (Some(kind), settings, None),
            MemberShape::Nested { fields } => (None, Settings::new(), Some(fields)),
        };
        RawMember {
            name: m.name,
            internal_id: m.internal_id,
            title: m.title,
            description: m.description,
            sort_order: m.sort_order,
            collection: m.collection,
            kind,
            settings,
            fields,
        }
    }
}

/// Source of shape descriptors.
///
/// Iteration order must be stable within one discovery pass; the builder
/// assigns nothing from it except error attribution.
#[async_trait]
pub trait ShapeProvider: Send + Sync {
    async fn shapes(&self) -> Result<Vec<ShapeDescriptor>>;
}

/// Shapes declared in code.
#[derive(Debug, Clone, Default)]
pub struct StaticShapes {
    shapes: Vec<ShapeDescriptor>,
}

impl StaticShapes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(mut self, shape: ShapeDescriptor) -> Self {
        self.shapes.push(shape);
        self
    }
}

impl From<Vec<ShapeDescriptor>> for StaticShapes {
    fn from(shapes: Vec<ShapeDescriptor>) -> Self {
        Self { shapes }
    }
}

#[async_trait]
impl ShapeProvider for StaticShapes {
    async fn shapes(&self) -> Result<Vec<ShapeDescriptor>> {
        Ok(self.shapes.clone())
    }
}

/// Shapes read from a directory of YAML files, one shape per file.
///
/// Files are read in file-name order. A missing directory yields no shapes;
/// a file that does not parse fails the whole read, so a typo never looks
/// like a deleted content type.
#[derive(Debug, Clone)]
pub struct YamlShapeProvider {
    dir: PathBuf,
}

impl YamlShapeProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[async_trait]
impl ShapeProvider for YamlShapeProvider {
    async fn shapes(&self) -> Result<Vec<ShapeDescriptor>> {
        if !fs::try_exists(&self.dir).await? {
            debug!(dir = %self.dir.display(), "shape directory missing, no shapes declared");
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_yaml(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut shapes = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path).await?;
            let shape: ShapeDescriptor = serde_yaml_ng::from_str(&content)
                .map_err(|source| SchemaError::ShapeFile {
                    path: path.clone(),
                    source,
                })?;
            trace!(path = %path.display(), shape = %shape.name, "loaded shape");
            shapes.push(shape);
        }
        debug!(dir = %self.dir.display(), count = shapes.len(), "loaded shapes");
        Ok(shapes)
    }
}
