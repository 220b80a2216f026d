//! Turns shape descriptors into a schema graph.
//!
//! The builder never touches storage. Its output carries no ids or timestamps;
//! identity is the internal id, derived from the declared name unless the
//! shape overrides it.
//!
//! A type either builds completely or not at all. Any error inside one shape
//! (unknown field kind, clashing internal ids, an unusable override) drops
//! that type from the graph and is reported next to it.

use std::collections::HashSet;

use folio_common::Pretty;
use folio_fields::FieldKindRegistry;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, SchemaError};
use crate::shape::{FieldMember, MemberDescriptor, MemberShape, ShapeDescriptor};
use crate::types::{is_valid_internal_id, ContentType, FieldDefinition, Region, SchemaGraph};

/// A shape that failed to build.
#[derive(Debug)]
pub struct BuildFailure {
    /// Declared shape name
    pub shape: String,
    /// Resolved internal id, when resolution itself succeeded
    pub internal_id: Option<String>,
    pub error: SchemaError,
}

/// Output of a discovery pass.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub graph: SchemaGraph,
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Internal ids of the types that failed to build.
    pub fn failed_ids(&self) -> Vec<String> {
        self.failures
            .iter()
            .filter_map(|f| f.internal_id.clone())
            .collect()
    }
}

/// Derive an internal id from a declared name by keeping only ASCII
/// alphanumerics and `_`.
pub fn derive_internal_id(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// The override if present, else the id derived from `name`.
pub fn resolve_internal_id(explicit: Option<&str>, name: &str) -> Result<String> {
    let id = match explicit {
        Some(id) => id.to_string(),
        None => derive_internal_id(name),
    };
    if is_valid_internal_id(&id) {
        Ok(id)
    } else {
        Err(SchemaError::InvalidInternalId {
            value: explicit.unwrap_or(name).to_string(),
        })
    }
}

/// Order items by their override, falling back to enumeration position, and
/// renumber them `0..n`.
///
/// The sort is stable, so items with equal effective order keep their
/// declaration order.
pub fn ordered<T>(items: Vec<(Option<i32>, T)>) -> Vec<(u32, T)> {
    let mut keyed: Vec<(i64, T)> = items
        .into_iter()
        .enumerate()
        .map(|(position, (explicit, item))| {
            let effective = explicit.map(i64::from).unwrap_or(position as i64);
            (effective, item)
        })
        .collect();
    keyed.sort_by_key(|(effective, _)| *effective);
    keyed
        .into_iter()
        .enumerate()
        .map(|(order, (_, item))| (order as u32, item))
        .collect()
}

#[derive(Debug, Serialize)]
struct GraphSummary<'a> {
    types: Vec<&'a str>,
    regions: usize,
    fields: usize,
    failed: Vec<&'a str>,
}

/// Builds schema graphs against a field kind registry.
pub struct SchemaBuilder<'r> {
    registry: &'r FieldKindRegistry,
}

impl<'r> SchemaBuilder<'r> {
    pub fn new(registry: &'r FieldKindRegistry) -> Self {
        Self { registry }
    }

    /// Build every shape. Failing shapes are excluded from the graph and
    /// listed in the report; a repeated type internal id fails the later shape.
    pub fn build(&self, shapes: &[ShapeDescriptor]) -> BuildReport {
        let mut report = BuildReport::default();
        let mut seen = HashSet::new();

        for shape in shapes {
            match self.build_type(shape) {
                Ok(content_type) => {
                    if !seen.insert(content_type.internal_id.clone()) {
                        let error = SchemaError::DuplicateInternalId {
                            scope: "schema".to_string(),
                            internal_id: content_type.internal_id.clone(),
                        };
                        warn!(shape = %shape.name, %error, "content type excluded from schema");
                        // The earlier shape owns this id, nothing to hold
                        report.failures.push(BuildFailure {
                            shape: shape.name.clone(),
                            internal_id: None,
                            error,
                        });
                        continue;
                    }
                    report.graph.types.push(content_type);
                }
                Err(error) => {
                    warn!(shape = %shape.name, %error, "content type excluded from schema");
                    report.failures.push(BuildFailure {
                        shape: shape.name.clone(),
                        internal_id: resolve_internal_id(shape.internal_id.as_deref(), &shape.name)
                            .ok(),
                        error,
                    });
                }
            }
        }

        debug!(
            summary = %Pretty(GraphSummary {
                types: report.graph.internal_ids().collect(),
                regions: report.graph.region_count(),
                fields: report.graph.field_count(),
                failed: report.failures.iter().map(|f| f.shape.as_str()).collect(),
            }),
            "schema discovery finished"
        );
        report
    }

    /// Build a single content type.
    pub fn build_type(&self, shape: &ShapeDescriptor) -> Result<ContentType> {
        let internal_id = resolve_internal_id(shape.internal_id.as_deref(), &shape.name)?;

        let members = shape
            .members
            .iter()
            .map(|m| (m.sort_order, m))
            .collect::<Vec<_>>();
        let mut regions = Vec::with_capacity(members.len());
        let mut region_ids = HashSet::new();
        for (sort_order, member) in ordered(members) {
            let region = self.build_region(&internal_id, member, sort_order)?;
            if !region_ids.insert(region.internal_id.clone()) {
                return Err(SchemaError::DuplicateInternalId {
                    scope: format!("content type '{internal_id}'"),
                    internal_id: region.internal_id,
                });
            }
            regions.push(region);
        }

        Ok(ContentType {
            id: None,
            display_name: shape.title.clone().unwrap_or_else(|| shape.name.clone()),
            description: shape.description.clone(),
            routes: shape.routes.clone(),
            regions,
            created: None,
            last_modified: None,
            internal_id,
        })
    }

    fn build_region(
        &self,
        content_type: &str,
        member: &MemberDescriptor,
        sort_order: u32,
    ) -> Result<Region> {
        let internal_id = resolve_internal_id(member.internal_id.as_deref(), &member.name)?;
        let title = member.title.clone().unwrap_or_else(|| member.name.clone());

        let fields = match &member.shape {
            MemberShape::Field { kind, settings } => {
                let descriptor = self.registry.lookup(kind).ok_or_else(|| {
                    SchemaError::UnknownFieldKind {
                        content_type: content_type.to_string(),
                        member: member.name.clone(),
                        kind: kind.clone(),
                    }
                })?;
                vec![FieldDefinition {
                    id: None,
                    internal_id: internal_id.clone(),
                    title: title.clone(),
                    description: member.description.clone(),
                    kind: descriptor.name.clone(),
                    discriminator: descriptor.discriminator().to_string(),
                    sort_order: 0,
                    settings: settings.clone(),
                }]
            }
            MemberShape::Nested { fields } => {
                self.build_fields(content_type, &internal_id, &member.name, fields)?
            }
        };

        Ok(Region {
            id: None,
            internal_id,
            title,
            description: member.description.clone(),
            is_collection: member.collection,
            sort_order,
            fields,
        })
    }

    fn build_fields(
        &self,
        content_type: &str,
        region: &str,
        member_name: &str,
        fields: &[FieldMember],
    ) -> Result<Vec<FieldDefinition>> {
        let mut out = Vec::with_capacity(fields.len());
        let mut ids = HashSet::new();
        let entries = fields.iter().map(|f| (f.sort_order, f)).collect::<Vec<_>>();
        for (sort_order, field) in ordered(entries) {
            let descriptor = self.registry.lookup(&field.kind).ok_or_else(|| {
                SchemaError::UnknownFieldKind {
                    content_type: content_type.to_string(),
                    member: format!("{member_name}.{}", field.name),
                    kind: field.kind.clone(),
                }
            })?;
            let internal_id = resolve_internal_id(field.internal_id.as_deref(), &field.name)?;
            if !ids.insert(internal_id.clone()) {
                return Err(SchemaError::DuplicateInternalId {
                    scope: format!("region '{content_type}/{region}'"),
                    internal_id,
                });
            }
            out.push(FieldDefinition {
                id: None,
                internal_id,
                title: field.title.clone().unwrap_or_else(|| field.name.clone()),
                description: field.description.clone(),
                kind: descriptor.name.clone(),
                discriminator: descriptor.discriminator().to_string(),
                sort_order,
                settings: field.settings.clone(),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{FieldMember, MemberDescriptor};

    fn article() -> ShapeDescriptor {
        ShapeDescriptor::new("Article").member(MemberDescriptor::field("Body", "Text"))
    }

    #[test]
    fn article_with_simple_body() {
        let registry = FieldKindRegistry::with_defaults();
        let report = SchemaBuilder::new(&registry).build(&[article()]);
        assert!(report.is_complete());

        let graph = report.graph;
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.region_count(), 1);
        assert_eq!(graph.field_count(), 1);

        let region = &graph.types[0].regions[0];
        assert_eq!(region.internal_id, "Body");
        assert!(region.is_simple());
        assert_eq!(region.fields[0].internal_id, "Body");
        assert_eq!(region.fields[0].discriminator, "Text");
        assert!(graph.types[0].id.is_none());
    }

    #[test]
    fn discovery_is_deterministic() {
        let registry = FieldKindRegistry::with_defaults();
        let shapes = vec![
            article().member(
                MemberDescriptor::nested(
                    "Hero",
                    vec![
                        FieldMember::new("Title", "String"),
                        FieldMember::new("Image", "Image").sort_order(0),
                    ],
                )
                .sort_order(0),
            ),
            ShapeDescriptor::new("Blog Post").member(MemberDescriptor::field("Tags", "String").collection()),
        ];
        let builder = SchemaBuilder::new(&registry);
        let a = builder.build(&shapes).graph;
        let b = builder.build(&shapes).graph;
        assert_eq!(a, b);
    }

    #[test]
    fn complex_and_collection_members() {
        let registry = FieldKindRegistry::with_defaults();
        let shape = ShapeDescriptor::new("Page")
            .member(MemberDescriptor::nested(
                "Hero",
                vec![
                    FieldMember::new("Title", "String"),
                    FieldMember::new("Image", "Image"),
                ],
            ))
            .member(MemberDescriptor::field("Gallery", "Image").collection());
        let ct = SchemaBuilder::new(&registry).build_type(&shape).unwrap();

        let hero = ct.region("Hero").unwrap();
        assert!(!hero.is_simple());
        assert!(!hero.is_collection);
        let ids: Vec<_> = hero.fields.iter().map(|f| f.internal_id.as_str()).collect();
        assert_eq!(ids, ["Title", "Image"]);
        assert_eq!(hero.fields[1].sort_order, 1);

        let gallery = ct.region("Gallery").unwrap();
        assert!(gallery.is_collection);
        assert!(gallery.is_simple());
        assert_eq!(gallery.sort_order, 1);
    }

    #[test]
    fn unknown_kind_fails_only_that_type() {
        let registry = FieldKindRegistry::with_defaults();
        let shapes = vec![
            ShapeDescriptor::new("Broken").member(MemberDescriptor::field("Body", "Wysiwyg")),
            article(),
        ];
        let report = SchemaBuilder::new(&registry).build(&shapes);
        assert_eq!(report.graph.len(), 1);
        assert_eq!(report.graph.types[0].internal_id, "Article");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failed_ids(), vec!["Broken".to_string()]);
        assert!(matches!(
            &report.failures[0].error,
            SchemaError::UnknownFieldKind { kind, .. } if kind == "Wysiwyg"
        ));
    }

    #[test]
    fn unknown_kind_in_nested_field_names_the_path() {
        let registry = FieldKindRegistry::with_defaults();
        let shape = ShapeDescriptor::new("Page").member(MemberDescriptor::nested(
            "Hero",
            vec![FieldMember::new("Clip", "Hologram")],
        ));
        let err = SchemaBuilder::new(&registry).build_type(&shape).unwrap_err();
        assert!(
            matches!(&err, SchemaError::UnknownFieldKind { member, .. } if member == "Hero.Clip"),
            "{err:?}"
        );
    }

    #[test]
    fn sort_order_overrides_and_ties_keep_declaration_order() {
        let registry = FieldKindRegistry::with_defaults();
        let shape = ShapeDescriptor::new("Page")
            .member(MemberDescriptor::field("A", "Text"))
            .member(MemberDescriptor::field("B", "Text").sort_order(0))
            .member(MemberDescriptor::field("C", "Text").sort_order(-5))
            .member(MemberDescriptor::field("D", "Text"));
        let ct = SchemaBuilder::new(&registry).build_type(&shape).unwrap();
        let order: Vec<_> = ct
            .regions
            .iter()
            .map(|r| (r.internal_id.as_str(), r.sort_order))
            .collect();
        // A and B both sit at 0; A was declared first
        assert_eq!(order, [("C", 0), ("A", 1), ("B", 2), ("D", 3)]);
    }

    #[test]
    fn internal_id_derivation() {
        assert_eq!(derive_internal_id("Blog Post"), "BlogPost");
        assert_eq!(derive_internal_id("hero_image (main)"), "hero_imagemain");
        assert!(resolve_internal_id(None, "!!!").is_err());
        assert_eq!(resolve_internal_id(Some("post"), "Blog Post").unwrap(), "post");
        assert!(matches!(
            resolve_internal_id(Some("a/b"), "x"),
            Err(SchemaError::InvalidInternalId { value }) if value == "a/b"
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let registry = FieldKindRegistry::with_defaults();
        let builder = SchemaBuilder::new(&registry);

        let regions = ShapeDescriptor::new("Page")
            .member(MemberDescriptor::field("Body", "Text"))
            .member(MemberDescriptor::field("Bo dy", "Html"));
        assert!(matches!(
            builder.build_type(&regions),
            Err(SchemaError::DuplicateInternalId { .. })
        ));

        let fields = ShapeDescriptor::new("Page").member(MemberDescriptor::nested(
            "Hero",
            vec![
                FieldMember::new("Title", "String"),
                FieldMember::new("Other", "String").internal_id("Title"),
            ],
        ));
        assert!(matches!(
            builder.build_type(&fields),
            Err(SchemaError::DuplicateInternalId { .. })
        ));

        let report = builder.build(&[article(), article().title("Again")]);
        assert_eq!(report.graph.len(), 1);
        assert_eq!(report.graph.types[0].display_name, "Article");
        assert_eq!(report.failures.len(), 1);
        assert!(report.failed_ids().is_empty());
    }

    #[test]
    fn display_and_titles_fall_back_to_names() {
        let registry = FieldKindRegistry::with_defaults();
        let shape = ShapeDescriptor::new("Article")
            .title("News article")
            .member(MemberDescriptor::field("Body", "Markdown").title("Main text"));
        let ct = SchemaBuilder::new(&registry).build_type(&shape).unwrap();
        assert_eq!(ct.display_name, "News article");
        assert_eq!(ct.regions[0].title, "Main text");
        assert_eq!(ct.regions[0].fields[0].title, "Main text");
        assert_eq!(ct.regions[0].fields[0].kind, "Markdown");
    }
}
