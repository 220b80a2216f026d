//! Directory-backed schema store.
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   types/
//!     Article.yaml
//!     Post.yaml
//! ```
//!
//! Each content type is one YAML document, regions and fields inline, so a
//! batch commit is a single atomic file replacement.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, trace};
use ulid::Ulid;

use crate::error::{Result, SchemaError};
use crate::store::{SchemaStore, TypeBatch};
use crate::types::{is_valid_internal_id, ContentType};

/// Schema store persisting one YAML file per content type.
#[derive(Debug)]
pub struct YamlStore {
    root: PathBuf,
    /// Serializes read-modify-write commits
    write_lock: Mutex<()>,
}

impl YamlStore {
    /// Open a store rooted at `root`, creating the directory layout if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("types")).await?;
        debug!(root = %root.display(), "opened schema store");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn types_dir(&self) -> PathBuf {
        self.root.join("types")
    }

    fn type_path(&self, internal_id: &str) -> Result<PathBuf> {
        if !is_valid_internal_id(internal_id) {
            return Err(SchemaError::InvalidInternalId {
                value: internal_id.to_string(),
            });
        }
        Ok(self.types_dir().join(format!("{internal_id}.yaml")))
    }

    async fn read_document(path: &Path) -> Result<ContentType> {
        let content = fs::read_to_string(path).await?;
        serde_yaml_ng::from_str(&content).map_err(|source| SchemaError::CorruptDocument {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[async_trait]
impl SchemaStore for YamlStore {
    async fn content_types(&self) -> Result<Vec<ContentType>> {
        let mut paths = Vec::new();
        let mut entries = fs::read_dir(self.types_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut types = Vec::with_capacity(paths.len());
        for path in paths {
            types.push(Self::read_document(&path).await?);
        }
        Ok(types)
    }

    async fn content_type(&self, internal_id: &str) -> Result<Option<ContentType>> {
        let path = self.type_path(internal_id)?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        Self::read_document(&path).await.map(Some)
    }

    async fn commit(&self, batch: TypeBatch) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.type_path(&batch.content_type)?;
        let current = self.content_type(&batch.content_type).await?;

        match batch.apply_to(current)? {
            Some(ct) => {
                let yaml = serde_yaml_ng::to_string(&ct)?;
                atomic_write(&path, yaml.as_bytes()).await?;
            }
            None => {
                if fs::try_exists(&path).await? {
                    fs::remove_file(&path).await?;
                }
            }
        }
        trace!(content_type = %batch.content_type, ops = batch.ops.len(), "committed batch");
        Ok(())
    }
}

/// Write to a temp file then rename, so readers never see a partial document.
async fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"))?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    fs::write(&tmp, data).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SchemaOp;
    use crate::types::{FieldDefinition, Region, Settings};
    use chrono::Utc;
    use tempfile::TempDir;

    fn article_batch() -> TypeBatch {
        let mut header = ContentType::new("Article", "Article");
        header.id = Some(Ulid::new());
        header.created = Some(Utc::now());
        let mut batch = TypeBatch::new("Article");
        batch.push(SchemaOp::UpsertType(header));
        batch.push(SchemaOp::UpsertRegion {
            region: Region {
                id: Some(Ulid::new()),
                internal_id: "Body".into(),
                title: "Body".into(),
                description: None,
                is_collection: false,
                sort_order: 0,
                fields: Vec::new(),
            },
        });
        batch.push(SchemaOp::UpsertField {
            region: "Body".into(),
            field: FieldDefinition {
                id: Some(Ulid::new()),
                internal_id: "Body".into(),
                title: "Body".into(),
                description: None,
                kind: "Text".into(),
                discriminator: "Text".into(),
                sort_order: 0,
                settings: Settings::new(),
            },
        });
        batch
    }

    #[tokio::test]
    async fn open_creates_layout() {
        let temp = TempDir::new().unwrap();
        let store = YamlStore::open(temp.path().join("schema")).await.unwrap();
        assert!(store.root().join("types").is_dir());
        assert!(store.content_types().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let written = {
            let store = YamlStore::open(temp.path()).await.unwrap();
            store.commit(article_batch()).await.unwrap();
            store.content_type("Article").await.unwrap().unwrap()
        };
        assert!(temp.path().join("types/Article.yaml").is_file());

        let reopened = YamlStore::open(temp.path()).await.unwrap();
        let read = reopened.content_type("Article").await.unwrap().unwrap();
        assert_eq!(read, written);
        assert_eq!(read.regions[0].fields[0].discriminator, "Text");
    }

    #[tokio::test]
    async fn delete_type_removes_file() {
        let temp = TempDir::new().unwrap();
        let store = YamlStore::open(temp.path()).await.unwrap();
        store.commit(article_batch()).await.unwrap();

        let mut batch = TypeBatch::new("Article");
        batch.push(SchemaOp::DeleteType);
        store.commit(batch).await.unwrap();
        assert!(!temp.path().join("types/Article.yaml").exists());
        assert!(store.content_type("Article").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_batch_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let store = YamlStore::open(temp.path()).await.unwrap();
        store.commit(article_batch()).await.unwrap();
        let before = std::fs::read_to_string(temp.path().join("types/Article.yaml")).unwrap();

        let mut batch = TypeBatch::new("Article");
        batch.push(SchemaOp::DeleteRegion {
            region: "Body".into(),
        });
        batch.push(SchemaOp::UpsertField {
            region: "Missing".into(),
            field: FieldDefinition {
                id: None,
                internal_id: "x".into(),
                title: "x".into(),
                description: None,
                kind: "Text".into(),
                discriminator: "Text".into(),
                sort_order: 0,
                settings: Settings::new(),
            },
        });
        assert!(store.commit(batch).await.is_err());

        let after = std::fs::read_to_string(temp.path().join("types/Article.yaml")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = YamlStore::open(temp.path()).await.unwrap();
        std::fs::write(temp.path().join("types/Broken.yaml"), "regions: {").unwrap();
        let err = store.content_types().await.unwrap_err();
        assert!(matches!(err, SchemaError::CorruptDocument { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn path_escaping_ids_are_rejected() {
        let temp = TempDir::new().unwrap();
        let store = YamlStore::open(temp.path()).await.unwrap();
        let err = store.content_type("../outside").await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidInternalId { .. }));
    }
}
