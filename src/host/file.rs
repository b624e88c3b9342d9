//! JSON-file backed host used by the CLI
//!
//! Every write goes through to disk so a separate invocation sees it.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::{HostDocument, SettingsStore, TargetStore, TokenDocument};
use crate::constants::host::{APP_DIR, FILENAME};
use crate::error::{LightError, LightResult};
use crate::token::{LightUpdate, TargetId, TokenLight};

pub struct FileHost {
    path: PathBuf,
    document: Mutex<HostDocument>,
}

impl FileHost {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(FILENAME);
        path
    }

    /// Load the document at `path`, or start empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read host state from {:?}", path))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse host state from {:?}", path))?
        } else {
            info!("Host state not found, starting empty at {:?}", path);
            HostDocument::default()
        };
        Ok(Self { path, document: Mutex::new(document) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, HostDocument> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self, target: &TargetId) -> Option<TokenDocument> {
        self.lock().tokens.get(target).cloned()
    }

    pub fn add_token(&self, target: TargetId, light: TokenLight) -> Result<()> {
        let mut doc = self.lock();
        doc.add_token(target, light);
        write_document(&self.path, &doc)
    }

    fn mutate<F>(&self, f: F) -> LightResult<()>
    where
        F: FnOnce(&mut HostDocument) -> LightResult<()>,
    {
        let mut doc = self.lock();
        let mut next = doc.clone();
        f(&mut next)?;
        write_document(&self.path, &next).map_err(|e| LightError::persistence(format!("{e:#}")))?;
        *doc = next;
        Ok(())
    }
}

fn write_document(path: &Path, doc: &HostDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create host state directory {:?}", parent))?;
    }
    let contents = serde_json::to_string_pretty(doc).context("Failed to serialize host state")?;
    fs::write(path, contents).with_context(|| format!("Failed to write host state to {:?}", path))?;
    debug!("Wrote host state to {:?}", path);
    Ok(())
}

impl SettingsStore for FileHost {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.lock().setting(namespace, key)
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> LightResult<()> {
        self.mutate(|doc| {
            doc.set_setting(namespace, key, value);
            Ok(())
        })
    }
}

impl TargetStore for FileHost {
    fn light(&self, target: &TargetId) -> Option<TokenLight> {
        self.lock().light(target)
    }

    fn flag(&self, target: &TargetId, namespace: &str, name: &str) -> Option<Value> {
        self.lock().flag(target, namespace, name)
    }

    async fn set_flag(&self, target: &TargetId, namespace: &str, name: &str, value: Value) -> LightResult<()> {
        self.mutate(|doc| doc.set_flag(target, namespace, name, value))
    }

    async fn unset_flag(&self, target: &TargetId, namespace: &str, name: &str) -> LightResult<()> {
        self.mutate(|doc| doc.unset_flag(target, namespace, name))
    }

    async fn update_light(&self, target: &TargetId, update: &LightUpdate) -> LightResult<()> {
        self.mutate(|doc| doc.update_light(target, update))
    }
}
