//! Host boundary
//!
//! The module only talks to its host through two narrow interfaces: a
//! key-value settings backend and a per-token flag/light accessor. The
//! file-backed [`FileHost`] is the concrete implementation used by the CLI.

use serde_json::Value;
use std::sync::Arc;

use crate::error::LightResult;
use crate::token::{LightUpdate, TargetId, TokenLight};

mod document;
mod file;
#[cfg(test)]
pub(crate) mod testing;

pub use document::{HostDocument, TokenDocument};
pub use file::FileHost;

/// World settings backend
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    fn get(&self, namespace: &str, key: &str) -> Option<Value>;

    async fn set(&self, namespace: &str, key: &str, value: Value) -> LightResult<()>;
}

/// Token accessor: flags plus the light sub-document
#[allow(async_fn_in_trait)]
pub trait TargetStore {
    /// Current light, `None` when the token does not exist
    fn light(&self, target: &TargetId) -> Option<TokenLight>;

    fn flag(&self, target: &TargetId, namespace: &str, name: &str) -> Option<Value>;

    async fn set_flag(&self, target: &TargetId, namespace: &str, name: &str, value: Value) -> LightResult<()>;

    async fn unset_flag(&self, target: &TargetId, namespace: &str, name: &str) -> LightResult<()>;

    async fn update_light(&self, target: &TargetId, update: &LightUpdate) -> LightResult<()>;
}

impl<S: SettingsStore> SettingsStore for Arc<S> {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        (**self).get(namespace, key)
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> LightResult<()> {
        (**self).set(namespace, key, value).await
    }
}

impl<T: TargetStore> TargetStore for Arc<T> {
    fn light(&self, target: &TargetId) -> Option<TokenLight> {
        (**self).light(target)
    }

    fn flag(&self, target: &TargetId, namespace: &str, name: &str) -> Option<Value> {
        (**self).flag(target, namespace, name)
    }

    async fn set_flag(&self, target: &TargetId, namespace: &str, name: &str, value: Value) -> LightResult<()> {
        (**self).set_flag(target, namespace, name, value).await
    }

    async fn unset_flag(&self, target: &TargetId, namespace: &str, name: &str) -> LightResult<()> {
        (**self).unset_flag(target, namespace, name).await
    }

    async fn update_light(&self, target: &TargetId, update: &LightUpdate) -> LightResult<()> {
        (**self).update_light(target, update).await
    }
}
