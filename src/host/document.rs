//! In-memory host document shared by the file host and the test double

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{LightError, LightResult};
use crate::token::{LightUpdate, TargetId, TokenLight};

type Namespaced = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenDocument {
    #[serde(default)]
    pub light: TokenLight,
    /// namespace → flag name → value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: Namespaced,
}

/// Settings and tokens of a host world
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostDocument {
    /// namespace → key → value
    #[serde(default)]
    pub settings: Namespaced,
    #[serde(default)]
    pub tokens: BTreeMap<TargetId, TokenDocument>,
}

impl HostDocument {
    pub fn setting(&self, namespace: &str, key: &str) -> Option<Value> {
        self.settings.get(namespace)?.get(key).cloned()
    }

    pub fn set_setting(&mut self, namespace: &str, key: &str, value: Value) {
        self.settings
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn add_token(&mut self, target: TargetId, light: TokenLight) {
        self.tokens.insert(target, TokenDocument { light, flags: BTreeMap::new() });
    }

    fn token_mut(&mut self, target: &TargetId) -> LightResult<&mut TokenDocument> {
        self.tokens
            .get_mut(target)
            .ok_or_else(|| LightError::TargetNotFound { target: target.clone() })
    }

    pub fn light(&self, target: &TargetId) -> Option<TokenLight> {
        self.tokens.get(target).map(|t| t.light.clone())
    }

    pub fn flag(&self, target: &TargetId, namespace: &str, name: &str) -> Option<Value> {
        self.tokens.get(target)?.flags.get(namespace)?.get(name).cloned()
    }

    pub fn set_flag(&mut self, target: &TargetId, namespace: &str, name: &str, value: Value) -> LightResult<()> {
        self.token_mut(target)?
            .flags
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    pub fn unset_flag(&mut self, target: &TargetId, namespace: &str, name: &str) -> LightResult<()> {
        let token = self.token_mut(target)?;
        if let Some(flags) = token.flags.get_mut(namespace) {
            flags.remove(name);
            if flags.is_empty() {
                token.flags.remove(namespace);
            }
        }
        Ok(())
    }

    pub fn update_light(&mut self, target: &TargetId, update: &LightUpdate) -> LightResult<()> {
        self.token_mut(target)?.light.apply(update);
        Ok(())
    }
}
