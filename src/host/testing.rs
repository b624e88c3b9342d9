//! In-memory host double with failure injection and an awaitable gate

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

use super::{HostDocument, SettingsStore, TargetStore};
use crate::constants::MODULE_ID;
use crate::error::{LightError, LightResult};
use crate::token::{LightUpdate, TargetId, TokenLight};

/// One recorded mutation
#[derive(Debug, Clone, PartialEq)]
pub enum HostWrite {
    Setting { key: String },
    Flag { target: TargetId, name: String, value: Value },
    Unflag { target: TargetId, name: String },
    Light { target: TargetId, update: LightUpdate },
}

pub struct MemoryHost {
    document: Mutex<HostDocument>,
    writes: Mutex<Vec<HostWrite>>,
    fail_settings: AtomicBool,
    fail_updates: AtomicBool,
    fail_flags: AtomicBool,
    gate: Semaphore,
}

impl MemoryHost {
    /// Host with an open gate
    pub fn new() -> Self {
        let host = Self::gated();
        host.open_gate();
        host
    }

    /// Host whose light updates wait until [`MemoryHost::open_gate`]
    pub fn gated() -> Self {
        Self {
            document: Mutex::new(HostDocument::default()),
            writes: Mutex::new(Vec::new()),
            fail_settings: AtomicBool::new(false),
            fail_updates: AtomicBool::new(false),
            fail_flags: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    pub fn open_gate(&self) {
        self.gate.add_permits(1024);
    }

    fn doc(&self) -> MutexGuard<'_, HostDocument> {
        self.document.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, write: HostWrite) {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).push(write);
    }

    pub fn writes(&self) -> Vec<HostWrite> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of flag writes with the given name
    pub fn flag_writes(&self, name: &str) -> usize {
        self.writes()
            .iter()
            .filter(|w| matches!(w, HostWrite::Flag { name: n, .. } if n == name))
            .count()
    }

    pub fn light_writes(&self) -> usize {
        self.writes().iter().filter(|w| matches!(w, HostWrite::Light { .. })).count()
    }

    pub fn add_token(&self, id: &str, light: TokenLight) -> TargetId {
        let target = TargetId::from(id);
        self.doc().add_token(target.clone(), light);
        target
    }

    pub fn put_setting(&self, key: &str, value: Value) {
        self.doc().set_setting(MODULE_ID, key, value);
    }

    pub fn put_flag(&self, target: &TargetId, name: &str, value: Value) {
        self.doc()
            .set_flag(target, MODULE_ID, name, value)
            .expect("token exists");
    }

    pub fn module_setting(&self, key: &str) -> Option<Value> {
        self.doc().setting(MODULE_ID, key)
    }

    pub fn fail_settings(&self, fail: bool) {
        self.fail_settings.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_flags(&self, fail: bool) {
        self.fail_flags.store(fail, Ordering::SeqCst);
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemoryHost {
    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.doc().setting(namespace, key)
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> LightResult<()> {
        tokio::task::yield_now().await;
        if self.fail_settings.load(Ordering::SeqCst) {
            return Err(LightError::persistence("settings backend rejected write"));
        }
        self.doc().set_setting(namespace, key, value);
        self.record(HostWrite::Setting { key: key.to_string() });
        Ok(())
    }
}

impl TargetStore for MemoryHost {
    fn light(&self, target: &TargetId) -> Option<TokenLight> {
        self.doc().light(target)
    }

    fn flag(&self, target: &TargetId, namespace: &str, name: &str) -> Option<Value> {
        self.doc().flag(target, namespace, name)
    }

    async fn set_flag(&self, target: &TargetId, namespace: &str, name: &str, value: Value) -> LightResult<()> {
        tokio::task::yield_now().await;
        if self.fail_flags.load(Ordering::SeqCst) {
            return Err(LightError::persistence("flag write rejected"));
        }
        self.doc().set_flag(target, namespace, name, value.clone())?;
        self.record(HostWrite::Flag { target: target.clone(), name: name.to_string(), value });
        Ok(())
    }

    async fn unset_flag(&self, target: &TargetId, namespace: &str, name: &str) -> LightResult<()> {
        self.doc().unset_flag(target, namespace, name)?;
        self.record(HostWrite::Unflag { target: target.clone(), name: name.to_string() });
        Ok(())
    }

    async fn update_light(&self, target: &TargetId, update: &LightUpdate) -> LightResult<()> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(LightError::persistence)?;
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(LightError::persistence("token update rejected"));
        }
        self.doc().update_light(target, update)?;
        self.record(HostWrite::Light { target: target.clone(), update: update.clone() });
        Ok(())
    }
}
