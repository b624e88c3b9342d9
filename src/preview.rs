//! Live preview of unsaved preset edits
//!
//! Edits are debounced, then pushed to the selected tokens without touching
//! the persisted table. A pass that would write exactly what the last
//! successful pass wrote is skipped. A request arriving mid-pass marks the
//! coordinator for exactly one more pass with the latest edit.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::config::preset::LightPreset;
use crate::constants::preview::DEBOUNCE_MS;
use crate::engine::PresetEngine;
use crate::error::LightResult;
use crate::host::TargetStore;
use crate::token::{LightUpdate, TargetId, TokenLightController};

/// Time source for the debounce window
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Unsaved field values for one preset, aimed at a set of tokens
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRequest {
    pub preset_key: String,
    pub targets: Vec<TargetId>,
    pub max_radius: Option<f64>,
    pub draft: LightPreset,
}

impl PreviewRequest {
    /// Normalized payload plus the signature identifying it
    fn payload(&self) -> LightResult<(LightUpdate, String)> {
        let update = LightUpdate::from_preset(&PresetEngine::normalize_preset(&self.draft, self.max_radius));
        let mut targets: Vec<&str> = self.targets.iter().map(TargetId::as_str).collect();
        targets.sort_unstable();
        targets.dedup();
        let signature = serde_json::to_string(&(&self.preset_key, targets, self.max_radius, &update))?;
        Ok((update, signature))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Payload written to this many tokens
    Pushed(usize),
    /// Same payload as the last successful pass
    Unchanged,
    /// At least one write failed; the pass will not be treated as current
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Scheduled { due: Instant },
    Running,
    RerunPending,
}

struct Inner {
    phase: Phase,
    pending: Option<PreviewRequest>,
    last_signature: Option<String>,
}

pub struct PreviewCoordinator<C = SystemClock> {
    clock: C,
    debounce: Duration,
    inner: Mutex<Inner>,
}

impl Default for PreviewCoordinator<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> PreviewCoordinator<C> {
    pub fn new(clock: C) -> Self {
        Self::with_debounce(clock, Duration::from_millis(DEBOUNCE_MS))
    }

    pub fn with_debounce(clock: C, debounce: Duration) -> Self {
        Self {
            clock,
            debounce,
            inner: Mutex::new(Inner {
                phase: Phase::Idle,
                pending: None,
                last_signature: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the latest edit, replacing any edit not yet pushed
    pub fn request(&self, request: PreviewRequest) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.pending = Some(request);
        inner.phase = match inner.phase {
            Phase::Running | Phase::RerunPending => Phase::RerunPending,
            Phase::Idle | Phase::Scheduled { .. } => Phase::Scheduled { due: now + self.debounce },
        };
    }

    /// When the scheduled pass becomes due, if one is scheduled
    pub fn next_due(&self) -> Option<Instant> {
        match self.lock().phase {
            Phase::Scheduled { due } => Some(due),
            _ => None,
        }
    }

    pub fn is_due(&self) -> bool {
        self.next_due().is_some_and(|due| self.clock.now() >= due)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.lock().phase, Phase::Running | Phase::RerunPending)
    }

    /// Forget the last pushed payload so the next pass always writes
    pub fn invalidate(&self) {
        self.lock().last_signature = None;
    }

    /// Run the due pass, plus one rerun if an edit arrived meanwhile.
    /// Returns immediately when nothing is due or a pass is already running.
    pub async fn poll<T: TargetStore>(&self, controller: &TokenLightController<T>) -> Vec<PassOutcome> {
        let mut request = {
            let mut inner = self.lock();
            match inner.phase {
                Phase::Scheduled { due } if self.clock.now() >= due => {}
                _ => return Vec::new(),
            }
            let Some(request) = inner.pending.take() else {
                inner.phase = Phase::Idle;
                return Vec::new();
            };
            inner.phase = Phase::Running;
            request
        };
        let _running = RunningGuard(self);

        let mut outcomes = Vec::new();
        loop {
            outcomes.push(self.run_pass(controller, &request).await);

            let mut inner = self.lock();
            if inner.phase != Phase::RerunPending {
                break;
            }
            match inner.pending.take() {
                Some(next) => {
                    inner.phase = Phase::Running;
                    request = next;
                }
                None => break,
            }
        }
        outcomes
    }

    async fn run_pass<T: TargetStore>(
        &self,
        controller: &TokenLightController<T>,
        request: &PreviewRequest,
    ) -> PassOutcome {
        let (update, signature) = match request.payload() {
            Ok(payload) => payload,
            Err(e) => {
                error!(preset = %request.preset_key, error = %e, "Failed to build preview payload");
                return PassOutcome::Failed;
            }
        };
        if self.lock().last_signature.as_deref() == Some(signature.as_str()) {
            debug!(preset = %request.preset_key, "Preview unchanged, skipping push");
            return PassOutcome::Unchanged;
        }

        let mut pushed = 0;
        let mut failed = false;
        for target in &request.targets {
            match controller.push_preview(target, &update).await {
                Ok(()) => pushed += 1,
                Err(e) => {
                    error!(target = %target, preset = %request.preset_key, error = %e, "Failed to push preview");
                    failed = true;
                }
            }
        }
        if failed {
            return PassOutcome::Failed;
        }
        debug!(preset = %request.preset_key, targets = pushed, "Pushed preview");
        self.lock().last_signature = Some(signature);
        PassOutcome::Pushed(pushed)
    }
}

/// Returns the coordinator to idle when a poll ends, however it ends
struct RunningGuard<'a, C: Clock>(&'a PreviewCoordinator<C>);

impl<C: Clock> Drop for RunningGuard<'_, C> {
    fn drop(&mut self) {
        let mut inner = self.0.lock();
        inner.phase = match (inner.phase, inner.pending.is_some()) {
            // an edit left behind by a cancelled poll is rescheduled
            (Phase::RerunPending, true) => Phase::Scheduled { due: self.0.clock.now() },
            _ => Phase::Idle,
        };
    }
}

/// Clock advanced by hand
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock(Mutex<Instant>);

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self(Mutex::new(Instant::now()))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::preset::default_presets;
    use crate::constants::flags::{BASE_LIGHT, LIGHT_ICON_STATE};
    use crate::host::testing::MemoryHost;
    use crate::token::{LightState, TokenLight};

    fn debounce() -> Duration {
        Duration::from_millis(DEBOUNCE_MS)
    }

    fn request(targets: &[&TargetId], bright: f64) -> PreviewRequest {
        let mut draft = default_presets()["lamp"].clone();
        draft.bright = bright;
        PreviewRequest {
            preset_key: "lamp".into(),
            targets: targets.iter().map(|t| (*t).clone()).collect(),
            max_radius: None,
            draft,
        }
    }

    fn setup(host: MemoryHost) -> (Arc<MemoryHost>, TargetId, TokenLightController<Arc<MemoryHost>>) {
        let host = Arc::new(host);
        let id = host.add_token("t1", TokenLight::default());
        let controller = TokenLightController::new(host.clone());
        (host, id, controller)
    }

    #[tokio::test]
    async fn test_edits_within_debounce_window_coalesce() {
        let (host, id, controller) = setup(MemoryHost::new());
        let clock = Arc::new(ManualClock::new());
        let preview = PreviewCoordinator::new(clock.clone());

        preview.request(request(&[&id], 4.0));
        clock.advance(debounce() / 2);
        preview.request(request(&[&id], 5.0));
        clock.advance(debounce() / 2);
        // second edit restarted the window
        assert!(!preview.is_due());
        assert!(preview.poll(&controller).await.is_empty());

        clock.advance(debounce());
        assert_eq!(preview.poll(&controller).await, vec![PassOutcome::Pushed(1)]);
        assert_eq!(host.light_writes(), 1);
        assert_eq!(host.light(&id).unwrap().bright, 5.0);
        assert!(!preview.is_running());
        assert!(preview.next_due().is_none());
    }

    #[tokio::test]
    async fn test_preview_backs_up_but_leaves_state_off() {
        let (host, id, controller) = setup(MemoryHost::new());
        let clock = Arc::new(ManualClock::new());
        let preview = PreviewCoordinator::new(clock.clone());

        preview.request(request(&[&id], 4.0));
        clock.advance(debounce());
        preview.poll(&controller).await;

        assert_eq!(host.flag_writes(BASE_LIGHT), 1);
        assert_eq!(host.flag_writes(LIGHT_ICON_STATE), 0);
        assert_eq!(controller.state(&id), LightState::Off);
    }

    #[tokio::test]
    async fn test_unchanged_signature_skips_push() {
        let (host, id, controller) = setup(MemoryHost::new());
        let other = host.add_token("t0", TokenLight::default());
        let clock = Arc::new(ManualClock::new());
        let preview = PreviewCoordinator::new(clock.clone());

        preview.request(request(&[&id, &other], 4.0));
        clock.advance(debounce());
        assert_eq!(preview.poll(&controller).await, vec![PassOutcome::Pushed(2)]);

        // same content, targets in another order
        preview.request(request(&[&other, &id], 4.0));
        clock.advance(debounce());
        assert_eq!(preview.poll(&controller).await, vec![PassOutcome::Unchanged]);
        assert_eq!(host.light_writes(), 2);

        preview.invalidate();
        preview.request(request(&[&id, &other], 4.0));
        clock.advance(debounce());
        assert_eq!(preview.poll(&controller).await, vec![PassOutcome::Pushed(2)]);
    }

    #[tokio::test]
    async fn test_payload_uses_radius_policy() {
        let (host, id, controller) = setup(MemoryHost::new());
        let clock = Arc::new(ManualClock::new());
        let preview = PreviewCoordinator::new(clock.clone());

        let mut req = request(&[&id], 30.0);
        req.max_radius = Some(10.0);
        preview.request(req);
        clock.advance(debounce());
        preview.poll(&controller).await;

        let light = host.light(&id).unwrap();
        assert_eq!((light.dim, light.bright), (10.0, 10.0));
    }

    #[tokio::test]
    async fn test_failed_push_is_retried_on_next_pass() {
        let (host, id, controller) = setup(MemoryHost::new());
        let clock = Arc::new(ManualClock::new());
        let preview = PreviewCoordinator::new(clock.clone());

        host.fail_updates(true);
        preview.request(request(&[&id], 4.0));
        clock.advance(debounce());
        assert_eq!(preview.poll(&controller).await, vec![PassOutcome::Failed]);

        host.fail_updates(false);
        preview.request(request(&[&id], 4.0));
        clock.advance(debounce());
        assert_eq!(preview.poll(&controller).await, vec![PassOutcome::Pushed(1)]);
    }

    #[tokio::test]
    async fn test_edits_during_a_pass_run_exactly_one_more_pass() {
        let (host, id, controller) = setup(MemoryHost::gated());
        let clock = Arc::new(ManualClock::new());
        let preview = PreviewCoordinator::new(clock.clone());

        preview.request(request(&[&id], 4.0));
        clock.advance(debounce());

        let (outcomes, ()) = tokio::join!(preview.poll(&controller), async {
            assert!(preview.is_running());
            // a concurrent poll does not start a second pass
            assert!(preview.poll(&controller).await.is_empty());
            preview.request(request(&[&id], 6.0));
            preview.request(request(&[&id], 7.0));
            host.open_gate();
        });

        assert_eq!(outcomes, vec![PassOutcome::Pushed(1), PassOutcome::Pushed(1)]);
        assert_eq!(host.light_writes(), 2);
        assert_eq!(host.light(&id).unwrap().bright, 7.0);
        assert!(!preview.is_running());
        assert!(preview.next_due().is_none());
    }
}
