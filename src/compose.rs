//! ComposeSession — one user's wizard, generation guard and last result.
//!
//! The wizard itself is synchronous. Generation runs outside the session
//! lock: [`ComposeSession::begin_generation`] hands out a ticket, the
//! gateway call runs in its own task, and [`ComposeSession::finish_generation`]
//! records the outcome. Only one ticket may be outstanding per session.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Error, GenerationError, PersistenceError, WizardError};
use crate::generation::{GenerationGateway, GenerationRequest, GenerationResult};
use crate::store::{MessageMetadata, PersistedMessageId, ResultPersister};
use crate::wizard::{StepData, StepId, StepSnapshot, WizardController, WizardStatus, assemble};

/// A generated message together with the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMessage {
    pub request: GenerationRequest,
    pub result: GenerationResult,
}

/// Permission to run one generation for a session.
#[derive(Debug)]
pub struct GenerationTicket {
    id: u64,
    epoch: u64,
    request: GenerationRequest,
}

impl GenerationTicket {
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

/// Session state as reported to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeStatus {
    pub user_id: String,
    pub wizard: WizardStatus,
    pub steps: StepSnapshot,
    pub generating: bool,
    pub last_result: Option<GenerationResult>,
}

/// One user's composition session.
#[derive(Debug)]
pub struct ComposeSession {
    user_id: String,
    wizard: WizardController,
    last: Option<GeneratedMessage>,
    in_flight: Option<u64>,
    /// Bumped by reset/restore/save so late results from an older wizard
    /// are not attached to the new one.
    epoch: u64,
    next_ticket: u64,
}

impl ComposeSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            wizard: WizardController::new(),
            last: None,
            in_flight: None,
            epoch: 0,
            next_ticket: 0,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn wizard(&self) -> &WizardController {
        &self.wizard
    }

    pub fn last_generated(&self) -> Option<&GeneratedMessage> {
        self.last.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True when the session holds nothing worth keeping: a fresh wizard, no
    /// unsaved result and no generation running.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
            && self.last.is_none()
            && self.wizard.current_step_index() == 0
            && self.wizard.snapshot().is_empty()
    }

    pub fn status(&self) -> ComposeStatus {
        ComposeStatus {
            user_id: self.user_id.clone(),
            wizard: self.wizard.status(),
            steps: self.wizard.snapshot(),
            generating: self.is_generating(),
            last_result: self.last.as_ref().map(|m| m.result.clone()),
        }
    }

    pub fn advance(&mut self, step: StepId, data: StepData) -> Result<WizardStatus, WizardError> {
        self.wizard.advance(step, data)
    }

    pub fn skip(&mut self) -> Result<WizardStatus, WizardError> {
        self.wizard.skip()
    }

    pub fn retreat(&mut self) -> Result<WizardStatus, WizardError> {
        self.wizard.retreat()
    }

    /// Discard all step data and any unsaved result.
    pub fn reset(&mut self) {
        self.wizard.reset();
        self.clear_result();
        info!(user_id = %self.user_id, "Compose session reset");
    }

    /// Re-seed the wizard from previously saved step data (edit-and-resend).
    pub fn restore(&mut self, snapshot: StepSnapshot) -> Result<WizardStatus, WizardError> {
        self.wizard = WizardController::from_snapshot(snapshot)?;
        self.clear_result();
        info!(user_id = %self.user_id, "Compose session restored from saved message");
        Ok(self.wizard.status())
    }

    fn clear_result(&mut self) {
        self.last = None;
        self.epoch += 1;
    }

    /// Reserve the single generation slot and assemble the request.
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, Error> {
        if self.in_flight.is_some() {
            return Err(GenerationError::InFlight.into());
        }
        if let Some(current) = self.wizard.current_step() {
            return Err(WizardError::NotComplete { current }.into());
        }
        let request = assemble(&self.wizard.snapshot())?;

        self.next_ticket += 1;
        let id = self.next_ticket;
        self.in_flight = Some(id);
        debug!(user_id = %self.user_id, ticket = id, "Generation started");
        Ok(GenerationTicket {
            id,
            epoch: self.epoch,
            request,
        })
    }

    /// Release the generation slot and keep the result if the session has
    /// not been reset since the ticket was issued.
    pub fn finish_generation(
        &mut self,
        ticket: GenerationTicket,
        outcome: Result<GenerationResult, GenerationError>,
    ) -> Result<GenerationResult, GenerationError> {
        if self.in_flight == Some(ticket.id) {
            self.in_flight = None;
        }

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Generation failed");
                return Err(e);
            }
        };

        if ticket.epoch == self.epoch {
            self.last = Some(GeneratedMessage {
                request: ticket.request,
                result: result.clone(),
            });
            info!(user_id = %self.user_id, "Generation complete");
        } else {
            debug!(user_id = %self.user_id, "Discarding result for a reset session");
        }
        Ok(result)
    }

    /// Persist the last generated message, then start a fresh wizard.
    ///
    /// On failure the result stays in the session so saving can be retried.
    pub async fn save<P>(&mut self, persister: &P) -> Result<PersistedMessageId, PersistenceError>
    where
        P: ResultPersister + ?Sized,
    {
        let Some(message) = &self.last else {
            return Err(PersistenceError::NothingToSave);
        };
        let metadata = MessageMetadata::from_request(&message.request);
        let id = persister
            .save(&self.user_id, &message.result, &metadata)
            .await?;

        info!(user_id = %self.user_id, id = %id, "Generated message saved");
        self.wizard.reset();
        self.clear_result();
        Ok(id)
    }
}

/// Run one generation for `session` without holding its lock during the
/// upstream call.
///
/// The gateway call and the bookkeeping run in a spawned task, so the slot
/// is released even if the caller stops waiting.
pub async fn run_generation(
    session: Arc<Mutex<ComposeSession>>,
    gateway: Arc<GenerationGateway>,
) -> Result<GenerationResult, Error> {
    let ticket = session.lock().await.begin_generation()?;

    let task = tokio::spawn(async move {
        let outcome = gateway.generate(ticket.request()).await;
        session.lock().await.finish_generation(ticket, outcome)
    });

    match task.await {
        Ok(outcome) => Ok(outcome?),
        Err(e) => Err(GenerationError::TaskFailed(e.to_string()).into()),
    }
}

/// Per-user sessions. Sessions are created on first write, never shared
/// across users, and dropped again once they are idle.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<ComposeSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: &str) -> Option<Arc<Mutex<ComposeSession>>> {
        self.sessions.read().await.get(user_id).cloned()
    }

    pub async fn get_or_create(&self, user_id: &str) -> Arc<Mutex<ComposeSession>> {
        if let Some(session) = self.sessions.read().await.get(user_id) {
            return session.clone();
        }
        self.sessions
            .write()
            .await
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id = user_id, "Creating compose session");
                Arc::new(Mutex::new(ComposeSession::new(user_id)))
            })
            .clone()
    }

    /// Drop the user's session if it is idle. A session that is locked or
    /// still holds state stays. Returns whether it was removed.
    pub async fn remove_if_idle(&self, user_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let idle = match sessions.get(user_id) {
            Some(session) => session.try_lock().is_ok_and(|s| s.is_idle()),
            None => return false,
        };
        if idle {
            sessions.remove(user_id);
            debug!(user_id = user_id, "Compose session dropped");
        }
        idle
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::TransportError;
    use crate::generation::GenerationTransport;
    use crate::wizard::model::{
        Format, FormatKind, Intent, IntentKind, MessageLength, Recipient, Tone, ToneKind,
    };
    use crate::wizard::WizardPosition;

    /// Transport that waits for `release` (when set) before answering.
    struct GatedTransport {
        content: Option<&'static str>,
        release: Option<Arc<Notify>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationTransport for GatedTransport {
        fn name(&self) -> &str {
            "gated"
        }

        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<GenerationResult, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(release) = &self.release {
                release.notified().await;
            }
            match self.content {
                Some(content) => Ok(GenerationResult {
                    content: content.to_string(),
                    insights: vec![],
                }),
                None => Err(TransportError::RequestFailed {
                    transport: "gated".into(),
                    reason: "down".into(),
                }),
            }
        }
    }

    fn gateway_with(
        content: Option<&'static str>,
        release: Option<Arc<Notify>>,
    ) -> Arc<GenerationGateway> {
        let primary = Arc::new(GatedTransport {
            content,
            release,
            calls: AtomicUsize::new(0),
        });
        let fallback = Arc::new(GatedTransport {
            content,
            release: None,
            calls: AtomicUsize::new(0),
        });
        Arc::new(GenerationGateway::new(primary, fallback, Duration::from_secs(5)))
    }

    /// Persister that records saves, or fails every call.
    #[derive(Default)]
    struct RecordingPersister {
        fail: bool,
        saved: std::sync::Mutex<Vec<(String, GenerationResult, MessageMetadata)>>,
    }

    #[async_trait]
    impl ResultPersister for RecordingPersister {
        async fn save(
            &self,
            user_id: &str,
            result: &GenerationResult,
            metadata: &MessageMetadata,
        ) -> Result<PersistedMessageId, PersistenceError> {
            if self.fail {
                return Err(PersistenceError::Query("disk full".into()));
            }
            let mut saved = self.saved.lock().unwrap();
            saved.push((user_id.to_string(), result.clone(), metadata.clone()));
            Ok(PersistedMessageId(format!("msg-{}", saved.len())))
        }
    }

    fn completed_session(user_id: &str) -> ComposeSession {
        let mut session = ComposeSession::new(user_id);
        session
            .advance(
                StepId::Recipient,
                StepData::Recipient(Recipient {
                    name: "Sam".into(),
                    relationship: "sister".into(),
                    external_id: None,
                }),
            )
            .unwrap();
        session
            .advance(StepId::Intent, StepData::Intent(Intent::new(IntentKind::Gratitude)))
            .unwrap();
        session
            .advance(StepId::Tone, StepData::Tone(Tone::new(ToneKind::Warm)))
            .unwrap();
        session
            .advance(
                StepId::Format,
                StepData::Format(Format::new(FormatKind::Text, MessageLength::Short)),
            )
            .unwrap();
        session.skip().unwrap();
        session.skip().unwrap();
        assert_eq!(session.wizard().position(), WizardPosition::Terminal);
        session
    }

    #[test]
    fn generation_requires_a_completed_wizard() {
        let mut session = ComposeSession::new("u1");
        let err = session.begin_generation().unwrap_err();
        assert!(matches!(
            err,
            Error::Wizard(WizardError::NotComplete {
                current: StepId::Recipient
            })
        ));
        assert!(!session.is_generating());
    }

    #[test]
    fn second_begin_while_in_flight_is_rejected() {
        let mut session = completed_session("u1");
        let ticket = session.begin_generation().unwrap();
        assert_eq!(ticket.request().recipient.name, "Sam");

        let err = session.begin_generation().unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::InFlight)));

        session
            .finish_generation(
                ticket,
                Ok(GenerationResult {
                    content: "Thanks Sam".into(),
                    insights: vec![],
                }),
            )
            .unwrap();
        assert!(!session.is_generating());
        assert!(session.begin_generation().is_ok());
    }

    #[test]
    fn failed_generation_releases_slot_and_keeps_wizard() {
        let mut session = completed_session("u1");
        let ticket = session.begin_generation().unwrap();
        let err = session
            .finish_generation(
                ticket,
                Err(GenerationError::Unavailable {
                    primary: "down".into(),
                    fallback: "down".into(),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable { .. }));
        assert!(!session.is_generating());
        assert!(session.last_generated().is_none());
        assert!(session.wizard().is_complete());
    }

    #[test]
    fn result_after_reset_is_discarded() {
        let mut session = completed_session("u1");
        let ticket = session.begin_generation().unwrap();
        session.reset();

        let result = session
            .finish_generation(
                ticket,
                Ok(GenerationResult {
                    content: "late".into(),
                    insights: vec![],
                }),
            )
            .unwrap();
        assert_eq!(result.content, "late");
        assert!(session.last_generated().is_none());
        assert!(!session.is_generating());
    }

    #[tokio::test]
    async fn run_generation_stores_result() {
        let session = Arc::new(Mutex::new(completed_session("u1")));
        let result = run_generation(session.clone(), gateway_with(Some("Thank you, Sam!"), None))
            .await
            .unwrap();
        assert_eq!(result.content, "Thank you, Sam!");

        let guard = session.lock().await;
        assert_eq!(guard.last_generated().unwrap().result, result);
        assert_eq!(guard.status().last_result, Some(result));
    }

    #[tokio::test]
    async fn concurrent_generate_is_rejected_while_in_flight() {
        let session = Arc::new(Mutex::new(completed_session("u1")));
        let release = Arc::new(Notify::new());
        let gateway = gateway_with(Some("hello"), Some(release.clone()));

        let first = tokio::spawn(run_generation(session.clone(), gateway.clone()));
        // Wait until the first call holds the slot.
        while !session.lock().await.is_generating() {
            tokio::task::yield_now().await;
        }

        let err = run_generation(session.clone(), gateway.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::InFlight)));

        release.notify_one();
        let result = first.await.unwrap().unwrap();
        assert_eq!(result.content, "hello");
        assert!(!session.lock().await.is_generating());
    }

    #[tokio::test]
    async fn unavailable_generation_is_retryable() {
        let session = Arc::new(Mutex::new(completed_session("u1")));
        let err = run_generation(session.clone(), gateway_with(None, None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Generation(GenerationError::Unavailable { .. })
        ));

        let result = run_generation(session.clone(), gateway_with(Some("second try"), None))
            .await
            .unwrap();
        assert_eq!(result.content, "second try");
    }

    #[tokio::test]
    async fn save_persists_and_resets() {
        let session = Arc::new(Mutex::new(completed_session("u1")));
        run_generation(session.clone(), gateway_with(Some("Thank you, Sam!"), None))
            .await
            .unwrap();

        let persister = RecordingPersister::default();
        let mut guard = session.lock().await;
        let id = guard.save(&persister).await.unwrap();
        assert_eq!(id, PersistedMessageId("msg-1".into()));

        let saved = persister.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        let (user_id, result, meta) = &saved[0];
        assert_eq!(user_id, "u1");
        assert_eq!(result.content, "Thank you, Sam!");
        assert_eq!(meta.recipient_name, "Sam");
        assert_eq!(meta.intent, "gratitude");
        assert_eq!(meta.message_format, "text");

        assert!(guard.last_generated().is_none());
        assert_eq!(guard.wizard().current_step(), Some(StepId::Recipient));
        assert!(guard.wizard().snapshot().is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_result() {
        let session = Arc::new(Mutex::new(completed_session("u1")));
        run_generation(session.clone(), gateway_with(Some("keep me"), None))
            .await
            .unwrap();

        let persister = RecordingPersister {
            fail: true,
            ..Default::default()
        };
        let mut guard = session.lock().await;
        let err = guard.save(&persister).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Query(_)));
        assert_eq!(guard.last_generated().unwrap().result.content, "keep me");
        assert!(guard.wizard().is_complete());
    }

    #[tokio::test]
    async fn save_without_result_fails() {
        let mut session = completed_session("u1");
        let err = session
            .save(&RecordingPersister::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NothingToSave));
    }

    #[test]
    fn restore_seeds_wizard_at_first_step() {
        let source = completed_session("u1");
        let snapshot = source.wizard().snapshot();

        let mut session = ComposeSession::new("u1");
        let status = session.restore(snapshot.clone()).unwrap();
        assert_eq!(status.current_step_index, 0);
        assert_eq!(session.wizard().snapshot(), snapshot);
    }

    #[tokio::test]
    async fn registry_keeps_one_session_per_user() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty().await);

        let a1 = registry.get_or_create("alice").await;
        let a2 = registry.get_or_create("alice").await;
        let b = registry.get_or_create("bob").await;

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(registry.len().await, 2);
        assert_eq!(b.lock().await.user_id(), "bob");
    }

    #[tokio::test]
    async fn get_does_not_create() {
        let registry = SessionRegistry::new();
        assert!(registry.get("alice").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn registry_shrinks_after_save() {
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("alice").await;
        *session.lock().await = completed_session("alice");
        run_generation(session.clone(), gateway_with(Some("Thanks!"), None))
            .await
            .unwrap();

        // Unsaved result keeps the session
        assert!(!registry.remove_if_idle("alice").await);
        assert_eq!(registry.len().await, 1);

        session
            .lock()
            .await
            .save(&RecordingPersister::default())
            .await
            .unwrap();
        assert!(registry.remove_if_idle("alice").await);
        assert!(registry.is_empty().await);
        assert!(!registry.remove_if_idle("alice").await);
    }

    #[tokio::test]
    async fn in_flight_session_is_not_dropped() {
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("alice").await;
        *session.lock().await = completed_session("alice");

        let mut guard = session.lock().await;
        let _ticket = guard.begin_generation().unwrap();
        guard.reset();
        drop(guard);

        assert!(!registry.remove_if_idle("alice").await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn many_users_do_not_accumulate() {
        let registry = SessionRegistry::new();
        for i in 0..100 {
            let user = format!("user-{i}");
            let session = registry.get_or_create(&user).await;
            session.lock().await.reset();
            registry.remove_if_idle(&user).await;
        }
        assert!(registry.is_empty().await);
    }
}
