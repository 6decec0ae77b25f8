//! The generation orchestrator.
//!
//! [`Studio`] wraps a single [`EditModel`] call with validation, a busy
//! guard and a notice slot that carries the exact request needed to retry a
//! failure. Results are handed to the [`Session`] which decides whether they
//! start a new step or join the current one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use retouch_llm::{EditModel, ImagePayload, RequestBuilder};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::convert::{DataUrlConverter, DisplayImage, PayloadConverter};
use crate::error::StudioError;
use crate::event::StudioEvent;
use crate::mode::{EditMode, ReferencePolicy};
use crate::session::{BaseImage, Session, SessionError, SessionSnapshot};

const EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// Whether a result starts a new step or becomes another variation of the
/// current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Edit,
    Regenerate,
}

/// The image a request is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceImage {
    /// Already in wire form (the uploaded original).
    Payload(ImagePayload),
    /// A generated result that has to be converted before sending.
    Display(DisplayImage),
}

/// Everything needed to issue one edit request. Stored verbatim with a
/// failure so a retry sends the identical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditIntent {
    pub prompt: String,
    pub base: SourceImage,
    pub extras: Vec<ImagePayload>,
    pub kind: EditKind,
}

/// The message shown to the user, plus the request to replay when the
/// failure is retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub retry: Option<EditIntent>,
}

/// Where a successful submission landed in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub cursor: usize,
    pub variation: usize,
}

// ---------------------------------------------------------------------------
// Studio
// ---------------------------------------------------------------------------

struct StudioState {
    session: Session,
    notice: Option<Notice>,
    mode: EditMode,
}

type RequestHook = Arc<dyn Fn(&mut RequestBuilder) + Send + Sync>;

struct Inner {
    model: EditModel,
    converter: Box<dyn PayloadConverter>,
    configure: Mutex<Option<RequestHook>>,
    state: Mutex<StudioState>,
    busy: AtomicBool,
    events: broadcast::Sender<StudioEvent>,
}

/// Cheaply clonable handle to one editing session and the model it talks to.
#[derive(Clone)]
pub struct Studio {
    inner: Arc<Inner>,
}

/// Holds the busy flag for the lifetime of one submission.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Studio {
    pub fn new(model: EditModel) -> Self {
        Self::with_converter(model, DataUrlConverter)
    }

    pub fn with_converter(model: EditModel, converter: impl PayloadConverter + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                model,
                converter: Box::new(converter),
                configure: Mutex::new(None),
                state: Mutex::new(StudioState {
                    session: Session::new(),
                    notice: None,
                    mode: EditMode::default(),
                }),
                busy: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Set a hook that runs on every request before it is sent, e.g. to
    /// apply provider-specific options. Replaces any previous hook.
    pub fn configure_request(&self, f: impl Fn(&mut RequestBuilder) + Send + Sync + 'static) {
        *self.inner.configure.lock() = Some(Arc::new(f));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StudioEvent> {
        self.inner.events.subscribe()
    }

    pub fn model(&self) -> &EditModel {
        &self.inner.model
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().session.snapshot()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.inner.state.lock().notice.clone()
    }

    pub fn current_image(&self) -> Option<DisplayImage> {
        self.inner.state.lock().session.current_image().cloned()
    }

    pub fn mode(&self) -> EditMode {
        self.inner.state.lock().mode
    }

    pub fn set_mode(&self, mode: EditMode) {
        self.inner.state.lock().mode = mode;
        tracing::debug!(%mode, "edit mode changed");
    }

    // -- uploads --

    /// Replace the base image and start a fresh session.
    pub fn upload(&self, payload: ImagePayload) -> Result<(), StudioError> {
        if !payload.is_image() {
            return Err(self.reject(StudioError::NotAnImage {
                media_type: payload.media_type,
            }));
        }
        if self.is_busy() {
            return Err(StudioError::Busy);
        }
        {
            let mut state = self.inner.state.lock();
            state.session.reset_for_new_upload(BaseImage::new(payload));
            state.notice = None;
        }
        tracing::info!("new base image uploaded");
        self.emit(StudioEvent::Reset);
        Ok(())
    }

    /// Attach a reference image according to the current mode. Returns the
    /// number of references now attached.
    pub fn add_reference(&self, payload: ImagePayload) -> Result<usize, StudioError> {
        if !payload.is_image() {
            return Err(self.reject(StudioError::NotAnImage {
                media_type: payload.media_type,
            }));
        }
        let result = {
            let mut state = self.inner.state.lock();
            let mode = state.mode;
            if state.session.base_image().is_none() {
                Err(StudioError::NoUpload)
            } else {
                match mode.reference_policy() {
                    ReferencePolicy::None => Err(StudioError::ReferencesNotSupported { mode }),
                    ReferencePolicy::Single => {
                        state.session.clear_references();
                        state.session.add_reference(payload);
                        Ok(1)
                    }
                    ReferencePolicy::Many => {
                        state.session.add_reference(payload);
                        Ok(state.session.references().len())
                    }
                }
            }
        };
        result.map_err(|err| self.reject(err))
    }

    pub fn remove_reference(&self, index: usize) -> Result<ImagePayload, StudioError> {
        let result = self.inner.state.lock().session.remove_reference(index);
        result.map_err(|err| self.reject(err.into()))
    }

    // -- navigation --

    pub fn select_variation(&self, index: usize) -> Result<(), StudioError> {
        self.navigate(|session| session.select_variation(index))
    }

    pub fn undo(&self) -> Result<(), StudioError> {
        self.navigate(Session::undo)
    }

    pub fn redo(&self) -> Result<(), StudioError> {
        self.navigate(Session::redo)
    }

    /// Move within the history. Rejected while a request is in flight: its
    /// result is applied at the cursor it was derived from.
    fn navigate(
        &self,
        op: impl FnOnce(&mut Session) -> Result<(), SessionError>,
    ) -> Result<(), StudioError> {
        if self.is_busy() {
            return Err(StudioError::Busy);
        }
        let result = {
            let mut state = self.inner.state.lock();
            op(&mut state.session).map(|()| {
                let session = &state.session;
                (session.cursor(), session.active_variation())
            })
        };
        match result {
            Ok((Some(cursor), Some(variation))) => {
                tracing::debug!(cursor, variation, "navigated");
                self.emit(StudioEvent::Navigated { cursor, variation });
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(err) => Err(self.reject(err.into())),
        }
    }

    // -- notices --

    /// Clear the notice together with its retry.
    pub fn dismiss_error(&self) {
        let had_notice = self.inner.state.lock().notice.take().is_some();
        if had_notice {
            self.emit(StudioEvent::NoticeCleared);
        }
    }

    /// Replay the request stored with the last failure.
    pub async fn retry_last_failure(&self) -> Result<Applied, StudioError> {
        let intent = self
            .inner
            .state
            .lock()
            .notice
            .as_ref()
            .and_then(|notice| notice.retry.clone());
        match intent {
            Some(intent) => self.submit(intent).await,
            None => Err(StudioError::NothingToRetry),
        }
    }

    // -- submissions --

    /// Edit the uploaded original with any attached references.
    pub async fn submit_new_edit(&self, prompt: &str) -> Result<Applied, StudioError> {
        let intent = self.derive(|session| {
            let base = session.base_image().ok_or(StudioError::NoUpload)?;
            Ok(EditIntent {
                prompt: prompt.to_string(),
                base: SourceImage::Payload(base.payload.clone()),
                extras: session.references().to_vec(),
                kind: EditKind::Edit,
            })
        });
        self.submit(intent?).await
    }

    /// Start a new step from the variation currently on screen.
    pub async fn submit_refine(&self, prompt: &str) -> Result<Applied, StudioError> {
        let intent = self.derive(|session| {
            let current = session.current_image().ok_or(StudioError::NoCurrentImage)?;
            Ok(EditIntent {
                prompt: prompt.to_string(),
                base: SourceImage::Display(current.clone()),
                extras: Vec::new(),
                kind: EditKind::Edit,
            })
        });
        self.submit(intent?).await
    }

    /// Run the last prompt again on the variation on screen and add the
    /// result to the current step.
    pub async fn submit_regenerate_step(&self) -> Result<Applied, StudioError> {
        let intent = self.derive(|session| {
            let prompt = session
                .last_prompt()
                .ok_or(StudioError::NoPromptToRegenerate)?;
            let current = session.current_image().ok_or(SessionError::NoHistory)?;
            Ok(EditIntent {
                prompt: prompt.to_string(),
                base: SourceImage::Display(current.clone()),
                extras: Vec::new(),
                kind: EditKind::Regenerate,
            })
        });
        self.submit(intent?).await
    }

    /// Re-derive the current step from its canonical input: the original
    /// for the first step, otherwise the newest variation of the step
    /// before it.
    pub async fn submit_regenerate_last(&self) -> Result<Applied, StudioError> {
        let intent = self.derive(|session| {
            let prompt = session
                .last_prompt()
                .ok_or(StudioError::NoPromptToRegenerate)?;
            let cursor = session.cursor().ok_or(SessionError::NoHistory)?;
            let base = if cursor == 0 {
                let base = session.base_image().ok_or(StudioError::NoUpload)?;
                SourceImage::Payload(base.payload.clone())
            } else {
                let previous = session
                    .previous_step_last_variation()
                    .ok_or(SessionError::NoHistory)?;
                SourceImage::Display(previous.clone())
            };
            Ok(EditIntent {
                prompt: prompt.to_string(),
                base,
                extras: session.references().to_vec(),
                kind: EditKind::Regenerate,
            })
        });
        self.submit(intent?).await
    }

    /// Issue one request and apply its result.
    ///
    /// Validation failures set a notice without a retry. Request and
    /// conversion failures set a notice carrying `intent` so
    /// [`retry_last_failure`](Self::retry_last_failure) can replay it. A
    /// submission while another is in flight is rejected with
    /// [`StudioError::Busy`] and leaves the notice alone.
    pub async fn submit(&self, intent: EditIntent) -> Result<Applied, StudioError> {
        if intent.prompt.trim().is_empty() {
            return Err(self.reject(StudioError::EmptyPrompt));
        }
        let Some(_busy) = BusyGuard::acquire(&self.inner.busy) else {
            tracing::debug!("submission rejected, request already in flight");
            return Err(StudioError::Busy);
        };

        {
            let mut state = self.inner.state.lock();
            state.notice = None;
            if intent.kind == EditKind::Edit {
                state.session.record_prompt(intent.prompt.clone());
            }
        }
        tracing::info!(kind = ?intent.kind, extras = intent.extras.len(), "submitting edit");
        self.emit(StudioEvent::Started { kind: intent.kind });

        match self.execute(&intent).await {
            Ok(image) => self.apply(intent.kind, image),
            Err(err) => {
                tracing::warn!(error = %err, "edit failed");
                let message = format!("Generation failed: {err}");
                self.inner.state.lock().notice = Some(Notice {
                    message: message.clone(),
                    retry: Some(intent),
                });
                self.emit(StudioEvent::Failed {
                    message,
                    retryable: true,
                });
                Err(err)
            }
        }
    }

    async fn execute(&self, intent: &EditIntent) -> Result<DisplayImage, StudioError> {
        let base = match &intent.base {
            SourceImage::Payload(payload) => payload.clone(),
            SourceImage::Display(display) => self.inner.converter.to_payload(display).await?,
        };
        let mut builder = retouch_llm::request(intent.prompt.clone(), base);
        builder.references(intent.extras.iter().cloned());
        let configure = self.inner.configure.lock().clone();
        if let Some(configure) = configure {
            configure(&mut builder);
        }
        let result = self.inner.model.edit(builder).into_result().await?;
        if let Some(text) = &result.text {
            tracing::debug!(%text, "model commentary");
        }
        Ok(DisplayImage::from_payload(&result.image))
    }

    fn apply(&self, kind: EditKind, image: DisplayImage) -> Result<Applied, StudioError> {
        let result = {
            let mut state = self.inner.state.lock();
            let applied = match kind {
                EditKind::Edit => {
                    state.session.apply_new_edit(image);
                    Ok(())
                }
                EditKind::Regenerate => state.session.apply_regeneration(image),
            };
            applied.map(|()| Applied {
                cursor: state.session.cursor().unwrap_or_default(),
                variation: state.session.active_variation().unwrap_or_default(),
            })
        };
        match result {
            Ok(applied) => {
                tracing::info!(cursor = applied.cursor, variation = applied.variation, "edit applied");
                self.emit(StudioEvent::Applied {
                    cursor: applied.cursor,
                    variation: applied.variation,
                });
                Ok(applied)
            }
            Err(err) => Err(self.reject(err.into())),
        }
    }

    // -- helpers --

    /// Build an intent under the lock. A derivation failure becomes the
    /// notice once the lock is released.
    fn derive(
        &self,
        f: impl FnOnce(&Session) -> Result<EditIntent, StudioError>,
    ) -> Result<EditIntent, StudioError> {
        let result = f(&self.inner.state.lock().session);
        result.map_err(|err| self.reject(err))
    }

    /// Record a failure that has no retry as the visible notice.
    fn reject(&self, err: StudioError) -> StudioError {
        if err.is_transient() {
            return err;
        }
        let message = err.to_string();
        tracing::debug!(%message, "rejected");
        self.inner.state.lock().notice = Some(Notice {
            message: message.clone(),
            retry: None,
        });
        self.emit(StudioEvent::Failed {
            message,
            retryable: false,
        });
        err
    }

    fn emit(&self, event: StudioEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }
}
