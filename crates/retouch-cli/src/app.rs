use std::path::{Path, PathBuf};

use retouch_core::convert::decode_data_url;
use retouch_core::mode::{background_prompt, product_composite_prompt};
use retouch_core::{ConvertError, EditMode, Studio, StudioError, StudioEvent};
use retouch_llm::ImagePayload;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::command::{Command, HELP};
use crate::ui;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Export(#[from] retouch_app::Error),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("there is no generated image to save yet")]
    NothingToSave,

    #[error("the {mode} mode has no preset {number}")]
    NoSuchPreset { mode: EditMode, number: usize },
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    pub studio: Studio,
    pub out_dir: PathBuf,
    events: broadcast::Receiver<StudioEvent>,
    pub should_quit: bool,
}

impl App {
    pub fn new(studio: Studio, out_dir: PathBuf) -> Self {
        Self {
            events: studio.subscribe(),
            studio,
            out_dir,
            should_quit: false,
        }
    }

    /// Run one command and return the lines to print.
    pub async fn handle(&mut self, command: Command) -> Vec<String> {
        let mut out = Vec::new();
        if let Err(err) = self.dispatch(command, &mut out).await {
            out.push(format!("error: {err}"));
        }
        self.drain_events(&mut out);
        out
    }

    async fn dispatch(&mut self, command: Command, out: &mut Vec<String>) -> Result<(), AppError> {
        let studio = self.studio.clone();
        match command {
            Command::Upload(path) => {
                let payload = load_image(&path).await?;
                report(out, studio.upload(payload));
            }
            Command::Mode(mode) => {
                studio.set_mode(mode);
                out.push(ui::render_presets(mode));
            }
            Command::Presets => out.push(ui::render_presets(studio.mode())),
            Command::Preset(index) => {
                let mode = studio.mode();
                let preset = mode.preset(index).ok_or(AppError::NoSuchPreset {
                    mode,
                    number: index + 1,
                })?;
                out.push(format!("preset: {}", preset.name));
                report(out, studio.submit_new_edit(preset.prompt).await);
            }
            Command::Background(description) => {
                report(out, studio.submit_new_edit(&background_prompt(&description)).await);
            }
            Command::Composite(instruction) => {
                let prompt = product_composite_prompt(&instruction);
                report(out, studio.submit_new_edit(&prompt).await);
            }
            Command::Reference(path) => {
                let payload = load_image(&path).await?;
                if let Some(count) = report(out, studio.add_reference(payload)) {
                    out.push(format!("references attached: {count}"));
                }
            }
            Command::Unreference(index) => {
                if report(out, studio.remove_reference(index)).is_some() {
                    out.push(format!("removed reference {}", index + 1));
                }
            }
            Command::Edit(prompt) => {
                report(out, studio.submit_new_edit(&prompt).await);
            }
            Command::Refine(prompt) => {
                report(out, studio.submit_refine(&prompt).await);
            }
            Command::Regenerate => {
                report(out, studio.submit_regenerate_step().await);
            }
            Command::RegenerateLast => {
                report(out, studio.submit_regenerate_last().await);
            }
            Command::Variation(index) => {
                report(out, studio.select_variation(index));
            }
            Command::Undo => {
                report(out, studio.undo());
            }
            Command::Redo => {
                report(out, studio.redo());
            }
            Command::Retry => {
                report(out, studio.retry_last_failure().await);
            }
            Command::Dismiss => studio.dismiss_error(),
            Command::Status { json } => {
                let snapshot = studio.snapshot();
                if json {
                    out.push(serde_json::to_string_pretty(&snapshot)?);
                } else {
                    let notice = studio.notice();
                    out.push(ui::render_status(&snapshot, studio.mode(), notice.as_ref()));
                }
            }
            Command::Save(path) => {
                let path = self.save(path)?;
                out.push(format!("saved {}", path.display()));
            }
            Command::Help => out.push(HELP.to_string()),
            Command::Quit => self.should_quit = true,
        }
        Ok(())
    }

    /// Write the image on screen to `path`, or to a numbered file in the
    /// output directory.
    fn save(&self, path: Option<PathBuf>) -> Result<PathBuf, AppError> {
        let image = self.studio.current_image().ok_or(AppError::NothingToSave)?;
        let payload = decode_data_url(image.as_str())?;
        let path = match path {
            Some(path) => path,
            None => {
                let snapshot = self.studio.snapshot();
                let name = retouch_app::export_file_name(
                    snapshot.cursor.unwrap_or_default(),
                    snapshot.active_variation.unwrap_or_default(),
                    extension_for(&payload.media_type),
                );
                self.out_dir.join(name)
            }
        };
        retouch_app::write_export(&path, &payload.bytes)?;
        tracing::info!(path = %path.display(), "image saved");
        Ok(path)
    }

    fn drain_events(&mut self, out: &mut Vec<String>) {
        loop {
            match self.events.try_recv() {
                Ok(event) => out.extend(ui::render_event(&event)),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "dropped studio events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

/// Studio failures are announced through events; only the rejections that
/// never become a notice are printed here.
fn report<T>(out: &mut Vec<String>, result: Result<T, StudioError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err @ (StudioError::Busy | StudioError::NothingToRetry)) => {
            out.push(format!("error: {err}"));
            None
        }
        Err(_) => None,
    }
}

pub async fn load_image(path: &Path) -> Result<ImagePayload, AppError> {
    let bytes = tokio::fs::read(path).await?;
    let media_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();
    Ok(ImagePayload::new(bytes, media_type))
}

fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|extensions| extensions.first().copied())
            .unwrap_or("png"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    use parking_lot::Mutex;
    use retouch_core::Studio;
    use retouch_llm::{
        EditModel, EditModelBackend, EditRequest, EditResult, FinishReason, ImagePayload,
        Response,
    };

    use super::{App, extension_for};
    use crate::command::Command;

    /// Answers every request with the same image.
    struct EchoModel {
        image: ImagePayload,
        calls: Arc<Mutex<Vec<EditRequest>>>,
    }

    impl EditModelBackend for EchoModel {
        fn model_id(&self) -> &str {
            "echo"
        }

        fn provider(&self) -> &str {
            "test"
        }

        fn edit(&self, request: EditRequest) -> Response {
            self.calls.lock().push(request);
            let image = self.image.clone();
            Response::new(async move {
                Ok(EditResult {
                    image,
                    text: None,
                    finish_reason: FinishReason::Stop,
                })
            })
        }
    }

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "retouch-cli-test-{}-{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("time")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    fn app(out_dir: PathBuf) -> (App, Arc<Mutex<Vec<EditRequest>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let model = EditModel::new(EchoModel {
            image: ImagePayload::new(vec![7u8; 3], "image/png"),
            calls: calls.clone(),
        });
        (App::new(Studio::new(model), out_dir), calls)
    }

    #[tokio::test]
    async fn upload_edit_and_save() {
        let dir = scratch_dir();
        let input = dir.join("portrait.png");
        std::fs::write(&input, [1u8, 2, 3]).expect("write input");
        let (mut app, calls) = app(dir.join("out"));

        let lines = app.handle(Command::Upload(input)).await;
        assert_eq!(lines, vec!["new image loaded; history cleared".to_string()]);

        let lines = app.handle(Command::Edit("add a hat".to_string())).await;
        assert_eq!(lines.last().map(String::as_str), Some("done: step 1, variation 1"));
        assert_eq!(calls.lock()[0].image.media_type, "image/png");

        let lines = app.handle(Command::Save(None)).await;
        let saved = dir.join("out").join("retouch-step1-v1.png");
        assert_eq!(lines, vec![format!("saved {}", saved.display())]);
        assert_eq!(std::fs::read(&saved).expect("saved file"), vec![7u8; 3]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn failures_are_printed_once() {
        let (mut app, calls) = app(scratch_dir());

        let lines = app.handle(Command::Edit("add a hat".to_string())).await;
        assert_eq!(lines, vec!["error: upload an image first".to_string()]);

        let lines = app.handle(Command::Retry).await;
        assert_eq!(
            lines,
            vec!["error: there is no failed request to retry".to_string()]
        );

        let lines = app.handle(Command::Save(None)).await;
        assert_eq!(
            lines,
            vec!["error: there is no generated image to save yet".to_string()]
        );
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn extensions_follow_media_type() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
    }
}
