use std::fmt::Write;

use retouch_core::{EditKind, EditMode, Notice, SessionSnapshot, StudioEvent};

/// One-screen summary of the session, e.g.
///
/// ```text
/// mode: combine  references: 1
/// history: [1] 2 [3*] (step 2 of 2, variation 1 of 3)
/// ```
pub fn render_status(snapshot: &SessionSnapshot, mode: EditMode, notice: Option<&Notice>) -> String {
    let mut out = String::new();
    if !snapshot.has_base_image {
        out.push_str("no image uploaded (use `upload PATH`)");
        return out;
    }

    let _ = writeln!(out, "mode: {mode}  references: {}", snapshot.reference_count);
    match (snapshot.cursor, snapshot.active_variation) {
        (Some(cursor), Some(variation)) => {
            let steps: Vec<String> = snapshot
                .steps
                .iter()
                .enumerate()
                .map(|(i, count)| {
                    if i == cursor {
                        format!("[{count}*]")
                    } else {
                        count.to_string()
                    }
                })
                .collect();
            let _ = write!(
                out,
                "history: {} (step {} of {}, variation {} of {})",
                steps.join(" "),
                cursor + 1,
                snapshot.steps.len(),
                variation + 1,
                snapshot.steps[cursor]
            );
        }
        _ => out.push_str("history: empty (showing the original)"),
    }
    if let Some(prompt) = &snapshot.last_prompt {
        let _ = write!(out, "\nlast prompt: {prompt}");
    }
    if let Some(notice) = notice {
        let _ = write!(out, "\n{}", render_notice(notice));
    }
    out
}

pub fn render_notice(notice: &Notice) -> String {
    if notice.retry.is_some() {
        format!("error: {} (`retry` to try again, `dismiss` to clear)", notice.message)
    } else {
        format!("error: {}", notice.message)
    }
}

pub fn render_presets(mode: EditMode) -> String {
    let mut out = format!("{mode} presets:");
    for (i, preset) in mode.presets().iter().enumerate() {
        let _ = write!(out, "\n  {}. {}", i + 1, preset.name);
    }
    out
}

/// Line printed for a studio event, if any.
pub fn render_event(event: &StudioEvent) -> Option<String> {
    match event {
        StudioEvent::Started { kind } => Some(match kind {
            EditKind::Edit => "generating...".to_string(),
            EditKind::Regenerate => "generating a new variation...".to_string(),
        }),
        StudioEvent::Applied { cursor, variation } => Some(format!(
            "done: step {}, variation {}",
            cursor + 1,
            variation + 1
        )),
        StudioEvent::Navigated { cursor, variation } => Some(format!(
            "showing step {}, variation {}",
            cursor + 1,
            variation + 1
        )),
        StudioEvent::Failed { message, retryable } => Some(if *retryable {
            format!("error: {message} (`retry` to try again)")
        } else {
            format!("error: {message}")
        }),
        StudioEvent::Reset => Some("new image loaded; history cleared".to_string()),
        StudioEvent::NoticeCleared => None,
    }
}
