use serde::Serialize;

use crate::studio::EditKind;

/// Notifications broadcast by a [`Studio`](crate::Studio) as its state
/// changes. Front ends re-read the snapshot on receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudioEvent {
    Started { kind: EditKind },
    Applied { cursor: usize, variation: usize },
    Failed { message: String, retryable: bool },
    Reset,
    Navigated { cursor: usize, variation: usize },
    NoticeCleared,
}
