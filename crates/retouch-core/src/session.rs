//! The edit session: uploaded base image, reference images and the
//! step/variation history with its navigation cursor.
//!
//! Every operation here is synchronous and free of I/O. Steps live in a flat
//! `Vec` and navigation is index arithmetic over it.

use retouch_llm::ImagePayload;
use serde::Serialize;

use crate::convert::DisplayImage;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The uploaded original, kept in both forms so new edits can send it
/// without a conversion round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseImage {
    pub payload: ImagePayload,
    pub display: DisplayImage,
}

impl BaseImage {
    pub fn new(payload: ImagePayload) -> Self {
        let display = DisplayImage::from_payload(&payload);
        Self { payload, display }
    }
}

/// One completed edit. Holds every variation produced from the same input
/// and prompt; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    variations: Vec<DisplayImage>,
}

impl Step {
    fn new(first: DisplayImage) -> Self {
        Self {
            variations: vec![first],
        }
    }

    pub fn variations(&self) -> &[DisplayImage] {
        &self.variations
    }

    pub fn len(&self) -> usize {
        self.variations.len()
    }

    /// Never true for a step held in a session.
    pub fn is_empty(&self) -> bool {
        self.variations.is_empty()
    }

    /// The most recently appended variation.
    pub fn last(&self) -> &DisplayImage {
        // Steps are created with one variation and only ever grow.
        &self.variations[self.variations.len() - 1]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("cannot regenerate, no history available")]
    NoHistory,

    #[error("nothing to undo")]
    CannotUndo,

    #[error("nothing to redo")]
    CannotRedo,

    #[error("variation {index} is out of range ({len} available)")]
    VariationOutOfRange { index: usize, len: usize },

    #[error("reference image {index} is out of range ({len} attached)")]
    ReferenceOutOfRange { index: usize, len: usize },
}

/// A clonable read model of the session for front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub has_base_image: bool,
    pub reference_count: usize,
    /// Variation count of each step, oldest first.
    pub steps: Vec<usize>,
    pub cursor: Option<usize>,
    pub active_variation: Option<usize>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub last_prompt: Option<String>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Session {
    base_image: Option<BaseImage>,
    references: Vec<ImagePayload>,
    history: Vec<Step>,
    cursor: Option<usize>,
    active_variation: usize,
    last_prompt: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // -- reads --

    pub fn base_image(&self) -> Option<&BaseImage> {
        self.base_image.as_ref()
    }

    pub fn references(&self) -> &[ImagePayload] {
        &self.references
    }

    pub fn history(&self) -> &[Step] {
        &self.history
    }

    /// Index of the active step, or `None` before the first successful edit.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Index of the displayed variation within the active step.
    pub fn active_variation(&self) -> Option<usize> {
        self.cursor.map(|_| self.active_variation)
    }

    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.cursor.map(|c| &self.history[c])
    }

    /// Variations of the active step; empty before the first edit.
    pub fn current_variations(&self) -> &[DisplayImage] {
        self.current_step().map(Step::variations).unwrap_or_default()
    }

    /// The image on screen: the active variation of the active step.
    pub fn current_image(&self) -> Option<&DisplayImage> {
        self.current_step()
            .map(|step| &step.variations[self.active_variation])
    }

    /// The newest variation of the step before the active one. This is the
    /// canonical input the active step was derived from, whatever variation
    /// the user happens to be looking at.
    pub fn previous_step_last_variation(&self) -> Option<&DisplayImage> {
        let cursor = self.cursor?;
        let previous = cursor.checked_sub(1)?;
        Some(self.history[previous].last())
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        match self.cursor {
            Some(c) => c + 1 < self.history.len(),
            None => false,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            has_base_image: self.base_image.is_some(),
            reference_count: self.references.len(),
            steps: self.history.iter().map(Step::len).collect(),
            cursor: self.cursor,
            active_variation: self.active_variation(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            last_prompt: self.last_prompt.clone(),
        }
    }

    // -- upload & references --

    /// Install a new base image and drop everything derived from the old
    /// one.
    pub fn reset_for_new_upload(&mut self, base: BaseImage) {
        *self = Self {
            base_image: Some(base),
            ..Self::default()
        };
    }

    pub fn add_reference(&mut self, image: ImagePayload) {
        self.references.push(image);
    }

    pub fn clear_references(&mut self) {
        self.references.clear();
    }

    pub fn remove_reference(&mut self, index: usize) -> Result<ImagePayload, SessionError> {
        if index >= self.references.len() {
            return Err(SessionError::ReferenceOutOfRange {
                index,
                len: self.references.len(),
            });
        }
        Ok(self.references.remove(index))
    }

    pub fn record_prompt(&mut self, prompt: impl Into<String>) {
        self.last_prompt = Some(prompt.into());
    }

    // -- history transitions --

    /// Start a new step after the active one, discarding any redo branch.
    pub fn apply_new_edit(&mut self, image: DisplayImage) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.history.truncate(keep);
        self.history.push(Step::new(image));
        self.cursor = Some(self.history.len() - 1);
        self.active_variation = 0;
    }

    /// Add a sibling variation to the active step and show it.
    pub fn apply_regeneration(&mut self, image: DisplayImage) -> Result<(), SessionError> {
        let cursor = self.cursor.ok_or(SessionError::NoHistory)?;
        let step = &mut self.history[cursor];
        step.variations.push(image);
        self.active_variation = step.variations.len() - 1;
        Ok(())
    }

    /// Step back. The previous step opens on its newest variation.
    pub fn undo(&mut self) -> Result<(), SessionError> {
        let cursor = match self.cursor {
            Some(c) if c > 0 => c - 1,
            _ => return Err(SessionError::CannotUndo),
        };
        self.cursor = Some(cursor);
        self.active_variation = self.history[cursor].len() - 1;
        Ok(())
    }

    /// Step forward. The next step opens on its first variation.
    pub fn redo(&mut self) -> Result<(), SessionError> {
        if !self.can_redo() {
            return Err(SessionError::CannotRedo);
        }
        self.cursor = self.cursor.map(|c| c + 1);
        self.active_variation = 0;
        Ok(())
    }

    pub fn select_variation(&mut self, index: usize) -> Result<(), SessionError> {
        let len = self.current_variations().len();
        if index >= len {
            return Err(SessionError::VariationOutOfRange { index, len });
        }
        self.active_variation = index;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BaseImage, Session, SessionError};
    use crate::convert::DisplayImage;
    use retouch_llm::ImagePayload;

    fn image(tag: &str) -> DisplayImage {
        DisplayImage::from_data_url(format!("data:image/png;base64,{tag}"))
    }

    fn uploaded() -> Session {
        let mut session = Session::new();
        session.reset_for_new_upload(BaseImage::new(ImagePayload::new(
            b"base".to_vec(),
            "image/png",
        )));
        session
    }

    fn position(session: &Session) -> (Option<usize>, Option<usize>) {
        (session.cursor(), session.active_variation())
    }

    #[test]
    fn empty_session_has_no_image() {
        let session = Session::new();
        assert_eq!(session.cursor(), None);
        assert_eq!(session.active_variation(), None);
        assert!(session.current_image().is_none());
        assert!(session.current_variations().is_empty());
        assert!(!session.can_undo());
        assert!(!session.can_redo());
    }

    #[test]
    fn each_new_edit_appends_one_step_and_moves_the_cursor() {
        let mut session = uploaded();
        for n in 1..=5 {
            session.apply_new_edit(image(&format!("S{n}")));
            assert_eq!(session.history().len(), n);
            assert_eq!(session.cursor(), Some(n - 1));
            assert_eq!(session.active_variation(), Some(0));
        }
        assert_eq!(session.current_image(), Some(&image("S5")));
    }

    #[test]
    fn undo_then_redo_restores_position() {
        let mut session = uploaded();
        session.apply_new_edit(image("A"));
        session.apply_new_edit(image("B"));
        session.apply_regeneration(image("B2")).expect("regenerate");
        session.apply_regeneration(image("B3")).expect("regenerate");
        session.select_variation(0).expect("select");

        // Redo always opens on variation 0, so start from there.
        let before = position(&session);
        assert!(session.can_undo());
        session.undo().expect("undo");
        session.redo().expect("redo");
        assert_eq!(position(&session), before);
    }

    #[test]
    fn regeneration_grows_only_the_active_step() {
        let mut session = uploaded();
        session.apply_new_edit(image("A"));
        session.apply_new_edit(image("B"));
        session.undo().expect("undo");

        session.apply_regeneration(image("A2")).expect("regenerate");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].variations(), &[image("A"), image("A2")]);
        assert_eq!(session.history()[1].len(), 1);
        assert_eq!(position(&session), (Some(0), Some(1)));
    }

    #[test]
    fn regeneration_without_history_fails_without_mutation() {
        let mut session = uploaded();
        assert_eq!(
            session.apply_regeneration(image("X")),
            Err(SessionError::NoHistory)
        );
        assert!(session.history().is_empty());
        assert_eq!(session.cursor(), None);
    }

    #[test]
    fn new_edit_after_undo_truncates_redo_branch() {
        let mut session = uploaded();
        session.apply_new_edit(image("A"));
        session.apply_new_edit(image("B"));
        session.apply_new_edit(image("C"));
        session.undo().expect("undo");
        session.undo().expect("undo");
        assert_eq!(session.cursor(), Some(0));

        session.apply_new_edit(image("D"));
        // The divergent edit replaces everything after step 0.
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.cursor(), Some(1));
        assert_eq!(session.current_image(), Some(&image("D")));
        assert!(!session.can_redo());
    }

    #[test]
    fn truncation_keeps_variations_at_and_before_cursor() {
        let mut session = uploaded();
        session.apply_new_edit(image("A"));
        session.apply_regeneration(image("A2")).expect("regenerate");
        session.apply_new_edit(image("B"));
        session.undo().expect("undo");

        session.apply_new_edit(image("C"));
        assert_eq!(session.history()[0].variations(), &[image("A"), image("A2")]);
        assert_eq!(session.history()[1].variations(), &[image("C")]);
    }

    #[test]
    fn undo_and_redo_at_boundaries_are_rejected() {
        let mut session = uploaded();
        assert_eq!(session.undo(), Err(SessionError::CannotUndo));
        assert_eq!(session.redo(), Err(SessionError::CannotRedo));

        session.apply_new_edit(image("A"));
        assert_eq!(session.undo(), Err(SessionError::CannotUndo));
        assert_eq!(session.redo(), Err(SessionError::CannotRedo));
        assert_eq!(position(&session), (Some(0), Some(0)));
    }

    #[test]
    fn out_of_range_variation_is_rejected_without_mutation() {
        let mut session = uploaded();
        assert_eq!(
            session.select_variation(0),
            Err(SessionError::VariationOutOfRange { index: 0, len: 0 })
        );

        session.apply_new_edit(image("A"));
        session.apply_regeneration(image("A2")).expect("regenerate");
        let before = position(&session);

        assert_eq!(
            session.select_variation(2),
            Err(SessionError::VariationOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(position(&session), before);

        session.select_variation(0).expect("select");
        assert_eq!(session.current_image(), Some(&image("A")));
    }

    #[test]
    fn walkthrough_with_regenerate_refine_undo_redo() {
        let mut session = uploaded();

        session.apply_new_edit(image("A"));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.cursor(), Some(0));

        session.apply_regeneration(image("A2")).expect("regenerate");
        assert_eq!(session.history()[0].variations(), &[image("A"), image("A2")]);
        assert_eq!(position(&session), (Some(0), Some(1)));

        session.apply_new_edit(image("B"));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1].variations(), &[image("B")]);
        assert_eq!(session.cursor(), Some(1));

        session.undo().expect("undo");
        assert_eq!(position(&session), (Some(0), Some(1)));
        assert_eq!(session.current_image(), Some(&image("A2")));

        session.redo().expect("redo");
        assert_eq!(position(&session), (Some(1), Some(0)));
    }

    #[test]
    fn undo_opens_the_newest_variation_not_the_last_viewed_one() {
        let mut session = uploaded();
        session.apply_new_edit(image("A"));
        session.apply_regeneration(image("A2")).expect("regenerate");
        session.apply_regeneration(image("A3")).expect("regenerate");
        session.select_variation(0).expect("select");
        session.apply_new_edit(image("B"));

        session.undo().expect("undo");
        assert_eq!(session.current_image(), Some(&image("A3")));
    }

    #[test]
    fn previous_step_last_variation_ignores_selection() {
        let mut session = uploaded();
        session.apply_new_edit(image("A"));
        assert_eq!(session.previous_step_last_variation(), None);

        session.apply_regeneration(image("A2")).expect("regenerate");
        session.select_variation(0).expect("select");
        session.apply_new_edit(image("B"));
        assert_eq!(session.previous_step_last_variation(), Some(&image("A2")));
    }

    #[test]
    fn upload_mid_history_resets_everything() {
        let mut session = uploaded();
        session.add_reference(ImagePayload::new(b"r1".to_vec(), "image/png"));
        session.record_prompt("P1");
        session.apply_new_edit(image("A"));
        session.apply_new_edit(image("B"));
        session.undo().expect("undo");

        let fresh = BaseImage::new(ImagePayload::new(b"other".to_vec(), "image/jpeg"));
        session.reset_for_new_upload(fresh.clone());

        assert_eq!(session.base_image(), Some(&fresh));
        assert!(session.history().is_empty());
        assert_eq!(session.cursor(), None);
        assert!(session.references().is_empty());
        assert_eq!(session.last_prompt(), None);
    }

    #[test]
    fn references_keep_insertion_order() {
        let mut session = uploaded();
        let r1 = ImagePayload::new(b"r1".to_vec(), "image/png");
        let r2 = ImagePayload::new(b"r2".to_vec(), "image/png");
        let r3 = ImagePayload::new(b"r3".to_vec(), "image/png");
        session.add_reference(r1.clone());
        session.add_reference(r2.clone());
        session.add_reference(r3.clone());

        assert_eq!(session.remove_reference(1), Ok(r2));
        assert_eq!(session.references(), &[r1, r3]);
        assert_eq!(
            session.remove_reference(5),
            Err(SessionError::ReferenceOutOfRange { index: 5, len: 2 })
        );
    }

    #[test]
    fn snapshot_reflects_navigation() {
        let mut session = uploaded();
        session.record_prompt("P1");
        session.apply_new_edit(image("A"));
        session.apply_regeneration(image("A2")).expect("regenerate");
        session.apply_new_edit(image("B"));
        session.undo().expect("undo");

        let snapshot = session.snapshot();
        assert!(snapshot.has_base_image);
        assert_eq!(snapshot.steps, vec![2, 1]);
        assert_eq!(snapshot.cursor, Some(0));
        assert_eq!(snapshot.active_variation, Some(1));
        assert!(!snapshot.can_undo);
        assert!(snapshot.can_redo);
        assert_eq!(snapshot.last_prompt.as_deref(), Some("P1"));
    }
}
