//! Coalescing of attribute updates into a single device command.

use log::debug;
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use uuid::Uuid;

/// An attribute that can be staged in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    OnOff,
    Brightness,
    Color,
    Transition,
}

/// Which fields were touched since the batch started.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyFields {
    on_off: bool,
    brightness: bool,
    color: bool,
    transition: bool,
}

impl DirtyFields {
    pub fn mark(&mut self, field: Field) {
        *self.flag(field) = true;
    }

    pub fn is_dirty(&self, field: Field) -> bool {
        match field {
            Field::OnOff => self.on_off,
            Field::Brightness => self.brightness,
            Field::Color => self.color,
            Field::Transition => self.transition,
        }
    }

    pub fn is_empty(&self) -> bool {
        Field::iter().all(|field| !self.is_dirty(field))
    }

    /// Touched fields, in declaration order.
    pub fn touched(&self) -> Vec<Field> {
        Field::iter().filter(|field| self.is_dirty(*field)).collect()
    }

    fn flag(&mut self, field: Field) -> &mut bool {
        match field {
            Field::OnOff => &mut self.on_off,
            Field::Brightness => &mut self.brightness,
            Field::Color => &mut self.color,
            Field::Transition => &mut self.transition,
        }
    }
}

/// An open batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSession {
    id: Uuid,
    dirty: DirtyFields,
}

impl BatchSession {
    fn new() -> Self {
        BatchSession {
            id: Uuid::new_v4(),
            dirty: DirtyFields::default(),
        }
    }

    /// Identifier used to correlate the log lines of one batch.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dirty(&self) -> &DirtyFields {
        &self.dirty
    }
}

/// Phase of a [`BatchCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    Batching,
}

/// Two-state machine deciding whether mutations are flushed or staged.
///
/// While batching, mutations still go to the light state but no device
/// command is produced until [`BatchCoordinator::end_batch`].
///
/// # Example
///
/// ```
/// use lifx_bridge::{BatchCoordinator, BatchPhase, Field};
///
/// let mut batch = BatchCoordinator::new();
/// assert!(batch.start_batch());
/// assert!(!batch.start_batch());
/// assert!(batch.stage(Field::Brightness));
///
/// let session = batch.end_batch().unwrap();
/// assert_eq!(session.dirty().touched(), vec![Field::Brightness]);
/// assert_eq!(batch.phase(), BatchPhase::Idle);
/// assert!(batch.end_batch().is_none());
/// ```
#[derive(Default, Debug)]
pub struct BatchCoordinator {
    session: Option<BatchSession>,
}

impl BatchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> BatchPhase {
        if self.session.is_some() {
            BatchPhase::Batching
        } else {
            BatchPhase::Idle
        }
    }

    pub fn is_batching(&self) -> bool {
        self.session.is_some()
    }

    /// The open batch, if any.
    pub fn current(&self) -> Option<&BatchSession> {
        self.session.as_ref()
    }

    /// Open a batch. Returns `false` if one was already open.
    pub fn start_batch(&mut self) -> bool {
        if let Some(session) = &self.session {
            debug!("batch {} already open", session.id);
            return false;
        }
        let session = BatchSession::new();
        debug!("batch {} started", session.id);
        self.session = Some(session);
        true
    }

    /// Record a mutation of `field`. Returns `true` if it was staged, `false`
    /// if no batch is open and the caller must flush it.
    pub fn stage(&mut self, field: Field) -> bool {
        match &mut self.session {
            Some(session) => {
                session.dirty.mark(field);
                true
            }
            None => false,
        }
    }

    /// Close the open batch and hand it back for flushing.
    ///
    /// Returns `None` when idle, in which case nothing must be flushed.
    pub fn end_batch(&mut self) -> Option<BatchSession> {
        let session = self.session.take()?;
        debug!(
            "batch {} ended, touched {:?}",
            session.id,
            session.dirty.touched()
        );
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_while_idle() {
        let mut batch = BatchCoordinator::new();
        assert!(!batch.stage(Field::Color));
        assert_eq!(batch.phase(), BatchPhase::Idle);
    }

    #[test]
    fn test_reentrant_start_keeps_session() {
        let mut batch = BatchCoordinator::new();
        batch.start_batch();
        batch.stage(Field::OnOff);
        let id = batch.current().unwrap().id();

        assert!(!batch.start_batch());
        let session = batch.current().unwrap();
        assert_eq!(session.id(), id);
        assert!(session.dirty().is_dirty(Field::OnOff));
    }

    #[test]
    fn test_end_clears_staging() {
        let mut batch = BatchCoordinator::new();
        batch.start_batch();
        batch.stage(Field::Transition);
        batch.stage(Field::Color);
        let session = batch.end_batch().unwrap();
        assert_eq!(
            session.dirty().touched(),
            vec![Field::Color, Field::Transition]
        );

        batch.start_batch();
        assert!(batch.current().unwrap().dirty().is_empty());
    }

    #[test]
    fn test_field_names() {
        assert_eq!(Field::OnOff.to_string(), "on-off");
        assert_eq!(Field::Transition.to_string(), "transition");
    }
}
