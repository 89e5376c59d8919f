//! Lifecycle guard functions.
//!
//! Every gated entity answers "may this action happen now?" through pure
//! predicates over its current status and derived aggregates. The same
//! predicate decides whether the UI offers an action ([`Lifecycle::available_actions`])
//! and whether a command is accepted ([`Lifecycle::ensure`]), so the two can
//! never drift apart.
//!
//! - [`order`]: ticket status machine and payment guards, evaluated over the
//!   projected [`OrderState`](crate::projection::OrderState)
//! - [`transfer`], [`count`], [`count_sheet`]: back-of-house entities whose
//!   status is persisted by the remote API

pub mod count;
pub mod count_sheet;
pub mod order;
pub mod transfer;

use std::fmt;
use thiserror::Error;

pub use count::{CountItem, CountStatus, InventoryCount};
pub use count_sheet::{CountSheet, CountSheetStatus};
pub use order::{OrderAction, OrderCommand, OrderStatus};
pub use transfer::{Transfer, TransferLine, TransferStatus};

/// A requested transition its guard forbids.
///
/// Returned before anything is appended or mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {action} {entity} in status {status}")]
pub struct IllegalTransition {
    /// Kind of entity (`"order"`, `"transfer"`, ...)
    pub entity: &'static str,
    /// The refused action
    pub action: String,
    /// Status the entity was in
    pub status: String,
}

impl IllegalTransition {
    /// Builds the error from displayable parts.
    #[must_use]
    pub fn new(entity: &'static str, action: impl fmt::Display, status: impl fmt::Display) -> Self {
        Self {
            entity,
            action: action.to_string(),
            status: status.to_string(),
        }
    }
}

/// Actions offered on gated back-of-house entities.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    /// Change lines, items or metadata
    Edit,
    /// Put a draft into play (ship a transfer, open a count)
    Start,
    /// Finish (transfer received, count closed)
    Complete,
    /// Abandon
    Cancel,
    /// Hide from active lists
    Archive,
    /// Copy into a new draft
    Duplicate,
    /// Remove permanently
    Delete,
    /// Start work from this template
    Use,
    /// Restore from the archive
    Unarchive,
}

impl LifecycleAction {
    /// Every action, in menu order.
    pub const ALL: [Self; 9] = [
        Self::Edit,
        Self::Start,
        Self::Complete,
        Self::Cancel,
        Self::Archive,
        Self::Duplicate,
        Self::Delete,
        Self::Use,
        Self::Unarchive,
    ];
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Edit => "edit",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::Archive => "archive",
            Self::Duplicate => "duplicate",
            Self::Delete => "delete",
            Self::Use => "use",
            Self::Unarchive => "unarchive",
        };
        f.write_str(name)
    }
}

/// Guarded lifecycle shared by transfers, counts and count sheets.
///
/// Implementors provide their status, the status an action leads to, and the
/// `can_*` predicates that differ from the default of "not allowed".
/// Everything else (dispatch, the action menu, enforcement, mutation) is
/// derived here.
pub trait Lifecycle {
    /// Status enum of the entity.
    type Status: Copy + fmt::Display;

    /// Entity name used in errors.
    const ENTITY: &'static str;

    /// Current status.
    fn status(&self) -> Self::Status;

    /// Status the entity enters after `action`, if the action moves it.
    fn next_status(&self, action: LifecycleAction) -> Option<Self::Status>;

    /// Overwrites the status. Only called by [`Lifecycle::apply`].
    fn set_status(&mut self, status: Self::Status);

    /// Whether the entity may be edited.
    fn can_edit(&self) -> bool {
        false
    }

    /// Whether a draft may be put into play.
    fn can_start(&self) -> bool {
        false
    }

    /// Whether the entity may be completed.
    fn can_complete(&self) -> bool {
        false
    }

    /// Whether the entity may be cancelled.
    fn can_cancel(&self) -> bool {
        false
    }

    /// Whether the entity may be archived.
    fn can_archive(&self) -> bool {
        false
    }

    /// Whether the entity may be duplicated.
    fn can_duplicate(&self) -> bool {
        false
    }

    /// Whether the entity may be deleted.
    fn can_delete(&self) -> bool {
        false
    }

    /// Whether the entity may be used as a template.
    fn can_use(&self) -> bool {
        false
    }

    /// Whether the entity may be restored from the archive.
    fn can_unarchive(&self) -> bool {
        false
    }

    /// Dispatches to the `can_*` predicate for `action`.
    fn allows(&self, action: LifecycleAction) -> bool {
        match action {
            LifecycleAction::Edit => self.can_edit(),
            LifecycleAction::Start => self.can_start(),
            LifecycleAction::Complete => self.can_complete(),
            LifecycleAction::Cancel => self.can_cancel(),
            LifecycleAction::Archive => self.can_archive(),
            LifecycleAction::Duplicate => self.can_duplicate(),
            LifecycleAction::Delete => self.can_delete(),
            LifecycleAction::Use => self.can_use(),
            LifecycleAction::Unarchive => self.can_unarchive(),
        }
    }

    /// Actions to render for the entity right now.
    fn available_actions(&self) -> Vec<LifecycleAction> {
        LifecycleAction::ALL
            .into_iter()
            .filter(|action| self.allows(*action))
            .collect()
    }

    /// Enforces the guard for `action`.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] if the guard forbids the action.
    fn ensure(&self, action: LifecycleAction) -> Result<(), IllegalTransition> {
        if self.allows(action) {
            Ok(())
        } else {
            Err(IllegalTransition::new(Self::ENTITY, action, self.status()))
        }
    }

    /// Checks the guard, then moves the entity to the action's target status
    /// (if the action has one).
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] and leaves the entity untouched if the
    /// guard forbids the action.
    fn apply(&mut self, action: LifecycleAction) -> Result<(), IllegalTransition> {
        self.ensure(action)?;
        if let Some(next) = self.next_status(action) {
            self.set_status(next);
        }
        Ok(())
    }
}
