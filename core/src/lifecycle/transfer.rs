//! Stock transfers between locations.

use super::{IllegalTransition, Lifecycle, LifecycleAction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transfer status as persisted by the remote API.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    /// Being assembled, fully editable
    Draft,
    /// Shipped, awaiting receipt
    InTransit,
    /// Received at the destination
    Completed,
    /// Abandoned
    Cancelled,
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Draft => "DRAFT",
            Self::InTransit => "IN_TRANSIT",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

/// One inventory item moved by a transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLine {
    /// Inventory item being moved
    pub item_id: String,
    /// Units moved
    pub quantity: u32,
}

/// A transfer of stock from one location to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Transfer identifier
    pub id: String,
    /// Sending location
    pub from_location: String,
    /// Receiving location
    pub to_location: String,
    /// Current status
    pub status: TransferStatus,
    /// Items moved
    pub lines: Vec<TransferLine>,
}

impl Transfer {
    /// Creates an empty draft transfer.
    #[must_use]
    pub fn draft(
        id: impl Into<String>,
        from_location: impl Into<String>,
        to_location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from_location: from_location.into(),
            to_location: to_location.into(),
            status: TransferStatus::Draft,
            lines: Vec::new(),
        }
    }

    /// Sum of units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Copies the lines into a new draft.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] if the transfer cannot be duplicated.
    pub fn duplicate(&self, new_id: impl Into<String>) -> Result<Self, IllegalTransition> {
        self.ensure(LifecycleAction::Duplicate)?;
        Ok(Self {
            id: new_id.into(),
            status: TransferStatus::Draft,
            ..self.clone()
        })
    }
}

impl Lifecycle for Transfer {
    type Status = TransferStatus;

    const ENTITY: &'static str = "transfer";

    fn status(&self) -> TransferStatus {
        self.status
    }

    fn next_status(&self, action: LifecycleAction) -> Option<TransferStatus> {
        match action {
            LifecycleAction::Start => Some(TransferStatus::InTransit),
            LifecycleAction::Complete => Some(TransferStatus::Completed),
            LifecycleAction::Cancel => Some(TransferStatus::Cancelled),
            _ => None,
        }
    }

    fn set_status(&mut self, status: TransferStatus) {
        self.status = status;
    }

    fn can_edit(&self) -> bool {
        self.status == TransferStatus::Draft
    }

    fn can_start(&self) -> bool {
        self.status == TransferStatus::Draft && self.total_quantity() > 0
    }

    fn can_complete(&self) -> bool {
        self.status == TransferStatus::InTransit && self.total_quantity() > 0
    }

    fn can_cancel(&self) -> bool {
        matches!(self.status, TransferStatus::Draft | TransferStatus::InTransit)
    }

    fn can_duplicate(&self) -> bool {
        !self.lines.is_empty()
    }

    fn can_delete(&self) -> bool {
        self.status == TransferStatus::Draft
    }
}
