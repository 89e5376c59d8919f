//! Inventory counts.

use super::{IllegalTransition, Lifecycle, LifecycleAction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Count status as persisted by the remote API.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    /// Prepared, counting not started
    Draft,
    /// Counting in progress
    Open,
    /// Finished and posted
    Closed,
    /// Abandoned
    Cancelled,
}

impl fmt::Display for CountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// One item on a count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountItem {
    /// Inventory item being counted
    pub item_id: String,
    /// Units found on the shelf, once counted
    pub counted: Option<u32>,
}

impl CountItem {
    /// An item not counted yet.
    #[must_use]
    pub fn uncounted(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            counted: None,
        }
    }
}

/// A physical stock count at one location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCount {
    /// Count identifier
    pub id: String,
    /// Location being counted
    pub location: String,
    /// Current status
    pub status: CountStatus,
    /// Items on the count
    pub items: Vec<CountItem>,
}

impl InventoryCount {
    /// Number of items that have a counted quantity.
    #[must_use]
    pub fn counted_items(&self) -> usize {
        self.items.iter().filter(|item| item.counted.is_some()).count()
    }

    /// Whether every item has been counted (false for an empty count).
    #[must_use]
    pub fn is_fully_counted(&self) -> bool {
        !self.items.is_empty() && self.counted_items() == self.items.len()
    }

    /// Records the shelf quantity of `item_id`. Items not on the count are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] if the count can no longer be edited.
    pub fn record(&mut self, item_id: &str, quantity: u32) -> Result<(), IllegalTransition> {
        self.ensure(LifecycleAction::Edit)?;
        if let Some(item) = self.items.iter_mut().find(|item| item.item_id == item_id) {
            item.counted = Some(quantity);
        }
        Ok(())
    }
}

impl Lifecycle for InventoryCount {
    type Status = CountStatus;

    const ENTITY: &'static str = "count";

    fn status(&self) -> CountStatus {
        self.status
    }

    fn next_status(&self, action: LifecycleAction) -> Option<CountStatus> {
        match action {
            LifecycleAction::Start => Some(CountStatus::Open),
            LifecycleAction::Complete => Some(CountStatus::Closed),
            LifecycleAction::Cancel => Some(CountStatus::Cancelled),
            _ => None,
        }
    }

    fn set_status(&mut self, status: CountStatus) {
        self.status = status;
    }

    fn can_edit(&self) -> bool {
        matches!(self.status, CountStatus::Draft | CountStatus::Open)
    }

    fn can_start(&self) -> bool {
        self.status == CountStatus::Draft && !self.items.is_empty()
    }

    fn can_complete(&self) -> bool {
        self.status == CountStatus::Open && self.is_fully_counted()
    }

    fn can_cancel(&self) -> bool {
        matches!(self.status, CountStatus::Draft | CountStatus::Open)
    }

    fn can_duplicate(&self) -> bool {
        !self.items.is_empty()
    }

    fn can_delete(&self) -> bool {
        self.status == CountStatus::Draft
    }
}
