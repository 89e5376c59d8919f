//! Count sheets: reusable templates that counts are started from.

use super::count::{CountItem, CountStatus, InventoryCount};
use super::{IllegalTransition, Lifecycle, LifecycleAction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Count sheet status.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSheetStatus {
    /// In use
    Active,
    /// Hidden from the active list
    Archived,
}

impl fmt::Display for CountSheetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Archived => f.write_str("archived"),
        }
    }
}

/// A named list of items to count at a location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSheet {
    /// Sheet identifier
    pub id: String,
    /// Display name ("Sunday close", "Bar weekly")
    pub name: String,
    /// Location the sheet is for
    pub location: String,
    /// Current status
    pub status: CountSheetStatus,
    /// Inventory items on the sheet, in shelf order
    pub items: Vec<String>,
}

impl CountSheet {
    /// Creates an active sheet.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
        items: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            status: CountSheetStatus::Active,
            items,
        }
    }

    /// Starts a draft count with every item on the sheet.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] if the sheet cannot be used.
    pub fn start_count(&self, count_id: impl Into<String>) -> Result<InventoryCount, IllegalTransition> {
        self.ensure(LifecycleAction::Use)?;
        Ok(InventoryCount {
            id: count_id.into(),
            location: self.location.clone(),
            status: CountStatus::Draft,
            items: self.items.iter().map(CountItem::uncounted).collect(),
        })
    }

    /// Copies the sheet into a new active sheet.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] if the sheet cannot be duplicated.
    pub fn duplicate(
        &self,
        new_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, IllegalTransition> {
        self.ensure(LifecycleAction::Duplicate)?;
        Ok(Self {
            id: new_id.into(),
            name: name.into(),
            status: CountSheetStatus::Active,
            ..self.clone()
        })
    }
}

impl Lifecycle for CountSheet {
    type Status = CountSheetStatus;

    const ENTITY: &'static str = "count sheet";

    fn status(&self) -> CountSheetStatus {
        self.status
    }

    fn next_status(&self, action: LifecycleAction) -> Option<CountSheetStatus> {
        match action {
            LifecycleAction::Archive => Some(CountSheetStatus::Archived),
            LifecycleAction::Unarchive => Some(CountSheetStatus::Active),
            _ => None,
        }
    }

    fn set_status(&mut self, status: CountSheetStatus) {
        self.status = status;
    }

    fn can_edit(&self) -> bool {
        self.status == CountSheetStatus::Active
    }

    fn can_archive(&self) -> bool {
        self.status == CountSheetStatus::Active
    }

    fn can_unarchive(&self) -> bool {
        self.status == CountSheetStatus::Archived
    }

    fn can_use(&self) -> bool {
        self.status == CountSheetStatus::Active && !self.items.is_empty()
    }

    fn can_duplicate(&self) -> bool {
        !self.items.is_empty()
    }

    // Archive first, so an active sheet is never deleted out from under a count.
    fn can_delete(&self) -> bool {
        self.status == CountSheetStatus::Archived
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sheet(status: CountSheetStatus, items: &[&str]) -> CountSheet {
        CountSheet {
            id: "CS-1".into(),
            name: "Bar weekly".into(),
            location: "bar".into(),
            status,
            items: items.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn active_sheet_actions() {
        let active = sheet(CountSheetStatus::Active, &["gin", "tonic"]);
        assert_eq!(
            active.available_actions(),
            vec![
                LifecycleAction::Edit,
                LifecycleAction::Archive,
                LifecycleAction::Duplicate,
                LifecycleAction::Use,
            ]
        );
    }

    #[test]
    fn archived_sheet_actions() {
        let archived = sheet(CountSheetStatus::Archived, &["gin"]);
        assert_eq!(
            archived.available_actions(),
            vec![
                LifecycleAction::Duplicate,
                LifecycleAction::Delete,
                LifecycleAction::Unarchive,
            ]
        );
    }

    #[test]
    fn empty_sheet_cannot_be_used() {
        let empty = sheet(CountSheetStatus::Active, &[]);
        assert!(!empty.can_use());
        let err = empty.start_count("C-1").unwrap_err();
        assert_eq!(err.entity, "count sheet");
    }

    #[test]
    fn start_count_copies_items_uncounted() {
        let count = sheet(CountSheetStatus::Active, &["gin", "tonic"])
            .start_count("C-7")
            .unwrap();
        assert_eq!(count.status, CountStatus::Draft);
        assert_eq!(count.location, "bar");
        assert_eq!(count.items.len(), 2);
        assert_eq!(count.counted_items(), 0);
    }

    #[test]
    fn count_started_from_sheet_can_be_closed() {
        let sheet = CountSheet::new("CS-2", "Sunday close", "walk-in", vec!["milk".into(), "eggs".into()]);
        let mut count = sheet.start_count("C-1").unwrap();
        assert!(count.allows(LifecycleAction::Start));

        count.apply(LifecycleAction::Start).unwrap();
        for item in &sheet.items {
            count.record(item, 3).unwrap();
        }
        assert!(count.available_actions().contains(&LifecycleAction::Complete));

        count.apply(LifecycleAction::Complete).unwrap();
        assert_eq!(count.status, CountStatus::Closed);
    }

    #[test]
    fn archive_round_trip() {
        let mut s = sheet(CountSheetStatus::Active, &["gin"]);
        s.apply(LifecycleAction::Archive).unwrap();
        assert_eq!(s.status, CountSheetStatus::Archived);
        assert!(s.apply(LifecycleAction::Archive).is_err());
        s.apply(LifecycleAction::Unarchive).unwrap();
        assert_eq!(s.status, CountSheetStatus::Active);
    }

    #[test]
    fn duplicate_of_archived_sheet_is_active() {
        let copy = sheet(CountSheetStatus::Archived, &["gin"])
            .duplicate("CS-2", "Bar weekly (copy)")
            .unwrap();
        assert_eq!(copy.status, CountSheetStatus::Active);
        assert_eq!(copy.name, "Bar weekly (copy)");
    }
}
