//! Commands for gated entities (transfers, inventory counts, count sheets).
//!
//! These entities are not event-sourced; the console holds each one behind a
//! shared lock. The discipline matches the order path: check the guard,
//! await upstream with the lock released, then re-check and mutate under the
//! lock so a concurrent action cannot be applied twice.

use crate::commands::call_upstream;
use crate::config::LedgerConfig;
use crate::error::{CommandError, UpstreamError};
use crate::metrics::{self, OUTCOME_OK};
use mise_core::lifecycle::{Lifecycle, LifecycleAction};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Command handler for anything implementing [`Lifecycle`].
#[derive(Debug, Clone, Copy)]
pub struct EntityCommands {
    timeout: Duration,
}

impl EntityCommands {
    /// Creates the handler with the configured upstream timeout.
    #[must_use]
    pub const fn new(config: &LedgerConfig) -> Self {
        Self {
            timeout: config.upstream_timeout(),
        }
    }

    /// Performs `action` on `entity` once the call made by `upstream` has
    /// been accepted. `upstream` is only invoked if the guard passes.
    ///
    /// Returns the entity's status after the action.
    ///
    /// # Errors
    ///
    /// - [`CommandError::IllegalTransition`] if the guard forbids the action
    ///   before the upstream call or after it returns
    /// - [`CommandError::Upstream`] / [`CommandError::Timeout`] if the
    ///   upstream call fails; the entity is left untouched
    pub async fn execute<E, U, F>(
        &self,
        entity: &Mutex<E>,
        action: LifecycleAction,
        upstream: U,
    ) -> Result<E::Status, CommandError>
    where
        E: Lifecycle,
        U: FnOnce() -> F,
        F: Future<Output = Result<(), UpstreamError>>,
    {
        let command = format!("{}.{action}", E::ENTITY);
        let result = self.check_call_apply(entity, action, &command, upstream).await;
        let outcome = result
            .as_ref()
            .map_or_else(CommandError::outcome, |_| OUTCOME_OK);
        metrics::record_command(command, outcome);
        result
    }

    async fn check_call_apply<E, U, F>(
        &self,
        entity: &Mutex<E>,
        action: LifecycleAction,
        command: &str,
        upstream: U,
    ) -> Result<E::Status, CommandError>
    where
        E: Lifecycle,
        U: FnOnce() -> F,
        F: Future<Output = Result<(), UpstreamError>>,
    {
        let checked = entity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ensure(action);
        if let Err(err) = checked {
            tracing::warn!(command, error = %err, "Command refused by guard");
            return Err(err.into());
        }

        call_upstream(self.timeout, command, upstream()).await?;

        let mut current = entity.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = current.apply(action) {
            tracing::info!(
                command,
                error = %err,
                "Guard no longer holds after upstream call, entity unchanged"
            );
            return Err(err.into());
        }
        Ok(current.status())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mise_core::lifecycle::{
        CountSheet, CountSheetStatus, CountStatus, Transfer, TransferLine, TransferStatus,
    };

    fn commands() -> EntityCommands {
        EntityCommands::new(&LedgerConfig::default().with_upstream_timeout(Duration::from_millis(50)))
    }

    fn transfer() -> Mutex<Transfer> {
        let mut transfer = Transfer::draft("TR-1", "main", "patio");
        transfer.lines.push(TransferLine {
            item_id: "lemons".into(),
            quantity: 12,
        });
        Mutex::new(transfer)
    }

    #[tokio::test]
    async fn ships_then_receives_after_upstream_accepts() {
        let entity = transfer();
        let commands = commands();
        let shipped = commands
            .execute(&entity, LifecycleAction::Start, || async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(shipped, TransferStatus::InTransit);

        let status = commands
            .execute(&entity, LifecycleAction::Complete, || async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(status, TransferStatus::Completed);
        assert_eq!(entity.lock().unwrap().status, TransferStatus::Completed);
    }

    #[tokio::test]
    async fn refused_action_never_calls_upstream() {
        let entity = Mutex::new(Transfer::draft("TR-2", "main", "patio"));
        let called = std::sync::atomic::AtomicBool::new(false);
        let err = commands()
            .execute(&entity, LifecycleAction::Complete, || {
                called.store(true, std::sync::atomic::Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::IllegalTransition(_)));
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn upstream_failure_leaves_entity_untouched() {
        let entity = transfer();
        let err = commands()
            .execute(&entity, LifecycleAction::Cancel, || async {
                Err(UpstreamError::Rejected("locked".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Upstream(_)));
        assert_eq!(entity.lock().unwrap().status, TransferStatus::Draft);
    }

    #[tokio::test]
    async fn concurrent_change_is_caught_on_recheck() {
        let entity = transfer();
        let shared = &entity;
        let err = commands()
            .execute(shared, LifecycleAction::Start, move || async move {
                shared.lock().unwrap().status = TransferStatus::Cancelled;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::IllegalTransition(_)));
        assert_eq!(entity.lock().unwrap().status, TransferStatus::Cancelled);
    }

    #[tokio::test]
    async fn archive_and_restore_count_sheet() {
        let sheet = Mutex::new(CountSheet::new("CS-1", "Bar", "main", vec!["gin".into()]));
        let commands = commands();
        let archived = commands
            .execute(&sheet, LifecycleAction::Archive, || async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(archived, CountSheetStatus::Archived);
        let restored = commands
            .execute(&sheet, LifecycleAction::Unarchive, || async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(restored, CountSheetStatus::Active);
    }

    #[tokio::test]
    async fn count_from_sheet_opens_and_closes() {
        let sheet = CountSheet::new("CS-3", "Bar", "bar", vec!["gin".into(), "rum".into()]);
        let count = Mutex::new(sheet.start_count("C-4").unwrap());
        let commands = commands();

        let opened = commands
            .execute(&count, LifecycleAction::Start, || async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(opened, CountStatus::Open);

        for item in &sheet.items {
            count.lock().unwrap().record(item, 2).unwrap();
        }
        let closed = commands
            .execute(&count, LifecycleAction::Complete, || async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(closed, CountStatus::Closed);
    }
}
