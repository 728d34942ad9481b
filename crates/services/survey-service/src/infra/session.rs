//! Per-call database sessions.
//!
//! A [`Session`] is the unit of work for one call: it begins a transaction
//! on first use and ends it with [`safe_commit`] or by being closed. The
//! adapter owns a [`CallContext`] per call and hands it to the service, which
//! asks the [`SessionProvider`] for a [`SessionLease`]:
//!
//! - context already carries a session: it is reused and left attached;
//! - context is empty: a session is opened for the lease, which holds the
//!   context exclusively, and closed again when the lease is dropped,
//!   whichever way the operation exits.
//!
//! [`SessionLease::finish`] rolls back pending work when an operation fails,
//! whether or not the lease owns the session.

use std::marker::PhantomData;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

use common::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Commit/rollback seam used by [`safe_commit`].
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait Transactional: Send {
    /// Commit pending work.
    async fn commit(&mut self) -> Result<(), DbErr>;

    /// Discard pending work.
    async fn rollback(&mut self) -> Result<(), DbErr>;
}

/// Commit, and on failure roll back and report a server-side persistence error.
///
/// A failing rollback is logged and never replaces the commit error.
pub async fn safe_commit<T>(unit: &mut T) -> AppResult<()>
where
    T: Transactional + ?Sized,
{
    let Err(err) = unit.commit().await else {
        return Ok(());
    };

    if let Err(rollback_err) = unit.rollback().await {
        tracing::error!(error = %rollback_err, "Rollback after failed commit also failed");
    }
    tracing::error!(error = %err, "Database commit failed");

    Err(AppError::persistence(err.to_string()))
}

/// Unit of work against the store, scoped to one call.
pub struct Session {
    db: DatabaseConnection,
    txn: Option<DatabaseTransaction>,
}

impl Session {
    fn new(db: DatabaseConnection) -> Self {
        Self { db, txn: None }
    }

    /// Current transaction, begun on first use.
    pub async fn txn(&mut self) -> AppResult<&DatabaseTransaction> {
        let txn = match self.txn.take() {
            Some(txn) => txn,
            None => {
                tracing::trace!("Beginning session transaction");
                self.db.begin().await.map_err(AppError::from)?
            }
        };
        Ok(&*self.txn.insert(txn))
    }

    /// Whether uncommitted work is pending.
    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    /// End the session, discarding anything not committed.
    pub fn close(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        if self.txn.take().is_some() {
            // Dropping the transaction rolls it back
            tracing::trace!("Closing session with uncommitted work");
        }
    }
}

#[async_trait]
impl Transactional for Session {
    async fn commit(&mut self) -> Result<(), DbErr> {
        match self.txn.take() {
            Some(txn) => txn.commit().await,
            None => Ok(()),
        }
    }

    /// A transaction whose commit failed was consumed by the attempt and
    /// already rolled back by the driver; there is nothing left to undo.
    async fn rollback(&mut self) -> Result<(), DbErr> {
        match self.txn.take() {
            Some(txn) => txn.rollback().await,
            None => Ok(()),
        }
    }
}

/// Per-call holder for an optional session.
#[derive(Default)]
pub struct CallContext {
    session: Option<Session>,
}

impl CallContext {
    /// Empty context; the first operation opens and owns a session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying a caller-managed session that operations must reuse.
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Whether a session is attached.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Detach the session, handing it back to the caller.
    pub fn take_session(&mut self) -> Option<Session> {
        self.session.take()
    }
}

/// Hands out sessions for call contexts.
#[derive(Clone)]
pub struct SessionProvider {
    db: DatabaseConnection,
}

impl SessionProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open a fresh session not tied to any context.
    pub fn open(&self) -> Session {
        Session::new(self.db.clone())
    }

    /// Reuse the context's session, or open one owned by the lease.
    ///
    /// The lease borrows the context exclusively, so a context never hands
    /// out a second session while an operation holds one.
    pub fn acquire<'c>(&self, ctx: &'c mut CallContext) -> SessionLease<'c> {
        match ctx.session.as_mut() {
            Some(session) => SessionLease::Reused(session),
            None => SessionLease::Owned(self.open(), PhantomData),
        }
    }
}

/// A context's session for the length of one operation.
pub enum SessionLease<'c> {
    /// The caller's session; it stays attached after the operation.
    Reused(&'c mut Session),
    /// Opened for this operation and closed when the lease is dropped.
    Owned(Session, PhantomData<&'c mut CallContext>),
}

impl SessionLease<'_> {
    /// Whether dropping this lease closes the session.
    pub fn owns_session(&self) -> bool {
        matches!(self, SessionLease::Owned(..))
    }

    pub fn session(&mut self) -> &mut Session {
        match self {
            SessionLease::Reused(session) => &mut **session,
            SessionLease::Owned(session, _) => session,
        }
    }

    /// Hand back the operation's result, discarding pending work on failure.
    ///
    /// A reused session is rolled back too, so a failed operation never
    /// leaves half its writes for the caller's next commit.
    pub async fn finish<T>(&mut self, result: AppResult<T>) -> AppResult<T> {
        if result.is_err() {
            if let Err(e) = self.session().rollback().await {
                tracing::error!(error = %e, "Rollback after failed operation also failed");
            }
        }
        result
    }
}

impl Drop for SessionLease<'_> {
    fn drop(&mut self) {
        if let SessionLease::Owned(session, _) = self {
            session.discard();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;
    use sea_orm::ConnectOptions;

    async fn provider() -> SessionProvider {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let db = sea_orm::Database::connect(options).await.unwrap();
        SessionProvider::new(db)
    }

    #[tokio::test]
    async fn empty_context_gets_an_owned_session() {
        let provider = provider().await;
        let mut ctx = CallContext::new();

        {
            let lease = provider.acquire(&mut ctx);
            assert!(lease.owns_session());
        }

        assert!(!ctx.has_session());
    }

    #[tokio::test]
    async fn attached_session_is_reused_and_kept() {
        let provider = provider().await;
        let mut ctx = CallContext::with_session(provider.open());

        {
            let lease = provider.acquire(&mut ctx);
            assert!(!lease.owns_session());
        }

        assert!(ctx.has_session());
    }

    #[tokio::test]
    async fn owned_session_is_released_on_early_exit() {
        async fn failing_operation(
            provider: &SessionProvider,
            ctx: &mut CallContext,
        ) -> AppResult<()> {
            let mut lease = provider.acquire(ctx);
            lease.session().txn().await?;
            Err(AppError::validation("'title' is required to create a survey"))
        }

        let provider = provider().await;
        let mut ctx = CallContext::new();

        assert!(failing_operation(&provider, &mut ctx).await.is_err());
        assert!(!ctx.has_session());

        // The single connection went back to the pool
        let mut session = provider.open();
        assert!(session.txn().await.is_ok());
    }

    #[tokio::test]
    async fn failed_operation_rolls_back_a_reused_session() {
        let provider = provider().await;
        let mut ctx = CallContext::with_session(provider.open());

        {
            let mut lease = provider.acquire(&mut ctx);
            lease.session().txn().await.unwrap();
            assert!(lease.session().in_transaction());

            let result: AppResult<()> = lease
                .finish(Err(AppError::not_found("User not found with id: 3")))
                .await;
            assert!(result.is_err());
            assert!(!lease.session().in_transaction());
        }

        assert!(ctx.has_session());
    }

    #[tokio::test]
    async fn successful_operation_keeps_pending_work() {
        let provider = provider().await;
        let mut ctx = CallContext::with_session(provider.open());

        let mut lease = provider.acquire(&mut ctx);
        lease.session().txn().await.unwrap();

        assert_eq!(lease.finish(Ok(7)).await.unwrap(), 7);
        assert!(lease.session().in_transaction());
    }

    #[tokio::test]
    async fn safe_commit_passes_through_success() {
        let mut unit = MockTransactional::new();
        unit.expect_commit().times(1).returning(|| Ok(()));
        unit.expect_rollback().never();

        assert!(safe_commit(&mut unit).await.is_ok());
    }

    #[tokio::test]
    async fn failed_commit_rolls_back_and_reports_persistence_error() {
        let mut seq = Sequence::new();
        let mut unit = MockTransactional::new();
        unit.expect_commit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(DbErr::Custom("database is locked".to_string())));
        unit.expect_rollback()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        let err = safe_commit(&mut unit).await.unwrap_err();

        assert!(matches!(err, AppError::Persistence(_)));
        assert!(err.to_string().contains("database is locked"));
    }

    #[tokio::test]
    async fn rollback_failure_does_not_mask_commit_error() {
        let mut unit = MockTransactional::new();
        unit.expect_commit()
            .returning(|| Err(DbErr::Custom("constraint failed".to_string())));
        unit.expect_rollback()
            .times(1)
            .returning(|| Err(DbErr::Custom("connection reset".to_string())));

        let err = safe_commit(&mut unit).await.unwrap_err();

        assert!(err.to_string().contains("constraint failed"));
        assert!(!err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn committing_an_idle_session_is_a_no_op() {
        let mut session = provider().await.open();

        assert!(!session.in_transaction());
        assert!(safe_commit(&mut session).await.is_ok());
    }
}
