//! Infrastructure layer - database, schema and sessions.

mod db;
pub mod migrations;
pub mod session;

pub use db::Database;
pub use migrations::Migrator;
pub use session::{safe_commit, CallContext, Session, SessionLease, SessionProvider, Transactional};

#[cfg(any(test, feature = "test-utils"))]
pub use session::MockTransactional;
