//! Ordered schema scripts for the taskmatch database.
//!
//! Each script runs once, in version order, inside the single transaction
//! that also bumps `PRAGMA user_version`. Versions are never renumbered.

use crate::db::{schema_version, DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// (version, script) pairs in application order.
const SCRIPTS: &[(u32, &str)] = &[
    (1, include_str!("0001_init.sql")),
    (2, include_str!("0002_work_items.sql")),
    (3, include_str!("0003_assignment_logs.sql")),
];

/// Highest schema version this build can produce.
pub fn latest_version() -> u32 {
    SCRIPTS.last().map_or(0, |(version, _)| *version)
}

/// Brings `conn` up to [`latest_version`].
///
/// A database stamped with a newer version is rejected untouched.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let to = latest_version();

    if from > to {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: to,
        });
    }
    if from == to {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for &(version, script) in SCRIPTS.iter().filter(|(version, _)| *version > from) {
        tx.execute_batch(script)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DbError::Migration { version, source })?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={to}");
    Ok(())
}
