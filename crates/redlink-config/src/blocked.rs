//! Blocked database lookups.
//!
//! A blocked database is a logical index that must never be selected, even
//! when runtime switching is allowed.

use crate::ConnectionSettings;

/// Returns true if `db` is in the blocked list.
///
/// Any value is accepted; negative or out-of-range indices are simply not
/// found.
pub fn is_database_blocked(settings: &ConnectionSettings, db: i64) -> bool {
    settings.blocked_dbs.contains(&db)
}

/// Returns the blocked database list in configuration order.
pub fn get_blocked_databases(settings: &ConnectionSettings) -> &[i64] {
    &settings.blocked_dbs
}

impl ConnectionSettings {
    /// See [`is_database_blocked`].
    pub fn is_database_blocked(&self, db: i64) -> bool {
        is_database_blocked(self, db)
    }

    /// See [`get_blocked_databases`].
    pub fn blocked_databases(&self) -> &[i64] {
        get_blocked_databases(self)
    }
}
