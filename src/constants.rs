/// Expected database schema version
/// A database recorded with any other version is wiped and recreated empty
pub const EXPECTED_DB_VERSION: &str = "1";

/// Metadata key holding the schema version
pub const VERSION_KEY: &str = "version";

/// Database file used when neither the config nor the command line names one
pub const DEFAULT_DB_FILE: &str = "pill_alarm.sqlite";

/// How long the list state keeps its store subscription alive after the last
/// observer goes away (milliseconds)
pub const DEFAULT_SUBSCRIPTION_GRACE_MS: u64 = 5000;
