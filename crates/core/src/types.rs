/// Primary keys of the Postgres user tables (BIGSERIAL).
pub type DbId = i64;

/// Every instant the auth subsystem stores or compares is UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
