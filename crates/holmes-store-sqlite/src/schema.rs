//! SQL schema for the Holmes SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// Rows carry an integer surrogate key used only for joins; the UUID columns
/// are the identifiers that leave the store.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS pages (
    id               INTEGER PRIMARY KEY,
    uuid             TEXT NOT NULL UNIQUE,
    domain           TEXT NOT NULL,
    url              TEXT NOT NULL UNIQUE,
    created_at       TEXT NOT NULL,
    -- Non-owning pointer to the active review, kept in step with
    -- last_review_date inside the reconciling transaction.
    last_review_id   INTEGER REFERENCES reviews(id) ON DELETE SET NULL,
    last_review_date TEXT
);

CREATE TABLE IF NOT EXISTS reviews (
    id           INTEGER PRIMARY KEY,
    uuid         TEXT NOT NULL UNIQUE,
    page_id      INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
    domain       TEXT NOT NULL,
    is_active    INTEGER NOT NULL DEFAULT 0,
    is_complete  INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,   -- fixed-width RFC 3339 UTC
    completed_at TEXT,            -- NULL while open
    CHECK (is_complete = 1 OR completed_at IS NULL)
);

-- Ledgers are append-only; rows only disappear with their review.
CREATE TABLE IF NOT EXISTS facts (
    id         INTEGER PRIMARY KEY,
    review_id  INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
    key        TEXT NOT NULL,
    value_json TEXT NOT NULL,
    title      TEXT NOT NULL,
    unit       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS violations (
    id          INTEGER PRIMARY KEY,
    review_id   INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
    key         TEXT NOT NULL,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    points      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS workers (
    id                INTEGER PRIMARY KEY,
    uuid              TEXT NOT NULL UNIQUE,
    last_ping         TEXT NOT NULL,
    current_review_id INTEGER REFERENCES reviews(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS limiters (
    id    INTEGER PRIMARY KEY,
    uuid  TEXT NOT NULL UNIQUE,
    url   TEXT NOT NULL UNIQUE,
    value INTEGER NOT NULL
);

-- At most one active review per page, enforced by the engine as well.
CREATE UNIQUE INDEX IF NOT EXISTS reviews_one_active_idx
    ON reviews(page_id) WHERE is_active = 1;

CREATE INDEX IF NOT EXISTS reviews_page_created_idx ON reviews(page_id, created_at);
CREATE INDEX IF NOT EXISTS reviews_completed_idx    ON reviews(completed_at);
CREATE INDEX IF NOT EXISTS facts_review_idx         ON facts(review_id);
CREATE INDEX IF NOT EXISTS violations_review_idx    ON violations(review_id);

PRAGMA user_version = 1;
";
