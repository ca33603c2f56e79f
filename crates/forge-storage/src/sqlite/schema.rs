//! DDL statements for the SQLite-backed persistence layer (spec.md §6).
//!
//! Timestamps are stored as TEXT in RFC 3339 format (SQLite has no native
//! datetime type). Booleans are stored as INTEGER (0/1).

/// Current schema version. Bumped whenever DDL changes.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Work items -----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS work_items (
        id                      TEXT PRIMARY KEY,
        parent_id               TEXT,
        title                   TEXT NOT NULL,
        description             TEXT,
        summary                 TEXT NOT NULL DEFAULT '',
        role                    TEXT NOT NULL DEFAULT 'queue',
        previous_role           TEXT,
        status_label            TEXT,
        priority                TEXT NOT NULL DEFAULT 'medium',
        complexity              INTEGER,
        requires_verification   INTEGER NOT NULL DEFAULT 0,
        depth                   INTEGER NOT NULL DEFAULT 0,
        metadata                TEXT,
        tags                    TEXT NOT NULL DEFAULT '',
        created_at              TEXT NOT NULL,
        modified_at             TEXT NOT NULL,
        role_changed_at         TEXT NOT NULL,
        version                 INTEGER NOT NULL DEFAULT 1,
        FOREIGN KEY (parent_id) REFERENCES work_items(id) ON DELETE SET NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_work_items_parent ON work_items(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_work_items_role ON work_items(role)",
    "CREATE INDEX IF NOT EXISTS idx_work_items_depth ON work_items(depth)",
    "CREATE INDEX IF NOT EXISTS idx_work_items_created_at ON work_items(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_work_items_modified_at ON work_items(modified_at)",
    "CREATE INDEX IF NOT EXISTS idx_work_items_role_changed_at ON work_items(role_changed_at)",
    "CREATE INDEX IF NOT EXISTS idx_work_items_priority ON work_items(priority)",
    // -- Dependencies -----------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS dependencies (
        id            TEXT PRIMARY KEY,
        from_item_id  TEXT NOT NULL,
        to_item_id    TEXT NOT NULL,
        type          TEXT NOT NULL,
        unblock_at    TEXT,
        created_at    TEXT NOT NULL,
        FOREIGN KEY (from_item_id) REFERENCES work_items(id) ON DELETE CASCADE,
        FOREIGN KEY (to_item_id) REFERENCES work_items(id) ON DELETE CASCADE,
        UNIQUE (from_item_id, to_item_id, type)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_dependencies_from ON dependencies(from_item_id)",
    "CREATE INDEX IF NOT EXISTS idx_dependencies_to ON dependencies(to_item_id)",
    // -- Notes --------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS notes (
        id           TEXT PRIMARY KEY,
        item_id      TEXT NOT NULL,
        key          TEXT NOT NULL,
        role         TEXT NOT NULL,
        body         TEXT NOT NULL DEFAULT '',
        created_at   TEXT NOT NULL,
        modified_at  TEXT NOT NULL,
        FOREIGN KEY (item_id) REFERENCES work_items(id) ON DELETE CASCADE,
        UNIQUE (item_id, key)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_notes_item ON notes(item_id)",
    // -- Role transitions (audit log) ----------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS role_transitions (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id       TEXT NOT NULL,
        from_role     TEXT NOT NULL,
        to_role       TEXT NOT NULL,
        trigger       TEXT NOT NULL,
        summary       TEXT,
        status_label  TEXT,
        occurred_at   TEXT NOT NULL,
        FOREIGN KEY (item_id) REFERENCES work_items(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_role_transitions_item ON role_transitions(item_id)",
    "CREATE INDEX IF NOT EXISTS idx_role_transitions_occurred_at ON role_transitions(occurred_at)",
    // -- Schema bookkeeping ---------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

/// Schema migrations applied after initial DDL, tracked in `metadata` under
/// `migration:<name>` so each runs at most once.
pub const MIGRATIONS: &[(&str, &str)] = &[
    // Future migrations go here, e.g.:
    // ("001_add_foo_column", "ALTER TABLE work_items ADD COLUMN foo TEXT DEFAULT ''"),
];
