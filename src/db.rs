use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("fields.sqlite3");
    let conn = Connection::open(db_path)?;
    bootstrap(&conn)?;
    Ok(conn)
}

/// Create the entity tables, the per-entity metadata tables and the sequence
/// table. Idempotent so reopening an existing workspace is safe.
pub fn bootstrap(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    // Entity tables. Custom field values land in dynamically added
    // CUSTOM_<ID> columns on these.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS STUDENTS(
            STUDENT_ID INTEGER PRIMARY KEY,
            LAST_NAME TEXT,
            FIRST_NAME TEXT,
            MIDDLE_NAME TEXT,
            USERNAME TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS STAFF(
            STAFF_ID INTEGER PRIMARY KEY,
            LAST_NAME TEXT,
            FIRST_NAME TEXT,
            PROFILE TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS SCHOOLS(
            ID INTEGER PRIMARY KEY,
            TITLE TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ADDRESS(
            ADDRESS_ID INTEGER PRIMARY KEY,
            HOUSE_NO TEXT,
            STREET TEXT,
            CITY TEXT
        )",
        [],
    )?;

    // Metadata tables: field definitions per entity.
    for table in [
        "CUSTOM_FIELDS",
        "STAFF_FIELDS",
        "SCHOOL_FIELDS",
        "ADDRESS_FIELDS",
    ] {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {}(
                    ID INTEGER PRIMARY KEY,
                    CATEGORY_ID INTEGER,
                    TITLE TEXT,
                    TYPE TEXT,
                    SELECT_OPTIONS TEXT,
                    DEFAULT_SELECTION TEXT,
                    REQUIRED INTEGER NOT NULL DEFAULT 0,
                    SORT_ORDER INTEGER,
                    UPDATED_AT TEXT
                )",
                table
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_category ON {}(CATEGORY_ID)",
                table.to_ascii_lowercase(),
                table
            ),
            [],
        )?;
    }

    // Metadata tables: field categories per entity. Schools have no
    // categories.
    for table in [
        "STUDENT_FIELD_CATEGORIES",
        "STAFF_FIELD_CATEGORIES",
        "ADDRESS_FIELD_CATEGORIES",
    ] {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {}(
                    ID INTEGER PRIMARY KEY,
                    TITLE TEXT,
                    SORT_ORDER INTEGER,
                    UPDATED_AT TEXT
                )",
                table
            ),
            [],
        )?;
    }

    for table in [
        "CUSTOM_FIELDS",
        "STAFF_FIELDS",
        "SCHOOL_FIELDS",
        "ADDRESS_FIELDS",
        "STUDENT_FIELD_CATEGORIES",
        "STAFF_FIELD_CATEGORIES",
        "ADDRESS_FIELD_CATEGORIES",
    ] {
        ensure_updated_at(conn, table)?;
    }

    // The original schema ran on a server RDBMS with native sequences; here
    // each sequence is one row bumped atomically on allocation.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sequences(
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        )",
        [],
    )?;

    seed_protected_categories(conn)?;

    Ok(())
}

/// The first 4 student categories and the first 2 staff categories ship with
/// the application and cannot be deleted from the UI.
fn seed_protected_categories(conn: &Connection) -> anyhow::Result<()> {
    let student = [
        (1, "Demographic", 1),
        (2, "Addresses & Contacts", 2),
        (3, "Medical", 3),
        (4, "Comments", 4),
    ];
    for (id, title, sort_order) in student {
        conn.execute(
            "INSERT OR IGNORE INTO STUDENT_FIELD_CATEGORIES(ID, TITLE, SORT_ORDER)
             VALUES(?1, ?2, ?3)",
            (id, title, sort_order),
        )?;
    }

    let staff = [(1, "Demographic", 1), (2, "Schedule", 2)];
    for (id, title, sort_order) in staff {
        conn.execute(
            "INSERT OR IGNORE INTO STAFF_FIELD_CATEGORIES(ID, TITLE, SORT_ORDER)
             VALUES(?1, ?2, ?3)",
            (id, title, sort_order),
        )?;
    }

    // Keep the category sequences above the seeded rows.
    conn.execute(
        "INSERT OR IGNORE INTO sequences(name, value) VALUES('student_field_categories_seq', 4)",
        [],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO sequences(name, value) VALUES('staff_field_categories_seq', 2)",
        [],
    )?;

    Ok(())
}

/// Allocate the next value of a named sequence. Values are monotonic and
/// never reused; an unknown sequence starts at 1.
pub fn next_seq_value(conn: &Connection, sequence: &str) -> anyhow::Result<i64> {
    let value = conn.query_row(
        "INSERT INTO sequences(name, value) VALUES(?1, 1)
         ON CONFLICT(name) DO UPDATE SET value = value + 1
         RETURNING value",
        [sequence],
        |row| row.get(0),
    )?;
    Ok(value)
}

/// Early workspaces predate save-stamping and miss UPDATED_AT on the
/// metadata tables. Backfill the column on open.
fn ensure_updated_at(conn: &Connection, table: &str) -> anyhow::Result<()> {
    if table_has_column(conn, table, "UPDATED_AT")? {
        return Ok(());
    }
    conn.execute(
        &format!("ALTER TABLE {} ADD COLUMN UPDATED_AT TEXT", table),
        [],
    )?;
    Ok(())
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
