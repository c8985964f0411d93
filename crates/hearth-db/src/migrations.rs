use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            name                TEXT PRIMARY KEY,
            is_admin            INTEGER NOT NULL DEFAULT 0,
            has_approved_rules  INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS rules (
            id              TEXT PRIMARY KEY,
            title           TEXT NOT NULL,
            content         TEXT NOT NULL,
            display_order   INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_rules_order
            ON rules(display_order);

        CREATE TABLE IF NOT EXISTS approvals (
            user_name   TEXT PRIMARY KEY,
            approved_at TEXT NOT NULL,
            timestamp   INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            sender_name TEXT NOT NULL,
            content     TEXT NOT NULL,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL,
            timestamp   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_timestamp
            ON messages(timestamp);

        -- Single-row counters; reset_generation invalidates sessions
        CREATE TABLE IF NOT EXISTS meta (
            key     TEXT PRIMARY KEY,
            value   INTEGER NOT NULL
        );

        INSERT OR IGNORE INTO meta (key, value)
            VALUES ('reset_generation', 0);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
