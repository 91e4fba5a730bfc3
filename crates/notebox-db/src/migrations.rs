use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            email       TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS notes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            is_deleted  INTEGER NOT NULL DEFAULT 0,
            deleted_at  TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notes_owner
            ON notes(owner_id, is_deleted, updated_at);

        -- Owner reference is fixed at insert time
        CREATE TRIGGER IF NOT EXISTS notes_owner_immutable
            BEFORE UPDATE OF owner_id ON notes
            WHEN NEW.owner_id IS NOT OLD.owner_id
        BEGIN
            SELECT RAISE(ABORT, 'note owner cannot change');
        END;
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
    }

    #[test]
    fn owner_reference_cannot_be_rewritten() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        conn.execute_batch(
            "
            INSERT INTO users (id, username, password, email) VALUES ('u1', 'alice', 'x', 'a@x');
            INSERT INTO users (id, username, password, email) VALUES ('u2', 'bob', 'x', 'b@x');
            INSERT INTO notes (owner_id, title, content, updated_at) VALUES ('u1', 't', 'c', '2024-01-01');
            ",
        )
        .unwrap();

        let result = conn.execute("UPDATE notes SET owner_id = 'u2' WHERE id = 1", []);
        assert!(result.is_err());
    }
}
