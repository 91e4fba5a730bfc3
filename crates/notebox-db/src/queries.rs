use crate::models::{NoteRow, UserRow};
use crate::Database;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

// Every note lookup that serves a caller goes through `NOTE_COLUMNS ... AND
// is_deleted = 0`. The soft-delete filter lives in SQL, not in callers.
const NOTE_COLUMNS: &str =
    "SELECT id, owner_id, title, content, updated_at, is_deleted, deleted_at FROM notes";

impl Database {
    // -- Users --

    /// Returns false when the username is already taken.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        email: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| insert_user(conn, id, username, password_hash, email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| find_user_by_username(conn, username))
    }
}

// -- Users --

pub fn insert_user(
    conn: &Connection,
    id: &str,
    username: &str,
    password_hash: &str,
    email: &str,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO users (id, username, password, email) VALUES (?1, ?2, ?3, ?4)",
        (id, username, password_hash, email),
    );

    // The UNIQUE index on username is the arbiter between racing registrations
    match inserted {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password, email, created_at FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                email: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

// -- Notes --

/// Insert a live note and return it as stored.
pub fn insert_note(
    conn: &Connection,
    owner_id: &str,
    title: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<NoteRow> {
    conn.execute(
        "INSERT INTO notes (owner_id, title, content, updated_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![owner_id, title, content, now],
    )?;

    Ok(NoteRow {
        id: conn.last_insert_rowid(),
        owner_id: owner_id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        updated_at: now,
        is_deleted: false,
        deleted_at: None,
    })
}

/// Look up a note by id, treating soft-deleted rows as absent.
pub fn find_live_note(conn: &Connection, id: i64) -> Result<Option<NoteRow>> {
    let sql = format!("{NOTE_COLUMNS} WHERE id = ?1 AND is_deleted = 0");
    let row = conn.query_row(&sql, [id], map_note).optional()?;
    Ok(row)
}

/// All live notes of one owner, most recently touched first.
pub fn list_live_notes_by_owner(conn: &Connection, owner_id: &str) -> Result<Vec<NoteRow>> {
    let sql = format!(
        "{NOTE_COLUMNS} WHERE owner_id = ?1 AND is_deleted = 0 ORDER BY updated_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map([owner_id], map_note)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Overwrite title and content of a live note. Returns false if no live row
/// matched.
pub fn update_note_content(
    conn: &Connection,
    id: i64,
    title: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE notes SET title = ?2, content = ?3, updated_at = ?4
         WHERE id = ?1 AND is_deleted = 0",
        rusqlite::params![id, title, content, now],
    )?;
    Ok(changed == 1)
}

/// Flag a live note as deleted. Title, content and `updated_at` are left as
/// they were. Returns false if no live row matched.
pub fn mark_note_deleted(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE notes SET is_deleted = 1, deleted_at = ?2 WHERE id = ?1 AND is_deleted = 0",
        rusqlite::params![id, now],
    )?;
    Ok(changed == 1)
}

/// Unfiltered lookup, deleted rows included. For audit only; never reachable
/// from a request path.
pub fn find_note_for_audit(conn: &Connection, id: i64) -> Result<Option<NoteRow>> {
    let sql = format!("{NOTE_COLUMNS} WHERE id = ?1");
    let row = conn.query_row(&sql, [id], map_note).optional()?;
    Ok(row)
}

fn map_note(row: &Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        updated_at: row.get(4)?,
        is_deleted: row.get(5)?,
        deleted_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn db_with_users() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u-alice", "alice", "hash", "alice@example.com").unwrap();
        db.create_user("u-bob", "bob", "hash", "bob@example.com").unwrap();
        db
    }

    #[test]
    fn user_lookup_by_username() {
        let db = db_with_users();

        let alice = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(alice.id, "u-alice");
        assert_eq!(alice.email, "alice@example.com");

        assert!(db.get_user_by_username("carol").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = db_with_users();
        assert!(!db.create_user("u-other", "alice", "hash", "x@example.com").unwrap());

        // The original row is untouched
        let alice = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(alice.id, "u-alice");
        assert_eq!(alice.email, "alice@example.com");
    }

    #[test]
    fn other_user_constraints_still_fail_loudly() {
        let db = db_with_users();
        // Same primary key, fresh username: not a "username taken" case
        assert!(db.create_user("u-alice", "alice2", "hash", "a2@example.com").is_err());
    }

    #[test]
    fn note_ids_start_at_one() {
        let db = db_with_users();
        let note = db
            .with_conn(|conn| insert_note(conn, "u-alice", "T", "C", Utc::now()))
            .unwrap();
        assert_eq!(note.id, 1);
    }

    #[test]
    fn deleted_notes_are_invisible_but_kept() {
        let db = db_with_users();
        let now = Utc::now();

        db.with_conn(|conn| {
            let note = insert_note(conn, "u-alice", "T", "C", now)?;
            assert!(mark_note_deleted(conn, note.id, now)?);

            assert!(find_live_note(conn, note.id)?.is_none());
            assert!(list_live_notes_by_owner(conn, "u-alice")?.is_empty());
            assert!(!update_note_content(conn, note.id, "x", "y", now)?);
            assert!(!mark_note_deleted(conn, note.id, now)?);

            let kept = find_note_for_audit(conn, note.id)?.unwrap();
            assert!(kept.is_deleted);
            assert!(kept.deleted_at.is_some());
            assert_eq!(kept.title, "T");
            assert_eq!(kept.content, "C");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn list_orders_by_updated_at_desc_and_filters_owner() {
        let db = db_with_users();
        let base = Utc::now();

        db.with_conn(|conn| {
            let old = insert_note(conn, "u-alice", "old", "", base)?;
            let new = insert_note(conn, "u-alice", "new", "", base + Duration::seconds(1))?;
            insert_note(conn, "u-bob", "bob's", "", base + Duration::seconds(2))?;

            let listed = list_live_notes_by_owner(conn, "u-alice")?;
            let ids: Vec<i64> = listed.iter().map(|n| n.id).collect();
            assert_eq!(ids, vec![new.id, old.id]);

            // Touching the old note moves it to the front
            update_note_content(conn, old.id, "old", "edited", base + Duration::seconds(5))?;
            let listed = list_live_notes_by_owner(conn, "u-alice")?;
            assert_eq!(listed[0].id, old.id);
            assert_eq!(listed[0].content, "edited");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let db = db_with_users();

        let result: Result<()> = db.with_tx(|tx| {
            insert_note(tx, "u-alice", "T", "C", Utc::now())?;
            anyhow::bail!("abort");
        });
        assert!(result.is_err());

        let notes = db
            .with_conn(|conn| list_live_notes_by_owner(conn, "u-alice"))
            .unwrap();
        assert!(notes.is_empty());
    }

    #[test]
    fn ping_succeeds_on_open_database() {
        let db = Database::open_in_memory().unwrap();
        db.ping().unwrap();
    }
}
