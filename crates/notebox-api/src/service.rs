use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use notebox_db::Database;
use notebox_db::models::{NoteRow, UserRow};
use notebox_db::queries;
use notebox_types::api::NoteView;

use crate::error::NoteError;

/// Owner-only access to notes.
///
/// Every operation takes the caller's identity explicitly and runs as one
/// transaction: resolve the identity, load the live note, check ownership,
/// then read or write. Soft-deleted notes never reach this layer.
#[derive(Clone)]
pub struct NoteService {
    db: Arc<Database>,
}

impl NoteService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn list(&self, identity: &str) -> Result<Vec<NoteView>, NoteError> {
        self.db.with_tx(|tx| {
            let user = resolve_identity(tx, identity)?;
            let rows = queries::list_live_notes_by_owner(tx, &user.id)?;
            Ok(rows.into_iter().map(to_view).collect())
        })
    }

    pub fn get(&self, identity: &str, note_id: i64) -> Result<NoteView, NoteError> {
        self.db.with_tx(|tx| {
            let user = resolve_identity(tx, identity)?;
            let note = authorize(tx, &user, note_id)?;
            Ok(to_view(note))
        })
    }

    pub fn create(&self, identity: &str, title: &str, content: &str) -> Result<NoteView, NoteError> {
        self.db.with_tx(|tx| {
            let user = resolve_identity(tx, identity)?;
            let note = queries::insert_note(tx, &user.id, title, content, Utc::now())?;
            info!("Note {} created by {}", note.id, user.username);
            Ok(to_view(note))
        })
    }

    pub fn update(
        &self,
        identity: &str,
        note_id: i64,
        title: &str,
        content: &str,
    ) -> Result<NoteView, NoteError> {
        self.db.with_tx(|tx| {
            let user = resolve_identity(tx, identity)?;
            let mut note = authorize(tx, &user, note_id)?;

            let now = Utc::now();
            if !queries::update_note_content(tx, note.id, title, content, now)? {
                return Err(NoteError::NotFound(note_id));
            }

            note.title = title.to_string();
            note.content = content.to_string();
            note.updated_at = now;
            info!("Note {} updated by {}", note.id, user.username);
            Ok(to_view(note))
        })
    }

    pub fn delete(&self, identity: &str, note_id: i64) -> Result<(), NoteError> {
        self.db.with_tx(|tx| {
            let user = resolve_identity(tx, identity)?;
            let note = authorize(tx, &user, note_id)?;

            if !queries::mark_note_deleted(tx, note.id, Utc::now())? {
                return Err(NoteError::NotFound(note_id));
            }

            info!("Note {} soft-deleted by {}", note.id, user.username);
            Ok(())
        })
    }
}

fn resolve_identity(conn: &Connection, identity: &str) -> Result<UserRow, NoteError> {
    queries::find_user_by_username(conn, identity)?.ok_or_else(|| {
        warn!("Authenticated identity '{}' has no user record", identity);
        NoteError::IdentityNotFound(identity.to_string())
    })
}

/// The single lookup-then-ownership step shared by get, update and delete.
fn authorize(conn: &Connection, user: &UserRow, note_id: i64) -> Result<NoteRow, NoteError> {
    let note = queries::find_live_note(conn, note_id)?.ok_or(NoteError::NotFound(note_id))?;

    if note.owner_id != user.id {
        warn!("User {} denied access to note {}", user.username, note_id);
        return Err(NoteError::Forbidden(note_id));
    }

    Ok(note)
}

fn to_view(note: NoteRow) -> NoteView {
    NoteView {
        id: note.id,
        title: note.title,
        content: note.content,
        updated_at: note.updated_at,
    }
}
