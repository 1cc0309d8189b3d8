use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::{
    error::{AppError, DUPLICATE_TITLE, INVALID_NOTE_DATA},
    model::{NewNote, Note, NoteWithUser},
    repository::{NoteRepository, UserRepository},
};

pub const NO_NOTES_FOUND: &str = "No notes found";
pub const NOTE_NOT_FOUND: &str = "Note not found";

/// Notes use cases. Holds no per-request state; built once at startup.
#[derive(Clone)]
pub struct NotesService {
    notes: Arc<dyn NoteRepository>,
    users: Arc<dyn UserRepository>,
}

impl NotesService {
    pub fn new(notes: Arc<dyn NoteRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { notes, users }
    }

    /// Every note with its owner's username, in storage order.
    pub async fn list(&self) -> Result<Vec<NoteWithUser>, AppError> {
        let notes = self.notes.find_all().await?;
        if notes.is_empty() {
            return Err(AppError::NotFound(NO_NOTES_FOUND));
        }

        try_join_all(notes.into_iter().map(|note| self.with_username(note))).await
    }

    async fn with_username(&self, note: Note) -> Result<NoteWithUser, AppError> {
        let user = self.users.find_by_id(note.user).await?.ok_or_else(|| {
            AppError::Internal(format!("owner {} of note {} not found", note.user, note.id))
        })?;

        Ok(NoteWithUser {
            note,
            username: user.username,
        })
    }

    pub async fn create(&self, note: NewNote) -> Result<Note, AppError> {
        if self.notes.find_by_title(&note.title).await?.is_some() {
            return Err(AppError::Conflict(DUPLICATE_TITLE));
        }

        let created = self
            .notes
            .create(note)
            .await?
            .ok_or(AppError::InvalidData(INVALID_NOTE_DATA))?;

        info!(note_id = created.id, title = %created.title, "note created");
        Ok(created)
    }

    /// Replaces the stored note with `changes`, matched on `changes.id`.
    pub async fn update(&self, changes: Note) -> Result<Note, AppError> {
        let mut note = self
            .notes
            .find_by_id(changes.id)
            .await?
            .ok_or(AppError::NotFound(NOTE_NOT_FOUND))?;

        // a note may keep its own title
        if let Some(duplicate) = self.notes.find_by_title(&changes.title).await? {
            if duplicate.id != note.id {
                return Err(AppError::Conflict(DUPLICATE_TITLE));
            }
        }

        note.user = changes.user;
        note.title = changes.title;
        note.text = changes.text;
        note.completed = changes.completed;

        let saved = self
            .notes
            .save(&note)
            .await?
            .ok_or(AppError::NotFound(NOTE_NOT_FOUND))?;

        debug!(note_id = saved.id, "note updated");
        Ok(saved)
    }

    pub async fn delete(&self, id: i64) -> Result<Note, AppError> {
        if self.notes.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound(NOTE_NOT_FOUND));
        }

        let removed = self
            .notes
            .delete(id)
            .await?
            .ok_or(AppError::NotFound(NOTE_NOT_FOUND))?;

        info!(note_id = removed.id, title = %removed.title, "note deleted");
        Ok(removed)
    }
}
