//! Storage ports for notes and users, with their SQLite implementations.

use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

use crate::{
    error::RepositoryError,
    model::{NewNote, Note, User},
};

pub type RepoResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// All notes, oldest first.
    async fn find_all(&self) -> RepoResult<Vec<Note>>;

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Note>>;

    async fn find_by_title(&self, title: &str) -> RepoResult<Option<Note>>;

    /// Inserts a note. `None` means the store did not hand back a record.
    async fn create(&self, note: NewNote) -> RepoResult<Option<Note>>;

    /// Overwrites every mutable field of `note`. `None` if the row is gone.
    async fn save(&self, note: &Note) -> RepoResult<Option<Note>>;

    /// Removes the note and returns what was removed.
    async fn delete(&self, id: i64) -> RepoResult<Option<Note>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>>;
}

const NOTE_COLUMNS: &str = "id, user_id, title, text, completed";

#[derive(Debug, Clone)]
pub struct SqliteNoteRepository {
    pool: SqlitePool,
}

impl SqliteNoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for SqliteNoteRepository {
    async fn find_all(&self) -> RepoResult<Vec<Note>> {
        let notes = query_as::<_, Note>(&format!("SELECT {NOTE_COLUMNS} FROM notes ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(notes)
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Note>> {
        let note = query_as::<_, Note>(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(note)
    }

    async fn find_by_title(&self, title: &str) -> RepoResult<Option<Note>> {
        let note =
            query_as::<_, Note>(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE title = ?"))
                .bind(title)
                .fetch_optional(&self.pool)
                .await?;
        Ok(note)
    }

    async fn create(&self, note: NewNote) -> RepoResult<Option<Note>> {
        let note = query_as::<_, Note>(&format!(
            "INSERT INTO notes (user_id, title, text, completed) VALUES (?, ?, ?, 0) RETURNING {NOTE_COLUMNS}"
        ))
        .bind(note.user)
        .bind(note.title)
        .bind(note.text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn save(&self, note: &Note) -> RepoResult<Option<Note>> {
        let saved = query_as::<_, Note>(&format!(
            "UPDATE notes SET user_id = ?, title = ?, text = ?, completed = ? WHERE id = ? RETURNING {NOTE_COLUMNS}"
        ))
        .bind(note.user)
        .bind(&note.title)
        .bind(&note.text)
        .bind(note.completed)
        .bind(note.id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn delete(&self, id: i64) -> RepoResult<Option<Note>> {
        let removed =
            query_as::<_, Note>(&format!("DELETE FROM notes WHERE id = ? RETURNING {NOTE_COLUMNS}"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(removed)
    }
}

#[derive(Debug, Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Users are owned by the account service; this is only for seeding.
    pub async fn create(&self, username: &str) -> RepoResult<User> {
        let user = query_as::<_, User>("INSERT INTO users (username) VALUES (?) RETURNING id, username")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<User>> {
        let user = query_as::<_, User>("SELECT id, username FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
