use serde::{Deserialize, Serialize};

// Data model representing a Note owned by a User
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    #[sqlx(rename = "user_id")]
    pub user: i64,
    pub title: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Fields of a note that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub user: i64,
    pub title: String,
    pub text: String,
}

// A note as returned by the list endpoint, enriched with its owner's name
#[derive(Debug, Clone, Serialize)]
pub struct NoteWithUser {
    #[serde(flatten)]
    pub note: Note,
    pub username: String,
}
