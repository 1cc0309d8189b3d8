//! Request bodies for the notes endpoints.
//!
//! Every field is optional on the wire so that a missing field is reported
//! with the endpoint's own message instead of a generic extractor rejection.

use serde::Deserialize;

use crate::{
    error::AppError,
    model::{NewNote, Note},
};

pub const FIELDS_REQUIRED: &str = "All fields are required";
pub const ID_REQUIRED: &str = "Note ID required";

// Struct representing the request body for creating a new Note
#[derive(Debug, Default, Deserialize)]
pub struct CreateNoteSchema {
    pub user: Option<i64>,
    pub title: Option<String>,
    pub text: Option<String>,
}

// Struct representing the request body for updating a Note
#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteSchema {
    pub id: Option<i64>,
    pub user: Option<i64>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub completed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteNoteSchema {
    pub id: Option<i64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

// ids start at 1, so 0 is never a reference to anything
fn non_zero(value: Option<i64>) -> Option<i64> {
    value.filter(|&id| id != 0)
}

impl CreateNoteSchema {
    pub fn validate(self) -> Result<NewNote, AppError> {
        match (non_zero(self.user), non_empty(self.title), non_empty(self.text)) {
            (Some(user), Some(title), Some(text)) => Ok(NewNote { user, title, text }),
            _ => Err(AppError::Validation(FIELDS_REQUIRED)),
        }
    }
}

impl UpdateNoteSchema {
    /// The full replacement note, keyed by the id being updated.
    pub fn validate(self) -> Result<Note, AppError> {
        match (
            non_zero(self.id),
            non_zero(self.user),
            non_empty(self.title),
            non_empty(self.text),
            self.completed,
        ) {
            (Some(id), Some(user), Some(title), Some(text), Some(completed)) => Ok(Note {
                id,
                user,
                title,
                text,
                completed,
            }),
            _ => Err(AppError::Validation(FIELDS_REQUIRED)),
        }
    }
}

impl DeleteNoteSchema {
    pub fn validate(self) -> Result<i64, AppError> {
        non_zero(self.id).ok_or(AppError::Validation(ID_REQUIRED))
    }
}
