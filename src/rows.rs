use std::borrow::Cow;
use std::collections::HashMap;

use thiserror::Error;

use crate::protocol::proto::{DbField, DbRow};

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("column {column} is not a {target}: {source}")]
    Decode {
        column: String,
        target: &'static str,
        source: prost::DecodeError,
    },
}

/// A query column whose bytes are interpreted on demand.
#[derive(Clone, Copy, Debug)]
pub struct RawField<'a> {
    field: &'a DbField,
}

impl<'a> RawField<'a> {
    pub fn new(field: &'a DbField) -> Self {
        Self { field }
    }

    pub fn column(&self) -> &'a str {
        &self.field.column
    }

    pub fn bytes(&self) -> &'a [u8] {
        &self.field.content
    }

    /// Lossy UTF-8 view of the content.
    pub fn as_text(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(&self.field.content)
    }

    pub fn as_structured<T>(&self) -> Result<T, FieldError>
    where
        T: prost::Message + Default,
    {
        T::decode(self.field.content.as_slice()).map_err(|source| FieldError::Decode {
            column: self.field.column.clone(),
            target: std::any::type_name::<T>(),
            source,
        })
    }
}

/// Field `index` of the first row, if both exist.
pub fn first_field(rows: &[DbRow], index: usize) -> Option<RawField<'_>> {
    rows.first()
        .and_then(|row| row.fields.get(index))
        .map(RawField::new)
}

/// Flattens rows into `column -> content`. Meant for single-row queries:
/// with several rows, later rows overwrite earlier ones.
pub fn rows_to_map(rows: Vec<DbRow>) -> HashMap<String, Vec<u8>> {
    let mut map = HashMap::new();
    for row in rows {
        for field in row.fields {
            map.insert(field.column, field.content);
        }
    }
    map
}
