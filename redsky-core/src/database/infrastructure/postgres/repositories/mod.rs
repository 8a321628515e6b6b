//! PostgreSQL-backed repository implementations.

pub mod alerts;
pub mod crisis;
pub mod instances;
pub mod membership;
pub mod tickets;

use std::str::FromStr;

use sqlx::{Row, postgres::PgRow};

use crate::error::{CoreError, Result};

/// Read a text column and parse it into one of the model enums.
pub(crate) fn decode_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row
        .try_get(column)
        .map_err(|e| CoreError::Internal(format!("Failed to read {column}: {e}")))?;
    raw.parse()
        .map_err(|e| CoreError::Internal(format!("Invalid {column} value '{raw}': {e}")))
}

pub(crate) fn column<'r, T>(row: &'r PgRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| CoreError::Internal(format!("Failed to read {column}: {e}")))
}
