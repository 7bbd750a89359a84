use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use study_core::Percentage;
use study_core::model::{Email, LeaderboardEntry, Profile, Section, Topic, TopicText};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps constraint violations onto domain-level storage errors.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let Some(db) = e.as_database_error() {
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn parse_id<T: FromStr>(field: &'static str, raw: &str) -> Result<T, StorageError> {
    raw.parse::<T>()
        .map_err(|_| StorageError::Serialization(format!("invalid {field}: {raw}")))
}

fn count_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range: {v}")))
}

pub(crate) fn map_section_row(row: &SqliteRow) -> Result<Section, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    Section::new(
        parse_id("section id", &id)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("emoji").map_err(ser)?,
        row.try_get::<i64, _>("display_order").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_topic_row(row: &SqliteRow) -> Result<Topic, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let section_id: String = row.try_get("section_id").map_err(ser)?;
    let text = TopicText::parse(row.try_get::<String, _>("text").map_err(ser)?).map_err(ser)?;
    Ok(Topic::new(
        parse_id("topic id", &id)?,
        parse_id("section id", &section_id)?,
        text,
        row.try_get::<i64, _>("display_order").map_err(ser)?,
    ))
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<Profile, StorageError> {
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    let email = Email::parse(row.try_get::<String, _>("email").map_err(ser)?).map_err(ser)?;
    Profile::new(
        parse_id("user id", &user_id)?,
        row.try_get::<String, _>("display_name").map_err(ser)?,
        email,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_leaderboard_row(row: &SqliteRow) -> Result<LeaderboardEntry, StorageError> {
    let user_id: String = row.try_get("user_id").map_err(ser)?;
    Ok(LeaderboardEntry {
        user_id: parse_id("user id", &user_id)?,
        display_name: row.try_get("display_name").map_err(ser)?,
        completed_count: count_to_u32(
            "completed_topics",
            row.try_get::<i64, _>("completed_topics").map_err(ser)?,
        )?,
        total_count: count_to_u32(
            "total_topics",
            row.try_get::<i64, _>("total_topics").map_err(ser)?,
        )?,
        completion_percentage: Percentage::clamped(
            row.try_get::<f64, _>("completion_percentage").map_err(ser)?,
        ),
    })
}
