use super::schema::*;
use crate::scheduler::Pool;
use chrono::{DateTime, offset::Utc};
use serde::{Deserializer, Deserialize, Serialize};

/// Lets a PATCH-style update distinguish "leave alone" (absent) from
/// "set to NULL" (present but null).
pub fn double_option<'de, T, D>(de: D) -> ::std::result::Result<Option<Option<T>>, D::Error>
    where T: Deserialize<'de>,
          D: Deserializer<'de>
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Insertable)]
#[table_name = "users"]
pub struct NewUser<'a> {
    pub username: &'a str,
}

#[derive(Identifiable, Clone, Queryable, Debug, Associations, AsChangeset, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub joined: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Insertable)]
#[table_name = "words"]
pub struct NewWord<'a> {
    pub word: &'a str,
    pub translation: &'a str,
    pub sentence: Option<&'a str>,
    pub sentence_native: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub audio_url: Option<&'a str>,
    pub published: bool,
}

#[derive(Insertable, Queryable, Associations, Identifiable, Debug, Clone, Serialize, AsChangeset)]
#[table_name = "words"]
pub struct Word {
    pub id: i32,
    pub word: String,
    pub translation: String,
    pub sentence: Option<String>,
    pub sentence_native: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub published: bool,
    pub added: DateTime<Utc>,
}

#[derive(Queryable, AsChangeset, Debug, Serialize, Deserialize, Default)]
#[table_name = "words"]
#[serde(default)]
pub struct UpdateWord {
    pub word: Option<String>,
    pub translation: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub sentence: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub sentence_native: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub audio_url: Option<Option<String>>,
    pub published: Option<bool>,
}

#[derive(Insertable)]
#[table_name = "word_progress"]
pub struct NewWordProgress<'a> {
    pub user_id: i32,
    pub word_id: i32,
    pub pool: &'a str,
}

// treat_none_as_null matters here: mastering a word clears
// next_available_time, and that has to reach the database as NULL.
#[derive(Identifiable, Queryable, Debug, Clone, Associations, AsChangeset, Serialize)]
#[table_name = "word_progress"]
#[belongs_to(User, foreign_key = "user_id")]
#[belongs_to(Word, foreign_key = "word_id")]
#[changeset_options(treat_none_as_null = "true")]
pub struct WordProgress {
    pub id: i32,
    pub user_id: i32,
    pub word_id: i32,
    pub pool: String,
    pub learned_at: Option<DateTime<Utc>>,
    pub last_practice_time: Option<DateTime<Utc>>,
    pub next_available_time: Option<DateTime<Utc>>,
    pub in_review_phase: bool,
    pub review_completed_time: Option<DateTime<Utc>>,
}

impl WordProgress {
    /// Parses the stored pool tag; a tag outside the twelve-value domain is
    /// rejected here so the scheduler itself never sees one.
    pub fn current_pool(&self) -> crate::errors::Result<Pool> {
        self.pool.parse()
    }
}

#[derive(Insertable)]
#[table_name = "answer_history"]
pub struct NewAnswerHistory<'a> {
    pub user_id: i32,
    pub word_id: i32,
    pub word: &'a str,
    pub correct: bool,
    pub exercise_kind: &'a str,
    pub source: &'a str,
    pub pool: &'a str,
    pub user_answer: Option<&'a str>,
    pub response_time_ms: Option<i32>,
}

#[derive(Identifiable, Queryable, Debug, Clone, Associations, Serialize)]
#[table_name = "answer_history"]
#[belongs_to(User, foreign_key = "user_id")]
#[belongs_to(Word, foreign_key = "word_id")]
pub struct AnswerHistory {
    pub id: i32,
    pub user_id: i32,
    pub word_id: i32,
    pub word: String,
    pub correct: bool,
    pub exercise_kind: String,
    pub source: String,
    pub pool: String,
    pub user_answer: Option<String>,
    pub response_time_ms: Option<i32>,
    pub answered_date: DateTime<Utc>,
}

#[derive(Insertable)]
#[table_name = "tracked_events"]
pub struct NewTrackedEvent<'a> {
    pub device_id: &'a str,
    pub user_id: Option<&'a str>,
    pub session_id: &'a str,
    pub exercise_session_id: Option<&'a str>,
    pub event_type: &'a str,
    pub event_name: &'a str,
    pub properties: Option<String>,
    pub client_time: DateTime<Utc>,
    pub app_version: &'a str,
    pub platform: &'a str,
}

#[derive(Identifiable, Queryable, Debug, Clone, Serialize)]
#[table_name = "tracked_events"]
pub struct TrackedEvent {
    pub id: i32,
    pub device_id: String,
    pub user_id: Option<String>,
    pub session_id: String,
    pub exercise_session_id: Option<String>,
    pub event_type: String,
    pub event_name: String,
    pub properties: Option<String>,
    pub client_time: DateTime<Utc>,
    pub received_time: DateTime<Utc>,
    pub app_version: String,
    pub platform: String,
}
