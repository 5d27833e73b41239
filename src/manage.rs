//! Word catalog management: importing, editing and retiring words. Word
//! text is NFC-normalized on the way in so that lookups by text behave the
//! same regardless of how the source material was encoded.

use super::*;
use crate::progress;
use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

/// A word as it arrives from an import file or a management tool.
#[derive(Debug, Clone, Deserialize)]
pub struct WordFromStrings {
    pub word: String,
    pub translation: String,
    pub sentence: Option<String>,
    pub sentence_native: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
}

pub fn get_word(conn: &PgConnection, id: i32) -> Result<Option<Word>> {
    use crate::schema::words;

    Ok(words::table
        .filter(words::id.eq(id))
        .get_result(conn)
        .optional()?)
}

pub fn get_word_by_text(conn: &PgConnection, word_text: &str) -> Result<Option<Word>> {
    use crate::schema::words;

    let normalized: String = word_text.nfc().collect();

    Ok(words::table
        .filter(words::word.eq(normalized))
        .get_result(conn)
        .optional()?)
}

pub fn get_words(conn: &PgConnection) -> Result<Vec<Word>> {
    use crate::schema::words;

    Ok(words::table.order(words::id.asc()).load(conn)?)
}

pub fn get_published_words(conn: &PgConnection) -> Result<Vec<Word>> {
    use crate::schema::words;

    Ok(words::table
        .filter(words::published.eq(true))
        .order(words::id.asc())
        .load(conn)?)
}

/// Upserts by word text. A new word is published right away and every user
/// gets a `P0` progress row for it; an existing word just has its content
/// refreshed.
pub fn create_or_update_word(conn: &PgConnection, w: &WordFromStrings) -> Result<Word> {
    use crate::schema::words;

    let normalized: String = w.word.nfc().collect();

    let existing: Option<Word> = words::table
        .filter(words::word.eq(&normalized))
        .get_result(conn)
        .optional()?;

    if let Some(old) = existing {
        debug!("The word {:?} exists already; updating.", normalized);
        let update = UpdateWord {
            translation: Some(w.translation.clone()),
            sentence: Some(w.sentence.clone()),
            sentence_native: Some(w.sentence_native.clone()),
            image_url: Some(w.image_url.clone()),
            audio_url: Some(w.audio_url.clone()),
            ..Default::default()
        };
        let word = diesel::update(words::table.filter(words::id.eq(old.id)))
            .set(&update)
            .get_result(conn)?;
        return Ok(word);
    }

    let word: Word = diesel::insert_into(words::table)
        .values(&NewWord {
            word: &normalized,
            translation: &w.translation,
            sentence: w.sentence.as_ref().map(|s| s.as_str()),
            sentence_native: w.sentence_native.as_ref().map(|s| s.as_str()),
            image_url: w.image_url.as_ref().map(|s| s.as_str()),
            audio_url: w.audio_url.as_ref().map(|s| s.as_str()),
            published: true,
        })
        .get_result(conn)
        .chain_err(|| "Couldn't create a new word!")?;

    progress::init_for_word(conn, word.id)?;

    info!("Added the word {:?} to the catalog.", word.word);
    Ok(word)
}

pub fn update_word(conn: &PgConnection, id: i32, item: &UpdateWord) -> Result<Option<Word>> {
    use crate::schema::words;

    let word = diesel::update(words::table.filter(words::id.eq(id)))
        .set(item)
        .get_result(conn)
        .optional()?;
    Ok(word)
}

/// Publishing late also backfills the missing `P0` progress rows.
pub fn publish_word(conn: &PgConnection, id: i32, published: bool) -> Result<Option<Word>> {
    use crate::schema::words;

    let word: Option<Word> = diesel::update(words::table.filter(words::id.eq(id)))
        .set(words::published.eq(published))
        .get_result(conn)
        .optional()?;

    if let Some(ref word) = word {
        if published {
            progress::init_for_word(conn, word.id)?;
        }
    }

    Ok(word)
}

/// Removes a word and, by cascade, its progress and answer history.
pub fn remove_word(conn: &PgConnection, word_text: &str) -> Result<Word> {
    use crate::schema::words;
    use diesel::result::Error::NotFound;

    let normalized: String = word_text.nfc().collect();

    diesel::delete(words::table.filter(words::word.eq(&normalized)))
        .get_result(conn)
        .map_err(|e| {
            match e {
                NotFound => Error::from_kind(ErrorKind::NoSuchWord(normalized.clone())),
                e => Error::with_chain(e, "Couldn't remove the word!"),
            }
        })
}
