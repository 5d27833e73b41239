//! Session building and answering. Learn sessions introduce `P0` words,
//! practice sessions drill whatever the scheduler says is due, review
//! sessions run the quick-retry loop for freshly demoted words. All pool
//! arithmetic is delegated to the scheduler; this module selects rows,
//! renders exercises and writes the outcomes back.

use super::*;
use crate::progress;
use crate::scheduler::{self, ExerciseKind, Pool};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};

pub const LEARN_SESSION_SIZE: usize = 5;
pub const DAILY_LEARN_LIMIT: i64 = 50;
pub const P1_UPCOMING_LIMIT: i64 = 10;
pub const PRACTICE_MIN_WORDS: usize = 5;
pub const PRACTICE_SESSION_SIZE: usize = 5;
pub const REVIEW_MIN_WORDS: usize = 3;
pub const REVIEW_MAX_WORDS: usize = 5;
pub const OPTIONS_COUNT: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct WordCardJson {
    pub word_id: i32,
    pub word: String,
    pub translation: String,
    pub sentence: Option<String>,
    pub sentence_native: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub pool: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceJson {
    pub word_id: i32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseJson {
    pub word_id: i32,
    pub kind: &'static str,
    pub options: Vec<ChoiceJson>,
    pub correct_index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionJson {
    pub available: bool,
    pub reason: Option<&'static str>,
    pub words: Vec<WordCardJson>,
    pub exercises: Vec<ExerciseJson>,
}

impl SessionJson {
    fn unavailable(reason: &'static str) -> SessionJson {
        SessionJson {
            available: false,
            reason: Some(reason),
            words: vec![],
            exercises: vec![],
        }
    }
}

/// One answer as reported by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct Answer {
    pub word_id: i32,
    pub correct: bool,
    pub user_answer: Option<String>,
    pub response_time_ms: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResultJson {
    pub word_id: i32,
    pub correct: bool,
    pub previous_pool: &'static str,
    pub pool: &'static str,
    pub next_available_time: Option<DateTime<Utc>>,
    pub in_review_phase: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearnOutcome {
    pub words_moved: usize,
    pub today_learned: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewSummary {
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub returned_to_p: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub results: Vec<AnswerResultJson>,
    pub summary: ReviewSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewCompletion {
    pub words_completed: usize,
    pub next_practice_time: DateTime<Utc>,
}





/* SESSION BUILDING */


fn word_card(row: &WordProgress, word: Word) -> Result<WordCardJson> {
    let pool = row.current_pool()?;
    Ok(WordCardJson {
        word_id: word.id,
        word: word.word,
        translation: word.translation,
        sentence: word.sentence,
        sentence_native: word.sentence_native,
        image_url: word.image_url,
        audio_url: word.audio_url,
        pool: pool.as_str(),
    })
}

/// A multiple-choice exercise: the word's own translation and up to three
/// distractor translations drawn from the rest of the catalog.
pub fn build_exercise(word: &Word, kind: ExerciseKind, catalog: &[Word]) -> ExerciseJson {
    let mut rng = thread_rng();

    let candidates: Vec<&Word> = catalog.iter()
        .filter(|w| w.id != word.id && w.translation != word.translation)
        .collect();

    let mut options: Vec<ChoiceJson> = candidates
        .choose_multiple(&mut rng, OPTIONS_COUNT - 1)
        .map(|w| {
            ChoiceJson {
                word_id: w.id,
                text: w.translation.clone(),
            }
        })
        .collect();

    options.push(ChoiceJson {
        word_id: word.id,
        text: word.translation.clone(),
    });
    options.shuffle(&mut rng);

    let correct_index = options.iter()
        .position(|o| o.word_id == word.id)
        .unwrap_or(0);

    ExerciseJson {
        word_id: word.id,
        kind: kind.as_str(),
        options,
        correct_index,
    }
}

/// A learning session: up to five not-yet-introduced words, gated by the
/// daily limit and by the backlog of freshly learned words still waiting
/// out their first delay.
pub fn get_learn_session(conn: &PgConnection, user: &User) -> Result<SessionJson> {
    let now = Utc::now();

    if progress::count_today_learned(conn, user.id, now)? >= DAILY_LEARN_LIMIT {
        debug!("User {} hit the daily learn limit.", user.id);
        return Ok(SessionJson::unavailable("daily_limit_reached"));
    }

    if progress::count_upcoming_p1(conn, user.id, now)? >= P1_UPCOMING_LIMIT {
        debug!("User {} has a full P1 backlog.", user.id);
        return Ok(SessionJson::unavailable("p1_backlog_full"));
    }

    let p0_rows = progress::words_in_pool(conn, user.id, Pool::P0)?;
    if p0_rows.is_empty() {
        return Ok(SessionJson::unavailable("no_words_in_p0"));
    }

    let catalog = manage::get_published_words(conn)?;

    let mut words = Vec::with_capacity(LEARN_SESSION_SIZE);
    let mut exercises = Vec::with_capacity(LEARN_SESSION_SIZE);
    for (row, word) in p0_rows.into_iter().take(LEARN_SESSION_SIZE) {
        exercises.push(build_exercise(&word, ExerciseKind::ReadingLv1, &catalog));
        words.push(word_card(&row, word)?);
    }

    Ok(SessionJson {
        available: true,
        reason: None,
        words,
        exercises,
    })
}

/// A practice session over whatever is due, oldest first. Below the minimum
/// the session isn't offered at all.
pub fn get_practice_session(conn: &PgConnection, user: &User) -> Result<SessionJson> {
    let now = Utc::now();

    let due = progress::eligible_for_practice(conn, user.id, now)?;
    if due.len() < PRACTICE_MIN_WORDS {
        debug!("User {} has only {} due words; not enough for practice.",
               user.id,
               due.len());
        return Ok(SessionJson::unavailable("not_enough_words"));
    }

    let catalog = manage::get_published_words(conn)?;

    let mut words = Vec::with_capacity(PRACTICE_SESSION_SIZE);
    let mut exercises = Vec::with_capacity(PRACTICE_SESSION_SIZE);
    for (row, word) in due.into_iter().take(PRACTICE_SESSION_SIZE) {
        let pool = row.current_pool()?;
        let kind = try_or!{ scheduler::exercise_kind(pool),
            else return Err(ErrorKind::DatabaseOdd("An eligible practice word sits in a pool with no exercise!").into()) };
        exercises.push(build_exercise(&word, kind, &catalog));
        words.push(word_card(&row, word)?);
    }

    Ok(SessionJson {
        available: true,
        reason: None,
        words,
        exercises,
    })
}

/// A review session: freshly demoted words whose quick-retry delay has
/// passed. Needs at least three to be worth a round; never more than five.
pub fn get_review_session(conn: &PgConnection, user: &User) -> Result<SessionJson> {
    let now = Utc::now();

    let due = progress::eligible_for_review(conn, user.id, now)?;
    if due.len() < REVIEW_MIN_WORDS {
        debug!("User {} has only {} words awaiting review.", user.id, due.len());
        return Ok(SessionJson::unavailable("not_enough_words"));
    }

    let catalog = manage::get_published_words(conn)?;

    let mut words = Vec::with_capacity(REVIEW_MAX_WORDS);
    let mut exercises = Vec::with_capacity(REVIEW_MAX_WORDS);
    for (row, word) in due.into_iter().take(REVIEW_MAX_WORDS) {
        let pool = row.current_pool()?;
        let kind = try_or!{ scheduler::exercise_kind(pool),
            else return Err(ErrorKind::DatabaseOdd("A review word sits in a pool with no exercise!").into()) };
        exercises.push(build_exercise(&word, kind, &catalog));
        words.push(word_card(&row, word)?);
    }

    Ok(SessionJson {
        available: true,
        reason: None,
        words,
        exercises,
    })
}





/* ANSWERING */


fn log_answer(conn: &PgConnection,
              user: &User,
              word: &Word,
              answer: &Answer,
              pool: Pool,
              source: &'static str)
              -> Result<()> {
    use crate::schema::answer_history;

    let kind = scheduler::exercise_kind(pool).map(ExerciseKind::as_str).unwrap_or("none");

    diesel::insert_into(answer_history::table)
        .values(&NewAnswerHistory {
            user_id: user.id,
            word_id: word.id,
            word: &word.word,
            correct: answer.correct,
            exercise_kind: kind,
            source,
            pool: pool.as_str(),
            user_answer: answer.user_answer.as_ref().map(|s| s.as_str()),
            response_time_ms: answer.response_time_ms,
        })
        .execute(conn)
        .chain_err(|| "Couldn't save the answer history row!")?;

    Ok(())
}

/// Applies one answer: records it against the pool the word was in, asks
/// the scheduler for the transition and persists the result.
fn apply_answer(conn: &PgConnection,
                user: &User,
                answer: &Answer,
                source: &'static str)
                -> Result<AnswerResultJson> {
    let now = Utc::now();

    let (row, word) = try_or!{ progress::get_with_word(conn, user.id, answer.word_id)?,
        else return Err(ErrorKind::NoSuchProgress(answer.word_id).into()) };

    let pool = row.current_pool()?;

    log_answer(conn, user, &word, answer, pool, source)?;

    let transition = if answer.correct {
        scheduler::apply_correct(pool, now)
    } else {
        scheduler::apply_incorrect(pool, now)
    };
    let row = progress::apply_transition(conn, row, transition, now)?;

    Ok(AnswerResultJson {
        word_id: word.id,
        correct: answer.correct,
        previous_pool: pool.as_str(),
        pool: transition.pool.as_str(),
        next_available_time: row.next_available_time,
        in_review_phase: row.in_review_phase,
    })
}

/// Ends a learning session: the listed words leave `P0` for `P1` and get
/// their learned_at stamp.
pub fn complete_learn(conn: &PgConnection, user: &User, word_ids: &[i32]) -> Result<LearnOutcome> {
    let now = Utc::now();

    let mut words_moved = 0;
    for &word_id in word_ids {
        let mut row = try_or!{ progress::get(conn, user.id, word_id)?,
            else return Err(ErrorKind::NoSuchProgress(word_id).into()) };

        if row.current_pool()? != Pool::P0 {
            return Err(ErrorKind::WordNotInPool(word_id, "P0").into());
        }

        row.pool = Pool::P1.as_str().to_owned();
        row.learned_at = Some(now);
        row.last_practice_time = Some(now);
        row.next_available_time = scheduler::next_available_time(Pool::P1, false, now);
        let _: WordProgress = row.save_changes(conn)?;
        words_moved += 1;
    }

    let today_learned = progress::count_today_learned(conn, user.id, now)?;
    info!("User {} learned {} new words ({} today).",
          user.id,
          words_moved,
          today_learned);

    Ok(LearnOutcome {
        words_moved,
        today_learned,
    })
}

pub fn submit_practice(conn: &PgConnection,
                       user: &User,
                       answers: &[Answer])
                       -> Result<Vec<AnswerResultJson>> {
    answers.iter()
        .map(|answer| apply_answer(conn, user, answer, "practice"))
        .collect()
}

/// Review answers follow the same transition rules as practice: a correct
/// answer on a demoted word returns it straight to its primary stage.
pub fn submit_review(conn: &PgConnection, user: &User, answers: &[Answer]) -> Result<ReviewOutcome> {
    let mut results = Vec::with_capacity(answers.len());
    let mut summary = ReviewSummary {
        correct_count: 0,
        incorrect_count: 0,
        returned_to_p: 0,
    };

    for answer in answers {
        let result = apply_answer(conn, user, answer, "review")?;
        if result.correct {
            summary.correct_count += 1;
        } else {
            summary.incorrect_count += 1;
        }
        if result.correct && result.pool.starts_with('P') {
            summary.returned_to_p += 1;
        }
        results.push(result);
    }

    Ok(ReviewOutcome { results, summary })
}

/// Batch wrap-up for words that passed their quick retry on the client:
/// each stays in its remedial pool but moves to the practice phase.
pub fn complete_review(conn: &PgConnection,
                       user: &User,
                       word_ids: &[i32])
                       -> Result<ReviewCompletion> {
    let now = Utc::now();
    let next_practice_time = now + chrono::Duration::seconds(scheduler::PRACTICE_WAIT_SECS);

    let mut words_completed = 0;
    for &word_id in word_ids {
        let row = try_or!{ progress::get(conn, user.id, word_id)?,
            else return Err(ErrorKind::NoSuchProgress(word_id).into()) };

        if !row.current_pool()?.is_remedial() || !row.in_review_phase {
            return Err(ErrorKind::WordNotInPool(word_id, "a remedial pool in review phase").into());
        }

        progress::complete_review_phase(conn, row, now)?;
        words_completed += 1;
    }

    Ok(ReviewCompletion {
        words_completed,
        next_practice_time,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn word(id: i32, word: &str, translation: &str) -> Word {
        Word {
            id,
            word: word.to_owned(),
            translation: translation.to_owned(),
            sentence: None,
            sentence_native: None,
            image_url: None,
            audio_url: None,
            published: true,
            added: Utc.ymd(2024, 1, 1).and_hms(0, 0, 0),
        }
    }

    fn catalog() -> Vec<Word> {
        vec![word(1, "apple", "pomme"),
             word(2, "pear", "poire"),
             word(3, "plum", "prune"),
             word(4, "peach", "pêche"),
             word(5, "grape", "raisin"),
             word(6, "cherry", "cerise")]
    }

    #[test]
    fn exercises_offer_four_options_with_the_right_answer_among_them() {
        let catalog = catalog();
        let target = &catalog[2];

        let exercise = build_exercise(target, ExerciseKind::ReadingLv1, &catalog);

        assert_eq!(exercise.word_id, target.id);
        assert_eq!(exercise.kind, "reading_lv1");
        assert_eq!(exercise.options.len(), OPTIONS_COUNT);
        assert_eq!(exercise.options[exercise.correct_index].word_id, target.id);
        assert_eq!(exercise.options[exercise.correct_index].text, target.translation);
    }

    #[test]
    fn exercise_distractors_are_distinct_words() {
        let catalog = catalog();
        let target = &catalog[0];

        for _ in 0..20 {
            let exercise = build_exercise(target, ExerciseKind::ListeningLv1, &catalog);
            let mut ids: Vec<i32> = exercise.options.iter().map(|o| o.word_id).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), OPTIONS_COUNT);
            assert_eq!(exercise.options.iter().filter(|o| o.word_id == target.id).count(),
                       1);
        }
    }

    #[test]
    fn exercises_degrade_gracefully_on_a_tiny_catalog() {
        let catalog = vec![word(1, "apple", "pomme"), word(2, "pear", "poire")];
        let exercise = build_exercise(&catalog[0], ExerciseKind::ReadingLv2, &catalog);

        assert_eq!(exercise.options.len(), 2);
        assert_eq!(exercise.options[exercise.correct_index].word_id, 1);
    }

    #[test]
    fn duplicate_translations_are_not_used_as_distractors() {
        let mut catalog = catalog();
        catalog.push(word(7, "apfel", "pomme"));
        let target = catalog[0].clone();

        for _ in 0..20 {
            let exercise = build_exercise(&target, ExerciseKind::ReadingLv1, &catalog);
            assert_eq!(exercise.options.iter().filter(|o| o.text == "pomme").count(),
                       1);
        }
    }
}
