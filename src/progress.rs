//! Persistence over the per-(user, word) progress records. All pool moves
//! come out of the scheduler; this module only reads rows, filters for
//! eligibility and writes transitions back.

use super::*;
use crate::errors::*;
use crate::scheduler::{self, Pool, Transition};
use chrono::{DateTime, Datelike, FixedOffset, TimeZone, Utc};
use std::collections::BTreeMap;

/// Daily boundaries ("today's learned count") are computed in the timezone
/// of the user base, not UTC.
pub const APP_TZ_OFFSET_HOURS: i32 = 8;

/// Start of the current day in the app timezone, as a UTC instant.
pub fn today_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let tz = FixedOffset::east(APP_TZ_OFFSET_HOURS * 3600);
    let local = now.with_timezone(&tz);
    tz.ymd(local.year(), local.month(), local.day())
        .and_hms(0, 0, 0)
        .with_timezone(&Utc)
}

/// Creates `P0` progress rows for every published word the user doesn't
/// have one for yet. Called once at registration; safe to re-run.
pub fn init_for_user(conn: &PgConnection, user_id: i32) -> Result<usize> {
    use crate::schema::{word_progress, words};

    let word_ids: Vec<i32> = words::table
        .filter(words::published.eq(true))
        .select(words::id)
        .load(conn)?;

    let rows: Vec<NewWordProgress> = word_ids.iter()
        .map(|&word_id| {
            NewWordProgress {
                user_id,
                word_id,
                pool: Pool::P0.as_str(),
            }
        })
        .collect();

    if rows.is_empty() {
        return Ok(0);
    }

    let n = diesel::insert_into(word_progress::table)
        .values(&rows)
        .on_conflict_do_nothing()
        .execute(conn)
        .chain_err(|| "Couldn't initialize the word progress rows!")?;

    info!("Initialized {} progress rows for user {}.", n, user_id);
    Ok(n)
}

/// Creates `P0` progress rows for a freshly published word, for every user.
pub fn init_for_word(conn: &PgConnection, word_id: i32) -> Result<usize> {
    use crate::schema::{users, word_progress};

    let user_ids: Vec<i32> = users::table.select(users::id).load(conn)?;

    let rows: Vec<NewWordProgress> = user_ids.iter()
        .map(|&user_id| {
            NewWordProgress {
                user_id,
                word_id,
                pool: Pool::P0.as_str(),
            }
        })
        .collect();

    if rows.is_empty() {
        return Ok(0);
    }

    let n = diesel::insert_into(word_progress::table)
        .values(&rows)
        .on_conflict_do_nothing()
        .execute(conn)?;

    debug!("Initialized {} progress rows for word {}.", n, word_id);
    Ok(n)
}

pub fn get(conn: &PgConnection, user_id: i32, word_id: i32) -> Result<Option<WordProgress>> {
    use crate::schema::word_progress;

    Ok(word_progress::table
        .filter(word_progress::user_id.eq(user_id))
        .filter(word_progress::word_id.eq(word_id))
        .get_result(conn)
        .optional()?)
}

pub fn get_with_word(conn: &PgConnection,
                     user_id: i32,
                     word_id: i32)
                     -> Result<Option<(WordProgress, Word)>> {
    use crate::schema::{word_progress, words};

    Ok(word_progress::table
        .inner_join(words::table)
        .filter(word_progress::user_id.eq(user_id))
        .filter(word_progress::word_id.eq(word_id))
        .get_result(conn)
        .optional()?)
}

pub fn words_in_pool(conn: &PgConnection,
                     user_id: i32,
                     pool: Pool)
                     -> Result<Vec<(WordProgress, Word)>> {
    use crate::schema::{word_progress, words};

    Ok(word_progress::table
        .inner_join(words::table)
        .filter(word_progress::user_id.eq(user_id))
        .filter(word_progress::pool.eq(pool.as_str()))
        .filter(words::published.eq(true))
        .order(words::id.asc())
        .load(conn)?)
}

/// Words due for a practice session: any practice-track pool (`P1..P5`, or
/// an `R` pool whose review phase is over), waiting time elapsed. Most
/// overdue first.
pub fn eligible_for_practice(conn: &PgConnection,
                             user_id: i32,
                             now: DateTime<Utc>)
                             -> Result<Vec<(WordProgress, Word)>> {
    use crate::schema::{word_progress, words};

    Ok(word_progress::table
        .inner_join(words::table)
        .filter(word_progress::user_id.eq(user_id))
        .filter(word_progress::pool.eq_any(scheduler::PRACTICE_POOL_TAGS.to_vec()))
        .filter(word_progress::in_review_phase.eq(false))
        .filter(word_progress::next_available_time.le(now))
        .order(word_progress::next_available_time.asc())
        .load(conn)?)
}

/// Words due for a review session: remedial pools, still in review phase,
/// retry delay elapsed.
pub fn eligible_for_review(conn: &PgConnection,
                           user_id: i32,
                           now: DateTime<Utc>)
                           -> Result<Vec<(WordProgress, Word)>> {
    use crate::schema::{word_progress, words};

    Ok(word_progress::table
        .inner_join(words::table)
        .filter(word_progress::user_id.eq(user_id))
        .filter(word_progress::pool.eq_any(scheduler::REMEDIAL_POOL_TAGS.to_vec()))
        .filter(word_progress::in_review_phase.eq(true))
        .filter(word_progress::next_available_time.le(now))
        .order(word_progress::next_available_time.asc())
        .load(conn)?)
}

/// How many words left `P0` today, in app-timezone terms.
pub fn count_today_learned(conn: &PgConnection, user_id: i32, now: DateTime<Utc>) -> Result<i64> {
    use crate::schema::word_progress;

    Ok(word_progress::table
        .filter(word_progress::user_id.eq(user_id))
        .filter(word_progress::learned_at.ge(today_start(now)))
        .count()
        .get_result(conn)?)
}

/// Freshly learned words still waiting out their `P1` delay.
pub fn count_upcoming_p1(conn: &PgConnection, user_id: i32, now: DateTime<Utc>) -> Result<i64> {
    use crate::schema::word_progress;

    Ok(word_progress::table
        .filter(word_progress::user_id.eq(user_id))
        .filter(word_progress::pool.eq(Pool::P1.as_str()))
        .filter(word_progress::next_available_time.gt(now))
        .count()
        .get_result(conn)?)
}

pub fn next_due_time(conn: &PgConnection, user_id: i32) -> Result<Option<DateTime<Utc>>> {
    use crate::schema::word_progress;

    let next: Option<Option<DateTime<Utc>>> = word_progress::table
        .filter(word_progress::user_id.eq(user_id))
        .filter(word_progress::next_available_time.is_not_null())
        .select(word_progress::next_available_time)
        .order(word_progress::next_available_time.asc())
        .first(conn)
        .optional()?;

    Ok(next.and_then(|t| t))
}

/// Per-pool word counts for one user, in tag order.
pub fn pool_tally(conn: &PgConnection, user_id: i32) -> Result<BTreeMap<String, i64>> {
    use crate::schema::word_progress;

    let tags: Vec<String> = word_progress::table
        .filter(word_progress::user_id.eq(user_id))
        .select(word_progress::pool)
        .load(conn)?;

    let mut tally = BTreeMap::new();
    for tag in tags {
        *tally.entry(tag).or_insert(0) += 1;
    }
    Ok(tally)
}

/// Writes a scheduler decision back to a progress row, stamping the answer
/// time.
pub fn apply_transition(conn: &PgConnection,
                        mut row: WordProgress,
                        transition: Transition,
                        now: DateTime<Utc>)
                        -> Result<WordProgress> {
    row.pool = transition.pool.as_str().to_owned();
    row.next_available_time = transition.next_available_time;
    row.in_review_phase = transition.in_review_phase;
    row.last_practice_time = Some(now);
    Ok(row.save_changes(conn)?)
}

/// Marks the quick-retry review as passed: the pool stays, the word waits
/// the practice interval. Not an answer, so last_practice_time is left
/// alone.
pub fn complete_review_phase(conn: &PgConnection,
                             mut row: WordProgress,
                             now: DateTime<Utc>)
                             -> Result<WordProgress> {
    let pool = row.current_pool()?;
    let transition = scheduler::complete_review(pool, now);
    row.pool = transition.pool.as_str().to_owned();
    row.next_available_time = transition.next_available_time;
    row.in_review_phase = transition.in_review_phase;
    row.review_completed_time = Some(now);
    Ok(row.save_changes(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_boundaries_follow_the_app_timezone() {
        // 15:59 UTC March 1st is 23:59 March 1st in UTC+8;
        // 16:00 UTC is already March 2nd there.
        let before = Utc.ymd(2024, 3, 1).and_hms(15, 59, 0);
        let after = Utc.ymd(2024, 3, 1).and_hms(16, 0, 0);
        assert_eq!(today_start(before), Utc.ymd(2024, 2, 29).and_hms(16, 0, 0));
        assert_eq!(today_start(after), Utc.ymd(2024, 3, 1).and_hms(16, 0, 0));
    }
}
