//! The pool scheduler.
//!
//! Every (user, word) pair sits in exactly one of twelve pools: the primary
//! track `P0..P6` (new word, five spaced practice stages, mastered) and the
//! remedial track `R1..R5`. A correct answer advances along the primary
//! track; an incorrect answer demotes `Pi` to `Ri`, where a short retry loop
//! runs until the word earns its way back to the *same* primary stage it
//! fell from.
//!
//! The functions here are pure: they take the current pool, the phase flag
//! and the current time, and return the new pool, the next-eligibility
//! timestamp and the new phase flag. Persisting the result, and checking
//! that a word is actually eligible (`next_available_time <= now`) before
//! asking for a transition, is the caller's job.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::errors::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pool {
    P0,
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
    R1,
    R2,
    R3,
    R4,
    R5,
}

pub const ALL_POOLS: [Pool; 12] = [Pool::P0, Pool::P1, Pool::P2, Pool::P3, Pool::P4, Pool::P5,
                                   Pool::P6, Pool::R1, Pool::R2, Pool::R3, Pool::R4, Pool::R5];

/// The pools whose words take part in practice sessions.
pub const PRACTICE_POOL_TAGS: [&str; 10] = ["P1", "P2", "P3", "P4", "P5",
                                            "R1", "R2", "R3", "R4", "R5"];

pub const REMEDIAL_POOL_TAGS: [&str; 5] = ["R1", "R2", "R3", "R4", "R5"];

// Seconds to wait after transitioning into a pool.
pub const P1_WAIT_SECS: i64 = 10 * 60;
pub const P2_WAIT_SECS: i64 = 20 * 60 * 60;
pub const P3_WAIT_SECS: i64 = 44 * 60 * 60;
pub const P4_WAIT_SECS: i64 = 68 * 60 * 60;
pub const P5_WAIT_SECS: i64 = 164 * 60 * 60;
pub const REVIEW_WAIT_SECS: i64 = 10 * 60;
pub const PRACTICE_WAIT_SECS: i64 = 20 * 60 * 60;

impl Pool {
    pub fn as_str(self) -> &'static str {
        use self::Pool::*;
        match self {
            P0 => "P0",
            P1 => "P1",
            P2 => "P2",
            P3 => "P3",
            P4 => "P4",
            P5 => "P5",
            P6 => "P6",
            R1 => "R1",
            R2 => "R2",
            R3 => "R3",
            R4 => "R4",
            R5 => "R5",
        }
    }

    pub fn is_primary(self) -> bool {
        !self.is_remedial()
    }

    pub fn is_remedial(self) -> bool {
        use self::Pool::*;
        match self {
            R1 | R2 | R3 | R4 | R5 => true,
            _ => false,
        }
    }

    /// The primary stage a remedial pool returns to; none for primary pools.
    pub fn corresponding_primary(self) -> Option<Pool> {
        use self::Pool::*;
        match self {
            R1 => Some(P1),
            R2 => Some(P2),
            R3 => Some(P3),
            R4 => Some(P4),
            R5 => Some(P5),
            _ => None,
        }
    }
}

impl FromStr for Pool {
    type Err = Error;

    fn from_str(s: &str) -> ::std::result::Result<Pool, Error> {
        use self::Pool::*;
        Ok(match s {
            "P0" => P0,
            "P1" => P1,
            "P2" => P2,
            "P3" => P3,
            "P4" => P4,
            "P5" => P5,
            "P6" => P6,
            "R1" => R1,
            "R2" => R2,
            "R3" => R3,
            "R4" => R4,
            "R5" => R5,
            odd => return Err(ErrorKind::InvalidPool(odd.to_owned()).into()),
        })
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExerciseKind {
    ReadingLv1,
    ReadingLv2,
    ListeningLv1,
    SpeakingLv1,
    SpeakingLv2,
}

impl ExerciseKind {
    pub fn as_str(self) -> &'static str {
        use self::ExerciseKind::*;
        match self {
            ReadingLv1 => "reading_lv1",
            ReadingLv2 => "reading_lv2",
            ListeningLv1 => "listening_lv1",
            SpeakingLv1 => "speaking_lv1",
            SpeakingLv2 => "speaking_lv2",
        }
    }
}

/// The drill administered in each pool. `P0` words haven't been introduced
/// yet and `P6` words are done, so neither has one.
pub fn exercise_kind(pool: Pool) -> Option<ExerciseKind> {
    use self::Pool::*;
    match pool {
        P1 | R1 => Some(ExerciseKind::ReadingLv1),
        P2 | R2 => Some(ExerciseKind::ListeningLv1),
        P3 | R3 => Some(ExerciseKind::SpeakingLv1),
        P4 | R4 => Some(ExerciseKind::ReadingLv2),
        P5 | R5 => Some(ExerciseKind::SpeakingLv2),
        P0 | P6 => None,
    }
}

/// How long a word waits after transitioning into `pool`.
/// `None` means immediately eligible (`P0` and `P6`).
pub fn wait_time(pool: Pool, in_review_phase: bool) -> Option<Duration> {
    use self::Pool::*;
    let secs = match pool {
        P0 | P6 => return None,
        P1 => P1_WAIT_SECS,
        P2 => P2_WAIT_SECS,
        P3 => P3_WAIT_SECS,
        P4 => P4_WAIT_SECS,
        P5 => P5_WAIT_SECS,
        R1 | R2 | R3 | R4 | R5 => {
            if in_review_phase {
                REVIEW_WAIT_SECS
            } else {
                PRACTICE_WAIT_SECS
            }
        }
    };
    Some(Duration::seconds(secs))
}

pub fn next_available_time(pool: Pool,
                           in_review_phase: bool,
                           now: DateTime<Utc>)
                           -> Option<DateTime<Utc>> {
    wait_time(pool, in_review_phase).map(|wait| now + wait)
}

/// The outcome of a scheduling decision, ready to be written back to the
/// word's progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub pool: Pool,
    pub next_available_time: Option<DateTime<Utc>>,
    pub in_review_phase: bool,
}

pub fn apply_correct(pool: Pool, now: DateTime<Utc>) -> Transition {
    use self::Pool::*;

    let next = match pool {
        P1 => P2,
        P2 => P3,
        P3 => P4,
        P4 => P5,
        P5 => P6,
        // Returning from remediation: re-enter the primary track at the
        // stage the word was demoted from.
        R1 => P1,
        R2 => P2,
        R3 => P3,
        R4 => P4,
        R5 => P5,
        // P0 exits through the complete-learning operation and P6 is
        // terminal; landing here is caller misuse, so stay put.
        P0 => P0,
        P6 => P6,
    };

    // A word coming back from an R pool waits the full primary-stage delay,
    // not the short remedial one; `next` is always primary here.
    Transition {
        pool: next,
        next_available_time: next_available_time(next, false, now),
        in_review_phase: false,
    }
}

pub fn apply_incorrect(pool: Pool, now: DateTime<Utc>) -> Transition {
    use self::Pool::*;

    let next = match pool {
        P1 => R1,
        P2 => R2,
        P3 => R3,
        P4 => R4,
        P5 => R5,
        // Failing while already remediating doesn't demote any further.
        R1 => R1,
        R2 => R2,
        R3 => R3,
        R4 => R4,
        R5 => R5,
        P0 => P0,
        // A mastered word that fails a drill re-enters remediation at the
        // top stage.
        P6 => R5,
    };

    // Incorrect answers always schedule a short retry.
    Transition {
        pool: next,
        next_available_time: Some(now + Duration::seconds(REVIEW_WAIT_SECS)),
        in_review_phase: true,
    }
}

/// Ends the review phase without changing the pool: the quick retry was
/// passed, so the word now waits the normal practice interval.
pub fn complete_review(pool: Pool, now: DateTime<Utc>) -> Transition {
    Transition {
        pool,
        next_available_time: next_available_time(pool, false, now),
        in_review_phase: false,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.ymd(2024, 3, 1).and_hms(12, 0, 0)
    }

    fn secs_until(t: Option<DateTime<Utc>>) -> i64 {
        (t.expect("expected a next available time") - t0()).num_seconds()
    }

    #[test]
    fn transitions_are_total_over_all_pools() {
        for &pool in &ALL_POOLS {
            let up = apply_correct(pool, t0());
            let down = apply_incorrect(pool, t0());
            assert!(ALL_POOLS.contains(&up.pool));
            assert!(ALL_POOLS.contains(&down.pool));
        }
    }

    #[test]
    fn correct_answers_advance_the_primary_track_to_the_p6_fixed_point() {
        let mut pool = Pool::P1;
        for &expected in &[Pool::P2, Pool::P3, Pool::P4, Pool::P5, Pool::P6] {
            let t = apply_correct(pool, t0());
            assert_eq!(t.pool, expected);
            assert!(!t.in_review_phase);
            pool = t.pool;
        }
        // P6 is terminal.
        assert_eq!(apply_correct(Pool::P6, t0()).pool, Pool::P6);
        assert_eq!(apply_correct(Pool::P6, t0()).next_available_time, None);
    }

    #[test]
    fn demotion_then_recovery_returns_to_the_same_stage() {
        for &pool in &[Pool::P1, Pool::P2, Pool::P3, Pool::P4, Pool::P5] {
            let demoted = apply_incorrect(pool, t0());
            assert!(demoted.pool.is_remedial());
            assert_eq!(demoted.pool.corresponding_primary(), Some(pool));

            let recovered = apply_correct(demoted.pool, t0());
            assert_eq!(recovered.pool, pool);
        }
    }

    #[test]
    fn remedial_pools_do_not_demote_further() {
        for &pool in &[Pool::R1, Pool::R2, Pool::R3, Pool::R4, Pool::R5] {
            let t = apply_incorrect(pool, t0());
            assert_eq!(t.pool, pool);
            assert!(t.in_review_phase);
        }
    }

    #[test]
    fn wait_times_grow_along_the_primary_track() {
        let waits: Vec<i64> = [Pool::P1, Pool::P2, Pool::P3, Pool::P4, Pool::P5]
            .iter()
            .map(|&p| wait_time(p, false).unwrap().num_seconds())
            .collect();
        for pair in waits.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn review_phase_flag_follows_the_answer() {
        for &pool in &ALL_POOLS {
            assert!(apply_incorrect(pool, t0()).in_review_phase);
            assert!(!apply_correct(pool, t0()).in_review_phase);
            assert!(!complete_review(pool, t0()).in_review_phase);
        }
    }

    #[test]
    fn correct_at_p3_waits_68_hours_in_p4() {
        let t = apply_correct(Pool::P3, t0());
        assert_eq!(t.pool, Pool::P4);
        assert_eq!(secs_until(t.next_available_time), 68 * 60 * 60);
        assert!(!t.in_review_phase);
    }

    #[test]
    fn incorrect_at_p3_retries_in_r3_after_10_minutes() {
        let t = apply_incorrect(Pool::P3, t0());
        assert_eq!(t.pool, Pool::R3);
        assert_eq!(secs_until(t.next_available_time), 10 * 60);
        assert!(t.in_review_phase);
    }

    #[test]
    fn correct_at_r3_returns_to_p3_with_the_p3_delay() {
        // Not P4, and not the short remedial delay.
        let t = apply_correct(Pool::R3, t0());
        assert_eq!(t.pool, Pool::P3);
        assert_eq!(secs_until(t.next_available_time), 44 * 60 * 60);
        assert!(!t.in_review_phase);
    }

    #[test]
    fn incorrect_at_r2_stays_in_r2_with_a_short_retry() {
        let t = apply_incorrect(Pool::R2, t0());
        assert_eq!(t.pool, Pool::R2);
        assert_eq!(secs_until(t.next_available_time), 10 * 60);
    }

    #[test]
    fn correct_at_p5_masters_the_word_immediately() {
        let t = apply_correct(Pool::P5, t0());
        assert_eq!(t.pool, Pool::P6);
        assert_eq!(t.next_available_time, None);
        assert!(!t.in_review_phase);
    }

    #[test]
    fn incorrect_at_p6_demotes_to_r5() {
        let t = apply_incorrect(Pool::P6, t0());
        assert_eq!(t.pool, Pool::R5);
        assert_eq!(secs_until(t.next_available_time), 10 * 60);
        assert!(t.in_review_phase);
    }

    #[test]
    fn completing_review_keeps_the_pool_and_waits_the_practice_interval() {
        let t = complete_review(Pool::R4, t0());
        assert_eq!(t.pool, Pool::R4);
        assert_eq!(secs_until(t.next_available_time), 20 * 60 * 60);
        assert!(!t.in_review_phase);
    }

    #[test]
    fn remedial_pools_wait_by_phase() {
        assert_eq!(wait_time(Pool::R1, true).unwrap().num_seconds(), 10 * 60);
        assert_eq!(wait_time(Pool::R1, false).unwrap().num_seconds(), 20 * 60 * 60);
    }

    #[test]
    fn p0_and_p6_are_immediately_eligible() {
        assert_eq!(wait_time(Pool::P0, false), None);
        assert_eq!(wait_time(Pool::P6, false), None);
        assert_eq!(next_available_time(Pool::P6, false, t0()), None);
    }

    #[test]
    fn pool_tags_round_trip_and_bad_tags_are_rejected() {
        for &pool in &ALL_POOLS {
            assert_eq!(pool.as_str().parse::<Pool>().unwrap(), pool);
        }
        assert!("P7".parse::<Pool>().is_err());
        assert!("R0".parse::<Pool>().is_err());
        assert!("".parse::<Pool>().is_err());
        assert!("p1".parse::<Pool>().is_err());
    }

    #[test]
    fn exercise_kinds_match_pool_stages() {
        assert_eq!(exercise_kind(Pool::P1), Some(ExerciseKind::ReadingLv1));
        assert_eq!(exercise_kind(Pool::P2), Some(ExerciseKind::ListeningLv1));
        assert_eq!(exercise_kind(Pool::P3), Some(ExerciseKind::SpeakingLv1));
        assert_eq!(exercise_kind(Pool::P4), Some(ExerciseKind::ReadingLv2));
        assert_eq!(exercise_kind(Pool::P5), Some(ExerciseKind::SpeakingLv2));
        assert_eq!(exercise_kind(Pool::P0), None);
        assert_eq!(exercise_kind(Pool::P6), None);
        for &pool in &[Pool::R1, Pool::R2, Pool::R3, Pool::R4, Pool::R5] {
            assert_eq!(exercise_kind(pool),
                       exercise_kind(pool.corresponding_primary().unwrap()));
        }
    }
}
