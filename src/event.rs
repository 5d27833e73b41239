//! Analytics event ingestion. Clients batch their events and post them in
//! groups of at most twenty; the batch size is checked at the boundary,
//! while an event without a device id is dropped and counted rather than
//! failing its whole batch.

use super::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TRACK_BATCH_MAX: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingEvent {
    pub device_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: String,
    pub exercise_session_id: Option<String>,
    pub event_type: String,
    pub event_name: String,
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    pub app_version: String,
    pub platform: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrackOutcome {
    pub accepted: usize,
    pub rejected: usize,
}

/// Splits a batch into storable events and a rejected count.
fn screen_batch(batch: &[IncomingEvent]) -> Result<(Vec<&IncomingEvent>, usize)> {
    if batch.is_empty() {
        return Err(ErrorKind::EventBatchEmpty.into());
    }
    if batch.len() > TRACK_BATCH_MAX {
        return Err(ErrorKind::EventBatchTooLarge(batch.len()).into());
    }

    let mut valid = Vec::with_capacity(batch.len());
    let mut rejected = 0;
    for event in batch {
        match event.device_id {
            Some(ref id) if !id.is_empty() => valid.push(event),
            _ => rejected += 1,
        }
    }
    Ok((valid, rejected))
}

pub fn track_batch(conn: &PgConnection, batch: &[IncomingEvent]) -> Result<TrackOutcome> {
    use crate::schema::tracked_events;

    let (valid, rejected) = screen_batch(batch)?;

    let mut rows = Vec::with_capacity(valid.len());
    for event in &valid {
        let device_id = try_or!{ event.device_id.as_ref(),
            else return Err(ErrorKind::DatabaseOdd("A screened event lost its device id!").into()) };

        let properties = match event.properties {
            Some(ref value) => Some(serde_json::to_string(value)?),
            None => None,
        };

        rows.push(NewTrackedEvent {
            device_id,
            user_id: event.user_id.as_ref().map(|s| s.as_str()),
            session_id: &event.session_id,
            exercise_session_id: event.exercise_session_id.as_ref().map(|s| s.as_str()),
            event_type: &event.event_type,
            event_name: &event.event_name,
            properties,
            client_time: event.timestamp,
            app_version: &event.app_version,
            platform: &event.platform,
        });
    }

    let accepted = if rows.is_empty() {
        0
    } else {
        diesel::insert_into(tracked_events::table)
            .values(&rows)
            .execute(conn)
            .chain_err(|| "Couldn't save the tracked events!")?
    };

    debug!("Tracked {} events, rejected {}.", accepted, rejected);

    Ok(TrackOutcome { accepted, rejected })
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(device_id: Option<&str>) -> IncomingEvent {
        IncomingEvent {
            device_id: device_id.map(|s| s.to_owned()),
            user_id: None,
            session_id: "sess-1".to_owned(),
            exercise_session_id: None,
            event_type: "ui".to_owned(),
            event_name: "screen_view".to_owned(),
            properties: None,
            timestamp: Utc.ymd(2024, 3, 1).and_hms(12, 0, 0),
            app_version: "1.2.0".to_owned(),
            platform: "ios".to_owned(),
        }
    }

    #[test]
    fn empty_batches_are_rejected_outright() {
        assert!(screen_batch(&[]).is_err());
    }

    #[test]
    fn oversized_batches_are_rejected_outright() {
        let batch: Vec<IncomingEvent> = (0..21).map(|_| event(Some("dev-1"))).collect();
        assert!(screen_batch(&batch).is_err());
    }

    #[test]
    fn events_without_a_device_id_are_counted_not_fatal() {
        let batch = vec![event(Some("dev-1")), event(None), event(Some("")), event(Some("dev-2"))];
        let (valid, rejected) = screen_batch(&batch).unwrap();
        assert_eq!(valid.len(), 2);
        assert_eq!(rejected, 2);
    }

    #[test]
    fn a_full_batch_passes() {
        let batch: Vec<IncomingEvent> = (0..20).map(|_| event(Some("dev-1"))).collect();
        let (valid, rejected) = screen_batch(&batch).unwrap();
        assert_eq!(valid.len(), 20);
        assert_eq!(rejected, 0);
    }
}
