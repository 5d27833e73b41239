table! {
    answer_history (id) {
        id -> Int4,
        user_id -> Int4,
        word_id -> Int4,
        word -> Varchar,
        correct -> Bool,
        exercise_kind -> Varchar,
        source -> Varchar,
        pool -> Varchar,
        user_answer -> Nullable<Varchar>,
        response_time_ms -> Nullable<Int4>,
        answered_date -> Timestamptz,
    }
}

table! {
    tracked_events (id) {
        id -> Int4,
        device_id -> Varchar,
        user_id -> Nullable<Varchar>,
        session_id -> Varchar,
        exercise_session_id -> Nullable<Varchar>,
        event_type -> Varchar,
        event_name -> Varchar,
        properties -> Nullable<Text>,
        client_time -> Timestamptz,
        received_time -> Timestamptz,
        app_version -> Varchar,
        platform -> Varchar,
    }
}

table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        joined -> Timestamptz,
        last_seen -> Timestamptz,
    }
}

table! {
    word_progress (id) {
        id -> Int4,
        user_id -> Int4,
        word_id -> Int4,
        pool -> Varchar,
        learned_at -> Nullable<Timestamptz>,
        last_practice_time -> Nullable<Timestamptz>,
        next_available_time -> Nullable<Timestamptz>,
        in_review_phase -> Bool,
        review_completed_time -> Nullable<Timestamptz>,
    }
}

table! {
    words (id) {
        id -> Int4,
        word -> Varchar,
        translation -> Varchar,
        sentence -> Nullable<Text>,
        sentence_native -> Nullable<Text>,
        image_url -> Nullable<Varchar>,
        audio_url -> Nullable<Varchar>,
        published -> Bool,
        added -> Timestamptz,
    }
}

joinable!(answer_history -> users (user_id));
joinable!(answer_history -> words (word_id));
joinable!(word_progress -> users (user_id));
joinable!(word_progress -> words (word_id));

allow_tables_to_appear_in_same_query!(
    answer_history,
    tracked_events,
    users,
    word_progress,
    words,
);
