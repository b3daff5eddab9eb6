use chrono::{DateTime, Utc};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Fractional hours between creation and `now`; never negative.
pub fn hours_since(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = now.signed_duration_since(created_at).num_milliseconds();
    (millis as f64 / MILLIS_PER_HOUR).max(0.0)
}

/// `upvotes / (hours_since_creation + 1)`.
///
/// Downvotes are deliberately ignored and age is measured from insertion,
/// not from the publish date. The SQL ordering in `ranking::query` computes
/// the same expression.
pub fn trending_score(upvotes: i32, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    f64::from(upvotes) / (hours_since(created_at, now) + 1.0)
}
