use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

const GMT7_SUFFIX: &str = " GMT+7";
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a publication date as sent by the backend. Besides RFC 3339 and
/// RFC 2822 the backend emits naive timestamps, optionally suffixed with
/// " GMT+7"; naive values without the suffix are taken as UTC.
pub fn parse_pub_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(local) = s.strip_suffix(GMT7_SUFFIX) {
        let offset = FixedOffset::east_opt(7 * 3600)?;
        return parse_naive(local.trim())
            .and_then(|naive| offset.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc));
    }

    parse_naive(s).map(|naive| naive.and_utc())
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Human-readable age of an article: seconds, minutes or hours for the last
/// day, the calendar date beyond that or for dates in the future.
pub fn format_relative(pub_date: &str, now: DateTime<Utc>) -> String {
    let Some(published) = parse_pub_date(pub_date) else {
        return "unknown".to_string();
    };

    let elapsed = now.signed_duration_since(published);
    if elapsed.num_milliseconds() < 0 || elapsed.num_hours() >= 24 {
        return published.format("%d/%m/%Y").to_string();
    }

    let hours = elapsed.num_hours();
    let minutes = elapsed.num_minutes();
    if hours > 0 {
        format!("{} {} ago", hours, plural(hours, "hour"))
    } else if minutes > 0 {
        format!("{} {} ago", minutes, plural(minutes, "minute"))
    } else {
        let seconds = elapsed.num_seconds();
        format!("{} {} ago", seconds, plural(seconds, "second"))
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        unit.to_string()
    } else {
        format!("{}s", unit)
    }
}
