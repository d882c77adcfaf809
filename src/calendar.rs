//! Calendar/Times Client for the Hebcal-style endpoints.
//!
//! Two independent feeds back one dashboard snapshot: the day-specific
//! zmanim (prayer times) keyed by postal code, and the weekly calendar
//! feed that carries the parsha title. The combination is fail-closed:
//! if either call fails the whole operation returns [`LookupError`] and
//! no partial snapshot is produced.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::errors::LookupError;
use crate::logging::log_event;

pub const DEFAULT_CALENDAR_BASE: &str = "https://www.hebcal.com";

/// Title used when the weekly feed has no parsha entry (festival weeks).
/// Absence of the reading is not an error.
pub const UNKNOWN_READING: &str = "Unknown";

// The weekly feed is keyed by geoname rather than postal code; this is
// Brooklyn, matching the original default ZIP 11213.
const DEFAULT_GEONAME_ID: &str = "5110302";

/// Dashboard snapshot, derived fresh on every call and never persisted.
/// A `None` time field means the upstream payload lacked that value.
#[derive(Debug, Clone, Serialize)]
pub struct TimesSnapshot {
    pub sunrise: Option<String>,
    pub shema_cutoff: Option<String>,
    pub sunset: Option<String>,
    pub weekly_reading_title: String,
}

#[derive(Clone)]
pub struct CalendarClient {
    client: Client,
    base_url: String,
    geoname_id: String,
}

impl CalendarClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_CALENDAR_BASE)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            geoname_id: DEFAULT_GEONAME_ID.to_string(),
        }
    }

    /// Override the geoname used for the weekly calendar feed.
    pub fn with_geoname_id(mut self, geoname_id: impl Into<String>) -> Self {
        self.geoname_id = geoname_id.into();
        self
    }

    /// Fetch today's times plus the current weekly reading. Fail-closed:
    /// either upstream failure fails the whole call.
    pub async fn fetch_times(&self, postal_code: &str) -> Result<TimesSnapshot, LookupError> {
        let base = self.base_url.trim_end_matches('/');
        let date = OffsetDateTime::now_utc().date().to_string();
        let zmanim_url = format!(
            "{base}/zmanim?cfg=json&zip={}&date={date}",
            postal_code.trim()
        );
        let calendar_url = format!("{base}/shabbat?cfg=json&geonameid={}&M=on", self.geoname_id);

        let zmanim: Value = self
            .client
            .get(zmanim_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let calendar: Value = self
            .client
            .get(calendar_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let snapshot = build_snapshot(&zmanim, &calendar);
        log_event(
            log::Level::Info,
            "CAL-0200",
            "calendar",
            "times snapshot assembled",
            Some(serde_json::json!({
                "zip": postal_code,
                "reading": snapshot.weekly_reading_title,
            })),
        );
        Ok(snapshot)
    }
}

fn build_snapshot(zmanim: &Value, calendar: &Value) -> TimesSnapshot {
    TimesSnapshot {
        sunrise: time_field(zmanim, "sunrise"),
        shema_cutoff: time_field(zmanim, "sof_zman_shma"),
        sunset: time_field(zmanim, "sunset"),
        weekly_reading_title: parsha_title(calendar),
    }
}

fn time_field(zmanim: &Value, key: &str) -> Option<String> {
    zmanim
        .get("times")?
        .get(key)?
        .as_str()
        .and_then(truncate_to_minutes)
}

/// Reduce an ISO-8601 timestamp to hour:minute, e.g.
/// `2024-01-01T07:12:00-05:00` → `07:12`.
///
/// A malformed upstream value yields `None`, never a panic; `get`
/// guards against a non-ASCII character straddling the cut.
fn truncate_to_minutes(stamp: &str) -> Option<String> {
    let clock = stamp.split_once('T')?.1.get(..5)?;
    let bytes = clock.as_bytes();
    let shaped = bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2] == b':'
        && bytes[3].is_ascii_digit()
        && bytes[4].is_ascii_digit();
    shaped.then(|| clock.to_string())
}

/// The parsha is the first calendar item tagged with the parashat
/// category; a week without one yields the [`UNKNOWN_READING`] sentinel.
fn parsha_title(calendar: &Value) -> String {
    calendar
        .get("items")
        .and_then(Value::as_array)
        .and_then(|items| {
            items.iter().find(|item| {
                item.get("category").and_then(Value::as_str) == Some("parashat")
            })
        })
        .and_then(|item| item.get("title"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_READING.to_string())
}
