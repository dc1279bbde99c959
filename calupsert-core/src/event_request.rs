//! Event normalization.
//!
//! Turns the loosely-typed fields coming from the command line into a
//! validated [`NormalizedEvent`] that providers map onto their own schema.
//! Start and end are kept as wall-clock times plus an IANA zone, which is
//! what both Google Calendar and Microsoft Graph expect.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CalError, CalResult};
use crate::timezone::{parse_timezone, system_timezone};

/// Wall-clock format sent to providers.
const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Accepted local datetime layouts. `%.f` also matches when no fraction is present.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Raw event fields, with CLI aliases already resolved.
#[derive(Debug, Clone, Default)]
pub struct EventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    /// IANA zone id. Falls back to the system zone, then UTC.
    pub timezone: Option<String>,
    pub location: Option<String>,
    /// Present: update this event. Absent: create a new one.
    pub event_id: Option<String>,
    /// Absent: the provider's primary calendar.
    pub calendar_id: Option<String>,
}

/// A validated event, ready to be mapped onto a provider body.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub timezone: Tz,
}

/// `{"dateTime": "...", "timeZone": "..."}`, shared by both providers' event schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonedDateTime {
    pub date_time: String,
    pub time_zone: String,
}

impl EventRequest {
    /// Validate the request and attach the timezone to start and end.
    pub fn normalize(&self) -> CalResult<NormalizedEvent> {
        let title = non_blank(self.title.as_deref())
            .ok_or_else(|| CalError::validation("--title is required (or provide --subject/--summary)"))?;
        let start_raw = non_blank(self.start.as_deref())
            .ok_or_else(|| CalError::validation("--start is required"))?;
        let end_raw = non_blank(self.end.as_deref())
            .ok_or_else(|| CalError::validation("--end is required"))?;

        let timezone = match non_blank(self.timezone.as_deref()) {
            Some(name) => parse_timezone(name)?,
            None => system_timezone(),
        };

        let start = parse_local("start", start_raw, timezone)?;
        let end = parse_local("end", end_raw, timezone)?;

        let start_instant = attach_zone("start", start, timezone)?;
        let end_instant = attach_zone("end", end, timezone)?;

        if end_instant < start_instant {
            return Err(CalError::validation(format!(
                "End ({}) is before start ({})",
                end.format(WALL_CLOCK_FORMAT),
                start.format(WALL_CLOCK_FORMAT)
            )));
        }

        Ok(NormalizedEvent {
            title: title.to_string(),
            description: non_blank(self.description.as_deref()).map(str::to_string),
            location: non_blank(self.location.as_deref()).map(str::to_string),
            start,
            end,
            timezone,
        })
    }

    pub fn event_id(&self) -> Option<&str> {
        non_blank(self.event_id.as_deref())
    }

    pub fn calendar_id(&self) -> Option<&str> {
        non_blank(self.calendar_id.as_deref())
    }
}

impl NormalizedEvent {
    pub fn start_zoned(&self) -> ZonedDateTime {
        self.zoned(self.start)
    }

    pub fn end_zoned(&self) -> ZonedDateTime {
        self.zoned(self.end)
    }

    fn zoned(&self, wall_clock: NaiveDateTime) -> ZonedDateTime {
        ZonedDateTime {
            date_time: wall_clock.format(WALL_CLOCK_FORMAT).to_string(),
            time_zone: self.timezone.name().to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a local datetime. Inputs with an explicit offset are converted to
/// wall-clock time in `tz`; a bare date means midnight.
fn parse_local(label: &str, value: &str, tz: Tz) -> CalResult<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&tz).naive_local());
    }

    for format in LOCAL_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    Err(CalError::validation(format!(
        "Invalid {} datetime '{}': expected a local datetime such as 2025-10-17T09:00:00",
        label, value
    )))
}

/// Ambiguous wall-clock times (DST fall-back) resolve to the earlier instant.
fn attach_zone(label: &str, wall_clock: NaiveDateTime, tz: Tz) -> CalResult<DateTime<Tz>> {
    match tz.from_local_datetime(&wall_clock) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(CalError::validation(format!(
            "Invalid {} datetime '{}': that time does not exist in {} (daylight saving transition)",
            label,
            wall_clock.format(WALL_CLOCK_FORMAT),
            tz.name()
        ))),
    }
}
