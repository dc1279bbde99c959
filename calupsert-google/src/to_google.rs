use calupsert_core::event_request::{NormalizedEvent, ZonedDateTime};
use serde::Serialize;

/// Body for `events.insert` and `events.patch`.
#[derive(Debug, Serialize)]
pub struct GoogleEventBody {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: ZonedDateTime,
    pub end: ZonedDateTime,
}

pub fn to_google_event(event: &NormalizedEvent) -> GoogleEventBody {
    GoogleEventBody {
        summary: event.title.clone(),
        description: event.description.clone(),
        location: event.location.clone(),
        start: event.start_zoned(),
        end: event.end_zoned(),
    }
}

#[cfg(test)]
mod tests {
    use calupsert_core::event_request::EventRequest;
    use serde_json::json;

    use super::*;

    #[test]
    fn body_carries_wall_clock_and_zone() {
        let event = EventRequest {
            title: Some("Team sync".into()),
            start: Some("2025-10-17T09:00:00".into()),
            end: Some("2025-10-17T09:30:00".into()),
            timezone: Some("Europe/Rome".into()),
            ..Default::default()
        }
        .normalize()
        .unwrap();

        let body = serde_json::to_value(to_google_event(&event)).unwrap();
        assert_eq!(
            body,
            json!({
                "summary": "Team sync",
                "start": {"dateTime": "2025-10-17T09:00:00", "timeZone": "Europe/Rome"},
                "end": {"dateTime": "2025-10-17T09:30:00", "timeZone": "Europe/Rome"}
            })
        );
    }

    #[test]
    fn optional_fields_are_included_when_set() {
        let event = EventRequest {
            title: Some("Dentist".into()),
            description: Some("Bring card".into()),
            location: Some("Via Roma 1".into()),
            start: Some("2025-11-03 15:00".into()),
            end: Some("2025-11-03 16:00".into()),
            timezone: Some("UTC".into()),
            ..Default::default()
        }
        .normalize()
        .unwrap();

        let body = serde_json::to_value(to_google_event(&event)).unwrap();
        assert_eq!(body["description"], "Bring card");
        assert_eq!(body["location"], "Via Roma 1");
        assert_eq!(body["start"]["dateTime"], "2025-11-03T15:00:00");
    }
}
