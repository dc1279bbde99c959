use calupsert_core::event_request::{NormalizedEvent, ZonedDateTime};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub display_name: String,
}

/// Body for `POST .../events` and `PATCH .../events/{id}`.
#[derive(Debug, Serialize)]
pub struct GraphEventBody {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ItemBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub start: ZonedDateTime,
    pub end: ZonedDateTime,
}

/// Graph accepts IANA zone names in `timeZone` alongside Windows names.
pub fn to_graph_event(event: &NormalizedEvent) -> GraphEventBody {
    GraphEventBody {
        subject: event.title.clone(),
        body: event.description.as_ref().map(|content| ItemBody {
            content_type: "text",
            content: content.clone(),
        }),
        location: event.location.as_ref().map(|name| Location {
            display_name: name.clone(),
        }),
        start: event.start_zoned(),
        end: event.end_zoned(),
    }
}
