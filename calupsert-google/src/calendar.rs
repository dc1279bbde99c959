//! Google Calendar API v3 event endpoints.

use async_trait::async_trait;
use calupsert_core::error::{CalError, CalResult};
use calupsert_core::event_request::NormalizedEvent;
use calupsert_core::http::read_json;
use calupsert_core::provider::{CalendarProvider, CalendarTarget, RemoteEvent};
use serde::Deserialize;
use url::Url;

use crate::to_google::to_google_event;

pub const API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Google's alias for the user's main calendar
const DEFAULT_CALENDAR_ID: &str = "primary";

const PROVIDER_NAME: &str = "Google Calendar";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventResponse {
    id: String,
    html_link: Option<String>,
}

pub struct GoogleCalendar {
    http: reqwest::Client,
    base_url: Url,
}

impl GoogleCalendar {
    pub fn new(http: reqwest::Client) -> CalResult<Self> {
        Self::with_base_url(http, API_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: &str) -> CalResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CalError::Config(format!("Invalid API base URL '{}': {}", base_url, e)))?;
        Ok(GoogleCalendar { http, base_url })
    }

    /// `{base}/calendars/{calendar}/events[/{event_id}]`, segments percent-encoded.
    fn events_url(&self, calendar: &CalendarTarget, event_id: Option<&str>) -> CalResult<Url> {
        let calendar_id = match calendar {
            CalendarTarget::Primary => DEFAULT_CALENDAR_ID,
            CalendarTarget::Named(id) => id.as_str(),
        };

        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CalError::Config(format!("Unusable API base URL {}", self.base_url)))?;
            segments
                .pop_if_empty()
                .extend(["calendars", calendar_id, "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendar {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn link_label(&self) -> &'static str {
        "htmlLink"
    }

    fn resolve_calendar(&self, calendar_id: Option<&str>) -> CalendarTarget {
        CalendarTarget::resolve(calendar_id, &[DEFAULT_CALENDAR_ID])
    }

    async fn create_event(
        &self,
        access_token: &str,
        calendar: &CalendarTarget,
        event: &NormalizedEvent,
    ) -> CalResult<RemoteEvent> {
        let url = self.events_url(calendar, None)?;
        tracing::debug!(%url, "POST event");

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(&to_google_event(event))
            .send()
            .await?;

        let created: EventResponse = read_json(PROVIDER_NAME, response).await?;
        Ok(RemoteEvent {
            id: created.id,
            link: created.html_link,
        })
    }

    async fn update_event(
        &self,
        access_token: &str,
        calendar: &CalendarTarget,
        event_id: &str,
        event: &NormalizedEvent,
    ) -> CalResult<RemoteEvent> {
        let url = self.events_url(calendar, Some(event_id))?;
        tracing::debug!(%url, "PATCH event");

        let response = self
            .http
            .patch(url)
            .bearer_auth(access_token)
            .json(&to_google_event(event))
            .send()
            .await?;

        let updated: EventResponse = read_json(PROVIDER_NAME, response).await?;
        Ok(RemoteEvent {
            id: updated.id,
            link: updated.html_link,
        })
    }
}
