//! Microsoft Graph v1.0 calendar event endpoints.

use async_trait::async_trait;
use calupsert_core::error::{CalError, CalResult};
use calupsert_core::event_request::NormalizedEvent;
use calupsert_core::http::read_json;
use calupsert_core::provider::{CalendarProvider, CalendarTarget, RemoteEvent};
use serde::Deserialize;
use url::Url;

use crate::to_graph::to_graph_event;

pub const API_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Ids that mean the signed-in user's default calendar.
const DEFAULT_CALENDAR_ALIASES: &[&str] = &["calendar", "primary"];

const PROVIDER_NAME: &str = "Microsoft Graph";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventResponse {
    id: String,
    web_link: Option<String>,
}

impl From<EventResponse> for RemoteEvent {
    fn from(resp: EventResponse) -> Self {
        RemoteEvent {
            id: resp.id,
            link: resp.web_link,
        }
    }
}

pub struct GraphCalendar {
    http: reqwest::Client,
    base_url: Url,
}

impl GraphCalendar {
    pub fn new(http: reqwest::Client) -> CalResult<Self> {
        Self::with_base_url(http, API_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: &str) -> CalResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CalError::Config(format!("Invalid API base URL '{}': {}", base_url, e)))?;
        Ok(GraphCalendar { http, base_url })
    }

    /// `/me/calendar/events[/{id}]` or `/me/calendars/{calendar}/events[/{id}]`.
    fn events_url(&self, calendar: &CalendarTarget, event_id: Option<&str>) -> CalResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CalError::Config(format!("Unusable API base URL {}", self.base_url)))?;
            segments.pop_if_empty().push("me");
            match calendar {
                CalendarTarget::Primary => segments.push("calendar"),
                CalendarTarget::Named(id) => segments.extend(["calendars", id.as_str()]),
            };
            segments.push("events");
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl CalendarProvider for GraphCalendar {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn link_label(&self) -> &'static str {
        "webLink"
    }

    fn resolve_calendar(&self, calendar_id: Option<&str>) -> CalendarTarget {
        CalendarTarget::resolve(calendar_id, DEFAULT_CALENDAR_ALIASES)
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
            .json(&to_graph_event(event))
            .send()
            .await?;

        let created: EventResponse = read_json(PROVIDER_NAME, response).await?;
        Ok(created.into())
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
            .json(&to_graph_event(event))
            .send()
            .await?;

        let updated: EventResponse = read_json(PROVIDER_NAME, response).await?;
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use calupsert_core::event_request::EventRequest;
    use calupsert_core::upsert::{UpsertKind, upsert};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn team_sync() -> NormalizedEvent {
        EventRequest {
            title: Some("Team sync".into()),
            start: Some("2025-10-17T09:00:00".into()),
            end: Some("2025-10-17T09:30:00".into()),
            timezone: Some("Europe/Rome".into()),
            ..Default::default()
        }
        .normalize()
        .unwrap()
    }

    fn provider(server: &MockServer) -> GraphCalendar {
        GraphCalendar::with_base_url(reqwest::Client::new(), &server.uri()).unwrap()
    }

    #[test]
    fn urls_for_default_and_named_calendars() {
        let graph = GraphCalendar::new(reqwest::Client::new()).unwrap();

        assert_eq!(
            graph.events_url(&CalendarTarget::Primary, None).unwrap().as_str(),
            "https://graph.microsoft.com/v1.0/me/calendar/events"
        );
        assert_eq!(
            graph
                .events_url(&CalendarTarget::Named("AAMk=".into()), Some("AAMkEv/1"))
                .unwrap()
                .as_str(),
            "https://graph.microsoft.com/v1.0/me/calendars/AAMk=/events/AAMkEv%2F1"
        );
    }

    #[test]
    fn calendar_alias_means_default() {
        let graph = GraphCalendar::new(reqwest::Client::new()).unwrap();
        assert_eq!(graph.resolve_calendar(Some("calendar")), CalendarTarget::Primary);
        assert_eq!(graph.resolve_calendar(Some("primary")), CalendarTarget::Primary);
        assert_eq!(
            graph.resolve_calendar(Some("AAMk")),
            CalendarTarget::Named("AAMk".into())
        );
    }

    #[tokio::test]
    async fn create_posts_to_default_calendar() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/calendar/events"))
            .and(header("authorization", "Bearer graph-token"))
            .and(body_partial_json(json!({
                "subject": "Team sync",
                "start": {"dateTime": "2025-10-17T09:00:00", "timeZone": "Europe/Rome"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "AAMkNew",
                "webLink": "https://outlook.office365.com/owa/?itemid=AAMkNew"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = upsert(&provider(&server), "graph-token", &team_sync(), None, None)
            .await
            .unwrap();

        assert_eq!(result.kind, UpsertKind::Created);
        assert_eq!(
            result.render("webLink"),
            "OK event_id=AAMkNew\nwebLink=https://outlook.office365.com/owa/?itemid=AAMkNew"
        );
    }

    #[tokio::test]
    async fn update_patches_event_in_named_calendar() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/me/calendars/work/events/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "abc123" })))
            .expect(1)
            .mount(&server)
            .await;

        let result = upsert(&provider(&server), "tok", &team_sync(), Some("abc123"), Some("work"))
            .await
            .unwrap();
        assert_eq!(result.kind, UpsertKind::Updated);
        assert_eq!(result.remote_event_id, "abc123");
    }

    #[tokio::test]
    async fn update_on_default_calendar_uses_calendar_path() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/me/calendar/events/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "abc123" })))
            .expect(1)
            .mount(&server)
            .await;

        upsert(&provider(&server), "tok", &team_sync(), Some("abc123"), Some("calendar"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn two_creates_yield_two_events() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/calendar/events"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "one" })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/me/calendar/events"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "two" })))
            .mount(&server)
            .await;

        let graph = provider(&server);
        let a = upsert(&graph, "tok", &team_sync(), None, None).await.unwrap();
        let b = upsert(&graph, "tok", &team_sync(), None, None).await.unwrap();
        assert_ne!(a.remote_event_id, b.remote_event_id);
    }

    #[tokio::test]
    async fn expired_token_is_an_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/calendar/events"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": "InvalidAuthenticationToken", "message": "Access token has expired."}
            })))
            .mount(&server)
            .await;

        let err = upsert(&provider(&server), "stale", &team_sync(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CalError::Authentication(ref m) if m.contains("expired")));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn missing_event_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/me/calendar/events/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "ErrorItemNotFound", "message": "The specified object was not found in the store."}
            })))
            .mount(&server)
            .await;

        let err = upsert(&provider(&server), "tok", &team_sync(), Some("gone"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CalError::NotFound(_)));
    }
}
