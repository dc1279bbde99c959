//! Upsert dispatch: create when no event id is given, update otherwise.
//!
//! There is no idempotency key on create. Running the same create twice
//! produces two remote events; callers that want an update must pass the id
//! printed by the first run.

use tokio_util::sync::CancellationToken;

use crate::error::CalResult;
use crate::event_request::{EventRequest, NormalizedEvent};
use crate::provider::{CalendarProvider, RemoteEvent};
use crate::session::{Authenticator, SessionManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertResult {
    pub remote_event_id: String,
    pub provider_link: Option<String>,
    pub kind: UpsertKind,
}

impl UpsertResult {
    fn from_remote(remote: RemoteEvent, kind: UpsertKind) -> Self {
        UpsertResult {
            remote_event_id: remote.id,
            provider_link: remote.link,
            kind,
        }
    }

    /// Script-friendly output: `OK event_id=<id>` plus `<label>=<link>` when known.
    pub fn render(&self, link_label: &str) -> String {
        let mut out = format!("OK event_id={}", self.remote_event_id);
        if let Some(link) = &self.provider_link {
            out.push_str(&format!("\n{}={}", link_label, link));
        }
        out
    }
}

/// Issue exactly one create or update call against the provider.
pub async fn upsert<P>(
    provider: &P,
    access_token: &str,
    event: &NormalizedEvent,
    event_id: Option<&str>,
    calendar_id: Option<&str>,
) -> CalResult<UpsertResult>
where
    P: CalendarProvider + ?Sized,
{
    let calendar = provider.resolve_calendar(calendar_id);

    let result = match event_id {
        Some(id) => {
            tracing::info!(provider = provider.name(), event_id = id, ?calendar, "updating event");
            let remote = provider
                .update_event(access_token, &calendar, id, event)
                .await?;
            UpsertResult::from_remote(remote, UpsertKind::Updated)
        }
        None => {
            tracing::info!(provider = provider.name(), ?calendar, "creating event");
            let remote = provider.create_event(access_token, &calendar, event).await?;
            UpsertResult::from_remote(remote, UpsertKind::Created)
        }
    };

    tracing::info!(kind = ?result.kind, event_id = %result.remote_event_id, "upsert finished");
    Ok(result)
}

/// Full invocation: normalize, then obtain a credential, then upsert.
///
/// Normalization runs first so that bad input never triggers an OAuth prompt.
pub async fn execute<P, A>(
    provider: &P,
    sessions: &SessionManager<A>,
    request: &EventRequest,
    cancel: &CancellationToken,
) -> CalResult<UpsertResult>
where
    P: CalendarProvider + ?Sized,
    A: Authenticator,
{
    let event = request.normalize()?;
    tracing::debug!(?event, "normalized event");

    let credential = sessions.establish(cancel).await?;

    upsert(
        provider,
        &credential.access_token,
        &event,
        request.event_id(),
        request.calendar_id(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::error::CalError;
    use crate::provider::CalendarTarget;
    use crate::token_cache::{Credential, TokenCache};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(CalendarTarget),
        Update(CalendarTarget, String),
    }

    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<Call>>,
        tokens: Mutex<Vec<String>>,
        next_id: AtomicUsize,
    }

    impl RecordingProvider {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn tokens(&self) -> Vec<String> {
            self.tokens.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CalendarProvider for RecordingProvider {
        fn name(&self) -> &'static str {
            "Recording"
        }

        fn link_label(&self) -> &'static str {
            "link"
        }

        fn resolve_calendar(&self, calendar_id: Option<&str>) -> CalendarTarget {
            CalendarTarget::resolve(calendar_id, &["primary"])
        }

        async fn create_event(
            &self,
            access_token: &str,
            calendar: &CalendarTarget,
            _event: &NormalizedEvent,
        ) -> CalResult<RemoteEvent> {
            self.tokens.lock().unwrap().push(access_token.to_string());
            self.calls.lock().unwrap().push(Call::Create(calendar.clone()));
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteEvent {
                id: format!("evt-{n}"),
                link: Some(format!("https://example.test/evt-{n}")),
            })
        }

        async fn update_event(
            &self,
            access_token: &str,
            calendar: &CalendarTarget,
            event_id: &str,
            _event: &NormalizedEvent,
        ) -> CalResult<RemoteEvent> {
            self.tokens.lock().unwrap().push(access_token.to_string());
            self.calls
                .lock()
                .unwrap()
                .push(Call::Update(calendar.clone(), event_id.to_string()));
            if event_id == "missing" {
                return Err(CalError::NotFound(format!("event {event_id}")));
            }
            Ok(RemoteEvent {
                id: event_id.to_string(),
                link: None,
            })
        }
    }

    /// Counts every OAuth call and hands out a fixed interactive token.
    #[derive(Default)]
    struct CountingAuth {
        refreshes: AtomicUsize,
        authorizations: AtomicUsize,
    }

    #[async_trait]
    impl Authenticator for CountingAuth {
        fn client_id(&self) -> &str {
            "client-1"
        }

        async fn refresh(&self, _refresh_token: &str) -> CalResult<Credential> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Err(CalError::Authentication("refresh not expected".into()))
        }

        async fn authorize(&self, _cancel: &CancellationToken) -> CalResult<Credential> {
            self.authorizations.fetch_add(1, Ordering::SeqCst);
            Ok(Credential {
                access_token: "signed-in-token".into(),
                refresh_token: Some("signed-in-refresh".into()),
                expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
                client_id: "client-1".into(),
                scopes: vec![],
            })
        }
    }

    fn session_manager(dir: &tempfile::TempDir) -> SessionManager<CountingAuth> {
        SessionManager::new(
            TokenCache::new(dir.path().join("token.json")),
            CountingAuth::default(),
            Duration::from_secs(5),
        )
    }

    fn team_sync_request() -> EventRequest {
        EventRequest {
            title: Some("Team sync".into()),
            start: Some("2025-10-17T09:00:00".into()),
            end: Some("2025-10-17T09:30:00".into()),
            timezone: Some("Europe/Rome".into()),
            ..Default::default()
        }
    }

    fn team_sync() -> NormalizedEvent {
        team_sync_request().normalize().unwrap()
    }

    #[tokio::test]
    async fn no_event_id_creates_on_primary() {
        let provider = RecordingProvider::default();
        let result = upsert(&provider, "tok", &team_sync(), None, None).await.unwrap();

        assert_eq!(result.kind, UpsertKind::Created);
        assert_eq!(result.remote_event_id, "evt-0");
        assert_eq!(provider.calls(), vec![Call::Create(CalendarTarget::Primary)]);
    }

    #[tokio::test]
    async fn event_id_updates_that_event() {
        let provider = RecordingProvider::default();
        let result = upsert(&provider, "tok", &team_sync(), Some("abc123"), None)
            .await
            .unwrap();

        assert_eq!(result.kind, UpsertKind::Updated);
        assert_eq!(result.remote_event_id, "abc123");
        assert_eq!(
            provider.calls(),
            vec![Call::Update(CalendarTarget::Primary, "abc123".into())]
        );
    }

    #[tokio::test]
    async fn calendar_id_targets_named_calendar() {
        let provider = RecordingProvider::default();
        upsert(&provider, "tok", &team_sync(), None, Some("work")).await.unwrap();
        upsert(&provider, "tok", &team_sync(), Some("abc123"), Some("work"))
            .await
            .unwrap();

        assert_eq!(
            provider.calls(),
            vec![
                Call::Create(CalendarTarget::Named("work".into())),
                Call::Update(CalendarTarget::Named("work".into()), "abc123".into()),
            ]
        );
    }

    #[tokio::test]
    async fn repeated_creates_are_not_deduplicated() {
        let provider = RecordingProvider::default();
        let first = upsert(&provider, "tok", &team_sync(), None, None).await.unwrap();
        let second = upsert(&provider, "tok", &team_sync(), None, None).await.unwrap();

        assert_ne!(first.remote_event_id, second.remote_event_id);
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn provider_errors_propagate_unchanged() {
        let provider = RecordingProvider::default();
        let err = upsert(&provider, "tok", &team_sync(), Some("missing"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CalError::NotFound(_)));
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn invalid_input_fails_before_any_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = session_manager(&dir);
        let provider = RecordingProvider::default();

        let backwards = EventRequest {
            end: Some("2025-10-17T08:00:00".into()),
            ..team_sync_request()
        };
        let unknown_zone = EventRequest {
            timezone: Some("Mars/Olympus_Mons".into()),
            ..team_sync_request()
        };

        for request in [backwards, unknown_zone] {
            let err = execute(&provider, &sessions, &request, &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, CalError::Validation(_)), "got {err:?}");
        }

        assert_eq!(sessions.authenticator().refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(sessions.authenticator().authorizations.load(Ordering::SeqCst), 0);
        assert_eq!(sessions.cache().load().unwrap(), None);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn valid_input_signs_in_then_upserts_with_that_token() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = session_manager(&dir);
        let provider = RecordingProvider::default();
        let request = EventRequest {
            event_id: Some("abc123".into()),
            calendar_id: Some("work".into()),
            ..team_sync_request()
        };

        let result = execute(&provider, &sessions, &request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.kind, UpsertKind::Updated);
        assert_eq!(sessions.authenticator().authorizations.load(Ordering::SeqCst), 1);
        assert_eq!(provider.tokens(), vec!["signed-in-token".to_string()]);
        assert_eq!(
            provider.calls(),
            vec![Call::Update(CalendarTarget::Named("work".into()), "abc123".into())]
        );
        assert!(sessions.cache().load().unwrap().is_some());
    }

    #[test]
    fn render_prints_id_and_optional_link() {
        let with_link = UpsertResult {
            remote_event_id: "abc".into(),
            provider_link: Some("https://cal.example/abc".into()),
            kind: UpsertKind::Created,
        };
        assert_eq!(
            with_link.render("htmlLink"),
            "OK event_id=abc\nhtmlLink=https://cal.example/abc"
        );

        let without_link = UpsertResult {
            provider_link: None,
            ..with_link
        };
        assert_eq!(without_link.render("webLink"), "OK event_id=abc");
    }
}
