//! The calendar provider capability.
//!
//! Each remote service (Google Calendar, Microsoft Graph) implements
//! [`CalendarProvider`]. The upsert dispatcher only talks to this trait, so
//! provider schema differences stay inside the provider crates.

use async_trait::async_trait;

use crate::error::CalResult;
use crate::event_request::NormalizedEvent;

/// Which calendar an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarTarget {
    /// The signed-in user's default calendar.
    Primary,
    /// A calendar addressed by its provider id.
    Named(String),
}

impl CalendarTarget {
    /// Resolve an optional calendar id, treating any of `primary_aliases`
    /// (case-insensitive) the same as no id at all.
    pub fn resolve(calendar_id: Option<&str>, primary_aliases: &[&str]) -> Self {
        match calendar_id.map(str::trim).filter(|id| !id.is_empty()) {
            None => CalendarTarget::Primary,
            Some(id) if primary_aliases.iter().any(|a| a.eq_ignore_ascii_case(id)) => {
                CalendarTarget::Primary
            }
            Some(id) => CalendarTarget::Named(id.to_string()),
        }
    }
}

/// What a provider hands back after a successful create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    pub id: String,
    pub link: Option<String>,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Human-readable provider name, used in error messages.
    fn name(&self) -> &'static str;

    /// Label printed before the event link (`htmlLink`, `webLink`).
    fn link_label(&self) -> &'static str;

    fn resolve_calendar(&self, calendar_id: Option<&str>) -> CalendarTarget;

    async fn create_event(
        &self,
        access_token: &str,
        calendar: &CalendarTarget,
        event: &NormalizedEvent,
    ) -> CalResult<RemoteEvent>;

    async fn update_event(
        &self,
        access_token: &str,
        calendar: &CalendarTarget,
        event_id: &str,
        event: &NormalizedEvent,
    ) -> CalResult<RemoteEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_id_is_primary() {
        assert_eq!(CalendarTarget::resolve(None, &[]), CalendarTarget::Primary);
        assert_eq!(CalendarTarget::resolve(Some("  "), &[]), CalendarTarget::Primary);
    }

    #[test]
    fn aliases_map_to_primary() {
        let aliases = ["calendar", "primary"];
        assert_eq!(
            CalendarTarget::resolve(Some("Calendar"), &aliases),
            CalendarTarget::Primary
        );
        assert_eq!(
            CalendarTarget::resolve(Some("PRIMARY"), &aliases),
            CalendarTarget::Primary
        );
    }

    #[test]
    fn other_ids_are_named() {
        assert_eq!(
            CalendarTarget::resolve(Some("team@group.calendar.google.com"), &["primary"]),
            CalendarTarget::Named("team@group.calendar.google.com".into())
        );
    }
}
