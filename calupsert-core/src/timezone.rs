//! Timezone resolution.

use chrono_tz::Tz;

use crate::error::{CalError, CalResult};

/// Parse an IANA timezone identifier such as `Europe/Rome` or `UTC`.
pub fn parse_timezone(name: &str) -> CalResult<Tz> {
    let name = name.trim();
    name.parse::<Tz>().map_err(|_| {
        CalError::validation(format!(
            "Unknown timezone '{}': expected an IANA id such as Europe/Rome or UTC",
            name
        ))
    })
}

/// The zone the machine is configured with, or UTC when it can't be determined.
pub fn system_timezone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            tracing::debug!(zone = %name, "system timezone is not an IANA id, using UTC");
            Tz::UTC
        }),
        Err(e) => {
            tracing::debug!(error = %e, "could not read system timezone, using UTC");
            Tz::UTC
        }
    }
}
