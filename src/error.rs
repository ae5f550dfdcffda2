use chrono::NaiveDate;
use reqwest::StatusCode;

/// Non-success reply from the AEMET API.
///
/// Returned (wrapped in `anyhow::Error`) when the envelope carries an `estado`
/// other than 200, or when it succeeds but has no `datos` link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("AEMET API error {status} for url ({url}): {description}")]
pub struct ApiError {
    /// Upstream `estado`, or the HTTP status when no envelope could be parsed.
    pub status: u16,
    /// Upstream `descripcion`.
    pub description: String,
    pub url: String,
}

/// A date range whose start lies after its end.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date range: start {start} is after end {end}")]
pub struct InvalidRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub(crate) fn format_api_error(status: u16, url: &str, description: &str) -> anyhow::Error {
    let description = description.trim();

    // 401 is by far the most common failure; the token is sent on every call.
    if status == StatusCode::UNAUTHORIZED.as_u16() {
        let hint = if description.is_empty() {
            "API key invalid or expired"
        } else {
            description
        };
        return ApiError {
            status,
            description: format!(
                "{}\n- Check AEMET_API_TOKEN (request a key at https://opendata.aemet.es/centrodedescargas/obtencionAPIKey)",
                hint
            ),
            url: url.to_string(),
        }
        .into();
    }

    ApiError {
        status,
        description: if description.is_empty() {
            "(no description)".to_string()
        } else {
            description.to_string()
        },
        url: url.to_string(),
    }
    .into()
}
