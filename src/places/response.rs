//! Response schema for `places:searchText`.

use serde::{Deserialize, Serialize};

/// One search hit, flattened to the fields anchors need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    pub display_name: String,
    pub language_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for PlaceResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.display_name, self.latitude, self.longitude
        )
    }
}

/// Raw API response (minimal fields).
#[derive(Debug, Default, Deserialize)]
struct SearchTextResponse {
    /// Omitted entirely when nothing matched.
    #[serde(default)]
    places: Vec<ApiPlace>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlace {
    display_name: LocalizedText,
    location: ApiLocation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalizedText {
    text: String,
    #[serde(default)]
    language_code: String,
}

#[derive(Debug, Deserialize)]
struct ApiLocation {
    latitude: f64,
    longitude: f64,
}

impl From<ApiPlace> for PlaceResult {
    fn from(place: ApiPlace) -> Self {
        Self {
            display_name: place.display_name.text,
            language_code: place.display_name.language_code,
            latitude: place.location.latitude,
            longitude: place.location.longitude,
        }
    }
}

/// Parsed successful response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub places: Vec<PlaceResult>,
    pub status: Option<String>,
}

/// Parse a 2xx body, preserving response order.
pub fn parse_search_response(body: &str) -> Result<ParsedResponse, serde_json::Error> {
    let raw: SearchTextResponse = serde_json::from_str(body)?;
    Ok(ParsedResponse {
        places: raw.places.into_iter().map(PlaceResult::from).collect(),
        status: raw.status,
    })
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Human-readable message for a non-2xx body.
///
/// Google APIs wrap failures as `{"error": {"message": .., "status": ..}}`;
/// anything else falls back to the trimmed body text.
pub fn remote_error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return match envelope.error.status {
            Some(status) if !envelope.error.message.is_empty() => {
                format!("{} ({status})", envelope.error.message)
            }
            Some(status) => status,
            None => envelope.error.message,
        };
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.chars().take(512).collect()
    }
}
