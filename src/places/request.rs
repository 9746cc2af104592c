//! Request builder for `places:searchText`.
//!
//! Construction is pure: no I/O and no failure modes. Bad inputs surface
//! later as a 4xx from the remote side.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::redact;

pub const DEFAULT_ENDPOINT: &str = "https://places.googleapis.com/v1/places:searchText";

/// Restricts the response to the two fields the materializer consumes.
pub const FIELD_MASK: &str = "places.displayName,places.location";

/// Radius of the circular location bias around the origin.
pub const SEARCH_RADIUS_METERS: f64 = 10_000.0;

pub const API_KEY_HEADER: &str = "X-Goog-Api-Key";
pub const FIELD_MASK_HEADER: &str = "X-Goog-FieldMask";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A text search biased toward a point.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text_query: String,
    pub bias_latitude: f64,
    pub bias_longitude: f64,
    pub bias_radius_meters: f64,
}

impl SearchQuery {
    pub fn new(text_query: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            text_query: text_query.into(),
            bias_latitude: latitude,
            bias_longitude: longitude,
            bias_radius_meters: SEARCH_RADIUS_METERS,
        }
    }

    /// Typed form of the wire body.
    pub fn body(&self) -> SearchTextBody {
        SearchTextBody {
            text_query: self.text_query.clone(),
            location_bias: LocationBias {
                circle: Circle {
                    center: LatLng {
                        latitude: self.bias_latitude,
                        longitude: self.bias_longitude,
                    },
                    radius: self.bias_radius_meters,
                },
            },
        }
    }

    /// Wire body as a JSON value. Non-finite coordinates become `null`.
    pub fn body_json(&self) -> Value {
        json!({
            "textQuery": self.text_query,
            "locationBias": {
                "circle": {
                    "center": {
                        "latitude": self.bias_latitude,
                        "longitude": self.bias_longitude,
                    },
                    "radius": self.bias_radius_meters,
                },
            },
        })
    }

    /// Serialize into a POST against `endpoint` carrying `api_key`.
    pub fn to_request(&self, endpoint: &str, api_key: &str) -> PlacesRequest {
        PlacesRequest {
            url: endpoint.to_string(),
            api_key: api_key.to_string(),
            body: self.body_json().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTextBody {
    pub text_query: String,
    pub location_bias: LocationBias,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationBias {
    pub circle: Circle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: LatLng,
    pub radius: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

/// A fully formed outbound POST.
#[derive(Clone, PartialEq)]
pub struct PlacesRequest {
    pub url: String,
    pub api_key: String,
    pub body: String,
}

impl std::fmt::Debug for PlacesRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesRequest")
            .field("url", &self.url)
            .field("api_key", &redact(&self.api_key))
            .field("body", &self.body)
            .finish()
    }
}

impl PlacesRequest {
    /// Headers in send order.
    pub fn headers(&self) -> [(&'static str, &str); 3] {
        [
            ("Content-Type", CONTENT_TYPE_JSON),
            (API_KEY_HEADER, self.api_key.as_str()),
            (FIELD_MASK_HEADER, FIELD_MASK),
        ]
    }

    /// Equivalent curl invocation with the credential redacted.
    pub fn to_curl(&self) -> String {
        let mut parts = vec![
            "curl".to_string(),
            "-X".to_string(),
            "POST".to_string(),
            shell_words::quote(&self.url).into_owned(),
        ];
        for (name, value) in self.headers() {
            let value = if name == API_KEY_HEADER {
                "$PLACES_API_KEY".to_string()
            } else {
                value.to_string()
            };
            parts.push("-H".to_string());
            // Double quotes so `$PLACES_API_KEY` expands when pasted.
            parts.push(format!("\"{name}: {value}\""));
        }
        parts.push("-d".to_string());
        parts.push(shell_words::quote(&self.body).into_owned());
        parts.join(" ")
    }
}

/// Build a request against the public endpoint.
pub fn build_search_request(
    api_key: &str,
    query_text: &str,
    latitude: f64,
    longitude: f64,
) -> (SearchQuery, PlacesRequest) {
    let query = SearchQuery::new(query_text, latitude, longitude);
    let request = query.to_request(DEFAULT_ENDPOINT, api_key);
    (query, request)
}
