//! Places text search: request building, transport, and the request lifecycle.
//!
//! - **request**: pure construction of the `places:searchText` POST
//! - **response**: response schema and [`PlaceResult`]
//! - **transport**: the network seam ([`PlacesTransport`]) and its `reqwest` implementation
//! - **session**: [`SearchSession`], owner of the in-flight request and the last results
//!
//! # Usage
//!
//! ```rust,ignore
//! use places_anchors::places::SearchSession;
//! use places_anchors::scene::SceneDocument;
//!
//! let scene = SceneDocument::load(path)?;
//! let mut session = SearchSession::connect(config)?;
//! session.start_search(&scene)?;
//! session.wait_for_completion().await;
//! println!("{} results", session.last_results().map_or(0, |r| r.len()));
//! ```

pub mod request;
pub mod response;
pub mod session;
pub mod transport;

pub use request::{PlacesRequest, SearchQuery, build_search_request};
pub use response::PlaceResult;
pub use session::{Completion, CompletionOutcome, RequestId, SearchSession, SessionState, SessionStats};
pub use transport::{HttpOutcome, HttpTransport, PlacesTransport};
