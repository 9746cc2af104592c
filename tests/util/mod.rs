use places_anchors::config::PlacesConfig;
use places_anchors::error::TransportError;
use places_anchors::places::request::SearchTextBody;
use places_anchors::places::{HttpOutcome, PlacesRequest, PlacesTransport, SearchSession};
use places_anchors::scene::{Anchor, GeoOrigin, SceneDocument};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const LIBRARY_BODY: &str = r#"{"places":[{"displayName":{"text":"Library"},"location":{"latitude":37.7,"longitude":-122.4}}]}"#;

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: Arc<Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Assert that the captured log output contains the provided substring.
    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct TestWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Scripted reply for one request.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(u16, String),
    Fail(TransportError),
    /// Never completes; only cancellation ends it.
    Hang,
}

#[allow(dead_code)]
impl Reply {
    pub fn ok(body: &str) -> Self {
        Self::Respond(200, body.to_string())
    }
}

/// Transport answering by query text, so replies do not depend on task
/// scheduling order. Unscripted queries hang.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<Vec<(String, Reply)>>,
    sent: Arc<Mutex<Vec<PlacesRequest>>>,
}

#[allow(dead_code)]
impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, query: &str, reply: Reply) -> Self {
        self.replies.lock().unwrap().push((query.to_string(), reply));
        self
    }

    /// Handle onto the requests the transport has received.
    pub fn sent_log(&self) -> Arc<Mutex<Vec<PlacesRequest>>> {
        Arc::clone(&self.sent)
    }
}

impl PlacesTransport for FakeTransport {
    fn send(
        &self,
        request: PlacesRequest,
    ) -> impl Future<Output = Result<HttpOutcome, TransportError>> + Send {
        let query = serde_json::from_str::<SearchTextBody>(&request.body)
            .map(|b| b.text_query)
            .unwrap_or_default();
        self.sent.lock().unwrap().push(request);

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.iter().position(|(q, _)| *q == query) {
                Some(idx) => replies.remove(idx).1,
                None => Reply::Hang,
            }
        };

        async move {
            match reply {
                Reply::Respond(status, body) => Ok(HttpOutcome::new(status, body)),
                Reply::Fail(err) => Err(err),
                Reply::Hang => std::future::pending().await,
            }
        }
    }
}

#[allow(dead_code)]
pub fn test_config() -> PlacesConfig {
    PlacesConfig {
        api_key: "test-key".into(),
        endpoint: "http://places.invalid/v1/places:searchText".into(),
        query_text: "San Francisco Public Library".into(),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn session(transport: FakeTransport) -> SearchSession<FakeTransport> {
    SearchSession::new(test_config(), transport).expect("valid test config")
}

#[allow(dead_code)]
pub fn origin() -> GeoOrigin {
    GeoOrigin::new("Origin", 37.7793, -122.4193)
}

/// One origin plus one template anchor.
#[allow(dead_code)]
pub fn basic_scene() -> SceneDocument {
    SceneDocument::new(
        vec![origin()],
        vec![Anchor::new("Anchor", 37.7793, -122.4193)],
    )
}

/// Writes scene documents into a temp dir.
#[allow(dead_code)]
pub struct SceneFixture {
    pub dir: TempDir,
}

#[allow(dead_code)]
impl SceneFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn write(&self, name: &str, scene: &SceneDocument) -> PathBuf {
        let path = self.dir.path().join(name);
        scene.save_to(&path).expect("write scene");
        path
    }

    pub fn write_raw(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("write scene");
        path
    }
}
