//! Shared test utilities for E2E tests.
//!
//! This module provides a fixture that isolates the binary from the host's
//! Rucio setup, a fake `rucio` executable that records its arguments, and an
//! axum server standing in for the Rucio REST API.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new();
//!     let rucio = fixture.fake_rucio(scripts::SUCCEED);
//!     // ... test code
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use assert_fs::prelude::*;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::scripts;
    #[allow(unused_imports)]
    pub use super::{FakeCatalogue, FakeResponse, Request, TestFixture};
}

/// Bodies for the fake `rucio` executable. The script header sets `$ARGS_LOG`
/// to the fixture's argument log path.
#[allow(dead_code)]
pub mod scripts {
    /// Every upload succeeds.
    pub const SUCCEED: &str = r#"echo "$*" >> "$ARGS_LOG"
exit 0
"#;

    /// Every upload fails the way the Rucio client reports it.
    pub const FAIL: &str = r#"echo "$*" >> "$ARGS_LOG"
echo "2026-10-19 12:00:00,000 ERROR Failed to upload file" >&2
echo "Rucio exception raised: NoFilesUploaded" >&2
exit 1
"#;

    /// Uploads of anything named `b.root` fail, the rest succeed.
    pub const FAIL_B: &str = r#"echo "$*" >> "$ARGS_LOG"
case "$*" in
  *b.root*) echo "Upload of b.root failed: connection timed out" >&2; exit 1 ;;
esac
exit 0
"#;
}

/// Environment variables that would leak the host's setup into a test run.
const ISOLATED_ENV: &[&str] = &[
    "RUCIO_HOST",
    "RUCIO_ACCOUNT",
    "RUCIO_AUTH_TOKEN",
    "RUCIO_REGISTER_BIN",
    "RUCIO_REGISTER_CONFIG",
    "RUCIO_REGISTER_LOG",
    "RUCIO_REGISTER_LOG_STYLE",
    "RUCIO_CONFIG",
    "RUCIO_HOME",
    "VIRTUAL_ENV",
    "TMP",
    "TEMP",
    "LOGNAME",
    "LNAME",
    "USERNAME",
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
];

/// User name the binary sees, which names the token cache directory.
pub const TEST_USER: &str = "rucio-tester";

/// A temporary working directory with an empty config file.
pub struct TestFixture {
    pub temp: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("config.yaml")
            .write_str("# empty test config\n")
            .unwrap();
        Self { temp }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp.path().join("config.yaml")
    }

    /// Replaces the fixture config with `yaml`.
    pub fn with_config(self, yaml: &str) -> Self {
        self.temp.child("config.yaml").write_str(yaml).unwrap();
        self
    }

    /// Creates a small local data file and returns its path.
    pub fn data_file(&self, name: &str) -> PathBuf {
        let child = self.temp.child(name);
        child.write_str("payload").unwrap();
        child.path().to_path_buf()
    }

    /// Writes the Rucio client's `rucio.cfg`, which [`Self::command`] points
    /// `RUCIO_CONFIG` at.
    pub fn with_rucio_cfg(self, text: &str) -> Self {
        self.temp.child("rucio.cfg").write_str(text).unwrap();
        self
    }

    /// Leaves a token where the Rucio client caches it for `account`.
    pub fn cache_token(&self, account: &str, token: &str) {
        self.temp
            .child(TEST_USER)
            .child(format!(".rucio_{}", account))
            .child(format!("auth_token_{}", account))
            .write_str(token)
            .unwrap();
    }

    /// Where the fake `rucio` appends one line of arguments per call.
    pub fn args_log(&self) -> PathBuf {
        self.temp.path().join("rucio-args.log")
    }

    /// Lines recorded by the fake `rucio`, empty if it never ran.
    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.args_log())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Writes an executable shell script standing in for `rucio`.
    #[cfg(unix)]
    pub fn fake_rucio(&self, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.temp.path().join("fake-rucio");
        let script = format!(
            "#!/bin/sh\nARGS_LOG='{}'\n{}",
            self.args_log().display(),
            body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// The binary, isolated from the host's Rucio environment and pointed at
    /// the fixture config. The client's `rucio.cfg` and token cache both live
    /// in the fixture directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("rucio-register");
        for var in ISOLATED_ENV {
            cmd.env_remove(var);
        }
        cmd.current_dir(self.path())
            .env("RUCIO_CONFIG", self.path().join("rucio.cfg"))
            .env("TMPDIR", self.path())
            .env("USER", TEST_USER)
            .env("NO_COLOR", "1")
            .arg("--config")
            .arg(self.config_path())
            .arg("--color")
            .arg("never");
        cmd
    }
}

/// A request received by the [`FakeCatalogue`].
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[allow(dead_code)]
impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// A canned HTTP response.
#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[allow(dead_code)]
impl FakeResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![],
            body: body.into(),
        }
    }

    pub fn created() -> Self {
        Self {
            status: 201,
            headers: vec![],
            body: "Created".to_string(),
        }
    }

    /// An error the way the Rucio server reports it.
    pub fn rucio_error(status: u16, class: &str, message: &str) -> Self {
        Self {
            status,
            headers: vec![
                ("ExceptionClass".to_string(), class.to_string()),
                ("ExceptionMessage".to_string(), message.to_string()),
            ],
            body: serde_json::json!({
                "ExceptionClass": class,
                "ExceptionMessage": message,
            })
            .to_string(),
        }
    }

    /// A `/replicas/list` line reporting `state` at `rse`.
    pub fn replica(scope: &str, name: &str, rse: &str, state: &str) -> Self {
        let mut rses = serde_json::Map::new();
        rses.insert(rse.to_string(), serde_json::json!([]));
        let mut states = serde_json::Map::new();
        states.insert(rse.to_string(), serde_json::json!(state));
        let line = serde_json::json!({
            "scope": scope,
            "name": name,
            "bytes": 7,
            "adler32": "0a9e02b9",
            "rses": rses,
            "states": states,
        });
        Self::ok(format!("{}\n", line))
    }
}

impl IntoResponse for FakeResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}

type Handler = dyn Fn(&Request) -> FakeResponse + Send + Sync;

struct Shared {
    handler: Box<Handler>,
    requests: Mutex<Vec<Request>>,
}

/// A Rucio server stand-in: an axum router on a local port that answers
/// every request through one handler and records it.
pub struct FakeCatalogue {
    url: String,
    shared: Arc<Shared>,
}

#[allow(dead_code)]
impl FakeCatalogue {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> FakeResponse + Send + Sync + 'static,
    {
        // Bound before the server thread starts, so early requests queue up
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let shared = Arc::new(Shared {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .fallback(record)
            .with_state(Arc::clone(&shared));

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        Self { url, shared }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn requests(&self) -> Vec<Request> {
        self.shared
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

/// Records the request before answering, so it is visible once the client
/// has its response.
async fn record(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> FakeResponse {
    let request = Request {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let response = (shared.handler)(&request);
    shared
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(request);
    response
}
