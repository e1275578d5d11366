//! HTTP backend harness
//!
//! Starts a wiremock server and a [`BackendClient`] pointed at it.

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use quota_console::config::{AppConfig, BackendConfig};
use quota_console::services::BackendClient;
use quota_console::ConsoleContext;

pub const TEST_TOKEN: &str = "test-token";

pub struct TestBackend {
    pub server: MockServer,
}

impl TestBackend {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> BackendConfig {
        BackendConfig {
            url: self.server.uri(),
            timeout_secs: 5,
            ssl_verify: true,
            token: Some(TEST_TOKEN.to_string()),
        }
    }

    pub fn client(&self) -> BackendClient {
        BackendClient::new(&self.config()).expect("client should build")
    }

    pub fn context(&self) -> ConsoleContext {
        let config = AppConfig {
            backend: self.config(),
            ..Default::default()
        };
        ConsoleContext::new(config).expect("context should build")
    }

    /// Answer `verb path` with HTTP 200 and `body`
    pub async fn stub(&self, verb: &str, route: &str, body: Value) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer `verb path` with a bare HTTP status
    pub async fn stub_status(&self, verb: &str, route: &str, status: u16) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}
