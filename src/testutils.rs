use async_trait::async_trait;
use axum::Router;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::orchestrator::ConfigurationSurface;
use crate::relay::{ChannelError, HelperChannel};
use crate::trigger::{FeedbackSurface, IndicatorState, Notification};

pub struct MockUpstream {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    /// Path and query of every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Fake E-utilities endpoint answering every fetch with `status` and `body`.
pub async fn start_mock_upstream(status: StatusCode, body: &str) -> MockUpstream {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();
    let body = body.to_string();

    let app = Router::new().route(
        "/entrez/eutils/efetch.fcgi",
        get(move |uri: Uri| {
            let seen = seen.clone();
            let body = body.clone();
            async move {
                seen.lock().unwrap().push(uri.to_string());
                (status, body)
            }
        }),
    );

    MockUpstream {
        base_url: serve(app).await,
        requests,
    }
}

pub async fn start_slow_upstream(delay: Duration) -> MockUpstream {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route(
        "/entrez/eutils/efetch.fcgi",
        get(move || async move {
            tokio::time::sleep(delay).await;
            "TI  - Too late\n"
        }),
    );

    MockUpstream {
        base_url: serve(app).await,
        requests,
    }
}

/// Base URL of a local port with nothing listening on it.
pub async fn unused_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

enum FakeReply {
    Reply(Value),
    Fail(Box<dyn Fn() -> ChannelError + Send + Sync>),
    Stall,
}

/// In-memory helper channel that records what it was sent.
pub struct FakeChannel {
    reply: FakeReply,
    messages: Mutex<Vec<Value>>,
    calls: AtomicUsize,
}

impl FakeChannel {
    fn with(reply: FakeReply) -> Self {
        Self {
            reply,
            messages: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn replying(reply: Value) -> Self {
        Self::with(FakeReply::Reply(reply))
    }

    pub fn failing(error: impl Fn() -> ChannelError + Send + Sync + 'static) -> Self {
        Self::with(FakeReply::Fail(Box::new(error)))
    }

    pub fn stalling() -> Self {
        Self::with(FakeReply::Stall)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn messages(&self) -> Vec<Value> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl HelperChannel for FakeChannel {
    async fn exchange(&self, message: Value) -> Result<Value, ChannelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().unwrap().push(message);
        match &self.reply {
            FakeReply::Reply(reply) => Ok(reply.clone()),
            FakeReply::Fail(error) => Err(error()),
            FakeReply::Stall => std::future::pending().await,
        }
    }
}

#[derive(Default)]
pub struct CountingConfigurationSurface {
    opened: AtomicUsize,
}

impl CountingConfigurationSurface {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ConfigurationSurface for CountingConfigurationSurface {
    fn open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records every state change and notification shown to the user.
#[derive(Default)]
pub struct RecordingFeedback {
    states: Mutex<Vec<IndicatorState>>,
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingFeedback {
    pub fn states(&self) -> Vec<IndicatorState> {
        self.states.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl FeedbackSurface for RecordingFeedback {
    fn set_state(&self, state: &IndicatorState) {
        self.states.lock().unwrap().push(state.clone());
    }

    fn notify(&self, notification: &Notification) {
        self.notifications.lock().unwrap().push(notification.clone());
    }
}
