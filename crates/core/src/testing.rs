//! In-memory doubles for the core ports.
//!
//! - [`ScriptedTransport`]: replies per path, records every request, can hang
//! - [`MemoryTokenStore`]: `HashMap`-backed token store
//! - [`RecordingPublisher`]: collects published overlay events

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use elixir_domain::{OverlayEvent, Result};
use parking_lot::Mutex;

use crate::ports::{
    EventPublisher, HttpTransport, OutboundRequest, RawResponse, TokenStore, TransportFailure,
};

/// Scripted outcome for one request
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(RawResponse),
    Fail(String),
    /// Responds after the given delay.
    Delayed(std::time::Duration, RawResponse),
    /// Never resolves.
    Hang,
}

impl Reply {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self::Respond(RawResponse::new(status, body))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    /// Delay a scripted response.
    #[must_use]
    pub fn after(self, delay: std::time::Duration) -> Self {
        match self {
            Self::Respond(response) | Self::Delayed(_, response) => Self::Delayed(delay, response),
            other => other,
        }
    }

    /// Nested-envelope token grant.
    pub fn grant(token: &str, refresh_token: &str, life_ms: u64, new_account: bool) -> Self {
        Self::json(
            200,
            format!(
                r#"{{"code":0,"success":true,"data":{{"token":"{token}","tokenExpiry":0,"tokenLifeMS":{life_ms},"refreshToken":"{refresh_token}","newAccount":{new_account}}}}}"#
            ),
        )
    }
}

#[derive(Default)]
struct Script {
    routes: HashMap<String, VecDeque<Reply>>,
    requests: Vec<OutboundRequest>,
}

/// Transport answering from per-path reply queues
///
/// Replies queued for a path are consumed in order; the last one keeps
/// answering. Clones share the script.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for an exact path.
    pub fn on(&self, path: &str, reply: Reply) -> &Self {
        self.script.lock().routes.entry(path.to_string()).or_default().push_back(reply);
        self
    }

    #[must_use]
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.script.lock().requests.clone()
    }

    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<OutboundRequest> {
        self.script.lock().requests.iter().filter(|r| r.path == path).cloned().collect()
    }

    #[must_use]
    pub fn count(&self, path: &str) -> usize {
        self.script.lock().requests.iter().filter(|r| r.path == path).count()
    }

    #[must_use]
    pub fn last_request(&self) -> Option<OutboundRequest> {
        self.script.lock().requests.last().cloned()
    }

    fn next_reply(&self, request: OutboundRequest) -> Option<Reply> {
        let mut script = self.script.lock();
        let reply = script.routes.get_mut(&request.path).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });
        script.requests.push(request);
        reply
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(
        &self,
        request: OutboundRequest,
    ) -> std::result::Result<RawResponse, TransportFailure> {
        let path = request.path.clone();
        match self.next_reply(request) {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(TransportFailure::new(message)),
            Some(Reply::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(TransportFailure::new(format!("no scripted reply for {path}"))),
        }
    }
}

/// Token store kept in memory; clones share entries
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries.lock().insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Publisher that remembers everything it was given
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<OverlayEvent>>>,
}

impl RecordingPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<OverlayEvent> {
        self.events.lock().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: OverlayEvent) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}
