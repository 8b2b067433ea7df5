//! Scripted transport and drop-tracking bodies for unit tests.

use crate::{
    events::{FetchEvent, FetchObserver},
    request::PreparedRequest,
    transport::{LiveResponse, ResponseBody, Transport},
    Error, Result,
};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum BodyStep {
    Chunk(Bytes),
    Fail(fn() -> Error),
}

/// What one attempt of a [`ScriptedTransport`] does.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Respond(Vec<BodyStep>),
    Fail(fn() -> Error),
}

impl Script {
    pub(crate) fn ok(body: &str) -> Self {
        Self::bytes(body.as_bytes().to_vec())
    }

    pub(crate) fn bytes(body: Vec<u8>) -> Self {
        Script::Respond(vec![BodyStep::Chunk(Bytes::from(body))])
    }

    pub(crate) fn chunks(chunks: Vec<Vec<u8>>) -> Self {
        Script::Respond(
            chunks
                .into_iter()
                .map(|c| BodyStep::Chunk(Bytes::from(c)))
                .collect(),
        )
    }

    /// Sends `prefix`, then times out while the rest of the body is read.
    pub(crate) fn stalls_after(prefix: &str) -> Self {
        Script::Respond(vec![
            BodyStep::Chunk(Bytes::from(prefix.as_bytes().to_vec())),
            BodyStep::Fail(|| Error::TransferTimeout {
                timeout: Duration::from_secs(10),
            }),
        ])
    }

    /// Sends `prefix`, then the connection resets.
    pub(crate) fn resets_after(prefix: &str) -> Self {
        Script::Respond(vec![
            BodyStep::Chunk(Bytes::from(prefix.as_bytes().to_vec())),
            BodyStep::Fail(|| Error::Transport("connection reset by peer".into())),
        ])
    }

    pub(crate) fn connect_timeout() -> Self {
        Script::Fail(|| Error::ConnectTimeout {
            timeout: Duration::from_secs(5),
        })
    }

    pub(crate) fn transport_error() -> Self {
        Script::Fail(|| Error::Transport("connection refused".into()))
    }
}

/// Plays back a list of [`Script`]s, one per attempt.
pub(crate) struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    repeat: Option<Script>,
    calls: AtomicUsize,
    sent: Mutex<Vec<String>>,
    opened: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub(crate) fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            repeat: None,
            calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            opened: AtomicUsize::new(0),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Plays `script` for every attempt.
    pub(crate) fn repeating(script: Script) -> Self {
        Self {
            repeat: Some(script),
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn failing() -> Self {
        Self::repeating(Script::transport_error())
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Bodies handed out by successful attempts.
    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Bodies dropped so far.
    pub(crate) fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub(crate) fn sent_bodies(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn next_script(&self) -> Script {
        let next = self.scripts.lock().unwrap().pop_front();
        next.or_else(|| self.repeat.clone())
            .expect("transport called more often than scripted")
    }
}

impl Transport for ScriptedTransport {
    type Body = TrackedBody;

    async fn attempt(&self, request: &PreparedRequest) -> Result<LiveResponse<TrackedBody>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let sent = request
            .body()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default();
        self.sent.lock().unwrap().push(sent);

        match self.next_script() {
            Script::Fail(error) => Err(error()),
            Script::Respond(steps) => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                Ok(LiveResponse {
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                    body: TrackedBody {
                        steps: steps.into(),
                        released: Arc::clone(&self.released),
                    },
                })
            }
        }
    }
}

/// Body that counts itself as released when dropped.
#[derive(Debug)]
pub(crate) struct TrackedBody {
    steps: VecDeque<BodyStep>,
    released: Arc<AtomicUsize>,
}

impl ResponseBody for TrackedBody {
    async fn chunk(&mut self) -> Result<Option<Bytes>> {
        match self.steps.pop_front() {
            Some(BodyStep::Chunk(bytes)) => Ok(Some(bytes)),
            Some(BodyStep::Fail(error)) => Err(error()),
            None => Ok(None),
        }
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records events as short strings.
#[derive(Default)]
pub(crate) struct EventLog {
    entries: Mutex<Vec<String>>,
}

impl EventLog {
    pub(crate) fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

impl FetchObserver for EventLog {
    fn on_event(&self, event: &FetchEvent<'_>) {
        let entry = match event {
            FetchEvent::AttemptFailed { attempt, .. } => format!("attempt {} failed", attempt),
            FetchEvent::Exhausted { attempts, .. } => format!("exhausted after {}", attempts),
            FetchEvent::InvalidPayload { fetch, .. } => format!("invalid payload {}", fetch),
        };
        self.entries.lock().unwrap().push(entry);
    }
}
