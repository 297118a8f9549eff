#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use nav_client::{Transport, TransportError};
use nav_runtime::{Request, Response};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Transport that replays a fixed script and records what was sent.
#[derive(Default)]
pub struct ScriptedTransport {
    script: VecDeque<Result<Response, TransportError>>,
    pub sent: Vec<Request>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, response: Response) -> Self {
        self.script.push_back(Ok(response));
        self
    }

    pub fn fail(mut self, times: usize) -> Self {
        for _ in 0..times {
            self.script.push_back(Err(TransportError::Closed));
        }
        self
    }

    pub fn push(&mut self, step: Result<Response, TransportError>) {
        self.script.push_back(step);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Transport for ScriptedTransport {
    fn round_trip(&mut self, request: &Request) -> Result<Response, TransportError> {
        self.sent.push(request.clone());
        self.script.pop_front().unwrap_or(Err(TransportError::Closed))
    }
}

/// Captured log line: level plus rendered message.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: tracing::Level,
    pub message: String,
}

#[derive(Clone, Default)]
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().expect("capture mutex poisoned").clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.message.contains(needle))
            .count()
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .expect("capture mutex poisoned")
            .push(CapturedEvent {
                level: *event.metadata().level(),
                message: visitor.message.unwrap_or_default(),
            });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        }
    }
}

/// Run `f` with a capturing subscriber installed on this thread.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, CaptureLayer) {
    let layer = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, layer)
}
