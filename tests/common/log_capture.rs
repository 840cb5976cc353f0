//! Thread-scoped capture of tracing events.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// One captured event.
#[derive(Debug, Clone)]
pub struct Event {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl Event {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn mentions(&self, needle: &str) -> bool {
        self.message.contains(needle) || self.fields.values().any(|v| v.contains(needle))
    }
}

/// Records events on the current thread until dropped.
///
/// Pair with `#[tokio::test]`'s default current-thread runtime; events from
/// other threads are not seen.
pub struct LogCapture {
    events: Arc<Mutex<Vec<Event>>>,
    _guard: DefaultGuard,
}

impl LogCapture {
    pub fn start() -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(Recorder {
            events: events.clone(),
        });
        Self {
            events,
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Events whose message is exactly `message`, in emission order.
    pub fn named(&self, message: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.message == message)
            .collect()
    }

    /// First `message` event at `level`, for asserting on its fields.
    pub fn expect_event(&self, level: Level, message: &str) -> Event {
        let events = self.events();
        events
            .iter()
            .find(|e| e.level == level && e.message == message)
            .cloned()
            .unwrap_or_else(|| {
                let seen: Vec<_> = events.iter().map(|e| (e.level, &e.message)).collect();
                panic!("no {level} event \"{message}\"; captured: {seen:#?}")
            })
    }

    /// Fail if `secret` appears in any message or field value.
    pub fn assert_never_logged(&self, secret: &str) {
        let leaked: Vec<_> = self
            .events()
            .into_iter()
            .filter(|e| e.mentions(secret))
            .collect();
        assert!(leaked.is_empty(), "'{secret}' appeared in logs: {leaked:#?}");
    }
}

struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl<S: tracing::Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        self.events.lock().unwrap().push(Event {
            level: *event.metadata().level(),
            message: fields.message,
            fields: fields.values,
        });
    }
}

#[derive(Default)]
struct Fields {
    message: String,
    values: BTreeMap<String, String>,
}

impl Fields {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.values.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.put(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }
}
