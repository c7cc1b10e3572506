//! In-memory capture of operation events for test assertions

use comhon_core_types::schema::{FIELD_EVENT, FIELD_MODEL, FIELD_OP};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One recorded event, fields rendered as text
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn is(&self, op: &str, event: &str) -> bool {
        self.field(FIELD_OP) == Some(op) && self.field(FIELD_EVENT) == Some(event)
    }
}

#[derive(Default)]
struct Fields(HashMap<String, String>);

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: fields.0,
        });
    }
}

/// Shared view on the captured events
#[derive(Clone, Default)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    fn layer(&self) -> CaptureLayer {
        CaptureLayer {
            events: self.events.clone(),
        }
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// `event` records of `op` on `model`
    pub fn events_for(&self, op: &str, event: &str, model: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.is(op, event) && e.field(FIELD_MODEL) == Some(model))
            .cloned()
            .collect()
    }

    /// # Panics
    ///
    /// Panics when no `event` record of `op` was captured.
    pub fn assert_event_exists(&self, op: &str, event: &str) {
        let events = self.events.lock();
        assert!(
            events.iter().any(|e| e.is(op, event)),
            "no {} event for {} among {} captured events",
            event,
            op,
            events.len()
        );
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture as global subscriber, once per process
///
/// Tests run concurrently in one process, so assertions filter by
/// operation and model rather than counting every event.
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let capture = TestCapture::default();
            tracing_subscriber::registry().with(capture.layer()).init();
            capture
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ComhonError;
    use crate::{log_op_end, log_op_error, log_op_start};
    use comhon_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

    #[test]
    fn test_operation_events_carry_model_and_error_kind() {
        let capture = TestCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.layer());
        tracing::subscriber::with_default(subscriber, || {
            log_op_start!("import", "Shop\\Item", format = "xml");
            log_op_end!("import", "Shop\\Item", 2u64);
            let err = ComhonError::ModelNotFound {
                model: "Shop\\Lamp".to_string(),
            };
            log_op_error!("load_model", "Shop\\Lamp", &err, 5u64);
        });

        let start = capture.events_for("import", EVENT_START, "Shop\\Item");
        assert_eq!(start.len(), 1);
        assert_eq!(start[0].field("format"), Some("xml"));
        assert_eq!(start[0].level, Level::INFO);

        let end = capture.events_for("import", EVENT_END, "Shop\\Item");
        assert_eq!(end[0].field("duration_ms"), Some("2"));

        let failed = capture.events_for("load_model", EVENT_END_ERROR, "Shop\\Lamp");
        assert_eq!(failed[0].field("err_kind"), Some("ModelNotFound"));
        assert_eq!(failed[0].field("err_code"), Some("ERR_MODEL_NOT_FOUND"));
        assert_eq!(failed[0].level, Level::ERROR);
        capture.assert_event_exists("load_model", EVENT_END_ERROR);
    }
}
