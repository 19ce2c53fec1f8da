use crate::result::ParseResultSnapshot;
use std::fmt;

/// Which half of the result an observed assignment belongs to (spec.md
/// §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Common,
    Format,
}

/// A single observable assignment: the mapper or a container parser set a
/// common/format field to a new value (first write, or a replacement that
/// actually changed the value).
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub field: String,
    pub new_value: String,
}

/// Sink for [`Event`]s, delivered synchronously and in assignment order
/// (spec.md §4.6, §5). Implementors must not mutate the snapshot they're
/// handed, and must not call back into the parser (spec.md §9 "Observer
/// re-entrancy" is undefined behavior; this crate does not guard against it).
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &Event, snapshot: &ParseResultSnapshot);
}

/// Buffers events and delivers them to an optional [`Observer`], catching
/// and logging (as a warning) any panic raised by the observer so a
/// misbehaving callback can't abort the parse (spec.md §4.6 "must not
/// throw").
pub struct ObserverPump<'a> {
    observer: Option<&'a (dyn Observer)>,
    warnings: Vec<crate::error::Warning>,
}

impl<'a> ObserverPump<'a> {
    pub fn new(observer: Option<&'a (dyn Observer)>) -> Self {
        ObserverPump {
            observer,
            warnings: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event, snapshot: &ParseResultSnapshot) {
        if let Some(observer) = self.observer {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                observer.on_event(&event, snapshot);
            }));
            if let Err(payload) = result {
                let message = panic_message(&payload);
                log::warn!("observer panicked: {message}");
                self.warnings.push(crate::error::Warning::new(format!(
                    "observer panicked: {message}"
                )));
            }
        }
    }

    pub fn into_warnings(self) -> Vec<crate::error::Warning> {
        self.warnings
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl fmt::Debug for ObserverPump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverPump")
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}
