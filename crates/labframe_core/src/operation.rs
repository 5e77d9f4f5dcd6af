//! Named zero-argument operations exposed by an app.

use log::info;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Operation list change emitted to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationEvent {
    Added(String),
    Removed(String),
}

type OperationFn = Box<dyn FnMut()>;
type Subscriber = Rc<dyn Fn(&OperationEvent)>;

/// Ordered registry of operations, unique by name.
#[derive(Default)]
pub struct OperationRegistry {
    entries: Vec<(String, OperationFn)>,
    subscribers: Vec<Subscriber>,
}

impl Debug for OperationRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name`, replacing an existing operation in place.
    pub fn add(&mut self, name: impl Into<String>, operation: impl FnMut() + 'static) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = Box::new(operation),
            None => self.entries.push((name.clone(), Box::new(operation))),
        }
        self.emit(&OperationEvent::Added(name));
    }

    /// Removes `name`. Returns `false` if it was not registered.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(index) = self.entries.iter().position(|(existing, _)| existing == name) else {
            return false;
        };
        drop(self.entries.remove(index));
        self.emit(&OperationEvent::Removed(name.to_string()));
        true
    }

    /// Runs `name`. Returns `false` if it is not registered.
    pub fn run(&mut self, name: &str) -> bool {
        let Some((_, operation)) = self.entries.iter_mut().find(|(existing, _)| existing == name)
        else {
            return false;
        };
        info!("event=operation_run module=operation name={name}");
        operation();
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == name)
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn subscribe(&mut self, subscriber: impl Fn(&OperationEvent) + 'static) {
        self.subscribers.push(Rc::new(subscriber));
    }

    fn emit(&self, event: &OperationEvent) {
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }
}
