//! Event emitter and dispatch helpers
//!
//! `EventEmitter` maps event names to listeners. `PropertyMapper` dispatches an
//! event to the callback registered for the value of one of its fields, and
//! `redirect` builds a listener that re-emits events on another emitter.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::lock::{mutex_lock, read_lock, write_lock};

/// Callback invoked with an event
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifies a registered listener so it can be removed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Emits named events to registered listeners
pub struct EventEmitter<T> {
    mappings: Mutex<HashMap<String, Vec<(ListenerId, Listener<T>)>>>,
    next_id: AtomicU64,
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self {
            mappings: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a listener to the named event
    pub fn listen<L>(&self, name: &str, listener: L) -> ListenerId
    where
        L: Fn(&T) + Send + Sync + 'static,
    {
        self.listen_shared(name, Arc::new(listener))
    }

    /// Attaches an already shared listener to the named event
    pub fn listen_shared(&self, name: &str, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        mutex_lock(&self.mappings, "events.listen")
            .entry(name.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Removes a listener; returns whether it was attached to `name`
    pub fn unlisten(&self, name: &str, id: ListenerId) -> bool {
        let mut mappings = mutex_lock(&self.mappings, "events.unlisten");
        let Some(listeners) = mappings.get_mut(name) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    /// Calls every listener of the named event, returning how many were called
    ///
    /// Listeners run outside the internal lock, so they may listen, unlisten or
    /// emit on the same emitter.
    pub fn emit(&self, name: &str, event: &T) -> usize {
        let listeners: Vec<Listener<T>> = mutex_lock(&self.mappings, "events.emit")
            .get(name)
            .map(|listeners| listeners.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    /// Number of listeners attached to the named event
    pub fn listener_count(&self, name: &str) -> usize {
        mutex_lock(&self.mappings, "events.listener_count")
            .get(name)
            .map_or(0, Vec::len)
    }
}

/// Dispatches events by the value of one of their properties
pub struct PropertyMapper<K, T> {
    property: Box<dyn Fn(&T) -> K + Send + Sync>,
    mappings: RwLock<HashMap<K, Listener<T>>>,
}

impl<K, T> PropertyMapper<K, T>
where
    K: Eq + Hash + Send + Sync + 'static,
    T: 'static,
{
    /// Creates a mapper keyed by the value `property` extracts from an event
    pub fn new<P>(property: P) -> Self
    where
        P: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self {
            property: Box::new(property),
            mappings: RwLock::new(HashMap::new()),
        }
    }

    /// Sets or overwrites the callback for a property value
    pub fn set<L>(&self, value: K, callback: L)
    where
        L: Fn(&T) + Send + Sync + 'static,
    {
        write_lock(&self.mappings, "mapper.set").insert(value, Arc::new(callback));
    }

    /// Removes the callback for a property value, if any
    pub fn delete(&self, value: &K) -> bool {
        write_lock(&self.mappings, "mapper.delete")
            .remove(value)
            .is_some()
    }

    pub fn clear(&self) {
        write_lock(&self.mappings, "mapper.clear").clear();
    }

    /// Calls the callback mapped to the event's property value.
    ///
    /// Returns false, doing nothing, when the value is not mapped.
    pub fn dispatch(&self, event: &T) -> bool {
        let key = (self.property)(event);
        let callback = read_lock(&self.mappings, "mapper.dispatch")
            .get(&key)
            .cloned();
        match callback {
            Some(callback) => {
                callback(event);
                true
            }
            None => false,
        }
    }

    /// Turns the mapper into a listener for an `EventEmitter`
    pub fn into_listener(self: Arc<Self>) -> Listener<T>
    where
        T: Send + Sync,
    {
        Arc::new(move |event: &T| {
            self.dispatch(event);
        })
    }
}

/// Builds a listener that re-emits every event as `name` on `destination`
pub fn redirect<T>(destination: Arc<EventEmitter<T>>, name: &str) -> Listener<T>
where
    T: Send + Sync + 'static,
{
    let name = name.to_string();
    Arc::new(move |event: &T| {
        destination.emit(&name, event);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct KeyEvent {
        key: &'static str,
    }

    #[test]
    fn test_emit_calls_listeners_of_that_event_only() {
        let emitter = EventEmitter::<i32>::new();
        let total = Arc::new(AtomicUsize::new(0));

        let t = Arc::clone(&total);
        emitter.listen("add", move |n| {
            t.fetch_add(*n as usize, Ordering::SeqCst);
        });
        emitter.listen("other", |_| panic!("wrong event"));

        assert_eq!(emitter.emit("add", &5), 1);
        assert_eq!(emitter.emit("add", &2), 1);
        assert_eq!(emitter.emit("missing", &1), 0);
        assert_eq!(total.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_unlisten_removes_only_that_listener() {
        let emitter = EventEmitter::<()>::new();
        let first = emitter.listen("tick", |_| {});
        emitter.listen("tick", |_| {});

        assert!(emitter.unlisten("tick", first));
        assert!(!emitter.unlisten("tick", first));
        assert!(!emitter.unlisten("never", first));
        assert_eq!(emitter.listener_count("tick"), 1);
    }

    #[test]
    fn test_listener_may_emit_reentrantly() {
        let emitter = Arc::new(EventEmitter::<u32>::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let inner = Arc::clone(&emitter);
        emitter.listen("outer", move |n| {
            inner.emit("inner", n);
        });
        let s = Arc::clone(&seen);
        emitter.listen("inner", move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit("outer", &1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_property_mapper_dispatches_by_value() {
        let mapper = PropertyMapper::new(|event: &KeyEvent| event.key);
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        mapper.set("Enter", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert!(mapper.dispatch(&KeyEvent { key: "Enter" }));
        assert!(!mapper.dispatch(&KeyEvent { key: "Escape" }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(mapper.delete(&"Enter"));
        assert!(!mapper.dispatch(&KeyEvent { key: "Enter" }));
    }

    #[test]
    fn test_property_mapper_clear() {
        let mapper = PropertyMapper::new(|event: &KeyEvent| event.key);
        mapper.set("a", |_| {});
        mapper.set("b", |_| {});
        mapper.clear();

        assert!(!mapper.dispatch(&KeyEvent { key: "a" }));
        assert!(!mapper.dispatch(&KeyEvent { key: "b" }));
    }

    #[test]
    fn test_mapper_as_emitter_listener() {
        let emitter = EventEmitter::<KeyEvent>::new();
        let mapper = Arc::new(PropertyMapper::new(|event: &KeyEvent| event.key));
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        mapper.set("Space", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        emitter.listen_shared("keydown", Arc::clone(&mapper).into_listener());

        emitter.emit("keydown", &KeyEvent { key: "Space" });
        emitter.emit("keydown", &KeyEvent { key: "Tab" });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_redirect_re_emits_on_destination() {
        let source = EventEmitter::<String>::new();
        let destination = Arc::new(EventEmitter::<String>::new());
        let received = Arc::new(Mutex::new(Vec::new()));

        let r = Arc::clone(&received);
        destination.listen("log", move |msg: &String| {
            r.lock().unwrap().push(msg.clone());
        });
        source.listen_shared("message", redirect(Arc::clone(&destination), "log"));

        source.emit("message", &"hello".to_string());
        assert_eq!(*received.lock().unwrap(), vec!["hello".to_string()]);
    }
}
