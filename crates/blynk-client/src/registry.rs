use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use blynk_frame::Response;

/// Produces the current value of a virtual pin when the broker asks for it.
pub type ReadHandler = Arc<dyn Fn(u32) -> String + Send + Sync>;
/// Consumes a value the broker delivers for a virtual pin.
pub type WriteHandler = Arc<dyn Fn(u32, &str) + Send + Sync>;
/// Receives every decoded hardware-class frame.
pub type HardwareHandler = Arc<dyn Fn(&Response) + Send + Sync>;

/// Pin-keyed registry of read producers and write consumers, plus the
/// optional catch-all hardware callback.
///
/// Registration replaces any previous handler for the same pin. Handlers are
/// cloned out of the lock before they run, so a handler may itself register
/// or unregister pins.
#[derive(Clone, Default)]
pub struct PinRegistry {
    readers: Arc<RwLock<HashMap<u32, ReadHandler>>>,
    writers: Arc<RwLock<HashMap<u32, WriteHandler>>>,
    hardware: Arc<RwLock<Option<HardwareHandler>>>,
}

impl PinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_reader<F>(&self, pin: u32, producer: F)
    where
        F: Fn(u32) -> String + Send + Sync + 'static,
    {
        self.readers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pin, Arc::new(producer));
    }

    pub fn register_writer<F>(&self, pin: u32, consumer: F)
    where
        F: Fn(u32, &str) + Send + Sync + 'static,
    {
        self.writers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pin, Arc::new(consumer));
    }

    /// Remove the read producer for `pin`. Returns true if one was registered.
    pub fn unregister_reader(&self, pin: u32) -> bool {
        self.readers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&pin)
            .is_some()
    }

    /// Remove the write consumer for `pin`. Returns true if one was registered.
    pub fn unregister_writer(&self, pin: u32) -> bool {
        self.writers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&pin)
            .is_some()
    }

    pub fn reader(&self, pin: u32) -> Option<ReadHandler> {
        self.readers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&pin)
            .cloned()
    }

    pub fn writer(&self, pin: u32) -> Option<WriteHandler> {
        self.writers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&pin)
            .cloned()
    }

    /// Install the callback that sees every hardware-class frame.
    pub fn set_hardware_handler<F>(&self, callback: F)
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        *self.hardware.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn clear_hardware_handler(&self) {
        self.hardware
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn hardware_handler(&self) -> Option<HardwareHandler> {
        self.hardware
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Registered reader pins, ascending.
    pub fn reader_pins(&self) -> Vec<u32> {
        sorted_keys(&self.readers)
    }

    /// Registered writer pins, ascending.
    pub fn writer_pins(&self) -> Vec<u32> {
        sorted_keys(&self.writers)
    }
}

fn sorted_keys<V>(map: &RwLock<HashMap<u32, V>>) -> Vec<u32> {
    let mut pins: Vec<u32> = map
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .copied()
        .collect();
    pins.sort_unstable();
    pins
}

impl fmt::Debug for PinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinRegistry")
            .field("readers", &self.reader_pins())
            .field("writers", &self.writer_pins())
            .field("hardware", &self.hardware_handler().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn last_registration_wins() {
        let registry = PinRegistry::new();
        registry.register_reader(5, |_| "first".to_string());
        registry.register_reader(5, |_| "second".to_string());

        let reader = registry.reader(5).unwrap();
        assert_eq!(reader(5), "second");
        assert_eq!(registry.reader_pins(), vec![5]);
    }

    #[test]
    fn writer_receives_pin_and_value() {
        let registry = PinRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.register_writer(12, move |pin, value| {
            sink.lock().unwrap().push((pin, value.to_string()));
        });

        registry.writer(12).unwrap()(12, "4.567");
        assert_eq!(*seen.lock().unwrap(), vec![(12, "4.567".to_string())]);
        assert!(registry.writer(13).is_none());
    }

    #[test]
    fn unregister_removes_entry() {
        let registry = PinRegistry::new();
        registry.register_reader(1, |_| String::new());
        registry.register_writer(2, |_, _| {});

        assert!(registry.unregister_reader(1));
        assert!(!registry.unregister_reader(1));
        assert!(registry.unregister_writer(2));
        assert!(registry.reader(1).is_none());
        assert!(registry.writer(2).is_none());
    }

    #[test]
    fn clones_share_entries() {
        let registry = PinRegistry::new();
        let clone = registry.clone();
        clone.register_reader(7, |pin| pin.to_string());
        assert_eq!(registry.reader(7).unwrap()(7), "7");
    }

    #[test]
    fn debug_lists_pins() {
        let registry = PinRegistry::new();
        registry.register_reader(10, |_| String::new());
        registry.register_writer(14, |_, _| {});
        registry.register_writer(12, |_, _| {});
        assert_eq!(
            format!("{registry:?}"),
            "PinRegistry { readers: [10], writers: [12, 14], hardware: false }"
        );
    }

    #[test]
    fn hardware_handler_slot() {
        let registry = PinRegistry::new();
        assert!(registry.hardware_handler().is_none());
        registry.set_hardware_handler(|_| {});
        assert!(registry.hardware_handler().is_some());
        registry.clear_hardware_handler();
        assert!(registry.hardware_handler().is_none());
    }
}
