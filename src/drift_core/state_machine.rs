// ==============================================================================
// state_machine.rs - GENERIC STATE MACHINE KEYED BY A SMALL CLOSED ENUM
// ==============================================================================
// - register_state(): first registration for a key wins
// - set_state(): no-op when already active; otherwise exit old, enter new,
//   notify observers
// - unknown keys are reported as errors, the active state is kept
//
// Slots are a Vec indexed by StateKey::index(), sized StateKey::COUNT.
// ==============================================================================

use std::fmt::Debug;

use crate::error::StateMachineError;

/// Key of a state slot. Implemented by small fieldless enums.
pub trait StateKey: Copy + Eq + Debug {
    const COUNT: usize;
    fn index(self) -> usize;
}

/// Lifecycle hooks. All default to no-ops.
pub trait State {
    type Key: StateKey;

    fn key(&self) -> Self::Key;
    fn on_enter(&mut self) {}
    fn on_update(&mut self, _dt: f32) {}
    fn on_fixed_update(&mut self, _dt: f32) {}
    fn on_exit(&mut self) {}
}

type ChangeObserver<K> = Box<dyn FnMut(Option<K>, K) + Send>;

pub struct StateMachine<S: State> {
    slots: Vec<Option<S>>,
    current: Option<S::Key>,
    previous: Option<S::Key>,
    observers: Vec<ChangeObserver<S::Key>>,
}

impl<S: State> Default for StateMachine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> StateMachine<S> {
    pub fn new() -> Self {
        Self {
            slots: (0..S::Key::COUNT).map(|_| None).collect(),
            current: None,
            previous: None,
            observers: Vec::new(),
        }
    }

    /// Stores `state` under its key. Returns false (and drops `state`) when
    /// the key is already taken.
    pub fn register_state(&mut self, state: S) -> bool {
        let slot = &mut self.slots[state.key().index()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(state);
        true
    }

    pub fn deregister_state(&mut self, key: S::Key) -> Result<Option<S>, StateMachineError<S::Key>> {
        if self.current == Some(key) {
            return Err(StateMachineError::StateActive(key));
        }
        Ok(self.slots[key.index()].take())
    }

    pub fn is_registered(&self, key: S::Key) -> bool {
        self.slots[key.index()].is_some()
    }

    /// Switches to `key`. Ok(false) means it was already active.
    pub fn set_state(&mut self, key: S::Key) -> Result<bool, StateMachineError<S::Key>> {
        if self.current == Some(key) {
            return Ok(false);
        }
        if !self.is_registered(key) {
            return Err(StateMachineError::UnregisteredState(key));
        }

        let prev = self.current;
        if let Some(old) = prev.and_then(|k| self.slots[k.index()].as_mut()) {
            old.on_exit();
        }

        self.previous = prev;
        self.current = Some(key);

        if let Some(new) = self.slots[key.index()].as_mut() {
            new.on_enter();
        }

        for observer in self.observers.iter_mut() {
            observer(prev, key);
        }
        Ok(true)
    }

    pub fn current_state(&self) -> Option<S::Key> {
        self.current
    }

    pub fn previous_state(&self) -> Option<S::Key> {
        self.previous
    }

    pub fn current(&self) -> Option<&S> {
        self.current.and_then(|k| self.slots[k.index()].as_ref())
    }

    pub fn get(&self, key: S::Key) -> Option<&S> {
        self.slots[key.index()].as_ref()
    }

    /// Registers a callback fired with `(previous, current)` after each switch.
    pub fn on_state_changed(&mut self, observer: impl FnMut(Option<S::Key>, S::Key) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn update(&mut self, dt: f32) {
        if let Some(s) = self.current.and_then(|k| self.slots[k.index()].as_mut()) {
            s.on_update(dt);
        }
    }

    pub fn fixed_update(&mut self, dt: f32) {
        if let Some(s) = self.current.and_then(|k| self.slots[k.index()].as_mut()) {
            s.on_fixed_update(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mode {
        A,
        B,
        C,
    }

    impl StateKey for Mode {
        const COUNT: usize = 3;
        fn index(self) -> usize {
            self as usize
        }
    }

    type Log = Arc<Mutex<Vec<String>>>;

    struct Probe {
        key: Mode,
        tag: &'static str,
        log: Log,
    }

    impl State for Probe {
        type Key = Mode;
        fn key(&self) -> Mode {
            self.key
        }
        fn on_enter(&mut self) {
            self.log.lock().unwrap().push(format!("enter {}", self.tag));
        }
        fn on_update(&mut self, _dt: f32) {
            self.log.lock().unwrap().push(format!("update {}", self.tag));
        }
        fn on_exit(&mut self) {
            self.log.lock().unwrap().push(format!("exit {}", self.tag));
        }
    }

    fn machine(log: &Log) -> StateMachine<Probe> {
        let mut sm = StateMachine::new();
        assert!(sm.register_state(Probe { key: Mode::A, tag: "a", log: log.clone() }));
        assert!(sm.register_state(Probe { key: Mode::B, tag: "b", log: log.clone() }));
        sm
    }

    #[test]
    fn starts_empty() {
        let log = Log::default();
        let sm = machine(&log);
        assert_eq!(sm.current_state(), None);
        assert_eq!(sm.previous_state(), None);
    }

    #[test]
    fn first_registration_wins() {
        let log = Log::default();
        let mut sm = machine(&log);
        assert!(!sm.register_state(Probe { key: Mode::A, tag: "dup", log: log.clone() }));
        sm.set_state(Mode::A).unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["enter a"]);
    }

    #[test]
    fn transition_runs_exit_then_enter() {
        let log = Log::default();
        let mut sm = machine(&log);
        assert_eq!(sm.set_state(Mode::A), Ok(true));
        assert_eq!(sm.set_state(Mode::B), Ok(true));
        assert_eq!(log.lock().unwrap().as_slice(), ["enter a", "exit a", "enter b"]);
        assert_eq!(sm.current_state(), Some(Mode::B));
        assert_eq!(sm.previous_state(), Some(Mode::A));
    }

    #[test]
    fn same_state_is_idempotent() {
        let log = Log::default();
        let mut sm = machine(&log);
        sm.set_state(Mode::A).unwrap();
        sm.set_state(Mode::B).unwrap();
        log.lock().unwrap().clear();

        assert_eq!(sm.set_state(Mode::B), Ok(false));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(sm.previous_state(), Some(Mode::A));
    }

    #[test]
    fn unregistered_state_keeps_current() {
        let log = Log::default();
        let mut sm = machine(&log);
        sm.set_state(Mode::A).unwrap();
        assert_eq!(sm.set_state(Mode::C), Err(StateMachineError::UnregisteredState(Mode::C)));
        assert_eq!(sm.current_state(), Some(Mode::A));
        assert_eq!(sm.previous_state(), None);
    }

    #[test]
    fn observers_see_previous_and_current() {
        let log = Log::default();
        let mut sm = machine(&log);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        sm.on_state_changed(move |prev, cur| sink.lock().unwrap().push((prev, cur)));

        sm.set_state(Mode::A).unwrap();
        sm.set_state(Mode::A).unwrap();
        sm.set_state(Mode::B).unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), [(None, Mode::A), (Some(Mode::A), Mode::B)]);
    }

    #[test]
    fn update_reaches_active_state_only() {
        let log = Log::default();
        let mut sm = machine(&log);
        sm.update(0.016);
        sm.set_state(Mode::B).unwrap();
        sm.update(0.016);
        assert_eq!(log.lock().unwrap().as_slice(), ["enter b", "update b"]);
    }

    #[test]
    fn cannot_deregister_active_state() {
        let log = Log::default();
        let mut sm = machine(&log);
        sm.set_state(Mode::A).unwrap();
        assert_eq!(sm.deregister_state(Mode::A).err(), Some(StateMachineError::StateActive(Mode::A)));
        assert!(sm.deregister_state(Mode::B).unwrap().is_some());
        assert!(!sm.is_registered(Mode::B));
        assert!(sm.deregister_state(Mode::B).unwrap().is_none());
    }
}
