//! Event traps: ON KEY / ON ERROR / ON TIMER / ON PEN / ON PLAY / ON STRIG /
//! ON COM handling.
//!
//! Traps are polled, not interrupt-driven: the host injects events at any
//! time, and the interpreter loop asks [`EventTrapSystem::check_for_events`]
//! between statements. At most one trap dispatches per poll; the rest stay
//! triggered for later polls. Polling order is definition order, so handler
//! choice is deterministic.

use std::time::{Duration, Instant};

/// Trap categories, in the dialect's ON-statement family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Key,
    Error,
    Timer,
    Pen,
    Play,
    Strig,
    Com,
    UserDefined,
}

/// One registered trap.
#[derive(Debug, Clone, Copy)]
pub struct EventTrap {
    pub event_type: EventType,
    /// Key index, joystick button, or COM port.
    pub sub_event: u16,
    pub handler_line: u16,
    /// ON state (KEY(n) ON).
    pub enabled: bool,
    /// STOP state: stays armed but does not dispatch.
    pub suspended: bool,
    /// Event seen but not yet handled.
    pub triggered: bool,
}

impl EventTrap {
    fn new(event_type: EventType, sub_event: u16) -> Self {
        EventTrap {
            event_type,
            sub_event,
            handler_line: 0,
            enabled: false,
            suspended: false,
            triggered: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TimerState {
    last_trigger: Option<Instant>,
    interval: Duration,
    enabled: bool,
}

impl Default for TimerState {
    fn default() -> Self {
        TimerState {
            last_trigger: None,
            interval: Duration::from_secs(1),
            enabled: false,
        }
    }
}

/// Raw key event as injected by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub scan_code: u8,
    pub pressed: bool,
}

/// Invoked when a trap dispatches: `(handler_line, type, sub_event)`.
pub type TrapCallback = Box<dyn FnMut(u16, EventType, u16)>;

// Key indices as the dialect numbers them for KEY(n).
pub const KEY_F1: u16 = 1;
pub const KEY_F10: u16 = 10;
pub const KEY_CURSOR_UP: u16 = 11;
pub const KEY_CURSOR_LEFT: u16 = 12;
pub const KEY_CURSOR_RIGHT: u16 = 13;
pub const KEY_CURSOR_DOWN: u16 = 14;

#[derive(Default)]
pub struct EventTrapSystem {
    traps: Vec<EventTrap>,
    timer: TimerState,
    pending_keys: Vec<KeyEvent>,
    callback: Option<TrapCallback>,
}

impl std::fmt::Debug for EventTrapSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTrapSystem")
            .field("traps", &self.traps)
            .field("timer", &self.timer)
            .field("pending_keys", &self.pending_keys.len())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl EventTrapSystem {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- configuration ----

    pub fn set_key_trap(&mut self, key_index: u16, handler_line: u16) {
        self.configure(EventType::Key, key_index, handler_line);
    }

    pub fn set_error_trap(&mut self, handler_line: u16) {
        self.configure(EventType::Error, 0, handler_line);
    }

    pub fn set_timer_trap(&mut self, handler_line: u16, interval_seconds: u16) {
        self.configure(EventType::Timer, 0, handler_line);
        self.timer.interval = Duration::from_secs(interval_seconds as u64);
        self.timer.last_trigger = Some(Instant::now());
        self.timer.enabled = true;
    }

    pub fn set_pen_trap(&mut self, handler_line: u16) {
        self.configure(EventType::Pen, 0, handler_line);
    }

    pub fn set_play_trap(&mut self, handler_line: u16) {
        self.configure(EventType::Play, 0, handler_line);
    }

    pub fn set_strig_trap(&mut self, button: u16, handler_line: u16) {
        self.configure(EventType::Strig, button, handler_line);
    }

    pub fn set_com_trap(&mut self, port: u16, handler_line: u16) {
        self.configure(EventType::Com, port, handler_line);
    }

    fn configure(&mut self, event_type: EventType, sub_event: u16, handler_line: u16) {
        let trap = self.find_or_insert(event_type, sub_event);
        trap.handler_line = handler_line;
        trap.enabled = true;
        trap.suspended = false;
        trap.triggered = false;
    }

    // ---- control (ON / OFF / STOP) ----

    pub fn enable_trap(&mut self, event_type: EventType, sub_event: u16) {
        if let Some(trap) = self.find_mut(event_type, sub_event) {
            trap.enabled = true;
            trap.suspended = false;
        }
    }

    /// OFF also forgets any pending trigger.
    pub fn disable_trap(&mut self, event_type: EventType, sub_event: u16) {
        if let Some(trap) = self.find_mut(event_type, sub_event) {
            trap.enabled = false;
            trap.suspended = false;
            trap.triggered = false;
        }
    }

    /// STOP: hold events without dispatching them.
    pub fn suspend_trap(&mut self, event_type: EventType, sub_event: u16) {
        if let Some(trap) = self.find_mut(event_type, sub_event) {
            trap.suspended = true;
        }
    }

    pub fn enable_all(&mut self) {
        for trap in &mut self.traps {
            trap.enabled = true;
            trap.suspended = false;
        }
    }

    pub fn disable_all(&mut self) {
        for trap in &mut self.traps {
            trap.enabled = false;
            trap.suspended = false;
            trap.triggered = false;
        }
        self.timer.enabled = false;
    }

    pub fn suspend_all(&mut self) {
        for trap in &mut self.traps {
            trap.suspended = true;
        }
    }

    // ---- injection ----

    /// Host key event; key releases are ignored.
    pub fn inject_key_event(&mut self, scan_code: u8, pressed: bool) {
        if !pressed {
            return;
        }
        if let Some(key_index) = map_scan_code(scan_code) {
            self.pending_keys.push(KeyEvent { scan_code, pressed });
            self.trigger(EventType::Key, key_index);
        }
    }

    /// Advance the timer; fires the timer trap once per elapsed interval.
    pub fn inject_timer_tick(&mut self) {
        if !self.timer.enabled {
            return;
        }
        let now = Instant::now();
        let due = match self.timer.last_trigger {
            Some(last) => now.duration_since(last) >= self.timer.interval,
            None => true,
        };
        if due {
            self.timer.last_trigger = Some(now);
            self.trigger(EventType::Timer, 0);
        }
    }

    pub fn inject_error(&mut self, _error_code: u16) {
        self.trigger(EventType::Error, 0);
    }

    pub fn inject_pen_event(&mut self, _x: i16, _y: i16, pressed: bool) {
        if pressed {
            self.trigger(EventType::Pen, 0);
        }
    }

    pub fn inject_play_event(&mut self) {
        self.trigger(EventType::Play, 0);
    }

    // ---- polling ----

    /// Called between statements. Returns the handler line to jump to, or 0.
    /// At most one trap dispatches per call; its trigger flag is cleared.
    pub fn check_for_events(&mut self) -> u16 {
        self.inject_timer_tick();

        for i in 0..self.traps.len() {
            let trap = self.traps[i];
            if trap.triggered && trap.enabled && !trap.suspended {
                self.traps[i].triggered = false;
                if let Some(callback) = self.callback.as_mut() {
                    callback(trap.handler_line, trap.event_type, trap.sub_event);
                }
                return trap.handler_line;
            }
        }
        0
    }

    // ---- state ----

    pub fn clear(&mut self) {
        self.traps.clear();
        self.pending_keys.clear();
        self.timer = TimerState::default();
        self.callback = None;
    }

    pub fn is_any_enabled(&self) -> bool {
        self.traps.iter().any(|t| t.enabled && !t.suspended)
    }

    pub fn has_triggered(&self) -> bool {
        self.traps
            .iter()
            .any(|t| t.triggered && t.enabled && !t.suspended)
    }

    pub fn pending_key_events(&self) -> &[KeyEvent] {
        &self.pending_keys
    }

    pub fn take_pending_keys(&mut self) -> Vec<KeyEvent> {
        std::mem::take(&mut self.pending_keys)
    }

    pub fn set_callback(&mut self, callback: TrapCallback) {
        self.callback = Some(callback);
    }

    // ---- internals ----

    fn find_mut(&mut self, event_type: EventType, sub_event: u16) -> Option<&mut EventTrap> {
        self.traps
            .iter_mut()
            .find(|t| t.event_type == event_type && t.sub_event == sub_event)
    }

    fn find_or_insert(&mut self, event_type: EventType, sub_event: u16) -> &mut EventTrap {
        if let Some(pos) = self
            .traps
            .iter()
            .position(|t| t.event_type == event_type && t.sub_event == sub_event)
        {
            &mut self.traps[pos]
        } else {
            self.traps.push(EventTrap::new(event_type, sub_event));
            self.traps.last_mut().expect("just pushed")
        }
    }

    fn trigger(&mut self, event_type: EventType, sub_event: u16) {
        if let Some(trap) = self.find_mut(event_type, sub_event) {
            if trap.enabled && !trap.suspended {
                trap.triggered = true;
            }
        }
    }
}

/// Host scan code to KEY(n) index.
fn map_scan_code(scan_code: u8) -> Option<u16> {
    match scan_code {
        // Function keys F1..F10
        58..=67 => Some((scan_code - 57) as u16),
        82 => Some(KEY_CURSOR_UP),
        80 => Some(KEY_CURSOR_LEFT),
        79 => Some(KEY_CURSOR_RIGHT),
        81 => Some(KEY_CURSOR_DOWN),
        73 => Some(15), // insert
        76 => Some(16), // delete
        74 => Some(17), // home
        77 => Some(18), // end
        75 => Some(19), // page up
        78 => Some(20), // page down
        _ => None,
    }
}
