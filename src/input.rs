//! Keyboard input tracker feeding `domain::player::FrameInput`.
//!
//! Grounded on the teacher's `ui/input.rs`: a held/fresh-press tracker
//! over raw `crossterm` key events, with a timeout-based release fallback
//! for terminals that don't report `KeyEventKind::Release`. Generalized
//! from the teacher's movement+dig action set to this game's
//! left/right/up/down/jump/fire set.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, poll};

use crate::domain::player::FrameInput;

/// After this duration without a Press/Repeat event, consider the key
/// released. Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_JUMP: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Char('k'), KeyCode::Char('K')];
const KEYS_FIRE: &[KeyCode] = &[KeyCode::Char('j'), KeyCode::Char('J'), KeyCode::LeftControl];

pub struct InputState {
    last_active: HashMap<KeyCode, Instant>,
    fresh_presses: Vec<KeyCode>,
    raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
        }
    }

    /// Drains all pending terminal events and updates key states. Call
    /// once per render frame, before building this frame's `FrameInput`.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);
                if key.kind != KeyEventKind::Release {
                    let was_held = self.is_held(key.code);
                    self.last_active.insert(key.code, Instant::now());
                    if !was_held {
                        self.fresh_presses.push(key.code);
                    }
                }
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code).map(|t| t.elapsed() < HOLD_TIMEOUT).unwrap_or(false)
    }

    fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        use crossterm::event::KeyModifiers;
        self.raw_events
            .iter()
            .any(|k| k.modifiers.contains(KeyModifiers::CONTROL) && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C')))
    }

    /// Builds this frame's `FrameInput` from currently-tracked key state.
    /// `gamepad` contributions (if any) are OR'd in by the caller before
    /// `FrameInput::sanitized()` is applied.
    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            left: self.any_held(KEYS_LEFT),
            right: self.any_held(KEYS_RIGHT),
            up: self.any_held(KEYS_UP),
            down: self.any_held(KEYS_DOWN),
            jump_held: self.any_held(KEYS_JUMP),
            jump_pressed: self.any_pressed(KEYS_JUMP),
            fire_held: self.any_held(KEYS_FIRE),
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
