//! Gamepad input, merged into the same `FrameInput` the keyboard tracker
//! produces.
//!
//! Grounded on the teacher's `ui/gamepad.rs`: a `gilrs`-backed poller with
//! a configurable button-name mapping loaded from `GamepadConfig`, held
//! behind the `gamepad` feature with a connected-less no-op fallback when
//! the feature is disabled or no pad is attached.

use crate::config::GamepadConfig;
use crate::domain::player::FrameInput;

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, Gilrs};

const STICK_DEADZONE: f32 = 0.25;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Btn {
    South,
    North,
    East,
    West,
    DPadLeft,
    DPadRight,
    DPadUp,
    DPadDown,
    LeftStickLeft,
    LeftStickRight,
    LeftStickUp,
    LeftStickDown,
    Start,
    Select,
    LeftTrigger2,
    RightTrigger2,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "SOUTH" | "A" => Some(Btn::South),
            "NORTH" | "Y" => Some(Btn::North),
            "EAST" | "B" => Some(Btn::East),
            "WEST" | "X" => Some(Btn::West),
            "DPADLEFT" => Some(Btn::DPadLeft),
            "DPADRIGHT" => Some(Btn::DPadRight),
            "DPADUP" => Some(Btn::DPadUp),
            "DPADDOWN" => Some(Btn::DPadDown),
            "LEFTSTICKLEFT" => Some(Btn::LeftStickLeft),
            "LEFTSTICKRIGHT" => Some(Btn::LeftStickRight),
            "LEFTSTICKUP" => Some(Btn::LeftStickUp),
            "LEFTSTICKDOWN" => Some(Btn::LeftStickDown),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            "LEFTTRIGGER2" | "LT" | "L2" => Some(Btn::LeftTrigger2),
            "RIGHTTRIGGER2" | "RT" | "R2" => Some(Btn::RightTrigger2),
            _ => None,
        }
    }
}

struct ActionMap {
    left: Vec<Btn>,
    right: Vec<Btn>,
    up: Vec<Btn>,
    down: Vec<Btn>,
    jump: Vec<Btn>,
    fire: Vec<Btn>,
}

impl ActionMap {
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse(names: &[String], default: Vec<Btn>) -> Vec<Btn> {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if parsed.is_empty() { default } else { parsed }
        }
        ActionMap {
            left: parse(&cfg.left, vec![Btn::DPadLeft, Btn::LeftStickLeft]),
            right: parse(&cfg.right, vec![Btn::DPadRight, Btn::LeftStickRight]),
            up: parse(&cfg.up, vec![Btn::DPadUp, Btn::LeftStickUp]),
            down: parse(&cfg.down, vec![Btn::DPadDown, Btn::LeftStickDown]),
            jump: parse(&cfg.jump, vec![Btn::South]),
            fire: parse(&cfg.fire, vec![Btn::West, Btn::RightTrigger2]),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,
    action_map: ActionMap,
    held: std::collections::HashSet<Btn>,
    pressed_this_frame: std::collections::HashSet<Btn>,
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs = Gilrs::new().ok();

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            action_map: ActionMap::from_config(cfg),
            held: std::collections::HashSet::new(),
            pressed_this_frame: std::collections::HashSet::new(),
        }
    }

    /// Polls pending pad events. A no-op when the `gamepad` feature is
    /// disabled or no pad connected, leaving `held` empty forever.
    pub fn update(&mut self) {
        self.pressed_this_frame.clear();
        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let Some(gilrs) = &mut self.gilrs else { return };
        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();
        for event in events {
            match event.event {
                gilrs::EventType::ButtonPressed(button, _) => {
                    if let Some(btn) = map_button(button) {
                        self.held.insert(btn);
                        self.pressed_this_frame.insert(btn);
                    }
                }
                gilrs::EventType::ButtonReleased(button, _) => {
                    if let Some(btn) = map_button(button) {
                        self.held.remove(&btn);
                    }
                }
                gilrs::EventType::AxisChanged(Axis::LeftStickX, value, _) => {
                    set_axis(&mut self.held, value, STICK_DEADZONE, Btn::LeftStickLeft, Btn::LeftStickRight);
                }
                gilrs::EventType::AxisChanged(Axis::LeftStickY, value, _) => {
                    set_axis(&mut self.held, value, STICK_DEADZONE, Btn::LeftStickDown, Btn::LeftStickUp);
                }
                _ => {}
            }
        }
    }

    fn any_held(&self, buttons: &[Btn]) -> bool {
        buttons.iter().any(|b| self.held.contains(b))
    }

    fn any_pressed(&self, buttons: &[Btn]) -> bool {
        buttons.iter().any(|b| self.pressed_this_frame.contains(b))
    }

    /// Contributions to `FrameInput`, OR'd with the keyboard's own.
    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            left: self.any_held(&self.action_map.left),
            right: self.any_held(&self.action_map.right),
            up: self.any_held(&self.action_map.up),
            down: self.any_held(&self.action_map.down),
            jump_held: self.any_held(&self.action_map.jump),
            jump_pressed: self.any_pressed(&self.action_map.jump),
            fire_held: self.any_held(&self.action_map.fire),
        }
    }
}

#[cfg(feature = "gamepad")]
fn map_button(button: Button) -> Option<Btn> {
    match button {
        Button::South => Some(Btn::South),
        Button::North => Some(Btn::North),
        Button::East => Some(Btn::East),
        Button::West => Some(Btn::West),
        Button::DPadLeft => Some(Btn::DPadLeft),
        Button::DPadRight => Some(Btn::DPadRight),
        Button::DPadUp => Some(Btn::DPadUp),
        Button::DPadDown => Some(Btn::DPadDown),
        Button::Start => Some(Btn::Start),
        Button::Select => Some(Btn::Select),
        Button::LeftTrigger2 => Some(Btn::LeftTrigger2),
        Button::RightTrigger2 => Some(Btn::RightTrigger2),
        _ => None,
    }
}

#[cfg(feature = "gamepad")]
fn set_axis(held: &mut std::collections::HashSet<Btn>, value: f32, deadzone: f32, negative: Btn, positive: Btn) {
    held.remove(&negative);
    held.remove(&positive);
    if value <= -deadzone {
        held.insert(negative);
    } else if value >= deadzone {
        held.insert(positive);
    }
}

fn merge(a: FrameInput, b: FrameInput) -> FrameInput {
    FrameInput {
        left: a.left || b.left,
        right: a.right || b.right,
        up: a.up || b.up,
        down: a.down || b.down,
        jump_held: a.jump_held || b.jump_held,
        jump_pressed: a.jump_pressed || b.jump_pressed,
        fire_held: a.fire_held || b.fire_held,
    }
}

pub fn merge_inputs(keyboard: FrameInput, gamepad: FrameInput) -> FrameInput {
    merge(keyboard, gamepad)
}
