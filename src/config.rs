/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
/// Every tunable named explicitly in the simulation spec (tick rate,
/// gravity, terminal velocity, jump arc, mercy-frame durations, ...) is
/// config-overridable so a host application can tweak game feel without
/// recompiling, the same way the teacher's `SpeedConfig` makes its own
/// gameplay timings overridable.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub sim: SimConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
}

/// Tunables for the fixed-timestep simulation, generalized from the
/// source engine's hard-coded constants (`spec.md §4.3`, `§4.4`, `§4.7`).
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Simulation updates per second. The source runs at 15 Hz.
    pub ticks_per_second: u32,
    /// Per-tick gravity acceleration applied to falling bodies.
    pub gravity_step: f32,
    /// Maximum downward velocity (tiles/tick).
    pub terminal_velocity: f32,
    /// Upward offsets for the 8-step jump arc (tiles per frame of the arc).
    pub jump_arc: [i32; 8],
    /// 1-in-N chance per jump of triggering the cosmetic somersault.
    pub somersault_chance_denominator: u32,
    /// How many frames the somersault animation plays for.
    pub somersault_frames: u32,
    /// Mercy-frame duration in ticks, indexed by difficulty (Easy/Medium/Hard).
    pub mercy_frames: [u32; 3],
    /// Frame counter at which temporary items (rapid fire, cloak) expire.
    pub temp_item_duration: u32,
    /// Frames before expiry at which the "timing out" message is shown.
    pub temp_item_warning_lead: u32,
    /// Camera: horizontal dead-zone start/end columns (widened viewport units).
    pub camera_dead_zone_x: (i32, i32),
    /// Camera: maximum horizontal adjustment per tick.
    pub camera_max_scroll_x: i32,
    /// Camera: maximum vertical adjustment per tick (up, down).
    pub camera_max_scroll_y: (i32, i32),
    /// Camera: maximum vertical adjustment per tick while riding an elevator.
    pub camera_max_scroll_y_elevator: i32,
    /// Manual vertical scroll cooldown (ticks) after firing a shot.
    pub camera_fire_cooldown: u32,
    /// Width of the "active region" margin added around the viewport.
    pub active_region_margin: i32,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            ticks_per_second: 15,
            gravity_step: 0.56,
            terminal_velocity: 2.0,
            jump_arc: [2, 2, 1, 1, 1, 0, 0, 0],
            somersault_chance_denominator: 6,
            somersault_frames: 16,
            mercy_frames: [40, 30, 20],
            temp_item_duration: 700,
            temp_item_warning_lead: 30,
            camera_dead_zone_x: (11, 21),
            camera_max_scroll_x: 2,
            camera_max_scroll_y: (2, 2),
            camera_max_scroll_y_elevator: 3,
            camera_fire_cooldown: 4,
            active_region_margin: 4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub jump: Vec<String>,
    pub fire: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    sim: TomlSim,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSim {
    #[serde(default = "default_ticks_per_second")]
    ticks_per_second: u32,
    #[serde(default = "default_gravity_step")]
    gravity_step: f32,
    #[serde(default = "default_terminal_velocity")]
    terminal_velocity: f32,
    #[serde(default = "default_mercy_easy")]
    mercy_frames_easy: u32,
    #[serde(default = "default_mercy_medium")]
    mercy_frames_medium: u32,
    #[serde(default = "default_mercy_hard")]
    mercy_frames_hard: u32,
    #[serde(default = "default_temp_item_duration")]
    temp_item_duration: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_left")]
    left: Vec<String>,
    #[serde(default = "default_right")]
    right: Vec<String>,
    #[serde(default = "default_up")]
    up: Vec<String>,
    #[serde(default = "default_down")]
    down: Vec<String>,
    #[serde(default = "default_jump")]
    jump: Vec<String>,
    #[serde(default = "default_fire")]
    fire: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

// ── Defaults ──

fn default_ticks_per_second() -> u32 { 15 }
fn default_gravity_step() -> f32 { 0.56 }
fn default_terminal_velocity() -> f32 { 2.0 }
fn default_mercy_easy() -> u32 { 40 }
fn default_mercy_medium() -> u32 { 30 }
fn default_mercy_hard() -> u32 { 20 }
fn default_temp_item_duration() -> u32 { 700 }

fn default_left() -> Vec<String> { vec!["DPadLeft".into(), "LeftStickLeft".into()] }
fn default_right() -> Vec<String> { vec!["DPadRight".into(), "LeftStickRight".into()] }
fn default_up() -> Vec<String> { vec!["DPadUp".into(), "LeftStickUp".into()] }
fn default_down() -> Vec<String> { vec!["DPadDown".into(), "LeftStickDown".into()] }
fn default_jump() -> Vec<String> { vec!["South".into()] }
fn default_fire() -> Vec<String> { vec!["West".into(), "RightTrigger2".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlSim {
    fn default() -> Self {
        TomlSim {
            ticks_per_second: default_ticks_per_second(),
            gravity_step: default_gravity_step(),
            terminal_velocity: default_terminal_velocity(),
            mercy_frames_easy: default_mercy_easy(),
            mercy_frames_medium: default_mercy_medium(),
            mercy_frames_hard: default_mercy_hard(),
            temp_item_duration: default_temp_item_duration(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            left: default_left(),
            right: default_right(),
            up: default_up(),
            down: default_down(),
            jump: default_jump(),
            fire: default_fire(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { levels_dir: default_levels_dir() }
    }
}

// ── Loading ──

impl GameConfig {
    /// Builds a config purely from in-memory defaults, with no filesystem
    /// or environment access. Used by simulation tests that need a
    /// deterministic `GameConfig` without the search-path logic in `load`.
    pub fn default_for_tests() -> Self {
        GameConfig {
            sim: SimConfig::default(),
            gamepad: GamepadConfig {
                left: default_left(),
                right: default_right(),
                up: default_up(),
                down: default_down(),
                jump: default_jump(),
                fire: default_fire(),
                confirm: default_confirm(),
                cancel: default_cancel(),
            },
            levels_dir: PathBuf::from("levels"),
        }
    }

    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);

        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs
                .iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let mut sim = SimConfig::default();
        sim.ticks_per_second = toml_cfg.sim.ticks_per_second;
        sim.gravity_step = toml_cfg.sim.gravity_step;
        sim.terminal_velocity = toml_cfg.sim.terminal_velocity;
        sim.mercy_frames = [
            toml_cfg.sim.mercy_frames_easy,
            toml_cfg.sim.mercy_frames_medium,
            toml_cfg.sim.mercy_frames_hard,
        ];
        sim.temp_item_duration = toml_cfg.sim.temp_item_duration;

        GameConfig {
            sim,
            gamepad: GamepadConfig {
                left: toml_cfg.gamepad.left,
                right: toml_cfg.gamepad.right,
                up: toml_cfg.gamepad.up,
                down: toml_cfg.gamepad.down,
                jump: toml_cfg.gamepad.jump,
                fire: toml_cfg.gamepad.fire,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            levels_dir,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/rigel-sim");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share/rigel-sim");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        log::warn!("config.toml parse error: {e}, using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    log::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_defaults_match_spec_constants() {
        let sim = SimConfig::default();
        assert_eq!(sim.ticks_per_second, 15);
        assert_eq!(sim.jump_arc, [2, 2, 1, 1, 1, 0, 0, 0]);
        assert_eq!(sim.mercy_frames, [40, 30, 20]);
        assert!((sim.terminal_velocity - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn toml_parses_partial_override() {
        let toml_cfg: TomlConfig = toml::from_str("[sim]\nticks_per_second = 30\n").unwrap();
        assert_eq!(toml_cfg.sim.ticks_per_second, 30);
        // Untouched fields keep their defaults.
        assert_eq!(toml_cfg.sim.mercy_frames_medium, 30);
    }
}
