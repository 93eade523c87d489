//! Entry point: terminal setup, asset-free demo level, and the fixed-tick
//! game loop.
//!
//! Grounded on the teacher's `main.rs::game_loop` — an accumulator that
//! drains input, steps the simulation a fixed number of times per real
//! second, and renders with interpolation between ticks — stripped of the
//! teacher's `Phase`/menu/save-slot dispatch, which has no counterpart
//! here (menu flows, save storage, and asset decoding are all treated as
//! external collaborators, `spec.md §1`).

mod config;
mod domain;
mod error;
mod gamepad;
mod input;
mod render;
mod sim;

use std::time::{Duration, Instant};

use crossterm::terminal;

use config::GameConfig;
use domain::entity::{BoundingBox, EntityId, MovingBody, Orientation, WorldPosition};
use domain::player::{PlayerController, PlayerModel};
use domain::tile::{CollisionData, Map, TileSet};
use gamepad::GamepadState;
use input::InputState;
use render::map::build_map_draw_lists;
use render::renderer::{LoggingRenderer, RendererService, SrcRect, TextureId};
use render::sound::{LoggingSoundService, SoundService};
use render::sprite::{build_sprite_draw_lists, SpriteFrameLookup};
use sim::entity_factory::{Difficulty, EntityFactory};
use sim::step::step;
use sim::world::WorldState;

/// Render frame cadence; the simulation itself always runs at
/// `config.sim.ticks_per_second` regardless of how often frames render
/// (`spec.md §5`).
const FRAME_SLEEP: Duration = Duration::from_millis(16);

/// Stands in for the real atlas lookup the host application supplies;
/// asset decoding is out of scope (`spec.md §1`), so every lookup misses
/// and no sprite or tile draw commands are ever produced. Kept as a
/// concrete, always-available default so the render passes below run
/// unconditionally and exercise the same code path a real backend would.
struct NullFrameLookup;

impl SpriteFrameLookup for NullFrameLookup {
    fn resolve_frame(
        &self,
        _sprite_id: u16,
        _frame_index: u16,
        _orientation: Orientation,
    ) -> Option<(TextureId, SrcRect, (i32, i32))> {
        None
    }
}

impl render::map::TileFrameLookup for NullFrameLookup {
    fn resolve_tile(&self, _tile_index: u16) -> Option<(TextureId, SrcRect)> {
        None
    }
}

/// Builds an open, flat demo map when no level file is supplied, so the
/// loop has something to simulate without depending on asset decoding.
fn synthetic_map() -> (Map, TileSet) {
    let tileset = TileSet::new(1, vec![CollisionData::default()]);
    let mut map = Map::new(64, 32);
    for x in 0..map.width {
        map.set_layer0(x, map.height - 1, 1);
    }
    (map, tileset)
}

fn spawn_player(world: &mut WorldState) -> EntityId {
    let id = world.entities.spawn();
    world.entities.set_position(id, WorldPosition::new(4, (world.map.height as i32) - 3));
    world.entities.set_bounding_box(id, BoundingBox::new(0, 0, 1, 2));
    world.entities.set_orientation(id, Orientation::Right);
    world.entities.set_moving_body(id, MovingBody::new(true));
    id
}

fn build_sound_service() -> Box<dyn SoundService> {
    #[cfg(feature = "sound")]
    {
        if let Some(service) = render::sound::RodioSoundService::new() {
            return Box::new(service);
        }
    }
    Box::new(LoggingSoundService)
}

fn main() {
    env_logger::init();

    let config = GameConfig::load();
    let (map, tileset) = synthetic_map();

    let view_w = 30;
    let view_h = 20;
    let mut world = WorldState::new(map, tileset, view_w, view_h);
    let factory = EntityFactory::new(Difficulty::Medium);
    let difficulty = Difficulty::Medium;

    let player = spawn_player(&mut world);
    let mut controller = PlayerController::new();
    let mut model = PlayerModel::new();
    let mut sound = build_sound_service();
    let mut renderer = LoggingRenderer::default();
    let lookup = NullFrameLookup;

    let mut keyboard = InputState::new();
    let mut pad = GamepadState::new(&config.gamepad);

    let raw_mode_enabled = terminal::enable_raw_mode().is_ok();

    let tick_duration = Duration::from_secs_f64(1.0 / config.sim.ticks_per_second as f64);
    let mut accumulator = Duration::ZERO;
    let mut last_instant = Instant::now();
    let mut anim_tick: u32 = 0;

    'running: loop {
        keyboard.drain_events();
        if keyboard.ctrl_c_pressed() {
            break 'running;
        }
        pad.update();
        let frame_input = gamepad::merge_inputs(keyboard.frame_input(), pad.frame_input());

        let now = Instant::now();
        accumulator += now.duration_since(last_instant);
        last_instant = now;

        while accumulator >= tick_duration {
            step(
                &mut world,
                &config,
                &factory,
                difficulty,
                sound.as_mut(),
                player,
                &mut controller,
                &mut model,
                frame_input,
            );
            accumulator -= tick_duration;
            anim_tick = anim_tick.wrapping_add(1);
        }

        let alpha = (accumulator.as_secs_f32() / tick_duration.as_secs_f32()).clamp(0.0, 1.0);

        let (background, foreground) =
            build_map_draw_lists(&world.map, &world.tileset, &lookup, &world.camera, anim_tick);
        let (sprites, top_most) = build_sprite_draw_lists(&world.entities, &lookup, &world.camera, alpha);

        renderer.clear(render::renderer::Color::rgb(0, 0, 0));
        for cmd in background.iter().chain(foreground.iter()) {
            renderer.draw_texture(cmd.texture, cmd.src, cmd.dest);
        }
        for cmd in sprites.iter().chain(top_most.iter()) {
            renderer.draw_texture(cmd.texture, cmd.src, cmd.dest);
        }
        renderer.present();

        std::thread::sleep(FRAME_SLEEP);
    }

    if raw_mode_enabled {
        let _ = terminal::disable_raw_mode();
    }
}
