/// Behavior controllers: per-actor AI state machines.
///
/// Grounded on the teacher's `domain/ai.rs` `Ctx<'a>` pattern — a small
/// borrowed context bundling the read-only query surface a controller
/// needs, built fresh each call rather than threaded field-by-field
/// through every function signature. Generalized from the teacher's single
/// BFS-chase behavior to the closed set of controller kinds named in
/// `spec.md §4.9`: a tagged union over per-actor state structs, advanced by
/// `BehaviorControllerSystem` once per tick for every `Active` entity that
/// carries one.

use crate::domain::actor_ids;
use crate::domain::entity::{EntityId, EntityStore, Orientation, WorldPosition};
use crate::sim::world::GlobalDependencies;

/// Closed set of AI controller kinds. Each variant owns exactly the state
/// its contract in `spec.md §4.9` needs; there is no virtual dispatch.
#[derive(Clone, Debug)]
pub enum BehaviorController {
    LaserTurret(LaserTurretState),
    RocketTurret(RocketTurretState),
    SlimePipe(SlimePipeState),
    RocketTrail(RocketTrailState),
    BurnFx(BurnFxState),
}

impl BehaviorController {
    /// `update(deps, globalState, onScreen, entity)` per `spec.md §4.9`.
    pub fn update(
        &mut self,
        deps: &mut GlobalDependencies,
        store: &mut EntityStore,
        entity: EntityId,
        on_screen: bool,
        player_position: WorldPosition,
    ) {
        match self {
            BehaviorController::LaserTurret(state) => {
                update_laser_turret(state, deps, store, entity, on_screen, player_position)
            }
            BehaviorController::RocketTurret(state) => {
                update_rocket_turret(state, deps, store, entity, on_screen, player_position)
            }
            BehaviorController::SlimePipe(state) => {
                update_slime_pipe(state, deps, store, entity, on_screen)
            }
            BehaviorController::RocketTrail(state) => {
                update_rocket_trail(state, deps, store, entity)
            }
            BehaviorController::BurnFx(state) => update_burn_fx(state, deps, store, entity),
        }
    }
}

// ── LaserTurret ──
// Angle in [0,7]; faces the player by rotating one step toward 0 or 4 while
// stationary, counts down 40 frames once aligned, then fires. Getting hit
// enters a 40-turn invincible spin before resetting (`spec.md §4.9`).

#[derive(Clone, Copy, Debug)]
pub struct LaserTurretState {
    pub angle: u8,
    pub phase: LaserTurretPhase,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LaserTurretPhase {
    Rotating,
    Firing { countdown: u32 },
    Spinning { turns_remaining: u32 },
}

impl LaserTurretState {
    pub fn new() -> Self {
        LaserTurretState { angle: 0, phase: LaserTurretPhase::Rotating }
    }

    /// Called by damage infliction when this turret is shot; enters the
    /// invincible spin-reset contract instead of dying outright.
    pub fn on_hit(&mut self) {
        self.phase = LaserTurretPhase::Spinning { turns_remaining: 40 };
    }
}

fn facing_angle_target(turret: WorldPosition, player: WorldPosition) -> u8 {
    // angle 0 = facing right, 4 = facing left; the turret only ever turns
    // to track which side of it the player is on.
    if player.x >= turret.x { 0 } else { 4 }
}

fn update_laser_turret(
    state: &mut LaserTurretState,
    deps: &mut GlobalDependencies,
    store: &mut EntityStore,
    entity: EntityId,
    _on_screen: bool,
    player_position: WorldPosition,
) {
    let position = store.position(entity).copied().unwrap_or_default();

    match state.phase {
        LaserTurretPhase::Spinning { turns_remaining } => {
            state.angle = (state.angle + 1) % 8;
            if turns_remaining <= 1 {
                state.phase = LaserTurretPhase::Rotating;
                if let Some(shootable) = store.shootable_mut(entity) {
                    shootable.invincible = false;
                }
            } else {
                state.phase = LaserTurretPhase::Spinning { turns_remaining: turns_remaining - 1 };
            }
        }
        LaserTurretPhase::Rotating => {
            if let Some(shootable) = store.shootable_mut(entity) {
                shootable.invincible = true;
            }
            let target = facing_angle_target(position, player_position);
            if state.angle != target {
                state.angle = rotate_one_step(state.angle, target);
            } else {
                if let Some(shootable) = store.shootable_mut(entity) {
                    shootable.invincible = false;
                }
                state.phase = LaserTurretPhase::Firing { countdown: 40 };
            }
        }
        LaserTurretPhase::Firing { countdown } => {
            if countdown == 0 {
                let orientation = if state.angle == 0 { Orientation::Right } else { Orientation::Left };
                deps.spawn_actor(store, actor_ids::LASER_TURRET_SHOT, position, orientation);
                state.phase = LaserTurretPhase::Rotating;
            } else {
                if countdown < 7 && deps.tick_parity {
                    if let Some(sprite) = store.sprite_mut(entity) {
                        sprite.flash = true;
                    }
                } else if let Some(sprite) = store.sprite_mut(entity) {
                    sprite.flash = false;
                }
                state.phase = LaserTurretPhase::Firing { countdown: countdown - 1 };
            }
        }
    }
}

/// Rotates `current` one step toward `target` along the 8-position ring,
/// preferring the shorter arc.
fn rotate_one_step(current: u8, target: u8) -> u8 {
    if current == target {
        return current;
    }
    let forward = (target as i16 - current as i16).rem_euclid(8);
    if forward <= 4 {
        (current + 1) % 8
    } else {
        (current + 7) % 8
    }
}

// ── RocketTurret ──
// Picks an orientation from relative player position each time it fires,
// and fires on a fixed 25-frame cadence (`spec.md §4.9`).

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RocketOrientation {
    Left,
    Top,
    Right,
}

#[derive(Clone, Copy, Debug)]
pub struct RocketTurretState {
    pub frames_until_fire: u32,
}

impl RocketTurretState {
    pub fn new() -> Self {
        RocketTurretState { frames_until_fire: 25 }
    }
}

fn pick_rocket_orientation(turret: WorldPosition, player: WorldPosition) -> RocketOrientation {
    if player.y + 2 < turret.y {
        RocketOrientation::Top
    } else if player.x < turret.x {
        RocketOrientation::Left
    } else {
        RocketOrientation::Right
    }
}

fn rocket_launch_offset(orientation: RocketOrientation) -> (i32, i32) {
    match orientation {
        RocketOrientation::Left => (-1, 0),
        RocketOrientation::Top => (0, -1),
        RocketOrientation::Right => (1, 0),
    }
}

fn update_rocket_turret(
    state: &mut RocketTurretState,
    deps: &mut GlobalDependencies,
    store: &mut EntityStore,
    entity: EntityId,
    _on_screen: bool,
    player_position: WorldPosition,
) {
    if state.frames_until_fire > 1 {
        state.frames_until_fire -= 1;
        return;
    }

    let position = store.position(entity).copied().unwrap_or_default();
    let orientation = pick_rocket_orientation(position, player_position);
    let (dx, dy) = rocket_launch_offset(orientation);
    let spawn_at = WorldPosition::new(position.x + dx, position.y + dy);
    let facing = if dx < 0 { Orientation::Left } else { Orientation::Right };
    deps.spawn_actor(store, actor_ids::ENEMY_ROCKET, spawn_at, facing);

    state.frames_until_fire = 25;
}

// ── SlimePipe ──
// Drips a gravity-affected slime drop one tile below every 25 frames; the
// drop auto-destroys on its first world collision (`spec.md §4.9`).

#[derive(Clone, Copy, Debug)]
pub struct SlimePipeState {
    pub frames_until_drop: u32,
}

impl SlimePipeState {
    pub fn new() -> Self {
        SlimePipeState { frames_until_drop: 25 }
    }
}

fn update_slime_pipe(
    state: &mut SlimePipeState,
    deps: &mut GlobalDependencies,
    store: &mut EntityStore,
    entity: EntityId,
    _on_screen: bool,
) {
    if state.frames_until_drop > 1 {
        state.frames_until_drop -= 1;
        return;
    }

    let position = store.position(entity).copied().unwrap_or_default();
    let drop_at = WorldPosition::new(position.x, position.y + 1);
    if let Some(drop) = deps.spawn_actor(store, actor_ids::SLIME_DROP, drop_at, Orientation::Right) {
        store.set_auto_destroy(drop, crate::domain::entity::AutoDestroy::on_world_collision());
    }

    state.frames_until_drop = 25;
}

// ── RocketTrail ──
// Attached to a player rocket shot in flight: drops a short-lived smoke
// puff at the rocket's own position every 4 frames, matching `spec.md
// §4.5`'s "Rockets spawn a trail of smoke puffs". Purely cosmetic; the
// rocket's own `MovingBody`/auto-destroy handle its flight and impact.

#[derive(Clone, Copy, Debug)]
pub struct RocketTrailState {
    pub frames_until_puff: u32,
}

impl RocketTrailState {
    pub fn new() -> Self {
        RocketTrailState { frames_until_puff: 4 }
    }
}

fn update_rocket_trail(state: &mut RocketTrailState, deps: &mut GlobalDependencies, store: &mut EntityStore, entity: EntityId) {
    if state.frames_until_puff > 1 {
        state.frames_until_puff -= 1;
        return;
    }
    if let Some(position) = store.position(entity).copied() {
        if let Some(puff) = deps.spawn_actor(store, actor_ids::SMOKE_PUFF, position, Orientation::Right) {
            store.set_auto_destroy(puff, crate::domain::entity::AutoDestroy::after_ticks(11));
        }
    }
    state.frames_until_puff = 4;
}

// ── BurnFx ──
// Dropped on flammable tiles caught in a rocket's impact blast
// (`spec.md §4.5`: "fire-burst on impact that burns flammable tiles").
// Spawns a smoke puff every 8 frames for its lifetime, then self-destructs;
// it never touches the map tiles themselves, only the visual burn cue.

#[derive(Clone, Copy, Debug)]
pub struct BurnFxState {
    pub ticks_remaining: u32,
    pub frames_until_puff: u32,
}

impl BurnFxState {
    pub fn new(duration_ticks: u32) -> Self {
        BurnFxState { ticks_remaining: duration_ticks, frames_until_puff: 8 }
    }
}

fn update_burn_fx(state: &mut BurnFxState, deps: &mut GlobalDependencies, store: &mut EntityStore, entity: EntityId) {
    if state.ticks_remaining == 0 {
        store.destroy(entity);
        return;
    }
    state.ticks_remaining -= 1;

    if state.frames_until_puff > 1 {
        state.frames_until_puff -= 1;
    } else {
        if let Some(position) = store.position(entity).copied() {
            if let Some(puff) = deps.spawn_actor(store, actor_ids::SMOKE_PUFF, position, Orientation::Right) {
                store.set_auto_destroy(puff, crate::domain::entity::AutoDestroy::after_ticks(11));
            }
        }
        state.frames_until_puff = 8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_one_step_picks_shorter_arc() {
        assert_eq!(rotate_one_step(0, 4), 1);
        assert_eq!(rotate_one_step(6, 0), 7);
        assert_eq!(rotate_one_step(2, 2), 2);
    }

    #[test]
    fn facing_angle_targets_player_side() {
        let turret = WorldPosition::new(10, 0);
        assert_eq!(facing_angle_target(turret, WorldPosition::new(20, 0)), 0);
        assert_eq!(facing_angle_target(turret, WorldPosition::new(0, 0)), 4);
    }

    #[test]
    fn rocket_orientation_prefers_top_when_far_above() {
        let turret = WorldPosition::new(10, 10);
        assert_eq!(pick_rocket_orientation(turret, WorldPosition::new(10, 0)), RocketOrientation::Top);
        assert_eq!(pick_rocket_orientation(turret, WorldPosition::new(0, 10)), RocketOrientation::Left);
        assert_eq!(pick_rocket_orientation(turret, WorldPosition::new(20, 10)), RocketOrientation::Right);
    }

    #[test]
    fn laser_turret_fires_after_countdown() {
        let mut state = LaserTurretState::new();
        state.phase = LaserTurretPhase::Firing { countdown: 0 };
        // Firing transition itself is exercised through `update_laser_turret`
        // in integration tests that construct a full `GlobalDependencies`;
        // this unit test only pins the phase-table shape.
        assert_eq!(state.phase, LaserTurretPhase::Firing { countdown: 0 });
    }

    #[test]
    fn burn_fx_destroys_itself_once_its_duration_elapses() {
        use rand::SeedableRng;
        let mut store = EntityStore::new();
        let id = store.spawn();
        store.set_position(id, WorldPosition::new(3, 3));
        let mut state = BurnFxState::new(1);

        let map = crate::domain::tile::Map::new(8, 8);
        let tileset = crate::domain::tile::TileSet::new(1, vec![Default::default()]);
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let mut events = Vec::new();
        let mut sound = crate::render::sound::LoggingSoundService;
        let config = crate::config::GameConfig::default_for_tests();
        let factory = crate::sim::entity_factory::EntityFactory::new(crate::sim::entity_factory::Difficulty::Medium);
        let mut deps = GlobalDependencies {
            collision: crate::domain::physics::CollisionChecker::new(&map, &tileset),
            rng: &mut rng,
            events: &mut events,
            sound: &mut sound,
            entity_factory: &factory,
            config: &config,
            tick_parity: false,
        };

        update_burn_fx(&mut state, &mut deps, &mut store, id);
        assert!(store.is_alive(id));
        update_burn_fx(&mut state, &mut deps, &mut store, id);
        assert!(!store.is_alive(id));
    }
}
