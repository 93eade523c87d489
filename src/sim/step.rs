//! The fixed per-tick system order (`spec.md §2`): input → player, camera,
//! active-region marking, AI, physics, damage, containers/dynamic
//! geometry/effects, projectile impacts, lifetime expiry, end-of-frame.
//!
//! Grounded on the teacher's `main.rs::game_loop` tick body — a single
//! function calling each subsystem in a fixed order against one shared
//! `WorldState` — generalized from the teacher's handful of calls
//! (`update_guards`, `check_collisions`, ...) to the ten-step order named
//! in `spec.md §2`.

use crate::domain::ai::BehaviorController;
use crate::domain::containers::DynamicGeometryController;
use crate::domain::damage::{run_damage_infliction, trigger_effects};
use crate::domain::entity::{
    ActivationSettings, AutoDestroyCondition, DestructionTrigger, EntityId, EntityStore, ItemKind, Orientation, WorldPosition,
};
use crate::domain::physics::step_physics;
use crate::domain::player::{FrameInput, PlayerController, PlayerModel, PlayerState};
use crate::domain::tile::Map;
use crate::render::sound::SoundService;
use crate::sim::entity_factory::{Difficulty, EntityFactory};
use crate::sim::event::GameEvent;
use crate::sim::world::{CameraVerticalMode, GlobalDependencies, ManualScroll, WorldState};

/// Advances the simulation by exactly one tick. `player` must carry
/// `WorldPosition`/`BoundingBox`; its score/health live in `model`,
/// separately from the entity store (`spec.md §3`: "Player model").
pub fn step(
    world: &mut WorldState,
    config: &crate::config::GameConfig,
    factory: &EntityFactory,
    difficulty: Difficulty,
    sound: &mut dyn SoundService,
    player: EntityId,
    controller: &mut PlayerController,
    model: &mut PlayerModel,
    input: FrameInput,
) {
    world.events.clear();
    world.tick += 1;
    let tick_parity = world.is_odd_frame();

    snapshot_interpolation(&mut world.entities);

    // 1. Input -> player controller.
    {
        let mut deps = global_deps(world_parts(world), sound, factory, config, tick_parity);
        let mercy = config.sim.mercy_frames[difficulty_index(difficulty)];
        controller.update(&mut deps, &mut world.entities, model, player, input, mercy);
    }

    // 2. Camera.
    update_camera(world, config, controller, input, player);

    // 3. Active-region marking.
    mark_active_region(world, config);

    // 4. AI behavior controllers (active entities only).
    run_behavior_controllers(world, config, factory, sound, tick_parity, player);

    // 5. Physics.
    let physics_events = step_physics(
        &mut world.entities,
        &world.map,
        &world.tileset,
        config.sim.gravity_step,
        config.sim.terminal_velocity,
    );
    world.events.extend(physics_events);

    // 6. Damage infliction (shootables) + contact damage against the player's
    // own HP, which lives in `model`, not a `Shootable` component.
    run_damage_infliction(&mut world.entities, &mut world.events);
    run_player_contact_damage(world, config, difficulty, player, controller, model);

    // 7. Item containers release on kill; destruction effects fire; 8.
    // dynamic geometry reacts to triggers queued this tick (key pickups,
    // reactor kills); collectable pickups touch the player directly.
    run_container_release(world, config, factory, sound);
    run_dynamic_geometry(world, factory, sound, config, tick_parity);
    run_collectable_pickup(world, player, model, sound);

    // 9. Lifetime / auto-destroy expiry.
    run_auto_destroy(world, config, factory, sound);

    model.tick_temporary_items(&config.sim, &mut world.events);
    advance_transients(world);

    // 10. End-of-frame: fallen-out-of-map check, then
    // teleport/checkpoint/level-exit/player-death.
    check_player_fell_out_of_map(world, player, controller, model);
    resolve_pending(world);
}

/// `spec.md §7`: "bounding box fallen below y=mapHeight+3 fails the player
/// over". A self-correcting runtime condition, handled as a `PlayerDied`
/// domain event rather than an `InvariantViolation` error — the player
/// walking off the (now non-solid, `spec.md`/`grid.hpp`-accurate) bottom
/// edge of the map dies instead of the simulation raising an error.
fn check_player_fell_out_of_map(world: &mut WorldState, player: EntityId, controller: &mut PlayerController, model: &mut PlayerModel) {
    if matches!(controller.state, PlayerState::Dieing { .. }) {
        return;
    }
    let Some(position) = world.entities.position(player).copied() else { return };
    if position.y > world.map.height as i32 + 3 {
        model.health = 0;
        controller.state = PlayerState::Dieing { substate: crate::domain::player::DieingSubstate::Finished, frames_in_substate: 0 };
        world.events.push(GameEvent::PlayerDied);
    }
}

fn difficulty_index(difficulty: Difficulty) -> usize {
    match difficulty {
        Difficulty::Easy => 0,
        Difficulty::Medium => 1,
        Difficulty::Hard => 2,
    }
}

/// Splits the borrow of `world` the way `GlobalDependencies` needs it
/// (map/tileset immutable, rng/events mutable) without borrowing `world`
/// itself for the deps' lifetime.
struct WorldParts<'a> {
    map: &'a Map,
    tileset: &'a crate::domain::tile::TileSet,
    rng: &'a mut rand::rngs::StdRng,
    events: &'a mut Vec<GameEvent>,
}

fn world_parts(world: &mut WorldState) -> WorldParts<'_> {
    WorldParts { map: &world.map, tileset: &world.tileset, rng: &mut world.rng, events: &mut world.events }
}

fn global_deps<'a>(
    parts: WorldParts<'a>,
    sound: &'a mut dyn SoundService,
    factory: &'a EntityFactory,
    config: &'a crate::config::GameConfig,
    tick_parity: bool,
) -> GlobalDependencies<'a> {
    GlobalDependencies {
        collision: crate::domain::physics::CollisionChecker::new(parts.map, parts.tileset),
        rng: parts.rng,
        events: parts.events,
        sound,
        entity_factory: factory,
        config,
        tick_parity,
    }
}

fn snapshot_interpolation(store: &mut EntityStore) {
    for id in store.ids() {
        let Some(position) = store.position(id).copied() else { continue };
        if let Some(motion) = store.interpolate_motion_mut(id) {
            motion.previous_position = position;
        }
    }
}

fn camera_vertical_mode(state: &PlayerState) -> CameraVerticalMode {
    match state {
        PlayerState::ClimbingLadder => CameraVerticalMode::Ladder,
        PlayerState::OnPipe => CameraVerticalMode::Pipe,
        PlayerState::UsingJetpack => CameraVerticalMode::Jetpack,
        PlayerState::InShip => CameraVerticalMode::Ship,
        PlayerState::RidingElevator => CameraVerticalMode::Elevator,
        _ => CameraVerticalMode::Normal,
    }
}

/// `spec.md §4.7`: "down+grounded or up+on-pipe moves camera...".
fn manual_scroll(state: &PlayerState, input: FrameInput) -> ManualScroll {
    match state {
        PlayerState::OnGround if input.down => ManualScroll::Down,
        PlayerState::OnPipe if input.up => ManualScroll::Up,
        _ => ManualScroll::None,
    }
}

fn update_camera(
    world: &mut WorldState,
    config: &crate::config::GameConfig,
    controller: &PlayerController,
    input: FrameInput,
    player: EntityId,
) {
    let Some(rect) = world.entities.world_rect(player) else { return };
    let rect = (rect.left(), rect.top(), rect.right(), rect.bottom());
    let just_fired = world.events.iter().any(|e| matches!(e, GameEvent::PlayerFiredShot));
    let getting_sucked = matches!(controller.state, PlayerState::GettingSuckedIntoSpace);
    world.camera.update(
        (rect.0, rect.1, rect.2, rect.3),
        world.map.width as i32,
        world.map.height as i32,
        camera_vertical_mode(&controller.state),
        manual_scroll(&controller.state, input),
        just_fired,
        getting_sucked,
        &config.sim,
    );
}

/// `spec.md §2` step 3: "tags entities within a widened viewport".
/// `AfterFirstOnScreen`-activated entities latch active permanently once
/// first seen, matching `ActivationSettings::AfterFirstOnScreen`.
fn mark_active_region(world: &mut WorldState, config: &crate::config::GameConfig) {
    let margin = config.sim.active_region_margin;
    let camera = world.camera;
    let left = camera.x - margin;
    let right = camera.x + camera.view_w + margin;
    let top = camera.y - margin;
    let bottom = camera.y + camera.view_h + margin;

    for id in world.entities.ids() {
        let Some(position) = world.entities.position(id) else { continue };
        let in_region = position.x >= left && position.x < right && position.y >= top && position.y < bottom;
        let latches = matches!(world.entities.activation(id), Some(ActivationSettings::AfterFirstOnScreen));
        let next = if latches { world.entities.active_flag(id) || in_region } else { in_region };
        world.entities.set_active(id, next);
    }
}

fn run_behavior_controllers(
    world: &mut WorldState,
    config: &crate::config::GameConfig,
    factory: &EntityFactory,
    sound: &mut dyn SoundService,
    tick_parity: bool,
    player: EntityId,
) {
    let player_position = world.entities.position(player).copied().unwrap_or_default();
    for id in world.entities.with_active_behavior() {
        let Some(mut behavior) = world.entities.remove_behavior(id) else { continue };
        let on_screen = world
            .entities
            .position(id)
            .and_then(|pos| world.camera.world_to_view(*pos))
            .is_some();
        {
            let mut deps = global_deps(world_parts(world), sound, factory, config, tick_parity);
            behavior.update(&mut deps, &mut world.entities, id, on_screen, player_position);
        }
        world.entities.set_behavior(id, behavior);
    }
    let _: fn(&BehaviorController) = |_| (); // keep the import meaningful if variants are added
}

/// `PlayerDamaging` vs. the player's own HP — separate from
/// `run_damage_infliction`'s `Shootable` combat, since the player's HP
/// lives in `PlayerModel` (`spec.md §4.5`).
fn run_player_contact_damage(
    world: &mut WorldState,
    config: &crate::config::GameConfig,
    difficulty: Difficulty,
    player: EntityId,
    controller: &mut PlayerController,
    model: &mut PlayerModel,
) {
    if controller.is_invincible() || matches!(controller.state, PlayerState::Dieing { .. }) {
        return;
    }
    let Some(player_rect) = world.entities.world_rect(player) else { return };

    for id in world.entities.ids_with_player_damaging() {
        let Some(source_rect) = world.entities.world_rect(id) else { continue };
        if !player_rect.intersects(&source_rect) {
            continue;
        }
        let damaging = *world.entities.player_damaging(id).unwrap();

        if damaging.fatal {
            model.health = 0;
            controller.state = PlayerState::Dieing { substate: crate::domain::player::DieingSubstate::FlyingUp, frames_in_substate: 0 };
        } else {
            model.add_health(-damaging.amount);
            controller.take_hit(config.sim.mercy_frames[difficulty_index(difficulty)]);
            if model.health <= 0 {
                controller.state = PlayerState::Dieing { substate: crate::domain::player::DieingSubstate::FlyingUp, frames_in_substate: 0 };
            }
        }

        if damaging.destroy_on_contact {
            world.entities.destroy(id);
        }
        break;
    }
}

/// `ItemContainer` release on `ShootableKilled` (`spec.md §4.6`). Runs
/// before `run_dynamic_geometry` / `run_collectable_pickup` so released
/// items exist for the pickup pass, and before auto-destroy expiry.
fn run_container_release(world: &mut WorldState, config: &crate::config::GameConfig, factory: &EntityFactory, sound: &mut dyn SoundService) {
    let killed: Vec<EntityId> = world
        .events
        .iter()
        .filter_map(|e| match e {
            GameEvent::ShootableKilled { entity, .. } => Some(*entity),
            _ => None,
        })
        .collect();

    for id in killed {
        let Some(position) = world.entities.position(id).copied() else { continue };

        if let Some(container) = world.entities.item_container(id).cloned() {
            container.release(&mut world.entities, position);
        }

        if let Some(destruction) = world.entities.destruction_effects(id).cloned() {
            if destruction.trigger == DestructionTrigger::OnKilled {
                let mut deps = global_deps(world_parts(world), sound, factory, config, world.is_odd_frame());
                trigger_effects(&mut deps, &mut world.entities, &destruction.effects, position);
            }
        }

        world.entities.destroy(id);
    }
}

fn run_dynamic_geometry(
    world: &mut WorldState,
    factory: &EntityFactory,
    sound: &mut dyn SoundService,
    config: &crate::config::GameConfig,
    tick_parity: bool,
) {
    for id in world.entities.ids_with_dynamic_geometry() {
        let Some(mut controller) = world.entities.remove_dynamic_geometry(id) else { continue };
        let triggered = {
            let mut deps = global_deps(world_parts(world), sound, factory, config, tick_parity);
            controller.update(&mut deps, &mut world.entities, &mut world.map, id)
        };
        if triggered {
            world.entities.destroy(id);
        } else {
            world.entities.set_dynamic_geometry(id, controller);
        }
    }
}

/// Collectable pickup: the player overlapping a `CollectableItem` applies
/// its grants to `model` and removes the item (`spec.md §3`:
/// `CollectableItem`, "score, health, item, weapon, letter grants").
fn run_collectable_pickup(world: &mut WorldState, player: EntityId, model: &mut PlayerModel, sound: &mut dyn SoundService) {
    let Some(player_rect) = world.entities.world_rect(player) else { return };

    for id in world.entities.ids() {
        let Some(item) = world.entities.collectable(id) else { continue };
        let Some(item_rect) = world.entities.world_rect(id) else { continue };
        if !player_rect.intersects(&item_rect) {
            continue;
        }
        let item = item.clone();

        if item.score > 0 {
            model.add_score(item.score);
        }
        if item.health != 0 {
            model.add_health(item.health);
        }
        if let Some(kind) = item.item {
            let is_letter = matches!(
                kind,
                ItemKind::LetterN | ItemKind::LetterU | ItemKind::LetterK | ItemKind::LetterE | ItemKind::LetterM
            );
            if is_letter {
                model.collected_letters.insert(kind);
            } else {
                model.inventory.insert(kind);
            }
        }
        if let Some(weapon) = item.weapon {
            model.selected_weapon = weapon;
            model.refill_ammo(weapon, weapon.max_ammo());
        }
        if item.ammo_refill > 0 {
            model.refill_ammo(model.selected_weapon, item.ammo_refill);
        }

        sound.play_sound(crate::render::sound::sound_ids::PICKUP);
        world.entities.destroy(id);
    }
}

/// `spec.md §5`: "The life-time system processes [auto-destroy] after
/// physics and effects, so entities spawned during the same tick can be
/// auto-destroyed on the very next tick at the earliest."
fn run_auto_destroy(world: &mut WorldState, config: &crate::config::GameConfig, factory: &EntityFactory, sound: &mut dyn SoundService) {
    let collided: std::collections::HashSet<EntityId> = world
        .events
        .iter()
        .filter_map(|e| match e {
            GameEvent::CollidedWithWorld { entity, .. } => Some(*entity),
            _ => None,
        })
        .collect();

    for id in world.entities.ids() {
        let Some(auto_destroy) = world.entities.auto_destroy(id).copied() else { continue };
        let world_collision = collided.contains(&id);
        let expire = match auto_destroy.condition {
            AutoDestroyCondition::OnWorldCollision => world_collision,
            AutoDestroyCondition::OnLeavingActiveRegion => !world.entities.active_flag(id),
            AutoDestroyCondition::AfterTicks(_) => {
                let remaining = auto_destroy.ticks_remaining.saturating_sub(1);
                if let Some(record) = world.entities.auto_destroy_mut(id) {
                    record.ticks_remaining = remaining;
                }
                remaining == 0
            }
        };

        // Rockets (and anything else tagged `DestructionTrigger::OnWorldCollision`)
        // fire their impact effects here rather than in `run_container_release`,
        // since a wall hit never produces a `ShootableKilled` event.
        if world_collision {
            if let Some(destruction) = world.entities.destruction_effects(id).cloned() {
                if destruction.trigger == DestructionTrigger::OnWorldCollision {
                    if let Some(position) = world.entities.position(id).copied() {
                        let mut deps = global_deps(world_parts(world), sound, factory, config, world.is_odd_frame());
                        trigger_effects(&mut deps, &mut world.entities, &destruction.effects, position);
                    }
                }
            }
        }

        if expire {
            world.entities.destroy(id);
        }
    }
}

fn advance_transients(world: &mut WorldState) {
    let t = &mut world.transients;
    t.flash_frames_remaining = t.flash_frames_remaining.saturating_sub(1);
    t.shake_frames_remaining = t.shake_frames_remaining.saturating_sub(1);
    t.backdrop_flash_frames_remaining = t.backdrop_flash_frames_remaining.saturating_sub(1);
}

/// `spec.md §2` step 10. Events queued this tick (teleport/checkpoint
/// requests, `PlayerDied`) are folded into `world.pending` for the host
/// application to act on (load a new level, persist a checkpoint, ...).
fn resolve_pending(world: &mut WorldState) {
    for event in world.events.clone() {
        match event {
            GameEvent::TeleportRequested { target } => world.pending.teleport_target = Some(target),
            GameEvent::CheckpointReached { checkpoint_id } => world.pending.checkpoint = Some(checkpoint_id),
            GameEvent::LevelExitReached => world.pending.level_exit = true,
            GameEvent::PlayerDied => world.pending.player_died = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::BoundingBox;
    use crate::domain::tile::TileSet;
    use crate::render::sound::LoggingSoundService;

    fn harness() -> (WorldState, GameConfig, EntityFactory) {
        let map = Map::new(32, 24);
        let tileset = TileSet::new(1, vec![Default::default()]);
        let world = WorldState::new(map, tileset, 20, 10);
        let config = GameConfig::default_for_tests();
        let factory = EntityFactory::new(Difficulty::Medium);
        (world, config, factory)
    }

    fn spawn_player(world: &mut WorldState) -> EntityId {
        let id = world.entities.spawn();
        world.entities.set_position(id, WorldPosition::new(5, 5));
        world.entities.set_bounding_box(id, BoundingBox::new(0, 0, 1, 2));
        world.entities.set_orientation(id, Orientation::Right);
        world.entities.set_moving_body(id, crate::domain::entity::MovingBody::new(true));
        id
    }

    #[test]
    fn tick_counter_and_events_reset_each_step() {
        let (mut world, config, factory) = harness();
        let player = spawn_player(&mut world);
        let mut controller = PlayerController::new();
        let mut model = PlayerModel::new();
        let mut sound = LoggingSoundService;

        step(
            &mut world,
            &config,
            &factory,
            Difficulty::Medium,
            &mut sound,
            player,
            &mut controller,
            &mut model,
            FrameInput::default(),
        );
        assert_eq!(world.tick, 1);

        step(
            &mut world,
            &config,
            &factory,
            Difficulty::Medium,
            &mut sound,
            player,
            &mut controller,
            &mut model,
            FrameInput::default(),
        );
        assert_eq!(world.tick, 2);
    }

    #[test]
    fn container_release_applies_collectable_grants_to_player() {
        let (mut world, config, factory) = harness();
        let player = spawn_player(&mut world);
        let mut controller = PlayerController::new();
        let mut model = PlayerModel::new();
        let mut sound = LoggingSoundService;

        let container = factory.spawn(&mut world.entities, crate::domain::actor_ids::ITEM_BOX_RED, WorldPosition::new(5, 5), Orientation::Right).unwrap();
        world.entities.set_bounding_box(container, BoundingBox::new(0, 0, 1, 1));
        world.events.push(GameEvent::ShootableKilled { entity: container, killer_velocity: (0.0, 0.0) });

        run_container_release(&mut world, &config, &factory, &mut sound);
        assert!(!world.entities.is_alive(container));

        // The released item lands at the container's position, overlapping
        // the player, so pickup applies its grant on the same tick.
        run_collectable_pickup(&mut world, player, &mut model, &mut sound);
        assert!(model.score > 0);
    }

    #[test]
    fn after_ticks_auto_destroy_expires_at_zero() {
        let (mut world, config, factory) = harness();
        let id = world.entities.spawn();
        world.entities.set_position(id, WorldPosition::new(1, 1));
        world.entities.set_auto_destroy(id, crate::domain::entity::AutoDestroy::after_ticks(1));
        let mut sound = LoggingSoundService;

        run_auto_destroy(&mut world, &config, &factory, &mut sound);
        assert!(!world.entities.is_alive(id));
    }

    #[test]
    fn on_world_collision_destruction_effects_fire_before_destroy() {
        let (mut world, config, factory) = harness();
        let id = world.entities.spawn();
        world.entities.set_position(id, WorldPosition::new(1, 1));
        world.entities.set_auto_destroy(id, crate::domain::entity::AutoDestroy::on_world_collision());
        world.entities.set_destruction_effects(
            id,
            crate::domain::entity::DestructionEffects {
                effects: vec![crate::domain::damage::EffectSpec::SoundTrigger {
                    sound_id: crate::render::sound::sound_ids::EXPLOSION,
                }],
                trigger: DestructionTrigger::OnWorldCollision,
            },
        );
        world.events.push(GameEvent::CollidedWithWorld { entity: id, directions: crate::domain::physics::CollisionFlags::empty() });
        let mut sound = LoggingSoundService;

        run_auto_destroy(&mut world, &config, &factory, &mut sound);
        assert!(!world.entities.is_alive(id));
    }

    #[test]
    fn player_falling_below_map_plus_three_dies() {
        let (mut world, _config, _factory) = harness();
        let player = spawn_player(&mut world);
        let mut controller = PlayerController::new();
        let mut model = PlayerModel::new();

        world.entities.set_position(player, WorldPosition::new(5, world.map.height as i32 + 4));
        check_player_fell_out_of_map(&mut world, player, &mut controller, &mut model);

        assert_eq!(model.health, 0);
        assert!(matches!(
            controller.state,
            PlayerState::Dieing { substate: crate::domain::player::DieingSubstate::Finished, .. }
        ));
        assert!(world.events.iter().any(|e| matches!(e, GameEvent::PlayerDied)));
    }

    #[test]
    fn player_within_map_bounds_does_not_die() {
        let (mut world, _config, _factory) = harness();
        let player = spawn_player(&mut world);
        let mut controller = PlayerController::new();
        let mut model = PlayerModel::new();

        world.entities.set_position(player, WorldPosition::new(5, world.map.height as i32 + 2));
        check_player_fell_out_of_map(&mut world, player, &mut controller, &mut model);

        assert!(!matches!(controller.state, PlayerState::Dieing { .. }));
        assert!(!world.events.iter().any(|e| matches!(e, GameEvent::PlayerDied)));
    }

    #[test]
    fn falling_player_actually_descends_over_several_ticks() {
        let (mut world, config, factory) = harness();
        let player = spawn_player(&mut world);
        let mut controller = PlayerController::new();
        controller.state = PlayerState::Falling;
        let mut model = PlayerModel::new();
        let mut sound = LoggingSoundService;

        let start_y = world.entities.position(player).unwrap().y;
        for _ in 0..5 {
            step(
                &mut world,
                &config,
                &factory,
                Difficulty::Medium,
                &mut sound,
                player,
                &mut controller,
                &mut model,
                FrameInput::default(),
            );
        }
        let end_y = world.entities.position(player).unwrap().y;
        assert!(end_y > start_y, "falling player never moved down: {start_y} -> {end_y}");
    }
}
