/// Entity factory: declarative actor-ID → recipe table, `spec.md §4.2`.
///
/// Grounded on the recipe-composition note in `spec.md §4.2` itself
/// ("recipes compose smaller building blocks") and on the teacher's
/// preference for plain data over trait objects — a recipe here is a
/// `fn(&mut EntityStore, EntityId, Orientation, Difficulty)`, not a
/// `dyn Actor`. `original_source/src/game_logic/entity_factory.cpp` (not
/// included in the retrieved source set) is the conceptual origin of the
/// per-ID configuration table; this module reconstructs its shape from
/// `spec.md §4.2`'s description rather than transcribing it.

use crate::domain::actor_ids::{self, ActorId};
use crate::domain::ai::{BehaviorController, LaserTurretState, RocketTurretState, SlimePipeState};
use crate::domain::containers::{DynamicGeometryController, ItemContainer, ReleaseStyle, StoredComponent};
use crate::domain::entity::{
    ActivationSettings, AutoDestroy, BoundingBox, CollectableItem, DamageInflicting, EntityId, EntityStore, ItemKind,
    MovingBody, Orientation, PlayerDamaging, Shootable, Sprite, WeaponKind, WorldPosition,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Additive HP offset baked into `Shootable.health` (`spec.md §4.2`).
    pub fn hp_offset(self) -> i32 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }
}

type Recipe = fn(&mut EntityStore, EntityId, Orientation, Difficulty);

pub struct EntityFactory {
    difficulty: Difficulty,
}

impl EntityFactory {
    pub fn new(difficulty: Difficulty) -> Self {
        EntityFactory { difficulty }
    }

    /// Creates a fully-configured entity for `actor_id` at `position`
    /// (`spec.md §4.2`), or `None` if `actor_id` has no recipe. Per
    /// `spec.md §4.1`/§7, unrecognized actor IDs are discarded rather than
    /// spawned — callers that load actor IDs from untrusted map data
    /// (`sim::level::LoadedLevel::instantiate`) must check for `None` and
    /// log the drop; callers that pass one of the `actor_ids` constants
    /// directly always get `Some`.
    pub fn spawn(&self, store: &mut EntityStore, actor_id: ActorId, position: WorldPosition, orientation: Orientation) -> Option<EntityId> {
        let recipe = self.recipe_for(actor_id)?;

        let id = store.spawn();
        store.set_position(id, position);
        store.set_orientation(id, orientation);
        store.set_sprite(id, Sprite::new(actor_id, 0));
        store.set_bounding_box(id, BoundingBox::new(0, 0, 1, 1));

        recipe(store, id, orientation, self.difficulty);

        Some(id)
    }

    /// Whether `actor_id` has a recipe, i.e. whether `spawn` would succeed.
    pub fn is_known_actor_id(&self, actor_id: ActorId) -> bool {
        self.recipe_for(actor_id).is_some()
    }

    fn recipe_for(&self, actor_id: ActorId) -> Option<Recipe> {
        Some(match actor_id {
            actor_ids::LASER_TURRET => configure_laser_turret,
            actor_ids::ROCKET_TURRET => configure_rocket_turret,
            actor_ids::SLIME_PIPE => configure_slime_pipe,
            actor_ids::SLIME_DROP => configure_slime_drop,
            actor_ids::GREEN_BIRD => configure_green_bird,
            actor_ids::SODA_SIX_PACK_N => configure_soda_six_pack_n,
            actor_ids::SODA_SIX_PACK_U => configure_soda_six_pack_u,
            actor_ids::SODA_SIX_PACK_K => configure_soda_six_pack_k,
            actor_ids::SODA_SIX_PACK_E => configure_soda_six_pack_e,
            actor_ids::SODA_SIX_PACK_M => configure_soda_six_pack_m,
            actor_ids::ENEMY_ROCKET => configure_enemy_rocket,
            actor_ids::LASER_TURRET_SHOT => configure_player_style_shot,
            actor_ids::PLAYER_SHOT_NORMAL | actor_ids::PLAYER_SHOT_LASER => configure_player_style_shot,
            actor_ids::PLAYER_SHOT_FLAME => configure_pass_through_shot,
            actor_ids::PLAYER_SHOT_ROCKET => configure_rocket_shot,
            actor_ids::ITEM_BOX_GREEN => configure_item_box_weapons,
            actor_ids::ITEM_BOX_RED => configure_item_box_consumables,
            actor_ids::ITEM_BOX_BLUE => configure_item_box_collectables,
            actor_ids::ITEM_BOX_WHITE => configure_item_box_special,
            actor_ids::NUCLEAR_WASTE_CAN => configure_nuclear_waste_can,
            actor_ids::BLUE_KEY_DOOR => configure_blue_key_door,
            actor_ids::BONUS_GLOBE => configure_bonus_globe,
            actor_ids::TILE_DEBRIS => configure_default_moving_body,
            actor_ids::SMOKE_PUFF => configure_default_moving_body,
            actor_ids::SCORE_NUMBER_FLOATER => configure_default_moving_body,
            actor_ids::EXPLOSION => configure_noop,
            actor_ids::BURN_FX => configure_noop,
            _ => return None,
        })
    }
}

// ── Building blocks (`spec.md §4.2`: "addDefaultMovingBody",
// "configureItemBox", "configureBonusGlobe", "turnIntoContainer") ──

fn add_default_moving_body(store: &mut EntityStore, id: EntityId, gravity_affected: bool) {
    store.set_moving_body(id, MovingBody::new(gravity_affected));
}

fn configure_default_moving_body(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    add_default_moving_body(store, id, true);
}

fn configure_noop(_store: &mut EntityStore, _id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {}

fn configure_laser_turret(store: &mut EntityStore, id: EntityId, _orientation: Orientation, difficulty: Difficulty) {
    store.set_shootable(id, Shootable::new(3 + difficulty.hp_offset(), 500));
    store.set_behavior(id, BehaviorController::LaserTurret(LaserTurretState::new()));
    store.set_activation(id, ActivationSettings::AfterFirstOnScreen);
}

fn configure_rocket_turret(store: &mut EntityStore, id: EntityId, _orientation: Orientation, difficulty: Difficulty) {
    store.set_shootable(id, Shootable::new(4 + difficulty.hp_offset(), 500));
    store.set_behavior(id, BehaviorController::RocketTurret(RocketTurretState::new()));
    store.set_activation(id, ActivationSettings::AfterFirstOnScreen);
}

fn configure_slime_pipe(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    store.set_behavior(id, BehaviorController::SlimePipe(SlimePipeState::new()));
    store.set_activation(id, ActivationSettings::Always);
}

fn configure_slime_drop(store: &mut EntityStore, id: EntityId, _orientation: Orientation, difficulty: Difficulty) {
    add_default_moving_body(store, id, true);
    store.set_player_damaging(id, PlayerDamaging { amount: 1 + difficulty.hp_offset(), fatal: false, destroy_on_contact: true });
}

/// `spec.md §9`: the green bird's score-on-kill equals its spawn
/// y-coordinate rather than a fixed constant — likely unintended in the
/// source, preserved as-is since changing it would invent behavior the
/// spec doesn't ask for.
fn configure_green_bird(store: &mut EntityStore, id: EntityId, orientation: Orientation, difficulty: Difficulty) {
    let spawn_y = store.position(id).map(|p| p.y).unwrap_or(0);
    store.set_shootable(id, Shootable::new(1 + difficulty.hp_offset(), spawn_y.max(0) as u32));
    let speed = 1.0;
    let vx = match orientation {
        Orientation::Left => -speed,
        Orientation::Right => speed,
    };
    store.set_moving_body(id, MovingBody { vx, vy: 0.0, gravity_affected: false, ignore_collisions: false });
    store.set_player_damaging(id, PlayerDamaging { amount: 1 + difficulty.hp_offset(), fatal: false, destroy_on_contact: false });
}

/// `turnIntoContainer`-style direct grant for a 6-pack soda can: awards
/// one NUKEM letter plus a flat score bonus. `spec.md §9`: the bonus is
/// granted on every pickup, not gated on completing the full letter set —
/// noted as a likely source bug, preserved rather than guessed at.
fn configure_soda_six_pack(store: &mut EntityStore, id: EntityId, letter: ItemKind) {
    store.set_collectable(id, CollectableItem { item: Some(letter), score: 10_000, ..Default::default() });
}

fn configure_soda_six_pack_n(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    configure_soda_six_pack(store, id, ItemKind::LetterN);
}
fn configure_soda_six_pack_u(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    configure_soda_six_pack(store, id, ItemKind::LetterU);
}
fn configure_soda_six_pack_k(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    configure_soda_six_pack(store, id, ItemKind::LetterK);
}
fn configure_soda_six_pack_e(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    configure_soda_six_pack(store, id, ItemKind::LetterE);
}
fn configure_soda_six_pack_m(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    configure_soda_six_pack(store, id, ItemKind::LetterM);
}

fn configure_enemy_rocket(store: &mut EntityStore, id: EntityId, orientation: Orientation, difficulty: Difficulty) {
    let speed = 2.0;
    let vx = match orientation {
        Orientation::Left => -speed,
        Orientation::Right => speed,
    };
    store.set_moving_body(id, MovingBody { vx, vy: 0.0, gravity_affected: false, ignore_collisions: true });
    store.set_player_damaging(id, PlayerDamaging { amount: 2 + difficulty.hp_offset(), fatal: false, destroy_on_contact: true });
    store.set_auto_destroy(id, AutoDestroy::on_world_collision());
}

fn configure_player_style_shot(store: &mut EntityStore, id: EntityId, orientation: Orientation, _difficulty: Difficulty) {
    let speed = 3.0;
    let vx = match orientation {
        Orientation::Left => -speed,
        Orientation::Right => speed,
    };
    store.set_moving_body(id, MovingBody { vx, vy: 0.0, gravity_affected: false, ignore_collisions: false });
    store.set_damage_inflicting(id, DamageInflicting { damage_per_frame: 1 });
    store.set_auto_destroy(id, AutoDestroy::on_world_collision());
}

/// The rocket launcher's shot: collides with the world like a normal
/// projectile, but trails smoke while in flight and bursts into a
/// fire/smoke effect that ignites nearby flammable tiles on impact
/// (`spec.md §4.5`).
fn configure_rocket_shot(store: &mut EntityStore, id: EntityId, orientation: Orientation, _difficulty: Difficulty) {
    let speed = 3.0;
    let vx = match orientation {
        Orientation::Left => -speed,
        Orientation::Right => speed,
    };
    store.set_moving_body(id, MovingBody { vx, vy: 0.0, gravity_affected: false, ignore_collisions: false });
    store.set_damage_inflicting(id, DamageInflicting { damage_per_frame: 2 });
    store.set_auto_destroy(id, AutoDestroy::on_world_collision());
    store.set_behavior(id, BehaviorController::RocketTrail(crate::domain::ai::RocketTrailState::new()));
    store.set_activation(id, ActivationSettings::Always);
    store.set_active(id, true);
    store.set_destruction_effects(
        id,
        crate::domain::entity::DestructionEffects {
            effects: vec![
                crate::domain::damage::EffectSpec::ParticleBurst {
                    color: crate::domain::damage::ParticleColor::Red,
                    velocity_bias: (0.0, -0.5),
                    count: 6,
                },
                crate::domain::damage::EffectSpec::SoundTrigger { sound_id: crate::render::sound::sound_ids::EXPLOSION },
                crate::domain::damage::EffectSpec::IgniteFlammableTiles { radius: 2 },
            ],
            trigger: crate::domain::entity::DestructionTrigger::OnWorldCollision,
        },
    );
}

fn configure_pass_through_shot(store: &mut EntityStore, id: EntityId, orientation: Orientation, _difficulty: Difficulty) {
    let speed = 4.0;
    let vx = match orientation {
        Orientation::Left => -speed,
        Orientation::Right => speed,
    };
    store.set_moving_body(id, MovingBody { vx, vy: 0.0, gravity_affected: false, ignore_collisions: true });
    store.set_damage_inflicting(id, DamageInflicting { damage_per_frame: 1 });
    store.set_auto_destroy(id, AutoDestroy::after_ticks(30));
}

/// `turnIntoContainer`: attaches an `ItemContainer` in place of directly
/// granting the components, so the contents only materialize when the
/// container's `Shootable` is killed (`spec.md §4.6`).
fn turn_into_container(store: &mut EntityStore, id: EntityId, release_style: ReleaseStyle, contents: Vec<StoredComponent>) {
    let mut shootable = Shootable::new(1, 0);
    // The container-release system reads `ItemContainer` and the killed
    // entity's position out of the same entity once it observes
    // `ShootableKilled`, then destroys it itself; destroying it here first
    // would erase both before that system runs.
    shootable.destroy_on_kill = false;
    store.set_shootable(id, shootable);
    let mut container = ItemContainer::new(release_style);
    container.contents = contents;
    store.set_item_container(id, container);
}

fn configure_item_box_weapons(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    turn_into_container(
        store,
        id,
        ReleaseStyle::ItemBoxBounce,
        vec![StoredComponent::Collectable(CollectableItem { weapon: Some(WeaponKind::Laser), ..Default::default() })],
    );
}

fn configure_item_box_consumables(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    turn_into_container(
        store,
        id,
        ReleaseStyle::ItemBoxBounce,
        vec![StoredComponent::Collectable(CollectableItem { score: 100, ..Default::default() })],
    );
}

fn configure_item_box_collectables(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    turn_into_container(
        store,
        id,
        ReleaseStyle::ItemBoxBounce,
        vec![StoredComponent::Collectable(CollectableItem { health: 1, ..Default::default() })],
    );
}

fn configure_item_box_special(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    turn_into_container(
        store,
        id,
        ReleaseStyle::ItemBoxNoBounce,
        vec![StoredComponent::Collectable(CollectableItem { item: Some(ItemKind::CircuitCard), ..Default::default() })],
    );
}

fn configure_nuclear_waste_can(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    turn_into_container(
        store,
        id,
        ReleaseStyle::NuclearWasteBarrel,
        vec![StoredComponent::Collectable(CollectableItem { score: 500, ..Default::default() })],
    );
}

/// The door occupies the single tile it was placed on; opening it erases
/// just that tile rather than a marker-searched rectangle (`spec.md §4.6`).
fn configure_blue_key_door(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    let position = store.position(id).copied().unwrap_or_default();
    store.set_map_geometry_link(
        id,
        crate::domain::entity::MapGeometryLink { x: position.x.max(0) as usize, y: position.y.max(0) as usize, width: 1, height: 1 },
    );
    store.set_dynamic_geometry(id, DynamicGeometryController::BlueKeyDoor { unlocked: false });
    store.set_interactable(id, crate::domain::entity::InteractableKind::KeySlot);
}

/// `configureBonusGlobe`: a pure-collectable pickup, no container
/// indirection needed since it has no kill step.
fn configure_bonus_globe(store: &mut EntityStore, id: EntityId, _orientation: Orientation, _difficulty: Difficulty) {
    store.set_collectable(id, CollectableItem { score: 100, ..Default::default() });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn laser_turret_gets_scaled_hp_by_difficulty() {
        let factory = EntityFactory::new(Difficulty::Hard);
        let mut store = EntityStore::new();
        let id = factory.spawn(&mut store, actor_ids::LASER_TURRET, WorldPosition::new(0, 0), Orientation::Left).unwrap();
        assert_eq!(store.shootable(id).unwrap().health, 5);
    }

    #[test]
    fn item_box_spawns_as_container_not_direct_collectable() {
        let factory = EntityFactory::new(Difficulty::Easy);
        let mut store = EntityStore::new();
        let id = factory.spawn(&mut store, actor_ids::ITEM_BOX_GREEN, WorldPosition::new(0, 0), Orientation::Right).unwrap();
        assert!(store.item_container(id).is_some());
        assert!(store.collectable(id).is_none());
    }

    #[test]
    fn unknown_actor_id_is_discarded_not_spawned() {
        let factory = EntityFactory::new(Difficulty::Easy);
        let mut store = EntityStore::new();
        assert!(!factory.is_known_actor_id(9999));
        let id = factory.spawn(&mut store, 9999, WorldPosition::new(1, 1), Orientation::Right);
        assert!(id.is_none());
        assert!(store.ids().is_empty());
    }

    #[test]
    fn blue_key_door_wires_dynamic_geometry_and_starts_locked() {
        let factory = EntityFactory::new(Difficulty::Easy);
        let mut store = EntityStore::new();
        let id = factory.spawn(&mut store, actor_ids::BLUE_KEY_DOOR, WorldPosition::new(4, 6), Orientation::Right).unwrap();
        assert!(matches!(store.dynamic_geometry(id), Some(DynamicGeometryController::BlueKeyDoor { unlocked: false })));
        assert_eq!(store.map_geometry_link(id).copied().unwrap().x, 4);
    }

    #[test]
    fn slime_pipe_is_always_active() {
        let factory = EntityFactory::new(Difficulty::Easy);
        let mut store = EntityStore::new();
        let id = factory.spawn(&mut store, actor_ids::SLIME_PIPE, WorldPosition::new(0, 0), Orientation::Right).unwrap();
        assert!(matches!(store.activation(id), Some(ActivationSettings::Always)));
    }

    #[test]
    fn green_bird_score_on_kill_equals_spawn_y() {
        let factory = EntityFactory::new(Difficulty::Easy);
        let mut store = EntityStore::new();
        let id = factory.spawn(&mut store, actor_ids::GREEN_BIRD, WorldPosition::new(3, 17), Orientation::Left).unwrap();
        assert_eq!(store.shootable(id).unwrap().score_on_kill, 17);
    }

    #[test]
    fn soda_six_pack_grants_letter_and_bonus_every_pickup() {
        let factory = EntityFactory::new(Difficulty::Easy);
        let mut store = EntityStore::new();
        let id = factory.spawn(&mut store, actor_ids::SODA_SIX_PACK_U, WorldPosition::new(0, 0), Orientation::Right).unwrap();
        let item = store.collectable(id).unwrap();
        assert_eq!(item.item, Some(ItemKind::LetterU));
        assert_eq!(item.score, 10_000);
    }
}
