/// Damage infliction and declarative effect specs, `spec.md §4.5`.

use crate::domain::actor_ids;
use crate::domain::ai::{BehaviorController, BurnFxState};
use crate::domain::entity::{ActivationSettings, EntityId, EntityStore, Orientation, WorldPosition};
use crate::sim::event::GameEvent;
use crate::sim::world::GlobalDependencies;

/// How long a burn-FX marker spawned by `EffectSpec::IgniteFlammableTiles`
/// lingers before self-destructing (`spec.md §4.5`).
const BURN_FX_DURATION_TICKS: u32 = 44;

/// One declarative effect, attached to entities via `DestructionEffects`
/// or fired directly by a system (`spec.md §4.5`). A closed enum, not a
/// trait object — the set of effect shapes is fixed.
#[derive(Clone, Debug)]
pub enum EffectSpec {
    /// A one-shot sprite, optionally following a short movement arc before
    /// self-destructing.
    OneShotSprite { actor_id: u16, movement: Option<(f32, f32)> },
    /// A particle burst: color tag plus a velocity bias applied to each
    /// spawned particle.
    ParticleBurst { color: ParticleColor, velocity_bias: (f32, f32), count: u32 },
    /// Continuously spawns burn-FX particles over the source's bounding
    /// box for as long as the owning entity lives.
    BurnFxSpawner,
    /// A floating score number with a 60-frame arc (`spec.md §4.5`).
    ScoreNumberFloater { value: u32 },
    /// Fire-and-forget sound cue.
    SoundTrigger { sound_id: u16 },
    /// Scans a square of tiles centered on the impact for the `flammable`
    /// attribute and drops a `BurnFx` marker on each one hit (`spec.md
    /// §4.5`: rocket "fire-burst on impact that burns flammable tiles").
    /// Reads the map through `GlobalDependencies::collision`, doesn't
    /// mutate it — the map itself is untouched, only the burn cue fires.
    IgniteFlammableTiles { radius: i32 },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParticleColor {
    Red,
    White,
    Green,
}

/// Spawns every effect in `specs` at `position`, per `spec.md §4.5`.
/// Returns `true` if any spec requests the originating entity be
/// destroyed once effects are triggered (currently none do on their own —
/// destruction is driven by `DestructionTrigger`, kept here only so
/// callers have a single place to extend that policy).
pub fn trigger_effects(
    deps: &mut GlobalDependencies,
    store: &mut EntityStore,
    specs: &[EffectSpec],
    position: WorldPosition,
) {
    for spec in specs {
        match spec {
            EffectSpec::OneShotSprite { actor_id, movement } => {
                if let Some(id) = deps.spawn_actor(store, *actor_id, position, Orientation::Right) {
                    if let Some((vx, vy)) = movement {
                        store.set_moving_body(
                            id,
                            crate::domain::entity::MovingBody { vx: *vx, vy: *vy, gravity_affected: false, ignore_collisions: true },
                        );
                    }
                }
            }
            EffectSpec::ParticleBurst { velocity_bias, count, .. } => {
                for _ in 0..*count {
                    let Some(id) = deps.spawn_actor(store, actor_ids::SMOKE_PUFF, position, Orientation::Right) else { continue };
                    store.set_moving_body(
                        id,
                        crate::domain::entity::MovingBody {
                            vx: velocity_bias.0,
                            vy: velocity_bias.1,
                            gravity_affected: true,
                            ignore_collisions: true,
                        },
                    );
                    store.set_auto_destroy(id, crate::domain::entity::AutoDestroy::after_ticks(30));
                }
            }
            EffectSpec::BurnFxSpawner => {
                if let Some(id) = deps.spawn_actor(store, actor_ids::SMOKE_PUFF, position, Orientation::Right) {
                    store.set_auto_destroy(id, crate::domain::entity::AutoDestroy::after_ticks(4));
                }
            }
            EffectSpec::ScoreNumberFloater { value } => {
                if let Some(id) = deps.spawn_actor(store, actor_ids::SCORE_NUMBER_FLOATER, position, Orientation::Right) {
                    store.set_moving_body(
                        id,
                        crate::domain::entity::MovingBody { vx: 0.0, vy: -1.0, gravity_affected: false, ignore_collisions: true },
                    );
                    store.set_auto_destroy(id, crate::domain::entity::AutoDestroy::after_ticks(60));
                }
                let _ = value; // consumed by the rendering layer's digit lookup
            }
            EffectSpec::SoundTrigger { sound_id } => {
                deps.sound.play_sound(*sound_id);
            }
            EffectSpec::IgniteFlammableTiles { radius } => {
                let r = *radius;
                for dy in -r..=r {
                    for dx in -r..=r {
                        let tile = WorldPosition::new(position.x + dx, position.y + dy);
                        if deps.collision.attributes_at(tile.x, tile.y).is_flammable() {
                            if let Some(id) = deps.spawn_actor(store, actor_ids::BURN_FX, tile, Orientation::Right) {
                                store.set_behavior(id, BehaviorController::BurnFx(BurnFxState::new(BURN_FX_DURATION_TICKS)));
                                store.set_activation(id, ActivationSettings::Always);
                                store.set_active(id, true);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Pairwise bounding-box intersection between damage sources
/// (`PlayerDamaging`/`DamageInflicting`) and `Shootable` entities. Deducts
/// HP, emits `ShootableDamaged`/`ShootableKilled`, and respects
/// `Shootable.invincible` (`spec.md §4.5`).
pub fn run_damage_infliction(store: &mut EntityStore, events: &mut Vec<GameEvent>) {
    let shootable_ids = store.ids_with_shootable();
    let source_ids = store.ids_with_damage_source();

    for &source in &source_ids {
        let source_rect = match store.world_rect(source) {
            Some(r) => r,
            None => continue,
        };
        let damage_amount = store.damage_inflicting(source).map(|d| d.damage_per_frame).unwrap_or(0);

        for &target in &shootable_ids {
            if source == target {
                continue;
            }
            let target_rect = match store.world_rect(target) {
                Some(r) => r,
                None => continue,
            };
            if !source_rect.intersects(&target_rect) {
                continue;
            }

            let invincible = store.shootable(target).map(|s| s.invincible).unwrap_or(false);
            if invincible || damage_amount == 0 {
                continue;
            }

            apply_damage(store, events, target, damage_amount, velocity_of(store, source));
        }
    }
}

fn velocity_of(store: &EntityStore, entity: EntityId) -> (f32, f32) {
    store.moving_body(entity).map(|b| (b.vx, b.vy)).unwrap_or((0.0, 0.0))
}

fn apply_damage(
    store: &mut EntityStore,
    events: &mut Vec<GameEvent>,
    target: EntityId,
    amount: i32,
    killer_velocity: (f32, f32),
) {
    let (health, hit_feedback, destroy_on_kill) = match store.shootable_mut(target) {
        Some(s) => {
            s.health -= amount;
            (s.health, s.hit_feedback, s.destroy_on_kill)
        }
        None => return,
    };

    if hit_feedback {
        if let Some(sprite) = store.sprite_mut(target) {
            sprite.flash = true;
        }
    }

    if health <= 0 {
        events.push(GameEvent::ShootableKilled { entity: target, killer_velocity });
        if destroy_on_kill {
            store.destroy(target);
        }
    } else {
        events.push(GameEvent::ShootableDamaged { entity: target, amount });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::{BoundingBox, DamageInflicting, Shootable, WorldPosition};

    #[test]
    fn ignite_flammable_tiles_spawns_burn_fx_only_on_flammable_cells() {
        use crate::domain::physics::CollisionChecker;
        use crate::domain::tile::{CollisionData, Map, TileSet};
        use crate::sim::entity_factory::{Difficulty, EntityFactory};
        use rand::SeedableRng;

        let mut map = Map::new(8, 8);
        map.set_layer0(5, 5, 1);
        let tileset = TileSet::new(2, vec![CollisionData::empty(), CollisionData::FLAMMABLE]);

        let mut store = EntityStore::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let mut events = Vec::new();
        let mut sound = crate::render::sound::LoggingSoundService;
        let config = crate::config::GameConfig::default_for_tests();
        let factory = EntityFactory::new(Difficulty::Medium);

        let mut deps = GlobalDependencies {
            collision: CollisionChecker::new(&map, &tileset),
            rng: &mut rng,
            events: &mut events,
            sound: &mut sound,
            entity_factory: &factory,
            config: &config,
            tick_parity: false,
        };

        trigger_effects(
            &mut deps,
            &mut store,
            &[EffectSpec::IgniteFlammableTiles { radius: 1 }],
            WorldPosition::new(5, 5),
        );

        let burning: Vec<_> = store
            .ids()
            .into_iter()
            .filter(|id| store.position(*id) == Some(&WorldPosition::new(5, 5)))
            .collect();
        assert_eq!(burning.len(), 1);
        assert!(store.behavior(burning[0]).is_some());

        let non_flammable_hits = store
            .ids()
            .into_iter()
            .filter(|id| store.position(*id) != Some(&WorldPosition::new(5, 5)))
            .count();
        assert_eq!(non_flammable_hits, 0);
    }

    fn place_shootable(store: &mut EntityStore, x: i32, hp: i32) -> EntityId {
        let id = store.spawn();
        store.set_position(id, WorldPosition::new(x, 0));
        store.set_bounding_box(id, BoundingBox::new(0, 0, 1, 1));
        store.set_shootable(id, Shootable::new(hp, 100));
        id
    }

    fn place_damage_source(store: &mut EntityStore, x: i32, damage: i32) -> EntityId {
        let id = store.spawn();
        store.set_position(id, WorldPosition::new(x, 0));
        store.set_bounding_box(id, BoundingBox::new(0, 0, 1, 1));
        store.set_damage_inflicting(id, DamageInflicting { damage_per_frame: damage });
        id
    }

    #[test]
    fn overlapping_damage_source_kills_when_hp_reaches_zero() {
        let mut store = EntityStore::new();
        let target = place_shootable(&mut store, 0, 10);
        let _source = place_damage_source(&mut store, 0, 10);
        let mut events = Vec::new();
        run_damage_infliction(&mut store, &mut events);
        assert!(matches!(events[0], GameEvent::ShootableKilled { .. }));
        assert!(!store.is_alive(target));
    }

    #[test]
    fn invincible_target_takes_no_damage() {
        let mut store = EntityStore::new();
        let target = place_shootable(&mut store, 0, 10);
        store.shootable_mut(target).unwrap().invincible = true;
        let _source = place_damage_source(&mut store, 0, 10);
        let mut events = Vec::new();
        run_damage_infliction(&mut store, &mut events);
        assert!(events.is_empty());
        assert!(store.is_alive(target));
    }

    #[test]
    fn non_overlapping_entities_do_not_interact() {
        let mut store = EntityStore::new();
        let _target = place_shootable(&mut store, 0, 10);
        let _source = place_damage_source(&mut store, 5, 10);
        let mut events = Vec::new();
        run_damage_infliction(&mut store, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn partial_damage_emits_damaged_not_killed() {
        let mut store = EntityStore::new();
        let target = place_shootable(&mut store, 0, 10);
        let _source = place_damage_source(&mut store, 0, 4);
        let mut events = Vec::new();
        run_damage_infliction(&mut store, &mut events);
        assert!(matches!(events[0], GameEvent::ShootableDamaged { amount: 4, .. }));
        assert!(store.is_alive(target));
    }
}
