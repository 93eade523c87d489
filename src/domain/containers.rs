/// Item containers and dynamic geometry, `spec.md §4.6`.
///
/// Both are specified as closed tagged unions rather than virtual
/// dispatch (`spec.md §9`), following the same "declarative recipe, not
/// polymorphism" style the teacher uses for `Guard`/`Hole` state and that
/// `domain::ai` already follows for behavior controllers.

use rand::Rng;

use crate::domain::actor_ids;
use crate::domain::entity::{
    BoundingBox, CollectableItem, EntityId, EntityStore, MapGeometryLink, MovingBody,
    PlayerDamaging, Shootable, Sprite, WorldPosition,
};
use crate::domain::tile::Map;
use crate::sim::world::GlobalDependencies;

/// One component value materialized onto the entity an `ItemContainer`
/// spawns. A closed enum stands in for the type-erased component list
/// `spec.md §3` describes, since the entity store itself only accepts
/// concrete, known component types.
#[derive(Clone, Debug)]
pub enum StoredComponent {
    Collectable(CollectableItem),
    Sprite(Sprite),
    BoundingBox(BoundingBox),
    Shootable(Shootable),
    PlayerDamaging(PlayerDamaging),
    MovingBody(MovingBody),
}

/// Governs the initial velocity/physics given to the entity an
/// `ItemContainer` releases (`spec.md §4.6`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReleaseStyle {
    /// Released item sits in place with no physics.
    Plain,
    /// Item-box style: small upward bounce before settling.
    ItemBoxBounce,
    /// Item-box style with no bounce, falls straight down under gravity.
    ItemBoxNoBounce,
    /// Nuclear waste barrel: releases with a larger upward pop and falls
    /// under gravity like any other moving body.
    NuclearWasteBarrel,
}

#[derive(Clone, Debug)]
pub struct ItemContainer {
    pub contents: Vec<StoredComponent>,
    pub release_style: ReleaseStyle,
}

impl ItemContainer {
    pub fn new(release_style: ReleaseStyle) -> Self {
        ItemContainer { contents: Vec::new(), release_style }
    }

    pub fn with(mut self, component: StoredComponent) -> Self {
        self.contents.push(component);
        self
    }

    /// Materializes the container's contents as a new entity at
    /// `position`, with initial velocity set per `release_style`. Called
    /// from the damage-infliction system on `ShootableKilled`
    /// (`spec.md §4.6`).
    pub fn release(&self, store: &mut EntityStore, position: WorldPosition) -> EntityId {
        let id = store.spawn();
        store.set_position(id, position);

        for component in &self.contents {
            match component.clone() {
                StoredComponent::Collectable(c) => store.set_collectable(id, c),
                StoredComponent::Sprite(s) => store.set_sprite(id, s),
                StoredComponent::BoundingBox(b) => store.set_bounding_box(id, b),
                StoredComponent::Shootable(s) => store.set_shootable(id, s),
                StoredComponent::PlayerDamaging(p) => store.set_player_damaging(id, p),
                StoredComponent::MovingBody(m) => store.set_moving_body(id, m),
            }
        }

        let mut body = store.moving_body(id).copied().unwrap_or_default();
        match self.release_style {
            ReleaseStyle::Plain => {
                body.gravity_affected = false;
            }
            ReleaseStyle::ItemBoxBounce => {
                body.vy = -1.5;
                body.gravity_affected = true;
            }
            ReleaseStyle::ItemBoxNoBounce => {
                body.gravity_affected = true;
            }
            ReleaseStyle::NuclearWasteBarrel => {
                body.vy = -2.0;
                body.gravity_affected = true;
            }
        }
        store.set_moving_body(id, body);

        id
    }
}

/// Per-piece downward velocities assigned to tile debris, cycled by index.
/// A fixed table rather than a formula, per `spec.md §4.6`.
const DEBRIS_Y_VELOCITY_TABLE: [f32; 6] = [-2.0, -1.5, -1.0, -0.5, 0.0, 0.5];

/// Dynamic-geometry controller variants (`spec.md §4.6`). On trigger, the
/// linked map rectangle is cleared and replaced by debris particles.
#[derive(Clone, Debug)]
pub enum DynamicGeometryController {
    FallAfterDelayThenSink { delay_remaining: u32 },
    FallAfterDelayThenStay { delay_remaining: u32 },
    FallImmediatelyThenStay,
    FallImmediatelyThenExplode,
    FallWhileEarthquakeThenExplode { earthquake_active: bool },
    FallWhileEarthquakeThenStay { earthquake_active: bool },
    BlueKeyDoor { unlocked: bool },
}

impl DynamicGeometryController {
    /// Advances one tick. Returns `true` the tick it actually triggers
    /// (clears the map rect), so the caller can fire `DestructionEffects`.
    pub fn update(
        &mut self,
        deps: &mut GlobalDependencies,
        store: &mut EntityStore,
        map: &mut Map,
        entity: EntityId,
    ) -> bool {
        let link = match store.map_geometry_link(entity) {
            Some(l) => *l,
            None => return false,
        };

        match self {
            DynamicGeometryController::FallAfterDelayThenSink { delay_remaining }
            | DynamicGeometryController::FallAfterDelayThenStay { delay_remaining } => {
                if *delay_remaining > 0 {
                    *delay_remaining -= 1;
                    return false;
                }
                trigger(deps, store, map, link, false);
                true
            }
            DynamicGeometryController::FallImmediatelyThenStay
            | DynamicGeometryController::FallImmediatelyThenExplode => {
                let explode = matches!(self, DynamicGeometryController::FallImmediatelyThenExplode);
                trigger(deps, store, map, link, explode);
                true
            }
            DynamicGeometryController::FallWhileEarthquakeThenExplode { earthquake_active }
            | DynamicGeometryController::FallWhileEarthquakeThenStay { earthquake_active } => {
                if !*earthquake_active {
                    return false;
                }
                let explode = matches!(self, DynamicGeometryController::FallWhileEarthquakeThenExplode { .. });
                trigger(deps, store, map, link, explode);
                true
            }
            DynamicGeometryController::BlueKeyDoor { unlocked } => {
                if !*unlocked {
                    return false;
                }
                trigger(deps, store, map, link, false);
                true
            }
        }
    }

    /// External signal (key pickup, reactor destroyed, earthquake start)
    /// that flips a gating flag without itself clearing the geometry.
    pub fn arm(&mut self) {
        match self {
            DynamicGeometryController::FallWhileEarthquakeThenExplode { earthquake_active }
            | DynamicGeometryController::FallWhileEarthquakeThenStay { earthquake_active } => {
                *earthquake_active = true;
            }
            DynamicGeometryController::BlueKeyDoor { unlocked } => {
                *unlocked = true;
            }
            _ => {}
        }
    }
}

fn trigger(
    deps: &mut GlobalDependencies,
    store: &mut EntityStore,
    map: &mut Map,
    link: MapGeometryLink,
    explode: bool,
) {
    for row in 0..link.height {
        for col in 0..link.width {
            let tile_x = link.x + col;
            let tile_y = link.y + row;
            let piece_index = (row * link.width + col) % DEBRIS_Y_VELOCITY_TABLE.len();
            let vy = DEBRIS_Y_VELOCITY_TABLE[piece_index];
            let vx = deps.rng.gen_range(-1.0_f32..=1.0_f32);

            let Some(debris) = deps.spawn_actor(
                store,
                actor_ids::TILE_DEBRIS,
                WorldPosition::new(tile_x as i32, tile_y as i32),
                crate::domain::entity::Orientation::Right,
            ) else { continue };
            store.set_moving_body(debris, MovingBody { vx, vy, gravity_affected: true, ignore_collisions: true });
            // `spec.md §9`: the original indexes the Y-velocity table past its
            // end, which in practice makes debris vanish after ~11 frames;
            // preserve that observable lifetime directly rather than the
            // out-of-bounds read.
            store.set_auto_destroy(debris, crate::domain::entity::AutoDestroy::after_ticks(11));
        }
    }

    map.clear_rect(link.x, link.y, link.width, link.height);

    if explode {
        let center = WorldPosition::new(
            (link.x + link.width / 2) as i32,
            (link.y + link.height / 2) as i32,
        );
        deps.spawn_actor(store, actor_ids::EXPLOSION, center, crate::domain::entity::Orientation::Right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::ItemKind;

    #[test]
    fn release_plain_has_no_gravity() {
        let mut store = EntityStore::new();
        let container = ItemContainer::new(ReleaseStyle::Plain)
            .with(StoredComponent::Collectable(CollectableItem { score: 100, ..Default::default() }));
        let id = container.release(&mut store, WorldPosition::new(5, 5));
        assert_eq!(store.collectable(id).unwrap().score, 100);
        assert!(!store.moving_body(id).map(|b| b.gravity_affected).unwrap_or(true));
    }

    #[test]
    fn release_item_box_bounce_sets_upward_velocity() {
        let mut store = EntityStore::new();
        let container = ItemContainer::new(ReleaseStyle::ItemBoxBounce)
            .with(StoredComponent::Collectable(CollectableItem { item: Some(ItemKind::HealthMolecule), ..Default::default() }));
        let id = container.release(&mut store, WorldPosition::new(0, 0));
        let body = store.moving_body(id).unwrap();
        assert!(body.vy < 0.0);
        assert!(body.gravity_affected);
    }

    #[test]
    fn debris_velocity_table_cycles() {
        assert_eq!(DEBRIS_Y_VELOCITY_TABLE.len(), 6);
        assert_eq!(DEBRIS_Y_VELOCITY_TABLE[0], -2.0);
    }

    #[test]
    fn blue_key_door_waits_for_arm() {
        let mut controller = DynamicGeometryController::BlueKeyDoor { unlocked: false };
        match &controller {
            DynamicGeometryController::BlueKeyDoor { unlocked } => assert!(!unlocked),
            _ => unreachable!(),
        }
        controller.arm();
        match &controller {
            DynamicGeometryController::BlueKeyDoor { unlocked } => assert!(*unlocked),
            _ => unreachable!(),
        }
    }
}
