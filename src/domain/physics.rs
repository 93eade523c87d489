/// Physics system: velocity integration, gravity, and the tile-sweep
/// collision resolver with the stair-step exception.
///
/// Grounded on the teacher's `domain/physics.rs` (pure functions over a
/// terrain query, single source of truth for collision), generalized from
/// boolean occupancy grids to the sub-tile float velocity sweep specified
/// in `spec.md §4.3`. The sweep algorithm itself — including the
/// stair-step special case and the exact gravity constants — is taken
/// directly from `original_source/src/engine/physics_system.cpp`
/// (`applyHorizontalMovement`/`applyGravity`/`applyVerticalMovement`).

use crate::domain::entity::{EntityStore, WorldPosition, WorldRect};
use crate::domain::tile::{CollisionData, ConveyorDirection, Map, TileSet};
use crate::sim::event::GameEvent;

bitflags::bitflags! {
    /// Which edges collided with the world during the most recent sweep.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct CollisionFlags: u8 {
        const TOP    = 1 << 0;
        const RIGHT  = 1 << 1;
        const BOTTOM = 1 << 2;
        const LEFT   = 1 << 3;
    }
}

/// Read-only view over the map used by collision queries. Bundled as its
/// own type so AI controllers and the player controller can share exactly
/// the same collision semantics the physics system uses
/// (`GlobalDependencies::collision_checker`, `spec.md §9`).
pub struct CollisionChecker<'a> {
    pub map: &'a Map,
    pub tileset: &'a TileSet,
}

impl<'a> CollisionChecker<'a> {
    pub fn new(map: &'a Map, tileset: &'a TileSet) -> Self {
        CollisionChecker { map, tileset }
    }

    #[inline]
    pub fn attributes_at(&self, x: i32, y: i32) -> CollisionData {
        // `original_source/src/base/grid.hpp`'s `valueAtWithDefault`: any
        // out-of-range cell (negative coordinates included) reads as the
        // default, non-solid `CollisionData{}` — off-map space is open.
        if x < 0 || y < 0 {
            return CollisionData::empty();
        }
        self.map.collision_at(self.tileset, x as usize, y as usize)
    }

    pub fn is_solid_left(&self, x: i32, y: i32) -> bool {
        self.attributes_at(x, y).is_solid_left()
    }
    pub fn is_solid_right(&self, x: i32, y: i32) -> bool {
        self.attributes_at(x, y).is_solid_right()
    }
    pub fn is_solid_top(&self, x: i32, y: i32) -> bool {
        self.attributes_at(x, y).is_solid_top()
    }
    pub fn is_solid_bottom(&self, x: i32, y: i32) -> bool {
        self.attributes_at(x, y).is_solid_bottom()
    }
    pub fn is_clear(&self, x: i32, y: i32) -> bool {
        self.attributes_at(x, y).is_clear()
    }
    pub fn is_climbable(&self, x: i32, y: i32) -> bool {
        self.attributes_at(x, y).is_climbable()
    }
    pub fn is_ladder(&self, x: i32, y: i32) -> bool {
        self.attributes_at(x, y).is_ladder()
    }

    /// Does any cell directly below the bounding box's bottom row have
    /// `isSolidTop` set? Used both by gravity and by "has ground" checks
    /// elsewhere in the player controller.
    pub fn has_ground_below(&self, bbox: WorldRect) -> bool {
        (bbox.left()..=bbox.right()).any(|x| self.is_solid_top(x, bbox.bottom() + 1))
    }

    /// Conveyor flag of the cell directly below the bounding box, if any
    /// (`spec.md §4.3` "conveyor reporting").
    pub fn conveyor_below(&self, bbox: WorldRect) -> Option<ConveyorDirection> {
        for x in bbox.left()..=bbox.right() {
            if let Some(dir) = self.attributes_at(x, bbox.bottom() + 1).conveyor() {
                return Some(dir);
            }
        }
        None
    }
}

/// `applyHorizontalMovement`: sweeps the leading edge of `bbox` one column
/// at a time toward `movement_x`, testing the opposite-facing solid bit,
/// and applying the one-tile-tall stair-step exception on the bottom row.
pub fn sweep_horizontal(
    checker: &CollisionChecker,
    bbox: WorldRect,
    position: WorldPosition,
    movement_x: i32,
) -> WorldPosition {
    if movement_x == 0 {
        return position;
    }

    let mut new_position = position;
    new_position.x += movement_x;

    let moving_right = movement_x > 0;
    let direction = if moving_right { 1 } else { -1 };
    let start_x = position.x + direction;
    let end_x = new_position.x + direction;
    let x_offset = if moving_right { bbox.width - 1 } else { 0 };

    let mut col = start_x;
    while col != end_x {
        let x = col + x_offset;
        for row in bbox.top()..=bbox.bottom() {
            let entered = checker.attributes_at(x, row);
            let collides = if moving_right { entered.is_solid_left() } else { entered.is_solid_right() };
            if collides {
                let at_bottom_row = row == bbox.bottom();
                if at_bottom_row {
                    let step_up_clear = checker.is_clear(x, row - 1);
                    if step_up_clear && entered.is_solid_top() {
                        new_position.y -= 1;
                        continue;
                    }
                }
                new_position.x = col - direction;
                return new_position;
            }
        }
        col += direction;
    }

    new_position
}

/// `applyGravity`: holds at rest while supported, otherwise accelerates
/// toward `terminal_velocity` in steps of `gravity_step` — the exact
/// constants named in `spec.md §4.3`/§8 (0.56 per tick, 2.0 terminal).
pub fn apply_gravity(
    checker: &CollisionChecker,
    bbox: WorldRect,
    current_velocity: f32,
    gravity_step: f32,
    terminal_velocity: f32,
) -> f32 {
    if current_velocity == 0.0 {
        if checker.has_ground_below(bbox) {
            return 0.0;
        }
        return 1.0;
    }

    if current_velocity < terminal_velocity {
        (current_velocity + gravity_step).min(terminal_velocity)
    } else {
        terminal_velocity
    }
}

/// `applyVerticalMovement`: symmetric to the horizontal sweep; landing
/// zeroes `vy`, a ceiling hit resets `vy` to 1.0 (begin falling).
pub fn sweep_vertical(
    checker: &CollisionChecker,
    bbox: WorldRect,
    position: WorldPosition,
    current_velocity: f32,
    movement_y: i32,
) -> (WorldPosition, f32) {
    if movement_y == 0 {
        return (position, current_velocity);
    }

    let mut new_position = position;
    new_position.y += movement_y;

    let moving_down = movement_y > 0;
    let direction = if moving_down { 1 } else { -1 };
    let start_y = position.y + direction;
    let end_y = new_position.y + direction;
    let y_offset = if moving_down { 0 } else { -(bbox.height - 1) };

    let mut row = start_y;
    while row != end_y {
        let y = row + y_offset;
        for col in bbox.left()..=bbox.right() {
            let entered = checker.attributes_at(col, y);
            let collides = if moving_down { entered.is_solid_top() } else { entered.is_solid_bottom() };
            if collides {
                new_position.y = row - direction;
                return (new_position, if moving_down { 0.0 } else { 1.0 });
            }
        }
        row += direction;
    }

    (new_position, current_velocity)
}

/// Advances every `MovingBody` one tick: horizontal sweep, gravity, then
/// vertical sweep, in that order (gravity is applied between the two
/// sweeps so a horizontal step that leaves an entity unsupported begins
/// falling the same tick, per `original_source`'s comment in
/// `PhysicsSystem::update`). Emits `CollidedWithWorld` for any entity that
/// hit something on either axis.
pub fn step_physics(
    store: &mut EntityStore,
    map: &Map,
    tileset: &TileSet,
    gravity_step: f32,
    terminal_velocity: f32,
) -> Vec<GameEvent> {
    let checker = CollisionChecker::new(map, tileset);
    let mut events = Vec::new();

    for id in store.with_moving_body() {
        let body = *store.moving_body(id).unwrap();
        if body.ignore_collisions {
            let pos = store.position_mut(id).unwrap();
            pos.x += body.vx as i32;
            pos.y += body.vy as i32;
            continue;
        }

        let position = *store.position(id).unwrap();
        let bbox_component = store.bounding_box(id).copied().unwrap_or(crate::domain::entity::BoundingBox::new(0, 0, 1, 1));

        let mut collision_flags = CollisionFlags::empty();

        let movement_x = body.vx as i32;
        let world_bbox = bbox_component.to_world_space(position);
        let after_horizontal = if movement_x != 0 {
            let result = sweep_horizontal(&checker, world_bbox, position, movement_x);
            if result.x == position.x && movement_x != 0 {
                collision_flags |= if movement_x > 0 { CollisionFlags::RIGHT } else { CollisionFlags::LEFT };
            }
            result
        } else {
            position
        };

        let bbox_after_horizontal = bbox_component.to_world_space(after_horizontal);

        let mut new_vy = body.vy;
        if body.gravity_affected {
            new_vy = apply_gravity(&checker, bbox_after_horizontal, body.vy, gravity_step, terminal_velocity);
        }

        let movement_y = new_vy as i32;
        let (final_position, resolved_vy) = if movement_y != 0 {
            let (pos, vy) = sweep_vertical(&checker, bbox_after_horizontal, after_horizontal, new_vy, movement_y);
            if vy != new_vy || pos.y != after_horizontal.y + movement_y {
                collision_flags |= if movement_y > 0 { CollisionFlags::BOTTOM } else { CollisionFlags::TOP };
            }
            (pos, vy)
        } else {
            (after_horizontal, new_vy)
        };

        if let Some(pos) = store.position_mut(id) {
            *pos = final_position;
        }
        if let Some(moving) = store.moving_body_mut(id) {
            moving.vy = resolved_vy;
        }

        if !collision_flags.is_empty() {
            events.push(GameEvent::CollidedWithWorld { entity: id, directions: collision_flags });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::BoundingBox;
    use crate::domain::tile::CollisionData as CD;

    fn solid_floor_map(width: usize, height: usize, floor_row: usize) -> (Map, TileSet) {
        let mut map = Map::new(width, height);
        for x in 0..width {
            map.set_layer0(x, floor_row, 1);
        }
        let mut attrs = vec![CD::empty(); 2];
        attrs[1] = CD::SOLID_TOP | CD::SOLID_BOTTOM | CD::SOLID_LEFT | CD::SOLID_RIGHT;
        (map, TileSet::new(2, attrs))
    }

    #[test]
    fn gravity_accumulates_in_fixed_steps_to_terminal() {
        let (map, tileset) = solid_floor_map(4, 4, 3);
        let checker = CollisionChecker::new(&map, &tileset);
        let bbox = WorldRect { x: 0, y: 0, width: 1, height: 1 };
        let mut vy = 0.0_f32;
        vy = apply_gravity(&checker, bbox, vy, 0.56, 2.0); // airborne -> begin falling
        assert_eq!(vy, 1.0);
        vy = apply_gravity(&checker, bbox, vy, 0.56, 2.0);
        assert!((vy - 1.56).abs() < 1e-5);
        vy = apply_gravity(&checker, bbox, vy, 0.56, 2.0);
        assert!((vy - 2.0).abs() < 1e-5); // clamped to terminal, not 2.12
        vy = apply_gravity(&checker, bbox, vy, 0.56, 2.0);
        assert!((vy - 2.0).abs() < 1e-5);
    }

    #[test]
    fn gravity_holds_when_supported() {
        let (map, tileset) = solid_floor_map(4, 4, 3);
        let checker = CollisionChecker::new(&map, &tileset);
        let bbox = WorldRect { x: 0, y: 2, width: 1, height: 1 }; // bottom row 2, floor at 3
        let vy = apply_gravity(&checker, bbox, 0.0, 0.56, 2.0);
        assert_eq!(vy, 0.0);
    }

    #[test]
    fn horizontal_sweep_stops_at_wall() {
        let mut map = Map::new(5, 1);
        map.set_layer0(3, 0, 1);
        let mut attrs = vec![CD::empty(); 2];
        attrs[1] = CD::SOLID_TOP | CD::SOLID_BOTTOM | CD::SOLID_LEFT | CD::SOLID_RIGHT;
        let tileset = TileSet::new(2, attrs);
        let checker = CollisionChecker::new(&map, &tileset);
        let bbox = WorldRect { x: 0, y: 0, width: 1, height: 1 };
        let pos = WorldPosition::new(0, 0);
        let result = sweep_horizontal(&checker, bbox, pos, 4);
        assert_eq!(result.x, 2); // blocked just before the wall at x=3
    }

    #[test]
    fn horizontal_sweep_steps_up_one_tile_wall() {
        // A 1-tall wall at x=2 with clear space above it should be climbed.
        let mut map = Map::new(5, 3);
        map.set_layer0(2, 1, 1); // wall tile, row 1
        // row 0 above the wall is clear (layer0=0)
        let mut attrs = vec![CD::empty(); 2];
        attrs[1] = CD::SOLID_TOP | CD::SOLID_LEFT | CD::SOLID_RIGHT;
        let tileset = TileSet::new(2, attrs);
        let checker = CollisionChecker::new(&map, &tileset);
        let bbox = WorldRect { x: 0, y: 1, width: 1, height: 1 };
        let pos = WorldPosition::new(0, 1);
        let result = sweep_horizontal(&checker, bbox, pos, 3);
        assert_eq!(result.y, 0); // stepped up
    }

    #[test]
    fn vertical_sweep_lands_and_zeroes_velocity() {
        let (map, tileset) = solid_floor_map(4, 5, 3);
        let checker = CollisionChecker::new(&map, &tileset);
        let bbox = WorldRect { x: 0, y: 0, width: 1, height: 1 };
        let pos = WorldPosition::new(0, 0);
        let (new_pos, vy) = sweep_vertical(&checker, bbox, pos, 2.0, 2);
        assert_eq!(new_pos.y, 2); // stops right above the floor at row 3
        assert_eq!(vy, 0.0);
    }

    #[test]
    fn vertical_sweep_ceiling_hit_begins_falling() {
        let mut map = Map::new(4, 5);
        map.set_layer0(0, 0, 1);
        let mut attrs = vec![CD::empty(); 2];
        attrs[1] = CD::SOLID_BOTTOM;
        let tileset = TileSet::new(2, attrs);
        let checker = CollisionChecker::new(&map, &tileset);
        let bbox = WorldRect { x: 0, y: 2, width: 1, height: 1 };
        let pos = WorldPosition::new(0, 2);
        let (_new_pos, vy) = sweep_vertical(&checker, bbox, pos, -2.0, -2);
        assert_eq!(vy, 1.0);
    }

    #[test]
    fn no_tunneling_for_small_velocities() {
        let (map, tileset) = solid_floor_map(4, 4, 2);
        let checker = CollisionChecker::new(&map, &tileset);
        let bbox = WorldRect { x: 0, y: 0, width: 1, height: 1 };
        let pos = WorldPosition::new(0, 0);
        let (new_pos, _) = sweep_vertical(&checker, bbox, pos, 2.0, 2);
        assert!(new_pos.y < 2); // never enters the solid row
    }
}
