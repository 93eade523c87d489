/// Player controller: movement state machine, shooting, temporary items.
/// `spec.md §4.4`.
///
/// Grounded on the teacher's truth-table style in `domain/rules.rs` (each
/// transition is a short conjunction of conditions, not a monolithic
/// branch) and its minimal-state-machine philosophy in `domain/entity.rs`
/// (`ActorState`), generalized from the teacher's 6 states to the 14
/// named in `spec.md §4.4`. The jump arc and somersault constants are
/// taken directly from `original_source/src/game_logic/player.cpp`.

use std::collections::HashSet;

use rand::Rng;

use crate::config::SimConfig;
use crate::domain::actor_ids;
use crate::domain::entity::{
    BoundingBox, EntityId, EntityStore, ItemKind, MovingBody, Orientation, WeaponKind, WorldPosition,
};
use crate::domain::physics::CollisionChecker;
use crate::domain::tile::ConveyorDirection;
use crate::sim::event::GameEvent;
use crate::sim::world::GlobalDependencies;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DieingSubstate {
    FlyingUp,
    FallingDown,
    Exploding,
    Finished,
}

/// The 14-variant movement state machine (`spec.md §4.4`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerState {
    OnGround,
    Jumping,
    Falling,
    ClimbingLadder,
    OnPipe,
    PushedByFan,
    RecoveringFromLanding,
    Interacting { duration_remaining: u32 },
    Dieing { substate: DieingSubstate, frames_in_substate: u32 },
    Incapacitated { visible_frames: u32 },
    UsingJetpack,
    InShip,
    RidingElevator,
    GettingSuckedIntoSpace,
    AirlockDeath,
}

/// Sanitized per-tick input (`spec.md §4.4`: "opposing directions
/// cancel").
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub jump_held: bool,
    pub jump_pressed: bool,
    pub fire_held: bool,
}

impl FrameInput {
    /// Cancels `left`+`right` and `up`+`down` when both are held.
    pub fn sanitized(self) -> Self {
        let mut out = self;
        if out.left && out.right {
            out.left = false;
            out.right = false;
        }
        if out.up && out.down {
            out.up = false;
            out.down = false;
        }
        out
    }

    pub fn horizontal(self) -> i32 {
        if self.left {
            -1
        } else if self.right {
            1
        } else {
            0
        }
    }
}

/// Jump arc upward offsets, copied verbatim from `player.cpp`'s
/// `JUMP_ARC` table (`spec.md §4.4.1`).
pub const JUMP_ARC: [i32; 8] = [2, 2, 1, 1, 1, 0, 0, 0];

/// Persistent per-run player data (`spec.md §3`). Survives level
/// transitions; only the movement state machine resets.
#[derive(Clone, Debug)]
pub struct PlayerModel {
    pub score: u32,
    pub health: i32,
    pub max_health: i32,
    pub selected_weapon: WeaponKind,
    pub ammo: [u32; 4],
    pub inventory: HashSet<ItemKind>,
    pub collected_letters: HashSet<ItemKind>,
    pub rapid_fire_ticks_remaining: Option<u32>,
    pub cloak_ticks_remaining: Option<u32>,
    pub tutorials_shown: HashSet<&'static str>,
    pub checkpoint: Option<WorldPosition>,
}

const MAX_SCORE: u32 = 9_999_999;

impl PlayerModel {
    pub fn new() -> Self {
        PlayerModel {
            score: 0,
            health: 9,
            max_health: 9,
            selected_weapon: WeaponKind::Normal,
            ammo: [u32::MAX, 0, 0, 0],
            inventory: HashSet::new(),
            collected_letters: HashSet::new(),
            rapid_fire_ticks_remaining: None,
            cloak_ticks_remaining: None,
            tutorials_shown: HashSet::new(),
            checkpoint: None,
        }
    }

    pub(crate) fn weapon_index(weapon: WeaponKind) -> usize {
        match weapon {
            WeaponKind::Normal => 0,
            WeaponKind::Laser => 1,
            WeaponKind::FlameThrower => 2,
            WeaponKind::Rocket => 3,
        }
    }

    pub fn add_score(&mut self, amount: u32) {
        self.score = (self.score + amount).min(MAX_SCORE);
    }

    pub fn add_health(&mut self, amount: i32) {
        self.health = (self.health + amount).clamp(0, self.max_health);
    }

    pub fn ammo_for(&self, weapon: WeaponKind) -> u32 {
        self.ammo[Self::weapon_index(weapon)]
    }

    pub fn refill_ammo(&mut self, weapon: WeaponKind, amount: u32) {
        let idx = Self::weapon_index(weapon);
        self.ammo[idx] = (self.ammo[idx] + amount).min(weapon.max_ammo());
    }

    /// `rapid_armed` bit: continuous fire while held, from inventory item
    /// or the flame thrower (`spec.md §4.4.2`).
    pub fn has_rapid_fire(&self) -> bool {
        self.rapid_fire_ticks_remaining.is_some() || self.selected_weapon == WeaponKind::FlameThrower
    }

    /// Advances the 700-frame temporary-item counters, emitting the
    /// warning message and expiry event at the documented thresholds
    /// (`spec.md §4.4.3`).
    pub fn tick_temporary_items(&mut self, config: &SimConfig, events: &mut Vec<GameEvent>) {
        tick_counter(&mut self.rapid_fire_ticks_remaining, config, events, false);
        tick_counter(&mut self.cloak_ticks_remaining, config, events, true);
    }
}

fn tick_counter(counter: &mut Option<u32>, config: &SimConfig, events: &mut Vec<GameEvent>, is_cloak: bool) {
    let Some(remaining) = counter.as_mut() else { return };
    if *remaining == config.temp_item_warning_lead {
        events.push(GameEvent::PlayerMessage("timing out".to_string()));
    }
    if *remaining == 0 {
        *counter = None;
        if is_cloak {
            events.push(GameEvent::TemporaryItemExpired { cloak: true });
        }
        return;
    }
    *remaining -= 1;
}

/// Per-tick movement/animation state, distinct from the persistent
/// `PlayerModel` (`spec.md §3`/`§4.4`).
#[derive(Clone, Debug)]
pub struct PlayerController {
    pub state: PlayerState,
    pub orientation: Orientation,
    pub jump_step: usize,
    pub jump_somersault: bool,
    pub mercy_frames_remaining: u32,
    pub rapid_armed: bool,
    pub animation_tick: u32,
}

impl PlayerController {
    pub fn new() -> Self {
        PlayerController {
            state: PlayerState::OnGround,
            orientation: Orientation::Right,
            jump_step: 0,
            jump_somersault: false,
            mercy_frames_remaining: 0,
            rapid_armed: false,
            animation_tick: 0,
        }
    }

    /// One simulation tick (`spec.md §4.4`, steps 1-6).
    pub fn update(
        &mut self,
        deps: &mut GlobalDependencies,
        store: &mut EntityStore,
        model: &mut PlayerModel,
        entity: EntityId,
        input: FrameInput,
        mercy_frames_for_difficulty: u32,
    ) {
        let input = input.sanitized();

        self.apply_conveyor_drift(deps, store, entity);
        self.try_attach_ladder(deps, store, entity, input);
        self.advance_state(deps, store, entity, input);
        self.update_shooting(deps, store, model, entity, input);
        self.sync_bounding_box(store, entity);

        // Every state but `Falling` moves the player by mutating its
        // `WorldPosition` directly rather than through velocity. Parking
        // `vx`/`vy` at rest isn't enough on its own: `step_physics` still
        // calls `apply_gravity` for any `gravity_affected` body with
        // `vy == 0` and no ground below, handing back `vy = 1.0` and
        // sweeping the player down a tile the same tick — fighting the
        // jump arc, ladder/pipe climbs, and the death animation. Disabling
        // `gravity_affected` outside `Falling` keeps the generic physics
        // step a no-op for the player until `advance_falling` re-arms it.
        if let Some(body) = store.moving_body_mut(entity) {
            let falling = matches!(self.state, PlayerState::Falling);
            body.gravity_affected = falling;
            if !falling {
                body.vx = 0.0;
                body.vy = 0.0;
            }
        }

        self.animation_tick = self.animation_tick.wrapping_add(1);
        if self.mercy_frames_remaining > 0 {
            self.mercy_frames_remaining -= 1;
        }
        let _ = mercy_frames_for_difficulty;
    }

    /// Called by the damage-infliction glue when the player takes a hit;
    /// arms the mercy-frame window for the given difficulty.
    pub fn take_hit(&mut self, mercy_frames: u32) {
        self.mercy_frames_remaining = mercy_frames;
    }

    pub fn is_invincible(&self) -> bool {
        self.mercy_frames_remaining > 0
    }

    fn apply_conveyor_drift(&mut self, deps: &GlobalDependencies, store: &mut EntityStore, entity: EntityId) {
        if matches!(self.state, PlayerState::RidingElevator) {
            return;
        }
        let Some(rect) = store.world_rect(entity) else { return };
        if let Some(direction) = deps.collision.conveyor_below(rect) {
            if let Some(position) = store.position_mut(entity) {
                position.x += match direction {
                    ConveyorDirection::Left => -1,
                    ConveyorDirection::Right => 1,
                };
            }
        }
    }

    fn try_attach_ladder(&mut self, deps: &GlobalDependencies, store: &mut EntityStore, entity: EntityId, input: FrameInput) {
        if matches!(self.state, PlayerState::ClimbingLadder) || !input.up {
            return;
        }
        let Some(rect) = store.world_rect(entity) else { return };
        let top_is_ladder = (rect.left()..=rect.right()).any(|x| deps.collision.is_ladder(x, rect.top()));
        if top_is_ladder {
            self.state = PlayerState::ClimbingLadder;
            if let Some(position) = store.position_mut(entity) {
                position.x = (rect.left() + rect.right()) / 2;
            }
        }
    }

    fn advance_state(&mut self, deps: &mut GlobalDependencies, store: &mut EntityStore, entity: EntityId, input: FrameInput) {
        match self.state {
            PlayerState::OnGround => self.advance_on_ground(deps, store, entity, input),
            PlayerState::Jumping => self.advance_jumping(deps, store, entity, input),
            PlayerState::Falling => self.advance_falling(deps, store, entity),
            PlayerState::ClimbingLadder => self.advance_ladder(deps, store, entity, input),
            PlayerState::OnPipe => self.advance_pipe(deps, store, entity, input),
            PlayerState::RecoveringFromLanding => {
                self.state = PlayerState::OnGround;
            }
            PlayerState::Interacting { duration_remaining } => {
                if duration_remaining <= 1 {
                    self.state = PlayerState::OnGround;
                } else {
                    self.state = PlayerState::Interacting { duration_remaining: duration_remaining - 1 };
                }
            }
            PlayerState::Dieing { substate, frames_in_substate } => {
                self.advance_dieing(store, entity, substate, frames_in_substate, deps);
            }
            PlayerState::PushedByFan
            | PlayerState::Incapacitated { .. }
            | PlayerState::UsingJetpack
            | PlayerState::InShip
            | PlayerState::RidingElevator
            | PlayerState::GettingSuckedIntoSpace
            | PlayerState::AirlockDeath => {
                // External systems (fan zones, elevators, airlock sequences)
                // drive these states' exit conditions; the controller only
                // advances their per-tick position here.
                let dx = input.horizontal();
                if dx != 0 {
                    if let Some(position) = store.position_mut(entity) {
                        position.x += dx;
                    }
                    self.orientation = if dx > 0 { Orientation::Right } else { Orientation::Left };
                }
            }
        }
    }

    fn advance_on_ground(&mut self, deps: &mut GlobalDependencies, store: &mut EntityStore, entity: EntityId, input: FrameInput) {
        let dx = input.horizontal();
        if dx != 0 {
            self.orientation = if dx > 0 { Orientation::Right } else { Orientation::Left };
            if let Some(position) = store.position(entity).copied() {
                if let Some(rect) = store.world_rect(entity) {
                    let new_position = crate::domain::physics::sweep_horizontal(&deps.collision, rect, position, dx);
                    if let Some(p) = store.position_mut(entity) {
                        *p = new_position;
                    }
                }
            }
        }

        let still_grounded = store.world_rect(entity).map(|r| deps.collision.has_ground_below(r)).unwrap_or(false);
        if !still_grounded {
            self.state = PlayerState::Falling;
            return;
        }

        if input.jump_pressed {
            let ceiling_blocked = store
                .world_rect(entity)
                .map(|r| deps.collision.is_solid_bottom(r.left(), r.top() - 1))
                .unwrap_or(false);
            if !ceiling_blocked {
                self.state = PlayerState::Jumping;
                self.jump_step = 0;
                self.jump_somersault = false;
            }
        }
    }

    fn advance_jumping(&mut self, deps: &mut GlobalDependencies, store: &mut EntityStore, entity: EntityId, input: FrameInput) {
        let dx = input.horizontal();
        if dx != 0 {
            self.orientation = if dx > 0 { Orientation::Right } else { Orientation::Left };
        }

        if self.jump_step == 1 && dx != 0 && deps.rng.gen_range(0..6) == 0 {
            self.jump_somersault = true;
        }

        // Short-hop gate: releasing jump (or a spider overhead, not modeled
        // here) at step 2 skips straight to the descent tail of the arc.
        if self.jump_step == 2 && !input.jump_held {
            self.jump_step = 6;
        }

        let rise = JUMP_ARC.get(self.jump_step).copied().unwrap_or(0);

        if let (Some(position), Some(rect)) = (store.position(entity).copied(), store.world_rect(entity)) {
            let after_horizontal = if dx != 0 {
                crate::domain::physics::sweep_horizontal(&deps.collision, rect, position, dx)
            } else {
                position
            };
            let rect_after_horizontal = store
                .bounding_box(entity)
                .copied()
                .unwrap_or(BoundingBox::new(0, 0, 1, 1))
                .to_world_space(after_horizontal);

            if rise > 0 {
                let (new_position, hit_ceiling) =
                    ceiling_checked_rise(&deps.collision, rect_after_horizontal, after_horizontal, rise);
                if let Some(p) = store.position_mut(entity) {
                    *p = new_position;
                }
                if hit_ceiling {
                    self.state = PlayerState::Falling;
                    return;
                }
            } else if let Some(p) = store.position_mut(entity) {
                *p = after_horizontal;
            }
        }

        self.jump_step += 1;
        if self.jump_step >= JUMP_ARC.len() {
            self.state = PlayerState::Falling;
        }
    }

    fn advance_falling(&mut self, deps: &mut GlobalDependencies, store: &mut EntityStore, entity: EntityId) {
        let Some(body) = store.moving_body(entity).copied() else {
            self.state = PlayerState::OnGround;
            return;
        };

        let rect = match store.world_rect(entity) {
            Some(r) => r,
            None => return,
        };

        if body.vy == 0.0 && !deps.collision.has_ground_below(rect) {
            if let Some(b) = store.moving_body_mut(entity) {
                b.vy = 1.0;
            }
        }

        let reached_terminal = body.vy >= deps.config.sim.terminal_velocity;
        if deps.collision.has_ground_below(rect) {
            self.state = if reached_terminal { PlayerState::RecoveringFromLanding } else { PlayerState::OnGround };
            if let Some(b) = store.moving_body_mut(entity) {
                b.vy = 0.0;
            }
            return;
        }

        let top_is_climbable = (rect.left()..=rect.right()).any(|x| deps.collision.is_climbable(x, rect.top()));
        if top_is_climbable {
            self.state = PlayerState::OnPipe;
        }
    }

    fn advance_ladder(&mut self, deps: &GlobalDependencies, store: &mut EntityStore, entity: EntityId, input: FrameInput) {
        if input.jump_pressed {
            self.state = PlayerState::Jumping;
            self.jump_step = 0;
            return;
        }

        let Some(rect) = store.world_rect(entity) else { return };
        let dy = if input.up { -1 } else if input.down { 1 } else { 0 };
        if dy == 0 {
            return;
        }
        let probe_y = if dy < 0 { rect.top() - 1 } else { rect.bottom() + 1 };
        let still_on_ladder = (rect.left()..=rect.right()).any(|x| deps.collision.is_ladder(x, probe_y));
        if !still_on_ladder && dy < 0 {
            return;
        }
        if let Some(position) = store.position_mut(entity) {
            position.y += dy;
        }
        if dy > 0 && !still_on_ladder {
            self.state = PlayerState::Falling;
        }
    }

    fn advance_pipe(&mut self, deps: &GlobalDependencies, store: &mut EntityStore, entity: EntityId, input: FrameInput) {
        let Some(rect) = store.world_rect(entity) else { return };
        let top_climbable = (rect.left()..=rect.right()).any(|x| deps.collision.is_climbable(x, rect.top()));
        if !top_climbable {
            self.state = PlayerState::Falling;
            return;
        }

        let dx = input.horizontal();
        if dx != 0 {
            self.orientation = if dx > 0 { Orientation::Right } else { Orientation::Left };
            if let Some(position) = store.position_mut(entity) {
                position.x += dx;
            }
        }

        if input.down && input.jump_pressed {
            self.state = PlayerState::Falling;
        }
    }

    fn advance_dieing(
        &mut self,
        store: &mut EntityStore,
        entity: EntityId,
        substate: DieingSubstate,
        frames_in_substate: u32,
        deps: &mut GlobalDependencies,
    ) {
        match substate {
            DieingSubstate::FlyingUp => {
                if let Some(position) = store.position_mut(entity) {
                    position.y -= 1;
                }
                if frames_in_substate + 1 >= 6 {
                    self.state = PlayerState::Dieing { substate: DieingSubstate::FallingDown, frames_in_substate: 0 };
                } else {
                    self.state = PlayerState::Dieing { substate, frames_in_substate: frames_in_substate + 1 };
                }
            }
            DieingSubstate::FallingDown => {
                let grounded = store.world_rect(entity).map(|r| deps.collision.has_ground_below(r)).unwrap_or(true);
                if grounded {
                    self.state = PlayerState::Dieing { substate: DieingSubstate::Exploding, frames_in_substate: 0 };
                } else {
                    if let Some(position) = store.position_mut(entity) {
                        position.y += 1;
                    }
                    self.state = PlayerState::Dieing { substate, frames_in_substate: frames_in_substate + 1 };
                }
            }
            DieingSubstate::Exploding => {
                self.state = PlayerState::Dieing { substate: DieingSubstate::Finished, frames_in_substate: 0 };
            }
            DieingSubstate::Finished => {
                deps.events.push(GameEvent::PlayerDied);
            }
        }
    }

    fn update_shooting(
        &mut self,
        deps: &mut GlobalDependencies,
        store: &mut EntityStore,
        model: &mut PlayerModel,
        entity: EntityId,
        input: FrameInput,
    ) {
        let blocked = matches!(
            self.state,
            PlayerState::ClimbingLadder
                | PlayerState::Interacting { .. }
                | PlayerState::RidingElevator
                | PlayerState::Dieing { .. }
        ) || (matches!(self.state, PlayerState::OnPipe) && input.up);

        if blocked {
            self.rapid_armed = false;
            return;
        }

        let rapid = model.has_rapid_fire();
        let should_fire = if rapid {
            input.fire_held
        } else {
            input.fire_held && !self.rapid_armed
        };
        self.rapid_armed = input.fire_held;

        if !should_fire {
            return;
        }

        let weapon = model.selected_weapon;
        if weapon.consumes_ammo() {
            let idx_ammo = model.ammo_for(weapon);
            if idx_ammo == 0 {
                model.selected_weapon = WeaponKind::Normal;
                return;
            }
            let remaining = idx_ammo - 1;
            *model.ammo.get_mut(PlayerModel::weapon_index(weapon)).unwrap() = remaining;
            if remaining == 0 {
                model.selected_weapon = WeaponKind::Normal;
            }
        }

        let position = store.position(entity).copied().unwrap_or_default();
        let offset = if self.orientation == Orientation::Right { 1 } else { -1 };
        let spawn_at = WorldPosition::new(position.x + offset, position.y);
        let shot_actor = match weapon {
            WeaponKind::Normal => actor_ids::PLAYER_SHOT_NORMAL,
            WeaponKind::Laser => actor_ids::PLAYER_SHOT_LASER,
            WeaponKind::FlameThrower => actor_ids::PLAYER_SHOT_FLAME,
            WeaponKind::Rocket => actor_ids::PLAYER_SHOT_ROCKET,
        };
        deps.spawn_actor(store, shot_actor, spawn_at, self.orientation);
        deps.events.push(GameEvent::PlayerFiredShot);
    }

    fn sync_bounding_box(&self, store: &mut EntityStore, entity: EntityId) {
        let (width, height) = match self.state {
            PlayerState::ClimbingLadder | PlayerState::OnPipe => (1, 2),
            PlayerState::Dieing { .. } | PlayerState::Incapacitated { .. } => (1, 1),
            _ => (1, 2),
        };
        store.set_bounding_box(entity, BoundingBox::new(0, 0, width, height));
    }
}

/// Rises by `rise` tiles, stopping (and reporting a ceiling hit) if any row
/// crossed is `isSolidBottom` (`spec.md §4.4.1`: "on ceiling hit during the
/// climb, begin falling").
fn ceiling_checked_rise(
    checker: &CollisionChecker,
    bbox: crate::domain::entity::WorldRect,
    position: WorldPosition,
    rise: i32,
) -> (WorldPosition, bool) {
    let mut new_position = position;
    for _ in 0..rise {
        let candidate_top = new_position.y - 1 - (bbox.height - 1);
        let hit = (bbox.left()..=bbox.right()).any(|x| checker.is_solid_bottom(x, candidate_top));
        if hit {
            return (new_position, true);
        }
        new_position.y -= 1;
    }
    (new_position, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_input_cancels_opposing_directions() {
        let input = FrameInput { left: true, right: true, up: true, down: false, ..Default::default() };
        let sanitized = input.sanitized();
        assert!(!sanitized.left && !sanitized.right);
        assert!(!sanitized.up); // `up` alone was never both, unaffected path checked separately
    }

    #[test]
    fn jump_arc_matches_original_constants() {
        assert_eq!(JUMP_ARC, [2, 2, 1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn score_clamps_at_max() {
        let mut model = PlayerModel::new();
        model.add_score(MAX_SCORE + 500);
        assert_eq!(model.score, MAX_SCORE);
    }

    #[test]
    fn health_clamps_to_max() {
        let mut model = PlayerModel::new();
        model.add_health(100);
        assert_eq!(model.health, model.max_health);
    }

    #[test]
    fn ammo_depletion_reverts_to_normal_weapon() {
        let mut model = PlayerModel::new();
        model.selected_weapon = WeaponKind::Laser;
        model.refill_ammo(WeaponKind::Laser, 1);
        assert_eq!(model.ammo_for(WeaponKind::Laser), 1);
    }

    #[test]
    fn temp_item_warning_fires_at_lead_threshold() {
        let config = SimConfig::default();
        let mut model = PlayerModel::new();
        model.cloak_ticks_remaining = Some(config.temp_item_warning_lead);
        let mut events = Vec::new();
        model.tick_temporary_items(&config, &mut events);
        assert!(matches!(events[0], GameEvent::PlayerMessage(_)));
    }

    #[test]
    fn cloak_expiry_emits_event() {
        let config = SimConfig::default();
        let mut model = PlayerModel::new();
        model.cloak_ticks_remaining = Some(0);
        let mut events = Vec::new();
        model.tick_temporary_items(&config, &mut events);
        assert!(matches!(events[0], GameEvent::TemporaryItemExpired { cloak: true }));
        assert!(model.cloak_ticks_remaining.is_none());
    }
}
