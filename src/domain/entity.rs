/// Entity store and component schema.
///
/// Grounded on the design notes in `spec.md §9`: a closed set of component
/// kinds known at build time, stored as plain fields rather than behind
/// virtual dispatch. Generalizes the teacher's per-kind structs (`Player`,
/// `Guard`, `Hole`) into a single entity record holding one `Option<T>`
/// slot per component kind, addressed by a generational `EntityId` so
/// stale handles from a previous tick are detected rather than aliasing a
/// reused slot.

use crate::domain::ai::BehaviorController;
use crate::domain::containers::{DynamicGeometryController, ItemContainer};
use crate::domain::damage::EffectSpec;

/// Opaque handle into the entity store. Carries a generation counter so a
/// handle captured before an entity's destruction can't silently resolve
/// to a different, later entity reusing the same slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Orientation {
    Left,
    Right,
}

impl Orientation {
    pub fn flip(self) -> Self {
        match self {
            Orientation::Left => Orientation::Right,
            Orientation::Right => Orientation::Left,
        }
    }

    pub fn sign(self) -> i32 {
        match self {
            Orientation::Left => -1,
            Orientation::Right => 1,
        }
    }
}

/// Position in tile units. Per `spec.md §3`, refers to the sprite's
/// bottom-left corner.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct WorldPosition {
    pub x: i32,
    pub y: i32,
}

impl WorldPosition {
    pub fn new(x: i32, y: i32) -> Self {
        WorldPosition { x, y }
    }
}

/// Relative rectangle used for collision, in tile units, anchored at the
/// entity's `WorldPosition`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        BoundingBox { x, y, width, height }
    }

    /// World-space rectangle: bottom-left anchored, matching
    /// `original_source`'s `toWorldSpace` (`bbox + (pos.x, pos.y - (h-1))`).
    pub fn to_world_space(&self, position: WorldPosition) -> WorldRect {
        WorldRect {
            x: position.x + self.x,
            y: position.y + self.y - (self.height - 1),
            width: self.width,
            height: self.height,
        }
    }
}

/// An absolute axis-aligned rectangle in world tile coordinates.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct WorldRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WorldRect {
    pub fn left(&self) -> i32 {
        self.x
    }
    pub fn right(&self) -> i32 {
        self.x + self.width - 1
    }
    pub fn top(&self) -> i32 {
        self.y
    }
    pub fn bottom(&self) -> i32 {
        self.y + self.height - 1
    }

    pub fn intersects(&self, other: &WorldRect) -> bool {
        self.left() <= other.right()
            && self.right() >= other.left()
            && self.top() <= other.bottom()
            && self.bottom() >= other.top()
    }
}

/// Identifies which draw data and frame set a sprite component refers to.
pub type SpriteId = u16;

/// Pointer to shared draw data plus active frame indices and the overlay
/// flags used by the rendering pipeline (`spec.md §4.8`).
#[derive(Clone, Debug)]
pub struct Sprite {
    pub sprite_id: SpriteId,
    /// One real/virtual frame index per render slot.
    pub frames_to_render: Vec<u16>,
    pub flash: bool,
    pub translucent: bool,
}

impl Sprite {
    pub fn new(sprite_id: SpriteId, frame: u16) -> Self {
        Sprite { sprite_id, frames_to_render: vec![frame], flash: false, translucent: false }
    }
}

/// Cycles between two frame indices at a fixed period.
#[derive(Clone, Copy, Debug)]
pub struct AnimationLoop {
    pub frame_a: u16,
    pub frame_b: u16,
    pub period_ticks: u32,
    elapsed: u32,
    pub showing_b: bool,
}

impl AnimationLoop {
    pub fn new(frame_a: u16, frame_b: u16, period_ticks: u32) -> Self {
        AnimationLoop { frame_a, frame_b, period_ticks, elapsed: 0, showing_b: false }
    }

    pub fn tick(&mut self) -> u16 {
        self.elapsed += 1;
        if self.elapsed >= self.period_ticks.max(1) {
            self.elapsed = 0;
            self.showing_b = !self.showing_b;
        }
        if self.showing_b { self.frame_b } else { self.frame_a }
    }
}

/// A one-shot or repeating explicit frame list (muzzle flashes, explosions).
#[derive(Clone, Debug)]
pub struct AnimationSequence {
    pub frames: Vec<u16>,
    pub index: usize,
    pub repeating: bool,
    pub ticks_per_frame: u32,
    elapsed: u32,
    pub finished: bool,
}

impl AnimationSequence {
    pub fn new(frames: Vec<u16>, ticks_per_frame: u32, repeating: bool) -> Self {
        AnimationSequence { frames, index: 0, repeating, ticks_per_frame, elapsed: 0, finished: false }
    }

    pub fn current_frame(&self) -> Option<u16> {
        self.frames.get(self.index).copied()
    }

    /// Advance one tick. Returns true the first tick the sequence finishes.
    pub fn tick(&mut self) -> bool {
        if self.finished || self.frames.is_empty() {
            return false;
        }
        self.elapsed += 1;
        if self.elapsed < self.ticks_per_frame.max(1) {
            return false;
        }
        self.elapsed = 0;
        self.index += 1;
        if self.index >= self.frames.len() {
            if self.repeating {
                self.index = 0;
            } else {
                self.index = self.frames.len() - 1;
                self.finished = true;
                return true;
            }
        }
        false
    }
}

/// Sub-tile velocity accumulator, `spec.md §4.3`/`§9` ("keep float velocity,
/// integer position" split).
#[derive(Clone, Copy, Debug, Default)]
pub struct MovingBody {
    pub vx: f32,
    pub vy: f32,
    pub gravity_affected: bool,
    pub ignore_collisions: bool,
}

impl MovingBody {
    pub fn new(gravity_affected: bool) -> Self {
        MovingBody { vx: 0.0, vy: 0.0, gravity_affected, ignore_collisions: false }
    }
}

/// Marker: participates in world-collision physics / acts as solid ground
/// for others.
#[derive(Clone, Copy, Debug, Default)]
pub struct SolidBody {
    pub acts_as_solid_for_others: bool,
}

/// Hit points and kill behavior for anything that can be shot.
#[derive(Clone, Copy, Debug)]
pub struct Shootable {
    pub health: i32,
    pub score_on_kill: u32,
    pub invincible: bool,
    pub hit_feedback: bool,
    pub destroy_on_kill: bool,
}

impl Shootable {
    pub fn new(health: i32, score_on_kill: u32) -> Self {
        Shootable {
            health,
            score_on_kill,
            invincible: false,
            hit_feedback: true,
            destroy_on_kill: true,
        }
    }
}

/// Damage dealt to the player on contact.
#[derive(Clone, Copy, Debug)]
pub struct PlayerDamaging {
    pub amount: i32,
    pub fatal: bool,
    pub destroy_on_contact: bool,
}

/// Per-frame damage dealt by a projectile to anything `Shootable`.
#[derive(Clone, Copy, Debug)]
pub struct DamageInflicting {
    pub damage_per_frame: i32,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ItemKind {
    HealthMolecule,
    LetterN,
    LetterU,
    LetterK,
    LetterE,
    LetterM,
    VideoGame,
    Sunglasses,
    Phone,
    BoomBox,
    Disk,
    Tv,
    Camera,
    Pc,
    Cd,
    TShirt,
    Videocassette,
    CircuitCard,
    BlueKey,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WeaponKind {
    Normal,
    Laser,
    FlameThrower,
    Rocket,
}

impl WeaponKind {
    pub fn max_ammo(self) -> u32 {
        match self {
            WeaponKind::Normal => u32::MAX, // infinite, not decremented
            WeaponKind::Laser => 99,
            WeaponKind::FlameThrower => 99,
            WeaponKind::Rocket => 99,
        }
    }

    pub fn default_ammo(self) -> u32 {
        match self {
            WeaponKind::Normal => u32::MAX,
            _ => 0,
        }
    }

    pub fn consumes_ammo(self) -> bool {
        !matches!(self, WeaponKind::Normal)
    }

    /// Rapid-fire cadence in ticks between shots while the trigger is held.
    pub fn rapid_fire_cadence(self) -> u32 {
        match self {
            WeaponKind::Laser => 2,
            WeaponKind::FlameThrower => 1,
            _ => 3,
        }
    }
}

/// Grants applied on pickup: any subset of score, health, item, weapon,
/// letter. `spec.md §3`.
#[derive(Clone, Debug, Default)]
pub struct CollectableItem {
    pub score: u32,
    pub health: i32,
    pub item: Option<ItemKind>,
    pub weapon: Option<WeaponKind>,
    pub ammo_refill: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InteractableKind {
    Teleporter { target: u16 },
    KeySlot,
    HintGlobe,
}

/// The tagged AI/event condition an `Active` flag is driven by.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActivationSettings {
    Always,
    AfterFirstOnScreen,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActorTagKind {
    ScoreNumberFloater,
    Boss,
    Collectible,
    Enemy,
}

/// Records the position an entity was at during the *previous* tick, so
/// the renderer can interpolate between ticks at a higher frame rate
/// (`spec.md §4.8`, §5).
#[derive(Clone, Copy, Debug)]
pub struct InterpolateMotion {
    pub previous_position: WorldPosition,
}

/// Draw-order overrides. `DrawTopMost` forces the "top-most" render pass
/// (after foreground masked tiles); `OverrideDrawOrder` replaces the
/// sprite-data-provided order.
#[derive(Clone, Copy, Debug, Default)]
pub struct DrawTopMost;

#[derive(Clone, Copy, Debug)]
pub struct OverrideDrawOrder(pub i32);

/// A rectangle of the map tied to this entity, erased when it dies
/// (`spec.md §3`, `§4.6`). Deliberately a pure data pair, not a reference.
#[derive(Clone, Copy, Debug)]
pub struct MapGeometryLink {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AutoDestroyCondition {
    OnWorldCollision,
    OnLeavingActiveRegion,
    AfterTicks(u32),
}

#[derive(Clone, Copy, Debug)]
pub struct AutoDestroy {
    pub condition: AutoDestroyCondition,
    /// Mutable countdown for `AfterTicks`; ignored otherwise.
    pub ticks_remaining: u32,
}

impl AutoDestroy {
    pub fn after_ticks(ticks: u32) -> Self {
        AutoDestroy { condition: AutoDestroyCondition::AfterTicks(ticks), ticks_remaining: ticks }
    }
    pub fn on_world_collision() -> Self {
        AutoDestroy { condition: AutoDestroyCondition::OnWorldCollision, ticks_remaining: 0 }
    }
    pub fn on_leaving_active_region() -> Self {
        AutoDestroy { condition: AutoDestroyCondition::OnLeavingActiveRegion, ticks_remaining: 0 }
    }
}

#[derive(Clone, Debug)]
pub struct DestructionEffects {
    pub effects: Vec<EffectSpec>,
    pub trigger: DestructionTrigger,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DestructionTrigger {
    OnKilled,
    OnWorldCollision,
}

/// A single entity's component slots. Every field is optional; the set of
/// fields is the closed component schema from `spec.md §3`.
#[derive(Default)]
struct EntityRecord {
    alive: bool,
    generation: u32,
    position: Option<WorldPosition>,
    bounding_box: Option<BoundingBox>,
    orientation: Option<Orientation>,
    sprite: Option<Sprite>,
    animation_loop: Option<AnimationLoop>,
    animation_sequence: Option<AnimationSequence>,
    moving_body: Option<MovingBody>,
    solid_body: Option<SolidBody>,
    shootable: Option<Shootable>,
    player_damaging: Option<PlayerDamaging>,
    damage_inflicting: Option<DamageInflicting>,
    collectable: Option<CollectableItem>,
    item_container: Option<ItemContainer>,
    interactable: Option<InteractableKind>,
    behavior: Option<BehaviorController>,
    activation: Option<ActivationSettings>,
    active: bool,
    actor_tag: Option<ActorTagKind>,
    interpolate_motion: Option<InterpolateMotion>,
    destruction_effects: Option<DestructionEffects>,
    map_geometry_link: Option<MapGeometryLink>,
    dynamic_geometry: Option<DynamicGeometryController>,
    draw_top_most: bool,
    override_draw_order: Option<OverrideDrawOrder>,
    auto_destroy: Option<AutoDestroy>,
}

/// Owns every entity's components. Systems borrow it for the duration of a
/// single tick; it is never shared across threads (`spec.md §5`).
#[derive(Default)]
pub struct EntityStore {
    records: Vec<EntityRecord>,
    free_list: Vec<u32>,
}

macro_rules! component_accessors {
    ($field:ident, $ty:ty, $get:ident, $get_mut:ident, $attach:ident, $remove:ident) => {
        pub fn $get(&self, id: EntityId) -> Option<&$ty> {
            self.slot(id).and_then(|r| r.$field.as_ref())
        }

        pub fn $get_mut(&mut self, id: EntityId) -> Option<&mut $ty> {
            self.slot_mut(id).and_then(|r| r.$field.as_mut())
        }

        pub fn $attach(&mut self, id: EntityId, value: $ty) {
            if let Some(r) = self.slot_mut(id) {
                r.$field = Some(value);
            }
        }

        pub fn $remove(&mut self, id: EntityId) -> Option<$ty> {
            self.slot_mut(id).and_then(|r| r.$field.take())
        }
    };
}

impl EntityStore {
    pub fn new() -> Self {
        EntityStore { records: Vec::new(), free_list: Vec::new() }
    }

    fn slot(&self, id: EntityId) -> Option<&EntityRecord> {
        self.records
            .get(id.index as usize)
            .filter(|r| r.alive && r.generation == id.generation)
    }

    fn slot_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.records
            .get_mut(id.index as usize)
            .filter(|r| r.alive && r.generation == id.generation)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.slot(id).is_some()
    }

    /// Creates a new entity with no components attached. Visible to
    /// subsequent systems in the same tick (`spec.md §5`).
    pub fn spawn(&mut self) -> EntityId {
        if let Some(index) = self.free_list.pop() {
            let record = &mut self.records[index as usize];
            record.alive = true;
            record.generation += 1;
            EntityId { index, generation: record.generation }
        } else {
            let index = self.records.len() as u32;
            let mut record = EntityRecord::default();
            record.alive = true;
            self.records.push(record);
            EntityId { index, generation: 0 }
        }
    }

    /// Destroys an entity, freeing its slot for reuse under a new
    /// generation.
    pub fn destroy(&mut self, id: EntityId) {
        if let Some(record) = self.records.get_mut(id.index as usize) {
            if record.alive && record.generation == id.generation {
                *record = EntityRecord { alive: false, generation: record.generation, ..Default::default() };
                self.free_list.push(id.index);
            }
        }
    }

    /// All currently-alive entity ids. Order is slot order, stable within a
    /// tick.
    pub fn ids(&self) -> Vec<EntityId> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.alive)
            .map(|(i, r)| EntityId { index: i as u32, generation: r.generation })
            .collect()
    }

    pub fn active_flag(&self, id: EntityId) -> bool {
        self.slot(id).map(|r| r.active).unwrap_or(false)
    }

    pub fn set_active(&mut self, id: EntityId, active: bool) {
        if let Some(r) = self.slot_mut(id) {
            r.active = active;
        }
    }

    pub fn draw_top_most_flag(&self, id: EntityId) -> bool {
        self.slot(id).map(|r| r.draw_top_most).unwrap_or(false)
    }

    pub fn set_draw_top_most(&mut self, id: EntityId, value: bool) {
        if let Some(r) = self.slot_mut(id) {
            r.draw_top_most = value;
        }
    }

    component_accessors!(position, WorldPosition, position, position_mut, set_position, remove_position);
    component_accessors!(bounding_box, BoundingBox, bounding_box, bounding_box_mut, set_bounding_box, remove_bounding_box);
    component_accessors!(orientation, Orientation, orientation, orientation_mut, set_orientation, remove_orientation);
    component_accessors!(sprite, Sprite, sprite, sprite_mut, set_sprite, remove_sprite);
    component_accessors!(animation_loop, AnimationLoop, animation_loop, animation_loop_mut, set_animation_loop, remove_animation_loop);
    component_accessors!(animation_sequence, AnimationSequence, animation_sequence, animation_sequence_mut, set_animation_sequence, remove_animation_sequence);
    component_accessors!(moving_body, MovingBody, moving_body, moving_body_mut, set_moving_body, remove_moving_body);
    component_accessors!(solid_body, SolidBody, solid_body, solid_body_mut, set_solid_body, remove_solid_body);
    component_accessors!(shootable, Shootable, shootable, shootable_mut, set_shootable, remove_shootable);
    component_accessors!(player_damaging, PlayerDamaging, player_damaging, player_damaging_mut, set_player_damaging, remove_player_damaging);
    component_accessors!(damage_inflicting, DamageInflicting, damage_inflicting, damage_inflicting_mut, set_damage_inflicting, remove_damage_inflicting);
    component_accessors!(collectable, CollectableItem, collectable, collectable_mut, set_collectable, remove_collectable);
    component_accessors!(item_container, ItemContainer, item_container, item_container_mut, set_item_container, remove_item_container);
    component_accessors!(interactable, InteractableKind, interactable, interactable_mut, set_interactable, remove_interactable);
    component_accessors!(behavior, BehaviorController, behavior, behavior_mut, set_behavior, remove_behavior);
    component_accessors!(activation, ActivationSettings, activation, activation_mut, set_activation, remove_activation);
    component_accessors!(actor_tag, ActorTagKind, actor_tag, actor_tag_mut, set_actor_tag, remove_actor_tag);
    component_accessors!(interpolate_motion, InterpolateMotion, interpolate_motion, interpolate_motion_mut, set_interpolate_motion, remove_interpolate_motion);
    component_accessors!(destruction_effects, DestructionEffects, destruction_effects, destruction_effects_mut, set_destruction_effects, remove_destruction_effects);
    component_accessors!(map_geometry_link, MapGeometryLink, map_geometry_link, map_geometry_link_mut, set_map_geometry_link, remove_map_geometry_link);
    component_accessors!(dynamic_geometry, DynamicGeometryController, dynamic_geometry, dynamic_geometry_mut, set_dynamic_geometry, remove_dynamic_geometry);
    component_accessors!(override_draw_order, OverrideDrawOrder, override_draw_order, override_draw_order_mut, set_override_draw_order, remove_override_draw_order);
    component_accessors!(auto_destroy, AutoDestroy, auto_destroy, auto_destroy_mut, set_auto_destroy, remove_auto_destroy);

    /// World-space bounding box, if both position and bounding box are
    /// present.
    pub fn world_rect(&self, id: EntityId) -> Option<WorldRect> {
        let pos = self.position(id)?;
        let bbox = self.bounding_box(id)?;
        Some(bbox.to_world_space(*pos))
    }

    /// Entities with both `MovingBody` and `WorldPosition` — the physics
    /// system's query (`spec.md §4.3`).
    pub fn with_moving_body(&self) -> Vec<EntityId> {
        self.ids()
            .into_iter()
            .filter(|id| self.moving_body(*id).is_some() && self.position(*id).is_some())
            .collect()
    }

    /// Entities with `BehaviorController` present and currently `Active`
    /// (`spec.md §4.9`).
    pub fn with_active_behavior(&self) -> Vec<EntityId> {
        self.ids()
            .into_iter()
            .filter(|id| self.behavior(*id).is_some() && self.active_flag(*id))
            .collect()
    }

    /// Entities that can be rendered (carry a `Sprite` and a position).
    pub fn with_sprite(&self) -> Vec<EntityId> {
        self.ids()
            .into_iter()
            .filter(|id| self.sprite(*id).is_some() && self.position(*id).is_some())
            .collect()
    }

    /// Entities carrying `Shootable` — the damage-infliction system's
    /// target set (`spec.md §4.5`).
    pub fn ids_with_shootable(&self) -> Vec<EntityId> {
        self.ids().into_iter().filter(|id| self.shootable(*id).is_some()).collect()
    }

    /// Entities carrying `DamageInflicting` — the damage-infliction
    /// system's source set (`spec.md §4.5`).
    pub fn ids_with_damage_source(&self) -> Vec<EntityId> {
        self.ids().into_iter().filter(|id| self.damage_inflicting(*id).is_some()).collect()
    }

    /// Entities carrying `PlayerDamaging` — contact-damage sources checked
    /// against the player entity directly, separately from `Shootable`
    /// combat (`spec.md §4.5`, the player's HP lives in `PlayerModel`, not
    /// a `Shootable` component).
    pub fn ids_with_player_damaging(&self) -> Vec<EntityId> {
        self.ids().into_iter().filter(|id| self.player_damaging(*id).is_some()).collect()
    }

    /// Entities carrying `DynamicGeometryController` — advanced once per
    /// tick regardless of `Active` (a falling section keeps ticking its
    /// delay timer even off-screen) (`spec.md §4.6`).
    pub fn ids_with_dynamic_geometry(&self) -> Vec<EntityId> {
        self.ids().into_iter().filter(|id| self.dynamic_geometry(*id).is_some()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_and_attach_roundtrip() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        store.set_position(id, WorldPosition::new(3, 4));
        assert_eq!(store.position(id), Some(&WorldPosition::new(3, 4)));
    }

    #[test]
    fn destroyed_entity_handle_is_stale() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        store.destroy(id);
        assert!(!store.is_alive(id));
        assert_eq!(store.position(id), None);
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut store = EntityStore::new();
        let first = store.spawn();
        store.destroy(first);
        let second = store.spawn();
        assert!(!store.is_alive(first));
        assert!(store.is_alive(second));
    }

    #[test]
    fn world_rect_anchors_bottom_left() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        store.set_position(id, WorldPosition::new(10, 10));
        store.set_bounding_box(id, BoundingBox::new(0, 0, 2, 3));
        let rect = store.world_rect(id).unwrap();
        assert_eq!(rect.top(), 8);
        assert_eq!(rect.bottom(), 10);
        assert_eq!(rect.left(), 10);
        assert_eq!(rect.right(), 11);
    }

    #[test]
    fn rect_intersection() {
        let a = WorldRect { x: 0, y: 0, width: 4, height: 4 };
        let b = WorldRect { x: 3, y: 3, width: 4, height: 4 };
        let c = WorldRect { x: 10, y: 10, width: 1, height: 1 };
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn queries_filter_by_component_presence() {
        let mut store = EntityStore::new();
        let a = store.spawn();
        store.set_position(a, WorldPosition::new(0, 0));
        store.set_moving_body(a, MovingBody::new(true));
        let b = store.spawn();
        store.set_position(b, WorldPosition::new(1, 1));

        let moving = store.with_moving_body();
        assert_eq!(moving, vec![a]);
    }
}
