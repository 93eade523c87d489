/// Named actor IDs.
///
/// `spec.md §6` notes the full actor ID enumeration is ecosystem data not
/// specified here, but that IDs for difficulty filters, dynamic-geometry
/// markers, and player spawns (`spec.md §4.1`) must be stable. This module
/// assigns concrete `u16` values to the handful of IDs this crate's level
/// loader, AI controllers, and entity factory need to name directly;
/// everything else is looked up through the generic recipe table in
/// `sim::entity_factory` keyed by raw ID.

pub type ActorId = u16;

// Spatial meta-actors consumed entirely during level-load preprocessing
// (`spec.md §4.1`); they never reach the entity store.
pub const DIFFICULTY_MARKER_MEDIUM_HARD: ActorId = 0;
pub const DIFFICULTY_MARKER_HARD: ActorId = 1;
pub const DYNAMIC_GEOMETRY_MARKER_1: ActorId = 2;
pub const DYNAMIC_GEOMETRY_MARKER_2: ActorId = 3;
pub const DYNAMIC_GEOMETRY_MARKER_3: ActorId = 4;
pub const PLAYER_SPAWN_FACING_LEFT: ActorId = 5;
pub const PLAYER_SPAWN_FACING_RIGHT: ActorId = 6;

// AI controller actors referenced directly by `domain::ai`.
pub const LASER_TURRET: ActorId = 100;
pub const LASER_TURRET_SHOT: ActorId = 101;
pub const ROCKET_TURRET: ActorId = 102;
pub const ENEMY_ROCKET: ActorId = 103;
pub const SLIME_PIPE: ActorId = 104;
pub const SLIME_DROP: ActorId = 105;
pub const GREEN_BIRD: ActorId = 106;

// Item container / dynamic geometry actors referenced by `domain::containers`.
pub const ITEM_BOX_GREEN: ActorId = 150;
pub const ITEM_BOX_RED: ActorId = 151;
pub const ITEM_BOX_BLUE: ActorId = 152;
pub const ITEM_BOX_WHITE: ActorId = 153;
pub const NUCLEAR_WASTE_CAN: ActorId = 154;
pub const BLUE_KEY_DOOR: ActorId = 155;
pub const BONUS_GLOBE: ActorId = 156;

// NUKEM letter pickups, granted by a 6-pack soda can (`spec.md §9`: each
// one also awards a 10000-point bonus, not just on completing the set).
pub const SODA_SIX_PACK_N: ActorId = 157;
pub const SODA_SIX_PACK_U: ActorId = 158;
pub const SODA_SIX_PACK_K: ActorId = 159;
pub const SODA_SIX_PACK_E: ActorId = 160;
pub const SODA_SIX_PACK_M: ActorId = 161;

// Player projectiles.
pub const PLAYER_SHOT_NORMAL: ActorId = 200;
pub const PLAYER_SHOT_LASER: ActorId = 201;
pub const PLAYER_SHOT_FLAME: ActorId = 202;
pub const PLAYER_SHOT_ROCKET: ActorId = 203;

// Effect/debris actors.
pub const SCORE_NUMBER_FLOATER: ActorId = 250;
pub const TILE_DEBRIS: ActorId = 251;
pub const SMOKE_PUFF: ActorId = 252;
pub const EXPLOSION: ActorId = 253;
pub const BURN_FX: ActorId = 254;
