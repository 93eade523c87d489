/// Pure simulation domain: entity/component schema, map/tile model, and the
/// per-system logic that only needs an `EntityStore` plus the shared
/// dependency bundle — no knowledge of the level file format, the frame
/// loop, or the render/input/sound surfaces (those live under `sim` and
/// `render`).

pub mod actor_ids;
pub mod ai;
pub mod containers;
pub mod damage;
pub mod entity;
pub mod physics;
pub mod player;
pub mod tile;
