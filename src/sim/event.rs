/// Domain event bus.
///
/// Grounded on the teacher's `sim/event.rs` (a flat enum drained once per
/// tick) and generalized to the platformer's event set named across
/// `spec.md §2`/`§4`. Delivery is synchronous: a system pushes events onto
/// the `Vec`, and later systems in the same tick's fixed order
/// (`spec.md §5`) observe them by draining the bus themselves.

use crate::domain::entity::EntityId;
use crate::domain::physics::CollisionFlags;

#[derive(Clone, Debug)]
pub enum GameEvent {
    /// The player fired a shot; the camera subscribes to cool down manual
    /// vertical scrolling for a few ticks (`spec.md §4.4.2`).
    PlayerFiredShot,
    /// The death sequence reached its `Finished` substate.
    PlayerDied,
    /// A transient on-screen message (weapon pickup, timing-out item, ...).
    PlayerMessage(String),
    /// A temporary item (rapid fire / cloak) expired (`spec.md §4.4.3`).
    TemporaryItemExpired { cloak: bool },
    /// A physics sweep collided with the world on the given edges.
    CollidedWithWorld { entity: EntityId, directions: CollisionFlags },
    /// HP reached zero; `killer_velocity` feeds debris/knockback effects.
    ShootableKilled { entity: EntityId, killer_velocity: (f32, f32) },
    /// Non-fatal hit, for hit-flash/feedback consumers.
    ShootableDamaged { entity: EntityId, amount: i32 },
    /// End-of-frame requests, processed in the order named in `spec.md §2`
    /// step 10.
    TeleportRequested { target: u16 },
    CheckpointReached { checkpoint_id: u16 },
    LevelExitReached,
}

/// A plain `Vec` drain buffer. Kept as a type alias rather than a wrapper
/// struct: every system already owns a `&mut Vec<GameEvent>` for the
/// duration of its call and pushes directly; nothing needs subscription
/// bookkeeping beyond FIFO order.
pub type EventBus = Vec<GameEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_preserve_push_order() {
        let mut bus: EventBus = Vec::new();
        bus.push(GameEvent::PlayerFiredShot);
        bus.push(GameEvent::PlayerDied);
        assert!(matches!(bus[0], GameEvent::PlayerFiredShot));
        assert!(matches!(bus[1], GameEvent::PlayerDied));
    }
}
