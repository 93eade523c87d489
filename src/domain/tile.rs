/// Tile map model: two-layer grid, per-tile collision attributes, and the
/// tileset atlas + attribute table those attributes are looked up from.
///
/// Grounded on the teacher's `domain/tile.rs` (tile semantics centralized
/// behind methods rather than scattered flag checks), generalized from a
/// single enum-per-cell tile to a two-layer grid of tileset indices plus a
/// separate attribute word, per `spec.md §3` and the bit layout in
/// `spec.md §6`.

use bitflags::bitflags;

bitflags! {
    /// Per-tile collision/behavior attributes, one 16-bit word per tileset
    /// entry. Bit layout fixed by `spec.md §6`.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct CollisionData: u16 {
        const SOLID_TOP       = 1 << 0;
        const SOLID_RIGHT     = 1 << 1;
        const SOLID_BOTTOM    = 1 << 2;
        const SOLID_LEFT      = 1 << 3;
        const ANIMATED        = 1 << 4;
        const FOREGROUND      = 1 << 5;
        const SLOW_ANIMATION  = 1 << 6;
        const FLAMMABLE       = 1 << 7;
        const LADDER          = 1 << 8;
        const CLIMBABLE       = 1 << 9;
        const CONVEYOR_LEFT   = 1 << 10;
        const CONVEYOR_RIGHT  = 1 << 11;
    }
}

impl CollisionData {
    #[inline]
    pub fn is_solid_top(self) -> bool {
        self.contains(CollisionData::SOLID_TOP)
    }
    #[inline]
    pub fn is_solid_right(self) -> bool {
        self.contains(CollisionData::SOLID_RIGHT)
    }
    #[inline]
    pub fn is_solid_bottom(self) -> bool {
        self.contains(CollisionData::SOLID_BOTTOM)
    }
    #[inline]
    pub fn is_solid_left(self) -> bool {
        self.contains(CollisionData::SOLID_LEFT)
    }
    #[inline]
    pub fn is_clear(self) -> bool {
        !(self.is_solid_top()
            || self.is_solid_right()
            || self.is_solid_bottom()
            || self.is_solid_left())
    }
    #[inline]
    pub fn is_any_solid(self) -> bool {
        !self.is_clear()
    }
    #[inline]
    pub fn is_climbable(self) -> bool {
        self.contains(CollisionData::CLIMBABLE)
    }
    #[inline]
    pub fn is_ladder(self) -> bool {
        self.contains(CollisionData::LADDER)
    }
    #[inline]
    pub fn is_flammable(self) -> bool {
        self.contains(CollisionData::FLAMMABLE)
    }
    #[inline]
    pub fn is_foreground(self) -> bool {
        self.contains(CollisionData::FOREGROUND)
    }
    #[inline]
    pub fn is_animated(self) -> bool {
        self.contains(CollisionData::ANIMATED)
    }
    #[inline]
    pub fn is_slow_animation(self) -> bool {
        self.contains(CollisionData::SLOW_ANIMATION)
    }
    /// `None` if the cell is no conveyor, else the belt direction.
    #[inline]
    pub fn conveyor(self) -> Option<ConveyorDirection> {
        if self.contains(CollisionData::CONVEYOR_LEFT) {
            Some(ConveyorDirection::Left)
        } else if self.contains(CollisionData::CONVEYOR_RIGHT) {
            Some(ConveyorDirection::Right)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConveyorDirection {
    Left,
    Right,
}

/// Allowed level widths; height is derived from width via this table
/// (`spec.md §3`/§4.1).
pub const VALID_WIDTHS: [usize; 6] = [32, 64, 128, 256, 512, 1024];

/// `f(width)` height lookup. The source engine's levels are all derived
/// from a fixed set of total cell budgets; we preserve the same
/// width→height pairing rather than inventing a formula.
pub fn height_for_width(width: usize) -> Option<usize> {
    match width {
        32 => Some(24),
        64 => Some(32),
        128 => Some(64),
        256 => Some(128),
        512 => Some(256),
        1024 => Some(256),
        _ => None,
    }
}

pub fn is_valid_width(width: usize) -> bool {
    VALID_WIDTHS.contains(&width)
}

/// Backdrop scroll behavior, derived from level header flag bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BackdropScrollMode {
    None,
    ParallaxBoth,
    ParallaxHorizontal,
    AutoHorizontal,
    AutoVertical,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BackdropSwitchCondition {
    None,
    OnTeleport,
    OnReactorDestroyed,
}

/// An image atlas of solid + masked tiles and a parallel attribute vector,
/// one 16-bit word per tile index (`spec.md §3`).
#[derive(Clone, Debug, Default)]
pub struct TileSet {
    pub solid_tile_count: usize,
    pub attributes: Vec<CollisionData>,
}

impl TileSet {
    pub fn new(solid_tile_count: usize, attributes: Vec<CollisionData>) -> Self {
        TileSet { solid_tile_count, attributes }
    }

    /// Attributes for a tile index, or empty (non-solid, non-special) if the
    /// index is out of range — queries never panic, callers that need a
    /// hard guarantee should validate with `InvariantViolation` at load time.
    pub fn attributes_for(&self, tile_index: usize) -> CollisionData {
        self.attributes
            .get(tile_index)
            .copied()
            .unwrap_or_default()
    }
}

/// `width × height` grid with two tile layers (`spec.md §3`):
/// layer 0 = solid/background, layer 1 = masked/foreground. 0 in layer 1
/// means "no masked tile here".
#[derive(Clone, Debug)]
pub struct Map {
    pub width: usize,
    pub height: usize,
    layer0: Vec<u16>,
    layer1: Vec<u16>,
    pub backdrop: String,
    pub alternative_backdrop: Option<String>,
    pub scroll_mode: BackdropScrollMode,
    pub switch_condition: BackdropSwitchCondition,
}

impl Map {
    pub fn new(width: usize, height: usize) -> Self {
        Map {
            width,
            height,
            layer0: vec![0; width * height],
            layer1: vec![0; width * height],
            backdrop: String::new(),
            alternative_backdrop: None,
            scroll_mode: BackdropScrollMode::None,
            switch_condition: BackdropSwitchCondition::None,
        }
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    pub fn layer0_at(&self, x: usize, y: usize) -> u16 {
        self.layer0[self.index(x, y)]
    }

    #[inline]
    pub fn layer1_at(&self, x: usize, y: usize) -> u16 {
        self.layer1[self.index(x, y)]
    }

    #[inline]
    pub fn set_layer0(&mut self, x: usize, y: usize, value: u16) {
        let i = self.index(x, y);
        self.layer0[i] = value;
    }

    #[inline]
    pub fn set_layer1(&mut self, x: usize, y: usize, value: u16) {
        let i = self.index(x, y);
        self.layer1[i] = value;
    }

    /// Combined collision attributes for a cell: layer 1 (masked/foreground)
    /// attributes override layer 0 where a masked tile is present, matching
    /// `original_source`'s `CollisionData{collisionData1, collisionData2}`
    /// composition of the two layers' attribute words (bitwise OR — either
    /// layer being solid makes the cell solid).
    pub fn collision_at(&self, tileset: &TileSet, x: usize, y: usize) -> CollisionData {
        if x >= self.width || y >= self.height {
            // `original_source/src/base/grid.hpp`'s `valueAtWithDefault`
            // returns a default (all-zero, non-solid) `CollisionData` for
            // any out-of-range cell; off-map space is open, not a wall, so
            // the player can walk or fall off the map's edges.
            return CollisionData::empty();
        }
        let a = tileset.attributes_for(self.layer0_at(x, y) as usize);
        let masked = self.layer1_at(x, y);
        if masked == 0 {
            a
        } else {
            a | tileset.attributes_for(masked as usize)
        }
    }

    /// Clears a rectangular region back to empty tiles (used by dynamic
    /// geometry when a section falls away or is destroyed).
    pub fn clear_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize) {
        for y in y0..(y0 + h).min(self.height) {
            for x in x0..(x0 + w).min(self.width) {
                self.set_layer0(x, y, 0);
                self.set_layer1(x, y, 0);
            }
        }
    }

    /// Validates the documented invariant (`spec.md §8`): every layer-0
    /// index references a valid solid tile, and every non-zero layer-1
    /// index references a valid masked tile.
    pub fn validate(&self, tileset: &TileSet) -> Result<(), crate::error::RigelError> {
        for y in 0..self.height {
            for x in 0..self.width {
                let l0 = self.layer0_at(x, y) as usize;
                if l0 >= tileset.solid_tile_count {
                    return Err(crate::error::RigelError::invariant(format!(
                        "layer0 tile {l0} at ({x},{y}) exceeds solid_tile_count {}",
                        tileset.solid_tile_count
                    )));
                }
                let l1 = self.layer1_at(x, y) as usize;
                if l1 != 0 && l1 >= tileset.attributes.len() {
                    return Err(crate::error::RigelError::invariant(format!(
                        "layer1 tile {l1} at ({x},{y}) out of tileset range"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(bits: u16) -> CollisionData {
        CollisionData::from_bits_truncate(bits)
    }

    #[test]
    fn collision_bit_layout_matches_spec() {
        let c = flags(0b0000_0000_0000_0001);
        assert!(c.is_solid_top());
        let c = flags(0b0000_0010_0000_0000);
        assert!(c.is_climbable());
        let c = flags(0b0000_0100_0000_0000);
        assert_eq!(c.conveyor(), Some(ConveyorDirection::Left));
        let c = flags(0b0000_1000_0000_0000);
        assert_eq!(c.conveyor(), Some(ConveyorDirection::Right));
    }

    #[test]
    fn valid_widths_and_heights() {
        assert!(is_valid_width(256));
        assert!(!is_valid_width(40));
        assert_eq!(height_for_width(32), Some(24));
        assert_eq!(height_for_width(40), None);
    }

    #[test]
    fn map_out_of_bounds_is_open_not_solid() {
        let map = Map::new(4, 4);
        let tileset = TileSet::new(1, vec![CollisionData::empty()]);
        let c = map.collision_at(&tileset, 10, 10);
        assert!(c.is_clear());
    }

    #[test]
    fn map_layer1_overrides_when_present() {
        let mut map = Map::new(2, 2);
        map.set_layer0(0, 0, 0);
        map.set_layer1(0, 0, 1);
        let tileset = TileSet::new(1, vec![CollisionData::empty(), CollisionData::SOLID_TOP]);
        let c = map.collision_at(&tileset, 0, 0);
        assert!(c.is_solid_top());
    }

    #[test]
    fn map_validate_rejects_out_of_range_index() {
        let mut map = Map::new(1, 1);
        map.set_layer0(0, 0, 5);
        let tileset = TileSet::new(2, vec![CollisionData::empty(), CollisionData::empty()]);
        assert!(map.validate(&tileset).is_err());
    }

    #[test]
    fn clear_rect_zeroes_both_layers() {
        let mut map = Map::new(4, 4);
        map.set_layer0(1, 1, 3);
        map.set_layer1(1, 1, 2);
        map.clear_rect(0, 0, 4, 4);
        assert_eq!(map.layer0_at(1, 1), 0);
        assert_eq!(map.layer1_at(1, 1), 0);
    }
}
