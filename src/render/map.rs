//! Map tile draw-list construction: background/foreground partitioning
//! and masked-tile animation cadence (`spec.md §4.8`).
//!
//! Grounded on the teacher's `ui/renderer.rs` terrain-compose pass
//! (iterate the visible viewport, look up a cell, push a draw command),
//! generalized from ASCII `Cell`s to atlas sub-rectangles supplied by an
//! assumed resource loader (`spec.md §1`).

use crate::domain::tile::{Map, TileSet};
use crate::render::renderer::{DestRect, SrcRect, TextureId};
use crate::sim::world::Camera;

/// EGA-era tile size; also the modulus `spec.md §4.8` names for masked-tile
/// animation stepping ("modulo 4 × 8-pixel steps").
pub const TILE_SIZE_PX: i32 = 8;

/// Resolves a tile index into an atlas texture + sub-rectangle. Backed by
/// the assumed resource loader (`spec.md §1`); asset decoding itself is
/// out of scope here.
pub trait TileFrameLookup {
    fn resolve_tile(&self, tile_index: u16) -> Option<(TextureId, SrcRect)>;
}

#[derive(Clone, Copy, Debug)]
pub struct TileDrawCommand {
    pub texture: TextureId,
    pub src: SrcRect,
    pub dest: DestRect,
}

/// Builds the background pass (layer 0 plus any non-foreground layer-1
/// tile) and the foreground pass (layer-1 tiles flagged `foreground`) for
/// every cell visible in `camera`'s viewport. The foreground pass is
/// drawn after sprites, matching `GLOSSARY`'s "masked tile ... drawn
/// after solid tiles and sprites when tagged as foreground".
pub fn build_map_draw_lists(
    map: &Map,
    tileset: &TileSet,
    lookup: &dyn TileFrameLookup,
    camera: &Camera,
    anim_tick: u32,
) -> (Vec<TileDrawCommand>, Vec<TileDrawCommand>) {
    let mut background = Vec::new();
    let mut foreground = Vec::new();

    let first_col = camera.x.max(0);
    let first_row = camera.y.max(0);
    let last_col = (camera.x + camera.view_w).min(map.width as i32);
    let last_row = (camera.y + camera.view_h).min(map.height as i32);

    for row in first_row..last_row {
        for col in first_col..last_col {
            let (x, y) = (col as usize, row as usize);
            let dest = DestRect {
                x: (col - camera.x) * TILE_SIZE_PX,
                y: (row - camera.y) * TILE_SIZE_PX,
                width: TILE_SIZE_PX,
                height: TILE_SIZE_PX,
            };

            if let Some((texture, src)) = lookup.resolve_tile(map.layer0_at(x, y)) {
                background.push(TileDrawCommand { texture, src, dest });
            }

            let layer1 = map.layer1_at(x, y);
            if layer1 == 0 {
                continue;
            }
            let Some((texture, mut src)) = lookup.resolve_tile(layer1) else { continue };
            let attrs = tileset.attributes_for(layer1 as usize);
            if attrs.is_animated() {
                let cadence = if attrs.is_slow_animation() { 2 } else { 1 };
                let step = (anim_tick / cadence) % 4;
                src.x += step as i32 * TILE_SIZE_PX;
            }

            let command = TileDrawCommand { texture, src, dest };
            if attrs.is_foreground() {
                foreground.push(command);
            } else {
                background.push(command);
            }
        }
    }

    (background, foreground)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::CollisionData;

    struct FixedLookup;
    impl TileFrameLookup for FixedLookup {
        fn resolve_tile(&self, tile_index: u16) -> Option<(TextureId, SrcRect)> {
            if tile_index == 0 {
                None
            } else {
                Some((0, SrcRect { x: 0, y: 0, width: TILE_SIZE_PX, height: TILE_SIZE_PX }))
            }
        }
    }

    #[test]
    fn foreground_tiles_partition_separately_from_background() {
        let mut map = Map::new(4, 4);
        map.set_layer0(1, 1, 1);
        map.set_layer1(1, 1, 2);
        let mut attrs = vec![CollisionData::empty(); 3];
        attrs[2] = CollisionData::FOREGROUND;
        let tileset = TileSet::new(2, attrs);
        let camera = Camera::new(4, 4);

        let (background, foreground) = build_map_draw_lists(&map, &tileset, &FixedLookup, &camera, 0);
        assert_eq!(background.len(), 1);
        assert_eq!(foreground.len(), 1);
    }

    #[test]
    fn animated_tile_src_steps_with_tick() {
        let mut map = Map::new(2, 2);
        map.set_layer1(0, 0, 1);
        let mut attrs = vec![CollisionData::empty(); 2];
        attrs[1] = CollisionData::ANIMATED;
        let tileset = TileSet::new(1, attrs);
        let camera = Camera::new(2, 2);

        let (background, _) = build_map_draw_lists(&map, &tileset, &FixedLookup, &camera, 5);
        assert_eq!(background[0].src.x, (5 % 4) * TILE_SIZE_PX);
    }
}
