/// Binary level loader, `spec.md §4.1`.
///
/// Grounded on `original_source/src/assets/level_loader.cpp` (header
/// layout, actor-triple list, composite/non-composite tile-word decoding)
/// and `original_source/src/loader/rle_compression.hpp` (masked-tile extra
/// bits, via [`crate::sim::rle`]). The teacher has no binary-format loader
/// of its own to generalize from, so the byte-level decode here follows
/// `original_source` directly rather than the teacher's idiom; only the
/// surrounding error-handling style (`RigelError::malformed`/`invariant`,
/// `Result<T>` returns, no panics on malformed input) is carried from the
/// teacher.
use crate::domain::actor_ids;
use crate::domain::containers::DynamicGeometryController;
use crate::domain::entity::{EntityId, EntityStore, MapGeometryLink, Orientation, WorldPosition};
use crate::domain::tile::{
    height_for_width, is_valid_width, BackdropScrollMode, BackdropSwitchCondition, CollisionData, Map, TileSet,
};
use crate::error::{RigelError, Result};
use crate::sim::entity_factory::{Difficulty, EntityFactory};
use crate::sim::rle;

const HEADER_NAME_FIELD_LEN: usize = 13;

/// Delay (ticks) given to a three-marker dynamic-geometry rectangle before
/// it falls, absent any per-rectangle variant data in the binary format
/// (open question, decided in `DESIGN.md`: default to the delayed-then-stay
/// variant rather than an immediate or earthquake-gated one, since the
/// marker triple carries no flag bits to pick among them).
const DYNAMIC_GEOMETRY_DEFAULT_DELAY_TICKS: u32 = 30;

/// One `(actorId, x, y)` triple from the level's actor list, before
/// preprocessing (`spec.md §4.1` step 2).
#[derive(Clone, Copy, Debug)]
struct RawActor {
    actor_id: u16,
    x: u16,
    y: u16,
}

/// Reads little-endian primitives out of a level file, tracking position
/// so truncation turns into a `MalformedResource` error rather than a panic.
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or_else(|| RigelError::malformed("unexpected end of level data"))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_u16_le(&mut self) -> Result<u16> {
        let lo = self.read_u8()? as u16;
        let hi = self.read_u8()? as u16;
        Ok(lo | (hi << 8))
    }

    fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        if self.pos + len > self.data.len() {
            return Err(RigelError::malformed("unexpected end of level data while reading name field"));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        let nul = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..nul]).into_owned())
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.pos + len > self.data.len() {
            return Err(RigelError::malformed("unexpected end of level data"));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(RigelError::malformed("seek past end of level data"));
        }
        self.pos = pos;
        Ok(())
    }
}

/// Loaded level header fields not folded directly into `Map`.
struct Header {
    data_offset: u16,
    tileset_name: String,
    backdrop_name: String,
    music_name: String,
    flags: u8,
    alternative_backdrop_number: u8,
    actor_word_count: u16,
}

fn read_header(reader: &mut ByteReader) -> Result<Header> {
    let data_offset = reader.read_u16_le()?;
    let tileset_name = reader.read_fixed_string(HEADER_NAME_FIELD_LEN)?;
    let backdrop_name = reader.read_fixed_string(HEADER_NAME_FIELD_LEN)?;
    let music_name = reader.read_fixed_string(HEADER_NAME_FIELD_LEN)?;
    let flags = reader.read_u8()?;
    let alternative_backdrop_number = reader.read_u8()?;
    let _reserved = reader.read_u16_le()?;
    let actor_word_count = reader.read_u16_le()?;
    Ok(Header {
        data_offset,
        tileset_name,
        backdrop_name,
        music_name,
        flags,
        alternative_backdrop_number,
        actor_word_count,
    })
}

/// Flag bits, named by effect rather than by position (`spec.md §4.1`).
mod header_flags {
    pub const PARALLAX_HORIZONTAL: u8 = 1 << 0;
    pub const PARALLAX_VERTICAL: u8 = 1 << 1;
    pub const AUTO_SCROLL_X: u8 = 1 << 2;
    pub const AUTO_SCROLL_Y: u8 = 1 << 3;
    pub const SWITCH_ON_TELEPORT: u8 = 1 << 4;
    pub const SWITCH_ON_REACTOR_DESTROYED: u8 = 1 << 5;
}

fn derive_scroll_mode(flags: u8) -> BackdropScrollMode {
    let parallax_h = flags & header_flags::PARALLAX_HORIZONTAL != 0;
    let parallax_v = flags & header_flags::PARALLAX_VERTICAL != 0;
    let auto_x = flags & header_flags::AUTO_SCROLL_X != 0;
    let auto_y = flags & header_flags::AUTO_SCROLL_Y != 0;
    if parallax_h && parallax_v {
        BackdropScrollMode::ParallaxBoth
    } else if parallax_h {
        BackdropScrollMode::ParallaxHorizontal
    } else if auto_y {
        BackdropScrollMode::AutoVertical
    } else if auto_x {
        BackdropScrollMode::AutoHorizontal
    } else {
        BackdropScrollMode::None
    }
}

fn derive_switch_condition(flags: u8) -> BackdropSwitchCondition {
    if flags & header_flags::SWITCH_ON_TELEPORT != 0 {
        BackdropSwitchCondition::OnTeleport
    } else if flags & header_flags::SWITCH_ON_REACTOR_DESTROYED != 0 {
        BackdropSwitchCondition::OnReactorDestroyed
    } else {
        BackdropSwitchCondition::None
    }
}

/// Decodes one composite or non-composite tile word into `(layer0, layer1)`
/// indices, given the extra 2-bit field read from the masked-tile RLE
/// stream (`spec.md §4.1` step 4).
///
/// Composite words (`w & 0x8000 != 0`) pack a solid-tile index in the low
/// 10 bits and a masked-tile index spread across bits 10..15 plus the
/// 2 out-of-band extra bits. Non-composite words store `8 * index`; indices
/// at or beyond `solid_tile_count` are remapped onto the masked-tile range
/// using the fixed 5-masked-tiles-per-solid-tile layout the source atlas
/// uses.
fn decode_tile_word(word: u16, extra_bits: u8, solid_tile_count: usize) -> (u16, u16) {
    if word & 0x8000 != 0 {
        let solid_index = word & 0x3FF;
        let masked_low = (word >> 10) & 0x1F;
        let masked_index = (masked_low as usize | ((extra_bits as usize) << 5)) + solid_tile_count;
        (solid_index, masked_index as u16)
    } else {
        let raw_index = (word / 8) as usize;
        if raw_index >= solid_tile_count {
            let remapped = (raw_index - solid_tile_count) / 5 + solid_tile_count;
            (0, remapped as u16)
        } else {
            (raw_index as u16, 0)
        }
    }
}

/// Loads a complete level from its raw on-disk bytes. `tileset` must
/// already be loaded separately (it's shared across levels); this function
/// only decodes the map grid, actor list, and backdrop metadata.
pub fn load_level(data: &[u8], tileset: &TileSet, difficulty: Difficulty) -> Result<LoadedLevel> {
    let mut reader = ByteReader::new(data);
    let header = read_header(&mut reader)?;

    let actor_triples_start = reader.pos;
    let mut raw_actors = Vec::with_capacity(header.actor_word_count as usize / 3);
    for _ in 0..header.actor_word_count / 3 {
        let actor_id = reader.read_u16_le()?;
        let x = reader.read_u16_le()?;
        let y = reader.read_u16_le()?;
        raw_actors.push(RawActor { actor_id, x, y });
    }
    let _ = actor_triples_start;

    reader.seek(header.data_offset as usize)?;
    let width = reader.read_u16_le()? as usize;
    if !is_valid_width(width) {
        return Err(RigelError::malformed(format!("level width {width} is not one of the valid widths")));
    }
    let height = height_for_width(width).ok_or_else(|| RigelError::malformed(format!("no height mapping for width {width}")))?;
    let tile_count = width * height;

    let extra_bits_byte_count = (tile_count + 3) / 4;
    let extra_bits_bytes = reader.read_bytes(extra_bits_byte_count)?.to_vec();
    let extra_bits = unpack_2bit_fields(&extra_bits_bytes, tile_count);

    let mut map = Map::new(width, height);
    for row in 0..height {
        for col in 0..width {
            let word = reader.read_u16_le()?;
            let tile_index = row * width + col;
            let (l0, l1) = decode_tile_word(word, extra_bits[tile_index], tileset.solid_tile_count);
            map.set_layer0(col, row, l0);
            map.set_layer1(col, row, l1);
        }
    }

    map.backdrop = header.backdrop_name.clone();
    map.alternative_backdrop = if header.alternative_backdrop_number > 0 {
        Some(format!("{}{}", header.backdrop_name, header.alternative_backdrop_number))
    } else {
        None
    };
    map.scroll_mode = derive_scroll_mode(header.flags);
    map.switch_condition = derive_switch_condition(header.flags);

    map.validate(tileset)?;

    for actor in &raw_actors {
        if !map.in_bounds(actor.x as i64, actor.y as i64) {
            return Err(RigelError::invariant(format!(
                "actor {} placed at out-of-bounds position ({}, {})",
                actor.actor_id, actor.x, actor.y
            )));
        }
    }

    let preprocessed = preprocess_actors(raw_actors, difficulty);

    Ok(LoadedLevel {
        map,
        player_spawn: preprocessed.player_spawn,
        actors: preprocessed.actors,
        dynamic_geometry_rects: preprocessed.dynamic_geometry_rects,
        tileset_name: header.tileset_name,
        music_name: header.music_name,
    })
}

/// Unpacks a tightly-packed 2-bit-per-tile array (LSB-first within each
/// byte) into one `u8` per tile, matching the masked-tile "extra bits"
/// stream's bit order.
fn unpack_2bit_fields(bytes: &[u8], count: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let byte = bytes.get(i / 4).copied().unwrap_or(0);
        let shift = (i % 4) * 2;
        out.push((byte >> shift) & 0b11);
    }
    out
}

pub struct LoadedLevel {
    pub map: Map,
    pub player_spawn: Option<(WorldPosition, Orientation)>,
    pub actors: Vec<(u16, WorldPosition)>,
    /// Rectangles resolved by the three-marker dynamic-geometry search
    /// (`spec.md §4.1` step 2), not tied to any actor ID of their own.
    pub dynamic_geometry_rects: Vec<MapGeometryLink>,
    pub tileset_name: String,
    pub music_name: String,
}

impl LoadedLevel {
    /// Spawns the player and every remaining actor into `store`
    /// (`spec.md §4.2`), plus one entity per resolved dynamic-geometry
    /// rectangle carrying a `MapGeometryLink` and a
    /// `DynamicGeometryController` (`spec.md §4.6`).
    pub fn instantiate(&self, store: &mut EntityStore, factory: &EntityFactory) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .actors
            .iter()
            .filter_map(|(actor_id, position)| {
                let spawned = factory.spawn(store, *actor_id, *position, Orientation::Right);
                if spawned.is_none() {
                    log::warn!("dropping unknown actor id {actor_id} at {position:?}");
                }
                spawned
            })
            .collect();

        for link in &self.dynamic_geometry_rects {
            let id = store.spawn();
            store.set_map_geometry_link(id, *link);
            store.set_dynamic_geometry(
                id,
                DynamicGeometryController::FallAfterDelayThenStay { delay_remaining: DYNAMIC_GEOMETRY_DEFAULT_DELAY_TICKS },
            );
            ids.push(id);
        }

        ids
    }
}

struct Preprocessed {
    player_spawn: Option<(WorldPosition, Orientation)>,
    actors: Vec<(u16, WorldPosition)>,
    dynamic_geometry_rects: Vec<MapGeometryLink>,
}

/// Applies the actor-list preprocessing pass (`spec.md §4.1` step 2):
/// strips difficulty markers and any actor they gate out, resolves the
/// three-marker dynamic-geometry rectangle search, and extracts the
/// player spawn point. Order among the surviving actors is preserved
/// (the source's stable "sort by resource draw index" has no resource
/// draw-index input in this retrieved format, so insertion order from the
/// level file is kept, which is itself already stable).
fn preprocess_actors(mut raw: Vec<RawActor>, difficulty: Difficulty) -> Preprocessed {
    let mut removed = vec![false; raw.len()];
    let mut player_spawn = None;
    let mut dynamic_geometry_rects = Vec::new();

    for (i, actor) in raw.iter().enumerate() {
        match actor.actor_id {
            actor_ids::PLAYER_SPAWN_FACING_LEFT | actor_ids::PLAYER_SPAWN_FACING_RIGHT => {
                let orientation = if actor.actor_id == actor_ids::PLAYER_SPAWN_FACING_LEFT {
                    Orientation::Left
                } else {
                    Orientation::Right
                };
                player_spawn = Some((WorldPosition::new(actor.x as i32, actor.y as i32), orientation));
                removed[i] = true;
            }
            actor_ids::DIFFICULTY_MARKER_MEDIUM_HARD => {
                removed[i] = true;
                if difficulty == Difficulty::Easy {
                    if let Some(gated) = raw.iter().position(|a| a.x == actor.x + 1 && a.y == actor.y) {
                        removed[gated] = true;
                    }
                }
            }
            actor_ids::DIFFICULTY_MARKER_HARD => {
                removed[i] = true;
                if difficulty != Difficulty::Hard {
                    if let Some(gated) = raw.iter().position(|a| a.x == actor.x + 1 && a.y == actor.y) {
                        removed[gated] = true;
                    }
                }
            }
            _ => {}
        }
    }

    // Dynamic-geometry marker triple search (`spec.md §4.1`): marker 1
    // anchors a row; search rightward on that row for marker 2; then
    // search downward from marker 2's column for marker 3. The rectangle
    // they bound becomes a `MapGeometryLink` carried on its own entity
    // (`spec.md §4.6`); the markers themselves are always removed from
    // the spawned actor list.
    for (i, actor) in raw.iter().enumerate() {
        if actor.actor_id == actor_ids::DYNAMIC_GEOMETRY_MARKER_1 {
            removed[i] = true;
            if let Some(j) = raw
                .iter()
                .position(|a| a.actor_id == actor_ids::DYNAMIC_GEOMETRY_MARKER_2 && a.y == actor.y && a.x > actor.x)
            {
                removed[j] = true;
                let marker2 = raw[j];
                if let Some(k) = raw
                    .iter()
                    .position(|a| a.actor_id == actor_ids::DYNAMIC_GEOMETRY_MARKER_3 && a.x == marker2.x && a.y > marker2.y)
                {
                    removed[k] = true;
                    let marker3 = raw[k];
                    dynamic_geometry_rects.push(MapGeometryLink {
                        x: actor.x as usize,
                        y: actor.y as usize,
                        width: (marker2.x - actor.x) as usize,
                        height: (marker3.y - marker2.y) as usize,
                    });
                }
            }
        }
    }

    let actors = raw
        .drain(..)
        .enumerate()
        .filter(|(i, _)| !removed[*i])
        .map(|(_, a)| (a.actor_id, WorldPosition::new(a.x as i32, a.y as i32)))
        .collect();

    Preprocessed { player_spawn, actors, dynamic_geometry_rects }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_tileset() -> TileSet {
        TileSet::new(2, vec![CollisionData::empty(), CollisionData::SOLID_TOP])
    }

    #[test]
    fn decode_non_composite_word_below_solid_count() {
        let (l0, l1) = decode_tile_word(8, 0, 4);
        assert_eq!(l0, 1);
        assert_eq!(l1, 0);
    }

    #[test]
    fn decode_non_composite_word_remaps_masked_range() {
        // raw_index = 5, solid_tile_count = 4 -> remapped = (5-4)/5 + 4 = 4
        let (l0, l1) = decode_tile_word(40, 0, 4);
        assert_eq!(l0, 0);
        assert_eq!(l1, 4);
    }

    #[test]
    fn decode_composite_word_uses_extra_bits() {
        let word = 0x8000 | 7 /* solid_index */ | (1 << 10) /* masked_low */;
        let (l0, l1) = decode_tile_word(word, 0b11, 10);
        assert_eq!(l0, 7);
        assert_eq!(l1, 10 + 1 + (0b11 << 5));
    }

    #[test]
    fn unpack_2bit_fields_reads_lsb_first() {
        let bytes = [0b1101_0010];
        let fields = unpack_2bit_fields(&bytes, 4);
        assert_eq!(fields, vec![0b10, 0b00, 0b01, 0b11]);
    }

    #[test]
    fn preprocess_extracts_player_spawn_and_removes_marker() {
        let raw = vec![RawActor { actor_id: actor_ids::PLAYER_SPAWN_FACING_RIGHT, x: 5, y: 6 }];
        let result = preprocess_actors(raw, Difficulty::Easy);
        assert_eq!(result.player_spawn, Some((WorldPosition::new(5, 6), Orientation::Right)));
        assert!(result.actors.is_empty());
    }

    #[test]
    fn preprocess_drops_medium_hard_gated_actor_on_easy() {
        let raw = vec![
            RawActor { actor_id: actor_ids::DIFFICULTY_MARKER_MEDIUM_HARD, x: 1, y: 1 },
            RawActor { actor_id: actor_ids::LASER_TURRET, x: 2, y: 1 },
        ];
        let result = preprocess_actors(raw, Difficulty::Easy);
        assert!(result.actors.is_empty());
    }

    #[test]
    fn preprocess_keeps_medium_hard_gated_actor_on_hard() {
        let raw = vec![
            RawActor { actor_id: actor_ids::DIFFICULTY_MARKER_MEDIUM_HARD, x: 1, y: 1 },
            RawActor { actor_id: actor_ids::LASER_TURRET, x: 2, y: 1 },
        ];
        let result = preprocess_actors(raw, Difficulty::Hard);
        assert_eq!(result.actors.len(), 1);
        assert_eq!(result.actors[0].0, actor_ids::LASER_TURRET);
    }

    #[test]
    fn preprocess_resolves_three_marker_dynamic_geometry_search_and_strips_markers() {
        let raw = vec![
            RawActor { actor_id: actor_ids::DYNAMIC_GEOMETRY_MARKER_1, x: 0, y: 0 },
            RawActor { actor_id: actor_ids::DYNAMIC_GEOMETRY_MARKER_2, x: 3, y: 0 },
            RawActor { actor_id: actor_ids::DYNAMIC_GEOMETRY_MARKER_3, x: 3, y: 4 },
            RawActor { actor_id: actor_ids::LASER_TURRET, x: 1, y: 1 },
        ];
        let result = preprocess_actors(raw, Difficulty::Easy);
        assert_eq!(result.actors.len(), 1);
        assert_eq!(result.actors[0].0, actor_ids::LASER_TURRET);
    }

    #[test]
    fn rejects_invalid_width() {
        // width field (40, invalid) placed right after a minimal header.
        let mut data = vec![0u8; 2 + HEADER_NAME_FIELD_LEN * 3 + 1 + 1 + 2 + 2];
        let data_offset = data.len() as u16;
        data[0..2].copy_from_slice(&data_offset.to_le_bytes());
        data.extend_from_slice(&40u16.to_le_bytes());
        let tileset = tiny_tileset();
        let result = load_level(&data, &tileset, Difficulty::Easy);
        assert!(result.is_err());
    }
}
