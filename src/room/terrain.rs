use crate::constants::*;
use crate::error::*;
use screeps::{RoomName, Terrain};
use std::collections::HashMap;

/// Static terrain lookup. Must answer without live room vision.
pub trait TerrainSource {
    fn terrain(&self, room_name: RoomName, x: u8, y: u8) -> Terrain;

    fn is_wall(&self, room_name: RoomName, x: u8, y: u8) -> bool {
        self.terrain(room_name, x, y) == Terrain::Wall
    }
}

/// Terrain for a single room, stored row major.
#[derive(Clone, PartialEq, Eq)]
pub struct RoomTerrainGrid {
    tiles: Box<[Terrain; ROOM_AREA]>,
}

impl std::fmt::Debug for RoomTerrainGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let walls = self.tiles.iter().filter(|t| **t == Terrain::Wall).count();

        f.debug_struct("RoomTerrainGrid").field("walls", &walls).finish()
    }
}

impl Default for RoomTerrainGrid {
    fn default() -> Self {
        Self::open()
    }
}

impl RoomTerrainGrid {
    /// A room with no walls or swamps.
    pub fn open() -> RoomTerrainGrid {
        RoomTerrainGrid {
            tiles: Box::new([Terrain::Plain; ROOM_AREA]),
        }
    }

    /// Parse the 2500 character encoding used by `Game.map.getRoomTerrain().getRawBuffer`
    /// dumps: `0` plain, `1` wall, `2` swamp, `3` wall on swamp.
    pub fn from_packed(data: &str) -> BastionResult<RoomTerrainGrid> {
        if data.len() != ROOM_AREA {
            return Err(BastionError::InvalidTerrain(format!("terrain string has {} tiles, expected {}", data.len(), ROOM_AREA)));
        }

        let mut grid = RoomTerrainGrid::open();

        for (index, c) in data.chars().enumerate() {
            grid.tiles[index] = match c {
                '0' => Terrain::Plain,
                '1' | '3' => Terrain::Wall,
                '2' => Terrain::Swamp,
                other => return Err(BastionError::InvalidTerrain(format!("unknown terrain mask '{}'", other))),
            };
        }

        Ok(grid)
    }

    /// Decode a terrain raw buffer, one mask byte per tile: bit 1 wall, bit 2 swamp.
    pub fn from_raw_buffer(buffer: &[u8]) -> BastionResult<RoomTerrainGrid> {
        if buffer.len() != ROOM_AREA {
            return Err(BastionError::InvalidTerrain(format!("terrain buffer has {} tiles, expected {}", buffer.len(), ROOM_AREA)));
        }

        let mut grid = RoomTerrainGrid::open();

        for (index, mask) in buffer.iter().enumerate() {
            grid.tiles[index] = if mask & TERRAIN_MASK_WALL != 0 {
                Terrain::Wall
            } else if mask & TERRAIN_MASK_SWAMP != 0 {
                Terrain::Swamp
            } else {
                Terrain::Plain
            };
        }

        Ok(grid)
    }

    fn index(x: u8, y: u8) -> usize {
        (y as usize) * (ROOM_WIDTH as usize) + (x as usize)
    }

    pub fn get(&self, x: u8, y: u8) -> Terrain {
        if x > ROOM_MAX || y > ROOM_MAX {
            return Terrain::Wall;
        }

        self.tiles[Self::index(x, y)]
    }

    pub fn set(&mut self, x: u8, y: u8, terrain: Terrain) {
        if x <= ROOM_MAX && y <= ROOM_MAX {
            self.tiles[Self::index(x, y)] = terrain;
        }
    }

    /// Fill an inclusive rectangle.
    pub fn fill(&mut self, x1: u8, y1: u8, x2: u8, y2: u8, terrain: Terrain) {
        for x in x1.min(x2)..=x1.max(x2) {
            for y in y1.min(y2)..=y1.max(y2) {
                self.set(x, y, terrain);
            }
        }
    }
}

/// Terrain for any number of rooms. Unknown rooms read as solid wall.
#[derive(Clone, Debug, Default)]
pub struct TerrainMap {
    rooms: HashMap<RoomName, RoomTerrainGrid>,
}

impl TerrainMap {
    pub fn new() -> TerrainMap {
        TerrainMap::default()
    }

    pub fn insert(&mut self, room_name: RoomName, grid: RoomTerrainGrid) {
        self.rooms.insert(room_name, grid);
    }

    pub fn room_mut(&mut self, room_name: RoomName) -> &mut RoomTerrainGrid {
        self.rooms.entry(room_name).or_default()
    }
}

impl TerrainSource for TerrainMap {
    fn terrain(&self, room_name: RoomName, x: u8, y: u8) -> Terrain {
        self.rooms.get(&room_name).map(|grid| grid.get(x, y)).unwrap_or(Terrain::Wall)
    }
}

impl TerrainSource for RoomTerrainGrid {
    fn terrain(&self, _room_name: RoomName, x: u8, y: u8) -> Terrain {
        self.get(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_terrain_decodes_all_masks() {
        let mut packed = "0".repeat(ROOM_AREA);
        packed.replace_range(0..4, "0123");

        let grid = RoomTerrainGrid::from_packed(&packed).unwrap();

        assert_eq!(grid.get(0, 0), Terrain::Plain);
        assert_eq!(grid.get(1, 0), Terrain::Wall);
        assert_eq!(grid.get(2, 0), Terrain::Swamp);
        assert_eq!(grid.get(3, 0), Terrain::Wall);
        assert_eq!(grid.get(60, 0), Terrain::Wall);
    }

    #[test]
    fn raw_buffer_prefers_wall_over_swamp() {
        let mut buffer = vec![0u8; ROOM_AREA];
        buffer[51] = TERRAIN_MASK_WALL;
        buffer[52] = TERRAIN_MASK_SWAMP;
        buffer[53] = TERRAIN_MASK_WALL | TERRAIN_MASK_SWAMP;

        let grid = RoomTerrainGrid::from_raw_buffer(&buffer).unwrap();

        assert_eq!(grid.get(1, 1), Terrain::Wall);
        assert_eq!(grid.get(2, 1), Terrain::Swamp);
        assert_eq!(grid.get(3, 1), Terrain::Wall);
        assert_eq!(grid.get(4, 1), Terrain::Plain);
        assert!(matches!(
            RoomTerrainGrid::from_raw_buffer(&buffer[1..]),
            Err(BastionError::InvalidTerrain(_))
        ));
    }

    #[test]
    fn malformed_terrain_strings_are_rejected() {
        assert!(matches!(RoomTerrainGrid::from_packed("000"), Err(BastionError::InvalidTerrain(_))));

        let mut packed = "0".repeat(ROOM_AREA);
        packed.replace_range(10..11, "7");

        assert_eq!(
            RoomTerrainGrid::from_packed(&packed).err(),
            Some(BastionError::InvalidTerrain("unknown terrain mask '7'".to_owned()))
        );
    }
}
