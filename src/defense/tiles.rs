use crate::constants::*;
use crate::error::*;
use crate::room::names::is_exit_tile;
use crate::room::terrain::TerrainSource;
use itertools::iproduct;
use screeps::{RoomName, RoomXY};
use serde::{Deserialize, Serialize};

/// Neighbor offsets, clockwise from north.
pub const NEIGHBORS_8: [(i8, i8); 8] = [(0, -1), (-1, -1), (-1, 0), (-1, 1), (0, 1), (1, 1), (1, 0), (1, -1)];

/// Classification of a tile for wall placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerrainTile {
    /// Natural wall, outside the search bounds, or inside a protected rectangle.
    Unwalkable,
    Normal,
    /// Border of a protected rectangle; always behind the wall.
    Protected,
    /// Reaching this tile means reaching the outside.
    ToExit,
    /// Walkable room edge tile.
    Exit,
}

impl TerrainTile {
    pub fn is_walkable(self) -> bool {
        self != TerrainTile::Unwalkable
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u8,
    pub y: u8,
}

impl TileCoord {
    pub fn new(x: u8, y: u8) -> TileCoord {
        TileCoord { x, y }
    }

    pub fn room_xy(self) -> Option<RoomXY> {
        RoomXY::checked_new(self.x, self.y).ok()
    }

    pub fn neighbors(self) -> impl Iterator<Item = TileCoord> {
        NEIGHBORS_8.iter().filter_map(move |&(dx, dy)| {
            let x = self.x as i16 + dx as i16;
            let y = self.y as i16 + dy as i16;

            if (0..ROOM_WIDTH as i16).contains(&x) && (0..ROOM_HEIGHT as i16).contains(&y) {
                Some(TileCoord::new(x as u8, y as u8))
            } else {
                None
            }
        })
    }
}

/// Inclusive rectangle of tiles, stored with `x1 <= x2` and `y1 <= y2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x1: u8,
    pub y1: u8,
    pub x2: u8,
    pub y2: u8,
}

impl Rect {
    pub fn new(x1: u8, y1: u8, x2: u8, y2: u8) -> BastionResult<Rect> {
        if x1.max(x2) > ROOM_MAX || y1.max(y2) > ROOM_MAX {
            return Err(BastionError::InvalidBounds { x1, y1, x2, y2 });
        }

        Ok(Rect {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        })
    }

    pub fn whole_room() -> Rect {
        Rect {
            x1: 0,
            y1: 0,
            x2: ROOM_MAX,
            y2: ROOM_MAX,
        }
    }

    pub fn is_whole_room(&self) -> bool {
        *self == Rect::whole_room()
    }

    pub fn contains(&self, x: u8, y: u8) -> bool {
        (self.x1..=self.x2).contains(&x) && (self.y1..=self.y2).contains(&y)
    }

    pub fn is_border(&self, x: u8, y: u8) -> bool {
        self.contains(x, y) && (x == self.x1 || x == self.x2 || y == self.y1 || y == self.y2)
    }

    pub fn touches_room_edge(&self) -> bool {
        self.x1 == 0 || self.y1 == 0 || self.x2 == ROOM_MAX || self.y2 == ROOM_MAX
    }
}

/// Classified 50x50 room, indexed `[x][y]`.
#[derive(Clone, PartialEq, Eq)]
pub struct TileGrid {
    tiles: [[TerrainTile; ROOM_HEIGHT as usize]; ROOM_WIDTH as usize],
}

impl std::fmt::Debug for TileGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for y in 0..ROOM_HEIGHT {
            let row: String = (0..ROOM_WIDTH)
                .map(|x| match self.get(x, y) {
                    TerrainTile::Unwalkable => '#',
                    TerrainTile::Normal => '.',
                    TerrainTile::Protected => 'P',
                    TerrainTile::ToExit => 'x',
                    TerrainTile::Exit => 'E',
                })
                .collect();

            writeln!(f, "{}", row)?;
        }

        Ok(())
    }
}

impl TileGrid {
    pub fn unwalkable() -> TileGrid {
        TileGrid {
            tiles: [[TerrainTile::Unwalkable; ROOM_HEIGHT as usize]; ROOM_WIDTH as usize],
        }
    }

    pub fn get(&self, x: u8, y: u8) -> TerrainTile {
        self.tiles
            .get(x as usize)
            .and_then(|column| column.get(y as usize))
            .copied()
            .unwrap_or(TerrainTile::Unwalkable)
    }

    pub fn set(&mut self, x: u8, y: u8, tile: TerrainTile) {
        if let Some(slot) = self.tiles.get_mut(x as usize).and_then(|column| column.get_mut(y as usize)) {
            *slot = tile;
        }
    }

    pub fn count(&self, tile: TerrainTile) -> usize {
        self.tiles.iter().flatten().filter(|t| **t == tile).count()
    }

    pub fn tiles_of(&self, tile: TerrainTile) -> impl Iterator<Item = TileCoord> + '_ {
        iproduct!(0..ROOM_WIDTH, 0..ROOM_HEIGHT)
            .map(|(x, y)| TileCoord::new(x, y))
            .filter(move |c| self.get(c.x, c.y) == tile)
    }
}

/// Classify every tile of a room inside `bounds` for wall placement.
///
/// Walkable room edge tiles become exits, the rest of the bounds border becomes
/// the sink ring. When the bounds reach the room edge the exits are folded into
/// the ring one tile inward.
pub fn classify_region(terrain: &dyn TerrainSource, room_name: RoomName, bounds: Rect) -> TileGrid {
    let mut grid = TileGrid::unwalkable();

    for x in bounds.x1..=bounds.x2 {
        for y in bounds.y1..=bounds.y2 {
            if terrain.is_wall(room_name, x, y) {
                continue;
            }

            let tile = if is_exit_tile(x, y) {
                TerrainTile::Exit
            } else if bounds.is_border(x, y) {
                TerrainTile::ToExit
            } else {
                TerrainTile::Normal
            };

            grid.set(x, y, tile);
        }
    }

    if bounds.touches_room_edge() {
        mark_exits(&grid)
    } else {
        grid
    }
}

/// Promote walkable tiles next to an exit to `ToExit`, then drop the room border.
pub fn mark_exits(grid: &TileGrid) -> TileGrid {
    let mut marked = grid.clone();

    let near_exit = |edge: (u8, u8), offsets: [(i16, i16); 3]| {
        offsets.iter().any(|&(dx, dy)| {
            let x = edge.0 as i16 + dx;
            let y = edge.1 as i16 + dy;

            x >= 0 && y >= 0 && grid.get(x as u8, y as u8) == TerrainTile::Exit
        })
    };

    let vertical = [(0, -1), (0, 0), (0, 1)];
    let horizontal = [(-1, 0), (0, 0), (1, 0)];

    for i in 1..ROOM_MAX {
        let candidates = [
            ((1, i), (0, i), vertical),
            ((ROOM_MAX - 1, i), (ROOM_MAX, i), vertical),
            ((i, 1), (i, 0), horizontal),
            ((i, ROOM_MAX - 1), (i, ROOM_MAX), horizontal),
        ];

        for ((x, y), edge, offsets) in candidates {
            if grid.get(x, y).is_walkable() && near_exit(edge, offsets) {
                marked.set(x, y, TerrainTile::ToExit);
            }
        }
    }

    for i in 0..=ROOM_MAX {
        marked.set(0, i, TerrainTile::Unwalkable);
        marked.set(ROOM_MAX, i, TerrainTile::Unwalkable);
        marked.set(i, 0, TerrainTile::Unwalkable);
        marked.set(i, ROOM_MAX, TerrainTile::Unwalkable);
    }

    marked
}

/// Mark protected rectangles: open border tiles become sources, interiors are removed.
pub fn protect_areas(grid: &TileGrid, protected: &[Rect]) -> TileGrid {
    let mut marked = grid.clone();

    for rect in protected {
        for x in rect.x1..=rect.x2 {
            for y in rect.y1..=rect.y2 {
                if rect.is_border(x, y) {
                    if marked.get(x, y) == TerrainTile::Normal {
                        marked.set(x, y, TerrainTile::Protected);
                    }
                } else {
                    marked.set(x, y, TerrainTile::Unwalkable);
                }
            }
        }
    }

    marked
}
