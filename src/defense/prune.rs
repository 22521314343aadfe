use super::tiles::*;
use crate::room::terrain::TerrainSource;
use screeps::RoomName;
use std::collections::HashSet;

/// Flood `ToExit` through every open tile reachable from the exits.
pub fn flood_exits(grid: &TileGrid) -> TileGrid {
    let mut flooded = grid.clone();
    let mut stack: Vec<TileCoord> = grid.tiles_of(TerrainTile::ToExit).collect();

    while let Some(tile) = stack.pop() {
        for neighbor in tile.neighbors() {
            if flooded.get(neighbor.x, neighbor.y) == TerrainTile::Normal {
                flooded.set(neighbor.x, neighbor.y, TerrainTile::ToExit);
                stack.push(neighbor);
            }
        }
    }

    flooded
}

/// Drop cut tiles that only guard pockets with no route to an exit.
///
/// A cut computed inside narrow bounds can wall off ground that is a dead end in
/// the full room. With the cut in place, any cut tile that does not touch the
/// exit-reachable region is not holding anything back.
pub fn prune_dead_ends(terrain: &dyn TerrainSource, room_name: RoomName, cut: &[TileCoord]) -> Vec<TileCoord> {
    let mut grid = classify_region(terrain, room_name, Rect::whole_room());

    for tile in cut {
        grid.set(tile.x, tile.y, TerrainTile::Unwalkable);
    }

    let flooded = flood_exits(&grid);

    let mut seen = HashSet::new();

    cut.iter()
        .copied()
        .filter(|tile| seen.insert(*tile))
        .filter(|tile| {
            tile.neighbors()
                .any(|n| flooded.get(n.x, n.y) == TerrainTile::ToExit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::terrain::RoomTerrainGrid;
    use screeps::Terrain;

    fn room() -> RoomName {
        RoomName::new("W1N1").unwrap()
    }

    #[test]
    fn flood_reaches_open_ground_only() {
        let mut terrain = RoomTerrainGrid::open();
        terrain.fill(10, 10, 14, 14, Terrain::Wall);
        terrain.fill(11, 11, 13, 13, Terrain::Plain);

        let flooded = flood_exits(&classify_region(&terrain, room(), Rect::whole_room()));

        assert_eq!(flooded.get(30, 30), TerrainTile::ToExit);
        assert_eq!(flooded.get(12, 12), TerrainTile::Normal);
        assert_eq!(flooded.get(10, 10), TerrainTile::Unwalkable);
    }

    #[test]
    fn cut_tiles_inside_closed_pockets_are_dropped() {
        let mut terrain = RoomTerrainGrid::open();
        terrain.fill(10, 10, 14, 14, Terrain::Wall);
        terrain.fill(11, 11, 13, 13, Terrain::Plain);

        let cut = vec![TileCoord::new(12, 12), TileCoord::new(30, 30), TileCoord::new(30, 30)];

        assert_eq!(prune_dead_ends(&terrain, room(), &cut), vec![TileCoord::new(30, 30)]);
    }
}
