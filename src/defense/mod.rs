//! Minimum wall placement: the smallest set of tiles that, once built on,
//! separates every protected rectangle from every room exit.

pub mod flow;
pub mod prune;
pub mod tiles;

pub use self::tiles::{Rect, TileCoord};

use self::flow::*;
use self::tiles::*;
use crate::error::*;
use crate::room::terrain::TerrainSource;
use log::*;
use screeps::RoomName;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinCutOptions {
    /// Drop cut tiles that only seal off dead-end pockets. Only applies when the
    /// bounds are smaller than the room.
    #[serde(default)]
    pub prune_dead_ends: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinCutResult {
    /// Maximum flow found; equals the unpruned cut size.
    pub value: i64,
    pub tiles: Vec<TileCoord>,
}

/// Tiles to build on so no walkable route joins a protected rectangle to the outside.
pub fn compute_min_cut(
    terrain: &dyn TerrainSource,
    room_name: RoomName,
    protected: &[Rect],
    bounds: Rect,
) -> BastionResult<Vec<TileCoord>> {
    Ok(compute_min_cut_with(terrain, room_name, protected, bounds, MinCutOptions::default())?.tiles)
}

pub fn compute_min_cut_with(
    terrain: &dyn TerrainSource,
    room_name: RoomName,
    protected: &[Rect],
    bounds: Rect,
    options: MinCutOptions,
) -> BastionResult<MinCutResult> {
    let grid = protect_areas(&classify_region(terrain, room_name, bounds), protected);

    let mut graph = FlowGraph::from_tiles(&grid);

    let flow = graph.max_flow(SOURCE_VERTEX, SINK_VERTEX)?;

    let mut tiles: Vec<TileCoord> = flow.cut_vertices.iter().map(|v| vertex_tile(*v)).collect();

    if options.prune_dead_ends && !bounds.is_whole_room() {
        let before = tiles.len();

        tiles = prune::prune_dead_ends(terrain, room_name, &tiles);

        debug!("Pruned {} dead end cut tiles in {}", before - tiles.len(), room_name);
    }

    debug!("Min cut for {}: flow {} - {} tiles", room_name, flow.value, tiles.len());

    Ok(MinCutResult { value: flow.value, tiles })
}
