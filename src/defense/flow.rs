//! Node-split flow network over a classified room and Dinic's max-flow.
//!
//! Every open tile is a top vertex and a bottom vertex joined by a capacity 1
//! edge; cutting that edge means building on the tile. Bottom vertices link to
//! the top vertex of each open neighbor with infinite capacity. The source
//! feeds protected tiles and tiles that reach an exit drain into the sink.

use super::tiles::*;
use crate::constants::*;
use crate::error::*;
use std::collections::VecDeque;

/// Capacity sentinel for edges that may never be part of the cut.
pub const INFINITE_CAPACITY: i32 = i32::MAX;

const BOTTOM_OFFSET: usize = ROOM_AREA;

pub const SOURCE_VERTEX: usize = 2 * ROOM_AREA;
pub const SINK_VERTEX: usize = 2 * ROOM_AREA + 1;
pub const ROOM_VERTEX_COUNT: usize = 2 * ROOM_AREA + 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub to: usize,
    pub capacity: i32,
    pub flow: i32,
    /// Index of the paired edge in the adjacency list of `to`.
    pub reverse: usize,
}

impl Edge {
    pub fn residual(&self) -> i32 {
        self.capacity - self.flow
    }

    pub fn is_saturated(&self) -> bool {
        self.capacity > 0 && self.flow == self.capacity
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaxFlow {
    pub value: i64,
    /// Far ends of saturated edges leaving the source side of the cut, in discovery order.
    pub cut_vertices: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct FlowGraph {
    adjacency: Vec<Vec<Edge>>,
}

impl FlowGraph {
    pub fn new(vertex_count: usize) -> FlowGraph {
        FlowGraph {
            adjacency: vec![Vec::new(); vertex_count],
        }
    }

    /// Build the node-split network for a classified room.
    pub fn from_tiles(grid: &TileGrid) -> FlowGraph {
        let mut graph = FlowGraph::new(ROOM_VERTEX_COUNT);

        for x in 1..ROOM_MAX {
            for y in 1..ROOM_MAX {
                let top = tile_vertex(x, y);
                let bottom = top + BOTTOM_OFFSET;

                match grid.get(x, y) {
                    tile @ (TerrainTile::Normal | TerrainTile::Protected) => {
                        if tile == TerrainTile::Protected {
                            graph.add_edge(SOURCE_VERTEX, top, INFINITE_CAPACITY);
                        }

                        graph.add_edge(top, bottom, 1);

                        for neighbor in TileCoord::new(x, y).neighbors() {
                            if matches!(grid.get(neighbor.x, neighbor.y), TerrainTile::Normal | TerrainTile::ToExit) {
                                graph.add_edge(bottom, tile_vertex(neighbor.x, neighbor.y), INFINITE_CAPACITY);
                            }
                        }
                    }
                    TerrainTile::ToExit => {
                        graph.add_edge(top, SINK_VERTEX, INFINITE_CAPACITY);
                    }
                    TerrainTile::Unwalkable | TerrainTile::Exit => {}
                }
            }
        }

        graph
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edges(&self, vertex: usize) -> &[Edge] {
        self.adjacency.get(vertex).map(|e| e.as_slice()).unwrap_or(&[])
    }

    /// Add a directed edge and its zero capacity twin.
    pub fn add_edge(&mut self, from: usize, to: usize, capacity: i32) {
        let forward = self.adjacency[from].len();
        let reverse = if from == to { forward + 1 } else { self.adjacency[to].len() };

        self.adjacency[from].push(Edge {
            to,
            capacity,
            flow: 0,
            reverse,
        });

        self.adjacency[to].push(Edge {
            to: from,
            capacity: 0,
            flow: 0,
            reverse: forward,
        });
    }

    /// Run Dinic's algorithm from `source` to `sink` and report the minimum cut.
    ///
    /// Flow is left in the graph so the residual network can be inspected.
    pub fn max_flow(&mut self, source: usize, sink: usize) -> BastionResult<MaxFlow> {
        if source == sink || source >= self.vertex_count() || sink >= self.vertex_count() {
            return Err(BastionError::DegenerateFlow);
        }

        let mut levels = vec![-1; self.vertex_count()];
        let mut cursors = vec![0; self.vertex_count()];
        let mut value: i64 = 0;

        while self.build_levels(source, sink, &mut levels) {
            cursors.iter_mut().for_each(|c| *c = 0);

            loop {
                let pushed = self.augment(source, sink, &levels, &mut cursors);

                if pushed == 0 {
                    break;
                }

                value += pushed as i64;
            }
        }

        let reachable = self.residual_reachable(source);

        let cut_vertices = (0..self.vertex_count())
            .filter(|&vertex| reachable[vertex])
            .flat_map(|vertex| self.adjacency[vertex].iter())
            .filter(|edge| edge.is_saturated() && !reachable[edge.to])
            .map(|edge| edge.to)
            .collect();

        Ok(MaxFlow { value, cut_vertices })
    }

    /// Breadth first level assignment over edges with spare capacity.
    fn build_levels(&self, source: usize, sink: usize, levels: &mut [i32]) -> bool {
        levels.iter_mut().for_each(|l| *l = -1);
        levels[source] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(source);

        while let Some(vertex) = queue.pop_front() {
            for edge in &self.adjacency[vertex] {
                if levels[edge.to] < 0 && edge.residual() > 0 {
                    levels[edge.to] = levels[vertex] + 1;
                    queue.push_back(edge.to);
                }
            }
        }

        levels[sink] >= 0
    }

    /// Push flow along one level-increasing path, returning the amount pushed.
    ///
    /// Cursors persist across calls within a phase so exhausted edges are never
    /// revisited.
    fn augment(&mut self, source: usize, sink: usize, levels: &[i32], cursors: &mut [usize]) -> i32 {
        let mut path: Vec<(usize, usize)> = Vec::new();
        let mut vertex = source;

        loop {
            if vertex == sink {
                let bottleneck = path
                    .iter()
                    .map(|&(from, index)| self.adjacency[from][index].residual())
                    .min()
                    .unwrap_or(0);

                for &(from, index) in &path {
                    let edge = &mut self.adjacency[from][index];
                    edge.flow += bottleneck;

                    let (to, reverse) = (edge.to, edge.reverse);
                    self.adjacency[to][reverse].flow -= bottleneck;
                }

                return bottleneck;
            }

            let mut next = None;

            while let Some(edge) = self.adjacency[vertex].get(cursors[vertex]) {
                if edge.residual() > 0 && levels[edge.to] == levels[vertex] + 1 {
                    next = Some(edge.to);
                    break;
                }

                cursors[vertex] += 1;
            }

            match next {
                Some(to) => {
                    path.push((vertex, cursors[vertex]));
                    vertex = to;
                }
                None => match path.pop() {
                    Some((previous, _)) => {
                        cursors[previous] += 1;
                        vertex = previous;
                    }
                    None => return 0,
                },
            }
        }
    }

    fn residual_reachable(&self, source: usize) -> Vec<bool> {
        let mut reachable = vec![false; self.vertex_count()];
        reachable[source] = true;

        let mut queue = VecDeque::new();
        queue.push_back(source);

        while let Some(vertex) = queue.pop_front() {
            for edge in &self.adjacency[vertex] {
                if !reachable[edge.to] && edge.residual() > 0 {
                    reachable[edge.to] = true;
                    queue.push_back(edge.to);
                }
            }
        }

        reachable
    }
}

pub fn tile_vertex(x: u8, y: u8) -> usize {
    (y as usize) * (ROOM_WIDTH as usize) + (x as usize)
}

/// Tile a top or bottom vertex belongs to.
pub fn vertex_tile(vertex: usize) -> TileCoord {
    let index = if vertex >= BOTTOM_OFFSET { vertex - BOTTOM_OFFSET } else { vertex };
    let width = ROOM_WIDTH as usize;

    TileCoord::new((index % width) as u8, (index / width) as u8)
}
