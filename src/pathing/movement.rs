use super::costmatrix::*;
use crate::constants::*;
use crate::room::names::*;
use log::*;
use pathfinding::prelude::{build_path, dijkstra_partial};
use screeps::{Direction, Position, RoomName};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResult {
    /// Steps to take, not including the start tile.
    pub path: Vec<Position>,
    pub ops: u32,
    /// The goal was not reached; `path` leads to the closest tile explored.
    pub incomplete: bool,
}

impl PathResult {
    pub fn first_direction(&self, start: Position) -> Option<Direction> {
        self.path.first().and_then(|next| step_direction(start, *next))
    }
}

/// Single room search over a cost grid.
pub struct PathQuery<'a> {
    grid: &'a CostGrid,
    blocked: HashSet<(u8, u8)>,
    max_ops: u32,
}

impl<'a> PathQuery<'a> {
    pub fn new(grid: &'a CostGrid) -> PathQuery<'a> {
        PathQuery {
            grid,
            blocked: HashSet::new(),
            max_ops: MAX_PATH_OPS,
        }
    }

    pub fn max_ops(mut self, max_ops: u32) -> Self {
        self.max_ops = max_ops;
        self
    }

    /// Treat tiles as occupied. Positions in other rooms are ignored.
    pub fn block<I>(mut self, room_name: RoomName, positions: I) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        self.blocked.extend(
            positions
                .into_iter()
                .filter(|pos| pos.room_name() == room_name)
                .map(|pos| (pos.x().u8(), pos.y().u8())),
        );
        self
    }

    fn search<F>(&self, start: Position, allow_exits: bool, distance: F) -> PathResult
    where
        F: Fn((u8, u8)) -> u32,
    {
        let room_name = start.room_name();
        let origin = (start.x().u8(), start.y().u8());

        if distance(origin) == 0 {
            return PathResult {
                path: Vec::new(),
                ops: 0,
                incomplete: false,
            };
        }

        let mut ops = 0u32;

        let (parents, reached) = dijkstra_partial(
            &origin,
            |&(x, y)| {
                ops += 1;

                if ops > self.max_ops {
                    return Vec::new();
                }

                let mut successors = Vec::with_capacity(8);

                for direction in ALL_DIRECTIONS.iter() {
                    let (dx, dy) = direction_offset(*direction);
                    let (nx, ny) = (x as i32 + dx, y as i32 + dy);

                    if !(0..=ROOM_MAX as i32).contains(&nx) || !(0..=ROOM_MAX as i32).contains(&ny) {
                        continue;
                    }

                    let next = (nx as u8, ny as u8);

                    if self.blocked.contains(&next) || (!allow_exits && is_exit_tile(next.0, next.1)) {
                        continue;
                    }

                    let cost = self.grid.get(next.0, next.1);

                    if cost < COST_IMPASSABLE {
                        successors.push((next, cost.max(1) as u32));
                    }
                }

                successors
            },
            |node| distance(*node) == 0,
        );

        let (target, incomplete) = match reached {
            Some(target) => (target, false),
            None => {
                let best = parents
                    .iter()
                    .map(|(node, (_, cost))| (*node, *cost))
                    .chain(std::iter::once((origin, 0)))
                    .min_by_key(|(node, cost)| (distance(*node), *cost, *node))
                    .map(|(node, _)| node)
                    .unwrap_or(origin);

                debug!(
                    "Incomplete path in {} from {},{} after {} ops",
                    room_name, origin.0, origin.1, ops
                );

                (best, true)
            }
        };

        let path = if target == origin {
            Vec::new()
        } else {
            build_path(&target, &parents)
                .into_iter()
                .skip(1)
                .filter_map(|(x, y)| position_in_room(room_name, x as i32, y as i32))
                .collect()
        };

        PathResult { path, ops, incomplete }
    }
}

const ALL_DIRECTIONS: [Direction; 8] = [
    Direction::Top,
    Direction::TopRight,
    Direction::Right,
    Direction::BottomRight,
    Direction::Bottom,
    Direction::BottomLeft,
    Direction::Left,
    Direction::TopLeft,
];

fn chebyshev(a: (u8, u8), b: (u8, u8)) -> u32 {
    (a.0 as i32 - b.0 as i32).unsigned_abs().max((a.1 as i32 - b.1 as i32).unsigned_abs())
}

/// Path onto the room edge an exit in `exit` leaves through.
pub fn find_path_to_exit(start: Position, exit: Direction, query: &PathQuery) -> PathResult {
    query.search(start, true, |(x, y)| match exit {
        Direction::Top => y as u32,
        Direction::Bottom => (ROOM_MAX - y) as u32,
        Direction::Left => x as u32,
        Direction::Right => (ROOM_MAX - x) as u32,
        _ => 0,
    })
}

/// Path to any tile within `range` of `goal`. The goal must be in the start room.
pub fn find_path_to_range(start: Position, goal: Position, range: u32, query: &PathQuery) -> PathResult {
    let goal = (goal.x().u8(), goal.y().u8());

    query.search(start, false, |node| chebyshev(node, goal).saturating_sub(range))
}

/// Path to a tile at least `range` away from every threat.
pub fn find_flee_path(start: Position, threats: &[Position], range: u32, query: &PathQuery) -> PathResult {
    let threats: Vec<(u8, u8)> = threats
        .iter()
        .filter(|t| t.room_name() == start.room_name())
        .map(|t| (t.x().u8(), t.y().u8()))
        .collect();

    query.search(start, false, |node| {
        let nearest = threats.iter().map(|t| chebyshev(node, *t)).min().unwrap_or(u32::MAX);

        range.saturating_sub(nearest)
    })
}

/// A unit's cached route through one room toward its target room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelPath {
    pub target_room: RoomName,
    pub room: RoomName,
    pub steps: Vec<Position>,
    pub computed_at: u32,
}

impl TravelPath {
    pub fn new(target_room: RoomName, start: Position, result: PathResult, tick: u32) -> TravelPath {
        TravelPath {
            target_room,
            room: start.room_name(),
            steps: result.path,
            computed_at: tick,
        }
    }

    /// Next step from `current`, if it is still on the path.
    pub fn next_step(&self, current: Position) -> Option<Direction> {
        match self.steps.iter().position(|p| *p == current) {
            Some(index) => self.steps.get(index + 1).and_then(|next| step_direction(current, *next)),
            None => self.steps.first().and_then(|next| step_direction(current, *next)),
        }
    }

    /// Whether the cached route can still be followed this tick.
    pub fn is_usable(&self, current: Position, target_room: RoomName, tick: u32, repath_interval: u32) -> bool {
        self.target_room == target_room
            && self.room == current.room_name()
            && tick < self.computed_at.saturating_add(repath_interval)
            && self.next_step(current).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::terrain::RoomTerrainGrid;
    use screeps::Terrain;

    fn room() -> RoomName {
        RoomName::new("W1N1").unwrap()
    }

    fn pos(x: u8, y: u8) -> Position {
        position_in_room(room(), x as i32, y as i32).unwrap()
    }

    /// Open room with a one tile wide corridor at x = 25 running up to the top edge.
    fn corridor() -> CostGrid {
        let mut terrain = RoomTerrainGrid::open();
        terrain.fill(24, 0, 24, 10, Terrain::Wall);
        terrain.fill(26, 0, 26, 10, Terrain::Wall);

        terrain_grid(&terrain, room())
    }

    #[test]
    fn exit_path_ends_on_the_edge() {
        let grid = corridor();
        let result = find_path_to_exit(pos(25, 5), Direction::Top, &PathQuery::new(&grid));

        assert!(!result.incomplete);
        assert_eq!(result.path.len(), 5);
        assert_eq!(result.path.last().map(|p| p.y().u8()), Some(0));
        assert_eq!(result.first_direction(pos(25, 5)), Some(Direction::Top));
    }

    #[test]
    fn range_path_goes_around_walls() {
        let mut terrain = RoomTerrainGrid::open();
        terrain.fill(20, 10, 20, 30, Terrain::Wall);

        let grid = terrain_grid(&terrain, room());
        let result = find_path_to_range(pos(15, 20), pos(25, 20), 1, &PathQuery::new(&grid));

        assert!(!result.incomplete);
        assert!(result.path.iter().all(|p| p.x().u8() != 20 || !(10..=30).contains(&p.y().u8())));
        assert_eq!(result.path.last().map(|p| p.get_range_to(pos(25, 20))), Some(1));
    }

    #[test]
    fn blocked_tiles_are_avoided() {
        let grid = terrain_grid(&RoomTerrainGrid::open(), room());
        let query = PathQuery::new(&grid).block(room(), vec![pos(11, 10), pos(11, 9), pos(11, 11)]);

        let result = find_path_to_range(pos(10, 10), pos(13, 10), 0, &query);

        assert!(!result.incomplete);
        assert!(!result.path.contains(&pos(11, 10)));
        assert_eq!(result.path.last(), Some(&pos(13, 10)));
    }

    #[test]
    fn flee_reaches_safe_range() {
        let grid = terrain_grid(&RoomTerrainGrid::open(), room());
        let result = find_flee_path(pos(25, 25), &[pos(27, 25)], 3, &PathQuery::new(&grid));

        assert!(!result.incomplete);
        assert_eq!(result.path.len(), 1);
        assert_eq!(result.path[0].x().u8(), 24);
    }

    #[test]
    fn exhausted_search_is_incomplete_but_makes_progress() {
        let grid = terrain_grid(&RoomTerrainGrid::open(), room());
        let result = find_path_to_range(pos(5, 25), pos(45, 25), 1, &PathQuery::new(&grid).max_ops(20));

        assert!(result.incomplete);
        assert!(!result.path.is_empty());

        let end = result.path.last().map(|p| p.x().u8()).unwrap_or(0);
        assert!(end > 5);
    }

    #[test]
    fn travel_path_follows_and_expires() {
        let grid = corridor();
        let target = RoomName::new("W1N2").unwrap();
        let start = pos(25, 5);

        let travel = TravelPath::new(target, start, find_path_to_exit(start, Direction::Top, &PathQuery::new(&grid)), 100);

        assert_eq!(travel.next_step(start), Some(Direction::Top));
        assert_eq!(travel.next_step(pos(25, 4)), Some(Direction::Top));
        assert!(travel.is_usable(pos(25, 4), target, 110, 20));
        assert!(!travel.is_usable(pos(25, 4), target, 120, 20));
        assert!(!travel.is_usable(pos(30, 30), target, 110, 20));
        assert!(!travel.is_usable(pos(25, 4), room(), 110, 20));
    }
}
