use crate::constants::*;
use crate::room::names::*;
use crate::room::terrain::TerrainSource;
use screeps::Direction::{
    Bottom as B, BottomLeft as BL, BottomRight as BR, Left as L, Right as R, Top as T, TopLeft as TL,
    TopRight as TR,
};
use screeps::{Direction, Position, RoomName};
use serde::{Deserialize, Serialize};

pub const QUAD_SIZE: usize = 4;

pub const FRONT_LEFT: usize = 0;
pub const FRONT_RIGHT: usize = 1;
pub const REAR_LEFT: usize = 2;
pub const REAR_RIGHT: usize = 3;

/// Cardinal direction a quad faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Facing {
    Top,
    Right,
    Bottom,
    Left,
}

impl Facing {
    pub const ALL: [Facing; 4] = [Facing::Top, Facing::Right, Facing::Bottom, Facing::Left];

    fn index(self) -> usize {
        match self {
            Facing::Top => 0,
            Facing::Right => 1,
            Facing::Bottom => 2,
            Facing::Left => 3,
        }
    }

    pub fn from_direction(direction: Direction) -> Option<Facing> {
        match direction {
            Direction::Top => Some(Facing::Top),
            Direction::Right => Some(Facing::Right),
            Direction::Bottom => Some(Facing::Bottom),
            Direction::Left => Some(Facing::Left),
            _ => None,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Facing::Top => Direction::Top,
            Facing::Right => Direction::Right,
            Facing::Bottom => Direction::Bottom,
            Facing::Left => Direction::Left,
        }
    }

    pub fn rotated(self, rotation: Rotation) -> Facing {
        let steps = match rotation {
            Rotation::Clockwise => 1,
            Rotation::TurnAround => 2,
            Rotation::CounterClockwise => 3,
        };

        Facing::ALL[(self.index() + steps) % 4]
    }

    /// Facing whose direction best matches a step of `(dx, dy)`. Vertical wins ties.
    pub fn toward(dx: i32, dy: i32) -> Option<Facing> {
        if dx == 0 && dy == 0 {
            None
        } else if dy.abs() >= dx.abs() {
            Some(if dy < 0 { Facing::Top } else { Facing::Bottom })
        } else {
            Some(if dx > 0 { Facing::Right } else { Facing::Left })
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
    TurnAround,
}

impl Rotation {
    fn index(self) -> usize {
        match self {
            Rotation::Clockwise => 0,
            Rotation::CounterClockwise => 1,
            Rotation::TurnAround => 2,
        }
    }

    /// Rotation that turns `from` into `to`, `None` when they already match.
    pub fn between(from: Facing, to: Facing) -> Option<Rotation> {
        match (to.index() + 4 - from.index()) % 4 {
            1 => Some(Rotation::Clockwise),
            2 => Some(Rotation::TurnAround),
            3 => Some(Rotation::CounterClockwise),
            _ => None,
        }
    }
}

/// Slot tiles inside the 2x2 box, relative to its top-left tile.
/// Slot order is front-left, front-right, rear-left, rear-right.
pub const QUAD_SLOT_OFFSETS: [[(i32, i32); QUAD_SIZE]; 4] = [
    // Top
    [(0, 0), (1, 0), (0, 1), (1, 1)],
    // Right
    [(1, 0), (1, 1), (0, 0), (0, 1)],
    // Bottom
    [(1, 1), (0, 1), (1, 0), (0, 0)],
    // Left
    [(0, 1), (0, 0), (1, 1), (1, 0)],
];

/// Step each slot takes to rotate the quad in place, indexed `[facing][rotation][slot]`.
/// Rotation order is clockwise, counter-clockwise, turn around.
pub const QUAD_ROTATION_MOVES: [[[Direction; QUAD_SIZE]; 3]; 4] = [
    // Top
    [[R, B, T, L], [B, L, R, T], [BR, BL, TR, TL]],
    // Right
    [[B, L, R, T], [L, T, B, R], [BL, TL, BR, TR]],
    // Bottom
    [[L, T, B, R], [T, R, L, B], [TL, TR, BL, BR]],
    // Left
    [[T, R, L, B], [R, B, T, L], [TR, BR, TL, BL]],
];

pub fn slot_offset(facing: Facing, slot: usize) -> (i32, i32) {
    QUAD_SLOT_OFFSETS[facing.index()][slot % QUAD_SIZE]
}

pub fn rotation_moves(facing: Facing, rotation: Rotation) -> [Direction; QUAD_SIZE] {
    QUAD_ROTATION_MOVES[facing.index()][rotation.index()]
}

/// Tile a slot occupies when the box's top-left tile is `anchor`.
pub fn slot_position(anchor: Position, facing: Facing, slot: usize) -> Option<Position> {
    let (dx, dy) = slot_offset(facing, slot);

    offset_in_room(anchor, dx, dy)
}

/// Top-left tile of the box given where one slot stands.
pub fn anchor_from_slot(pos: Position, facing: Facing, slot: usize) -> Option<Position> {
    let (dx, dy) = slot_offset(facing, slot);

    offset_in_room(pos, -dx, -dy)
}

/// Box tiles relative to the front-left slot.
pub fn footprint_from_front_left(facing: Facing) -> [(i32, i32); QUAD_SIZE] {
    let (fx, fy) = slot_offset(facing, FRONT_LEFT);

    let mut footprint = [(0, 0); QUAD_SIZE];

    for (slot, offset) in footprint.iter_mut().enumerate() {
        let (sx, sy) = slot_offset(facing, slot);
        *offset = (sx - fx, sy - fy);
    }

    footprint
}

/// Whether the whole box fits on open ground with its front-left slot at `(x, y)`.
pub fn is_footprint_clear(terrain: &dyn TerrainSource, room_name: RoomName, facing: Facing, x: i32, y: i32) -> bool {
    footprint_from_front_left(facing).iter().all(|(dx, dy)| {
        let (tx, ty) = (x + dx, y + dy);

        (0..=ROOM_MAX as i32).contains(&tx)
            && (0..=ROOM_MAX as i32).contains(&ty)
            && !terrain.is_wall(room_name, tx as u8, ty as u8)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::terrain::RoomTerrainGrid;
    use screeps::Terrain;

    #[test]
    fn rotation_table_matches_slot_geometry() {
        for facing in Facing::ALL {
            for rotation in [Rotation::Clockwise, Rotation::CounterClockwise, Rotation::TurnAround] {
                let target = facing.rotated(rotation);
                let moves = rotation_moves(facing, rotation);

                for slot in 0..QUAD_SIZE {
                    let (fx, fy) = slot_offset(facing, slot);
                    let (tx, ty) = slot_offset(target, slot);

                    assert_eq!(
                        direction_offset(moves[slot]),
                        (tx - fx, ty - fy),
                        "{:?} {:?} slot {}",
                        facing,
                        rotation,
                        slot
                    );
                }
            }
        }
    }

    #[test]
    fn clockwise_from_top() {
        assert_eq!(
            rotation_moves(Facing::Top, Rotation::Clockwise),
            [Direction::Right, Direction::Bottom, Direction::Top, Direction::Left]
        );
        assert_eq!(
            rotation_moves(Facing::Top, Rotation::TurnAround),
            [Direction::BottomRight, Direction::BottomLeft, Direction::TopRight, Direction::TopLeft]
        );
    }

    #[test]
    fn rotation_between_facings() {
        assert_eq!(Rotation::between(Facing::Top, Facing::Right), Some(Rotation::Clockwise));
        assert_eq!(Rotation::between(Facing::Top, Facing::Left), Some(Rotation::CounterClockwise));
        assert_eq!(Rotation::between(Facing::Left, Facing::Right), Some(Rotation::TurnAround));
        assert_eq!(Rotation::between(Facing::Bottom, Facing::Bottom), None);
    }

    #[test]
    fn footprint_respects_walls_and_edges() {
        let room_name = RoomName::new("W1N1").unwrap();
        let mut terrain = RoomTerrainGrid::open();
        terrain.set(21, 20, Terrain::Wall);

        // Facing right the front-left slot is the top-right tile of the box.
        assert_eq!(footprint_from_front_left(Facing::Right), [(0, 0), (0, 1), (-1, 0), (-1, 1)]);

        assert!(!is_footprint_clear(&terrain, room_name, Facing::Top, 20, 20));
        assert!(is_footprint_clear(&terrain, room_name, Facing::Top, 22, 20));
        assert!(!is_footprint_clear(&terrain, room_name, Facing::Right, 0, 10));
        assert!(is_footprint_clear(&terrain, room_name, Facing::Right, 1, 10));
    }
}
