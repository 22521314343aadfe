use crate::constants::*;
use crate::error::*;
use screeps::{Direction, Position, RoomCoordinate, RoomName};

/// World coordinates of a room. East and south are positive; `W0` is x = -1 and `N0` is y = -1.
pub fn room_world_coords(room_name: RoomName) -> BastionResult<(i32, i32)> {
    parse_room_name(&room_name.to_string())
}

pub fn parse_room_name(name: &str) -> BastionResult<(i32, i32)> {
    let invalid = || BastionError::InvalidRoomName(name.to_owned());

    let bytes = name.as_bytes();

    let horizontal = *bytes.first().ok_or_else(invalid)?;

    if !matches!(horizontal, b'W' | b'w' | b'E' | b'e') {
        return Err(invalid());
    }

    let split = bytes
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, c)| matches!(c, b'N' | b'S' | b'n' | b's'))
        .map(|(index, _)| index)
        .ok_or_else(invalid)?;

    let x = name[1..split].parse::<u32>().map_err(|_| invalid())? as i32;
    let y = name[split + 1..].parse::<u32>().map_err(|_| invalid())? as i32;

    let x = match horizontal {
        b'W' | b'w' => -x - 1,
        _ => x,
    };

    let y = match bytes[split] {
        b'N' | b'n' => -y - 1,
        _ => y,
    };

    Ok((x, y))
}

/// Cardinal exit out of `from` that leads one room closer to `to`.
///
/// The longer axis is travelled first; horizontal wins ties. A room needs no
/// exit to reach itself, which also covers the single room `sim` world.
pub fn exit_direction_toward(from: RoomName, to: RoomName) -> BastionResult<Option<Direction>> {
    if from == to {
        return Ok(None);
    }

    let (fx, fy) = room_world_coords(from)?;
    let (tx, ty) = room_world_coords(to)?;

    let dx = tx - fx;
    let dy = ty - fy;

    if dx == 0 && dy == 0 {
        return Ok(None);
    }

    let direction = if dx.abs() >= dy.abs() {
        if dx > 0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if dy > 0 {
        Direction::Bottom
    } else {
        Direction::Top
    };

    Ok(Some(direction))
}

pub fn is_exit_tile(x: u8, y: u8) -> bool {
    x == 0 || y == 0 || x == ROOM_MAX || y == ROOM_MAX
}

/// Whether a tile lies on the room edge an exit in `direction` leaves through.
pub fn is_on_exit_edge(x: u8, y: u8, direction: Direction) -> bool {
    match direction {
        Direction::Top => y == 0,
        Direction::Right => x == ROOM_MAX,
        Direction::Bottom => y == ROOM_MAX,
        Direction::Left => x == 0,
        _ => false,
    }
}

/// Single step that moves a unit standing on an exit tile back into the room.
pub fn step_off_exit(x: u8, y: u8) -> Option<Direction> {
    if x == 0 {
        Some(Direction::Right)
    } else if x == ROOM_MAX {
        Some(Direction::Left)
    } else if y == 0 {
        Some(Direction::Bottom)
    } else if y == ROOM_MAX {
        Some(Direction::Top)
    } else {
        None
    }
}

/// Position at `(x, y)` in a room, if the coordinates are on the map.
pub fn position_in_room(room_name: RoomName, x: i32, y: i32) -> Option<Position> {
    if !(0..=ROOM_MAX as i32).contains(&x) || !(0..=ROOM_MAX as i32).contains(&y) {
        return None;
    }

    let x = RoomCoordinate::new(x as u8).ok()?;
    let y = RoomCoordinate::new(y as u8).ok()?;

    Some(Position::new(x, y, room_name))
}

/// Offset a position without leaving its room.
pub fn offset_in_room(pos: Position, dx: i32, dy: i32) -> Option<Position> {
    position_in_room(pos.room_name(), pos.x().u8() as i32 + dx, pos.y().u8() as i32 + dy)
}

/// Direction of the single step from `from` to an adjacent `to`.
pub fn step_direction(from: Position, to: Position) -> Option<Direction> {
    if from.room_name() != to.room_name() || from.get_range_to(to) != 1 {
        return None;
    }

    direction_from_offset(
        to.x().u8() as i32 - from.x().u8() as i32,
        to.y().u8() as i32 - from.y().u8() as i32,
    )
}

pub fn direction_offset(direction: Direction) -> (i32, i32) {
    match direction {
        Direction::Top => (0, -1),
        Direction::TopRight => (1, -1),
        Direction::Right => (1, 0),
        Direction::BottomRight => (1, 1),
        Direction::Bottom => (0, 1),
        Direction::BottomLeft => (-1, 1),
        Direction::Left => (-1, 0),
        Direction::TopLeft => (-1, -1),
    }
}

pub fn direction_from_offset(dx: i32, dy: i32) -> Option<Direction> {
    match (dx.signum(), dy.signum()) {
        (0, -1) => Some(Direction::Top),
        (1, -1) => Some(Direction::TopRight),
        (1, 0) => Some(Direction::Right),
        (1, 1) => Some(Direction::BottomRight),
        (0, 1) => Some(Direction::Bottom),
        (-1, 1) => Some(Direction::BottomLeft),
        (-1, 0) => Some(Direction::Left),
        (-1, -1) => Some(Direction::TopLeft),
        _ => None,
    }
}
