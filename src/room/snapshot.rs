use crate::error::*;
use screeps::{Part, Position, RoomName, StructureType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPart {
    pub part: Part,
    pub hits: u32,
}

impl BodyPart {
    pub fn new(part: Part) -> BodyPart {
        BodyPart { part, hits: 100 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreepSnapshot {
    pub id: String,
    pub name: String,
    pub pos: Position,
    pub hits: u32,
    pub hits_max: u32,
    pub body: Vec<BodyPart>,
    pub my: bool,
}

impl CreepSnapshot {
    /// Number of parts of a type that still have hit points.
    pub fn parts(&self, part: Part) -> u32 {
        self.body.iter().filter(|p| p.part == part && p.hits > 0).count() as u32
    }

    pub fn has_part(&self, part: Part) -> bool {
        self.parts(part) > 0
    }

    pub fn is_damaged(&self) -> bool {
        self.hits < self.hits_max
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureSnapshot {
    pub id: String,
    pub structure_type: StructureType,
    pub pos: Position,
    pub my: bool,
}

impl StructureSnapshot {
    /// Whether a creep of ours can stand on this structure.
    pub fn is_passable(&self) -> bool {
        match self.structure_type {
            StructureType::Road | StructureType::Container => true,
            StructureType::Rampart => self.my,
            _ => false,
        }
    }
}

/// Live game queries. Structure and creep listings need vision of the room and
/// must report its absence rather than an empty list.
pub trait RoomVision {
    fn game_time(&self) -> u32;

    fn my_creep(&self, name: &str) -> Option<CreepSnapshot>;

    fn structures(&self, room_name: RoomName) -> BastionResult<Vec<StructureSnapshot>>;

    fn hostile_creeps(&self, room_name: RoomName) -> BastionResult<Vec<CreepSnapshot>>;
}

#[derive(Clone, Debug, Default)]
pub struct RoomSnapshot {
    pub structures: Vec<StructureSnapshot>,
    pub hostiles: Vec<CreepSnapshot>,
}

impl RoomSnapshot {
    pub fn hostile_towers(&self) -> impl Iterator<Item = &StructureSnapshot> {
        self.structures
            .iter()
            .filter(|s| s.structure_type == StructureType::Tower && !s.my)
    }

    pub fn my_towers(&self) -> impl Iterator<Item = &StructureSnapshot> {
        self.structures.iter().filter(|s| s.structure_type == StructureType::Tower && s.my)
    }

    pub fn has_my_rampart_at(&self, pos: Position) -> bool {
        self.structures
            .iter()
            .any(|s| s.pos == pos && s.my && s.structure_type == StructureType::Rampart)
    }
}

/// Read-only view of the world captured once per tick, before any squad decides.
#[derive(Clone, Debug, Default)]
pub struct TickSnapshot {
    pub time: u32,
    rooms: HashMap<RoomName, RoomSnapshot>,
    creeps: HashMap<String, CreepSnapshot>,
}

impl TickSnapshot {
    pub fn new(time: u32) -> TickSnapshot {
        TickSnapshot {
            time,
            ..Default::default()
        }
    }

    /// Capture the named creeps and every room any of them, or `extra_rooms`, touches.
    pub fn gather<'a>(
        vision: &dyn RoomVision,
        creep_names: impl IntoIterator<Item = &'a str>,
        extra_rooms: impl IntoIterator<Item = RoomName>,
    ) -> TickSnapshot {
        let mut snapshot = TickSnapshot::new(vision.game_time());

        for name in creep_names {
            if let Some(creep) = vision.my_creep(name) {
                snapshot.creeps.insert(name.to_owned(), creep);
            }
        }

        let mut rooms: Vec<RoomName> = snapshot.creeps.values().map(|c| c.pos.room_name()).collect();
        rooms.extend(extra_rooms);

        for room_name in rooms {
            if snapshot.rooms.contains_key(&room_name) {
                continue;
            }

            let structures = vision.structures(room_name);
            let hostiles = vision.hostile_creeps(room_name);

            match (structures, hostiles) {
                (Ok(structures), Ok(hostiles)) => {
                    snapshot.rooms.insert(room_name, RoomSnapshot { structures, hostiles });
                }
                (Err(err), _) | (_, Err(err)) => {
                    log::trace!("Skipping room {} in snapshot: {}", room_name, err);
                }
            }
        }

        snapshot
    }

    pub fn insert_room(&mut self, room_name: RoomName, room: RoomSnapshot) {
        self.rooms.insert(room_name, room);
    }

    pub fn insert_creep(&mut self, creep: CreepSnapshot) {
        self.creeps.insert(creep.name.clone(), creep);
    }

    pub fn room(&self, room_name: RoomName) -> BastionResult<&RoomSnapshot> {
        self.rooms.get(&room_name).ok_or(BastionError::NoVision(room_name))
    }

    pub fn has_vision(&self, room_name: RoomName) -> bool {
        self.rooms.contains_key(&room_name)
    }

    pub fn creep(&self, name: &str) -> Option<&CreepSnapshot> {
        self.creeps.get(name)
    }

    /// Hostiles in a room, empty when the room is not visible.
    pub fn hostiles(&self, room_name: RoomName) -> &[CreepSnapshot] {
        self.rooms.get(&room_name).map(|r| r.hostiles.as_slice()).unwrap_or(&[])
    }

    /// Tiles holding any creep we know of.
    pub fn occupied_tiles(&self, room_name: RoomName) -> Vec<Position> {
        self.creeps
            .values()
            .map(|c| c.pos)
            .chain(self.hostiles(room_name).iter().map(|c| c.pos))
            .filter(|pos| pos.room_name() == room_name)
            .collect()
    }
}
