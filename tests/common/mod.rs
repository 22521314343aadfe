#![allow(dead_code)]

use screeps::{Direction, Part, Position, RoomName, Terrain};
use screeps_bastion::creep::{ActionResult, TargetId, UnitActions};
use screeps_bastion::error::*;
use screeps_bastion::room::names::{direction_offset, offset_in_room, position_in_room, room_world_coords};
use screeps_bastion::room::snapshot::*;
use screeps_bastion::room::terrain::{RoomTerrainGrid, TerrainMap, TerrainSource};
use std::collections::{HashMap, HashSet};

pub fn room(name: &str) -> RoomName {
    RoomName::new(name).unwrap()
}

pub fn pos(room_name: &str, x: u8, y: u8) -> Position {
    position_in_room(room(room_name), x as i32, y as i32).unwrap()
}

pub fn unit(name: &str, at: Position, parts: &[Part], my: bool) -> CreepSnapshot {
    CreepSnapshot {
        id: format!("id-{}", name),
        name: name.to_owned(),
        pos: at,
        hits: parts.len() as u32 * 100,
        hits_max: parts.len() as u32 * 100,
        body: parts.iter().map(|p| BodyPart::new(*p)).collect(),
        my,
    }
}

/// Open terrain for every named room.
pub fn open_rooms(names: &[&str]) -> TerrainMap {
    let mut terrain = TerrainMap::new();

    for name in names {
        terrain.insert(room(name), RoomTerrainGrid::open());
    }

    terrain
}

/// Parse a picture of a room: `#` wall, `~` swamp, anything else plain.
/// Rows beyond the picture stay plain.
pub fn terrain_from_rows(rows: &[&str]) -> RoomTerrainGrid {
    let mut grid = RoomTerrainGrid::open();

    for (y, row) in rows.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            let terrain = match c {
                '#' => Terrain::Wall,
                '~' => Terrain::Swamp,
                _ => Terrain::Plain,
            };

            grid.set(x as u8, y as u8, terrain);
        }
    }

    grid
}

/// Scripted game state. Only rooms added with `see` are visible.
#[derive(Default)]
pub struct FakeVision {
    pub time: u32,
    pub creeps: HashMap<String, CreepSnapshot>,
    pub rooms: HashMap<RoomName, RoomSnapshot>,
}

impl FakeVision {
    pub fn new(time: u32) -> FakeVision {
        FakeVision {
            time,
            ..Default::default()
        }
    }

    pub fn see(&mut self, room_name: RoomName) -> &mut RoomSnapshot {
        self.rooms.entry(room_name).or_default()
    }

    pub fn add_mine(&mut self, creep: CreepSnapshot) {
        self.see(creep.pos.room_name());
        self.creeps.insert(creep.name.clone(), creep);
    }

    pub fn add_hostile(&mut self, creep: CreepSnapshot) {
        self.see(creep.pos.room_name()).hostiles.push(creep);
    }

    pub fn kill(&mut self, name: &str) {
        self.creeps.remove(name);
    }

    pub fn move_mine(&mut self, name: &str, to: Position) {
        if let Some(creep) = self.creeps.get_mut(name) {
            creep.pos = to;
        }
    }
}

/// Room reached by crossing `(dx, dy)` room edges.
pub fn neighbor_room(room_name: RoomName, dx: i32, dy: i32) -> RoomName {
    let (x, y) = room_world_coords(room_name).unwrap();
    let (x, y) = (x + dx, y + dy);

    let horizontal = if x < 0 { format!("W{}", -x - 1) } else { format!("E{}", x) };
    let vertical = if y < 0 { format!("N{}", -y - 1) } else { format!("S{}", y) };

    room(&format!("{}{}", horizontal, vertical))
}

/// Where a unit ends up after stepping onto `pos`: exit tiles hand it over to
/// the facing edge of the next room.
fn after_edge(pos: Position) -> Position {
    let (x, y) = (pos.x().u8(), pos.y().u8());
    let room_name = pos.room_name();

    let (room_name, x, y) = match (x, y) {
        (0, _) => (neighbor_room(room_name, -1, 0), 49, y),
        (49, _) => (neighbor_room(room_name, 1, 0), 0, y),
        (_, 0) => (neighbor_room(room_name, 0, -1), x, 49),
        (_, 49) => (neighbor_room(room_name, 0, 1), x, 0),
        _ => (room_name, x, y),
    };

    position_in_room(room_name, x as i32, y as i32).unwrap()
}

impl FakeVision {
    /// Carry out issued moves. A move fails onto walls, onto a tile held by a
    /// unit that is not leaving it, or onto a tile another unit already took.
    pub fn apply_moves(&mut self, terrain: &dyn TerrainSource, moves: &[(String, Direction)]) {
        let mut stuck: HashSet<String> = HashSet::new();

        loop {
            let hostiles = self.rooms.values().flat_map(|room| room.hostiles.iter().map(|h| h.pos));

            let held: HashSet<Position> = self
                .creeps
                .values()
                .filter(|c| stuck.contains(&c.name) || !moves.iter().any(|(name, _)| *name == c.name))
                .map(|c| c.pos)
                .chain(hostiles)
                .collect();

            let mut claimed = HashSet::new();
            let mut arrivals = Vec::new();
            let mut settled = true;

            for (name, direction) in moves {
                if stuck.contains(name) {
                    continue;
                }

                let from = match self.creeps.get(name) {
                    Some(creep) => creep.pos,
                    None => continue,
                };

                let (dx, dy) = direction_offset(*direction);

                let to = offset_in_room(from, dx, dy)
                    .filter(|to| !terrain.is_wall(to.room_name(), to.x().u8(), to.y().u8()))
                    .filter(|to| !held.contains(to) && claimed.insert(*to));

                match to {
                    Some(to) => arrivals.push((name.clone(), after_edge(to))),
                    None => {
                        stuck.insert(name.clone());
                        settled = false;
                    }
                }
            }

            if settled {
                for (name, to) in arrivals {
                    self.move_mine(&name, to);
                }

                return;
            }
        }
    }
}

impl RoomVision for FakeVision {
    fn game_time(&self) -> u32 {
        self.time
    }

    fn my_creep(&self, name: &str) -> Option<CreepSnapshot> {
        self.creeps.get(name).cloned()
    }

    fn structures(&self, room_name: RoomName) -> BastionResult<Vec<StructureSnapshot>> {
        self.rooms
            .get(&room_name)
            .map(|room| room.structures.clone())
            .ok_or(BastionError::NoVision(room_name))
    }

    fn hostile_creeps(&self, room_name: RoomName) -> BastionResult<Vec<CreepSnapshot>> {
        self.rooms
            .get(&room_name)
            .map(|room| room.hostiles.clone())
            .ok_or(BastionError::NoVision(room_name))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    Attack(String),
    RangedAttack(String),
    RangedMassAttack,
    Heal(String),
    RangedHeal(String),
}

/// Accepts every action and records it per creep, in issue order. Targets
/// marked gone no longer resolve.
#[derive(Default)]
pub struct RecordingActions {
    pub log: Vec<(String, Action)>,
    pub gone: HashSet<String>,
}

impl RecordingActions {
    pub fn lose_target(&mut self, id: &str) {
        self.gone.insert(id.to_owned());
    }

    pub fn moves(&self) -> Vec<(String, Direction)> {
        self.log
            .iter()
            .filter_map(|(creep, action)| match action {
                Action::Move(direction) => Some((creep.clone(), *direction)),
                _ => None,
            })
            .collect()
    }

    pub fn for_creep(&self, name: &str) -> Vec<Action> {
        self.log
            .iter()
            .filter(|(creep, _)| creep == name)
            .map(|(_, action)| action.clone())
            .collect()
    }

    fn record(&mut self, creep: &str, action: Action) -> ActionResult {
        self.log.push((creep.to_owned(), action));

        ActionResult::Ok
    }
}

impl UnitActions for RecordingActions {
    fn target_exists(&self, target: &TargetId) -> bool {
        !self.gone.contains(&target.to_string())
    }

    fn move_direction(&mut self, creep: &str, direction: Direction) -> ActionResult {
        self.record(creep, Action::Move(direction))
    }

    fn attack(&mut self, creep: &str, target: &TargetId) -> ActionResult {
        self.record(creep, Action::Attack(target.to_string()))
    }

    fn ranged_attack(&mut self, creep: &str, target: &TargetId) -> ActionResult {
        self.record(creep, Action::RangedAttack(target.to_string()))
    }

    fn ranged_mass_attack(&mut self, creep: &str) -> ActionResult {
        self.record(creep, Action::RangedMassAttack)
    }

    fn heal(&mut self, creep: &str, target: &TargetId) -> ActionResult {
        self.record(creep, Action::Heal(target.to_string()))
    }

    fn ranged_heal(&mut self, creep: &str, target: &TargetId) -> ActionResult {
        self.record(creep, Action::RangedHeal(target.to_string()))
    }
}
