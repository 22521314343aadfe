//! Bindings from the game environment to the bastion traits.

use crate::constants::*;
use crate::creep::*;
use crate::defense::{Rect, TileCoord};
use crate::error::*;
use crate::game_loop::*;
use crate::memory::*;
use crate::military::squad::*;
use crate::room::snapshot::{self, CreepSnapshot, RoomVision, StructureSnapshot};
use crate::room::terrain::*;
use crate::serialize::*;
use log::*;
use screeps::prelude::*;
use screeps::{
    find, game, Creep, Direction, ErrorCode, RawMemory, RawObjectId, RoomName, Structure, StructureObject, Terrain,
    MEMORY_SEGMENT_SIZE_LIMIT,
};
use std::cell::RefCell;
use std::collections::HashMap;
use uuid::Uuid;
use wasm_bindgen::JsCast;

fn creep_snapshot(creep: &Creep) -> CreepSnapshot {
    CreepSnapshot {
        id: creep.try_id().map(|id| id.to_string()).unwrap_or_default(),
        name: creep.name(),
        pos: creep.pos(),
        hits: creep.hits(),
        hits_max: creep.hits_max(),
        body: creep
            .body()
            .iter()
            .map(|p| snapshot::BodyPart {
                part: p.part(),
                hits: p.hits(),
            })
            .collect(),
        my: creep.my(),
    }
}

fn structure_snapshot(structure: &StructureObject) -> StructureSnapshot {
    StructureSnapshot {
        id: structure.as_structure().id().to_string(),
        structure_type: structure.structure_type(),
        pos: structure.pos(),
        my: structure.as_owned().map(|o| o.my()).unwrap_or(false),
    }
}

pub struct GameVision;

impl RoomVision for GameVision {
    fn game_time(&self) -> u32 {
        game::time()
    }

    fn my_creep(&self, name: &str) -> Option<CreepSnapshot> {
        game::creeps().get(name.to_owned()).map(|creep| creep_snapshot(&creep))
    }

    fn structures(&self, room_name: RoomName) -> BastionResult<Vec<StructureSnapshot>> {
        let room = game::rooms().get(room_name).ok_or(BastionError::NoVision(room_name))?;

        Ok(room.find(find::STRUCTURES, None).iter().map(structure_snapshot).collect())
    }

    fn hostile_creeps(&self, room_name: RoomName) -> BastionResult<Vec<CreepSnapshot>> {
        let room = game::rooms().get(room_name).ok_or(BastionError::NoVision(room_name))?;

        Ok(room.find(find::HOSTILE_CREEPS, None).iter().map(creep_snapshot).collect())
    }
}

enum ResolvedTarget {
    Creep(Creep),
    Structure(StructureObject),
}

fn resolve_target(target: &TargetId) -> Option<ResolvedTarget> {
    let raw: RawObjectId = target.parse().ok()?;
    let object = game::get_object_by_id_erased(&raw)?;

    if let Some(creep) = object.dyn_ref::<Creep>() {
        Some(ResolvedTarget::Creep(creep.clone()))
    } else {
        object
            .dyn_ref::<Structure>()
            .map(|structure| ResolvedTarget::Structure(StructureObject::from(structure.clone())))
    }
}

fn action_result(result: Result<(), ErrorCode>) -> ActionResult {
    match result {
        Ok(()) => ActionResult::Ok,
        Err(ErrorCode::NotInRange) => ActionResult::NotInRange,
        Err(ErrorCode::InvalidTarget) => ActionResult::InvalidTarget,
        Err(err) => ActionResult::Other(err as i32),
    }
}

pub struct GameActions;

impl GameActions {
    fn with_creep<F>(&self, name: &str, action: F) -> ActionResult
    where
        F: FnOnce(&Creep) -> ActionResult,
    {
        match game::creeps().get(name.to_owned()) {
            Some(creep) => action(&creep),
            None => ActionResult::InvalidTarget,
        }
    }
}

impl UnitActions for GameActions {
    fn target_exists(&self, target: &TargetId) -> bool {
        resolve_target(target).is_some()
    }

    fn move_direction(&mut self, creep: &str, direction: Direction) -> ActionResult {
        self.with_creep(creep, |creep| action_result(creep.move_direction(direction)))
    }

    fn attack(&mut self, creep: &str, target: &TargetId) -> ActionResult {
        self.with_creep(creep, |creep| match resolve_target(target) {
            Some(ResolvedTarget::Creep(target)) => action_result(creep.attack(&target)),
            Some(ResolvedTarget::Structure(target)) => match target.as_attackable() {
                Some(attackable) => action_result(creep.attack(attackable)),
                None => ActionResult::InvalidTarget,
            },
            None => ActionResult::InvalidTarget,
        })
    }

    fn ranged_attack(&mut self, creep: &str, target: &TargetId) -> ActionResult {
        self.with_creep(creep, |creep| match resolve_target(target) {
            Some(ResolvedTarget::Creep(target)) => action_result(creep.ranged_attack(&target)),
            Some(ResolvedTarget::Structure(target)) => match target.as_attackable() {
                Some(attackable) => action_result(creep.ranged_attack(attackable)),
                None => ActionResult::InvalidTarget,
            },
            None => ActionResult::InvalidTarget,
        })
    }

    fn ranged_mass_attack(&mut self, creep: &str) -> ActionResult {
        self.with_creep(creep, |creep| action_result(creep.ranged_mass_attack()))
    }

    fn heal(&mut self, creep: &str, target: &TargetId) -> ActionResult {
        self.with_creep(creep, |creep| match resolve_target(target) {
            Some(ResolvedTarget::Creep(target)) => action_result(creep.heal(&target)),
            _ => ActionResult::InvalidTarget,
        })
    }

    fn ranged_heal(&mut self, creep: &str, target: &TargetId) -> ActionResult {
        self.with_creep(creep, |creep| match resolve_target(target) {
            Some(ResolvedTarget::Creep(target)) => action_result(creep.ranged_heal(&target)),
            _ => ActionResult::InvalidTarget,
        })
    }
}

/// Room terrain fetched on first use and kept for the life of the VM.
#[derive(Default)]
pub struct GameTerrain {
    rooms: RefCell<HashMap<RoomName, Option<RoomTerrainGrid>>>,
}

fn fetch_terrain(room_name: RoomName) -> BastionResult<RoomTerrainGrid> {
    let terrain = game::map::get_room_terrain(room_name).ok_or(BastionError::NoVision(room_name))?;

    RoomTerrainGrid::from_raw_buffer(&terrain.get_raw_buffer().to_vec())
}

impl TerrainSource for GameTerrain {
    fn terrain(&self, room_name: RoomName, x: u8, y: u8) -> Terrain {
        let mut rooms = self.rooms.borrow_mut();

        let grid = rooms.entry(room_name).or_insert_with(|| match fetch_terrain(room_name) {
            Ok(grid) => Some(grid),
            Err(err) => {
                warn!("Terrain unavailable for {}: {}", room_name, err);
                None
            }
        });

        grid.as_ref().map(|grid| grid.get(x, y)).unwrap_or(Terrain::Wall)
    }
}

/// Key-value memory kept in one raw memory segment.
pub struct SegmentStore {
    segment: u8,
    store: InMemoryStore,
    loaded: bool,
}

impl SegmentStore {
    pub fn new(segment: u8) -> SegmentStore {
        SegmentStore {
            segment,
            store: InMemoryStore::new(),
            loaded: false,
        }
    }

    /// Read the segment once it is active. Returns false while waiting on it.
    pub fn load(&mut self) -> bool {
        if self.loaded {
            return true;
        }

        let raw: String = match RawMemory::segments().get(self.segment) {
            Some(raw) => raw.into(),
            None => return false,
        };

        if !raw.is_empty() {
            self.store = decode_from_string(&raw).unwrap_or_else(|err| {
                warn!("Discarding unreadable memory segment {}: {}", self.segment, err);
                InMemoryStore::new()
            });
        }

        self.loaded = true;

        true
    }

    pub fn flush(&self) -> BastionResult<()> {
        let encoded = encode_to_string(&self.store).map_err(BastionError::Memory)?;

        if encoded.len() > MEMORY_SEGMENT_SIZE_LIMIT as usize {
            return Err(BastionError::Memory(format!(
                "segment {} too large: {} bytes",
                self.segment,
                encoded.len()
            )));
        }

        RawMemory::segments().set(self.segment, encoded.into());

        Ok(())
    }
}

impl MemoryStore for SegmentStore {
    fn get(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        self.store.set(key, value)
    }

    fn remove(&mut self, key: &str) {
        self.store.remove(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.store.keys_with_prefix(prefix)
    }
}

struct HostState {
    bastion: Bastion,
    store: SegmentStore,
    terrain: GameTerrain,
    configured: bool,
}

impl HostState {
    fn new() -> HostState {
        HostState {
            bastion: Bastion::new(BastionConfig::default()),
            store: SegmentStore::new(BASTION_MEMORY_SEGMENT),
            terrain: GameTerrain::default(),
            configured: false,
        }
    }
}

thread_local! {
    static STATE: RefCell<Option<HostState>> = const { RefCell::new(None) };
}

fn with_state<F, R>(f: F) -> R
where
    F: FnOnce(&mut HostState) -> R,
{
    STATE.with(|state| f(state.borrow_mut().get_or_insert_with(HostState::new)))
}

pub fn tick() {
    with_state(|state| {
        RawMemory::set_active_segments(&[BASTION_MEMORY_SEGMENT]);

        if !state.store.load() {
            info!("Waiting for memory segment {}", BASTION_MEMORY_SEGMENT);
            return;
        }

        if !state.configured {
            let config = BastionConfig::load(&state.store);

            log::set_max_level(config.level_filter());

            state.bastion.apply_config(config);
            state.configured = true;
        }

        let result = state
            .bastion
            .tick(&GameVision, &state.terrain, &mut GameActions, &NeverComplete, &mut state.store);

        match result {
            Ok(report) => {
                for (operation_id, squad_id, status) in report.finished {
                    info!("Squad {} of operation {} finished: {:?}", squad_id, operation_id, status);
                }
            }
            Err(err) => error!("Bastion tick failed: {}", err),
        }

        if let Err(err) = state.store.flush() {
            error!("Failed to persist memory: {}", err);
        }
    })
}

/// Re-read `_config` from memory on the next tick.
pub fn reload_config() {
    with_state(|state| state.configured = false)
}

pub fn add_squad(kind: &str, operation_id: &str, squad_id: &str, target_room: &str) -> BastionResult<()> {
    let kind: SquadKind = kind.parse()?;
    let operation_id = Uuid::parse_str(operation_id).map_err(|err| BastionError::Memory(err.to_string()))?;
    let squad_id = Uuid::parse_str(squad_id).map_err(|err| BastionError::Memory(err.to_string()))?;
    let target_room = RoomName::new(target_room).map_err(|_| BastionError::InvalidRoomName(target_room.to_owned()))?;

    with_state(|state| {
        state
            .bastion
            .add_squad(SquadInstance::new(kind, operation_id, squad_id, target_room));
    });

    Ok(())
}

pub fn add_member(operation_id: &str, squad_id: &str, name: &str) -> Option<usize> {
    let operation_id = Uuid::parse_str(operation_id).ok()?;
    let squad_id = Uuid::parse_str(squad_id).ok()?;

    with_state(|state| state.bastion.add_member(operation_id, squad_id, name))
}

/// Wall tiles sealing `protected` off from the exits of `room_name`.
pub fn plan_walls(room_name: &str, protected: &[Rect]) -> BastionResult<Vec<TileCoord>> {
    let room_name = RoomName::new(room_name).map_err(|_| BastionError::InvalidRoomName(room_name.to_owned()))?;

    let protected = protected
        .iter()
        .map(|r| Rect::new(r.x1, r.y1, r.x2, r.y2))
        .collect::<BastionResult<Vec<_>>>()?;

    with_state(|state| {
        state
            .bastion
            .compute_min_cut(&state.terrain, room_name, &protected, Rect::whole_room())
    })
}
