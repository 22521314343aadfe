use crate::constants::*;
use crate::error::*;
use crate::memory::*;
use crate::military::damage::*;
use crate::military::formation::*;
use crate::room::snapshot::*;
use crate::room::terrain::TerrainSource;
use log::*;
use screeps::{LocalCostMatrix, Position, RoomName, RoomXY, StructureType, Terrain};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// 50x50 grid of traversal costs, row major.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostGrid {
    costs: Vec<u8>,
}

impl std::fmt::Debug for CostGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let blocked = self.costs.iter().filter(|c| **c == COST_IMPASSABLE).count();

        f.debug_struct("CostGrid").field("blocked", &blocked).finish()
    }
}

impl CostGrid {
    pub fn filled(cost: u8) -> CostGrid {
        CostGrid {
            costs: vec![cost; ROOM_AREA],
        }
    }

    fn index(x: u8, y: u8) -> Option<usize> {
        if x > ROOM_MAX || y > ROOM_MAX {
            None
        } else {
            Some((y as usize) * (ROOM_WIDTH as usize) + (x as usize))
        }
    }

    /// Cost of a tile; anything off the room reads as impassable.
    pub fn get(&self, x: u8, y: u8) -> u8 {
        Self::index(x, y)
            .and_then(|i| self.costs.get(i))
            .copied()
            .unwrap_or(COST_IMPASSABLE)
    }

    pub fn set(&mut self, x: u8, y: u8, cost: u8) {
        if let Some(slot) = Self::index(x, y).and_then(|i| self.costs.get_mut(i)) {
            *slot = cost;
        }
    }

    pub fn is_passable(&self, x: u8, y: u8) -> bool {
        self.get(x, y) < COST_IMPASSABLE
    }

    pub fn to_local_cost_matrix(&self) -> LocalCostMatrix {
        let mut matrix = LocalCostMatrix::new();

        for x in 0..ROOM_WIDTH {
            for y in 0..ROOM_HEIGHT {
                if let Ok(xy) = RoomXY::checked_new(x, y) {
                    matrix.set(xy, self.get(x, y));
                }
            }
        }

        matrix
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixKind {
    /// Plain 1, swamp 5, wall 255.
    Terrain,
    /// Terrain with roads discounted and blocking structures impassable.
    Structures,
    /// Percentage of a full tower shot reaching each tile from hostile towers.
    TowerDamage,
    /// Terrain for the front-left slot of a quad, blocked wherever the box would not fit.
    Formation(Facing),
}

impl MatrixKind {
    pub fn key(&self) -> String {
        match self {
            MatrixKind::Terrain => "terrain".to_owned(),
            MatrixKind::Structures => "structures".to_owned(),
            MatrixKind::TowerDamage => "towers".to_owned(),
            MatrixKind::Formation(facing) => format!("formation_{}", format!("{:?}", facing).to_lowercase()),
        }
    }

    fn persist(&self) -> bool {
        !matches!(self, MatrixKind::TowerDamage)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostMatrixEntry {
    pub grid: CostGrid,
    pub expires: bool,
    pub expiration_tick: u32,
}

impl CostMatrixEntry {
    pub fn permanent(grid: CostGrid) -> CostMatrixEntry {
        CostMatrixEntry {
            grid,
            expires: false,
            expiration_tick: 0,
        }
    }

    pub fn expiring(grid: CostGrid, expiration_tick: u32) -> CostMatrixEntry {
        CostMatrixEntry {
            grid,
            expires: true,
            expiration_tick,
        }
    }

    pub fn is_valid(&self, tick: u32) -> bool {
        !self.expires || self.expiration_tick > tick
    }
}

pub trait CostMatrixStorage {
    fn get_entry(&self, kind: MatrixKind, room_name: RoomName) -> Result<Option<CostMatrixEntry>, String>;

    fn set_entry(&mut self, kind: MatrixKind, room_name: RoomName, entry: &CostMatrixEntry) -> Result<(), String>;

    fn remove_entry(&mut self, kind: MatrixKind, room_name: RoomName) -> Result<(), String>;
}

fn cost_matrix_key(kind: MatrixKind, room_name: RoomName) -> String {
    memory_path(&[COST_MATRIX_MEMORY_PREFIX, &kind.key(), &room_name.to_string()])
}

impl<T> CostMatrixStorage for T
where
    T: MemoryStore,
{
    fn get_entry(&self, kind: MatrixKind, room_name: RoomName) -> Result<Option<CostMatrixEntry>, String> {
        match self.get(&cost_matrix_key(kind, room_name)) {
            Some(raw_data) => Ok(Some(crate::serialize::decode_from_string(&raw_data)?)),
            None => Ok(None),
        }
    }

    fn set_entry(&mut self, kind: MatrixKind, room_name: RoomName, entry: &CostMatrixEntry) -> Result<(), String> {
        let encoded = crate::serialize::encode_to_string(entry)?;

        self.set(&cost_matrix_key(kind, room_name), encoded);

        Ok(())
    }

    fn remove_entry(&mut self, kind: MatrixKind, room_name: RoomName) -> Result<(), String> {
        self.remove(&cost_matrix_key(kind, room_name));

        Ok(())
    }
}

/// Everything a matrix may be built from.
pub struct MatrixSources<'a> {
    pub terrain: &'a dyn TerrainSource,
    pub snapshot: &'a TickSnapshot,
    pub storage: Option<&'a dyn CostMatrixStorage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostMatrixSettings {
    pub structure_ttl: u32,
    pub tower_ttl: u32,
}

impl Default for CostMatrixSettings {
    fn default() -> Self {
        CostMatrixSettings {
            structure_ttl: STRUCTURE_MATRIX_TTL,
            tower_ttl: TOWER_MATRIX_TTL,
        }
    }
}

/// Per room matrices, rebuilt lazily when missing or expired.
///
/// A rebuilt entry always outlives the tick it was built on, so any number of
/// readers in one tick share a single build.
pub struct CostMatrixCache {
    settings: CostMatrixSettings,
    entries: HashMap<(MatrixKind, RoomName), CostMatrixEntry>,
    dirty: HashSet<(MatrixKind, RoomName)>,
    removed: HashSet<(MatrixKind, RoomName)>,
    rebuilds: u32,
}

impl Default for CostMatrixCache {
    fn default() -> Self {
        CostMatrixCache::new(CostMatrixSettings::default())
    }
}

impl CostMatrixCache {
    pub fn new(settings: CostMatrixSettings) -> CostMatrixCache {
        CostMatrixCache {
            settings,
            entries: HashMap::new(),
            dirty: HashSet::new(),
            removed: HashSet::new(),
            rebuilds: 0,
        }
    }

    pub fn settings(&self) -> CostMatrixSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: CostMatrixSettings) {
        self.settings = settings;
    }

    /// Number of matrices built since the cache was created.
    pub fn rebuilds(&self) -> u32 {
        self.rebuilds
    }

    pub fn get(&mut self, kind: MatrixKind, room_name: RoomName, sources: &MatrixSources) -> BastionResult<&CostGrid> {
        let tick = sources.snapshot.time;
        let key = (kind, room_name);
        let allow_stored = !self.removed.contains(&key);

        let entry = match self.entries.entry(key) {
            Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();

                if !entry.is_valid(tick) {
                    let (fresh, built) = Self::load_or_build(self.settings, kind, room_name, sources, allow_stored)?;

                    if built {
                        self.rebuilds += 1;
                        self.dirty.insert(key);
                    }

                    *entry = fresh;
                }

                entry
            }
            Entry::Vacant(vacant) => {
                let (fresh, built) = Self::load_or_build(self.settings, kind, room_name, sources, allow_stored)?;

                if built {
                    self.rebuilds += 1;
                    self.dirty.insert(key);
                }

                vacant.insert(fresh)
            }
        };

        Ok(&entry.grid)
    }

    pub fn invalidate(&mut self, kind: MatrixKind, room_name: RoomName) {
        let key = (kind, room_name);

        self.entries.remove(&key);
        self.dirty.remove(&key);
        self.removed.insert(key);
    }

    /// Write every matrix built since the last flush and drop invalidated ones.
    pub fn flush_storage(&mut self, storage: &mut dyn CostMatrixStorage) -> BastionResult<()> {
        for (kind, room_name) in self.removed.drain() {
            storage.remove_entry(kind, room_name).map_err(BastionError::Memory)?;
        }

        for key in self.dirty.drain() {
            if !key.0.persist() {
                continue;
            }

            if let Some(entry) = self.entries.get(&key) {
                storage.set_entry(key.0, key.1, entry).map_err(BastionError::Memory)?;
            }
        }

        Ok(())
    }

    fn load_or_build(
        settings: CostMatrixSettings,
        kind: MatrixKind,
        room_name: RoomName,
        sources: &MatrixSources,
        allow_stored: bool,
    ) -> BastionResult<(CostMatrixEntry, bool)> {
        let tick = sources.snapshot.time;

        if allow_stored && kind.persist() {
            if let Some(storage) = sources.storage {
                match storage.get_entry(kind, room_name) {
                    Ok(Some(entry)) if entry.is_valid(tick) => return Ok((entry, false)),
                    Ok(_) => {}
                    Err(err) => debug!("Discarding stored cost matrix {} for {}: {}", kind.key(), room_name, err),
                }
            }
        }

        trace!("Building cost matrix {} for {}", kind.key(), room_name);

        let entry = match kind {
            MatrixKind::Terrain => CostMatrixEntry::permanent(terrain_grid(sources.terrain, room_name)),
            MatrixKind::Structures => {
                let room = sources.snapshot.room(room_name)?;

                CostMatrixEntry::expiring(
                    structure_grid(sources.terrain, room_name, &room.structures),
                    tick + settings.structure_ttl.max(1),
                )
            }
            MatrixKind::TowerDamage => {
                let room = sources.snapshot.room(room_name)?;
                let towers: Vec<Position> = room.hostile_towers().map(|t| t.pos).collect();

                CostMatrixEntry::expiring(tower_damage_grid(room_name, &towers), tick + settings.tower_ttl.max(1))
            }
            MatrixKind::Formation(facing) => CostMatrixEntry::permanent(formation_grid(sources.terrain, room_name, facing)),
        };

        Ok((entry, true))
    }
}

pub fn terrain_cost(terrain: Terrain) -> u8 {
    match terrain {
        Terrain::Plain => TERRAIN_COST_PLAIN,
        Terrain::Swamp => TERRAIN_COST_SWAMP,
        Terrain::Wall => COST_IMPASSABLE,
    }
}

pub fn terrain_grid(terrain: &dyn TerrainSource, room_name: RoomName) -> CostGrid {
    let mut grid = CostGrid::filled(COST_IMPASSABLE);

    for x in 0..ROOM_WIDTH {
        for y in 0..ROOM_HEIGHT {
            grid.set(x, y, terrain_cost(terrain.terrain(room_name, x, y)));
        }
    }

    grid
}

pub fn structure_grid(terrain: &dyn TerrainSource, room_name: RoomName, structures: &[StructureSnapshot]) -> CostGrid {
    let mut grid = terrain_grid(terrain, room_name);

    for structure in structures.iter().filter(|s| s.pos.room_name() == room_name) {
        let (x, y) = (structure.pos.x().u8(), structure.pos.y().u8());

        if !structure.is_passable() {
            grid.set(x, y, COST_IMPASSABLE);
        } else if structure.structure_type == StructureType::Road && grid.is_passable(x, y) {
            grid.set(x, y, COST_ROAD);
        }
    }

    grid
}

pub fn tower_damage_grid(room_name: RoomName, tower_positions: &[Position]) -> CostGrid {
    let mut grid = CostGrid::filled(0);

    if tower_positions.is_empty() {
        return grid;
    }

    for x in 0..ROOM_WIDTH {
        for y in 0..ROOM_HEIGHT {
            if let Some(pos) = crate::room::names::position_in_room(room_name, x as i32, y as i32) {
                let percent = tower_damage_percent(tower_positions, pos);

                grid.set(x, y, percent.min(COST_OVERLAY_MAX as u32) as u8);
            }
        }
    }

    grid
}

pub fn formation_grid(terrain: &dyn TerrainSource, room_name: RoomName, facing: Facing) -> CostGrid {
    let mut grid = CostGrid::filled(COST_IMPASSABLE);
    let footprint = footprint_from_front_left(facing);

    for x in 0..ROOM_WIDTH {
        for y in 0..ROOM_HEIGHT {
            if !is_footprint_clear(terrain, room_name, facing, x as i32, y as i32) {
                continue;
            }

            let cost = footprint
                .iter()
                .map(|(dx, dy)| terrain_cost(terrain.terrain(room_name, (x as i32 + dx) as u8, (y as i32 + dy) as u8)))
                .max()
                .unwrap_or(COST_IMPASSABLE);

            grid.set(x, y, cost);
        }
    }

    grid
}
