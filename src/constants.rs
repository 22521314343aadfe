pub const ROOM_WIDTH: u8 = 50;
pub const ROOM_HEIGHT: u8 = 50;
pub const ROOM_AREA: usize = (ROOM_WIDTH as usize) * (ROOM_HEIGHT as usize);

/// Highest valid tile coordinate on either axis.
pub const ROOM_MAX: u8 = ROOM_WIDTH - 1;

pub const TERRAIN_MASK_WALL: u8 = 1;
pub const TERRAIN_MASK_SWAMP: u8 = 2;

pub const TERRAIN_COST_PLAIN: u8 = 1;
pub const TERRAIN_COST_SWAMP: u8 = 5;
pub const COST_ROAD: u8 = 1;
pub const COST_IMPASSABLE: u8 = 255;

/// Largest value a damage overlay may write without being read as impassable.
pub const COST_OVERLAY_MAX: u8 = 254;

pub const ATTACK_POWER: u32 = 30;
pub const RANGED_ATTACK_POWER: u32 = 10;
pub const HEAL_POWER: u32 = 12;
pub const RANGED_HEAL_POWER: u32 = 4;

/// Mass attack damage per part at range 1, 2 and 3.
pub const RANGED_MASS_ATTACK_POWER: [u32; 3] = [10, 4, 1];

pub const TOWER_POWER_ATTACK: f32 = 600.0;
pub const TOWER_POWER_ATTACK_MIN: f32 = 150.0;
pub const TOWER_OPTIMAL_RANGE: u32 = 5;
pub const TOWER_FALLOFF_RANGE: u32 = 20;

pub const MELEE_RANGE: u32 = 1;
pub const RANGED_RANGE: u32 = 3;

/// Range hostiles must be kept at when kiting.
pub const KITE_RANGE: u32 = 3;

/// Ticks a cached travel path is trusted before it is recomputed.
pub const REPATH_INTERVAL: u32 = 20;

/// Node expansions allowed for a single path search.
pub const MAX_PATH_OPS: u32 = 2000;

pub const STRUCTURE_MATRIX_TTL: u32 = 50;
pub const TOWER_MATRIX_TTL: u32 = 1;

/// Distance from the room edge at which a rally point is placed.
pub const RALLY_EDGE_SETBACK: u8 = 5;

/// Tiles scanned around the preferred rally tile before giving up.
pub const RALLY_SEARCH_RADIUS: u8 = 10;

pub const SQUAD_MEMORY_PREFIX: &str = "squads";
pub const COST_MATRIX_MEMORY_PREFIX: &str = "costmatrix";
pub const CONFIG_MEMORY_KEY: &str = "_config";

/// Raw memory segment holding the persisted key-value store.
pub const BASTION_MEMORY_SEGMENT: u8 = 55;
