use crate::constants::*;
use crate::creep::UnitActions;
use crate::defense::{self, Rect, TileCoord};
use crate::error::*;
use crate::logging;
use crate::memory::*;
use crate::military::combat::CombatSettings;
use crate::military::squad::*;
use crate::military::squadmemory::*;
use crate::military::squadsystem::*;
use crate::pathing::costmatrix::*;
use crate::room::snapshot::*;
use crate::room::terrain::TerrainSource;
use log::*;
use screeps::RoomName;
use serde::{Deserialize, Serialize};
use specs::prelude::*;
use std::collections::HashSet;
use uuid::Uuid;

pub use crate::military::squadsystem::{NeverComplete, OperationStatus};

/// Runtime settings, read as JSON from the `_config` memory key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BastionConfig {
    pub log_level: String,
    pub structure_matrix_ttl: u32,
    pub tower_matrix_ttl: u32,
    pub repath_interval: u32,
    pub max_path_ops: u32,
    pub persist_cost_matrices: bool,
}

impl Default for BastionConfig {
    fn default() -> Self {
        BastionConfig {
            log_level: "info".to_owned(),
            structure_matrix_ttl: STRUCTURE_MATRIX_TTL,
            tower_matrix_ttl: TOWER_MATRIX_TTL,
            repath_interval: REPATH_INTERVAL,
            max_path_ops: MAX_PATH_OPS,
            persist_cost_matrices: true,
        }
    }
}

impl BastionConfig {
    pub fn load(store: &dyn MemoryStore) -> BastionConfig {
        match store.get(CONFIG_MEMORY_KEY) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("Ignoring malformed config: {}", err);
                BastionConfig::default()
            }),
            None => BastionConfig::default(),
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        logging::parse_level(&self.log_level)
    }

    pub fn cost_matrix_settings(&self) -> CostMatrixSettings {
        CostMatrixSettings {
            structure_ttl: self.structure_matrix_ttl,
            tower_ttl: self.tower_matrix_ttl,
        }
    }

    pub fn combat_settings(&self) -> CombatSettings {
        CombatSettings {
            repath_interval: self.repath_interval,
            max_path_ops: self.max_path_ops,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub squads_run: usize,
    pub actions_accepted: usize,
    pub failed: Vec<Uuid>,
    /// Squads torn down this tick as `(operation, squad, final status)`.
    pub finished: Vec<(Uuid, Uuid, SquadStatus)>,
}

/// Central controller: owns the squad world and the cost matrix cache.
pub struct Bastion {
    world: World,
    cost_matrices: CostMatrixCache,
    config: BastionConfig,
    loaded: bool,
}

impl Bastion {
    pub fn new(config: BastionConfig) -> Bastion {
        let mut world = World::new();

        world.register::<SquadInstance>();

        Bastion {
            world,
            cost_matrices: CostMatrixCache::new(config.cost_matrix_settings()),
            config,
            loaded: false,
        }
    }

    pub fn config(&self) -> &BastionConfig {
        &self.config
    }

    pub fn apply_config(&mut self, config: BastionConfig) {
        self.cost_matrices.set_settings(config.cost_matrix_settings());
        self.config = config;
    }

    pub fn compute_min_cut(
        &self,
        terrain: &dyn TerrainSource,
        room_name: RoomName,
        protected: &[Rect],
        bounds: Rect,
    ) -> BastionResult<Vec<TileCoord>> {
        defense::compute_min_cut(terrain, room_name, protected, bounds)
    }

    /// Cached matrix for `kind` in `room_name`. With persistence on, a still valid
    /// copy in `store` is used before rebuilding.
    pub fn cost_matrix<S>(
        &mut self,
        kind: MatrixKind,
        room_name: RoomName,
        terrain: &dyn TerrainSource,
        snapshot: &TickSnapshot,
        store: &S,
    ) -> BastionResult<&CostGrid>
    where
        S: MemoryStore,
    {
        let storage: Option<&dyn CostMatrixStorage> = if self.config.persist_cost_matrices {
            Some(store)
        } else {
            None
        };

        let sources = MatrixSources {
            terrain,
            snapshot,
            storage,
        };

        self.cost_matrices.get(kind, room_name, &sources)
    }

    pub fn invalidate_cost_matrix(&mut self, kind: MatrixKind, room_name: RoomName) {
        self.cost_matrices.invalidate(kind, room_name);
    }

    pub fn add_squad(&mut self, squad: SquadInstance) -> Entity {
        info!("Adding {:?} squad {} for operation {}", squad.kind, squad.squad_id, squad.operation_id);

        self.world.create_entity().with(squad).build()
    }

    pub fn add_member(&mut self, operation_id: Uuid, squad_id: Uuid, name: &str) -> Option<usize> {
        let mut squads = self.world.write_storage::<SquadInstance>();

        let slot = (&mut squads)
            .join()
            .find(|squad| squad.operation_id == operation_id && squad.squad_id == squad_id)
            .and_then(|squad| squad.add_member(name));

        slot
    }

    pub fn squads(&self) -> Vec<SquadInstance> {
        let squads = self.world.read_storage::<SquadInstance>();

        let all: Vec<SquadInstance> = (&squads).join().cloned().collect();

        all
    }

    pub fn squad(&self, operation_id: Uuid, squad_id: Uuid) -> Option<SquadInstance> {
        self.squads()
            .into_iter()
            .find(|squad| squad.operation_id == operation_id && squad.squad_id == squad_id)
    }

    fn load_from_store(&mut self, store: &mut dyn MemoryStore) {
        let existing: HashSet<(Uuid, Uuid)> = self.squads().iter().map(|s| (s.operation_id, s.squad_id)).collect();

        let mut loaded = 0;

        for squad in load_squads(store) {
            if !existing.contains(&(squad.operation_id, squad.squad_id)) {
                self.world.create_entity().with(squad).build();
                loaded += 1;
            }
        }

        info!("Loaded {} squads from memory", loaded);

        self.loaded = true;
    }

    /// Run every squad for one tick and write the surviving state back to `store`.
    pub fn tick<S>(
        &mut self,
        vision: &dyn RoomVision,
        terrain: &dyn TerrainSource,
        actions: &mut dyn UnitActions,
        operations: &dyn OperationStatus,
        store: &mut S,
    ) -> BastionResult<TickReport>
    where
        S: MemoryStore,
    {
        if !self.loaded {
            self.load_from_store(&mut *store);
        }

        let (creep_names, rooms) = {
            let squads = self.world.read_storage::<SquadInstance>();

            let mut names = Vec::new();
            let mut rooms = Vec::new();

            for squad in (&squads).join() {
                names.extend(squad.members.iter().map(|m| m.name.clone()));
                rooms.push(squad.target_room);
                rooms.extend(squad.rally_position.map(|p| p.room_name()));
            }

            (names, rooms)
        };

        let snapshot = TickSnapshot::gather(vision, creep_names.iter().map(|n| n.as_str()), rooms);

        let outcomes = {
            let storage: Option<&dyn CostMatrixStorage> = if self.config.persist_cost_matrices {
                Some(&*store)
            } else {
                None
            };

            let mut system = RunSquadSystem {
                snapshot: &snapshot,
                terrain,
                storage,
                cost_matrices: &mut self.cost_matrices,
                actions,
                operations,
                settings: self.config.combat_settings(),
                outcomes: Vec::new(),
            };

            system.run_now(&self.world);

            system.outcomes
        };

        let mut report = TickReport::default();

        for outcome in outcomes {
            report.squads_run += 1;
            report.actions_accepted += outcome.accepted_actions;

            match outcome.status {
                None => report.failed.push(outcome.squad_id),
                Some(status) if status.is_terminal() => {
                    if let Err(err) = self.world.delete_entity(outcome.entity) {
                        warn!("Squad {} entity already gone: {}", outcome.squad_id, err);
                    }

                    remove_squad(&mut *store, outcome.operation_id, outcome.squad_id);

                    report.finished.push((outcome.operation_id, outcome.squad_id, status));
                }
                Some(_) => {}
            }
        }

        self.world.maintain();

        {
            let squads = self.world.read_storage::<SquadInstance>();

            for squad in (&squads).join() {
                save_squad(&mut *store, squad)?;
            }
        }

        if self.config.persist_cost_matrices {
            self.cost_matrices.flush_storage(&mut *store)?;
        }

        debug!(
            "Tick {}: {} squads, {} actions, {} failed, {} finished",
            snapshot.time,
            report.squads_run,
            report.actions_accepted,
            report.failed.len(),
            report.finished.len()
        );

        Ok(report)
    }
}
