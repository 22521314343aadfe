use super::combat::*;
use super::squad::*;
use crate::creep::UnitActions;
use crate::error::*;
use crate::pathing::costmatrix::*;
use crate::room::snapshot::TickSnapshot;
use crate::room::terrain::TerrainSource;
use log::*;
use specs::prelude::*;
use uuid::Uuid;

/// External objective check for the operation that owns a squad.
pub trait OperationStatus {
    fn is_complete(&self, operation_id: Uuid, squad: &SquadInstance) -> bool;
}

/// Operations that never finish on their own.
pub struct NeverComplete;

impl OperationStatus for NeverComplete {
    fn is_complete(&self, _operation_id: Uuid, _squad: &SquadInstance) -> bool {
        false
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SquadOutcome {
    pub entity: Entity,
    pub operation_id: Uuid,
    pub squad_id: Uuid,
    pub status: Option<SquadStatus>,
    pub accepted_actions: usize,
}

impl SquadOutcome {
    pub fn failed(&self) -> bool {
        self.status.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.status.map(SquadStatus::is_terminal).unwrap_or(false)
    }
}

/// Runs status checks and combat decisions for every squad in the world.
///
/// A failing squad is logged and skipped; the rest still run.
pub struct RunSquadSystem<'b> {
    pub snapshot: &'b TickSnapshot,
    pub terrain: &'b dyn TerrainSource,
    pub storage: Option<&'b dyn CostMatrixStorage>,
    pub cost_matrices: &'b mut CostMatrixCache,
    pub actions: &'b mut dyn UnitActions,
    pub operations: &'b dyn OperationStatus,
    pub settings: CombatSettings,
    pub outcomes: Vec<SquadOutcome>,
}

impl<'b> RunSquadSystem<'b> {
    fn run_squad_tick(&mut self, squad: &mut SquadInstance) -> BastionResult<(SquadStatus, usize)> {
        let objective_complete = self.operations.is_complete(squad.operation_id, squad);

        let status = squad.check_status(self.snapshot, self.terrain, objective_complete)?;

        let mut context = CombatContext {
            snapshot: self.snapshot,
            terrain: self.terrain,
            storage: self.storage,
            cost_matrices: &mut *self.cost_matrices,
            settings: self.settings,
        };

        let accepted = run_squad(squad, status, &mut context, &mut *self.actions)?;

        Ok((status, accepted))
    }
}

impl<'a, 'b> System<'a> for RunSquadSystem<'b> {
    type SystemData = (Entities<'a>, WriteStorage<'a, SquadInstance>);

    fn run(&mut self, (entities, mut squads): Self::SystemData) {
        for (entity, squad) in (&entities, &mut squads).join() {
            let result = self.run_squad_tick(squad);

            let (status, accepted_actions) = match result {
                Ok((status, accepted)) => (Some(status), accepted),
                Err(err) if err.is_retryable() => {
                    warn!("Squad {} of operation {} skipped this tick: {}", squad.squad_id, squad.operation_id, err);

                    (None, 0)
                }
                Err(err) => {
                    error!("Squad {} of operation {} failed: {}", squad.squad_id, squad.operation_id, err);

                    (None, 0)
                }
            };

            self.outcomes.push(SquadOutcome {
                entity,
                operation_id: squad.operation_id,
                squad_id: squad.squad_id,
                status,
                accepted_actions,
            });
        }
    }
}
