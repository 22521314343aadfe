use super::formation::*;
use super::intents::IntentQueue;
use crate::constants::*;
use crate::error::*;
use crate::pathing::movement::TravelPath;
use crate::room::names::*;
use crate::room::snapshot::*;
use crate::room::terrain::TerrainSource;
use log::*;
use screeps::{Direction, Position, RoomName};
use serde::{Deserialize, Serialize};
use specs::prelude::*;
use specs::Component;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SquadKind {
    Solo,
    Duo,
    Quad,
}

impl std::str::FromStr for SquadKind {
    type Err = BastionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "solo" => Ok(SquadKind::Solo),
            "duo" => Ok(SquadKind::Duo),
            "quad" => Ok(SquadKind::Quad),
            _ => Err(BastionError::UnknownSquadKind(s.to_owned())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormationStyle {
    /// Members move independently and only need to be near the rally point.
    Loose,
    /// Tight 2x2 box, every member on an exact slot tile.
    Quad,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SquadStrategy {
    pub member_count: usize,
    pub rally_range: u32,
    pub formation: FormationStyle,
}

impl SquadKind {
    pub fn strategy(self) -> SquadStrategy {
        match self {
            SquadKind::Solo => SquadStrategy {
                member_count: 1,
                rally_range: 1,
                formation: FormationStyle::Loose,
            },
            SquadKind::Duo => SquadStrategy {
                member_count: 2,
                rally_range: 2,
                formation: FormationStyle::Loose,
            },
            SquadKind::Quad => SquadStrategy {
                member_count: QUAD_SIZE,
                rally_range: 0,
                formation: FormationStyle::Quad,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SquadStatus {
    Ok,
    Rally,
    Done,
    Dead,
}

impl SquadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SquadStatus::Done | SquadStatus::Dead)
    }

    /// Whether units of a squad in this state still act.
    pub fn is_active(self) -> bool {
        matches!(self, SquadStatus::Ok | SquadStatus::Rally)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SquadMember {
    pub name: String,
    pub formation_slot: usize,
    /// Rebuilt every tick, never persisted.
    #[serde(skip)]
    pub intents: IntentQueue,
    #[serde(default)]
    pub travel: Option<TravelPath>,
}

impl SquadMember {
    pub fn new(name: &str, formation_slot: usize) -> SquadMember {
        SquadMember {
            name: name.to_owned(),
            formation_slot,
            intents: IntentQueue::new(),
            travel: None,
        }
    }
}

/// Shared state of a squad, stored as a component on the squad entity and
/// persisted so squads survive VM reloads.
#[derive(Clone, Debug, Serialize, Deserialize, Component)]
#[storage(DenseVecStorage)]
pub struct SquadInstance {
    pub kind: SquadKind,
    pub operation_id: Uuid,
    pub squad_id: Uuid,
    pub target_room: RoomName,
    pub members: Vec<SquadMember>,
    pub rally_position: Option<Position>,
    pub orientation: Option<Facing>,
    pub initial_rally_complete: bool,
    /// Monotonic count of members ever added. Distinguishes "never spawned"
    /// from "all died" once dead members have been pruned.
    pub total_members_added: u32,
    #[serde(default)]
    terminal: Option<SquadStatus>,
}

impl SquadInstance {
    pub fn new(kind: SquadKind, operation_id: Uuid, squad_id: Uuid, target_room: RoomName) -> SquadInstance {
        SquadInstance {
            kind,
            operation_id,
            squad_id,
            target_room,
            members: Vec::new(),
            rally_position: None,
            orientation: None,
            initial_rally_complete: false,
            total_members_added: 0,
            terminal: None,
        }
    }

    pub fn strategy(&self) -> SquadStrategy {
        self.kind.strategy()
    }

    /// Add a unit to the first free formation slot. Returns the slot, or `None` when the squad is full.
    pub fn add_member(&mut self, name: &str) -> Option<usize> {
        if self.members.iter().any(|m| m.name == name) {
            return None;
        }

        let slot = (0..self.strategy().member_count).find(|slot| !self.members.iter().any(|m| m.formation_slot == *slot))?;

        self.members.push(SquadMember::new(name, slot));
        self.total_members_added += 1;

        Some(slot)
    }

    pub fn ever_had_members(&self) -> bool {
        self.total_members_added > 0
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.strategy().member_count
    }

    /// Members whose unit is alive this tick, paired with its snapshot.
    pub fn live_members<'a>(&'a self, snapshot: &'a TickSnapshot) -> impl Iterator<Item = (&'a SquadMember, &'a CreepSnapshot)> + 'a {
        self.members
            .iter()
            .filter_map(move |member| snapshot.creep(&member.name).map(|creep| (member, creep)))
    }

    /// Drop members whose unit no longer exists.
    pub fn prune_dead_members(&mut self, snapshot: &TickSnapshot) {
        let squad_id = self.squad_id;

        self.members.retain(|member| {
            let alive = snapshot.creep(&member.name).is_some();

            if !alive {
                debug!("Squad {} lost member {}", squad_id, member.name);
            }

            alive
        });
    }

    pub fn facing(&self) -> Facing {
        self.orientation.unwrap_or(Facing::Top)
    }

    /// Tile a member should stand on while rallying.
    pub fn rally_tile(&self, member: &SquadMember) -> Option<Position> {
        let rally = self.rally_position?;

        match self.strategy().formation {
            FormationStyle::Loose => Some(rally),
            FormationStyle::Quad => slot_position(rally, self.facing(), member.formation_slot),
        }
    }

    /// Whether every live member is in its rally position. A squad whose
    /// members have all died counts as rallied so the death is reported.
    pub fn is_rallied(&self, snapshot: &TickSnapshot) -> bool {
        let strategy = self.strategy();
        let mut any_alive = false;

        for (member, creep) in self.live_members(snapshot) {
            any_alive = true;

            let tile = match self.rally_tile(member) {
                Some(tile) => tile,
                None => return false,
            };

            let in_position = match strategy.formation {
                FormationStyle::Loose => {
                    creep.pos.room_name() == tile.room_name() && creep.pos.get_range_to(tile) <= strategy.rally_range
                }
                FormationStyle::Quad => creep.pos == tile,
            };

            if !in_position {
                return false;
            }
        }

        any_alive || self.ever_had_members()
    }

    fn choose_rally_point(&mut self, snapshot: &TickSnapshot, terrain: &dyn TerrainSource) -> BastionResult<()> {
        let leader = match self.live_members(snapshot).map(|(_, creep)| creep.pos).next() {
            Some(pos) => pos,
            None => return Ok(()),
        };

        let (rally, facing) = select_rally_point(terrain, leader, self.target_room, self.strategy().formation)?;

        debug!(
            "Squad {} rallying at {},{} in {} facing {:?}",
            self.squad_id,
            rally.x().u8(),
            rally.y().u8(),
            rally.room_name(),
            facing
        );

        self.rally_position = Some(rally);
        self.orientation = Some(facing);

        Ok(())
    }

    /// Advance the lifecycle for this tick. `Done` and `Dead` are final.
    pub fn check_status(
        &mut self,
        snapshot: &TickSnapshot,
        terrain: &dyn TerrainSource,
        objective_complete: bool,
    ) -> BastionResult<SquadStatus> {
        if let Some(status) = self.terminal {
            return Ok(status);
        }

        self.prune_dead_members(snapshot);

        if !self.initial_rally_complete {
            if self.rally_position.is_none() {
                self.choose_rally_point(snapshot, terrain)?;
            }

            if !self.is_rallied(snapshot) {
                return Ok(SquadStatus::Rally);
            }

            self.initial_rally_complete = true;

            info!("Squad {} of operation {} finished rallying", self.squad_id, self.operation_id);
        }

        if objective_complete {
            info!("Squad {} objective complete", self.squad_id);

            self.terminal = Some(SquadStatus::Done);

            return Ok(SquadStatus::Done);
        }

        if self.members.is_empty() && self.ever_had_members() {
            info!("Squad {} has no surviving members", self.squad_id);

            self.terminal = Some(SquadStatus::Dead);

            return Ok(SquadStatus::Dead);
        }

        Ok(SquadStatus::Ok)
    }
}

/// Staging tile set back from the exit toward `target_room`, and the facing
/// that looks through that exit.
///
/// For quads the returned position is the top-left tile of a clear 2x2 box.
pub fn select_rally_point(
    terrain: &dyn TerrainSource,
    from: Position,
    target_room: RoomName,
    formation: FormationStyle,
) -> BastionResult<(Position, Facing)> {
    let room_name = from.room_name();
    let exit = exit_direction_toward(room_name, target_room)?;
    let facing = exit.and_then(Facing::from_direction).unwrap_or(Facing::Top);

    let far = ROOM_MAX - RALLY_EDGE_SETBACK;
    let clamp = |v: u8| v.clamp(RALLY_EDGE_SETBACK, far);

    let (fx, fy) = (from.x().u8(), from.y().u8());

    let (x, y) = match exit {
        Some(Direction::Top) => (clamp(fx), RALLY_EDGE_SETBACK),
        Some(Direction::Bottom) => (clamp(fx), far),
        Some(Direction::Left) => (RALLY_EDGE_SETBACK, clamp(fy)),
        Some(Direction::Right) => (far, clamp(fy)),
        _ => (clamp(fx), clamp(fy)),
    };

    let size = match formation {
        FormationStyle::Loose => 1,
        FormationStyle::Quad => 2,
    };

    let fits = |ax: i32, ay: i32| {
        (0..size).all(|dx| {
            (0..size).all(|dy| {
                let (tx, ty) = (ax + dx, ay + dy);

                (1..ROOM_MAX as i32).contains(&tx)
                    && (1..ROOM_MAX as i32).contains(&ty)
                    && !terrain.is_wall(room_name, tx as u8, ty as u8)
            })
        })
    };

    let radius_max = RALLY_SEARCH_RADIUS as i32;

    for radius in 0..=radius_max {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs().max(dy.abs()) != radius {
                    continue;
                }

                let (ax, ay) = (x as i32 + dx, y as i32 + dy);

                if fits(ax, ay) {
                    if let Some(pos) = position_in_room(room_name, ax, ay) {
                        return Ok((pos, facing));
                    }
                }
            }
        }
    }

    warn!("No clear rally tile near {},{} in {}, rallying in place", x, y, room_name);

    Ok((from, facing))
}
