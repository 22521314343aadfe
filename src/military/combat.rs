use super::formation::*;
use super::intents::*;
use super::squad::*;
use super::targeting::*;
use crate::constants::*;
use crate::creep::{TargetId, UnitActions};
use crate::error::*;
use crate::pathing::costmatrix::*;
use crate::pathing::movement::*;
use crate::room::names::*;
use crate::room::snapshot::*;
use crate::room::terrain::TerrainSource;
use itertools::Itertools;
use log::*;
use screeps::{Direction, Part, Position, RoomName};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombatSettings {
    pub repath_interval: u32,
    pub max_path_ops: u32,
}

impl Default for CombatSettings {
    fn default() -> Self {
        CombatSettings {
            repath_interval: REPATH_INTERVAL,
            max_path_ops: MAX_PATH_OPS,
        }
    }
}

/// Shared inputs for one tick of squad decisions.
pub struct CombatContext<'a> {
    pub snapshot: &'a TickSnapshot,
    pub terrain: &'a dyn TerrainSource,
    pub storage: Option<&'a dyn CostMatrixStorage>,
    pub cost_matrices: &'a mut CostMatrixCache,
    pub settings: CombatSettings,
}

impl<'a> CombatContext<'a> {
    fn grid(&mut self, kind: MatrixKind, room_name: RoomName) -> BastionResult<&CostGrid> {
        let sources = MatrixSources {
            terrain: self.terrain,
            snapshot: self.snapshot,
            storage: self.storage,
        };

        self.cost_matrices.get(kind, room_name, &sources)
    }

    /// Structure aware costs where the room is visible, bare terrain elsewhere.
    fn movement_grid(&mut self, room_name: RoomName) -> BastionResult<&CostGrid> {
        let kind = if self.snapshot.has_vision(room_name) {
            MatrixKind::Structures
        } else {
            MatrixKind::Terrain
        };

        self.grid(kind, room_name)
    }
}

/// Tiles claimed by moves already queued for this squad this tick.
#[derive(Default)]
struct MovePlanner {
    claimed: HashSet<Position>,
    vacating: HashSet<Position>,
}

impl MovePlanner {
    fn blocked(&self, unit: Position, snapshot: &TickSnapshot, ignore: &[Position]) -> Vec<Position> {
        snapshot
            .occupied_tiles(unit.room_name())
            .into_iter()
            .filter(|pos| *pos != unit && !self.vacating.contains(pos) && !ignore.contains(pos))
            .chain(self.claimed.iter().copied())
            .collect()
    }

    fn is_claimed(&self, pos: Position) -> bool {
        self.claimed.contains(&pos)
    }

    fn queue(&mut self, member: &mut SquadMember, from: Position, direction: Direction) -> bool {
        if !member.intents.push(Intent::Move(direction)) {
            return false;
        }

        let (dx, dy) = direction_offset(direction);

        if let Some(next) = offset_in_room(from, dx, dy) {
            self.claimed.insert(next);
        }

        self.vacating.insert(from);

        true
    }
}

/// Decide and execute one tick for a squad. Returns the number of actions accepted.
pub fn run_squad(
    squad: &mut SquadInstance,
    status: SquadStatus,
    context: &mut CombatContext,
    actions: &mut dyn UnitActions,
) -> BastionResult<usize> {
    decide_squad(squad, status, context)?;

    Ok(commit_squad(squad, actions))
}

/// Queue this tick's intents for every live member.
pub fn decide_squad(squad: &mut SquadInstance, status: SquadStatus, context: &mut CombatContext) -> BastionResult<()> {
    for member in squad.members.iter_mut() {
        member.intents.reset();
    }

    if !status.is_active() {
        return Ok(());
    }

    let snapshot = context.snapshot;
    let targets = squad_targets(squad, snapshot);

    let mut planner = MovePlanner::default();

    match squad.strategy().formation {
        FormationStyle::Loose => plan_loose_moves(squad, status, &targets, context, &mut planner)?,
        FormationStyle::Quad => plan_quad_moves(squad, status, &targets, context, &mut planner)?,
    }

    let units: Vec<&CreepSnapshot> = squad.members.iter().filter_map(|m| snapshot.creep(&m.name)).collect();

    for member in squad.members.iter_mut() {
        let unit = match snapshot.creep(&member.name) {
            Some(unit) => unit,
            None => continue,
        };

        let room_name = unit.pos.room_name();

        if let Some(intent) = choose_attack(unit, targets.get(&room_name).copied(), snapshot.hostiles(room_name)) {
            member.intents.push(intent);
        }

        for intent in heal_candidates(unit, &units, snapshot) {
            if member.intents.push(intent) {
                break;
            }
        }
    }

    Ok(())
}

/// Execute and clear every member's queued intents.
pub fn commit_squad(squad: &mut SquadInstance, actions: &mut dyn UnitActions) -> usize {
    squad
        .members
        .iter_mut()
        .map(|member| member.intents.commit(&member.name, actions))
        .sum()
}

/// Least healable hostile per room the squad stands in.
fn squad_targets<'s>(squad: &SquadInstance, snapshot: &'s TickSnapshot) -> HashMap<RoomName, &'s CreepSnapshot> {
    let units: Vec<&'s CreepSnapshot> = squad.members.iter().filter_map(|m| snapshot.creep(&m.name)).collect();

    let mut targets = HashMap::new();

    for unit in units.iter() {
        let room_name = unit.pos.room_name();

        if targets.contains_key(&room_name) {
            continue;
        }

        let attackers: Vec<&CreepSnapshot> = units
            .iter()
            .copied()
            .filter(|u| u.pos.room_name() == room_name && (u.has_part(Part::Attack) || u.has_part(Part::RangedAttack)))
            .collect();

        let towers: Vec<Position> = snapshot
            .room(room_name)
            .map(|room| room.my_towers().map(|t| t.pos).collect())
            .unwrap_or_default();

        if let Some(target) = least_healable_target(snapshot.hostiles(room_name), &attackers, &towers) {
            targets.insert(room_name, target);
        }
    }

    targets
}

fn attack_range(unit: &CreepSnapshot) -> Option<u32> {
    if unit.has_part(Part::RangedAttack) {
        Some(RANGED_RANGE)
    } else if unit.has_part(Part::Attack) {
        Some(MELEE_RANGE)
    } else {
        None
    }
}

/// Heal intents in order of preference.
fn heal_candidates(unit: &CreepSnapshot, squad_units: &[&CreepSnapshot], snapshot: &TickSnapshot) -> Vec<Intent> {
    let mut candidates = Vec::new();

    if !unit.has_part(Part::Heal) {
        return candidates;
    }

    let own = TargetId::new(&unit.id);

    if unit.is_damaged() {
        candidates.push(Intent::Heal(own));
        return candidates;
    }

    let ally = squad_units
        .iter()
        .filter(|ally| {
            ally.name != unit.name
                && ally.is_damaged()
                && ally.pos.room_name() == unit.pos.room_name()
                && ally.pos.get_range_to(unit.pos) <= RANGED_RANGE
        })
        .max_by_key(|ally| (ally.hits_max - ally.hits, Reverse(ally.name.clone())));

    if let Some(ally) = ally {
        let target = TargetId::new(&ally.id);

        if ally.pos.get_range_to(unit.pos) <= MELEE_RANGE {
            candidates.push(Intent::Heal(target));
        } else {
            candidates.push(Intent::RangedHeal(target));
        }
    }

    let room_name = unit.pos.room_name();

    let on_rampart = snapshot
        .room(room_name)
        .map(|room| room.has_my_rampart_at(unit.pos))
        .unwrap_or(false);

    if !snapshot.hostiles(room_name).is_empty() && !on_rampart {
        candidates.push(Intent::Heal(own));
    }

    candidates
}

fn plan_loose_moves(
    squad: &mut SquadInstance,
    status: SquadStatus,
    targets: &HashMap<RoomName, &CreepSnapshot>,
    context: &mut CombatContext,
    planner: &mut MovePlanner,
) -> BastionResult<()> {
    let snapshot = context.snapshot;
    let target_room = squad.target_room;
    let rally_range = squad.strategy().rally_range;

    let supports: Vec<Position> = squad
        .members
        .iter()
        .filter_map(|m| snapshot.creep(&m.name))
        .filter(|u| attack_range(u).is_some())
        .map(|u| u.pos)
        .collect();

    for index in 0..squad.members.len() {
        let rally_tile = match status {
            SquadStatus::Rally => squad.rally_tile(&squad.members[index]),
            _ => None,
        };

        let member = &mut squad.members[index];

        let unit = match snapshot.creep(&member.name) {
            Some(unit) => unit,
            None => continue,
        };

        let direction = choose_loose_move(
            unit,
            &mut member.travel,
            status,
            rally_tile.map(|tile| (tile, rally_range)),
            target_room,
            targets.get(&unit.pos.room_name()).copied(),
            &supports,
            context,
            planner,
        )?;

        if let Some(direction) = direction {
            planner.queue(member, unit.pos, direction);
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn choose_loose_move(
    unit: &CreepSnapshot,
    travel: &mut Option<TravelPath>,
    status: SquadStatus,
    rally: Option<(Position, u32)>,
    target_room: RoomName,
    target: Option<&CreepSnapshot>,
    supports: &[Position],
    context: &mut CombatContext,
    planner: &MovePlanner,
) -> BastionResult<Option<Direction>> {
    let pos = unit.pos;

    if let Some(direction) = step_off_exit(pos.x().u8(), pos.y().u8()) {
        return Ok(Some(direction));
    }

    if let Some((tile, range)) = rally {
        let direction = if tile.room_name() == pos.room_name() {
            approach_step(pos, tile, range, &[], context, planner)?
        } else {
            travel_step(unit, travel, tile.room_name(), context, planner)?
        };

        if direction.is_some() {
            return Ok(direction);
        }
    }

    if let Some(direction) = kite_step(unit, context, planner)? {
        return Ok(Some(direction));
    }

    if status != SquadStatus::Ok {
        return Ok(None);
    }

    if pos.room_name() != target_room {
        return travel_step(unit, travel, target_room, context, planner);
    }

    *travel = None;

    engage_step(unit, target, supports, context, planner)
}

/// First step toward a tile within `range` of `goal` in the unit's room.
fn approach_step(
    from: Position,
    goal: Position,
    range: u32,
    ignore: &[Position],
    context: &mut CombatContext,
    planner: &MovePlanner,
) -> BastionResult<Option<Direction>> {
    if goal.room_name() != from.room_name() || from.get_range_to(goal) <= range {
        return Ok(None);
    }

    let snapshot = context.snapshot;
    let max_ops = context.settings.max_path_ops;
    let blocked = planner.blocked(from, snapshot, ignore);

    let grid = context.movement_grid(from.room_name())?;
    let query = PathQuery::new(grid).max_ops(max_ops).block(from.room_name(), blocked);

    Ok(find_path_to_range(from, goal, range, &query).first_direction(from))
}

/// Step away from hostiles that are closer than the kiting range. Melee units hold.
fn kite_step(unit: &CreepSnapshot, context: &mut CombatContext, planner: &MovePlanner) -> BastionResult<Option<Direction>> {
    if unit.has_part(Part::Attack) {
        return Ok(None);
    }

    let snapshot = context.snapshot;
    let room_name = unit.pos.room_name();

    let threats: Vec<Position> = snapshot.hostiles(room_name).iter().map(|h| h.pos).collect();

    let too_close = threats.iter().any(|threat| unit.pos.get_range_to(*threat) < KITE_RANGE);

    if !too_close {
        return Ok(None);
    }

    let max_ops = context.settings.max_path_ops;
    let blocked = planner.blocked(unit.pos, snapshot, &[]);

    let grid = context.movement_grid(room_name)?;
    let query = PathQuery::new(grid).max_ops(max_ops).block(room_name, blocked);

    let direction = find_flee_path(unit.pos, &threats, KITE_RANGE, &query).first_direction(unit.pos);

    if direction.is_some() {
        trace!("{} kiting away from {} hostiles", unit.name, threats.len());
    }

    Ok(direction)
}

/// Next step toward `destination_room`, reusing the unit's cached route while it holds.
fn travel_step(
    unit: &CreepSnapshot,
    travel: &mut Option<TravelPath>,
    destination_room: RoomName,
    context: &mut CombatContext,
    planner: &MovePlanner,
) -> BastionResult<Option<Direction>> {
    let snapshot = context.snapshot;
    let settings = context.settings;
    let pos = unit.pos;

    if let Some(path) = travel.as_ref() {
        if path.is_usable(pos, destination_room, snapshot.time, settings.repath_interval) {
            let next = path.next_step(pos);
            let free = next
                .and_then(|d| {
                    let (dx, dy) = direction_offset(d);
                    offset_in_room(pos, dx, dy)
                })
                .map(|tile| !planner.is_claimed(tile))
                .unwrap_or(false);

            if free {
                return Ok(next);
            }
        }
    }

    let exit = match exit_direction_toward(pos.room_name(), destination_room)? {
        Some(exit) => exit,
        None => {
            *travel = None;
            return Ok(None);
        }
    };

    let blocked = planner.blocked(pos, snapshot, &[]);

    let grid = context.movement_grid(pos.room_name())?;
    let query = PathQuery::new(grid)
        .max_ops(settings.max_path_ops)
        .block(pos.room_name(), blocked);

    let result = find_path_to_exit(pos, exit, &query);

    if result.incomplete {
        debug!("{} has only a partial route toward {}", unit.name, destination_room);
    }

    let path = TravelPath::new(destination_room, pos, result, snapshot.time);
    let direction = path.next_step(pos);

    *travel = Some(path);

    Ok(direction)
}

/// Close in on the squad's target, or on the nearest squad attacker for units that cannot attack.
fn engage_step(
    unit: &CreepSnapshot,
    target: Option<&CreepSnapshot>,
    supports: &[Position],
    context: &mut CombatContext,
    planner: &MovePlanner,
) -> BastionResult<Option<Direction>> {
    let room_name = unit.pos.room_name();

    match attack_range(unit) {
        Some(range) => {
            let in_reach = context
                .snapshot
                .hostiles(room_name)
                .iter()
                .any(|h| unit.pos.get_range_to(h.pos) <= range);

            match target {
                Some(target) if !in_reach => approach_step(unit.pos, target.pos, range, &[], context, planner),
                _ => Ok(None),
            }
        }
        None => {
            let nearest = supports
                .iter()
                .filter(|p| p.room_name() == room_name && **p != unit.pos)
                .min_by_key(|p| (unit.pos.get_range_to(**p), p.x().u8(), p.y().u8()));

            match nearest {
                Some(support) => approach_step(unit.pos, *support, MELEE_RANGE, &[], context, planner),
                None => Ok(None),
            }
        }
    }
}

fn plan_quad_moves(
    squad: &mut SquadInstance,
    status: SquadStatus,
    targets: &HashMap<RoomName, &CreepSnapshot>,
    context: &mut CombatContext,
    planner: &mut MovePlanner,
) -> BastionResult<()> {
    let snapshot = context.snapshot;

    let live: Vec<(usize, usize, &CreepSnapshot)> = squad
        .members
        .iter()
        .enumerate()
        .filter_map(|(index, m)| snapshot.creep(&m.name).map(|unit| (index, m.formation_slot, unit)))
        .sorted_by_key(|(_, slot, _)| *slot)
        .collect();

    let own_tiles: Vec<Position> = live.iter().map(|(_, _, unit)| unit.pos).collect();

    let facing = squad.facing();

    if status == SquadStatus::Rally {
        for (index, _, unit) in live.iter() {
            if let Some(direction) = step_off_exit(unit.pos.x().u8(), unit.pos.y().u8()) {
                planner.queue(&mut squad.members[*index], unit.pos, direction);
            }
        }

        for (index, _, unit) in live.iter() {
            let tile = match squad.rally_tile(&squad.members[*index]) {
                Some(tile) => tile,
                None => continue,
            };

            let member = &mut squad.members[*index];

            if member.intents.has_move() {
                continue;
            }

            let direction = if tile.room_name() == unit.pos.room_name() {
                approach_step(unit.pos, tile, 0, &[], context, planner)?
            } else {
                travel_step(unit, &mut member.travel, tile.room_name(), context, planner)?
            };

            if let Some(direction) = direction {
                planner.queue(member, unit.pos, direction);
            }
        }

        return Ok(());
    }

    let (_, leader_slot, leader) = match live.first() {
        Some(first) => *first,
        None => return Ok(()),
    };

    if step_block_off_exit(squad, &live, context.terrain, planner) {
        return Ok(());
    }

    let anchor = anchor_from_slot(leader.pos, facing, leader_slot);

    let formed = anchor
        .map(|anchor| {
            live.iter()
                .all(|(_, slot, unit)| slot_position(anchor, facing, *slot) == Some(unit.pos))
        })
        .unwrap_or(false);

    let anchor = match anchor {
        Some(anchor) if formed => anchor,
        _ => {
            regroup(squad, &live, anchor, facing, context, planner)?;
            return Ok(());
        }
    };

    let front_left = match slot_position(anchor, facing, FRONT_LEFT) {
        Some(front_left) => front_left,
        None => return Ok(()),
    };

    let room_name = anchor.room_name();
    let max_ops = context.settings.max_path_ops;
    let blocked = planner.blocked(front_left, snapshot, &own_tiles);

    if let Some(direction) = quad_kite_step(&live, front_left, facing, blocked.clone(), context)? {
        for (index, _, unit) in live.iter() {
            planner.queue(&mut squad.members[*index], unit.pos, direction);
        }

        debug!("Squad {} falling back as a block", squad.squad_id);

        return Ok(());
    }

    let desired = desired_facing(squad.target_room, anchor, snapshot)?.unwrap_or(facing);

    if let Some(rotation) = Rotation::between(facing, desired) {
        let moves = rotation_moves(facing, rotation);

        for (index, slot, unit) in live.iter() {
            planner.queue(&mut squad.members[*index], unit.pos, moves[*slot % QUAD_SIZE]);
        }

        debug!("Squad {} rotating {:?} to face {:?}", squad.squad_id, rotation, desired);

        squad.orientation = Some(desired);

        return Ok(());
    }

    let direction = if room_name != squad.target_room {
        match exit_direction_toward(room_name, squad.target_room)? {
            Some(exit) => {
                let grid = context.grid(MatrixKind::Formation(facing), room_name)?;
                let query = PathQuery::new(grid).max_ops(max_ops).block(room_name, blocked);

                find_path_to_exit(front_left, exit, &query).first_direction(front_left)
            }
            None => None,
        }
    } else {
        match targets.get(&room_name) {
            Some(target) if !live.iter().any(|(_, _, unit)| unit.pos.get_range_to(target.pos) <= RANGED_RANGE) => {
                let grid = context.grid(MatrixKind::Formation(facing), room_name)?;
                let query = PathQuery::new(grid).max_ops(max_ops).block(room_name, blocked);

                find_path_to_range(front_left, target.pos, RANGED_RANGE, &query).first_direction(front_left)
            }
            _ => None,
        }
    };

    if let Some(direction) = direction {
        for (index, _, unit) in live.iter() {
            planner.queue(&mut squad.members[*index], unit.pos, direction);
        }
    }

    Ok(())
}

/// While any member stands on an exit tile, move the whole box one tile inward
/// so members arriving behind it have room to step off. Members whose inward
/// tile is a wall fall back to stepping off on their own.
fn step_block_off_exit(
    squad: &mut SquadInstance,
    live: &[(usize, usize, &CreepSnapshot)],
    terrain: &dyn TerrainSource,
    planner: &mut MovePlanner,
) -> bool {
    let direction = match live
        .iter()
        .find_map(|(_, _, unit)| step_off_exit(unit.pos.x().u8(), unit.pos.y().u8()))
    {
        Some(direction) => direction,
        None => return false,
    };

    let (dx, dy) = direction_offset(direction);

    let clear = live.iter().all(|(_, _, unit)| {
        offset_in_room(unit.pos, dx, dy)
            .map(|next| !terrain.is_wall(next.room_name(), next.x().u8(), next.y().u8()))
            .unwrap_or(false)
    });

    for (index, _, unit) in live.iter() {
        let step = if clear {
            Some(direction)
        } else {
            step_off_exit(unit.pos.x().u8(), unit.pos.y().u8())
        };

        if let Some(step) = step {
            planner.queue(&mut squad.members[*index], unit.pos, step);
        }
    }

    trace!("Squad {} stepping off the room edge {:?}", squad.squad_id, direction);

    true
}

/// Direction the whole box should fall back in when a hostile is closer than
/// the kiting range to any member. Boxes with melee members hold their ground.
fn quad_kite_step(
    live: &[(usize, usize, &CreepSnapshot)],
    front_left: Position,
    facing: Facing,
    blocked: Vec<Position>,
    context: &mut CombatContext,
) -> BastionResult<Option<Direction>> {
    if live.iter().any(|(_, _, unit)| unit.has_part(Part::Attack)) {
        return Ok(None);
    }

    let snapshot = context.snapshot;
    let room_name = front_left.room_name();

    let threats: Vec<Position> = snapshot.hostiles(room_name).iter().map(|h| h.pos).collect();

    let too_close = live.iter().any(|(_, _, unit)| {
        unit.pos.room_name() == room_name && threats.iter().any(|threat| unit.pos.get_range_to(*threat) < KITE_RANGE)
    });

    if !too_close {
        return Ok(None);
    }

    // Every slot is within one tile of front-left, so one extra tile of
    // distance keeps the whole box out of reach.
    let max_ops = context.settings.max_path_ops;
    let grid = context.grid(MatrixKind::Formation(facing), room_name)?;
    let query = PathQuery::new(grid).max_ops(max_ops).block(room_name, blocked);

    Ok(find_flee_path(front_left, &threats, KITE_RANGE + 1, &query).first_direction(front_left))
}

/// Walk members that are out of place back onto their slot tiles.
fn regroup(
    squad: &mut SquadInstance,
    live: &[(usize, usize, &CreepSnapshot)],
    anchor: Option<Position>,
    facing: Facing,
    context: &mut CombatContext,
    planner: &mut MovePlanner,
) -> BastionResult<()> {
    let anchor = match anchor {
        Some(anchor) => anchor,
        None => return Ok(()),
    };

    let own_tiles: Vec<Position> = live.iter().map(|(_, _, unit)| unit.pos).collect();

    for (index, slot, unit) in live.iter() {
        let member = &mut squad.members[*index];

        if member.intents.has_move() {
            continue;
        }

        let tile = match slot_position(anchor, facing, *slot) {
            Some(tile) => tile,
            None => continue,
        };

        if tile == unit.pos {
            continue;
        }

        let direction = if tile.room_name() == unit.pos.room_name() {
            approach_step(unit.pos, tile, 0, &own_tiles, context, planner)?
        } else {
            travel_step(unit, &mut member.travel, tile.room_name(), context, planner)?
        };

        if let Some(direction) = direction {
            planner.queue(member, unit.pos, direction);
        }
    }

    Ok(())
}

/// Facing toward the nearest hostile in the target room, otherwise toward the exit to it.
fn desired_facing(target_room: RoomName, anchor: Position, snapshot: &TickSnapshot) -> BastionResult<Option<Facing>> {
    let room_name = anchor.room_name();

    if room_name == target_room {
        let nearest = snapshot
            .hostiles(room_name)
            .iter()
            .min_by_key(|h| (anchor.get_range_to(h.pos), h.id.clone()));

        return Ok(nearest.and_then(|hostile| {
            Facing::toward(
                hostile.pos.x().u8() as i32 - anchor.x().u8() as i32,
                hostile.pos.y().u8() as i32 - anchor.y().u8() as i32,
            )
        }));
    }

    Ok(exit_direction_toward(room_name, target_room)?.and_then(Facing::from_direction))
}
