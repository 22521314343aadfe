use crate::constants::*;
use crate::room::snapshot::CreepSnapshot;
use screeps::{Part, Position};

/// Tower attack damage at a given range.
///
/// - Range 0..=5: 600 damage (maximum)
/// - Range 6..=20: linear falloff from 600 to 150
/// - Range 21+: 150 damage (minimum)
pub fn tower_attack_damage_at_range(range: u32) -> f32 {
    if range <= TOWER_OPTIMAL_RANGE {
        TOWER_POWER_ATTACK
    } else if range >= TOWER_FALLOFF_RANGE {
        TOWER_POWER_ATTACK_MIN
    } else {
        let t = (range - TOWER_OPTIMAL_RANGE) as f32 / (TOWER_FALLOFF_RANGE - TOWER_OPTIMAL_RANGE) as f32;
        TOWER_POWER_ATTACK - t * (TOWER_POWER_ATTACK - TOWER_POWER_ATTACK_MIN)
    }
}

/// Total tower damage against a target at a given position.
pub fn total_tower_damage(tower_positions: &[Position], target_pos: Position) -> f32 {
    tower_positions
        .iter()
        .filter(|tp| tp.room_name() == target_pos.room_name())
        .map(|tp| tower_attack_damage_at_range(tp.get_range_to(target_pos)))
        .sum()
}

/// Share of a full strength tower shot reaching a tile, as a whole percentage.
pub fn tower_damage_percent(tower_positions: &[Position], target_pos: Position) -> u32 {
    tower_positions
        .iter()
        .filter(|tp| tp.room_name() == target_pos.room_name())
        .map(|tp| (tower_attack_damage_at_range(tp.get_range_to(target_pos)) / TOWER_POWER_ATTACK * 100.0).round() as u32)
        .sum()
}

/// Heal a creep can put out on a target at the given range.
pub fn creep_heal_at_range(creep: &CreepSnapshot, range: u32) -> u32 {
    let parts = creep.parts(Part::Heal);

    if range <= MELEE_RANGE {
        parts * HEAL_POWER
    } else if range <= RANGED_RANGE {
        parts * RANGED_HEAL_POWER
    } else {
        0
    }
}

/// Damage a creep can deal to a target at the given range with its best single target attack.
pub fn creep_damage_at_range(creep: &CreepSnapshot, range: u32) -> u32 {
    let melee = if range <= MELEE_RANGE {
        creep.parts(Part::Attack) * ATTACK_POWER
    } else {
        0
    };

    let ranged = if range <= RANGED_RANGE {
        creep.parts(Part::RangedAttack) * RANGED_ATTACK_POWER
    } else {
        0
    };

    melee.max(ranged)
}

/// Mass attack damage against a single target at the given range.
pub fn mass_attack_damage_at_range(creep: &CreepSnapshot, range: u32) -> u32 {
    let per_part = match range {
        0 | 1 => RANGED_MASS_ATTACK_POWER[0],
        2 => RANGED_MASS_ATTACK_POWER[1],
        3 => RANGED_MASS_ATTACK_POWER[2],
        _ => 0,
    };

    creep.parts(Part::RangedAttack) * per_part
}

pub fn is_ranged_only(creep: &CreepSnapshot) -> bool {
    creep.has_part(Part::RangedAttack) && !creep.has_part(Part::Attack)
}
