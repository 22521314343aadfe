use super::damage::*;
use super::intents::*;
use crate::constants::*;
use crate::creep::TargetId;
use crate::room::snapshot::CreepSnapshot;
use screeps::{Part, Position};
use std::cmp::Reverse;

/// Healing every hostile healer could land on `target` this tick.
///
/// Each healer is counted against every candidate at once, so a healer that can
/// only save one creep still lowers the score of all of them. Focus fire is
/// therefore undervalued when several targets share a healer.
pub fn incoming_heal(target: &CreepSnapshot, hostiles: &[CreepSnapshot]) -> u32 {
    hostiles
        .iter()
        .filter(|healer| healer.pos.room_name() == target.pos.room_name())
        .map(|healer| creep_heal_at_range(healer, healer.pos.get_range_to(target.pos)))
        .sum()
}

/// Damage our towers and attackers could land on `target` this tick.
pub fn potential_damage(target: &CreepSnapshot, attackers: &[&CreepSnapshot], towers: &[Position]) -> u32 {
    let tower_damage = total_tower_damage(towers, target.pos).round() as u32;

    let unit_damage: u32 = attackers
        .iter()
        .filter(|attacker| attacker.pos.room_name() == target.pos.room_name())
        .map(|attacker| creep_damage_at_range(attacker, attacker.pos.get_range_to(target.pos)))
        .sum();

    tower_damage + unit_damage
}

/// Hostile with the largest margin of damage over healing.
///
/// Ties go to the hostile with fewer hits, then to the lowest id.
pub fn least_healable_target<'a>(
    hostiles: &'a [CreepSnapshot],
    attackers: &[&CreepSnapshot],
    towers: &[Position],
) -> Option<&'a CreepSnapshot> {
    hostiles.iter().max_by_key(|hostile| {
        let margin = potential_damage(hostile, attackers, towers) as i64 - incoming_heal(hostile, hostiles) as i64;

        (margin, Reverse(hostile.hits), Reverse(hostile.id.clone()))
    })
}

/// `preferred` if it is within `range`, otherwise the closest hostile that is.
fn target_in_range<'a>(
    unit: &CreepSnapshot,
    preferred: Option<&'a CreepSnapshot>,
    hostiles: &'a [CreepSnapshot],
    range: u32,
) -> Option<&'a CreepSnapshot> {
    let in_range = |c: &&CreepSnapshot| c.pos.room_name() == unit.pos.room_name() && unit.pos.get_range_to(c.pos) <= range;

    preferred.filter(in_range).or_else(|| {
        hostiles
            .iter()
            .filter(in_range)
            .min_by_key(|c| (unit.pos.get_range_to(c.pos), c.hits, c.id.clone()))
    })
}

/// Attack intent for a unit given the squad's chosen target, if anything is in reach.
pub fn choose_attack(unit: &CreepSnapshot, preferred: Option<&CreepSnapshot>, hostiles: &[CreepSnapshot]) -> Option<Intent> {
    if unit.has_part(Part::Attack) {
        if let Some(target) = target_in_range(unit, preferred, hostiles, MELEE_RANGE) {
            return Some(Intent::Attack(TargetId::new(&target.id)));
        }
    }

    if unit.has_part(Part::RangedAttack) {
        if let Some(target) = target_in_range(unit, preferred, hostiles, RANGED_RANGE) {
            let single = creep_damage_at_range(unit, unit.pos.get_range_to(target.pos));

            let mass: u32 = hostiles
                .iter()
                .filter(|c| c.pos.room_name() == unit.pos.room_name())
                .map(|c| mass_attack_damage_at_range(unit, unit.pos.get_range_to(c.pos)))
                .sum();

            return if mass > single {
                Some(Intent::RangedMassAttack)
            } else {
                Some(Intent::RangedAttack(TargetId::new(&target.id)))
            };
        }
    }

    None
}
