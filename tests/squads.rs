mod common;

use common::*;
use screeps::{Direction, Part};
use screeps_bastion::game_loop::{NeverComplete, OperationStatus};
use screeps_bastion::memory::{InMemoryStore, MemoryStore};
use screeps_bastion::military::squad::{SquadInstance, SquadKind, SquadStatus};
use screeps_bastion::military::squadmemory::save_squad;
use screeps_bastion::pathing::costmatrix::{terrain_grid, CostGrid, CostMatrixEntry, CostMatrixStorage, MatrixKind};
use screeps_bastion::room::snapshot::TickSnapshot;
use screeps_bastion::{Bastion, BastionConfig};
use uuid::Uuid;

fn operation() -> Uuid {
    Uuid::from_u128(0x0b)
}

fn squad_id() -> Uuid {
    Uuid::from_u128(0x5a)
}

struct ObjectiveReached;

impl OperationStatus for ObjectiveReached {
    fn is_complete(&self, _operation_id: Uuid, _squad: &SquadInstance) -> bool {
        true
    }
}

fn bastion_with(kind: SquadKind, target_room: &str, members: &[&str]) -> Bastion {
    let mut bastion = Bastion::new(BastionConfig::default());

    bastion.add_squad(SquadInstance::new(kind, operation(), squad_id(), room(target_room)));

    for name in members {
        assert!(bastion.add_member(operation(), squad_id(), name).is_some());
    }

    bastion
}

fn ranged(name: &str, room_name: &str, x: u8, y: u8) -> screeps_bastion::room::snapshot::CreepSnapshot {
    unit(name, pos(room_name, x, y), &[Part::RangedAttack, Part::Move], true)
}

#[test]
fn lone_ranged_unit_kites_and_shoots() {
    let terrain = open_rooms(&["W1N1"]);

    let mut vision = FakeVision::new(100);
    vision.add_mine(ranged("a", "W1N1", 20, 20));
    vision.add_hostile(unit("h", pos("W1N1", 22, 20), &[Part::Attack, Part::Move], false));

    let mut bastion = bastion_with(SquadKind::Solo, "W1N1", &["a"]);
    let mut actions = RecordingActions::default();
    let mut store = InMemoryStore::new();

    let report = bastion
        .tick(&vision, &terrain, &mut actions, &NeverComplete, &mut store)
        .unwrap();

    let issued = actions.for_creep("a");

    assert_eq!(issued.len(), 2);
    assert!(matches!(
        issued[0],
        Action::Move(Direction::Left) | Action::Move(Direction::TopLeft) | Action::Move(Direction::BottomLeft)
    ));
    assert_eq!(issued[1], Action::RangedAttack("id-h".to_owned()));
    assert_eq!(report.actions_accepted, 2);
    assert!(report.failed.is_empty());
}

#[test]
fn vanished_targets_are_skipped_but_the_move_still_happens() {
    let terrain = open_rooms(&["W1N1"]);

    let mut vision = FakeVision::new(100);
    vision.add_mine(ranged("a", "W1N1", 20, 20));
    vision.add_hostile(unit("h", pos("W1N1", 22, 20), &[Part::Attack, Part::Move], false));

    let mut bastion = bastion_with(SquadKind::Solo, "W1N1", &["a"]);
    let mut actions = RecordingActions::default();
    actions.lose_target("id-h");
    let mut store = InMemoryStore::new();

    let report = bastion
        .tick(&vision, &terrain, &mut actions, &NeverComplete, &mut store)
        .unwrap();

    let issued = actions.for_creep("a");

    assert_eq!(issued.len(), 1);
    assert!(matches!(issued[0], Action::Move(_)));
    assert_eq!(report.actions_accepted, 1);
    assert!(report.failed.is_empty());

    let squad = bastion.squad(operation(), squad_id()).unwrap();
    assert!(squad.members.iter().all(|member| member.intents.is_empty()));
}

#[test]
fn quad_crosses_into_the_target_room_and_engages() {
    let terrain = open_rooms(&["W1N1", "W1N2"]);

    let shooter = [Part::RangedAttack, Part::Move];
    let medic = [Part::Heal, Part::Move];

    let mut vision = FakeVision::new(100);
    vision.add_mine(unit("a", pos("W1N1", 20, 30), &shooter, true));
    vision.add_mine(unit("b", pos("W1N1", 21, 30), &shooter, true));
    vision.add_mine(unit("c", pos("W1N1", 20, 31), &medic, true));
    vision.add_mine(unit("d", pos("W1N1", 21, 31), &medic, true));
    vision.add_hostile(unit("h", pos("W1N2", 25, 20), &[Part::Move], false));

    let mut bastion = bastion_with(SquadKind::Quad, "W1N2", &["a", "b", "c", "d"]);
    let mut store = InMemoryStore::new();

    let mut engaged_at = None;

    for tick in 0..200 {
        vision.time = 100 + tick;

        let mut actions = RecordingActions::default();
        let report = bastion
            .tick(&vision, &terrain, &mut actions, &NeverComplete, &mut store)
            .unwrap();

        assert!(report.failed.is_empty(), "tick {}", tick);

        let shot = actions
            .log
            .iter()
            .any(|(_, action)| matches!(action, Action::RangedAttack(id) if id == "id-h") || *action == Action::RangedMassAttack);

        if shot {
            engaged_at = Some(tick);
            break;
        }

        vision.apply_moves(&terrain, &actions.moves());
    }

    let positions: Vec<String> = ["a", "b", "c", "d"]
        .iter()
        .map(|name| format!("{}:{:?}", name, vision.creeps[*name].pos))
        .collect();

    assert!(engaged_at.is_some(), "quad never engaged, stopped at {:?}", positions);

    for name in ["a", "b", "c", "d"] {
        assert_eq!(vision.creeps[name].pos.room_name(), room("W1N2"), "{:?}", positions);
    }
}

#[test]
fn squad_rallies_then_engages_then_dies() {
    let terrain = open_rooms(&["W1N1", "W1N2"]);

    let mut vision = FakeVision::new(100);
    vision.add_mine(ranged("a", "W1N1", 20, 30));
    vision.add_mine(ranged("b", "W1N1", 21, 30));

    let mut bastion = bastion_with(SquadKind::Duo, "W1N2", &["a", "b"]);
    let mut store = InMemoryStore::new();

    // Rallying: both members head for the staging tile below the top exit.
    let mut actions = RecordingActions::default();
    let report = bastion
        .tick(&vision, &terrain, &mut actions, &NeverComplete, &mut store)
        .unwrap();

    let squad = bastion.squad(operation(), squad_id()).unwrap();
    assert_eq!(squad.rally_position, Some(pos("W1N1", 20, 5)));
    assert!(!squad.initial_rally_complete);
    assert!(report.finished.is_empty());
    assert_eq!(store.keys_with_prefix("squads.").len(), 1);

    for name in ["a", "b"] {
        assert!(matches!(actions.for_creep(name).as_slice(), [Action::Move(_)]));
    }

    // Both within range of the rally point.
    vision.time = 101;
    vision.move_mine("a", pos("W1N1", 20, 5));
    vision.move_mine("b", pos("W1N1", 21, 6));

    let mut actions = RecordingActions::default();
    let report = bastion
        .tick(&vision, &terrain, &mut actions, &NeverComplete, &mut store)
        .unwrap();

    assert!(bastion.squad(operation(), squad_id()).unwrap().initial_rally_complete);
    assert!(report.finished.is_empty());

    // Everyone dies.
    vision.time = 102;
    vision.kill("a");
    vision.kill("b");

    let mut actions = RecordingActions::default();
    let report = bastion
        .tick(&vision, &terrain, &mut actions, &NeverComplete, &mut store)
        .unwrap();

    assert_eq!(report.finished, vec![(operation(), squad_id(), SquadStatus::Dead)]);
    assert!(actions.log.is_empty());
    assert!(bastion.squads().is_empty());
    assert!(store.keys_with_prefix("squads.").is_empty());
}

#[test]
fn finished_objective_ends_the_squad_without_acting() {
    let terrain = open_rooms(&["W1N1"]);

    let mut vision = FakeVision::new(100);
    vision.add_mine(ranged("a", "W1N1", 20, 20));
    vision.add_hostile(unit("h", pos("W1N1", 22, 20), &[Part::Attack], false));

    let mut bastion = bastion_with(SquadKind::Solo, "W1N1", &["a"]);
    let mut actions = RecordingActions::default();
    let mut store = InMemoryStore::new();

    let report = bastion
        .tick(&vision, &terrain, &mut actions, &ObjectiveReached, &mut store)
        .unwrap();

    assert_eq!(report.finished, vec![(operation(), squad_id(), SquadStatus::Done)]);
    assert!(actions.log.is_empty());
    assert!(bastion.squads().is_empty());
}

#[test]
fn every_unit_acts_at_most_once_per_pipeline() {
    let terrain = open_rooms(&["W1N1"]);

    let mut fighter = unit("fighter", pos("W1N1", 20, 20), &[Part::RangedAttack, Part::Heal, Part::Move], true);
    fighter.hits = 150;

    let mut vision = FakeVision::new(100);
    vision.add_mine(fighter);
    vision.add_mine(unit("medic", pos("W1N1", 21, 21), &[Part::Heal, Part::RangedAttack, Part::Move], true));
    vision.add_hostile(unit("h1", pos("W1N1", 22, 20), &[Part::Attack, Part::Move], false));
    vision.add_hostile(unit("h2", pos("W1N1", 23, 22), &[Part::Heal, Part::Move], false));
    vision.add_hostile(unit("h3", pos("W1N1", 20, 23), &[Part::RangedAttack], false));

    let mut bastion = bastion_with(SquadKind::Duo, "W1N1", &["fighter", "medic"]);
    let mut actions = RecordingActions::default();
    let mut store = InMemoryStore::new();

    bastion
        .tick(&vision, &terrain, &mut actions, &NeverComplete, &mut store)
        .unwrap();

    assert!(!actions.log.is_empty());

    for name in ["fighter", "medic"] {
        let issued = actions.for_creep(name);

        let moves = issued.iter().filter(|a| matches!(a, Action::Move(_))).count();
        let attacks = issued
            .iter()
            .filter(|a| matches!(a, Action::Attack(_) | Action::RangedAttack(_) | Action::RangedMassAttack))
            .count();
        let heals = issued
            .iter()
            .filter(|a| matches!(a, Action::Heal(_) | Action::RangedHeal(_)))
            .count();
        let ranged = issued
            .iter()
            .filter(|a| matches!(a, Action::RangedAttack(_) | Action::RangedMassAttack | Action::RangedHeal(_)))
            .count();

        assert!(moves <= 1, "{} moved {} times", name, moves);
        assert!(attacks <= 1, "{} attacked {} times", name, attacks);
        assert!(heals <= 1, "{} healed {} times", name, heals);
        assert!(ranged <= 1, "{} used the ranged pipeline {} times", name, ranged);
    }

    // The damaged fighter patches itself up.
    assert!(actions.for_creep("fighter").contains(&Action::Heal("id-fighter".to_owned())));
}

#[test]
fn squads_resume_from_memory_after_a_restart() {
    let terrain = open_rooms(&["W1N1", "W1N2"]);

    let mut vision = FakeVision::new(100);
    vision.add_mine(ranged("a", "W1N1", 20, 30));

    let mut store = InMemoryStore::new();

    let mut bastion = bastion_with(SquadKind::Solo, "W1N2", &["a"]);
    bastion
        .tick(&vision, &terrain, &mut RecordingActions::default(), &NeverComplete, &mut store)
        .unwrap();

    let before = bastion.squad(operation(), squad_id()).unwrap();
    assert!(!store.keys_with_prefix("costmatrix.").is_empty());

    let mut restarted = Bastion::new(BastionConfig::default());

    vision.time = 101;
    let report = restarted
        .tick(&vision, &terrain, &mut RecordingActions::default(), &NeverComplete, &mut store)
        .unwrap();

    let after = restarted.squad(operation(), squad_id()).unwrap();

    assert_eq!(report.squads_run, 1);
    assert_eq!(after.rally_position, before.rally_position);
    assert_eq!(after.members.len(), 1);
    assert_eq!(after.members[0].name, "a");
}

#[test]
fn unreadable_squad_memory_does_not_stop_the_others() {
    let terrain = open_rooms(&["W1N1"]);

    let mut vision = FakeVision::new(100);
    vision.add_mine(ranged("a", "W1N1", 20, 20));

    let mut stored = SquadInstance::new(SquadKind::Solo, operation(), squad_id(), room("W1N1"));
    stored.add_member("a");

    let mut store = InMemoryStore::new();
    save_squad(&mut store, &stored).unwrap();
    store.set("squads.broken.entry", "not a squad".to_owned());

    let mut bastion = Bastion::new(BastionConfig::default());
    let report = bastion
        .tick(&vision, &terrain, &mut RecordingActions::default(), &NeverComplete, &mut store)
        .unwrap();

    assert_eq!(report.squads_run, 1);
    assert!(report.failed.is_empty());
    assert_eq!(store.get("squads.broken.entry"), None);
    assert!(bastion.squad(operation(), squad_id()).is_some());
}

#[test]
fn cost_matrices_stay_in_memory_when_persistence_is_off() {
    let terrain = open_rooms(&["W1N1", "W1N2"]);

    let mut vision = FakeVision::new(100);
    vision.add_mine(ranged("a", "W1N1", 20, 30));

    let config = BastionConfig {
        persist_cost_matrices: false,
        ..BastionConfig::default()
    };

    let mut bastion = Bastion::new(config);
    bastion.add_squad(SquadInstance::new(SquadKind::Solo, operation(), squad_id(), room("W1N2")));
    bastion.add_member(operation(), squad_id(), "a");

    let mut store = InMemoryStore::new();
    bastion
        .tick(&vision, &terrain, &mut RecordingActions::default(), &NeverComplete, &mut store)
        .unwrap();

    assert!(store.keys_with_prefix("costmatrix.").is_empty());
    assert_eq!(store.keys_with_prefix("squads.").len(), 1);
}

#[test]
fn cost_matrix_queries_read_persisted_matrices() {
    let terrain = open_rooms(&["W1N1"]);
    let snapshot = TickSnapshot::new(100);

    let mut persisted = CostGrid::filled(1);
    persisted.set(10, 10, 200);

    let mut store = InMemoryStore::new();
    store
        .set_entry(MatrixKind::Terrain, room("W1N1"), &CostMatrixEntry::permanent(persisted.clone()))
        .unwrap();

    let mut bastion = Bastion::new(BastionConfig::default());
    let grid = bastion
        .cost_matrix(MatrixKind::Terrain, room("W1N1"), &terrain, &snapshot, &store)
        .unwrap();

    assert_eq!(*grid, persisted);

    let mut unpersisted = Bastion::new(BastionConfig {
        persist_cost_matrices: false,
        ..BastionConfig::default()
    });

    let grid = unpersisted
        .cost_matrix(MatrixKind::Terrain, room("W1N1"), &terrain, &snapshot, &store)
        .unwrap();

    assert_eq!(*grid, terrain_grid(&terrain, room("W1N1")));
}

#[test]
fn members_fill_slots_until_the_squad_is_full() {
    let mut bastion = Bastion::new(BastionConfig::default());
    bastion.add_squad(SquadInstance::new(SquadKind::Duo, operation(), squad_id(), room("W1N1")));

    assert_eq!(bastion.add_member(operation(), squad_id(), "a"), Some(0));
    assert_eq!(bastion.add_member(operation(), squad_id(), "a"), None);
    assert_eq!(bastion.add_member(operation(), squad_id(), "b"), Some(1));
    assert_eq!(bastion.add_member(operation(), squad_id(), "c"), None);
    assert_eq!(bastion.add_member(Uuid::from_u128(99), squad_id(), "d"), None);
}
