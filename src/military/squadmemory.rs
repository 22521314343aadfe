use super::squad::SquadInstance;
use crate::constants::*;
use crate::error::*;
use crate::memory::*;
use crate::serialize::*;
use log::*;
use uuid::Uuid;

pub fn squad_key(operation_id: Uuid, squad_id: Uuid) -> String {
    memory_path(&[SQUAD_MEMORY_PREFIX, &operation_id.to_string(), &squad_id.to_string()])
}

pub fn save_squad(store: &mut dyn MemoryStore, squad: &SquadInstance) -> BastionResult<()> {
    let encoded = encode_to_string(squad).map_err(BastionError::Memory)?;

    store.set(&squad_key(squad.operation_id, squad.squad_id), encoded);

    Ok(())
}

pub fn remove_squad(store: &mut dyn MemoryStore, operation_id: Uuid, squad_id: Uuid) {
    store.remove(&squad_key(operation_id, squad_id));
}

/// Every stored squad. Entries that no longer decode are dropped from the store.
pub fn load_squads(store: &mut dyn MemoryStore) -> Vec<SquadInstance> {
    let prefix = format!("{}.", SQUAD_MEMORY_PREFIX);

    let mut squads = Vec::new();

    for key in store.keys_with_prefix(&prefix) {
        let decoded = store
            .get(&key)
            .ok_or_else(|| "missing value".to_owned())
            .and_then(|raw| decode_from_string::<SquadInstance>(&raw));

        match decoded {
            Ok(squad) => squads.push(squad),
            Err(err) => {
                warn!("Discarding unreadable squad memory {}: {}", key, err);

                store.remove(&key);
            }
        }
    }

    squads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::military::squad::SquadKind;
    use crate::pathing::movement::TravelPath;
    use crate::room::names::position_in_room;
    use screeps::{Direction, RoomName};

    #[test]
    fn squads_survive_a_reload() {
        let mut store = InMemoryStore::new();
        let room_name = RoomName::new("W1N1").unwrap();

        let mut squad = SquadInstance::new(SquadKind::Duo, Uuid::from_u128(7), Uuid::from_u128(9), room_name);
        squad.add_member("a");
        squad.rally_position = position_in_room(room_name, 20, 5);
        squad.members[0].intents.push(crate::military::intents::Intent::Move(Direction::Top));
        squad.members[0].travel = Some(TravelPath {
            target_room: room_name,
            room: room_name,
            steps: position_in_room(room_name, 20, 4).into_iter().collect(),
            computed_at: 3,
        });

        save_squad(&mut store, &squad).unwrap();

        let loaded = load_squads(&mut store);

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].squad_id, squad.squad_id);
        assert_eq!(loaded[0].rally_position, squad.rally_position);
        assert_eq!(loaded[0].members[0].travel, squad.members[0].travel);
        assert!(loaded[0].members[0].intents.is_empty());
        assert_eq!(loaded[0].total_members_added, 1);
    }

    #[test]
    fn corrupt_entries_are_discarded() {
        let mut store = InMemoryStore::new();
        store.set("squads.op.bad", "garbage".to_owned());

        assert!(load_squads(&mut store).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn removal_uses_the_same_key() {
        let mut store = InMemoryStore::new();
        let squad = SquadInstance::new(SquadKind::Solo, Uuid::from_u128(1), Uuid::from_u128(2), RoomName::new("E1S1").unwrap());

        save_squad(&mut store, &squad).unwrap();
        remove_squad(&mut store, squad.operation_id, squad.squad_id);

        assert!(store.is_empty());
    }
}
