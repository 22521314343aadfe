use crate::creep::*;
use bitflags::*;
use log::*;
use screeps::Direction;

// Actions sharing a bit are mutually exclusive within a tick. Every attack
// shares ATTACK so a unit commits to one target; ranged attacks and ranged
// heal also share the game's ranged pipeline.

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct IntentFlags: u8 {
        const UNSET = 0;

        const MOVE = 1;

        const ATTACK = 1 << 1;

        const RANGED = 1 << 2;

        const HEAL = 1 << 3;
    }
}

impl IntentFlags {
    pub fn consume(&mut self, flags: IntentFlags) -> bool {
        if !self.intersects(flags) {
            self.insert(flags);

            true
        } else {
            false
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Move(Direction),
    Attack(TargetId),
    RangedAttack(TargetId),
    RangedMassAttack,
    Heal(TargetId),
    RangedHeal(TargetId),
}

impl Intent {
    pub fn flags(&self) -> IntentFlags {
        match self {
            Intent::Move(_) => IntentFlags::MOVE,
            Intent::Attack(_) => IntentFlags::ATTACK,
            Intent::RangedAttack(_) | Intent::RangedMassAttack => IntentFlags::ATTACK | IntentFlags::RANGED,
            Intent::Heal(_) => IntentFlags::HEAL,
            Intent::RangedHeal(_) => IntentFlags::HEAL | IntentFlags::RANGED,
        }
    }

    pub fn target(&self) -> Option<&TargetId> {
        match self {
            Intent::Attack(target)
            | Intent::RangedAttack(target)
            | Intent::Heal(target)
            | Intent::RangedHeal(target) => Some(target),
            Intent::Move(_) | Intent::RangedMassAttack => None,
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, Intent::Move(_))
    }
}

/// Actions a unit has decided on this tick, in decision order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntentQueue {
    intents: Vec<Intent>,
    flags: IntentFlags,
}

impl Default for IntentFlags {
    fn default() -> Self {
        IntentFlags::UNSET
    }
}

impl IntentQueue {
    pub fn new() -> IntentQueue {
        IntentQueue::default()
    }

    /// Queue an intent unless one sharing a pipeline is already queued.
    pub fn push(&mut self, intent: Intent) -> bool {
        if self.flags.consume(intent.flags()) {
            self.intents.push(intent);

            true
        } else {
            false
        }
    }

    pub fn can_push(&self, flags: IntentFlags) -> bool {
        !self.flags.intersects(flags)
    }

    pub fn has_move(&self) -> bool {
        self.flags.contains(IntentFlags::MOVE)
    }

    pub fn reset(&mut self) {
        self.intents.clear();
        self.flags = IntentFlags::UNSET;
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Execute and drain every queued intent. Targets that no longer resolve are
    /// skipped. Returns the number of actions the game accepted.
    pub fn commit(&mut self, creep: &str, actions: &mut dyn UnitActions) -> usize {
        let mut accepted = 0;

        for intent in self.intents.drain(..) {
            if let Some(target) = intent.target() {
                if !actions.target_exists(target) {
                    debug!("Skipping {:?} for {}: target no longer exists", intent, creep);
                    continue;
                }
            }

            let result = match &intent {
                Intent::Move(direction) => actions.move_direction(creep, *direction),
                Intent::Attack(target) => actions.attack(creep, target),
                Intent::RangedAttack(target) => actions.ranged_attack(creep, target),
                Intent::RangedMassAttack => actions.ranged_mass_attack(creep),
                Intent::Heal(target) => actions.heal(creep, target),
                Intent::RangedHeal(target) => actions.ranged_heal(creep, target),
            };

            if result.is_ok() {
                accepted += 1;
            } else {
                debug!("Intent {:?} for {} failed: {:?}", intent, creep, result);
            }
        }

        self.flags = IntentFlags::UNSET;

        accepted
    }
}
