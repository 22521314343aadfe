use screeps::Direction;
use serde::{Deserialize, Serialize};
use shrinkwraprs::Shrinkwrap;

/// Game object id of an action target.
#[derive(Shrinkwrap, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(id: &str) -> TargetId {
        TargetId(id.to_owned())
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a unit action, reduced to the cases decisions branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionResult {
    Ok,
    NotInRange,
    InvalidTarget,
    Other(i32),
}

impl ActionResult {
    pub fn is_ok(self) -> bool {
        self == ActionResult::Ok
    }
}

/// Per unit game actions, addressed by creep name.
pub trait UnitActions {
    /// Whether a target id still resolves to a live object.
    fn target_exists(&self, target: &TargetId) -> bool;

    fn move_direction(&mut self, creep: &str, direction: Direction) -> ActionResult;

    fn attack(&mut self, creep: &str, target: &TargetId) -> ActionResult;

    fn ranged_attack(&mut self, creep: &str, target: &TargetId) -> ActionResult;

    fn ranged_mass_attack(&mut self, creep: &str) -> ActionResult;

    fn heal(&mut self, creep: &str, target: &TargetId) -> ActionResult;

    fn ranged_heal(&mut self, creep: &str, target: &TargetId) -> ActionResult;
}
