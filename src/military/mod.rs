pub mod combat;
pub mod damage;
pub mod formation;
pub mod intents;
pub mod squad;
pub mod squadmemory;
pub mod squadsystem;
pub mod targeting;
