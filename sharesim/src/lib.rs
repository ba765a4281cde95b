mod actor;
mod alloc;
mod communication;
mod error;
pub mod global;
pub mod helpers;
mod network;
mod nursery;
mod process_handle;
mod progress;
mod random;
mod simulation;
mod simulation_builder;
pub mod time;
mod topology;

pub use communication::{Destination, Message, MessagePtr};

pub use error::ConfigurationError;

pub use process_handle::{ProcessHandle, ProcessId};

pub use simulation::Simulation;
pub use simulation_builder::{SimulationBuilder, Spawn};

pub use global::gossip;
pub use global::global_unique_id;
pub use global::now;
pub use global::rank;
pub use global::schedule_timer_after;
pub use global::send_to;

pub use random::{Distributions, RandomSource, Seed, SharedRandom};

pub use topology::Topology;

pub use time::Jiffies;
pub use time::TimerId;
