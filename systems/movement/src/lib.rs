#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Agent movement and reactive re-planning.
//!
//! [`MovingAgent`] interpolates along its route and knows how to splice a
//! detour in front of the checkpoints it still has to visit. [`AgentManager`]
//! drives every agent once per tick and asks the pathfinder for a detour when
//! a segment becomes blocked or after the obstacle layout changes.

mod agent;
mod manager;

pub use agent::{AgentStats, MovingAgent, ARRIVAL_RADIUS, REROUTE_SETTLE_DISTANCE};
pub use manager::AgentManager;
