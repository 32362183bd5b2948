//! ev-route-planner
//!
//! Multi-stop EV route planning: given a trip and a vehicle energy profile,
//! find the fastest drivable sequence of charging stops that keeps the
//! battery above a reserve the whole way.
//!
//! The pipeline is [`planner::Planner::plan`]: corridor stations
//! ([`corridor`]), a reachability graph ([`graph`]), a label-setting search
//! over (node, SOC) ([`search`]), charge amounts ([`optimizer`]) and the
//! final [`model::PlanResult`] ([`assembler`]). Road segments and stations
//! come from the collaborators in [`traits`].

pub mod api;
pub mod assembler;
pub mod catalog;
pub mod corridor;
pub mod energy;
pub mod error;
pub mod graph;
pub mod haversine;
pub mod model;
pub mod optimizer;
pub mod osrm;
pub mod planner;
pub mod polyline;
pub mod search;
pub mod server;
pub mod traits;
