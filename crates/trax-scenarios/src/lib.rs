//! # trax-scenarios: Scenario Files
//!
//! The on-disk scenario format (model path, max slope, endpoints, frame,
//! heading, obstacle annotations) and its materialisation into a
//! ready-to-solve [`trax_algo::Planner`].

pub mod apply;
pub mod spec;

pub use apply::{materialize, MaterializedScenario};
pub use spec::{
    load_scenario, resolve_in_frame, save_scenario, validate, CoordinateSystem, Scenario,
};
