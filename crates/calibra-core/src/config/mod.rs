//! Configuration: rollout policy constants and the top-level service config.

pub mod calibra_config;
pub mod policy;

pub use calibra_config::CalibraConfig;
pub use policy::RolloutPolicy;
