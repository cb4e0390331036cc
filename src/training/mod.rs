//! Behaviour-cloning glue built on the space codec: configuration, the policy
//! model and its registry, trial planning, the acting player and the run loop.

pub mod actor;
pub mod config;
pub mod model;
pub mod registry;
pub mod trainer;
pub mod trials;

pub use actor::BcActor;
pub use config::{PolicyNetworkConfig, TrainingConfig};
pub use model::{BcModel, ModelUserData, PolicyNetwork};
pub use registry::ModelRegistry;
pub use trainer::{BcSample, BcTraining, TrainingReport, TrialRunner, TrialSample};
pub use trials::{AgentConfig, EnvironmentSpecs, TrialParams, create_trial_params};
