//! Trial planning for behaviour-cloning runs.
//!
//! Each trial pairs the BC player with a human teacher whose actions can
//! override the player's; environment specs carry the observation and action
//! spaces in wire form so every participant decodes the same spaces.

use serde::{Deserialize, Serialize};

use super::config::TrainingConfig;
use crate::array::SerializationFormat;
use crate::core::Result;
use crate::spaces::{Space, deserialize_space, serialize_space};
use crate::wire;

pub const PLAYER_ACTOR_CLASS: &str = "player";
pub const TEACHER_ACTOR_CLASS: &str = "teacher";
pub const PLAYER_ACTOR_NAME: &str = "player";
pub const WEB_ACTOR_NAME: &str = "web_actor";
pub const HUMAN_ACTOR_IMPL: &str = "client";
pub const BC_ACTOR_IMPL: &str = "simple_bc_actor";
pub const ENVIRONMENT_NAME: &str = "env";

/// Environment description shared with every actor of a trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpecs {
    pub implementation: String,
    pub num_players: u32,
    pub observation_space: wire::Space,
    pub action_space: wire::Space,
}

impl EnvironmentSpecs {
    pub fn new(
        implementation: impl Into<String>,
        num_players: u32,
        observation_space: &Space,
        action_space: &Space,
        format: SerializationFormat,
    ) -> Result<Self> {
        Ok(Self {
            implementation: implementation.into(),
            num_players,
            observation_space: serialize_space(observation_space, format)?,
            action_space: serialize_space(action_space, format)?,
        })
    }

    pub fn observation_space(&self) -> Result<Space> { deserialize_space(&self.observation_space) }
    pub fn action_space(&self) -> Result<Space> { deserialize_space(&self.action_space) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub run_id: String,
    pub environment_specs: EnvironmentSpecs,
    /// Model to act with; `None` for actors that do not use one.
    pub model_id: Option<String>,
    /// Negative selects the latest published iteration.
    pub model_iteration: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub run_id: String,
    pub render: bool,
    pub seed: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorParams {
    pub name: String,
    pub class_name: String,
    pub implementation: String,
    pub config: AgentConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialParams {
    pub trial_id: String,
    pub environment_name: String,
    pub environment_implementation: String,
    pub environment_config: EnvironmentConfig,
    pub actors: Vec<ActorParams>,
}

/// Parameters of trial `trial_idx` of run `run_id`: id `"{run_id}_{trial_idx}"`,
/// environment seed `config.seed + trial_idx`, BC player acting with the latest
/// iteration of `model_id`, and a human teacher.
pub fn create_trial_params(
    run_id: &str,
    trial_idx: usize,
    specs: &EnvironmentSpecs,
    config: &TrainingConfig,
    model_id: &str,
) -> TrialParams {
    let player = ActorParams {
        name: PLAYER_ACTOR_NAME.into(),
        class_name: PLAYER_ACTOR_CLASS.into(),
        implementation: BC_ACTOR_IMPL.into(),
        config: AgentConfig {
            run_id: run_id.into(),
            environment_specs: specs.clone(),
            model_id: Some(model_id.into()),
            model_iteration: -1,
        },
    };
    let teacher = ActorParams {
        name: WEB_ACTOR_NAME.into(),
        class_name: TEACHER_ACTOR_CLASS.into(),
        implementation: HUMAN_ACTOR_IMPL.into(),
        config: AgentConfig {
            run_id: run_id.into(),
            environment_specs: specs.clone(),
            model_id: None,
            model_iteration: -1,
        },
    };
    TrialParams {
        trial_id: format!("{run_id}_{trial_idx}"),
        environment_name: ENVIRONMENT_NAME.into(),
        environment_implementation: specs.implementation.clone(),
        environment_config: EnvironmentConfig {
            run_id: run_id.into(),
            render: true,
            seed: config.seed + trial_idx as u64,
        },
        actors: vec![player, teacher],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::{BoxSpace, Discrete};

    fn specs() -> EnvironmentSpecs {
        EnvironmentSpecs::new(
            "gym/CartPole-v1",
            1,
            &BoxSpace::uniform(&[4], -4.8, 4.8).into(),
            &Discrete::new(2).into(),
            SerializationFormat::Structured,
        )
        .unwrap()
    }

    #[test]
    fn specs_decode_their_spaces() {
        let s = specs();
        assert_eq!(s.observation_space().unwrap(), Space::from(BoxSpace::uniform(&[4], -4.8, 4.8)));
        assert_eq!(s.action_space().unwrap(), Space::from(Discrete::new(2)));
    }

    #[test]
    fn specs_reject_tuple_spaces() {
        let err = EnvironmentSpecs::new(
            "x",
            1,
            &Space::Tuple(vec![]),
            &Discrete::new(2).into(),
            SerializationFormat::Raw,
        );
        assert!(err.is_err());
    }

    #[test]
    fn trial_ids_and_seeds_follow_the_index() {
        let cfg = TrainingConfig::default();
        let params = create_trial_params("run", 3, &specs(), &cfg, "run_model");
        assert_eq!(params.trial_id, "run_3");
        assert_eq!(params.environment_config.seed, 15);
        assert!(params.environment_config.render);
        assert_eq!(params.environment_implementation, "gym/CartPole-v1");

        let player = &params.actors[0];
        assert_eq!(player.class_name, PLAYER_ACTOR_CLASS);
        assert_eq!(player.config.model_id.as_deref(), Some("run_model"));
        assert_eq!(player.config.model_iteration, -1);

        let teacher = &params.actors[1];
        assert_eq!(teacher.name, WEB_ACTOR_NAME);
        assert_eq!(teacher.implementation, HUMAN_ACTOR_IMPL);
        assert_eq!(teacher.config.model_id, None);
    }

    #[test]
    fn trial_params_serialize_to_json() {
        let params = create_trial_params("run", 0, &specs(), &TrainingConfig::default(), "run_model");
        let text = serde_json::to_string(&params).unwrap();
        let back: TrialParams = serde_json::from_str(&text).unwrap();
        assert_eq!(back, params);
    }
}
