// Behaviour-cloning actor: picks discrete actions from a published policy.

use ndarray::Array1;
use rand::distributions::{Distribution, WeightedIndex};
use tracing::{debug, info};

use super::model::{BcModel, softmax};
use super::registry::ModelRegistry;
use super::trials::AgentConfig;
use crate::core::{Result, SpaceError};
use crate::spaces::{Discrete, Space, SpaceValue, flatten};
use crate::utils::{RngStream, rng_from_seed};

pub struct BcActor {
    model: BcModel,
    observation_space: Space,
    action_space: Discrete,
    rng: RngStream,
}

impl BcActor {
    /// Load the model named in `config` and decode the environment's spaces.
    /// Only discrete action spaces can be acted on.
    pub fn from_registry(registry: &ModelRegistry, config: &AgentConfig, seed: u64) -> Result<Self> {
        let model_id = config
            .model_id
            .as_deref()
            .ok_or_else(|| SpaceError::InvalidConfig("BC actor requires a model id".into()))?;
        let model = BcModel::retrieve(registry, model_id, config.model_iteration)?;
        let observation_space = config.environment_specs.observation_space()?;
        let action_space = match config.environment_specs.action_space()? {
            Space::Discrete(d) => d,
            other => {
                return Err(SpaceError::InvalidConfig(format!(
                    "BC actor needs a Discrete action space, got {}",
                    other.type_name()
                )));
            }
        };
        if action_space.n() as usize != model.user_data().num_output {
            return Err(SpaceError::InvalidConfig(format!(
                "model {model_id} has {} outputs but the action space has {} actions",
                model.user_data().num_output,
                action_space.n()
            )));
        }
        info!("Starting trial with model v{}", model.iteration());
        Ok(Self { model, observation_space, action_space, rng: rng_from_seed(seed) })
    }

    pub fn model(&self) -> &BcModel { &self.model }

    /// Sample an action for `observation` from the policy's softmax distribution.
    pub fn act(&mut self, observation: &SpaceValue) -> Result<SpaceValue> {
        let input = Array1::from(flatten(&self.observation_space, observation)?);
        let scores = self.model.network().forward(input.view())?;
        let probs = softmax(&scores);
        let dist = WeightedIndex::new(probs.iter())
            .map_err(|e| SpaceError::InvalidValue(format!("policy probabilities {probs}: {e}")))?;
        let index = dist.sample(&mut self.rng) as i64;
        debug!(index, "sampled action");
        Ok(SpaceValue::Discrete(self.action_space.start() + index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::SerializationFormat;
    use crate::spaces::{BoxSpace, Domain, MultiDiscrete};
    use crate::training::trials::EnvironmentSpecs;
    use crate::utils::rng_from_seed;

    fn config(action_space: Space, model_id: Option<&str>) -> AgentConfig {
        AgentConfig {
            run_id: "run".into(),
            environment_specs: EnvironmentSpecs::new(
                "gym/CartPole-v1",
                1,
                &BoxSpace::uniform(&[4], -1.0, 1.0).into(),
                &action_space,
                SerializationFormat::Structured,
            )
            .unwrap(),
            model_id: model_id.map(String::from),
            model_iteration: -1,
        }
    }

    fn registry_with_model(num_output: usize) -> ModelRegistry {
        let registry = ModelRegistry::new();
        BcModel::new("run_model", "gym/CartPole-v1", 4, num_output, 8, 12)
            .unwrap()
            .publish(&registry)
            .unwrap();
        registry
    }

    #[test]
    fn actions_fall_in_the_action_space() {
        let registry = registry_with_model(3);
        let action_space = Discrete::with_start(3, 10);
        let mut actor =
            BcActor::from_registry(&registry, &config(action_space.clone().into(), Some("run_model")), 1).unwrap();
        let obs_space = Space::from(BoxSpace::uniform(&[4], -1.0, 1.0));
        let mut rng = rng_from_seed(5);
        for _ in 0..50 {
            let obs = obs_space.sample(&mut rng);
            match actor.act(&obs).unwrap() {
                SpaceValue::Discrete(a) => assert!(action_space.contains(&a)),
                other => panic!("unexpected action {other:?}"),
            }
        }
        assert_eq!(actor.model().iteration(), 0);
    }

    #[test]
    fn missing_model_id_is_a_config_error() {
        let registry = registry_with_model(2);
        let err = BcActor::from_registry(&registry, &config(Discrete::new(2).into(), None), 0).err();
        assert!(matches!(err, Some(SpaceError::InvalidConfig(_))));
    }

    #[test]
    fn unknown_model_is_not_found() {
        let registry = ModelRegistry::new();
        let err = BcActor::from_registry(&registry, &config(Discrete::new(2).into(), Some("nope")), 0).err();
        assert!(matches!(err, Some(SpaceError::ModelNotFound { .. })));
    }

    #[test]
    fn non_discrete_action_space_is_rejected() {
        let registry = registry_with_model(2);
        let err = BcActor::from_registry(&registry, &config(MultiDiscrete::new(vec![2]).into(), Some("run_model")), 0)
            .err();
        assert!(matches!(err, Some(SpaceError::InvalidConfig(_))));
    }

    #[test]
    fn observation_outside_the_space_is_an_error() {
        let registry = registry_with_model(2);
        let mut actor = BcActor::from_registry(&registry, &config(Discrete::new(2).into(), Some("run_model")), 0).unwrap();
        assert!(actor.act(&SpaceValue::Discrete(1)).is_err());
    }
}
