//! Behaviour-cloning run loop.
//!
//! A run publishes an initial policy, plans a batch of trials pairing the BC
//! player with a human teacher, hands them to a [`TrialRunner`] and turns
//! every observation/action pair the player saw into a flattened
//! [`BcSample`].

use tracing::{debug, info};

use super::config::TrainingConfig;
use super::model::BcModel;
use super::registry::ModelRegistry;
use super::trials::{EnvironmentSpecs, TrialParams, create_trial_params};
use crate::core::{Result, SpaceError};
use crate::spaces::{Space, SpaceValue, flatdim, flatten};

/// One step of a trial as seen by the player actor.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialSample {
    pub trial_id: String,
    pub player_observation: Option<SpaceValue>,
    pub player_action: Option<SpaceValue>,
    /// The teacher replaced the player's action.
    pub is_overridden: bool,
}

/// A flattened training sample.
#[derive(Clone, Debug, PartialEq)]
pub struct BcSample {
    pub is_overridden: bool,
    pub observation: Vec<f32>,
    pub action: Vec<f32>,
}

/// Executes planned trials and reports the player's samples.
pub trait TrialRunner {
    fn run_trials(&mut self, trials: Vec<TrialParams>, num_parallel_trials: usize) -> Result<Vec<TrialSample>>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainingReport {
    pub model_id: String,
    pub model_iteration: u64,
    pub samples: Vec<BcSample>,
}

pub struct BcTraining {
    specs: EnvironmentSpecs,
    config: TrainingConfig,
    observation_space: Space,
    action_space: Space,
}

impl BcTraining {
    pub fn new(specs: EnvironmentSpecs, config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        let observation_space = specs.observation_space()?;
        let action_space = specs.action_space()?;
        Ok(Self { specs, config, observation_space, action_space })
    }

    pub fn config(&self) -> &TrainingConfig { &self.config }
    pub fn specs(&self) -> &EnvironmentSpecs { &self.specs }

    /// Flatten one trial step. Steps without a player action (or observation)
    /// carry nothing to learn from and yield `None`.
    pub fn produce_sample(&self, sample: &TrialSample) -> Result<Option<BcSample>> {
        let (Some(observation), Some(action)) = (&sample.player_observation, &sample.player_action) else {
            debug!(trial_id = %sample.trial_id, "skipping sample without player observation or action");
            return Ok(None);
        };
        Ok(Some(BcSample {
            is_overridden: sample.is_overridden,
            observation: flatten(&self.observation_space, observation)?,
            action: flatten(&self.action_space, action)?,
        }))
    }

    pub fn run(&self, run_id: &str, registry: &ModelRegistry, runner: &mut dyn TrialRunner) -> Result<TrainingReport> {
        if self.specs.num_players != 1 {
            return Err(SpaceError::InvalidConfig(format!(
                "behaviour cloning expects a single player, environment has {}",
                self.specs.num_players
            )));
        }

        let model_id = format!("{run_id}_model");
        let mut model = BcModel::new(
            model_id.as_str(),
            self.specs.implementation.as_str(),
            flatdim(&self.observation_space),
            flatdim(&self.action_space),
            self.config.policy_network.num_hidden_nodes,
            self.config.seed,
        )?;
        let iteration = model.publish(registry)?;
        info!(
            run_id,
            model_id = %model_id,
            num_input = model.user_data().num_input,
            num_output = model.user_data().num_output,
            num_hidden_nodes = model.user_data().policy_network_num_hidden_nodes,
            num_trials = self.config.num_trials,
            "starting behaviour cloning run"
        );

        let trials = (0..self.config.num_trials)
            .map(|idx| create_trial_params(run_id, idx, &self.specs, &self.config, &model_id))
            .collect();
        let trial_samples = runner.run_trials(trials, 1)?;

        let mut samples = Vec::new();
        for (step_idx, trial_sample) in trial_samples.iter().enumerate() {
            if let Some(sample) = self.produce_sample(trial_sample)? {
                info!(?sample, "[{step_idx}] - Got sample");
                samples.push(sample);
            }
        }
        info!(run_id, num_samples = samples.len(), "behaviour cloning run finished");

        Ok(TrainingReport { model_id, model_iteration: iteration, samples })
    }
}
