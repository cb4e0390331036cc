//! Behaviour-cloning policy model.
//!
//! The policy is a small MLP (Linear, BatchNorm, ReLU, Linear, BatchNorm, ReLU,
//! Linear) evaluated in inference mode: batch norm uses its running
//! statistics. Parameters are exchanged as a named state dict whose tensors go
//! through the array codec in raw format, bundled with `ModelUserData` by
//! `bincode`.

use std::collections::HashMap;

use ndarray::{Array, Array1, Array2, ArrayD, ArrayView1, Dimension, Ix1, Ix2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::registry::ModelRegistry;
use crate::array::{NdArray, SerializationFormat, deserialize_ndarray, serialize_ndarray};
use crate::core::{Result, SpaceError};
use crate::utils::SeedSequence;
use crate::wire;

const BATCH_NORM_EPS: f32 = 1e-5;

pub type StateDict = Vec<(String, NdArray)>;
type ParameterTable<'a> = HashMap<&'a str, &'a NdArray>;

fn tensor<D: Dimension>(a: &Array<f32, D>) -> NdArray {
    NdArray::Float32(a.clone().into_dyn())
}

fn parameter(table: &ParameterTable<'_>, name: &str, shape: &[usize]) -> Result<ArrayD<f32>> {
    match table.get(name) {
        Some(NdArray::Float32(a)) if a.shape() == shape => Ok(a.clone()),
        Some(other) => Err(SpaceError::InvalidValue(format!(
            "parameter {name} is {} {:?}, expected float32 {shape:?}",
            other.dtype(),
            other.shape()
        ))),
        None => Err(SpaceError::InvalidValue(format!("missing parameter {name}"))),
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Linear {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Linear {
    /// Uniform in ±1/sqrt(in_features).
    fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features as f32).sqrt();
        let weight = Array2::from_shape_fn((out_features, in_features), |_| rng.gen_range(-bound..=bound));
        let bias = Array1::from_shape_fn(out_features, |_| rng.gen_range(-bound..=bound));
        Self { weight, bias }
    }

    fn load(table: &ParameterTable<'_>, index: usize, in_features: usize, out_features: usize) -> Result<Self> {
        Ok(Self {
            weight: parameter(table, &format!("{index}.weight"), &[out_features, in_features])?
                .into_dimensionality::<Ix2>()?,
            bias: parameter(table, &format!("{index}.bias"), &[out_features])?.into_dimensionality::<Ix1>()?,
        })
    }

    fn push_state(&self, index: usize, entries: &mut StateDict) {
        entries.push((format!("{index}.weight"), tensor(&self.weight)));
        entries.push((format!("{index}.bias"), tensor(&self.bias)));
    }

    fn forward(&self, x: ArrayView1<'_, f32>) -> Array1<f32> {
        self.weight.dot(&x) + &self.bias
    }
}

#[derive(Clone, Debug, PartialEq)]
struct BatchNorm {
    weight: Array1<f32>,
    bias: Array1<f32>,
    running_mean: Array1<f32>,
    running_var: Array1<f32>,
}

impl BatchNorm {
    fn new(features: usize) -> Self {
        Self {
            weight: Array1::ones(features),
            bias: Array1::zeros(features),
            running_mean: Array1::zeros(features),
            running_var: Array1::ones(features),
        }
    }

    fn load(table: &ParameterTable<'_>, index: usize, features: usize) -> Result<Self> {
        let vector = |name: &str| -> Result<Array1<f32>> {
            Ok(parameter(table, &format!("{index}.{name}"), &[features])?.into_dimensionality::<Ix1>()?)
        };
        Ok(Self {
            weight: vector("weight")?,
            bias: vector("bias")?,
            running_mean: vector("running_mean")?,
            running_var: vector("running_var")?,
        })
    }

    fn push_state(&self, index: usize, entries: &mut StateDict) {
        entries.push((format!("{index}.weight"), tensor(&self.weight)));
        entries.push((format!("{index}.bias"), tensor(&self.bias)));
        entries.push((format!("{index}.running_mean"), tensor(&self.running_mean)));
        entries.push((format!("{index}.running_var"), tensor(&self.running_var)));
    }

    fn forward(&self, x: Array1<f32>) -> Array1<f32> {
        let scale = &self.weight / &self.running_var.mapv(|v| (v + BATCH_NORM_EPS).sqrt());
        (x - &self.running_mean) * &scale + &self.bias
    }
}

fn relu(mut x: Array1<f32>) -> Array1<f32> {
    x.mapv_inplace(|v| v.max(0.0));
    x
}

/// The behaviour-cloning policy network.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyNetwork {
    input: Linear,
    input_norm: BatchNorm,
    hidden: Linear,
    hidden_norm: BatchNorm,
    output: Linear,
}

impl PolicyNetwork {
    pub fn new<R: Rng + ?Sized>(num_input: usize, num_output: usize, num_hidden: usize, rng: &mut R) -> Self {
        Self {
            input: Linear::new(num_input, num_hidden, rng),
            input_norm: BatchNorm::new(num_hidden),
            hidden: Linear::new(num_hidden, num_hidden, rng),
            hidden_norm: BatchNorm::new(num_hidden),
            output: Linear::new(num_hidden, num_output, rng),
        }
    }

    pub fn num_input(&self) -> usize { self.input.weight.ncols() }
    pub fn num_hidden(&self) -> usize { self.input.weight.nrows() }
    pub fn num_output(&self) -> usize { self.output.weight.nrows() }

    /// Scores (unnormalised log-probabilities) for one flattened observation.
    pub fn forward(&self, input: ArrayView1<'_, f32>) -> Result<Array1<f32>> {
        if input.len() != self.num_input() {
            return Err(SpaceError::InvalidValue(format!(
                "policy input has {} features, expected {}",
                input.len(),
                self.num_input()
            )));
        }
        let h = relu(self.input_norm.forward(self.input.forward(input)));
        let h = relu(self.hidden_norm.forward(self.hidden.forward(h.view())));
        Ok(self.output.forward(h.view()))
    }

    /// Parameters keyed by sequential layer index ("0.weight", "1.running_mean", ...).
    pub fn state_dict(&self) -> StateDict {
        let mut entries = Vec::new();
        self.input.push_state(0, &mut entries);
        self.input_norm.push_state(1, &mut entries);
        self.hidden.push_state(3, &mut entries);
        self.hidden_norm.push_state(4, &mut entries);
        self.output.push_state(6, &mut entries);
        entries
    }

    pub fn from_state_dict(
        num_input: usize,
        num_output: usize,
        num_hidden: usize,
        entries: &[(String, NdArray)],
    ) -> Result<Self> {
        let table: ParameterTable<'_> = entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        Ok(Self {
            input: Linear::load(&table, 0, num_input, num_hidden)?,
            input_norm: BatchNorm::load(&table, 1, num_hidden)?,
            hidden: Linear::load(&table, 3, num_hidden, num_hidden)?,
            hidden_norm: BatchNorm::load(&table, 4, num_hidden)?,
            output: Linear::load(&table, 6, num_hidden, num_output)?,
        })
    }
}

/// Numerically stable softmax.
pub fn softmax(scores: &Array1<f32>) -> Array1<f32> {
    let max = scores.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let exp = scores.mapv(|v| (v - max).exp());
    let total = exp.sum();
    exp / total
}

/// Metadata published with the model parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUserData {
    pub model_id: String,
    pub environment_implementation: String,
    pub num_input: usize,
    pub num_output: usize,
    pub policy_network_num_hidden_nodes: usize,
    pub total_samples: u64,
}

#[derive(Serialize, Deserialize)]
struct SerializedModel {
    state_dict: Vec<(String, wire::Array)>,
    user_data: ModelUserData,
}

/// A behaviour-cloning model: policy network plus its metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct BcModel {
    user_data: ModelUserData,
    network: PolicyNetwork,
    iteration: u64,
}

impl BcModel {
    pub fn new(
        model_id: impl Into<String>,
        environment_implementation: impl Into<String>,
        num_input: usize,
        num_output: usize,
        num_hidden: usize,
        seed: u64,
    ) -> Result<Self> {
        if num_input == 0 || num_output == 0 || num_hidden == 0 {
            return Err(SpaceError::InvalidConfig(format!(
                "model dimensions must be positive (input {num_input}, output {num_output}, hidden {num_hidden})"
            )));
        }
        let mut rng = SeedSequence::new(seed).next_rng();
        Ok(Self {
            user_data: ModelUserData {
                model_id: model_id.into(),
                environment_implementation: environment_implementation.into(),
                num_input,
                num_output,
                policy_network_num_hidden_nodes: num_hidden,
                total_samples: 0,
            },
            network: PolicyNetwork::new(num_input, num_output, num_hidden, &mut rng),
            iteration: 0,
        })
    }

    pub fn model_id(&self) -> &str { &self.user_data.model_id }
    pub fn iteration(&self) -> u64 { self.iteration }
    pub fn user_data(&self) -> &ModelUserData { &self.user_data }
    pub fn network(&self) -> &PolicyNetwork { &self.network }

    pub fn record_samples(&mut self, count: u64) {
        self.user_data.total_samples += count;
    }

    pub fn serialize_model(&self) -> Result<Vec<u8>> {
        let state_dict = self
            .network
            .state_dict()
            .into_iter()
            .map(|(name, t)| (name, serialize_ndarray(&t, SerializationFormat::Raw)))
            .collect();
        let payload = SerializedModel { state_dict, user_data: self.user_data.clone() };
        Ok(bincode::serialize(&payload)?)
    }

    /// Rebuild a model from `serialize_model` output. The iteration is reset to 0;
    /// `retrieve` sets it from the registry.
    pub fn deserialize_model(bytes: &[u8]) -> Result<Self> {
        let payload: SerializedModel = bincode::deserialize(bytes)?;
        let entries = payload
            .state_dict
            .iter()
            .map(|(name, array)| Ok((name.clone(), deserialize_ndarray(array)?)))
            .collect::<Result<Vec<_>>>()?;
        let data = payload.user_data;
        let network = PolicyNetwork::from_state_dict(
            data.num_input,
            data.num_output,
            data.policy_network_num_hidden_nodes,
            &entries,
        )?;
        Ok(Self { user_data: data, network, iteration: 0 })
    }

    /// Publish under the model id; returns and records the new iteration.
    pub fn publish(&mut self, registry: &ModelRegistry) -> Result<u64> {
        let iteration = registry.publish_model(self.model_id(), self.serialize_model()?)?;
        self.iteration = iteration;
        debug!(model_id = self.model_id(), iteration, "published model");
        Ok(iteration)
    }

    /// Fetch a published model. A negative iteration selects the latest one.
    pub fn retrieve(registry: &ModelRegistry, model_id: &str, iteration: i64) -> Result<Self> {
        let (iteration, bytes) = registry.retrieve_model(model_id, iteration)?;
        let mut model = Self::deserialize_model(&bytes)?;
        model.iteration = iteration;
        Ok(model)
    }
}
