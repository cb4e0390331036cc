pub mod core;
pub mod array;
pub mod wire;
pub mod spaces;
pub mod utils;
pub mod training;

pub use crate::core::{Result, SpaceError};
pub use crate::array::{DType, NdArray, SerializationFormat, deserialize_ndarray, serialize_ndarray};
pub use crate::spaces::{
    BinarySize, BoxSpace, DictSpace, Discrete, Domain, MultiBinary, MultiDiscrete, Space, SpaceValue,
    decode_json, deserialize_space, encode_json, flatdim, flatten, serialize_space,
};
pub use crate::training::{BcActor, BcModel, BcTraining, ModelRegistry, TrainingConfig, TrialRunner};
