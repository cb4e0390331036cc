// Flattening of spaces and their elements into the f32 vectors fed to policy networks.

use super::{Domain, Space, SpaceValue};
use crate::core::{Result, SpaceError};

/// Length of the flattened representation of elements of `space`.
pub fn flatdim(space: &Space) -> usize {
    match space {
        Space::Discrete(d) => d.n() as usize,
        Space::Box(b) => b.low().len(),
        Space::MultiBinary(mb) => mb.dims().iter().product(),
        Space::MultiDiscrete(md) => md.counts().iter().map(|&n| n as usize).sum(),
        Space::Dict(dict) => dict.iter().map(|(_, sub)| flatdim(sub)).sum(),
        Space::Tuple(spaces) => spaces.iter().map(flatdim).sum(),
    }
}

/// Flatten an element of `space`.
///
/// Discrete values become a one-hot vector indexed from `start`, MultiDiscrete
/// values one one-hot block per dimension, Box and MultiBinary arrays are
/// raveled in row-major order, and composites concatenate their children.
pub fn flatten(space: &Space, value: &SpaceValue) -> Result<Vec<f32>> {
    let mut out = Vec::with_capacity(flatdim(space));
    flatten_into(space, value, &mut out)?;
    Ok(out)
}

fn one_hot(out: &mut Vec<f32>, len: usize, index: usize) {
    let offset = out.len();
    out.resize(offset + len, 0.0);
    out[offset + index] = 1.0;
}

fn flatten_into(space: &Space, value: &SpaceValue, out: &mut Vec<f32>) -> Result<()> {
    match (space, value) {
        (Space::Discrete(d), SpaceValue::Discrete(x)) => {
            if !d.contains(x) {
                return Err(SpaceError::InvalidValue(format!(
                    "{x} is outside Discrete(n={}, start={})",
                    d.n(),
                    d.start()
                )));
            }
            one_hot(out, d.n() as usize, (x - d.start()) as usize);
        }
        (Space::Box(b), SpaceValue::Box(v)) => {
            if !v.same_layout(b.low()) {
                return Err(SpaceError::InvalidValue(format!(
                    "Box value is {} {:?}, space is {} {:?}",
                    v.dtype(),
                    v.shape(),
                    b.dtype(),
                    b.shape()
                )));
            }
            out.extend(v.to_f64_vec().into_iter().map(|x| x as f32));
        }
        (Space::MultiBinary(mb), SpaceValue::MultiBinary(v)) => {
            if v.shape() != mb.dims().as_slice() {
                return Err(SpaceError::InvalidValue(format!(
                    "MultiBinary value has shape {:?}, space has {:?}",
                    v.shape(),
                    mb.dims()
                )));
            }
            out.extend(v.iter().map(|&b| f32::from(b)));
        }
        (Space::MultiDiscrete(md), SpaceValue::MultiDiscrete(v)) => {
            if !md.contains(v) {
                return Err(SpaceError::InvalidValue(format!(
                    "{v} is outside MultiDiscrete({})",
                    md.counts()
                )));
            }
            let counts = md.counts();
            for (&x, &n) in v.iter().zip(counts.iter()) {
                one_hot(out, n as usize, x as usize);
            }
        }
        (Space::Dict(dict), SpaceValue::Dict(entries)) => {
            if dict.len() != entries.len() {
                return Err(SpaceError::InvalidValue(format!(
                    "Dict value has {} entries, space has {}",
                    entries.len(),
                    dict.len()
                )));
            }
            for ((key, sub), (value_key, sub_value)) in dict.iter().zip(entries) {
                if key != value_key {
                    return Err(SpaceError::InvalidValue(format!(
                        "Dict value key {value_key:?} does not match space key {key:?}"
                    )));
                }
                flatten_into(sub, sub_value, out)?;
            }
        }
        (Space::Tuple(spaces), SpaceValue::Tuple(values)) => {
            if spaces.len() != values.len() {
                return Err(SpaceError::InvalidValue(format!(
                    "Tuple value has {} entries, space has {}",
                    values.len(),
                    spaces.len()
                )));
            }
            for (sub, sub_value) in spaces.iter().zip(values) {
                flatten_into(sub, sub_value, out)?;
            }
        }
        (space, value) => {
            return Err(SpaceError::InvalidValue(format!(
                "{} value does not belong to a {} space",
                value.type_name(),
                space.type_name()
            )));
        }
    }
    Ok(())
}
