//! In-memory space descriptions and their elements.
//!
//! `Space` is a closed tagged union over the space types the wire schema knows
//! (Discrete, Box, MultiBinary, MultiDiscrete, Dict) plus `Tuple`, which can be
//! sampled and flattened but has no wire representation.

pub mod serialization;
pub mod space;
pub mod utils;

use ndarray::{ArrayD, IxDyn, Zip};
use rand::Rng;
use rand::distributions::{Distribution, Uniform};

use crate::array::NdArray;
use crate::core::{Result, SpaceError};

pub use serialization::{decode_json, deserialize_space, encode_json, serialize_space};
pub use space::Domain;
pub use utils::{flatdim, flatten};

/// A discrete space of integers in [start, start + n).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discrete {
    n: i64,
    start: i64,
}

impl Discrete {
    pub fn new(n: i64) -> Self { Self::with_start(n, 0) }

    pub fn with_start(n: i64, start: i64) -> Self {
        assert!(n > 0, "Discrete space requires n > 0");
        Self { n, start }
    }

    pub fn n(&self) -> i64 { self.n }
    pub fn start(&self) -> i64 { self.start }
}

impl Domain for Discrete {
    type Element = i64;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        if self.n == 1 { return self.start; }
        self.start + Uniform::from(0..self.n).sample(rng)
    }

    fn contains(&self, elem: &Self::Element) -> bool {
        elem.checked_sub(self.start).is_some_and(|offset| (0..self.n).contains(&offset))
    }
}

/// A continuous (or integer) array space bounded element-wise by `low` and `high`.
/// Shape and dtype are those of `low`.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxSpace {
    low: NdArray,
    high: NdArray,
}

impl BoxSpace {
    /// Both bounds must share shape and dtype. `low <= high` is the caller's concern.
    pub fn new(low: NdArray, high: NdArray) -> Result<Self> {
        if low.dtype() != high.dtype() {
            return Err(SpaceError::BoundsMismatch(format!(
                "low is {} but high is {}",
                low.dtype(),
                high.dtype()
            )));
        }
        if low.shape() != high.shape() {
            return Err(SpaceError::BoundsMismatch(format!(
                "low has shape {:?} but high has shape {:?}",
                low.shape(),
                high.shape()
            )));
        }
        Ok(Self { low, high })
    }

    /// A float32 box with the same bounds for every element.
    pub fn uniform(shape: &[usize], low: f32, high: f32) -> Self {
        Self {
            low: NdArray::Float32(ArrayD::from_elem(IxDyn(shape), low)),
            high: NdArray::Float32(ArrayD::from_elem(IxDyn(shape), high)),
        }
    }

    pub fn low(&self) -> &NdArray { &self.low }
    pub fn high(&self) -> &NdArray { &self.high }
    pub fn shape(&self) -> &[usize] { self.low.shape() }
    pub fn dtype(&self) -> crate::array::DType { self.low.dtype() }
}

fn exponential<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u: f64 = rng.gen_range(0.0..1.0);
    -(1.0 - u).ln()
}

fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // Box-Muller
    let u1 = 1.0 - rng.gen_range(0.0..1.0f64);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Uniform in [low, high] for finite bounds whose span is too wide for `gen_range`.
fn sample_wide<R: Rng + ?Sized>(low: f64, high: f64, rng: &mut R) -> f64 {
    let u: f64 = rng.gen_range(0.0..=1.0);
    let half = low / 2.0 + (high / 2.0 - low / 2.0) * u;
    (half * 2.0).clamp(low, high)
}

fn sample_real<R: Rng + ?Sized>(low: f64, high: f64, rng: &mut R) -> f64 {
    match (low.is_finite(), high.is_finite()) {
        (true, true) if low < high && high - low < f64::MAX / 2.0 => rng.gen_range(low..=high),
        (true, true) if low < high => sample_wide(low, high, rng),
        (true, true) => low,
        (true, false) => low + exponential(rng),
        (false, true) => high - exponential(rng),
        (false, false) => standard_normal(rng),
    }
}

fn sample_integer<R: Rng + ?Sized>(low: i64, high: i64, rng: &mut R) -> i64 {
    if low < high { rng.gen_range(low..=high) } else { low }
}

impl Domain for BoxSpace {
    type Element = NdArray;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        macro_rules! real {
            ($l:expr, $h:expr, $t:ty) => {
                Zip::from($l)
                    .and($h)
                    .map_collect(|&l, &h| sample_real(f64::from(l), f64::from(h), rng) as $t)
            };
        }
        macro_rules! integer {
            ($l:expr, $h:expr, $t:ty) => {
                Zip::from($l)
                    .and($h)
                    .map_collect(|&l, &h| sample_integer(i64::from(l), i64::from(h), rng) as $t)
            };
        }
        match (&self.low, &self.high) {
            (NdArray::Float32(l), NdArray::Float32(h)) => NdArray::Float32(real!(l, h, f32)),
            (NdArray::Float64(l), NdArray::Float64(h)) => NdArray::Float64(real!(l, h, f64)),
            (NdArray::Int8(l), NdArray::Int8(h)) => NdArray::Int8(integer!(l, h, i8)),
            (NdArray::Int32(l), NdArray::Int32(h)) => NdArray::Int32(integer!(l, h, i32)),
            (NdArray::Int64(l), NdArray::Int64(h)) => NdArray::Int64(integer!(l, h, i64)),
            (NdArray::Uint8(l), NdArray::Uint8(h)) => NdArray::Uint8(integer!(l, h, u8)),
            // bounds share a dtype by construction
            _ => self.low.clone(),
        }
    }

    fn contains(&self, elem: &Self::Element) -> bool {
        macro_rules! within {
            ($l:expr, $h:expr, $v:expr) => {
                $v.shape() == $l.shape()
                    && Zip::from($l).and($h).and($v).all(|&l, &h, &v| l <= v && v <= h)
            };
        }
        match (&self.low, &self.high, elem) {
            (NdArray::Float32(l), NdArray::Float32(h), NdArray::Float32(v)) => within!(l, h, v),
            (NdArray::Float64(l), NdArray::Float64(h), NdArray::Float64(v)) => within!(l, h, v),
            (NdArray::Int8(l), NdArray::Int8(h), NdArray::Int8(v)) => within!(l, h, v),
            (NdArray::Int32(l), NdArray::Int32(h), NdArray::Int32(v)) => within!(l, h, v),
            (NdArray::Int64(l), NdArray::Int64(h), NdArray::Int64(v)) => within!(l, h, v),
            (NdArray::Uint8(l), NdArray::Uint8(h), NdArray::Uint8(v)) => within!(l, h, v),
            _ => false,
        }
    }
}

/// Size of a MultiBinary space: a plain count, or an integer array giving a
/// multi-dimensional shape.
///
/// A one-element `Shape` is semantically the same as `Scalar` and decodes back
/// as `Scalar`.
#[derive(Clone, Debug, PartialEq)]
pub enum BinarySize {
    Scalar(i32),
    Shape(NdArray),
}

/// A space of binary arrays whose shape is given by its size.
/// Elements are arrays of 0/1 values (i8).
#[derive(Clone, Debug, PartialEq)]
pub struct MultiBinary {
    n: BinarySize,
}

impl MultiBinary {
    pub fn new(n: i32) -> Self {
        assert!(n > 0, "MultiBinary requires n > 0");
        Self { n: BinarySize::Scalar(n) }
    }

    /// Multi-dimensional size given as an integer array, kept as-is.
    pub fn with_shape(size: NdArray) -> Result<Self> {
        let dims = size.to_i64_vec().ok_or_else(|| {
            SpaceError::InvalidSpace(format!(
                "MultiBinary size must be an integer array, got {}",
                size.dtype()
            ))
        })?;
        if dims.is_empty() || dims.iter().any(|&d| d <= 0) {
            return Err(SpaceError::InvalidSpace(format!(
                "MultiBinary size must be non-empty and positive, got {dims:?}"
            )));
        }
        Ok(Self { n: BinarySize::Shape(size) })
    }

    /// Size given as plain dimensions, stored as an int32 array.
    pub fn from_dims(dims: &[usize]) -> Result<Self> {
        let size = dims
            .iter()
            .map(|&d| {
                i32::try_from(d).map_err(|_| {
                    SpaceError::InvalidSpace(format!("MultiBinary dimension {d} exceeds int32"))
                })
            })
            .collect::<Result<Vec<i32>>>()?;
        Self::with_shape(NdArray::from(size))
    }

    pub fn size(&self) -> &BinarySize { &self.n }

    /// Shape of the elements of this space.
    pub fn dims(&self) -> Vec<usize> {
        match &self.n {
            BinarySize::Scalar(n) => vec![*n as usize],
            BinarySize::Shape(size) => size
                .to_i64_vec()
                .unwrap_or_default()
                .into_iter()
                .map(|d| d as usize)
                .collect(),
        }
    }
}

impl Domain for MultiBinary {
    type Element = ArrayD<i8>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        ArrayD::from_shape_fn(IxDyn(&self.dims()), |_| rng.gen_range(0..=1i8))
    }

    fn contains(&self, elem: &Self::Element) -> bool {
        elem.shape() == self.dims().as_slice() && elem.iter().all(|&v| v == 0 || v == 1)
    }
}

/// Independent discrete ranges, one per element of `nvec` (values in [0, nvec[i])).
#[derive(Clone, Debug, PartialEq)]
pub struct MultiDiscrete {
    nvec: NdArray,
}

impl MultiDiscrete {
    pub fn new<I: Into<Vec<i64>>>(nvec: I) -> Self {
        let nvec = nvec.into();
        assert!(!nvec.is_empty(), "MultiDiscrete requires at least one dimension");
        for (i, &n) in nvec.iter().enumerate() {
            assert!(n > 0, "MultiDiscrete nvec[{i}] must be > 0");
        }
        Self { nvec: NdArray::from(nvec) }
    }

    /// Counts given as an integer array of any shape and integer dtype.
    pub fn from_nvec(nvec: NdArray) -> Result<Self> {
        let counts = nvec.to_i64_vec().ok_or_else(|| {
            SpaceError::InvalidSpace(format!(
                "MultiDiscrete nvec must be an integer array, got {}",
                nvec.dtype()
            ))
        })?;
        if counts.is_empty() || counts.iter().any(|&n| n <= 0) {
            return Err(SpaceError::InvalidSpace(format!(
                "MultiDiscrete nvec must be non-empty and positive, got {counts:?}"
            )));
        }
        Ok(Self { nvec })
    }

    pub fn nvec(&self) -> &NdArray { &self.nvec }

    /// `nvec` widened to i64.
    pub fn counts(&self) -> ArrayD<i64> { self.nvec.to_i64_array().unwrap_or_default() }
}

impl Domain for MultiDiscrete {
    type Element = ArrayD<i64>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        self.counts().mapv(|n| if n == 1 { 0 } else { rng.gen_range(0..n) })
    }

    fn contains(&self, elem: &Self::Element) -> bool {
        let counts = self.counts();
        elem.shape() == counts.shape() && Zip::from(elem).and(&counts).all(|&v, &n| 0 <= v && v < n)
    }
}

/// A named composite of sub-spaces. Keys are unique and keep insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DictSpace {
    entries: Vec<(String, Space)>,
}

impl DictSpace {
    pub fn new() -> Self { Self::default() }

    pub fn from_entries<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Space)>,
        K: Into<String>,
    {
        let mut dict = Self::new();
        for (key, space) in entries {
            dict.insert(key, space)?;
        }
        Ok(dict)
    }

    /// Append a sub-space. Fails if the key is already present.
    pub fn insert<K: Into<String>>(&mut self, key: K, space: Space) -> Result<()> {
        let key = key.into();
        if self.get(&key).is_some() {
            return Err(SpaceError::DuplicateKey(key));
        }
        self.entries.push((key, space));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Space> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Space)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl Domain for DictSpace {
    type Element = Vec<(String, SpaceValue)>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        self.entries
            .iter()
            .map(|(key, space)| (key.clone(), space.sample(rng)))
            .collect()
    }

    fn contains(&self, elem: &Self::Element) -> bool {
        elem.len() == self.entries.len()
            && self
                .entries
                .iter()
                .zip(elem)
                .all(|((key, space), (k, v))| key == k && space.contains(v))
    }
}

/// Description of the shape and domain of an observation or action.
#[derive(Clone, Debug, PartialEq)]
pub enum Space {
    Discrete(Discrete),
    Box(BoxSpace),
    MultiBinary(MultiBinary),
    MultiDiscrete(MultiDiscrete),
    Dict(DictSpace),
    /// Ordered composite without keys. Has no wire representation.
    Tuple(Vec<Space>),
}

impl Space {
    pub fn type_name(&self) -> &'static str {
        match self {
            Space::Discrete(_) => "Discrete",
            Space::Box(_) => "Box",
            Space::MultiBinary(_) => "MultiBinary",
            Space::MultiDiscrete(_) => "MultiDiscrete",
            Space::Dict(_) => "Dict",
            Space::Tuple(_) => "Tuple",
        }
    }
}

impl From<Discrete> for Space { fn from(s: Discrete) -> Self { Space::Discrete(s) } }
impl From<BoxSpace> for Space { fn from(s: BoxSpace) -> Self { Space::Box(s) } }
impl From<MultiBinary> for Space { fn from(s: MultiBinary) -> Self { Space::MultiBinary(s) } }
impl From<MultiDiscrete> for Space { fn from(s: MultiDiscrete) -> Self { Space::MultiDiscrete(s) } }
impl From<DictSpace> for Space { fn from(s: DictSpace) -> Self { Space::Dict(s) } }

/// An element of a `Space`.
#[derive(Clone, Debug, PartialEq)]
pub enum SpaceValue {
    Discrete(i64),
    Box(NdArray),
    MultiBinary(ArrayD<i8>),
    MultiDiscrete(ArrayD<i64>),
    Dict(Vec<(String, SpaceValue)>),
    Tuple(Vec<SpaceValue>),
}

impl SpaceValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SpaceValue::Discrete(_) => "Discrete",
            SpaceValue::Box(_) => "Box",
            SpaceValue::MultiBinary(_) => "MultiBinary",
            SpaceValue::MultiDiscrete(_) => "MultiDiscrete",
            SpaceValue::Dict(_) => "Dict",
            SpaceValue::Tuple(_) => "Tuple",
        }
    }
}

impl Domain for Space {
    type Element = SpaceValue;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        match self {
            Space::Discrete(s) => SpaceValue::Discrete(s.sample(rng)),
            Space::Box(s) => SpaceValue::Box(s.sample(rng)),
            Space::MultiBinary(s) => SpaceValue::MultiBinary(s.sample(rng)),
            Space::MultiDiscrete(s) => SpaceValue::MultiDiscrete(s.sample(rng)),
            Space::Dict(s) => SpaceValue::Dict(s.sample(rng)),
            Space::Tuple(spaces) => SpaceValue::Tuple(spaces.iter().map(|s| s.sample(rng)).collect()),
        }
    }

    fn contains(&self, elem: &Self::Element) -> bool {
        match (self, elem) {
            (Space::Discrete(s), SpaceValue::Discrete(v)) => s.contains(v),
            (Space::Box(s), SpaceValue::Box(v)) => s.contains(v),
            (Space::MultiBinary(s), SpaceValue::MultiBinary(v)) => s.contains(v),
            (Space::MultiDiscrete(s), SpaceValue::MultiDiscrete(v)) => s.contains(v),
            (Space::Dict(s), SpaceValue::Dict(v)) => s.contains(v),
            (Space::Tuple(spaces), SpaceValue::Tuple(values)) => {
                spaces.len() == values.len()
                    && spaces.iter().zip(values).all(|(s, v)| s.contains(v))
            }
            _ => false,
        }
    }
}
