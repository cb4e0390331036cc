//! Space codec: `Space` <-> `wire::Space`.
//!
//! Encoding dispatches on the space variant, decoding on the populated wire
//! tag. Numeric payloads go through `crate::array::serialization` with the
//! caller's format, including inside nested Dict spaces.

use tracing::trace;

use super::{BinarySize, BoxSpace, DictSpace, Discrete, MultiBinary, MultiDiscrete, Space};
use crate::array::{NdArray, SerializationFormat, deserialize_ndarray, serialize_ndarray};
use crate::core::{Result, SpaceError};
use crate::wire::{self, SpaceKind};

/// Encode a space. Fails with `UnsupportedSpaceType` for variants the wire
/// schema cannot carry; nothing is returned for the partial tree in that case.
pub fn serialize_space(space: &Space, format: SerializationFormat) -> Result<wire::Space> {
    trace!(kind = space.type_name(), ?format, "serializing space");
    let kind = match space {
        Space::Discrete(d) => SpaceKind::Discrete(wire::Discrete { n: d.n(), start: d.start() }),
        Space::Box(b) => SpaceKind::Box(wire::BoxSpace {
            low: serialize_ndarray(b.low(), format),
            high: serialize_ndarray(b.high(), format),
        }),
        Space::MultiBinary(mb) => {
            let n = match mb.size() {
                BinarySize::Shape(size) => serialize_ndarray(size, format),
                BinarySize::Scalar(n) => serialize_ndarray(&NdArray::from(vec![*n]), format),
            };
            SpaceKind::MultiBinary(wire::MultiBinary { n })
        }
        Space::MultiDiscrete(md) => SpaceKind::MultiDiscrete(wire::MultiDiscrete {
            nvec: serialize_ndarray(md.nvec(), format),
        }),
        Space::Dict(dict) => {
            let spaces = dict
                .iter()
                .map(|(key, sub)| {
                    Ok(wire::SubSpace { key: key.to_string(), space: serialize_space(sub, format)? })
                })
                .collect::<Result<Vec<_>>>()?;
            SpaceKind::Dict(wire::Dict { spaces })
        }
        other => return Err(SpaceError::UnsupportedSpaceType(other.type_name().to_string())),
    };
    Ok(wire::Space::new(kind))
}

/// Decode a space from its populated wire tag.
pub fn deserialize_space(space: &wire::Space) -> Result<Space> {
    let Some(kind) = &space.kind else {
        return Err(SpaceError::UnsupportedSpaceType("<empty>".into()));
    };
    trace!(tag = kind.tag(), "deserializing space");
    match kind {
        SpaceKind::Discrete(d) => {
            if d.n <= 0 {
                return Err(SpaceError::InvalidSpace(format!("Discrete requires n > 0, got {}", d.n)));
            }
            Ok(Discrete::with_start(d.n, d.start).into())
        }
        SpaceKind::Box(b) => {
            let low = deserialize_ndarray(&b.low)?;
            let high = deserialize_ndarray(&b.high)?;
            Ok(BoxSpace::new(low, high)?.into())
        }
        SpaceKind::MultiBinary(mb) => {
            let size = deserialize_ndarray(&mb.n)?;
            if size.len() > 1 {
                return Ok(MultiBinary::with_shape(size)?.into());
            }
            let n = size
                .to_i64_vec()
                .and_then(|v| v.first().copied())
                .and_then(|n| i32::try_from(n).ok())
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    SpaceError::InvalidSpace(format!(
                        "MultiBinary size must hold a positive integer, got {:?} ({})",
                        size.to_f64_vec(),
                        size.dtype()
                    ))
                })?;
            Ok(MultiBinary::new(n).into())
        }
        SpaceKind::MultiDiscrete(md) => {
            Ok(MultiDiscrete::from_nvec(deserialize_ndarray(&md.nvec)?)?.into())
        }
        SpaceKind::Dict(d) => {
            let mut dict = DictSpace::new();
            for sub in &d.spaces {
                dict.insert(sub.key.clone(), deserialize_space(&sub.space)?)?;
            }
            Ok(dict.into())
        }
    }
}

/// Encode a space straight to its JSON wire bytes.
pub fn encode_json(space: &Space, format: SerializationFormat) -> Result<Vec<u8>> {
    serialize_space(space, format)?.to_json_vec()
}

/// Decode a space from JSON wire bytes.
pub fn decode_json(bytes: &[u8]) -> Result<Space> {
    deserialize_space(&wire::Space::from_json_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::DType;
    use ndarray::{ArrayD, IxDyn};

    const FORMATS: [SerializationFormat; 2] = [SerializationFormat::Structured, SerializationFormat::Raw];

    fn round_trip(space: &Space, format: SerializationFormat) -> Space {
        deserialize_space(&serialize_space(space, format).expect("encode")).expect("decode")
    }

    #[test]
    fn discrete_round_trip() {
        let space = Space::from(Discrete::new(5));
        let wire = serialize_space(&space, SerializationFormat::Structured).unwrap();
        assert_eq!(wire.kind, Some(SpaceKind::Discrete(wire::Discrete { n: 5, start: 0 })));
        match round_trip(&space, SerializationFormat::Raw) {
            Space::Discrete(d) => {
                assert_eq!(d.n(), 5);
                assert_eq!(d.start(), 0);
            }
            other => panic!("expected Discrete, got {other:?}"),
        }
    }

    #[test]
    fn box_takes_shape_and_dtype_from_low() {
        let low = NdArray::from(ArrayD::from_elem(IxDyn(&[2, 3]), -1.0f64));
        let high = NdArray::from(ArrayD::from_elem(IxDyn(&[2, 3]), 2.0f64));
        let space = Space::from(BoxSpace::new(low, high).unwrap());
        for format in FORMATS {
            match round_trip(&space, format) {
                Space::Box(b) => {
                    assert_eq!(b.shape(), &[2, 3]);
                    assert_eq!(b.dtype(), DType::Float64);
                    assert_eq!(Space::Box(b), space);
                }
                other => panic!("expected Box, got {other:?}"),
            }
        }
    }

    #[test]
    fn box_with_mismatched_high_is_rejected_on_decode() {
        let wire = wire::Space::new(SpaceKind::Box(wire::BoxSpace {
            low: serialize_ndarray(&NdArray::from(vec![0.0f32, 0.0]), SerializationFormat::Structured),
            high: serialize_ndarray(&NdArray::from(vec![1.0f32]), SerializationFormat::Structured),
        }));
        assert!(matches!(deserialize_space(&wire), Err(SpaceError::BoundsMismatch(_))));
    }

    #[test]
    fn multi_binary_scalar_stays_scalar() {
        let space = Space::from(MultiBinary::new(5));
        let wire = serialize_space(&space, SerializationFormat::Structured).unwrap();
        match &wire.kind {
            Some(SpaceKind::MultiBinary(mb)) => {
                assert_eq!(mb.n.dtype, Some(DType::Int32));
                assert_eq!(mb.n.shape, vec![1]);
                assert_eq!(mb.n.int32_data, vec![5]);
            }
            other => panic!("expected multi_binary, got {other:?}"),
        }
        for format in FORMATS {
            match round_trip(&space, format) {
                Space::MultiBinary(mb) => assert_eq!(mb.size(), &BinarySize::Scalar(5)),
                other => panic!("expected MultiBinary, got {other:?}"),
            }
        }
    }

    #[test]
    fn multi_binary_shape_stays_shaped() {
        let space = Space::from(MultiBinary::from_dims(&[3, 2]).unwrap());
        for format in FORMATS {
            let back = round_trip(&space, format);
            assert_eq!(back, space);
            match back {
                Space::MultiBinary(mb) => assert_eq!(mb.dims(), vec![3, 2]),
                other => panic!("expected MultiBinary, got {other:?}"),
            }
        }
    }

    #[test]
    fn one_element_shape_collapses_to_scalar() {
        let space = Space::from(MultiBinary::with_shape(NdArray::from(vec![4i64])).unwrap());
        match round_trip(&space, SerializationFormat::Structured) {
            Space::MultiBinary(mb) => {
                assert_eq!(mb.size(), &BinarySize::Scalar(4));
                assert_eq!(mb.dims(), vec![4]);
            }
            other => panic!("expected MultiBinary, got {other:?}"),
        }
    }

    #[test]
    fn multi_binary_with_empty_or_float_size_is_rejected() {
        let empty = wire::Space::new(SpaceKind::MultiBinary(wire::MultiBinary {
            n: serialize_ndarray(&NdArray::from(Vec::<i32>::new()), SerializationFormat::Structured),
        }));
        assert!(matches!(deserialize_space(&empty), Err(SpaceError::InvalidSpace(_))));

        let float = wire::Space::new(SpaceKind::MultiBinary(wire::MultiBinary {
            n: serialize_ndarray(&NdArray::from(vec![3.0f32]), SerializationFormat::Structured),
        }));
        assert!(matches!(deserialize_space(&float), Err(SpaceError::InvalidSpace(_))));
    }

    #[test]
    fn multi_discrete_keeps_dtype() {
        let nvec = NdArray::from(ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![2u8, 3, 4, 5]).unwrap());
        let space = Space::from(MultiDiscrete::from_nvec(nvec).unwrap());
        for format in FORMATS {
            assert_eq!(round_trip(&space, format), space);
        }
    }

    #[test]
    fn dict_preserves_keys_order_and_contents() {
        let space = Space::from(
            DictSpace::from_entries([
                ("a", Space::from(Discrete::new(2))),
                (
                    "b",
                    Space::from(
                        BoxSpace::new(NdArray::from(vec![0.0f32]), NdArray::from(vec![1.0f32])).unwrap(),
                    ),
                ),
            ])
            .unwrap(),
        );
        for format in FORMATS {
            let back = round_trip(&space, format);
            assert_eq!(back, space);
            match back {
                Space::Dict(d) => assert_eq!(d.keys().collect::<Vec<_>>(), vec!["a", "b"]),
                other => panic!("expected Dict, got {other:?}"),
            }
        }
    }

    #[test]
    fn nested_dict_uses_the_selected_format() {
        let inner = DictSpace::from_entries([("pos", Space::from(BoxSpace::uniform(&[2], 0.0, 1.0)))]).unwrap();
        let outer = Space::from(DictSpace::from_entries([("inner", Space::from(inner))]).unwrap());
        let wire = serialize_space(&outer, SerializationFormat::Raw).unwrap();
        let Some(SpaceKind::Dict(d)) = &wire.kind else { panic!("expected dict") };
        let Some(SpaceKind::Dict(inner)) = &d.spaces[0].space.kind else { panic!("expected dict") };
        let Some(SpaceKind::Box(b)) = &inner.spaces[0].space.kind else { panic!("expected box") };
        assert_eq!(b.low.raw_data.len(), 8);
        assert!(b.low.double_data.is_empty());
    }

    #[test]
    fn tuple_is_unsupported() {
        let space = Space::Tuple(vec![Discrete::new(2).into()]);
        let err = serialize_space(&space, SerializationFormat::Structured).unwrap_err();
        assert!(matches!(err, SpaceError::UnsupportedSpaceType(name) if name == "Tuple"));
    }

    #[test]
    fn tuple_inside_dict_fails_the_whole_encode() {
        let space = Space::from(
            DictSpace::from_entries([
                ("ok", Space::from(Discrete::new(2))),
                ("bad", Space::Tuple(vec![])),
            ])
            .unwrap(),
        );
        assert!(matches!(
            serialize_space(&space, SerializationFormat::Raw),
            Err(SpaceError::UnsupportedSpaceType(_))
        ));
    }

    #[test]
    fn empty_tag_is_unsupported() {
        let err = deserialize_space(&wire::Space::default()).unwrap_err();
        assert!(matches!(err, SpaceError::UnsupportedSpaceType(tag) if tag == "<empty>"));
    }

    #[test]
    fn duplicate_dict_keys_on_the_wire_are_rejected() {
        let sub = wire::Space::new(SpaceKind::Discrete(wire::Discrete { n: 2, start: 0 }));
        let wire = wire::Space::new(SpaceKind::Dict(wire::Dict {
            spaces: vec![
                wire::SubSpace { key: "x".into(), space: sub.clone() },
                wire::SubSpace { key: "x".into(), space: sub },
            ],
        }));
        assert!(matches!(deserialize_space(&wire), Err(SpaceError::DuplicateKey(_))));
    }

    #[test]
    fn json_helpers_round_trip_deep_dicts() {
        let mut space = Space::from(Discrete::new(2));
        for _ in 0..64 {
            space = Space::from(DictSpace::from_entries([("inner", space)]).unwrap());
        }
        for format in FORMATS {
            let bytes = encode_json(&space, format).unwrap();
            assert_eq!(decode_json(&bytes).unwrap(), space);
        }
    }

    #[test]
    fn json_helpers_round_trip_infinite_bounds() {
        let space = Space::from(
            BoxSpace::new(
                NdArray::from(vec![f32::NEG_INFINITY, 0.0]),
                NdArray::from(vec![f32::INFINITY, 1.0]),
            )
            .unwrap(),
        );
        for format in FORMATS {
            let bytes = encode_json(&space, format).unwrap();
            assert_eq!(decode_json(&bytes).unwrap(), space);
        }
    }
}
