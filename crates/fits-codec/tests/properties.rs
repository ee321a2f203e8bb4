//! Property tests: sub-range reads against naive indexing, and parallelism
//! never changing a result.

use std::io::Cursor;

use fits_codec::header::serialize_header;
use fits_codec::primary::build_primary_header;
use fits_codec::{
    decode_bytes, encode_to_vec, scan_primary, AxisRange, CodecOptions, DataUnit, DecodeRequest,
    ElementKind, HeaderMetadata,
};
use proptest::prelude::*;

fn metadata_for(kind: ElementKind, shape: &[usize]) -> HeaderMetadata {
    let header = serialize_header(&build_primary_header(kind, shape, false));
    scan_primary(&mut Cursor::new(header)).unwrap()
}

/// Shape of rank 1 to 3 with small extents.
fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..9, 1..=3)
}

/// A shape plus one valid inclusive range per axis.
fn shape_and_ranges() -> impl Strategy<Value = (Vec<usize>, Vec<AxisRange>)> {
    shape_strategy().prop_flat_map(|shape| {
        let ranges: Vec<_> = shape
            .iter()
            .map(|&len| {
                (0..len)
                    .prop_flat_map(move |min| (Just(min), min..len))
                    .prop_map(|(min, max)| AxisRange::new(min, max))
            })
            .collect();
        (Just(shape), ranges)
    })
}

fn flat(coords: &[usize], shape: &[usize]) -> usize {
    let mut index = 0;
    let mut stride = 1;
    for (c, len) in coords.iter().zip(shape) {
        index += c * stride;
        stride *= len;
    }
    index
}

proptest! {
    #[test]
    fn sub_range_matches_naive_indexing((shape, ranges) in shape_and_ranges()) {
        let count: usize = shape.iter().product();
        let values: Vec<i32> = (0..count as i32).map(|v| v * 7 - 100).collect();
        let unit = DataUnit::from_vec(shape.clone(), values.clone()).unwrap();
        let bytes = encode_to_vec(&unit, ElementKind::I32, &CodecOptions::default()).unwrap();
        let meta = metadata_for(ElementKind::I32, &shape);

        let request = DecodeRequest::new().with_sub_range(ranges.clone());
        let out = decode_bytes(&bytes, &meta, &request, &CodecOptions::default()).unwrap();
        let out_shape: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
        prop_assert_eq!(out.shape(), &out_shape[..]);

        let got = out.as_slice::<i32>().unwrap();
        let mut expected = Vec::with_capacity(got.len());
        let mut coords: Vec<usize> = ranges.iter().map(|r| r.min).collect();
        'walk: loop {
            expected.push(values[flat(&coords, &shape)]);
            for (axis, range) in ranges.iter().enumerate() {
                if coords[axis] < range.max {
                    coords[axis] += 1;
                    continue 'walk;
                }
                coords[axis] = range.min;
            }
            break;
        }
        prop_assert_eq!(got, &expected[..]);
    }

    #[test]
    fn parallel_decode_matches_serial(
        (shape, ranges) in shape_and_ranges(),
        degree in 2usize..9,
        scaled in any::<bool>(),
    ) {
        let count: usize = shape.iter().product();
        let values: Vec<u16> = (0..count).map(|v| (v * 977 % 65536) as u16).collect();
        let unit = DataUnit::from_vec(shape.clone(), values).unwrap();
        let bytes = encode_to_vec(&unit, ElementKind::U16, &CodecOptions::default()).unwrap();
        let meta = metadata_for(ElementKind::U16, &shape);

        let mut request = DecodeRequest::new().with_sub_range(ranges);
        if scaled {
            request = request.with_target(ElementKind::F64);
        }
        let serial = decode_bytes(&bytes, &meta, &request, &CodecOptions::default()).unwrap();
        let parallel = CodecOptions::default().with_parallelism(degree);
        let threaded = decode_bytes(&bytes, &meta, &request, &parallel).unwrap();
        prop_assert_eq!(serial, threaded);
    }

    #[test]
    fn parallel_encode_matches_serial(
        shape in shape_strategy(),
        degree in 2usize..9,
        seed in any::<i64>(),
    ) {
        let count: usize = shape.iter().product();
        let values: Vec<f64> = (0..count as i64)
            .map(|v| (seed.wrapping_mul(v + 1) % 100_000) as f64 * 0.25)
            .collect();
        let unit = DataUnit::from_vec(shape, values).unwrap();
        for kind in [ElementKind::F32, ElementKind::I16, ElementKind::U32] {
            let serial = encode_to_vec(&unit, kind, &CodecOptions::default()).unwrap();
            let parallel = CodecOptions::default().with_parallelism(degree);
            let threaded = encode_to_vec(&unit, kind, &parallel).unwrap();
            prop_assert_eq!(serial, threaded);
        }
    }
}
