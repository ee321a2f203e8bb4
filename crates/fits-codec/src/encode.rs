//! Data-unit encoding: typed arrays to padded big-endian disk bytes.

use std::io::Write;

use tracing::debug;

use crate::block::{padded_byte_len, DATA_PAD_BYTE};
use crate::data::{with_elements, DataUnit, Element};
use crate::endian::DiskSample;
use crate::error::{Error, Result};
use crate::partition::for_each_line_batch;
use crate::precision::{to_disk, DiskFormat, ElementKind};
use crate::progress::{CodecOptions, ProgressTracker};

/// How a physical value becomes a raw disk value.
#[derive(Debug, Clone, Copy)]
enum Encoding {
    /// Boolean precision: 1 for any nonzero value, 0 otherwise.
    Flag,
    /// Integer disk type, `BSCALE = 1`, integral `BZERO`.
    Exact(i128),
    Real { scale: f64, offset: f64 },
}

impl Encoding {
    fn new(precision: ElementKind, format: &DiskFormat) -> Self {
        if precision == ElementKind::Bool {
            Encoding::Flag
        } else if format.bitpix > 0 && format.scale == 1.0 && format.offset.fract() == 0.0 {
            Encoding::Exact(format.offset as i128)
        } else {
            Encoding::Real {
                scale: format.scale,
                offset: format.offset,
            }
        }
    }

    #[inline]
    fn apply<T: Element, D: DiskSample>(self, value: T) -> D {
        match self {
            Encoding::Flag => D::from_exact(i128::from(value.physical() != 0.0)),
            Encoding::Exact(offset) => match value.exact() {
                Some(v) => D::from_exact(v - offset),
                None => D::from_f64(value.physical() - offset as f64),
            },
            Encoding::Real { scale, offset } => D::from_f64((value.physical() - offset) / scale),
        }
    }
}

/// Encode `unit` at `precision` into a new buffer, zero-padded to whole
/// blocks.
///
/// The disk layout comes from [`to_disk`]: each element is stored as
/// `round((value - BZERO) / BSCALE)` for integer precisions, saturating at
/// the bounds of the disk type.
pub fn encode_to_vec(
    unit: &DataUnit,
    precision: ElementKind,
    options: &CodecOptions,
) -> Result<Vec<u8>> {
    let format = to_disk(precision);
    let width = format.bytes_per_element()?;
    let data_len = unit
        .len()
        .checked_mul(width)
        .ok_or(Error::InvalidValue("data unit too large for this platform"))?;
    let padded = usize::try_from(padded_byte_len(data_len as u64))
        .map_err(|_| Error::InvalidValue("data unit too large for this platform"))?;
    debug!(
        source = ?unit.kind(),
        ?precision,
        shape = ?unit.shape(),
        bytes = padded,
        "encoding data unit"
    );

    let mut buf = vec![DATA_PAD_BYTE; padded];
    let row_len = unit.shape().first().copied().unwrap_or(1);
    let encoding = Encoding::new(precision, &format);
    let out = &mut buf[..data_len];
    with_elements!(unit.data(), values => {
        encode_values(values, out, row_len, encoding, format.bitpix, options)
    })?;
    Ok(buf)
}

/// Encode `unit` at `precision` and write it, padding included, to `sink`.
///
/// Returns the number of bytes written, always a multiple of 2880.
pub fn encode<W: Write + ?Sized>(
    sink: &mut W,
    unit: &DataUnit,
    precision: ElementKind,
    options: &CodecOptions,
) -> Result<u64> {
    let bytes = encode_to_vec(unit, precision, options)?;
    sink.write_all(&bytes)?;
    Ok(bytes.len() as u64)
}

fn encode_values<T: Element>(
    values: &[T],
    out: &mut [u8],
    row_len: usize,
    encoding: Encoding,
    bitpix: i64,
    options: &CodecOptions,
) -> Result<()> {
    match bitpix {
        8 => encode_disk::<T, u8>(values, out, row_len, encoding, options),
        16 => encode_disk::<T, i16>(values, out, row_len, encoding, options),
        32 => encode_disk::<T, i32>(values, out, row_len, encoding, options),
        64 => encode_disk::<T, i64>(values, out, row_len, encoding, options),
        -32 => encode_disk::<T, f32>(values, out, row_len, encoding, options),
        -64 => encode_disk::<T, f64>(values, out, row_len, encoding, options),
        other => return Err(Error::UnsupportedBitpix(other)),
    }
    Ok(())
}

fn encode_disk<T: Element, D: DiskSample>(
    values: &[T],
    out: &mut [u8],
    row_len: usize,
    encoding: Encoding,
    options: &CodecOptions,
) {
    let line_bytes = row_len * D::BYTES;
    let row_count = if row_len == 0 { 0 } else { values.len() / row_len };
    let tracker = ProgressTracker::new(options, "encoding data unit", row_count);
    tracker.start();

    for_each_line_batch(
        out,
        line_bytes,
        options.effective_parallelism(),
        &tracker,
        |first_row, bytes| {
            let start = first_row * row_len;
            let count = bytes.len() / D::BYTES;
            for (chunk, &value) in bytes
                .chunks_exact_mut(D::BYTES)
                .zip(&values[start..start + count])
            {
                encoding.apply::<T, D>(value).write_be(chunk);
            }
        },
    );
    tracker.finish();
}
