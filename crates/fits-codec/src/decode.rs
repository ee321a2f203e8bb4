//! Data-unit decoding: big-endian disk bytes to typed arrays.
//!
//! The whole on-disk unit is read first, then only the requested
//! rectangular sub-volume is walked. Every element goes through
//! `raw * BSCALE + BZERO` and is then narrowed or widened to the target
//! kind. When the disk data is integral and `BSCALE = 1` with an integral
//! `BZERO`, the sum is carried out exactly in `i128` so that 64-bit biased
//! values survive untouched.

use std::io::{self, Read};

use tracing::debug;

use crate::data::{with_kind, DataUnit, Element, ElementData};
use crate::endian::{decode_contiguous, DiskSample};
use crate::error::{Error, Result};
use crate::partition::for_each_line_batch;
use crate::precision::{bytes_per_element, to_runtime, DiskFormat, ElementKind};
use crate::progress::{CodecOptions, ProgressTracker};
use crate::scanner::HeaderMetadata;

/// Zero-based inclusive index range along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: usize,
    pub max: usize,
}

impl AxisRange {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// A single index.
    pub fn at(index: usize) -> Self {
        Self::new(index, index)
    }

    /// Number of selected indices, 0 when `min > max`.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.max - self.min + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

/// How the decoded elements are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputShape {
    /// Same rank as on disk, each axis sized by its sub-range.
    #[default]
    NativeRank,
    /// Rank-1 data wrapped as shape `[N, 1]`.
    VectorAsHorizontalTable,
    /// Rank-1 data wrapped as shape `[1, N]`.
    VectorAsVerticalTable,
    /// Axes whose selected extent is 1 are dropped.
    RangeAdaptiveRank,
    /// Rank 1 over the full on-disk extent, for any on-disk rank.
    FlattenedVector,
}

/// The in-memory element kind to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetKind {
    /// Whatever the on-disk `(BITPIX, BSCALE, BZERO)` maps to.
    #[default]
    Native,
    /// A specific kind, e.g. always `F64`.
    Forced(ElementKind),
}

/// Everything a decode needs besides the header and the bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeRequest {
    /// One range per on-disk axis; `None` selects the full extent.
    pub sub_range: Option<Vec<AxisRange>>,
    pub shape: OutputShape,
    pub target: TargetKind,
}

impl DecodeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sub_range(mut self, ranges: Vec<AxisRange>) -> Self {
        self.sub_range = Some(ranges);
        self
    }

    pub fn with_shape(mut self, shape: OutputShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_target(mut self, kind: ElementKind) -> Self {
        self.target = TargetKind::Forced(kind);
        self
    }
}

/// Validated geometry of one decode, normalized to three axes.
#[derive(Debug, Clone)]
struct Plan {
    format: DiskFormat,
    target: ElementKind,
    disk_shape: [usize; 3],
    start: [usize; 3],
    extent: [usize; 3],
    output_shape: Vec<usize>,
    raw_len: usize,
}

impl Plan {
    fn is_full_extent(&self) -> bool {
        self.start == [0; 3] && self.extent == self.disk_shape
    }
}

fn plan(metadata: &HeaderMetadata, request: &DecodeRequest) -> Result<Plan> {
    let rank = metadata.rank();
    if rank == 0 {
        return Err(Error::UnsupportedRank(0));
    }
    let format = metadata.disk_format();
    let width = bytes_per_element(format.bitpix)?;

    let target = match request.target {
        TargetKind::Native => to_runtime(format.bitpix, format.scale, format.offset)?,
        TargetKind::Forced(kind) => kind,
    };
    if target == ElementKind::Bool && !(format.bitpix == 8 && format.offset == 0.0) {
        return Err(Error::PrecisionMismatch {
            requested: target,
            bitpix: format.bitpix,
            offset: format.offset,
        });
    }

    let count = usize::try_from(metadata.sizes()?.element_count)
        .map_err(|_| Error::InvalidValue("data unit too large for this platform"))?;
    let raw_len = count
        .checked_mul(width)
        .ok_or(Error::InvalidValue("data unit too large for this platform"))?;

    if request.shape == OutputShape::FlattenedVector {
        if request.sub_range.is_some() {
            return Err(Error::range(
                "sub-ranges are not accepted with a flattened output",
            ));
        }
        return Ok(Plan {
            format,
            target,
            disk_shape: [count, 1, 1],
            start: [0; 3],
            extent: [count, 1, 1],
            output_shape: vec![count],
            raw_len,
        });
    }

    if rank > 3 {
        return Err(Error::UnsupportedRank(rank));
    }
    let is_vector_policy = matches!(
        request.shape,
        OutputShape::VectorAsHorizontalTable | OutputShape::VectorAsVerticalTable
    );
    if is_vector_policy && rank != 1 {
        return Err(Error::UnsupportedRank(rank));
    }

    let mut disk_shape = [1usize; 3];
    disk_shape[..rank].copy_from_slice(&metadata.axis_lengths);
    let mut start = [0usize; 3];
    let mut extent = disk_shape;

    if let Some(ranges) = &request.sub_range {
        if ranges.len() != rank {
            return Err(Error::range(format!(
                "{} ranges given for {rank} axes",
                ranges.len()
            )));
        }
        for (axis, (range, &len)) in ranges.iter().zip(&metadata.axis_lengths).enumerate() {
            if range.min > range.max {
                return Err(Error::range(format!(
                    "axis {axis}: min {} > max {}",
                    range.min, range.max
                )));
            }
            if range.max >= len {
                return Err(Error::range(format!(
                    "axis {axis}: max {} >= length {len}",
                    range.max
                )));
            }
            start[axis] = range.min;
            extent[axis] = range.len();
        }
    }

    let selected = &extent[..rank];
    let output_shape = match request.shape {
        OutputShape::NativeRank => selected.to_vec(),
        OutputShape::VectorAsHorizontalTable => vec![selected[0], 1],
        OutputShape::VectorAsVerticalTable => vec![1, selected[0]],
        OutputShape::RangeAdaptiveRank => {
            let kept: Vec<usize> = selected.iter().copied().filter(|&n| n != 1).collect();
            if kept.is_empty() {
                vec![1]
            } else {
                kept
            }
        }
        OutputShape::FlattenedVector => vec![count],
    };

    Ok(Plan {
        format,
        target,
        disk_shape,
        start,
        extent,
        output_shape,
        raw_len,
    })
}

/// Decode the data unit described by `metadata` from `source`.
///
/// `source` must be positioned at the first data byte (where the scanner
/// leaves it). Exactly the unpadded data bytes are consumed, so the source
/// ends up just before the block padding.
///
/// The shape of the returned [`DataUnit`] is the effective shape produced by
/// the request's [`OutputShape`].
///
/// # Errors
///
/// * [`Error::UnsupportedRank`] for rank 0, rank above 3 without
///   [`OutputShape::FlattenedVector`], or a vector policy on non-vector data.
/// * [`Error::RangeError`] for ranges outside the axes, with `min > max`, of
///   the wrong count, or combined with a flattened output.
/// * [`Error::PrecisionMismatch`] for a `Bool` target on anything but
///   unbiased 8-bit data.
/// * [`Error::Io`] if the source ends inside the data unit.
pub fn decode<R: Read + ?Sized>(
    source: &mut R,
    metadata: &HeaderMetadata,
    request: &DecodeRequest,
    options: &CodecOptions,
) -> Result<DataUnit> {
    let plan = plan(metadata, request)?;
    // Sized by the bytes actually read, never by the header alone.
    let mut raw = Vec::new();
    Read::take(&mut *source, plan.raw_len as u64).read_to_end(&mut raw)?;
    if raw.len() < plan.raw_len {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "end of stream inside data unit",
        )));
    }
    decode_planned(&raw, &plan, options)
}

/// Decode from an in-memory copy of the data unit.
///
/// `raw` must hold at least the unpadded data bytes; anything after them is
/// ignored.
pub fn decode_bytes(
    raw: &[u8],
    metadata: &HeaderMetadata,
    request: &DecodeRequest,
    options: &CodecOptions,
) -> Result<DataUnit> {
    let plan = plan(metadata, request)?;
    let raw = raw
        .get(..plan.raw_len)
        .ok_or(Error::InvalidValue("buffer shorter than the data unit"))?;
    decode_planned(raw, &plan, options)
}

fn decode_planned(raw: &[u8], plan: &Plan, options: &CodecOptions) -> Result<DataUnit> {
    debug!(
        bitpix = plan.format.bitpix,
        target = ?plan.target,
        extent = ?plan.extent,
        output = ?plan.output_shape,
        "decoding data unit"
    );
    let data = with_kind!(plan.target, T => decode_as::<T>(raw, plan, options))?;
    Ok(DataUnit::from_parts_unchecked(plan.output_shape.clone(), data))
}

fn decode_as<T: Element>(raw: &[u8], plan: &Plan, options: &CodecOptions) -> Result<ElementData> {
    Ok(match plan.format.bitpix {
        8 => decode_disk::<u8, T>(raw, plan, options),
        16 => decode_disk::<i16, T>(raw, plan, options),
        32 => decode_disk::<i32, T>(raw, plan, options),
        64 => decode_disk::<i64, T>(raw, plan, options),
        -32 => decode_disk::<f32, T>(raw, plan, options),
        -64 => decode_disk::<f64, T>(raw, plan, options),
        other => return Err(Error::UnsupportedBitpix(other)),
    })
}

/// How a raw disk value becomes a physical value.
#[derive(Debug, Clone, Copy)]
enum Conversion {
    /// Integer data, `BSCALE = 1`, integral `BZERO`.
    Exact(i128),
    Real { scale: f64, offset: f64 },
}

impl Conversion {
    fn for_format(format: &DiskFormat) -> Self {
        let integral_offset = format.offset.fract() == 0.0 && format.offset.abs() < 1.0e20;
        if format.bitpix > 0 && format.scale == 1.0 && integral_offset {
            Conversion::Exact(format.offset as i128)
        } else {
            Conversion::Real {
                scale: format.scale,
                offset: format.offset,
            }
        }
    }

    #[inline]
    fn apply<D: DiskSample, T: Element>(self, raw: D) -> T {
        match self {
            Conversion::Exact(offset) => match raw.exact() {
                Some(v) => T::from_exact(v + offset),
                None => T::from_physical(raw.to_f64() + offset as f64),
            },
            Conversion::Real { scale, offset } => T::from_physical(raw.to_f64() * scale + offset),
        }
    }
}

fn decode_disk<D, T>(raw: &[u8], plan: &Plan, options: &CodecOptions) -> ElementData
where
    D: DiskSample + Element,
    T: Element,
{
    let line_len = plan.extent[0];
    let line_count = plan.extent[1] * plan.extent[2];
    let tracker = ProgressTracker::new(options, "decoding data unit", line_count);
    tracker.start();

    if plan.is_full_extent() && plan.format.is_identity() && D::KIND == T::KIND {
        let values: Vec<D> = decode_contiguous(raw);
        tracker.finish();
        return D::wrap(values);
    }

    let conversion = Conversion::for_format(&plan.format);
    let mut out = vec![T::default(); line_len * line_count];
    let [n0, n1, _] = plan.disk_shape;
    let [s0, s1, s2] = plan.start;
    let lines_per_plane = plan.extent[1];

    for_each_line_batch(
        &mut out,
        line_len,
        options.effective_parallelism(),
        &tracker,
        |first_line, lines| {
            for (k, line) in lines.chunks_mut(line_len).enumerate() {
                let index = first_line + k;
                let j1 = index % lines_per_plane;
                let j2 = index / lines_per_plane;
                let src = s0 + n0 * ((s1 + j1) + n1 * (s2 + j2));
                let bytes = &raw[src * D::BYTES..(src + line_len) * D::BYTES];
                for (value, chunk) in line.iter_mut().zip(bytes.chunks_exact(D::BYTES)) {
                    *value = conversion.apply::<D, T>(D::read_be(chunk));
                }
            }
        },
    );
    tracker.finish();
    T::wrap(out)
}
