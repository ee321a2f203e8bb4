//! Mapping between in-memory element kinds and the on-disk
//! `(BITPIX, BSCALE, BZERO)` triple.
//!
//! FITS has no native unsigned integers (and no signed bytes). They are stored
//! in the opposite-signedness type of the same width with a bias in `BZERO`:
//! `physical = raw + BZERO`, where `BZERO` is the half-range of the width.
//! These constants are part of the format and must be reproduced exactly.

use crate::error::{Error, Result};

/// Bias marking signed bytes stored as unsigned `BITPIX = 8`.
pub const I8_BIAS: f64 = -128.0;
/// Bias marking unsigned 16-bit values stored as `BITPIX = 16`.
pub const U16_BIAS: f64 = 32_768.0;
/// Bias marking unsigned 32-bit values stored as `BITPIX = 32`.
pub const U32_BIAS: f64 = 2_147_483_648.0;
/// Bias marking unsigned 64-bit values stored as `BITPIX = 64`.
pub const U64_BIAS: f64 = 9_223_372_036_854_775_808.0;

/// BITPIX values this codec can read and write.
pub const VALID_BITPIX: [i64; 6] = [8, 16, 32, 64, -32, -64];

/// The closed set of in-memory element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ElementKind {
    /// Every supported kind, in declaration order.
    pub const ALL: [ElementKind; 11] = [
        ElementKind::Bool,
        ElementKind::I8,
        ElementKind::U8,
        ElementKind::I16,
        ElementKind::U16,
        ElementKind::I32,
        ElementKind::U32,
        ElementKind::I64,
        ElementKind::U64,
        ElementKind::F32,
        ElementKind::F64,
    ];

    /// Size of one element of this kind in memory.
    pub fn byte_width(self) -> usize {
        match self {
            ElementKind::Bool | ElementKind::I8 | ElementKind::U8 => 1,
            ElementKind::I16 | ElementKind::U16 => 2,
            ElementKind::I32 | ElementKind::U32 | ElementKind::F32 => 4,
            ElementKind::I64 | ElementKind::U64 | ElementKind::F64 => 8,
        }
    }
}

/// The on-disk description of a data unit's elements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiskFormat {
    /// BITPIX: 8, 16, 32, 64 for integers, -32 and -64 for IEEE floats.
    pub bitpix: i64,
    /// BSCALE.
    pub scale: f64,
    /// BZERO.
    pub offset: f64,
}

impl DiskFormat {
    pub fn new(bitpix: i64, scale: f64, offset: f64) -> Self {
        Self {
            bitpix,
            scale,
            offset,
        }
    }

    /// Bytes per element on disk.
    pub fn bytes_per_element(&self) -> Result<usize> {
        bytes_per_element(self.bitpix)
    }

    /// `true` when the triple carries no scaling at all.
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }
}

/// Returns the number of bytes per element for a BITPIX value.
pub fn bytes_per_element(bitpix: i64) -> Result<usize> {
    if VALID_BITPIX.contains(&bitpix) {
        Ok((bitpix.unsigned_abs() / 8) as usize)
    } else {
        Err(Error::UnsupportedBitpix(bitpix))
    }
}

/// Derive the on-disk triple used to store elements of `kind`.
pub fn to_disk(kind: ElementKind) -> DiskFormat {
    let (bitpix, offset) = match kind {
        ElementKind::Bool | ElementKind::U8 => (8, 0.0),
        ElementKind::I8 => (8, I8_BIAS),
        ElementKind::I16 => (16, 0.0),
        ElementKind::U16 => (16, U16_BIAS),
        ElementKind::I32 => (32, 0.0),
        ElementKind::U32 => (32, U32_BIAS),
        ElementKind::I64 => (64, 0.0),
        ElementKind::U64 => (64, U64_BIAS),
        ElementKind::F32 => (-32, 0.0),
        ElementKind::F64 => (-64, 0.0),
    };
    DiskFormat::new(bitpix, 1.0, offset)
}

/// Derive the natural in-memory kind for an on-disk triple.
///
/// Integer data with `BSCALE = 1` and either no offset or the bias matching
/// its width maps to the corresponding integer kind. Any other scaling makes
/// the physical values non-integral, so they are produced as `F32` for
/// 8/16-bit and single-precision storage and `F64` for everything wider.
/// `Bool` is never derived; it has to be requested explicitly.
pub fn to_runtime(bitpix: i64, scale: f64, offset: f64) -> Result<ElementKind> {
    bytes_per_element(bitpix)?;
    if scale == 1.0 {
        let kind = match (bitpix, offset) {
            (8, o) if o == 0.0 => Some(ElementKind::U8),
            (8, o) if o == I8_BIAS => Some(ElementKind::I8),
            (16, o) if o == 0.0 => Some(ElementKind::I16),
            (16, o) if o == U16_BIAS => Some(ElementKind::U16),
            (32, o) if o == 0.0 => Some(ElementKind::I32),
            (32, o) if o == U32_BIAS => Some(ElementKind::U32),
            (64, o) if o == 0.0 => Some(ElementKind::I64),
            (64, o) if o == U64_BIAS => Some(ElementKind::U64),
            (-32, o) if o == 0.0 => Some(ElementKind::F32),
            (-64, o) if o == 0.0 => Some(ElementKind::F64),
            _ => None,
        };
        if let Some(kind) = kind {
            return Ok(kind);
        }
    }
    Ok(match bitpix {
        8 | 16 | -32 => ElementKind::F32,
        _ => ElementKind::F64,
    })
}

/// [`to_runtime`] applied to a [`DiskFormat`].
pub fn runtime_kind(format: &DiskFormat) -> Result<ElementKind> {
    to_runtime(format.bitpix, format.scale, format.offset)
}
