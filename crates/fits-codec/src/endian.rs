//! Big-endian on-disk sample types.
//!
//! FITS stores all binary data big-endian. Each of the six storage types
//! named by BITPIX implements [`DiskSample`], which knows how to read and
//! write itself at an arbitrary byte offset and how to convert to and from
//! the physical domain.

use bytemuck::{pod_collect_to_vec, Pod};

/// One on-disk element type: `u8`, `i16`, `i32`, `i64`, `f32` or `f64`.
pub trait DiskSample: Pod + Send + Sync {
    /// The BITPIX code naming this storage type.
    const BITPIX: i64;
    /// Size in bytes.
    const BYTES: usize;

    /// Read a big-endian value from the first `BYTES` bytes of `buf`.
    fn read_be(buf: &[u8]) -> Self;
    /// Write the value big-endian into the first `BYTES` bytes of `buf`.
    fn write_be(self, buf: &mut [u8]);
    /// Reinterpret a value whose bytes were copied verbatim from disk.
    fn from_be_value(self) -> Self;

    /// Exact integer value, or `None` for IEEE samples.
    fn exact(self) -> Option<i128>;
    fn to_f64(self) -> f64;
    /// Convert an exact integer, saturating at the type bounds.
    fn from_exact(v: i128) -> Self;
    /// Convert a real value; integer types round to nearest and saturate.
    fn from_f64(v: f64) -> Self;
}

macro_rules! int_sample {
    ($t:ty, $bitpix:expr) => {
        impl DiskSample for $t {
            const BITPIX: i64 = $bitpix;
            const BYTES: usize = core::mem::size_of::<$t>();

            #[inline]
            fn read_be(buf: &[u8]) -> Self {
                let mut bytes = [0u8; core::mem::size_of::<$t>()];
                bytes.copy_from_slice(&buf[..Self::BYTES]);
                <$t>::from_be_bytes(bytes)
            }

            #[inline]
            fn write_be(self, buf: &mut [u8]) {
                buf[..Self::BYTES].copy_from_slice(&self.to_be_bytes());
            }

            #[inline]
            fn from_be_value(self) -> Self {
                <$t>::from_be(self)
            }

            #[inline]
            fn exact(self) -> Option<i128> {
                Some(self as i128)
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_exact(v: i128) -> Self {
                v.clamp(<$t>::MIN as i128, <$t>::MAX as i128) as $t
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                // `as` saturates at the bounds and maps NaN to zero.
                libm::round(v) as $t
            }
        }
    };
}

macro_rules! float_sample {
    ($t:ty, $bits:ty, $bitpix:expr) => {
        impl DiskSample for $t {
            const BITPIX: i64 = $bitpix;
            const BYTES: usize = core::mem::size_of::<$t>();

            #[inline]
            fn read_be(buf: &[u8]) -> Self {
                let mut bytes = [0u8; core::mem::size_of::<$t>()];
                bytes.copy_from_slice(&buf[..Self::BYTES]);
                <$t>::from_be_bytes(bytes)
            }

            #[inline]
            fn write_be(self, buf: &mut [u8]) {
                buf[..Self::BYTES].copy_from_slice(&self.to_be_bytes());
            }

            #[inline]
            fn from_be_value(self) -> Self {
                <$t>::from_bits(<$bits>::from_be(self.to_bits()))
            }

            #[inline]
            fn exact(self) -> Option<i128> {
                None
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_exact(v: i128) -> Self {
                v as $t
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    };
}

int_sample!(u8, 8);
int_sample!(i16, 16);
int_sample!(i32, 32);
int_sample!(i64, 64);
float_sample!(f32, u32, -32);
float_sample!(f64, u64, -64);

/// Decode a contiguous big-endian byte run into native values.
///
/// The bytes are first collected into a properly aligned `Vec<D>`, then each
/// element is swapped to native order in place.
pub fn decode_contiguous<D: DiskSample>(raw: &[u8]) -> Vec<D> {
    let mut values: Vec<D> = pod_collect_to_vec(raw);
    for v in &mut values {
        *v = v.from_be_value();
    }
    values
}
