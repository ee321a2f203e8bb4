//! In-memory data units: typed element storage plus axis lengths.

use core::fmt::Debug;

use crate::error::{Error, Result};
use crate::precision::ElementKind;

/// An in-memory element type, one per [`ElementKind`].
///
/// Conversions go through two domains: the exact integer domain (used when
/// the on-disk data and its offset are integral, so 64-bit biases stay exact)
/// and the real domain (`f64`) for everything else.
pub trait Element: Copy + Default + Send + Sync + PartialEq + Debug + 'static {
    const KIND: ElementKind;

    /// Convert from an exact integer physical value, saturating if needed.
    fn from_exact(v: i128) -> Self;
    /// Convert from a real physical value; integer kinds round to nearest.
    fn from_physical(v: f64) -> Self;
    /// The exact integer value, or `None` for float kinds.
    fn exact(self) -> Option<i128>;
    fn physical(self) -> f64;

    fn wrap(values: Vec<Self>) -> ElementData;
    fn view(data: &ElementData) -> Option<&[Self]>;
    fn unwrap_data(data: ElementData) -> Option<Vec<Self>>;
}

/// Typed element storage in FITS order (axis 0 varies fastest).
#[derive(Debug, Clone, PartialEq)]
pub enum ElementData {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Run `$body` with `$v` bound to the vector inside an [`ElementData`].
macro_rules! with_elements {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            $crate::data::ElementData::Bool($v) => $body,
            $crate::data::ElementData::I8($v) => $body,
            $crate::data::ElementData::U8($v) => $body,
            $crate::data::ElementData::I16($v) => $body,
            $crate::data::ElementData::U16($v) => $body,
            $crate::data::ElementData::I32($v) => $body,
            $crate::data::ElementData::U32($v) => $body,
            $crate::data::ElementData::I64($v) => $body,
            $crate::data::ElementData::U64($v) => $body,
            $crate::data::ElementData::F32($v) => $body,
            $crate::data::ElementData::F64($v) => $body,
        }
    };
}
pub(crate) use with_elements;

/// Run `$body` with the type alias `$t` set to the Rust type of `$kind`.
macro_rules! with_kind {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            $crate::precision::ElementKind::Bool => {
                type $t = bool;
                $body
            }
            $crate::precision::ElementKind::I8 => {
                type $t = i8;
                $body
            }
            $crate::precision::ElementKind::U8 => {
                type $t = u8;
                $body
            }
            $crate::precision::ElementKind::I16 => {
                type $t = i16;
                $body
            }
            $crate::precision::ElementKind::U16 => {
                type $t = u16;
                $body
            }
            $crate::precision::ElementKind::I32 => {
                type $t = i32;
                $body
            }
            $crate::precision::ElementKind::U32 => {
                type $t = u32;
                $body
            }
            $crate::precision::ElementKind::I64 => {
                type $t = i64;
                $body
            }
            $crate::precision::ElementKind::U64 => {
                type $t = u64;
                $body
            }
            $crate::precision::ElementKind::F32 => {
                type $t = f32;
                $body
            }
            $crate::precision::ElementKind::F64 => {
                type $t = f64;
                $body
            }
        }
    };
}
pub(crate) use with_kind;

macro_rules! element_accessors {
    ($t:ty, $variant:ident) => {
        const KIND: ElementKind = ElementKind::$variant;

        fn wrap(values: Vec<Self>) -> ElementData {
            ElementData::$variant(values)
        }

        fn view(data: &ElementData) -> Option<&[Self]> {
            match data {
                ElementData::$variant(v) => Some(v),
                _ => None,
            }
        }

        fn unwrap_data(data: ElementData) -> Option<Vec<Self>> {
            match data {
                ElementData::$variant(v) => Some(v),
                _ => None,
            }
        }
    };
}

macro_rules! int_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            element_accessors!($t, $variant);

            #[inline]
            fn from_exact(v: i128) -> Self {
                v.clamp(<$t>::MIN as i128, <$t>::MAX as i128) as $t
            }

            #[inline]
            fn from_physical(v: f64) -> Self {
                libm::round(v) as $t
            }

            #[inline]
            fn exact(self) -> Option<i128> {
                Some(self as i128)
            }

            #[inline]
            fn physical(self) -> f64 {
                self as f64
            }
        }
    };
}

macro_rules! float_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            element_accessors!($t, $variant);

            #[inline]
            fn from_exact(v: i128) -> Self {
                v as $t
            }

            #[inline]
            fn from_physical(v: f64) -> Self {
                v as $t
            }

            #[inline]
            fn exact(self) -> Option<i128> {
                None
            }

            #[inline]
            fn physical(self) -> f64 {
                self as f64
            }
        }
    };
}

int_element!(i8, I8);
int_element!(u8, U8);
int_element!(i16, I16);
int_element!(u16, U16);
int_element!(i32, I32);
int_element!(u32, U32);
int_element!(i64, I64);
int_element!(u64, U64);
float_element!(f32, F32);
float_element!(f64, F64);

// Only a physical value of exactly 1 is true; 2, 255 and friends are false.
impl Element for bool {
    element_accessors!(bool, Bool);

    #[inline]
    fn from_exact(v: i128) -> Self {
        v == 1
    }

    #[inline]
    fn from_physical(v: f64) -> Self {
        v == 1.0
    }

    #[inline]
    fn exact(self) -> Option<i128> {
        Some(self as i128)
    }

    #[inline]
    fn physical(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}

impl ElementData {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementData::Bool(_) => ElementKind::Bool,
            ElementData::I8(_) => ElementKind::I8,
            ElementData::U8(_) => ElementKind::U8,
            ElementData::I16(_) => ElementKind::I16,
            ElementData::U16(_) => ElementKind::U16,
            ElementData::I32(_) => ElementKind::I32,
            ElementData::U32(_) => ElementKind::U32,
            ElementData::I64(_) => ElementKind::I64,
            ElementData::U64(_) => ElementKind::U64,
            ElementData::F32(_) => ElementKind::F32,
            ElementData::F64(_) => ElementKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        with_elements!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physical value of element `index` as `f64`.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        with_elements!(self, v => v.get(index).map(|x| x.physical()))
    }
}

/// A decoded (or to-be-encoded) array of rank 1 to 3.
///
/// `shape` lists axis lengths with axis 0 first; elements are stored with
/// axis 0 varying fastest, exactly as on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUnit {
    shape: Vec<usize>,
    data: ElementData,
}

impl DataUnit {
    /// Wrap element storage with its axis lengths.
    ///
    /// Fails with [`Error::UnsupportedRank`] outside ranks 1–3 and with
    /// [`Error::InvalidValue`] when the element count does not match.
    pub fn new(shape: Vec<usize>, data: ElementData) -> Result<Self> {
        if shape.is_empty() || shape.len() > 3 {
            return Err(Error::UnsupportedRank(shape.len()));
        }
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(Error::InvalidValue("element count overflow"))?;
        if expected != data.len() {
            return Err(Error::InvalidValue("element count does not match shape"));
        }
        Ok(Self { shape, data })
    }

    /// Build a data unit from a typed vector.
    pub fn from_vec<T: Element>(shape: Vec<usize>, values: Vec<T>) -> Result<Self> {
        Self::new(shape, T::wrap(values))
    }

    pub(crate) fn from_parts_unchecked(shape: Vec<usize>, data: ElementData) -> Self {
        Self { shape, data }
    }

    /// Axis lengths, axis 0 first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn kind(&self) -> ElementKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ElementData {
        &self.data
    }

    pub fn into_data(self) -> ElementData {
        self.data
    }

    /// Borrow the elements as `&[T]` if the unit holds that kind.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::view(&self.data)
    }

    /// Take the elements as `Vec<T>` if the unit holds that kind.
    pub fn into_vec<T: Element>(self) -> Option<Vec<T>> {
        T::unwrap_data(self.data)
    }

    /// Flat index of the element at `coords` (axis 0 first).
    pub fn flat_index(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.shape.len() {
            return None;
        }
        let mut index = 0;
        let mut stride = 1;
        for (&c, &len) in coords.iter().zip(&self.shape) {
            if c >= len {
                return None;
            }
            index += c * stride;
            stride *= len;
        }
        Some(index)
    }

    /// Element at `coords` as a physical `f64`.
    pub fn get_f64(&self, coords: &[usize]) -> Option<f64> {
        self.flat_index(coords)
            .and_then(|index| self.data.get_f64(index))
    }
}
