//! Conversions between [`DataUnit`] and `ndarray` arrays.
//!
//! FITS stores axis 0 fastest while `ndarray` uses C order (last axis
//! fastest), so the ndarray shape is the reversed FITS shape and the element
//! order is unchanged.

use ndarray::{ArrayD, IxDyn};

use crate::data::{DataUnit, Element};
use crate::error::{Error, Result};

impl DataUnit {
    /// Copy the elements into an `ArrayD<T>`, or `None` if the unit holds
    /// another kind.
    pub fn to_array<T: Element>(&self) -> Option<ArrayD<T>> {
        let values = self.as_slice::<T>()?.to_vec();
        let shape: Vec<usize> = self.shape().iter().rev().copied().collect();
        ArrayD::from_shape_vec(IxDyn(&shape), values).ok()
    }

    /// Build a data unit from an array of rank 1 to 3.
    pub fn from_array<T: Element>(array: &ArrayD<T>) -> Result<Self> {
        let shape: Vec<usize> = array.shape().iter().rev().copied().collect();
        if shape.is_empty() || shape.len() > 3 {
            return Err(Error::UnsupportedRank(shape.len()));
        }
        let values: Vec<T> = array.iter().copied().collect();
        DataUnit::from_vec(shape, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_is_reversed() {
        // FITS [3, 2]: 3 columns (axis 0), 2 rows.
        let unit = DataUnit::from_vec(vec![3, 2], vec![0i32, 1, 2, 10, 11, 12]).unwrap();
        let arr = unit.to_array::<i32>().unwrap();
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr[[0, 2]], 2);
        assert_eq!(arr[[1, 0]], 10);
    }

    #[test]
    fn wrong_kind_is_none() {
        let unit = DataUnit::from_vec(vec![2], vec![1u8, 2]).unwrap();
        assert!(unit.to_array::<f32>().is_none());
    }

    #[test]
    fn array_roundtrip() {
        let arr = ArrayD::from_shape_vec(IxDyn(&[2, 3, 4]), (0..24).map(|v| v as f32).collect())
            .unwrap();
        let unit = DataUnit::from_array(&arr).unwrap();
        assert_eq!(unit.shape(), &[4, 3, 2]);
        assert_eq!(unit.get_f64(&[1, 0, 0]), Some(1.0));
        assert_eq!(unit.get_f64(&[0, 0, 1]), Some(12.0));
        assert_eq!(unit.to_array::<f32>().unwrap(), arr);
    }

    #[test]
    fn rank_four_is_rejected() {
        let arr = ArrayD::<u8>::zeros(IxDyn(&[1, 1, 1, 1]));
        assert!(matches!(
            DataUnit::from_array(&arr),
            Err(Error::UnsupportedRank(4))
        ));
    }
}
