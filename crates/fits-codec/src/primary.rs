//! Primary header construction.

use crate::header::HeaderCard;
use crate::precision::{to_disk, DiskFormat, ElementKind};
use crate::value::Value;

/// Cards describing the array shape: BITPIX, NAXIS and NAXIS1..NAXISn.
pub(crate) fn push_shape(cards: &mut Vec<HeaderCard>, bitpix: i64, axis_lengths: &[usize]) {
    cards.push(HeaderCard::new(
        "BITPIX",
        Value::Integer(bitpix),
        Some("bits per data value"),
    ));
    cards.push(HeaderCard::new(
        "NAXIS",
        Value::Integer(axis_lengths.len() as i64),
        Some("number of axes"),
    ));
    for (i, &len) in axis_lengths.iter().enumerate() {
        cards.push(HeaderCard::new(
            &format!("NAXIS{}", i + 1),
            Value::Integer(len as i64),
            None,
        ));
    }
}

/// BSCALE/BZERO, emitted only when the disk triple is not `(width, 1, 0)`.
pub(crate) fn push_scaling(cards: &mut Vec<HeaderCard>, format: &DiskFormat) {
    if format.is_identity() {
        return;
    }
    cards.push(HeaderCard::new("BSCALE", Value::Float(format.scale), None));
    cards.push(HeaderCard::new(
        "BZERO",
        Value::Float(format.offset),
        Some("offset data range to that of unsigned"),
    ));
}

/// Build the mandatory cards of a primary header holding data stored at
/// `precision`.
///
/// The card order is SIMPLE, BITPIX, NAXIS, NAXISn, then EXTEND when
/// `extend` is set, then BSCALE/BZERO for biased kinds.
pub fn build_primary_header(
    precision: ElementKind,
    axis_lengths: &[usize],
    extend: bool,
) -> Vec<HeaderCard> {
    let format = to_disk(precision);
    let mut cards = Vec::with_capacity(6 + axis_lengths.len());
    cards.push(HeaderCard::new(
        "SIMPLE",
        Value::Logical(true),
        Some("conforms to FITS standard"),
    ));
    push_shape(&mut cards, format.bitpix, axis_lengths);
    if extend {
        cards.push(HeaderCard::new("EXTEND", Value::Logical(true), None));
    }
    push_scaling(&mut cards, &format);
    cards
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::serialize_header;
    use crate::scanner::scan_primary;
    use std::io::Cursor;

    fn keywords(cards: &[HeaderCard]) -> Vec<&str> {
        cards.iter().map(|c| c.keyword.as_str()).collect()
    }

    #[test]
    fn minimal_cards() {
        let cards = build_primary_header(ElementKind::F32, &[100, 200], false);
        assert_eq!(
            keywords(&cards),
            vec!["SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2"]
        );
        assert_eq!(cards[1].value, Some(Value::Integer(-32)));
    }

    #[test]
    fn biased_kind_adds_scaling() {
        let cards = build_primary_header(ElementKind::U16, &[4], true);
        assert_eq!(
            keywords(&cards),
            vec!["SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "EXTEND", "BSCALE", "BZERO"]
        );
    }

    #[test]
    fn scans_back() {
        let cards = build_primary_header(ElementKind::U64, &[3, 2], true);
        let bytes = serialize_header(&cards);
        let meta = scan_primary(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(meta.element_width_bits, 64);
        assert_eq!(meta.axis_lengths, vec![3, 2]);
        assert!(meta.has_extensions);
        assert_eq!(meta.offset, 9_223_372_036_854_775_808.0);
        assert_eq!(meta.scale, 1.0);
    }

    #[test]
    fn empty_primary() {
        let cards = build_primary_header(ElementKind::U8, &[], true);
        let meta = scan_primary(&mut Cursor::new(serialize_header(&cards))).unwrap();
        assert!(meta.axis_lengths.is_empty());
        assert_eq!(meta.element_width_bits, 8);
    }
}
