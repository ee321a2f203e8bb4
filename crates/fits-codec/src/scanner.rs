//! Single-pass header scanner.
//!
//! The scanner pulls 2880-byte blocks from a sequential source, splits each
//! into 36 cards and feeds them through a small state machine:
//!
//! * `ExpectingFirstCard`: the first card must be `SIMPLE = T` for a primary
//!   header or `XTENSION = '<type>'` for an extension.
//! * `ReadingCards`: structural keywords are matched (first occurrence wins),
//!   everything else is optionally retained verbatim.
//! * `End`: the `END` card was seen. The source is left at the first byte of
//!   the data unit, or past the padded data unit when asked to skip it.
//!
//! The scan never seeks and never backtracks.

use std::collections::BTreeMap;
use std::io::{self, Read};

use tracing::{debug, trace};

use crate::block::{fill_block, skip_bytes, BlockFill, BLOCK_SIZE, CARD_SIZE};
use crate::error::{Error, Result};
use crate::header::{card_keyword, parse_card, HeaderCard};
use crate::precision::{bytes_per_element, DiskFormat};
use crate::value::Value;

/// Which first card the scanner accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expect {
    /// `SIMPLE = T`.
    #[default]
    Primary,
    /// `XTENSION = '<type>'`.
    Extension,
    /// Either of the above.
    Any,
}

/// Scanner configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    pub expect: Expect,
    /// Keep non-structural cards in [`HeaderMetadata::cards`].
    pub retain_cards: bool,
    /// After the header, also consume the padded data unit and heap.
    pub skip_data: bool,
}

impl ScanOptions {
    pub fn primary() -> Self {
        Self::default()
    }

    pub fn extension() -> Self {
        Self {
            expect: Expect::Extension,
            ..Self::default()
        }
    }

    pub fn any() -> Self {
        Self {
            expect: Expect::Any,
            ..Self::default()
        }
    }

    pub fn retain_cards(mut self, retain: bool) -> Self {
        self.retain_cards = retain;
        self
    }

    pub fn skip_data(mut self, skip: bool) -> Self {
        self.skip_data = skip;
        self
    }
}

/// Structural metadata of one header. Produced fresh by every scan.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMetadata {
    /// BITPIX: 8, 16, 32, 64, -32 or -64.
    pub element_width_bits: i64,
    /// NAXIS1..NAXISn in order. Empty when the header has no data.
    pub axis_lengths: Vec<usize>,
    /// BSCALE, 1 when absent.
    pub scale: f64,
    /// BZERO, 0 when absent.
    pub offset: f64,
    /// EXTEND = T.
    pub has_extensions: bool,
    /// The first card was XTENSION.
    pub is_extension: bool,
    /// Trimmed XTENSION value.
    pub extension_type: Option<String>,
    /// Trimmed EXTNAME value.
    pub extension_name: Option<String>,
    /// PCOUNT, -1 when absent.
    pub heap_byte_count: i64,
    /// GCOUNT, 1 when absent.
    pub group_count: u64,
    /// THEAP when present.
    pub heap_offset: Option<u64>,
    /// Bytes occupied by the header blocks.
    pub header_byte_len: u64,
    /// Non-structural cards, kept only when requested.
    pub cards: Vec<HeaderCard>,
}

impl HeaderMetadata {
    pub fn rank(&self) -> usize {
        self.axis_lengths.len()
    }

    /// Number of elements in the main data array (0 when rank is 0).
    ///
    /// This and the other size helpers saturate at `u64::MAX`; scanned
    /// metadata never reaches that, see [`sizes`](Self::sizes).
    pub fn element_count(&self) -> u64 {
        if self.axis_lengths.is_empty() {
            return 0;
        }
        self.axis_lengths
            .iter()
            .fold(1u64, |acc, &n| acc.saturating_mul(n as u64))
    }

    pub fn disk_format(&self) -> DiskFormat {
        DiskFormat::new(self.element_width_bits, self.scale, self.offset)
    }

    fn bytes_per_element(&self) -> u64 {
        self.element_width_bits.unsigned_abs() / 8
    }

    /// Unpadded size of the main data array (the table, for table sections).
    pub fn data_byte_len(&self) -> u64 {
        self.bytes_per_element()
            .saturating_mul(self.group_count)
            .saturating_mul(self.element_count())
    }

    /// Size of the heap that follows the main table, 0 when absent.
    pub fn heap_byte_len(&self) -> u64 {
        self.bytes_per_element()
            .saturating_mul(self.group_count)
            .saturating_mul(self.heap_byte_count.max(0) as u64)
    }

    /// Data array plus heap, rounded up to whole blocks.
    pub fn padded_data_byte_len(&self) -> u64 {
        self.sizes().map(|s| s.padded).unwrap_or(u64::MAX)
    }

    /// All data-unit sizes with overflow checked.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedHeader`] when the axis lengths describe a data unit
    /// whose padded size does not fit in a `u64`.
    pub fn sizes(&self) -> Result<DataSizes> {
        let overflow = || Error::malformed("data unit size overflows");
        let element_count = if self.axis_lengths.is_empty() {
            0
        } else {
            self.axis_lengths
                .iter()
                .try_fold(1u64, |acc, &n| acc.checked_mul(n as u64))
                .ok_or_else(overflow)?
        };
        let per_group = self
            .bytes_per_element()
            .checked_mul(self.group_count)
            .ok_or_else(overflow)?;
        let data = per_group.checked_mul(element_count).ok_or_else(overflow)?;
        let heap = per_group
            .checked_mul(self.heap_byte_count.max(0) as u64)
            .ok_or_else(overflow)?;
        let padded = data
            .checked_add(heap)
            .map(|n| n.div_ceil(BLOCK_SIZE as u64))
            .and_then(|blocks| blocks.checked_mul(BLOCK_SIZE as u64))
            .ok_or_else(overflow)?;
        Ok(DataSizes {
            element_count,
            data,
            heap,
            padded,
        })
    }

    /// Heap start relative to the data start: THEAP, or NAXIS1 * NAXIS2.
    pub fn heap_start_offset(&self) -> u64 {
        self.heap_offset.unwrap_or_else(|| {
            let a = self.axis_lengths.first().copied().unwrap_or(0) as u64;
            let b = self.axis_lengths.get(1).copied().unwrap_or(0) as u64;
            a.saturating_mul(b)
        })
    }
}

/// Byte sizes of one data unit, computed by [`HeaderMetadata::sizes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSizes {
    pub element_count: u64,
    /// Main data array (or table), unpadded.
    pub data: u64,
    /// Heap following the main array.
    pub heap: u64,
    /// Data plus heap, rounded up to whole blocks.
    pub padded: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    ExpectingFirstCard,
    ReadingCards,
    End,
}

/// Structural fields collected while reading cards, first match wins.
#[derive(Default)]
struct Collected {
    is_extension: bool,
    extension_type: Option<String>,
    bitpix: Option<i64>,
    naxis: Option<i64>,
    naxisn: BTreeMap<usize, i64>,
    scale: Option<f64>,
    offset: Option<f64>,
    extend: Option<bool>,
    extname: Option<String>,
    pcount: Option<i64>,
    gcount: Option<i64>,
    theap: Option<i64>,
    cards: Vec<HeaderCard>,
}

/// Reads one header at a time from a sequential byte source.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderScanner {
    options: ScanOptions,
}

impl HeaderScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Scan one header starting at the current position of `source`.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFitsFormat`] if the first card is not the expected marker.
    /// * [`Error::MalformedHeader`] if the stream ends before `END`, or a
    ///   required structural keyword is missing or invalid.
    pub fn scan<R: Read + ?Sized>(&self, source: &mut R) -> Result<HeaderMetadata> {
        self.scan_next(source)?
            .ok_or_else(|| Error::malformed("end of stream before any header card"))
    }

    /// Like [`scan`](Self::scan), but a source that is already exhausted at
    /// the block boundary yields `Ok(None)` instead of an error.
    pub(crate) fn scan_next<R: Read + ?Sized>(
        &self,
        source: &mut R,
    ) -> Result<Option<HeaderMetadata>> {
        let mut block = [0u8; BLOCK_SIZE];
        let mut state = ScanState::ExpectingFirstCard;
        let mut found = Collected::default();
        let mut blocks_read = 0u64;

        while state != ScanState::End {
            match fill_block(source, &mut block)? {
                BlockFill::Full => blocks_read += 1,
                BlockFill::Exhausted if state == ScanState::ExpectingFirstCard => {
                    return Ok(None);
                }
                BlockFill::Exhausted | BlockFill::Truncated(_) => {
                    return Err(Error::malformed("end of stream before END card"));
                }
            }
            for raw in block.chunks_exact(CARD_SIZE) {
                let raw: &[u8; CARD_SIZE] = raw
                    .try_into()
                    .map_err(|_| Error::malformed("short card"))?;
                state = match state {
                    ScanState::ExpectingFirstCard => self.first_card(raw, &mut found)?,
                    ScanState::ReadingCards => self.next_card(raw, &mut found),
                    ScanState::End => break,
                };
            }
        }

        let metadata = finish(found, blocks_read * BLOCK_SIZE as u64)?;
        debug!(
            bitpix = metadata.element_width_bits,
            axes = ?metadata.axis_lengths,
            extension = metadata.extension_type.as_deref().unwrap_or("PRIMARY"),
            name = metadata.extension_name.as_deref().unwrap_or(""),
            "header scanned"
        );

        if self.options.skip_data {
            let len = metadata.sizes()?.padded;
            let skipped = skip_bytes(source, len)?;
            if skipped < len {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "end of stream inside data unit",
                )));
            }
        }
        Ok(Some(metadata))
    }

    fn first_card(&self, raw: &[u8; CARD_SIZE], found: &mut Collected) -> Result<ScanState> {
        let card = parse_card(raw);
        let allow_primary = self.options.expect != Expect::Extension;
        let allow_extension = self.options.expect != Expect::Primary;

        match (card.keyword.as_str(), &card.value) {
            ("SIMPLE", Some(Value::Logical(true))) if allow_primary => {}
            ("XTENSION", Some(Value::String(kind))) if allow_extension => {
                found.is_extension = true;
                found.extension_type = Some(kind.trim().to_string());
            }
            _ => {
                return Err(Error::NotFitsFormat(match self.options.expect {
                    Expect::Primary => "first card is not SIMPLE = T",
                    Expect::Extension => "first card is not XTENSION",
                    Expect::Any => "first card is neither SIMPLE = T nor XTENSION",
                }))
            }
        }
        trace!(keyword = %card.keyword, "structural marker");
        Ok(ScanState::ReadingCards)
    }

    fn next_card(&self, raw: &[u8; CARD_SIZE], found: &mut Collected) -> ScanState {
        let keyword = card_keyword(raw);
        if keyword == "END" {
            return ScanState::End;
        }
        let card = parse_card(raw);
        if !record_structural(&card, found) && self.options.retain_cards {
            found.cards.push(card);
        }
        ScanState::ReadingCards
    }
}

/// Store `card` if it is a structural keyword seen for the first time.
fn record_structural(card: &HeaderCard, found: &mut Collected) -> bool {
    fn first<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
        match value {
            Some(v) if slot.is_none() => {
                *slot = Some(v);
                true
            }
            _ => false,
        }
    }

    let value = card.value.as_ref();
    let recorded = match card.keyword.as_str() {
        "BITPIX" => first(&mut found.bitpix, value.and_then(Value::as_i64)),
        "NAXIS" => first(&mut found.naxis, value.and_then(Value::as_i64)),
        "BSCALE" => first(&mut found.scale, value.and_then(Value::as_f64)),
        "BZERO" => first(&mut found.offset, value.and_then(Value::as_f64)),
        "EXTEND" => first(&mut found.extend, value.and_then(Value::as_bool)),
        "EXTNAME" => first(
            &mut found.extname,
            value.and_then(Value::as_str).map(|s| s.trim().to_string()),
        ),
        "PCOUNT" => first(&mut found.pcount, value.and_then(Value::as_i64)),
        "GCOUNT" => first(&mut found.gcount, value.and_then(Value::as_i64)),
        "THEAP" => first(&mut found.theap, value.and_then(Value::as_i64)),
        kw => match axis_number(kw) {
            Some(n) if !found.naxisn.contains_key(&n) => match value.and_then(Value::as_i64) {
                Some(len) => {
                    found.naxisn.insert(n, len);
                    true
                }
                None => false,
            },
            _ => false,
        },
    };
    if recorded {
        trace!(keyword = %card.keyword, "structural keyword");
    }
    recorded
}

/// `NAXISn` → `n` for `n` in 1..=999.
fn axis_number(keyword: &str) -> Option<usize> {
    let digits = keyword.strip_prefix("NAXIS")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&n| (1..=999).contains(&n))
}

fn finish(found: Collected, header_byte_len: u64) -> Result<HeaderMetadata> {
    let bitpix = found
        .bitpix
        .ok_or_else(|| Error::malformed("missing BITPIX"))?;
    bytes_per_element(bitpix).map_err(|_| Error::malformed(format!("invalid BITPIX {bitpix}")))?;

    let naxis = found.naxis.ok_or_else(|| Error::malformed("missing NAXIS"))?;
    if !(0..=999).contains(&naxis) {
        return Err(Error::malformed(format!("invalid NAXIS {naxis}")));
    }
    let mut axis_lengths = Vec::with_capacity(naxis as usize);
    for n in 1..=naxis as usize {
        let len = *found
            .naxisn
            .get(&n)
            .ok_or_else(|| Error::malformed(format!("missing NAXIS{n}")))?;
        let len = usize::try_from(len)
            .map_err(|_| Error::malformed(format!("negative NAXIS{n} = {len}")))?;
        axis_lengths.push(len);
    }

    let group_count = match found.gcount {
        Some(g) if g < 0 => return Err(Error::malformed(format!("negative GCOUNT {g}"))),
        Some(g) => g as u64,
        None => 1,
    };
    let heap_offset = match found.theap {
        Some(t) if t < 0 => return Err(Error::malformed(format!("negative THEAP {t}"))),
        Some(t) => Some(t as u64),
        None => None,
    };

    let metadata = HeaderMetadata {
        element_width_bits: bitpix,
        axis_lengths,
        scale: found.scale.unwrap_or(1.0),
        offset: found.offset.unwrap_or(0.0),
        has_extensions: found.extend.unwrap_or(false),
        is_extension: found.is_extension,
        extension_type: found.extension_type,
        extension_name: found.extname,
        heap_byte_count: found.pcount.unwrap_or(-1),
        group_count,
        heap_offset,
        header_byte_len,
        cards: found.cards,
    };
    metadata.sizes()?;
    Ok(metadata)
}

/// Scan a primary header at the current position.
pub fn scan_primary<R: Read + ?Sized>(source: &mut R) -> Result<HeaderMetadata> {
    HeaderScanner::new(ScanOptions::primary()).scan(source)
}

/// Scan an extension header at the current position.
pub fn scan_extension<R: Read + ?Sized>(source: &mut R) -> Result<HeaderMetadata> {
    HeaderScanner::new(ScanOptions::extension()).scan(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::padded_byte_len;
    use std::io::Cursor;

    fn make_card(s: &str) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        let bytes = s.as_bytes();
        let len = bytes.len().min(CARD_SIZE);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    fn make_header(cards: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for c in cards {
            out.extend_from_slice(&make_card(c));
        }
        out.extend_from_slice(&make_card("END"));
        let padded = padded_byte_len(out.len() as u64) as usize;
        out.resize(padded, b' ');
        out
    }

    #[test]
    fn minimal_primary() {
        let bytes = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
        ]);
        assert_eq!(bytes.len(), BLOCK_SIZE);
        let mut src = Cursor::new(bytes);
        let meta = scan_primary(&mut src).unwrap();
        assert_eq!(meta.element_width_bits, 8);
        assert!(meta.axis_lengths.is_empty());
        assert!(!meta.has_extensions);
        assert!(!meta.is_extension);
        assert_eq!(meta.scale, 1.0);
        assert_eq!(meta.offset, 0.0);
        assert_eq!(meta.heap_byte_count, -1);
        assert_eq!(meta.header_byte_len, BLOCK_SIZE as u64);
        assert_eq!(meta.data_byte_len(), 0);
        assert_eq!(src.position(), BLOCK_SIZE as u64);
    }

    #[test]
    fn image_metadata() {
        let bytes = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                   16",
            "NAXIS   =                    2",
            "NAXIS1  =                   10",
            "NAXIS2  =                   20",
            "EXTEND  =                    T",
            "BZERO   =                32768",
            "BSCALE  =                  1.0",
        ]);
        let meta = scan_primary(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(meta.axis_lengths, vec![10, 20]);
        assert!(meta.has_extensions);
        assert_eq!(meta.offset, 32768.0);
        assert_eq!(meta.scale, 1.0);
        assert_eq!(meta.element_count(), 200);
        assert_eq!(meta.data_byte_len(), 400);
        assert_eq!(meta.padded_data_byte_len(), BLOCK_SIZE as u64);
    }

    #[test]
    fn first_match_wins() {
        let bytes = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                  -32",
            "NAXIS   =                    1",
            "NAXIS1  =                    5",
            "BITPIX  =                   16",
            "NAXIS1  =                    9",
        ]);
        let meta = scan_primary(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(meta.element_width_bits, -32);
        assert_eq!(meta.axis_lengths, vec![5]);
    }

    #[test]
    fn retains_unknown_cards() {
        let bytes = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
            "OBJECT  = 'M31     '",
            "COMMENT hello",
        ]);
        let scanner = HeaderScanner::new(ScanOptions::primary().retain_cards(true));
        let meta = scanner.scan(&mut Cursor::new(bytes.clone())).unwrap();
        assert_eq!(meta.cards.len(), 2);
        assert_eq!(meta.cards[0].keyword, "OBJECT");
        assert!(meta.cards[1].is_comment_line);

        let meta = scan_primary(&mut Cursor::new(bytes)).unwrap();
        assert!(meta.cards.is_empty());
    }

    #[test]
    fn not_fits_when_first_card_wrong() {
        let bytes = make_header(&["BITPIX  =                    8", "NAXIS   =                    0"]);
        let err = scan_primary(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::NotFitsFormat(_)));
    }

    #[test]
    fn not_fits_when_simple_false() {
        let bytes = make_header(&[
            "SIMPLE  =                    F",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
        ]);
        let err = scan_primary(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::NotFitsFormat(_)));
    }

    #[test]
    fn extension_expected_but_primary_found() {
        let bytes = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
        ]);
        let err = scan_extension(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::NotFitsFormat(_)));
    }

    #[test]
    fn extension_fields() {
        let bytes = make_header(&[
            "XTENSION= 'BINTABLE'           / binary table",
            "BITPIX  =                    8",
            "NAXIS   =                    2",
            "NAXIS1  =                   12",
            "NAXIS2  =                    4",
            "PCOUNT  =                  100",
            "GCOUNT  =                    1",
            "EXTNAME = 'EVENTS  '",
        ]);
        let meta = scan_extension(&mut Cursor::new(bytes)).unwrap();
        assert!(meta.is_extension);
        assert_eq!(meta.extension_type.as_deref(), Some("BINTABLE"));
        assert_eq!(meta.extension_name.as_deref(), Some("EVENTS"));
        assert_eq!(meta.heap_byte_count, 100);
        assert_eq!(meta.data_byte_len(), 48);
        assert_eq!(meta.heap_byte_len(), 100);
        assert_eq!(meta.heap_start_offset(), 48);
    }

    #[test]
    fn theap_overrides_heap_start() {
        let bytes = make_header(&[
            "XTENSION= 'BINTABLE'",
            "BITPIX  =                    8",
            "NAXIS   =                    2",
            "NAXIS1  =                   12",
            "NAXIS2  =                    4",
            "PCOUNT  =                  100",
            "THEAP   =                   64",
        ]);
        let meta = scan_extension(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(meta.heap_offset, Some(64));
        assert_eq!(meta.heap_start_offset(), 64);
    }

    #[test]
    fn any_accepts_both_markers() {
        let scanner = HeaderScanner::new(ScanOptions::any());
        let primary = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
        ]);
        assert!(!scanner.scan(&mut Cursor::new(primary)).unwrap().is_extension);
        let ext = make_header(&[
            "XTENSION= 'IMAGE   '",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
        ]);
        assert!(scanner.scan(&mut Cursor::new(ext)).unwrap().is_extension);
    }

    #[test]
    fn missing_end_is_malformed() {
        let mut bytes = Vec::new();
        for c in [
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    0",
        ] {
            bytes.extend_from_slice(&make_card(c));
        }
        bytes.resize(BLOCK_SIZE, b' ');
        let err = scan_primary(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
    }

    #[test]
    fn truncated_block_is_malformed() {
        let bytes = make_header(&["SIMPLE  =                    T"]);
        let err = scan_primary(&mut Cursor::new(bytes[..100].to_vec())).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
    }

    #[test]
    fn empty_stream() {
        let scanner = HeaderScanner::new(ScanOptions::any());
        assert!(scanner.scan_next(&mut Cursor::new(Vec::new())).unwrap().is_none());
        assert!(matches!(
            scanner.scan(&mut Cursor::new(Vec::new())),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn missing_axis_length() {
        let bytes = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    2",
            "NAXIS1  =                    4",
        ]);
        match scan_primary(&mut Cursor::new(bytes)) {
            Err(Error::MalformedHeader(msg)) => assert!(msg.contains("NAXIS2")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_axis_length() {
        let bytes = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    1",
            "NAXIS1  =                   -4",
        ]);
        assert!(matches!(
            scan_primary(&mut Cursor::new(bytes)),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn missing_bitpix() {
        let bytes = make_header(&["SIMPLE  =                    T", "NAXIS   =                    0"]);
        match scan_primary(&mut Cursor::new(bytes)) {
            Err(Error::MalformedHeader(msg)) => assert!(msg.contains("BITPIX")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn header_spanning_two_blocks() {
        let mut cards = vec![
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    1",
        ];
        cards.extend(std::iter::repeat("COMMENT filler").take(40));
        cards.push("NAXIS1  =                    3");
        let bytes = make_header(&cards);
        assert_eq!(bytes.len(), 2 * BLOCK_SIZE);
        let meta = scan_primary(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(meta.axis_lengths, vec![3]);
        assert_eq!(meta.header_byte_len, 2 * BLOCK_SIZE as u64);
    }

    #[test]
    fn skip_data_consumes_padded_unit() {
        let mut bytes = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                   16",
            "NAXIS   =                    1",
            "NAXIS1  =                    9",
        ]);
        bytes.extend(vec![0u8; BLOCK_SIZE]);
        bytes.extend(vec![7u8; 10]);
        let mut src = Cursor::new(bytes);
        let scanner = HeaderScanner::new(ScanOptions::primary().skip_data(true));
        scanner.scan(&mut src).unwrap();
        assert_eq!(src.position(), 2 * BLOCK_SIZE as u64);
    }

    #[test]
    fn skip_data_on_truncated_unit() {
        let mut bytes = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                   16",
            "NAXIS   =                    1",
            "NAXIS1  =                    9",
        ]);
        bytes.extend(vec![0u8; 10]);
        let scanner = HeaderScanner::new(ScanOptions::primary().skip_data(true));
        assert!(matches!(
            scanner.scan(&mut Cursor::new(bytes)),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn huge_axes_overflow_is_malformed() {
        // 2^40 * 2^40 * 8 bytes does not fit in a u64.
        let bytes = make_header(&[
            "XTENSION= 'IMAGE   '",
            "BITPIX  =                   64",
            "NAXIS   =                    2",
            "NAXIS1  =        1099511627776",
            "NAXIS2  =        1099511627776",
        ]);
        for skip in [false, true] {
            let scanner = HeaderScanner::new(ScanOptions::any().skip_data(skip));
            match scanner.scan(&mut Cursor::new(bytes.clone())) {
                Err(Error::MalformedHeader(msg)) => assert!(msg.contains("overflows")),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn sizes_checked_on_hand_built_metadata() {
        let bytes = make_header(&[
            "SIMPLE  =                    T",
            "BITPIX  =                   16",
            "NAXIS   =                    1",
            "NAXIS1  =                    9",
        ]);
        let mut meta = scan_primary(&mut Cursor::new(bytes)).unwrap();
        let sizes = meta.sizes().unwrap();
        assert_eq!(sizes.element_count, 9);
        assert_eq!(sizes.data, 18);
        assert_eq!(sizes.heap, 0);
        assert_eq!(sizes.padded, BLOCK_SIZE as u64);

        meta.axis_lengths = vec![usize::MAX, usize::MAX, 4];
        assert!(matches!(meta.sizes(), Err(Error::MalformedHeader(_))));
        assert_eq!(meta.element_count(), u64::MAX);
        assert_eq!(meta.padded_data_byte_len(), u64::MAX);
    }

    #[test]
    fn axis_number_parsing() {
        assert_eq!(axis_number("NAXIS1"), Some(1));
        assert_eq!(axis_number("NAXIS999"), Some(999));
        assert_eq!(axis_number("NAXIS"), None);
        assert_eq!(axis_number("NAXIS0"), None);
        assert_eq!(axis_number("NAXISA"), None);
    }
}
