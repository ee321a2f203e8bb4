//! Extension sections: locating them in a multi-section stream and building
//! their headers.

use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::error::{Error, Result};
use crate::header::HeaderCard;
use crate::precision::{to_disk, ElementKind};
use crate::primary::{push_scaling, push_shape};
use crate::scanner::{DataSizes, HeaderMetadata, HeaderScanner, ScanOptions};
use crate::value::Value;

/// The standard XTENSION values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionType {
    /// XTENSION = 'IMAGE'.
    Image,
    /// XTENSION = 'TABLE'.
    AsciiTable,
    /// XTENSION = 'BINTABLE'.
    BinaryTable,
}

impl ExtensionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionType::Image => "IMAGE",
            ExtensionType::AsciiTable => "TABLE",
            ExtensionType::BinaryTable => "BINTABLE",
        }
    }
}

impl fmt::Display for ExtensionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which section of a given type to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionSelector {
    /// EXTNAME equal to this name (both sides trimmed).
    Name(String),
    /// The first section of the type with no EXTNAME (or a blank one).
    Unnamed,
    /// The n-th section of the type, starting at 1.
    Ordinal(usize),
}

impl fmt::Display for SectionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionSelector::Name(name) => write!(f, "named '{name}'"),
            SectionSelector::Unnamed => f.write_str("without a name"),
            SectionSelector::Ordinal(n) => write!(f, "#{n}"),
        }
    }
}

/// Byte layout of a located section. All offsets are absolute stream
/// positions.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionRecord {
    /// First byte of the section's header.
    pub header_start: u64,
    /// First byte of the data unit; the stream is left here.
    pub section_start: u64,
    /// End of the main table, not rounded.
    pub table_end: u64,
    /// End of table plus heap, rounded up to whole blocks.
    pub section_end: u64,
    /// PCOUNT, -1 if absent.
    pub heap_byte_count: i64,
    /// Heap start relative to `section_start`: THEAP, or NAXIS1 * NAXIS2.
    pub heap_offset: u64,
    /// The section's header.
    pub metadata: HeaderMetadata,
}

/// Walks sections forward from the current stream position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionLocator {
    retain_cards: bool,
}

impl ExtensionLocator {
    pub fn new(retain_cards: bool) -> Self {
        Self { retain_cards }
    }

    /// Find the first section of `section_type` matching `selector`.
    ///
    /// The search starts at the current position of `source`, which must be
    /// at a header boundary. A primary header met on the way is skipped and
    /// not counted. On success the stream is at the matched section's data
    /// start. When the stream runs out first the result is
    /// [`Error::ExtensionNotFound`] and the stream is left at its end; it is
    /// never rewound.
    pub fn find<R: Read + Seek + ?Sized>(
        &self,
        source: &mut R,
        section_type: &str,
        selector: &SectionSelector,
    ) -> Result<ExtensionRecord> {
        if *selector == SectionSelector::Ordinal(0) {
            return Err(Error::InvalidValue("section ordinals start at 1"));
        }
        let wanted_type = section_type.trim();
        let scanner = HeaderScanner::new(ScanOptions::any().retain_cards(self.retain_cards));
        let mut seen_of_type = 0usize;

        loop {
            let header_start = source.stream_position()?;
            let Some(metadata) = scanner.scan_next(source)? else {
                debug!(section_type = wanted_type, %selector, "no matching section");
                return Err(Error::ExtensionNotFound(format!(
                    "{wanted_type} section {selector}"
                )));
            };
            let section_start = source.stream_position()?;
            let sizes = metadata.sizes()?;
            let skip = sizes.padded;

            let same_type = metadata.is_extension
                && metadata.extension_type.as_deref().map(str::trim) == Some(wanted_type);
            if same_type {
                seen_of_type += 1;
                if selector_matches(selector, &metadata, seen_of_type) {
                    debug!(
                        section_type = wanted_type,
                        %selector,
                        header_start,
                        section_start,
                        "section found"
                    );
                    return record(header_start, section_start, sizes, metadata);
                }
            }

            debug!(
                extension = metadata.extension_type.as_deref().unwrap_or("PRIMARY"),
                name = metadata.extension_name.as_deref().unwrap_or(""),
                skip,
                "skipping section"
            );
            let skip = i64::try_from(skip)
                .map_err(|_| Error::malformed("section data length overflows a seek"))?;
            source.seek(SeekFrom::Current(skip))?;
        }
    }
}

/// Find a section with a default locator. See [`ExtensionLocator::find`].
pub fn find<R: Read + Seek + ?Sized>(
    source: &mut R,
    section_type: &str,
    selector: &SectionSelector,
    retain_cards: bool,
) -> Result<ExtensionRecord> {
    ExtensionLocator::new(retain_cards).find(source, section_type, selector)
}

fn selector_matches(selector: &SectionSelector, metadata: &HeaderMetadata, ordinal: usize) -> bool {
    let name = metadata
        .extension_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    match selector {
        SectionSelector::Name(wanted) => name == Some(wanted.trim()),
        SectionSelector::Unnamed => name.is_none(),
        SectionSelector::Ordinal(n) => *n == ordinal,
    }
}

fn record(
    header_start: u64,
    section_start: u64,
    sizes: DataSizes,
    metadata: HeaderMetadata,
) -> Result<ExtensionRecord> {
    let past_end = || Error::malformed("section extends past the addressable range");
    Ok(ExtensionRecord {
        header_start,
        section_start,
        table_end: section_start.checked_add(sizes.data).ok_or_else(past_end)?,
        section_end: section_start.checked_add(sizes.padded).ok_or_else(past_end)?,
        heap_byte_count: metadata.heap_byte_count,
        heap_offset: metadata.heap_start_offset(),
        metadata,
    })
}

/// Build the mandatory cards of an `IMAGE` extension holding data stored at
/// `precision`: XTENSION, BITPIX, NAXIS, NAXISn, PCOUNT, GCOUNT, then
/// BSCALE/BZERO for biased kinds and EXTNAME when given.
pub fn build_image_extension_header(
    precision: ElementKind,
    axis_lengths: &[usize],
    name: Option<&str>,
) -> Vec<HeaderCard> {
    let format = to_disk(precision);
    let mut cards = Vec::with_capacity(8 + axis_lengths.len());
    cards.push(HeaderCard::new(
        "XTENSION",
        Value::String(String::from(ExtensionType::Image.as_str())),
        Some("image extension"),
    ));
    push_shape(&mut cards, format.bitpix, axis_lengths);
    cards.push(HeaderCard::new("PCOUNT", Value::Integer(0), None));
    cards.push(HeaderCard::new("GCOUNT", Value::Integer(1), None));
    push_scaling(&mut cards, &format);
    if let Some(name) = name {
        cards.push(HeaderCard::new("EXTNAME", Value::String(String::from(name)), None));
    }
    cards
}
