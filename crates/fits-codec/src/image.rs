//! Whole image sections: header plus data unit.

use std::io::{self, Read, Write};

use crate::block::skip_bytes;
use crate::data::DataUnit;
use crate::decode::{decode, DecodeRequest};
use crate::encode::encode;
use crate::error::{Error, Result};
use crate::extension::build_image_extension_header;
use crate::header::serialize_header;
use crate::precision::ElementKind;
use crate::primary::build_primary_header;
use crate::progress::CodecOptions;
use crate::scanner::{HeaderMetadata, HeaderScanner, ScanOptions};

/// Where a written section goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The primary section; `extend` announces that extensions follow.
    Primary { extend: bool },
    /// An `IMAGE` extension, optionally named.
    Extension { name: Option<String> },
}

/// Write `unit` as a complete image section stored at `precision`.
///
/// Returns the number of bytes written (header plus padded data).
pub fn write_image_section<W: Write + ?Sized>(
    sink: &mut W,
    unit: &DataUnit,
    precision: ElementKind,
    placement: &Placement,
    options: &CodecOptions,
) -> Result<u64> {
    let cards = match placement {
        Placement::Primary { extend } => build_primary_header(precision, unit.shape(), *extend),
        Placement::Extension { name } => {
            build_image_extension_header(precision, unit.shape(), name.as_deref())
        }
    };
    let header = serialize_header(&cards);
    sink.write_all(&header)?;
    let data = encode(sink, unit, precision, options)?;
    Ok(header.len() as u64 + data)
}

/// Read the section at the current position of `source`: scan its header
/// (primary or extension), decode its data unit, then consume the block
/// padding and any heap so that `source` sits at the next header.
pub fn read_image_section<R: Read + ?Sized>(
    source: &mut R,
    request: &DecodeRequest,
    options: &CodecOptions,
) -> Result<(HeaderMetadata, DataUnit)> {
    let metadata = HeaderScanner::new(ScanOptions::any()).scan(source)?;
    let unit = decode(source, &metadata, request, options)?;
    let sizes = metadata.sizes()?;
    let rest = sizes.padded - sizes.data;
    if skip_bytes(source, rest)? < rest {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "end of stream inside data padding",
        )));
    }
    Ok((metadata, unit))
}
