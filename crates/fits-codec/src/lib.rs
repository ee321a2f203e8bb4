//! Low-level FITS block-container codec: header scanning, data-unit
//! decode/encode across the standard element kinds, and extension lookup.

pub mod block;
pub mod data;
pub mod decode;
pub mod encode;
pub mod endian;
pub mod error;
pub mod extension;
pub mod header;
pub mod image;
pub mod precision;
pub mod primary;
pub mod progress;
pub mod scanner;
pub mod value;

mod partition;

#[cfg(feature = "array")]
mod array;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use data::{DataUnit, Element, ElementData};
pub use decode::{decode, decode_bytes, AxisRange, DecodeRequest, OutputShape, TargetKind};
pub use encode::{encode, encode_to_vec};
pub use error::{Error, Result};
pub use extension::{ExtensionLocator, ExtensionRecord, ExtensionType, SectionSelector};
pub use header::HeaderCard;
pub use image::{read_image_section, write_image_section, Placement};
pub use precision::{to_disk, to_runtime, DiskFormat, ElementKind};
pub use progress::{CodecOptions, ProgressSink};
pub use scanner::{
    scan_extension, scan_primary, DataSizes, Expect, HeaderMetadata, HeaderScanner, ScanOptions,
};
pub use value::Value;
