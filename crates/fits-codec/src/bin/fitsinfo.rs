use fits_codec::header::HeaderCard;
use fits_codec::{HeaderMetadata, HeaderScanner, ScanOptions};
use std::io::Cursor;
use std::process;

/// One section as seen by the scanner.
struct Section {
    header_start: u64,
    metadata: HeaderMetadata,
}

fn scan_sections(data: &[u8], verbose: bool) -> fits_codec::Result<Vec<Section>> {
    let scanner = HeaderScanner::new(ScanOptions::any().retain_cards(verbose).skip_data(true));
    let mut src = Cursor::new(data);
    let mut sections = Vec::new();
    while (src.position() as usize) < data.len() {
        let header_start = src.position();
        let metadata = scanner.scan(&mut src)?;
        sections.push(Section {
            header_start,
            metadata,
        });
    }
    Ok(sections)
}

fn format_section(index: usize, section: &Section) -> String {
    let meta = &section.metadata;
    let mut out = String::new();
    let kind = match meta.extension_type.as_deref() {
        Some(t) => format!("{} extension", t),
        None => String::from("Primary"),
    };
    let label = match meta.extension_name.as_deref() {
        Some(name) => format!(" (EXTNAME: {})", name),
        None => String::new(),
    };
    out.push_str(&format!("HDU {}: {}{}\n", index, kind, label));
    out.push_str(&format!("  BITPIX: {}\n", meta.element_width_bits));
    out.push_str(&format!("  NAXIS: {}\n", meta.rank()));
    if !meta.axis_lengths.is_empty() {
        out.push_str(&format!("  Dimensions: {:?}\n", meta.axis_lengths));
    }
    if !meta.disk_format().is_identity() {
        out.push_str(&format!(
            "  BSCALE/BZERO: {} / {}\n",
            meta.scale, meta.offset
        ));
    }
    let data_start = section.header_start + meta.header_byte_len;
    out.push_str(&format!("  Header offset: {}\n", section.header_start));
    out.push_str(&format!("  Data offset: {}\n", data_start));
    out.push_str(&format!("  Data size: {} bytes\n", meta.data_byte_len()));
    if meta.heap_byte_count > 0 {
        out.push_str(&format!("  Heap size: {} bytes\n", meta.heap_byte_len()));
    }
    out
}

fn format_verbose_cards(cards: &[HeaderCard]) -> String {
    let mut out = String::new();
    out.push_str("  Other header cards:\n");
    for card in cards {
        match (&card.value, &card.comment) {
            (Some(val), Some(comment)) => {
                out.push_str(&format!("    {} = {:?} / {}\n", card.keyword, val, comment));
            }
            (Some(val), None) => {
                out.push_str(&format!("    {} = {:?}\n", card.keyword, val));
            }
            (None, Some(comment)) => {
                out.push_str(&format!("    {} {}\n", card.keyword, comment));
            }
            (None, None) => {
                if !card.keyword.is_empty() {
                    out.push_str(&format!("    {}\n", card.keyword));
                }
            }
        }
    }
    out
}

fn format_fits_info(sections: &[Section], verbose: bool) -> String {
    let mut out = String::new();
    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format_section(i, section));
        if verbose {
            out.push_str(&format_verbose_cards(&section.metadata.cards));
        }
    }
    out
}

fn run(args: &[String]) -> Result<String, String> {
    let mut verbose = false;
    let mut file_path = None;

    for arg in args {
        if arg == "-v" || arg == "--verbose" {
            verbose = true;
        } else if arg.starts_with('-') {
            return Err(format!("Unknown option: {}", arg));
        } else {
            if file_path.is_some() {
                return Err("Too many arguments".to_string());
            }
            file_path = Some(arg.as_str());
        }
    }

    let path = file_path.ok_or_else(|| {
        "Usage: fitsinfo [-v] <file.fits>\n\nPrint a section summary for a FITS file.".to_string()
    })?;

    let data = std::fs::read(path).map_err(|e| format!("Error reading '{}': {}", path, e))?;
    let sections =
        scan_sections(&data, verbose).map_err(|e| format!("Error parsing '{}': {}", path, e))?;

    Ok(format_fits_info(&sections, verbose))
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(output) => print!("{}", output),
        Err(msg) => {
            eprintln!("{}", msg);
            process::exit(1);
        }
    }
}
