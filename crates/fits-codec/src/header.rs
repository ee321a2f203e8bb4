//! Header card parsing and writing.
//!
//! A card is one 80-byte record: the keyword in bytes 0..8, the value
//! indicator `= ` in bytes 8..10 and the value field (with an optional
//! ` / comment`) in bytes 10..80. COMMENT, HISTORY and blank-keyword cards
//! carry free text instead of a value.

use std::str;

use crate::block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE, HEADER_PAD_BYTE};
use crate::value::{format_value, parse_value_field, Value};

/// A parsed header card. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCard {
    /// Keyword with trailing spaces trimmed (at most 8 characters).
    pub keyword: String,
    /// The parsed value, if the card has a value indicator and a readable value.
    pub value: Option<Value>,
    /// Comment text, or the free text of a commentary card.
    pub comment: Option<String>,
    /// `true` for COMMENT, HISTORY and blank-keyword cards.
    pub is_comment_line: bool,
    /// The full 80-character record as read (or as it will be written).
    pub record: String,
}

impl HeaderCard {
    /// Build a `KEYWORD = value / comment` card.
    pub fn new(keyword: &str, value: Value, comment: Option<&str>) -> Self {
        let mut card = Self {
            keyword: normalize_keyword(keyword),
            value: Some(value),
            comment: comment.map(String::from),
            is_comment_line: false,
            record: String::new(),
        };
        card.record = record_text(&format_card(&card));
        card
    }

    /// Build a commentary card (`COMMENT`, `HISTORY` or blank keyword).
    pub fn commentary(keyword: &str, text: &str) -> Self {
        let mut card = Self {
            keyword: normalize_keyword(keyword),
            value: None,
            comment: if text.is_empty() {
                None
            } else {
                Some(String::from(text))
            },
            is_comment_line: true,
            record: String::new(),
        };
        card.record = record_text(&format_card(&card));
        card
    }

    pub fn is_end(&self) -> bool {
        self.keyword == "END"
    }
}

fn normalize_keyword(keyword: &str) -> String {
    keyword.trim_end().chars().take(8).collect()
}

fn record_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Keywords that never carry a value indicator.
const COMMENTARY_KEYWORDS: [&str; 3] = ["COMMENT", "HISTORY", ""];

/// Trimmed keyword of a raw card, without parsing the rest.
pub fn card_keyword(card_bytes: &[u8; CARD_SIZE]) -> &str {
    let kw = &card_bytes[..8];
    let end = kw.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    str::from_utf8(&kw[..end]).unwrap_or("")
}

/// Parse a single 80-byte card.
///
/// Parsing is lenient: a card whose value cannot be read is returned with
/// `value: None` rather than rejected, because only the structural keywords
/// matter to the scanner and those are validated there.
pub fn parse_card(card_bytes: &[u8; CARD_SIZE]) -> HeaderCard {
    let keyword = String::from(card_keyword(card_bytes));
    let record = record_text(card_bytes);

    if keyword == "END" {
        return HeaderCard {
            keyword,
            value: None,
            comment: None,
            is_comment_line: false,
            record,
        };
    }

    let is_comment_line = COMMENTARY_KEYWORDS.contains(&keyword.as_str());
    if is_comment_line || !(card_bytes[8] == b'=' && card_bytes[9] == b' ') {
        return HeaderCard {
            keyword,
            value: None,
            comment: free_text(&card_bytes[8..]),
            is_comment_line,
            record,
        };
    }

    let (value, comment) = parse_value_field(&card_bytes[10..]);
    HeaderCard {
        keyword,
        value,
        comment,
        is_comment_line: false,
        record,
    }
}

fn free_text(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end();
    if text.is_empty() {
        None
    } else {
        Some(String::from(text))
    }
}

/// Serialize a [`HeaderCard`] into an 80-byte card image.
pub fn format_card(card: &HeaderCard) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    let kw = card.keyword.as_bytes();
    let kw_len = kw.len().min(8);
    buf[..kw_len].copy_from_slice(&kw[..kw_len]);

    if let Some(ref value) = card.value {
        buf[8] = b'=';
        buf[9] = b' ';
        let mut field = format_value(value);
        if let Some(ref comment) = card.comment {
            insert_comment(&mut field, comment);
        }
        buf[10..].copy_from_slice(&field);
    } else if let Some(ref text) = card.comment {
        let bytes = text.as_bytes();
        let len = bytes.len().min(CARD_SIZE - 8);
        buf[8..8 + len].copy_from_slice(&bytes[..len]);
    }
    buf
}

/// Place ` / comment` after the value already written into `field`.
fn insert_comment(field: &mut [u8; 70], comment: &str) {
    let content_end = if field[0] == b'\'' {
        let mut i = 1;
        loop {
            if i >= field.len() {
                break i;
            }
            if field[i] == b'\'' {
                if field.get(i + 1) == Some(&b'\'') {
                    i += 2;
                } else {
                    break i + 1;
                }
            } else {
                i += 1;
            }
        }
    } else {
        crate::value::FIXED_FIELD_WIDTH
    };

    let sep = content_end + 1;
    if sep + 3 >= field.len() {
        return;
    }
    field[sep] = b'/';
    field[sep + 1] = b' ';
    let start = sep + 2;
    let bytes = comment.as_bytes();
    let len = bytes.len().min(field.len() - start);
    field[start..start + len].copy_from_slice(&bytes[..len]);
}

/// The `END` card.
pub fn format_end_card() -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    buf[..3].copy_from_slice(b"END");
    buf
}

/// Serialize cards into whole header blocks.
///
/// Appends the END card and pads the final block with blank cards, so the
/// result length is always a multiple of [`BLOCK_SIZE`].
pub fn serialize_header(cards: &[HeaderCard]) -> Vec<u8> {
    let total_cards = cards.len() + 1;
    let total_bytes = total_cards.div_ceil(CARDS_PER_BLOCK) * BLOCK_SIZE;
    let mut buf = vec![HEADER_PAD_BYTE; total_bytes];

    for (i, card) in cards.iter().enumerate() {
        let offset = i * CARD_SIZE;
        buf[offset..offset + CARD_SIZE].copy_from_slice(&format_card(card));
    }
    let end_offset = cards.len() * CARD_SIZE;
    buf[end_offset..end_offset + CARD_SIZE].copy_from_slice(&format_end_card());
    buf
}
