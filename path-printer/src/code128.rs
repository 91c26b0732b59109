//! CODE128 barcode encoder
//!
//! Encodes an ASCII payload into a CODE128 symbol: start character, data
//! codewords (code sets A, B and C with automatic switching), modulo-103
//! checksum and stop pattern. The result is a [`BarcodeSymbol`], a pure
//! description of bar and space widths in modules; drawing it is left to
//! the layout and surface modules.
//!
//! No human-readable text is part of the symbol.

use serde::Serialize;
use thiserror::Error;

/// Errors produced while encoding a payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Nothing to encode
    #[error("barcode payload is empty")]
    EmptyPayload,

    /// Character outside the ASCII range CODE128 covers
    #[error("character {ch:?} at position {position} cannot be encoded in CODE128")]
    UnsupportedCharacter { ch: char, position: usize },
}

/// CODE128 code set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSet {
    /// Upper case, digits, punctuation and ASCII control characters
    A,
    /// Upper and lower case, digits, punctuation
    B,
    /// Digit pairs 00-99
    C,
}

impl CodeSet {
    fn start_value(self) -> u8 {
        match self {
            CodeSet::A => START_A,
            CodeSet::B => START_B,
            CodeSet::C => START_C,
        }
    }

    /// Codeword that switches into this set
    fn switch_value(self) -> u8 {
        match self {
            CodeSet::A => CODE_A,
            CodeSet::B => CODE_B,
            CodeSet::C => CODE_C,
        }
    }

    /// Value of a single ASCII byte in set A or B
    fn value_of(self, byte: u8) -> Option<u8> {
        match self {
            CodeSet::A => match byte {
                0..=31 => Some(byte + 64),
                32..=95 => Some(byte - 32),
                _ => None,
            },
            CodeSet::B => match byte {
                32..=127 => Some(byte - 32),
                _ => None,
            },
            CodeSet::C => None,
        }
    }
}

const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;
const START_A: u8 = 103;
const START_B: u8 = 104;
const START_C: u8 = 105;
const STOP: u8 = 106;

/// Module widths (bar, space, bar, ...) for codewords 0-106.
/// Every data pattern spans 11 modules; the stop pattern spans 13.
const PATTERNS: [&[u8]; 107] = [
    b"212222", b"222122", b"222221", b"121223", b"121322", b"131222", b"122213", b"122312",
    b"132212", b"221213", b"221312", b"231212", b"112232", b"122132", b"122231", b"113222",
    b"123122", b"123221", b"223211", b"221132", b"221231", b"213212", b"223112", b"312131",
    b"311222", b"321122", b"321221", b"312212", b"322112", b"322211", b"212123", b"212321",
    b"232121", b"111323", b"131123", b"131321", b"112313", b"132113", b"132311", b"211313",
    b"231113", b"231311", b"112133", b"112331", b"132131", b"113123", b"113321", b"133121",
    b"313121", b"211331", b"231131", b"213113", b"213311", b"213131", b"311123", b"311321",
    b"331121", b"312113", b"312311", b"332111", b"314111", b"221411", b"431111", b"111224",
    b"111422", b"121124", b"121421", b"141122", b"141221", b"112214", b"112412", b"122114",
    b"122411", b"142112", b"142211", b"241211", b"221114", b"413111", b"241112", b"134111",
    b"111242", b"121142", b"121241", b"114212", b"124112", b"124211", b"411212", b"421112",
    b"421211", b"212141", b"214121", b"412121", b"111143", b"111341", b"131141", b"114113",
    b"114311", b"411113", b"411311", b"113141", b"114131", b"311141", b"411131", b"211412",
    b"211214", b"211232", b"2331112",
];

/// One dark bar, positioned in modules from the left edge of the symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    pub start: u32,
    pub width: u32,
}

/// An encoded CODE128 symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BarcodeSymbol {
    payload: String,
    codewords: Vec<u8>,
    widths: Vec<u8>,
}

impl BarcodeSymbol {
    /// The encoded text
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Full codeword sequence: start, data, checksum, stop
    pub fn codewords(&self) -> &[u8] {
        &self.codewords
    }

    /// Checksum codeword
    pub fn checksum(&self) -> u8 {
        self.codewords[self.codewords.len() - 2]
    }

    /// Alternating bar/space widths in modules, starting with a bar
    pub fn widths(&self) -> &[u8] {
        &self.widths
    }

    /// Total symbol width in modules (no quiet zone)
    pub fn module_count(&self) -> u32 {
        self.widths.iter().map(|&w| w as u32).sum()
    }

    /// Dark bars only, with their module offsets
    pub fn bars(&self) -> impl Iterator<Item = Bar> + '_ {
        let mut x = 0u32;
        self.widths.iter().enumerate().filter_map(move |(i, &w)| {
            let start = x;
            x += w as u32;
            (i % 2 == 0).then_some(Bar {
                start,
                width: w as u32,
            })
        })
    }

    /// Module on/off pattern, `true` = dark
    pub fn modules(&self) -> Vec<bool> {
        let mut out = Vec::with_capacity(self.module_count() as usize);
        for (i, &w) in self.widths.iter().enumerate() {
            out.extend(std::iter::repeat_n(i % 2 == 0, w as usize));
        }
        out
    }
}

/// Encode a payload into a CODE128 symbol.
///
/// Pure: the same payload always yields the same symbol.
pub fn encode(payload: &str) -> Result<BarcodeSymbol, EncodeError> {
    if payload.is_empty() {
        return Err(EncodeError::EmptyPayload);
    }
    if let Some((position, ch)) = payload.chars().enumerate().find(|(_, c)| !c.is_ascii()) {
        return Err(EncodeError::UnsupportedCharacter { ch, position });
    }

    let codewords = encode_codewords(payload.as_bytes());

    let mut widths = Vec::with_capacity(codewords.len() * 6 + 1);
    for &cw in &codewords {
        widths.extend(PATTERNS[cw as usize].iter().map(|d| d - b'0'));
    }

    Ok(BarcodeSymbol {
        payload: payload.to_string(),
        codewords,
        widths,
    })
}

/// Length of the digit run starting at `i`
fn digit_run(bytes: &[u8], i: usize) -> usize {
    bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count()
}

/// A or B, whichever the upcoming text needs first
fn preferred_text_set(rest: &[u8]) -> CodeSet {
    for &b in rest {
        if b < 32 {
            return CodeSet::A;
        }
        if b >= 96 {
            return CodeSet::B;
        }
    }
    CodeSet::B
}

fn start_set(bytes: &[u8]) -> CodeSet {
    let run = digit_run(bytes, 0);
    if run >= 4 || (run == 2 && bytes.len() == 2) {
        CodeSet::C
    } else {
        preferred_text_set(bytes)
    }
}

fn encode_codewords(bytes: &[u8]) -> Vec<u8> {
    let mut set = start_set(bytes);
    let mut codewords = vec![set.start_value()];

    let mut i = 0;
    while i < bytes.len() {
        match set {
            CodeSet::C => {
                if digit_run(bytes, i) >= 2 {
                    codewords.push((bytes[i] - b'0') * 10 + (bytes[i + 1] - b'0'));
                    i += 2;
                } else {
                    set = preferred_text_set(&bytes[i..]);
                    codewords.push(set.switch_value());
                }
            }
            CodeSet::A | CodeSet::B => {
                let run = digit_run(bytes, i);
                if run >= 4 && (i + run == bytes.len() || run >= 6) {
                    // Odd runs keep their first digit in the current set
                    if run % 2 == 1 {
                        codewords.push(bytes[i] - 32);
                        i += 1;
                    }
                    set = CodeSet::C;
                    codewords.push(CODE_C);
                    continue;
                }

                match set.value_of(bytes[i]) {
                    Some(v) => {
                        codewords.push(v);
                        i += 1;
                    }
                    None => {
                        set = if set == CodeSet::A { CodeSet::B } else { CodeSet::A };
                        codewords.push(set.switch_value());
                    }
                }
            }
        }
    }

    codewords.push(checksum(&codewords));
    codewords.push(STOP);
    codewords
}

/// Modulo-103 weighted sum; the start character has weight 1 like the first data codeword
fn checksum(codewords: &[u8]) -> u8 {
    let sum = codewords
        .iter()
        .enumerate()
        .map(|(pos, &cw)| cw as u32 * (pos as u32).max(1))
        .sum::<u32>();
    (sum % 103) as u8
}
