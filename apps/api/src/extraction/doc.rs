//! Legacy Word 97-2003 binary documents.
//!
//! Text lives in the `WordDocument` stream and is addressed through the
//! piece table (CLX) stored in the `0Table` or `1Table` stream. Encrypted
//! OOXML packages are also OLE containers; they are reported as protected.

use std::io::{Cursor, Read, Seek};

use crate::extraction::{DocumentFormat, DocumentParser, ExtractionError};

const WORD_STREAM: &str = "/WordDocument";
const ENCRYPTED_PACKAGE_STREAM: &str = "/EncryptedPackage";
const WORD_IDENT: u16 = 0xA5EC;

const FIB_FLAGS_OFFSET: usize = 0x000A;
const FIB_CCP_TEXT_OFFSET: usize = 0x004C;
const FIB_FC_CLX_OFFSET: usize = 0x01A2;
const FIB_LCB_CLX_OFFSET: usize = 0x01A6;
const FIB_MIN_LEN: usize = 0x01AA;

const FLAG_ENCRYPTED: u16 = 0x0100;
const FLAG_WHICH_TABLE: u16 = 0x0200;

const CLX_PRC: u8 = 0x01;
const CLX_PCDT: u8 = 0x02;
const PCD_SIZE: usize = 8;
const FC_COMPRESSED: u32 = 0x4000_0000;

pub struct DocParser;

impl DocumentParser for DocParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Doc
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut file = cfb::CompoundFile::open(Cursor::new(bytes)).map_err(|e| {
            ExtractionError::CorruptOrUnreadable(format!("unreadable compound file: {e}"))
        })?;

        if file.exists(ENCRYPTED_PACKAGE_STREAM) {
            return Err(ExtractionError::EmptyOrProtected);
        }
        if !file.exists(WORD_STREAM) {
            return Err(ExtractionError::UnsupportedFormat(
                "compound file has no WordDocument stream".to_string(),
            ));
        }

        let word = read_stream(&mut file, WORD_STREAM)?;
        let fib = Fib::parse(&word)?;
        if fib.encrypted {
            return Err(ExtractionError::EmptyOrProtected);
        }

        let table = read_stream(&mut file, fib.table_stream())?;
        let clx = slice(&table, fib.fc_clx, fib.lcb_clx, "CLX")?;
        let pieces = parse_piece_table(clx)?;

        let mut text = String::new();
        for piece in pieces.iter().filter(|p| p.cp_start < fib.ccp_text) {
            let char_count = piece.cp_end.min(fib.ccp_text) - piece.cp_start;
            decode_piece(&word, piece, char_count, &mut text)?;
        }

        Ok(text)
    }
}

/// The handful of File Information Block fields needed to locate the text.
#[derive(Debug)]
struct Fib {
    encrypted: bool,
    use_table_one: bool,
    ccp_text: u32,
    fc_clx: u32,
    lcb_clx: u32,
}

impl Fib {
    fn parse(word: &[u8]) -> Result<Self, ExtractionError> {
        if word.len() < FIB_MIN_LEN || read_u16(word, 0)? != WORD_IDENT {
            return Err(ExtractionError::CorruptOrUnreadable(
                "WordDocument stream has no valid FIB".to_string(),
            ));
        }
        let flags = read_u16(word, FIB_FLAGS_OFFSET)?;
        Ok(Fib {
            encrypted: flags & FLAG_ENCRYPTED != 0,
            use_table_one: flags & FLAG_WHICH_TABLE != 0,
            ccp_text: read_u32(word, FIB_CCP_TEXT_OFFSET)?,
            fc_clx: read_u32(word, FIB_FC_CLX_OFFSET)?,
            lcb_clx: read_u32(word, FIB_LCB_CLX_OFFSET)?,
        })
    }

    fn table_stream(&self) -> &'static str {
        if self.use_table_one {
            "/1Table"
        } else {
            "/0Table"
        }
    }
}

#[derive(Debug, PartialEq)]
struct Piece {
    cp_start: u32,
    cp_end: u32,
    fc: u32,
    compressed: bool,
}

fn parse_piece_table(clx: &[u8]) -> Result<Vec<Piece>, ExtractionError> {
    let mut pos = 0usize;
    while pos < clx.len() {
        match clx[pos] {
            CLX_PRC => {
                let cb = read_u16(clx, pos + 1)? as usize;
                pos += 3 + cb;
            }
            CLX_PCDT => {
                let lcb = read_u32(clx, pos + 1)?;
                let plc = slice(clx, (pos + 5) as u32, lcb, "PlcPcd")?;
                return parse_plc_pcd(plc);
            }
            other => {
                return Err(ExtractionError::CorruptOrUnreadable(format!(
                    "unexpected CLX entry type 0x{other:02x}"
                )))
            }
        }
    }
    Err(ExtractionError::CorruptOrUnreadable(
        "CLX has no piece table".to_string(),
    ))
}

fn parse_plc_pcd(plc: &[u8]) -> Result<Vec<Piece>, ExtractionError> {
    // (n + 1) character positions of 4 bytes followed by n piece descriptors.
    if plc.len() < 4 || (plc.len() - 4) % (4 + PCD_SIZE) != 0 {
        return Err(ExtractionError::CorruptOrUnreadable(
            "piece table has an invalid length".to_string(),
        ));
    }
    let count = (plc.len() - 4) / (4 + PCD_SIZE);
    let pcd_base = (count + 1) * 4;

    let mut pieces = Vec::with_capacity(count);
    for i in 0..count {
        let cp_start = read_u32(plc, i * 4)?;
        let cp_end = read_u32(plc, (i + 1) * 4)?;
        if cp_end < cp_start {
            return Err(ExtractionError::CorruptOrUnreadable(
                "piece table character positions are not ascending".to_string(),
            ));
        }
        let raw_fc = read_u32(plc, pcd_base + i * PCD_SIZE + 2)?;
        pieces.push(Piece {
            cp_start,
            cp_end,
            fc: raw_fc & !(FC_COMPRESSED | 0x8000_0000),
            compressed: raw_fc & FC_COMPRESSED != 0,
        });
    }
    Ok(pieces)
}

fn decode_piece(
    word: &[u8],
    piece: &Piece,
    char_count: u32,
    out: &mut String,
) -> Result<(), ExtractionError> {
    if piece.compressed {
        let bytes = slice(word, piece.fc / 2, char_count, "compressed piece")?;
        out.extend(bytes.iter().map(|&b| map_control(cp1252_to_char(b))));
    } else {
        let bytes = slice(word, piece.fc, char_count * 2, "unicode piece")?;
        let units = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
        out.extend(
            char::decode_utf16(units)
                .map(|c| map_control(c.unwrap_or(char::REPLACEMENT_CHARACTER))),
        );
    }
    Ok(())
}

/// Maps Word's in-band control characters onto plain-text whitespace.
fn map_control(c: char) -> char {
    match c {
        '\r' | '\u{000B}' | '\u{000C}' => '\n',
        '\u{0007}' => '\t',
        c if c.is_control() && c != '\t' && c != '\n' => ' ',
        c => c,
    }
}

/// Windows-1252, which 8-bit ("compressed") pieces use.
fn cp1252_to_char(b: u8) -> char {
    const HIGH: [char; 32] = [
        '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}',
        '\u{2021}', '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}',
        '\u{017D}', '\u{FFFD}', '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
        '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}',
        '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
    ];
    match b {
        0x80..=0x9F => HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

fn read_stream<F: Read + Seek>(
    file: &mut cfb::CompoundFile<F>,
    path: &str,
) -> Result<Vec<u8>, ExtractionError> {
    let mut stream = file.open_stream(path).map_err(|e| {
        ExtractionError::CorruptOrUnreadable(format!("cannot open stream {path}: {e}"))
    })?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).map_err(|e| {
        ExtractionError::CorruptOrUnreadable(format!("cannot read stream {path}: {e}"))
    })?;
    Ok(buf)
}

fn slice<'a>(buf: &'a [u8], offset: u32, len: u32, what: &str) -> Result<&'a [u8], ExtractionError> {
    let start = offset as usize;
    start
        .checked_add(len as usize)
        .and_then(|end| buf.get(start..end))
        .ok_or_else(|| ExtractionError::CorruptOrUnreadable(format!("{what} lies outside its stream")))
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16, ExtractionError> {
    let bytes = slice(buf, offset as u32, 2, "u16 field")?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32, ExtractionError> {
    let bytes = slice(buf, offset as u32, 4, "u32 field")?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
