//! Best-effort text decoding for content search and the text viewer: try
//! UTF-8 first, and fall back to Latin-1 refined by the CP1252 table for
//! the 0x80-0x9F range (Latin-1 leaves those as C1 control codes; CP1252
//! repurposes most of them as printable punctuation, which is what files
//! actually encoded by a Windows editor almost always mean).

/// Windows-1252's printable overrides for the 0x80-0x9F byte range,
/// indexed by `byte - 0x80`. `None` means the position keeps its
/// Latin-1 (C1 control) meaning -- CP1252 leaves a handful undefined.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

fn decode_latin1_cp1252(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize].unwrap_or(b as char),
            other => other as char,
        })
        .collect()
}

/// Decodes `bytes` as UTF-8 if valid, otherwise as Latin-1/CP1252. Never
/// fails -- the fallback path has a defined mapping for every byte value.
pub fn decode_best_effort(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => decode_latin1_cp1252(bytes),
    }
}
