//! PNG text chunks carrying the editable scene
//!
//! The container is treated as an opaque chunk stream: only text chunks with
//! the payload keyword are touched, every other chunk is copied byte for byte
//! so pixel data and foreign metadata survive an embed untouched.
//!
//! Chunk layout: 4-byte big-endian length, 4-byte type, data, CRC-32 over
//! type and data.

use png::text_metadata::{EncodableTextChunk, ITXtChunk};

use crate::error::{EditorError, EditorResult};

/// PNG magic bytes
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

const TEXT: [u8; 4] = *b"tEXt";
const INTERNATIONAL_TEXT: [u8; 4] = *b"iTXt";
const COMPRESSED_TEXT: [u8; 4] = *b"zTXt";
const END: [u8; 4] = *b"IEND";

/// Longest keyword the format allows
pub const MAX_KEYWORD_LEN: usize = 79;

/// One chunk, borrowed from the container bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub kind: [u8; 4],
    pub data: &'a [u8],
    /// Length, type, data and CRC exactly as stored
    pub raw: &'a [u8],
}

impl Chunk<'_> {
    pub fn kind_str(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }

    fn is_text(&self) -> bool {
        matches!(self.kind, TEXT | INTERNATIONAL_TEXT | COMPRESSED_TEXT)
    }

    /// Keyword of a text chunk, decoded as Latin-1
    pub fn keyword(&self) -> Option<String> {
        if !self.is_text() {
            return None;
        }
        let end = self.data.iter().position(|&b| b == 0)?;
        Some(latin1(&self.data[..end]))
    }

    /// Keyword and text of a `tEXt` or uncompressed `iTXt` chunk
    pub fn text(&self) -> Option<(String, String)> {
        let keyword = self.keyword()?;
        let rest = &self.data[keyword.chars().count() + 1..];
        match self.kind {
            TEXT => Some((keyword, latin1(rest))),
            INTERNATIONAL_TEXT => {
                let (&flag, rest) = rest.split_first()?;
                let (_method, rest) = rest.split_first()?;
                if flag != 0 {
                    log::debug!("Skipping compressed iTXt chunk {keyword}");
                    return None;
                }
                // Language tag, then translated keyword
                let lang_end = rest.iter().position(|&b| b == 0)?;
                let rest = &rest[lang_end + 1..];
                let translated_end = rest.iter().position(|&b| b == 0)?;
                let text = std::str::from_utf8(&rest[translated_end + 1..]).ok()?;
                Some((keyword, text.to_string()))
            }
            _ => None,
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Whether `bytes` start with the PNG signature
pub fn is_container_format(bytes: &[u8]) -> bool {
    bytes.starts_with(&SIGNATURE)
}

/// Split a PNG into its chunks, checking lengths and CRCs
pub fn parse_chunks(bytes: &[u8]) -> EditorResult<Vec<Chunk<'_>>> {
    if !is_container_format(bytes) {
        return Err(EditorError::container("missing PNG signature"));
    }
    let mut chunks = Vec::new();
    let mut pos = SIGNATURE.len();
    while pos < bytes.len() {
        let header = bytes
            .get(pos..pos + 8)
            .ok_or_else(|| EditorError::container(format!("truncated chunk header at {pos}")))?;
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let kind = [header[4], header[5], header[6], header[7]];
        let end = pos
            .checked_add(12)
            .and_then(|n| n.checked_add(len))
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                EditorError::container(format!(
                    "chunk {} at {pos} overruns the stream",
                    String::from_utf8_lossy(&kind)
                ))
            })?;
        let data = &bytes[pos + 8..pos + 8 + len];
        let stored = &bytes[pos + 8 + len..end];
        let stored = u32::from_be_bytes([stored[0], stored[1], stored[2], stored[3]]);
        if stored != chunk_crc(&kind, data) {
            return Err(EditorError::container(format!(
                "CRC mismatch in chunk {} at {pos}",
                String::from_utf8_lossy(&kind)
            )));
        }
        chunks.push(Chunk {
            kind,
            data,
            raw: &bytes[pos..end],
        });
        pos = end;
        if kind == END {
            break;
        }
    }
    Ok(chunks)
}

fn chunk_crc(kind: &[u8; 4], data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    hasher.finalize()
}

/// Check a keyword against the format's rules: 1 to 79 printable Latin-1
/// bytes
fn check_keyword(key: &str) -> EditorResult<()> {
    if let Some(c) = key
        .chars()
        .find(|&c| !matches!(u32::from(c), 0x20..=0x7e | 0xa1..=0xff))
    {
        return Err(EditorError::InvalidKeyword(format!("{key:?} contains {c:?}")));
    }
    let len = key.chars().count();
    if len == 0 || len > MAX_KEYWORD_LEN {
        return Err(EditorError::InvalidKeyword(format!(
            "{key:?} must be 1 to {MAX_KEYWORD_LEN} bytes"
        )));
    }
    Ok(())
}

/// Uncompressed `iTXt` chunk holding `value` as UTF-8
pub fn text_chunk(key: &str, value: &str) -> EditorResult<Vec<u8>> {
    check_keyword(key)?;
    let mut out = Vec::new();
    ITXtChunk::new(key, value)
        .encode(&mut out)
        .map_err(|err| EditorError::container(format!("cannot encode {key} chunk: {err}")))?;
    Ok(out)
}

/// Text of the first `tEXt`/`iTXt` chunk whose keyword is `key`.
///
/// Anything unreadable, from a foreign file to a corrupt chunk stream, is
/// reported as no payload.
pub fn extract_payload(bytes: &[u8], key: &str) -> Option<String> {
    let chunks = match parse_chunks(bytes) {
        Ok(chunks) => chunks,
        Err(err) => {
            log::debug!("No payload: {err}");
            return None;
        }
    };
    chunks
        .iter()
        .filter_map(Chunk::text)
        .find(|(keyword, _)| keyword == key)
        .map(|(_, text)| text)
}

/// Replace any text chunk keyed `key` with one holding `value`, placed just
/// before `IEND` (or at the end when there is none).
pub fn embed_payload(bytes: &[u8], key: &str, value: &str) -> EditorResult<Vec<u8>> {
    let chunk = text_chunk(key, value)?;
    let chunks = parse_chunks(bytes)?;
    let mut out = Vec::with_capacity(bytes.len() + chunk.len());
    out.extend_from_slice(&SIGNATURE);
    let mut inserted = false;
    let mut replaced = 0;
    for c in &chunks {
        if c.keyword().as_deref() == Some(key) {
            replaced += 1;
            continue;
        }
        if c.kind == END && !inserted {
            out.extend_from_slice(&chunk);
            inserted = true;
        }
        out.extend_from_slice(c.raw);
    }
    if !inserted {
        out.extend_from_slice(&chunk);
    }
    if replaced > 0 {
        log::debug!("Replaced {replaced} existing {key} chunk(s)");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use image::{Rgba, RgbaImage};

    /// 4x4 RGBA PNG, optionally with tEXt chunks
    fn png_with_text(texts: &[(&str, &str)]) -> Vec<u8> {
        let img = RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8 * 60, y as u8 * 60, 128, 255]));
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, 4, 4);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            for (k, v) in texts {
                encoder.add_text_chunk(k.to_string(), v.to_string()).unwrap();
            }
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(img.as_raw()).unwrap();
        }
        out
    }

    fn count_keyword(bytes: &[u8], key: &str) -> usize {
        parse_chunks(bytes)
            .unwrap()
            .iter()
            .filter(|c| c.keyword().as_deref() == Some(key))
            .count()
    }

    #[test]
    fn test_signature_check() {
        assert!(is_container_format(&png_with_text(&[])));
        assert!(!is_container_format(b"GIF89a"));
        assert!(!is_container_format(&SIGNATURE[..4]));
    }

    #[test]
    fn test_embed_then_extract_empty_container() {
        let png = png_with_text(&[]);
        assert_eq!(extract_payload(&png, "K"), None);
        let out = embed_payload(&png, "K", "V").unwrap();
        assert_eq!(extract_payload(&out, "K").as_deref(), Some("V"));
        let chunks = parse_chunks(&out).unwrap();
        let last = chunks.len() - 1;
        assert_eq!(&chunks[last].kind, b"IEND");
        assert_eq!(&chunks[last - 1].kind, b"iTXt");
    }

    #[test]
    fn test_unrelated_text_chunks_survive() {
        let png = png_with_text(&[("Software", "tests"), ("Comment", "hello")]);
        let out = embed_payload(&png, "K", "V").unwrap();
        assert_eq!(extract_payload(&out, "K").as_deref(), Some("V"));
        assert_eq!(extract_payload(&out, "Software").as_deref(), Some("tests"));
        assert_eq!(extract_payload(&out, "Comment").as_deref(), Some("hello"));
        // Every original chunk is copied byte for byte
        let before = parse_chunks(&png).unwrap();
        let after = parse_chunks(&out).unwrap();
        for chunk in &before {
            assert!(after.iter().any(|c| c.raw == chunk.raw), "lost {}", chunk.kind_str());
        }
    }

    #[test]
    fn test_existing_keyword_is_replaced() {
        let png = png_with_text(&[("K", "old")]);
        assert_eq!(extract_payload(&png, "K").as_deref(), Some("old"));
        let out = embed_payload(&png, "K", "new").unwrap();
        assert_eq!(count_keyword(&out, "K"), 1);
        assert_eq!(extract_payload(&out, "K").as_deref(), Some("new"));
        let again = embed_payload(&out, "K", "newer").unwrap();
        assert_eq!(count_keyword(&again, "K"), 1);
        assert_eq!(extract_payload(&again, "K").as_deref(), Some("newer"));
    }

    #[test]
    fn test_large_payload_keeps_pixels() {
        let png = png_with_text(&[]);
        assert!(png.len() < 500);
        let payload: String = (0..10 * 1024).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let out = embed_payload(&png, EditorConfig::PAYLOAD_KEY, &payload).unwrap();
        assert_eq!(extract_payload(&out, EditorConfig::PAYLOAD_KEY).as_deref(), Some(payload.as_str()));
        let original = image::load_from_memory(&png).unwrap().to_rgba8();
        let decoded = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_unicode_payload_round_trips() {
        let png = png_with_text(&[]);
        let value = r#"[{"kind":"arrow","note":"naïve → ✓"}]"#;
        let out = embed_payload(&png, "K", value).unwrap();
        assert_eq!(extract_payload(&out, "K").as_deref(), Some(value));
    }

    #[test]
    fn test_missing_end_chunk_appends() {
        let png = png_with_text(&[]);
        let chunks = parse_chunks(&png).unwrap();
        let without_end: Vec<u8> = SIGNATURE
            .iter()
            .copied()
            .chain(chunks.iter().filter(|c| &c.kind != b"IEND").flat_map(|c| c.raw.iter().copied()))
            .collect();
        let out = embed_payload(&without_end, "K", "V").unwrap();
        let last = parse_chunks(&out).unwrap().pop().unwrap();
        assert_eq!(&last.kind, b"iTXt");
        assert_eq!(extract_payload(&out, "K").as_deref(), Some("V"));
    }

    #[test]
    fn test_corrupt_stream_has_no_payload() {
        let png = embed_payload(&png_with_text(&[]), "K", "V").unwrap();
        let mut corrupt = png.clone();
        let at = corrupt.len() - 20;
        corrupt[at] ^= 0xff;
        assert_eq!(extract_payload(&corrupt, "K"), None);
        assert!(embed_payload(&corrupt, "K", "V").is_err());
        assert_eq!(extract_payload(&png[..png.len() - 3], "K"), None);
        assert_eq!(extract_payload(b"not a png", "K"), None);
    }

    #[test]
    fn test_compressed_itxt_is_skipped() {
        let mut chunk = ITXtChunk::new("K", "deflated scene");
        chunk.compress_text().unwrap();
        let mut compressed = Vec::new();
        chunk.encode(&mut compressed).unwrap();
        let png = png_with_text(&[]);
        let end = png.len() - 12;
        let mut spliced = png[..end].to_vec();
        spliced.extend_from_slice(&compressed);
        spliced.extend_from_slice(&png[end..]);
        assert_eq!(extract_payload(&spliced, "K"), None);
        // Embedding still removes it
        let out = embed_payload(&spliced, "K", "V").unwrap();
        assert_eq!(count_keyword(&out, "K"), 1);
    }

    #[test]
    fn test_text_chunk_layout() {
        let chunk = text_chunk("K", "{}").unwrap();
        assert_eq!(&chunk[..4], &9u32.to_be_bytes());
        assert_eq!(&chunk[4..8], b"iTXt");
        assert_eq!(&chunk[8..17], b"K\0\0\0\0\0{}");
        let crc = chunk_crc(b"iTXt", &chunk[8..17]);
        assert_eq!(&chunk[17..], &crc.to_be_bytes());
    }

    #[test]
    fn test_keyword_rules() {
        let png = png_with_text(&[]);
        assert!(matches!(embed_payload(&png, "", "V"), Err(EditorError::InvalidKeyword(_))));
        let long = "k".repeat(80);
        assert!(matches!(embed_payload(&png, &long, "V"), Err(EditorError::InvalidKeyword(_))));
        assert!(matches!(embed_payload(&png, "a\0b", "V"), Err(EditorError::InvalidKeyword(_))));
        assert!(embed_payload(&png, &"k".repeat(79), "V").is_ok());
    }
}
