//! Label packing.
//!
//! Labels are drawn on the GPU by looking up glyphs in the atlas. Each point
//! carries a fixed window of `LABEL_WINDOW` characters packed two per float:
//! `second * 256 + first`. One draw pass renders one character slot.

mod encoder;

pub use encoder::EncodeOutcome;

pub(crate) use encoder::encode;

/// Characters rendered per label.
pub const LABEL_WINDOW: usize = 8;

/// Floats holding one packed label; two characters per float.
pub const LABEL_WORDS: usize = LABEL_WINDOW / 2;

/// Code written for character slots past the end of the string.
pub const MISSING_GLYPH: u32 = 8;

/// Code written for characters outside the single-byte range.
pub const FALLBACK_GLYPH: u32 = 127;

/// Atlas code for one character slot.
#[inline]
pub fn glyph_code(ch: Option<char>) -> u32 {
    match ch {
        None => MISSING_GLYPH,
        Some(c) => clamp_code(c as u32),
    }
}

#[inline]
fn clamp_code(code: u32) -> u32 {
    if code > 255 { FALLBACK_GLYPH } else { code }
}

/// Packs two character codes into one 16-bit value, `second * 256 + first`.
///
/// Codes above 255 are replaced with [`FALLBACK_GLYPH`].
#[inline]
pub fn pack_pair(first: u32, second: u32) -> u32 {
    clamp_code(second) * 256 + clamp_code(first)
}

/// Inverse of [`pack_pair`]: `(first, second)`.
#[inline]
pub fn unpack_pair(packed: u32) -> (u8, u8) {
    ((packed & 0xff) as u8, ((packed >> 8) & 0xff) as u8)
}

/// Packs the first `LABEL_WINDOW` characters of `text` into `LABEL_WORDS` floats.
pub fn pack_label(text: &str) -> [f32; LABEL_WORDS] {
    let mut chars = text.chars();
    let mut words = [0.0; LABEL_WORDS];
    for word in &mut words {
        let first = glyph_code(chars.next());
        let second = glyph_code(chars.next());
        *word = pack_pair(first, second) as f32;
    }
    words
}

/// How label text is turned into glyph codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LabelEncoding {
    /// One byte per character; wider code points become [`FALLBACK_GLYPH`].
    Ascii,
}

/// The label configuration a tile's packed buffer was built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelKey {
    pub field: String,
    pub encoding: LabelEncoding,
}

impl LabelKey {
    pub fn new(field: impl Into<String>, encoding: LabelEncoding) -> Self {
        Self {
            field: field.into(),
            encoding,
        }
    }
}

/// Per-tile label bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelState {
    pub last_encoded: Option<LabelKey>,
}

impl LabelState {
    #[inline]
    pub fn is_current(&self, key: &LabelKey) -> bool {
        self.last_encoded.as_ref() == Some(key)
    }
}
