//! FIGfonts
//!
//! Font types and the logic for parsing `.flf`/`.tlf` font data.

mod header;

use std::collections::HashMap;
use std::str;

use bstr::{BString, ByteSlice as _};
use itertools::Itertools as _;
use tracing::warn;

#[cfg(feature = "fonts")]
pub use figkit_fonts::FontFile;
use thiserror::Error;

pub use header::{Hardblank, Header, HeaderError, PrintDirection};

use crate::render::{self, RenderError, RenderOptions};

/// The 102 codepoints for characters that are included in all FIGfonts
///
/// Consists of 95 printable ASCII characters and 7 Deutsch characters from the Latin-1 encoding.
pub const DEFAULT_CODEPOINTS: [u8; 102] = *b" !\"#$%&'()*+,-./0123456789:;<=>?@\
                                             ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`\
                                             abcdefghijklmnopqrstuvwxyz{|}~\
                                             \xc4\xd6\xdc\xe4\xf6\xfc\xdf";

/// A FIGfont
///
/// Immutable once constructed, so a loaded font can be shared freely between threads and reused
/// across any number of render calls.
#[derive(Debug)]
pub struct Font {
    header: Header,
    comments: String,
    glyphs: HashMap<u32, Glyph>,
    code_tag_labels: HashMap<u32, String>,
    ignored_characters: HashMap<u32, String>,
    max_width: usize,
    is_utf8: bool,
}

impl Font {
    pub(crate) const PLAIN: &'static [u8] = include_bytes!("plain.flf");

    /// Decodes the contents of an `.flf` or `.tlf` file.
    ///
    /// If unsure about the input being a fully compliant FIGfont, consider
    /// [`Font::from_bytes_with_warnings`]; this method is a convenience wrapper around that,
    /// ignoring the warnings. Notably, if the font has FIGcharacters that do not use the same
    /// number of sub-characters (bytes) per row, the rendering algorithm may behave unexpectedly,
    /// but this is only emitted as a warning and not a fatal error.
    ///
    /// # Errors
    /// Returns `Err` on a fatal decoding error; see [`FontError`] for details.
    pub fn from_bytes(font: impl AsRef<[u8]>) -> Result<Self, FontError> {
        Self::from_bytes_with_warnings(font).map(|(font, _)| font)
    }

    /// Decodes the contents of an `.flf` or `.tlf` file and also returns any non-fatal issues
    /// found while decoding.
    ///
    /// See [`FontWarning`] for details on these warnings. Malformed *optional* code-tagged
    /// glyphs beyond the required 102 are skipped with a warning rather than rejected, since
    /// fonts with such defects are in circulation.
    ///
    /// # Errors
    /// Returns `Err` on a fatal decoding error; see [`FontError`] for details.
    pub fn from_bytes_with_warnings(
        bytes: impl AsRef<[u8]>,
    ) -> Result<(Self, Vec<FontWarning>), FontError> {
        let mut warnings = Vec::new();
        let font_string: BString = bytes
            .as_ref()
            .replace("\r\n", "\n")
            .into_iter()
            .map(|c| if c == b'\r' { b'\n' } else { c })
            .collect();

        let mut lines = font_string.lines();
        let Some(header_line) = lines.next() else {
            return Err(FontError::BadHeader(HeaderError::Missing));
        };
        let (header, bad_baseline) = Header::decode_inner(header_line)?;
        if let Some(baseline) = bad_baseline {
            warnings.push(FontWarning::Baseline(baseline));
        } else if let Some(baseline) = header.baseline
            && !(0 < baseline && baseline <= header.height.get())
        {
            warnings.push(FontWarning::BaselineOutOfRange {
                baseline,
                height: header.height.get(),
            });
        }
        let comments =
            String::from_utf8_lossy(&bstr::join("\n", lines.by_ref().take(header.comment_lines)))
                .into_owned();
        let mut font = Self {
            header,
            comments,
            glyphs: HashMap::new(),
            code_tag_labels: HashMap::new(),
            ignored_characters: HashMap::new(),
            max_width: 0,
            is_utf8: true,
        };
        font.decode_glyphs(&mut lines, &mut warnings)?;

        Ok((font, warnings))
    }

    /// Decodes the "plain.flf" font, included with this crate.
    #[expect(clippy::missing_panics_doc, reason = "should be caught in tests")]
    #[must_use]
    pub fn plain() -> Self {
        Self::from_bytes(Self::PLAIN).expect("Should be tested")
    }

    /// Decodes a FIGfont from the `figkit-fonts` crate.
    ///
    /// Only available with the `fonts` feature.
    #[expect(clippy::missing_panics_doc, reason = "should be caught in tests")]
    #[cfg(feature = "fonts")]
    #[must_use]
    pub fn built_in(font: FontFile) -> Self {
        Self::from_bytes(font.as_bytes()).expect("Should be tested")
    }

    /// Renders a string with default options (width 80, automatic justification and direction).
    ///
    /// # Errors
    /// See [`RenderError`]; with the default options this can only fail if the font has neither
    /// the requested characters nor a space glyph to substitute.
    pub fn render(&self, string: &str) -> Result<String, RenderError> {
        render::render(string, self, &RenderOptions::default()).map(|block| block.text())
    }

    /// The *comments* portion of the FIGfont, between the header and the FIGcharacters. Usually
    /// contains information about the font author.
    #[must_use]
    pub fn comments(&self) -> &str {
        &self.comments
    }

    /// The fully decoded font header.
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Human-readable information, usually *translation tables*, included in the font as tagged
    /// characters with negative character codes.
    #[must_use]
    pub const fn ignored_characters(&self) -> &HashMap<u32, String> {
        &self.ignored_characters
    }

    /// Returns true if each row of each FIGcharacter in the font is a valid UTF-8 string.
    #[must_use]
    pub const fn is_utf8(&self) -> bool {
        self.is_utf8
    }

    #[expect(
        single_use_lifetimes,
        reason = "https://github.com/rust-lang/rust/issues/137575"
    )]
    fn decode_glyphs<'a>(
        &mut self,
        mut lines: impl Iterator<Item = &'a [u8]>,
        warnings: &mut Vec<FontWarning>,
    ) -> Result<(), FontError> {
        let height = self.header.height.get();
        let required_chunks = lines.by_ref().take(DEFAULT_CODEPOINTS.len() * height).chunks(height);
        for (codepoint, rows) in DEFAULT_CODEPOINTS.into_iter().zip(&required_chunks) {
            let glyph = Glyph::parse(rows, codepoint.into(), &self.header, warnings)?;
            drop(self.glyphs.insert(codepoint.into(), glyph));
        }
        drop(required_chunks);
        if self.glyphs.len() != DEFAULT_CODEPOINTS.len() {
            return Err(FontError::MissingRequiredCharacters {
                found: self.glyphs.len(),
            });
        }
        let mut processed_tags = 0;
        for mut rows in &lines.by_ref().chunks(height + 1) {
            let line = rows.next().expect("chunk size >= 1");

            let (codepoint, label) = line
                .split_once_str(" ")
                .map_or((line, None), |(codepoint, desc)| {
                    (codepoint, Some(desc.trim_ascii()))
                });
            let codepoint_str = match str::from_utf8(codepoint) {
                Ok(codepoint) => codepoint,
                Err(_) => {
                    warn!(tag = %BString::new(line.to_owned()), "skipping glyph with undecodable code tag");
                    warnings.push(FontWarning::BadCodeTag(line.into()));
                    continue;
                }
            };
            let (codepoint, positive) = match Self::parse_codepoint(codepoint_str) {
                Ok(parsed) => parsed,
                Err(error) => {
                    warn!(%error, "skipping glyph with malformed code tag");
                    warnings.push(FontWarning::BadCodeTag(line.into()));
                    continue;
                }
            };
            processed_tags += 1;
            if positive {
                if let Some(label) = label {
                    drop(
                        self.code_tag_labels
                            .insert(codepoint, String::from_utf8_lossy(label).into_owned()),
                    );
                }
                match Glyph::parse(rows, codepoint, &self.header, warnings) {
                    Ok(glyph) => {
                        // If two or more FIGcharacters have the same character code, the last
                        // one in the FIGfont is the one used. (L1181--1182, figfont.txt)
                        drop(self.glyphs.insert(codepoint, glyph));
                    }
                    Err(error) => {
                        warn!(codepoint, %error, "skipping malformed code-tagged glyph");
                        warnings.push(FontWarning::BadCodeTaggedGlyph(codepoint));
                    }
                }
            } else {
                drop(self.ignored_characters.insert(
                    codepoint,
                    String::from_utf8_lossy(&bstr::join(b"\n", rows)).into_owned(),
                ));
            }
        }
        if processed_tags < self.header.code_tag_count {
            warnings.push(FontWarning::TooFewCodeTags {
                found: processed_tags,
                expected: self.header.code_tag_count,
            });
        }
        self.max_width = self.glyphs.values().map(|c| c.width).max().unwrap_or(0);
        self.is_utf8 = self.glyphs.values().all(|c| c.is_utf8);
        Ok(())
    }

    /// A codepoint in a *code tag* may be positive, denoting an actual character, or negative,
    /// signifying human-readable information, usually translation tables. This is a convenience
    /// function to parse such a codepoint, returning the absolute value and the sign (`true` if
    /// positive, `false` if negative) separately.
    pub(crate) fn parse_codepoint(codepoint: &str) -> Result<(u32, bool), FontError> {
        let (positive, codepoint) = codepoint
            .strip_prefix('-')
            .map_or((true, codepoint), |codepoint| (false, codepoint));
        let result = if codepoint == "0" {
            Ok(0)
        } else if let Some(codepoint) = codepoint.strip_prefix("0x") {
            u32::from_str_radix(codepoint, 16)
        } else if let Some(codepoint) = codepoint.strip_prefix("0X") {
            u32::from_str_radix(codepoint, 16)
        } else if let Some(codepoint) = codepoint.strip_prefix("0") {
            u32::from_str_radix(codepoint, 8)
        } else {
            codepoint.parse()
        };
        let codepoint = result.map_err(|_| FontError::InvalidCharacterCode(codepoint.into()))?;
        if (positive && codepoint <= 0x7FFF_FFFF)
            || (!positive && (2..=0x8000_0000).contains(&codepoint))
        {
            Ok((codepoint, positive))
        } else {
            Err(FontError::CharacterCodeOutOfRange(codepoint))
        }
    }

    pub(crate) fn get(&self, char: char) -> Option<&Glyph> {
        self.glyphs
            .get(&u32::from(char))
            .or_else(|| self.glyphs.get(&0))
    }

    /// The maximum width across all FIGcharacters in this font, measured in sub-characters
    /// (bytes).
    #[must_use]
    pub const fn max_width(&self) -> usize {
        self.max_width
    }
}

/// A single FIGcharacter: a fixed-height block of text rows
#[derive(Debug)]
pub(crate) struct Glyph {
    pub width: usize,
    pub rows: Vec<Vec<u8>>,
    pub is_utf8: bool,
}

impl Glyph {
    #[expect(
        single_use_lifetimes,
        reason = "https://github.com/rust-lang/rust/issues/137575"
    )]
    pub(crate) fn parse<'a>(
        rows: impl Iterator<Item = &'a [u8]>,
        codepoint: u32,
        header: &Header,
        warnings: &mut Vec<FontWarning>,
    ) -> Result<Self, FontError> {
        let mut too_large_length = None;
        let mut blank_end_mark = false;
        let mut is_utf8 = true;
        let rows = rows
            .map(|line| {
                if line.len() > header.max_length {
                    too_large_length = Some(line.len());
                }
                let &last = line.last()?;
                if last == b' ' {
                    blank_end_mark = true;
                }
                // The row ends with one endmark, or two on the final row of the glyph. A run
                // longer than two is glyph content that happens to match the endmark.
                let mark_count = line
                    .iter()
                    .rev()
                    .take_while(|&&c| c == last)
                    .count()
                    .min(2);
                let (line, _) = line.split_at(line.len() - mark_count);
                if !line.is_utf8() {
                    is_utf8 = false;
                }
                Some(line.to_owned())
            })
            .collect::<Option<Vec<_>>>()
            .ok_or(FontError::EmptyRow(codepoint))?;
        if rows.len() != header.height.get() {
            return Err(FontError::TruncatedCharacter {
                codepoint,
                found: rows.len(),
                expected: header.height.get(),
            });
        }
        if let Some(length) = too_large_length {
            warnings.push(FontWarning::ExcessLength {
                codepoint,
                length,
                max_length: header.max_length,
            });
        }
        if blank_end_mark {
            warnings.push(FontWarning::BlankEndMark(codepoint));
        }
        let width = match rows.iter().map(Vec::len).unique().exactly_one() {
            Ok(width) => width,
            Err(widths) => {
                warnings.push(FontWarning::InconsistentWidth(codepoint));
                widths.max().expect("height is non-zero")
            }
        };

        Ok(Self {
            width,
            rows,
            is_utf8,
        })
    }
}

/// An error in decoding a FIGfont
#[derive(Debug, Error)]
pub enum FontError {
    /// An error in decoding the header
    #[error("Bad header: {0}")]
    BadHeader(#[from] HeaderError),
    /// An unsigned character code that cannot be parsed as a `u32`
    #[error("{0} is not a valid character code")]
    InvalidCharacterCode(BString),
    /// A character code outside the ranges `0..=2147483647` and `-2147483648..-1`
    #[error("character code {0} out of range")]
    CharacterCodeOutOfRange(u32),
    /// A FIGcharacter that has an empty row, without an *endmark*
    #[error("empty row in FIGcharacter {0}")]
    EmptyRow(u32),
    /// The font body ended before all 102 required FIGcharacters were read
    #[error("only {found} of the 102 required FIGcharacters are present")]
    MissingRequiredCharacters {
        /// The number of required FIGcharacters found
        found: usize,
    },
    /// A FIGcharacter with fewer rows than the height declared in the header
    #[error("FIGcharacter {codepoint} has {found} rows, expected {expected}")]
    TruncatedCharacter {
        /// The character code
        codepoint: u32,
        /// The number of rows found
        found: usize,
        /// The height from the header
        expected: usize,
    },
}

/// A non-fatal issue with a FIGfont found while decoding
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum FontWarning {
    /// The baseline parameter cannot be parsed as a `usize`.
    #[error(r#"could not parse "{0}" as the baseline parameter"#)]
    Baseline(BString),
    /// The baseline parameter is not between 1 and the height parameter (inclusive).
    #[error("baseline {baseline} not between 1 and {height} (height)")]
    BaselineOutOfRange {
        /// The baseline parameter
        baseline: usize,
        /// The height parameter
        height: usize,
    },
    /// The font contains fewer tagged characters than specified in the header.
    #[error("found {found} tagged characters but expected {expected} from header")]
    TooFewCodeTags {
        /// The number of tagged characters in the font
        found: usize,
        /// The number of tagged characters specified in the header
        expected: usize,
    },
    /// A FIGcharacter has inconsistent width, which may cause unexpected rendering behavior.
    #[error("FIGcharacter with code {} has inconsistent width", Self::char_debug(*.0))]
    InconsistentWidth(u32),
    /// A FIGcharacter has a width greater than the maximum specified in the header.
    #[error("FIGcharacter with code {} has width {length} > {} (from header)", Self::char_debug(*.codepoint), .max_length)]
    ExcessLength {
        /// The character code
        codepoint: u32,
        /// The length of a row that is too wide
        length: usize,
        /// The maximum length of a row specified in the header
        max_length: usize,
    },
    /// A code tag line beyond the required characters that could not be parsed. The glyph it
    /// introduces is skipped; parsing continues with the next one.
    #[error("unparseable code tag: {0}")]
    BadCodeTag(BString),
    /// A code-tagged glyph whose body was malformed or truncated. The glyph is skipped.
    #[error("malformed body for code-tagged FIGcharacter {0}")]
    BadCodeTaggedGlyph(u32),
    /// A row in a FIGcharacter uses blank as an endmark. This likely indicates an extraneous
    /// trailing space, especially in combination with [`FontWarning::InconsistentWidth`].
    #[error("FIGcharacter with code {0} uses a blank as endmark")]
    BlankEndMark(u32),
}

impl FontWarning {
    pub(crate) fn char_debug(codepoint: u32) -> String {
        char::try_from(codepoint).map_or_else(
            |_| format!("\\u{{{codepoint:04X}}}"),
            |char| char.to_string(),
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::{DEFAULT_CODEPOINTS, Font, FontError, FontWarning};

    /// Builds a syntactically complete two-row test font where every character renders as
    /// itself, doubled vertically, with `extra` appended after the required FIGcharacters.
    pub(crate) fn identity_font(extra: &str) -> String {
        let mut font = String::from("flf2a$ 2 2 4 -1 2 0 0 0\nidentity test font\n(generated)\n");
        for codepoint in DEFAULT_CODEPOINTS {
            let content = match codepoint {
                b' ' => '$',
                0xc4 | 0xd6 | 0xdc => '#',
                0xe4 | 0xf6 | 0xfc | 0xdf => '+',
                other => other.into(),
            };
            let mark = if content == '@' { '#' } else { '@' };
            font.push_str(&format!("{content}{mark}\n{content}{mark}{mark}\n"));
        }
        font.push_str(extra);
        font
    }

    #[test]
    fn parse_plain() {
        let (font, warnings) = Font::from_bytes_with_warnings(Font::PLAIN).unwrap();
        assert_eq!(warnings, []);
        assert_eq!(font.header.hardblank, 0x7f);
        assert_eq!(font.header.height.get(), 1);
        assert_eq!(font.header.baseline, Some(1));
        assert_eq!(font.glyphs.len(), DEFAULT_CODEPOINTS.len());
        assert!(font.is_utf8());
        assert_eq!(font.max_width(), 1);
    }

    #[test]
    fn every_glyph_has_header_height() {
        let font = Font::plain();
        let height = font.header().height.get();
        for glyph in font.glyphs.values() {
            assert_eq!(glyph.rows.len(), height);
        }
    }

    #[cfg(feature = "fonts")]
    #[test]
    fn parse_all_built_in() {
        use figkit_fonts::FontFile;

        for file in FontFile::ALL {
            let (font, warnings) = Font::from_bytes_with_warnings(file.as_bytes())
                .unwrap_or_else(|e| panic!("failed to parse {file:?}: {e:?}"));
            assert_eq!(warnings, [], "warnings produced when parsing {file:?}");
            let height = font.header().height.get();
            for glyph in font.glyphs.values() {
                assert_eq!(glyph.rows.len(), height, "bad glyph height in {file:?}");
            }
        }
    }

    #[test]
    fn identity_glyphs_round_trip() {
        let font = Font::from_bytes(identity_font("")).unwrap();
        let glyph = font.get('A').unwrap();
        assert_eq!(glyph.rows, [b"A", b"A"]);
        assert_eq!(glyph.width, 1);
    }

    #[test]
    fn code_tagged_glyph_is_parsed() {
        let font = Font::from_bytes(identity_font("0x153 LATIN SMALL LIGATURE OE\noe@\noe@@\n"))
            .unwrap();
        let glyph = font.get('\u{153}').unwrap();
        assert_eq!(glyph.rows, [b"oe", b"oe"]);
        assert_eq!(
            font.code_tag_labels.get(&0x153).map(String::as_str),
            Some("LATIN SMALL LIGATURE OE")
        );
    }

    #[test]
    fn duplicate_code_tag_last_wins() {
        let font =
            Font::from_bytes(identity_font("65 capital a\nX@\nX@@\n65 again\nY@\nY@@\n")).unwrap();
        assert_eq!(font.get('A').unwrap().rows, [b"Y", b"Y"]);
    }

    #[test]
    fn malformed_code_tag_is_skipped() {
        let (font, warnings) = Font::from_bytes_with_warnings(identity_font(
            "not-a-code whatever\nx@\nx@@\n0x153 oe\noe@\noe@@\n",
        ))
        .unwrap();
        assert!(warnings.contains(&FontWarning::BadCodeTag("not-a-code whatever".into())));
        // parsing continued past the bad entry
        assert!(font.get('\u{153}').is_some());
    }

    #[test]
    fn truncated_code_tagged_glyph_is_skipped() {
        let (font, warnings) =
            Font::from_bytes_with_warnings(identity_font("0x153 oe\noe@\n")).unwrap();
        assert!(warnings.contains(&FontWarning::BadCodeTaggedGlyph(0x153)));
        assert!(font.glyphs.get(&0x153).is_none());
    }

    #[test]
    fn negative_code_tag_is_kept_aside() {
        let font = Font::from_bytes(identity_font("-2 translation table\nabc@\nabc@@\n")).unwrap();
        assert_eq!(
            font.ignored_characters().get(&2).map(String::as_str),
            Some("abc@\nabc@@")
        );
        assert!(font.glyphs.get(&2).is_none());
    }

    #[test]
    fn truncated_required_characters_are_fatal() {
        // header promises 2 rows for each of 102 characters but only one glyph follows
        let result = Font::from_bytes("flf2a$ 2 2 4 -1 1 0 0 0\ncomment\n @\n @@\n");
        assert!(matches!(
            result,
            Err(FontError::MissingRequiredCharacters { .. })
        ));
    }

    #[test]
    fn endmark_run_strips_at_most_two() {
        // rows of four '|' use '|' itself as the endmark; only the endmarks are stripped, the
        // rest of the run is glyph content
        let extra = "0x153 bars\n||||\n||||\n";
        let font = Font::from_bytes(identity_font(extra)).unwrap();
        assert_eq!(font.glyphs.get(&0x153).unwrap().rows, [b"||", b"||"]);
    }

    #[test]
    fn code_tag_count_mismatch_warns() {
        let (_, warnings) =
            Font::from_bytes_with_warnings("flf2a$ 1 1 4 -1 0 0 0 3\n".to_owned() + &one_row_body())
                .unwrap();
        assert!(warnings.contains(&FontWarning::TooFewCodeTags {
            found: 0,
            expected: 3
        }));
    }

    fn one_row_body() -> String {
        DEFAULT_CODEPOINTS
            .iter()
            .map(|&codepoint| {
                let content = match codepoint {
                    b' ' => '$',
                    b'@' => '%',
                    0x80.. => '#',
                    other => other.into(),
                };
                format!("{content}@@\n")
            })
            .collect()
    }
}
