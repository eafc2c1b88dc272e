//! Renderer, rendering options and the layout engine
mod layout;

use std::fmt;
use std::iter::repeat_n;
use std::mem;

use itertools::izip;
use thiserror::Error;

use crate::font::{Font, Glyph, Hardblank, PrintDirection};
use crate::row_bytes::RowBytes as _;

pub use layout::{Layout, LayoutMode, SmushRule};

/// Characters that unconditionally break the current line: newline, carriage return, vertical
/// tab and form feed.
const LINE_BREAKS: [char; 4] = ['\n', '\r', '\x0b', '\x0c'];

/// The default target width, in columns
pub const DEFAULT_WIDTH: usize = 80;

/// Renders `string` in the given font.
///
/// This is the single entry point intended for external callers: it takes a loaded [`Font`], a
/// plain string and the [`RenderOptions`], and produces a [`Rendered`] block of output rows.
/// Stateless; a shared `Font` may be rendered with concurrently from any number of threads.
///
/// # Errors
/// See [`RenderError`]. Rendering only fails on a missing glyph without a usable fallback, or on
/// empty input when [`RenderOptions::require_output`] is set.
///
/// ```
/// # use figkit::font::Font;
/// # use figkit::render::{render, RenderOptions};
/// let font = Font::plain();
/// let block = render("Hi!", &font, &RenderOptions::default()).unwrap();
/// assert_eq!(block.text(), "Hi!");
/// ```
pub fn render(string: &str, font: &Font, options: &RenderOptions) -> Result<Rendered, RenderError> {
    Renderer { font, options: *options }.render(string)
}

/// Options controlling a single render call
///
/// The `Auto` values of [`justify`](RenderOptions::justify) and
/// [`direction`](RenderOptions::direction) resolve from the font being rendered; everything else
/// is font-independent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Target width in columns; finished lines wrap at FIGcharacter granularity to stay within
    /// it. Defaults to [`DEFAULT_WIDTH`].
    pub width: usize,
    /// Line justification within [`width`](RenderOptions::width)
    pub justify: Justify,
    /// Print direction
    pub direction: Direction,
    /// Mirror each finished block vertically, reversing the order of its rows
    pub flip: bool,
    /// Mirror each finished row horizontally, reversing its characters (applied after
    /// justification)
    pub reverse: bool,
    /// What to do when the font has no glyph for an input character
    pub missing_glyph: MissingGlyph,
    /// Fail with [`RenderError::EmptyInput`] instead of producing an empty block
    pub require_output: bool,
}

impl RenderOptions {
    /// The default options: width 80, automatic justification and direction, no transforms.
    pub const DEFAULT: Self = Self {
        width: DEFAULT_WIDTH,
        justify: Justify::Auto,
        direction: Direction::Auto,
        flip: false,
        reverse: false,
        missing_glyph: MissingGlyph::Space,
        require_output: false,
    };
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The choice of line justification
///
/// [`Justify::Auto`] resolves relative to the print direction: left for left-to-right, right for
/// right-to-left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Justify {
    /// Resolve from the print direction. This is the default.
    #[default]
    Auto,
    /// Align on the left edge; no padding is added on the right.
    Left,
    /// Center within the target width, padding both sides to reach it. Centering an
    /// already-centered block changes nothing.
    Center,
    /// Align on the right edge of the target width.
    Right,
}

impl Justify {
    /// Match a justification by name, normalizing anything unrecognized to [`Justify::Auto`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "left" => Self::Left,
            "center" | "centre" => Self::Center,
            "right" => Self::Right,
            _ => Self::Auto,
        }
    }

    fn resolve(self, direction: PrintDirection) -> Self {
        match self {
            Self::Auto => match direction {
                PrintDirection::LeftToRight => Self::Left,
                PrintDirection::RightToLeft => Self::Right,
            },
            other => other,
        }
    }

    fn pad(self, row: Vec<u8>, to_width: usize) -> Vec<u8> {
        let Some(padding) = to_width.checked_sub(row.len()) else {
            return row;
        };
        match self {
            Self::Auto | Self::Left => row,
            Self::Center => {
                let start = padding / 2;
                repeat_n(b' ', start)
                    .chain(row)
                    .chain(repeat_n(b' ', padding - start))
                    .collect()
            }
            Self::Right => repeat_n(b' ', padding).chain(row).collect(),
        }
    }
}

/// The choice of print direction
///
/// [`Direction::Auto`] resolves to the font's default from its header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// Resolve from the font header. This is the default.
    #[default]
    Auto,
    /// Left-to-right
    LeftToRight,
    /// Right-to-left
    RightToLeft,
}

impl Direction {
    /// Match a direction by name, normalizing anything unrecognized to [`Direction::Auto`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "left-to-right" | "ltr" => Self::LeftToRight,
            "right-to-left" | "rtl" => Self::RightToLeft,
            _ => Self::Auto,
        }
    }

    fn resolve(self, font: &Font) -> PrintDirection {
        match self {
            Self::Auto => font.header().print_direction,
            Self::LeftToRight => PrintDirection::LeftToRight,
            Self::RightToLeft => PrintDirection::RightToLeft,
        }
    }
}

/// Policy for input characters the font has no glyph for
///
/// A font may define its own substitute as the glyph with character code 0, which always takes
/// precedence over this policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingGlyph {
    /// Substitute the font's space glyph. This is the default. Fails with
    /// [`RenderError::GlyphNotFound`] if the font has no space glyph either.
    #[default]
    Space,
    /// Leave the character out entirely.
    Skip,
    /// Fail with [`RenderError::GlyphNotFound`].
    Fail,
}

/// A finished block of rendered output rows
///
/// Rows are stored as raw bytes since fonts are not required to be valid UTF-8 (see
/// [`Font::is_utf8`]); [`Rendered::text`] and the [`Display`](fmt::Display) implementation decode
/// lossily.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered {
    lines: Vec<Vec<u8>>,
}

impl Rendered {
    /// The output rows, top to bottom.
    #[must_use]
    pub fn lines(&self) -> &[Vec<u8>] {
        &self.lines
    }

    /// Consumes the block, returning the raw output rows.
    #[must_use]
    pub fn into_lines(self) -> Vec<Vec<u8>> {
        self.lines
    }

    /// The output joined with newlines, decoded lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&bstr::join("\n", &self.lines)).into_owned()
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// The main type for rendering
///
/// Use [`render()`](Renderer::render) to process strings.
///
/// The other methods are meant to be used in a builder pattern:
/// ```
/// # use figkit::font::Font;
/// # use figkit::render::{Justify, Renderer};
/// let font = Font::plain();
/// let rendered = Renderer::new(&font)
///     .width(9)
///     .justify(Justify::Center)
///     .render("Hello")
///     .unwrap();
/// assert_eq!(rendered.text(), "  Hello  ");
/// ```
#[must_use]
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'font> {
    font: &'font Font,
    options: RenderOptions,
}

impl<'font> Renderer<'font> {
    /// Creates a new renderer with [default](RenderOptions::DEFAULT) options.
    pub const fn new(font: &'font Font) -> Self {
        Self {
            font,
            options: RenderOptions::DEFAULT,
        }
    }

    /// Sets the target width.
    pub const fn width(mut self, width: usize) -> Self {
        self.options.width = width;
        self
    }

    /// Sets the justification.
    pub const fn justify(mut self, justify: Justify) -> Self {
        self.options.justify = justify;
        self
    }

    /// Sets the print direction.
    pub const fn direction(mut self, direction: Direction) -> Self {
        self.options.direction = direction;
        self
    }

    /// Mirrors each finished block vertically.
    pub const fn flip(mut self, flip: bool) -> Self {
        self.options.flip = flip;
        self
    }

    /// Mirrors each finished row horizontally.
    pub const fn reverse(mut self, reverse: bool) -> Self {
        self.options.reverse = reverse;
        self
    }

    /// Sets the policy for characters the font cannot draw.
    pub const fn missing_glyph(mut self, policy: MissingGlyph) -> Self {
        self.options.missing_glyph = policy;
        self
    }

    /// Renders the given string.
    ///
    /// A newline (or carriage return, vertical tab, or form feed) always causes a line break.
    /// Any line too wide for the target width is broken at the last contiguous segment of
    /// whitespace (spaces and tabs) if any, in which case that segment of whitespace is trimmed
    /// appropriately. If there is no such whitespace, the line is broken between FIGcharacters
    /// (but never in the middle of one), at the latest possible position; a single FIGcharacter
    /// wider than the target width is placed alone on its own row rather than truncated.
    ///
    /// # Errors
    /// See [`RenderError`].
    pub fn render(&self, mut string: &str) -> Result<Rendered, RenderError> {
        let direction = self.options.direction.resolve(self.font);
        let justify = self.options.justify.resolve(direction);
        let hardblank = self.font.header().hardblank;
        let mut lines = Vec::new();
        while !string.is_empty() {
            let (mut rows, _, rest) = self.fill_row(direction, string)?;
            string = rest;
            if direction == PrintDirection::RightToLeft {
                for row in &mut rows {
                    row.reverse();
                }
            }
            for row in &mut rows {
                for c in row.iter_mut() {
                    if hardblank == *c {
                        *c = b' ';
                    }
                }
                *row = justify.pad(mem::take(row), self.options.width);
            }
            if self.options.reverse {
                for row in &mut rows {
                    row.reverse();
                }
            }
            if self.options.flip {
                rows.reverse();
            }
            lines.extend(rows);
        }
        if lines.is_empty() && self.options.require_output {
            return Err(RenderError::EmptyInput);
        }
        Ok(Rendered { lines })
    }

    /// Lays out FIGcharacters from the start of `string` into one row of output, stopping at a
    /// line break, at the wrap point, or at the end of the input. Returns the accumulated rows,
    /// their width, and the unconsumed remainder.
    fn fill_row<'a>(
        &self,
        direction: PrintDirection,
        mut string: &'a str,
    ) -> Result<(Vec<Vec<u8>>, usize, &'a str), RenderError> {
        let mut line: Vec<Vec<u8>> = vec![Vec::new(); self.font.header().height.get()];
        let mut width = 0;
        let mut chars = string.chars();
        let mut before_space = None;
        let mut saved = false;
        let mut overfull = false;
        while let Some(c) = chars.next() {
            let c = if c == '\t' { ' ' } else { c };
            if c == ' ' && !saved {
                before_space = Some((line.clone(), width, string));
                saved = true;
            }
            if LINE_BREAKS.contains(&c) {
                string = chars.as_str();
                break;
            }
            let force = width == 0;
            let appended = self.append(direction, &mut line, &mut width, c, force)?;
            if !appended {
                overfull = true;
                break;
            }
            string = chars.as_str();
            if c != ' ' {
                saved = false;
            }
        }
        if overfull
            && let Some(saved) = before_space
        {
            (line, width, string) = saved;
            string = string.trim_start_matches([' ', '\t']);
        }
        let end_trim = Self::trimming(line.iter().map(|row| row.iter().rev().copied()));
        width -= end_trim;
        for row in &mut line {
            row.truncate(row.len() - end_trim);
        }
        Ok((line, width, string))
    }

    /// Places one FIGcharacter at the end of the accumulated rows, overlapping as far as the
    /// layout mode and smushing rules allow. Returns false (leaving the rows untouched) if the
    /// result would exceed the target width, unless `force` is set.
    fn append(
        &self,
        direction: PrintDirection,
        line: &mut Vec<Vec<u8>>,
        width: &mut usize,
        c: char,
        force: bool,
    ) -> Result<bool, RenderError> {
        let Some(glyph) = self.lookup(c)? else {
            return Ok(true);
        };
        if glyph.width == 0 {
            return Ok(true);
        }
        if self.font.header().layout.mode() == LayoutMode::FullSize {
            if !force && *width + glyph.width > self.options.width {
                return Ok(false);
            }
            *width += glyph.width;
            for (buffer_row, glyph_row) in line.iter_mut().zip(&glyph.rows) {
                buffer_row.extend(glyph_row.placed(direction));
            }
            return Ok(true);
        }
        let smush_data = self.row_smush_data(direction, line, &glyph.rows);
        let shift = smush_data
            .iter()
            .map(|row| row.shift(*width, glyph.width))
            .min()
            .unwrap_or_else(|| (*width).min(glyph.width));
        let glyph_rows_rev = glyph
            .rows
            .iter()
            .map(|row| row.placed(direction).rev());
        let trim = Self::trimming(glyph_rows_rev);
        if !force && *width + glyph.width > self.options.width + trim + shift {
            return Ok(false);
        }
        *width = *width + glyph.width - shift;
        for (buffer_row, glyph_row, smush) in izip!(line, &glyph.rows, smush_data) {
            smush.combine(shift, buffer_row, glyph_row, direction);
        }
        Ok(true)
    }

    fn lookup(&self, c: char) -> Result<Option<&'font Glyph>, RenderError> {
        if let Some(glyph) = self.font.get(c) {
            return Ok(Some(glyph));
        }
        match self.options.missing_glyph {
            MissingGlyph::Skip => Ok(None),
            MissingGlyph::Space => match self.font.get(' ') {
                Some(space) => Ok(Some(space)),
                None => Err(RenderError::GlyphNotFound(c)),
            },
            MissingGlyph::Fail => Err(RenderError::GlyphNotFound(c)),
        }
    }

    fn row_smush_data(
        &self,
        direction: PrintDirection,
        buffer: &[Vec<u8>],
        glyph_rows: &[Vec<u8>],
    ) -> Vec<RowSmush> {
        let layout = self.font.header().layout;
        let hardblank = self.font.header().hardblank;
        buffer
            .iter()
            .zip(glyph_rows)
            .map(|(end, start)| {
                let end = RowSmush::count_blanks(end.iter().rev().copied());
                let start = RowSmush::count_blanks(start.placed(direction));
                RowSmush::new(end, start, layout, hardblank)
            })
            .collect()
    }

    fn trimming(line: impl IntoIterator<Item = impl IntoIterator<Item = u8>>) -> usize {
        line.into_iter()
            .map(|row| row.into_iter().take_while(|&c| c == b' ').count())
            .min()
            .unwrap_or(0)
    }
}

/// How one row of an incoming FIGcharacter interacts with the corresponding accumulated row
#[derive(Debug)]
enum RowSmush {
    Keep {
        end_blanks: usize,
    },
    Overwrite {
        start_blanks: usize,
    },
    Smush {
        end_blanks: usize,
        start_blanks: usize,
        smush: Option<u8>,
    },
}

impl RowSmush {
    fn new(
        end: (usize, Option<u8>),
        start: (usize, Option<u8>),
        layout: Layout,
        hardblank: Hardblank,
    ) -> Self {
        match (end.1, start.1) {
            (_, None) => Self::Keep { end_blanks: end.0 },
            (None, _) => Self::Overwrite {
                start_blanks: start.0,
            },
            (Some(end_char), Some(start_char)) => {
                let smush = layout.smush(end_char, start_char, hardblank);
                Self::Smush {
                    end_blanks: end.0,
                    start_blanks: start.0,
                    smush,
                }
            }
        }
    }

    fn shift(&self, end: usize, start: usize) -> usize {
        match self {
            Self::Keep { end_blanks } => end_blanks + start,
            Self::Overwrite { start_blanks } => end + start_blanks,
            Self::Smush {
                end_blanks,
                start_blanks,
                smush,
            } => end_blanks + start_blanks + usize::from(smush.is_some()),
        }
    }

    fn combine(
        &self,
        shift: usize,
        buffer_row: &mut Vec<u8>,
        glyph_row: &[u8],
        direction: PrintDirection,
    ) {
        match self {
            Self::Keep { .. } => {
                if glyph_row.len() <= shift {
                    buffer_row.truncate(buffer_row.len() + glyph_row.len() - shift);
                } else {
                    buffer_row.extend(repeat_n(b' ', glyph_row.len() - shift));
                }
            }
            Self::Overwrite { .. } => {
                let skip = shift.saturating_sub(buffer_row.len());
                buffer_row.truncate(buffer_row.len().saturating_sub(shift));
                buffer_row.extend(glyph_row.placed(direction).skip(skip));
            }
            &Self::Smush {
                end_blanks,
                start_blanks,
                smush: Some(smush),
            } if shift > (start_blanks + end_blanks) => {
                // shift == self.shift()
                buffer_row.truncate(buffer_row.len() - end_blanks - 1);
                buffer_row.push(smush);
                buffer_row.extend(glyph_row.placed(direction).skip(start_blanks + 1));
            }
            &Self::Smush { start_blanks, .. } => {
                if shift <= start_blanks {
                    buffer_row.extend(glyph_row.placed(direction).skip(shift));
                } else {
                    buffer_row.truncate(buffer_row.len() + start_blanks - shift);
                    buffer_row.extend(glyph_row.placed(direction).skip(start_blanks));
                }
            }
        }
    }

    fn count_blanks(chars: impl Iterator<Item = u8>) -> (usize, Option<u8>) {
        let mut blanks = 0;
        let mut next = None;
        for c in chars {
            if c == b' ' {
                blanks += 1;
            } else {
                next = Some(c);
                break;
            }
        }
        (blanks, next)
    }
}

/// An error while rendering
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The font has no glyph for this character, no code-0 substitute, and the configured
    /// [`MissingGlyph`] policy could not produce a fallback.
    #[error("the font has no glyph for {0:?} and no usable fallback")]
    GlyphNotFound(char),
    /// The input was empty and [`RenderOptions::require_output`] was set.
    #[error("nothing to render")]
    EmptyInput,
}
