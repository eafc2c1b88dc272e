//! A crate for parsing FIGfonts and rendering text as FIGlet-style ASCII art.
//!
//! # Features
//!
//! - Horizontal kerning/fitting and smushing ([`SmushRule`](crate::render::SmushRule))
//! - Width-bounded rendering with automatic line breaking
//!   ([`RenderOptions::width`](crate::render::RenderOptions))
//! - Justification ([`Justify`](crate::render::Justify)) and print direction
//!   ([`Direction`](crate::render::Direction)), each resolving automatically from the font
//! - Vertical flip and horizontal reverse transforms of the finished block
//! - Transparent loading of zip-packed font files ([`loader`])
//!
//! # Example
//!
//! ```
//! # use figkit::font::Font;
//! # use figkit::render::{render, RenderOptions};
//! let font = Font::plain();
//! let options = RenderOptions {
//!     width: 20,
//!     ..RenderOptions::default()
//! };
//! let block = render("Hello, world!", &font, &options).unwrap();
//! assert_eq!(block.text(), "Hello, world!");
//! ```
//!
//! A [`Font`](crate::font::Font) is immutable once loaded: share it freely between threads and
//! render calls, and cache it keyed by resource identity if you load fonts repeatedly. The
//! engine itself performs no I/O outside [`loader`] and keeps no state between calls.
//!
//! ## Feature flags
//!
//! - `fonts` (default): adds the fonts in the
//!   [`figkit-fonts`](https://crates.io/crates/figkit-fonts) package (via a dependency), which
//!   can be loaded using [`Font::built_in()`](crate::font::Font::built_in)

pub mod font;
pub mod loader;
pub mod render;
mod row_bytes;
