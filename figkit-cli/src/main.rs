use std::fmt::{self, Display};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use figkit::font::Font;
use figkit::loader::{self, BuiltInFonts, FontDirectory, LoadError, SourceError};
use figkit::render::{RenderOptions, render};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let font = cli.font()?;
    if cli.show_comments {
        println!("{}", font.comments());
    }
    let block = render(&cli.input, &font, &cli.options())?;
    println!("{block}");
    Ok(())
}

#[derive(Parser)]
struct Cli {
    /// The text to render
    input: String,
    /// Font name, resolved against the font directory (if given) and the built-in bundle
    #[arg(short = 'f', default_value = "plain")]
    font: String,
    /// A directory holding .flf/.tlf font files
    #[arg(short = 'D', long = "font-dir")]
    font_dir: Option<PathBuf>,
    /// Target output width in columns
    #[arg(short = 'w', default_value_t = 80)]
    width: usize,
    #[arg(short = 'd', default_value_t)]
    direction: Direction,
    #[arg(short = 'j', default_value_t)]
    justify: Justify,
    /// Mirror the output vertically
    #[arg(long)]
    flip: bool,
    /// Mirror the output horizontally
    #[arg(long)]
    reverse: bool,
    /// Print the font's embedded comments before the output
    #[arg(long)]
    show_comments: bool,
}

impl Cli {
    fn font(&self) -> Result<Font> {
        if let Some(directory) = &self.font_dir {
            match loader::load(&self.font, &FontDirectory::new(directory)) {
                // fall through to the built-in bundle only when the directory has no such font
                Err(LoadError::Source(SourceError::NotFound(_))) => {}
                result => {
                    return result
                        .with_context(|| format!("loading font {:?} from {directory:?}", self.font));
                }
            }
        }
        loader::load(&self.font, &BuiltInFonts)
            .with_context(|| format!("loading font {:?}", self.font))
    }

    fn options(&self) -> RenderOptions {
        RenderOptions {
            width: self.width,
            justify: self.justify.into(),
            direction: self.direction.into(),
            flip: self.flip,
            reverse: self.reverse,
            ..RenderOptions::default()
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
#[value(rename_all = "kebab-case")]
enum Direction {
    #[default]
    Auto,
    LeftToRight,
    RightToLeft,
}

impl From<Direction> for figkit::render::Direction {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Auto => Self::Auto,
            Direction::LeftToRight => Self::LeftToRight,
            Direction::RightToLeft => Self::RightToLeft,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::LeftToRight => write!(f, "left-to-right"),
            Self::RightToLeft => write!(f, "right-to-left"),
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
#[value(rename_all = "kebab-case")]
enum Justify {
    #[default]
    Auto,
    Left,
    Center,
    Right,
}

impl From<Justify> for figkit::render::Justify {
    fn from(value: Justify) -> Self {
        match value {
            Justify::Auto => Self::Auto,
            Justify::Left => Self::Left,
            Justify::Center => Self::Center,
            Justify::Right => Self::Right,
        }
    }
}

impl Display for Justify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Left => write!(f, "left"),
            Self::Center => write!(f, "center"),
            Self::Right => write!(f, "right"),
        }
    }
}
