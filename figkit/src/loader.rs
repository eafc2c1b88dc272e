//! Resolving font names to font data
//!
//! The parsing and rendering core knows nothing about where fonts live. Callers inject a
//! [`FontSource`], the single capability that turns a font name into raw resource bytes; the
//! bytes may be plain `.flf`/`.tlf` text or the same text stored as the sole member of a zip
//! archive (detected by signature, transparently extracted).
//!
//! A [`Font`] is parsed once per resource and is immutable afterwards; callers that render the
//! same font repeatedly are expected to hold on to it (keyed by resource identity) rather than
//! call [`load`] per render.

use std::borrow::Cow;
use std::fs;
use std::io::{self, Cursor, Read as _};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::font::{Font, FontError};

/// File extensions recognized as font resources, in resolution order
pub const EXTENSIONS: [&str; 2] = ["flf", "tlf"];

/// Local-file-header signature of a zip archive
const ZIP_SIGNATURE: [u8; 4] = [b'P', b'K', 3, 4];

/// A capability to resolve a font name to raw resource bytes
///
/// Implementations decide where fonts live; see [`FontDirectory`] and [`BuiltInFonts`].
pub trait FontSource {
    /// Resolves `name` (a font name without extension) to the bytes of its resource.
    ///
    /// # Errors
    /// [`SourceError::NotFound`] if this source has no font with that name.
    fn resolve(&self, name: &str) -> Result<Vec<u8>, SourceError>;
}

/// Fonts stored as files under a directory, named `<name>.flf` or `<name>.tlf`
#[derive(Clone, Debug)]
pub struct FontDirectory {
    root: PathBuf,
}

impl FontDirectory {
    /// Creates a source reading from the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FontSource for FontDirectory {
    fn resolve(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        for extension in EXTENSIONS {
            let path = self.root.join(format!("{name}.{extension}"));
            if path.is_file() {
                return fs::read(&path).map_err(|error| SourceError::Io(path, error));
            }
        }
        Err(SourceError::NotFound(name.to_owned()))
    }
}

/// The fonts embedded in the `figkit-fonts` crate
///
/// Only available with the `fonts` feature.
#[cfg(feature = "fonts")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltInFonts;

#[cfg(feature = "fonts")]
impl FontSource for BuiltInFonts {
    fn resolve(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        figkit_fonts::FontFile::from_name(name)
            .map(|font| font.as_bytes().to_vec())
            .ok_or_else(|| SourceError::NotFound(name.to_owned()))
    }
}

/// Resolves `name` through `source` and parses the result into a [`Font`].
///
/// Non-fatal findings are logged and discarded; use [`Font::from_bytes_with_warnings`] directly
/// to inspect them. On error no partial font is returned.
///
/// # Errors
/// See [`LoadError`]: resolution failures, a corrupt archive container, or a malformed font.
pub fn load(name: &str, source: &impl FontSource) -> Result<Font, LoadError> {
    let bytes = source.resolve(name)?;
    let font = decode(&bytes)?;
    debug!(font = name, height = font.header().height.get(), "loaded font");
    Ok(font)
}

/// Reads and parses the font file at `path`, which may be zip-packed like any other resource.
///
/// # Errors
/// See [`LoadError`]; a missing file maps to [`SourceError::NotFound`].
pub fn load_path(path: impl AsRef<Path>) -> Result<Font, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|error| {
        if error.kind() == io::ErrorKind::NotFound {
            SourceError::NotFound(path.display().to_string())
        } else {
            SourceError::Io(path.to_owned(), error)
        }
    })?;
    let font = decode(&bytes)?;
    debug!(font = %path.display(), "loaded font");
    Ok(font)
}

fn decode(bytes: &[u8]) -> Result<Font, LoadError> {
    let bytes = unwrap_archive(bytes)?;
    let (font, warnings) = Font::from_bytes_with_warnings(bytes)?;
    for warning in warnings {
        warn!(%warning, "font decoded with warning");
    }
    Ok(font)
}

/// Returns the contents of the first archive member if `bytes` is a zip archive, and `bytes`
/// unchanged otherwise.
fn unwrap_archive(bytes: &[u8]) -> Result<Cow<'_, [u8]>, LoadError> {
    if !bytes.starts_with(&ZIP_SIGNATURE) {
        return Ok(Cow::Borrowed(bytes));
    }
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    if archive.len() == 0 {
        return Err(LoadError::EmptyArchive);
    }
    let mut member = archive.by_index(0)?;
    let mut data = Vec::with_capacity(usize::try_from(member.size()).unwrap_or(0));
    member
        .read_to_end(&mut data)
        .map_err(LoadError::ArchiveExtract)?;
    Ok(Cow::Owned(data))
}

/// An error resolving a font name to resource bytes
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source has no font with the requested name (with any recognized extension).
    #[error("no font named {0:?}")]
    NotFound(String),
    /// The resource exists but could not be read.
    #[error("could not read {0}: {1}")]
    Io(PathBuf, io::Error),
}

/// An error loading a font
#[derive(Debug, Error)]
pub enum LoadError {
    /// The name did not resolve to resource bytes.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The resource looks like a zip archive but cannot be read as one.
    #[error("corrupt font archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    /// The resource is a zip archive with no members.
    #[error("font archive has no members")]
    EmptyArchive,
    /// The archive member could not be extracted.
    #[error("could not extract font archive member: {0}")]
    ArchiveExtract(io::Error),
    /// The resource bytes are not a well-formed font.
    #[error(transparent)]
    Font(#[from] FontError),
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{Cursor, Write as _};

    use super::{FontDirectory, FontSource as _, LoadError, SourceError, decode, load, load_path};
    use crate::font::Font;

    fn zipped(member_name: &str, contents: &[u8]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(member_name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plain.flf"), Font::PLAIN).unwrap();
        let font = load("plain", &FontDirectory::new(dir.path())).unwrap();
        assert_eq!(font.header().height.get(), 1);
    }

    #[test]
    fn tlf_extension_is_recognized() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plain.tlf"), Font::PLAIN).unwrap();
        assert!(load("plain", &FontDirectory::new(dir.path())).is_ok());
    }

    #[test]
    fn flf_is_preferred_over_tlf() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("both.flf"), Font::PLAIN).unwrap();
        fs::write(dir.path().join("both.tlf"), b"not a font at all").unwrap();
        assert!(load("both", &FontDirectory::new(dir.path())).is_ok());
    }

    #[test]
    fn missing_font_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = load("no-such-font", &FontDirectory::new(dir.path()));
        assert!(matches!(
            result,
            Err(LoadError::Source(SourceError::NotFound(name))) if name == "no-such-font"
        ));
    }

    #[test]
    fn resolve_reports_missing_names() {
        let dir = tempfile::tempdir().unwrap();
        let source = FontDirectory::new(dir.path());
        assert!(matches!(
            source.resolve("absent"),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn zip_packed_font_round_trips() {
        let bytes = zipped("plain.flf", Font::PLAIN);
        let font = decode(&bytes).unwrap();
        assert_eq!(font.header().height.get(), 1);
    }

    #[test]
    fn zip_packed_font_loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("packed.flf"), zipped("x.flf", Font::PLAIN)).unwrap();
        assert!(load("packed", &FontDirectory::new(dir.path())).is_ok());
    }

    #[test]
    fn corrupt_archive_is_rejected() {
        let result = decode(b"PK\x03\x04 this is not really an archive");
        assert!(matches!(result, Err(LoadError::Archive(_))));
    }

    #[test]
    fn load_path_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_path(dir.path().join("ghost.flf"));
        assert!(matches!(
            result,
            Err(LoadError::Source(SourceError::NotFound(_)))
        ));
    }

    #[test]
    fn load_path_reads_fonts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.flf");
        fs::write(&path, Font::PLAIN).unwrap();
        assert!(load_path(&path).is_ok());
    }

    #[cfg(feature = "fonts")]
    #[test]
    fn built_in_fonts_resolve_by_name() {
        use super::BuiltInFonts;

        assert!(load("tower", &BuiltInFonts).is_ok());
        assert!(matches!(
            load("no-such-font", &BuiltInFonts),
            Err(LoadError::Source(SourceError::NotFound(_)))
        ));
    }
}
