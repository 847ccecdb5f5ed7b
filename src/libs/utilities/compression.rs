// Payload archive handling.
// A pkm payload reaches the installer either as an archive (downloaded from the
// release index or deposited by another package manager) or as a plain directory.
// This module unpacks archives into the staging area.

use crate::{log_debug, log_error};
use bzip2::read::BzDecoder;
use colored::Colorize;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tar::Archive;
use xz2::read::XzDecoder;
use zip::ZipArchive;

/// Archive formats the installer can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    TarBz2,
    TarXz,
    Tar,
}

impl ArchiveKind {
    /// Guesses the archive format from a file name. Wheel-style `.whl` files are zips.
    pub fn from_file_name(name: &str) -> Option<ArchiveKind> {
        let name = name.to_lowercase();
        if name.ends_with(".zip") || name.ends_with(".whl") {
            Some(ArchiveKind::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(ArchiveKind::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(ArchiveKind::TarXz)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }
}

/// Extracts the contents of a payload archive into `dest`.
///
/// `dest` is created if it does not exist. `tar` and `zip` both refuse entries
/// that would escape `dest` (absolute paths or `..` components).
///
/// # Arguments
/// * `src`: The archive to unpack.
/// * `dest`: The directory that receives the archive contents.
/// * `known_kind`: The archive format if the caller already knows it; otherwise it is
///   guessed from the file name of `src`.
///
/// # Returns
/// * `io::Result<PathBuf>`: `dest` on success, `InvalidData` for unsupported formats.
pub fn extract_archive(src: &Path, dest: &Path, known_kind: Option<ArchiveKind>) -> io::Result<PathBuf> {
    log_debug!(
        "[Archive] Extracting {} into {}",
        src.display().to_string().blue(),
        dest.display().to_string().cyan()
    );

    let file_name = src.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let kind = match known_kind.or_else(|| ArchiveKind::from_file_name(file_name)) {
        Some(kind) => kind,
        None => {
            log_error!("[Archive] Unsupported payload archive: {}", src.display().to_string().red());
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported archive type: {}", src.display()),
            ));
        }
    };

    fs::create_dir_all(dest)?;

    match kind {
        ArchiveKind::Zip => {
            let mut archive = ZipArchive::new(File::open(src)?)?;
            archive.extract(dest)?;
        }
        ArchiveKind::TarGz => {
            Archive::new(GzDecoder::new(File::open(src)?)).unpack(dest)?;
        }
        ArchiveKind::TarBz2 => {
            Archive::new(BzDecoder::new(File::open(src)?)).unpack(dest)?;
        }
        ArchiveKind::TarXz => {
            Archive::new(XzDecoder::new(File::open(src)?)).unpack(dest)?;
        }
        ArchiveKind::Tar => {
            Archive::new(File::open(src)?).unpack(dest)?;
        }
    }

    log_debug!("[Archive] {:?} archive extracted to {}", kind, dest.display().to_string().green());
    Ok(dest.to_path_buf())
}

/// If `dir` holds exactly one entry and it is a directory, returns that directory.
/// Release archives commonly wrap everything in `pkm-<version>/`.
pub fn single_top_level_dir(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    if entries.len() == 1 {
        let only = entries.remove(0).path();
        if only.is_dir() {
            return Ok(Some(only));
        }
    }
    Ok(None)
}
