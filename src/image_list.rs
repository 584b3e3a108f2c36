// SPDX-License-Identifier: MPL-2.0
//! The ordered image list behind the drop target.
//!
//! Entries are only ever created from a drop batch: the batch is filtered to
//! the accepted extensions, sorted case-insensitively by full path, and
//! appended behind whatever is already in the list. JPEG entries get their
//! EXIF orientation tag read once at drop time; any failure silently counts
//! as "no orientation information".

use std::collections::BTreeSet;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// One dropped file. Immutable once accepted.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub file_name: String,
    /// EXIF orientation code 1..=8, or 0 when absent/unreadable.
    pub orientation: u32,
}

#[derive(Debug, Default)]
pub struct ImageList {
    entries: Vec<ImageEntry>,
}

impl ImageList {
    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Accepts one drop batch and returns how many files were added.
    pub fn add_batch(&mut self, dropped: Vec<PathBuf>) -> usize {
        let mut accepted: Vec<PathBuf> = dropped
            .into_iter()
            .filter(|path| is_supported(path))
            .collect();
        accepted.sort_by_key(|path| path.to_string_lossy().to_lowercase());

        let added = accepted.len();
        for path in accepted {
            let orientation = if is_jpeg(&path) {
                read_exif_orientation(&path)
            } else {
                0
            };
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.entries.push(ImageEntry {
                path,
                file_name,
                orientation,
            });
        }
        added
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes the entries at the given indices, keeping relative order of
    /// the rest.
    pub fn remove_indices(&mut self, indices: &BTreeSet<usize>) {
        let mut position = 0usize;
        self.entries.retain(|_| {
            let keep = !indices.contains(&position);
            position += 1;
            keep
        });
    }
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

fn is_supported(path: &Path) -> bool {
    extension_lowercase(path)
        .map(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn is_jpeg(path: &Path) -> bool {
    matches!(
        extension_lowercase(path).as_deref(),
        Some("jpg") | Some("jpeg")
    )
}

/// Reads the EXIF orientation tag, primary IFD first, thumbnail IFD as a
/// fallback. Any failure along the way yields 0.
fn read_exif_orientation(path: &Path) -> u32 {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(_) => return 0,
    };
    let mut reader = BufReader::new(file);
    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(_) => return 0,
    };

    [exif::In::PRIMARY, exif::In::THUMBNAIL]
        .iter()
        .find_map(|ifd| exif.get_field(exif::Tag::Orientation, *ifd))
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(0)
}
