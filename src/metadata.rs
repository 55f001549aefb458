//! Installed distribution discovery
//!
//! Scans site-packages style directories for distribution metadata:
//! - `*.dist-info/METADATA` (wheels, modern installers)
//! - `*.egg-info/PKG-INFO` + `requires.txt` (setuptools develop installs)
//! - bare `*.egg-info` files (legacy distutils installs)
//!
//! Directories are visited in the order given (interpreter `sys.path` order)
//! and entries within a directory in sorted order, so results are stable.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const UNKNOWN_NAME: &str = "unknown";
const UNKNOWN_VERSION: &str = "0.0.0";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read metadata {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One installed distribution as reported by its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Display name as written in the metadata (not normalized)
    pub name: String,
    pub version: String,
    /// Raw `Requires-Dist` strings
    pub requires: Vec<String>,
    /// Metadata directory or file this was read from
    pub location: PathBuf,
}

/// Scan every directory in `paths` for installed distributions.
///
/// Unreadable directories are skipped; a distribution whose metadata can't be
/// read is skipped with a warning. Duplicates across directories are all
/// returned in scan order.
pub fn scan_paths(paths: &[PathBuf]) -> Vec<Distribution> {
    let mut dists = Vec::new();

    for dir in paths {
        if !dir.is_dir() {
            continue;
        }

        let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(e) => {
                tracing::debug!("Skipping unreadable path entry {}: {}", dir.display(), e);
                continue;
            }
        };
        entries.sort();

        for entry in entries {
            match read_distribution(&entry) {
                Ok(Some(dist)) => dists.push(dist),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping distribution: {}", e),
            }
        }
    }

    tracing::debug!("Found {} distributions in {} paths", dists.len(), paths.len());
    dists
}

/// Read a single metadata entry; `Ok(None)` if the path isn't a distribution
pub fn read_distribution(path: &Path) -> Result<Option<Distribution>, MetadataError> {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(None);
    };

    if file_name.ends_with(".dist-info") && path.is_dir() {
        let metadata_path = path.join("METADATA");
        if !metadata_path.is_file() {
            return Ok(None);
        }
        let content = read_file(&metadata_path)?;
        let headers = parse_headers(&content);
        return Ok(Some(headers.into_distribution(path.to_path_buf())));
    }

    if file_name.ends_with(".egg-info") {
        if path.is_dir() {
            let pkg_info = path.join("PKG-INFO");
            if !pkg_info.is_file() {
                return Ok(None);
            }
            let content = read_file(&pkg_info)?;
            let mut headers = parse_headers(&content);

            let requires_txt = path.join("requires.txt");
            if requires_txt.is_file() {
                let content = read_file(&requires_txt)?;
                headers.requires = parse_requires_txt(&content);
            }
            return Ok(Some(headers.into_distribution(path.to_path_buf())));
        }

        if path.is_file() {
            let content = read_file(path)?;
            let headers = parse_headers(&content);
            return Ok(Some(headers.into_distribution(path.to_path_buf())));
        }
    }

    Ok(None)
}

fn read_file(path: &Path) -> Result<String, MetadataError> {
    let bytes = fs::read(path).map_err(|source| MetadataError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Header fields of interest from a METADATA / PKG-INFO file
#[derive(Debug, Default)]
struct Headers {
    name: Option<String>,
    version: Option<String>,
    requires: Vec<String>,
}

impl Headers {
    fn into_distribution(self, location: PathBuf) -> Distribution {
        Distribution {
            name: self.name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            version: self.version.unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            requires: self.requires,
            location,
        }
    }
}

/// Parse RFC 822 style headers up to the first blank line.
///
/// Continuation lines (leading whitespace) are folded into the previous value.
fn parse_headers(content: &str) -> Headers {
    let mut fields: Vec<(String, String)> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = fields.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.push((key.trim().to_string(), value.trim().to_string()));
        }
    }

    let mut headers = Headers::default();
    for (key, value) in fields {
        match key.to_ascii_lowercase().as_str() {
            "name" if headers.name.is_none() => headers.name = Some(value),
            "version" if headers.version.is_none() => headers.version = Some(value),
            "requires-dist" => headers.requires.push(value),
            _ => {}
        }
    }
    headers
}

/// Convert setuptools `requires.txt` into `Requires-Dist` style strings.
///
/// Sections look like `[extra]`, `[:marker]` or `[extra:marker]` and apply to
/// every requirement below them.
fn parse_requires_txt(content: &str) -> Vec<String> {
    let mut requires = Vec::new();
    let mut section_marker: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            section_marker = section_to_marker(section);
            continue;
        }

        match &section_marker {
            Some(marker) => requires.push(format!("{}; {}", line, marker)),
            None => requires.push(line.to_string()),
        }
    }

    requires
}

fn section_to_marker(section: &str) -> Option<String> {
    let (extra, marker) = match section.split_once(':') {
        Some((extra, marker)) => (extra.trim(), marker.trim()),
        None => (section.trim(), ""),
    };

    match (extra.is_empty(), marker.is_empty()) {
        (true, true) => None,
        (true, false) => Some(marker.to_string()),
        (false, true) => Some(format!("extra == \"{}\"", extra)),
        (false, false) => Some(format!("({}) and extra == \"{}\"", marker, extra)),
    }
}
