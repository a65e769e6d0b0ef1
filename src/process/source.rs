// src/process/source.rs

use glob::glob;
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::survey::SurveyKey;

/// Where summary files are read from: an extracted directory, or one of
/// the ZIP archives the Census publishes per state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Dir(PathBuf),
    Zip(PathBuf),
}

impl DataSource {
    /// `.zip` paths are archives, anything else a directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("zip"));
        if is_zip {
            DataSource::Zip(path)
        } else {
            DataSource::Dir(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            DataSource::Dir(p) | DataSource::Zip(p) => p,
        }
    }

    /// Read the whole file `name` into memory.
    ///
    /// Names match case-insensitively; inside an archive any directory
    /// prefix on the entry is ignored.
    #[instrument(level = "debug", skip(self), fields(source = %self.path().display()))]
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        match self {
            DataSource::Dir(dir) => {
                let direct = dir.join(name);
                let path = if direct.is_file() {
                    direct
                } else {
                    find_in_dir(dir, name)?.ok_or_else(|| Error::MissingFile(name.to_string()))?
                };
                let mut buf = Vec::new();
                File::open(&path)?.read_to_end(&mut buf)?;
                debug!(bytes = buf.len(), "read file");
                Ok(buf)
            }
            DataSource::Zip(zip_path) => {
                let mut archive = ZipArchive::new(File::open(zip_path)?)?;
                for i in 0..archive.len() {
                    let mut entry = archive.by_index(i)?;
                    if !entry.is_file() || !base_name(entry.name()).eq_ignore_ascii_case(name) {
                        continue;
                    }
                    let mut buf = Vec::new();
                    entry.read_to_end(&mut buf)?;
                    debug!(bytes = buf.len(), entry = %entry.name(), "read archive entry");
                    return Ok(buf);
                }
                Err(Error::MissingFile(name.to_string()))
            }
        }
    }

    /// File names available in this source, without directories.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        match self {
            DataSource::Dir(dir) => {
                for entry in fs::read_dir(dir)? {
                    let entry = entry?;
                    if entry.file_type()?.is_file() {
                        names.push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
            }
            DataSource::Zip(zip_path) => {
                let mut archive = ZipArchive::new(File::open(zip_path)?)?;
                for i in 0..archive.len() {
                    let entry = archive.by_index(i)?;
                    if entry.is_file() {
                        names.push(base_name(entry.name()).to_string());
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Expand `pattern` (a path or glob such as `data/*.zip`) into sources and
/// index every release found by its geography file. Only releases for
/// `year` and `span` are kept; when two sources hold the same release the
/// first in path order wins.
#[instrument(level = "debug")]
pub fn discover(pattern: &str, year: u16, span: u8) -> Result<BTreeMap<SurveyKey, DataSource>> {
    let mut found = BTreeMap::new();
    let mut paths: Vec<PathBuf> = glob(pattern)?.filter_map(|p| p.ok()).collect();
    paths.sort();
    for path in paths {
        let source = DataSource::open(&path);
        let names = match source.list() {
            Ok(n) => n,
            Err(e) => {
                warn!(source = %path.display(), error = %e, "cannot list data source, skipping");
                continue;
            }
        };
        for name in names {
            let Some(key) = SurveyKey::from_geography_file_name(&name) else {
                continue;
            };
            if key.year != year || key.span != span {
                continue;
            }
            found.entry(key).or_insert_with(|| source.clone());
        }
    }
    debug!(releases = found.len(), "discovered releases");
    Ok(found)
}

fn base_name(entry: &str) -> &str {
    entry.rsplit('/').next().unwrap_or(entry)
}

fn find_in_dir(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().eq_ignore_ascii_case(name) {
            return Ok(Some(entry.path()));
        }
    }
    Ok(None)
}
