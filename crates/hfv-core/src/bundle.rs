//! JSON histogram bundles: the output format of every analysis command.
//!
//! A bundle maps `/`-separated object paths to histograms, mirroring the
//! directory layout of a ROOT output file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::hist::AnyHist;
use crate::source::HistSource;
use crate::{Error, Result};

/// Current bundle schema version.
pub const BUNDLE_SCHEMA_VERSION: &str = "hfv_hist_bundle_v1";

/// Provenance of a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMeta {
    pub tool: String,
    pub tool_version: String,
    pub created_unix_ms: u64,
}

/// Named collection of histograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistBundle {
    pub schema_version: String,
    pub meta: BundleMeta,
    objects: BTreeMap<String, AnyHist>,
}

impl HistBundle {
    /// Empty bundle stamped with `tool` and the current time.
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            schema_version: BUNDLE_SCHEMA_VERSION.to_string(),
            meta: BundleMeta {
                tool: tool.into(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                created_unix_ms: now_unix_ms(),
            },
            objects: BTreeMap::new(),
        }
    }

    /// Store `hist` under `path`, replacing any previous object.
    pub fn insert(&mut self, path: impl Into<String>, hist: impl Into<AnyHist>) {
        let path = normalize(&path.into());
        if self.objects.insert(path.clone(), hist.into()).is_some() {
            log::debug!("bundle: replaced object '{path}'");
        }
    }

    /// Store `hist` under `dir/<hist name>`.
    pub fn insert_in(&mut self, dir: &str, hist: impl Into<AnyHist>) {
        let hist = hist.into();
        let path = if dir.is_empty() {
            hist.name().to_string()
        } else {
            format!("{}/{}", dir.trim_end_matches('/'), hist.name())
        };
        self.insert(path, hist);
    }

    pub fn get(&self, path: &str) -> Option<&AnyHist> {
        self.objects.get(&normalize(path))
    }

    /// All object paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Write pretty JSON to `path`, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let f = std::io::BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer_pretty(f, self)?;
        Ok(())
    }

    /// Read a bundle written by [`write_json`](Self::write_json).
    pub fn read_json(path: &Path) -> Result<Self> {
        let f = std::io::BufReader::new(std::fs::File::open(path)?);
        let bundle: HistBundle = serde_json::from_reader(f)?;
        if bundle.schema_version != BUNDLE_SCHEMA_VERSION {
            return Err(Error::Validation(format!(
                "{}: unsupported bundle schema '{}'",
                path.display(),
                bundle.schema_version
            )));
        }
        Ok(bundle)
    }
}

impl HistSource for HistBundle {
    fn get_any(&self, path: &str) -> Result<AnyHist> {
        self.get(path).cloned().ok_or_else(|| Error::NotFound(path.to_string()))
    }
}

fn normalize(path: &str) -> String {
    path.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/")
}

fn now_unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hist::{Axis, Hist1D};

    fn h1(name: &str) -> Hist1D {
        Hist1D::from_contents(name, Axis::uniform(2, 0.0, 2.0).unwrap(), &[1.0, 2.0]).unwrap()
    }

    #[test]
    fn insert_normalizes_paths() {
        let mut b = HistBundle::new("test");
        b.insert("/distr//hist_pt/", h1("hist_pt"));
        b.insert_in("efficiencies/", h1("h_eff"));
        let paths: Vec<&str> = b.paths().collect();
        assert_eq!(paths, vec!["distr/hist_pt", "efficiencies/h_eff"]);
        assert!(b.get_h1("distr/hist_pt").is_ok());
        assert!(matches!(b.get_h2("distr/hist_pt"), Err(Error::TypeMismatch { .. })));
        assert!(matches!(b.get_h1("missing"), Err(Error::NotFound(_))));
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/bundle.json");
        let mut b = HistBundle::new("test");
        b.insert_in("", h1("h"));
        b.write_json(&path).unwrap();
        let back = HistBundle::read_json(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.get_h1("h").unwrap().contents(), vec![1.0, 2.0]);
    }
}
