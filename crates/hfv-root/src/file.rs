//! ROOT file header, directory navigation and object access.

use std::fs;
use std::path::{Path, PathBuf};

use hfv_core::{AnyHist, HistSource};

use crate::datasource::DataSource;
use crate::decompress::decompress;
use crate::directory::{DirHeader, Directory};
use crate::error::{Result, RootError};
use crate::key::{Key, KeyInfo};
use crate::objects;
use crate::rbuffer::RBuffer;

const ROOT_MAGIC: &[u8; 4] = b"root";
const MIN_FILE_LEN: usize = 64;

#[derive(Debug, Clone, Copy)]
struct FileHeader {
    is_large: bool,
    seek_keys: u64,
}

/// A key found by [`RootFile::walk`], with its `/`-separated path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub info: KeyInfo,
}

/// A ROOT file opened for reading.
pub struct RootFile {
    data: DataSource,
    header: FileHeader,
    path: PathBuf,
}

impl RootFile {
    /// Open and memory-map a ROOT file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        // SAFETY: the map is read-only; files are not modified while analysed.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        log::debug!("opened {} ({} bytes)", path.display(), mmap.len());
        Self::from_datasource(DataSource::Mmap(mmap), path)
    }

    /// Parse a ROOT file held in memory.
    pub fn from_bytes(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        Self::from_datasource(DataSource::Owned(data), path)
    }

    fn from_datasource(data: DataSource, path: PathBuf) -> Result<Self> {
        if data.len() < MIN_FILE_LEN || &data[0..4] != ROOT_MAGIC {
            return Err(RootError::BadMagic);
        }
        let header = Self::parse_header(&data)?;
        Ok(Self { data, header, path })
    }

    /// File header (`fVersion`, `fBEGIN`, ..., `fNbytesName`) followed by the
    /// top TDirectory at `fBEGIN + fNbytesName`.
    fn parse_header(data: &[u8]) -> Result<FileHeader> {
        let mut r = RBuffer::new(data);
        r.skip(4)?;
        let version = r.read_u32()?;
        let is_large = version >= 1_000_000;
        let begin = r.read_u32()? as usize;
        if is_large {
            let _end = r.read_u64()?;
            let _seek_free = r.read_u64()?;
        } else {
            let _end = r.read_u32()?;
            let _seek_free = r.read_u32()?;
        }
        let _nbytes_free = r.read_u32()?;
        let _nfree = r.read_u32()?;
        let nbytes_name = r.read_u32()? as usize;

        let dir_offset = begin + nbytes_name;
        if dir_offset >= data.len() {
            return Err(RootError::Deserialization("top directory past end of file".into()));
        }
        r.set_pos(dir_offset)?;
        let dir = DirHeader::read(&mut r)?;
        log::trace!("top directory: seek_keys={} nbytes_keys={}", dir.seek_keys, dir.nbytes_keys);
        Ok(FileHeader { is_large, seek_keys: dir.seek_keys })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keys of the top directory (latest cycles).
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        self.list_dir("")
    }

    /// Keys of the directory at `dir_path` (latest cycles).
    pub fn list_dir(&self, dir_path: &str) -> Result<Vec<KeyInfo>> {
        let dir = self.resolve_dir(&split_path(dir_path))?;
        Ok(dir.latest_keys().into_iter().map(KeyInfo::from).collect())
    }

    /// Every key in the file, depth first, directories before their contents.
    pub fn walk(&self) -> Result<Vec<Entry>> {
        let mut out = Vec::new();
        self.walk_dir(&self.read_top_directory()?, "", &mut out)?;
        Ok(out)
    }

    fn walk_dir(&self, dir: &Directory, prefix: &str, out: &mut Vec<Entry>) -> Result<()> {
        for key in dir.latest_keys() {
            let path =
                if prefix.is_empty() { key.name.clone() } else { format!("{prefix}/{}", key.name) };
            out.push(Entry { path: path.clone(), info: KeyInfo::from(key) });
            if key.is_directory() {
                let sub = self.read_subdirectory(key)?;
                self.walk_dir(&sub, &path, out)?;
            }
        }
        Ok(())
    }

    /// Read the histogram stored at `path` (`dir/sub/name`, optional `;cycle`).
    pub fn get_object(&self, path: &str) -> Result<AnyHist> {
        let parts = split_path(path);
        let Some((last, dirs)) = parts.split_last() else {
            return Err(RootError::KeyNotFound(path.to_string()));
        };
        let dir = self.resolve_dir(dirs)?;
        let (name, cycle) = split_cycle(last);
        let key = match cycle {
            Some(c) => dir.keys().iter().find(|k| k.name == name && k.cycle == c),
            None => dir.find_key(name),
        }
        .ok_or_else(|| RootError::KeyNotFound(path.to_string()))?;

        if !objects::is_supported(&key.class_name) {
            return Err(RootError::UnsupportedClass(format!("{} ({path})", key.class_name)));
        }
        let payload = self.read_key_payload(key)?;
        log::debug!("{path}: {} payload {} bytes", key.class_name, payload.len());
        objects::read_hist(&payload, &key.class_name, key.key_len as usize)
    }

    fn read_top_directory(&self) -> Result<Directory> {
        Directory::read_key_list(&self.data, self.header.seek_keys as usize, self.header.is_large)
    }

    fn resolve_dir(&self, parts: &[&str]) -> Result<Directory> {
        let mut dir = self.read_top_directory()?;
        for (i, part) in parts.iter().enumerate() {
            let key = dir.find_key(part).ok_or_else(|| {
                RootError::KeyNotFound(parts[..=i].join("/"))
            })?;
            if !key.is_directory() {
                return Err(RootError::Deserialization(format!(
                    "'{}' is a {}, not a directory",
                    parts[..=i].join("/"),
                    key.class_name
                )));
            }
            dir = self.read_subdirectory(key)?;
        }
        Ok(dir)
    }

    fn read_subdirectory(&self, key: &Key) -> Result<Directory> {
        let payload = self.read_key_payload(key)?;
        Directory::read_from_payload(&payload, &self.data, self.header.is_large)
    }

    fn read_key_payload(&self, key: &Key) -> Result<Vec<u8>> {
        read_key_payload_from(&self.data, key)
    }
}

impl HistSource for RootFile {
    fn get_any(&self, path: &str) -> hfv_core::Result<AnyHist> {
        Ok(self.get_object(path)?)
    }
}

/// Object bytes of `key`, decompressed when the stored size differs from `obj_len`.
pub(crate) fn read_key_payload_from(data: &[u8], key: &Key) -> Result<Vec<u8>> {
    let seek = key.seek_key as usize;
    let n_bytes = key.n_bytes as usize;
    let key_len = key.key_len as usize;
    if seek + n_bytes > data.len() || key_len > n_bytes {
        return Err(RootError::BufferUnderflow {
            offset: seek,
            need: n_bytes,
            have: data.len().saturating_sub(seek),
        });
    }
    let stored = &data[seek + key_len..seek + n_bytes];
    if key.obj_len as usize != stored.len() {
        decompress(stored, key.obj_len as usize)
    } else {
        Ok(stored.to_vec())
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn split_cycle(name: &str) -> (&str, Option<u16>) {
    match name.rsplit_once(';') {
        Some((n, c)) => match c.parse() {
            Ok(c) => (n, Some(c)),
            Err(_) => (name, None),
        },
        None => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").join(name)
    }

    #[test]
    fn reject_non_root_file() {
        let result = RootFile::from_bytes(vec![0u8; 100], PathBuf::from("test.root"));
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn reject_too_small() {
        let result = RootFile::from_bytes(b"root".to_vec(), PathBuf::from("tiny.root"));
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn cycle_suffix() {
        assert_eq!(split_cycle("hCandidates;2"), ("hCandidates", Some(2)));
        assert_eq!(split_cycle("hCandidates"), ("hCandidates", None));
        assert_eq!(split_cycle("a;b"), ("a;b", None));
        assert_eq!(split_path("/hf-task/hist_pt/"), vec!["hf-task", "hist_pt"]);
    }

    #[test]
    fn uncompressed_payload_is_sliced() {
        let key = Key {
            n_bytes: 14,
            version: 4,
            obj_len: 4,
            key_len: 10,
            cycle: 1,
            seek_key: 2,
            class_name: "TH1D".into(),
            name: "h".into(),
            title: String::new(),
        };
        let mut data = vec![0u8; 12];
        data.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(read_key_payload_from(&data, &key).unwrap(), vec![1, 2, 3, 4]);

        let short = Key { n_bytes: 40, ..key };
        assert!(matches!(
            read_key_payload_from(&data, &short),
            Err(RootError::BufferUnderflow { .. })
        ));
    }

    #[test]
    fn walk_fixture_if_present() {
        let path = fixture_path("simple_histos.root");
        if !path.exists() {
            eprintln!("Fixture not found: {:?}", path);
            return;
        }
        let f = RootFile::open(&path).expect("failed to open ROOT file");
        let entries = f.walk().expect("walk failed");
        assert!(!entries.is_empty());
        assert_eq!(f.list_keys().unwrap().len(), entries.iter().filter(|e| !e.path.contains('/')).count());
    }
}
