// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Byte-store collaborators backing the spool.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

/// Durable, key-ordered storage for spool entries.
///
/// Keys are sequence numbers; `scan` returns entries in ascending key
/// order. The spool assumes nothing else about the format.
pub trait ByteStore: Send + Sync {
	/// Persists `value` under `key`, overwriting any previous value.
	/// Must be durable before returning.
	fn put(&self, key: u64, value: &[u8]) -> io::Result<()>;

	/// Returns all entries in ascending key order.
	fn scan(&self) -> io::Result<Vec<(u64, Vec<u8>)>>;

	/// Removes the entry under `key`. Missing keys are a no-op.
	fn delete(&self, key: u64) -> io::Result<()>;
}

impl<T: ByteStore + ?Sized> ByteStore for Box<T> {
	fn put(&self, key: u64, value: &[u8]) -> io::Result<()> {
		(**self).put(key, value)
	}

	fn scan(&self) -> io::Result<Vec<(u64, Vec<u8>)>> {
		(**self).scan()
	}

	fn delete(&self, key: u64) -> io::Result<()> {
		(**self).delete(key)
	}
}

/// File-per-entry store under a spool directory.
///
/// Entry `seq` lives at `<dir>/<seq zero-padded>.req`. Writes go to a
/// temp file first and are renamed into place after a sync, so a crash
/// mid-write never leaves a torn entry behind.
pub struct DirStore {
	dir: PathBuf,
}

impl DirStore {
	/// Opens the store, creating the directory if needed.
	pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
		let dir = dir.into();
		fs::create_dir_all(&dir)?;
		Ok(Self { dir })
	}

	/// The spool directory path.
	pub fn path(&self) -> &Path {
		&self.dir
	}

	fn entry_path(&self, key: u64) -> PathBuf {
		self.dir.join(format!("{key:020}.req"))
	}

	fn parse_key(path: &Path) -> Option<u64> {
		if path.extension()? != "req" {
			return None;
		}
		path.file_stem()?.to_str()?.parse().ok()
	}
}

impl ByteStore for DirStore {
	fn put(&self, key: u64, value: &[u8]) -> io::Result<()> {
		let tmp = self.dir.join(format!("{key:020}.tmp"));
		{
			let mut file = fs::File::create(&tmp)?;
			file.write_all(value)?;
			file.sync_all()?;
		}
		fs::rename(&tmp, self.entry_path(key))
	}

	fn scan(&self) -> io::Result<Vec<(u64, Vec<u8>)>> {
		let mut entries = BTreeMap::new();
		for dirent in fs::read_dir(&self.dir)? {
			let path = dirent?.path();
			let Some(key) = Self::parse_key(&path) else {
				// Stray temp files from an interrupted write are safe
				// to ignore; the rename never happened.
				continue;
			};
			match fs::read(&path) {
				Ok(value) => {
					entries.insert(key, value);
				}
				Err(e) => {
					warn!(key, error = %e, "skipping unreadable spool entry");
				}
			}
		}
		Ok(entries.into_iter().collect())
	}

	fn delete(&self, key: u64) -> io::Result<()> {
		match fs::remove_file(self.entry_path(key)) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e),
		}
	}
}

/// In-memory store for tests and explicitly ephemeral queues.
#[derive(Default)]
pub struct MemoryStore {
	entries: Mutex<BTreeMap<u64, Vec<u8>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.entries.lock().unwrap().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl ByteStore for MemoryStore {
	fn put(&self, key: u64, value: &[u8]) -> io::Result<()> {
		self.entries.lock().unwrap().insert(key, value.to_vec());
		Ok(())
	}

	fn scan(&self) -> io::Result<Vec<(u64, Vec<u8>)>> {
		Ok(self
			.entries
			.lock()
			.unwrap()
			.iter()
			.map(|(k, v)| (*k, v.clone()))
			.collect())
	}

	fn delete(&self, key: u64) -> io::Result<()> {
		self.entries.lock().unwrap().remove(&key);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dir_store_put_scan_delete() {
		let dir = tempfile::tempdir().unwrap();
		let store = DirStore::open(dir.path()).unwrap();

		store.put(3, b"three").unwrap();
		store.put(1, b"one").unwrap();
		store.put(2, b"two").unwrap();

		let entries = store.scan().unwrap();
		assert_eq!(
			entries,
			vec![
				(1, b"one".to_vec()),
				(2, b"two".to_vec()),
				(3, b"three".to_vec())
			]
		);

		store.delete(2).unwrap();
		let entries = store.scan().unwrap();
		assert_eq!(entries.len(), 2);

		// Deleting a missing key is a no-op.
		store.delete(2).unwrap();
	}

	#[test]
	fn dir_store_overwrites_existing_key() {
		let dir = tempfile::tempdir().unwrap();
		let store = DirStore::open(dir.path()).unwrap();

		store.put(7, b"first").unwrap();
		store.put(7, b"second").unwrap();

		let entries = store.scan().unwrap();
		assert_eq!(entries, vec![(7, b"second".to_vec())]);
	}

	#[test]
	fn dir_store_scan_ignores_foreign_files() {
		let dir = tempfile::tempdir().unwrap();
		let store = DirStore::open(dir.path()).unwrap();
		store.put(1, b"one").unwrap();
		std::fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();
		std::fs::write(dir.path().join("00000000000000000009.tmp"), b"torn").unwrap();

		let entries = store.scan().unwrap();
		assert_eq!(entries, vec![(1, b"one".to_vec())]);
	}

	#[test]
	fn memory_store_roundtrip() {
		let store = MemoryStore::new();
		store.put(5, b"five").unwrap();
		assert_eq!(store.scan().unwrap(), vec![(5, b"five".to_vec())]);
		store.delete(5).unwrap();
		assert!(store.is_empty());
	}
}
