use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::memory::InMemoryContainerStore;

/// File signature written before every frame.
const MAGIC: &[u8; 8] = b"NEONIX01";

/// Magic + 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = MAGIC.len() + 8;

/// How a container file is opened.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileMode {
    /// Load an existing file; every write fails with `ReadOnly`.
    ReadOnly,
    /// Load the file if present, otherwise start empty.
    #[default]
    ReadWrite,
    /// Ignore any existing content and start empty.
    Overwrite,
}

impl FileMode {
    pub fn is_writable(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }
}

/// Configuration for opening a [`ContainerFile`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub mode: FileMode,
    /// Reject files whose payload checksum does not match.
    pub verify_checksum: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mode: FileMode::ReadWrite,
            verify_checksum: true,
        }
    }
}

impl StoreConfig {
    pub fn with_mode(mode: FileMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// A container store persisted to a single file.
///
/// On-disk format:
/// ```text
/// [8 bytes: magic "NEONIX01"]
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized store)]
/// ```
///
/// The file is rewritten atomically on flush: the new image goes to a
/// temporary file in the same directory which is then renamed over the
/// target.
pub struct ContainerFile {
    path: PathBuf,
    store: InMemoryContainerStore,
    config: StoreConfig,
    /// Mutation count at the last successful load or flush.
    persisted_at: u64,
    closed: bool,
}

impl ContainerFile {
    /// Open with the default configuration and the given mode.
    pub fn open(path: &Path, mode: FileMode) -> StoreResult<Self> {
        Self::open_with(path, StoreConfig::with_mode(mode))
    }

    pub fn open_with(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        let exists = path.exists();
        let mut store = match config.mode {
            FileMode::Overwrite => InMemoryContainerStore::new(),
            FileMode::ReadWrite if !exists => InMemoryContainerStore::new(),
            FileMode::ReadWrite | FileMode::ReadOnly => {
                load(path, config.verify_checksum)?
            }
        };
        store.set_read_only(!config.mode.is_writable());

        debug!(
            path = %path.display(),
            mode = ?config.mode,
            elements = store.len(),
            "opened container file"
        );

        let mut file = Self {
            path: path.to_path_buf(),
            store,
            config,
            persisted_at: 0,
            closed: false,
        };
        file.persisted_at = file.store.mutation_count();
        if file.config.mode.is_writable() && (!exists || file.config.mode == FileMode::Overwrite) {
            file.write_image()?;
        }
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> FileMode {
        self.config.mode
    }

    pub fn store(&self) -> &InMemoryContainerStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut InMemoryContainerStore {
        &mut self.store
    }

    /// Whether the in-memory store changed since the last flush.
    pub fn is_dirty(&self) -> bool {
        self.store.mutation_count() != self.persisted_at
    }

    /// Persist pending changes. A no-op for read-only or clean files.
    pub fn flush(&mut self) -> StoreResult<()> {
        if !self.config.mode.is_writable() || !self.is_dirty() {
            return Ok(());
        }
        self.write_image()
    }

    /// Flush and release the file. Further use goes through a reopen.
    pub fn close(mut self) -> StoreResult<()> {
        let result = self.flush();
        self.closed = true;
        result
    }

    fn write_image(&mut self) -> StoreResult<()> {
        let payload =
            bincode::serialize(&self.store).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len()).map_err(|_| {
            StoreError::Serialization(format!("payload of {} bytes is too large", payload.len()))
        })?;
        let crc = crc32fast::hash(&payload);

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(MAGIC)?;
        tmp.write_all(&length.to_le_bytes())?;
        tmp.write_all(&crc.to_le_bytes())?;
        tmp.write_all(&payload)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        self.persisted_at = self.store.mutation_count();
        debug!(
            path = %self.path.display(),
            bytes = HEADER_SIZE + payload.len(),
            elements = self.store.len(),
            "flushed container file"
        );
        Ok(())
    }
}

fn load(path: &Path, verify_checksum: bool) -> StoreResult<InMemoryContainerStore> {
    let bytes = fs::read(path)?;
    if bytes.len() < HEADER_SIZE {
        return Err(StoreError::Corrupt(format!(
            "file is {} bytes, shorter than the header",
            bytes.len()
        )));
    }
    let (magic, rest) = bytes.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(StoreError::Corrupt("bad magic".into()));
    }
    let length = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
    let expected_crc = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]);
    let payload = &rest[8..];
    if payload.len() != length {
        return Err(StoreError::Corrupt(format!(
            "declared {length} payload bytes, found {}",
            payload.len()
        )));
    }
    if verify_checksum {
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            warn!(
                path = %path.display(),
                expected = expected_crc,
                actual = actual_crc,
                "container file checksum mismatch"
            );
            return Err(StoreError::Corrupt("checksum mismatch".into()));
        }
    }
    bincode::deserialize(payload).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl Drop for ContainerFile {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.flush() {
            warn!(path = %self.path.display(), error = %e, "failed to flush container file on drop");
        }
    }
}

impl std::fmt::Debug for ContainerFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerFile")
            .field("path", &self.path)
            .field("mode", &self.config.mode)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
