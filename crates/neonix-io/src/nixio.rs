use std::path::Path;

use neonix_store::{ContainerFile, FileMode, InMemoryContainerStore, StoreConfig};
use neonix_sync::{NixPath, Session, SyncConfig, WriteStats};
use neonix_types::{Graph, ObjectRef};
use tracing::info;

use crate::config::IoConfig;
use crate::error::{IoError, IoResult};

/// A container file together with the session syncing graphs against it.
///
/// The session lives exactly as long as the handle: bindings, digests and
/// pending lazy payloads are dropped on close and never persisted.
pub struct NixIo {
    file: ContainerFile,
    session: Session,
}

impl NixIo {
    /// Open `path` in `mode` with the default sync configuration.
    pub fn open(path: impl AsRef<Path>, mode: FileMode) -> IoResult<Self> {
        Self::open_with(path, mode, SyncConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, mode: FileMode, config: SyncConfig) -> IoResult<Self> {
        Self::open_configured(
            path,
            &IoConfig {
                store: StoreConfig::with_mode(mode),
                sync: config,
            },
        )
    }

    pub fn open_configured(path: impl AsRef<Path>, config: &IoConfig) -> IoResult<Self> {
        let path = path.as_ref();
        let file = ContainerFile::open_with(path, config.store.clone())?;
        info!(
            path = %path.display(),
            mode = ?config.store.mode,
            elements = file.store().len(),
            "opened neonix file"
        );
        Ok(Self {
            file,
            session: Session::new(config.sync.clone()),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn mode(&self) -> FileMode {
        self.file.mode()
    }

    pub fn store(&self) -> &InMemoryContainerStore {
        self.file.store()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ---- Write ----

    pub fn write_all(&mut self, graph: &Graph) -> IoResult<WriteStats> {
        self.ensure_writable()?;
        Ok(self.session.write_all(self.file.store_mut(), graph)?)
    }

    /// Write one object under `parent` (by default, its parent's location)
    /// and return its path.
    pub fn write(
        &mut self,
        graph: &Graph,
        obj: ObjectRef,
        parent: Option<&NixPath>,
    ) -> IoResult<NixPath> {
        self.ensure_writable()?;
        let (path, _) = self.session.write(self.file.store_mut(), graph, obj, parent)?;
        Ok(path)
    }

    // ---- Read ----

    pub fn read_all(&mut self) -> IoResult<Graph> {
        Ok(self.session.read_all(self.file.store())?)
    }

    pub fn read(&mut self, path: &NixPath, defer: bool, graph: &mut Graph) -> IoResult<ObjectRef> {
        Ok(self.session.read(self.file.store(), path, defer, graph)?)
    }

    pub fn materialize(&mut self, path: &NixPath, graph: &mut Graph) -> IoResult<ObjectRef> {
        Ok(self.session.materialize(self.file.store(), path, graph)?)
    }

    /// Paths still holding placeholder payloads.
    pub fn pending(&self) -> Vec<NixPath> {
        self.session.pending()
    }

    pub fn block_names(&self) -> IoResult<Vec<String>> {
        Ok(self.session.block_names(self.file.store())?)
    }

    // ---- Lifecycle ----

    pub fn flush(&mut self) -> IoResult<()> {
        Ok(self.file.flush()?)
    }

    /// Persist pending changes and release the file and the session.
    pub fn close(self) -> IoResult<()> {
        let path = self.file.path().to_path_buf();
        let dirty = self.file.is_dirty();
        self.file.close()?;
        info!(path = %path.display(), persisted = dirty, "closed neonix file");
        Ok(())
    }

    fn ensure_writable(&self) -> IoResult<()> {
        if self.file.mode().is_writable() {
            Ok(())
        } else {
            Err(IoError::ReadOnly(self.file.path().to_path_buf()))
        }
    }
}
