//! Storage backends - where backup files are uploaded to and downloaded from.
//!
//! A backend works with its own native file handle type. [`BackendService`] is
//! the typed interface used when the concrete backend is known; [`DynBackend`]
//! is the object-safe layer used when backends are picked at runtime, and
//! checks that every file handle it receives belongs to it.

use crate::errors::BackendError;
use async_trait::async_trait;
use std::any::Any;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file or folder stored by a backend.
pub trait BackendFile: Send + Sync + std::fmt::Debug {
    /// Backend-specific identifier.
    fn id(&self) -> String;
    /// Display name, including the extension.
    fn name(&self) -> String;
    /// Whether this handle points to a folder.
    fn is_directory(&self) -> bool;
    /// Size in bytes; zero for folders.
    fn size(&self) -> u64;
    /// Access to the concrete type for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Typed operations of a storage backend.
#[async_trait]
pub trait BackendService: Send + Sync {
    /// Native file handle of this backend.
    type File: BackendFile + Clone + 'static;

    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Prepares the backend for use (creates the root folder, checks access, ...).
    async fn setup(&self) -> Result<(), BackendError>;

    /// Uploads the local file at `local_path` into `folder` (the root when `None`).
    async fn upload(
        &self,
        folder: Option<&Self::File>,
        local_path: &Path,
    ) -> Result<Self::File, BackendError>;

    /// Downloads `file` into `local_folder`, returning the local path.
    async fn download(&self, local_folder: &Path, file: &Self::File)
    -> Result<PathBuf, BackendError>;

    /// Lists the content of `folder` (the root when `None`).
    async fn list(&self, folder: Option<&Self::File>) -> Result<Vec<Self::File>, BackendError>;

    /// Creates a folder named `name` inside `parent` (the root when `None`).
    async fn create_folder(
        &self,
        parent: Option<&Self::File>,
        name: &str,
    ) -> Result<Self::File, BackendError>;

    /// Removes `file` from the backend.
    async fn remove(&self, file: &Self::File) -> Result<(), BackendError>;
}

/// Object-safe view of a backend, taking file handles of unknown type.
#[async_trait]
pub trait DynBackend: Send + Sync {
    /// Short name used in logs and error messages.
    fn backend_name(&self) -> &'static str;

    /// See [`BackendService::setup`].
    async fn setup_dyn(&self) -> Result<(), BackendError>;

    /// See [`BackendService::upload`].
    async fn upload_dyn(
        &self,
        folder: Option<&dyn BackendFile>,
        local_path: &Path,
    ) -> Result<Box<dyn BackendFile>, BackendError>;

    /// See [`BackendService::download`].
    async fn download_dyn(
        &self,
        local_folder: &Path,
        file: &dyn BackendFile,
    ) -> Result<PathBuf, BackendError>;

    /// See [`BackendService::list`].
    async fn list_dyn(
        &self,
        folder: Option<&dyn BackendFile>,
    ) -> Result<Vec<Box<dyn BackendFile>>, BackendError>;

    /// See [`BackendService::create_folder`].
    async fn create_folder_dyn(
        &self,
        parent: Option<&dyn BackendFile>,
        name: &str,
    ) -> Result<Box<dyn BackendFile>, BackendError>;

    /// See [`BackendService::remove`].
    async fn remove_dyn(&self, file: &dyn BackendFile) -> Result<(), BackendError>;
}

fn native<'a, F: 'static>(file: &'a dyn BackendFile) -> Result<&'a F, BackendError> {
    file.as_any().downcast_ref::<F>().ok_or_else(|| {
        BackendError::type_mismatch(short_type_name::<F>(), &format!("{file:?}"))
    })
}

fn native_opt<'a, F: 'static>(
    file: Option<&'a dyn BackendFile>,
) -> Result<Option<&'a F>, BackendError> {
    file.map(native::<F>).transpose()
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[async_trait]
impl<B> DynBackend for B
where
    B: BackendService,
{
    fn backend_name(&self) -> &'static str {
        self.name()
    }

    async fn setup_dyn(&self) -> Result<(), BackendError> {
        self.setup().await
    }

    async fn upload_dyn(
        &self,
        folder: Option<&dyn BackendFile>,
        local_path: &Path,
    ) -> Result<Box<dyn BackendFile>, BackendError> {
        let folder = native_opt::<B::File>(folder)?;
        let file = self.upload(folder, local_path).await?;
        Ok(Box::new(file))
    }

    async fn download_dyn(
        &self,
        local_folder: &Path,
        file: &dyn BackendFile,
    ) -> Result<PathBuf, BackendError> {
        let file = native::<B::File>(file)?;
        self.download(local_folder, file).await
    }

    async fn list_dyn(
        &self,
        folder: Option<&dyn BackendFile>,
    ) -> Result<Vec<Box<dyn BackendFile>>, BackendError> {
        let folder = native_opt::<B::File>(folder)?;
        let files = self.list(folder).await?;
        Ok(files
            .into_iter()
            .map(|f| Box::new(f) as Box<dyn BackendFile>)
            .collect())
    }

    async fn create_folder_dyn(
        &self,
        parent: Option<&dyn BackendFile>,
        name: &str,
    ) -> Result<Box<dyn BackendFile>, BackendError> {
        let parent = native_opt::<B::File>(parent)?;
        let folder = self.create_folder(parent, name).await?;
        Ok(Box::new(folder))
    }

    async fn remove_dyn(&self, file: &dyn BackendFile) -> Result<(), BackendError> {
        let file = native::<B::File>(file)?;
        self.remove(file).await
    }
}

/// File handle of [`LocalBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Whether the path is a folder
    pub is_directory: bool,
}

impl BackendFile for LocalFile {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn is_directory(&self) -> bool {
        self.is_directory
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A backend storing files in a directory of the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

/// Maps a filesystem error; transient kinds are worth retrying.
fn io_error(action: &str, path: &Path, err: std::io::Error) -> BackendError {
    let recoverable = matches!(
        err.kind(),
        ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
    );
    BackendError::with_source(
        format!("Failed to {action} '{}'", path.display()),
        recoverable,
        err,
    )
}

/// Whether two paths resolve to the same existing file.
async fn same_file(a: &Path, b: &Path) -> bool {
    match (
        tokio::fs::canonicalize(a).await,
        tokio::fs::canonicalize(b).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl LocalBackend {
    /// A backend rooted at `root`. Nothing is touched until [`BackendService::setup`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder_path(&self, folder: Option<&LocalFile>) -> Result<PathBuf, BackendError> {
        match folder {
            None => Ok(self.root.clone()),
            Some(f) if f.is_directory => Ok(f.path.clone()),
            Some(f) => Err(BackendError::new(
                format!("'{}' is not a folder", f.path.display()),
                false,
            )),
        }
    }

    /// Copies `from` to `to` unless both name the same file, which a copy
    /// would truncate.
    async fn copy(action: &str, from: &Path, to: &Path) -> Result<(), BackendError> {
        if same_file(from, to).await {
            debug!("{} is already in place, not copying", to.display());
            return Ok(());
        }
        tokio::fs::copy(from, to)
            .await
            .map(drop)
            .map_err(|e| io_error(action, from, e))
    }

    async fn stat(path: PathBuf) -> Result<LocalFile, BackendError> {
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error("read metadata of", &path, e))?;
        Ok(LocalFile {
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            is_directory: metadata.is_dir(),
            path,
        })
    }
}

#[async_trait]
impl BackendService for LocalBackend {
    type File = LocalFile;

    fn name(&self) -> &'static str {
        "local"
    }

    async fn setup(&self) -> Result<(), BackendError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error("create", &self.root, e))
    }

    async fn upload(
        &self,
        folder: Option<&LocalFile>,
        local_path: &Path,
    ) -> Result<LocalFile, BackendError> {
        let target_dir = self.folder_path(folder)?;
        let file_name = local_path.file_name().ok_or_else(|| {
            BackendError::new(format!("'{}' has no file name", local_path.display()), false)
        })?;
        let target = target_dir.join(file_name);
        Self::copy("upload", local_path, &target).await?;
        debug!("Uploaded {} to {}", local_path.display(), target.display());
        Self::stat(target).await
    }

    async fn download(&self, local_folder: &Path, file: &LocalFile) -> Result<PathBuf, BackendError> {
        if file.is_directory {
            return Err(BackendError::new(
                format!("'{}' is a folder", file.path.display()),
                false,
            ));
        }
        tokio::fs::create_dir_all(local_folder)
            .await
            .map_err(|e| io_error("create", local_folder, e))?;
        let target = local_folder.join(file.name());
        Self::copy("download", &file.path, &target).await?;
        Ok(target)
    }

    async fn list(&self, folder: Option<&LocalFile>) -> Result<Vec<LocalFile>, BackendError> {
        let dir = self.folder_path(folder)?;
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_error("list", &dir, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("list", &dir, e))?
        {
            files.push(Self::stat(entry.path()).await?);
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn create_folder(
        &self,
        parent: Option<&LocalFile>,
        name: &str,
    ) -> Result<LocalFile, BackendError> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(BackendError::new(format!("Invalid folder name '{name}'"), false));
        }
        let path = self.folder_path(parent)?.join(name);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| io_error("create", &path, e))?;
        Self::stat(path).await
    }

    async fn remove(&self, file: &LocalFile) -> Result<(), BackendError> {
        let result = if file.is_directory {
            tokio::fs::remove_dir_all(&file.path).await
        } else {
            tokio::fs::remove_file(&file.path).await
        };
        result.map_err(|e| io_error("remove", &file.path, e))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[derive(Debug)]
    struct ForeignFile;

    impl BackendFile for ForeignFile {
        fn id(&self) -> String {
            "foreign".to_string()
        }
        fn name(&self) -> String {
            "foreign.mwbx".to_string()
        }
        fn is_directory(&self) -> bool {
            false
        }
        fn size(&self) -> u64 {
            0
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn test_local_backend_upload_list_download() {
        let root = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path().join("backups"));
        backend.setup().await.unwrap();

        let source = scratch.path().join("data.mwbx");
        tokio::fs::write(&source, b"hello").await.unwrap();

        let uploaded = backend.upload(None, &source).await.unwrap();
        assert_eq!(uploaded.name(), "data.mwbx");
        assert_eq!(uploaded.size(), 5);

        let folder = backend.create_folder(None, "old").await.unwrap();
        assert!(folder.is_directory());

        let listed = backend.list(None).await.unwrap();
        let names: Vec<String> = listed.iter().map(BackendFile::name).collect();
        assert_eq!(names, vec!["data.mwbx".to_string(), "old".to_string()]);

        let restored_dir = scratch.path().join("restore");
        let local = backend.download(&restored_dir, &uploaded).await.unwrap();
        assert_eq!(tokio::fs::read(&local).await.unwrap(), b"hello");

        backend.remove(&uploaded).await.unwrap();
        assert_eq!(backend.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_copy_onto_itself_keeps_content() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        backend.setup().await.unwrap();

        let source = root.path().join("data.mwbx");
        tokio::fs::write(&source, b"hello").await.unwrap();

        let uploaded = backend.upload(None, &source).await.unwrap();
        assert_eq!(uploaded.size(), 5);

        let local = backend.download(root.path(), &uploaded).await.unwrap();
        assert_eq!(tokio::fs::read(&local).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_recoverable() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());
        let err = backend
            .upload(None, &root.path().join("nope.mwbx"))
            .await
            .unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_dyn_backend_rejects_foreign_files() {
        let root = tempfile::tempdir().unwrap();
        let backend: Box<dyn DynBackend> = Box::new(LocalBackend::new(root.path()));
        backend.setup_dyn().await.unwrap();
        assert_eq!(backend.backend_name(), "local");

        let err = backend
            .download_dyn(root.path(), &ForeignFile)
            .await
            .unwrap_err();
        assert!(!err.is_recoverable());
        assert!(err.message().contains("LocalFile"));

        let err = backend.list_dyn(Some(&ForeignFile)).await.unwrap_err();
        assert!(err.message().contains("LocalFile"));

        // Native handles round-trip through the dynamic layer
        let folder = backend.create_folder_dyn(None, "inner").await.unwrap();
        let listed = backend.list_dyn(Some(folder.as_ref())).await.unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_io_error_recoverability() {
        let path = Path::new("/tmp/x");
        let transient = io_error("read", path, std::io::Error::from(ErrorKind::TimedOut));
        assert!(transient.is_recoverable());
        let denied = io_error("read", path, std::io::Error::from(ErrorKind::PermissionDenied));
        assert!(!denied.is_recoverable());
    }
}
