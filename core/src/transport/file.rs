//! Local file transport.
//!
//! A call reads `location/method`. When a `path` or `pattern` is configured,
//! or the method itself is a glob, the call fans out instead: the directory
//! is listed, names are filtered, and every match is read in listing order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::config::SourceConfig;
use crate::error::{CallError, FsError};
use crate::pattern::Pattern;
use crate::request::Request;
use crate::response::{RawPayload, Resource, ResponseInformation};
use crate::service::Transport;

use super::{is_glob, select};

/// Filesystem access used by the file and SSH transports.
pub trait Filesystem {
    /// Whole file as UTF-8 text.
    fn read(&self, path: &Path) -> Result<String, FsError>;

    /// Names of the regular files directly inside `path`.
    fn list(&self, path: &Path) -> Result<Vec<String>, FsError>;

    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents.
    fn make_directory(&self, path: &Path) -> Result<(), FsError>;
}

/// `Filesystem` backed by `std::fs`. Listings are sorted by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn read(&self, path: &Path) -> Result<String, FsError> {
        fs::read_to_string(path).map_err(|e| FsError::from_io(path.display().to_string(), e))
    }

    fn list(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let io_err = |e| FsError::from_io(path.display().to_string(), e);
        let mut names = Vec::new();
        for entry in fs::read_dir(path).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if entry.file_type().map_err(io_err)?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn make_directory(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir_all(path).map_err(|e| FsError::from_io(path.display().to_string(), e))
    }
}

/// Reads files through a `Filesystem`.
#[derive(Debug, Default)]
pub struct FileTransport<F: Filesystem = LocalFilesystem> {
    fs: F,
    source: SourceConfig,
}

impl FileTransport<LocalFilesystem> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: Filesystem> FileTransport<F> {
    pub fn with_filesystem(fs: F) -> Self {
        Self {
            fs,
            source: SourceConfig::default(),
        }
    }

    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    fn fans_out(&self, request: &Request) -> bool {
        self.source.pattern.is_some() || self.source.path.is_some() || is_glob(&request.method)
    }

    fn read_one(&self, path: &Path) -> Result<String, CallError> {
        trace!(path = %path.display(), "reading file");
        self.fs
            .read(path)
            .map_err(|e| CallError::connectivity(path.display().to_string(), e))
    }

    fn read_many(&self, request: &Request) -> Result<RawPayload, CallError> {
        let directory = match &self.source.path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&request.location),
        };
        let pattern = Pattern::new(self.source.pattern.as_deref().unwrap_or(&request.method))?;

        let names = self
            .fs
            .list(&directory)
            .map_err(|e| CallError::connectivity(directory.display().to_string(), e))?;
        let selected = select(names, &pattern)?;
        debug!(directory = %directory.display(), pattern = pattern.as_str(), matched = selected.len(), "fan-out");

        let mut resources = Vec::with_capacity(selected.len());
        for name in selected {
            let content = self.read_one(&directory.join(&name))?;
            resources.push(Resource::new(name, content));
        }
        Ok(RawPayload::Many(resources))
    }
}

impl<F: Filesystem> Transport for FileTransport<F> {
    fn name(&self) -> &'static str {
        "file"
    }

    fn raw_call(
        &mut self,
        request: &Request,
        _info: &mut ResponseInformation,
    ) -> Result<RawPayload, CallError> {
        if self.fans_out(request) {
            return self.read_many(request);
        }
        let path = Path::new(&request.location).join(&request.method);
        self.read_one(&path).map(RawPayload::Single)
    }

    fn accepts_sources(&self) -> bool {
        true
    }

    fn configure_sources(&mut self, source: SourceConfig) -> Result<(), CallError> {
        let mut errors = Vec::new();
        if source.local_path.is_some() {
            errors.push("'local_path' only applies to remote sources".to_string());
        }
        if source.fingerprint.is_some() {
            errors.push("'fingerprint' only applies to remote sources".to_string());
        }
        if let Some(pattern) = &source.pattern {
            if let Err(e) = Pattern::new(pattern) {
                errors.extend(e.messages().iter().cloned());
            }
        }
        if !errors.is_empty() {
            return Err(CallError::configuration(errors));
        }
        self.source.update(source);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    /// In-memory filesystem keyed by full path.
    #[derive(Default)]
    struct MemoryFs {
        files: BTreeMap<PathBuf, String>,
    }

    impl MemoryFs {
        fn with(mut self, path: &str, content: &str) -> Self {
            self.files.insert(PathBuf::from(path), content.to_string());
            self
        }
    }

    impl Filesystem for MemoryFs {
        fn read(&self, path: &Path) -> Result<String, FsError> {
            self.files.get(path).cloned().ok_or_else(|| FsError::NotFound {
                path: path.display().to_string(),
            })
        }

        fn list(&self, path: &Path) -> Result<Vec<String>, FsError> {
            Ok(self
                .files
                .keys()
                .filter(|p| p.parent() == Some(path))
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.contains_key(path)
        }

        fn make_directory(&self, _path: &Path) -> Result<(), FsError> {
            Ok(())
        }
    }

    fn fs() -> MemoryFs {
        MemoryFs::default()
            .with("/data/a.txt", "alpha")
            .with("/data/b.txt", "beta")
            .with("/data/c.xml", "<c/>")
    }

    fn call(transport: &mut FileTransport<MemoryFs>, request: Request) -> Result<RawPayload, CallError> {
        transport.raw_call(&request, &mut ResponseInformation::new())
    }

    #[test]
    fn reads_single_file() {
        let mut transport = FileTransport::with_filesystem(fs());
        let raw = call(&mut transport, Request::new("a.txt").location("/data")).unwrap();
        assert_eq!(raw, RawPayload::Single("alpha".to_string()));
    }

    #[test]
    fn missing_file_is_connectivity_error() {
        let mut transport = FileTransport::with_filesystem(fs());
        let err = call(&mut transport, Request::new("nope.txt").location("/data")).unwrap_err();
        match err {
            CallError::Connectivity { source, .. } => {
                let source = source.unwrap();
                assert!(matches!(
                    source.downcast_ref::<FsError>(),
                    Some(FsError::NotFound { .. })
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn glob_method_fans_out() {
        let mut transport = FileTransport::with_filesystem(fs());
        let raw = call(&mut transport, Request::new("*.txt").location("/data")).unwrap();
        assert_eq!(
            raw,
            RawPayload::Many(vec![Resource::new("a.txt", "alpha"), Resource::new("b.txt", "beta")])
        );
    }

    #[test]
    fn configured_pattern_and_path_override_request() {
        let mut transport = FileTransport::with_filesystem(fs());
        transport
            .configure_sources(SourceConfig {
                path: Some("/data".to_string()),
                pattern: Some("*.xml".to_string()),
                ..SourceConfig::default()
            })
            .unwrap();
        let raw = call(&mut transport, Request::new("ignored").location("/elsewhere")).unwrap();
        assert_eq!(raw, RawPayload::Many(vec![Resource::new("c.xml", "<c/>")]));
    }

    #[test]
    fn no_match_is_empty_retrieval() {
        let mut transport = FileTransport::with_filesystem(fs());
        let err = call(&mut transport, Request::new("*.csv").location("/data")).unwrap_err();
        assert!(matches!(err, CallError::EmptyRetrieval { pattern } if pattern == "*.csv"));
    }

    #[test]
    fn remote_only_settings_are_rejected() {
        let mut transport = FileTransport::with_filesystem(fs());
        let err = transport
            .configure_sources(SourceConfig {
                local_path: Some("/tmp".to_string()),
                fingerprint: Some("ab:cd".to_string()),
                pattern: Some("*.txt".to_string()),
                ..SourceConfig::default()
            })
            .unwrap_err();
        assert_eq!(err.messages().len(), 2);
        assert!(transport.source().is_empty());
    }

    #[test]
    fn local_filesystem_lists_sorted_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let local = LocalFilesystem;
        assert_eq!(local.list(dir.path()).unwrap(), ["a.txt", "b.txt"]);
        assert_eq!(local.read(&dir.path().join("a.txt")).unwrap(), "a");
        assert!(matches!(
            local.read(&dir.path().join("zzz")),
            Err(FsError::NotFound { .. })
        ));

        let nested = dir.path().join("x/y");
        local.make_directory(&nested).unwrap();
        assert!(local.exists(&nested));
    }
}
