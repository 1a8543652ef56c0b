//! SFTP retrieval over an SSH session.
//!
//! # Design
//! The session itself is an external collaborator behind `RemoteSession`;
//! a `SessionFactory` opens one from `SessionParams`. `SshTransport` opens
//! the session on the first call and keeps it for the following ones.
//!
//! A call lists the remote directory (`path`, default `.`), keeps the names
//! matching `pattern` (or the method, which may be a plain name), downloads
//! each match into `local_path` and reads the local copy back. The request
//! `location` is the host.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::config::SourceConfig;
use crate::error::{CallError, SessionError};
use crate::pattern::Pattern;
use crate::request::Request;
use crate::response::{RawPayload, Resource, ResponseInformation};
use crate::service::Transport;

use super::file::{Filesystem, LocalFilesystem};
use super::select;

pub const DEFAULT_PORT: u16 = 22;

/// Remote file operations of an open session.
pub trait RemoteSession {
    fn list_files(&mut self, path: &str) -> Result<Vec<String>, SessionError>;

    /// Copy `remote` to `local`, returning the number of bytes written.
    fn download_file(&mut self, remote: &str, local: &Path) -> Result<u64, SessionError>;

    /// Copy `local` to `remote`, returning the number of bytes written.
    fn upload_file(&mut self, local: &Path, remote: &str) -> Result<u64, SessionError>;

    fn rename_file(&mut self, from: &str, to: &str) -> Result<(), SessionError>;

    fn delete_file(&mut self, remote: &str) -> Result<(), SessionError>;
}

/// Everything needed to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    /// Expected host key fingerprint. A mismatch must fail the connection.
    pub fingerprint: Option<String>,
}

impl SessionParams {
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            port: DEFAULT_PORT,
            fingerprint: None,
        }
    }

    /// Host from `location`, user and password from `credentials`.
    pub fn from_request(request: &Request, fingerprint: Option<&str>) -> Result<Self, CallError> {
        if request.location.is_empty() {
            return Err(CallError::invalid_request("no host given and no default location set"));
        }
        Ok(Self {
            host: request.location.clone(),
            user: request.credentials.name.clone(),
            password: request.credentials.password.clone(),
            port: request.port.unwrap_or(DEFAULT_PORT),
            fingerprint: fingerprint.map(str::to_string),
        })
    }

    fn target(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Opens sessions.
pub trait SessionFactory {
    type Session: RemoteSession;

    fn connect(&self, params: &SessionParams) -> Result<Self::Session, SessionError>;
}

/// Multi-source transport over a remote session.
pub struct SshTransport<C: SessionFactory, F: Filesystem = LocalFilesystem> {
    factory: C,
    fs: F,
    session: Option<(SessionParams, C::Session)>,
    source: SourceConfig,
}

impl<C: SessionFactory> SshTransport<C, LocalFilesystem> {
    pub fn new(factory: C) -> Self {
        Self::with_filesystem(factory, LocalFilesystem)
    }
}

impl<C: SessionFactory, F: Filesystem> SshTransport<C, F> {
    pub fn with_filesystem(factory: C, fs: F) -> Self {
        Self {
            factory,
            fs,
            session: None,
            source: SourceConfig::default(),
        }
    }

    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session now, replacing any open one.
    pub fn connect(&mut self, params: SessionParams) -> Result<(), CallError> {
        let target = params.target();
        debug!(target = %target, "opening session");
        match self.factory.connect(&params) {
            Ok(session) => {
                info!(target = %target, "session opened");
                self.session = Some((params, session));
                Ok(())
            }
            Err(e) => {
                if matches!(e, SessionError::FingerprintMismatch { .. }) {
                    error!(target = %target, error = %e, "host fingerprint mismatch");
                }
                self.session = None;
                Err(CallError::connectivity(target, e))
            }
        }
    }

    /// Close the session. The next call opens a new one.
    pub fn disconnect(&mut self) {
        self.session = None;
    }

    fn session(&mut self) -> Result<(&SessionParams, &mut C::Session), CallError> {
        match &mut self.session {
            Some((params, session)) => Ok((params, session)),
            None => Err(CallError::connectivity_message("ssh", "no open session")),
        }
    }

    pub fn upload(&mut self, local: &Path, remote: &str) -> Result<u64, CallError> {
        let (params, session) = self.session()?;
        let target = params.target();
        session
            .upload_file(local, remote)
            .map_err(|e| CallError::connectivity(target, e))
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), CallError> {
        let (params, session) = self.session()?;
        let target = params.target();
        session.rename_file(from, to).map_err(|e| CallError::connectivity(target, e))
    }

    pub fn delete(&mut self, remote: &str) -> Result<(), CallError> {
        let (params, session) = self.session()?;
        let target = params.target();
        session.delete_file(remote).map_err(|e| CallError::connectivity(target, e))
    }

    fn local_directory(&self) -> Result<PathBuf, CallError> {
        let local = self
            .source
            .local_path
            .as_deref()
            .ok_or_else(|| CallError::invalid_request("'local_path' must be configured for remote retrieval"))?;
        let local = PathBuf::from(local);
        if !self.fs.exists(&local) {
            debug!(path = %local.display(), "creating local directory");
            self.fs
                .make_directory(&local)
                .map_err(|e| CallError::connectivity(local.display().to_string(), e))?;
        }
        Ok(local)
    }
}

fn remote_join(directory: &str, name: &str) -> String {
    if directory.is_empty() || directory == "." {
        name.to_string()
    } else {
        format!("{}/{name}", directory.trim_end_matches('/'))
    }
}

impl<C: SessionFactory, F: Filesystem> Transport for SshTransport<C, F> {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn raw_call(
        &mut self,
        request: &Request,
        _info: &mut ResponseInformation,
    ) -> Result<RawPayload, CallError> {
        let local = self.local_directory()?;
        let pattern = Pattern::new(self.source.pattern.as_deref().unwrap_or(&request.method))?;
        let directory = self.source.path.clone().unwrap_or_else(|| ".".to_string());

        if self.session.is_none() {
            let params = SessionParams::from_request(request, self.source.fingerprint.as_deref())?;
            self.connect(params)?;
        }

        let (params, session) = self.session()?;
        let target = params.target();
        let names = session
            .list_files(&directory)
            .map_err(|e| CallError::connectivity(target.as_str(), e))?;
        let selected = select(names, &pattern)?;
        debug!(directory = %directory, matched = selected.len(), "downloading matches");

        let mut downloaded = Vec::with_capacity(selected.len());
        for name in selected {
            let remote = remote_join(&directory, &name);
            let local_file = local.join(&name);
            let bytes = session
                .download_file(&remote, &local_file)
                .map_err(|e| CallError::connectivity(target.as_str(), e))?;
            debug!(remote = %remote, bytes, "downloaded");
            downloaded.push((name, local_file));
        }

        let mut resources = Vec::with_capacity(downloaded.len());
        for (name, path) in downloaded {
            let content = self
                .fs
                .read(&path)
                .map_err(|e| CallError::connectivity(path.display().to_string(), e))?;
            resources.push(Resource::new(name, content));
        }
        Ok(RawPayload::Many(resources))
    }

    fn accepts_sources(&self) -> bool {
        true
    }

    fn configure_sources(&mut self, source: SourceConfig) -> Result<(), CallError> {
        if let Some(pattern) = &source.pattern {
            Pattern::new(pattern)?;
        }
        let reconnect = source.fingerprint.is_some() && source.fingerprint != self.source.fingerprint;
        self.source.update(source);
        if reconnect {
            self.disconnect();
        }
        Ok(())
    }
}
