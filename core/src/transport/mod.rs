//! Transport drivers.
//!
//! Each driver implements `service::Transport`. HTTP and SOAP perform one
//! round-trip per call; the file and SSH drivers can fan one call out to
//! every resource matching a pattern and return them as
//! `RawPayload::Many`.

pub mod file;
pub mod http;
pub mod soap;
pub mod ssh;

pub use file::{FileTransport, Filesystem, LocalFilesystem};
pub use http::{HttpMethod, HttpRequest, HttpTransport};
pub use soap::SoapTransport;
pub use ssh::{RemoteSession, SessionFactory, SessionParams, SshTransport};

use crate::error::CallError;
use crate::pattern::Pattern;

/// Characters that make a method name a glob.
pub(crate) fn is_glob(name: &str) -> bool {
    name.contains(['*', '?', '['])
}

/// Names matching `pattern`, in the order given. Matching nothing is an
/// `EmptyRetrieval` error rather than an empty fan-out.
pub(crate) fn select(names: Vec<String>, pattern: &Pattern) -> Result<Vec<String>, CallError> {
    let selected: Vec<String> = names.into_iter().filter(|n| pattern.matches(n)).collect();
    if selected.is_empty() {
        Err(CallError::empty_retrieval(pattern.as_str()))
    } else {
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_detection() {
        assert!(is_glob("*.txt"));
        assert!(is_glob("file?.csv"));
        assert!(!is_glob("report.csv"));
    }

    #[test]
    fn select_keeps_order_and_rejects_empty() {
        let names = vec!["b.txt".to_string(), "a.xml".to_string(), "a.txt".to_string()];
        let pattern = Pattern::new("*.txt").unwrap();
        assert_eq!(select(names.clone(), &pattern).unwrap(), ["b.txt", "a.txt"]);
        let err = select(names, &Pattern::new("*.csv").unwrap()).unwrap_err();
        assert!(matches!(err, CallError::EmptyRetrieval { .. }));
    }
}
