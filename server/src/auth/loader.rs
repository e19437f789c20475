//! Startup-time loading of provider trust configuration.
//!
//! The loader walks a directory tree looking for `*.provider` trust files
//! and the `allow-anonymous` marker, parses each trust file into a
//! [`ProviderTrust`], and produces the immutable [`AuthConfiguration`]
//! snapshot the gateway holds for the process lifetime.
//!
//! # Pre-conditions
//! - The configuration root directory must exist.
//!
//! # Post-conditions
//! - On success the snapshot is complete; a partial trust table is never
//!   produced.
//!
//! # Invariants
//! - Trust records keep a deterministic order (directory entries are sorted
//!   by name, depth-first), because the verifier tries candidates in table
//!   order.
//! - A marker file alongside trust records anywhere in the tree is a fatal
//!   contradiction, and an empty tree without a marker is equally fatal.
//!   Ambiguous trust intent never resolves silently.

use std::path::{Path, PathBuf};

use chardetng::EncodingDetector;
use serde::Deserialize;

use super::algorithm::SigningAlgorithm;
use super::provider::{AuthConfiguration, KeyMaterial, ProviderTrust};
use crate::diagnostics::Diagnostics;

/// File name suffix marking a trust record.
const TRUST_FILE_SUFFIX: &str = ".provider";
/// Reserved marker file name enabling anonymous access.
const ANONYMOUS_MARKER_NAME: &str = "allow-anonymous";

/// Error that aborts startup when the trust configuration cannot be loaded.
#[derive(Debug)]
pub enum LoaderError {
    /// A directory could not be read (including a missing root).
    DirectoryRead {
        /// The directory that failed.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },
    /// A single trust file failed to load or validate.
    FileLoad {
        /// The offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
    /// Trust records and the anonymous marker are both present.
    ContradictoryLayout(PathBuf),
    /// Neither trust records nor the anonymous marker were found.
    EmptyConfiguration(PathBuf),
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryRead { path, source } => {
                write!(f, "failed to read directory {}: {source}", path.display())
            }
            Self::FileLoad { path, reason } => {
                write!(
                    f,
                    "error loading configuration from {}: {reason}",
                    path.display()
                )
            }
            Self::ContradictoryLayout(path) => {
                write!(
                    f,
                    "anonymous access is marked as allowed, but there are trust files in {}",
                    path.display()
                )
            }
            Self::EmptyConfiguration(path) => {
                write!(
                    f,
                    "no authentication configurations found in {}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for LoaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DirectoryRead { source, .. } => Some(source),
            Self::FileLoad { .. } | Self::ContradictoryLayout(_) | Self::EmptyConfiguration(_) => {
                None
            }
        }
    }
}

/// Aggregate result of scanning one subtree.
#[derive(Debug, Default)]
struct ScanResult {
    trust_files: Vec<PathBuf>,
    has_marker: bool,
}

impl ScanResult {
    /// Combine two subtree results: file lists concatenate, marker flags OR.
    fn merge(mut self, other: Self) -> Self {
        self.trust_files.extend(other.trust_files);
        self.has_marker = self.has_marker || other.has_marker;
        self
    }
}

/// On-disk shape of a trust file. All fields optional so that missing ones
/// can be reported together.
#[derive(Debug, Deserialize)]
struct TrustFileRecord {
    provider: Option<String>,
    issuer: Option<String>,
    audience: Option<String>,
    algorithm: Option<String>,
    public_key: Option<String>,
    shared_key: Option<String>,
}

/// Load the authentication configuration from a directory tree.
///
/// # Errors
/// Returns a [`LoaderError`] naming the offending path when any trust file
/// is malformed, when the directory layout is contradictory or empty, or
/// when the tree cannot be read. Partial configurations are never returned.
pub fn load_auth_configuration(
    root: &Path,
    diagnostics: &dyn Diagnostics,
) -> Result<AuthConfiguration, LoaderError> {
    diagnostics.info(&format!(
        "searching for authentication files in {}",
        root.display()
    ));

    let scan = scan_directory(root)?;

    if scan.has_marker && !scan.trust_files.is_empty() {
        return Err(LoaderError::ContradictoryLayout(root.to_path_buf()));
    }
    if !scan.has_marker && scan.trust_files.is_empty() {
        return Err(LoaderError::EmptyConfiguration(root.to_path_buf()));
    }

    let mut providers = Vec::with_capacity(scan.trust_files.len());
    for path in &scan.trust_files {
        diagnostics.info(&format!(
            "loading authentication configuration from {}",
            path.display()
        ));
        providers.push(load_trust_file(path)?);
    }

    if scan.has_marker {
        diagnostics.warn("--------- Anonymous access is allowed!!! --------");
    }

    Ok(AuthConfiguration {
        providers,
        allow_anonymous: scan.has_marker,
    })
}

/// Depth-first scan of one directory, expressed as a fold over sorted
/// entries merging immutable subtree results.
fn scan_directory(dir: &Path) -> Result<ScanResult, LoaderError> {
    let reader = std::fs::read_dir(dir).map_err(|source| LoaderError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|source| LoaderError::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        })?;
        entries.push(entry);
    }
    // Sort for a deterministic trust table order; readdir order is
    // platform-dependent.
    entries.sort_by_key(std::fs::DirEntry::file_name);

    entries
        .into_iter()
        .try_fold(ScanResult::default(), |accumulated, entry| {
            let path = entry.path();
            let subtree = if path.is_dir() {
                scan_directory(&path)?
            } else {
                classify_file(path)
            };
            Ok(accumulated.merge(subtree))
        })
}

fn classify_file(path: PathBuf) -> ScanResult {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    match name.as_deref() {
        Some(name) if name.ends_with(TRUST_FILE_SUFFIX) => ScanResult {
            trust_files: vec![path],
            has_marker: false,
        },
        Some(ANONYMOUS_MARKER_NAME) => ScanResult {
            trust_files: Vec::new(),
            has_marker: true,
        },
        _ => ScanResult::default(),
    }
}

/// Load and validate a single trust file.
fn load_trust_file(path: &Path) -> Result<ProviderTrust, LoaderError> {
    let file_error = |reason: String| LoaderError::FileLoad {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| file_error(e.to_string()))?;
    let content = decode_text(&bytes);

    let record: TrustFileRecord =
        serde_json::from_str(&content).map_err(|e| file_error(e.to_string()))?;

    // An empty string is as useless as an absent field; both count as
    // missing.
    let provider = record.provider.filter(|value| !value.is_empty());
    let issuer = record.issuer.filter(|value| !value.is_empty());
    let audience = record.audience.filter(|value| !value.is_empty());
    let algorithm_name = record.algorithm.filter(|value| !value.is_empty());

    let mut missing = Vec::new();
    if provider.is_none() {
        missing.push("provider");
    }
    if issuer.is_none() {
        missing.push("issuer");
    }
    if audience.is_none() {
        missing.push("audience");
    }
    if algorithm_name.is_none() {
        missing.push("algorithm");
    }
    if !missing.is_empty() {
        return Err(file_error(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    // Guarded by the missing-field check above.
    let (Some(provider), Some(issuer), Some(audience), Some(algorithm_name)) =
        (provider, issuer, audience, algorithm_name)
    else {
        return Err(file_error("missing required fields".to_string()));
    };

    let Some(algorithm) = SigningAlgorithm::parse(&algorithm_name) else {
        return Err(file_error(format!(
            "unsupported algorithm: {algorithm_name}"
        )));
    };

    let key = match (record.public_key, record.shared_key) {
        (Some(_), Some(_)) => {
            return Err(file_error(
                "exactly one of public_key and shared_key must be present".to_string(),
            ));
        }
        (Some(public_key), None) => KeyMaterial::PublicKey(public_key),
        (None, Some(shared_key)) => KeyMaterial::SharedKey(shared_key.into_bytes()),
        (None, None) => {
            return Err(file_error(format!(
                "algorithm {algorithm} requires key material"
            )));
        }
    };

    ProviderTrust::new(provider, issuer, audience, algorithm, key)
        .map_err(|e| file_error(e.to_string()))
}

/// Decode raw file bytes to text, auto-detecting the encoding.
///
/// A byte-order mark wins outright; otherwise the statistical detector
/// picks the most plausible encoding, falling back to UTF-8 semantics with
/// replacement characters for undecodable sequences.
fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, _)) = encoding_rs::Encoding::for_bom(bytes) {
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let (text, _, _) = detector.guess(None, true).decode(bytes);
    text.into_owned()
}
