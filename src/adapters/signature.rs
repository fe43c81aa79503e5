//! Literal byte-signature matching.
//!
//! `SignatureAdapter` looks for fixed byte strings in a file. It streams the
//! file in chunks and carries the tail of each chunk into the next one, so a
//! signature split across a chunk boundary is still found. The work runs on
//! the blocking pool.

use crate::core::{Details, ScanError, ScanOutcome, SecurityAdapter};

use async_trait::async_trait;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// The EICAR anti-malware test string.
pub const EICAR_SIGNATURE: &[u8] =
    b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A named byte pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Reported when the pattern matches.
    pub name: String,
    /// Bytes to look for.
    pub pattern: Vec<u8>,
}

/// Flags files containing any configured signature.
///
/// # Examples
///
/// ```rust
/// use filesafe::adapters::SignatureAdapter;
///
/// let adapter = SignatureAdapter::new("patterns")
///     .with_eicar()
///     .with_signature("php-webshell", b"<?php eval(".to_vec());
/// assert_eq!(adapter.signatures().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SignatureAdapter {
    name: String,
    signatures: Arc<Vec<Signature>>,
    chunk_size: usize,
}

impl SignatureAdapter {
    /// Creates an adapter with no signatures.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signatures: Arc::new(Vec::new()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Adds a signature. Empty patterns are ignored.
    pub fn with_signature(mut self, name: impl Into<String>, pattern: impl Into<Vec<u8>>) -> Self {
        let pattern = pattern.into();
        if !pattern.is_empty() {
            Arc::make_mut(&mut self.signatures).push(Signature {
                name: name.into(),
                pattern,
            });
        }
        self
    }

    /// Adds the EICAR test signature.
    pub fn with_eicar(self) -> Self {
        self.with_signature("EICAR-Test-File", EICAR_SIGNATURE)
    }

    /// Sets the read chunk size. Zero is bumped to one byte.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Returns the configured signatures.
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Names of the signatures found in `reader`, in configuration order.
    pub fn find_matches<R: Read>(&self, reader: &mut R) -> std::io::Result<Vec<String>> {
        find_matches(&self.signatures, self.chunk_size, reader)
    }
}

fn find_matches<R: Read>(
    signatures: &[Signature],
    chunk_size: usize,
    reader: &mut R,
) -> std::io::Result<Vec<String>> {
    let longest = signatures.iter().map(|s| s.pattern.len()).max().unwrap_or(0);
    let overlap = longest.saturating_sub(1);

    let mut found = vec![false; signatures.len()];
    let mut window: Vec<u8> = Vec::with_capacity(chunk_size + overlap);
    let mut buffer = vec![0u8; chunk_size];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        window.extend_from_slice(&buffer[..bytes_read]);

        for (sig, hit) in signatures.iter().zip(found.iter_mut()) {
            if !*hit && contains(&window, &sig.pattern) {
                *hit = true;
            }
        }
        if found.iter().all(|hit| *hit) {
            break;
        }

        let keep = overlap.min(window.len());
        window.drain(..window.len() - keep);
    }

    Ok(signatures
        .iter()
        .zip(found)
        .filter(|(_, hit)| *hit)
        .map(|(sig, _)| sig.name.clone())
        .collect())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.len() >= needle.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[async_trait]
impl SecurityAdapter for SignatureAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), ScanError> {
        if self.signatures.is_empty() {
            return Err(ScanError::adapter_unavailable(
                &self.name,
                "no signatures configured",
            ));
        }
        tracing::debug!(adapter = %self.name, signatures = self.signatures.len(), "Signature adapter ready");
        Ok(())
    }

    async fn scan(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
        let signatures = Arc::clone(&self.signatures);
        let chunk_size = self.chunk_size;
        let path = path.to_path_buf();

        let matches = tokio::task::spawn_blocking(move || {
            let mut file = std::fs::File::open(&path)?;
            find_matches(&signatures, chunk_size, &mut file)
        })
        .await
        .map_err(|e| ScanError::internal(format!("signature scan task failed: {}", e)))??;

        if matches.is_empty() {
            return Ok(ScanOutcome::clean());
        }

        let mut details = Details::new();
        details.insert("adapter".into(), self.name.clone().into());
        details.insert("matches".into(), matches.into());
        Ok(ScanOutcome::flagged(details))
    }
}
