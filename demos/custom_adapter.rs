//! Custom adapter example demonstrating how to plug in a new engine.
//!
//! This example shows how to:
//! - Implement the SecurityAdapter trait for a hash blocklist
//! - Put it in the malware slot of a SecurityIntegrator
//! - Read the per-component results of a scan
//!
//! Run with: cargo run --example custom_adapter

use async_trait::async_trait;
use filesafe::prelude::*;
use std::collections::HashSet;
use std::path::Path;

/// Flags files whose SHA-256 digest is on a blocklist.
#[derive(Debug)]
struct HashBlocklistAdapter {
    name: String,
    blocklist: HashSet<String>,
    hasher: FileHasher,
}

impl HashBlocklistAdapter {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocklist: HashSet::new(),
            hasher: FileHasher::new(),
        }
    }

    fn with_blocked_hash(mut self, hash: impl Into<String>) -> Self {
        self.blocklist.insert(hash.into().to_ascii_lowercase());
        self
    }
}

#[async_trait]
impl SecurityAdapter for HashBlocklistAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), ScanError> {
        if self.blocklist.is_empty() {
            return Err(ScanError::adapter_unavailable(&self.name, "blocklist is empty"));
        }
        Ok(())
    }

    async fn scan(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
        let hash = self.hasher.hash_file(path)?;

        tracing::debug!(adapter = self.name(), hash = %hash, "Checking hash against blocklist");

        if !self.blocklist.contains(&hash.sha256) {
            return Ok(ScanOutcome::clean());
        }

        tracing::warn!(adapter = self.name(), hash = %hash, "Hash found in blocklist");
        Ok(ScanOutcome::flagged(Details::new())
            .with_detail("rule", "Blocklist.Match")
            .with_detail("sha256", hash.sha256))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Custom Adapter Example ===\n");

    let malicious_content = b"This content is known to be malicious!";
    let malicious_hash = FileHasher::new().hash_bytes(malicious_content);
    println!("Blocked hash: {}", malicious_hash);

    let workspace = tempfile::tempdir()?;
    let integrator = SecurityIntegrator::builder()
        .with_malware_scanner(
            HashBlocklistAdapter::new("hash-blocklist").with_blocked_hash(&malicious_hash.sha256),
        )
        .with_quarantine(QuarantineManager::new(QuarantineConfig::new(
            workspace.path().join("quarantine"),
        )))
        .build()?;
    integrator.initialize().await;

    println!("\n=== Test 1: Scanning a clean file ===");
    let safe = workspace.path().join("safe.txt");
    std::fs::write(&safe, b"This is a perfectly safe file.")?;
    let report = integrator.scan_file(&safe, ScanOptions::default()).await?;
    println!("Result: {}", if report.secure { "CLEAN" } else { "FLAGGED" });
    println!("Duration: {} ms", report.duration_ms);

    println!("\n=== Test 2: Scanning the blocked file ===");
    let blocked = workspace.path().join("malware.bin");
    std::fs::write(&blocked, malicious_content)?;
    let report = integrator.scan_file(&blocked, ScanOptions::default()).await?;
    println!("Result: {}", if report.secure { "CLEAN" } else { "FLAGGED" });
    for (kind, component) in &report.components {
        println!("  {} ({}): {:?}", kind, component.adapter, component.outcome);
    }
    println!("Quarantine ID: {:?}", report.quarantine_id());

    println!("\n=== Test 3: Report only, no quarantine ===");
    let report = integrator
        .scan_file(&blocked, ScanOptions::new().without_quarantine())
        .await?;
    println!("Secure: {}, actions: {}", report.secure, report.actions.len());

    println!("\n=== Example Complete ===");
    Ok(())
}
