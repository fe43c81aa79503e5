//! End-to-end pipeline example: scan, quarantine, verify, restore, purge.
//!
//! This example shows how to:
//! - Build a SecurityIntegrator with a signature adapter and a quarantine store
//! - Scan a clean file and a flagged file
//! - Inspect, verify, restore and delete the quarantined copy
//!
//! Run with: cargo run --example quarantine_pipeline

use filesafe::adapters::EICAR_SIGNATURE;
use filesafe::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Filesafe Quarantine Pipeline Example ===\n");

    let workspace = tempfile::tempdir()?;
    let uploads = workspace.path().join("uploads");
    std::fs::create_dir_all(&uploads)?;

    let quarantine = QuarantineManager::new(
        QuarantineConfig::new(workspace.path().join("quarantine")).with_retention_days(7),
    );

    let integrator = SecurityIntegrator::builder()
        .with_malware_scanner(SignatureAdapter::new("signatures").with_eicar())
        .with_content_filter(MockAdapter::new_clean().with_name("content-filter"))
        .with_quarantine(quarantine.clone())
        .build()?;

    if !integrator.initialize().await {
        println!("No components available, giving up");
        return Ok(());
    }
    println!("Components: {:?}\n", integrator.component_status());

    let clean = uploads.join("notes.txt");
    std::fs::write(&clean, b"meeting notes, nothing to see here")?;
    let report = integrator.scan_file(&clean, ScanOptions::default()).await?;
    println!("{} -> secure = {}", clean.display(), report.secure);

    let evil = uploads.join("evil.txt");
    let mut content = b"attachment: ".to_vec();
    content.extend_from_slice(EICAR_SIGNATURE);
    std::fs::write(&evil, &content)?;

    let report = integrator.scan_file(&evil, ScanOptions::default()).await?;
    println!("{} -> secure = {}", evil.display(), report.secure);
    println!("Report:\n{}\n", serde_json::to_string_pretty(&report)?);

    let Some(id) = report.quarantine_id().cloned() else {
        println!("File was not quarantined");
        return Ok(());
    };

    if let Some(record) = integrator.get_quarantined_file_info(&id).await {
        println!("Quarantine ID: {}", record.id);
        println!("Reason:        {}", record.reason);
        println!("Stored at:     {}", record.quarantine_path.display());
        println!("SHA-256:       {}", record.file_hash.as_deref().unwrap_or("-"));
        println!("Size:          {} bytes", record.file_size);
    }

    println!("Integrity intact: {}", integrator.verify_quarantined_file(&id).await?);

    let restored = integrator
        .restore_quarantined_file(&id, Some(&workspace.path().join("restored.txt")))
        .await?;
    println!("Restored to: {}", restored.display());

    let stats = quarantine.stats().await?;
    println!("Store stats: {:?}", stats);

    integrator.delete_quarantined_file(&id, true).await?;
    println!(
        "After permanent delete, records left: {}",
        integrator.get_quarantined_files(None).await.len()
    );

    println!("Expired records removed: {}", integrator.clean_quarantine(7).await);

    Ok(())
}
