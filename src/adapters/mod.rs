//! Security adapter implementations.
//!
//! This module contains implementations of the `SecurityAdapter` trait.
//!
//! ## Available Adapters
//!
//! - [`mock`] - A configurable adapter for testing
//! - [`signature`] - Literal byte-signature matching
//!
//! ## Implementing a Custom Adapter
//!
//! To plug in another engine, implement the `SecurityAdapter` trait:
//!
//! ```rust,ignore
//! use filesafe::core::{SecurityAdapter, ScanOutcome, ScanError};
//! use async_trait::async_trait;
//! use std::path::Path;
//!
//! #[derive(Debug)]
//! pub struct MyEngine {
//!     // Your engine's configuration
//! }
//!
//! #[async_trait]
//! impl SecurityAdapter for MyEngine {
//!     fn name(&self) -> &str {
//!         "my-engine"
//!     }
//!
//!     async fn scan(&self, path: &Path) -> Result<ScanOutcome, ScanError> {
//!         // Implement scanning logic
//!         todo!()
//!     }
//! }
//! ```

pub mod mock;
pub mod signature;

// Re-exports
pub use mock::MockAdapter;
pub use signature::{Signature, SignatureAdapter, EICAR_SIGNATURE};
