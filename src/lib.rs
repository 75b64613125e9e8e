//! covenant - contract term extraction, evidence grounding, and breach
//! detection via an external text-generation service.
//!
//! # Architecture
//!
//! Every expensive service call passes through a content-addressed cache
//! keyed by a fingerprint of the canonicalized request. The service's
//! free-text evidence is re-located inside the source document with an
//! escalating set of matching strategies, and accepted spans are rendered
//! into a highlighted copy of the document.
//!
//! # Modules
//!
//! - `cache`: Content-addressed query cache (fingerprint -> stored value)
//! - `llm`: Chat service interface, response decoding, cached query client
//! - `document`: Paragraph-based documents and their flattened text
//! - `evidence`: Snippet localization and highlight rendering
//! - `extract`: Extraction schemas and prompt composition
//! - `store`: Delivery records store (in-memory SQLite over JSON exports)
//! - `detect`: Contract-versus-delivery breach detection
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Extract contract terms
//! covenant extract contracts/copper.txt
//!
//! # Check deliveries for breaches
//! covenant detect "contracts/*.txt"
//!
//! # Highlight evidence for specific questions
//! covenant highlight contracts/copper.txt \
//!     -q "What is the contract number" -o copper.html
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod detect;
pub mod document;
pub mod evidence;
pub mod extract;
pub mod llm;
pub mod store;

// Re-export main types at crate root for convenience
pub use cache::{CacheStore, Fingerprint};
pub use detect::{BreachDetector, BreachReport, BreachVerdict};
pub use document::Document;
pub use evidence::{FieldSpan, HighlightError, Match, MatchResult};
pub use extract::{ContractTerms, ExtractionSchema, TermExtractor};
pub use llm::{ChatMessage, ChatService, DecodeError, OpenAiService, QueryClient, Role, ServiceError};
pub use store::{DeliveryRecord, DeliveryStore};
