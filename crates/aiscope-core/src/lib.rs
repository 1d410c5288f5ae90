//! # aiscope-core
//!
//! Deterministic data model for the aiscope AI-content detector.
//!
//! This crate holds everything about an analysis that does not touch the
//! network:
//! - Conversation history and file references
//! - Request assembly (system instruction, history, attachments, prompt)
//! - Model candidates and catalog ranking for auto-discovery
//! - Attempt outcomes and the resolution trace
//! - Score marker parsing for display
//!
//! ## Key Guarantees
//!
//! 1. **No I/O**: Nothing here calls a provider or sleeps
//! 2. **Order-preserving**: History, attachments and candidate chains keep
//!    their input order
//! 3. **Traceable**: Every attempted model ends up in a [`ResolutionTrace`]
//!
//! ## Example
//!
//! ```rust
//! use aiscope_core::{ChatTurn, GenerationConfig, RequestAssembler, Verdict};
//!
//! let assembler = RequestAssembler::new("Detect AI text.", GenerationConfig::default());
//! let history = vec![ChatTurn::from_label("user", "Earlier question")];
//! let request = assembler.build("The sky is blue.", &history, &[]).unwrap();
//! assert_eq!(request.message_parts().len(), 1);
//!
//! let verdict = Verdict::parse("<<SCORE:12>> Human-written.");
//! assert_eq!(verdict.score, Some(12));
//! ```

pub mod candidate;
pub mod outcome;
pub mod request;
pub mod types;
pub mod verdict;

// Re-export main types at crate root
pub use candidate::{is_fast_tier, rank_catalog, CandidateSource, ModelCandidate, ModelCatalogEntry};
pub use outcome::{AttemptOutcome, CandidateReport, DiscoveryStatus, FailureKind, ResolutionTrace};
pub use request::{AssemblyError, GenerationConfig, GenerationRequest, MessagePart, RequestAssembler};
pub use types::{ChatTurn, FileReference, FileState, Role};
pub use verdict::{Verdict, AI_LEANING_THRESHOLD};

/// Generation method a model must support to be a discovery candidate.
pub const GENERATE_CONTENT: &str = "generateContent";
