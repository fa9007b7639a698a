//! Pipeline stages for a document upload.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! ingress ──▶ normalize ──▶ ocr ──▶ postprocess ──▶ fields
//! (allow-list) (JPEG ≤2048)  (VLM)   (cleanup)       (regex)
//! ```
//!
//! 1. [`ingress`]     — MIME allow-list and size cap; rejects before any work
//! 2. [`normalize`]   — decode, bound and re-encode images in `spawn_blocking`;
//!    PDFs pass through
//! 3. [`ocr`]         — best-effort transcription; failure yields empty text
//! 4. [`postprocess`] — deterministic cleanup of the transcription
//! 5. [`fields`]      — pure pattern matching into [`crate::model::ExtractedFields`]
//!
//! Persistence and the expiry notifier run after these stages, in
//! [`crate::vault`].

pub mod fields;
pub mod ingress;
pub mod normalize;
pub mod ocr;
pub mod postprocess;
