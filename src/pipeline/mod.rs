//! Pipeline stages for leaf-photo diagnosis.
//!
//! Each submodule implements one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ parse ──▶ html
//! (path)    (base64)   (Gemini) (record) (fragment)
//!                                  └────▶ document
//!                                         (PDF file)
//! ```
//!
//! 1. [`input`]    — read the photo into an image payload
//! 2. [`encode`]   — base64-wrap the payload for the request body
//! 3. [`llm`]      — the one network call; provider trait plus Gemini client
//! 4. [`parse`]    — keyword classification of the answer into a record
//! 5. [`html`]     — inline fragment built from the raw answer
//! 6. [`document`] — PDF layout and painting; runs in `spawn_blocking`

pub mod document;
pub mod encode;
pub mod html;
pub mod input;
pub mod llm;
pub mod parse;
