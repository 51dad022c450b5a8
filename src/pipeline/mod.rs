//! Pipeline stages for image-to-flashcard generation.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! and the HTTP layer can be swapped without touching the stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ ocr ──▶ synthesis
//! (path/URL)  (JPEG+b64)  (text)   ([{front, back}])
//! ```
//!
//! 1. [`input`]     — read a local file or download a URL; check magic bytes
//! 2. [`encode`]    — decode, JPEG-compress and base64-wrap the bitmap
//! 3. [`ocr`]       — first network round trip; image → text
//! 4. [`synthesis`] — second network round trip; text → flashcards
//!
//! [`transport`] is the HTTP seam both network stages go through.

pub mod encode;
pub mod input;
pub mod ocr;
pub mod synthesis;
pub mod transport;
