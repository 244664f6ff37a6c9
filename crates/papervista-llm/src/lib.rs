//! Generative-text fallback for citations.
//!
//! When deterministic rendering cannot proceed, [`FallbackGenerator`] asks a
//! [`TextGenerator`] (by default an OpenAI-compatible chat completions
//! service) to synthesize a single-line citation from whatever data is
//! available, then strips any fences or tags from the answer.
//!
//! The credential is part of [`GeneratorConfig`] and is supplied by the
//! caller at startup. A generator built without one reports
//! [`FallbackError::NotConfigured`] instead of making a request.

pub mod client;
pub mod error;
pub mod fallback;

pub use client::{GeneratorConfig, OpenAiCompatibleGenerator, TextGenerator};
pub use error::{FallbackError, Result};
pub use fallback::{FallbackGenerator, build_prompt, clean_citation};
