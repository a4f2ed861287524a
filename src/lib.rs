//! # pixstore
//!
//! Content-addressable image storage with on-demand, cached transformations.
//! Clients upload originals under an account, then ask for derived versions
//! with an ordered list of transformation strings:
//!
//! ```text
//! ["resize:width=300", "border:color=fff,width=2", "convert:type=jpg"]
//! ```
//!
//! The first request for a variation renders it; later requests are a single
//! store read.
//!
//! # Architecture: One Request
//!
//! ```text
//! parse list  →  preExec hooks  →  plan width  →  cache hit?  ──yes──→  postExec hooks
//!                                                    │no
//!                                                    └→ load original → render → store
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Orchestrates every operation: hooks around parse, cache and storage |
//! | [`transformation`] | String parser, transformation registry, built-ins, codec backend, renderer |
//! | [`cache`] | Variation cache keyed by final output width, tagged by pipeline hash |
//! | [`storage`] | `ImageStore` contract; sharded filesystem and in-memory backends |
//! | [`hooks`] | Priority-ordered pre/post hooks per operation, plus built-ins |
//! | [`identifier`] | Content identifiers and key validation |
//! | [`config`] | `pixstore.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//! | [`error`] | Crate-wide error type with client/server classification |
//!
//! # Design Decisions
//!
//! ## Content Addressing
//!
//! An image identifier is derived from a SHA-256 of its bytes. Uploading the
//! same file twice yields the same identifier, so deduplication is free and
//! identifiers are safe to shard on.
//!
//! ## Sharded Layout
//!
//! Every key is spread over three single-character directory levels taken
//! from its first characters:
//!
//! ```text
//! variations/c/h/r/christer/b/8/e/b8e1.../300
//! ```
//!
//! This keeps directory sizes bounded without any index.
//!
//! ## Width-Keyed Variations
//!
//! A variation is addressed by its final width, which is predicted from the
//! stored original dimensions without decoding pixels. A pipeline hash
//! stored with each entry tells apart different pipelines that happen to end
//! at the same width.
//!
//! ## Explicit Hook Registration
//!
//! Hooks are registered at startup, either in code or by naming built-ins in
//! config. Nothing is discovered from the filesystem at request time.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod identifier;
pub mod output;
pub mod storage;
pub mod transformation;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod test_helpers;
