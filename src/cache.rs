//! Derivative-variation cache.
//!
//! Rendering a pipeline means a full decode, every step, and an encode.
//! This module makes the common case (the same variation requested again)
//! a single store read.
//!
//! # Design
//!
//! ## Cache keys
//!
//! Variations are stored under `(account, image identifier, width)`, where
//! width is the **final output width** of the pipeline. It is computed from
//! the stored dimensions of the original by planning the pipeline
//! ([`Renderer::plan`]) so a lookup never touches pixels.
//!
//! Different pipelines can end at the same width (`resize:width=100` and
//! `resize:width=100` followed by `desaturate`). Each stored entry therefore
//! carries a **tag**: SHA-256 over every step, field by field, and the
//! default encode quality. A slot whose tag does not match is a miss and is
//! overwritten by the fresh render, like a direct-mapped cache.
//!
//! ## Entry layout
//!
//! ```text
//! "PXV1" | tag (32 bytes) | height (u32 LE) | mime length (u8) | mime | encoded image
//! ```
//!
//! ## Invalidation
//!
//! There is no eviction. Entries live until [`VariationCache::invalidate`]
//! removes them; the engine does so whenever an original is deleted.
//!
//! ## Concurrency
//!
//! Concurrent misses on one key are serialized by a per-key in-flight lock:
//! the first caller renders and stores, the others find the stored entry on
//! their re-check. Rendering is deterministic, so even without the lock the
//! result would be correct, just computed twice.

use crate::error::{Error, Result};
use crate::storage::{DeleteOutcome, ImageStore};
use crate::transformation::{
    Dimensions, ParamValue, Quality, Rendered, Renderer, TransformationDescriptor,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const ENTRY_MAGIC: &[u8; 4] = b"PXV1";
const TAG_LEN: usize = 32;
const HEADER_LEN: usize = ENTRY_MAGIC.len() + TAG_LEN + 4 + 1;

/// Tag identifying which pipeline produced a stored variation.
pub type PipelineTag = [u8; TAG_LEN];

/// SHA-256 over the pipeline and default quality.
///
/// Inputs: every step with its parameters, in order, plus the quality used
/// when no `compress` step is present. Every name, key and value is fed
/// length-prefixed, so values containing `/`, `:`, `,` or `=` cannot make
/// two different pipelines hash alike.
pub fn hash_pipeline(
    pipeline: &[TransformationDescriptor],
    default_quality: Quality,
) -> PipelineTag {
    fn field(hasher: &mut Sha256, bytes: &[u8]) {
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }

    let mut hasher = Sha256::new();
    hasher.update(b"variation\0");
    hasher.update((pipeline.len() as u64).to_le_bytes());
    for step in pipeline {
        field(&mut hasher, step.name.as_bytes());
        hasher.update((step.params.len() as u64).to_le_bytes());
        for (key, value) in step.params.iter() {
            field(&mut hasher, key.as_bytes());
            match value {
                ParamValue::Int(n) => {
                    hasher.update([b'i']);
                    hasher.update(n.to_le_bytes());
                }
                ParamValue::Str(text) => {
                    hasher.update([b's']);
                    field(&mut hasher, text.as_bytes());
                }
            }
        }
    }
    hasher.update([default_quality.value()]);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&hasher.finalize());
    tag
}

/// Frame a rendered variation for storage.
pub fn encode_entry(tag: &PipelineTag, rendered: &Rendered) -> Vec<u8> {
    let mime = rendered.mime.as_bytes();
    let mime_len = mime.len().min(u8::MAX as usize);
    let mut out = Vec::with_capacity(HEADER_LEN + mime_len + rendered.blob.len());
    out.extend_from_slice(ENTRY_MAGIC);
    out.extend_from_slice(tag);
    out.extend_from_slice(&rendered.height.to_le_bytes());
    out.push(mime_len as u8);
    out.extend_from_slice(&mime[..mime_len]);
    out.extend_from_slice(&rendered.blob);
    out
}

/// Unframe a stored variation. `None` for anything malformed or tagged for
/// a different pipeline.
pub fn decode_entry(bytes: &[u8], tag: &PipelineTag, width: u32) -> Option<Rendered> {
    let rest = bytes.strip_prefix(ENTRY_MAGIC)?;
    let (stored_tag, rest) = rest.split_first_chunk::<TAG_LEN>()?;
    if stored_tag != tag {
        return None;
    }
    let (height, rest) = rest.split_first_chunk::<4>()?;
    let (mime_len, rest) = rest.split_first()?;
    let mime_len = *mime_len as usize;
    if rest.len() < mime_len {
        return None;
    }
    let (mime, blob) = rest.split_at(mime_len);
    Some(Rendered {
        blob: blob.to_vec(),
        mime: String::from_utf8(mime.to_vec()).ok()?,
        width,
        height: u32::from_le_bytes(*height),
    })
}

/// Summary of cache performance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses whose render was written back.
    pub stored: u64,
}

impl CacheStats {
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} rendered ({} total)",
                self.hits,
                self.misses,
                self.total()
            )?;
        } else {
            write!(f, "{} rendered", self.misses)?;
        }
        if self.stored < self.misses {
            write!(f, ", {} not stored", self.misses - self.stored)?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stored: AtomicU64,
}

/// Resolves variations against a store, rendering on miss.
pub struct VariationCache {
    store: Arc<dyn ImageStore>,
    renderer: Renderer,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    counters: Counters,
}

impl VariationCache {
    pub fn new(store: Arc<dyn ImageStore>, renderer: Renderer) -> Self {
        Self {
            store,
            renderer,
            in_flight: DashMap::new(),
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stored: self.counters.stored.load(Ordering::Relaxed),
        }
    }

    /// Serve a variation of a stored original, rendering it on a miss.
    pub fn resolve(
        &self,
        account: &str,
        identifier: &str,
        pipeline: &[TransformationDescriptor],
    ) -> Result<Rendered> {
        let info = self
            .store
            .load_info(account, identifier)?
            .ok_or_else(|| Error::not_found(account, identifier))?;
        let source = Dimensions {
            width: info.width,
            height: info.height,
        };
        let width = self.renderer.plan(source, pipeline)?.width;
        let tag = hash_pipeline(pipeline, self.renderer.default_quality());

        if let Some(hit) = self.lookup(account, identifier, width, &tag)? {
            return Ok(hit);
        }

        let key = format!("{account}/{identifier}/{width}");
        let slot = self.in_flight.entry(key.clone()).or_default().value().clone();
        let result = {
            let _guard = slot.lock();
            // Another caller may have rendered while we waited
            match self.lookup(account, identifier, width, &tag) {
                Ok(Some(hit)) => Ok(hit),
                Ok(None) => self.render_and_store(account, identifier, width, &tag, pipeline),
                Err(e) => Err(e),
            }
        };
        drop(slot);
        self.in_flight.remove_if(&key, |_, s| Arc::strong_count(s) == 1);
        result
    }

    fn lookup(
        &self,
        account: &str,
        identifier: &str,
        width: u32,
        tag: &PipelineTag,
    ) -> Result<Option<Rendered>> {
        let Some(bytes) = self.store.get_variation(account, identifier, width)? else {
            return Ok(None);
        };
        match decode_entry(&bytes, tag, width) {
            Some(rendered) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(account, identifier, width, "Variation cache hit");
                Ok(Some(rendered))
            }
            None => {
                tracing::debug!(account, identifier, width, "Variation slot holds another pipeline");
                Ok(None)
            }
        }
    }

    fn render_and_store(
        &self,
        account: &str,
        identifier: &str,
        width: u32,
        tag: &PipelineTag,
        pipeline: &[TransformationDescriptor],
    ) -> Result<Rendered> {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let original = self
            .store
            .get_original(account, identifier)?
            .ok_or_else(|| Error::not_found(account, identifier))?;
        let rendered = self.renderer.render(&original, pipeline)?;

        self.store
            .store_variation(account, identifier, width, &encode_entry(tag, &rendered))
            .inspect_err(|e| {
                tracing::warn!(account, identifier, width, error = %e, "Could not store variation");
            })?;
        self.counters.stored.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(account, identifier, width, bytes = rendered.blob.len(), "Cached variation");
        Ok(rendered)
    }

    /// Remove one cached width, or every variation of the image.
    pub fn invalidate(
        &self,
        account: &str,
        identifier: &str,
        width: Option<u32>,
    ) -> Result<DeleteOutcome> {
        let outcome = self.store.delete_variations(account, identifier, width)?;
        tracing::debug!(account, identifier, ?width, ?outcome, "Invalidated variations");
        Ok(outcome)
    }
}
