//! Request orchestration.
//!
//! Every public operation follows the same shape:
//!
//! ```text
//! validate input → context → <op>PreExec hooks → work → <op>PostExec hooks
//! ```
//!
//! For `getImage` the work is parse → plan → [`VariationCache::resolve`],
//! skipped when a pre hook has already placed an output on the context.
//! A failing hook aborts the operation with [`Error::HookExecution`].

use crate::cache::{CacheStats, VariationCache};
use crate::config::{ConfigError, ServiceConfig};
use crate::error::{Error, Result};
use crate::hooks::{HookRegistry, OperationContext, builtin};
use crate::identifier::{checksum, image_identifier};
use crate::storage::fs::FilesystemStore;
use crate::storage::{DeleteOutcome, ImageInfo, ImageStore};
use crate::transformation::{
    ImageBackend, ParamValue, Quality, Rendered, Renderer, RustBackend, SpecParser,
    TransformationDescriptor, TransformationRegistry,
};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Operation names, as used in hook event keys (`getImagePreExec`, ...).
pub mod operations {
    pub const GET_IMAGE: &str = "getImage";
    pub const ADD_IMAGE: &str = "addImage";
    pub const DELETE_IMAGE: &str = "deleteImage";
    pub const UPDATE_METADATA: &str = "updateMetadata";
    pub const PURGE_VARIATIONS: &str = "purgeVariations";
}

use operations::*;

pub struct TransformationEngine {
    store: Arc<dyn ImageStore>,
    parser: SpecParser,
    renderer: Renderer,
    cache: VariationCache,
    hooks: HookRegistry,
}

impl TransformationEngine {
    pub fn new(
        store: Arc<dyn ImageStore>,
        renderer: Renderer,
        parser: SpecParser,
        hooks: HookRegistry,
    ) -> Self {
        let cache = VariationCache::new(Arc::clone(&store), renderer.clone());
        Self {
            store,
            parser,
            renderer,
            cache,
            hooks,
        }
    }

    /// Engine over a [`FilesystemStore`] and the bundled [`RustBackend`],
    /// with hooks enabled from `[[hooks]]`.
    pub fn from_config(config: &ServiceConfig) -> std::result::Result<Self, ConfigError> {
        let store = FilesystemStore::create(
            &config.storage.originals_dir,
            &config.storage.variations_dir,
        )?;
        let renderer = Renderer::new(
            Arc::new(TransformationRegistry::with_builtins()),
            Arc::new(RustBackend::new()),
            Quality::new(config.output.quality),
        )
        .with_max_dimension(config.transformations.max_dimension);
        let parser = SpecParser::new(config.transformations.numeric_params.iter().cloned());
        let hooks = builtin::registry(&config.hooks)?;
        tracing::debug!(
            originals = %config.storage.originals_dir,
            variations = %config.storage.variations_dir,
            hooks = hooks.len(),
            "Engine ready"
        );
        Ok(Self::new(Arc::new(store), renderer, parser, hooks))
    }

    pub fn store(&self) -> &dyn ImageStore {
        self.store.as_ref()
    }

    pub fn parser(&self) -> &SpecParser {
        &self.parser
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Cache counters since the engine was built.
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // =========================================================================
    // addImage
    // =========================================================================

    /// Ingest an original under `account`.
    ///
    /// The identifier is derived from the bytes, so uploading the same file
    /// again returns the existing record (with `metadata` merged in) instead
    /// of storing a second copy.
    pub fn add_image(
        &self,
        account: &str,
        blob: &[u8],
        metadata: BTreeMap<String, String>,
    ) -> Result<ImageInfo> {
        if blob.is_empty() {
            return Err(Error::invalid("image data is empty"));
        }
        let identifier = image_identifier(blob);
        let pipeline = self.hooks.pipeline(ADD_IMAGE);
        let mut ctx = OperationContext::new(ADD_IMAGE, account).with_image(&identifier);
        pipeline.pre_exec(&mut ctx)?;

        let info = match self.store.load_info(account, &identifier)? {
            Some(existing) => {
                tracing::debug!(account, identifier = %identifier, "Original already stored");
                self.merge_metadata(existing, metadata)?
            }
            None => {
                let identified = self
                    .renderer
                    .backend()
                    .identify(blob)
                    .map_err(|e| Error::invalid(format!("not a supported image: {e}")))?;
                let now = Utc::now();
                let info = ImageInfo {
                    account: account.to_string(),
                    identifier: identifier.clone(),
                    width: identified.dimensions.width,
                    height: identified.dimensions.height,
                    mime: identified.mime().to_string(),
                    checksum: checksum(blob),
                    size: blob.len() as u64,
                    created: now,
                    updated: now,
                    metadata,
                };
                self.store.store_original(account, &identifier, blob)?;
                self.store.store_info(&info)?;
                tracing::info!(
                    account,
                    identifier = %identifier,
                    dimensions = %identified.dimensions,
                    mime = %info.mime,
                    "Stored original"
                );
                info
            }
        };

        pipeline.post_exec(&mut ctx)?;
        Ok(info)
    }

    // =========================================================================
    // getImage
    // =========================================================================

    /// Serve an image with a raw transformation list applied.
    ///
    /// `transformations` must be a JSON array of strings such as
    /// `["resize:width=300", "desaturate"]`; an empty array serves the
    /// original re-encoded at the default quality.
    pub fn get_image(
        &self,
        account: &str,
        identifier: &str,
        transformations: &serde_json::Value,
    ) -> Result<Rendered> {
        let parsed = self.parser.parse_value(transformations)?;
        self.get_image_with(account, identifier, parsed)
    }

    /// [`get_image`](Self::get_image) with an already parsed pipeline.
    pub fn get_image_with(
        &self,
        account: &str,
        identifier: &str,
        transformations: Vec<TransformationDescriptor>,
    ) -> Result<Rendered> {
        let pipeline = self.hooks.pipeline(GET_IMAGE);
        let mut ctx = OperationContext::new(GET_IMAGE, account)
            .with_image(identifier)
            .with_transformations(transformations);
        pipeline.pre_exec(&mut ctx)?;

        if ctx.output().is_none() {
            let rendered = self
                .cache
                .resolve(account, identifier, ctx.transformations())?;
            ctx.set_output(rendered);
        } else {
            tracing::debug!(account, identifier, "Output provided by preExec hook");
        }

        pipeline.post_exec(&mut ctx)?;
        ctx.take_output()
            .ok_or_else(|| Error::Transformation("output removed by a postExec hook".into()))
    }

    // =========================================================================
    // Info and metadata
    // =========================================================================

    /// Stored attributes of an original.
    pub fn image_info(&self, account: &str, identifier: &str) -> Result<ImageInfo> {
        self.store
            .load_info(account, identifier)?
            .ok_or_else(|| Error::not_found(account, identifier))
    }

    /// Merge `changes` into the image's metadata. An empty value removes
    /// the key. Variations are unaffected.
    pub fn update_metadata(
        &self,
        account: &str,
        identifier: &str,
        changes: BTreeMap<String, String>,
    ) -> Result<ImageInfo> {
        let pipeline = self.hooks.pipeline(UPDATE_METADATA);
        let mut ctx = OperationContext::new(UPDATE_METADATA, account).with_image(identifier);
        pipeline.pre_exec(&mut ctx)?;

        let info = self.image_info(account, identifier)?;
        let info = self.merge_metadata(info, changes)?;

        pipeline.post_exec(&mut ctx)?;
        Ok(info)
    }

    fn merge_metadata(
        &self,
        mut info: ImageInfo,
        changes: BTreeMap<String, String>,
    ) -> Result<ImageInfo> {
        if changes.is_empty() {
            return Ok(info);
        }
        for (key, value) in changes {
            if value.is_empty() {
                info.metadata.remove(&key);
            } else {
                info.metadata.insert(key, value);
            }
        }
        info.updated = Utc::now();
        self.store.store_info(&info)?;
        tracing::debug!(
            account = %info.account,
            identifier = %info.identifier,
            keys = info.metadata.len(),
            "Updated metadata"
        );
        Ok(info)
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Delete an original, its info and every cached variation.
    ///
    /// Returns how many variations were removed.
    pub fn delete_image(&self, account: &str, identifier: &str) -> Result<usize> {
        let pipeline = self.hooks.pipeline(DELETE_IMAGE);
        let mut ctx = OperationContext::new(DELETE_IMAGE, account).with_image(identifier);
        pipeline.pre_exec(&mut ctx)?;

        if self.store.load_info(account, identifier)?.is_none() {
            return Err(Error::not_found(account, identifier));
        }
        // Variations first: a failure here leaves the original servable
        let variations = self.cache.invalidate(account, identifier, None)?.deleted();
        self.store.delete_original(account, identifier)?;
        tracing::info!(account, identifier, variations, "Deleted image");

        pipeline.post_exec(&mut ctx)?;
        Ok(variations)
    }

    /// Drop cached variations: one width, or all of them.
    pub fn purge_variations(
        &self,
        account: &str,
        identifier: &str,
        width: Option<u32>,
    ) -> Result<DeleteOutcome> {
        let pipeline = self.hooks.pipeline(PURGE_VARIATIONS);
        let mut ctx = OperationContext::new(PURGE_VARIATIONS, account).with_image(identifier);
        pipeline.pre_exec(&mut ctx)?;

        let outcome = self.cache.invalidate(account, identifier, width)?;

        pipeline.post_exec(&mut ctx)?;
        Ok(outcome)
    }

    // =========================================================================
    // Warming
    // =========================================================================

    /// Render `resize:width=W` for each width in parallel, filling the cache.
    ///
    /// Runs on the global rayon pool and bypasses hooks. Results come back
    /// in the order of `widths`; the first failure is returned.
    pub fn warm(&self, account: &str, identifier: &str, widths: &[u32]) -> Result<Vec<Rendered>> {
        if widths.is_empty() {
            return Err(Error::invalid("warm needs at least one width"));
        }
        // Fail once up front instead of once per width
        self.image_info(account, identifier)?;
        widths
            .par_iter()
            .map(|&width| {
                let step = TransformationDescriptor::new("resize")
                    .with_param("width", ParamValue::Int(i64::from(width)));
                self.cache.resolve(account, identifier, &[step])
            })
            .collect()
    }

    /// The codec backend in use.
    pub fn backend(&self) -> &dyn ImageBackend {
        self.renderer.backend()
    }
}
