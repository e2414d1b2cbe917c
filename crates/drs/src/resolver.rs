//! Rewrites the `input` workflow parameter from an indirect reference to
//! an engine-consumable location.
//!
//! Selection policy:
//! - reference host is local: first access method, its direct URL verbatim;
//! - otherwise: second access method, turned into a streaming URL on the
//!   metadata service using its `access_id`.

use std::sync::Arc;

use wes_core::request::INPUT_PARAM_KEY;

use crate::api::{DrsObject, ObjectMetadataSource};
use crate::error::ResolveError;
use crate::reference::ObjectReference;

/// Index of the access method used for local references.
const LOCAL_ACCESS_INDEX: usize = 0;

/// Index of the access method used for remote references.
const REMOTE_ACCESS_INDEX: usize = 1;

pub struct InputResolver {
    source: Arc<dyn ObjectMetadataSource>,
    api_prefix: String,
}

impl InputResolver {
    pub fn new(source: Arc<dyn ObjectMetadataSource>, api_prefix: impl Into<String>) -> Self {
        Self {
            source,
            api_prefix: api_prefix.into(),
        }
    }

    /// Return `params` with `input` resolved. Everything else, and params
    /// without an indirect `input`, pass through unchanged.
    pub async fn resolve_params(
        &self,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ResolveError> {
        let Some(input) = params.get(INPUT_PARAM_KEY).and_then(serde_json::Value::as_str) else {
            return Ok(params.clone());
        };

        if !ObjectReference::is_indirect(input) {
            return Ok(params.clone());
        }

        let resolved = self.resolve_reference(input).await?;

        let mut params = params.clone();
        if let Some(obj) = params.as_object_mut() {
            obj.insert(INPUT_PARAM_KEY.to_string(), serde_json::Value::String(resolved));
        }
        Ok(params)
    }

    /// Resolve a single `drs://` reference to a concrete URL.
    pub async fn resolve_reference(&self, uri: &str) -> Result<String, ResolveError> {
        let reference = ObjectReference::parse(uri)?;
        let objects_url = reference.objects_url(&self.api_prefix);
        let object = self.source.fetch_object(&objects_url).await?;

        let resolved = if reference.is_local() {
            Self::direct_url(&reference, &object)?
        } else {
            self.stream_url(&reference, &object)?
        };

        tracing::info!(
            reference = %uri,
            resolved = %resolved,
            local = reference.is_local(),
            "Resolved input reference",
        );

        Ok(resolved)
    }

    // ---- private helpers ----

    fn direct_url(reference: &ObjectReference, object: &DrsObject) -> Result<String, ResolveError> {
        let method = object
            .access_methods
            .get(LOCAL_ACCESS_INDEX)
            .ok_or_else(|| ResolveError::MissingAccessMethod {
                object_id: reference.object_id().to_string(),
                index: LOCAL_ACCESS_INDEX,
            })?;

        method
            .access_url
            .as_ref()
            .map(|u| u.url.clone())
            .ok_or_else(|| ResolveError::IncompleteAccessMethod {
                object_id: reference.object_id().to_string(),
                index: LOCAL_ACCESS_INDEX,
                field: "access_url",
            })
    }

    fn stream_url(
        &self,
        reference: &ObjectReference,
        object: &DrsObject,
    ) -> Result<String, ResolveError> {
        let method = object
            .access_methods
            .get(REMOTE_ACCESS_INDEX)
            .ok_or_else(|| ResolveError::MissingAccessMethod {
                object_id: reference.object_id().to_string(),
                index: REMOTE_ACCESS_INDEX,
            })?;

        let access_id =
            method
                .access_id
                .as_deref()
                .ok_or_else(|| ResolveError::IncompleteAccessMethod {
                    object_id: reference.object_id().to_string(),
                    index: REMOTE_ACCESS_INDEX,
                    field: "access_id",
                })?;

        Ok(reference.stream_url(&self.api_prefix, access_id))
    }
}
