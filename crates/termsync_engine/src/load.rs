//! Bulk loading of full concepts.

use crate::error::{Error, Result};
use crate::http::{expect_success, HttpClient, RepositoryClient};
use serde::Serialize;
use termsync_model::{decode_items, Concept};
use tracing::{info, warn};

const ENDPOINT: &str = "Bulk load";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkLoadRequest<'a> {
    concept_ids: &'a [String],
}

/// Loads the browser form of every concept in `ids`, `chunk_size` at a time.
///
/// Concepts are returned chunk by chunk in response order. Any failed chunk
/// aborts the load, as does a body that is not a list of concepts.
pub fn load_concepts<C: HttpClient>(
    client: &RepositoryClient<C>,
    ids: &[String],
    chunk_size: usize,
) -> Result<Vec<Concept>> {
    let mut concepts = Vec::with_capacity(ids.len());

    for chunk in ids.chunks(chunk_size.max(1)) {
        let response = client.post_json(
            client.browser_url("/concepts/bulk-load"),
            &BulkLoadRequest { concept_ids: chunk },
        )?;
        let response = expect_success(ENDPOINT, response)?;
        let loaded: Vec<Concept> = decode_items(&response.body).map_err(|source| Error::Decode {
            endpoint: ENDPOINT.into(),
            source,
        })?;

        let count = loaded.len();
        if count < chunk.len() {
            warn!("Bulk load returned {} of {} requested concepts", count, chunk.len());
        }
        concepts.extend(loaded);
        info!("Loaded {} concepts (total {})", count, concepts.len());
    }

    Ok(concepts)
}
