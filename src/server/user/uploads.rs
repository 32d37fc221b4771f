use std::sync::Arc;

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;

use crate::error::Result as StoreResult;
use crate::ingest::read_csv;
use crate::scope::ScopedBusiness;
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::store::Store;
use crate::types::RawRow;

const FILE_FIELD: &str = "file";

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError {
        status: err.status(),
        message: format!("Failed to read upload: {}", err.body_text()),
    }
}

/// Pulls the `file` field out of a multipart upload.
pub async fn read_file_field(multipart: &mut Multipart, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        if data.len() > max_bytes {
            return Err(ApiError::payload_too_large(format!(
                "File size ({} bytes) exceeds maximum allowed size ({max_bytes} bytes)",
                data.len()
            )));
        }
        return Ok(data.to_vec());
    }

    Err(ApiError::bad_request("CSV file required"))
}

/// Decodes the CSV and feeds the rows to `import` on a blocking thread.
pub async fn run_import<T, F>(
    state: &Arc<AppState>,
    scope: ScopedBusiness,
    bytes: Vec<u8>,
    import: F,
) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn Store, &ScopedBusiness, Vec<RawRow>) -> StoreResult<T> + Send + 'static,
{
    let store = Arc::clone(&state.store);

    let outcome = tokio::task::spawn_blocking(move || {
        let rows = read_csv(&bytes)?;
        import(store.as_ref(), &scope, rows)
    })
    .await
    .map_err(|e| {
        tracing::error!("import task failed: {e}");
        ApiError::internal("Import failed")
    })?;

    outcome.map_err(ApiError::from)
}
