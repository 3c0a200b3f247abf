//! Low-level streaming download mechanics

use super::validation::validate_response;
use crate::client::{transport_error, NetClient};
use futures::StreamExt;
use kratos_errors::{Error, StorageError};
use kratos_events::ProgressSink;
use kratos_hash::HashAccumulator;
use kratos_types::DownloadTarget;
use reqwest::header::HeaderMap;
use tokio::fs::{self as tokio_fs, File};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Create the parent directory and open (truncate) the destination
async fn prepare_destination(target: &DownloadTarget) -> Result<BufWriter<File>, Error> {
    if let Some(parent) = target.parent_dir() {
        tokio_fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::directory_create(&e, parent))?;
    }

    let dest = target.destination();
    let file = File::create(dest)
        .await
        .map_err(|e| StorageError::write(&e, dest))?;
    Ok(BufWriter::new(file))
}

/// Stream the body of one GET to the destination, returning the byte count
///
/// Each chunk is written, counted, hashed and only then announced as
/// progress, so observers never see bytes the digest has not consumed.
pub(super) async fn stream_to_file(
    client: &NetClient,
    target: &DownloadTarget,
    sink: Option<&ProgressSink>,
    mut hasher: Option<&mut HashAccumulator>,
    headers: &HeaderMap,
) -> Result<u64, Error> {
    let dest = target.destination();
    let mut writer = prepare_destination(target).await?;

    let response = client.get(target.source(), headers).await?;
    validate_response(&response)?;

    if let Some(sink) = sink {
        sink.set_expected_size(response.content_length());
    }

    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| transport_error(&e, target.source()))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| StorageError::write(&e, dest))?;

        let len = chunk.len() as u64;
        written += len;

        if let Some(sink) = sink {
            sink.transfer_bytes(len);
        }
        if let Some(hasher) = hasher.as_deref_mut() {
            hasher.update(&chunk);
        }
        if let Some(sink) = sink {
            sink.emit_progress(chunk);
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| StorageError::write(&e, dest))?;

    Ok(written)
}
