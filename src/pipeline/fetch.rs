//! Streaming artifact download.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::StageCause;
use crate::remote::{BlobFetcher, ByteStream, StageResult};

/// Stream `url` into `destination`.
///
/// Bytes go to `<destination>.part` first and are renamed into place once the
/// stream ends, so `destination` only ever exists complete. On failure the
/// partial file is removed.
pub(super) async fn download_to_file(
    fetcher: &dyn BlobFetcher,
    url: &str,
    destination: &Path,
) -> StageResult<()> {
    let stream = fetcher.stream_download(url).await?;

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| write_error(parent, e))?;
    }

    let part = part_path(destination);
    if let Err(cause) = write_stream(stream, &part).await {
        discard_partial(&part).await;
        return Err(cause);
    }

    if let Err(e) = tokio::fs::rename(&part, destination).await {
        discard_partial(&part).await;
        return Err(write_error(destination, e));
    }

    Ok(())
}

async fn discard_partial(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %part.display(), error = %e, "failed to remove partial download");
    }
}

async fn write_stream(mut stream: ByteStream, path: &Path) -> StageResult<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| write_error(path, e))?;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| StageCause::Transport(format!("download interrupted: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| write_error(path, e))?;
    }

    file.flush().await.map_err(|e| write_error(path, e))
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn write_error(path: &Path, e: std::io::Error) -> StageCause {
    StageCause::Io(format!("{}: {}", path.display(), e))
}
