use ferrous_sieve_domain::{DomainError, Filter, FilterLocator};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Size of the scratch buffer callers usually hand to a refresh.
pub const DEFAULT_RULE_BUF_SIZE: usize = 64 * 1024;

pub enum FetchOutcome {
    Fresh(Vec<u8>),
    /// The fetch failed and the copy cached by an earlier fetch was read
    /// instead.
    Cached {
        content: Vec<u8>,
        error: DomainError,
    },
}

pub fn cache_path(filter: &Filter, cache_dir: &Path) -> PathBuf {
    cache_dir.join(filter.cache_file_name())
}

/// Fetches the rule text of `filter`, bounded by `deadline` and `max_size`.
///
/// A successful fetch replaces the cache copy. A failed HTTP fetch falls back
/// to the cache copy when there is one. A deadline expiry never does.
pub async fn fetch(
    filter: &Filter,
    deadline: Instant,
    buf: &mut [u8],
    client: &reqwest::Client,
    cache_dir: &Path,
    max_size: u64,
) -> Result<FetchOutcome, DomainError> {
    let name = &*filter.name;
    let cache = cache_path(filter, cache_dir);

    let result = tokio::time::timeout_at(
        deadline,
        fetch_locator(&filter.locator, name, buf, client, max_size),
    )
    .await
    .unwrap_or_else(|_| Err(DomainError::FilterFetchTimeout(name.to_string())));

    match result {
        Ok(content) => {
            if let Err(e) = write_cache(&cache, &content).await {
                warn!(filter = %name, path = %cache.display(), error = %e, "Failed to update filter cache");
            }
            Ok(FetchOutcome::Fresh(content))
        }
        Err(error @ DomainError::FilterFetchTimeout(_)) => Err(error),
        Err(error) if filter.locator.is_remote() => match read_cache(&cache, name, buf, max_size).await {
            Ok(Some(content)) => {
                warn!(
                    filter = %name,
                    error = %error,
                    bytes = content.len(),
                    "Filter fetch failed, using cached copy"
                );
                Ok(FetchOutcome::Cached { content, error })
            }
            Ok(None) => Err(error),
            Err(cache_error) => {
                warn!(filter = %name, error = %cache_error, "Failed to read filter cache");
                Err(error)
            }
        },
        Err(error) => Err(error),
    }
}

async fn fetch_locator(
    locator: &FilterLocator,
    name: &str,
    buf: &mut [u8],
    client: &reqwest::Client,
    max_size: u64,
) -> Result<Vec<u8>, DomainError> {
    match locator {
        FilterLocator::File { path } => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| fetch_error(name, format!("open {}: {}", path.display(), e)))?;
            read_limited(file, name, buf, max_size).await
        }
        FilterLocator::Http { url } => fetch_http(url, name, client, max_size).await,
    }
}

async fn fetch_http(
    url: &str,
    name: &str,
    client: &reqwest::Client,
    max_size: u64,
) -> Result<Vec<u8>, DomainError> {
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fetch_error(name, e.to_string()))?;

    if !response.status().is_success() {
        return Err(fetch_error(
            name,
            format!("HTTP {} for {}", response.status().as_u16(), url),
        ));
    }

    if response.content_length().is_some_and(|len| len > max_size) {
        return Err(too_large(name, max_size));
    }

    let mut content = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| fetch_error(name, e.to_string()))?
    {
        if (content.len() + chunk.len()) as u64 > max_size {
            return Err(too_large(name, max_size));
        }
        content.extend_from_slice(&chunk);
    }

    debug!(filter = %name, url = %url, bytes = content.len(), "Fetched filter over HTTP");
    Ok(content)
}

/// Streams `reader` through `buf`, failing once more than `max_size` bytes
/// have been read.
async fn read_limited<R>(
    mut reader: R,
    name: &str,
    buf: &mut [u8],
    max_size: u64,
) -> Result<Vec<u8>, DomainError>
where
    R: AsyncRead + Unpin,
{
    if buf.is_empty() {
        return Err(fetch_error(name, "empty scratch buffer".to_string()));
    }

    let mut content = Vec::new();
    loop {
        let n = reader
            .read(buf)
            .await
            .map_err(|e| fetch_error(name, e.to_string()))?;
        if n == 0 {
            break;
        }
        if (content.len() + n) as u64 > max_size {
            return Err(too_large(name, max_size));
        }
        content.extend_from_slice(&buf[..n]);
    }

    Ok(content)
}

async fn read_cache(
    path: &Path,
    name: &str,
    buf: &mut [u8],
    max_size: u64,
) -> Result<Option<Vec<u8>>, DomainError> {
    match tokio::fs::File::open(path).await {
        Ok(file) => read_limited(file, name, buf, max_size).await.map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(fetch_error(name, format!("open cache: {}", e))),
    }
}

async fn write_cache(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await
}

fn fetch_error(name: &str, reason: String) -> DomainError {
    DomainError::FilterFetch {
        filter: name.to_string(),
        reason,
    }
}

fn too_large(name: &str, limit: u64) -> DomainError {
    DomainError::FilterTooLarge {
        filter: name.to_string(),
        limit,
    }
}
