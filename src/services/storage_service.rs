use async_trait::async_trait;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("storage download failed: {0}")]
    Storage(String),

    #[error("http download failed: {0}")]
    Http(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, DownloadError>;
    async fn http_get(&self, url: &str) -> Result<Bytes, DownloadError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    pub bucket: String,
    pub path: String,
}

const OBJECT_MARKER: &str = "/storage/v1/object/";

/// Splits a stored file reference into bucket and object path. Accepts public, signed and
/// authenticated object URLs as well as bare `bucket/path` references.
pub fn parse_storage_path(reference: &str) -> Result<StoragePath, String> {
    let reference = reference.trim();
    let raw_path = if reference.starts_with("http://") || reference.starts_with("https://") {
        let url = Url::parse(reference).map_err(|e| format!("invalid URL: {}", e))?;
        let full = url.path().to_string();
        let idx = full
            .find(OBJECT_MARKER)
            .ok_or_else(|| "URL is not an object-storage URL".to_string())?;
        let rest = &full[idx + OBJECT_MARKER.len()..];
        rest.strip_prefix("public/")
            .or_else(|| rest.strip_prefix("sign/"))
            .or_else(|| rest.strip_prefix("authenticated/"))
            .unwrap_or(rest)
            .to_string()
    } else {
        reference.trim_start_matches('/').to_string()
    };

    let (bucket, path) = raw_path
        .split_once('/')
        .ok_or_else(|| format!("no bucket/path in '{}'", raw_path))?;
    if bucket.is_empty() || path.trim_matches('/').is_empty() {
        return Err(format!("no bucket/path in '{}'", raw_path));
    }
    Ok(StoragePath {
        bucket: bucket.to_string(),
        path: path.to_string(),
    })
}

/// One way of obtaining the document; tried in order until one succeeds.
pub struct Attempt<'a> {
    pub label: String,
    run: Box<dyn FnOnce() -> BoxFuture<'a, Result<Bytes, DownloadError>> + Send + 'a>,
}

impl<'a> Attempt<'a> {
    pub fn new<F>(label: impl Into<String>, run: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'a, Result<Bytes, DownloadError>> + Send + 'a,
    {
        Self {
            label: label.into(),
            run: Box::new(run),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Bytes,
    pub source: String,
}

/// Runs attempts in order and returns the first success, or every failure in order.
pub async fn first_success(attempts: Vec<Attempt<'_>>) -> Result<Fetched, Vec<String>> {
    let mut failures = Vec::new();
    for attempt in attempts {
        match (attempt.run)().await {
            Ok(bytes) => {
                return Ok(Fetched {
                    bytes,
                    source: attempt.label,
                })
            }
            Err(e) => {
                tracing::debug!(attempt = %attempt.label, error = %e, "Download attempt failed");
                failures.push(format!("{}: {}", attempt.label, e));
            }
        }
    }
    Err(failures)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The reference parsed, but neither storage nor HTTP produced the file.
    Download(Vec<String>),
    /// The reference could not be read as a storage path; only HTTP was possible.
    Parse { detail: String, http: Vec<String> },
}

impl FetchFailure {
    pub fn reason(&self) -> String {
        match self {
            FetchFailure::Download(failures) => {
                format!("download failed ({})", failures.join("; "))
            }
            FetchFailure::Parse { detail, http } if http.is_empty() => {
                format!("file reference could not be parsed ({}) and is not a URL", detail)
            }
            FetchFailure::Parse { detail, http } => format!(
                "file reference could not be parsed ({}); HTTP fallback failed ({})",
                detail,
                http.join("; ")
            ),
        }
    }
}

fn is_http(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Fetches a stored document: the parsed bucket first, then each fallback bucket, then a plain
/// HTTP GET. An unparseable reference goes straight to HTTP.
pub async fn fetch_document(
    storage: &dyn ObjectStorage,
    fallback_buckets: &[String],
    reference: &str,
) -> Result<Fetched, FetchFailure> {
    let reference = reference.trim();
    let mut attempts: Vec<Attempt<'_>> = Vec::new();

    let parsed = parse_storage_path(reference);
    if let Ok(target) = &parsed {
        let mut buckets = vec![target.bucket.clone()];
        buckets.extend(
            fallback_buckets
                .iter()
                .filter(|b| **b != target.bucket)
                .cloned(),
        );
        for bucket in buckets {
            let path = target.path.clone();
            attempts.push(Attempt::new(
                format!("storage {}/{}", bucket, path),
                move || async move { storage.download(&bucket, &path).await }.boxed(),
            ));
        }
    }
    if is_http(reference) {
        attempts.push(Attempt::new("http", move || {
            async move { storage.http_get(reference).await }.boxed()
        }));
    }

    match (first_success(attempts).await, parsed) {
        (Ok(fetched), _) => Ok(fetched),
        (Err(failures), Ok(_)) => Err(FetchFailure::Download(failures)),
        (Err(failures), Err(detail)) => Err(FetchFailure::Parse {
            detail,
            http: failures,
        }),
    }
}

/// Object storage behind a Supabase-style REST API, with plain HTTP for public URLs.
#[derive(Clone)]
pub struct HttpObjectStorage {
    client: Client,
    base_url: Option<String>,
    service_key: Option<String>,
}

impl HttpObjectStorage {
    pub fn new(client: Client, base_url: Option<String>, service_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            service_key,
        }
    }
}

async fn read_body(resp: reqwest::Response) -> Result<Bytes, String> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(format!("status {}: {}", status.as_u16(), body));
    }
    resp.bytes().await.map_err(|e| e.to_string())
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, DownloadError> {
        let (Some(base), Some(key)) = (&self.base_url, &self.service_key) else {
            return Err(DownloadError::Storage(
                "object storage is not configured".to_string(),
            ));
        };

        let resp = self
            .client
            .get(format!("{}{}{}/{}", base, OBJECT_MARKER, bucket, path))
            .bearer_auth(key)
            .header("apikey", key)
            .send()
            .await
            .map_err(|e| DownloadError::Storage(e.to_string()))?;
        read_body(resp).await.map_err(DownloadError::Storage)
    }

    async fn http_get(&self, url: &str) -> Result<Bytes, DownloadError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Http(e.to_string()))?;
        read_body(resp).await.map_err(DownloadError::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn parses_public_and_signed_urls() {
        let public = parse_storage_path(
            "https://x.supabase.co/storage/v1/object/public/resumes/2024/cv.pdf",
        )
        .unwrap();
        assert_eq!(public.bucket, "resumes");
        assert_eq!(public.path, "2024/cv.pdf");

        let signed =
            parse_storage_path("https://x.supabase.co/storage/v1/object/sign/cvs/a.pdf?token=abc")
                .unwrap();
        assert_eq!(signed, StoragePath { bucket: "cvs".into(), path: "a.pdf".into() });

        let bare = parse_storage_path("resumes/42.pdf").unwrap();
        assert_eq!(bare.bucket, "resumes");
    }

    #[test]
    fn rejects_unrecognised_references() {
        assert!(parse_storage_path("https://cdn.example.com/files/cv.pdf").is_err());
        assert!(parse_storage_path("cv.pdf").is_err());
    }

    struct Recording {
        calls: Mutex<Vec<String>>,
        good_bucket: Option<&'static str>,
        http_ok: bool,
    }

    #[async_trait]
    impl ObjectStorage for Recording {
        async fn download(&self, bucket: &str, path: &str) -> Result<Bytes, DownloadError> {
            self.calls.lock().unwrap().push(format!("{}/{}", bucket, path));
            if Some(bucket) == self.good_bucket {
                Ok(Bytes::from_static(b"%PDF-storage"))
            } else {
                Err(DownloadError::Storage("object not found".into()))
            }
        }

        async fn http_get(&self, url: &str) -> Result<Bytes, DownloadError> {
            self.calls.lock().unwrap().push(format!("GET {}", url));
            if self.http_ok {
                Ok(Bytes::from_static(b"%PDF-http"))
            } else {
                Err(DownloadError::Http("status 404".into()))
            }
        }
    }

    #[tokio::test]
    async fn falls_back_through_buckets_in_order() {
        let storage = Recording { calls: Mutex::new(vec![]), good_bucket: Some("cvs"), http_ok: true };
        let fetched = fetch_document(
            &storage,
            &["resumes".into(), "cvs".into()],
            "https://x.supabase.co/storage/v1/object/public/uploads/cv.pdf",
        )
        .await
        .unwrap();

        assert_eq!(fetched.source, "storage cvs/cv.pdf");
        assert_eq!(
            *storage.calls.lock().unwrap(),
            vec!["uploads/cv.pdf", "resumes/cv.pdf", "cvs/cv.pdf"]
        );
    }

    #[tokio::test]
    async fn unparseable_url_goes_straight_to_http() {
        let storage = Recording { calls: Mutex::new(vec![]), good_bucket: None, http_ok: true };
        let url = "https://cdn.example.com/files/cv.pdf";
        let fetched = fetch_document(&storage, &["resumes".into()], url).await.unwrap();

        assert_eq!(fetched.source, "http");
        assert_eq!(&fetched.bytes[..], b"%PDF-http");
        assert_eq!(*storage.calls.lock().unwrap(), vec![format!("GET {}", url)]);
    }

    #[tokio::test]
    async fn failure_reason_distinguishes_parse_from_download() {
        let storage = Recording { calls: Mutex::new(vec![]), good_bucket: None, http_ok: false };

        let download = fetch_document(
            &storage,
            &[],
            "https://x.supabase.co/storage/v1/object/public/resumes/cv.pdf",
        )
        .await
        .unwrap_err();
        assert!(matches!(download, FetchFailure::Download(ref f) if f.len() == 2));
        assert!(download.reason().starts_with("download failed"));

        let parse = fetch_document(&storage, &[], "https://cdn.example.com/cv.pdf")
            .await
            .unwrap_err();
        assert!(parse.reason().starts_with("file reference could not be parsed"));
        assert!(parse.reason().contains("HTTP fallback failed"));
    }
}
