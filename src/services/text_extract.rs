use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(b"%PDF")
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to run pdftotext: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("pdftotext exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_pdf(&self, data: &[u8]) -> Result<String, ExtractError>;
}

/// Runs poppler's `pdftotext`, piping the document through stdin.
#[derive(Debug, Clone, Default)]
pub struct PdfToText;

#[async_trait]
impl TextExtractor for PdfToText {
    async fn extract_pdf(&self, data: &[u8]) -> Result<String, ExtractError> {
        let mut child = Command::new("pdftotext")
            .arg("-layout")
            .arg("-")
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Feed stdin from a separate task so a full stdout pipe cannot deadlock the write.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = data.to_vec();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    tracing::debug!(error = %e, "pdftotext closed stdin early");
                }
            })
        });

        let output = child.wait_with_output().await?;
        if let Some(writer) = writer {
            let _ = writer.await;
        }

        if !output.status.success() {
            return Err(ExtractError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pdf_magic() {
        assert!(is_pdf(b"%PDF-1.7\n..."));
        assert!(!is_pdf(b"PK\x03\x04 docx"));
        assert!(!is_pdf(b""));
    }
}
