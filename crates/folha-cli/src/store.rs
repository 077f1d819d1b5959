//! Local directory storage for uploaded pages.
//!
//! Pages land under `<root>/<national id digits>/<file name>` next to a JSON
//! sidecar carrying the upload metadata.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use folha_core::error::StorageError;
use folha_core::{DocumentClass, DocumentStore, PayMonth, StorageOutcome, UploadRequest};

/// Metadata written beside each stored page.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar<'a> {
    national_id: &'a str,
    full_name: Option<&'a str>,
    enrollment_number: Option<u64>,
    file_name: &'a str,
    document_class: DocumentClass,
    pay_year: Option<i32>,
    pay_month: Option<PayMonth>,
    size_bytes: usize,
    stored_at: DateTime<Utc>,
}

/// Stores pages in a local directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    overwrite: bool,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overwrite: false,
        }
    }

    /// Replace existing files instead of reporting them as duplicates.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where a request ends up on disk.
    pub fn path_for(&self, request: &UploadRequest) -> PathBuf {
        let file_name: String = request
            .file_name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.root.join(request.national_id_digits()).join(file_name)
    }

    async fn write_sidecar(&self, path: &Path, request: &UploadRequest) -> Result<(), StorageError> {
        let sidecar = Sidecar {
            national_id: &request.national_id,
            full_name: request.full_name.as_deref(),
            enrollment_number: request.enrollment_number,
            file_name: &request.file_name,
            document_class: request.document_class,
            pay_year: request.pay_year,
            pay_month: request.pay_month,
            size_bytes: request.file_bytes.len(),
            stored_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&sidecar).map_err(std::io::Error::other)?;
        fs::write(path.with_extension("json"), json).await?;
        Ok(())
    }
}

impl DocumentStore for DirectoryStore {
    async fn store(&self, request: UploadRequest) -> Result<StorageOutcome, StorageError> {
        let path = self.path_for(&request);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let outcome = if self.overwrite {
            let existed = fs::try_exists(&path).await?;
            fs::write(&path, &request.file_bytes).await?;
            if existed {
                StorageOutcome::Overwrite
            } else {
                StorageOutcome::Success
            }
        } else {
            let created = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match created {
                Ok(mut file) => {
                    file.write_all(&request.file_bytes).await?;
                    file.flush().await?;
                    StorageOutcome::Success
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} already stored", path.display());
                    return Ok(StorageOutcome::Duplicate);
                }
                Err(e) => return Err(e.into()),
            }
        };

        self.write_sidecar(&path, &request).await?;
        debug!("Stored {} ({:?})", path.display(), outcome);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(file_name: &str) -> UploadRequest {
        UploadRequest {
            national_id: "123.456.789-09".to_string(),
            full_name: Some("Joao Da Silva".to_string()),
            enrollment_number: Some(12345),
            file_name: file_name.to_string(),
            document_class: DocumentClass::Payslip,
            pay_year: Some(2023),
            pay_month: PayMonth::new(5),
            file_bytes: b"%PDF-1.5 page".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_store_then_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let name = "123.456.789-09_Joao Da Silva_12345_5_2023.pdf";

        assert_eq!(store.store(request(name)).await.unwrap(), StorageOutcome::Success);
        assert_eq!(store.store(request(name)).await.unwrap(), StorageOutcome::Duplicate);

        let path = dir.path().join("12345678909").join(name);
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5 page");

        let sidecar: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path.with_extension("json")).unwrap()).unwrap();
        assert_eq!(sidecar["documentClass"], "HOLERITE");
        assert_eq!(sidecar["enrollmentNumber"], 12345);
        assert_eq!(sidecar["payMonth"], 5);
        assert!(sidecar.get("fileBytes").is_none());
    }

    #[tokio::test]
    async fn test_overwrite_mode() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path()).with_overwrite(true);
        let name = "123.456.789-09_null_null_null_null.pdf";

        assert_eq!(store.store(request(name)).await.unwrap(), StorageOutcome::Success);
        assert_eq!(store.store(request(name)).await.unwrap(), StorageOutcome::Overwrite);
    }

    #[test]
    fn test_path_separators_are_replaced() {
        let store = DirectoryStore::new("/data");
        let path = store.path_for(&request("123.456.789-09_A/B\\C_null_null_null.pdf"));
        assert_eq!(
            path,
            PathBuf::from("/data/12345678909/123.456.789-09_A_B_C_null_null_null.pdf")
        );
    }
}
