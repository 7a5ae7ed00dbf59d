//! Provider backed by a local JSON data set
//!
//! Layout under the data root:
//!
//! ```text
//! filings/<code>.json         list of filed statements
//! market/<code>.json          list of daily price points
//! sectors/<sector_code>.json  sector name, date and peer multiples
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use super::{SourceAdapter, SourceKind, SourcePayload, decode_payload};
use crate::error::{SourceError, SourceErrorKind};
use crate::model::CompanyIdentity;

/// Reads one provider kind from a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileSource {
    kind: SourceKind,
    root: PathBuf,
}

impl FileSource {
    pub fn new(kind: SourceKind, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(self.kind.segment())
            .join(format!("{key}.json"))
    }
}

#[async_trait]
impl SourceAdapter for FileSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(
        &self,
        identity: &CompanyIdentity,
        as_of: NaiveDate,
    ) -> Result<SourcePayload, SourceError> {
        let key = self.kind.lookup_key(identity);
        let path = self.path_for(key);
        debug!("Reading {} data from {}", self.kind, path.display());

        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| match (e.kind(), self.kind) {
                (ErrorKind::NotFound, SourceKind::Sector) => SourceError::no_data(
                    self.kind,
                    format!("no peer data for sector '{key}'"),
                ),
                (ErrorKind::NotFound, _) => SourceError::unknown_code(self.kind, key),
                _ => SourceError::new(
                    self.kind,
                    SourceErrorKind::Rejected,
                    format!("{}: {e}", path.display()),
                ),
            })?;

        decode_payload(self.kind, &body, as_of)
    }
}
