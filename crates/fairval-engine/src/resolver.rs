//! Identifier resolution
//!
//! Maps a free-form query to exactly one security in the directory. Matching
//! runs in priority order and stops at the first rule that yields a result:
//!
//! 1. listing code (`005930`, `5930`, `A005930`)
//! 2. exact name, ignoring case, spacing, punctuation and corporate markers
//! 3. unique substring of a name
//!
//! Several hits at the same rule make the query ambiguous.

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use cached::{Cached, TimedCache};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};
use crate::model::{CompanyIdentity, StockCode};

/// Corporate-form markers stripped before comparing names
const CORPORATE_MARKERS: [&str; 3] = ["주식회사", "(주)", "㈜"];

/// One security in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub code: StockCode,
    pub name: String,
    pub sector_code: String,
    pub sector_name: String,
}

/// The universe of known securities.
#[derive(Debug, Clone, Default)]
pub struct SecurityDirectory {
    entries: Vec<DirectoryEntry>,
}

impl SecurityDirectory {
    /// Build a directory; later duplicates of a code are dropped
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        let mut unique: Vec<DirectoryEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if unique.iter().any(|known| known.code == entry.code) {
                debug!("Ignoring duplicate directory entry for {}", entry.code);
                continue;
            }
            unique.push(entry);
        }
        Self { entries: unique }
    }

    /// Parse a JSON array of entries
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<DirectoryEntry> =
            serde_json::from_str(json).map_err(|e| AnalysisError::Directory(e.to_string()))?;
        Ok(Self::new(entries))
    }

    /// Load a JSON array of entries from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AnalysisError::Directory(format!("{}: {e}", path.display())))?;
        let directory = Self::from_json_str(&json)?;
        info!("Loaded {} securities from {}", directory.len(), path.display());
        Ok(directory)
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalize a company name for comparison.
fn normalize_name(name: &str) -> String {
    let mut name = name.to_lowercase();
    for marker in CORPORATE_MARKERS {
        name = name.replace(marker, "");
    }
    name.chars().filter(|ch| ch.is_alphanumeric()).collect()
}

/// Resolves queries against a directory, caching successful lookups.
pub struct IdentifierResolver {
    directory: SecurityDirectory,
    cache: Mutex<TimedCache<String, CompanyIdentity>>,
}

impl IdentifierResolver {
    pub fn new(directory: SecurityDirectory, ttl: Duration) -> Self {
        Self {
            directory,
            cache: Mutex::new(TimedCache::with_lifespan(ttl)),
        }
    }

    pub fn directory(&self) -> &SecurityDirectory {
        &self.directory
    }

    /// Resolve a query to a single security.
    ///
    /// # Errors
    ///
    /// `InvalidQuery` for blank input, `NotFound` when nothing matches and
    /// `AmbiguousQuery` when several securities match at the same rank.
    pub fn resolve(&self, query: &str) -> Result<CompanyIdentity> {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cache_get(query)
            .cloned();
        if let Some(identity) = cached {
            debug!("Resolver cache hit for '{}'", query);
            return Ok(identity);
        }

        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(AnalysisError::InvalidQuery);
        }

        let entry = self.find(trimmed)?;
        let identity = CompanyIdentity {
            query: trimmed.to_string(),
            code: entry.code.clone(),
            name: entry.name.clone(),
            sector_code: entry.sector_code.clone(),
            sector_name: entry.sector_name.clone(),
        };
        info!("Resolved '{}' to {} ({})", trimmed, identity.name, identity.code);

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.flush();
        cache.cache_set(query.to_string(), identity.clone());
        drop(cache);

        Ok(identity)
    }

    /// Number of live cached resolutions
    pub fn cached_len(&self) -> usize {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.flush();
        cache.cache_size()
    }

    fn find(&self, query: &str) -> Result<&DirectoryEntry> {
        let entries = self.directory.entries();

        if let Ok(code) = StockCode::parse(query) {
            if let Some(entry) = entries.iter().find(|entry| entry.code == code) {
                return Ok(entry);
            }
        }

        let wanted = normalize_name(query);
        if wanted.is_empty() {
            return Err(AnalysisError::NotFound {
                query: query.to_string(),
            });
        }

        let exact: Vec<&DirectoryEntry> = entries
            .iter()
            .filter(|entry| normalize_name(&entry.name) == wanted)
            .collect();
        if !exact.is_empty() {
            return Self::single(query, exact);
        }

        let partial: Vec<&DirectoryEntry> = entries
            .iter()
            .filter(|entry| normalize_name(&entry.name).contains(&wanted))
            .collect();
        if partial.is_empty() {
            return Err(AnalysisError::NotFound {
                query: query.to_string(),
            });
        }
        Self::single(query, partial)
    }

    fn single<'a>(query: &str, mut matches: Vec<&'a DirectoryEntry>) -> Result<&'a DirectoryEntry> {
        if matches.len() == 1 {
            return Ok(matches.remove(0));
        }
        Err(AnalysisError::AmbiguousQuery {
            query: query.to_string(),
            candidates: matches.into_iter().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, name: &str, sector_code: &str, sector_name: &str) -> DirectoryEntry {
        DirectoryEntry {
            code: StockCode::parse(code).expect("code"),
            name: name.to_string(),
            sector_code: sector_code.to_string(),
            sector_name: sector_name.to_string(),
        }
    }

    fn resolver() -> IdentifierResolver {
        let directory = SecurityDirectory::new(vec![
            entry("005930", "삼성전자", "013", "전기전자"),
            entry("005935", "삼성전자우", "013", "전기전자"),
            entry("006400", "삼성SDI", "013", "전기전자"),
            entry("000660", "SK하이닉스", "013", "전기전자"),
            entry("035420", "NAVER", "026", "서비스업"),
            entry("035720", "카카오", "026", "서비스업"),
        ]);
        IdentifierResolver::new(directory, Duration::from_secs(60))
    }

    #[test]
    fn test_resolves_code_variants() {
        let resolver = resolver();
        for query in ["005930", "5930", "A005930", " 005930 "] {
            let identity = resolver.resolve(query).expect("resolves");
            assert_eq!(identity.code.as_str(), "005930");
            assert_eq!(identity.sector_name, "전기전자");
        }
    }

    #[test]
    fn test_exact_name_beats_substring() {
        let identity = resolver().resolve("삼성전자").expect("resolves");
        assert_eq!(identity.code.as_str(), "005930");
        assert_eq!(identity.query, "삼성전자");
    }

    #[test]
    fn test_exact_name_ignores_case_and_markers() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("naver").expect("resolves").code.as_str(), "035420");
        assert_eq!(resolver.resolve("sk 하이닉스").expect("resolves").code.as_str(), "000660");
        assert_eq!(resolver.resolve("(주)카카오").expect("resolves").code.as_str(), "035720");
    }

    #[test]
    fn test_unique_substring() {
        let identity = resolver().resolve("하이닉스").expect("resolves");
        assert_eq!(identity.code.as_str(), "000660");
    }

    #[test]
    fn test_ambiguous_substring() {
        let err = resolver().resolve("삼성").expect_err("ambiguous");
        let AnalysisError::AmbiguousQuery { candidates, .. } = err else {
            panic!("expected ambiguous query, got {err:?}");
        };
        let codes: Vec<&str> = candidates.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["005930", "005935", "006400"]);
    }

    #[test]
    fn test_not_found() {
        let resolver = resolver();
        assert!(matches!(
            resolver.resolve("NoSuchCompany123"),
            Err(AnalysisError::NotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve("999999"),
            Err(AnalysisError::NotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve("()"),
            Err(AnalysisError::NotFound { .. })
        ));
    }

    #[test]
    fn test_cached_resolutions_expire() {
        let directory = resolver().directory().clone();
        let resolver = IdentifierResolver::new(directory, Duration::from_millis(10));

        for query in ["005930", "삼성전자", "naver"] {
            resolver.resolve(query).expect("resolves");
        }
        assert!(resolver.resolve("삼성").is_err());
        assert_eq!(resolver.cached_len(), 3);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(resolver.cached_len(), 0);
    }

    #[test]
    fn test_blank_query() {
        assert!(matches!(
            resolver().resolve("   "),
            Err(AnalysisError::InvalidQuery)
        ));
    }

    #[test]
    fn test_duplicate_codes_are_dropped() {
        let directory = SecurityDirectory::new(vec![
            entry("005930", "삼성전자", "013", "전기전자"),
            entry("005930", "Samsung Electronics", "013", "전기전자"),
        ]);
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.entries()[0].name, "삼성전자");
    }

    #[test]
    fn test_directory_from_json() {
        let directory = SecurityDirectory::from_json_str(
            r#"[{"code": "5930", "name": "삼성전자", "sector_code": "013", "sector_name": "전기전자"}]"#,
        )
        .expect("parses");
        assert_eq!(directory.entries()[0].code.as_str(), "005930");

        assert!(matches!(
            SecurityDirectory::from_json_str(r#"[{"code": "abc"}]"#),
            Err(AnalysisError::Directory(_))
        ));
    }

    #[test]
    fn test_load_directory_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("directory.json");
        std::fs::write(
            &path,
            r#"[{"code": "035720", "name": "카카오", "sector_code": "026", "sector_name": "서비스업"}]"#,
        )
        .expect("write");

        let directory = tokio_test::block_on(SecurityDirectory::load(&path)).expect("load");
        assert_eq!(directory.len(), 1);

        let missing = tokio_test::block_on(SecurityDirectory::load(dir.path().join("missing.json")));
        assert!(matches!(missing, Err(AnalysisError::Directory(_))));
    }
}
