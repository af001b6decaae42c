//! Durable, atomic persistence of the aggregate
//!
//! Validation runs before any byte is written; the write itself goes to
//! `<path>.tmp` and is renamed over the target, so a crash at any point
//! leaves the previous output file (if any) untouched and valid. The target
//! is never observable half-written.

use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::error::{ScrapeError, ScrapeResult};
use crate::extractor::page_key;
use crate::store::Aggregate;

/// Check the aggregate against the output schema: every page ordinal is at
/// least 1 and every record carries a non-empty title and an absolute link.
///
/// # Errors
///
/// [`ScrapeError::SchemaViolation`] naming the offending bucket. Called
/// before any write; a corrupt aggregate never reaches disk.
pub fn validate(aggregate: &Aggregate) -> ScrapeResult<()> {
    for (ordinal, records) in aggregate.pages() {
        if ordinal == 0 {
            return Err(ScrapeError::SchemaViolation(
                "page ordinal 0 is not a valid page key".to_string(),
            ));
        }
        let key = page_key(ordinal);

        for (index, record) in records.iter().enumerate() {
            if record.title.trim().is_empty() {
                return Err(ScrapeError::SchemaViolation(format!(
                    "record {index} in {key} has an empty title"
                )));
            }
            if record.link.trim().is_empty() {
                return Err(ScrapeError::SchemaViolation(format!(
                    "record '{}' in {key} is missing its link",
                    record.title
                )));
            }
            if Url::parse(&record.link).is_err() {
                return Err(ScrapeError::SchemaViolation(format!(
                    "record '{}' in {key} has a non-absolute link '{}'",
                    record.title, record.link
                )));
            }
        }
    }
    Ok(())
}

/// The staging path for an atomic write: the target path with `.tmp`
/// appended.
#[must_use]
pub fn stage_path(path: &Path) -> PathBuf {
    let mut staged = OsString::from(path.as_os_str());
    staged.push(".tmp");
    PathBuf::from(staged)
}

/// Write the encoded document to the staging path and flush it to disk.
/// The target stays untouched until [`save`] renames over it.
pub(crate) async fn write_stage(encoded: &str, staged: &Path) -> ScrapeResult<()> {
    let write = async {
        let mut file = fs::File::create(staged).await?;
        file.write_all(encoded.as_bytes()).await?;
        file.sync_all().await?;
        Ok::<(), std::io::Error>(())
    };

    if let Err(source) = write.await {
        // A partial staging file must not linger next to the output.
        let _ = fs::remove_file(staged).await;
        return Err(ScrapeError::Persistence {
            path: staged.to_path_buf(),
            source,
        });
    }

    debug!("Staged {} bytes at {}", encoded.len(), staged.display());
    Ok(())
}

/// Validate the aggregate and write it to `path` as indented UTF-8 JSON,
/// non-ASCII preserved literally, via write-to-temporary-then-rename.
///
/// # Errors
///
/// [`ScrapeError::SchemaViolation`] before any write, or
/// [`ScrapeError::Persistence`] on disk failure. On either, any pre-existing
/// file at `path` is byte-identical to before the call.
pub async fn save(aggregate: &Aggregate, path: &Path) -> ScrapeResult<()> {
    validate(aggregate)?;

    // serde_json writes UTF-8 and leaves non-ASCII characters literal.
    let encoded = serde_json::to_string_pretty(&aggregate.to_json()).map_err(|e| {
        ScrapeError::SchemaViolation(format!("aggregate not encodable as JSON: {e}"))
    })?;

    let staged = stage_path(path);
    write_stage(&encoded, &staged).await?;

    fs::rename(&staged, path)
        .await
        .map_err(|source| ScrapeError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;

    info!(
        "Saved {} records across {} pages to {}",
        aggregate.total_records(),
        aggregate.page_count(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Record;
    use crate::store::{DedupStore, IdentityKey};

    fn store_with(records: &[(u32, &str, &str)]) -> DedupStore {
        let mut store = DedupStore::new(IdentityKey::Link);
        for (ordinal, title, link) in records {
            store.insert(
                *ordinal,
                Record {
                    title: (*title).to_string(),
                    image: None,
                    link: (*link).to_string(),
                },
            );
        }
        store
    }

    #[test]
    fn validate_accepts_well_formed_aggregate() {
        let store = store_with(&[
            (1, "Naruto", "https://site.to/naruto"),
            (2, "Bleach", "https://site.to/bleach"),
        ]);
        assert!(validate(store.aggregate()).is_ok());
    }

    #[test]
    fn validate_rejects_missing_link() {
        let store = store_with(&[(1, "Naruto", "")]);
        let err = validate(store.aggregate()).expect_err("must reject");
        assert!(matches!(err, ScrapeError::SchemaViolation(_)));
        assert!(err.to_string().contains("page-1"));
    }

    #[test]
    fn validate_rejects_relative_link() {
        let store = store_with(&[(1, "Naruto", "/watch/naruto")]);
        assert!(matches!(
            validate(store.aggregate()),
            Err(ScrapeError::SchemaViolation(_))
        ));
    }

    #[test]
    fn stage_path_appends_tmp() {
        assert_eq!(
            stage_path(Path::new("out/anime.json")),
            PathBuf::from("out/anime.json.tmp")
        );
    }

    #[tokio::test]
    async fn save_writes_pretty_json_with_literal_non_ascii() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("anime.json");

        let store = store_with(&[(1, "進撃の巨人", "https://site.to/aot")]);
        save(store.aggregate(), &path).await.expect("save");

        let bytes = std::fs::read(&path).expect("read output");
        let text = String::from_utf8(bytes).expect("utf-8");
        assert!(text.contains("進撃の巨人"), "non-ASCII must stay literal");
        assert!(!text.contains("\\u"), "no unicode escapes expected");
        assert!(!stage_path(&path).exists(), "staging file must be renamed away");

        let parsed: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
        assert_eq!(parsed["page-1"][0]["link"], "https://site.to/aot");
    }

    #[tokio::test]
    async fn crash_before_rename_leaves_previous_output_intact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("anime.json");

        let previous = br#"{"page-1": []}"#;
        std::fs::write(&path, previous).expect("seed previous output");

        // Simulate the crash window: the stage write completes but the
        // process dies before the rename.
        write_stage("{\"page-1\": [{\"broken\": true}]}", &stage_path(&path))
            .await
            .expect("stage write");

        let after = std::fs::read(&path).expect("read output");
        assert_eq!(after, previous, "target must be byte-identical");
    }

    #[tokio::test]
    async fn failed_stage_write_leaves_no_staging_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Parent directory does not exist, so the stage write must fail.
        let path = dir.path().join("missing").join("anime.json");

        let err = write_stage("{}", &stage_path(&path))
            .await
            .expect_err("must fail");
        assert!(matches!(err, ScrapeError::Persistence { .. }));
        assert!(!stage_path(&path).exists(), "no staging file may linger");
    }

    #[tokio::test]
    async fn invalid_aggregate_is_rejected_before_any_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("anime.json");

        let store = store_with(&[(1, "Naruto", "")]);
        let err = save(store.aggregate(), &path).await.expect_err("must fail");
        assert!(matches!(err, ScrapeError::SchemaViolation(_)));
        assert!(!path.exists(), "no output file may appear");
        assert!(!stage_path(&path).exists(), "no staging file may appear");
    }
}
