use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use futures::StreamExt;
use tracing::{debug, warn};

use crate::report::{AnalysisMode, SavedReport};

// No trailing slash, cnidarium substore convention.
const REPORT_PREFIX: &str = "report";

fn report_key(id: &str) -> String {
    format!("{}/{}", REPORT_PREFIX, id)
}

/// Persistence for past reports.
#[allow(async_fn_in_trait)]
pub trait ReportRepository {
    /// All saved reports, newest first.
    async fn list(&self) -> Result<Vec<SavedReport>>;

    async fn append(&self, report: &SavedReport) -> Result<()>;

    /// Returns false if no report had that id.
    async fn remove(&self, id: &str) -> Result<bool>;

    async fn get(&self, id: &str) -> Result<Option<SavedReport>> {
        Ok(self.list().await?.into_iter().find(|r| r.id == id))
    }
}

/// Record a successful response and return the stored entry.
pub async fn save_report<R: ReportRepository>(
    repo: &R,
    query: &str,
    mode: AnalysisMode,
    content: &str,
    date: DateTime<Utc>,
) -> Result<SavedReport> {
    let report = SavedReport::new(query, mode, content, date);
    repo.append(&report).await?;
    Ok(report)
}

pub struct ReportHistory {
    storage: Storage,
}

impl ReportHistory {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let storage = Storage::load(data_dir.to_path_buf(), vec![REPORT_PREFIX.to_string()])
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self { storage })
    }
}

impl ReportRepository for ReportHistory {
    async fn list(&self) -> Result<Vec<SavedReport>> {
        let snapshot = self.storage.latest_snapshot();
        let mut stream = snapshot.prefix_raw(REPORT_PREFIX);
        let mut results = Vec::new();

        while let Some(entry) = stream.next().await {
            match entry {
                Ok((key, value)) => match serde_json::from_slice::<SavedReport>(&value) {
                    Ok(report) => results.push(report),
                    Err(e) => warn!(key = %key, "Skipping unreadable report: {}", e),
                },
                Err(e) => {
                    warn!("Error reading report stream: {}", e);
                }
            }
        }

        results.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(results)
    }

    async fn append(&self, report: &SavedReport) -> Result<()> {
        let snapshot = self.storage.latest_snapshot();
        let mut delta = StateDelta::new(snapshot);
        delta.put_raw(
            report_key(&report.id),
            serde_json::to_vec(report).context("serialize SavedReport")?,
        );
        self.storage.commit(delta).await?;
        debug!(report_id = %report.id, title = %report.title, "report stored");
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let snapshot = self.storage.latest_snapshot();
        if snapshot.get_raw(&report_key(id)).await?.is_none() {
            return Ok(false);
        }
        let mut delta = StateDelta::new(snapshot);
        delta.delete(report_key(id));
        self.storage.commit(delta).await?;
        debug!(report_id = id, "report deleted");
        Ok(true)
    }

    async fn get(&self, id: &str) -> Result<Option<SavedReport>> {
        let snapshot = self.storage.latest_snapshot();
        match snapshot.get_raw(&report_key(id)).await? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("deserialize SavedReport")?,
            )),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct MemoryHistory {
        reports: RwLock<Vec<SavedReport>>,
    }

    impl ReportRepository for MemoryHistory {
        async fn list(&self) -> Result<Vec<SavedReport>> {
            let mut all = self.reports.read().await.clone();
            all.sort_by(|a, b| b.date.cmp(&a.date));
            Ok(all)
        }

        async fn append(&self, report: &SavedReport) -> Result<()> {
            let mut reports = self.reports.write().await;
            reports.retain(|r| r.id != report.id);
            reports.push(report.clone());
            Ok(())
        }

        async fn remove(&self, id: &str) -> Result<bool> {
            let mut reports = self.reports.write().await;
            let before = reports.len();
            reports.retain(|r| r.id != id);
            Ok(reports.len() != before)
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_report_key() {
        assert_eq!(report_key("abc"), "report/abc");
    }

    #[tokio::test]
    async fn test_memory_history_newest_first() {
        let repo = MemoryHistory::default();
        save_report(&repo, "NVDA", AnalysisMode::DeepDive, "# NVDA", at(9))
            .await
            .unwrap();
        let latest = save_report(&repo, "", AnalysisMode::News, "## Latest News\n- a", at(12))
            .await
            .unwrap();
        save_report(&repo, "TSLA", AnalysisMode::QuickIntel, "body", at(10))
            .await
            .unwrap();

        let list = repo.list().await.unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].id, latest.id);
        assert_eq!(list[2].query, "NVDA");
        assert_eq!(
            repo.get(&latest.id).await.unwrap().map(|r| r.mode),
            Some(AnalysisMode::News)
        );
    }

    #[tokio::test]
    async fn test_memory_history_remove() {
        let repo = MemoryHistory::default();
        let saved = save_report(&repo, "q", AnalysisMode::DeepDive, "x", at(1))
            .await
            .unwrap();
        assert!(repo.remove(&saved.id).await.unwrap());
        assert!(!repo.remove(&saved.id).await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
        assert_eq!(repo.get(&saved.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_saved_content_reparses_like_live() {
        let raw = ":::ALERT:::Halt|Gap:::END_ALERT:::\n# T\n## A\nbody";
        let repo = MemoryHistory::default();
        let saved = save_report(&repo, "q", AnalysisMode::DeepDive, raw, at(2))
            .await
            .unwrap();
        let reopened = repo.get(&saved.id).await.unwrap().unwrap();
        assert_eq!(crate::report::split(&reopened.content), crate::report::split(raw));
    }

    #[tokio::test]
    async fn test_cnidarium_history_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = ReportHistory::new(dir.path()).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());

        let older = save_report(&repo, "NVDA", AnalysisMode::DeepDive, "# NVDA\n## A\nx", at(8))
            .await
            .unwrap();
        let newer = save_report(&repo, "", AnalysisMode::News, "## Latest News\n- a", at(11))
            .await
            .unwrap();

        let list = repo.list().await.unwrap();
        assert_eq!(
            list.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec![newer.id.as_str(), older.id.as_str()]
        );
        assert_eq!(repo.get(&older.id).await.unwrap(), Some(older.clone()));

        assert!(repo.remove(&older.id).await.unwrap());
        assert!(!repo.remove(&older.id).await.unwrap());
        assert_eq!(repo.get(&older.id).await.unwrap(), None);
        assert_eq!(repo.list().await.unwrap(), vec![newer]);
    }
}
