//! # Report Store
//!
//! The lookup that turns an authorized subject into report rows. The
//! production backend (a relational database owned by the pathology system)
//! lives outside this workspace and plugs in through [`ReportStore`].

use std::path::Path;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::ReportError;
use crate::model::{Report, ReportSummary};

/// Read-only access to pathology reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Reports for `subject`, most recently validated first.
    async fn list_for_subject(&self, subject: &str) -> Result<Vec<ReportSummary>, ReportError>;

    /// One report, only if it belongs to `subject`.
    async fn fetch(&self, subject: &str, document_ref: &str)
        -> Result<Option<Report>, ReportError>;
}

/// A [`ReportStore`] held in memory, optionally seeded from a JSON file.
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    reports: RwLock<Vec<Report>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reports(reports: impl IntoIterator<Item = Report>) -> Self {
        let store = Self::new();
        for report in reports {
            store.insert(report);
        }
        store
    }

    /// Parse a JSON array of reports.
    pub fn from_json_str(json: &str) -> Result<Self, ReportError> {
        let reports: Vec<Report> = serde_json::from_str(json)?;
        Ok(Self::with_reports(reports))
    }

    /// Load a JSON array of reports from `path`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::from_json_str(&raw)?;
        tracing::info!(path = %path.display(), reports = store.len(), "loaded report seed file");
        Ok(store)
    }

    /// Add a report. Subject and document reference are stored trimmed;
    /// a report with the same reference is replaced.
    pub fn insert(&self, mut report: Report) {
        report.subject = report.subject.trim().to_owned();
        report.document_ref = report.document_ref.trim().to_owned();
        let mut reports = self.reports.write();
        reports.retain(|r| r.document_ref != report.document_ref);
        reports.push(report);
    }

    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn list_for_subject(&self, subject: &str) -> Result<Vec<ReportSummary>, ReportError> {
        let subject = subject.trim();
        let mut summaries: Vec<ReportSummary> = self
            .reports
            .read()
            .iter()
            .filter(|r| r.subject == subject)
            .map(Report::summary)
            .collect();
        // Newest first; undated reports sort last.
        summaries.sort_by(|a, b| b.validated_at.cmp(&a.validated_at));
        Ok(summaries)
    }

    async fn fetch(
        &self,
        subject: &str,
        document_ref: &str,
    ) -> Result<Option<Report>, ReportError> {
        let subject = subject.trim();
        let document_ref = document_ref.trim();
        Ok(self
            .reports
            .read()
            .iter()
            .find(|r| r.subject == subject && r.document_ref == document_ref)
            .cloned())
    }
}
