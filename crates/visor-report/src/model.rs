//! Report rows as exported by the pathology system.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Display format for validation timestamps, e.g. `07/10/2025 14:32`.
pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// One pathology report.
///
/// Narrative fields may still contain RTF escapes and line breaks; see
/// [`crate::format`] for the cleanup applied before display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Biopsy number, unique per report.
    pub document_ref: String,
    /// Patient identifier (RUT).
    pub subject: String,
    pub patient_name: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub physician: String,
    /// When the pathologist validated the report.
    #[serde(default)]
    pub validated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub clinical_history: String,
    #[serde(default)]
    pub macroscopic_exam: String,
    #[serde(default)]
    pub microscopic_exam: String,
    #[serde(default)]
    pub diagnostic_conclusion: String,
    #[serde(default)]
    pub complementary_report: String,
    /// Laboratory techniques performed on the sample, in any order.
    #[serde(default)]
    pub techniques: Vec<String>,
}

impl Report {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            document_ref: self.document_ref.clone(),
            subject: self.subject.clone(),
            patient_name: self.patient_name.clone(),
            service: self.service.clone(),
            physician: self.physician.clone(),
            validated_at: self.validated_at,
        }
    }

    /// The validation timestamp in display form, or an empty string.
    pub fn validated_display(&self) -> String {
        format_date(self.validated_at)
    }
}

/// The listing view of a [`Report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub document_ref: String,
    pub subject: String,
    pub patient_name: String,
    pub service: String,
    pub physician: String,
    pub validated_at: Option<NaiveDateTime>,
}

impl ReportSummary {
    /// The validation timestamp in display form, or an empty string.
    pub fn validated_display(&self) -> String {
        format_date(self.validated_at)
    }
}

fn format_date(at: Option<NaiveDateTime>) -> String {
    at.map(|t| t.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}
