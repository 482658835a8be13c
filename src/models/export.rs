use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::models::{CompanyContext, ExtractionResults};

/// Timestamp format written into the export document
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Timestamp format used in the export file name
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const EXPORT_FILE_PREFIX: &str = "jd_extraction_results_";

/// Snapshot of a finished session offered for download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub enhanced_text: String,
    pub extraction_results: ExportedExtraction,
    pub company_context: CompanyContext,
    /// Local time the bundle was produced, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedExtraction {
    pub base_info: String,
    pub skills: String,
    pub responsibilities: String,
}

impl ExportedExtraction {
    /// Convert complete extraction results; `None` if any field is missing
    pub fn from_results(results: &ExtractionResults) -> Option<Self> {
        Some(Self {
            base_info: results.base_info.clone()?,
            skills: results.skills.clone()?,
            responsibilities: results.responsibilities.clone()?,
        })
    }
}

impl ExportBundle {
    pub fn new<Tz: TimeZone>(
        enhanced_text: String,
        extraction_results: ExportedExtraction,
        company_context: CompanyContext,
        generated_at: &DateTime<Tz>,
    ) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            enhanced_text,
            extraction_results,
            company_context,
            timestamp: generated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Download file name, `jd_extraction_results_<YYYYMMDD_HHMMSS>.json`
    pub fn file_name(&self) -> String {
        let stamp = NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .map(|t| t.format(FILE_STAMP_FORMAT).to_string())
            .unwrap_or_else(|_| Local::now().format(FILE_STAMP_FORMAT).to_string());
        format!("{}{}.json", EXPORT_FILE_PREFIX, stamp)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_bundle() -> ExportBundle {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        ExportBundle::new(
            "Job Title: Senior Backend Engineer".to_string(),
            ExportedExtraction {
                base_info: r#"{"job_title": "Senior Backend Engineer"}"#.to_string(),
                skills: r#"[{"skill_name": "Python"}]"#.to_string(),
                responsibilities: r#"["Design APIs"]"#.to_string(),
            },
            CompanyContext {
                name: "TechCorp Inc.".to_string(),
                ..Default::default()
            },
            &at,
        )
    }

    #[test]
    fn test_timestamp_and_file_name() {
        let bundle = sample_bundle();
        assert_eq!(bundle.timestamp, "2024-03-09 14:05:07");
        assert_eq!(bundle.file_name(), "jd_extraction_results_20240309_140507.json");
    }

    #[test]
    fn test_json_layout_and_round_trip() {
        let bundle = sample_bundle();
        let json = bundle.to_json_pretty().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["enhanced_text"].is_string());
        assert!(value["extraction_results"]["base_info"].is_string());
        assert!(value["extraction_results"]["skills"].is_string());
        assert!(value["extraction_results"]["responsibilities"].is_string());
        assert_eq!(value["company_context"]["name"], "TechCorp Inc.");
        assert_eq!(value["company_context"]["company_size"], "");
        assert_eq!(value["timestamp"], "2024-03-09 14:05:07");

        let parsed: ExportBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.enhanced_text, bundle.enhanced_text);
        assert_eq!(parsed.extraction_results, bundle.extraction_results);
        assert_eq!(parsed.company_context, bundle.company_context);
    }

    #[test]
    fn test_incomplete_results_cannot_be_exported() {
        let results = ExtractionResults {
            base_info: Some("{}".to_string()),
            skills: None,
            responsibilities: Some("[]".to_string()),
        };
        assert!(ExportedExtraction::from_results(&results).is_none());
    }
}
