use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub structure_report: PathBuf,
    pub extraction_report: PathBuf,
    pub derivation_report: PathBuf,
    pub apply_log: PathBuf,
    pub full_report: PathBuf,
    pub executive_summary: PathBuf,
    pub manual_review: PathBuf,
    pub backups_dir: PathBuf,
    pub ingest_dir: PathBuf,
}

impl ArtifactPaths {
    pub fn new(reports_dir: &Path) -> Self {
        Self {
            structure_report: reports_dir.join("structure_report.json"),
            extraction_report: reports_dir.join("extraction_report.json"),
            derivation_report: reports_dir.join("derivation_report.json"),
            apply_log: reports_dir.join("apply_log.json"),
            full_report: reports_dir.join("full_report.json"),
            executive_summary: reports_dir.join("executive_summary.md"),
            manual_review: reports_dir.join("manual_review.csv"),
            backups_dir: reports_dir.join("backups"),
            ingest_dir: reports_dir.join("ingest"),
        }
    }

    pub fn all_named(&self) -> Vec<(&'static str, &Path)> {
        vec![
            ("structure_report", self.structure_report.as_path()),
            ("extraction_report", self.extraction_report.as_path()),
            ("derivation_report", self.derivation_report.as_path()),
            ("apply_log", self.apply_log.as_path()),
            ("full_report", self.full_report.as_path()),
            ("executive_summary", self.executive_summary.as_path()),
            ("manual_review", self.manual_review.as_path()),
        ]
    }
}
