use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// One person's résumé as read from the input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub person_name: String,
    pub raw_text: String,
}

#[derive(Deserialize)]
struct CsvRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Resume", default)]
    resume: Option<String>,
}

pub struct ResumeReader;

impl ResumeReader {
    pub async fn read_file(path: &Path) -> Result<Vec<ResumeRecord>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match extension {
            "csv" => {
                let content = fs::read_to_string(path)
                    .await
                    .context(format!("Failed to read file: {:?}", path))?;
                Self::parse_csv(&content)
                    .context(format!("Failed to parse résumés from {:?}", path))
            }
            _ => anyhow::bail!("Unsupported file format: {}", extension),
        }
    }

    /// Parse a table with `Name` and `Resume` columns; other columns are ignored.
    pub fn parse_csv(content: &str) -> Result<Vec<ResumeRecord>> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut records = Vec::new();

        for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.with_context(|| format!("Invalid résumé row {}", line + 1))?;
            records.push(ResumeRecord {
                person_name: row.name.trim().to_string(),
                raw_text: row.resume.unwrap_or_default(),
            });
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv() {
        let content = "Category,Name,Resume\n\
                       Data,  Emma Johnson ,\"Data engineer.\nPython, SQL.\"\n\
                       Web,José Pérez,Frontend developer\n";

        let records = ResumeReader::parse_csv(content).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].person_name, "Emma Johnson");
        assert_eq!(records[0].raw_text, "Data engineer.\nPython, SQL.");
        assert_eq!(records[1].person_name, "José Pérez");
    }

    #[test]
    fn test_parse_csv_requires_name_column() {
        let content = "Resume\nSomething\n";
        assert!(ResumeReader::parse_csv(content).is_err());
    }

    #[tokio::test]
    async fn test_read_file_rejects_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resumes.txt");
        tokio::fs::write(&path, "Name,Resume\n").await.unwrap();

        assert!(ResumeReader::read_file(&path).await.is_err());

        let path = dir.path().join("resumes.csv");
        tokio::fs::write(&path, "Name,Resume\nAna Gómez,Chemist\n").await.unwrap();
        let records = ResumeReader::read_file(&path).await.unwrap();
        assert_eq!(records[0].raw_text, "Chemist");
    }
}
