//! JSON report output.
//!
//! Files are organized by date, one per feed and edition:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── httpsexamplecomrss_morning.json
//!     └── httpsexamplecomrss_evening.json
//! ```
//!
//! A later run in the same edition overwrites the earlier file.

use crate::error::AppError;
use crate::models::SummaryReport;
use crate::utils::slugify_title;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path a report is written to: `{json_output_dir}/{date}/{slug}_{time_of_day}.json`.
pub fn report_path(report: &SummaryReport, json_output_dir: &str) -> PathBuf {
    let dir = format!("{}/{}", json_output_dir.trim_end_matches('/'), report.local_date);
    PathBuf::from(dir).join(format!(
        "{}_{}.json",
        slugify_title(&report.feed_url),
        report.time_of_day
    ))
}

/// Write a [`SummaryReport`] as pretty JSON, creating the date directory.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, feed_url = %report.feed_url))]
pub async fn write_report(
    report: &SummaryReport,
    json_output_dir: &str,
) -> Result<PathBuf, AppError> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report_path(report, json_output_dir);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(AppError::Io {
                path: dir.display().to_string(),
                source: e,
            });
        }
    }

    fs::write(&path, json).await.map_err(|source| AppError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!(path = %path.display(), "Wrote JSON report");

    Ok(path)
}
