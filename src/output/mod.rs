//! Output module for exporting crawl results
//!
//! This module handles:
//! - Rendering stored pages as JSON, Markdown, or plain text
//! - Writing export files
//! - Printing session statistics

mod export;
pub mod stats;

pub use export::{export_path_for, render, write_export};
pub use stats::{format_statistics, print_statistics};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// File format for exported results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "md")]
    Markdown,
    #[serde(rename = "txt")]
    Text,
}

impl ExportFormat {
    /// File extension, which is also the format's config name
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            "txt" | "text" => Ok(Self::Text),
            other => Err(format!(
                "unknown export format '{}' (expected json, md, or txt)",
                other
            )),
        }
    }
}
