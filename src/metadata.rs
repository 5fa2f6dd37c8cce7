//! # Archive-Level Metadata
//!
//! Descriptive global attributes stamped once at archive creation: the CF
//! `Conventions` marker plus the usual provenance set (title, institution,
//! source, references, history). Readers use these to identify where a file
//! came from without any side channel.

use chrono::Utc;

use crate::archive::{self, ArchiveError, ArchiveFile};

/// Value of the CF `Conventions` global attribute.
pub const CONVENTIONS: &str = "CF-1.6";

/// Provenance recorded in the archive's global attributes.
///
/// The defaults identify this crate as the producer; drivers embedding the
/// writer in a larger system should fill in their own context.
#[derive(Debug, Clone)]
pub struct CreationContext {
    /// Short description of the archive contents.
    pub title: String,
    /// Organisation that produced the file.
    pub institution: String,
    /// Software that produced the file.
    pub source: String,
    /// Pointers to documentation of the data.
    pub references: String,
}

impl Default for CreationContext {
    fn default() -> Self {
        Self {
            title: "Grid time series output".to_string(),
            institution: "unknown".to_string(),
            source: format!("gridseries {}", env!("CARGO_PKG_VERSION")),
            references: env!("CARGO_PKG_REPOSITORY").to_string(),
        }
    }
}

impl CreationContext {
    /// Default context with a custom title.
    pub fn titled<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Stamp the global attributes. Must run during the definition phase,
    /// before the schema is committed.
    pub(crate) fn apply(&self, file: &mut ArchiveFile) -> Result<(), ArchiveError> {
        archive::add_global_attribute(file, "Conventions", CONVENTIONS)?;
        archive::add_global_attribute(file, "title", &self.title)?;
        archive::add_global_attribute(file, "institution", &self.institution)?;
        archive::add_global_attribute(file, "source", &self.source)?;
        archive::add_global_attribute(file, "references", &self.references)?;
        archive::add_global_attribute(file, "history", &self.history_line())?;
        Ok(())
    }

    fn history_line(&self) -> String {
        format!(
            "{} created by {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            self.source
        )
    }
}
