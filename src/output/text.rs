//! Plain text report for the terminal.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::duplicates::{AnalyzerConfig, CandidateSummary, DuplicateGroup};
use crate::inventory::FileRecord;

/// Human-readable report of duplicate candidate groups.
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
    config: &'a AnalyzerConfig,
}

impl<'a> TextOutput<'a> {
    /// Create a report for `groups` found with `config`.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], config: &'a AnalyzerConfig) -> Self {
        Self { groups, config }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.groups.is_empty() {
            writeln!(
                writer,
                "No duplicate candidates larger than {} (grouped by {}).",
                ByteSize::b(self.config.min_worthwhile_size_bytes),
                self.config.strategy
            )?;
            return Ok(());
        }

        for (idx, group) in self.groups.iter().enumerate() {
            writeln!(
                writer,
                "[{}] {}: {} files, {} total, {} reclaimable",
                idx + 1,
                group.key,
                group.len(),
                ByteSize::b(group.total_bytes()),
                ByteSize::b(group.reclaimable_bytes())
            )?;
            for member in &group.members {
                writeln!(
                    writer,
                    "    {:>12}  {}  ({} bytes, links {}, seen {}){}",
                    member.inode,
                    member.full_path(),
                    member.size_bytes,
                    member.link_count,
                    member.occurrence_count,
                    link_note(member)
                )?;
            }
        }

        let summary = CandidateSummary::from_groups(self.groups);
        writeln!(
            writer,
            "{} candidate groups, {} files, {} reclaimable (grouped by {}, larger than {})",
            summary.group_count,
            summary.member_count,
            summary.reclaimable_display(),
            self.config.strategy,
            ByteSize::b(self.config.min_worthwhile_size_bytes)
        )
    }

    /// Render the report into a string.
    ///
    /// # Errors
    ///
    /// Returns an error if formatting fails.
    pub fn to_string(&self) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn link_note(member: &FileRecord) -> &'static str {
    if member.is_link_anomaly() {
        " [seen more often than linked]"
    } else if member.has_external_links() {
        " [also linked elsewhere]"
    } else {
        ""
    }
}
