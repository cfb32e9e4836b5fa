use chrono::{DateTime, Utc};

/// Stats from a scout run.
#[derive(Debug, Default)]
pub struct ScoutStats {
    pub started_at: DateTime<Utc>,
    pub topics_completed: u32,
    pub topics_failed: u32,
    pub links_discovered: u32,
    pub items_visited: u32,
    pub skipped_visited: u32,
    pub skipped_unavailable: u32,
    pub skipped_in_catalog: u32,
    pub items_failed: u32,
    pub records_extracted: u32,
    pub chunks_synced: u32,
    pub chunks_spilled: u32,
    pub records_synced: u32,
    pub records_spilled: u32,
}

impl ScoutStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            ..Default::default()
        }
    }
}

impl std::fmt::Display for ScoutStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let elapsed = Utc::now() - self.started_at;
        writeln!(f, "\n=== Channel Scout Run Complete ===")?;
        writeln!(f, "Elapsed:            {}s", elapsed.num_seconds())?;
        writeln!(f, "Topics completed:   {}", self.topics_completed)?;
        writeln!(f, "Topics failed:      {}", self.topics_failed)?;
        writeln!(f, "Video links found:  {}", self.links_discovered)?;
        writeln!(f, "Videos visited:     {}", self.items_visited)?;
        writeln!(f, "Items failed:       {}", self.items_failed)?;
        writeln!(f, "\nSkipped:")?;
        writeln!(f, "  Already visited:  {}", self.skipped_visited)?;
        writeln!(f, "  Unavailable:      {}", self.skipped_unavailable)?;
        writeln!(f, "  Already in table: {}", self.skipped_in_catalog)?;
        writeln!(f, "\nRecords extracted:  {}", self.records_extracted)?;
        writeln!(
            f,
            "Records synced:     {} ({} batches)",
            self.records_synced, self.chunks_synced
        )?;
        if self.chunks_spilled > 0 {
            writeln!(
                f,
                "Records spilled:    {} ({} batches written to failure log)",
                self.records_spilled, self.chunks_spilled
            )?;
        }
        Ok(())
    }
}
