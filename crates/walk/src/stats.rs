use std::time::Instant;

/// Per-session counters held only on the client.
#[derive(Debug)]
pub struct SessionStats {
    pub files_seen: u64,
    pub files_changed: u64,
    pub skipped: u64,
    pub directories: u64,
    pub symlinks: u64,
    pub bytes_sent: u64,
    pub started_at: Instant,
}

impl SessionStats {
    pub fn new() -> Self {
        SessionStats {
            files_seen: 0,
            files_changed: 0,
            skipped: 0,
            directories: 0,
            symlinks: 0,
            bytes_sent: 0,
            started_at: Instant::now(),
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}
