use std::time::Instant;

pub struct ProgressIndicator {
    total: usize,
    completed: usize,
    failed: usize,
    files_written: usize,
    files_unchanged: usize,
    files_rejected: usize,
    low_confidence: usize,
    start_time: Instant,
}

impl ProgressIndicator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            files_written: 0,
            files_unchanged: 0,
            files_rejected: 0,
            low_confidence: 0,
            start_time: Instant::now(),
        }
    }

    /// `index` is the item's zero-based position; items start before any completes.
    pub fn start_item(&self, name: &str, index: usize) {
        println!("{}", self.item_line(name, index));
    }

    fn item_line(&self, name: &str, index: usize) -> String {
        format!("Processing: {} ({}/{})", name, index + 1, self.total)
    }

    pub fn complete_item(&mut self, _name: &str, success: bool) {
        if success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn file_written(&mut self) {
        self.files_written += 1;
    }

    pub fn file_unchanged(&mut self) {
        self.files_unchanged += 1;
    }

    pub fn file_rejected(&mut self) {
        self.files_rejected += 1;
    }

    pub fn low_confidence(&mut self) {
        self.low_confidence += 1;
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn finish(&self) {
        let elapsed = self.start_time.elapsed();
        println!("\n{}", "=".repeat(60));
        println!("Summary:");
        println!("  Responses:      {}", self.total);
        println!("  Succeeded:      {}", self.completed);
        println!("  Failed:         {}", self.failed);
        println!("  Files written:  {}", self.files_written);
        println!("  Unchanged:      {}", self.files_unchanged);
        println!("  Rejected:       {}", self.files_rejected);
        println!("  Low confidence: {}", self.low_confidence);
        println!("  Duration:       {:.2}s", elapsed.as_secs_f64());
        println!("{}", "=".repeat(60));
    }
}
