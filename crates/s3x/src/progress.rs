//! 📊 progress.rs: "Are we there yet?" Every search, every time, forever.
//!
//! 🚀 A bucket with eleven million objects does not finish quickly. This module
//! draws a spinner and a tiny table on stderr so the human at the keyboard can
//! watch pages go by and decide whether to get coffee.
//!
//! ⚠️ Watching this progress bar will not make it go faster.
//! Neither will refreshing it. We've tried. Science says no.
//!
//! Hidden unless `show_progress` is on. A hidden bar still counts, it just
//! keeps the numbers to itself. 🦆

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};
use indicatif::{ProgressBar, ProgressStyle};

// -- 📏 one mebibyte. not a megabyte, pedants. there's a difference and I will die on this hill.
const MIB: u64 = 1024 * 1024;

/// 🔢 "1000000" → "1,000,000". You're welcome, eyes.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// ⏱️ MM:SS, or HH:MM:SS if you should probably call your mom.
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// 📦 Bytes, in MiB once there are enough of them to matter.
fn format_bytes(bytes: u64) -> String {
    if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// 📡 Throughput over the last few seconds.
struct Rates {
    objects_per_sec: f64,
    mib_per_sec: f64,
}

/// 📊 Pages, objects, bytes, matches, and a sliding 5-second window for rates.
pub(crate) struct ProgressMetrics {
    /// 🏷️ what are we even searching? `bucket (region)` usually
    label: String,
    pages: u64,
    listed: u64,
    fetched: u64,
    matched: u64,
    bytes_scanned: u64,
    progress_bar: ProgressBar,
    /// 🔄 (timestamp, fetched, bytes) samples for rate calculation
    rate_samples: VecDeque<(Instant, u64, u64)>,
    start_time: Instant,
}

impl std::fmt::Debug for ProgressMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("ProgressMetrics")
            .field("label", &self.label)
            .field("pages", &self.pages)
            .field("listed", &self.listed)
            .field("fetched", &self.fetched)
            .field("matched", &self.matched)
            .field("bytes_scanned", &self.bytes_scanned)
            .finish()
    }
}

impl ProgressMetrics {
    pub(crate) fn new(label: String, visible: bool) -> Self {
        let progress_bar = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            progress_bar.set_style(style);
        }

        let start_time = Instant::now();
        let mut rate_samples = VecDeque::new();
        // -- 🔄 seed the window with t=0 so we don't divide by zero like animals
        rate_samples.push_back((start_time, 0u64, 0u64));

        Self {
            label,
            pages: 0,
            listed: 0,
            fetched: 0,
            matched: 0,
            bytes_scanned: 0,
            progress_bar,
            rate_samples,
            start_time,
        }
    }

    /// 🔄 Fold one finished page into the totals and redraw.
    pub(crate) fn record_page(&mut self, listed: usize, fetched: usize, bytes: u64, matched_total: usize) {
        self.pages += 1;
        self.listed += listed as u64;
        self.fetched += fetched as u64;
        self.bytes_scanned += bytes;
        self.matched = matched_total as u64;

        let rates = self.calculate_rates();
        self.render(rates);
        self.progress_bar.tick();
    }

    /// ✅ Leave the last frame on screen. We made it. Or we were told to stop. Same energy.
    pub(crate) fn finish(&self) {
        self.progress_bar.finish();
    }

    fn calculate_rates(&mut self) -> Rates {
        let now = Instant::now();
        let window = Duration::from_secs(5);
        while let Some(&(timestamp, _, _)) = self.rate_samples.front() {
            if now.duration_since(timestamp) > window {
                self.rate_samples.pop_front();
            } else {
                break;
            }
        }
        self.rate_samples
            .push_back((now, self.fetched, self.bytes_scanned));

        if let Some(&(oldest_time, oldest_fetched, oldest_bytes)) = self.rate_samples.front() {
            let elapsed = now.duration_since(oldest_time).as_secs_f64();
            if elapsed > 0.0 {
                let fetched_delta = self.fetched.saturating_sub(oldest_fetched);
                let bytes_delta = self.bytes_scanned.saturating_sub(oldest_bytes);
                return Rates {
                    objects_per_sec: fetched_delta as f64 / elapsed,
                    mib_per_sec: (bytes_delta as f64 / elapsed) / MIB as f64,
                };
            }
        }

        // -- 💤 not enough elapsed time yet. zeros, and composure.
        Rates {
            objects_per_sec: 0.0,
            mib_per_sec: 0.0,
        }
    }

    /// 🎨 Two columns, no borders:
    /// ```text
    /// ⠋ search: logs (eu-west-1)
    ///   <pages> pages          <listed> listed
    ///   <objects/s>            <fetched> fetched
    ///   <MiB/s>                <scanned>
    ///   <elapsed> elapsed      <matched> matched
    /// ```
    fn render(&self, rates: Rates) {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        table.add_row(vec![
            Cell::new(format!("{} pages", format_number(self.pages))).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} listed", format_number(self.listed))).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} Objects/s", format_number(rates.objects_per_sec as u64)))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} fetched", format_number(self.fetched))).set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{:.2} MiB/s", rates.mib_per_sec)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{} scanned", format_bytes(self.bytes_scanned)))
                .set_alignment(CellAlignment::Right),
        ]);
        table.add_row(vec![
            Cell::new(format!("{} elapsed", format_duration(self.start_time.elapsed())))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{} matched", format_number(self.matched))).set_alignment(CellAlignment::Right),
        ]);

        self.progress_bar
            .set_message(format!("search: {}\n{}", self.label, table));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_big_numbers_get_commas() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(11_000_000), "11,000,000");
    }

    #[test]
    fn the_one_where_durations_grow_an_hour_column() {
        assert_eq!(format_duration(Duration::from_secs(65)), "01:05");
        assert_eq!(format_duration(Duration::from_secs(3_661)), "01:01:01");
    }

    #[test]
    fn the_one_where_small_byte_counts_stay_in_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(3 * MIB), "3.00 MiB");
    }

    #[test]
    fn the_one_where_a_hidden_bar_still_keeps_score() {
        let mut metrics = ProgressMetrics::new("logs (us-east-1)".into(), false);
        metrics.record_page(10, 4, 2048, 1);
        metrics.record_page(5, 5, 1024, 3);
        metrics.finish();

        assert_eq!(metrics.pages, 2);
        assert_eq!(metrics.listed, 15);
        assert_eq!(metrics.fetched, 9);
        assert_eq!(metrics.bytes_scanned, 3072);
        assert_eq!(metrics.matched, 3);
    }
}
