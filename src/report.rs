//! Top-N summary of a persisted result set.

use std::cmp::Ordering;
use std::fmt::Write;

use crate::aggregate::AggregatedResult;

/// Rows shown per ranking.
pub const TOP_N: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    All,
    SingleThreaded,
    MultiThreaded,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::All, Category::SingleThreaded, Category::MultiThreaded];

    pub fn includes(self, result: &AggregatedResult) -> bool {
        match self {
            Category::All => true,
            Category::SingleThreaded => !result.is_threaded,
            Category::MultiThreaded => result.is_threaded,
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Category::All => "=== Overall Best Results ===",
            Category::SingleThreaded => "=== Best Single Thread Category Results ===",
            Category::MultiThreaded => "=== Best Multi-Thread Category Results ===",
        }
    }

    fn empty_note(self) -> &'static str {
        match self {
            Category::All => "No results found",
            Category::SingleThreaded => "No single-threaded results found",
            Category::MultiThreaded => "No multi-threaded results found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    Compression,
    Speed,
    TradeOff,
}

impl Ranking {
    pub fn score(self, r: &AggregatedResult) -> f64 {
        match self {
            Ranking::Compression => r.compression_score,
            Ranking::Speed => r.speed_score,
            Ranking::TradeOff => r.trade_off_score,
        }
    }
}

/// The best `n` results of `category` by `ranking`, highest first. Equal
/// scores keep their original order.
pub fn top_results<'r>(
    results: &'r [AggregatedResult],
    category: Category,
    ranking: Ranking,
    n: usize,
) -> Vec<&'r AggregatedResult> {
    let mut picked: Vec<&AggregatedResult> =
        results.iter().filter(|r| category.includes(r)).collect();
    picked.sort_by(|a, b| {
        ranking
            .score(b)
            .partial_cmp(&ranking.score(a))
            .unwrap_or(Ordering::Equal)
    });
    picked.truncate(n);
    picked
}

/// Render the three rankings for every category.
pub fn render_report(results: &[AggregatedResult]) -> String {
    let mut out = String::new();
    for category in Category::ALL {
        let _ = writeln!(out, "{}", category.heading());
        if !results.iter().any(|r| category.includes(r)) {
            let _ = writeln!(out, "{}\n", category.empty_note());
            continue;
        }

        let _ = writeln!(out, " Top {TOP_N} Best Compression Ratios:");
        for (i, r) in top_results(results, category, Ranking::Compression, TOP_N).iter().enumerate() {
            let _ = writeln!(out, "    {}. {:.3} ({} - {})", i + 1, r.avg_compression_ratio, r.algorithm, r.level_name);
        }
        let _ = writeln!(out);

        let _ = writeln!(out, " Top {TOP_N} Fastest Compression + Decompression Speeds (seconds):");
        for (i, r) in top_results(results, category, Ranking::Speed, TOP_N).iter().enumerate() {
            let _ = writeln!(out, "    {}. {:.3}s total ({} - {})", i + 1, r.total_time(), r.algorithm, r.level_name);
        }
        let _ = writeln!(out);

        let _ = writeln!(out, " Top {TOP_N} Best Trade-off Scores:");
        for (i, r) in top_results(results, category, Ranking::TradeOff, TOP_N).iter().enumerate() {
            let _ = writeln!(out, "    {}. {:.1}/100 ({} - {})", i + 1, r.trade_off_score, r.algorithm, r.level_name);
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::LevelName;

    fn row(name: &str, threaded: bool, c: f64, s: f64) -> AggregatedResult {
        AggregatedResult {
            algorithm: name.into(),
            is_threaded: threaded,
            level_name: LevelName::Mid,
            level_value: 5,
            iterations: 1,
            original_size: 100,
            avg_compressed_size: 50.0,
            avg_compression_ratio: 0.5,
            avg_compression_time: 1.0,
            avg_decompression_time: 0.5,
            all_sha256_valid: true,
            compression_score: c,
            speed_score: s,
            trade_off_score: (c + s) / 2.0 * 100.0,
        }
    }

    #[test]
    fn ranks_within_category() {
        let rs = vec![
            row("gzip", false, 0.4, 0.9),
            row("xz", false, 1.0, 0.1),
            row("pigz", true, 0.5, 1.0),
            row("pbzip2", true, 0.7, 0.3),
            row("lz4", false, 0.2, 0.95),
        ];
        let names = |v: Vec<&AggregatedResult>| v.iter().map(|r| r.algorithm.clone()).collect::<Vec<_>>();

        assert_eq!(names(top_results(&rs, Category::All, Ranking::Compression, 3)), ["xz", "pbzip2", "pigz"]);
        assert_eq!(names(top_results(&rs, Category::SingleThreaded, Ranking::Speed, 3)), ["lz4", "gzip", "xz"]);
        assert_eq!(names(top_results(&rs, Category::MultiThreaded, Ranking::TradeOff, 3)), ["pigz", "pbzip2"]);
    }

    #[test]
    fn report_notes_missing_category() {
        let text = render_report(&[row("gzip", false, 1.0, 1.0)]);
        assert!(text.contains("=== Overall Best Results ==="));
        assert!(text.contains("1. 0.500 (gzip - mid)"));
        assert!(text.contains("1. 1.500s total (gzip - mid)"));
        assert!(text.contains("1. 100.0/100 (gzip - mid)"));
        assert!(text.contains("No multi-threaded results found"));
    }
}
