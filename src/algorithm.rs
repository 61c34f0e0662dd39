//! Declarative table of external compressors under test.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::io_utils::input_error;
use crate::BenchError;

/// Placeholder replaced by the numeric level in command templates.
pub const LEVEL_PLACEHOLDER: &str = "{level}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelName {
    Low,
    Mid,
    High,
}

impl LevelName {
    pub const ALL: [LevelName; 3] = [LevelName::Low, LevelName::Mid, LevelName::High];

    pub fn as_str(self) -> &'static str {
        match self {
            LevelName::Low => "low",
            LevelName::Mid => "mid",
            LevelName::High => "high",
        }
    }
}

impl fmt::Display for LevelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric level passed to the tool for each named level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Levels {
    pub low: u32,
    pub mid: u32,
    pub high: u32,
}

impl Levels {
    pub fn new(low: u32, mid: u32, high: u32) -> Self {
        Self { low, mid, high }
    }

    pub fn get(&self, name: LevelName) -> u32 {
        match name {
            LevelName::Low => self.low,
            LevelName::Mid => self.mid,
            LevelName::High => self.high,
        }
    }

    /// Levels in low, mid, high order.
    pub fn iter(&self) -> impl Iterator<Item = (LevelName, u32)> + '_ {
        LevelName::ALL.into_iter().map(move |n| (n, self.get(n)))
    }
}

/// One external tool variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmSpec {
    pub name: String,
    /// Command reading raw data on stdin and writing compressed data to stdout.
    pub compress_cmd: String,
    /// Command reading compressed data on stdin and writing raw data to stdout.
    pub decompress_cmd: String,
    pub levels: Levels,
    /// Extension of the compressed scratch file, including the dot.
    pub extension: String,
    #[serde(default)]
    pub is_threaded: bool,
}

impl AlgorithmSpec {
    pub fn new(
        name: &str,
        compress_cmd: &str,
        decompress_cmd: &str,
        levels: Levels,
        extension: &str,
        is_threaded: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            compress_cmd: compress_cmd.to_string(),
            decompress_cmd: decompress_cmd.to_string(),
            levels,
            extension: extension.to_string(),
            is_threaded,
        }
    }

    pub fn compress_argv(&self, level: u32) -> Result<Vec<String>, BenchError> {
        render_command(&self.compress_cmd, level)
    }

    pub fn decompress_argv(&self, level: u32) -> Result<Vec<String>, BenchError> {
        render_command(&self.decompress_cmd, level)
    }
}

/// Substitute `level` into `template` and split the result on whitespace.
pub fn render_command(template: &str, level: u32) -> Result<Vec<String>, BenchError> {
    let rendered = template.replace(LEVEL_PLACEHOLDER, &level.to_string());
    let argv: Vec<String> = rendered.split_whitespace().map(str::to_string).collect();
    if argv.is_empty() {
        return Err(BenchError::Config(format!(
            "command template '{template}' is empty"
        )));
    }
    Ok(argv)
}

/// Built-in table: five single-threaded tools followed by three
/// multi-threaded ones.
pub fn default_algorithms() -> Vec<AlgorithmSpec> {
    vec![
        AlgorithmSpec::new("gzip", "gzip -c -{level}", "gzip -dc", Levels::new(1, 5, 9), ".gz", false),
        AlgorithmSpec::new("brotli", "brotli -c -q {level}", "brotli -dc", Levels::new(1, 6, 11), ".br", false),
        AlgorithmSpec::new("xz", "xz -c -{level}", "xz -dc", Levels::new(1, 6, 9), ".xz", false),
        AlgorithmSpec::new("lz4", "lz4 -c -{level}", "lz4 -dc", Levels::new(1, 6, 9), ".lz4", false),
        AlgorithmSpec::new(
            "zstd_single_threaded",
            "zstd -c -{level}",
            "zstd -dc",
            Levels::new(1, 10, 19),
            ".zst",
            false,
        ),
        // -T0 uses every available core
        AlgorithmSpec::new(
            "zstd_multithreaded",
            "zstd -c -{level} -T0",
            "zstd -dc -T0",
            Levels::new(1, 10, 19),
            ".zst",
            true,
        ),
        AlgorithmSpec::new("pigz", "pigz -c -{level}", "pigz -dc", Levels::new(1, 6, 9), ".gz", true),
        AlgorithmSpec::new("pbzip2", "pbzip2 -c -{level}", "pbzip2 -dc", Levels::new(1, 6, 9), ".bz2", true),
    ]
}

/// Load an algorithm table from a JSON array and validate it.
pub fn load_algorithms<P: AsRef<Path>>(path: P) -> Result<Vec<AlgorithmSpec>, BenchError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| input_error("reading algorithm table", path, e))?;
    let specs: Vec<AlgorithmSpec> = serde_json::from_slice(&data)?;
    validate_algorithms(&specs)?;
    Ok(specs)
}

/// Whether `name` can be used as part of a scratch file name: ASCII
/// letters, digits, `_`, `-` and `.`, not starting with a dot.
pub fn is_safe_file_component(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Reject names and extensions that would place scratch files outside the
/// scratch directory.
pub fn check_scratch_names(spec: &AlgorithmSpec) -> Result<(), BenchError> {
    if !is_safe_file_component(&spec.name) {
        return Err(BenchError::Config(format!(
            "algorithm name '{}' may only contain letters, digits, '_', '-' and '.' and must not start with '.'",
            spec.name
        )));
    }
    let ext_ok = match spec.extension.strip_prefix('.') {
        Some(rest) => rest.is_empty() || is_safe_file_component(rest),
        None => spec.extension.is_empty(),
    };
    if !ext_ok {
        return Err(BenchError::Config(format!(
            "extension '{}' of '{}' must be empty or '.' followed by letters, digits, '_', '-' or '.'",
            spec.extension, spec.name
        )));
    }
    Ok(())
}

/// Names must be unique and usable in file names, and every template must
/// render to a command.
pub fn validate_algorithms(specs: &[AlgorithmSpec]) -> Result<(), BenchError> {
    let mut seen = HashSet::new();
    for spec in specs {
        check_scratch_names(spec)?;
        if !seen.insert(spec.name.as_str()) {
            return Err(BenchError::Config(format!(
                "duplicate algorithm name '{}'",
                spec.name
            )));
        }
        for (_, level) in spec.levels.iter() {
            spec.compress_argv(level)?;
            spec.decompress_argv(level)?;
        }
    }
    Ok(())
}

/// Keep only the algorithms named in `only`, preserving table order.
pub fn select_algorithms(
    specs: Vec<AlgorithmSpec>,
    only: &[String],
) -> Result<Vec<AlgorithmSpec>, BenchError> {
    if only.is_empty() {
        return Ok(specs);
    }
    if let Some(unknown) = only.iter().find(|n| !specs.iter().any(|s| &s.name == *n)) {
        return Err(BenchError::Config(format!("unknown algorithm '{unknown}'")));
    }
    Ok(specs
        .into_iter()
        .filter(|s| only.iter().any(|n| n == &s.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_level_into_argv() {
        let argv = render_command("brotli -c -q {level}", 11).unwrap();
        assert_eq!(argv, ["brotli", "-c", "-q", "11"]);
        let argv = render_command("zstd -c -{level} -T0", 19).unwrap();
        assert_eq!(argv, ["zstd", "-c", "-19", "-T0"]);
    }

    #[test]
    fn empty_template_is_config_error() {
        assert!(matches!(render_command("  ", 1), Err(BenchError::Config(_))));
    }

    #[test]
    fn default_table_is_valid_and_ordered() {
        let table = default_algorithms();
        validate_algorithms(&table).unwrap();
        assert_eq!(table.len(), 8);
        assert!(table[..5].iter().all(|a| !a.is_threaded));
        assert!(table[5..].iter().all(|a| a.is_threaded));
    }

    #[test]
    fn levels_iterate_low_mid_high() {
        let order: Vec<_> = Levels::new(1, 5, 9).iter().collect();
        assert_eq!(
            order,
            [(LevelName::Low, 1), (LevelName::Mid, 5), (LevelName::High, 9)]
        );
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut table = default_algorithms();
        table.push(table[0].clone());
        assert!(validate_algorithms(&table).is_err());
    }

    #[test]
    fn names_that_leave_the_scratch_dir_are_rejected() {
        let base = default_algorithms().remove(0);
        for name in ["../escape", "a/b", "a\\b", ".hidden", "..", "", "with space"] {
            let spec = AlgorithmSpec { name: name.into(), ..base.clone() };
            assert!(
                matches!(validate_algorithms(&[spec]), Err(BenchError::Config(_))),
                "accepted {name:?}"
            );
        }
        for ext in ["/../x", "gz", ".a/b", ".."] {
            let spec = AlgorithmSpec { extension: ext.into(), ..base.clone() };
            assert!(validate_algorithms(&[spec]).is_err(), "accepted extension {ext:?}");
        }
        let spec = AlgorithmSpec {
            name: "zstd-1.5_mt".into(),
            extension: ".tar.zst".into(),
            ..base
        };
        validate_algorithms(&[spec]).unwrap();
    }

    #[test]
    fn table_parses_from_json() {
        let json = r#"[{"name":"identity","compress_cmd":"cat","decompress_cmd":"cat",
            "levels":{"low":1,"mid":2,"high":3},"extension":".raw"}]"#;
        let specs: Vec<AlgorithmSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(specs[0].name, "identity");
        assert!(!specs[0].is_threaded);
        assert_eq!(specs[0].levels.get(LevelName::Mid), 2);
    }

    #[test]
    fn select_keeps_order_and_rejects_unknown() {
        let picked =
            select_algorithms(default_algorithms(), &["pigz".into(), "gzip".into()]).unwrap();
        let names: Vec<_> = picked.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["gzip", "pigz"]);
        assert!(select_algorithms(default_algorithms(), &["nope".into()]).is_err());
    }
}
