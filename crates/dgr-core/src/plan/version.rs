//! Release and next development versions derived from a current version.

use std::sync::OnceLock;

use regex::{Captures, Regex};

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

fn last_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"((\d+\.)*)(\d+)\D*$").expect("valid regex"))
}

fn major_minor_patch() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\D+)?(\d+\D+)?(\d+\D+)?(\d+)").expect("valid regex"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VersionDeterminer;

impl VersionDeterminer {
    /// `1.2.0-SNAPSHOT` becomes `1.2.0`; a non snapshot version gets its last number bumped.
    pub fn release_version(&self, current_version: &str) -> String {
        match current_version.strip_suffix(SNAPSHOT_SUFFIX) {
            Some(release) => release.to_string(),
            None => update_last_number(current_version),
        }
    }

    /// Bumps the patch (or the last available) number of the release version.
    pub fn next_dev_version(&self, current_version: &str) -> String {
        let release = self.release_version(current_version);
        let Some(caps) = major_minor_patch().captures(&release) else {
            return format!("{release}.1{SNAPSHOT_SUFFIX}");
        };
        let prefix = group(&caps, 1);
        let major = group(&caps, 2);
        let minor = group(&caps, 3);
        let patch = increment(group(&caps, 4));
        format!("{prefix}{major}{minor}{patch}{SNAPSHOT_SUFFIX}")
    }
}

fn update_last_number(version: &str) -> String {
    match last_number().captures(version) {
        Some(caps) => {
            let start = caps.get(0).map_or(0, |m| m.start());
            format!(
                "{}{}{}",
                &version[..start],
                group(&caps, 1),
                increment(group(&caps, 3))
            )
        }
        None => format!("{version}.2"),
    }
}

fn group<'h>(caps: &Captures<'h>, index: usize) -> &'h str {
    caps.get(index).map_or("", |m| m.as_str())
}

fn increment(number: &str) -> String {
    match number.parse::<u64>() {
        Ok(n) => (n + 1).to_string(),
        // too large for u64, keep the digits and append one
        Err(_) => format!("{number}1"),
    }
}
