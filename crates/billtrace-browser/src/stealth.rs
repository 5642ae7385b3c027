//! Anti-bot-detection knobs for the Chromium launch, per spec.md §4.1 policy.

use std::process::Command;

const FALLBACK_CHROME_MAJOR: u32 = 124;

/// Detects the installed Chrome/Chromium major version by shelling out to
/// `--version`. Returns `None` if the binary isn't found or the output
/// doesn't parse, in which case callers fall back to automatic detection.
pub fn detect_chrome_major_version() -> Option<u32> {
    for binary in ["google-chrome", "chromium", "chromium-browser"] {
        let Ok(output) = Command::new(binary).arg("--version").output() else {
            continue;
        };
        let text = String::from_utf8_lossy(&output.stdout);
        if let Some(major) = parse_major_version(&text) {
            return Some(major);
        }
    }
    None
}

fn parse_major_version(version_output: &str) -> Option<u32> {
    let digits = version_output
        .split_whitespace()
        .find_map(|token| token.split('.').next().filter(|s| s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty()));
    digits.and_then(|d| d.parse().ok())
}

/// A realistic desktop user-agent string, version-pinned when the installed
/// browser's major version is known.
pub fn user_agent(chrome_major: Option<u32>) -> String {
    let major = chrome_major.unwrap_or(FALLBACK_CHROME_MAJOR);
    format!(
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/{major}.0.0.0 Safari/537.36"
    )
}

/// Command-line arguments passed to the Chromium launch, tier 1 (full
/// stealth set) of the three-tier fallback chain described in spec.md §4.1.
pub fn full_stealth_args() -> Vec<&'static str> {
    vec![
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-blink-features=AutomationControlled",
        "--disable-extensions",
        "--disable-plugins-discovery",
        "--no-first-run",
        "--disable-default-apps",
        "--disable-infobars",
        "--window-size=1920,1080",
    ]
}

/// Tier 3: the minimal-options launch used when even the tier-2 (auto
/// version detection) launch fails.
pub fn minimal_args() -> Vec<&'static str> {
    vec!["--no-sandbox", "--disable-dev-shm-usage"]
}

/// JS evaluated once per page, overriding the properties a naive bot check
/// inspects: `navigator.webdriver`, `navigator.plugins`, `navigator.languages`.
pub const STEALTH_INIT_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
"#;

/// Deterministic per-job debugging port, per spec.md §4.1: collisions across
/// concurrently running jobs are avoided by hashing the job id into a fixed
/// range rather than asking the OS for an ephemeral port (the port must be
/// known before the browser process launches).
pub fn port_for_job(job_id: &str) -> u16 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    job_id.hash(&mut hasher);
    9222 + (hasher.finish() % 1000) as u16
}

/// Does the page's visible text contain a known bot-challenge marker?
pub fn looks_like_bot_challenge(visible_text: &str) -> bool {
    const MARKERS: &[&str] = &[
        "Checking your browser",
        "Just a moment",
        "Attention Required! | Cloudflare",
        "Please verify you are a human",
        "cf-browser-verification",
    ];
    MARKERS.iter().any(|marker| visible_text.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_major_version_from_version_string() {
        assert_eq!(
            parse_major_version("Google Chrome 124.0.6367.91"),
            Some(124)
        );
    }

    #[test]
    fn port_for_job_is_deterministic_and_in_range() {
        let a = port_for_job("bill-HB1483");
        let b = port_for_job("bill-HB1483");
        assert_eq!(a, b);
        assert!((9222..9222 + 1000).contains(&a));
    }

    #[test]
    fn detects_known_challenge_markers() {
        assert!(looks_like_bot_challenge("Checking your browser before access"));
        assert!(!looks_like_bot_challenge("Welcome to the bill status page"));
    }
}
