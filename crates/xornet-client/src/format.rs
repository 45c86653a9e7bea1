//! Display helpers shared by the dashboard and the headless watcher.

const SECOND_MS: u64 = 1000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// `dd:hh:mm:ss` for an uptime in milliseconds. `None` for zero/unknown.
pub fn format_uptime(ms: Option<u64>) -> Option<String> {
    let ms = ms.filter(|ms| *ms > 0)?;
    Some(format!(
        "{:02}:{:02}:{:02}:{:02}",
        ms / DAY_MS,
        (ms % DAY_MS) / HOUR_MS,
        (ms % HOUR_MS) / MINUTE_MS,
        (ms % MINUTE_MS) / SECOND_MS,
    ))
}

/// Distro icon key for an OS name, matched case-insensitively by
/// substring. First match wins.
pub fn os_image_key(os_name: &str) -> Option<&'static str> {
    const KEYS: &[(&str, &str)] = &[
        ("alpine", "alpine"),
        ("arch", "arch"),
        ("debian", "debian"),
        ("freebsd", "freebsd"),
        ("oracle linux server", "fedora"),
        ("popos", "popos"),
        ("red hat", "redhat"),
        ("kubuntu", "kubuntu"),
        ("ubuntu", "ubuntu"),
        ("openwrt", "openwrt"),
        ("suse", "suse"),
        ("endeavour", "endeavour"),
        ("garuda", "garuda"),
        ("raspbian", "raspbian"),
        ("darwin", "darwin"),
        ("windows", "windows10"),
        ("nixos", "nixos"),
    ];

    let lower = os_name.to_lowercase();
    KEYS.iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, key)| *key)
}

/// Mbps with one decimal.
pub fn format_mbps(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v))
}

/// Percentage with one decimal.
pub fn format_percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}%", v))
}

/// Bytes as GiB with one decimal.
pub fn format_gib(bytes: u64) -> String {
    format!("{:.1} GiB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}
