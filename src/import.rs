/// Extract every decimal integer `>= 2` from a published prime list.
///
/// Blank lines and title lines (`The First ...`) are skipped; anything else
/// is scanned for digit runs, so column layouts and separators don't matter.
/// Runs that overflow `u64` are dropped.
pub fn parse_prime_list(text: &str) -> Vec<u64> {
    let mut values = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("The First") {
            continue;
        }
        values.extend(
            trimmed
                .split(|c: char| !c.is_ascii_digit())
                .filter(|run| !run.is_empty())
                .filter_map(|run| run.parse::<u64>().ok())
                .filter(|&n| n >= 2),
        );
    }
    values
}
