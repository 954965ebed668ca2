/// Formats an openFDA `effective_time` (`YYYYMMDD`) as `YYYY-MM-DD`.
///
/// Returns `None` for anything that is not eight ASCII digits with a plausible
/// month and day.
pub(crate) fn format_yyyymmdd(value: &str) -> Option<String> {
    let v = value.trim();
    if v.len() != 8 || !v.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let month: u32 = v[4..6].parse().ok()?;
    let day: u32 = v[6..8].parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    Some(format!("{}-{}-{}", &v[0..4], &v[4..6], &v[6..8]))
}
