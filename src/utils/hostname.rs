use url::Url;

/// Extracts the hostname used as the aggregation key for all stats.
///
/// Anything without a host component (`about:blank`, `file:` urls, malformed
/// input) yields [None]. Callers treat that as "nothing to track", never as an
/// error.
pub fn hostname_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_owned)
}
