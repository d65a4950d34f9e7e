use url::Url;

/// Parse the value of the destination header into an absolute, forwardable URL.
///
/// The result always has an explicit scheme and host, and a path of at least
/// `/`. Fragments never reach the upstream and are dropped.
pub fn resolve_destination(raw: &str) -> Result<Url, DestinationError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => DestinationError::MissingScheme,
        url::ParseError::EmptyHost => DestinationError::MissingHost,
        other => DestinationError::Parse(other.to_string()),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(DestinationError::UnsupportedScheme(other.to_string())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(DestinationError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Combine a resolved destination with the inbound request path and query.
///
/// Scheme and host come from `destination`. The paths are joined with exactly
/// one `/` between them; queries are concatenated with `&` when both exist.
pub fn forward_url(destination: &Url, inbound_path: &str, inbound_query: Option<&str>) -> Url {
    let mut out = destination.clone();
    out.set_path(&join_paths(destination.path(), inbound_path));

    let base_query = destination.query().filter(|q| !q.is_empty());
    let inbound_query = inbound_query.filter(|q| !q.is_empty());
    let query = match (base_query, inbound_query) {
        (Some(a), Some(b)) => Some(format!("{a}&{b}")),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    };
    out.set_query(query.as_deref());
    out
}

fn join_paths(base: &str, inbound: &str) -> String {
    if inbound.is_empty() {
        return base.to_string();
    }
    match (base.ends_with('/'), inbound.starts_with('/')) {
        (true, true) => format!("{base}{}", &inbound[1..]),
        (false, false) => format!("{base}/{inbound}"),
        _ => format!("{base}{inbound}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DestinationError {
    #[error("destination must be an absolute URL with a scheme (e.g. https://host/path)")]
    MissingScheme,
    #[error("destination must include a host")]
    MissingHost,
    #[error("unsupported destination scheme: {0} (expected http or https)")]
    UnsupportedScheme(String),
    #[error("invalid destination URL: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_paths_uses_single_slash() {
        assert_eq!(join_paths("/v1", "/users"), "/v1/users");
        assert_eq!(join_paths("/v1/", "/users"), "/v1/users");
        assert_eq!(join_paths("/v1", "users"), "/v1/users");
        assert_eq!(join_paths("/", "/users"), "/users");
        assert_eq!(join_paths("/v1", ""), "/v1");
    }
}
