use callscope_types::Target;

/// Authority recorded when the channel cannot name its target.
pub const UNKNOWN_AUTHORITY: &str = "unknown_authority";

const SECURE_PORT: &str = "443";

/// Derives host, path, url and scheme from a channel authority and a fully
/// qualified method name.
pub fn describe_target(authority: Option<&str>, full_method_name: &str) -> Target {
    let authority = authority
        .filter(|a| !a.is_empty())
        .unwrap_or(UNKNOWN_AUTHORITY);
    let (host, port) = split_authority(authority);
    let scheme = if port == Some(SECURE_PORT) {
        "https"
    } else {
        "http"
    };
    let path = format!("/{full_method_name}");
    Target {
        host: host.to_owned(),
        url: format!("{scheme}://{authority}{path}"),
        path,
        scheme: scheme.to_owned(),
    }
}

/// Splits `host[:port]`. Bracketed IPv6 literals keep their brackets.
fn split_authority(authority: &str) -> (&str, Option<&str>) {
    if authority.starts_with('[') {
        if let Some(close) = authority.find(']') {
            let host = &authority[..=close];
            let port = authority[close + 1..].strip_prefix(':');
            return (host, port);
        }
    }
    match authority.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    }
}
