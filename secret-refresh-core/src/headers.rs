use std::collections::BTreeMap;
use std::collections::HashMap;

/// Destination URL the request should be forwarded to.
pub const FORWARD_TO_HEADER: &str = "X-Secret-Forward-To";
/// Name of the registered provider that resolves the secret.
pub const SECRET_PROVIDER_HEADER: &str = "X-Secret-Provider";
/// Identifier handed to the provider.
pub const SECRET_ID_HEADER: &str = "X-Secret-Id";
/// Template describing the header the secret is injected into.
pub const HEADER_TEMPLATE_HEADER: &str = "X-Secret-Header";

/// Configuration headers that are consumed by the proxy and never forwarded.
pub const RESERVED_HEADERS: [&str; 4] = [
    FORWARD_TO_HEADER,
    SECRET_PROVIDER_HEADER,
    SECRET_ID_HEADER,
    HEADER_TEMPLATE_HEADER,
];

pub fn is_reserved_header(name: &str) -> bool {
    RESERVED_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Read-only, case-insensitive view over a set of request headers.
///
/// Values are returned as raw bytes so callers decide how to treat non-UTF-8
/// input. When a header repeats, the first value wins.
pub trait HeaderSource {
    fn header_bytes(&self, name: &str) -> Option<&[u8]>;
}

impl HeaderSource for http::HeaderMap {
    fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        // HeaderMap lookups by &str are already case-insensitive.
        self.get(name).map(|v| v.as_bytes())
    }
}

impl HeaderSource for BTreeMap<String, String> {
    fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_bytes())
    }
}

impl HeaderSource for HashMap<String, String> {
    fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_bytes())
    }
}

impl<T: HeaderSource + ?Sized> HeaderSource for &T {
    fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        (**self).header_bytes(name)
    }
}
