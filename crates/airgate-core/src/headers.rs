use std::sync::OnceLock;

use http::header::{self, HeaderMap, HeaderName};

/// Connection-scoped headers that a proxy must not relay in either direction
static HOP_BY_HOP: OnceLock<[HeaderName; 8]> = OnceLock::new();

pub fn hop_by_hop() -> &'static [HeaderName] {
    HOP_BY_HOP.get_or_init(|| {
        [
            header::CONNECTION,
            HeaderName::from_static("keep-alive"),
            header::PROXY_AUTHENTICATE,
            header::PROXY_AUTHORIZATION,
            header::TE,
            header::TRAILER,
            header::TRANSFER_ENCODING,
            header::UPGRADE,
        ]
    })
}

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    hop_by_hop().contains(name)
}

/// Headers a caller sent that may be passed to an upstream account
///
/// Drops hop-by-hop headers plus `host` and `content-length`, which the
/// client library re-derives for the new connection. Multi-valued headers
/// keep every value.
pub fn upstream_request_headers(incoming: &HeaderMap) -> HeaderMap {
    filtered(incoming, |name| {
        is_hop_by_hop(name) || name == header::HOST || name == header::CONTENT_LENGTH
    })
}

/// Headers of an upstream response that may be relayed to the caller
///
/// `content-length` is dropped because the body is re-chunked on the way
/// out.
pub fn downstream_response_headers(upstream: &HeaderMap) -> HeaderMap {
    filtered(upstream, |name| is_hop_by_hop(name) || name == header::CONTENT_LENGTH)
}

fn filtered(source: &HeaderMap, drop: impl Fn(&HeaderName) -> bool) -> HeaderMap {
    let mut result = HeaderMap::with_capacity(source.keys_len());

    for (name, value) in source {
        if !drop(name) {
            result.append(name.clone(), value.clone());
        }
    }

    result
}
