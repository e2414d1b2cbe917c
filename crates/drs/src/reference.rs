//! Parsing of `drs://host[:port]/object-id` references.

use std::net::IpAddr;

use reqwest::Url;

use crate::error::ResolveError;

/// URI scheme of indirect object references.
pub const DRS_SCHEME: &str = "drs";

/// Port used when a reference does not name one.
pub const DEFAULT_DRS_PORT: u16 = 80;

/// A parsed indirect object reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectReference {
    host: String,
    port: u16,
    object_id: String,
    local: bool,
}

impl ObjectReference {
    /// Whether `uri` uses the indirect-object scheme.
    ///
    /// Only the scheme is checked, so `drs:abc` counts and is later rejected
    /// by [`ObjectReference::parse`]. Filesystem paths and ordinary URLs
    /// return `false` and are left alone.
    pub fn is_indirect(uri: &str) -> bool {
        uri.split_once(':')
            .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case(DRS_SCHEME))
    }

    pub fn parse(uri: &str) -> Result<Self, ResolveError> {
        let malformed = |reason: &str| ResolveError::MalformedReference {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        if !Self::is_indirect(uri) {
            return Err(malformed("scheme is not drs"));
        }

        let url = Url::parse(uri).map_err(|e| malformed(&e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(malformed("missing host"));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| malformed("missing host"))?
            .to_string();

        let object_id = url.path().trim_start_matches('/').to_string();
        if object_id.is_empty() {
            return Err(malformed("missing object id"));
        }

        let local = is_loopback_host(&host);

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_DRS_PORT),
            object_id,
            local,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// `localhost` or a loopback address.
    pub fn is_local(&self) -> bool {
        self.local
    }

    /// `http://{host}:{port}/{prefix}/objects/{object_id}`
    pub fn objects_url(&self, api_prefix: &str) -> String {
        format!(
            "{}/objects/{}",
            self.base_url(api_prefix),
            self.object_id
        )
    }

    /// `http://{host}:{port}/{prefix}/stream/{object_id}/{access_id}`
    pub fn stream_url(&self, api_prefix: &str, access_id: &str) -> String {
        format!(
            "{}/stream/{}/{}",
            self.base_url(api_prefix),
            self.object_id,
            access_id
        )
    }

    fn base_url(&self, api_prefix: &str) -> String {
        let prefix = api_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("http://{}:{}", self.host, self.port)
        } else {
            format!("http://{}:{}/{}", self.host, self.port, prefix)
        }
    }
}

/// Hosts of non-special URL schemes come back as opaque strings, so IP
/// literals are re-parsed here.
fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn detects_indirect_scheme() {
        assert!(ObjectReference::is_indirect("drs://localhost:5000/abc"));
        assert!(ObjectReference::is_indirect("DRS://host/abc"));
        assert!(ObjectReference::is_indirect("drs:abc123"));
        assert!(!ObjectReference::is_indirect("drsfile:abc"));
        assert!(!ObjectReference::is_indirect("/data/x.txt"));
        assert!(!ObjectReference::is_indirect("file:///data/x.txt"));
        assert!(!ObjectReference::is_indirect("https://example.org/x"));
    }

    #[test]
    fn parses_host_port_and_id() {
        let r = ObjectReference::parse("drs://localhost:5000/abc123").unwrap();
        assert_eq!(r.host(), "localhost");
        assert_eq!(r.port(), 5000);
        assert_eq!(r.object_id(), "abc123");
        assert!(r.is_local());
    }

    #[test]
    fn missing_port_uses_default() {
        let r = ObjectReference::parse("drs://remote.example.org/abc").unwrap();
        assert_eq!(r.port(), DEFAULT_DRS_PORT);
        assert!(!r.is_local());
    }

    #[test]
    fn loopback_addresses_are_local() {
        assert!(ObjectReference::parse("drs://127.0.0.1:5000/a").unwrap().is_local());
        assert!(ObjectReference::parse("drs://[::1]:5000/a").unwrap().is_local());
        assert!(!ObjectReference::parse("drs://10.0.0.8:5000/a").unwrap().is_local());
    }

    #[test]
    fn rejects_missing_object_id() {
        assert_matches!(
            ObjectReference::parse("drs://localhost:5000/"),
            Err(ResolveError::MalformedReference { .. })
        );
    }

    #[test]
    fn rejects_reference_without_authority() {
        for uri in ["drs:abc123", "drs:/abc123", "drs:///abc123"] {
            assert_matches!(
                ObjectReference::parse(uri),
                Err(ResolveError::MalformedReference { reason, .. }) if reason == "missing host",
                "{uri}"
            );
        }
    }

    #[test]
    fn rejects_bad_port() {
        assert_matches!(
            ObjectReference::parse("drs://localhost:notaport/abc"),
            Err(ResolveError::MalformedReference { .. })
        );
    }

    #[test]
    fn builds_endpoint_urls() {
        let r = ObjectReference::parse("drs://remote.example.org:8080/abc").unwrap();
        assert_eq!(
            r.objects_url("/ga4gh/drs/v1/"),
            "http://remote.example.org:8080/ga4gh/drs/v1/objects/abc"
        );
        assert_eq!(
            r.stream_url("ga4gh/drs/v1", "s3-stream"),
            "http://remote.example.org:8080/ga4gh/drs/v1/stream/abc/s3-stream"
        );
    }
}
