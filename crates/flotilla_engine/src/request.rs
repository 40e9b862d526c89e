use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};

use crate::{BuildError, RequestDescriptor, Target};

pub const HTTP: &str = "http";
pub const HTTPS: &str = "https";

pub fn default_port_for_scheme(scheme: &str) -> Result<u16, BuildError> {
    match scheme {
        HTTP => Ok(80),
        HTTPS => Ok(443),
        other => Err(BuildError::UnknownScheme(other.to_string())),
    }
}

/// The per-dispatch part of a request; [`RequestTemplate::build`] binds it to one target.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    scheme: String,
    port: u16,
    path: String,
    headers: HeaderMap,
}

impl RequestTemplate {
    /// `port` falls back to the scheme's default when absent.
    pub fn new(
        method: &str,
        scheme: &str,
        port: Option<u16>,
        path: &str,
    ) -> Result<Self, BuildError> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| BuildError::InvalidMethod(method.to_string()))?;

        let scheme = scheme.trim().to_ascii_lowercase();
        let default_port = default_port_for_scheme(&scheme)?;

        if !path.starts_with('/') {
            return Err(BuildError::InvalidPath(path.to_string()));
        }

        Ok(Self {
            method,
            scheme,
            port: port.unwrap_or(default_port),
            path: path.to_string(),
            headers: HeaderMap::new(),
        })
    }

    /// Adds a header. Names are case-insensitive; a repeated name replaces the earlier value.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, BuildError> {
        let invalid = |message: String| BuildError::InvalidHeader {
            name: name.to_string(),
            message,
        };
        let header_name =
            HeaderName::from_bytes(name.trim().as_bytes()).map_err(|err| invalid(err.to_string()))?;
        let header_value =
            HeaderValue::from_str(value.trim()).map_err(|err| invalid(err.to_string()))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn headers<'a>(
        self,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, BuildError> {
        headers
            .into_iter()
            .try_fold(self, |template, (name, value)| template.header(name, value))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Port as requested, before any per-target mapping.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn build(&self, target: &Target) -> Result<RequestDescriptor, BuildError> {
        let descriptor = RequestDescriptor {
            method: self.method.clone(),
            scheme: self.scheme.clone(),
            port: target.resolve_port(self.port),
            path: self.path.clone(),
            headers: self.headers.clone(),
            target: target.clone(),
        };

        let url = descriptor.url();
        let uri = url.parse::<Uri>().map_err(|err| BuildError::InvalidUrl {
            url: url.clone(),
            message: err.to_string(),
        })?;
        if uri.host().is_none() {
            return Err(BuildError::InvalidUrl {
                url,
                message: "missing host".to_string(),
            });
        }

        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::{default_port_for_scheme, RequestTemplate};
    use crate::{BuildError, PortMapping, Target};

    #[test]
    fn default_ports_follow_scheme() {
        assert_eq!(default_port_for_scheme("http"), Ok(80));
        assert_eq!(default_port_for_scheme("https"), Ok(443));
        assert_eq!(
            default_port_for_scheme("gopher"),
            Err(BuildError::UnknownScheme("gopher".to_string()))
        );
    }

    #[test]
    fn builds_descriptor_with_mapped_port_and_subtitle() {
        let template = RequestTemplate::new("get", "HTTP", None, "/health?verbose=1").unwrap();
        let target = Target::new("web-0", "10.0.0.7").with_ports(vec![PortMapping {
            port: 80,
            target_port: 8080,
        }]);

        let descriptor = template.build(&target).unwrap();
        assert_eq!(descriptor.port, 8080);
        assert_eq!(descriptor.url(), "http://10.0.0.7:8080/health?verbose=1");
        assert_eq!(descriptor.subtitle(), "GET http://10.0.0.7:8080/health?verbose=1");
        assert_eq!(descriptor.target, target);
    }

    #[test]
    fn headers_are_case_insensitive_and_last_wins() {
        let template = RequestTemplate::new("GET", "http", Some(8080), "/")
            .unwrap()
            .headers([("X-Trace", "one"), ("x-trace", "two"), ("Accept", "text/plain")])
            .unwrap();
        let descriptor = template.build(&Target::new("a", "127.0.0.1")).unwrap();
        assert_eq!(descriptor.headers.len(), 2);
        assert_eq!(descriptor.headers["x-trace"], "two");
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            RequestTemplate::new("GE T", "http", None, "/"),
            Err(BuildError::InvalidMethod(_))
        ));
        assert!(matches!(
            RequestTemplate::new("GET", "http", None, "health"),
            Err(BuildError::InvalidPath(_))
        ));
        assert!(matches!(
            RequestTemplate::new("GET", "http", None, "/").unwrap().header("bad header", "x"),
            Err(BuildError::InvalidHeader { .. })
        ));
        let template = RequestTemplate::new("GET", "http", None, "/").unwrap();
        assert!(matches!(
            template.build(&Target::new("broken", "not a host")),
            Err(BuildError::InvalidUrl { .. })
        ));
    }
}
