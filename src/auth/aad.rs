//! Identity provider endpoint construction.

/// Path on the local callback server that receives authorization codes.
pub const CALLBACK_PATH: &str = "/_callback";

/// OAuth 2.0 endpoints exposed per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Authorize,
    Token,
    DeviceCode,
}

impl Endpoint {
    fn segment(self) -> &'static str {
        match self {
            Endpoint::Authorize => "authorize",
            Endpoint::Token => "token",
            Endpoint::DeviceCode => "devicecode",
        }
    }
}

/// URL of `endpoint` for `tenant` under `authority`.
pub fn endpoint(authority: &str, tenant: &str, endpoint: Endpoint) -> String {
    format!(
        "{}/{}/oauth2/v2.0/{}",
        authority.trim_end_matches('/'),
        tenant,
        endpoint.segment()
    )
}

/// Redirect URL for a callback server bound on `addr`.
pub fn callback_url(addr: &str) -> String {
    format!("http://{}{}", addr, CALLBACK_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(
            endpoint("https://login.microsoftonline.com", "contoso", Endpoint::Token),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
        assert_eq!(
            endpoint("http://127.0.0.1:9000/", "t", Endpoint::DeviceCode),
            "http://127.0.0.1:9000/t/oauth2/v2.0/devicecode"
        );
    }

    #[test]
    fn test_callback_url() {
        assert_eq!(callback_url("127.0.0.1:3100"), "http://127.0.0.1:3100/_callback");
    }
}
