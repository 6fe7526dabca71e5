//! Outbound TLS configuration and certificate loading.

use std::path::Path;

/// Load a PEM encoded root certificate to trust for outbound connections.
pub fn load_root_certificate(cert_path: &Path) -> Result<reqwest::Certificate, std::io::Error> {
    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }

    let pem = std::fs::read(cert_path)?;
    reqwest::Certificate::from_pem(&pem)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Build the transport client used for calls to the remote.
///
/// Responses are never decompressed here; the forwarding engine handles
/// `Content-Encoding: gzip` itself.
pub fn build_transport(
    cert_path: Option<&Path>,
    insecure: bool,
) -> Result<reqwest::Client, std::io::Error> {
    let mut builder = reqwest::Client::builder();

    if let Some(path) = cert_path {
        let cert = load_root_certificate(path)?;
        tracing::info!(cert_path = ?path, "Trusting additional root certificate");
        builder = builder.add_root_certificate(cert);
    }

    if insecure {
        tracing::warn!("Certificate verification disabled for outbound connections");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}
