//! Parsed peer certificate.

use thiserror::Error;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

#[derive(Debug, Error)]
#[error("Invalid peer certificate: {0}")]
pub struct CertificateError(String);

/// The peer's end-entity certificate, parsed once and kept for the
/// lifetime of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCertificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    serial: String,
    not_before: i64,
    not_after: i64,
}

impl PeerCertificate {
    pub fn from_der(der: Vec<u8>) -> Result<Self, CertificateError> {
        let (subject, issuer, serial, not_before, not_after) = {
            let (_, cert) = X509Certificate::from_der(&der)
                .map_err(|e| CertificateError(e.to_string()))?;
            let validity = cert.validity();
            (
                cert.subject().to_string(),
                cert.issuer().to_string(),
                cert.raw_serial_as_string(),
                validity.not_before.timestamp(),
                validity.not_after.timestamp(),
            )
        };

        Ok(Self {
            der,
            subject,
            issuer,
            serial,
            not_before,
            not_after,
        })
    }

    /// Raw DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name, e.g. `CN=localhost`.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Serial number as colon-separated hex.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Start of validity, seconds since the Unix epoch.
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// End of validity, seconds since the Unix epoch.
    pub fn not_after(&self) -> i64 {
        self.not_after
    }
}
