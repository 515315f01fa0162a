//! Building rustls configs from an [`EngineConfig`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, ServerConfig, SignatureScheme};

use crate::config::{ConfigError, EngineConfig, VerifyMode};
use crate::engine::EngineError;

pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Build the server-side rustls config.
///
/// Runs [`EngineConfig::check`] first, so an unready config never reaches rustls.
pub fn server_config(config: &EngineConfig) -> Result<Arc<ServerConfig>, EngineError> {
    config.check()?;
    let key_path = config.key().ok_or(ConfigError::NotConfigured("Key"))?;
    let cert_path = config.cert().ok_or(ConfigError::NotConfigured("Cert"))?;

    let provider = crypto_provider();
    let builder = ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let builder = match config.verify_mode() {
        VerifyMode::None => builder.with_no_client_auth(),
        mode => {
            let ca_path = config.ca().ok_or(ConfigError::NotConfigured("CA"))?;
            let verifier =
                WebPkiClientVerifier::builder_with_provider(load_roots(ca_path)?, provider);
            let verifier = if mode == VerifyMode::Peer {
                verifier.allow_unauthenticated()
            } else {
                verifier
            };
            let verifier = verifier
                .build()
                .map_err(|e| EngineError::Setup(format!("client verifier: {e}")))?;
            builder.with_client_cert_verifier(verifier)
        }
    };

    let server = builder.with_single_cert(load_certs(cert_path)?, load_private_key(key_path)?)?;
    Ok(Arc::new(server))
}

/// Build the client-side rustls config.
pub fn client_config(config: &EngineConfig) -> Result<Arc<ClientConfig>, EngineError> {
    config.check_client()?;

    let provider = crypto_provider();
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let builder = match config.verify_mode() {
        VerifyMode::None => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoServerVerification::new(&provider))),
        _ => {
            let ca_path = config.ca().ok_or(ConfigError::NotConfigured("CA"))?;
            builder.with_root_certificates(load_roots(ca_path)?)
        }
    };

    let client = match (config.key(), config.cert()) {
        (Some(key_path), Some(cert_path)) => builder
            .with_client_auth_cert(load_certs(cert_path)?, load_private_key(key_path)?)?,
        _ => builder.with_no_client_auth(),
    };
    Ok(Arc::new(client))
}

pub fn server_name(name: &str) -> Result<ServerName<'static>, EngineError> {
    ServerName::try_from(name.to_string())
        .map_err(|e| EngineError::Setup(format!("invalid server name '{name}': {e}")))
}

fn open(path: &Path) -> Result<BufReader<File>, EngineError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| EngineError::Setup(format!("{}: {e}", path.display())))
}

pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, EngineError> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EngineError::Setup(format!("{}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(EngineError::Setup(format!(
            "no certificates in {}",
            path.display()
        )));
    }
    Ok(certs)
}

pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, EngineError> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|e| EngineError::Setup(format!("{}: {e}", path.display())))?
        .ok_or_else(|| EngineError::Setup(format!("no private key in {}", path.display())))
}

fn load_roots(path: &Path) -> Result<Arc<RootCertStore>, EngineError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots.add(cert)?;
    }
    Ok(Arc::new(roots))
}

/// Accepts any server certificate. Used only for `VerifyMode::None` clients.
#[derive(Debug)]
struct NoServerVerification {
    supported_algs: WebPkiSupportedAlgorithms,
}

impl NoServerVerification {
    fn new(provider: &CryptoProvider) -> Self {
        Self {
            supported_algs: provider.signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for NoServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(message, cert, dss, &self.supported_algs)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(message, cert, dss, &self.supported_algs)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported_algs.supported_schemes()
    }
}
