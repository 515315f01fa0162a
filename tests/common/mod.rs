//! Shared utilities for integration testing.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use tempfile::TempDir;
use tls_stream::net::Listener;
use tls_stream::{EngineConfig, VerifyMode};

/// A throwaway CA with one server and one client certificate, written as PEM
/// files into a temporary directory.
pub struct TestPki {
    _dir: TempDir,
    pub ca: PathBuf,
    pub server_cert: PathBuf,
    pub server_key: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

impl TestPki {
    pub fn generate() -> Self {
        let dir = tempfile::tempdir().unwrap();

        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params
            .distinguished_name
            .push(DnType::CommonName, "tls-stream test CA");
        ca_params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca = ca_params.self_signed(&ca_key).unwrap();

        let leaf = |name: &str, usage: ExtendedKeyUsagePurpose| {
            let key = KeyPair::generate().unwrap();
            let mut params = CertificateParams::new(vec![name.to_string()]).unwrap();
            params.distinguished_name.push(DnType::CommonName, name);
            params.extended_key_usages = vec![usage];
            let cert = params.signed_by(&key, &ca, &ca_key).unwrap();
            (cert.pem(), key.serialize_pem())
        };
        let (server_cert, server_key) = leaf("localhost", ExtendedKeyUsagePurpose::ServerAuth);
        let (client_cert, client_key) = leaf("client.test", ExtendedKeyUsagePurpose::ClientAuth);

        let write = |name: &str, pem: &str| {
            let path = dir.path().join(name);
            fs::write(&path, pem).unwrap();
            path
        };

        Self {
            ca: write("ca.pem", &ca.pem()),
            server_cert: write("server.pem", &server_cert),
            server_key: write("server.key", &server_key),
            client_cert: write("client.pem", &client_cert),
            client_key: write("client.key", &client_key),
            _dir: dir,
        }
    }

    pub fn server_config(&self, mode: VerifyMode) -> EngineConfig {
        let mut config = EngineConfig::new();
        config.set_key(&self.server_key).unwrap();
        config.set_cert(&self.server_cert).unwrap();
        config.set_ca(&self.ca).unwrap();
        config.set_verify_mode(mode);
        config
    }

    pub fn client_config(&self, with_cert: bool) -> EngineConfig {
        let mut config = EngineConfig::new();
        config.set_ca(&self.ca).unwrap();
        config.set_verify_mode(VerifyMode::Peer);
        if with_cert {
            config.set_key(&self.client_key).unwrap();
            config.set_cert(&self.client_cert).unwrap();
        }
        config
    }
}

/// Bind a listener on an ephemeral loopback port.
#[allow(dead_code)]
pub async fn listener(config: EngineConfig) -> Listener {
    Listener::bind("127.0.0.1:0", Arc::new(config)).await.unwrap()
}
