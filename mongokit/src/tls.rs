//! Client TLS material.
//!
//! The configuration names three PEM files: the CA bundle, the client
//! certificate and the client key. They are loaded and checked up front so a
//! bad file fails the install with a precise error instead of surfacing later
//! as a handshake failure. The driver reads the client certificate and key
//! from a single file, so the two are joined into a temporary bundle that
//! lives as long as the client.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mongodb::options::{Tls, TlsOptions};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use tempfile::TempPath;
use tracing::debug;

use crate::config::TlsConfig;
use crate::error::{MongoError, MongoResult};

/// Validated TLS material ready to hand to the driver.
#[derive(Debug)]
pub struct TlsMaterial {
    ca_path: PathBuf,
    bundle: TempPath,
}

impl TlsMaterial {
    /// Load and validate the files named by `config`.
    pub fn load(config: &TlsConfig) -> MongoResult<Self> {
        let ca_path = PathBuf::from(&config.ca_cert);
        let cert_path = Path::new(&config.client_cert);
        let key_path = Path::new(&config.client_cert_key);

        let ca_pem = read(&ca_path)?;
        let roots = load_roots(&ca_path, &ca_pem)?;

        let cert_pem = read(cert_path)?;
        let certs = load_certs(cert_path, &cert_pem)?;

        let key_pem = read(key_path)?;
        let key = PrivateKeyDer::from_pem_slice(&key_pem)
            .map_err(|e| MongoError::tls(key_path, e.to_string()))?;

        check_key_pair(roots, certs, key, key_path)?;

        let bundle = write_bundle(&cert_pem, &key_pem)?;
        debug!(ca = %ca_path.display(), "Loaded client TLS material");

        Ok(Self { ca_path, bundle })
    }

    /// CA bundle path.
    pub fn ca_path(&self) -> &Path {
        &self.ca_path
    }

    /// Path of the joined certificate and key file.
    pub fn cert_key_path(&self) -> &Path {
        &self.bundle
    }

    /// Driver TLS options.
    pub fn to_tls(&self) -> Tls {
        Tls::Enabled(
            TlsOptions::builder()
                .ca_file_path(self.ca_path.clone())
                .cert_key_file_path(self.bundle.to_path_buf())
                .build(),
        )
    }
}

fn read(path: &Path) -> MongoResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| MongoError::io(path, e))
}

fn load_certs(path: &Path, pem: &[u8]) -> MongoResult<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_slice_iter(pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| MongoError::tls(path, e.to_string()))?;

    if certs.is_empty() {
        return Err(MongoError::tls(path, "no certificates found"));
    }
    Ok(certs)
}

fn load_roots(path: &Path, pem: &[u8]) -> MongoResult<RootCertStore> {
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(load_certs(path, pem)?);
    if added == 0 {
        return Err(MongoError::tls(
            path,
            format!("none of {} certificates is a usable CA", ignored),
        ));
    }
    Ok(roots)
}

/// Build a throwaway client config so rustls checks the chain against the key.
fn check_key_pair(
    roots: RootCertStore,
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    key_path: &Path,
) -> MongoResult<()> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| MongoError::tls(key_path, e.to_string()))?
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)
        .map_err(|e| MongoError::tls(key_path, format!("certificate and key do not match: {}", e)))?;
    Ok(())
}

fn write_bundle(cert_pem: &[u8], key_pem: &[u8]) -> MongoResult<TempPath> {
    let dir = std::env::temp_dir();
    let mut file = tempfile::Builder::new()
        .prefix("mongokit-client-")
        .suffix(".pem")
        .tempfile_in(&dir)
        .map_err(|e| MongoError::io(&dir, e))?;

    join_pem(file.as_file_mut(), cert_pem, key_pem)
        .map_err(|e| MongoError::io(file.path(), e))?;

    Ok(file.into_temp_path())
}

fn join_pem(out: &mut impl Write, cert_pem: &[u8], key_pem: &[u8]) -> std::io::Result<()> {
    out.write_all(cert_pem)?;
    if cert_pem.last() != Some(&b'\n') {
        out.write_all(b"\n")?;
    }
    out.write_all(key_pem)?;
    out.flush()
}
