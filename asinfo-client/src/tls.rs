//! TLS setup for node connections.
//!
//! Nodes are verified against the cluster CA bundle when one is configured,
//! otherwise against the webpki roots. A client certificate and key, given
//! together, enable mutual TLS. The configured TLS name replaces the host for
//! SNI and certificate verification, since nodes are usually dialled by IP.

use crate::connection::TlsClientConfig;
use crate::error::ClientError;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::RootCertStore;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsConnector;

/// Builds a connector and the name to verify the node against.
pub fn create_tls_connector(
    config: &TlsClientConfig,
    host: &str,
) -> Result<(TlsConnector, ServerName<'static>), ClientError> {
    let builder = rustls::ClientConfig::builder().with_root_certificates(root_store(config)?);

    let client_config = match client_identity(config)? {
        Some((chain, key)) => builder
            .with_client_auth_cert(chain, key)
            .map_err(|e| ClientError::TlsConfig(format!("invalid client cert/key: {}", e)))?,
        None => builder.with_no_client_auth(),
    };

    Ok((
        TlsConnector::from(Arc::new(client_config)),
        server_name(config, host)?,
    ))
}

fn root_store(config: &TlsClientConfig) -> Result<RootCertStore, ClientError> {
    let mut store = RootCertStore::empty();

    let Some(ref ca_path) = config.ca_cert_path else {
        store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        return Ok(store);
    };

    let (added, ignored) = store.add_parsable_certificates(load_certs(ca_path)?);
    if added == 0 {
        return Err(ClientError::TlsConfig(format!(
            "no usable CA certificate in {:?}",
            ca_path
        )));
    }
    if ignored > 0 {
        tracing::warn!("Ignored {} unusable CA certificates in {:?}", ignored, ca_path);
    }

    tracing::debug!("Loaded {} CA certificates from {:?}", added, ca_path);
    Ok(store)
}

type ClientIdentity = (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>);

fn client_identity(config: &TlsClientConfig) -> Result<Option<ClientIdentity>, ClientError> {
    match (&config.client_cert_path, &config.client_key_path) {
        (Some(cert_path), Some(key_path)) => {
            Ok(Some((load_certs(cert_path)?, load_private_key(key_path)?)))
        }
        (None, None) => Ok(None),
        _ => Err(ClientError::TlsConfig(
            "client certificate and key must be configured together".to_string(),
        )),
    }
}

fn server_name(config: &TlsClientConfig, host: &str) -> Result<ServerName<'static>, ClientError> {
    let name = config.tls_name.as_deref().unwrap_or(host);
    ServerName::try_from(name.to_string())
        .map_err(|_| ClientError::TlsConfig(format!("invalid TLS name: {}", name)))
}

fn open_pem(path: &Path) -> Result<BufReader<File>, ClientError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ClientError::TlsConfig(format!("cannot open {:?}: {}", path, e)))
}

/// Every certificate in a PEM file. A file without any is an error.
pub(crate) fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ClientError> {
    let mut reader = open_pem(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ClientError::TlsConfig(format!("invalid cert file {:?}: {}", path, e)))?;

    if certs.is_empty() {
        return Err(ClientError::TlsConfig(format!(
            "no certificates found in {:?}",
            path
        )));
    }
    Ok(certs)
}

/// The first PKCS#1, PKCS#8 or SEC1 key in a PEM file.
pub(crate) fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ClientError> {
    let mut reader = open_pem(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| ClientError::TlsConfig(format!("invalid key file {:?}: {}", path, e)))?
        .ok_or_else(|| ClientError::TlsConfig(format!("no private key found in {:?}", path)))
}
