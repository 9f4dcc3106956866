/*
 * net.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Grimaldello, a raw HTTP security-testing toolkit.
 *
 * Grimaldello is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Grimaldello is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Grimaldello.  If not, see <http://www.gnu.org/licenses/>.
 */

//! TCP/TLS connection plumbing: plain connect and TLS connect with a
//! caller-chosen ALPN offer.
//!
//! Certificate verification is off unless `reject_unauthorized` is set;
//! the targets of a security-testing tool are routinely self-signed.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream as TokioTlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::client::ClientConfig;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    version, DigitallySignedStruct, Error as TlsError, RootCertStore, SignatureScheme,
    SupportedProtocolVersion,
};
use tokio_rustls::TlsConnector;

use crate::http::options::{TlsOptions, TlsVersion};

/// Build a root certificate store: platform native certs first, then
/// webpki-roots as fallback, then any caller-supplied DER anchors.
fn build_root_store(extra_ca: &[Vec<u8>]) -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    if let Ok(certs) = rustls_native_certs::load_native_certs() {
        for cert in certs {
            let _ = root_store.add(cert);
        }
    }
    if root_store.is_empty() {
        root_store.roots = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    }
    for der in extra_ca {
        let _ = root_store.add(CertificateDer::from(der.clone()));
    }
    root_store
}

/// Accepts any server certificate. Used when `reject_unauthorized` is false.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

fn protocol_versions(opts: &TlsOptions) -> &'static [&'static SupportedProtocolVersion] {
    let min = opts.min_version.unwrap_or(TlsVersion::Tls12);
    let max = opts.max_version.unwrap_or(TlsVersion::Tls13);
    static TLS12_AND_TLS13: &[&SupportedProtocolVersion] = &[&version::TLS13, &version::TLS12];
    static TLS12_ONLY: &[&SupportedProtocolVersion] = &[&version::TLS12];
    static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&version::TLS13];
    match (min, max) {
        (TlsVersion::Tls12, TlsVersion::Tls13) => TLS12_AND_TLS13,
        (TlsVersion::Tls12, TlsVersion::Tls12) => TLS12_ONLY,
        (TlsVersion::Tls13, _) => TLS13_ONLY,
    }
}

/// Build a rustls client config from the caller's TLS options plus the
/// ALPN protocols the transport wants to offer (empty for raw HTTP/1.x).
pub fn client_config(opts: &TlsOptions, alpn: &[&[u8]]) -> io::Result<Arc<ClientConfig>> {
    if !opts.ciphers.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "cipher suite pinning is not supported by the rustls backend",
        ));
    }
    let builder = ClientConfig::builder_with_protocol_versions(protocol_versions(opts));
    let builder = if opts.reject_unauthorized {
        builder.with_root_certificates(build_root_store(&opts.ca))
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
    };
    let mut config = match (&opts.key, opts.cert.is_empty()) {
        (Some(key), false) => {
            let certs: Vec<CertificateDer<'static>> = opts
                .cert
                .iter()
                .map(|der| CertificateDer::from(der.clone()))
                .collect();
            let key = PrivateKeyDer::try_from(key.clone())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?
        }
        _ => builder.with_no_client_auth(),
    };
    config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
    Ok(Arc::new(config))
}

fn server_name(host: &str, opts: &TlsOptions) -> io::Result<ServerName<'static>> {
    let name = opts.servername.as_deref().unwrap_or(host);
    let name_static: &'static str = Box::leak(name.to_string().into_boxed_str());
    name_static
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))
}

/// Unified stream: plain TCP or TLS over TCP. Implements AsyncRead + AsyncWrite.
pub enum HttpStream {
    Plain(TcpStream),
    Tls(Box<TokioTlsStream<TcpStream>>),
}

impl HttpStream {
    /// ALPN protocol the peer selected, when this is a TLS stream.
    pub fn alpn_protocol(&self) -> Option<Vec<u8>> {
        match self {
            HttpStream::Plain(_) => None,
            HttpStream::Tls(s) => s.get_ref().1.alpn_protocol().map(|p| p.to_vec()),
        }
    }
}

impl AsyncRead for HttpStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for HttpStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_flush(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            HttpStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            HttpStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Plain TCP connect.
pub async fn connect_tcp(host: &str, port: u16) -> io::Result<TcpStream> {
    let addr = format!("{}:{}", host, port);
    TcpStream::connect(&addr).await
}

/// TCP connect followed by a TLS handshake with the given ALPN offer.
pub async fn connect_tls(
    host: &str,
    port: u16,
    opts: &TlsOptions,
    alpn: &[&[u8]],
) -> io::Result<HttpStream> {
    let tcp = connect_tcp(host, port).await?;
    let name = server_name(host, opts)?;
    let connector = TlsConnector::from(client_config(opts, alpn)?);
    let tls = connector
        .connect(name, tcp)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
    Ok(HttpStream::Tls(Box::new(tls)))
}
