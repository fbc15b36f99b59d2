//! Per-account IMAP connection and TLS helpers
//!
//! Provides `open()`, which turns one [`Account`] into a logged-in
//! session with the account's folder opened read-only, and `close()`,
//! which ends it. Both implicit TLS and STARTTLS are supported.

use crate::config::{Account, Security};
use crate::error::{Error, Result};
use crate::folder::Folder;
use async_imap::Session;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{debug, info, warn};

/// A TLS-wrapped IMAP session.
pub type ImapSession = Session<Compat<tokio_rustls::client::TlsStream<TcpStream>>>;

/// How long LOGOUT may take before the socket is simply dropped.
const LOGOUT_GRACE: Duration = Duration::from_secs(2);

/// Build a TLS connector for one account.
///
/// Certificates are checked against the webpki roots unless the account
/// opts out, which local bridges with self-signed certificates need.
fn tls_connector(accept_invalid_certs: bool) -> Result<TlsConnector> {
    let builder = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| Error::Tls(format!("Protocol setup failed: {e}")))?;

    let config = if accept_invalid_certs {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    } else {
        let root_store = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        builder
            .with_root_certificates(root_store)
            .with_no_client_auth()
    };
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Issue STARTTLS on a plain connection and hand back the raw socket,
/// ready for the TLS handshake.
async fn starttls(tcp_stream: TcpStream) -> Result<TcpStream> {
    let mut client = async_imap::Client::new(tcp_stream.compat());

    client
        .run_command_and_check_ok("STARTTLS", None)
        .await
        .map_err(|e| Error::Tls(format!("STARTTLS failed: {e}")))?;

    Ok(client.into_inner().into_inner())
}

/// Open a fresh TLS-wrapped IMAP session.
///
/// Connects to `account.server:account.port` via TCP, upgrades to TLS
/// (directly or through STARTTLS), and logs in.
///
/// # Errors
///
/// Returns an error if the TCP connect, TLS handshake or LOGIN fails.
pub async fn connect(account: &Account) -> Result<ImapSession> {
    let addr = account.address();
    debug!("Connecting to IMAP server at {}", addr);

    let tcp_stream = TcpStream::connect((account.server.as_str(), account.port)).await?;
    let tcp_stream = match account.security {
        Security::Tls => tcp_stream,
        Security::StartTls => starttls(tcp_stream).await?,
    };

    let connector = tls_connector(account.accept_invalid_certs)?;
    let server_name = ServerName::try_from(account.server.clone())
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))?;

    let tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| Error::Tls(e.to_string()))?;

    let tls_client = async_imap::Client::new(tls_stream.compat());

    let session = tls_client
        .login(&account.login, &account.password)
        .await
        .map_err(|(e, _)| Error::Imap(format!("Login failed: {e}")))?;

    info!("Connected to IMAP server at {}", addr);
    Ok(session)
}

/// EXAMINE a folder on an existing session.
///
/// EXAMINE opens the folder read-only, so nothing done afterwards can
/// change a message's `\Seen` flag.
///
/// # Errors
///
/// Returns [`Error::Imap`] if the server rejects the folder.
pub async fn examine(session: &mut ImapSession, folder: &Folder) -> Result<()> {
    session
        .examine(folder.as_str())
        .await
        .map_err(|e| Error::Imap(format!("Failed to examine {folder}: {e}")))?;
    Ok(())
}

/// Connect, log in and open the account's folder, all within `limit`.
///
/// # Errors
///
/// Returns [`Error::Timeout`] if the whole sequence takes longer than
/// `limit`, or the first error any step produced.
pub async fn open(account: &Account, limit: Duration) -> Result<ImapSession> {
    let opening = async {
        let mut session = connect(account).await?;
        if let Err(e) = examine(&mut session, &account.folder).await {
            close(session).await;
            return Err(e);
        }
        Ok::<_, Error>(session)
    };

    tokio::time::timeout(limit, opening).await.map_err(|_| {
        Error::Timeout(format!(
            "opening {} took longer than {limit:?}",
            account.address()
        ))
    })?
}

/// Log out and drop the session.
///
/// A server that does not answer LOGOUT in time is abandoned; dropping
/// the session closes the socket either way.
pub async fn close(mut session: ImapSession) {
    match tokio::time::timeout(LOGOUT_GRACE, session.logout()).await {
        Ok(Ok(())) => debug!("Logged out"),
        Ok(Err(e)) => debug!("LOGOUT failed: {}", e),
        Err(_) => warn!("LOGOUT not answered within {:?}", LOGOUT_GRACE),
    }
}

/// Certificate verifier that accepts all certificates
/// (for bridges and test servers with self-signed certs).
#[derive(Debug)]
struct DangerousVerifier;

impl rustls::client::danger::ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
