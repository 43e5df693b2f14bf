//! Single-node connection management.

use crate::admin::{self, authenticate_new, login, Quota, Roles, Users};
use crate::error::ClientError;
use crate::info;
use crate::session::{AuthMode, LoginOutcome, Session};
use crate::stream::ClientStream;
use crate::tls::create_tls_connector;
use asinfo_protocol::{InfoRequest, InfoResponse, ResponseCode};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Default connect timeout, also the node's socket timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for a single request/reply exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TLS configuration for node connections.
#[derive(Debug, Clone, Default)]
pub struct TlsClientConfig {
    /// PEM CA bundle used to verify the node. Defaults to the webpki roots.
    pub ca_cert_path: Option<PathBuf>,
    /// PEM client certificate, for mutual TLS.
    pub client_cert_path: Option<PathBuf>,
    /// PEM client private key, for mutual TLS.
    pub client_key_path: Option<PathBuf>,
    /// Name used for SNI and certificate verification. Defaults to the host.
    pub tls_name: Option<String>,
}

impl TlsClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    pub fn with_client_cert(
        mut self,
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.client_cert_path = Some(cert_path.into());
        self.client_key_path = Some(key_path.into());
        self
    }

    pub fn with_tls_name(mut self, name: impl Into<String>) -> Self {
        self.tls_name = Some(name.into());
        self
    }
}

/// Login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub mode: AuthMode,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            mode: AuthMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: AuthMode) -> Self {
        self.mode = mode;
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("mode", &self.mode)
            .finish()
    }
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Node address, `host:port`.
    pub addr: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Timeout for each request/reply exchange, login included.
    pub request_timeout: Duration,
    /// Credentials to log in with (optional).
    pub credentials: Option<Credentials>,
    /// TLS configuration (optional).
    pub tls: Option<TlsClientConfig>,
}

impl ConnectionConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            credentials: None,
            tls: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_tls(mut self, tls_config: TlsClientConfig) -> Self {
        self.tls = Some(tls_config);
        self
    }

    /// Host part of the address, without port or IPv6 brackets.
    pub fn host(&self) -> &str {
        let host = match self.addr.rsplit_once(':') {
            Some((host, port)) if port.parse::<u16>().is_ok() => host,
            _ => self.addr.as_str(),
        };
        host.trim_start_matches('[').trim_end_matches(']')
    }
}

async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| ClientError::Timeout)?
}

/// An open, optionally authenticated, connection to one node.
///
/// Requests are strictly sequential: each method holds `&mut self` for the
/// whole exchange. An exchange that times out or fails partway through a
/// reply leaves unread bytes behind, so the connection is then marked broken
/// and every later request fails with [`ClientError::NotConnected`].
pub struct Connection {
    config: ConnectionConfig,
    stream: ClientStream,
    session: Option<Session>,
    connected: bool,
}

impl Connection {
    /// Connects and, when credentials are configured, logs in.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        let stream = Self::open(&config).await?;
        let mut conn = Self {
            config,
            stream,
            session: None,
            connected: true,
        };

        if let Some(credentials) = conn.config.credentials.clone() {
            conn.login(&credentials).await?;
        }

        Ok(conn)
    }

    /// Connects and authenticates with a session issued on another socket.
    pub async fn connect_with_session(
        config: ConnectionConfig,
        session: Session,
    ) -> Result<Self, ClientError> {
        let user = config
            .credentials
            .as_ref()
            .map(|credentials| credentials.user.clone())
            .ok_or(ClientError::MissingCredentials)?;

        let mut stream = Self::open(&config).await?;
        let code = with_timeout(
            config.request_timeout,
            authenticate_new(&mut stream, &user, session.token()),
        )
        .await?;

        if !code.is_ok() {
            tracing::warn!("Session authentication for {} rejected: {}", user, code);
            return Err(ClientError::AuthenticationFailed(code));
        }

        Ok(Self {
            config,
            stream,
            session: Some(session),
            connected: true,
        })
    }

    async fn open(config: &ConnectionConfig) -> Result<ClientStream, ClientError> {
        tracing::debug!("Connecting to {}...", config.addr);

        let tcp_stream = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect(config.addr.as_str()),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            ClientError::Io(e)
        })?;

        tcp_stream.set_nodelay(true).ok();
        tracing::debug!("TCP connected to {}", config.addr);

        let Some(ref tls_config) = config.tls else {
            return Ok(ClientStream::Plain { stream: tcp_stream });
        };

        let (connector, server_name) = create_tls_connector(tls_config, config.host())?;

        tracing::debug!("Performing TLS handshake with {:?}...", server_name);
        let tls_stream = connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| ClientError::TlsHandshake(e.to_string()))?;

        let stream = ClientStream::Tls { stream: tls_stream };
        tracing::debug!("TLS handshake complete ({:?})", stream.tls_version());
        Ok(stream)
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<(), ClientError> {
        tracing::debug!("Logging in as {}...", credentials.user);

        let outcome = with_timeout(
            self.config.request_timeout,
            login(
                &mut self.stream,
                &credentials.user,
                &credentials.password,
                credentials.mode,
            ),
        )
        .await?;

        if !outcome.is_ok() {
            tracing::warn!("Login for {} rejected: {}", credentials.user, outcome.code());
            return Err(ClientError::AuthenticationFailed(outcome.code()));
        }

        if let LoginOutcome::Authenticated(session) = outcome {
            self.session = Some(session);
        }
        tracing::debug!("Authentication successful");
        Ok(())
    }

    /// Session issued at login. `None` without credentials or after a
    /// legacy authentication.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn stream(&self) -> &ClientStream {
        &self.stream
    }

    /// Returns whether the connection can still carry requests.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn ready_stream(&mut self) -> Result<&mut ClientStream, ClientError> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        Ok(&mut self.stream)
    }

    /// Marks the connection broken when `result` left the stream out of step.
    fn track<T>(&mut self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(ref e) = result {
            if self.connected && e.desyncs_stream() {
                tracing::warn!("Connection to {} is broken: {}", self.config.addr, e);
                self.connected = false;
            }
        }
        result
    }

    // =========================================================================
    // Info
    // =========================================================================

    pub async fn info(&mut self, request: InfoRequest<'_>) -> Result<InfoResponse, ClientError> {
        let timeout = self.config.request_timeout;
        let result = with_timeout(timeout, info::info(self.ready_stream()?, request)).await;
        self.track(result)
    }

    pub async fn info_all(&mut self) -> Result<BTreeMap<String, String>, ClientError> {
        let timeout = self.config.request_timeout;
        let result = with_timeout(timeout, info::info_all(self.ready_stream()?)).await;
        self.track(result)
    }

    pub async fn info_single(&mut self, name: &str) -> Result<String, ClientError> {
        let timeout = self.config.request_timeout;
        let result = with_timeout(timeout, info::info_single(self.ready_stream()?, name)).await;
        self.track(result)
    }

    pub async fn info_many(
        &mut self,
        names: &[&str],
    ) -> Result<BTreeMap<String, String>, ClientError> {
        let timeout = self.config.request_timeout;
        let result = with_timeout(timeout, info::info_many(self.ready_stream()?, names)).await;
        self.track(result)
    }

    /// Whether the node still answers a `node` request.
    pub async fn is_alive(&mut self) -> bool {
        match self.info_single("node").await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("{} is not alive: {}", self.config.addr, e);
                false
            }
        }
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn create_user(
        &mut self,
        user: &str,
        password: &str,
        roles: &[&str],
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange = admin::create_user(self.ready_stream()?, user, password, roles);
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn drop_user(&mut self, user: &str) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let result = with_timeout(timeout, admin::drop_user(self.ready_stream()?, user)).await;
        self.track(result)
    }

    pub async fn set_password(
        &mut self,
        user: &str,
        password: &str,
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange = admin::set_password(self.ready_stream()?, user, password);
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn change_password(
        &mut self,
        user: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange =
            admin::change_password(self.ready_stream()?, user, old_password, new_password);
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn grant_roles(
        &mut self,
        user: &str,
        roles: &[&str],
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange = admin::grant_roles(self.ready_stream()?, user, roles);
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn revoke_roles(
        &mut self,
        user: &str,
        roles: &[&str],
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange = admin::revoke_roles(self.ready_stream()?, user, roles);
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn query_users(
        &mut self,
        user: Option<&str>,
    ) -> Result<(ResponseCode, Users), ClientError> {
        let timeout = self.config.request_timeout;
        let result = with_timeout(timeout, admin::query_users(self.ready_stream()?, user)).await;
        self.track(result)
    }

    // =========================================================================
    // Roles
    // =========================================================================

    pub async fn create_role(
        &mut self,
        role: &str,
        privileges: Option<&[&str]>,
        whitelist: Option<&[&str]>,
        read_quota: Option<Quota<'_>>,
        write_quota: Option<Quota<'_>>,
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange = admin::create_role(
            self.ready_stream()?,
            role,
            privileges,
            whitelist,
            read_quota,
            write_quota,
        );
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn delete_role(&mut self, role: &str) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let result = with_timeout(timeout, admin::delete_role(self.ready_stream()?, role)).await;
        self.track(result)
    }

    pub async fn add_privileges(
        &mut self,
        role: &str,
        privileges: &[&str],
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange = admin::add_privileges(self.ready_stream()?, role, privileges);
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn delete_privileges(
        &mut self,
        role: &str,
        privileges: &[&str],
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange = admin::delete_privileges(self.ready_stream()?, role, privileges);
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn set_whitelist(
        &mut self,
        role: &str,
        whitelist: Option<&[&str]>,
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange = admin::set_whitelist(self.ready_stream()?, role, whitelist);
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn delete_whitelist(&mut self, role: &str) -> Result<ResponseCode, ClientError> {
        self.set_whitelist(role, None).await
    }

    pub async fn set_quotas(
        &mut self,
        role: &str,
        read_quota: Option<Quota<'_>>,
        write_quota: Option<Quota<'_>>,
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange = admin::set_quotas(self.ready_stream()?, role, read_quota, write_quota);
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn delete_quotas(
        &mut self,
        role: &str,
        read_quota: bool,
        write_quota: bool,
    ) -> Result<ResponseCode, ClientError> {
        let timeout = self.config.request_timeout;
        let exchange = admin::delete_quotas(self.ready_stream()?, role, read_quota, write_quota);
        let result = with_timeout(timeout, exchange).await;
        self.track(result)
    }

    pub async fn query_roles(
        &mut self,
        role: Option<&str>,
    ) -> Result<(ResponseCode, Roles), ClientError> {
        let timeout = self.config.request_timeout;
        let result = with_timeout(timeout, admin::query_roles(self.ready_stream()?, role)).await;
        self.track(result)
    }

    /// Shuts the stream down.
    pub async fn close(mut self) -> Result<(), ClientError> {
        tracing::debug!("Closing connection to {}", self.config.addr);
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asinfo_protocol::ResponseCode;
    use bytes::Bytes;
    use chrono::Utc;
    use crate::tls::{load_certs, load_private_key};
    use asinfo_protocol::ProtocolError;
    use rustls::server::WebPkiClientVerifier;
    use rustls::RootCertStore;
    use std::path::Path;
    use std::sync::Arc;
    use tokio::io::{AsyncRead, AsyncReadExt};
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;

    async fn read_message<S: AsyncRead + Unpin>(socket: &mut S) -> Vec<u8> {
        let mut header = [0u8; 8];
        socket.read_exact(&mut header).await.unwrap();
        let size = u64::from_be_bytes([
            0, 0, header[2], header[3], header[4], header[5], header[6], header[7],
        ]);
        let mut body = vec![0u8; size as usize];
        socket.read_exact(&mut body).await.unwrap();
        [header.to_vec(), body].concat()
    }

    fn admin_reply(code: u8, fields: &[u8], field_count: u8) -> Vec<u8> {
        let size = 16 + fields.len() as u8;
        let mut buf = vec![2, 2, 0, 0, 0, 0, 0, size, 0, code, 0, field_count];
        buf.extend_from_slice(&[0u8; 12]);
        buf.extend_from_slice(fields);
        buf
    }

    /// Serves one scripted reply per received message.
    async fn serve(replies: Vec<Vec<u8>>) -> (String, tokio::task::JoinHandle<Vec<Vec<u8>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            for reply in replies {
                received.push(read_message(&mut socket).await);
                socket.write_all(&reply).await.unwrap();
            }
            received
        });

        (addr, handle)
    }

    #[test]
    fn test_config_defaults() {
        let config = ConnectionConfig::new("127.0.0.1:3000");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.credentials.is_none());
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ConnectionConfig::new("db1:4333")
            .with_connect_timeout(Duration::from_secs(1))
            .with_request_timeout(Duration::from_secs(2))
            .with_credentials(Credentials::new("admin", "admin").with_mode(AuthMode::External))
            .with_tls(TlsClientConfig::new().with_client_cert("c.pem", "k.pem"));

        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        let credentials = config.credentials.as_ref().unwrap();
        assert_eq!(credentials.mode, AuthMode::External);
        let tls = config.tls.as_ref().unwrap();
        assert_eq!(tls.client_key_path, Some(PathBuf::from("k.pem")));
        assert!(format!("{:?}", credentials).contains("<redacted>"));
    }

    #[test]
    fn test_config_host() {
        assert_eq!(ConnectionConfig::new("db1:3000").host(), "db1");
        assert_eq!(ConnectionConfig::new("[::1]:3000").host(), "::1");
        assert_eq!(ConnectionConfig::new("db1").host(), "db1");
    }

    #[tokio::test]
    async fn test_connect_without_credentials() {
        let info = b"\x02\x01\x00\x00\x00\x00\x00\x0cnode\tBB9001\n".to_vec();
        let (addr, server) = serve(vec![info]).await;

        let mut conn = Connection::connect(ConnectionConfig::new(addr.clone())).await.unwrap();
        assert!(conn.session().is_none());
        assert!(!conn.stream().is_tls());
        assert_eq!(conn.stream().peer_addr().unwrap().to_string(), addr);
        assert!(conn.is_alive().await);
        assert!(conn.is_connected());
        conn.close().await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received[0], b"\x02\x01\x00\x00\x00\x00\x00\x05node\n");
    }

    #[tokio::test]
    async fn test_connect_logs_in() {
        let login = admin_reply(0, b"\x00\x00\x00\x04\x05tok", 1);
        let info = b"\x02\x01\x00\x00\x00\x00\x00\x0abuild\t7.0\n".to_vec();
        let (addr, server) = serve(vec![login, info]).await;

        let config = ConnectionConfig::new(addr).with_credentials(Credentials::new("admin", "admin"));
        let mut conn = Connection::connect(config).await.unwrap();

        let session = conn.session().unwrap();
        assert_eq!(session.token().as_ref(), b"tok");
        assert_eq!(session.expiration_epoch(), 0);
        assert_eq!(conn.info_single("build").await.unwrap(), "7.0");

        let received = server.await.unwrap();
        assert_eq!(received[0][10], 20);
    }

    #[tokio::test]
    async fn test_connect_rejected() {
        let (addr, _server) = serve(vec![admin_reply(62, b"", 0)]).await;

        let config = ConnectionConfig::new(addr).with_credentials(Credentials::new("admin", "bad"));
        let result = Connection::connect(config).await;
        assert!(matches!(
            result,
            Err(ClientError::AuthenticationFailed(ResponseCode::NoPasswordOrBadPassword))
        ));
    }

    #[tokio::test]
    async fn test_connect_with_session() {
        let (addr, server) = serve(vec![admin_reply(0, b"", 0)]).await;

        let session = Session::new(Bytes::from_static(b"tok"), Some(600), Utc::now());
        let config = ConnectionConfig::new(addr).with_credentials(Credentials::new("admin", ""));
        let conn = Connection::connect_with_session(config, session.clone())
            .await
            .unwrap();
        assert_eq!(conn.session(), Some(&session));

        let received = server.await.unwrap();
        assert!(received[0].ends_with(b"\x00\x00\x00\x04\x05tok"));
    }

    #[tokio::test]
    async fn test_connect_with_session_needs_user() {
        let session = Session::new(Bytes::from_static(b"tok"), None, Utc::now());
        let result =
            Connection::connect_with_session(ConnectionConfig::new("127.0.0.1:1"), session).await;
        assert!(matches!(result, Err(ClientError::MissingCredentials)));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let config = ConnectionConfig::new(addr).with_request_timeout(Duration::from_millis(50));
        let mut conn = Connection::connect(config).await.unwrap();
        let result = conn.info_single("node").await;
        assert!(matches!(result, Err(ClientError::Timeout)));
    }

    #[tokio::test]
    async fn test_timeout_breaks_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let first = read_message(&mut socket).await;
            tokio::time::sleep(Duration::from_millis(200)).await;
            socket
                .write_all(b"\x02\x01\x00\x00\x00\x00\x00\x09secret\tx\n")
                .await
                .ok();

            let mut rest = Vec::new();
            let _ = socket.read_to_end(&mut rest).await;
            (first, rest)
        });

        let config = ConnectionConfig::new(addr).with_request_timeout(Duration::from_millis(50));
        let mut conn = Connection::connect(config).await.unwrap();

        let result = conn.info_many(&["secret"]).await;
        assert!(matches!(result, Err(ClientError::Timeout)));
        assert!(!conn.is_connected());

        // The late reply is now sitting unread in the socket.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let result = conn.info_single("build").await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
        let result = conn.drop_user("bob").await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
        assert!(!conn.is_alive().await);
        conn.close().await.unwrap();

        let (first, rest) = server.await.unwrap();
        assert_eq!(first, b"\x02\x01\x00\x00\x00\x00\x00\x07secret\n");
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_closed_mid_reply_breaks_connection() {
        let (addr, _server) = serve(vec![b"\x02\x01\x00\x00\x00\x00\x00\x15node\t".to_vec()]).await;

        let mut conn = Connection::connect(ConnectionConfig::new(addr)).await.unwrap();
        let result = conn.info_single("node").await;
        assert!(matches!(result, Err(ClientError::ConnectionClosed)));

        let result = conn.query_roles(None).await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }

    #[tokio::test]
    async fn test_rejected_quota_keeps_connection() {
        let info = b"\x02\x01\x00\x00\x00\x00\x00\x0abuild\t7.0\n".to_vec();
        let (addr, server) = serve(vec![info]).await;

        let mut conn = Connection::connect(ConnectionConfig::new(addr)).await.unwrap();
        let result = conn
            .set_quotas("reader", Some(Quota::Text("fast")), None)
            .await;
        assert!(matches!(
            result,
            Err(ClientError::Protocol(ProtocolError::InvalidQuota { .. }))
        ));
        assert!(conn.is_connected());
        assert_eq!(conn.info_single("build").await.unwrap(), "7.0");

        let received = server.await.unwrap();
        assert_eq!(received.len(), 1);
    }

    #[tokio::test]
    async fn test_admin_command_over_connection() {
        let (addr, server) = serve(vec![admin_reply(0, b"", 0)]).await;

        let mut conn = Connection::connect(ConnectionConfig::new(addr)).await.unwrap();
        let code = conn.delete_whitelist("reader").await.unwrap();
        assert_eq!(code, ResponseCode::Ok);
        assert!(conn.is_connected());

        let received = server.await.unwrap();
        // SET_WHITELIST with only the role field.
        assert_eq!(received[0][10], 14);
        assert_eq!(received[0][11], 1);
    }

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
    }

    fn node_acceptor() -> TlsAcceptor {
        let mut roots = RootCertStore::empty();
        roots.add_parsable_certificates(load_certs(&fixture("ca.pem")).unwrap());
        let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
            .build()
            .unwrap();

        let server_config = rustls::ServerConfig::builder()
            .with_client_cert_verifier(verifier)
            .with_single_cert(
                load_certs(&fixture("node.pem")).unwrap(),
                load_private_key(&fixture("node.key")).unwrap(),
            )
            .unwrap();
        TlsAcceptor::from(Arc::new(server_config))
    }

    /// Accepts one TLS client and answers its first message with `reply`.
    async fn serve_tls(reply: Vec<u8>) -> (String, tokio::task::JoinHandle<Option<Vec<u8>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let acceptor = node_acceptor();

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut tls = acceptor.accept(socket).await.ok()?;
            let received = read_message(&mut tls).await;
            tls.write_all(&reply).await.unwrap();
            tls.flush().await.unwrap();
            Some(received)
        });

        (addr, handle)
    }

    fn cluster_tls() -> TlsClientConfig {
        TlsClientConfig::new()
            .with_ca_cert(fixture("ca.pem"))
            .with_client_cert(fixture("client.pem"), fixture("client.key"))
    }

    #[tokio::test]
    async fn test_connect_mutual_tls() {
        let info = b"\x02\x01\x00\x00\x00\x00\x00\x0cnode\tBB9001\n".to_vec();
        let (addr, server) = serve_tls(info).await;

        let config =
            ConnectionConfig::new(addr).with_tls(cluster_tls().with_tls_name("node1.cluster"));
        let mut conn = Connection::connect(config).await.unwrap();
        assert!(conn.stream().is_tls());
        assert!(conn.stream().tls_version().is_some());
        assert_eq!(conn.info_single("node").await.unwrap(), "BB9001");

        let received = server.await.unwrap().unwrap();
        assert_eq!(received, b"\x02\x01\x00\x00\x00\x00\x00\x05node\n");
    }

    #[tokio::test]
    async fn test_connect_tls_name_mismatch() {
        let (addr, server) = serve_tls(Vec::new()).await;

        // The node certificate names node1.cluster, not 127.0.0.1.
        let config = ConnectionConfig::new(addr).with_tls(cluster_tls());
        let result = Connection::connect(config).await;
        assert!(matches!(result, Err(ClientError::TlsHandshake(_))));
        assert!(server.await.unwrap().is_none());
    }
}
