//! Local channel endpoint.
//!
//! The broker listens on a Unix domain socket named after its endpoint id,
//! or on loopback TCP where Unix sockets are unavailable or configured off.
//! Both sides work on boxed read/write halves so the protocol code does not
//! care which transport carried the bytes.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
#[cfg(unix)]
use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

use super::error::ProtocolError;
use crate::config::{EndpointConfig, Transport};

/// Read half of a connection
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
/// Write half of a connection
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Where the broker listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    #[cfg(unix)]
    Unix(PathBuf),
    Tcp(SocketAddr),
}

impl Endpoint {
    pub fn from_config(config: &EndpointConfig) -> Self {
        let tcp = || Self::Tcp(SocketAddr::from((Ipv4Addr::LOCALHOST, config.port)));
        match config.transport {
            #[cfg(unix)]
            Transport::Unix => Self::Unix(config.socket_path()),
            #[cfg(not(unix))]
            Transport::Unix => tcp(),
            Transport::Tcp => tcp(),
        }
    }

    /// Start listening. A stale socket file from a previous run is removed;
    /// a socket that still accepts connections belongs to a live broker and
    /// is left alone.
    pub async fn bind(&self) -> Result<Listener, ProtocolError> {
        let bind_err = |source| ProtocolError::Bind {
            endpoint: self.to_string(),
            source,
        };

        match self {
            #[cfg(unix)]
            Self::Unix(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(bind_err)?;
                }
                if tokio::net::UnixStream::connect(path).await.is_ok() {
                    return Err(ProtocolError::InUse {
                        endpoint: self.to_string(),
                    });
                }
                let _ = std::fs::remove_file(path);
                let listener = tokio::net::UnixListener::bind(path).map_err(bind_err)?;
                Ok(Listener::Unix {
                    listener,
                    path: path.clone(),
                })
            }
            Self::Tcp(addr) => {
                let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
                Ok(Listener::Tcp(listener))
            }
        }
    }

    /// Connect as a requester.
    pub async fn connect(&self) -> Result<(BoxedReader, BoxedWriter), ProtocolError> {
        let connect_err = |source| ProtocolError::Connect {
            endpoint: self.to_string(),
            source,
        };

        match self {
            #[cfg(unix)]
            Self::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(connect_err)?;
                let (read, write) = stream.into_split();
                Ok((Box::new(read), Box::new(write)))
            }
            Self::Tcp(addr) => {
                let stream = TcpStream::connect(addr).await.map_err(connect_err)?;
                let _ = stream.set_nodelay(true);
                let (read, write) = stream.into_split();
                Ok((Box::new(read), Box::new(write)))
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(unix)]
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{addr}"),
        }
    }
}

/// Bound broker socket
pub enum Listener {
    #[cfg(unix)]
    Unix {
        listener: tokio::net::UnixListener,
        path: PathBuf,
    },
    Tcp(TcpListener),
}

impl Listener {
    /// Wait for the next requester connection.
    pub async fn accept(&self) -> Result<(BoxedReader, BoxedWriter), ProtocolError> {
        match self {
            #[cfg(unix)]
            Self::Unix { listener, .. } => {
                let (stream, _) = listener.accept().await?;
                let (read, write) = stream.into_split();
                Ok((Box::new(read), Box::new(write)))
            }
            Self::Tcp(listener) => {
                let (stream, _) = listener.accept().await?;
                let _ = stream.set_nodelay(true);
                let (read, write) = stream.into_split();
                Ok((Box::new(read), Box::new(write)))
            }
        }
    }

    /// Remove the socket file, if any.
    pub fn cleanup(&self) {
        #[cfg(unix)]
        if let Self::Unix { path, .. } = self {
            let _ = std::fs::remove_file(path);
        }
    }
}
