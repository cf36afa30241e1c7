//! Loopback transform server speaking the chunked wire protocol.
//!
//! Reassembles each request, applies a transform function and streams the
//! result back in chunks. Modes and reply options let tests provoke the
//! situations a real service produces: reordered chunks, stray ids, silence
//! and dropped connections. Connections may optionally be wrapped in TLS.

use std::{
    fmt,
    io,
    net::SocketAddr,
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use sreeify::{
    Payload,
    Reassembler,
    Sreequest,
    Sreesponse,
    fragment::split,
    message::Message,
};
use rustls::ServerConfig;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tokio_rustls::TlsAcceptor;
use tokio_util::{
    codec::{Framed, LengthDelimitedCodec},
    sync::CancellationToken,
};

/// Frame limit used by the loopback server.
pub const SERVER_MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Function applied to each reassembled request.
pub type TransformFn = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

/// How the server treats payload chunks.
#[derive(Clone)]
pub enum ServerMode {
    /// Reassemble, transform and reply.
    Transform(TransformFn),
    /// Read and discard payload chunks; never reply.
    Silent,
    /// Drop the connection as soon as a payload chunk arrives.
    CloseOnFirstChunk,
}

impl fmt::Debug for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transform(_) => f.write_str("Transform"),
            Self::Silent => f.write_str("Silent"),
            Self::CloseOnFirstChunk => f.write_str("CloseOnFirstChunk"),
        }
    }
}

/// Order in which reply chunks are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplyOrder {
    /// Ascending part index.
    #[default]
    InOrder,
    /// Descending part index.
    Reversed,
}

/// Behaviour of a [`TransformServer`].
#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// Payload handling.
    pub mode: ServerMode,
    /// Reply chunk order.
    pub reply_order: ReplyOrder,
    /// Largest reply chunk.
    pub chunk_size: NonZeroUsize,
    /// Send a chunk for an id nobody asked about before each reply.
    pub stray_chunk: bool,
    /// Echo keepalive pings.
    pub echo_pings: bool,
    /// Terminate TLS with this configuration before speaking the protocol.
    pub tls: Option<Arc<ServerConfig>>,
}

impl ServerOptions {
    /// Reply with `transform` applied to each request.
    #[must_use]
    pub fn transform<F>(transform: F) -> Self
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        Self::with_mode(ServerMode::Transform(Arc::new(transform)))
    }

    /// Reply with the request upper-cased.
    #[must_use]
    pub fn uppercase() -> Self { Self::transform(<[u8]>::to_ascii_uppercase) }

    /// Options for `mode` with defaults elsewhere.
    #[must_use]
    pub fn with_mode(mode: ServerMode) -> Self {
        Self {
            mode,
            reply_order: ReplyOrder::InOrder,
            chunk_size: NonZeroUsize::new(1024 * 1024).unwrap_or(NonZeroUsize::MIN),
            stray_chunk: false,
            echo_pings: true,
            tls: None,
        }
    }

    /// Set the reply chunk order.
    #[must_use]
    pub fn reply_order(mut self, order: ReplyOrder) -> Self {
        self.reply_order = order;
        self
    }

    /// Set the reply chunk size.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Precede each reply with a chunk for an unknown id.
    #[must_use]
    pub fn stray_chunk(mut self, enabled: bool) -> Self {
        self.stray_chunk = enabled;
        self
    }

    /// Enable or disable ping echoes.
    #[must_use]
    pub fn echo_pings(mut self, enabled: bool) -> Self {
        self.echo_pings = enabled;
        self
    }

    /// Accept TLS connections using `config`.
    #[must_use]
    pub fn tls(mut self, config: Arc<ServerConfig>) -> Self {
        self.tls = Some(config);
        self
    }
}

#[derive(Debug)]
struct Shared {
    options: ServerOptions,
    connections: AtomicUsize,
    pings: AtomicUsize,
    chunks: AtomicUsize,
    handshakes: AtomicUsize,
}

/// Handle to a running loopback server. Dropping it stops the server.
#[derive(Debug)]
pub struct TransformServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TransformServer {
    /// Bind to an ephemeral loopback port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start(options: ServerOptions) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shared = Arc::new(Shared {
            options,
            connections: AtomicUsize::new(0),
            pings: AtomicUsize::new(0),
            chunks: AtomicUsize::new(0),
            handshakes: AtomicUsize::new(0),
        });
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&shared),
            shutdown.clone(),
        ));
        Ok(Self {
            addr,
            shared,
            shutdown,
            task: Some(task),
        })
    }

    /// Bound address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Bound address as a `host:port` target.
    #[must_use]
    pub fn target(&self) -> String { self.addr.to_string() }

    /// Target naming [`TEST_HOST`] so TLS clients can verify the server.
    ///
    /// [`TEST_HOST`]: crate::tls::TEST_HOST
    #[must_use]
    pub fn tls_target(&self) -> String {
        format!("{}:{}", crate::tls::TEST_HOST, self.addr.port())
    }

    /// Connections accepted so far.
    #[must_use]
    pub fn connections(&self) -> usize { self.shared.connections.load(Ordering::SeqCst) }

    /// Pings received so far.
    #[must_use]
    pub fn pings(&self) -> usize { self.shared.pings.load(Ordering::SeqCst) }

    /// Payload chunks received so far.
    #[must_use]
    pub fn chunks(&self) -> usize { self.shared.chunks.load(Ordering::SeqCst) }

    /// TLS handshakes completed so far.
    #[must_use]
    pub fn tls_handshakes(&self) -> usize { self.shared.handshakes.load(Ordering::SeqCst) }

    /// Stop accepting and close every open connection.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TransformServer {
    fn drop(&mut self) { self.shutdown.cancel(); }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, shutdown: CancellationToken) {
    loop {
        let accepted = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let Ok((stream, _)) = accepted else { break };
        shared.connections.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(accept_connection(
            stream,
            Arc::clone(&shared),
            shutdown.child_token(),
        ));
    }
}

async fn accept_connection(stream: TcpStream, shared: Arc<Shared>, shutdown: CancellationToken) {
    let Some(config) = shared.options.tls.clone() else {
        serve(stream, shared, shutdown).await;
        return;
    };
    let handshake = tokio::select! {
        biased;
        () = shutdown.cancelled() => return,
        handshake = TlsAcceptor::from(config).accept(stream) => handshake,
    };
    // A client that rejects the certificate aborts here.
    let Ok(stream) = handshake else { return };
    shared.handshakes.fetch_add(1, Ordering::SeqCst);
    serve(stream, shared, shutdown).await;
}

async fn serve<S>(stream: S, shared: Arc<Shared>, shutdown: CancellationToken)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(SERVER_MAX_FRAME_LENGTH)
        .new_codec();
    let mut framed = Framed::new(stream, codec);
    let mut reassembler = Reassembler::default();
    let options = &shared.options;
    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            next = framed.next() => next,
        };
        let Some(Ok(bytes)) = next else { return };
        let Ok((request, _)) = Sreequest::from_bytes(&bytes) else {
            continue;
        };
        match request {
            Sreequest::Ping(ping) => {
                shared.pings.fetch_add(1, Ordering::SeqCst);
                if options.echo_pings && send(&mut framed, &Sreesponse::Ping(ping)).await.is_err() {
                    return;
                }
            }
            Sreequest::Payload(chunk) => {
                shared.chunks.fetch_add(1, Ordering::SeqCst);
                match &options.mode {
                    ServerMode::Silent => {}
                    ServerMode::CloseOnFirstChunk => return,
                    ServerMode::Transform(transform) => {
                        let Ok(Some(done)) = reassembler.ingest(chunk) else {
                            continue;
                        };
                        let reply = transform(done.data());
                        if reply_with(&mut framed, options, done.id().as_str(), &reply)
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                }
            }
        }
    }
}

async fn reply_with<S>(
    framed: &mut Framed<S, LengthDelimitedCodec>,
    options: &ServerOptions,
    id: &str,
    reply: &[u8],
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if options.stray_chunk {
        let stray = Payload::new(format!("stray-{id}"), 0, 1, b"unsolicited".to_vec());
        send(framed, &Sreesponse::Payload(stray)).await?;
    }
    let chunks = split(reply, options.chunk_size);
    let total = i32::try_from(chunks.len()).map_err(io::Error::other)?;
    let mut frames: Vec<Payload> = (0..total)
        .zip(chunks)
        .map(|(part, data)| Payload::new(id, part, total, data.to_vec()))
        .collect();
    if options.reply_order == ReplyOrder::Reversed {
        frames.reverse();
    }
    for frame in frames {
        send(framed, &Sreesponse::Payload(frame)).await?;
    }
    Ok(())
}

async fn send<S>(
    framed: &mut Framed<S, LengthDelimitedCodec>,
    response: &Sreesponse,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let bytes = response.to_bytes().map_err(io::Error::other)?;
    framed.send(Bytes::from(bytes)).await
}
