//! Postgres wire protocol tunnelled through a WebSocket proxy.
//!
//! ```text
//! tokio-postgres ──► WsByteStream (AsyncRead/AsyncWrite)
//!                        │  binary frames
//!                        ▼
//!                  WebSocket proxy ──► Postgres
//! ```
//!
//! The proxy terminates TLS at the WebSocket layer, so the Postgres session
//! itself runs without TLS. A new session is opened for every call and
//! closed before the call returns.

use std::io;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{ready, Context, Poll};
use std::time::Instant;

use async_trait::async_trait;
use futures::{Sink, Stream};
use latency_harness::{QueryOutput, QueryStrategy, StrategyError, StrategyId};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_postgres::config::SslMode;
use tokio_postgres::NoTls;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, warn};

use super::{elapsed_ms, ensure_repetitions};
use crate::schema::{Employee, EMPLOYEES_QUERY};

/// Byte-stream view of a WebSocket: writes become binary frames, binary
/// frames are read back as a contiguous stream.
pub struct WsByteStream<S> {
    inner: WebSocketStream<S>,
    pending: Vec<u8>,
    offset: usize,
}

impl<S> WsByteStream<S> {
    pub fn new(inner: WebSocketStream<S>) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            offset: 0,
        }
    }
}

fn to_io(err: tokio_tungstenite::tungstenite::Error) -> io::Error {
    io::Error::other(err)
}

impl<S> AsyncRead for WsByteStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if this.offset < this.pending.len() {
                let n = buf.remaining().min(this.pending.len() - this.offset);
                buf.put_slice(&this.pending[this.offset..this.offset + n]);
                this.offset += n;
                return Poll::Ready(Ok(()));
            }
            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(Message::Binary(data))) => {
                    this.pending = data;
                    this.offset = 0;
                }
                // EOF
                Some(Ok(Message::Close(_))) | None => return Poll::Ready(Ok(())),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Poll::Ready(Err(to_io(e))),
            }
        }
    }
}

impl<S> AsyncWrite for WsByteStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(Sink::<Message>::poll_ready(Pin::new(&mut this.inner), cx)).map_err(to_io)?;
        Sink::<Message>::start_send(Pin::new(&mut this.inner), Message::Binary(buf.to_vec()))
            .map_err(to_io)?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        Sink::<Message>::poll_flush(Pin::new(&mut this.inner), cx).map_err(to_io)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        Sink::<Message>::poll_close(Pin::new(&mut this.inner), cx).map_err(to_io)
    }
}

pub struct WebSocketStrategy {
    endpoint: String,
    pg_config: tokio_postgres::Config,
}

impl WebSocketStrategy {
    pub fn new(
        database_url: &str,
        endpoint: impl Into<String>,
    ) -> Result<Self, tokio_postgres::Error> {
        let mut pg_config = tokio_postgres::Config::from_str(database_url)?;
        pg_config.ssl_mode(SslMode::Disable);
        Ok(Self {
            endpoint: endpoint.into(),
            pg_config,
        })
    }
}

#[async_trait]
impl QueryStrategy for WebSocketStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::new(StrategyId::WEBSOCKET)
    }

    async fn execute(&self, repetitions: u32) -> Result<QueryOutput, StrategyError> {
        ensure_repetitions(repetitions)?;
        let start = Instant::now();

        let (socket, _) = tokio_tungstenite::connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| StrategyError::Connect(e.to_string()))?;
        let (client, connection) = self
            .pg_config
            .connect_raw(WsByteStream::new(socket), NoTls)
            .await
            .map_err(|e| StrategyError::Connect(e.to_string()))?;
        let driver = tokio::spawn(connection);
        debug!("websocket session opened");

        let mut rows = Vec::new();
        let mut failure = None;
        for _ in 0..repetitions {
            match client.query(EMPLOYEES_QUERY, &[]).await {
                Ok(r) => rows = r,
                Err(e) => {
                    failure = Some(StrategyError::Query(e.to_string()));
                    break;
                }
            }
        }

        // Dropping the last client handle makes the connection task send
        // Terminate and finish.
        drop(client);
        match driver.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "websocket session closed with error"),
            Err(e) => warn!(error = %e, "websocket session task failed"),
        }
        if let Some(err) = failure {
            return Err(err);
        }

        let rows = rows
            .iter()
            .map(|row| {
                let employee =
                    Employee::try_from(row).map_err(|e| StrategyError::Decode(e.to_string()))?;
                serde_json::to_value(employee).map_err(|e| StrategyError::Decode(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryOutput {
            rows,
            query_duration_ms: elapsed_ms(start),
            fresh_connection: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_tungstenite::tungstenite::protocol::Role;

    async fn pair() -> (
        WsByteStream<tokio::io::DuplexStream>,
        WebSocketStream<tokio::io::DuplexStream>,
    ) {
        let (a, b) = tokio::io::duplex(4096);
        let client = WebSocketStream::from_raw_socket(a, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(b, Role::Server, None).await;
        (WsByteStream::new(client), server)
    }

    #[tokio::test]
    async fn reads_concatenate_binary_frames() {
        let (mut stream, mut server) = pair().await;
        server.send(Message::Binary(b"hel".to_vec())).await.unwrap();
        server.send(Message::Ping(vec![1])).await.unwrap();
        server.send(Message::Binary(b"lo".to_vec())).await.unwrap();

        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn writes_become_binary_frames() {
        let (mut stream, mut server) = pair().await;
        stream.write_all(b"startup").await.unwrap();
        stream.flush().await.unwrap();

        match server.next().await {
            Some(Ok(Message::Binary(data))) => assert_eq!(data, b"startup"),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn close_frame_reads_as_eof() {
        let (mut stream, mut server) = pair().await;
        server.send(Message::Close(None)).await.unwrap();

        let mut buf = Vec::new();
        let n = stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn rejects_malformed_connection_string() {
        assert!(WebSocketStrategy::new("host=localhost port=notaport", "ws://localhost/v2").is_err());
    }

    #[tokio::test]
    async fn refused_proxy_is_a_connect_error() {
        let strategy =
            WebSocketStrategy::new("postgresql://u:p@db.internal/neondb", "ws://127.0.0.1:1/v2")
                .unwrap();
        let err = strategy.execute(1).await.unwrap_err();
        assert!(matches!(err, StrategyError::Connect(_)));
    }
}
