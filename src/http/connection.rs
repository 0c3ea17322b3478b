use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error};

use crate::http::files::StorageRoots;
use crate::http::handler::Router;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::{ResponseWriter, SERVER_ERROR_RESPONSE};

/// Size of the single read a request has to fit in.
pub const DEFAULT_READ_LIMIT: usize = 4096;

/// One request/response exchange on an accepted socket.
pub struct Connection<S> {
    stream: S,
    routes: Arc<Router>,
    roots: Arc<StorageRoots>,
    read_limit: usize,
    state: ConnectionState,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, routes: Arc<Router>, roots: Arc<StorageRoots>) -> Self {
        Self {
            stream,
            routes,
            roots,
            read_limit: DEFAULT_READ_LIMIT,
            state: ConnectionState::Reading,
        }
    }

    pub fn with_read_limit(mut self, read_limit: usize) -> Self {
        self.read_limit = read_limit;
        self
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await? {
                        Some(req) => ConnectionState::Processing(req),
                        None => ConnectionState::Closed,
                    };
                }

                ConnectionState::Processing(req) => {
                    let bytes = dispatch(req, &self.roots);
                    self.state = ConnectionState::Writing(ResponseWriter::new(bytes));
                }

                ConnectionState::Writing(writer) => {
                    writer.write_to_stream(&mut self.stream).await?;
                    // No keep-alive: one exchange, then close.
                    self.stream.shutdown().await?;
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Performs the single bounded read and parses what arrived.
    pub async fn read_request(&mut self) -> anyhow::Result<Option<Request>> {
        let mut buf = vec![0u8; self.read_limit];
        let n = self.stream.read(&mut buf).await?;

        if n == 0 {
            debug!("Client closed connection before sending a request");
            return Ok(None);
        }

        Ok(Some(Request::prepare(&buf[..n], Some(self.routes.as_ref()))))
    }
}

/// Runs the bound handler (if any) and renders the bytes to send.
///
/// A handler error or panic becomes the fixed 500 response.
pub fn dispatch(req: &mut Request, roots: &StorageRoots) -> Vec<u8> {
    let Some(handler) = req.handler.clone() else {
        return Response::new().build_response(req, roots);
    };

    match catch_unwind(AssertUnwindSafe(|| handler.handle(req))) {
        Ok(Ok(reply)) => reply.into_response().build_response(req, roots),
        Ok(Err(e)) => {
            error!(method = ?req.method, path = ?req.path, error = %e, "Handler failed");
            SERVER_ERROR_RESPONSE.to_vec()
        }
        Err(_) => {
            error!(method = ?req.method, path = ?req.path, "Handler panicked");
            SERVER_ERROR_RESPONSE.to_vec()
        }
    }
}
