//! Pumps the child's pipes line by line.

use crate::readiness::{OutputLine, StreamSource};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Read `stream` until EOF, logging every line and forwarding it while
/// someone is still listening.
///
/// Keeps draining after the receiver is dropped so the child never blocks
/// on a full pipe.
pub(crate) fn pump<R>(
    stream: R,
    source: StreamSource,
    tx: mpsc::UnboundedSender<OutputLine>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        let mut forwarding = true;

        loop {
            match lines.next_line().await {
                Ok(Some(text)) => {
                    debug!(target: "backend", "[{source}] {text}");
                    if forwarding && tx.send(OutputLine::new(source, text)).is_err() {
                        forwarding = false;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(target: "backend", "[{source}] read error: {e}");
                    break;
                }
            }
        }
    })
}
