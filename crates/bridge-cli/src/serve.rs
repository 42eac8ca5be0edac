//! Line-delimited JSON request loop.
//!
//! Each input line is a `CompileRequest`; each output line is a [`Reply`].
//! Up to `max_concurrent` builds run at once and replies keep request order.

use std::io;

use bridge_core::{CancelToken, CompileOutcome, CompileRequest, CompileService, ErrorEnvelope};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// One response line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// 200 on success, 500 on build failure, 400 on an unparseable request.
    pub status: u16,
    pub body: CompileOutcome,
}

/// Serve requests from `reader` until EOF or cancellation. Returns the
/// number of replies written.
///
/// Undecodable lines get a 400 reply; only a read or write error ends the
/// loop early, and it is returned to the caller.
pub async fn serve<R, W>(
    service: &CompileService,
    reader: R,
    mut writer: W,
    cancel: &CancelToken,
) -> anyhow::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    // Raw byte lines; the first read error is yielded once, then the stream ends.
    let lines = stream::unfold(Some(reader.split(b'\n')), |state| async move {
        let mut segments = state?;
        match segments.next_segment().await {
            Ok(Some(line)) => Some((Ok(line), Some(segments))),
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    });

    let replies = lines
        .take_until(cancel.cancelled())
        .filter(|line| futures::future::ready(!is_blank(line)))
        .map(move |line| async move {
            match line {
                Ok(bytes) => Ok(handle_line(service, bytes, cancel).await),
                Err(e) => Err(e),
            }
        })
        .buffered(service.config().max_concurrent);
    futures::pin_mut!(replies);

    let mut served = 0u64;
    while let Some(reply) = replies.next().await {
        let reply = reply.map_err(|e| {
            warn!(error = %e, served, "failed to read request line");
            e
        })?;
        let mut encoded = serde_json::to_vec(&reply)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
        served += 1;
        debug!(status = reply.status, served, "reply written");
    }
    Ok(served)
}

fn is_blank(line: &io::Result<Vec<u8>>) -> bool {
    match line {
        Ok(bytes) => bytes.iter().all(u8::is_ascii_whitespace),
        Err(_) => false,
    }
}

async fn handle_line(service: &CompileService, line: Vec<u8>, cancel: &CancelToken) -> Reply {
    let request = String::from_utf8(line)
        .map_err(|e| e.to_string())
        .and_then(|text| {
            serde_json::from_str::<CompileRequest>(&text).map_err(|e| e.to_string())
        });

    match request {
        Ok(request) => {
            let body = service.handle(&request, cancel).await;
            Reply {
                status: body.status_code(),
                body,
            }
        }
        Err(e) => Reply {
            status: 400,
            body: CompileOutcome::Failure(ErrorEnvelope {
                error: format!("invalid request: {e}"),
            }),
        },
    }
}
