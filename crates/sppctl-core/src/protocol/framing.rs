//! Wire framing of worker commands and replies.
//!
//! Commands are written as raw bytes with no delimiter. Replies have no length
//! prefix either: they are read in chunks of [`ProtocolConfig::MSG_SIZE`]
//! bytes and a chunk shorter than that ends the message.
//!
//! ```text
//! -> status
//! <- {"results":[{"result":"success"}],"info":{...}}
//! ```

use crate::config::ProtocolConfig;
use bytes::{Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Write a command line to the worker.
pub async fn write_command(stream: &mut TcpStream, command: &str) -> io::Result<()> {
    stream.write_all(command.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one reply from the worker.
///
/// Blocks for the first chunk. If that chunk fills the buffer, whatever is
/// already queued on the socket is drained without blocking.
///
/// Returns `None` on EOF (peer closed connection).
pub async fn read_reply(stream: &mut TcpStream) -> io::Result<Option<Bytes>> {
    let mut chunk = vec![0u8; ProtocolConfig::MSG_SIZE];
    let n = stream.read(&mut chunk).await?;
    if n == 0 {
        return Ok(None);
    }

    let mut reply = BytesMut::with_capacity(n);
    reply.extend_from_slice(&chunk[..n]);
    if n == ProtocolConfig::MSG_SIZE {
        drain_pending(stream, &mut chunk, &mut reply)?;
    }

    Ok(Some(reply.freeze()))
}

/// Drain bytes already queued on the socket.
///
/// `WouldBlock` means the reply length was an exact multiple of the chunk
/// size and nothing remains.
fn drain_pending(stream: &TcpStream, chunk: &mut [u8], reply: &mut BytesMut) -> io::Result<()> {
    loop {
        match stream.try_read(chunk) {
            Ok(n) => {
                reply.extend_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    return Ok(());
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}
