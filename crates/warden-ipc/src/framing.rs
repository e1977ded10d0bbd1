use futures_util::{SinkExt, StreamExt};
use tokio::io;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use warden_core::proto::{ReplyEnvelope, RequestEnvelope};

pub type FramedStream = Framed<tokio::net::UnixStream, LengthDelimitedCodec>;

pub fn framed(stream: tokio::net::UnixStream) -> FramedStream {
    Framed::new(stream, LengthDelimitedCodec::new())
}

pub async fn send_request(framed: &mut FramedStream, req: &RequestEnvelope) -> io::Result<()> {
    let bytes = serde_json::to_vec(req).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    framed.send(bytes.into()).await
}

/// Server side: `None` means the peer closed the connection cleanly.
pub async fn read_request(framed: &mut FramedStream) -> io::Result<Option<RequestEnvelope>> {
    let Some(frame) = framed.next().await else {
        return Ok(None);
    };
    let frame = frame?;
    serde_json::from_slice::<RequestEnvelope>(&frame)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub async fn send_reply(framed: &mut FramedStream, reply: &ReplyEnvelope) -> io::Result<()> {
    let bytes =
        serde_json::to_vec(reply).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    framed.send(bytes.into()).await
}

pub async fn read_reply(framed: &mut FramedStream) -> io::Result<ReplyEnvelope> {
    let frame = framed
        .next()
        .await
        .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "socket closed"))??;

    serde_json::from_slice::<ReplyEnvelope>(&frame)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
