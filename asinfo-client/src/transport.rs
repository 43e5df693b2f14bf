//! Exact-length reads and whole-buffer writes over any async stream.

use crate::error::ClientError;
use asinfo_protocol::header::{unpack_admin_header, unpack_protocol_header};
use asinfo_protocol::{AdminHeader, ProtocolError, ProtocolHeader};
use asinfo_protocol::{PROTOCOL_HEADER_SIZE, TOTAL_HEADER_SIZE};
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Writes the whole request before anything is read back.
pub(crate) async fn send<S>(stream: &mut S, buf: &[u8]) -> Result<(), ClientError>
where
    S: AsyncWrite + Unpin,
{
    tracing::trace!("send {} bytes: {}", buf.len(), hex::encode(buf));
    stream.write_all(buf).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads exactly `size` bytes. End of stream first is `ConnectionClosed`.
pub(crate) async fn receive_data<S>(stream: &mut S, size: usize) -> Result<BytesMut, ClientError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = BytesMut::zeroed(size);
    stream.read_exact(&mut buf).await?;
    tracing::trace!("received {} bytes: {}", size, hex::encode(&buf));
    Ok(buf)
}

pub(crate) async fn receive_protocol_header<S>(stream: &mut S) -> Result<ProtocolHeader, ClientError>
where
    S: AsyncRead + Unpin,
{
    let buf = receive_data(stream, PROTOCOL_HEADER_SIZE).await?;
    let (header, _) = unpack_protocol_header(&buf, 0)?;
    Ok(header)
}

/// Reads a message body whose size came from a protocol header.
pub(crate) async fn receive_body<S>(
    stream: &mut S,
    header: &ProtocolHeader,
) -> Result<BytesMut, ClientError>
where
    S: AsyncRead + Unpin,
{
    let size =
        usize::try_from(header.size).map_err(|_| ProtocolError::MessageTooLarge(header.size))?;
    receive_data(stream, size).await
}

/// Reply prefix of an admin exchange.
pub(crate) struct AdminReply {
    pub protocol: ProtocolHeader,
    pub admin: AdminHeader,
}

/// Sends an admin request and reads back the protocol and admin headers.
pub(crate) async fn send_and_get_admin_header<S>(
    stream: &mut S,
    buf: &[u8],
) -> Result<AdminReply, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    send(stream, buf).await?;

    let reply = receive_data(stream, TOTAL_HEADER_SIZE).await?;
    let (protocol, offset) = unpack_protocol_header(&reply, 0)?;
    let (admin, _) = unpack_admin_header(&reply, offset)?;

    Ok(AdminReply { protocol, admin })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_receive_across_chunks() {
        let mut stream = Builder::new().read(b"\x02\x02\x00").read(b"\x00\x00\x00\x01\x10").build();
        let header = receive_protocol_header(&mut stream).await.unwrap();
        assert_eq!(header.version, 2);
        assert_eq!(header.size, 0x110);
    }

    #[tokio::test]
    async fn test_premature_close() {
        let mut stream = Builder::new().read(b"\x02\x02\x00").build();
        let result = receive_protocol_header(&mut stream).await;
        assert!(matches!(result, Err(ClientError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_read_error_is_io() {
        let mut stream = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let result = receive_data(&mut stream, 4).await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }

    #[tokio::test]
    async fn test_send_and_get_admin_header() {
        let reply = b"\x02\x02\x00\x00\x00\x00\x00\x10\x00\x3c\x02\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00";
        let mut stream = Builder::new().write(b"request").read(reply).build();

        let reply = send_and_get_admin_header(&mut stream, b"request").await.unwrap();
        assert_eq!(reply.protocol.size, 16);
        assert_eq!(reply.admin.result_code, 60);
        assert_eq!(reply.admin.command, 2);
    }

    #[tokio::test]
    async fn test_write_error() {
        let mut stream = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"))
            .build();
        let result = send(&mut stream, b"x").await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }
}
