//! Plain info requests.

use crate::error::ClientError;
use crate::transport::{receive_body, receive_protocol_header, send};
use asinfo_protocol::info::{parse_map, parse_single};
use asinfo_protocol::{InfoRequest, InfoResponse};
use std::collections::BTreeMap;
use tokio::io::{AsyncRead, AsyncWrite};

async fn exchange<S>(stream: &mut S, request: &InfoRequest<'_>) -> Result<Vec<u8>, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let buf = request.encode()?;
    send(stream, &buf).await?;

    let header = receive_protocol_header(stream).await?;
    if header.size == 0 {
        return Err(ClientError::EmptyResponse);
    }

    let body = receive_body(stream, &header).await?;
    Ok(body.to_vec())
}

/// Sends an info request and parses the reply for it.
///
/// A reply with an empty body is [`ClientError::EmptyResponse`].
pub async fn info<S>(stream: &mut S, request: InfoRequest<'_>) -> Result<InfoResponse, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let body = exchange(stream, &request).await?;
    let response = InfoResponse::parse(&request, &body)?;
    tracing::debug!("info {:?} -> {} bytes", request, body.len());
    Ok(response)
}

/// Every name the node serves.
pub async fn info_all<S>(stream: &mut S) -> Result<BTreeMap<String, String>, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let body = exchange(stream, &InfoRequest::All).await?;
    Ok(parse_map(&body)?)
}

/// The value of one name.
pub async fn info_single<S>(stream: &mut S, name: &str) -> Result<String, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let body = exchange(stream, &InfoRequest::Single(name)).await?;
    Ok(parse_single(name, &body)?)
}

/// Values of several names. Names the node does not know come back empty.
pub async fn info_many<S>(
    stream: &mut S,
    names: &[&str],
) -> Result<BTreeMap<String, String>, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let body = exchange(stream, &InfoRequest::Many(names)).await?;
    Ok(parse_map(&body)?)
}
