//! Length-prefixed bincode framing
//!
//! Both ends of the control socket speak the same trivial wire format: a
//! big-endian `u32` byte count followed by one bincode value. The server
//! and client share these helpers so the framing can never drift between
//! them.

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{ControlError, Result};

/// Requests are small command enums; anything bigger is a protocol
/// violation, not a legitimate request.
pub(crate) const MAX_REQUEST_FRAME: u32 = 1_000_000;

/// Responses may carry full stats dumps, so the ceiling is generous while
/// still bounding a misbehaving peer.
pub(crate) const MAX_RESPONSE_FRAME: u32 = 10_000_000;

/// Read one framed value, rejecting frames over `limit` bytes.
pub(crate) async fn read_frame<T, S>(stream: &mut S, limit: u32) -> Result<T>
where
    T: DeserializeOwned,
    S: AsyncRead + Unpin + Send,
{
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ControlError::ConnectionClosed
        } else {
            ControlError::Io(e)
        }
    })?;

    let size = u32::from_be_bytes(len_buf);
    if size > limit {
        return Err(ControlError::FrameTooLarge { size, limit });
    }

    let mut payload = vec![0u8; size as usize];
    stream.read_exact(&mut payload).await?;

    let (value, _) = bincode::serde::decode_from_slice(&payload, bincode::config::legacy())?;
    Ok(value)
}

/// Write one framed value.
pub(crate) async fn write_frame<T, S>(stream: &mut S, value: &T) -> Result<()>
where
    T: Serialize,
    S: AsyncWrite + Unpin + Send,
{
    let payload = bincode::serde::encode_to_vec(value, bincode::config::legacy())?;
    let size = u32::try_from(payload.len())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    stream.write_all(&size.to_be_bytes()).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (mut writer, mut reader) = tokio::io::duplex(1024);

        write_frame(&mut writer, &"طلب جديد".to_string()).await.unwrap();
        let value: String = read_frame(&mut reader, MAX_REQUEST_FRAME).await.unwrap();
        assert_eq!(value, "طلب جديد");
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected_before_reading_payload() {
        let (mut writer, mut reader) = tokio::io::duplex(64);

        // A length prefix well past the limit, with no payload behind it.
        writer.write_all(&u32::MAX.to_be_bytes()).await.unwrap();

        let result: Result<String> = read_frame(&mut reader, MAX_REQUEST_FRAME).await;
        assert!(matches!(
            result,
            Err(ControlError::FrameTooLarge { size: u32::MAX, .. })
        ));
    }

    #[tokio::test]
    async fn test_closed_stream_reports_connection_closed() {
        let (writer, mut reader) = tokio::io::duplex(64);
        drop(writer);

        let result: Result<String> = read_frame(&mut reader, MAX_REQUEST_FRAME).await;
        assert!(matches!(result, Err(ControlError::ConnectionClosed)));
    }
}
