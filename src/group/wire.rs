use crate::Error;
use crate::Rank;
use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

const HELLO: u8 = 1;
const READY: u8 = 2;
const REDUCE: u8 = 3;
const GOODBYE: u8 = 4;

/// Up-front allocation for an incoming payload; larger ones grow as bytes arrive.
const READ_CHUNK: usize = 64 * 1024;

/// Unit of exchange between ranks.
///
/// Encoded as `tag: u8 | length: u32 | payload`, all integers and floats
/// big-endian.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// First frame a peer sends after dialing the root.
    Hello(Rank),
    /// Root's acknowledgement once every peer has joined.
    Ready,
    /// A contribution to, or the result of, a reduction.
    Reduce(Vec<f32>),
    /// Teardown barrier.
    Goodbye,
}

impl Frame {
    fn tag(&self) -> u8 {
        match self {
            Self::Hello(_) => HELLO,
            Self::Ready => READY,
            Self::Reduce(_) => REDUCE,
            Self::Goodbye => GOODBYE,
        }
    }

    fn payload(&self) -> BytesMut {
        match self {
            Self::Hello(rank) => {
                let mut buf = BytesMut::with_capacity(4);
                buf.put_u32(*rank as u32);
                buf
            }
            Self::Reduce(values) => {
                let mut buf = BytesMut::with_capacity(values.len() * 4);
                values.iter().for_each(|v| buf.put_f32(*v));
                buf
            }
            Self::Ready | Self::Goodbye => BytesMut::new(),
        }
    }

    pub fn encode(&self) -> Bytes {
        let payload = self.payload();
        let mut buf = BytesMut::with_capacity(5 + payload.len());
        buf.put_u8(self.tag());
        buf.put_u32(payload.len() as u32);
        buf.put(payload);
        buf.freeze()
    }

    pub fn decode(tag: u8, mut payload: Bytes) -> crate::Result<Self> {
        let length = payload.len();
        match tag {
            HELLO if length == 4 => Ok(Self::Hello(payload.get_u32() as Rank)),
            READY if length == 0 => Ok(Self::Ready),
            GOODBYE if length == 0 => Ok(Self::Goodbye),
            REDUCE if length % 4 == 0 => Ok(Self::Reduce(
                (0..length / 4).map(|_| payload.get_f32()).collect(),
            )),
            _ => Err(Error::Protocol(format!(
                "malformed frame (tag {}, {} bytes)",
                tag, length
            ))),
        }
    }

    pub async fn write<W>(&self, writer: &mut W) -> crate::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.encode()).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn read<R>(reader: &mut R) -> crate::Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let tag = reader.read_u8().await?;
        let length = reader.read_u32().await? as usize;
        if length > crate::MAX_FRAME_BYTES {
            return Err(Error::Protocol(format!(
                "frame of {} bytes exceeds limit of {}",
                length,
                crate::MAX_FRAME_BYTES
            )));
        }
        let mut payload = Vec::with_capacity(length.min(READ_CHUNK));
        (&mut *reader).take(length as u64).read_to_end(&mut payload).await?;
        match payload.len() == length {
            true => Self::decode(tag, Bytes::from(payload)),
            false => Err(Error::Protocol(format!(
                "frame truncated at {} of {} bytes",
                payload.len(),
                length
            ))),
        }
    }

    /// Unwrap a reduction payload or complain about what arrived instead.
    pub fn into_values(self, expected: usize) -> crate::Result<Vec<f32>> {
        match self {
            Self::Reduce(values) if values.len() == expected => Ok(values),
            Self::Reduce(values) => Err(Error::Protocol(format!(
                "reduction length mismatch: expected {}, received {}",
                expected,
                values.len()
            ))),
            other => Err(Error::Protocol(format!("expected reduction, received {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_survive_a_pipe() {
        let (mut a, mut b) = tokio::io::duplex(256);
        let sent = vec![Frame::Hello(3), Frame::Reduce(vec![0.5, -1.25, 3.0]), Frame::Goodbye];
        for frame in sent.iter() {
            frame.write(&mut a).await.unwrap();
        }
        for frame in sent.iter() {
            assert_eq!(&Frame::read(&mut b).await.unwrap(), frame);
        }
    }

    #[test]
    fn header_layout() {
        let bytes = Frame::Hello(7).encode();
        assert_eq!(&bytes[..], &[HELLO, 0, 0, 0, 4, 0, 0, 0, 7]);
    }

    #[test]
    fn rejects_ragged_reduction() {
        let payload = Bytes::from_static(&[0, 0, 0]);
        assert!(matches!(Frame::decode(REDUCE, payload), Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn rejects_oversized_length() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&[REDUCE, 0xff, 0xff, 0xff, 0xff]).await.unwrap();
        assert!(matches!(Frame::read(&mut b).await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn rejects_truncated_payload() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&[REDUCE, 0, 0, 0, 8, 0, 0, 0, 0]).await.unwrap();
        drop(a);
        assert!(matches!(Frame::read(&mut b).await, Err(Error::Protocol(_))));
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!(Frame::decode(99, Bytes::new()).is_err());
    }

    #[test]
    fn length_mismatch() {
        assert!(Frame::Reduce(vec![1.0]).into_values(2).is_err());
        assert!(Frame::Ready.into_values(0).is_err());
        assert_eq!(Frame::Reduce(vec![1.0]).into_values(1).unwrap(), vec![1.0]);
    }
}
