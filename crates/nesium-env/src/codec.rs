//! Byte layout for serialized snapshots.
//!
//! ```text
//! offset  size  field
//! 0       4     magic "NSLE"
//! 4       2     codec version, little endian
//! 6       1     state kind (0 = environment, 1 = system)
//! 7       4     payload length, little endian
//! 11      n     postcard payload: snapshot metadata + state body
//! ```

use tracing::{debug, warn};

use crate::{
    engine::Engine,
    error::{Error, Result},
    session::Session,
    snapshot::{EnvironmentState, SnapshotKind, StateHandle, StateKind, StoredState, SystemState},
};

pub const MAGIC: [u8; 4] = *b"NSLE";
pub const CODEC_VERSION: u16 = 1;
pub const HEADER_LEN: usize = 11;

/// A snapshot brought back by [`Session::decode`], registered in the
/// decoding session.
#[derive(Debug)]
#[must_use]
pub enum DecodedState {
    Environment(EnvironmentState),
    System(SystemState),
}

impl DecodedState {
    pub fn kind(&self) -> StateKind {
        match self {
            DecodedState::Environment(_) => StateKind::Environment,
            DecodedState::System(_) => StateKind::System,
        }
    }
}

impl<E: Engine> Session<E> {
    /// Exact number of bytes [`Session::encode`] writes for `state`.
    pub fn encoded_len<K: SnapshotKind>(&self, state: &StateHandle<K>) -> Result<usize> {
        Ok(HEADER_LEN + self.payload(state)?.len())
    }

    /// Writes the serialized snapshot to the front of `buf` and returns the
    /// number of bytes written. Fails with `SizeMismatch` when `buf` is
    /// shorter than [`Session::encoded_len`]; nothing is written in that case.
    pub fn encode<K: SnapshotKind>(&self, state: &StateHandle<K>, buf: &mut [u8]) -> Result<usize> {
        let payload = self.payload(state)?;
        let total = HEADER_LEN + payload.len();
        if buf.len() < total {
            return Err(Error::size_mismatch(total, buf.len()));
        }
        write_header(&mut buf[..HEADER_LEN], K::KIND, payload.len())?;
        buf[HEADER_LEN..total].copy_from_slice(&payload);
        Ok(total)
    }

    pub fn encode_to_vec<K: SnapshotKind>(&self, state: &StateHandle<K>) -> Result<Vec<u8>> {
        let payload = self.payload(state)?;
        let mut out = vec![0u8; HEADER_LEN + payload.len()];
        write_header(&mut out[..HEADER_LEN], K::KIND, payload.len())?;
        out[HEADER_LEN..].copy_from_slice(&payload);
        Ok(out)
    }

    /// Parses a serialized snapshot and registers it with this session.
    ///
    /// Compatibility with the loaded ROM and engine is checked on restore,
    /// which fails with `InvalidHandle` for a mismatch.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<DecodedState> {
        let stored = parse::<E::State>(bytes).inspect_err(|err| {
            warn!(len = bytes.len(), %err, "failed to decode snapshot");
        })?;
        debug!(kind = ?stored.meta.kind, tick = stored.meta.tick, "snapshot decoded");
        Ok(match stored.meta.kind {
            StateKind::Environment => DecodedState::Environment(self.register(stored)),
            StateKind::System => DecodedState::System(self.register(stored)),
        })
    }

    fn payload<K: SnapshotKind>(&self, state: &StateHandle<K>) -> Result<Vec<u8>> {
        let stored = self.stored(state)?;
        postcard::to_stdvec(stored).map_err(|e| Error::Encode(e.to_string()))
    }
}

fn write_header(header: &mut [u8], kind: StateKind, payload_len: usize) -> Result<()> {
    let payload_len = u32::try_from(payload_len)
        .map_err(|_| Error::Encode(format!("payload of {payload_len} bytes is too large")))?;
    header[0..4].copy_from_slice(&MAGIC);
    header[4..6].copy_from_slice(&CODEC_VERSION.to_le_bytes());
    header[6] = kind as u8;
    header[7..11].copy_from_slice(&payload_len.to_le_bytes());
    Ok(())
}

fn parse<S>(bytes: &[u8]) -> Result<StoredState<S>>
where
    S: serde::de::DeserializeOwned,
{
    let header = bytes
        .get(..HEADER_LEN)
        .ok_or_else(|| Error::Decode(format!("{} bytes is shorter than the header", bytes.len())))?;
    if header[0..4] != MAGIC {
        return Err(Error::Decode("bad magic".into()));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != CODEC_VERSION {
        return Err(Error::Decode(format!("unsupported codec version {version}")));
    }
    let kind = StateKind::from_u8(header[6])
        .ok_or_else(|| Error::Decode(format!("unknown state kind {}", header[6])))?;
    let payload_len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != payload_len {
        return Err(Error::Decode(format!(
            "payload length {} does not match header length {payload_len}",
            payload.len()
        )));
    }

    let (stored, rest): (StoredState<S>, _) =
        postcard::take_from_bytes(payload).map_err(|e| Error::Decode(e.to_string()))?;
    if !rest.is_empty() {
        return Err(Error::Decode(format!("{} trailing payload bytes", rest.len())));
    }
    if stored.meta.kind != kind {
        return Err(Error::Decode("header kind disagrees with payload".into()));
    }
    if !stored.is_consistent() {
        return Err(Error::Decode("payload RNG presence does not match its kind".into()));
    }
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: u8, len: u32) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&CODEC_VERSION.to_le_bytes());
        out.push(kind);
        out.extend_from_slice(&len.to_le_bytes());
        out
    }

    fn decode_err(bytes: &[u8]) -> String {
        match parse::<u8>(bytes) {
            Err(Error::Decode(msg)) => msg,
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn header_layout_is_fixed() {
        let mut buf = [0u8; HEADER_LEN];
        write_header(&mut buf, StateKind::System, 0x0102).expect("header");
        assert_eq!(&buf[..4], b"NSLE");
        assert_eq!(&buf[4..6], &[1, 0]);
        assert_eq!(buf[6], 1);
        assert_eq!(&buf[7..], &[0x02, 0x01, 0, 0]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn oversized_payload_is_an_encode_error() {
        let mut buf = [0u8; HEADER_LEN];
        let len = u32::MAX as usize + 1;
        assert!(matches!(
            write_header(&mut buf, StateKind::Environment, len),
            Err(Error::Encode(_))
        ));
        assert_eq!(buf, [0u8; HEADER_LEN]);
    }

    #[test]
    fn rejects_short_and_foreign_headers() {
        assert!(decode_err(&[]).contains("shorter"));
        assert!(decode_err(b"NSLE").contains("shorter"));

        let mut bad_magic = header(0, 0);
        bad_magic[0] = b'X';
        assert_eq!(decode_err(&bad_magic), "bad magic");

        let mut bad_version = header(0, 0);
        bad_version[4] = 9;
        assert!(decode_err(&bad_version).contains("version"));

        assert!(decode_err(&header(7, 0)).contains("kind"));
    }

    #[test]
    fn rejects_length_mismatch_and_garbage_payload() {
        let mut short = header(0, 10);
        short.extend_from_slice(&[0; 4]);
        assert!(decode_err(&short).contains("does not match"));

        let mut garbage = header(0, 3);
        garbage.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        decode_err(&garbage);
    }
}
