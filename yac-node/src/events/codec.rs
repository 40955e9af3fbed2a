// Copyright 2026 The Iroha Consensus Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Length-prefixed framing for [`Message`](crate::messages::Message) over a
//! raw byte stream: a 4-byte little-endian length header followed by the
//! canonical `bincode` encoding of the message. Authentication lives in
//! the messages themselves (signatures), not in the framing, so this
//! codec carries plaintext — there is no encryption layer.

use std::convert::TryInto;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::Message;

/// Maximum frame size accepted from a peer; guards against a malicious or
/// buggy peer claiming an enormous length and exhausting memory before the
/// rest of the frame ever arrives.
const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct MessagesCodec;

impl Decoder for MessagesCodec {
    type Item = Message;
    type Error = anyhow::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_le_bytes(buf[..4].try_into().unwrap()) as usize;
        if len > MAX_MESSAGE_LEN {
            anyhow::bail!("received frame of {} bytes, exceeds the {} byte limit", len, MAX_MESSAGE_LEN);
        }
        if buf.len() < 4 + len {
            buf.reserve(4 + len - buf.len());
            return Ok(None);
        }
        buf.advance(4);
        let frame = buf.split_to(len);
        let message = Message::from_bytes(&frame)
            .map_err(|e| anyhow::anyhow!("failed to decode message: {}", e))?;
        Ok(Some(message))
    }
}

impl Encoder<Message> for MessagesCodec {
    type Error = anyhow::Error;

    fn encode(&mut self, msg: Message, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = msg.into_bytes();
        if bytes.len() > MAX_MESSAGE_LEN {
            anyhow::bail!("outgoing message of {} bytes exceeds the {} byte limit", bytes.len(), MAX_MESSAGE_LEN);
        }
        buf.reserve(4 + bytes.len());
        buf.put_u32_le(bytes.len() as u32);
        buf.put_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::messages::{Connect, Height};

    #[test]
    fn encode_then_decode_recovers_the_message() {
        let keys = KeyPair::generate();
        let msg = Message::Connect(Connect {
            public_key: keys.public_key(),
            address: "127.0.0.1:7000".into(),
            created_at: 1,
        });

        let mut codec = MessagesCodec;
        let mut buf = BytesMut::new();
        codec.encode(msg.clone(), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.into_bytes(), msg.into_bytes());
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_returns_none_on_partial_frame() {
        let mut codec = MessagesCodec;
        let msg = Message::RequestBlocks { from_height: Height(1) };
        let mut full = BytesMut::new();
        codec.encode(msg, &mut full).unwrap();

        let mut partial = BytesMut::from(&full[..full.len() - 1]);
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn oversized_frame_header_is_rejected() {
        let mut codec = MessagesCodec;
        let mut buf = BytesMut::new();
        buf.put_u32_le((MAX_MESSAGE_LEN + 1) as u32);
        assert!(codec.decode(&mut buf).is_err());
    }
}
