//! Byte encoding of the [`Sreequest`] and [`Sreesponse`] envelopes.
//!
//! Each length-delimited frame carries exactly one envelope, encoded with
//! bincode's standard configuration (variable-length integers, little
//! endian). The loopback test server and the client share this encoding.
//!
//! [`Sreequest`]: crate::frame::Sreequest
//! [`Sreesponse`]: crate::frame::Sreesponse

use bincode::{
    BorrowDecode,
    Encode,
    borrow_decode_from_slice,
    config::{self, Configuration},
    encode_to_vec,
    error::{DecodeError, EncodeError},
};

/// Bincode configuration used on the wire.
const WIRE: Configuration = config::standard();

/// A value carried as the body of one frame.
///
/// Implemented for every bincode-derived type, which in practice means the
/// frame envelopes and their `Payload`/`Ping` bodies.
pub trait Message: Encode + for<'de> BorrowDecode<'de, ()> {
    /// Encode into a frame body.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if bincode cannot encode the value.
    fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> { encode_to_vec(self, WIRE) }

    /// Decode a frame body, returning the value and the bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] for truncated bodies or unknown variants.
    fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), DecodeError>
    where
        Self: Sized,
    {
        borrow_decode_from_slice(bytes, WIRE)
    }
}

impl<T> Message for T where for<'de> T: Encode + BorrowDecode<'de, ()> {}

#[cfg(test)]
mod tests {
    use super::Message;
    use crate::frame::{Payload, Ping, Sreequest, Sreesponse};

    #[test]
    fn decode_consumes_whole_body() {
        let request = Sreequest::Payload(Payload::new("req", 1, 3, b"body".to_vec()));
        let bytes = request.to_bytes().expect("encode request");
        let (decoded, used) = Sreequest::from_bytes(&bytes).expect("decode request");
        assert_eq!(decoded, request);
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn truncated_body_is_rejected() {
        let response = Sreesponse::Payload(Payload::new("req", 0, 1, vec![7; 64]));
        let bytes = response.to_bytes().expect("encode response");
        assert!(Sreesponse::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let mut bytes = Sreequest::Ping(Ping { time: 5 }).to_bytes().expect("encode ping");
        bytes[0] = 9;
        assert!(Sreequest::from_bytes(&bytes).is_err());
    }
}
