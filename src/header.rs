use std::fmt::Display;
use std::io::Cursor;

use bitfield::bitfield;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{instrument, warn};

use super::Networkable;
use crate::{ensure_remaining, DnsError};

bitfield! {
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct Flags(u16);
    impl Debug;
    u8;
    // query or response
    pub qr, set_qr: 15;
    // query type
    pub opcode, set_opcode: 14, 11;
    // authoritative answerer
    pub aa, set_aa: 10;
    // truncation
    pub tc, set_tc: 9;
    // recursion desired
    pub rd, set_rd: 8;
    // recursion available
    pub ra, set_ra: 7;
    // reserved
    pub z, set_z: 6, 4;
    // response code
    pub rcode, set_rcode: 3, 0;
}

impl Flags {
    /// Standard query with recursion desired (0x0100).
    pub fn query() -> Self {
        let mut flags = Self::default();
        flags.set_rd(true);
        flags
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from(self.rcode())
    }
}

impl Networkable for Flags {
    fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.0.to_be_bytes())
    }

    fn from_bytes(bytes: &mut Cursor<&[u8]>) -> Result<Self, DnsError> {
        ensure_remaining(bytes, 2, "truncated flags")?;

        Ok(Self(bytes.get_u16()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Other(u8),
}

impl ResponseCode {
    pub fn is_error(&self) -> bool {
        *self != Self::NoError
    }
}

impl From<u8> for ResponseCode {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::FormatError,
            2 => Self::ServerFailure,
            3 => Self::NameError,
            4 => Self::NotImplemented,
            5 => Self::Refused,
            other => Self::Other(other),
        }
    }
}

impl Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => f.write_str("No error"),
            Self::FormatError => {
                f.write_str("Format error: the name server was unable to interpret the query")
            }
            Self::ServerFailure => f.write_str(
                "Server failure: the name server was unable to process this query due to a problem with the name server",
            ),
            Self::NameError => f.write_str(
                "Name error: the domain name referenced in the query does not exist",
            ),
            Self::NotImplemented => f.write_str(
                "Not implemented: the name server does not support the requested kind of query",
            ),
            Self::Refused => f.write_str(
                "Refused: the name server refuses to perform the requested operation for policy reasons",
            ),
            Self::Other(code) => write!(f, "Unknown response code {code}"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub flags: Flags,
    pub num_questions: u16,
    pub num_answers: u16,
    pub num_authorities: u16,
    pub num_additionals: u16,
}

impl Header {
    pub fn new(id: u16, flags: Flags) -> Self {
        Self {
            id,
            flags,
            ..Default::default()
        }
    }

    pub fn authoritative(&self) -> bool {
        self.flags.aa()
    }
}

impl Networkable for Header {
    #[instrument(level = "trace", skip_all)]
    fn to_bytes(&self) -> Bytes {
        let mut ret = BytesMut::with_capacity(12);
        ret.put_u16(self.id);
        ret.put_u16(self.flags.bits());
        ret.put_u16(self.num_questions);
        ret.put_u16(self.num_answers);
        ret.put_u16(self.num_authorities);
        ret.put_u16(self.num_additionals);

        ret.into()
    }

    #[instrument(level = "trace", skip_all)]
    fn from_bytes(bytes: &mut Cursor<&[u8]>) -> Result<Self, DnsError> {
        if bytes.remaining() < 12 {
            warn!(remaining = bytes.remaining(), "insufficient bytes for header");
            return Err(DnsError::malformed(bytes.position(), "truncated header"));
        }

        let id = bytes.get_u16();
        let flags = Flags::from_bytes(bytes)?;
        let num_questions = bytes.get_u16();
        let num_answers = bytes.get_u16();
        let num_authorities = bytes.get_u16();
        let num_additionals = bytes.get_u16();

        Ok(Self {
            id,
            flags,
            num_questions,
            num_answers,
            num_authorities,
            num_additionals,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn query_flags_only_set_recursion_desired() {
        assert_eq!(Flags::query().bits(), 0x0100);
    }

    #[test]
    fn reads_header_fields_in_order() {
        let data = [
            0xbe, 0xef, 0x85, 0x83, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04,
        ];
        let header = Header::from_bytes(&mut Cursor::new(&data[..])).unwrap();

        assert_eq!(header.id, 0xbeef);
        assert!(header.flags.qr());
        assert!(header.authoritative());
        assert!(header.flags.rd());
        assert_eq!(header.flags.response_code(), ResponseCode::NameError);
        assert_eq!(header.num_questions, 1);
        assert_eq!(header.num_answers, 2);
        assert_eq!(header.num_authorities, 3);
        assert_eq!(header.num_additionals, 4);
        assert_eq!(&header.to_bytes()[..], &data[..]);
    }

    #[test]
    fn short_header_is_malformed() {
        let data = [0u8; 11];
        let err = Header::from_bytes(&mut Cursor::new(&data[..])).unwrap_err();
        assert!(matches!(err, DnsError::Malformed { offset: 0, .. }));
    }

    #[test]
    fn unknown_rcode_is_preserved() {
        let mut flags = Flags::default();
        flags.set_rcode(9);
        assert_eq!(flags.response_code(), ResponseCode::Other(9));
        assert_eq!(flags.response_code().to_string(), "Unknown response code 9");
    }
}
