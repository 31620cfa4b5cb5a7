use std::io::Cursor;
use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::{ensure_remaining, DnsError, Name, Networkable, RecordType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Ns(Name),
    Cname(Name),
    Mx { preference: u16, exchange: Name },
    Unsupported { type_: u16, data: Bytes },
}

impl RecordData {
    /// Decodes `rd_length` bytes of RDATA at the cursor. Where the cursor ends
    /// up afterwards is unspecified.
    pub fn from_bytes(
        type_: u16,
        rd_length: u16,
        bytes: &mut Cursor<&[u8]>,
    ) -> Result<Self, DnsError> {
        ensure_remaining(bytes, rd_length as usize, "rdata runs past end of message")?;

        let start = bytes.position();
        let end = start + rd_length as u64;

        let type_ = match RecordType::try_from(type_) {
            Ok(type_) => type_,
            Err(err) => {
                debug!(%err, rd_length, "keeping raw rdata");
                let data = bytes.copy_to_bytes(rd_length as usize);
                return Ok(Self::Unsupported { type_, data });
            }
        };

        match type_ {
            RecordType::A => {
                if rd_length != 4 {
                    return Err(DnsError::malformed(start, "A rdata is not 4 bytes"));
                }
                Ok(Self::A(bytes.get_u32().into()))
            }
            RecordType::Ns => Ok(Self::Ns(read_bounded_name(bytes, end)?)),
            RecordType::Cname => Ok(Self::Cname(read_bounded_name(bytes, end)?)),
            RecordType::Mx => {
                if rd_length < 3 {
                    return Err(DnsError::malformed(start, "MX rdata too short"));
                }
                let preference = bytes.get_u16();
                let exchange = read_bounded_name(bytes, end)?;
                Ok(Self::Mx {
                    preference,
                    exchange,
                })
            }
        }
    }

    pub fn type_code(&self) -> u16 {
        match self {
            Self::A(_) => RecordType::A.to_int(),
            Self::Ns(_) => RecordType::Ns.to_int(),
            Self::Cname(_) => RecordType::Cname.to_int(),
            Self::Mx { .. } => RecordType::Mx.to_int(),
            Self::Unsupported { type_, .. } => *type_,
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::A(addr) => Bytes::copy_from_slice(&addr.octets()),
            Self::Ns(name) | Self::Cname(name) => name.to_bytes(),
            Self::Mx {
                preference,
                exchange,
            } => {
                let mut ret = BytesMut::new();
                ret.put_u16(*preference);
                ret.extend_from_slice(&exchange.to_bytes());
                ret.into()
            }
            Self::Unsupported { data, .. } => data.clone(),
        }
    }
}

fn read_bounded_name(bytes: &mut Cursor<&[u8]>, end: u64) -> Result<Name, DnsError> {
    let start = bytes.position();
    let name = Name::from_bytes(bytes)?;
    if bytes.position() > end {
        return Err(DnsError::malformed(start, "name runs past rdata"));
    }

    Ok(name)
}
