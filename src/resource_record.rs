use std::io::Cursor;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::instrument;

use super::{Name, Networkable};
use crate::{ensure_remaining, DnsError, RecordType};

mod record_data;
pub use record_data::RecordData;

// TYPE, CLASS, TTL, RDLENGTH
const FIXED_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: Name,
    pub type_: u16,
    pub class: u16,
    pub ttl: u32,
    pub rd_length: u16,
    pub data: RecordData,
}

impl ResourceRecord {
    pub fn new(name: Name, ttl: u32, data: RecordData) -> Self {
        Self {
            name,
            type_: data.type_code(),
            class: 1,
            ttl,
            rd_length: data.to_bytes().len() as u16,
            data,
        }
    }

    pub fn record_type(&self) -> Option<RecordType> {
        RecordType::try_from(self.type_).ok()
    }
}

impl Networkable for ResourceRecord {
    #[instrument(level = "trace", skip_all)]
    fn to_bytes(&self) -> Bytes {
        let mut ret = BytesMut::new();
        ret.extend_from_slice(&self.name.to_bytes());
        ret.put_u16(self.type_);
        ret.put_u16(self.class);
        ret.put_u32(self.ttl);
        let data = self.data.to_bytes();
        ret.put_u16(data.len() as u16);
        ret.extend_from_slice(&data);

        ret.into()
    }

    #[instrument(level = "trace", skip_all)]
    fn from_bytes(bytes: &mut Cursor<&[u8]>) -> Result<Self, DnsError> {
        let name = Name::from_bytes(bytes)?;

        ensure_remaining(bytes, FIXED_LEN, "truncated record header")?;
        let type_ = bytes.get_u16();
        let class = bytes.get_u16();
        let ttl = bytes.get_u32();
        let rd_length = bytes.get_u16();

        ensure_remaining(bytes, rd_length as usize, "rdata runs past end of message")?;
        let rdata_start = bytes.position();

        let data = RecordData::from_bytes(type_, rd_length, bytes)?;

        // RDLENGTH decides where the next record starts, not the name reader.
        bytes.set_position(rdata_start + rd_length as u64);

        Ok(Self {
            name,
            type_,
            class,
            ttl,
            rd_length,
            data,
        })
    }
}
