use std::io::Cursor;

use bytes::{Buf, Bytes};

mod error;
pub use error::DnsError;

mod header;
pub use header::{Flags, Header, ResponseCode};

mod name;
pub use name::Name;

mod message;
pub use message::{encode_query, Message};

mod question;
pub use question::Question;

mod resource_record;
pub use resource_record::{RecordData, ResourceRecord};

mod record_type;
pub use record_type::RecordType;

pub mod render;

pub mod transport;

/// Wire encoding shared by every part of a message.
///
/// `from_bytes` is always handed a cursor over the *whole* message so that
/// compression pointers can be followed back into earlier sections.
pub trait Networkable: Sized {
    fn to_bytes(&self) -> Bytes;

    fn from_bytes(bytes: &mut Cursor<&[u8]>) -> Result<Self, DnsError>;
}

pub(crate) fn ensure_remaining(
    bytes: &Cursor<&[u8]>,
    needed: usize,
    reason: &'static str,
) -> Result<(), DnsError> {
    if bytes.remaining() < needed {
        return Err(DnsError::malformed(bytes.position(), reason));
    }

    Ok(())
}
