use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use tracing::{debug, instrument, warn};

use super::{Header, Name, Networkable, Question, ResourceRecord};
use crate::{DnsError, Flags, RecordType, ResponseCode};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authorities: Vec<ResourceRecord>,
    pub additionals: Vec<ResourceRecord>,
}

impl Message {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            ..Default::default()
        }
    }

    /// A recursion-desired query for a single question.
    pub fn query(id: u16, name: Name, type_: RecordType) -> Self {
        let mut message = Self::new(Header::new(id, Flags::query()));
        message.add_question(Question::new(name, type_));
        message
    }

    pub fn add_question(&mut self, question: Question) {
        self.header.num_questions += 1;
        self.questions.push(question)
    }

    pub fn add_answer(&mut self, answer: ResourceRecord) {
        self.header.num_answers += 1;
        self.answers.push(answer)
    }

    pub fn add_authority(&mut self, authority: ResourceRecord) {
        self.header.num_authorities += 1;
        self.authorities.push(authority)
    }

    pub fn add_additional(&mut self, additional: ResourceRecord) {
        self.header.num_additionals += 1;
        self.additionals.push(additional)
    }

    pub fn response_code(&self) -> ResponseCode {
        self.header.flags.response_code()
    }

    /// Turns a non-zero RCODE into [`DnsError::Server`].
    pub fn check_response_code(&self) -> Result<(), DnsError> {
        match self.response_code() {
            ResponseCode::NoError => Ok(()),
            code => Err(DnsError::Server(code)),
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DnsError> {
        Self::from_bytes(&mut Cursor::new(buf))
    }

    /// Decodes a reply to the query with id `expected_id`.
    pub fn decode_response(buf: &[u8], expected_id: u16) -> Result<Self, DnsError> {
        let message = Self::decode(buf)?;

        if message.header.id != expected_id {
            return Err(DnsError::IdMismatch {
                expected: expected_id,
                actual: message.header.id,
            });
        }
        if !message.header.flags.qr() {
            return Err(DnsError::malformed(2, "reply is not marked as a response"));
        }
        if message.header.flags.tc() {
            warn!("response was truncated; only the UDP portion is available");
        }

        Ok(message)
    }
}

/// Builds the wire form of a query with a fresh random transaction id.
pub fn encode_query(name: &str, type_: RecordType) -> Result<Bytes, DnsError> {
    let name = Name::parse(name)?;
    let id = rand::random::<u16>();

    Ok(Message::query(id, name, type_).to_bytes())
}

fn read_records(
    bytes: &mut Cursor<&[u8]>,
    count: u16,
    section: &'static str,
) -> Result<Vec<ResourceRecord>, DnsError> {
    let mut records = Vec::new();
    for index in 0..count as usize {
        let record = ResourceRecord::from_bytes(bytes).map_err(|source| DnsError::InRecord {
            section,
            index,
            source: Box::new(source),
        })?;
        records.push(record);
    }

    Ok(records)
}

impl Networkable for Message {
    #[instrument(level = "debug", skip_all)]
    fn to_bytes(&self) -> Bytes {
        let mut ret = BytesMut::new();
        ret.extend_from_slice(&self.header.to_bytes());

        for question in self.questions.iter() {
            ret.extend_from_slice(&question.to_bytes())
        }

        for record in self
            .answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.additionals.iter())
        {
            ret.extend_from_slice(&record.to_bytes())
        }

        ret.into()
    }

    #[instrument(level = "debug", skip_all)]
    fn from_bytes(bytes: &mut Cursor<&[u8]>) -> Result<Self, DnsError> {
        let header = Header::from_bytes(bytes)?;
        debug!(
            id = header.id,
            questions = header.num_questions,
            answers = header.num_answers,
            authorities = header.num_authorities,
            additionals = header.num_additionals,
            "decoding message"
        );

        let mut questions = Vec::new();
        for _ in 0..header.num_questions {
            questions.push(Question::from_bytes(bytes)?);
        }

        let answers = read_records(bytes, header.num_answers, "answer")?;
        let authorities = read_records(bytes, header.num_authorities, "authority")?;
        let additionals = read_records(bytes, header.num_additionals, "additional")?;

        Ok(Self {
            header,
            questions,
            answers,
            authorities,
            additionals,
        })
    }
}
