//! Turns a decoded reply into the lines shown to the user.

use tracing::warn;

use crate::{DnsError, Message, RecordData, ResourceRecord};

const SEP: &str = "    ";

pub const NOT_FOUND: &str = "NOTFOUND";

pub fn render(message: &Message) -> Vec<String> {
    if let Err(err) = message.check_response_code() {
        return vec![format!("ERROR{SEP}{err}")];
    }

    if message.header.num_answers == 0 {
        return vec![NOT_FOUND.to_owned()];
    }

    let auth = if message.header.authoritative() {
        "auth"
    } else {
        "nonauth"
    };

    let mut lines = Vec::with_capacity(message.answers.len() + message.additionals.len() + 2);

    lines.push(format!(
        "***Answer Section ({} records)***",
        message.answers.len()
    ));
    lines.extend(message.answers.iter().map(|r| render_record(r, auth)));

    if message.header.num_additionals > 0 {
        lines.push(format!(
            "***Additional Section ({} records)***",
            message.additionals.len()
        ));
        lines.extend(message.additionals.iter().map(|r| render_record(r, auth)));
    }

    lines
}

pub fn render_record(record: &ResourceRecord, auth: &str) -> String {
    let ttl = record.ttl;

    match &record.data {
        RecordData::A(addr) => format!("A{SEP}{addr}{SEP}{ttl}{SEP}{auth}"),
        RecordData::Ns(name) => format!("NS{SEP}{name}{SEP}{ttl}{SEP}{auth}"),
        RecordData::Cname(name) => format!("CNAME{SEP}{name}{SEP}{ttl}{SEP}{auth}"),
        RecordData::Mx {
            preference,
            exchange,
        } => format!("MX{SEP}{exchange}{SEP}{preference}{SEP}{ttl}{SEP}{auth}"),
        RecordData::Unsupported { type_, data } => {
            warn!(name = %record.name, "{}", DnsError::UnsupportedRecordType(*type_));
            let hex = hex::encode(data);
            format!("TYPE{type_}{SEP}{hex}{SEP}{ttl}{SEP}{auth}")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use bytes::Bytes;

    use super::*;
    use crate::{Flags, Header, Name, Question, RecordType};

    fn reply(aa: bool, rcode: u8) -> Message {
        let mut flags = Flags::query();
        flags.set_qr(true);
        flags.set_aa(aa);
        flags.set_rcode(rcode);

        let mut message = Message::new(Header::new(1, flags));
        message.add_question(Question::new(
            Name::parse("example.com").unwrap(),
            RecordType::A,
        ));
        message
    }

    fn record(data: RecordData) -> ResourceRecord {
        ResourceRecord::new(Name::parse("example.com").unwrap(), 300, data)
    }

    #[test]
    fn empty_answer_is_not_found() {
        assert_eq!(render(&reply(true, 0)), ["NOTFOUND"]);
    }

    #[test]
    fn name_error_wins_over_answers() {
        let mut message = reply(false, 3);
        message.add_answer(record(RecordData::A(Ipv4Addr::new(1, 2, 3, 4))));

        let lines = render(&message);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ERROR    Name error"));
    }

    #[test]
    fn every_rcode_has_text() {
        for (rcode, text) in [
            (1, "Format error"),
            (2, "Server failure"),
            (4, "Not implemented"),
            (5, "Refused"),
            (11, "Unknown response code 11"),
        ] {
            let lines = render(&reply(false, rcode));
            assert!(lines[0].contains(text), "{}", lines[0]);
        }
    }

    #[test]
    fn authoritative_a_record() {
        let mut message = reply(true, 0);
        message.add_answer(record(RecordData::A(Ipv4Addr::new(93, 184, 216, 34))));

        assert_eq!(
            render(&message),
            [
                "***Answer Section (1 records)***",
                "A    93.184.216.34    300    auth",
            ]
        );
    }

    #[test]
    fn mx_record_lists_exchange_then_preference() {
        let mut message = reply(false, 0);
        message.add_answer(record(RecordData::Mx {
            preference: 10,
            exchange: Name::parse("mail.example.com").unwrap(),
        }));

        assert_eq!(
            render(&message)[1],
            "MX    mail.example.com    10    300    nonauth"
        );
    }

    #[test]
    fn additional_section_follows_answers() {
        let mut message = reply(false, 0);
        message.add_answer(record(RecordData::Ns(Name::parse("ns1.example.com").unwrap())));
        message.add_answer(record(RecordData::Cname(
            Name::parse("www.example.com").unwrap(),
        )));
        message.add_additional(ResourceRecord::new(
            Name::parse("ns1.example.com").unwrap(),
            60,
            RecordData::A(Ipv4Addr::new(10, 0, 0, 1)),
        ));

        assert_eq!(
            render(&message),
            [
                "***Answer Section (2 records)***",
                "NS    ns1.example.com    300    nonauth",
                "CNAME    www.example.com    300    nonauth",
                "***Additional Section (1 records)***",
                "A    10.0.0.1    60    nonauth",
            ]
        );
    }

    #[test]
    fn unsupported_record_is_rendered_as_hex() {
        let mut message = reply(false, 0);
        message.add_answer(record(RecordData::Unsupported {
            type_: 16,
            data: Bytes::from_static(b"\x02hi"),
        }));
        message.add_answer(record(RecordData::A(Ipv4Addr::new(1, 1, 1, 1))));

        let lines = render(&message);
        assert_eq!(lines[1], "TYPE16    026869    300    nonauth");
        assert_eq!(lines[2], "A    1.1.1.1    300    nonauth");
    }
}
