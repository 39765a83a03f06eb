//! Protocol codec for encoding/decoding packets
//!
//! All packet kinds have a constant size, so decoding is a matter of checking
//! the length, the magic cookie and the type tag, then reading the fields in
//! order. Decoders never attempt partial recovery.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;

use super::{
    Card, CardSlot, Decision, Offer, Payload, Request, RoundResult, Suit, CARD_SIZE,
    DECISION_SIZE, EMPTY_CARD, MAGIC_COOKIE, MSG_TYPE_OFFER, MSG_TYPE_PAYLOAD,
    MSG_TYPE_REQUEST, NAME_LEN, OFFER_SIZE, PAYLOAD_SIZE, REQUEST_SIZE,
};

/// Packet kinds, used for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Offer,
    Request,
    Payload,
}

impl PacketKind {
    pub fn type_tag(&self) -> u8 {
        match self {
            PacketKind::Offer => MSG_TYPE_OFFER,
            PacketKind::Request => MSG_TYPE_REQUEST,
            PacketKind::Payload => MSG_TYPE_PAYLOAD,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            PacketKind::Offer => OFFER_SIZE,
            PacketKind::Request => REQUEST_SIZE,
            PacketKind::Payload => PAYLOAD_SIZE,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Offer => f.write_str("offer"),
            PacketKind::Request => f.write_str("request"),
            PacketKind::Payload => f.write_str("payload"),
        }
    }
}

/// Errors raised while decoding a received packet
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid {kind} size: {actual} bytes (expected {expected})")]
    InvalidLength {
        kind: PacketKind,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid magic cookie: {0:#010x}")]
    InvalidCookie(u32),

    #[error("Unexpected type tag {found:#04x} for {kind} packet")]
    UnexpectedType { kind: PacketKind, found: u8 },

    #[error("Invalid result code: {0:#04x}")]
    InvalidResult(u8),

    #[error("Invalid card: {0}")]
    InvalidCard(#[from] EncodingError),
}

/// Errors raised while converting card values to or from their 3-byte form
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Rank out of range: {0} (expected 1..=13)")]
    InvalidRank(u16),

    #[error("Suit out of range: {0} (expected 0..=3)")]
    InvalidSuit(u8),

    #[error("Card must be 3 bytes, got {0}")]
    InvalidCardLength(usize),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Pack a name into the fixed 32-byte field, truncating and zero-padding
pub fn pack_name(name: &str) -> [u8; NAME_LEN] {
    let mut field = [0u8; NAME_LEN];
    let raw = name.as_bytes();
    let len = raw.len().min(NAME_LEN);
    field[..len].copy_from_slice(&raw[..len]);
    field
}

/// Unpack a name field, stopping at the first zero byte
///
/// Invalid UTF-8 sequences are dropped rather than reported, so a name
/// truncated in the middle of a multi-byte character still decodes.
pub fn unpack_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let mut rest = &field[..end];
    let mut name = String::with_capacity(end);

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                name.push_str(valid);
                return name;
            }
            Err(e) => {
                let (valid, invalid) = rest.split_at(e.valid_up_to());
                name.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let skip = e.error_len().unwrap_or(invalid.len());
                rest = &invalid[skip..];
            }
        }
    }
}

/// Encode raw card values, validating their ranges
pub fn encode_card(rank: u16, suit: u8) -> Result<[u8; CARD_SIZE], EncodingError> {
    if !(u16::from(Card::MIN_RANK)..=u16::from(Card::MAX_RANK)).contains(&rank) {
        return Err(EncodingError::InvalidRank(rank));
    }
    if Suit::from_u8(suit).is_none() {
        return Err(EncodingError::InvalidSuit(suit));
    }

    let [rank_hi, rank_lo] = rank.to_be_bytes();
    Ok([rank_hi, rank_lo, suit])
}

/// Decode exactly 3 bytes into a card
pub fn decode_card(bytes: &[u8]) -> Result<Card, EncodingError> {
    if bytes.len() != CARD_SIZE {
        return Err(EncodingError::InvalidCardLength(bytes.len()));
    }

    let rank = u16::from_be_bytes([bytes[0], bytes[1]]);
    let suit = Suit::from_u8(bytes[2]).ok_or(EncodingError::InvalidSuit(bytes[2]))?;

    u8::try_from(rank)
        .ok()
        .and_then(|r| Card::new(r, suit))
        .ok_or(EncodingError::InvalidRank(rank))
}

fn put_header(buf: &mut BytesMut, kind: PacketKind) {
    buf.put_u32(MAGIC_COOKIE);
    buf.put_u8(kind.type_tag());
}

/// Check size, cookie and type tag, returning the bytes after the header
fn check_header(data: &[u8], kind: PacketKind) -> ProtocolResult<&[u8]> {
    if data.len() != kind.size() {
        return Err(ProtocolError::InvalidLength {
            kind,
            expected: kind.size(),
            actual: data.len(),
        });
    }

    let mut buf = data;
    let cookie = buf.get_u32();
    if cookie != MAGIC_COOKIE {
        return Err(ProtocolError::InvalidCookie(cookie));
    }

    let found = buf.get_u8();
    if found != kind.type_tag() {
        return Err(ProtocolError::UnexpectedType { kind, found });
    }

    Ok(buf)
}

pub fn encode_offer(offer: &Offer) -> Bytes {
    let mut buf = BytesMut::with_capacity(OFFER_SIZE);
    put_header(&mut buf, PacketKind::Offer);
    buf.put_u16(offer.tcp_port);
    buf.put_slice(&pack_name(&offer.server_name));
    buf.freeze()
}

pub fn decode_offer(data: &[u8]) -> ProtocolResult<Offer> {
    let mut body = check_header(data, PacketKind::Offer)?;
    let tcp_port = body.get_u16();

    Ok(Offer {
        tcp_port,
        server_name: unpack_name(body),
    })
}

pub fn encode_request(request: &Request) -> Bytes {
    let mut buf = BytesMut::with_capacity(REQUEST_SIZE);
    put_header(&mut buf, PacketKind::Request);
    buf.put_u8(request.rounds);
    buf.put_slice(&pack_name(&request.client_name));
    buf.freeze()
}

pub fn decode_request(data: &[u8]) -> ProtocolResult<Request> {
    let mut body = check_header(data, PacketKind::Request)?;
    let rounds = body.get_u8();

    Ok(Request {
        rounds,
        client_name: unpack_name(body),
    })
}

pub fn encode_payload(payload: &Payload) -> ProtocolResult<Bytes> {
    let card = match payload.card {
        CardSlot::Dealt(card) => encode_card(card.rank().into(), card.suit() as u8)?,
        CardSlot::Empty => EMPTY_CARD,
    };

    let mut buf = BytesMut::with_capacity(PAYLOAD_SIZE);
    put_header(&mut buf, PacketKind::Payload);
    buf.put_slice(&payload.decision.to_bytes());
    buf.put_u8(payload.result as u8);
    buf.put_slice(&card);
    Ok(buf.freeze())
}

pub fn decode_payload(data: &[u8]) -> ProtocolResult<Payload> {
    let mut body = check_header(data, PacketKind::Payload)?;

    let mut decision = [0u8; DECISION_SIZE];
    body.copy_to_slice(&mut decision);

    let code = body.get_u8();
    let result = RoundResult::from_u8(code).ok_or(ProtocolError::InvalidResult(code))?;

    let card = if body == EMPTY_CARD {
        CardSlot::Empty
    } else {
        CardSlot::Dealt(decode_card(body)?)
    };

    Ok(Payload {
        decision: Decision::from_bytes(decision),
        result,
        card,
    })
}

/// Decode only the decision field of a client payload
///
/// The dealer reads nothing else from client packets, so the result and
/// card fields are not validated here.
pub fn decode_decision(data: &[u8]) -> ProtocolResult<Decision> {
    let mut body = check_header(data, PacketKind::Payload)?;

    let mut decision = [0u8; DECISION_SIZE];
    body.copy_to_slice(&mut decision);
    Ok(Decision::from_bytes(decision))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_cards() -> impl Iterator<Item = Card> {
        Suit::ALL
            .into_iter()
            .flat_map(|suit| (1..=13).filter_map(move |rank| Card::new(rank, suit)))
    }

    #[test]
    fn test_card_roundtrip() {
        for card in all_cards() {
            let raw = encode_card(card.rank().into(), card.suit() as u8).unwrap();
            assert_eq!(decode_card(&raw).unwrap(), card);
        }
    }

    #[test]
    fn test_card_layout() {
        assert_eq!(encode_card(12, 3).unwrap(), [0x00, 0x0c, 0x03]);
        let queen = Card::new(12, Suit::Spades).unwrap();
        let bytes = encode_payload(&Payload::card(queen, RoundResult::NotOver)).unwrap();
        assert_eq!(&bytes[11..], &[0x00, 0x0c, 0x03]);
    }

    #[test]
    fn test_encode_card_rejects_out_of_range() {
        assert_eq!(encode_card(0, 0), Err(EncodingError::InvalidRank(0)));
        assert_eq!(encode_card(14, 0), Err(EncodingError::InvalidRank(14)));
        assert_eq!(encode_card(5, 4), Err(EncodingError::InvalidSuit(4)));
    }

    #[test]
    fn test_decode_card_rejects_bad_input() {
        assert_eq!(
            decode_card(&[0, 1]),
            Err(EncodingError::InvalidCardLength(2))
        );
        assert_eq!(
            decode_card(&[0, 1, 0, 0]),
            Err(EncodingError::InvalidCardLength(4))
        );
        assert_eq!(decode_card(&[1, 1, 0]), Err(EncodingError::InvalidRank(257)));
        assert_eq!(decode_card(&[0, 0, 0]), Err(EncodingError::InvalidRank(0)));
    }

    #[test]
    fn test_offer_layout() {
        let offer = Offer {
            tcp_port: 0x1234,
            server_name: "Dealer".to_string(),
        };
        let bytes = encode_offer(&offer);

        assert_eq!(bytes.len(), OFFER_SIZE);
        assert_eq!(&bytes[..4], &[0xab, 0xcd, 0xdc, 0xba]);
        assert_eq!(bytes[4], MSG_TYPE_OFFER);
        assert_eq!(&bytes[5..7], &[0x12, 0x34]);
        assert_eq!(&bytes[7..13], b"Dealer");
        assert!(bytes[13..].iter().all(|&b| b == 0));

        assert_eq!(decode_offer(&bytes).unwrap(), offer);
    }

    #[test]
    fn test_request_roundtrip() {
        let request = Request {
            rounds: 255,
            client_name: "Team Rocket".to_string(),
        };
        let bytes = encode_request(&request);

        assert_eq!(bytes.len(), REQUEST_SIZE);
        assert_eq!(bytes[5], 255);
        assert_eq!(decode_request(&bytes).unwrap(), request);
    }

    #[test]
    fn test_payload_layout() {
        let card = Card::new(1, Suit::Diamonds).unwrap();
        let bytes = encode_payload(&Payload::card(card, RoundResult::Loss)).unwrap();

        assert_eq!(bytes.len(), PAYLOAD_SIZE);
        assert_eq!(bytes[4], MSG_TYPE_PAYLOAD);
        assert_eq!(&bytes[5..10], &[0; 5]);
        assert_eq!(bytes[10], 0x2);
        assert_eq!(&bytes[10..], &[0x2, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn test_payload_roundtrip() {
        let payloads = [
            Payload::decision(Decision::Hit),
            Payload::decision(Decision::Stand),
            Payload::decision(Decision::Unrecognized(*b"xxxxx")),
            Payload::card(Card::new(13, Suit::Clubs).unwrap(), RoundResult::NotOver),
            Payload::settlement(crate::protocol::RoundOutcome::Tie),
        ];

        for payload in payloads {
            let bytes = encode_payload(&payload).unwrap();
            assert_eq!(decode_payload(&bytes).unwrap(), payload);
        }
    }

    #[test]
    fn test_empty_card_slot() {
        let bytes =
            encode_payload(&Payload::settlement(crate::protocol::RoundOutcome::Win)).unwrap();
        assert_eq!(&bytes[11..], &EMPTY_CARD);

        let payload = decode_payload(&bytes).unwrap();
        assert_eq!(payload.card, CardSlot::Empty);
    }

    #[test]
    fn test_decoders_reject_wrong_length() {
        let offer = encode_offer(&Offer {
            tcp_port: 1,
            server_name: "s".into(),
        });
        let request = encode_request(&Request {
            rounds: 1,
            client_name: "c".into(),
        });
        let payload = encode_payload(&Payload::decision(Decision::Hit)).unwrap();

        assert!(matches!(
            decode_offer(&offer[..OFFER_SIZE - 1]),
            Err(ProtocolError::InvalidLength { kind: PacketKind::Offer, .. })
        ));
        let mut long_request = request.to_vec();
        long_request.push(0);
        assert!(matches!(
            decode_request(&long_request),
            Err(ProtocolError::InvalidLength { kind: PacketKind::Request, .. })
        ));
        assert!(matches!(
            decode_payload(&payload[..PAYLOAD_SIZE - 3]),
            Err(ProtocolError::InvalidLength { kind: PacketKind::Payload, .. })
        ));
        assert!(decode_payload(&[]).is_err());
    }

    #[test]
    fn test_decoders_reject_bad_cookie() {
        let mut offer = encode_offer(&Offer {
            tcp_port: 1,
            server_name: "s".into(),
        })
        .to_vec();
        let mut request = encode_request(&Request {
            rounds: 1,
            client_name: "c".into(),
        })
        .to_vec();
        let mut payload = encode_payload(&Payload::decision(Decision::Stand)).unwrap().to_vec();

        offer[0] ^= 0xff;
        request[3] ^= 0x01;
        payload[1] = 0;

        assert!(matches!(decode_offer(&offer), Err(ProtocolError::InvalidCookie(_))));
        assert!(matches!(decode_request(&request), Err(ProtocolError::InvalidCookie(_))));
        assert!(matches!(decode_payload(&payload), Err(ProtocolError::InvalidCookie(_))));
    }

    #[test]
    fn test_decoders_reject_wrong_type() {
        let mut offer = encode_offer(&Offer {
            tcp_port: 1,
            server_name: "s".into(),
        })
        .to_vec();
        offer[4] = MSG_TYPE_REQUEST;
        assert_eq!(
            decode_offer(&offer),
            Err(ProtocolError::UnexpectedType {
                kind: PacketKind::Offer,
                found: MSG_TYPE_REQUEST
            })
        );

        let mut request = encode_request(&Request {
            rounds: 1,
            client_name: "c".into(),
        })
        .to_vec();
        request[4] = MSG_TYPE_OFFER;
        assert!(matches!(
            decode_request(&request),
            Err(ProtocolError::UnexpectedType { .. })
        ));

        let mut payload = encode_payload(&Payload::decision(Decision::Hit)).unwrap().to_vec();
        payload[4] = 0x7;
        assert!(matches!(
            decode_payload(&payload),
            Err(ProtocolError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_payload_rejects_bad_result_and_card() {
        let mut payload = encode_payload(&Payload::decision(Decision::Hit)).unwrap().to_vec();
        payload[10] = 9;
        assert_eq!(decode_payload(&payload), Err(ProtocolError::InvalidResult(9)));

        let mut payload = encode_payload(&Payload::decision(Decision::Hit)).unwrap().to_vec();
        payload[11..].copy_from_slice(&[0, 20, 1]);
        assert_eq!(
            decode_payload(&payload),
            Err(ProtocolError::InvalidCard(EncodingError::InvalidRank(20)))
        );
    }

    #[test]
    fn test_decision_ignores_result_and_card() {
        let mut payload = encode_payload(&Payload::decision(Decision::Stand))
            .unwrap()
            .to_vec();
        payload[10] = 9;
        payload[11..].copy_from_slice(&[0xff, 0xff, 0xff]);

        assert!(decode_payload(&payload).is_err());
        assert_eq!(decode_decision(&payload), Ok(Decision::Stand));
    }

    #[test]
    fn test_decision_checks_header() {
        let mut payload = encode_payload(&Payload::decision(Decision::Hit))
            .unwrap()
            .to_vec();
        payload[0] = 0;
        assert!(matches!(
            decode_decision(&payload),
            Err(ProtocolError::InvalidCookie(_))
        ));
        assert!(matches!(
            decode_decision(&payload[..PAYLOAD_SIZE - 1]),
            Err(ProtocolError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_name_truncation() {
        let long = "abcdefghijklmnopqrstuvwxyz0123456789ABCD";
        assert_eq!(long.len(), 40);

        let field = pack_name(long);
        assert_eq!(&field[..], &long.as_bytes()[..NAME_LEN]);
        assert_eq!(unpack_name(&field), &long[..NAME_LEN]);
    }

    #[test]
    fn test_name_stops_at_first_zero() {
        let mut field = [b'x'; NAME_LEN];
        field[10] = 0;
        assert_eq!(unpack_name(&field), "xxxxxxxxxx");
    }

    #[test]
    fn test_name_drops_invalid_utf8() {
        // 31 ASCII bytes followed by a 2-byte character cut in half
        let name = format!("{}é", "a".repeat(31));
        let field = pack_name(&name);
        assert_eq!(unpack_name(&field), "a".repeat(31));

        let mut field = [0u8; NAME_LEN];
        field[..5].copy_from_slice(&[b'o', 0xff, b'k', 0xc3, b'!']);
        assert_eq!(unpack_name(&field), "ok!");
    }
}
