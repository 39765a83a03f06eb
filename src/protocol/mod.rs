//! Protocol module - Defines the wire protocol for blackjack-net
//!
//! Every packet is a fixed-size, big-endian structure starting with a
//! 4-byte magic cookie and a 1-byte type tag. There are no length prefixes:
//! both parties know the size of each packet kind in advance.
//!
//! - Offer   (UDP broadcast): cookie(4) | type(1) | tcp_port(2) | name(32)
//! - Request (TCP, once):     cookie(4) | type(1) | rounds(1)   | name(32)
//! - Payload (TCP, both):     cookie(4) | type(1) | decision(5) | result(1) | card(3)

mod message;
mod codec;

pub use message::*;
pub use codec::*;

/// Magic cookie leading every packet
pub const MAGIC_COOKIE: u32 = 0xabcd_dcba;

/// Type tag of an offer packet
pub const MSG_TYPE_OFFER: u8 = 0x2;

/// Type tag of a request packet
pub const MSG_TYPE_REQUEST: u8 = 0x3;

/// Type tag of a payload packet
pub const MSG_TYPE_PAYLOAD: u8 = 0x4;

/// Width of the fixed name field in offers and requests
pub const NAME_LEN: usize = 32;

/// Encoded card size
pub const CARD_SIZE: usize = 3;

/// Encoded decision tag size
pub const DECISION_SIZE: usize = 5;

/// Offer packet size: cookie(4) + type(1) + port(2) + name(32)
pub const OFFER_SIZE: usize = 4 + 1 + 2 + NAME_LEN;

/// Request packet size: cookie(4) + type(1) + rounds(1) + name(32)
pub const REQUEST_SIZE: usize = 4 + 1 + 1 + NAME_LEN;

/// Payload packet size: cookie(4) + type(1) + decision(5) + result(1) + card(3)
pub const PAYLOAD_SIZE: usize = 4 + 1 + DECISION_SIZE + 1 + CARD_SIZE;

/// Well-known UDP port offers are broadcast to
pub const DISCOVERY_PORT: u16 = 13122;

/// Decision tag sent by a client that wants another card
pub const DECISION_HIT: [u8; DECISION_SIZE] = *b"Hittt";

/// Decision tag sent by a client that stands
pub const DECISION_STAND: [u8; DECISION_SIZE] = *b"Stand";

/// Decision field of server-to-client payloads
pub const DECISION_FILLER: [u8; DECISION_SIZE] = [0; DECISION_SIZE];

/// Card field of a payload that carries no card
pub const EMPTY_CARD: [u8; CARD_SIZE] = [0; CARD_SIZE];
