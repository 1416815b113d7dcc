//! Framed binary packet encoding and decoding.
//!
//! Wire format: an 8-byte little-endian header (`main_type: u16`,
//! `sub_type: u16`, `body_length: u32`), followed by `body_length` bytes of
//! payload, followed by zero padding so the body occupies a multiple of 8
//! bytes on the wire.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::CodecError;

pub const HEADER_LEN: usize = 8;
pub const MAX_BODY_LEN: u32 = 10 * 1024 * 1024;

/// Packet category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainType {
    Network,
    Game,
    Error,
}

impl MainType {
    fn code(self) -> u16 {
        match self {
            MainType::Network => 1,
            MainType::Game => 2,
            MainType::Error => 3,
        }
    }

    fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(MainType::Network),
            2 => Some(MainType::Game),
            3 => Some(MainType::Error),
            _ => None,
        }
    }

    /// The valid `sub_type` range for this category, per the wire contract.
    fn sub_range(self) -> std::ops::RangeInclusive<u16> {
        match self {
            MainType::Network => 101..=199,
            MainType::Game => 201..=299,
            MainType::Error => 301..=399,
        }
    }
}

/// Network-category sub types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkSubType {
    Join = 101,
    Left = 102,
    Close = 103,
}

impl NetworkSubType {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            101 => Some(NetworkSubType::Join),
            102 => Some(NetworkSubType::Left),
            103 => Some(NetworkSubType::Close),
            _ => None,
        }
    }
}

/// Game-category sub types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameSubType {
    RoomCreate = 201,
    Countdown = 202,
    GameStart = 203,
    PlayerMoved = 204,
    PlayerComeInMap = 205,
    PlayerComeOutMap = 206,
    PlayerFinished = 207,
    GameEnd = 208,
}

impl GameSubType {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            201 => Some(GameSubType::RoomCreate),
            202 => Some(GameSubType::Countdown),
            203 => Some(GameSubType::GameStart),
            204 => Some(GameSubType::PlayerMoved),
            205 => Some(GameSubType::PlayerComeInMap),
            206 => Some(GameSubType::PlayerComeOutMap),
            207 => Some(GameSubType::PlayerFinished),
            208 => Some(GameSubType::GameEnd),
            _ => None,
        }
    }
}

/// Error-category sub types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSubType {
    Unknown = 301,
}

/// A decoded 8-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub main_type: MainType,
    pub sub_type: u16,
    pub body_length: u32,
}

/// `ceil(body_length / 8) * 8`: how many body+padding bytes follow the header.
pub fn body_padded_length(body_length: u32) -> u32 {
    (body_length + 7) / 8 * 8
}

/// Encode a packet: header, body, then zero padding to a multiple of 8.
///
/// # Panics
///
/// Panics if `body.len()` exceeds [`MAX_BODY_LEN`]; callers are expected to
/// have validated the body size before reaching the codec (see the framer in
/// [`crate::connection`]).
pub fn encode(main: MainType, sub: u16, body: &[u8]) -> Vec<u8> {
    assert!(
        body.len() as u64 <= MAX_BODY_LEN as u64,
        "body exceeds the codec's frame cap"
    );

    let body_length = body.len() as u32;
    let padded = body_padded_length(body_length) as usize;

    let mut out = Vec::with_capacity(HEADER_LEN + padded);
    out.resize(HEADER_LEN, 0);
    LittleEndian::write_u16(&mut out[0..2], main.code());
    LittleEndian::write_u16(&mut out[2..4], sub);
    LittleEndian::write_u32(&mut out[4..8], body_length);

    out.extend_from_slice(body);
    out.resize(HEADER_LEN + padded, 0);
    out
}

/// Decode an 8-byte header, rejecting unknown main types and out-of-range
/// sub types.
pub fn decode_header(bytes: &[u8; HEADER_LEN]) -> Result<Header, CodecError> {
    let main_code = LittleEndian::read_u16(&bytes[0..2]);
    let sub_type = LittleEndian::read_u16(&bytes[2..4]);
    let body_length = LittleEndian::read_u32(&bytes[4..8]);

    let main_type = MainType::from_code(main_code).ok_or(CodecError::UnknownMainType(main_code))?;

    if !main_type.sub_range().contains(&sub_type) {
        return Err(CodecError::SubTypeOutOfRange {
            main: main_code,
            sub: sub_type,
        });
    }

    if body_length > MAX_BODY_LEN {
        return Err(CodecError::BodyTooLarge(body_length));
    }

    Ok(Header {
        main_type,
        sub_type,
        body_length,
    })
}
