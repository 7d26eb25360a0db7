//! Typed value encoding.
//!
//! Every stored value is encoded as:
//!
//! ```text
//! | tag (1) | payload (n) | expire_at (4, LE) |
//! ```
//!
//! `expire_at` is seconds since the Unix epoch, `0` meaning never. Text and
//! raw bytes share the [`ValueType::Bytes`] tag; text readers validate UTF-8.

use crate::error::{StoreError, StoreResult};
use std::time::{SystemTime, UNIX_EPOCH};

/// Size of the expiration trailer.
pub const EXPIRE_SIZE: usize = 4;

/// Smallest valid encoding: tag plus trailer.
pub const MIN_ENCODED_SIZE: usize = 1 + EXPIRE_SIZE;

/// Type tag of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    /// `bool`, one byte.
    Bool = 1,
    /// `i32`.
    I32 = 2,
    /// `u32`.
    U32 = 3,
    /// `i64`.
    I64 = 4,
    /// `u64`.
    U64 = 5,
    /// `f32`.
    F32 = 6,
    /// `f64`.
    F64 = 7,
    /// Text or raw bytes.
    Bytes = 8,
}

impl ValueType {
    /// Parses a tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => Self::Bool,
            2 => Self::I32,
            3 => Self::U32,
            4 => Self::I64,
            5 => Self::U64,
            6 => Self::F32,
            7 => Self::F64,
            8 => Self::Bytes,
            _ => return None,
        })
    }
}

/// A fixed-size value type the store can hold.
pub trait Scalar: Copy + Sized {
    /// Tag written for this type.
    const TYPE: ValueType;

    /// Appends the little-endian payload to `out`.
    fn write_payload(self, out: &mut Vec<u8>);

    /// Parses a payload, `None` if its length is wrong.
    fn read_payload(payload: &[u8]) -> Option<Self>;
}

impl Scalar for bool {
    const TYPE: ValueType = ValueType::Bool;

    fn write_payload(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }

    fn read_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            [b] => Some(*b != 0),
            _ => None,
        }
    }
}

macro_rules! impl_scalar {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const TYPE: ValueType = ValueType::$tag;

                fn write_payload(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_payload(payload: &[u8]) -> Option<Self> {
                    payload.try_into().ok().map(<$ty>::from_le_bytes)
                }
            }
        )*
    };
}

impl_scalar! {
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

/// Encodes a scalar value.
pub fn encode_scalar<T: Scalar>(value: T, expire_at: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(MIN_ENCODED_SIZE + 8);
    out.push(T::TYPE as u8);
    value.write_payload(&mut out);
    out.extend_from_slice(&expire_at.to_le_bytes());
    out
}

/// Encodes a byte or text value.
pub fn encode_bytes(payload: &[u8], expire_at: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(MIN_ENCODED_SIZE + payload.len());
    out.push(ValueType::Bytes as u8);
    out.extend_from_slice(payload);
    out.extend_from_slice(&expire_at.to_le_bytes());
    out
}

/// A borrowed view over an encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedValue<'a> {
    /// Type tag.
    pub kind: ValueType,
    /// Raw payload.
    pub payload: &'a [u8],
    /// Expiration time in epoch seconds, `0` meaning never.
    pub expire_at: u32,
}

impl<'a> EncodedValue<'a> {
    /// Parses an encoded value.
    pub fn parse(bytes: &'a [u8]) -> StoreResult<Self> {
        if bytes.len() < MIN_ENCODED_SIZE {
            return Err(StoreError::corrupted(format!(
                "value too short: {} bytes",
                bytes.len()
            )));
        }
        let kind = ValueType::from_tag(bytes[0])
            .ok_or_else(|| StoreError::corrupted(format!("unknown value tag {}", bytes[0])))?;
        let split = bytes.len() - EXPIRE_SIZE;
        let mut trailer = [0u8; EXPIRE_SIZE];
        trailer.copy_from_slice(&bytes[split..]);
        Ok(Self {
            kind,
            payload: &bytes[1..split],
            expire_at: u32::from_le_bytes(trailer),
        })
    }

    /// Returns true if the value has expired at `now`.
    pub fn is_expired(&self, now: u32) -> bool {
        self.expire_at != 0 && self.expire_at <= now
    }

    /// Reads the payload as `T`.
    pub fn scalar<T: Scalar>(&self) -> StoreResult<T> {
        if self.kind != T::TYPE {
            return Err(StoreError::TypeMismatch {
                stored: self.kind,
                requested: T::TYPE,
            });
        }
        T::read_payload(self.payload)
            .ok_or_else(|| StoreError::corrupted(format!("bad {:?} payload", self.kind)))
    }

    /// Reads the payload as raw bytes.
    pub fn bytes(&self) -> StoreResult<&'a [u8]> {
        if self.kind != ValueType::Bytes {
            return Err(StoreError::TypeMismatch {
                stored: self.kind,
                requested: ValueType::Bytes,
            });
        }
        Ok(self.payload)
    }
}

/// Returns a copy of `encoded` with its expiration replaced.
pub fn with_expire(encoded: &[u8], expire_at: u32) -> Vec<u8> {
    let mut out = encoded.to_vec();
    if out.len() >= MIN_ENCODED_SIZE {
        let split = out.len() - EXPIRE_SIZE;
        out[split..].copy_from_slice(&expire_at.to_le_bytes());
    }
    out
}

/// Current time in epoch seconds.
pub fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Absolute expiration for a duration in seconds, `0` meaning never.
pub fn expire_at_from_duration(seconds: u32) -> u32 {
    if seconds == 0 {
        0
    } else {
        now_secs().saturating_add(seconds)
    }
}
