//! The XDR (External Data Representation) module defines data structures and methods
//! for serializing/deserializing data according to RFC 4506 (previously RFC 1832).
//!
//! XDR provides a machine-independent binary representation, which is what lets an
//! NFS client written in one language interoperate with a server written in another.
//!
//! Every type that crosses the wire implements both `Serialize` and `Deserialize`.
//! The two are kept as separate traits (rather than one combined trait) because a
//! handful of types - notably `nfsstring` and the XDR primitives below - are easiest
//! to write when encoding and decoding don't have to share a single `impl` block.

// Allow unused code since we implement the complete RFC specification.
#![allow(dead_code)]

use std::io::{Read, Write};

use byteorder::BigEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};

pub mod mount;
pub mod nfs3;
pub mod portmap;
pub mod rpc;

/// Type alias for the standard endianness used in XDR serialization (Big Endian).
pub type XDREndian = BigEndian;

/// Upper bound on a single opaque/array length prefix the decoder will honor.
///
/// A corrupted or hostile length field would otherwise cause an allocation of that
/// size before the subsequent `read_exact` has a chance to fail on short input. This
/// is larger than any legitimate NFSv3 payload (the largest reasonable `maxcount` a
/// server will ever request is in the low megabytes).
const MAX_OPAQUE_LEN: u32 = 64 * 1024 * 1024;

/// Serializes a value to XDR's big-endian, 4-byte-aligned wire format.
pub trait Serialize {
    /// Writes `self` to `dest` in XDR wire format.
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()>;
}

/// Deserializes a value from XDR's big-endian, 4-byte-aligned wire format.
///
/// Implementors overwrite `self` in place rather than returning a new value, which
/// lets the free function [`deserialize`] build the default value once and reuse
/// per-field deserialization for every type without an extra `Default` bound at
/// every call site.
pub trait Deserialize {
    /// Reads `self` from `src`, replacing its contents.
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()>;
}

/// Reads a value of type `T` from `src`, starting from `T::default()`.
///
/// This is the ergonomic entry point used throughout the protocol modules instead of
/// constructing a default value and calling `deserialize` by hand.
pub fn deserialize<T: Default + Deserialize, R: Read>(src: &mut R) -> std::io::Result<T> {
    let mut value = T::default();
    value.deserialize(src)?;
    Ok(value)
}

fn check_len(len: u32, what: &str) -> std::io::Result<()> {
    if len > MAX_OPAQUE_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{what} length {len} exceeds maximum of {MAX_OPAQUE_LEN}"),
        ));
    }
    Ok(())
}

/// `void` arguments and results occupy zero bytes on the wire, as defined by
/// RFC 4506 section 3.19 - used by NULL and by every procedure's argument list
/// that carries no fields of its own.
impl Serialize for () {
    fn serialize<W: Write>(&self, _dest: &mut W) -> std::io::Result<()> {
        Ok(())
    }
}
impl Deserialize for () {
    fn deserialize<R: Read>(&mut self, _src: &mut R) -> std::io::Result<()> {
        Ok(())
    }
}

/// Boolean values are encoded as a 4-byte big endian integer, 0 for false and 1 for true.
impl Serialize for bool {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<XDREndian>(*self as u32)
    }
}
impl Deserialize for bool {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u32::<XDREndian>()? != 0;
        Ok(())
    }
}

/// 32-bit signed integers are serialized as 4-byte big endian values.
impl Serialize for i32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i32::<XDREndian>(*self)
    }
}
impl Deserialize for i32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_i32::<XDREndian>()?;
        Ok(())
    }
}

/// 64-bit signed integers (hyper) are serialized as 8-byte big endian values.
impl Serialize for i64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_i64::<XDREndian>(*self)
    }
}
impl Deserialize for i64 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_i64::<XDREndian>()?;
        Ok(())
    }
}

/// 32-bit unsigned integers are serialized as 4-byte big endian values.
impl Serialize for u32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u32::<XDREndian>(*self)
    }
}
impl Deserialize for u32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u32::<XDREndian>()?;
        Ok(())
    }
}

/// 64-bit unsigned integers (unsigned hyper) are serialized as 8-byte big endian values.
impl Serialize for u64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u64::<XDREndian>(*self)
    }
}
impl Deserialize for u64 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_u64::<XDREndian>()?;
        Ok(())
    }
}

/// Fixed-size byte arrays are serialized as raw bytes with no length prefix and no
/// padding: every fixed array this protocol uses (`cookieverf3`, `createverf3`,
/// `writeverf3`) is already a multiple of 4 bytes.
impl<const N: usize> Serialize for [u8; N] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_all(self)
    }
}
impl<const N: usize> Deserialize for [u8; N] {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        src.read_exact(self)
    }
}

/// Variable-length opaque data: a 4-byte length prefix, the bytes themselves, and
/// zero padding out to the next 4-byte boundary. Used for file handles, write data,
/// path strings and filenames alike.
impl Serialize for Vec<u8> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        assert!(self.len() < u32::MAX as usize);
        let length = self.len() as u32;
        length.serialize(dest)?;
        dest.write_all(self)?;
        let pad = ((4 - length % 4) % 4) as usize;
        const ZEROS: [u8; 4] = [0; 4];
        if pad > 0 {
            dest.write_all(&ZEROS[..pad])?;
        }
        Ok(())
    }
}
impl Deserialize for Vec<u8> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let length: u32 = deserialize(src)?;
        check_len(length, "opaque")?;
        self.resize(length as usize, 0);
        src.read_exact(self)?;
        let pad = ((4 - length % 4) % 4) as usize;
        let mut zeros: [u8; 4] = [0; 4];
        src.read_exact(&mut zeros[..pad])?;
        Ok(())
    }
}

/// An array of unsigned integers: a 4-byte length prefix followed by that many
/// 4-byte elements (no padding, since each element is already word-sized).
impl Serialize for Vec<u32> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        assert!(self.len() < u32::MAX as usize);
        let length = self.len() as u32;
        length.serialize(dest)?;
        for i in self {
            i.serialize(dest)?;
        }
        Ok(())
    }
}
impl Deserialize for Vec<u32> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let length: u32 = deserialize(src)?;
        check_len(length, "array")?;
        self.clear();
        self.reserve(length as usize);
        for _ in 0..length {
            self.push(deserialize(src)?);
        }
        Ok(())
    }
}

/// Implements `Serialize`/`Deserialize` for a struct by encoding/decoding each named
/// field in declaration order - XDR structs have no field tags, so wire order must
/// match the order these macros are invoked with.
#[macro_export]
macro_rules! SerializeStruct {
    ($t:ident, $($element:ident),*) => {
        impl $crate::xdr::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                $($crate::xdr::Serialize::serialize(&self.$element, dest)?;)*
                Ok(())
            }
        }
    };
}
#[macro_export]
macro_rules! DeserializeStruct {
    ($t:ident, $($element:ident),*) => {
        impl $crate::xdr::Deserialize for $t {
            fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                $($crate::xdr::Deserialize::deserialize(&mut self.$element, src)?;)*
                Ok(())
            }
        }
    };
}

/// Implements `Serialize`/`Deserialize` for a `u32`-discriminant enum backed by
/// `num_derive::{FromPrimitive, ToPrimitive}`. An unrecognized discriminant on the
/// wire is a decode error naming the offending type, never a silent default.
#[macro_export]
macro_rules! SerializeEnum {
    ($t:ident) => {
        impl $crate::xdr::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                use num_traits::cast::ToPrimitive;
                $crate::xdr::Serialize::serialize(&self.to_u32().expect("enum fits in u32"), dest)
            }
        }
    };
}
#[macro_export]
macro_rules! DeserializeEnum {
    ($t:ident) => {
        impl $crate::xdr::Deserialize for $t {
            fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                use num_traits::cast::FromPrimitive;
                let raw: u32 = $crate::xdr::deserialize(src)?;
                match Self::from_u32(raw) {
                    Some(v) => {
                        *self = v;
                        Ok(())
                    }
                    None => Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("invalid discriminant {} for {}", raw, stringify!($t)),
                    )),
                }
            }
        }
    };
}

/// Implements `Serialize`/`Deserialize` for an XDR "optional-data" tagged union: a
/// boolean discriminant followed, only when true, by the payload. RFC 1813 uses this
/// shape for every `pre_op_attr`/`post_op_attr`/`post_op_fh3`/`set_*3`/`sattrguard3`
/// field.
///
/// ```ignore
/// enum pre_op_attr { Void, attributes(wcc_attr) }
/// SerializeBoolUnion!(pre_op_attr, attributes, wcc_attr);
/// DeserializeBoolUnion!(pre_op_attr, attributes, wcc_attr);
/// ```
#[macro_export]
macro_rules! SerializeBoolUnion {
    ($t:ident, $case:ident, $inner:ty) => {
        impl $crate::xdr::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                match self {
                    $t::Void => $crate::xdr::Serialize::serialize(&false, dest),
                    $t::$case(v) => {
                        $crate::xdr::Serialize::serialize(&true, dest)?;
                        $crate::xdr::Serialize::serialize(v, dest)
                    }
                }
            }
        }
    };
}
#[macro_export]
macro_rules! DeserializeBoolUnion {
    ($t:ident, $case:ident, $inner:ty) => {
        impl $crate::xdr::Deserialize for $t {
            fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                let present: bool = $crate::xdr::deserialize(src)?;
                *self = if present {
                    $t::$case($crate::xdr::deserialize::<$inner, R>(src)?)
                } else {
                    $t::Void
                };
                Ok(())
            }
        }
    };
}

// Re-exported so call sites can `use super::*;` from a protocol submodule and reach
// the macros without spelling out `crate::`.
pub use crate::DeserializeBoolUnion;
pub use crate::DeserializeEnum;
pub use crate::DeserializeStruct;
pub use crate::SerializeBoolUnion;
pub use crate::SerializeEnum;
pub use crate::SerializeStruct;

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<T: Serialize + Deserialize + Default>(v: T) -> T {
        let mut buf = Vec::new();
        v.serialize(&mut buf).unwrap();
        deserialize(&mut &buf[..]).unwrap()
    }

    #[test]
    fn bool_roundtrip() {
        assert!(roundtrip(true));
        assert!(!roundtrip(false));
    }

    #[test]
    fn u32_roundtrip() {
        assert_eq!(roundtrip(0xdead_beef_u32), 0xdead_beef);
    }

    #[test]
    fn u64_roundtrip() {
        assert_eq!(roundtrip(0x0123_4567_89ab_cdef_u64), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn opaque_padding() {
        let mut buf = Vec::new();
        vec![1u8, 2, 3].serialize(&mut buf).unwrap();
        // 4 (len) + 3 (data) + 1 (pad) = 8
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf[4..7], &[1, 2, 3]);
        assert_eq!(buf[7], 0);
    }

    #[test]
    fn opaque_exact_word_no_padding() {
        let mut buf = Vec::new();
        vec![1u8, 2, 3, 4].serialize(&mut buf).unwrap();
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn u32_array_roundtrip() {
        let v = vec![1u32, 2, 3, 4];
        let mut buf = Vec::new();
        v.serialize(&mut buf).unwrap();
        let back: Vec<u32> = deserialize(&mut &buf[..]).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let mut buf = Vec::new();
        (MAX_OPAQUE_LEN + 1).serialize(&mut buf).unwrap();
        let mut v: Vec<u8> = Vec::new();
        assert!(v.deserialize(&mut &buf[..]).is_err());
    }
}
