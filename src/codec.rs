//! Opaque payload encoding.
//!
//! Values whose field type has no native column representation are stored as
//! a BLOB: one version byte followed by the JSON document.

use std::fmt;

use serde::ser::{self, Serialize};

use crate::error::{Error, Result};

/// Current opaque payload format.
pub const OPAQUE_FORMAT_VERSION: u8 = 1;

pub fn encode(value: &serde_json::Value) -> Result<Vec<u8>> {
    let mut bytes = vec![OPAQUE_FORMAT_VERSION];
    serde_json::to_writer(&mut bytes, value)?;
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<serde_json::Value> {
    match bytes.split_first() {
        None => Err(Error::EmptyPayload),
        Some((&OPAQUE_FORMAT_VERSION, body)) => Ok(serde_json::from_slice(body)?),
        Some((&version, _)) => Err(Error::UnsupportedPayloadVersion(version)),
    }
}

/// Reject NaN and infinite floats anywhere in `value`.
///
/// JSON has no representation for them and serde_json would write `null`
/// in their place. Other serialization failures are left for serde_json to
/// report.
pub fn ensure_finite<T: ?Sized + Serialize>(value: &T) -> Result<()> {
    match value.serialize(FiniteCheck) {
        Err(Check::NonFinite) => Err(Error::NonFiniteNumber),
        Err(Check::Custom) | Ok(()) => Ok(()),
    }
}

#[derive(Debug)]
enum Check {
    NonFinite,
    Custom,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::NonFinite => f.write_str("non-finite number"),
            Check::Custom => f.write_str("serialization failed"),
        }
    }
}

impl std::error::Error for Check {}

impl ser::Error for Check {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Check::Custom
    }
}

type Checked = std::result::Result<(), Check>;

/// Serializer that only inspects floats.
#[derive(Clone, Copy)]
struct FiniteCheck;

fn finite(ok: bool) -> Checked {
    if ok {
        Ok(())
    } else {
        Err(Check::NonFinite)
    }
}

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = Check;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_f32(self, v: f32) -> Checked {
        finite(v.is_finite())
    }

    fn serialize_f64(self, v: f64) -> Checked {
        finite(v.is_finite())
    }

    fn serialize_bool(self, _: bool) -> Checked {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> Checked {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> Checked {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> Checked {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> Checked {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> Checked {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> Checked {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> Checked {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> Checked {
        Ok(())
    }

    fn serialize_char(self, _: char) -> Checked {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> Checked {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> Checked {
        Ok(())
    }

    fn serialize_none(self) -> Checked {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Checked {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Checked {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Checked {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Checked {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> std::result::Result<Self, Check> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> std::result::Result<Self, Check> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, Check> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, Check> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> std::result::Result<Self, Check> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> std::result::Result<Self, Check> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> std::result::Result<Self, Check> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = Check;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = Check;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = Check;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = Check;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = Check;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Checked {
        key.serialize(*self)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = Check;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = Check;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &'static str, value: &T) -> Checked {
        value.serialize(*self)
    }

    fn end(self) -> Checked {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn payload_starts_with_version_byte() {
        let bytes = encode(&json!(["x", "y"])).unwrap();
        assert_eq!(bytes[0], OPAQUE_FORMAT_VERSION);
        assert_eq!(&bytes[1..], br#"["x","y"]"#);
    }

    #[test]
    fn nested_documents_survive() {
        let value = json!({"tags": ["a", "b"], "weight": 1.5, "meta": {"n": null}});
        assert_eq!(decode(&encode(&value).unwrap()).unwrap(), value);
    }

    #[test]
    fn floats_keep_every_bit() {
        for f in [1.0715660391465826e-75, 0.1 + 0.2, f64::MIN_POSITIVE, f64::MAX, -2.5e-308] {
            let decoded = decode(&encode(&json!(f)).unwrap()).unwrap();
            assert_eq!(decoded.as_f64().unwrap().to_bits(), f.to_bits());
        }
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(matches!(decode(&[]), Err(Error::EmptyPayload)));
        assert!(matches!(
            decode(&[9, b'1']),
            Err(Error::UnsupportedPayloadVersion(9))
        ));
        assert!(matches!(decode(&[1, b'{']), Err(Error::Codec(_))));
    }

    #[test]
    fn finite_check_walks_nested_values() {
        ensure_finite(&1.5).unwrap();
        ensure_finite(&vec![Some(1.0f32), None]).unwrap();

        assert!(matches!(ensure_finite(&f64::NAN), Err(Error::NonFiniteNumber)));
        assert!(matches!(
            ensure_finite(&vec![1.0, f64::INFINITY]),
            Err(Error::NonFiniteNumber)
        ));

        let mut nested = BTreeMap::new();
        nested.insert("depth", (1, vec![f32::NEG_INFINITY]));
        assert!(matches!(ensure_finite(&nested), Err(Error::NonFiniteNumber)));
    }
}
