//! Named argument lists

use bytes::{Buf, BufMut};

use crate::decode::{get_count, get_str};
use crate::encode::{put_str, str_size};
use crate::{Result, TypeTag, Value, WireDecode, WireEncode, WireError};

/// Ordered list of named, typed values.
///
/// Order is kept for encoding, but lookups are by name, so a receiver does
/// not depend on the order the sender packed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    entries: Vec<(String, Value)>,
}

macro_rules! typed_accessors {
    ($($pack:ident, $unpack:ident, $ty:ty, $variant:ident;)*) => {
        $(
            pub fn $pack(&mut self, name: &str, value: $ty) -> Result<()> {
                self.pack(name, Value::$variant(value))
            }

            pub fn $unpack(&self, name: &str) -> Result<$ty> {
                match self.expect(name, TypeTag::$variant)? {
                    Value::$variant(v) => Ok(v.clone()),
                    other => Err(WireError::TypeMismatch {
                        name: name.to_string(),
                        expected: TypeTag::$variant,
                        found: other.tag(),
                    }),
                }
            }
        )*
    };
}

impl ArgList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value; names must be unique within one list.
    pub fn pack(&mut self, name: &str, value: Value) -> Result<()> {
        if self.get(name).is_some() {
            return Err(WireError::DuplicateArgument(name.to_string()));
        }
        self.entries.push((name.to_string(), value));
        Ok(())
    }

    /// Builder form of [`ArgList::pack`] for literal argument lists.
    pub fn with(mut self, name: &str, value: Value) -> Result<Self> {
        self.pack(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Look up `name` and check that it was packed as `tag`.
    pub fn expect(&self, name: &str, tag: TypeTag) -> Result<&Value> {
        let value = self
            .get(name)
            .ok_or_else(|| WireError::MissingArgument(name.to_string()))?;
        if value.tag() != tag {
            return Err(WireError::TypeMismatch {
                name: name.to_string(),
                expected: tag,
                found: value.tag(),
            });
        }
        Ok(value)
    }

    typed_accessors! {
        pack_bool, unpack_bool, bool, Bool;
        pack_char, unpack_char, char, Char;
        pack_int, unpack_int, i32, Int;
        pack_long, unpack_long, i64, Long;
        pack_float, unpack_float, f32, Float;
        pack_double, unpack_double, f64, Double;
        pack_string, unpack_string, String, String;
        pack_opaque, unpack_opaque, u64, Opaque;
        pack_object, unpack_object, Option<String>, Object;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl WireEncode for ArgList {
    fn wire_encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.entries.len() as u32);
        for (name, value) in &self.entries {
            put_str(buf, name);
            value.wire_encode(buf);
        }
    }

    fn wire_size(&self) -> usize {
        4 + self
            .entries
            .iter()
            .map(|(n, v)| str_size(n) + v.wire_size())
            .sum::<usize>()
    }
}

impl WireDecode for ArgList {
    fn wire_decode<B: Buf>(buf: &mut B) -> Result<Self> {
        let count = get_count(buf)?;
        let mut list = ArgList::new();
        for _ in 0..count {
            let name = get_str(buf)?;
            let value = Value::wire_decode(buf)?;
            list.pack(&name, value)?;
        }
        Ok(list)
    }
}
