use std::fmt;

use serde_json::Value;

/// Conversion of a value into raw AQL text.
///
/// Implement it for custom types that know how to render themselves as AQL
/// and pass them to [`literal`].
pub trait ToAql {
    /// Returns the AQL text for this value.
    fn to_aql(&self) -> String;
}

/// Raw AQL text that is spliced into a query verbatim instead of being bound.
///
/// Never build a literal from untrusted input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AqlLiteral(String);

impl AqlLiteral {
    /// The AQL text of this literal.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AqlLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marks a value as raw AQL text.
///
/// `None` and `""` yield empty text, JSON `null` yields `null`, numbers and
/// booleans yield their textual form and strings are used as they are.
pub fn literal(value: impl ToAql) -> AqlLiteral {
    AqlLiteral(value.to_aql())
}

impl ToAql for AqlLiteral {
    fn to_aql(&self) -> String {
        self.0.clone()
    }
}

impl ToAql for str {
    fn to_aql(&self) -> String {
        self.to_owned()
    }
}

impl ToAql for String {
    fn to_aql(&self) -> String {
        self.clone()
    }
}

impl ToAql for bool {
    fn to_aql(&self) -> String {
        self.to_string()
    }
}

impl<T: ToAql + ?Sized> ToAql for &T {
    fn to_aql(&self) -> String {
        (**self).to_aql()
    }
}

impl<T: ToAql> ToAql for Option<T> {
    fn to_aql(&self) -> String {
        match self {
            Some(value) => value.to_aql(),
            None => String::new(),
        }
    }
}

impl ToAql for Value {
    fn to_aql(&self) -> String {
        match self {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

macro_rules! impl_to_aql_for_numbers {
    ($($num:ty),*) => {
        $(
            impl ToAql for $num {
                fn to_aql(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_to_aql_for_numbers!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
