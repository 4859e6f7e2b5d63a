use std::time::Duration;

use serde_json::Value;

use core_types::{parse_duration, Rgb};

use crate::PropertyNode;

/// Conversion from a property node into a typed value. `from_property`
/// returns `None` when the node has the wrong shape; the caller turns that
/// into a path-carrying error.
pub trait FromProperty: Sized {
    /// Human-readable shape name used in mismatch messages.
    const EXPECTED: &'static str;

    fn from_property(node: &PropertyNode<'_>) -> Option<Self>;
}

impl FromProperty for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_property(node: &PropertyNode<'_>) -> Option<Self> {
        node.json().as_bool()
    }
}

impl FromProperty for String {
    const EXPECTED: &'static str = "string";

    fn from_property(node: &PropertyNode<'_>) -> Option<Self> {
        node.json().as_str().map(str::to_owned)
    }
}

impl FromProperty for f64 {
    const EXPECTED: &'static str = "decimal";

    fn from_property(node: &PropertyNode<'_>) -> Option<Self> {
        node.json().as_f64()
    }
}

macro_rules! unsigned_from_property {
    ($($ty:ty),*) => {
        $(impl FromProperty for $ty {
            const EXPECTED: &'static str = "number";

            fn from_property(node: &PropertyNode<'_>) -> Option<Self> {
                node.json().as_u64().and_then(|value| value.try_into().ok())
            }
        })*
    };
}

unsigned_from_property!(u8, u16, u32, u64, usize);

macro_rules! signed_from_property {
    ($($ty:ty),*) => {
        $(impl FromProperty for $ty {
            const EXPECTED: &'static str = "number";

            fn from_property(node: &PropertyNode<'_>) -> Option<Self> {
                node.json().as_i64().and_then(|value| value.try_into().ok())
            }
        })*
    };
}

signed_from_property!(i8, i16, i32, i64);

impl FromProperty for Duration {
    const EXPECTED: &'static str = "duration string (e.g. \"500ms\")";

    fn from_property(node: &PropertyNode<'_>) -> Option<Self> {
        parse_duration(node.json().as_str()?).ok()
    }
}

impl FromProperty for Rgb {
    const EXPECTED: &'static str = "six-digit hex color";

    fn from_property(node: &PropertyNode<'_>) -> Option<Self> {
        node.json().as_str()?.parse().ok()
    }
}

impl<T: FromProperty> FromProperty for Vec<T> {
    const EXPECTED: &'static str = "homogeneous array";

    fn from_property(node: &PropertyNode<'_>) -> Option<Self> {
        let Value::Array(_) = node.json() else {
            return None;
        };
        node.iter().ok()?.map(|child| child.value().ok()).collect()
    }
}
