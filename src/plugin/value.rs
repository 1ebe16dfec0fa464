//! Runtime-typed values exchanged with plugins through the call bridge

use crate::error::{EditorPluginError, EditorPluginResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Type identifier of a value crossing the plugin boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeTag {
    Boolean,
    Int,
    UInt,
    Int64,
    UInt64,
    Double,
    String,
    StringList,
    Bytes,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Boolean => "boolean",
            TypeTag::Int => "int",
            TypeTag::UInt => "uint",
            TypeTag::Int64 => "int64",
            TypeTag::UInt64 => "uint64",
            TypeTag::Double => "double",
            TypeTag::String => "string",
            TypeTag::StringList => "string-list",
            TypeTag::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// A value paired with its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum CallValue {
    Boolean(bool),
    Int(i32),
    UInt(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
    StringList(Vec<String>),
    Bytes(Vec<u8>),
}

impl CallValue {
    /// Empty value of the given type, used to initialise output slots
    pub fn empty(tag: TypeTag) -> Self {
        match tag {
            TypeTag::Boolean => CallValue::Boolean(false),
            TypeTag::Int => CallValue::Int(0),
            TypeTag::UInt => CallValue::UInt(0),
            TypeTag::Int64 => CallValue::Int64(0),
            TypeTag::UInt64 => CallValue::UInt64(0),
            TypeTag::Double => CallValue::Double(0.0),
            TypeTag::String => CallValue::String(String::new()),
            TypeTag::StringList => CallValue::StringList(Vec::new()),
            TypeTag::Bytes => CallValue::Bytes(Vec::new()),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            CallValue::Boolean(_) => TypeTag::Boolean,
            CallValue::Int(_) => TypeTag::Int,
            CallValue::UInt(_) => TypeTag::UInt,
            CallValue::Int64(_) => TypeTag::Int64,
            CallValue::UInt64(_) => TypeTag::UInt64,
            CallValue::Double(_) => TypeTag::Double,
            CallValue::String(_) => TypeTag::String,
            CallValue::StringList(_) => TypeTag::StringList,
            CallValue::Bytes(_) => TypeTag::Bytes,
        }
    }

    /// Exact tag comparison; no coercion between numeric types
    pub fn holds(&self, tag: TypeTag) -> bool {
        self.type_tag() == tag
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CallValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a command-line style literal into a value of the given type
    pub fn parse(tag: TypeTag, input: &str) -> EditorPluginResult<Self> {
        let bad = |e: &dyn fmt::Display| {
            EditorPluginError::ParseError(format!("invalid {} value '{}': {}", tag, input, e))
        };
        Ok(match tag {
            TypeTag::Boolean => CallValue::Boolean(input.parse().map_err(|e| bad(&e))?),
            TypeTag::Int => CallValue::Int(input.parse().map_err(|e| bad(&e))?),
            TypeTag::UInt => CallValue::UInt(input.parse().map_err(|e| bad(&e))?),
            TypeTag::Int64 => CallValue::Int64(input.parse().map_err(|e| bad(&e))?),
            TypeTag::UInt64 => CallValue::UInt64(input.parse().map_err(|e| bad(&e))?),
            TypeTag::Double => CallValue::Double(input.parse().map_err(|e| bad(&e))?),
            TypeTag::String => CallValue::String(input.to_string()),
            TypeTag::StringList => CallValue::StringList(
                input
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            TypeTag::Bytes => CallValue::Bytes(input.as_bytes().to_vec()),
        })
    }
}

impl fmt::Display for CallValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallValue::Boolean(v) => write!(f, "{}", v),
            CallValue::Int(v) => write!(f, "{}", v),
            CallValue::UInt(v) => write!(f, "{}", v),
            CallValue::Int64(v) => write!(f, "{}", v),
            CallValue::UInt64(v) => write!(f, "{}", v),
            CallValue::Double(v) => write!(f, "{}", v),
            CallValue::String(v) => f.write_str(v),
            CallValue::StringList(v) => f.write_str(&v.join(",")),
            CallValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// Rust types that can be passed as a call input of exactly one [`TypeTag`]
pub trait IntoCallArg {
    const TAG: TypeTag;

    fn into_value(self) -> CallValue;
}

/// Rust types that map onto exactly one [`TypeTag`] in both directions, so
/// they can also receive call outputs
pub trait CallArg: IntoCallArg + Sized {
    /// Returns `None` unless the value holds `Self::TAG`
    fn from_value(value: CallValue) -> Option<Self>;
}

macro_rules! impl_call_arg {
    ($ty:ty, $variant:ident) => {
        impl IntoCallArg for $ty {
            const TAG: TypeTag = TypeTag::$variant;

            fn into_value(self) -> CallValue {
                CallValue::$variant(self)
            }
        }

        impl CallArg for $ty {
            fn from_value(value: CallValue) -> Option<Self> {
                match value {
                    CallValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_call_arg!(bool, Boolean);
impl_call_arg!(i32, Int);
impl_call_arg!(u32, UInt);
impl_call_arg!(i64, Int64);
impl_call_arg!(u64, UInt64);
impl_call_arg!(f64, Double);
impl_call_arg!(String, String);
impl_call_arg!(Vec<String>, StringList);
impl_call_arg!(Vec<u8>, Bytes);

// Borrowed strings are input only; outputs are copied back as `String`
impl IntoCallArg for &str {
    const TAG: TypeTag = TypeTag::String;

    fn into_value(self) -> CallValue {
        CallValue::String(self.to_string())
    }
}

/// Input and output type sequence a plugin declares for one call name.
///
/// `Cow::Borrowed` tables belong to the plugin and are never freed by the
/// host; `Cow::Owned` tables are handed over and dropped after the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSignature {
    pub inputs: Cow<'static, [TypeTag]>,
    pub outputs: Cow<'static, [TypeTag]>,
}

impl CallSignature {
    /// Signature backed by static tables owned by the plugin
    pub const fn borrowed(inputs: &'static [TypeTag], outputs: &'static [TypeTag]) -> Self {
        Self {
            inputs: Cow::Borrowed(inputs),
            outputs: Cow::Borrowed(outputs),
        }
    }

    /// Signature whose tables are handed over to the caller
    pub fn owned(inputs: Vec<TypeTag>, outputs: Vec<TypeTag>) -> Self {
        Self {
            inputs: Cow::Owned(inputs),
            outputs: Cow::Owned(outputs),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.inputs, Cow::Owned(_)) || matches!(self.outputs, Cow::Owned(_))
    }

    /// Fresh output slots holding the empty value of each declared type
    pub fn output_slots(&self) -> Vec<CallValue> {
        self.outputs.iter().copied().map(CallValue::empty).collect()
    }

    /// Check the tag supplied for input `position` while arguments are collected
    pub fn expect_input(&self, call: &str, position: usize, tag: TypeTag) -> EditorPluginResult<()> {
        expect_tag(call, "input", &self.inputs, position, tag)
    }

    /// Check the tag requested for output `position` while results are copied back
    pub fn expect_output(&self, call: &str, position: usize, tag: TypeTag) -> EditorPluginResult<()> {
        expect_tag(call, "output", &self.outputs, position, tag)
    }

    pub fn check_inputs(&self, call: &str, values: &[CallValue]) -> EditorPluginResult<()> {
        check_values(call, "input", &self.inputs, values)
    }

    pub fn check_outputs(&self, call: &str, values: &[CallValue]) -> EditorPluginResult<()> {
        check_values(call, "output", &self.outputs, values)
    }
}

fn expect_tag(
    call: &str,
    direction: &str,
    declared: &[TypeTag],
    position: usize,
    tag: TypeTag,
) -> EditorPluginResult<()> {
    match declared.get(position) {
        Some(expected) if *expected == tag => Ok(()),
        Some(expected) => Err(EditorPluginError::invalid_argument(
            call,
            format!("{} {} is {}, expected {}", direction, position, tag, expected),
        )),
        None => Err(EditorPluginError::invalid_argument(
            call,
            format!(
                "unexpected {} {} of type {}, signature takes {}",
                direction,
                position,
                tag,
                declared.len()
            ),
        )),
    }
}

fn check_values(
    call: &str,
    direction: &str,
    declared: &[TypeTag],
    values: &[CallValue],
) -> EditorPluginResult<()> {
    for (position, value) in values.iter().enumerate() {
        expect_tag(call, direction, declared, position, value.type_tag())?;
    }
    if values.len() != declared.len() {
        return Err(EditorPluginError::invalid_argument(
            call,
            format!(
                "{} {} value(s) supplied, signature takes {}",
                values.len(),
                direction,
                declared.len()
            ),
        ));
    }
    Ok(())
}
