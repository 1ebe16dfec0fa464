//! Signature-checked call bridge.
//!
//! [`callv`] is the only place a plugin's generic call handler is invoked.
//! [`PluginCall`] is the typed, argument-at-a-time form layered on top of it:
//! it validates each argument as it is collected and copies results back
//! through [`CallOutputs`].

use super::traits::{CallHandler, VpnEditorPlugin};
use super::value::{CallArg, CallSignature, CallValue, IntoCallArg, TypeTag};
use crate::error::{EditorPluginError, EditorPluginResult};
use std::fmt;
use tracing::{debug, warn};

fn negotiate<'p>(
    plugin: &'p dyn VpnEditorPlugin,
    call_name: &str,
) -> EditorPluginResult<(&'p dyn CallHandler, CallSignature)> {
    let handler = plugin
        .call_handler()
        .ok_or_else(|| EditorPluginError::unsupported_call(call_name))?;
    let signature = handler
        .signature(call_name)
        .ok_or_else(|| EditorPluginError::unsupported_call(call_name))?;
    Ok((handler, signature))
}

/// Call `call_name` on `plugin` with explicit input values and output slots.
///
/// Output slots must already hold values of the declared output types
/// (see [`CallSignature::output_slots`]). The handler is not invoked unless
/// every tag and both arities match the declared signature.
pub fn callv(
    plugin: &dyn VpnEditorPlugin,
    call_name: &str,
    args_in: &[CallValue],
    args_out: &mut [CallValue],
) -> EditorPluginResult<()> {
    let (handler, signature) = negotiate(plugin, call_name)?;

    signature.check_inputs(call_name, args_in)?;
    signature.check_outputs(call_name, args_out)?;

    debug!("Calling {} on plugin {}", call_name, plugin.name());
    match handler.call(call_name, args_in, args_out) {
        Ok(()) => {}
        Err(Some(message)) => {
            return Err(EditorPluginError::CallFailed {
                call: call_name.to_string(),
                message,
            });
        }
        Err(None) => return Err(EditorPluginError::unsupported_call(call_name)),
    }

    // The plugin may only fill the slots, not change their types
    signature.check_outputs(call_name, args_out).map_err(|e| {
        warn!("Plugin {} broke its own signature for {}: {}", plugin.name(), call_name, e);
        e
    })
}

/// Typed call under construction.
///
/// ```ignore
/// let (short, pretty, description, flags): (String, String, String, u32) = plugin
///     .call("get-service-info")?
///     .arg("org.freedesktop.NetworkManager.openvpn")?
///     .invoke()?
///     .extract()?;
/// ```
pub struct PluginCall<'p> {
    plugin: &'p dyn VpnEditorPlugin,
    call_name: String,
    signature: CallSignature,
    args_in: Vec<CallValue>,
}

impl<'p> PluginCall<'p> {
    /// Negotiate the signature of `call_name`. Fails with `Unsupported` if the
    /// plugin has no call handler or does not know the call.
    pub fn new(plugin: &'p dyn VpnEditorPlugin, call_name: &str) -> EditorPluginResult<Self> {
        let (_, signature) = negotiate(plugin, call_name)?;
        Ok(Self {
            plugin,
            call_name: call_name.to_string(),
            args_in: Vec::with_capacity(signature.inputs.len()),
            signature,
        })
    }

    pub fn signature(&self) -> &CallSignature {
        &self.signature
    }

    /// Append the next input argument
    pub fn arg<T: IntoCallArg>(self, value: T) -> EditorPluginResult<Self> {
        self.push(T::TAG, || value.into_value())
    }

    /// Append the next input argument as an already tagged value
    pub fn arg_value(self, value: CallValue) -> EditorPluginResult<Self> {
        self.push(value.type_tag(), || value)
    }

    fn push(mut self, tag: TypeTag, value: impl FnOnce() -> CallValue) -> EditorPluginResult<Self> {
        // On mismatch `self` is dropped here, releasing the collected inputs
        self.signature
            .expect_input(&self.call_name, self.args_in.len(), tag)?;
        self.args_in.push(value());
        Ok(self)
    }

    /// Run the call through [`callv`] and return the outputs for copy-back
    pub fn invoke(self) -> EditorPluginResult<CallOutputs> {
        let declared = self.signature.inputs.len();
        if self.args_in.len() != declared {
            return Err(EditorPluginError::invalid_argument(
                &self.call_name,
                format!("{} input value(s) supplied, signature takes {}", self.args_in.len(), declared),
            ));
        }

        let mut args_out = self.signature.output_slots();
        callv(self.plugin, &self.call_name, &self.args_in, &mut args_out)?;

        Ok(CallOutputs {
            call_name: self.call_name,
            signature: self.signature,
            values: args_out.into_iter(),
            position: 0,
        })
    }
}

impl fmt::Debug for PluginCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCall")
            .field("plugin", &self.plugin.name())
            .field("call_name", &self.call_name)
            .field("signature", &self.signature)
            .field("args_in", &self.args_in)
            .finish()
    }
}

/// Results of a completed call, copied back one typed value at a time.
///
/// A type mismatch found here is reported as `InvalidArgument`, but the
/// plugin has already run the call and its side effects stand.
#[derive(Debug)]
pub struct CallOutputs {
    call_name: String,
    signature: CallSignature,
    values: std::vec::IntoIter<CallValue>,
    position: usize,
}

impl CallOutputs {
    pub fn call_name(&self) -> &str {
        &self.call_name
    }

    /// Number of outputs not yet copied back
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    /// Copy back the next output, which must be declared as `tag`
    pub fn take_value(&mut self, tag: TypeTag) -> EditorPluginResult<CallValue> {
        if let Err(e) = self.signature.expect_output(&self.call_name, self.position, tag) {
            return Err(self.completed_mismatch(e));
        }
        let value = self.values.next().ok_or_else(|| {
            EditorPluginError::invalid_argument(&self.call_name, "output list exhausted")
        })?;
        self.position += 1;
        Ok(value)
    }

    pub fn take<T: CallArg>(&mut self) -> EditorPluginResult<T> {
        let value = self.take_value(T::TAG)?;
        T::from_value(value).ok_or_else(|| {
            EditorPluginError::invalid_argument(&self.call_name, format!("output is not {}", T::TAG))
        })
    }

    /// Check that every declared output has been copied back
    pub fn finish(self) -> EditorPluginResult<()> {
        if self.values.len() != 0 {
            let e = EditorPluginError::invalid_argument(
                &self.call_name,
                format!("{} output value(s) left unclaimed", self.values.len()),
            );
            return Err(self.completed_mismatch(e));
        }
        Ok(())
    }

    /// Copy back all outputs into a tuple, checking every tag and the arity
    pub fn extract<T: FromCallOutputs>(mut self) -> EditorPluginResult<T> {
        let values = T::from_outputs(&mut self)?;
        self.finish()?;
        Ok(values)
    }

    /// Raw output values without further type checks
    pub fn into_values(self) -> Vec<CallValue> {
        self.values.collect()
    }

    fn completed_mismatch(&self, error: EditorPluginError) -> EditorPluginError {
        warn!(
            "Mismatch of output type for {} after the call completed; plugin side effects are not undone",
            self.call_name
        );
        match error {
            EditorPluginError::InvalidArgument { call, detail } => EditorPluginError::InvalidArgument {
                call,
                detail: format!("{} (call already completed)", detail),
            },
            other => other,
        }
    }
}

/// Tuples of [`CallArg`] types that can be filled from [`CallOutputs`]
pub trait FromCallOutputs: Sized {
    fn from_outputs(outputs: &mut CallOutputs) -> EditorPluginResult<Self>;
}

impl FromCallOutputs for () {
    fn from_outputs(_outputs: &mut CallOutputs) -> EditorPluginResult<Self> {
        Ok(())
    }
}

macro_rules! impl_from_call_outputs {
    ($($name:ident),+) => {
        impl<$($name: CallArg),+> FromCallOutputs for ($($name,)+) {
            fn from_outputs(outputs: &mut CallOutputs) -> EditorPluginResult<Self> {
                Ok(($(outputs.take::<$name>()?,)+))
            }
        }
    };
}

impl_from_call_outputs!(A);
impl_from_call_outputs!(A, B);
impl_from_call_outputs!(A, B, C);
impl_from_call_outputs!(A, B, C, D);
impl_from_call_outputs!(A, B, C, D, E);
impl_from_call_outputs!(A, B, C, D, E, F);
