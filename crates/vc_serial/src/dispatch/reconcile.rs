use crate::context::DeserializationContext;
use crate::error::SerialResult;
use crate::format::NodeHeader;
use crate::info::TypeInfo;
use crate::registry::Conversion;

/// How a reference node is decoded into a slot of a declared type.
pub(crate) enum Reconciliation {
    /// Decode as this type, which fits the slot.
    Embedded(&'static TypeInfo),
    /// Decode as the embedded type, then convert into the declared one.
    Convert(&'static TypeInfo, Conversion),
    /// Decode as the declared type although the node says otherwise.
    Forced(&'static TypeInfo),
    /// Skip the node and substitute a default.
    Drop,
}

/// Decides how to decode a node whose header is `header` into a slot
/// declared as `declared`.
///
/// The rules are tried in order: a node without a type is the declared
/// type, a registered conversion wins over plain assignability, and a
/// mismatch is decoded anyway only when the session allows invalid data.
pub(crate) fn reconcile(
    context: &DeserializationContext,
    declared: &'static TypeInfo,
    header: &NodeHeader,
) -> SerialResult<Reconciliation> {
    let allow_invalid = context.config().allow_deserialize_invalid_data;

    let Some(embedded) = header.ty else {
        if let Some(name) = &header.type_name {
            if allow_invalid && declared.is_concrete() {
                context.debug().log_warning(format_args!(
                    "type `{name}` is not registered, reading it as `{}`",
                    declared.type_path()
                ))?;
                return Ok(Reconciliation::Forced(declared));
            }
            context.debug().log_warning(format_args!(
                "type `{name}` is not registered, the object is dropped"
            ))?;
            return Ok(Reconciliation::Drop);
        }
        if declared.is_concrete() {
            return Ok(Reconciliation::Embedded(declared));
        }
        context.debug().log_error(format_args!(
            "a node for `{}` names no concrete type",
            declared.type_path()
        ))?;
        return Ok(Reconciliation::Drop);
    };

    {
        let types = context.registry().types();
        if embedded.type_id() != declared.type_id()
            && let Some(conversion) = types.conversion(embedded.type_id(), declared.type_id())
        {
            return Ok(Reconciliation::Convert(embedded, conversion.clone()));
        }
        if types.is_assignable(embedded, declared) {
            return Ok(Reconciliation::Embedded(embedded));
        }
    }

    if allow_invalid && declared.is_concrete() {
        context.debug().log_warning(format_args!(
            "`{}` does not fit a `{}` slot, reading it as `{}`",
            embedded.type_path(),
            declared.type_path(),
            declared.type_path()
        ))?;
        return Ok(Reconciliation::Forced(declared));
    }
    context.debug().log_warning(format_args!(
        "`{}` does not fit a `{}` slot, the object is dropped",
        embedded.type_path(),
        declared.type_path()
    ))?;
    Ok(Reconciliation::Drop)
}
