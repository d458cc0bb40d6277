use crate::array::{Array, Value};
use crate::context::EvalContext;
use crate::error::{Error, Result};

/// Trailing-axis index of a component letter.
pub fn component_index(key: &str) -> Option<usize> {
    match key {
        "x" | "r" => Some(0),
        "y" | "g" => Some(1),
        "z" | "b" => Some(2),
        "w" | "a" => Some(3),
        _ => None,
    }
}

/// Selects `key` from `input`: a field of a record, or a component of an
/// array. When the context carries a raw `index` array, the result is
/// reordered by it.
pub(crate) fn select(input: Value, key: &str, ctx: &EvalContext) -> Result<Array> {
    let out = match input {
        Value::Record(record) => record
            .field(key)
            .cloned()
            .ok_or_else(|| Error::UnknownKey(key.to_string()))?,
        Value::Array(array) => {
            let i = component_index(key).ok_or_else(|| Error::UnknownKey(key.to_string()))?;
            array.component(i)?
        }
    };
    match ctx.index_order() {
        Some(order) if out.ndim() > 0 => out.take_rows(&order),
        _ => Ok(out),
    }
}
