//! Argument decoding for handlers.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::HandlerError;

/// Decodes the argument at `index` into `T`.
///
/// ```
/// use invoker::{arg, Value};
///
/// let args = [Value::from("rifle"), Value::from(1)];
/// let weapon: String = arg(&args, 0).unwrap();
/// let shots: u32 = arg(&args, 1).unwrap();
/// assert_eq!((weapon.as_str(), shots), ("rifle", 1));
/// ```
pub fn arg<T: DeserializeOwned>(args: &[Value], index: usize) -> Result<T, HandlerError> {
    let value = args.get(index).ok_or(HandlerError::MissingArgument(index))?;
    T::deserialize(value).map_err(|source| HandlerError::BadArgument { index, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_argument_is_reported() {
        let args = [json!("rifle")];
        assert!(matches!(
            arg::<u32>(&args, 1),
            Err(HandlerError::MissingArgument(1))
        ));
    }

    #[test]
    fn wrong_shape_is_reported() {
        let args = [json!("rifle")];
        assert!(matches!(
            arg::<u32>(&args, 0),
            Err(HandlerError::BadArgument { index: 0, .. })
        ));
    }
}
