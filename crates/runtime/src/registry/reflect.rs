//! Capability tables for named member access.
//!
//! A type opts into dynamic access by implementing [`Reflect`] and listing its
//! members once in a [`MemberTable`]. The registry builds that table the first
//! time an object of the type is registered and resolves names against it.
//!
//! Objects are shared behind `Arc`, so writable members rely on interior
//! mutability in the implementing type.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::MemberError;

/// Type-erased registered object.
pub type Object = dyn Any + Send + Sync;

/// A type whose members can be reached by name through the registry.
///
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use runtime::{MemberTable, Reflect};
///
/// struct Door {
///     opened: AtomicU32,
/// }
///
/// impl Reflect for Door {
///     fn members() -> MemberTable<Self> {
///         MemberTable::new().property_as("opened", |door: &Door| {
///             door.opened.load(Ordering::Relaxed)
///         })
///     }
/// }
/// ```
pub trait Reflect: Send + Sync + Sized + 'static {
    fn members() -> MemberTable<Self>;
}

/// What a named member is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum MemberKind {
    /// Readable and writable slot.
    Field,
    /// Computed value, writable only with a setter.
    Property,
    /// Callable with an argument list.
    Method,
}

pub(crate) type Getter = Arc<dyn Fn(&Object) -> Result<Value, MemberError> + Send + Sync>;
pub(crate) type Setter = Arc<dyn Fn(&Object, Value) -> Result<(), MemberError> + Send + Sync>;
pub(crate) type Method = Arc<dyn Fn(&Object, &[Value]) -> Result<Value, MemberError> + Send + Sync>;

/// Resolved member, ready to be applied to any object of its type.
#[derive(Clone)]
pub(crate) enum Accessor {
    Field { get: Getter, set: Setter },
    Property { get: Getter, set: Option<Setter> },
    Method(Method),
}

impl Accessor {
    pub(crate) fn kind(&self) -> MemberKind {
        match self {
            Accessor::Field { .. } => MemberKind::Field,
            Accessor::Property { .. } => MemberKind::Property,
            Accessor::Method(_) => MemberKind::Method,
        }
    }
}

/// Member declarations of one [`Reflect`] type.
///
/// Declaring a name twice keeps the later declaration.
pub struct MemberTable<T> {
    members: HashMap<String, Accessor>,
    _type: PhantomData<fn(&T)>,
}

impl<T: Reflect> MemberTable<T> {
    pub fn new() -> Self {
        Self {
            members: HashMap::new(),
            _type: PhantomData,
        }
    }

    /// Declares a field through raw JSON accessors.
    pub fn field<G, S>(self, name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&T, Value) -> Result<(), MemberError> + Send + Sync + 'static,
    {
        self.insert(
            name,
            Accessor::Field {
                get: getter::<T, _>(move |object| Ok(get(object))),
                set: setter::<T, _>(set),
            },
        )
    }

    /// Declares a field whose value converts through serde.
    pub fn field_as<V, G, S>(self, name: impl Into<String>, get: G, set: S) -> Self
    where
        V: Serialize + DeserializeOwned + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&T, V) + Send + Sync + 'static,
    {
        self.insert(
            name,
            Accessor::Field {
                get: getter::<T, _>(move |object| Ok(serde_json::to_value(get(object))?)),
                set: setter::<T, _>(move |object, value| {
                    set(object, serde_json::from_value(value)?);
                    Ok(())
                }),
            },
        )
    }

    /// Declares a read-only property.
    pub fn property<G>(self, name: impl Into<String>, get: G) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.insert(
            name,
            Accessor::Property {
                get: getter::<T, _>(move |object| Ok(get(object))),
                set: None,
            },
        )
    }

    /// Declares a read-only property whose value converts through serde.
    pub fn property_as<V, G>(self, name: impl Into<String>, get: G) -> Self
    where
        V: Serialize + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.insert(
            name,
            Accessor::Property {
                get: getter::<T, _>(move |object| Ok(serde_json::to_value(get(object))?)),
                set: None,
            },
        )
    }

    /// Declares a property with a setter.
    pub fn property_mut<G, S>(self, name: impl Into<String>, get: G, set: S) -> Self
    where
        G: Fn(&T) -> Value + Send + Sync + 'static,
        S: Fn(&T, Value) -> Result<(), MemberError> + Send + Sync + 'static,
    {
        self.insert(
            name,
            Accessor::Property {
                get: getter::<T, _>(move |object| Ok(get(object))),
                set: Some(setter::<T, _>(set)),
            },
        )
    }

    /// Declares a method. Methods without a result return [`Value::Null`].
    pub fn method<M>(self, name: impl Into<String>, method: M) -> Self
    where
        M: Fn(&T, &[Value]) -> Result<Value, MemberError> + Send + Sync + 'static,
    {
        let erased: Method =
            Arc::new(move |object: &Object, args: &[Value]| method(downcast::<T>(object)?, args));
        self.insert(name, Accessor::Method(erased))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn kind(&self, name: &str) -> Option<MemberKind> {
        self.members.get(name).map(Accessor::kind)
    }

    fn insert(mut self, name: impl Into<String>, accessor: Accessor) -> Self {
        self.members.insert(name.into(), accessor);
        self
    }

    pub(crate) fn into_erased(self) -> ErasedTable {
        ErasedTable {
            type_name: type_name::<T>(),
            members: self.members,
        }
    }
}

impl<T: Reflect> Default for MemberTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MemberTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.members.keys().collect();
        names.sort_unstable();
        f.debug_struct("MemberTable")
            .field("type", &type_name::<T>())
            .field("members", &names)
            .finish()
    }
}

/// Member table of one concrete type, independent of `T`.
pub(crate) struct ErasedTable {
    pub(crate) type_name: &'static str,
    members: HashMap<String, Accessor>,
}

impl ErasedTable {
    pub(crate) fn get(&self, name: &str) -> Option<&Accessor> {
        self.members.get(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }
}

/// Decodes the method argument at `index` into `V`.
pub fn param<V: DeserializeOwned>(args: &[Value], index: usize) -> Result<V, MemberError> {
    let value = args.get(index).ok_or(MemberError::MissingArgument(index))?;
    Ok(V::deserialize(value)?)
}

fn downcast<T: 'static>(object: &Object) -> Result<&T, MemberError> {
    object
        .downcast_ref::<T>()
        .ok_or(MemberError::TypeMismatch {
            expected: type_name::<T>(),
        })
}

fn getter<T, F>(get: F) -> Getter
where
    T: 'static,
    F: Fn(&T) -> Result<Value, MemberError> + Send + Sync + 'static,
{
    Arc::new(move |object: &Object| get(downcast::<T>(object)?))
}

fn setter<T, F>(set: F) -> Setter
where
    T: 'static,
    F: Fn(&T, Value) -> Result<(), MemberError> + Send + Sync + 'static,
{
    Arc::new(move |object: &Object, value: Value| set(downcast::<T>(object)?, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    struct Lamp {
        lit: Mutex<bool>,
        watts: u32,
    }

    impl Reflect for Lamp {
        fn members() -> MemberTable<Self> {
            MemberTable::new()
                .field_as("lit", |lamp: &Lamp| *lamp.lit.lock(), |lamp, lit| {
                    *lamp.lit.lock() = lit
                })
                .property_as("watts", |lamp: &Lamp| lamp.watts)
                .method("toggle", |lamp: &Lamp, _| {
                    let mut lit = lamp.lit.lock();
                    *lit = !*lit;
                    Ok(Value::Bool(*lit))
                })
        }
    }

    fn lamp() -> Lamp {
        Lamp {
            lit: Mutex::new(false),
            watts: 60,
        }
    }

    #[test]
    fn table_reports_member_kinds() {
        let table = Lamp::members();
        assert_eq!(table.len(), 3);
        assert_eq!(table.kind("lit"), Some(MemberKind::Field));
        assert_eq!(table.kind("watts"), Some(MemberKind::Property));
        assert_eq!(table.kind("toggle"), Some(MemberKind::Method));
        assert_eq!(table.kind("color"), None);
    }

    #[test]
    fn erased_accessors_reach_the_object() {
        let table = Lamp::members().into_erased();
        let lamp = lamp();
        let object: &Object = &lamp;

        let Some(Accessor::Field { get, set }) = table.get("lit") else {
            panic!("lit should be a field");
        };
        set(object, json!(true)).unwrap();
        assert_eq!(get(object).unwrap(), json!(true));

        let Some(Accessor::Method(toggle)) = table.get("toggle") else {
            panic!("toggle should be a method");
        };
        assert_eq!(toggle(object, &[]).unwrap(), json!(false));
    }

    #[test]
    fn accessors_reject_foreign_objects() {
        let table = Lamp::members().into_erased();
        let not_a_lamp: &Object = &42_u32;

        let Some(Accessor::Property { get, .. }) = table.get("watts") else {
            panic!("watts should be a property");
        };
        assert!(matches!(
            get(not_a_lamp),
            Err(MemberError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn typed_field_rejects_wrong_shape() {
        let table = Lamp::members().into_erased();
        let lamp = lamp();
        let object: &Object = &lamp;

        let Some(Accessor::Field { set, .. }) = table.get("lit") else {
            panic!("lit should be a field");
        };
        assert!(matches!(
            set(object, json!("bright")),
            Err(MemberError::Decode(_))
        ));
        assert!(!*lamp.lit.lock());
    }

    #[test]
    fn param_decodes_arguments() {
        let args = [json!(3), json!("north")];
        assert_eq!(param::<u8>(&args, 0).unwrap(), 3);
        assert_eq!(param::<String>(&args, 1).unwrap(), "north");
        assert!(matches!(
            param::<u8>(&args, 2),
            Err(MemberError::MissingArgument(2))
        ));
    }
}
