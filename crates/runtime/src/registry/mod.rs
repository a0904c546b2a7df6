//! Object registry with name-based member dispatch.
//!
//! Systems register live objects under stable string ids and reach each other
//! through the registry instead of holding direct references. A registered
//! object can be fetched back with its concrete type, or used dynamically:
//! members declared in its [`MemberTable`] are read, written and called by
//! name with `serde_json::Value` payloads.
//!
//! Resolved members are cached per (type, member name). The cache only grows;
//! unregistering an id leaves it untouched and [`ObjectRegistry::clear`] drops
//! it wholesale.
//!
//! The registry also owns an [`Invoker`] and forwards the keyed invocation
//! calls to it, so it is the single facade over object lookup and event
//! dispatch.

mod reflect;

pub use reflect::{MemberKind, MemberTable, Object, Reflect, param};

use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use invoker::{Handler, Invoker, InvokerToken, Registration, Value};
use tracing::{debug, trace, warn};

use crate::{MemberError, RegistryError, Result};
use reflect::{Accessor, ErasedTable};

#[derive(Clone)]
struct Slot {
    object: Arc<Object>,
    type_id: TypeId,
    table: Arc<ErasedTable>,
}

/// Concurrent id → object map with cached member accessors.
///
/// Entries are cloned out of the map before any user code runs, so member
/// implementations may call back into the registry.
pub struct ObjectRegistry {
    objects: DashMap<String, Slot>,
    tables: DashMap<TypeId, Arc<ErasedTable>>,
    accessors: DashMap<(TypeId, String), Accessor>,
    invoker: Invoker,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::with_invoker(Invoker::new())
    }

    pub fn with_invoker(invoker: Invoker) -> Self {
        Self {
            objects: DashMap::new(),
            tables: DashMap::new(),
            accessors: DashMap::new(),
            invoker,
        }
    }

    /// Maps `id` to `object`, replacing any previous mapping.
    ///
    /// Returns false (and registers nothing) when `id` is empty.
    pub fn register_id<T: Reflect>(&self, id: &str, object: Arc<T>) -> bool {
        if id.is_empty() {
            warn!(
                target: "runtime::registry",
                type_name = type_name::<T>(),
                "rejected registration with empty id"
            );
            return false;
        }

        let table = self.table_for::<T>();
        let slot = Slot {
            object,
            type_id: TypeId::of::<T>(),
            table,
        };
        let replaced = self.objects.insert(id.to_owned(), slot);
        debug!(
            target: "runtime::registry",
            id,
            type_name = type_name::<T>(),
            replaced = replaced.is_some(),
            "object registered"
        );
        true
    }

    /// Removes the mapping for `id`. Cached accessors stay.
    pub fn unregister_id(&self, id: &str) -> bool {
        if id.is_empty() {
            warn!(target: "runtime::registry", "rejected unregistration with empty id");
            return false;
        }
        let removed = self.objects.remove(id).is_some();
        if removed {
            debug!(target: "runtime::registry", id, "object unregistered");
        }
        removed
    }

    /// The object registered under `id`, if it is a `T`.
    pub fn get_by_id<T: Reflect>(&self, id: &str) -> Option<Arc<T>> {
        self.try_get_by_id(id)
            .map_err(|err| report("get_by_id", &err))
            .ok()
    }

    pub fn try_get_by_id<T: Reflect>(&self, id: &str) -> Result<Arc<T>> {
        let slot = self.slot(id)?;
        slot.object
            .downcast::<T>()
            .map_err(|_| RegistryError::WrongType {
                id: id.to_owned(),
                expected: type_name::<T>(),
            })
    }

    /// Calls the named method of the object under `id`.
    ///
    /// Returns `None` if the object or method cannot be resolved or the method
    /// fails; the failure is logged. Methods without a result yield
    /// `Some(Value::Null)`.
    pub fn call_method_by_id(&self, id: &str, method: &str, args: &[Value]) -> Option<Value> {
        self.try_call_method(id, method, args)
            .map_err(|err| report("call_method_by_id", &err))
            .ok()
    }

    pub fn try_call_method(&self, id: &str, method: &str, args: &[Value]) -> Result<Value> {
        let slot = self.slot(id)?;
        let outcome = self
            .accessor(&slot, method)
            .and_then(|accessor| match accessor {
                Accessor::Method(call) => call(slot.object.as_ref(), args),
                other => Err(wrong_kind(&slot, method, "a method", &other)),
            });
        member_result(id, method, outcome)
    }

    /// Reads the named field or property of the object under `id`.
    pub fn get_value_by_id(&self, id: &str, member: &str) -> Option<Value> {
        self.try_get_value(id, member)
            .map_err(|err| report("get_value_by_id", &err))
            .ok()
    }

    pub fn try_get_value(&self, id: &str, member: &str) -> Result<Value> {
        let slot = self.slot(id)?;
        let outcome = self
            .accessor(&slot, member)
            .and_then(|accessor| match accessor {
                Accessor::Field { get, .. } | Accessor::Property { get, .. } => {
                    get(slot.object.as_ref())
                }
                other => Err(wrong_kind(&slot, member, "a field or property", &other)),
            });
        member_result(id, member, outcome)
    }

    /// Writes the named field or property of the object under `id`.
    ///
    /// Properties declared without a setter are not writable.
    pub fn set_value_by_id(&self, id: &str, member: &str, value: Value) -> bool {
        self.try_set_value(id, member, value)
            .map_err(|err| report("set_value_by_id", &err))
            .is_ok()
    }

    pub fn try_set_value(&self, id: &str, member: &str, value: Value) -> Result<()> {
        let slot = self.slot(id)?;
        let outcome = self
            .accessor(&slot, member)
            .and_then(|accessor| match accessor {
                Accessor::Field { set, .. }
                | Accessor::Property {
                    set: Some(set), ..
                } => set(slot.object.as_ref(), value),
                Accessor::Property { set: None, .. } => Err(MemberError::NotWritable {
                    type_name: slot.table.type_name,
                    member: member.to_owned(),
                }),
                other => Err(wrong_kind(&slot, member, "a field or property", &other)),
            });
        member_result(id, member, outcome)
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Registers `handler` under `key` on the owned invoker.
    pub fn register_invoker(
        &self,
        key: &str,
        registration: Registration,
        handler: Handler,
    ) -> invoker::Result<InvokerToken> {
        self.invoker.register_with(key, registration, handler)
    }

    /// Invokes `key` on the owned invoker. See [`Invoker::try_invoke`].
    pub fn invoke_key(&self, key: &str, args: &[Value]) -> bool {
        self.invoker.try_invoke(key, args)
    }

    /// Paid invocation on the owned invoker. See [`Invoker::pay`].
    pub fn pay_invoke(&self, key: &str, token: Option<&Value>, args: &[Value]) -> bool {
        self.invoker.pay(key, token, args)
    }

    pub fn has_invoker(&self, key: &str) -> bool {
        self.invoker.has_invoker(key)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.objects.iter().map(|entry| entry.key().clone()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drops every object, member table, cached accessor and invoker key.
    pub fn clear(&self) {
        let ids: Vec<String> = self.objects.iter().map(|entry| entry.key().clone()).collect();
        for id in &ids {
            self.objects.remove(id);
        }
        self.accessors.clear();
        self.tables.clear();
        self.invoker.clear();
        debug!(target: "runtime::registry", objects = ids.len(), "registry cleared");
    }

    fn slot(&self, id: &str) -> Result<Slot> {
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        self.objects
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::UnknownId(id.to_owned()))
    }

    fn table_for<T: Reflect>(&self) -> Arc<ErasedTable> {
        let type_id = TypeId::of::<T>();
        if let Some(table) = self.tables.get(&type_id) {
            return Arc::clone(table.value());
        }

        let table = Arc::new(T::members().into_erased());
        trace!(
            target: "runtime::registry",
            type_name = table.type_name,
            members = table.len(),
            "member table built"
        );
        Arc::clone(self.tables.entry(type_id).or_insert(table).value())
    }

    fn accessor(&self, slot: &Slot, name: &str) -> std::result::Result<Accessor, MemberError> {
        let key = (slot.type_id, name.to_owned());
        if let Some(accessor) = self.accessors.get(&key) {
            return Ok(accessor.value().clone());
        }

        let accessor = slot
            .table
            .get(name)
            .cloned()
            .ok_or_else(|| MemberError::NotFound {
                type_name: slot.table.type_name,
                member: name.to_owned(),
            })?;
        trace!(
            target: "runtime::registry",
            type_name = slot.table.type_name,
            member = name,
            kind = %accessor.kind(),
            "accessor cached"
        );
        self.accessors.insert(key, accessor.clone());
        Ok(accessor)
    }

    #[cfg(test)]
    fn cached_accessors(&self) -> usize {
        self.accessors.len()
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("ids", &self.ids())
            .field("invoker", &self.invoker)
            .finish()
    }
}

fn wrong_kind(slot: &Slot, member: &str, expected: &'static str, found: &Accessor) -> MemberError {
    MemberError::WrongKind {
        type_name: slot.table.type_name,
        member: member.to_owned(),
        expected,
        found: found.kind(),
    }
}

fn member_result<R>(
    id: &str,
    member: &str,
    outcome: std::result::Result<R, MemberError>,
) -> Result<R> {
    outcome.map_err(|source| RegistryError::Member {
        id: id.to_owned(),
        member: member.to_owned(),
        source,
    })
}

/// Logs a failure that is about to be flattened into `false`/`None`.
fn report(operation: &'static str, err: &RegistryError) {
    match err {
        RegistryError::UnknownId(id) => {
            debug!(target: "runtime::registry", operation, id = %id, "unknown object id");
        }
        _ => warn!(target: "runtime::registry", operation, error = ?err, "registry lookup failed"),
    }
}
