//! Gameplay objects exposed to the registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use runtime::{MemberError, MemberTable, Reflect, param};
use serde_json::{Value, json};

/// Magazine-fed weapon.
#[derive(Debug)]
pub struct Rifle {
    ammo: AtomicU32,
    capacity: u32,
}

impl Rifle {
    pub fn new(capacity: u32) -> Arc<Self> {
        Arc::new(Self {
            ammo: AtomicU32::new(capacity),
            capacity,
        })
    }

    pub fn ammo(&self) -> u32 {
        self.ammo.load(Ordering::SeqCst)
    }
}

impl Reflect for Rifle {
    fn members() -> MemberTable<Self> {
        MemberTable::new()
            .field_as(
                "ammo",
                |rifle: &Rifle| rifle.ammo(),
                |rifle, ammo: u32| rifle.ammo.store(ammo.min(rifle.capacity), Ordering::SeqCst),
            )
            .property_as("capacity", |rifle: &Rifle| rifle.capacity)
            // Returns the rounds left after the shot.
            .method("fire", |rifle: &Rifle, _| {
                let left = rifle
                    .ammo
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |ammo| ammo.checked_sub(1))
                    .map_err(|_| MemberError::failed("magazine empty"))?;
                Ok(json!(left - 1))
            })
            // Loads one round; returns whether the magazine is full.
            .method("load_round", |rifle: &Rifle, _| {
                let loaded = rifle
                    .ammo
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |ammo| {
                        (ammo < rifle.capacity).then_some(ammo + 1)
                    })
                    .map_or(rifle.capacity, |before| before + 1);
                Ok(Value::Bool(loaded >= rifle.capacity))
            })
    }
}

/// Non-player character with hit points.
#[derive(Debug)]
pub struct Npc {
    name: String,
    hp: AtomicI64,
}

impl Npc {
    pub fn new(name: impl Into<String>, hp: i64) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            hp: AtomicI64::new(hp),
        })
    }

    pub fn hp(&self) -> i64 {
        self.hp.load(Ordering::SeqCst)
    }
}

impl Reflect for Npc {
    fn members() -> MemberTable<Self> {
        MemberTable::new()
            .field_as(
                "hp",
                |npc: &Npc| npc.hp(),
                |npc, hp: i64| npc.hp.store(hp, Ordering::SeqCst),
            )
            .property_as("name", |npc: &Npc| npc.name.clone())
            .property("alive", |npc: &Npc| Value::Bool(npc.hp() > 0))
            .method("damage", |npc: &Npc, args| {
                let amount: i64 = param(args, 0)?;
                if amount < 0 {
                    return Err(MemberError::failed("damage must not be negative"));
                }
                let before = npc.hp.fetch_sub(amount, Ordering::SeqCst);
                Ok(json!(before - amount))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::ObjectRegistry;

    #[test]
    fn rifle_runs_dry_and_reloads() {
        let registry = ObjectRegistry::new();
        let rifle = Rifle::new(2);
        registry.register_id("rifle", Arc::clone(&rifle));

        assert_eq!(registry.call_method_by_id("rifle", "fire", &[]), Some(json!(1)));
        assert_eq!(registry.call_method_by_id("rifle", "fire", &[]), Some(json!(0)));
        assert_eq!(registry.call_method_by_id("rifle", "fire", &[]), None);

        assert_eq!(
            registry.call_method_by_id("rifle", "load_round", &[]),
            Some(json!(false))
        );
        assert_eq!(
            registry.call_method_by_id("rifle", "load_round", &[]),
            Some(json!(true))
        );
        assert_eq!(
            registry.call_method_by_id("rifle", "load_round", &[]),
            Some(json!(true))
        );
        assert_eq!(rifle.ammo(), 2);
    }

    #[test]
    fn rifle_ammo_is_clamped_to_capacity() {
        let registry = ObjectRegistry::new();
        let rifle = Rifle::new(30);
        registry.register_id("rifle", Arc::clone(&rifle));

        assert!(registry.set_value_by_id("rifle", "ammo", json!(99)));
        assert_eq!(rifle.ammo(), 30);
        assert!(!registry.set_value_by_id("rifle", "capacity", json!(99)));
    }

    #[test]
    fn npc_takes_damage() {
        let registry = ObjectRegistry::new();
        registry.register_id("npc", Npc::new("bandit", 25));

        assert_eq!(
            registry.call_method_by_id("npc", "damage", &[json!(30)]),
            Some(json!(-5))
        );
        assert_eq!(registry.get_value_by_id("npc", "alive"), Some(json!(false)));
        assert_eq!(registry.get_value_by_id("npc", "name"), Some(json!("bandit")));
    }
}
