//! Cross-component flows through a [`Session`].

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::Duration;

use case_stack::{Case, action};
use invoker::{Layer, Registration, Value, arg, handler};
use parking_lot::Mutex;
use runtime::{MemberError, MemberTable, Reflect, Session, SessionConfig, param};
use serde_json::json;

struct Npc {
    hp: AtomicI64,
    name: String,
}

impl Reflect for Npc {
    fn members() -> MemberTable<Self> {
        MemberTable::new()
            .field_as(
                "hp",
                |npc: &Npc| npc.hp.load(Ordering::SeqCst),
                |npc, hp| npc.hp.store(hp, Ordering::SeqCst),
            )
            .property_as("name", |npc: &Npc| npc.name.clone())
            .method("damage", |npc: &Npc, args| {
                let amount: i64 = param(args, 0)?;
                if amount < 0 {
                    return Err(MemberError::failed("negative damage"));
                }
                Ok(json!(npc.hp.fetch_sub(amount, Ordering::SeqCst) - amount))
            })
    }
}

fn bandit() -> Arc<Npc> {
    Arc::new(Npc {
        hp: AtomicI64::new(100),
        name: "bandit".into(),
    })
}

#[test]
fn method_call_publishes_through_forwarded_invoker() {
    let session = Session::new(SessionConfig::default());
    let registry = session.registry();
    registry.register_id("npc_bandit01", bandit());

    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);
    let _token = registry
        .register_invoker(
            "npc_bandit01_hp_changed",
            Registration::on(Layer::Overlay).label("hp-bar"),
            handler(move |args| {
                sink.lock().push(arg::<i64>(args, 0)?);
                Ok(())
            }),
        )
        .expect("register");

    let hp = registry
        .call_method_by_id("npc_bandit01", "damage", &[json!(30)])
        .expect("damage");
    assert!(registry.invoke_key("npc_bandit01_hp_changed", &[hp]));

    assert_eq!(*observed.lock(), vec![70]);
    assert_eq!(
        registry.get_value_by_id("npc_bandit01", "name"),
        Some(json!("bandit"))
    );
}

#[test]
fn failing_method_is_swallowed() {
    let session = Session::default();
    session.registry().register_id("npc", bandit());

    assert_eq!(
        session
            .registry()
            .call_method_by_id("npc", "damage", &[json!(-5)]),
        None
    );
    assert_eq!(
        session
            .registry()
            .call_method_by_id("npc", "damage", &[json!("lots")]),
        None
    );
    assert_eq!(
        session.registry().get_value_by_id("npc", "hp"),
        Some(json!(100))
    );
}

#[test]
fn combat_action_reaches_objects_by_id() {
    let session = Arc::new(Session::default());
    session.registry().register_id("npc", bandit());

    let worker = Arc::clone(&session);
    let token = session
        .cases()
        .push_with(
            Case::Combat,
            action(move || {
                worker
                    .registry()
                    .call_method_by_id("npc", "damage", &[json!(10)])
                    .map(|_| ())
                    .ok_or_else(|| "npc is gone".into())
            }),
        )
        .expect("push");

    for _ in 0..3 {
        session.tick(Duration::from_millis(16));
    }
    assert_eq!(session.registry().get_value_by_id("npc", "hp"), Some(json!(70)));

    session.cases().push(Case::Dialogue).expect("push");
    session.tick(Duration::from_millis(16));
    assert_eq!(session.registry().get_value_by_id("npc", "hp"), Some(json!(70)));

    token.dispose();
    assert_eq!(session.cases().current_case(), Case::Dialogue);
    assert!(!session.cases().has_case(Case::Combat));
}

#[test]
fn handler_writes_member_by_id() {
    let session = Arc::new(Session::default());
    session.registry().register_id("npc", bandit());

    let writer = Arc::clone(&session);
    let _token = session
        .invoker()
        .register(
            "npc.heal",
            handler(move |args| {
                let hp: i64 = arg(args, 0)?;
                if writer.registry().set_value_by_id("npc", "hp", json!(hp)) {
                    Ok(())
                } else {
                    Err("npc rejected hp".into())
                }
            }),
        )
        .expect("register");

    assert!(session.invoker().try_invoke("npc.heal", &[json!(150)]));
    assert_eq!(session.registry().get_value_by_id("npc", "hp"), Some(json!(150)));
}

#[test]
fn pay_invoke_selects_by_metadata() {
    let session = Session::default();
    let spent = Arc::new(AtomicU32::new(0));

    let mut tokens = Vec::new();
    for (currency, price) in [("gold", 10), ("gems", 1)] {
        let spent = Arc::clone(&spent);
        tokens.push(
            session
                .registry()
                .register_invoker(
                    "vendor.sell",
                    Registration::new().metadata(currency),
                    handler(move |_| {
                        spent.fetch_add(price, Ordering::SeqCst);
                        Ok(())
                    }),
                )
                .expect("register"),
        );
    }

    assert!(session.registry().pay_invoke("vendor.sell", Some(&Value::from("gems")), &[]));
    assert_eq!(spent.load(Ordering::SeqCst), 1);
    assert!(session.registry().pay_invoke("vendor.sell", None, &[]));
    assert_eq!(spent.load(Ordering::SeqCst), 12);
}

#[test]
fn teardown_leaves_tokens_harmless() {
    let session = Session::default();
    let case_token = session
        .cases()
        .push_with(Case::Aim, action(|| Ok(())))
        .expect("push");
    let invoker_token = session
        .invoker()
        .register("k", handler(|_| Ok(())))
        .expect("register");
    session.registry().register_id("npc", bandit());

    session.teardown();
    case_token.dispose();
    invoker_token.dispose();

    assert!(session.cases().is_empty());
    assert!(session.registry().is_empty());
    assert!(!session.invoker().has_invoker("k"));

    // The session is reusable after teardown.
    session.registry().register_id("npc", bandit());
    assert_eq!(session.registry().get_value_by_id("npc", "hp"), Some(json!(100)));
}
