//! Scripted playtest exercising cases, invocations and the object registry.
//!
//! The player aims, fires at a bandit until the magazine runs dry, reloads,
//! gets interrupted by a dialogue and keeps firing until the bandit goes down,
//! which plays a short cutscene. Input is ignored while a blocking case is
//! active.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use case_stack::{Action, Case, CaseToken, action};
use invoker::{InvokerToken, Layer, Registration, arg, handler};
use runtime::Session;
use serde_json::json;
use tracing::{debug, info};

use crate::objects::{Npc, Rifle};

pub const RIFLE_ID: &str = "player_rifle";
pub const BANDIT_ID: &str = "npc_bandit01";

pub const WEAPON_FIRED: &str = "weapon.fired";
pub const BANDIT_HP_CHANGED: &str = "npc_bandit01_hp_changed";
pub const BANDIT_DIED: &str = "npc_bandit01_died";

/// Knobs of a [`Playtest`] run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaytestConfig {
    pub frame: Duration,
    pub max_frames: u32,
    pub magazine: u32,
    pub damage_per_shot: i64,
    pub bandit_hp: i64,
    pub reload_time: Duration,
    /// Frame at which the dialogue interrupts the fight.
    pub dialogue_at: u32,
    pub dialogue_time: Duration,
    pub cutscene_time: Duration,
}

impl PlaytestConfig {
    pub const DEFAULT_FRAME: Duration = Duration::from_millis(50);
    pub const DEFAULT_MAX_FRAMES: u32 = 200;

    pub fn new() -> Self {
        Self {
            frame: Self::DEFAULT_FRAME,
            max_frames: Self::DEFAULT_MAX_FRAMES,
            magazine: 5,
            damage_per_shot: 15,
            bandit_hp: 100,
            reload_time: Duration::from_millis(300),
            dialogue_at: 8,
            dialogue_time: Duration::from_millis(200),
            cutscene_time: Duration::from_millis(150),
        }
    }
}

impl Default for PlaytestConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a [`Playtest`] run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaytestReport {
    pub frames: u32,
    pub shots: u32,
    pub reloads: u32,
    pub blocked_inputs: u32,
    pub bandit_hp: i64,
    pub bandit_down: bool,
    pub final_case: Case,
}

#[derive(Default)]
struct Stats {
    shots: AtomicU32,
    reloads: AtomicU32,
    bandit_down: AtomicBool,
}

/// Drives one scripted session frame by frame.
pub struct Playtest {
    session: &'static Session,
    config: PlaytestConfig,
    stats: Arc<Stats>,
    fire: Action,
    reload: Action,
    cases: Vec<CaseToken>,
    handlers: Vec<InvokerToken>,
}

impl Playtest {
    /// Registers the objects and handlers of the scenario on `session`.
    pub fn setup(session: &'static Session, config: PlaytestConfig) -> Result<Self> {
        let registry = session.registry();
        registry.register_id(RIFLE_ID, Rifle::new(config.magazine));
        registry.register_id(BANDIT_ID, Npc::new("bandit", config.bandit_hp));

        let stats = Arc::new(Stats::default());
        let handlers = Self::register_handlers(session, &config, &stats)?;
        let reload = Self::reload_action(session);
        let fire = Self::fire_action(session, &config, &stats, Arc::clone(&reload));

        Ok(Self {
            session,
            config,
            stats,
            fire,
            reload,
            cases: Vec::new(),
            handlers,
        })
    }

    fn register_handlers(
        session: &'static Session,
        config: &PlaytestConfig,
        stats: &Arc<Stats>,
    ) -> Result<Vec<InvokerToken>> {
        let registry = session.registry();
        let mut tokens = Vec::new();

        let shots = Arc::clone(stats);
        tokens.push(
            registry
                .register_invoker(
                    WEAPON_FIRED,
                    Registration::on(Layer::Overlay).label("hud.ammo"),
                    handler(move |args| {
                        let weapon: String = arg(args, 0)?;
                        let ammo: u32 = arg(args, 1)?;
                        shots.shots.fetch_add(1, Ordering::SeqCst);
                        debug!(target: "playtest", weapon = %weapon, ammo, "shot fired");
                        Ok(())
                    }),
                )
                .context("registering weapon listener")?,
        );

        tokens.push(
            registry
                .register_invoker(
                    BANDIT_HP_CHANGED,
                    Registration::new().label("bandit.death_check"),
                    handler(move |args| {
                        let hp: i64 = arg(args, 0)?;
                        if hp <= 0 {
                            session.registry().invoke_key(BANDIT_DIED, &[json!(hp)]);
                        }
                        Ok(())
                    }),
                )
                .context("registering hp listener")?,
        );

        let down = Arc::clone(stats);
        let cutscene = config.cutscene_time;
        tokens.push(
            registry
                .register_invoker(
                    BANDIT_DIED,
                    Registration::on(Layer::Blocking).label("bandit.cutscene"),
                    handler(move |_| {
                        down.bandit_down.store(true, Ordering::SeqCst);
                        session.cases().pop_case(Case::Fire);
                        session
                            .cases()
                            .push_for(Case::Cutscene, cutscene)
                            .map_err(|e| e.to_string())?;
                        info!(target: "playtest", "bandit down");
                        Ok(())
                    }),
                )
                .context("registering death listener")?,
        );

        Ok(tokens)
    }

    /// One shot per frame while `Fire` is active. An empty magazine swaps
    /// `Fire` for a timed `Reload`.
    fn fire_action(
        session: &'static Session,
        config: &PlaytestConfig,
        stats: &Arc<Stats>,
        reload: Action,
    ) -> Action {
        let damage = config.damage_per_shot;
        let reload_time = config.reload_time;
        let stats = Arc::clone(stats);
        action(move || {
            let registry = session.registry();
            let Some(ammo) = registry.call_method_by_id(RIFLE_ID, "fire", &[]) else {
                let cases = session.cases();
                cases.pop_case(Case::Fire);
                cases
                    .register_action(Case::Reload, Arc::clone(&reload))
                    .and_then(|()| cases.push_for(Case::Reload, reload_time))
                    .map_err(|e| e.to_string())?;
                stats.reloads.fetch_add(1, Ordering::SeqCst);
                return Ok(());
            };
            registry.invoke_key(WEAPON_FIRED, &[json!("rifle"), ammo]);

            let hp = registry
                .call_method_by_id(BANDIT_ID, "damage", &[json!(damage)])
                .ok_or("bandit is not registered")?;
            registry.invoke_key(BANDIT_HP_CHANGED, &[hp]);
            Ok(())
        })
    }

    /// Loads one round per frame until the case expires.
    fn reload_action(session: &'static Session) -> Action {
        action(move || {
            session
                .registry()
                .call_method_by_id(RIFLE_ID, "load_round", &[])
                .map(|_| ())
                .ok_or_else(|| "rifle is not registered".into())
        })
    }

    /// Runs frames until the bandit is down and the cutscene is over, or the
    /// frame budget is spent.
    pub fn run(mut self) -> Result<PlaytestReport> {
        let cases = self.session.cases();
        cases.push(Case::Aim).context("pushing aim")?;

        let mut frames = 0;
        let mut blocked_inputs = 0;
        while frames < self.config.max_frames {
            if frames == self.config.dialogue_at {
                cases
                    .push_for(Case::Dialogue, self.config.dialogue_time)
                    .context("pushing dialogue")?;
                info!(target: "playtest", frame = frames, "dialogue started");
            }

            // Trigger held every frame.
            if cases.current_case().is_blocking() {
                blocked_inputs += 1;
            } else if !self.down() && !cases.has_case(Case::Fire) && !cases.has_case(Case::Reload)
            {
                let token = cases
                    .push_with(Case::Fire, Arc::clone(&self.fire))
                    .context("pushing fire")?;
                self.cases.push(token);
            }

            self.session.tick(self.config.frame);
            frames += 1;

            if self.down() && !cases.has_case(Case::Cutscene) {
                break;
            }
        }

        let report = PlaytestReport {
            frames,
            shots: self.stats.shots.load(Ordering::SeqCst),
            reloads: self.stats.reloads.load(Ordering::SeqCst),
            blocked_inputs,
            bandit_hp: self
                .session
                .registry()
                .get_by_id::<Npc>(BANDIT_ID)
                .map_or(0, |npc| npc.hp()),
            bandit_down: self.down(),
            final_case: cases.current_case(),
        };
        self.release();
        Ok(report)
    }

    fn down(&self) -> bool {
        self.stats.bandit_down.load(Ordering::SeqCst)
    }

    fn release(&mut self) {
        for token in self.cases.drain(..) {
            token.dispose();
        }
        for token in self.handlers.drain(..) {
            token.dispose();
        }
        let cases = self.session.cases();
        if cases.unregister_action(Case::Reload, &self.reload) {
            debug!(target: "playtest", "reload action detached");
        }
    }
}
