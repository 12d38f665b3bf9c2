//! Scenario Fuzzer - seeded random operation sequences
//!
//! Drives a `Harness<u8>` with random sets, temporal overrides, list adds,
//! removes, reads and time steps, and checks after every step:
//! - the effective state matches the last `set` / live temporal override
//! - rewrite mode never holds two entries for one value
//! - a sweep leaves no expired entry behind and reports exactly the values
//!   that had a live entry before it ran
//! - add notifications match appended entries
//! - collider verdicts agree with the state and list they read

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statefy_core::{StatefyConfig, Timestamp};
use statefy_state::Collider;

use crate::{Harness, Recorder};

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Number of operations to run
    pub op_count: usize,
    /// Values are drawn from `0..value_count`
    pub value_count: u8,
    /// Upper bound for lifetimes and override durations
    pub max_lifetime_ms: u64,
    /// Upper bound for a single time step
    pub max_step_ms: u64,
    /// Container configuration under test
    pub container: StatefyConfig,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            op_count: 1000,
            value_count: 6,
            max_lifetime_ms: 200,
            max_step_ms: 50,
            container: StatefyConfig::default(),
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            op_count: 200,
            ..Self::default()
        }
    }

    /// Duplicate entries allowed
    pub fn stacking() -> Self {
        FuzzerConfig {
            container: StatefyConfig::stacking(),
            ..Self::default()
        }
    }

    /// Every set notifies
    pub fn forced() -> Self {
        FuzzerConfig {
            container: StatefyConfig::forced(),
            ..Self::default()
        }
    }
}

/// Operation applied to the container
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Set(u8),
    SetTemporal(u8, u64),
    Add(u8, u64),
    Remove(u8),
    Sweep,
    Collide,
    Advance(u64),
}

/// Fuzzing outcome
#[derive(Clone, Debug, Default)]
pub struct FuzzReport {
    pub ops_run: usize,
    pub adds_appended: usize,
    pub removes_matched: usize,
    pub sweeps: usize,
    pub violations: Vec<String>,
}

impl FuzzReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Last override armed, tracked independently of the container
struct ArmedOverride {
    value: u8,
    at: Timestamp,
    duration: Duration,
}

/// Runs random scenarios against a container
pub struct ScenarioFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
}

impl ScenarioFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        ScenarioFuzzer { config, rng }
    }

    fn next_op(&mut self) -> Op {
        let value = self.rng.gen_range(0..self.config.value_count.max(1));
        let lifetime = self.rng.gen_range(0..=self.config.max_lifetime_ms);
        match self.rng.gen_range(0..10) {
            0 | 1 => Op::Set(value),
            2 => Op::SetTemporal(value, lifetime),
            3 | 4 => Op::Add(value, lifetime),
            5 => Op::Remove(value),
            6 => Op::Sweep,
            7 => Op::Collide,
            _ => Op::Advance(self.rng.gen_range(0..=self.config.max_step_ms)),
        }
    }

    /// Run the configured number of random operations
    pub fn run(&mut self) -> FuzzReport {
        let ops: Vec<Op> = (0..self.config.op_count).map(|_| self.next_op()).collect();
        self.run_ops(&ops)
    }

    /// Run a fixed operation sequence
    pub fn run_ops(&self, ops: &[Op]) -> FuzzReport {
        let harness = Harness::with_config(0u8, self.config.container.clone());
        let recorder = Recorder::attach(harness.statefy());
        let forbidden: Vec<u8> = (0..self.config.value_count.max(1)).step_by(2).collect();
        let collider = harness.statefy().create_collider(forbidden.clone());

        let mut report = FuzzReport::default();
        let mut current = 0u8;
        let mut armed: Option<ArmedOverride> = None;

        for (step, op) in ops.iter().enumerate() {
            let statefy = harness.statefy();
            match *op {
                Op::Set(value) => {
                    statefy.set(value);
                    current = value;
                }
                Op::SetTemporal(value, ms) => {
                    let duration = Duration::from_millis(ms);
                    statefy.set_temporal(value, duration);
                    armed = Some(ArmedOverride {
                        value,
                        at: harness.now(),
                        duration,
                    });
                }
                Op::Add(value, ms) => {
                    let before = statefy.list_entries().len();
                    statefy.add(value, Duration::from_millis(ms));
                    if statefy.list_entries().len() > before {
                        report.adds_appended += 1;
                    }
                }
                Op::Remove(value) => {
                    if statefy.remove(&value) {
                        report.removes_matched += 1;
                    }
                }
                Op::Sweep => {
                    report.sweeps += 1;
                    self.check_sweep(&harness, step, &mut report);
                }
                Op::Collide => {
                    self.check_collider(&harness, &collider, &forbidden, step, &mut report);
                }
                Op::Advance(ms) => {
                    harness.advance_ms(ms);
                }
            }
            harness.settle();
            report.ops_run += 1;

            let expected = match &armed {
                Some(o) if harness.now() - o.at < o.duration => o.value,
                _ => current,
            };
            let actual = statefy.get();
            if actual != expected {
                report.violations.push(format!(
                    "step {}: {:?} left state {} but expected {}",
                    step, op, actual, expected
                ));
            }

            if self.config.container.list_rewrite {
                let entries = statefy.list_entries();
                for value in 0..self.config.value_count {
                    let count = entries.iter().filter(|e| e.state == value).count();
                    if count > 1 {
                        report.violations.push(format!(
                            "step {}: {} entries for value {} under rewrite",
                            step, count, value
                        ));
                    }
                }
            }

            let added = recorder.added().len();
            if added != report.adds_appended {
                report.violations.push(format!(
                    "step {}: {} add notifications for {} appended entries",
                    step, added, report.adds_appended
                ));
            }
        }

        report
    }

    fn check_sweep(&self, harness: &Harness<u8>, step: usize, report: &mut FuzzReport) {
        let statefy = harness.statefy();
        let now = harness.now();
        let before = statefy.list_entries();
        let states = statefy.get_list_states();
        let entries = statefy.list_entries();

        if let Some(stale) = entries.iter().find(|e| !e.is_alive(now)) {
            report
                .violations
                .push(format!("step {}: expired entry {:?} survived a sweep", step, stale));
        }
        for value in &states {
            if !before.iter().any(|e| e.state == *value && e.is_alive(now)) {
                report
                    .violations
                    .push(format!("step {}: sweep returned dead value {}", step, value));
            }
        }
        if let Some(missed) = before
            .iter()
            .find(|e| e.is_alive(now) && !states.contains(&e.state))
        {
            report
                .violations
                .push(format!("step {}: sweep missed live entry {:?}", step, missed));
        }
    }

    fn check_collider(
        &self,
        harness: &Harness<u8>,
        collider: &Collider<u8>,
        forbidden: &[u8],
        step: usize,
        report: &mut FuzzReport,
    ) {
        let statefy = harness.statefy();
        let states = statefy.get_list_states();
        let state_ok = !forbidden.contains(&statefy.get());
        let list_ok = !states.iter().any(|s| forbidden.contains(s));

        if collider.check() != (state_ok && list_ok) {
            report.violations.push(format!(
                "step {}: collider said {} for state {} and list {:?}",
                step,
                collider.check(),
                statefy.get(),
                states
            ));
        }
    }
}
