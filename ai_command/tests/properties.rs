mod common;

use std::collections::HashSet;

use ai_command::{
    Command, CommandClass, ControllerConfig, PushOutcome, PushPolicy, Status, LATENT_NONE,
};
use proptest::prelude::*;

use common::{harness, Alpha, Beta, Gamma, Harness, Journal, Probe, Step, TestPawn};

const THRESHOLD: usize = 4;
const HISTORY: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Push { kind: u8, policy: u8, script: u8 },
    PopAt(usize),
    AbortAt(usize),
    AbortClass(u8),
    Tick,
    /// Arms the default behaviour to push a self-stacking chain, then ticks.
    HostSpawn(u32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..3, 0u8..3, 0u8..5)
            .prop_map(|(kind, policy, script)| Op::Push { kind, policy, script }),
        1 => any::<usize>().prop_map(Op::PopAt),
        1 => any::<usize>().prop_map(Op::AbortAt),
        1 => (0u8..3).prop_map(Op::AbortClass),
        3 => Just(Op::Tick),
        1 => (1u32..10).prop_map(Op::HostSpawn),
    ]
}

fn class_of(kind: u8) -> CommandClass {
    match kind {
        0 => Probe::<Alpha>::class(),
        1 => Probe::<Beta>::class(),
        _ => Probe::<Gamma>::class(),
    }
}

fn spawned_child(journal: &Journal) -> Box<dyn Command<TestPawn>> {
    Probe::<Gamma>::new("spawned", journal)
        .policy(PushPolicy::allow())
        .script(vec![Step::Sleep(0.1), Step::Finish(Status::Success)])
        .boxed()
}

fn script_for(script: u8) -> Vec<Step> {
    match script {
        0 => vec![Step::Halt],
        1 => vec![Step::Sleep(0.15), Step::Halt],
        2 => vec![Step::Finish(Status::Success)],
        3 => vec![Step::Push(spawned_child), Step::Halt],
        _ => vec![Step::Latent(9), Step::Finish(Status::Failure)],
    }
}

fn build(kind: u8, policy: u8, script: u8, journal: &Journal) -> Box<dyn Command<TestPawn>> {
    let policy = match policy {
        0 => PushPolicy::default(),
        1 => PushPolicy::allow(),
        _ => PushPolicy::replace(),
    };
    let script = script_for(script);
    match kind {
        0 => Probe::<Alpha>::new("alpha", journal).policy(policy).script(script).boxed(),
        1 => Probe::<Beta>::new("beta", journal).policy(policy).script(script).boxed(),
        _ => Probe::<Gamma>::new("gamma", journal).policy(policy).script(script).boxed(),
    }
}

fn nth_id(h: &Harness, index: usize) -> Option<ai_command::CommandId> {
    let depth = h.controller.depth();
    if depth == 0 {
        return None;
    }
    h.controller.commands().nth(index % depth).map(|view| view.id())
}

fn check_chain(h: &Harness) -> Result<(), TestCaseError> {
    let views: Vec<_> = h.controller.commands().collect();
    prop_assert_eq!(views.len(), h.controller.depth());
    prop_assert_eq!(h.controller.active_command().is_some(), !views.is_empty());
    if let (Some(active), Some(last)) = (h.controller.active_command(), views.last()) {
        prop_assert_eq!(active.id(), last.id());
    }

    let ids: HashSet<_> = views.iter().map(|view| view.id()).collect();
    prop_assert_eq!(ids.len(), views.len(), "a command appears twice");
    for view in &views {
        prop_assert!(!view.is_aborted(), "aborted command left on the chain");
        prop_assert!(!view.is_pending_pop(), "popped command left on the chain");
    }

    let pending: Vec<_> = views
        .iter()
        .filter(|view| view.frame().is_latent_pending())
        .collect();
    prop_assert!(pending.len() <= 1, "{} frames hold latent actions", pending.len());
    if let (Some(holder), Some(last)) = (pending.first(), views.last()) {
        prop_assert_eq!(holder.id(), last.id());
    }
    if !views.is_empty() {
        prop_assert_eq!(h.controller.frame().latent_action(), LATENT_NONE);
    }

    let history = h.controller.history();
    prop_assert!(history.len() <= HISTORY);
    let times: Vec<f64> = history.iter().map(|entry| entry.time).collect();
    prop_assert!(
        times.windows(2).all(|pair| pair[0] >= pair[1]),
        "history out of order: {:?}",
        times
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Random push, pop, abort and tick sequences keep the chain well formed.
    #[test]
    fn prop_chain_stays_well_formed(ops in prop::collection::vec(arb_op(), 1..60)) {
        let config = ControllerConfig {
            history_capacity: HISTORY,
            runaway_threshold: THRESHOLD,
            abort_runaway: true,
        };
        let mut h = harness(config);

        for op in ops {
            if let Some(pawn) = h.controller.pawn_mut() {
                pawn.clock += 1.0;
            }
            match op {
                Op::Push { kind, policy, script } => {
                    let depth = h.controller.depth();
                    let logged = h.journal.entries().len();
                    let command = build(kind, policy, script, &h.journal);
                    let outcome = h.controller.push_command(command);
                    if outcome == PushOutcome::Ignored {
                        prop_assert_eq!(h.controller.depth(), depth);
                        prop_assert_eq!(h.journal.entries().len(), logged);
                    } else {
                        let active = h.controller.active_command().map(|view| view.id());
                        prop_assert_eq!(active, outcome.id());
                    }
                }
                Op::PopAt(index) => {
                    if let Some(id) = nth_id(&h, index) {
                        prop_assert!(h.controller.pop_command(id));
                        prop_assert!(h.controller.command(id).is_none());
                    }
                }
                Op::AbortAt(index) => {
                    if let Some(id) = nth_id(&h, index) {
                        prop_assert!(h.controller.abort_command(id));
                        prop_assert!(h.controller.command(id).is_none());
                    }
                }
                Op::AbortClass(kind) => {
                    let class = class_of(kind);
                    h.controller.abort_class(class);
                    prop_assert!(h.controller.find_command_of_class(class).is_none());
                }
                Op::Tick => {
                    let stacked = h.controller.has_commands();
                    let host_steps = h.host_steps.get();
                    h.controller.tick(0.1);
                    if stacked {
                        prop_assert_eq!(
                            h.host_steps.get(),
                            host_steps,
                            "host stepped under a command"
                        );
                    }
                    prop_assert!(!h.controller.is_runaway());
                    prop_assert!(h.controller.depth() <= THRESHOLD);
                }
                Op::HostSpawn(links) => {
                    h.host_spawn.set(links);
                    let runaways = h.controller.runaway_count();
                    h.controller.tick(0.1);
                    prop_assert!(!h.controller.is_runaway());
                    prop_assert!(h.controller.depth() <= THRESHOLD);
                    if h.host_spawn.get() == 0 && (links as usize) > THRESHOLD {
                        prop_assert_eq!(h.controller.runaway_count(), runaways + 1);
                    }
                }
            }
            check_chain(&h)?;
        }
    }

    /// Host state transitions are refused while any command is stacked.
    #[test]
    fn prop_host_goto_preempted_while_stacked(kinds in prop::collection::vec(0u8..3, 1..6)) {
        let mut h = harness(ControllerConfig::default());
        for kind in kinds {
            h.controller.push_command(build(kind, 1, 0, &h.journal));
        }
        let before = h.controller.frame().state();
        prop_assert_eq!(h.controller.goto_state("Alert"), ai_command::GotoStateOutcome::Preempted);
        prop_assert_eq!(h.controller.frame().state(), before);
    }
}
