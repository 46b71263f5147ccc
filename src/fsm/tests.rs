use super::*;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Trace {
    calls: Vec<String>,
}

fn exit_hidden(trace: &mut Trace, t: Transition) {
    trace.calls.push(format!("exit {}", t.from));
}

fn enter_engaged(trace: &mut Trace, t: Transition) {
    trace.calls.push(format!("enter {}", t.to));
}

fn second_enter_engaged(trace: &mut Trace, _t: Transition) {
    trace.calls.push("enter again".to_string());
}

#[test]
fn adjacency_table_matches_lifecycle() {
    use EntityState::*;
    let legal = [
        (Hidden, Peeking),
        (Hidden, Engaged),
        (Peeking, Engaged),
        (Peeking, Fleeing),
        (Peeking, Hidden),
        (Engaged, Fleeing),
        (Engaged, Hidden),
        (Fleeing, Hidden),
    ];
    for from in EntityState::ALL {
        for to in EntityState::ALL {
            assert_eq!(
                from.can_transition_to(to),
                legal.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn illegal_transitions_leave_state_untouched() {
    let mut trace = Trace::default();
    let mut fsm: StateMachine<Trace> = StateMachine::new(EntityState::Hidden);
    fsm.on_exit(EntityState::Hidden, exit_hidden);
    assert!(!fsm.transition_to(&mut trace, EntityState::Fleeing));
    assert_eq!(fsm.state(), EntityState::Hidden);
    assert!(trace.calls.is_empty());

    assert!(fsm.transition_to(&mut trace, EntityState::Engaged));
    assert!(!fsm.transition_to(&mut trace, EntityState::Peeking));
    assert!(!fsm.transition_to(&mut trace, EntityState::Engaged));
    assert_eq!(fsm.state(), EntityState::Engaged);
}

#[test]
fn try_transition_reports_illegal_pair() {
    let mut trace = Trace::default();
    let mut fsm: StateMachine<Trace> = StateMachine::new(EntityState::Fleeing);
    let err = fsm
        .try_transition(&mut trace, EntityState::Engaged)
        .unwrap_err();
    assert_eq!(
        err,
        CompanionError::IllegalTransition {
            from: EntityState::Fleeing,
            to: EntityState::Engaged
        }
    );
}

#[test]
fn hooks_and_listeners_run_in_order() {
    let mut trace = Trace::default();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut fsm: StateMachine<Trace> = StateMachine::new(EntityState::Hidden);
    fsm.on_exit(EntityState::Hidden, exit_hidden);
    fsm.on_enter(EntityState::Engaged, enter_engaged);
    fsm.on_enter(EntityState::Engaged, second_enter_engaged);
    let sink = Arc::clone(&seen);
    fsm.subscribe(Box::new(move |t: Transition| {
        sink.lock().unwrap().push((t.from, t.to));
    }));

    let transition = fsm
        .try_transition(&mut trace, EntityState::Engaged)
        .unwrap();
    assert_eq!(transition.from, EntityState::Hidden);
    assert_eq!(
        trace.calls,
        vec!["exit HIDDEN", "enter ENGAGED", "enter again"]
    );
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(EntityState::Hidden, EntityState::Engaged)]
    );
}

#[test]
fn full_cycle_through_fleeing() {
    let mut trace = Trace::default();
    let mut fsm: StateMachine<Trace> = StateMachine::new(EntityState::Hidden);
    for next in [
        EntityState::Peeking,
        EntityState::Engaged,
        EntityState::Fleeing,
        EntityState::Hidden,
    ] {
        assert!(fsm.transition_to(&mut trace, next), "to {next}");
    }
    assert_eq!(fsm.state(), EntityState::Hidden);
}
