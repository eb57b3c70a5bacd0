//! Behavioral tests for the coordinated gate: the two-switch truth table
//! and what observers see.

use std::time::Duration;

use huddle_gate::{Actuation, CoordinatedGate, GateConfig};
use huddle_protocol::ActuatorId;

fn a() -> ActuatorId {
    ActuatorId::new("A")
}

fn b() -> ActuatorId {
    ActuatorId::new("B")
}

fn door() -> CoordinatedGate {
    CoordinatedGate::new(GateConfig::pair("A", "B"))
}

#[test]
fn test_a_alone_never_opens() {
    let mut gate = door();
    gate.actuate(&a()).unwrap();
    for _ in 0..20 {
        gate.tick(Duration::from_secs(1));
    }
    assert!(!gate.is_open());
}

#[test]
fn test_a_then_b_inside_window_opens() {
    let mut gate = door();
    gate.actuate(&a()).unwrap();
    gate.tick(Duration::from_millis(9_900));
    assert_eq!(gate.actuate(&b()).unwrap(), Actuation::Opened);
    assert!(gate.is_open());
}

#[test]
fn test_a_expires_before_b_stays_closed() {
    let mut gate = door();
    gate.actuate(&a()).unwrap();
    gate.tick(Duration::from_millis(10_100));
    assert_eq!(
        gate.actuate(&b()).unwrap(),
        Actuation::Pending { active: 1 }
    );
    assert!(!gate.is_open());
}

#[test]
fn test_open_is_latched() {
    let mut gate = door();
    gate.actuate(&a()).unwrap();
    gate.actuate(&b()).unwrap();

    gate.tick(Duration::from_secs(3600));
    assert!(gate.is_open());
    assert_eq!(gate.actuate(&a()).unwrap(), Actuation::AlreadyOpen);
    assert_eq!(gate.actuate(&b()).unwrap(), Actuation::AlreadyOpen);
}

#[test]
fn test_three_of_three_needs_all() {
    let mut gate = CoordinatedGate::new(GateConfig {
        required: 3,
        ..GateConfig::default()
    });
    gate.actuate(&ActuatorId::new("x")).unwrap();
    gate.actuate(&ActuatorId::new("y")).unwrap();
    assert!(!gate.is_open());
    assert_eq!(
        gate.actuate(&ActuatorId::new("z")).unwrap(),
        Actuation::Opened
    );
}

#[tokio::test]
async fn test_observer_notified_once_on_open() {
    let mut gate = door();
    let mut rx = gate.subscribe();
    assert!(!*rx.borrow());

    gate.actuate(&a()).unwrap();
    assert!(!rx.has_changed().unwrap());

    gate.actuate(&b()).unwrap();
    rx.changed().await.unwrap();
    assert!(*rx.borrow_and_update());

    // Further actuations do not publish again.
    gate.actuate(&a()).unwrap();
    assert!(!rx.has_changed().unwrap());
}

#[test]
fn test_late_observer_reads_latched_value() {
    let mut gate = door();
    gate.actuate(&a()).unwrap();
    gate.actuate(&b()).unwrap();

    let rx = gate.subscribe();
    assert!(*rx.borrow());
}
