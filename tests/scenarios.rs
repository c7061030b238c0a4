use quirobot::command::{Command, Parity};
use quirobot::debounce::DebounceController;
use quirobot::orchestrator::TickLoop;
use quirobot::sink::RecordingSink;
use quirobot::stabilizer::Stabilizer;
use quirobot::transport::{CommandLink, TransportError};
use quirobot::types::ActuatorState;

/// Actuador controlado a mano: las líneas se inyectan antes del tick
#[derive(Default)]
struct ManualActuator {
    inbound: Vec<String>,
    sent: Vec<Command>,
}

impl CommandLink for ManualActuator {
    fn drain_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.inbound)
    }

    fn send(&mut self, command: Command) -> Result<(), TransportError> {
        self.sent.push(command);
        Ok(())
    }
}

type Loop = TickLoop<ManualActuator, RecordingSink>;

fn new_loop() -> Loop {
    TickLoop::new(
        Stabilizer::new(15),
        DebounceController::default(),
        Some(ManualActuator::default()),
        RecordingSink::default(),
    )
}

fn feed(lp: &mut Loop, raws: &[u8]) -> Vec<Option<Command>> {
    raws.iter().map(|&raw| lp.tick(raw).command).collect()
}

fn sent(lp: &Loop) -> Vec<Command> {
    lp.link().unwrap().sent.clone()
}

fn ack(lp: &mut Loop) {
    lp_link_mut(lp).inbound.push("Task completed".to_string());
}

fn lp_link_mut(lp: &mut Loop) -> &mut ManualActuator {
    lp.link_mut().unwrap()
}

#[test]
fn held_even_gesture_fires_once_and_stays_busy() {
    let mut lp = new_loop();
    let commands = feed(&mut lp, &[2; 15]);

    assert_eq!(commands[0], Some(Command::Even));
    assert!(commands[1..].iter().all(Option::is_none));
    assert!(lp.sink().history.iter().all(|s| s.stable == 2));
    assert!(lp
        .sink()
        .history
        .iter()
        .all(|s| s.actuator == ActuatorState::Busy));
}

#[test]
fn ack_with_same_gesture_held_does_not_refire() {
    let mut lp = new_loop();
    feed(&mut lp, &[2; 15]);

    ack(&mut lp);
    let outcome = lp.tick(2);
    assert_eq!(outcome.actuator, ActuatorState::Idle);
    assert_eq!(outcome.parity, Parity::Even);
    assert_eq!(outcome.command, None);
    assert_eq!(sent(&lp), vec![Command::Even]);
}

#[test]
fn release_then_same_parity_refires() {
    let mut lp = new_loop();
    feed(&mut lp, &[2; 15]);
    ack(&mut lp);
    lp.tick(2);

    // 8 ceros bastan para dominar una ventana de 15
    let mut saw_none = false;
    for _ in 0..8 {
        let outcome = lp.tick(0);
        saw_none |= outcome.parity == Parity::None;
        assert_eq!(outcome.command, None);
    }
    assert!(saw_none);

    let commands = feed(&mut lp, &[2; 8]);
    assert_eq!(commands.iter().flatten().count(), 1);
    assert_eq!(sent(&lp), vec![Command::Even, Command::Even]);
}

#[test]
fn single_frame_noise_is_suppressed() {
    let mut lp = new_loop();
    let raws = [3, 3, 3, 1, 3, 3, 3, 3, 1, 3, 3, 5, 3, 3, 3];
    for &raw in &raws {
        assert_eq!(lp.tick(raw).stable, 3);
    }
    assert_eq!(sent(&lp), vec![Command::Odd]);
}

#[test]
fn busy_blocks_parity_changes_until_ack() {
    let mut lp = new_loop();
    feed(&mut lp, &[1; 15]);
    let commands = feed(&mut lp, &[4; 15]);
    assert!(commands.iter().all(Option::is_none));

    ack(&mut lp);
    assert_eq!(lp.tick(4).command, Some(Command::Even));
    assert_eq!(sent(&lp), vec![Command::Odd, Command::Even]);
}

#[test]
fn unrelated_lines_do_not_unblock() {
    let mut lp = new_loop();
    feed(&mut lp, &[5; 3]);
    lp_link_mut(&mut lp)
        .inbound
        .extend(["moving".to_string(), "task completed".to_string()]);
    let outcome = lp.tick(5);
    assert_eq!(outcome.lines.len(), 2);
    assert_eq!(outcome.actuator, ActuatorState::Busy);
}
