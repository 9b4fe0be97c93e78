use anyhow::Result;
use emit_key::cli::Cli;
use emit_key::config::Config;
use emit_key::device::{DeviceEvent, DeviceIdentity, InputBackend, VirtualKeyboard};
use emit_key::{
    DeviceState, EmissionMode, EmitKeyError, NotificationSender, Notifications, Outcome,
    PressSequence, PressSequencer, Termination, Timing,
};
use evdev::Key;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

// Recording backend

#[derive(Debug, Clone, PartialEq)]
enum Record {
    Registered(Key),
    Created(DeviceIdentity),
    Event(DeviceEvent),
    Destroyed,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Record>>>);

impl Recorder {
    fn push(&self, record: Record) {
        self.0.lock().unwrap().push(record);
    }

    fn records(&self) -> Vec<Record> {
        self.0.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<DeviceEvent> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Event(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    fn destroy_count(&self) -> usize {
        self.records()
            .iter()
            .filter(|r| **r == Record::Destroyed)
            .count()
    }
}

#[derive(Default)]
struct MockBackend {
    recorder: Recorder,
    fail_create: bool,
    fail_after_events: Option<usize>,
}

impl InputBackend for MockBackend {
    type Device = MockKeyboard;

    fn register_capability(&mut self, code: Key) {
        self.recorder.push(Record::Registered(code));
    }

    fn create(&mut self, identity: &DeviceIdentity) -> emit_key::Result<MockKeyboard> {
        if self.fail_create {
            return Err(EmitKeyError::backend(
                "open /dev/uinput",
                "Permission denied",
            ));
        }
        self.recorder.push(Record::Created(identity.clone()));
        Ok(MockKeyboard {
            recorder: self.recorder.clone(),
            remaining: self.fail_after_events,
        })
    }
}

struct MockKeyboard {
    recorder: Recorder,
    remaining: Option<usize>,
}

impl VirtualKeyboard for MockKeyboard {
    fn inject(&mut self, event: DeviceEvent) -> emit_key::Result<()> {
        match self.remaining {
            Some(0) => return Err(EmitKeyError::backend("write events", "Broken pipe")),
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        self.recorder.push(Record::Event(event));
        Ok(())
    }

    fn destroy(self) -> emit_key::Result<()> {
        self.recorder.push(Record::Destroyed);
        Ok(())
    }
}

fn round(keys: &[Key]) -> Vec<DeviceEvent> {
    keys.iter()
        .flat_map(|&code| {
            [
                DeviceEvent::key_down(code),
                DeviceEvent::SynReport,
                DeviceEvent::key_up(code),
                DeviceEvent::SynReport,
            ]
        })
        .collect()
}

fn sequencer(spec: &str, mode: EmissionMode) -> PressSequencer {
    PressSequencer::new(PressSequence::parse(spec).unwrap(), mode).with_timing(Timing::zero())
}

async fn wait_for_events(recorder: &Recorder, count: usize) {
    while recorder.events().len() < count {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

// Immediate mode

#[tokio::test]
async fn test_immediate_mode_emits_one_round() {
    let mut backend = MockBackend::default();
    let (_sender, notifications) = Notifications::channel();
    let mut sequencer = sequencer("a:0,b:0,a", EmissionMode::Immediate);

    let outcome = sequencer.run(&mut backend, notifications).await.unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(sequencer.state(), DeviceState::Destroyed);
    assert_eq!(sequencer.rounds(), 1);

    let records = backend.recorder.records();
    assert_eq!(
        &records[..3],
        &[
            Record::Registered(Key::KEY_A),
            Record::Registered(Key::KEY_B),
            Record::Created(DeviceIdentity::default()),
        ]
    );
    assert_eq!(records.last(), Some(&Record::Destroyed));
    assert_eq!(
        backend.recorder.events(),
        round(&[Key::KEY_A, Key::KEY_B, Key::KEY_A])
    );
    assert_eq!(backend.recorder.destroy_count(), 1);
}

#[tokio::test]
async fn test_emission_failure_still_destroys_device() {
    let mut backend = MockBackend {
        fail_after_events: Some(5),
        ..MockBackend::default()
    };
    let (_sender, notifications) = Notifications::channel();
    let mut sequencer = sequencer("a:0,b:0", EmissionMode::Immediate);

    let err = sequencer.run(&mut backend, notifications).await.unwrap_err();

    assert!(matches!(err, EmitKeyError::Backend { .. }));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(backend.recorder.events().len(), 5);
    assert_eq!(backend.recorder.destroy_count(), 1);
    assert_eq!(sequencer.state(), DeviceState::Destroyed);
}

#[tokio::test]
async fn test_create_failure_skips_destroy() {
    let mut backend = MockBackend {
        fail_create: true,
        ..MockBackend::default()
    };
    let (_sender, notifications) = Notifications::channel();
    let mut sequencer = sequencer("f12", EmissionMode::Immediate);

    let err = sequencer.run(&mut backend, notifications).await.unwrap_err();

    assert!(matches!(err, EmitKeyError::Backend { .. }));
    assert!(backend.recorder.events().is_empty());
    assert_eq!(backend.recorder.destroy_count(), 0);
    assert_eq!(sequencer.state(), DeviceState::Registered);
}

#[tokio::test]
async fn test_immediate_mode_ignores_triggers() {
    let mut backend = MockBackend::default();
    let (sender, notifications) = Notifications::channel();
    assert!(sender.trigger());
    let mut sequencer = sequencer("x", EmissionMode::Immediate);

    let outcome = sequencer.run(&mut backend, notifications).await.unwrap();

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(sequencer.rounds(), 1);
    assert_eq!(backend.recorder.events(), round(&[Key::KEY_X]));
}

#[tokio::test]
async fn test_custom_identity_reaches_backend() {
    let mut backend = MockBackend::default();
    let (_sender, notifications) = Notifications::channel();
    let identity = DeviceIdentity {
        name: "Test pad".to_string(),
        vendor_id: 0xdead,
        product_id: 0xbeef,
    };
    let mut sequencer = sequencer("1", EmissionMode::Immediate).with_identity(identity.clone());

    sequencer.run(&mut backend, notifications).await.unwrap();

    assert!(backend
        .recorder
        .records()
        .contains(&Record::Created(identity)));
}

#[tokio::test(start_paused = true)]
async fn test_delays_between_presses_only() {
    let mut backend = MockBackend::default();
    let (_sender, notifications) = Notifications::channel();
    let mut sequencer = sequencer("a:250000,b:999999999", EmissionMode::Immediate);

    let start = tokio::time::Instant::now();
    sequencer.run(&mut backend, notifications).await.unwrap();

    // The last press's delay is never waited.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(250), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_default_settle_delays() {
    let mut backend = MockBackend::default();
    let (_sender, notifications) = Notifications::channel();
    let mut sequencer = PressSequencer::new(
        PressSequence::parse("f12").unwrap(),
        EmissionMode::Immediate,
    );

    let start = tokio::time::Instant::now();
    sequencer.run(&mut backend, notifications).await.unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
}

// Wait mode

/// Queue a trigger, waiting for the single slot to free up.
async fn send_trigger(sender: &NotificationSender) {
    while !sender.trigger() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

async fn drive_triggers(
    sender: NotificationSender,
    recorder: Recorder,
    triggers: usize,
    events: usize,
) {
    for _ in 0..triggers {
        send_trigger(&sender).await;
    }
    wait_for_events(&recorder, events).await;
    sender.terminate(Termination::Interrupt);
}

#[tokio::test]
async fn test_each_trigger_emits_full_round() {
    let mut backend = MockBackend::default();
    let (sender, notifications) = Notifications::channel();
    let mut sequencer = sequencer("a:2000,b:0,c", EmissionMode::WaitForTrigger);
    let expected = round(&[Key::KEY_A, Key::KEY_B, Key::KEY_C]);

    let driver = tokio::spawn(drive_triggers(
        sender,
        backend.recorder.clone(),
        3,
        expected.len() * 3,
    ));

    let outcome = sequencer.run(&mut backend, notifications).await.unwrap();
    driver.await.unwrap();

    assert_eq!(outcome, Outcome::Terminated(Termination::Interrupt));
    assert_eq!(outcome.exit_code(), 130);
    assert_eq!(sequencer.rounds(), 3);
    assert_eq!(backend.recorder.events(), expected.repeat(3));
    assert_eq!(backend.recorder.destroy_count(), 1);
}

#[tokio::test]
async fn test_back_to_back_triggers_do_not_interleave() {
    let mut backend = MockBackend::default();
    let (sender, notifications) = Notifications::channel();
    let mut sequencer = sequencer("q:20000,w:20000,e", EmissionMode::WaitForTrigger);
    let expected = round(&[Key::KEY_Q, Key::KEY_W, Key::KEY_E]);

    let second = sender.clone();
    let recorder = backend.recorder.clone();
    let driver = tokio::spawn(async move {
        tokio::join!(send_trigger(&sender), send_trigger(&second));
        wait_for_events(&recorder, expected.len() * 2).await;
        sender.terminate(Termination::Terminate);
    });

    let outcome = sequencer.run(&mut backend, notifications).await.unwrap();
    driver.await.unwrap();

    assert_eq!(outcome.exit_code(), 143);
    assert_eq!(
        backend.recorder.events(),
        round(&[Key::KEY_Q, Key::KEY_W, Key::KEY_E]).repeat(2)
    );
}

#[tokio::test]
async fn test_terminate_while_armed() {
    let mut backend = MockBackend::default();
    let (sender, notifications) = Notifications::channel();
    let mut sequencer = sequencer("a", EmissionMode::WaitForTrigger);

    sender.terminate(Termination::Terminate);
    let outcome = sequencer.run(&mut backend, notifications).await.unwrap();

    assert_eq!(outcome, Outcome::Terminated(Termination::Terminate));
    assert_eq!(sequencer.rounds(), 0);
    assert!(backend.recorder.events().is_empty());
    assert_eq!(backend.recorder.destroy_count(), 1);
    assert_eq!(sequencer.state(), DeviceState::Destroyed);
}

#[tokio::test]
async fn test_wait_mode_discards_triggers_queued_before_arming() {
    let mut backend = MockBackend::default();
    let (sender, notifications) = Notifications::channel();
    let mut sequencer = sequencer("a", EmissionMode::WaitForTrigger);

    assert!(sender.trigger());
    let driver = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        sender.terminate(Termination::Interrupt);
    });

    let outcome = sequencer.run(&mut backend, notifications).await.unwrap();
    driver.await.unwrap();

    assert_eq!(outcome.exit_code(), 130);
    assert_eq!(sequencer.rounds(), 0);
    assert!(backend.recorder.events().is_empty());
    assert_eq!(backend.recorder.destroy_count(), 1);
}

#[tokio::test]
async fn test_terminate_mid_round_leaves_no_key_held() {
    let mut backend = MockBackend::default();
    let (sender, notifications) = Notifications::channel();
    let mut sequencer = sequencer("a:10000000,b", EmissionMode::WaitForTrigger);

    let recorder = backend.recorder.clone();
    let driver = tokio::spawn(async move {
        send_trigger(&sender).await;
        wait_for_events(&recorder, 4).await;
        sender.terminate(Termination::Interrupt);
    });

    let outcome = sequencer.run(&mut backend, notifications).await.unwrap();
    driver.await.unwrap();

    assert_eq!(outcome, Outcome::Terminated(Termination::Interrupt));
    assert_eq!(backend.recorder.events(), round(&[Key::KEY_A]));
    assert_eq!(backend.recorder.destroy_count(), 1);
}

#[tokio::test]
async fn test_terminate_during_immediate_settle() {
    let mut backend = MockBackend::default();
    let (sender, notifications) = Notifications::channel();
    let mut sequencer = PressSequencer::new(
        PressSequence::parse("a").unwrap(),
        EmissionMode::Immediate,
    )
    .with_timing(Timing {
        create_settle: Duration::from_secs(3600),
        destroy_settle: Duration::ZERO,
    });

    sender.terminate(Termination::Interrupt);
    let outcome = sequencer.run(&mut backend, notifications).await.unwrap();

    assert_eq!(outcome.exit_code(), 130);
    assert!(backend.recorder.events().is_empty());
    assert_eq!(backend.recorder.destroy_count(), 1);
}

#[tokio::test]
async fn test_closed_sources_end_wait_mode() {
    let mut backend = MockBackend::default();
    let (sender, notifications) = Notifications::channel();
    drop(sender);
    let mut sequencer = sequencer("a", EmissionMode::WaitForTrigger);

    let err = sequencer.run(&mut backend, notifications).await.unwrap_err();

    assert!(matches!(err, EmitKeyError::TriggerSource(_)));
    assert_eq!(backend.recorder.destroy_count(), 1);
}

// Configuration

#[test]
fn test_config_file_operations() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;

    let json_content = r#"
    {
        "keys": "a,b:500000,enter",
        "wait_for_signal": true,
        "create_settle": "250ms",
        "destroy_settle": "2s",
        "device_name": "Stream deck",
        "vendor_id": 4660,
        "product_id": 22136
    }
    "#;
    temp_file.write_all(json_content.as_bytes())?;

    let config = Config::from_file(temp_file.path())?;

    assert_eq!(config.keys, "a,b:500000,enter");
    assert_eq!(config.mode(), EmissionMode::WaitForTrigger);
    assert_eq!(config.create_settle, Duration::from_millis(250));
    assert_eq!(config.destroy_settle, Duration::from_secs(2));
    assert_eq!(config.identity().name, "Stream deck");
    assert_eq!(config.vendor_id, 0x1234);
    assert_eq!(config.product_id, 0x5678);
    assert!(config.validate().is_ok());

    let sequence = config.sequence()?;
    assert_eq!(sequence.len(), 3);
    assert_eq!(sequence.presses()[1].delay_after_micros, 500_000);

    Ok(())
}

#[test]
fn test_cli_flags_override_config_file() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(br#"{ "keys": "f1", "destroy_settle": "3s" }"#)?;

    let path = temp_file.path().to_str().unwrap().to_string();
    let cli = Cli::parse_from_args(["emit-key", "-c", path.as_str(), "-k", "f2", "-s"])?;
    let config = cli.into_config()?;

    assert_eq!(config.keys, "f2");
    assert!(config.wait_for_signal);
    assert_eq!(config.destroy_settle, Duration::from_secs(3));
    assert_eq!(config.create_settle, Duration::from_secs(1));

    Ok(())
}

#[test]
fn test_config_load_errors() {
    let err = Config::from_file("/nonexistent/emit-key.json").unwrap_err();
    assert!(matches!(err, EmitKeyError::ConfigLoad { .. }));

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file
        .write_all(br#"{ "create_settle": "soon" }"#)
        .unwrap();
    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(err.to_string().contains("soon"));
}

#[test]
fn test_unknown_key_in_config_fails_sequence() {
    let config = Config {
        keys: "a,hyper,b".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_ok());
    assert!(matches!(
        config.sequence(),
        Err(EmitKeyError::UnknownKey(ref name)) if name == "hyper"
    ));
}
