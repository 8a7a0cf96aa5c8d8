//! CAT integration tests: radio dialects over a scripted serial line
//!
//! A local `ScriptedSerial` answers each written frame from a fixed script,
//! the way a real rig answers queries, and logs every byte written. The
//! dialects run through the real `CatEngine` and background reader.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rigcorder_lib::domain::{Mode, RadioType, RigError, RigResult};
use rigcorder_lib::ports::{RadioIo, SerialConnection, SerialParams};
use rigcorder_lib::radio::{Ft891Radio, Ft991aRadio, RadioSession};

// ---------------------------------------------------------------------------
// ScriptedSerial: replies to known requests, stays silent otherwise
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Line {
    written: Vec<String>,
    params: Vec<SerialParams>,
    script: HashMap<&'static str, &'static str>,
    inbound: VecDeque<u8>,
    closed: bool,
}

#[derive(Clone)]
struct ScriptedSerial {
    line: Arc<Mutex<Line>>,
}

impl ScriptedSerial {
    fn new(script: &[(&'static str, &'static str)]) -> Self {
        Self {
            line: Arc::new(Mutex::new(Line {
                script: script.iter().copied().collect(),
                ..Line::default()
            })),
        }
    }

    fn set_reply(&self, request: &'static str, reply: &'static str) {
        self.line.lock().unwrap().script.insert(request, reply);
    }

    fn written(&self) -> Vec<String> {
        self.line.lock().unwrap().written.clone()
    }

    fn clear_written(&self) {
        self.line.lock().unwrap().written.clear();
    }
}

impl SerialConnection for ScriptedSerial {
    fn write(&mut self, data: &[u8]) -> RigResult<()> {
        let mut line = self.line.lock().unwrap();
        if line.closed {
            return Err(RigError::Io("port closed".into()));
        }
        let frame = String::from_utf8_lossy(data).into_owned();
        if let Some(reply) = line.script.get(frame.as_str()).copied() {
            line.inbound.extend(reply.bytes());
        }
        line.written.push(frame);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> RigResult<usize> {
        let mut line = self.line.lock().unwrap();
        // Deliver in small pieces so frames are reassembled across reads
        let n = line.inbound.len().min(buf.len()).min(5);
        for slot in buf.iter_mut().take(n) {
            *slot = line.inbound.pop_front().unwrap();
        }
        drop(line);
        if n == 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(n)
    }

    fn set_parameters(&mut self, params: &SerialParams) -> RigResult<()> {
        self.line.lock().unwrap().params.push(*params);
        Ok(())
    }

    fn try_clone(&self) -> RigResult<Box<dyn SerialConnection>> {
        Ok(Box::new(self.clone()))
    }

    fn close(&mut self) -> RigResult<()> {
        self.line.lock().unwrap().closed = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.line.lock().unwrap().closed
    }
}

const FT891_SCRIPT: &[(&str, &str)] = &[
    ("ID;", "ID0650;"),
    ("IF;", "IF001014250000+000000200000;"),
    ("TX;", "TX0;"),
    ("EX1601;", "EX1601050;"),
    ("ML0;", "ML0001;"),
];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn ft891_open_configures_line_and_identifies() {
    let serial = ScriptedSerial::new(FT891_SCRIPT);
    let _radio = Ft891Radio::open(Box::new(serial.clone()), 9600).unwrap();

    assert_eq!(serial.written(), vec!["ID;"]);
    let params = serial.line.lock().unwrap().params.clone();
    assert_eq!(params, vec![SerialParams::yaesu(9600)]);
    assert_eq!(params[0].stop_bits, 2);
    assert!(params[0].rts);
}

#[test]
fn ft891_reads_operating_state_in_order() {
    let serial = ScriptedSerial::new(FT891_SCRIPT);
    let mut radio = Ft891Radio::open(Box::new(serial.clone()), 4800).unwrap();
    serial.clear_written();

    let state = radio.read_operating_state().unwrap();
    assert_eq!(state.rig, "Yaesu FT-891");
    assert_eq!(state.freq, 14_250_000);
    assert_eq!(state.mode, Mode::Usb);
    assert!(!state.tx);
    assert_eq!(state.power, 50);

    // Monitor already on: no commands issued
    assert_eq!(serial.written(), vec!["IF;", "TX;", "EX1601;", "ML0;"]);
}

#[test]
fn ft891_enables_monitor_at_level_zero_then_switches_it_on() {
    let serial = ScriptedSerial::new(FT891_SCRIPT);
    serial.set_reply("ML0;", "ML0000;");
    let mut radio = Ft891Radio::open(Box::new(serial.clone()), 4800).unwrap();
    serial.clear_written();

    radio.read_operating_state().unwrap();
    assert_eq!(
        serial.written(),
        vec!["IF;", "TX;", "EX1601;", "ML0;", "ML1000;", "ML0001;"]
    );
}

#[test]
fn ft891_skips_monitor_check_outside_am_and_ssb() {
    let serial = ScriptedSerial::new(FT891_SCRIPT);
    serial.set_reply("IF;", "IF001014070000+000000C00000;");
    serial.set_reply("TX;", "TX1;");
    serial.set_reply("EX1603;", "EX1603010;");
    let mut radio = Ft891Radio::open(Box::new(serial.clone()), 4800).unwrap();
    serial.clear_written();

    let state = radio.read_operating_state().unwrap();
    assert_eq!(state.mode, Mode::Data);
    assert!(state.tx);
    assert_eq!(state.power, 10);
    assert_eq!(serial.written(), vec!["IF;", "TX;", "EX1603;"]);
}

#[test]
fn identity_mismatch_fails_after_single_query() {
    let serial = ScriptedSerial::new(&[("ID;", "ID0670;")]);
    let result = Ft891Radio::open(Box::new(serial.clone()), 4800);

    assert!(matches!(result, Err(RigError::IdentityMismatch(_))));
    assert_eq!(serial.written(), vec!["ID;"]);
    assert!(!serial.is_connected());
}

#[test]
fn silent_radio_times_out_with_baud_hint() {
    let serial = ScriptedSerial::new(&[]);
    let err = Ft891Radio::open(Box::new(serial.clone()), 4800)
        .err()
        .expect("open should fail");

    match &err {
        RigError::Timeout { hint, .. } => assert!(hint.as_deref().unwrap().contains("05-06")),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(err.to_string().contains("baud rate"));
}

#[test]
fn malformed_response_is_parse_error() {
    let serial = ScriptedSerial::new(FT891_SCRIPT);
    serial.set_reply("TX;", "TX9;");
    let mut radio = Ft891Radio::open(Box::new(serial), 4800).unwrap();
    assert!(matches!(radio.read_operating_state(), Err(RigError::Parse(_))));
}

#[test]
fn ft991a_reads_power_from_pc() {
    let serial = ScriptedSerial::new(&[
        ("ID;", "ID0670;"),
        ("IF;", "IF001007074000+000000100000;"),
        ("TX;", "TX0;"),
        ("PC;", "PC075;"),
    ]);
    let mut radio = Ft991aRadio::open(Box::new(serial.clone()), 38400).unwrap();
    serial.clear_written();

    let state = radio.read_operating_state().unwrap();
    assert_eq!(state.rig, "Yaesu FT-991A");
    assert_eq!(state.freq, 7_074_000);
    assert_eq!(state.mode, Mode::Lsb);
    assert_eq!(state.power, 75);
    assert_eq!(serial.written(), vec!["IF;", "TX;", "PC;"]);
}

#[test]
fn session_rejects_second_start_and_ends_on_stop() {
    let session = RadioSession::new();
    let serial = ScriptedSerial::new(FT891_SCRIPT);
    session
        .start(Box::new(serial.clone()), RadioType::YaesuFt891, 4800)
        .unwrap();
    assert!(session.is_running());

    assert_eq!(session.start_mocked(), Err(RigError::AlreadyRunning));

    let state = session.read_operating_state().unwrap().unwrap();
    assert_eq!(state.freq, 14_250_000);

    session.stop();
    session.stop();
    assert!(!session.is_running());
    assert!(!serial.is_connected());
    assert_eq!(session.read_operating_state(), Ok(None));
}

#[test]
fn session_rejects_unsupported_baud_rate() {
    let session = RadioSession::new();
    let serial = ScriptedSerial::new(FT891_SCRIPT);
    let result = session.start(Box::new(serial.clone()), RadioType::YaesuFt891, 115_200);
    assert!(matches!(result, Err(RigError::Config(_))));
    assert!(!session.is_running());
    assert!(serial.written().is_empty());
}

#[test]
fn session_read_failure_ends_session() {
    let session = RadioSession::new();
    let serial = ScriptedSerial::new(FT891_SCRIPT);
    session
        .start(Box::new(serial.clone()), RadioType::YaesuFt891, 4800)
        .unwrap();
    serial.set_reply("IF;", "IF;");

    assert!(matches!(session.read_operating_state(), Err(RigError::Parse(_))));
    assert!(!session.is_running());
    assert_eq!(session.read_operating_state(), Ok(None));
}
