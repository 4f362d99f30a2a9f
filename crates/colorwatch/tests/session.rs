use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use colorwatch::alert::{AlertHandle, AlertSignal};
use colorwatch::prefs::{keys, write_pref, MemoryPreferences, PreferenceStore};
use colorwatch::{
    AlertCapability, AlertError, CaptureError, CaptureOptions, CaptureState, DetectionStatus,
    DisplaySourceProvider, FrameSource, Monitor, MonitorError, Permission, RgbaFrame, Rgb, Ticker,
};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

struct ScreenState {
    color: [u8; 4],
    width: usize,
    height: usize,
    ended: bool,
    fail_next: bool,
    requests: usize,
    stops: usize,
}

/// Shared handle to a fake display, so tests can change what it shows.
#[derive(Clone)]
struct Screen(Rc<RefCell<ScreenState>>);

impl Screen {
    fn new(color: [u8; 4]) -> Self {
        Screen(Rc::new(RefCell::new(ScreenState {
            color,
            width: 8,
            height: 6,
            ended: false,
            fail_next: false,
            requests: 0,
            stops: 0,
        })))
    }

    fn show(&self, color: [u8; 4]) {
        self.0.borrow_mut().color = color;
    }

    fn end(&self) {
        self.0.borrow_mut().ended = true;
    }
}

struct FakeSource(Screen);

impl FrameSource for FakeSource {
    fn dimensions(&self) -> (usize, usize) {
        let s = self.0 .0.borrow();
        (s.width, s.height)
    }

    fn read_frame(&mut self, buf: &mut RgbaFrame) -> Result<(), CaptureError> {
        let s = self.0 .0.borrow();
        buf.resize(s.width, s.height)?;
        buf.fill(s.color);
        Ok(())
    }

    fn has_ended(&self) -> bool {
        self.0 .0.borrow().ended
    }

    fn stop(&mut self) {
        self.0 .0.borrow_mut().stops += 1;
    }
}

struct FakeProvider(Screen);

impl DisplaySourceProvider for FakeProvider {
    type Source = FakeSource;

    fn request_capture(&mut self, _options: &CaptureOptions) -> Result<FakeSource, CaptureError> {
        let mut s = self.0 .0.borrow_mut();
        s.requests += 1;
        if s.fail_next {
            s.fail_next = false;
            return Err(CaptureError::Rejected("permission denied".into()));
        }
        s.ended = false;
        Ok(FakeSource(self.0.clone()))
    }
}

#[derive(Default)]
struct Notices {
    shown: usize,
    closed: usize,
}

struct FakeSignal {
    permission: Permission,
    notices: Rc<RefCell<Notices>>,
}

struct FakeHandle(Rc<RefCell<Notices>>);

impl AlertHandle for FakeHandle {
    fn close(&mut self) {
        self.0.borrow_mut().closed += 1;
    }
}

impl AlertSignal for FakeSignal {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn request_permission(&mut self) -> Permission {
        self.permission
    }

    fn show(&mut self, _message: &str) -> Result<Box<dyn AlertHandle>, AlertError> {
        self.notices.borrow_mut().shown += 1;
        Ok(Box::new(FakeHandle(Rc::clone(&self.notices))))
    }
}

type TestMonitor = Monitor<FakeProvider, MemoryPreferences>;

fn monitor_with(
    screen: &Screen,
    prefs: MemoryPreferences,
    permission: Permission,
) -> (TestMonitor, Rc<RefCell<Notices>>) {
    let notices = Rc::new(RefCell::new(Notices::default()));
    let signal = FakeSignal {
        permission,
        notices: Rc::clone(&notices),
    };
    let monitor = Monitor::new(
        FakeProvider(screen.clone()),
        prefs,
        AlertCapability::Available(Box::new(signal)),
        CaptureOptions::default(),
    );
    (monitor, notices)
}

fn notifying_monitor(screen: &Screen, threshold: &str) -> (TestMonitor, Rc<RefCell<Notices>>) {
    let (mut monitor, notices) = monitor_with(screen, MemoryPreferences::new(), Permission::Granted);
    monitor.set_alert_enabled(true).unwrap();
    monitor.set_target_color("#ff0000");
    monitor.set_threshold(threshold);
    (monitor, notices)
}

#[test]
fn start_while_active_is_a_no_op() {
    let screen = Screen::new(RED);
    let (mut monitor, _) = notifying_monitor(&screen, "5");

    assert!(monitor.start().unwrap());
    monitor.tick();
    monitor.tick();
    assert!(!monitor.start().unwrap());
    assert_eq!(screen.0.borrow().requests, 1);

    // same loop keeps counting
    assert_eq!(
        monitor.tick(),
        DetectionStatus::Observed {
            found: true,
            count: 3
        }
    );
}

#[test]
fn alert_fires_once_when_run_reaches_threshold() {
    let screen = Screen::new(RED);
    let (mut monitor, notices) = notifying_monitor(&screen, "3");
    monitor.start().unwrap();

    let mut shown_after = Vec::new();
    for _ in 0..4 {
        monitor.tick();
        shown_after.push(notices.borrow().shown);
    }
    assert_eq!(shown_after, vec![0, 0, 1, 1]);
    assert!(monitor.alert().is_active());

    screen.show(BLUE);
    for _ in 0..3 {
        monitor.tick();
    }
    assert!(!monitor.alert().is_active());
    assert_eq!(notices.borrow().closed, 1);
}

#[derive(Debug, PartialEq)]
struct EndState {
    sampling: bool,
    status: DetectionStatus,
    alert_active: bool,
    closed: usize,
    source_stops: usize,
}

fn end_state(monitor: &TestMonitor, screen: &Screen, notices: &Rc<RefCell<Notices>>) -> EndState {
    EndState {
        sampling: monitor.is_sampling(),
        status: monitor.status(),
        alert_active: monitor.alert().is_active(),
        closed: notices.borrow().closed,
        source_stops: screen.0.borrow().stops,
    }
}

#[test]
fn external_termination_tears_down_like_stop() {
    let screen = Screen::new(RED);
    let (mut monitor, notices) = notifying_monitor(&screen, "1");
    monitor.start().unwrap();
    monitor.tick();
    assert_eq!(notices.borrow().shown, 1);
    assert!(monitor.stop());
    assert_eq!(monitor.capture_state(), CaptureState::Stopped);
    let stopped = end_state(&monitor, &screen, &notices);

    let screen = Screen::new(RED);
    let (mut monitor, notices) = notifying_monitor(&screen, "1");
    monitor.start().unwrap();
    monitor.tick();
    assert_eq!(notices.borrow().shown, 1);
    screen.end();
    assert_eq!(monitor.tick(), DetectionStatus::Off);
    assert_eq!(monitor.capture_state(), CaptureState::Terminated);
    let terminated = end_state(&monitor, &screen, &notices);

    assert_eq!(stopped, terminated);
    assert_eq!(
        terminated,
        EndState {
            sampling: false,
            status: DetectionStatus::Off,
            alert_active: false,
            closed: 1,
            source_stops: 1,
        }
    );
}

#[test]
fn restart_after_termination_gets_a_fresh_loop() {
    let screen = Screen::new(RED);
    let (mut monitor, _) = notifying_monitor(&screen, "2");
    monitor.start().unwrap();
    monitor.tick();
    screen.end();
    monitor.tick();
    assert_eq!(monitor.capture_state(), CaptureState::Terminated);

    assert!(monitor.start().unwrap());
    assert_eq!(
        monitor.tick(),
        DetectionStatus::Observed {
            found: true,
            count: 1
        }
    );
}

#[test]
fn failed_acquisition_returns_to_idle() {
    let screen = Screen::new(RED);
    screen.0.borrow_mut().fail_next = true;
    let (mut monitor, _) = notifying_monitor(&screen, "1");

    let err = monitor.start().unwrap_err();
    assert!(matches!(err, MonitorError::Acquisition(CaptureError::Rejected(_))));
    assert_eq!(monitor.capture_state(), CaptureState::Idle);
    assert!(!monitor.is_sampling());
    assert_eq!(monitor.tick(), DetectionStatus::Off);

    assert!(monitor.start().unwrap());
    assert_eq!(screen.0.borrow().requests, 2);
}

#[test]
fn invalid_input_reports_error_and_clears_alert() {
    let screen = Screen::new(RED);
    let (mut monitor, notices) = notifying_monitor(&screen, "1");
    monitor.start().unwrap();
    monitor.tick();
    monitor.tick();
    assert!(monitor.alert().is_active());

    monitor.set_tolerance("-1");
    assert_eq!(monitor.tick(), DetectionStatus::Error);
    assert!(!monitor.alert().is_active());
    assert_eq!(notices.borrow().closed, 1);
    assert_eq!(
        monitor.prefs().entries().get("colorwatch.allowedDifference"),
        Some(&"-1".to_string())
    );

    // fixing the input starts a new run
    monitor.set_tolerance("0");
    assert_eq!(
        monitor.tick(),
        DetectionStatus::Observed {
            found: true,
            count: 1
        }
    );
}

#[test]
fn zero_sized_source_is_an_error() {
    let screen = Screen::new([0, 0, 0, 255]);
    {
        let mut s = screen.0.borrow_mut();
        s.width = 0;
        s.height = 0;
    }
    let (mut monitor, _) = notifying_monitor(&screen, "1");
    monitor.set_target_color("#000000");
    monitor.start().unwrap();
    assert_eq!(monitor.tick(), DetectionStatus::Error);
    assert!(!monitor.alert().is_active());
}

#[test]
fn preferences_are_restored() {
    let mut prefs = MemoryPreferences::new();
    write_pref(&mut prefs, keys::TARGET_COLOR, "#00ff00");
    write_pref(&mut prefs, keys::TOLERANCE, "4");
    write_pref(&mut prefs, keys::THRESHOLD, "2");
    write_pref(&mut prefs, keys::NOTIFY, "1");

    let screen = Screen::new(RED);
    let (granted, _) = monitor_with(&screen, prefs.clone(), Permission::Granted);
    assert_eq!(granted.inputs().target_color, "#00ff00");
    assert_eq!(granted.inputs().tolerance, "4");
    assert_eq!(granted.inputs().threshold, "2");
    assert!(granted.alert().notifications_enabled());

    let (prompt, _) = monitor_with(&screen, prefs, Permission::Prompt);
    assert!(!prompt.alert().notifications_enabled());
}

#[test]
fn denied_permission_keeps_notifications_off() {
    let screen = Screen::new(RED);
    let (mut monitor, _) = monitor_with(&screen, MemoryPreferences::new(), Permission::Denied);
    let err = monitor.set_alert_enabled(true).unwrap_err();
    assert!(matches!(err, MonitorError::Alert(AlertError::PermissionDenied)));
    assert!(!monitor.alert().notifications_enabled());
    assert_eq!(monitor.prefs().get("colorwatch.notifyOnDetection").unwrap(), None);

    monitor.set_alert_enabled(false).unwrap();
    assert_eq!(
        monitor.prefs().get("colorwatch.notifyOnDetection").unwrap(),
        Some("0".to_string())
    );
}

#[test]
fn unsupported_notifications_are_rejected() {
    let screen = Screen::new(RED);
    let mut monitor = Monitor::new(
        FakeProvider(screen.clone()),
        MemoryPreferences::new(),
        AlertCapability::Unavailable,
        CaptureOptions::default(),
    );
    assert!(matches!(
        monitor.set_alert_enabled(true),
        Err(MonitorError::Alert(AlertError::Unsupported))
    ));
    // detection still works, only the external signal is missing
    monitor.start().unwrap();
    monitor.tick();
    assert!(monitor.alert().is_active());
}

#[test]
fn run_ends_when_source_ends() {
    let screen = Screen::new(RED);
    let (mut monitor, notices) = notifying_monitor(&screen, "1");
    monitor.start().unwrap();

    let handle = screen.clone();
    let mut seen = 0;
    let summary = monitor.run(&mut Ticker::new(Duration::from_millis(1)), None, |_, _| {
        seen += 1;
        if seen == 3 {
            handle.end();
        }
        true
    });
    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.final_state, CaptureState::Terminated);
    assert!(!monitor.is_sampling());
    assert_eq!(notices.borrow().closed, 1);
}

#[test]
fn run_respects_tick_budget() {
    let screen = Screen::new(RED);
    let (mut monitor, _) = notifying_monitor(&screen, "1");
    monitor.start().unwrap();
    let summary = monitor.run(&mut Ticker::new(Duration::from_millis(1)), Some(5), |_, _| true);
    assert_eq!(summary.ticks, 5);
    assert_eq!(summary.final_state, CaptureState::Active);
}

#[test]
fn pick_uses_a_one_off_capture_when_idle() {
    let screen = Screen::new([0x12, 0x34, 0x56, 255]);
    let (mut monitor, _) = notifying_monitor(&screen, "1");

    let color = monitor.pick_target_color(3, 2).unwrap();
    assert_eq!(color, Rgb::new(0x12, 0x34, 0x56));
    assert_eq!(monitor.inputs().target_color, "#123456");
    assert_eq!(
        monitor.prefs().entries().get("colorwatch.targetColor"),
        Some(&"#123456".to_string())
    );
    let s = screen.0.borrow();
    assert_eq!((s.requests, s.stops), (1, 1));
    drop(s);
    assert_eq!(monitor.capture_state(), CaptureState::Idle);

    assert!(matches!(
        monitor.pick_target_color(100, 0),
        Err(MonitorError::Acquisition(CaptureError::OutOfBounds { .. }))
    ));
}
