use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::backend::{AudioBackend, RemoteSource, SourceEvents, ToneSource};
use super::controller::{ControllerSettings, EventOutcome, PlaybackController};
use super::fetch::{fetch_bytes, parse_locator};
use super::progress::{ProgressClock, format_time, percentage};
use super::remote::RemoteAudioSource;
use super::tone::SynthesizedToneSource;
use super::types::*;
use crate::catalog::{Track, TrackCatalog};
use crate::error::{AudioError, ControlError};

#[derive(Default)]
struct Counters {
    remote_loads: Vec<(String, u64)>,
    remote_disposed: usize,
    remote_plays: usize,
    remote_pauses: usize,
    remote_muted: Option<bool>,
    position: Option<f64>,
    drained: bool,
    tone_created: usize,
    tone_starts: usize,
    tone_stops: usize,
    tone_muted: Option<bool>,
    tone_fails: bool,
    active: usize,
    max_active: usize,
    shutdowns: usize,
}

impl Counters {
    fn activate(&mut self) {
        self.active += 1;
        self.max_active = self.max_active.max(self.active);
    }
}

type Shared = Rc<RefCell<Counters>>;

struct FakeRemote {
    c: Shared,
    live: bool,
    events: SourceEvents,
}

impl RemoteSource for FakeRemote {
    fn play(&mut self) {
        self.c.borrow_mut().remote_plays += 1;
    }
    fn pause(&mut self) {
        self.c.borrow_mut().remote_pauses += 1;
    }
    fn set_muted(&mut self, muted: bool) {
        self.c.borrow_mut().remote_muted = Some(muted);
    }
    fn report_position(&self) {
        if let Some(pos) = self.c.borrow().position {
            self.events.emit(SourceEventKind::TimeUpdate(pos));
        }
    }
    fn is_drained(&self) -> bool {
        self.c.borrow().drained
    }
    fn dispose(&mut self) {
        if self.live {
            self.live = false;
            let mut c = self.c.borrow_mut();
            c.active -= 1;
            c.remote_disposed += 1;
        }
    }
}

struct FakeTone {
    c: Shared,
    running: bool,
    disposed: bool,
}

impl ToneSource for FakeTone {
    fn start(&mut self) -> Result<(), AudioError> {
        if self.disposed {
            return Ok(());
        }
        self.stop();
        let mut c = self.c.borrow_mut();
        if c.tone_fails {
            return Err(AudioError::OutputUnavailable("test".to_string()));
        }
        c.tone_starts += 1;
        c.activate();
        self.running = true;
        Ok(())
    }
    fn stop(&mut self) {
        if self.running {
            self.running = false;
            let mut c = self.c.borrow_mut();
            c.active -= 1;
            c.tone_stops += 1;
        }
    }
    fn set_muted(&mut self, muted: bool) {
        self.c.borrow_mut().tone_muted = Some(muted);
    }
    fn is_active(&self) -> bool {
        self.running
    }
    fn dispose(&mut self) {
        self.stop();
        self.disposed = true;
    }
}

struct FakeBackend {
    c: Shared,
}

impl AudioBackend for FakeBackend {
    fn load_remote(&mut self, uri: &str, events: SourceEvents) -> Box<dyn RemoteSource> {
        let mut c = self.c.borrow_mut();
        c.remote_loads.push((uri.to_string(), events.generation()));
        c.activate();
        Box::new(FakeRemote {
            c: self.c.clone(),
            live: true,
            events,
        })
    }
    fn create_tone(&mut self) -> Box<dyn ToneSource> {
        self.c.borrow_mut().tone_created += 1;
        Box::new(FakeTone {
            c: self.c.clone(),
            running: false,
            disposed: false,
        })
    }
    fn shutdown(&mut self) {
        self.c.borrow_mut().shutdowns += 1;
    }
}

struct Harness {
    ctl: PlaybackController<FakeBackend>,
    c: Shared,
    handle: SnapshotHandle,
    rx: Receiver<EngineMsg>,
}

impl Harness {
    fn generation(&self) -> u64 {
        self.ctl.snapshot().generation
    }

    fn event(&mut self, kind: SourceEventKind) -> EventOutcome {
        let generation = self.generation();
        self.ctl.handle_event(SourceEvent { generation, kind })
    }

    fn ready(&mut self, duration: Option<f64>) {
        self.event(SourceEventKind::MetadataReady(duration));
        self.event(SourceEventKind::CanPlay);
    }

    fn mode(&self) -> Mode {
        self.ctl.snapshot().mode
    }

    /// Deliver every event the sources posted, as the engine loop would.
    fn pump(&mut self) -> Vec<EventOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            if let EngineMsg::Source(event) = msg {
                outcomes.push(self.ctl.handle_event(event));
            }
        }
        outcomes
    }
}

fn catalog(n: usize) -> TrackCatalog {
    TrackCatalog::new(
        (0..n)
            .map(|i| {
                Track::new(
                    &format!("Track {i}"),
                    "Calm",
                    "1:00",
                    &format!("https://example.com/{i}.mp3"),
                )
            })
            .collect(),
    )
}

fn harness_with(n: usize, settings: ControllerSettings) -> Harness {
    let c: Shared = Rc::new(RefCell::new(Counters::default()));
    let (tx, rx) = mpsc::channel();
    let handle: SnapshotHandle = Arc::new(Mutex::new(PlaybackSession::default()));
    let ctl = PlaybackController::new(
        catalog(n),
        FakeBackend { c: c.clone() },
        settings,
        tx,
        handle.clone(),
    );
    Harness {
        ctl,
        c,
        handle,
        rx,
    }
}

fn harness(n: usize) -> Harness {
    harness_with(n, ControllerSettings::default())
}

// --- Controller ---

#[test]
fn starts_idle_and_mount_loads_initial_track_without_playing() {
    let mut h = harness(3);
    assert_eq!(h.mode(), Mode::Idle);

    h.ctl.mount().unwrap();
    assert_eq!(h.mode(), Mode::Loading);
    assert_eq!(h.c.borrow().remote_loads.len(), 1);
    assert_eq!(h.c.borrow().remote_loads[0].0, "https://example.com/0.mp3");

    h.ready(Some(60.0));
    assert_eq!(h.mode(), Mode::Paused);
    assert_eq!(h.c.borrow().remote_plays, 0);

    h.ctl.toggle_play().unwrap();
    assert_eq!(h.mode(), Mode::PlayingRemote);
    assert_eq!(h.c.borrow().remote_plays, 1);
}

#[test]
fn mount_clamps_initial_track_and_rejects_empty_catalog() {
    let mut h = harness_with(
        3,
        ControllerSettings {
            initial_track: 10,
            ..Default::default()
        },
    );
    h.ctl.mount().unwrap();
    assert_eq!(h.ctl.snapshot().current_track_index, 2);

    let mut empty = harness(0);
    assert_eq!(empty.ctl.mount(), Err(ControlError::EmptyCatalog));
    assert_eq!(empty.ctl.next(), Err(ControlError::EmptyCatalog));
}

#[test]
fn select_track_plays_remote_once_ready() {
    let mut h = harness(3);
    h.ctl.select_track(1).unwrap();
    assert_eq!(h.mode(), Mode::Loading);

    h.ready(Some(120.0));
    let s = h.ctl.snapshot();
    assert_eq!(s.mode, Mode::PlayingRemote);
    assert_eq!(s.current_track_index, 1);
    assert_eq!(s.duration_seconds, 120.0);
    assert!(!s.on_fallback);
    assert_eq!(h.c.borrow().remote_plays, 1);
}

#[test]
fn exclusivity_holds_across_arbitrary_operation_sequences() {
    let mut h = harness(4);
    h.ctl.mount().unwrap();
    h.ctl.select_track(2).unwrap();
    h.event(SourceEventKind::Error(ErrorKind::NetworkOrDecode));
    h.ctl.toggle_play().unwrap();
    h.ctl.toggle_play().unwrap();
    h.ctl.next().unwrap();
    h.ready(None);
    h.ctl.toggle_play().unwrap();
    h.ctl.select_track(0).unwrap();
    h.ctl.tick(Instant::now() + Duration::from_secs(60));
    h.ctl.previous().unwrap();
    h.ctl.select_track(1).unwrap();
    h.event(SourceEventKind::Error(ErrorKind::PlaybackRejected));
    h.ctl.toggle_mute().unwrap();
    h.ctl.select_track(3).unwrap();
    h.ready(Some(10.0));

    assert!(h.c.borrow().max_active <= 1);

    h.ctl.dispose().unwrap();
    assert_eq!(h.c.borrow().active, 0);
    assert_eq!(h.c.borrow().shutdowns, 1);
}

#[test]
fn switching_resets_progress_error_and_mode() {
    let mut h = harness(3);
    h.ctl.select_track(0).unwrap();
    h.ready(Some(600.0));
    h.event(SourceEventKind::TimeUpdate(42.0));
    assert_eq!(h.ctl.snapshot().elapsed_seconds, 42.0);

    for op in 0..3 {
        match op {
            0 => h.ctl.next().unwrap(),
            1 => h.ctl.previous().unwrap(),
            _ => h.ctl.select_track(2).unwrap(),
        }
        let s = h.ctl.snapshot();
        assert_eq!(s.elapsed_seconds, 0.0);
        assert_eq!(s.duration_seconds, 0.0);
        assert_eq!(s.last_error, None);
        assert_eq!(s.mode, Mode::Loading);

        h.event(SourceEventKind::Error(ErrorKind::NetworkOrDecode));
        assert!(h.ctl.snapshot().last_error.is_some());
    }
}

#[test]
fn late_events_from_superseded_loads_are_discarded() {
    let mut h = harness(3);
    h.ctl.select_track(0).unwrap();
    let first = h.generation();
    h.ctl.select_track(1).unwrap();
    assert_ne!(first, h.generation());

    let outcome = h.ctl.handle_event(SourceEvent {
        generation: first,
        kind: SourceEventKind::MetadataReady(Some(300.0)),
    });
    assert_eq!(outcome, EventOutcome::Discarded);

    let outcome = h.ctl.handle_event(SourceEvent {
        generation: first,
        kind: SourceEventKind::Error(ErrorKind::NetworkOrDecode),
    });
    assert_eq!(outcome, EventOutcome::Discarded);

    let s = h.ctl.snapshot();
    assert_eq!(s.current_track_index, 1);
    assert_eq!(s.mode, Mode::Loading);
    assert_eq!(s.duration_seconds, 0.0);
    assert_eq!(s.last_error, None);
    assert_eq!(h.c.borrow().tone_starts, 0);
}

#[test]
fn remote_error_engages_fallback_tone_exactly_once() {
    let mut h = harness(3);
    h.ctl.select_track(0).unwrap();
    assert_eq!(
        h.event(SourceEventKind::Error(ErrorKind::NetworkOrDecode)),
        EventOutcome::Applied
    );

    let s = h.ctl.snapshot();
    assert_eq!(s.mode, Mode::PlayingFallback);
    assert_eq!(s.last_error, Some(ErrorKind::NetworkOrDecode));
    assert!(s.on_fallback);
    assert_eq!(s.duration_seconds, 0.0);
    assert_eq!(h.c.borrow().tone_starts, 1);
    assert_eq!(h.c.borrow().remote_disposed, 1);
}

#[test]
fn rejected_play_mid_stream_switches_to_fallback() {
    let mut h = harness(2);
    h.ctl.select_track(0).unwrap();
    h.ready(Some(100.0));
    h.event(SourceEventKind::TimeUpdate(30.0));

    h.event(SourceEventKind::Error(ErrorKind::PlaybackRejected));
    let s = h.ctl.snapshot();
    assert_eq!(s.mode, Mode::PlayingFallback);
    assert_eq!(s.elapsed_seconds, 0.0);
    assert_eq!(s.duration_seconds, 0.0);

    // Fallback has no progress; late remote events for this load are ignored.
    assert_eq!(
        h.event(SourceEventKind::TimeUpdate(31.0)),
        EventOutcome::Discarded
    );
}

#[test]
fn error_without_play_intent_waits_paused_on_fallback() {
    let mut h = harness(2);
    h.ctl.mount().unwrap();
    h.event(SourceEventKind::Error(ErrorKind::NetworkOrDecode));
    let s = h.ctl.snapshot();
    assert_eq!(s.mode, Mode::Paused);
    assert!(s.on_fallback);
    assert_eq!(h.c.borrow().tone_starts, 0);

    h.ctl.toggle_play().unwrap();
    assert_eq!(h.mode(), Mode::PlayingFallback);
    assert_eq!(h.c.borrow().tone_starts, 1);
}

#[test]
fn next_and_previous_wrap_around_the_catalog() {
    let n = 5;
    let mut h = harness(n);
    h.ctl.select_track(0).unwrap();
    for _ in 0..n {
        h.ctl.next().unwrap();
    }
    assert_eq!(h.ctl.snapshot().current_track_index, 0);

    h.ctl.previous().unwrap();
    assert_eq!(h.ctl.snapshot().current_track_index, n - 1);
}

#[test]
fn skip_honours_autoplay_setting() {
    let mut h = harness(3);
    h.ctl.select_track(0).unwrap();
    h.ready(None);
    h.ctl.next().unwrap();
    h.ready(None);
    assert_eq!(h.mode(), Mode::Paused);

    let mut h = harness_with(
        3,
        ControllerSettings {
            autoplay_on_skip: true,
            ..Default::default()
        },
    );
    h.ctl.mount().unwrap();
    h.ctl.next().unwrap();
    h.ready(None);
    assert_eq!(h.mode(), Mode::PlayingRemote);
}

#[test]
fn out_of_bounds_selection_is_a_reported_no_op() {
    let mut h = harness(3);
    h.ctl.select_track(1).unwrap();
    let before = h.ctl.snapshot();
    let loads = h.c.borrow().remote_loads.len();

    assert_eq!(
        h.ctl.select_track(3),
        Err(ControlError::InvalidTrackIndex { index: 3, len: 3 })
    );
    assert_eq!(h.ctl.snapshot(), before);
    assert_eq!(h.c.borrow().remote_loads.len(), loads);
}

#[test]
fn toggle_play_pauses_and_resumes_in_the_same_mode() {
    let mut h = harness(2);
    h.ctl.select_track(0).unwrap();
    h.ready(None);
    h.ctl.toggle_play().unwrap();
    assert_eq!(h.mode(), Mode::Paused);
    assert_eq!(h.c.borrow().remote_pauses, 1);
    h.ctl.toggle_play().unwrap();
    assert_eq!(h.mode(), Mode::PlayingRemote);

    h.ctl.select_track(1).unwrap();
    h.event(SourceEventKind::Error(ErrorKind::NetworkOrDecode));
    h.ctl.toggle_play().unwrap();
    assert_eq!(h.mode(), Mode::Paused);
    assert_eq!(h.c.borrow().tone_stops, 1);
    h.ctl.toggle_play().unwrap();
    assert_eq!(h.mode(), Mode::PlayingFallback);
    assert_eq!(h.c.borrow().tone_starts, 2);
    assert_eq!(h.c.borrow().tone_created, 1);

    // Resuming never loads anything new.
    assert_eq!(h.c.borrow().remote_loads.len(), 2);
}

#[test]
fn toggle_play_while_loading_flips_intent_only() {
    let mut h = harness(2);
    h.ctl.select_track(0).unwrap();
    h.ctl.toggle_play().unwrap();
    assert_eq!(h.mode(), Mode::Loading);
    h.ready(None);
    assert_eq!(h.mode(), Mode::Paused);
    assert_eq!(h.c.borrow().remote_plays, 0);
    assert_eq!(h.c.borrow().remote_loads.len(), 1);
}

#[test]
fn toggle_play_before_mount_does_nothing() {
    let mut h = harness(2);
    h.ctl.toggle_play().unwrap();
    assert_eq!(h.mode(), Mode::Idle);
    assert!(h.c.borrow().remote_loads.is_empty());
}

#[test]
fn watchdog_stalls_a_hung_load_and_engages_tone() {
    let mut h = harness_with(
        2,
        ControllerSettings {
            load_timeout: Duration::from_millis(500),
            ..Default::default()
        },
    );
    h.ctl.select_track(0).unwrap();
    h.ctl.tick(Instant::now());
    assert_eq!(h.mode(), Mode::Loading);

    h.ctl.tick(Instant::now() + Duration::from_secs(2));
    let s = h.ctl.snapshot();
    assert_eq!(s.mode, Mode::Stalled);
    assert_eq!(s.last_error, Some(ErrorKind::LoadTimeout));
    assert_eq!(h.c.borrow().tone_starts, 1);
    assert_eq!(h.c.borrow().remote_disposed, 1);

    h.ctl.toggle_play().unwrap();
    h.ctl.toggle_play().unwrap();
    assert_eq!(h.mode(), Mode::Stalled);
}

#[test]
fn invalid_locator_error_stalls() {
    let mut h = harness(2);
    h.ctl.select_track(1).unwrap();
    h.event(SourceEventKind::Error(ErrorKind::InvalidLocator));
    let s = h.ctl.snapshot();
    assert_eq!(s.mode, Mode::Stalled);
    assert_eq!(s.last_error, Some(ErrorKind::InvalidLocator));
    assert!(s.on_fallback);
}

#[test]
fn drained_remote_stream_falls_back() {
    let mut h = harness(2);
    h.ctl.select_track(0).unwrap();
    h.ready(Some(100.0));
    h.c.borrow_mut().drained = true;
    h.ctl.tick(Instant::now());
    assert_eq!(h.mode(), Mode::PlayingFallback);
    assert_eq!(h.ctl.snapshot().last_error, Some(ErrorKind::NetworkOrDecode));
}

#[test]
fn tick_samples_position_at_bounded_rate() {
    let mut h = harness_with(
        2,
        ControllerSettings {
            tick: Duration::from_millis(250),
            ..Default::default()
        },
    );
    h.ctl.select_track(0).unwrap();
    h.ready(Some(100.0));

    let t0 = Instant::now();
    h.c.borrow_mut().position = Some(5.0);
    h.ctl.tick(t0);
    // The sample travels through the inbox, not straight into the clock.
    assert_eq!(h.ctl.snapshot().elapsed_seconds, 0.0);
    assert_eq!(h.pump(), vec![EventOutcome::Applied]);
    assert_eq!(h.ctl.snapshot().elapsed_seconds, 5.0);

    h.c.borrow_mut().position = Some(5.1);
    h.ctl.tick(t0 + Duration::from_millis(100));
    assert!(h.pump().is_empty());
    assert_eq!(h.ctl.snapshot().elapsed_seconds, 5.0);

    h.ctl.tick(t0 + Duration::from_millis(300));
    h.pump();
    assert_eq!(h.ctl.snapshot().elapsed_seconds, 5.1);
}

#[test]
fn position_samples_from_a_superseded_load_are_discarded() {
    let mut h = harness(2);
    h.ctl.select_track(0).unwrap();
    h.ready(Some(100.0));
    h.c.borrow_mut().position = Some(42.0);
    h.ctl.tick(Instant::now());

    h.ctl.select_track(1).unwrap();
    assert_eq!(h.pump(), vec![EventOutcome::Discarded]);

    let s = h.ctl.snapshot();
    assert_eq!(s.current_track_index, 1);
    assert_eq!(s.elapsed_seconds, 0.0);
    assert_eq!(s.mode, Mode::Loading);
}

#[test]
fn elapsed_is_clamped_to_known_duration() {
    let mut h = harness(1);
    h.ctl.select_track(0).unwrap();
    h.ready(Some(600.0));
    h.event(SourceEventKind::TimeUpdate(999.0));
    let s = h.ctl.snapshot();
    assert_eq!(s.elapsed_seconds, 600.0);
    assert_eq!(s.progress_percentage(), 100.0);
}

#[test]
fn mute_reaches_remote_and_only_reaches_tone_when_configured() {
    let mut h = harness(2);
    h.ctl.select_track(0).unwrap();
    h.ctl.toggle_mute().unwrap();
    assert!(h.ctl.snapshot().muted);
    assert_eq!(h.c.borrow().remote_muted, Some(true));

    h.event(SourceEventKind::Error(ErrorKind::NetworkOrDecode));
    h.ctl.toggle_mute().unwrap();
    h.ctl.toggle_mute().unwrap();
    assert_eq!(h.c.borrow().tone_muted, None);

    let mut h = harness_with(
        2,
        ControllerSettings {
            mute_affects_tone: true,
            ..Default::default()
        },
    );
    h.ctl.select_track(0).unwrap();
    h.event(SourceEventKind::Error(ErrorKind::NetworkOrDecode));
    h.ctl.set_muted(true).unwrap();
    assert_eq!(h.c.borrow().tone_muted, Some(true));
}

#[test]
fn mute_survives_track_switches() {
    let mut h = harness(2);
    h.ctl.set_muted(true).unwrap();
    h.ctl.select_track(1).unwrap();
    assert!(h.ctl.snapshot().muted);
    assert_eq!(h.c.borrow().remote_muted, Some(true));
}

#[test]
fn tone_start_failure_is_recorded_not_fatal() {
    let mut h = harness(1);
    h.c.borrow_mut().tone_fails = true;
    h.ctl.select_track(0).unwrap();
    h.event(SourceEventKind::Error(ErrorKind::NetworkOrDecode));
    let s = h.ctl.snapshot();
    assert_eq!(s.mode, Mode::PlayingFallback);
    assert_eq!(s.last_error, Some(ErrorKind::PlaybackRejected));
}

#[test]
fn dispose_twice_and_operations_after_dispose_are_rejected() {
    let mut h = harness(2);
    h.ctl.select_track(0).unwrap();
    let generation = h.generation();
    h.ctl.dispose().unwrap();

    let s = h.ctl.snapshot();
    assert_eq!(s.mode, Mode::Idle);
    assert!(s.disposed);
    assert_eq!(h.c.borrow().active, 0);

    assert_eq!(h.ctl.dispose(), Err(ControlError::Disposed));
    assert_eq!(h.ctl.select_track(0), Err(ControlError::Disposed));
    assert_eq!(h.ctl.toggle_play(), Err(ControlError::Disposed));
    assert_eq!(h.ctl.toggle_mute(), Err(ControlError::Disposed));
    assert_eq!(
        h.ctl.handle_event(SourceEvent {
            generation,
            kind: SourceEventKind::CanPlay
        }),
        EventOutcome::Discarded
    );
    assert_eq!(h.c.borrow().shutdowns, 1);
}

#[test]
fn snapshot_handle_and_subscribers_see_changes() {
    let mut h = harness(2);
    let rx = h.ctl.subscribe();
    assert_eq!(rx.try_recv().unwrap().mode, Mode::Idle);

    h.ctl.select_track(1).unwrap();
    let pushed = rx.try_recv().unwrap();
    assert_eq!(pushed.mode, Mode::Loading);
    assert_eq!(pushed.current_track_index, 1);
    assert_eq!(*h.handle.lock().unwrap(), h.ctl.snapshot());

    // Nothing changed, nothing pushed.
    h.ctl.tick(Instant::now());
    assert!(rx.try_recv().is_err());
}

#[test]
fn engine_loop_mounts_and_disposes_on_quit() {
    let c: Shared = Rc::new(RefCell::new(Counters::default()));
    let (tx, rx) = mpsc::channel();
    let handle: SnapshotHandle = Arc::new(Mutex::new(PlaybackSession::default()));
    let ctl = PlaybackController::new(
        catalog(2),
        FakeBackend { c: c.clone() },
        ControllerSettings::default(),
        tx.clone(),
        handle.clone(),
    );

    tx.send(EngineMsg::Command(AudioCmd::SelectTrack(1))).unwrap();
    tx.send(EngineMsg::Source(SourceEvent {
        generation: 2,
        kind: SourceEventKind::CanPlay,
    }))
    .unwrap();
    tx.send(EngineMsg::Command(AudioCmd::Quit)).unwrap();

    super::thread::run_engine(ctl, &rx);

    let c = c.borrow();
    assert_eq!(c.remote_loads.len(), 2);
    assert_eq!(c.remote_plays, 1);
    assert_eq!(c.active, 0);
    assert_eq!(c.shutdowns, 1);
    assert!(handle.lock().unwrap().disposed);
}

#[test]
fn joining_a_panicked_engine_thread_is_reported() {
    let clean = std::thread::spawn(|| {});
    assert!(super::thread::join_engine(clean));

    let failed = std::thread::spawn(|| panic!("engine failed"));
    assert!(!super::thread::join_engine(failed));
}

// --- Remote source ---

/// A mono 16-bit PCM WAV file.
fn wav_bytes(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

/// A 100 Hz square wave, 0.1 s at 48 kHz, written to a temp file.
fn square_wave_file(dir: &tempfile::TempDir) -> String {
    let samples: Vec<i16> = (0..4_800)
        .map(|i| if (i / 240) % 2 == 0 { 8_000 } else { -8_000 })
        .collect();
    let path = dir.path().join("square.wav");
    std::fs::write(&path, wav_bytes(&samples, 48_000)).unwrap();
    reqwest::Url::from_file_path(&path).unwrap().to_string()
}

fn next_event(rx: &Receiver<EngineMsg>) -> SourceEvent {
    match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
        EngineMsg::Source(event) => event,
        EngineMsg::Command(cmd) => panic!("unexpected command {cmd:?}"),
    }
}

#[test]
fn remote_load_reports_invalid_locator() {
    let (tx, rx) = mpsc::channel();
    let _source = RemoteAudioSource::load(
        "",
        None,
        reqwest::blocking::Client::new(),
        SourceEvents::new(tx, 7),
    );
    assert_eq!(
        next_event(&rx),
        SourceEvent {
            generation: 7,
            kind: SourceEventKind::Error(ErrorKind::InvalidLocator),
        }
    );
}

#[test]
fn remote_load_without_output_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let url = square_wave_file(&dir);
    let (tx, rx) = mpsc::channel();
    let _source = RemoteAudioSource::load(
        &url,
        None,
        reqwest::blocking::Client::new(),
        SourceEvents::new(tx, 3),
    );
    assert_eq!(
        next_event(&rx).kind,
        SourceEventKind::Error(ErrorKind::PlaybackRejected)
    );
}

#[test]
fn remote_load_installs_a_playable_looping_sink() {
    let dir = tempfile::tempdir().unwrap();
    let url = square_wave_file(&dir);
    let (mixer, output) = rodio::mixer::mixer(1, 48_000);
    let (tx, rx) = mpsc::channel();

    let mut source = RemoteAudioSource::pending(SourceEvents::new(tx, 1));
    source
        .loader(&url, Some(mixer), reqwest::blocking::Client::new())
        .run();

    match next_event(&rx).kind {
        SourceEventKind::MetadataReady(duration) => {
            if let Some(secs) = duration {
                assert!((secs - 0.1).abs() < 0.01, "{secs}");
            }
        }
        other => panic!("expected metadata, got {other:?}"),
    }
    assert_eq!(next_event(&rx).kind, SourceEventKind::CanPlay);

    source.play();
    let peak = output
        .skip(4_800)
        .take(9_600)
        .fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!(peak > 0.1, "remote track is silent: {peak}");
    source.dispose();
}

#[test]
fn remote_load_disposed_before_install_stays_silent() {
    let dir = tempfile::tempdir().unwrap();
    let url = square_wave_file(&dir);
    let (mixer, output) = rodio::mixer::mixer(1, 48_000);
    let (tx, rx) = mpsc::channel();

    let mut source = RemoteAudioSource::pending(SourceEvents::new(tx, 1));
    let loader = source.loader(&url, Some(mixer), reqwest::blocking::Client::new());
    source.dispose();
    loader.run();

    assert!(rx.try_recv().is_err());
    source.play();
    assert!(output.take(4_800).all(|s| s == 0.0));
    assert!(!source.is_drained());
}

#[test]
fn undecodable_payload_is_reported_unless_disposed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.bin");
    std::fs::write(&path, b"not audio at all").unwrap();
    let url = reqwest::Url::from_file_path(&path).unwrap().to_string();

    let (mixer, _output) = rodio::mixer::mixer(1, 48_000);
    let (tx, rx) = mpsc::channel();
    let source = RemoteAudioSource::pending(SourceEvents::new(tx.clone(), 1));
    source
        .loader(&url, Some(mixer.clone()), reqwest::blocking::Client::new())
        .run();
    assert_eq!(
        next_event(&rx).kind,
        SourceEventKind::Error(ErrorKind::NetworkOrDecode)
    );

    let mut superseded = RemoteAudioSource::pending(SourceEvents::new(tx, 2));
    let loader = superseded.loader(&url, Some(mixer), reqwest::blocking::Client::new());
    superseded.dispose();
    loader.run();
    assert!(rx.try_recv().is_err());
}

// --- Synthesized tone without an output device ---

#[test]
fn tone_without_output_reports_error_and_disposes_idempotently() {
    let mut tone = SynthesizedToneSource::new(None, 432.0, 0.1);
    assert!(tone.start().is_err());
    assert!(!tone.is_active());
    tone.stop();
    tone.dispose();
    tone.dispose();
    assert!(tone.start().is_ok());
    assert!(!tone.is_active());
}

#[test]
fn restarting_tone_leaves_a_single_oscillator() {
    let (mixer, output) = rodio::mixer::mixer(1, 48_000);
    let mut tone = SynthesizedToneSource::new(Some(mixer), 432.0, 0.1);
    tone.start().unwrap();
    tone.start().unwrap();
    assert!(tone.is_active());

    // Skip past the sink's stop polling, then look at the steady state.
    let peak = output
        .skip(4_800)
        .take(4_800)
        .fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!(peak > 0.09, "tone is silent: {peak}");
    assert!(peak <= 0.1 + 1e-3, "overlapping tones: {peak}");

    tone.dispose();
    tone.dispose();
    assert!(!tone.is_active());
}

// --- Progress ---

#[test]
fn format_time_renders_minutes_and_seconds() {
    assert_eq!(format_time(0.0), "0:00");
    assert_eq!(format_time(59.9), "0:59");
    assert_eq!(format_time(61.0), "1:01");
    assert_eq!(format_time(600.0), "10:00");
    assert_eq!(format_time(f64::NAN), "0:00");
    assert_eq!(format_time(f64::INFINITY), "0:00");
    assert_eq!(format_time(-3.0), "0:00");
}

#[test]
fn progress_clock_treats_nan_duration_as_unknown() {
    let mut clock = ProgressClock::new(Duration::from_millis(100));
    clock.set_duration(Some(f64::NAN));
    assert_eq!(clock.duration(), 0.0);
    assert_eq!(clock.update(12.0), 12.0);
    assert_eq!(percentage(clock.elapsed(), clock.duration()), 0.0);

    clock.set_duration(Some(10.0));
    assert_eq!(clock.elapsed(), 10.0);
    assert_eq!(clock.update(f64::NAN), 0.0);
    assert_eq!(clock.update(5.0), 5.0);
    assert_eq!(percentage(clock.elapsed(), clock.duration()), 50.0);

    clock.reset();
    assert_eq!(clock.elapsed(), 0.0);
    assert_eq!(clock.duration(), 0.0);
}

#[test]
fn percentage_is_zero_without_duration() {
    assert_eq!(percentage(30.0, 0.0), 0.0);
    assert_eq!(percentage(30.0, 60.0), 50.0);
    assert_eq!(percentage(90.0, 60.0), 100.0);
}

// --- Fetch ---

#[test]
fn parse_locator_accepts_http_https_and_file() {
    assert!(parse_locator("https://cdn.example.com/a.mp3").is_ok());
    assert!(parse_locator("http://cdn.example.com/a.mp3").is_ok());
    assert!(parse_locator("  file:///tmp/a.ogg ").is_ok());
}

#[test]
fn parse_locator_rejects_unusable_locators_as_invalid() {
    for bad in ["", "   ", "not a url", "ftp://example.com/a.mp3"] {
        let err = parse_locator(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidLocator, "locator {bad:?}");
    }
}

#[test]
fn fetch_bytes_reads_file_locators() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bell.wav");
    std::fs::write(&path, b"RIFF....WAVE").unwrap();

    let client = reqwest::blocking::Client::new();
    let url = reqwest::Url::from_file_path(&path).unwrap();
    assert_eq!(fetch_bytes(&client, &url).unwrap(), b"RIFF....WAVE".to_vec());

    let missing = reqwest::Url::from_file_path(dir.path().join("missing.wav")).unwrap();
    let err = fetch_bytes(&client, &missing).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkOrDecode);
}
