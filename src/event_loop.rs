//! Frame-limited run loop.
//!
//! [`EventLoop`] owns an [`EventQueue`] and an [`EventDispatcher`] and runs a
//! plain single-threaded loop:
//!
//! 1. wait according to the [`FrameLimit`],
//! 2. dispatch every queued event,
//! 3. call the per-tick body,
//! 4. update tick count, frame time and FPS.
//!
//! The loop stops once its exit flag is set, which handlers and the body can do
//! through an [`ExitHandle`]. The flag is checked after step 2 and after step 3.

use crate::config::LoopConfig;
use crate::dispatcher::{DispatchResult, EventDispatcher, HandlerCoordinate};
use crate::error::Result;
use crate::event::Event;
use crate::handler::EventHandler;
use crate::queue::EventQueue;
use crate::source::{EventSource, SourceId};
use crate::sources::{Display, Timer};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the loop paces its ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameLimit {
    /// Tick as fast as possible.
    None,
    /// Tick at the refresh rate of the attached display.
    #[default]
    Auto,
    /// Tick at a fixed frequency (Hz).
    Fixed(f64),
}

/// Shared exit flag.
#[derive(Clone, Debug, Default)]
pub struct ExitHandle(Arc<AtomicBool>);

impl ExitHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Frames-per-second over one-second windows.
#[derive(Clone, Debug)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f64,
}

impl FpsCounter {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Counts one frame at `now`.
    pub fn tick(&mut self, now: Instant) {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= Self::WINDOW {
            self.fps = f64::from(self.frames) / elapsed.as_secs_f64();
            self.frames = 0;
            self.window_start = now;
        }
    }

    /// Rate measured over the last completed window (`0.0` before the first).
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

/// Per-tick view handed to the loop body.
pub struct Frame<'a> {
    tick: u64,
    frame_time: Duration,
    fps: f64,
    exit: &'a ExitHandle,
}

impl Frame<'_> {
    /// 1-based tick number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Time since the previous tick.
    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Stops the loop after this tick.
    pub fn exit(&self) {
        self.exit.request();
    }
}

/// Summary returned by [`EventLoop::run`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LoopStats {
    pub ticks: u64,
    pub dispatched: u64,
    pub unhandled: u64,
    pub elapsed: Duration,
    pub fps: f64,
}

pub struct EventLoop {
    queue: EventQueue,
    dispatcher: EventDispatcher,
    config: LoopConfig,
    exit: ExitHandle,
    display_rate: Option<f64>,
    stats: LoopStats,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::build(LoopConfig::default())
    }

    pub fn with_config(config: LoopConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: LoopConfig) -> Self {
        log::info!("Event loop created ({:?}).", config.frame_limit);
        Self {
            queue: EventQueue::new(),
            dispatcher: EventDispatcher::new(),
            config,
            exit: ExitHandle::default(),
            display_rate: None,
            stats: LoopStats::default(),
        }
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut EventQueue {
        &mut self.queue
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut EventDispatcher {
        &mut self.dispatcher
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn set_frame_limit(&mut self, limit: FrameLimit) -> Result<()> {
        let config = LoopConfig {
            frame_limit: limit,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn register_source<S: EventSource + ?Sized>(&mut self, source: &S) -> bool {
        self.queue.register_source(source)
    }

    /// Registers the display and paces [`FrameLimit::Auto`] to its refresh rate.
    pub fn attach_display(&mut self, display: &Display) {
        self.queue.register_source(display);
        self.display_rate = Some(display.refresh_rate());
    }

    pub fn exit_handle(&self) -> ExitHandle {
        self.exit.clone()
    }

    pub fn request_exit(&self) {
        self.exit.request();
    }

    /// Installs a handler at `coordinate` that stops the loop.
    pub fn exit_on(&mut self, coordinate: HandlerCoordinate) -> Result<Option<EventHandler>> {
        let exit = self.exit.clone();
        self.dispatcher
            .set_handler(coordinate, move || exit.request())
    }

    /// Tick rate the current limit resolves to, `None` when unlimited.
    pub fn tick_rate(&self) -> Option<f64> {
        match self.config.frame_limit {
            FrameLimit::None => None,
            FrameLimit::Auto => Some(
                self.display_rate
                    .unwrap_or(self.config.fallback_refresh_rate),
            ),
            FrameLimit::Fixed(hz) => Some(hz),
        }
    }

    /// Runs until the exit flag is set.
    ///
    /// A request made before `run` is honoured: the loop returns without
    /// ticking. The flag is cleared on return so the loop can be run again.
    pub fn run(&mut self, body: impl FnMut(&mut Frame<'_>)) -> Result<LoopStats> {
        let result = self.run_ticks(body);
        self.exit.reset();
        result
    }

    fn run_ticks(&mut self, mut body: impl FnMut(&mut Frame<'_>)) -> Result<LoopStats> {
        self.stats = LoopStats::default();

        let pacer = match self.tick_rate() {
            Some(hz) => {
                let timer = Timer::from_hz(hz)?;
                self.queue.register_source(&timer);
                timer.start();
                Some(timer)
            }
            None => None,
        };
        let pacer_id = pacer.as_ref().map(Timer::source_id);
        log::info!("Event loop running at {:?} Hz.", self.tick_rate());

        let start = Instant::now();
        let mut last = start;
        let mut fps = FpsCounter::new(start);

        // Set when a pacing tick was already consumed while draining.
        let mut tick_due = false;
        loop {
            if self.exit.is_requested() {
                break;
            }
            if let Some(id) = pacer_id {
                if !tick_due {
                    self.wait_for_tick(id)?;
                }
            }
            tick_due = !self.exit.is_requested() && self.drain(pacer_id);
            if self.exit.is_requested() {
                break;
            }

            let now = Instant::now();
            fps.tick(now);
            self.stats.ticks += 1;
            let mut frame = Frame {
                tick: self.stats.ticks,
                frame_time: now - last,
                fps: fps.fps(),
                exit: &self.exit,
            };
            last = now;
            body(&mut frame);

            if self.exit.is_requested() {
                break;
            }
        }

        if let Some(timer) = pacer {
            timer.stop();
            self.queue.unregister_source(&timer);
        }
        self.stats.elapsed = start.elapsed();
        self.stats.fps = fps.fps();
        log::info!(
            "Event loop exited after {} tick(s), {} event(s) dispatched.",
            self.stats.ticks,
            self.stats.dispatched
        );
        Ok(self.stats.clone())
    }

    /// Blocks until the pacing timer ticks, dispatching anything else that
    /// arrives in the meantime.
    fn wait_for_tick(&mut self, pacer: SourceId) -> Result<()> {
        loop {
            let event = self.queue.wait_for_event()?;
            if event.source() == pacer {
                return Ok(());
            }
            self.route(&event);
            if self.exit.is_requested() {
                return Ok(());
            }
        }
    }

    /// Dispatches queued events. Returns `true` if a pacing tick was consumed.
    fn drain(&mut self, pacer: Option<SourceId>) -> bool {
        let limit = self.config.drain_limit;
        let mut routed = 0;
        let mut ticked = false;
        while limit == 0 || routed < limit {
            let Some(event) = self.queue.get_next_event() else {
                break;
            };
            // Ticks of a slow frame collapse into one.
            if Some(event.source()) == pacer {
                ticked = true;
                continue;
            }
            self.route(&event);
            routed += 1;
            if self.exit.is_requested() {
                break;
            }
        }
        ticked
    }

    fn route(&mut self, event: &Event) {
        self.stats.dispatched += 1;
        if self.dispatcher.dispatch(event) == DispatchResult::NotHandled {
            self.stats.unhandled += 1;
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use crate::sources::Keyboard;
    use crate::keycodes::KEY_ESCAPE;

    #[test]
    fn body_can_stop_the_loop() {
        let mut el = EventLoop::new();
        el.set_frame_limit(FrameLimit::None).unwrap();
        let stats = el
            .run(|frame| {
                if frame.tick() == 3 {
                    frame.exit();
                }
            })
            .unwrap();
        assert_eq!(stats.ticks, 3);
    }

    #[test]
    fn handler_can_stop_the_loop_before_the_body_runs() {
        let kb = Keyboard::new();
        let mut el = EventLoop::new();
        el.set_frame_limit(FrameLimit::None).unwrap();
        el.register_source(&kb);
        let exit = el.exit_handle();
        el.dispatcher_mut()
            .on_key_down(KEY_ESCAPE, move || exit.request())
            .unwrap();

        kb.key_down(KEY_ESCAPE, 0).unwrap();
        let mut body_calls = 0;
        let stats = el.run(|_| body_calls += 1).unwrap();
        assert_eq!(body_calls, 0);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.unhandled, 0);
    }

    #[test]
    fn exit_requested_before_run_stops_without_ticking() {
        let mut el = EventLoop::with_config(LoopConfig {
            frame_limit: FrameLimit::Fixed(10.0),
            ..LoopConfig::default()
        })
        .unwrap();
        el.request_exit();
        let started = Instant::now();
        let stats = el.run(|frame| frame.exit()).unwrap();
        assert_eq!(stats.ticks, 0);
        // No pacing period was waited out.
        assert!(started.elapsed() < Duration::from_millis(90));

        // The flag was cleared on return; the next run ticks normally.
        assert!(!el.exit_handle().is_requested());
        el.set_frame_limit(FrameLimit::None).unwrap();
        let stats = el.run(|frame| frame.exit()).unwrap();
        assert_eq!(stats.ticks, 1);
    }

    #[test]
    fn exit_from_another_thread_before_run_is_kept() {
        let mut el = EventLoop::new();
        el.set_frame_limit(FrameLimit::None).unwrap();
        let exit = el.exit_handle();
        std::thread::spawn(move || exit.request()).join().unwrap();
        let stats = el.run(|_| {}).unwrap();
        assert_eq!(stats.ticks, 0);
    }

    #[test]
    fn tick_seen_while_draining_is_not_waited_for_again() {
        use crate::sources::UserEventSource;
        use crate::user_event::UserEventType;

        #[derive(Clone, Copy)]
        struct Step(u32);
        impl UserEventType for Step {}

        // 10 Hz pacing; each step takes 60 ms and posts the next one.
        let src = UserEventSource::new();
        let mut el = EventLoop::with_config(LoopConfig {
            frame_limit: FrameLimit::Fixed(10.0),
            ..LoopConfig::default()
        })
        .unwrap();
        el.register_source(&src);
        let chain = src.clone();
        el.dispatcher_mut()
            .on_user(move |s: &Step| {
                std::thread::sleep(Duration::from_millis(60));
                if s.0 < 4 {
                    chain.emit(Step(s.0 + 1)).unwrap();
                }
            })
            .unwrap();
        src.emit(Step(1)).unwrap();

        // Steps 1-3 are routed while waiting for the 100 ms tick and step 4 in
        // the first drain, which also picks up the 200 ms tick. The second
        // frame must start right away (~240 ms) instead of at 300 ms.
        let stats = el
            .run(|frame| {
                if frame.tick() == 2 {
                    frame.exit();
                }
            })
            .unwrap();
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.dispatched, 4);
        assert!(stats.elapsed < Duration::from_millis(280), "{:?}", stats.elapsed);
    }

    #[test]
    fn fixed_limit_paces_ticks() {
        let mut el = EventLoop::with_config(LoopConfig {
            frame_limit: FrameLimit::Fixed(200.0),
            ..LoopConfig::default()
        })
        .unwrap();
        let stats = el
            .run(|frame| {
                if frame.tick() == 10 {
                    frame.exit();
                }
            })
            .unwrap();
        assert_eq!(stats.ticks, 10);
        // 10 ticks at 200 Hz cannot finish in under ~50ms.
        assert!(stats.elapsed >= Duration::from_millis(45), "{:?}", stats.elapsed);
        // Pacing ticks are consumed by the loop, not dispatched.
        assert_eq!(stats.dispatched, 0);
        assert!(el.queue().sources().next().is_none());
    }

    #[test]
    fn auto_limit_uses_display_rate() {
        let mut el = EventLoop::new();
        assert_eq!(el.tick_rate(), Some(60.0));
        el.attach_display(&Display::new(320, 240).with_refresh_rate(75.0));
        assert_eq!(el.tick_rate(), Some(75.0));
        el.set_frame_limit(FrameLimit::None).unwrap();
        assert_eq!(el.tick_rate(), None);
        assert!(el.set_frame_limit(FrameLimit::Fixed(-1.0)).is_err());
    }

    #[test]
    fn exit_on_display_close() {
        let display = Display::new(320, 240);
        let mut el = EventLoop::new();
        el.set_frame_limit(FrameLimit::None).unwrap();
        el.attach_display(&display);
        el.exit_on(HandlerCoordinate::of_type(EventType::DISPLAY_CLOSE))
            .unwrap();

        let stats = el
            .run(|frame| {
                if frame.tick() == 2 {
                    display.close_requested();
                }
            })
            .unwrap();
        assert_eq!(stats.ticks, 2);
    }

    #[test]
    fn drain_limit_spreads_events_over_ticks() {
        let kb = Keyboard::new();
        let mut el = EventLoop::with_config(LoopConfig {
            frame_limit: FrameLimit::None,
            drain_limit: 2,
            ..LoopConfig::default()
        })
        .unwrap();
        el.register_source(&kb);
        for _ in 0..5 {
            kb.key_down(KEY_ESCAPE, 0).unwrap();
        }
        let stats = el
            .run(|frame| {
                if frame.tick() == 2 {
                    frame.exit();
                }
            })
            .unwrap();
        assert_eq!(stats.dispatched, 4);
        assert_eq!(stats.unhandled, 4);
        assert_eq!(el.queue().len(), 1);
    }

    #[test]
    fn fps_counter_windows() {
        let t0 = Instant::now();
        let mut c = FpsCounter::new(t0);
        for i in 1..=40 {
            c.tick(t0 + Duration::from_millis(i * 33));
        }
        assert!(c.fps() > 25.0 && c.fps() < 35.0, "{}", c.fps());
    }
}
