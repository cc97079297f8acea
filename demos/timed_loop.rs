use mmevents::{Display, EventLoop, EventType, FrameLimit, LoopConfig, Timer, TimerEvent};
use std::time::Duration;

fn main() -> mmevents::Result<()> {
    env_logger::init();

    // Optional config file as first argument
    let config = match std::env::args().nth(1) {
        Some(path) => LoopConfig::load(path)?,
        None => LoopConfig {
            frame_limit: FrameLimit::Fixed(30.0),
            ..LoopConfig::default()
        },
    };

    let display = Display::new(640, 480);
    let mut el = EventLoop::with_config(config)?;
    el.attach_display(&display);
    el.exit_on(mmevents::HandlerCoordinate::of_type(EventType::DISPLAY_CLOSE))?;

    // A slower gameplay timer next to the frame pacing
    let second = Timer::new(Duration::from_secs(1))?;
    el.register_source(&second);
    el.dispatcher_mut()
        .on_payload(EventType::TIMER, |t: &TimerEvent| {
            println!("{} second(s)", t.count);
        });
    second.start();

    println!("Running at {:?} Hz for 3 seconds...", el.tick_rate());
    let stats = el.run(|frame| {
        if frame.tick() % 30 == 0 {
            println!("tick {} fps {:.1} dt {:?}", frame.tick(), frame.fps(), frame.frame_time());
        }
        if second.count() >= 3 {
            display.close_requested();
        }
    })?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
