use mmevents::keycodes::*;
use mmevents::{
    DispatchInfo, Event, EventDispatcher, EventQueue, EventType, Keyboard, KeyboardEvent, Mouse,
};

fn main() {
    env_logger::init();

    // Two sources feeding one queue
    let keyboard = Keyboard::new();
    let mouse = Mouse::new();
    let mut queue = EventQueue::new();
    queue.register_source(&keyboard);
    queue.register_source(&mouse);

    let mut dispatcher = EventDispatcher::new();

    // Value-level: one specific key
    dispatcher
        .on_key_down(KEY_SPACE, || println!("Jump!"))
        .expect("keycode discretizer is built in");

    // Type-level: any other key, with the typed payload
    dispatcher.on_payload(EventType::KEY_DOWN, |k: &KeyboardEvent| {
        println!("Key down: {}", key_name(k.keycode).unwrap_or_default());
    });

    // Left mouse button, full signature
    dispatcher
        .on_mouse_button_down(1, |ev: &Event, info: &DispatchInfo| {
            println!("Fire! ({:?} routed via {:?})", ev.kind(), info.coordinate());
        })
        .expect("mouse button discretizer is built in");

    // Everything else
    dispatcher.set_catch_all(|ev: &Event| println!("(unhandled) {:?}", ev.kind()));

    keyboard.key_down(KEY_SPACE, 0).unwrap();
    keyboard.key_down(KEY_W, 0).unwrap();
    keyboard.key_up(KEY_W, 0).unwrap();
    mouse.move_to(120, 80);
    mouse.button_down(1).unwrap();

    for event in queue.drain() {
        dispatcher.dispatch(&event);
    }
}
