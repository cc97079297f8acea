use mmevents::{
    can_store_inline, user_event_type, EventDispatcher, EventQueue, UserEventSource,
    UserEventType,
};

#[derive(Clone, Copy, Debug)]
struct PlayerMoved {
    x: f32,
    y: f32,
}
impl UserEventType for PlayerMoved {}

#[derive(Clone, Debug)]
struct ChatMessage {
    author: String,
    text: String,
}
impl UserEventType for ChatMessage {
    const TYPE_ID: Option<u32> = Some(2000);
}

fn main() {
    env_logger::init();

    println!(
        "PlayerMoved: type {:?}, inline = {}",
        user_event_type::<PlayerMoved>().unwrap(),
        can_store_inline::<PlayerMoved>()
    );
    println!(
        "ChatMessage: type {:?}, inline = {}",
        user_event_type::<ChatMessage>().unwrap(),
        can_store_inline::<ChatMessage>()
    );

    let source = UserEventSource::new();
    let mut queue = EventQueue::new();
    queue.register_source(&source);

    let mut dispatcher = EventDispatcher::new();
    dispatcher
        .on_user(|m: &PlayerMoved| println!("Player at ({}, {})", m.x, m.y))
        .unwrap();
    dispatcher
        .on_user(|c: &ChatMessage| println!("<{}> {}", c.author, c.text))
        .unwrap();

    source.emit(PlayerMoved { x: 3.0, y: 4.5 }).unwrap();
    source
        .emit(ChatMessage {
            author: "ana".into(),
            text: "gg".into(),
        })
        .unwrap();

    // Payloads can also be read straight off the event
    source.emit(PlayerMoved { x: -1.0, y: 0.0 }).unwrap();

    while let Some(event) = queue.get_next_event() {
        if let Ok(moved) = event.user::<PlayerMoved>() {
            println!("(peeked) storage {:?}, x = {}", event.user_storage(), moved.x);
        }
        dispatcher.dispatch(&event);
    }
}
