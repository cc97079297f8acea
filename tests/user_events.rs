//! User event types: id assignment, inline vs heap storage, payload lifetime.

use mmevents::user_event::AUTO_TYPE_ID_BASE;
use mmevents::{
    can_store_inline, user_event_type, Error, EventQueue, PayloadStorage, UserEventSource,
    UserEventType,
};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Vec2 {
    x: f32,
    y: f32,
}
impl UserEventType for Vec2 {}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FourWords([usize; 4]);
impl UserEventType for FourWords {}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FiveWords([usize; 5]);
impl UserEventType for FiveWords {}

#[derive(Clone, Debug, PartialEq)]
struct Chat {
    from: String,
    lines: Vec<String>,
}
impl UserEventType for Chat {}

#[derive(Clone, Copy, Debug, PartialEq)]
struct LevelLoaded(u32);
impl UserEventType for LevelLoaded {
    const TYPE_ID: Option<u32> = Some(3000);
}

static DESTROYED: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Debug, PartialEq)]
struct Owned(String);
impl Drop for Owned {
    fn drop(&mut self) {
        DESTROYED.fetch_add(1, Ordering::SeqCst);
    }
}
impl UserEventType for Owned {}

fn wired() -> (UserEventSource, EventQueue) {
    let src = UserEventSource::new();
    let mut q = EventQueue::new();
    q.register_source(&src);
    (src, q)
}

#[test]
fn auto_id_is_memoized_and_above_threshold() {
    let first = user_event_type::<Vec2>().unwrap();
    let second = user_event_type::<Vec2>().unwrap();
    assert_eq!(first, second);
    assert!(first.raw() >= AUTO_TYPE_ID_BASE);
    assert!(first.is_user());
}

#[test]
fn explicit_id_is_honoured() {
    assert_eq!(user_event_type::<LevelLoaded>().unwrap().raw(), 3000);
    let (src, mut q) = wired();
    src.emit(LevelLoaded(4)).unwrap();
    let ev = q.get_next_event().unwrap();
    assert_eq!(ev.kind().raw(), 3000);
    assert_eq!(*ev.user::<LevelLoaded>().unwrap(), LevelLoaded(4));
}

#[test]
fn small_copy_payload_is_inline() {
    assert!(can_store_inline::<Vec2>());
    assert!(can_store_inline::<FourWords>());
    assert!(!can_store_inline::<FiveWords>());

    let (src, mut q) = wired();
    src.emit(Vec2 { x: 1.5, y: -2.0 }).unwrap();
    src.emit(FourWords([1, 2, 3, usize::MAX])).unwrap();

    let a = q.get_next_event().unwrap();
    assert_eq!(a.user_storage(), Some(PayloadStorage::Inline));
    assert_eq!(a.into_user::<Vec2>().unwrap(), Vec2 { x: 1.5, y: -2.0 });
    let b = q.get_next_event().unwrap();
    assert_eq!(b.user_storage(), Some(PayloadStorage::Inline));
    assert_eq!(b.into_user::<FourWords>().unwrap(), FourWords([1, 2, 3, usize::MAX]));
}

#[test]
fn oversized_or_owning_payload_is_heap() {
    let (src, mut q) = wired();
    src.emit(FiveWords([9; 5])).unwrap();
    let chat = Chat {
        from: "ana".into(),
        lines: vec!["hi".into(), "gg".into()],
    };
    src.emit(chat.clone()).unwrap();

    let a = q.get_next_event().unwrap();
    assert_eq!(a.user_storage(), Some(PayloadStorage::Heap));
    assert_eq!(a.into_user::<FiveWords>().unwrap(), FiveWords([9; 5]));
    let b = q.get_next_event().unwrap();
    assert_eq!(b.user_storage(), Some(PayloadStorage::Heap));
    assert_eq!(b.into_user::<Chat>().unwrap(), chat);
}

#[test]
fn unconsumed_heap_payload_is_destroyed_exactly_once() {
    let before = DESTROYED.load(Ordering::SeqCst);
    {
        let src = UserEventSource::new();
        let mut q1 = EventQueue::new();
        let mut q2 = EventQueue::new();
        q1.register_source(&src);
        q2.register_source(&src);
        assert_eq!(src.emit(Owned("bye".into())).unwrap(), 2);

        // Both queues hold a copy of the same record; flushing one is not enough.
        q1.flush();
        assert_eq!(DESTROYED.load(Ordering::SeqCst), before);
        q2.flush();
        assert_eq!(DESTROYED.load(Ordering::SeqCst), before + 1);
    }
    assert_eq!(DESTROYED.load(Ordering::SeqCst), before + 1);
}

#[test]
fn wrong_type_is_rejected_before_reading_bytes() {
    let (src, mut q) = wired();
    src.emit(Vec2 { x: 0.0, y: 0.0 }).unwrap();
    let ev = q.get_next_event().unwrap();
    assert!(matches!(
        ev.user::<FourWords>(),
        Err(Error::EventTypeMismatch { .. })
    ));
    assert!(ev.user::<Vec2>().is_ok());
}
