//! Application-defined event types.
//!
//! Any `Clone + Send + Sync + 'static` type can travel through a queue once it
//! implements [`UserEventType`]. The trait carries one optional item, an explicit
//! type tag; types that leave it out get a tag assigned on first use.
//!
//! ## Type tags
//! - Explicit tags must lie in `USER_EVENT_MIN..AUTO_TYPE_ID_BASE`.
//! - Automatic tags start at [`AUTO_TYPE_ID_BASE`] and are handed out once per
//!   Rust type. Asking again returns the memoized tag.
//! - The registry is process-wide; tags are stable within a run only.
//!
//! ## Storage
//! Small payloads with no drop glue ([`can_store_inline`]) are written straight
//! into a four-word slot inside the event record, and nothing has to run when the
//! event is discarded. Everything else is boxed and carries a type-specific destroy
//! function, which runs exactly once when the last copy of the event goes away
//! without the payload having been taken out.

use crate::error::{Error, Result};
use crate::event::{Event, EventType, Payload};
use crate::source::lock;
use std::any::TypeId;
use std::collections::HashMap;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, OnceLock};

/// Lowest tag available to user event types.
pub const USER_EVENT_MIN: u32 = 1024;

/// First automatically assigned tag. Explicit tags must stay below it.
pub const AUTO_TYPE_ID_BASE: u32 = 65536;

/// Number of machine words available for inline payloads.
pub const INLINE_WORDS: usize = 4;

/// A type that can be emitted as a user event.
///
/// ```
/// use mmevents::UserEventType;
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// struct Scored { player: u8, points: u32 }
///
/// impl UserEventType for Scored {
///     const TYPE_ID: Option<u32> = Some(2000);
/// }
/// ```
pub trait UserEventType: Clone + Send + Sync + 'static {
    /// Explicit tag, or `None` to have one assigned.
    const TYPE_ID: Option<u32> = None;
}

/// `true` if `T` is stored directly inside the event record.
pub const fn can_store_inline<T>() -> bool {
    !std::mem::needs_drop::<T>()
        && std::mem::size_of::<T>() <= INLINE_WORDS * std::mem::size_of::<usize>()
        && std::mem::align_of::<T>() <= std::mem::align_of::<usize>()
}

// ---- type tag registry ----

#[derive(Default)]
struct Registry {
    by_type: HashMap<TypeId, u32>,
    owners: HashMap<u32, &'static str>,
    next_auto: u32,
}

fn registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Mutex::new(Registry {
            next_auto: AUTO_TYPE_ID_BASE,
            ..Default::default()
        })
    })
}

/// Returns the tag of user event type `T`, assigning one on first use.
pub fn user_event_type<T: UserEventType>() -> Result<EventType> {
    let mut reg = lock(registry());
    let key = TypeId::of::<T>();
    if let Some(&id) = reg.by_type.get(&key) {
        return Ok(EventType(id));
    }

    let name = std::any::type_name::<T>();
    let id = match T::TYPE_ID {
        Some(id) => {
            if !(USER_EVENT_MIN..AUTO_TYPE_ID_BASE).contains(&id) {
                return Err(Error::ReservedEventType {
                    id,
                    min: USER_EVENT_MIN,
                    max: AUTO_TYPE_ID_BASE,
                });
            }
            if let Some(&owner) = reg.owners.get(&id) {
                return Err(Error::TypeIdConflict {
                    id,
                    owner,
                    requested: name,
                });
            }
            id
        }
        None => {
            let id = reg.next_auto;
            reg.next_auto = id
                .checked_add(1)
                .ok_or(Error::OutOfRange {
                    what: "automatic event type id",
                    index: id as usize,
                    len: u32::MAX as usize,
                })?;
            id
        }
    };

    reg.by_type.insert(key, id);
    reg.owners.insert(id, name);
    log::debug!("Assigned event type {id} to `{name}`");
    Ok(EventType(id))
}

// ---- payload storage ----

type InlineWords = [MaybeUninit<usize>; INLINE_WORDS];

/// Where a user payload lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadStorage {
    /// Inside the event record; no destroy function attached.
    Inline,
    /// Boxed, with a destroy function attached.
    Heap,
}

struct UserVTable {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    clone_inline: unsafe fn(&InlineWords) -> InlineWords,
    destroy: unsafe fn(NonNull<()>),
}

struct VTableFor<T>(std::marker::PhantomData<T>);

impl<T: UserEventType> VTableFor<T> {
    const VTABLE: &'static UserVTable = &UserVTable {
        type_id: TypeId::of::<T>,
        type_name: std::any::type_name::<T>,
        clone_inline: clone_inline::<T>,
        destroy: destroy::<T>,
    };
}

/// # Safety
/// `words` must hold a live `T` written by [`UserPayload::new`].
unsafe fn clone_inline<T: UserEventType>(words: &InlineWords) -> InlineWords {
    let value = &*words.as_ptr().cast::<T>();
    write_inline(value.clone())
}

/// # Safety
/// `ptr` must come from `Box::<T>::leak` and not be used afterwards.
unsafe fn destroy<T: UserEventType>(ptr: NonNull<()>) {
    drop(Box::from_raw(ptr.cast::<T>().as_ptr()));
}

fn write_inline<T>(value: T) -> InlineWords {
    debug_assert!(can_store_inline::<T>());
    let mut words: InlineWords = [MaybeUninit::uninit(); INLINE_WORDS];
    // SAFETY: the slot is word aligned and large enough for `T` (checked by
    // `can_store_inline`), and `T` has no drop glue so it may later be
    // discarded by forgetting the words.
    unsafe { words.as_mut_ptr().cast::<T>().write(value) };
    words
}

/// Boxed payload plus the function that releases it.
struct HeapSlot {
    ptr: NonNull<()>,
    destroy: unsafe fn(NonNull<()>),
}

impl Drop for HeapSlot {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`destroy` were paired by `UserPayload::new`, and slots
        // whose value was moved out are never dropped (see `into_inner`).
        unsafe { (self.destroy)(self.ptr) }
    }
}

// SAFETY: a `HeapSlot` only ever owns a `T: Send + Sync`.
unsafe impl Send for HeapSlot {}
unsafe impl Sync for HeapSlot {}

enum Repr {
    Inline(InlineWords),
    Heap(Arc<HeapSlot>),
}

/// Type-erased user event payload.
pub struct UserPayload {
    vtable: &'static UserVTable,
    repr: Repr,
}

impl UserPayload {
    pub fn new<T: UserEventType>(value: T) -> Self {
        let vtable = VTableFor::<T>::VTABLE;
        let repr = if can_store_inline::<T>() {
            Repr::Inline(write_inline(value))
        } else {
            let ptr = NonNull::from(Box::leak(Box::new(value))).cast::<()>();
            Repr::Heap(Arc::new(HeapSlot {
                ptr,
                destroy: vtable.destroy,
            }))
        };
        Self { vtable, repr }
    }

    pub fn storage(&self) -> PayloadStorage {
        match self.repr {
            Repr::Inline(_) => PayloadStorage::Inline,
            Repr::Heap(_) => PayloadStorage::Heap,
        }
    }

    /// Name of the Rust type held.
    pub fn type_name(&self) -> &'static str {
        (self.vtable.type_name)()
    }

    pub fn is<T: UserEventType>(&self) -> bool {
        (self.vtable.type_id)() == TypeId::of::<T>()
    }

    /// Borrow the payload as `T`. `None` if it holds another type.
    pub fn get<T: UserEventType>(&self) -> Option<&T> {
        if !self.is::<T>() {
            return None;
        }
        debug_assert_eq!(
            self.storage() == PayloadStorage::Inline,
            can_store_inline::<T>()
        );
        // SAFETY: the type check above guarantees the stored value is a `T`.
        unsafe {
            Some(match &self.repr {
                Repr::Inline(words) => &*words.as_ptr().cast::<T>(),
                Repr::Heap(slot) => &*slot.ptr.cast::<T>().as_ptr(),
            })
        }
    }

    /// Take the payload out as `T`.
    ///
    /// A heap payload held by this copy alone is moved out and its destroy
    /// function is not run; a shared one is cloned.
    pub fn into_inner<T: UserEventType>(self) -> std::result::Result<T, Self> {
        if !self.is::<T>() {
            return Err(self);
        }
        match self.repr {
            // SAFETY: type checked above; `T` has no drop glue, so the words can
            // simply go out of scope after the read.
            Repr::Inline(words) => Ok(unsafe { words.as_ptr().cast::<T>().read() }),
            Repr::Heap(slot) => match Arc::try_unwrap(slot) {
                Ok(slot) => {
                    let slot = ManuallyDrop::new(slot);
                    // SAFETY: sole owner; `ManuallyDrop` keeps the destroy
                    // function from running on the moved-out box.
                    Ok(*unsafe { Box::from_raw(slot.ptr.cast::<T>().as_ptr()) })
                }
                // SAFETY: type checked above.
                Err(shared) => Ok(unsafe { (*shared.ptr.cast::<T>().as_ptr()).clone() }),
            },
        }
    }
}

impl Clone for UserPayload {
    fn clone(&self) -> Self {
        let repr = match &self.repr {
            // SAFETY: inline words always hold a value of the vtable's type.
            Repr::Inline(words) => Repr::Inline(unsafe { (self.vtable.clone_inline)(words) }),
            Repr::Heap(slot) => Repr::Heap(Arc::clone(slot)),
        };
        Self {
            vtable: self.vtable,
            repr,
        }
    }
}

impl std::fmt::Debug for UserPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPayload")
            .field("type", &self.type_name())
            .field("storage", &self.storage())
            .finish()
    }
}

impl Event {
    /// Build an unattributed user event carrying `value`.
    pub fn user_event<T: UserEventType>(value: T) -> Result<Event> {
        let kind = user_event_type::<T>()?;
        Ok(Event::new(kind, Payload::User(UserPayload::new(value))))
    }

    pub fn user_payload(&self) -> Option<&UserPayload> {
        match self.payload() {
            Payload::User(p) => Some(p),
            _ => None,
        }
    }

    /// Storage used by the user payload, `None` for non-user events.
    pub fn user_storage(&self) -> Option<PayloadStorage> {
        self.user_payload().map(UserPayload::storage)
    }

    /// Borrow the user payload as `T` after checking the type tag.
    pub fn user<T: UserEventType>(&self) -> Result<&T> {
        let expected = self.expect_user_type::<T>()?;
        let found = self.kind();
        self.user_payload()
            .ok_or(Error::NotUserEvent(found))?
            .get::<T>()
            .ok_or(Error::EventTypeMismatch { expected, found })
    }

    /// Consume the event and take its user payload as `T`.
    pub fn into_user<T: UserEventType>(self) -> Result<T> {
        let expected = self.expect_user_type::<T>()?;
        let found = self.kind();
        match self.into_payload() {
            Payload::User(p) => p
                .into_inner::<T>()
                .map_err(|_| Error::EventTypeMismatch { expected, found }),
            _ => Err(Error::NotUserEvent(found)),
        }
    }

    fn expect_user_type<T: UserEventType>(&self) -> Result<EventType> {
        let expected = user_event_type::<T>()?;
        if self.kind() != expected {
            return Err(Error::EventTypeMismatch {
                expected,
                found: self.kind(),
            });
        }
        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Small {
        a: u64,
        b: u32,
    }
    impl UserEventType for Small {}

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Wide([usize; 5]);
    impl UserEventType for Wide {}

    #[derive(Clone, Debug, PartialEq)]
    struct Named(String);
    impl UserEventType for Named {}

    #[derive(Clone, Copy)]
    struct Explicit;
    impl UserEventType for Explicit {
        const TYPE_ID: Option<u32> = Some(4242);
    }

    #[derive(Clone, Copy)]
    struct ExplicitTwin;
    impl UserEventType for ExplicitTwin {
        const TYPE_ID: Option<u32> = Some(4242);
    }

    #[derive(Clone, Copy)]
    struct LowId;
    impl UserEventType for LowId {
        const TYPE_ID: Option<u32> = Some(12);
    }

    #[derive(Clone, Copy)]
    struct HighId;
    impl UserEventType for HighId {
        const TYPE_ID: Option<u32> = Some(AUTO_TYPE_ID_BASE);
    }

    static DROPS: AtomicUsize = AtomicUsize::new(0);

    #[derive(Clone)]
    struct Tracked(u32);
    impl Drop for Tracked {
        fn drop(&mut self) {
            DROPS.fetch_add(1, Ordering::SeqCst);
        }
    }
    impl UserEventType for Tracked {}

    #[test]
    fn inline_policy() {
        assert!(can_store_inline::<Small>());
        assert!(can_store_inline::<()>());
        assert!(can_store_inline::<[usize; 4]>());
        assert!(!can_store_inline::<Wide>());
        assert!(!can_store_inline::<Named>());
    }

    #[test]
    fn auto_ids_are_memoized() {
        let a = user_event_type::<Small>().unwrap();
        let b = user_event_type::<Small>().unwrap();
        assert_eq!(a, b);
        assert!(a.raw() >= AUTO_TYPE_ID_BASE);
        assert_ne!(a, user_event_type::<Wide>().unwrap());
    }

    #[test]
    fn explicit_ids_are_honoured_and_checked() {
        assert_eq!(user_event_type::<Explicit>().unwrap(), EventType(4242));
        assert!(matches!(
            user_event_type::<ExplicitTwin>(),
            Err(Error::TypeIdConflict { id: 4242, .. })
        ));
        assert!(matches!(
            user_event_type::<LowId>(),
            Err(Error::ReservedEventType { id: 12, .. })
        ));
        assert!(matches!(
            user_event_type::<HighId>(),
            Err(Error::ReservedEventType { .. })
        ));
    }

    #[test]
    fn inline_payload_round_trip() {
        let ev = Event::user_event(Small { a: 7, b: 9 }).unwrap();
        assert_eq!(ev.user_storage(), Some(PayloadStorage::Inline));
        let copy = ev.clone();
        assert_eq!(ev.user::<Small>().unwrap(), &Small { a: 7, b: 9 });
        assert_eq!(copy.into_user::<Small>().unwrap(), Small { a: 7, b: 9 });
    }

    #[test]
    fn heap_payload_round_trip() {
        let ev = Event::user_event(Named("hello".into())).unwrap();
        assert_eq!(ev.user_storage(), Some(PayloadStorage::Heap));
        assert_eq!(ev.user::<Named>().unwrap().0, "hello");
        let copy = ev.clone();
        assert_eq!(copy.into_user::<Named>().unwrap().0, "hello");
        assert_eq!(ev.into_user::<Named>().unwrap().0, "hello");
    }

    #[test]
    fn destroy_runs_once_for_all_copies() {
        let before = DROPS.load(Ordering::SeqCst);
        let ev = Event::user_event(Tracked(1)).unwrap();
        // `user_event` consumed the argument by move, no drop yet.
        assert_eq!(DROPS.load(Ordering::SeqCst), before);
        let copies: Vec<Event> = (0..3).map(|_| ev.clone()).collect();
        drop(ev);
        drop(copies);
        assert_eq!(DROPS.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn mismatched_retrieval_is_an_error() {
        let ev = Event::user_event(Small { a: 1, b: 2 }).unwrap();
        assert!(matches!(
            ev.user::<Named>(),
            Err(Error::EventTypeMismatch { .. })
        ));
        let key = Event::new(EventType::KEY_DOWN, Payload::None);
        assert!(matches!(
            key.user::<Small>(),
            Err(Error::EventTypeMismatch { .. })
        ));
    }

    #[test]
    fn forged_tag_is_caught_by_payload_type_check() {
        let tag = user_event_type::<Named>().unwrap();
        let forged = Event::new(tag, Payload::User(UserPayload::new(Small { a: 0, b: 0 })));
        assert!(matches!(
            forged.user::<Named>(),
            Err(Error::EventTypeMismatch { .. })
        ));
    }
}
