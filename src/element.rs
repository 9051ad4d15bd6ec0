use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// Native input flavours understood by the value transformer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ElementKind {
    Text,
    Password,
    Textarea,
    Select,
    Number,
    Checkbox,
    Switch,
    MultiSelect,
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementKind::Text => "text",
            ElementKind::Password => "password",
            ElementKind::Textarea => "textarea",
            ElementKind::Select => "select",
            ElementKind::Number => "number",
            ElementKind::Checkbox => "checkbox",
            ElementKind::Switch => "switch",
            ElementKind::MultiSelect => "multiselect",
        };
        f.write_str(name)
    }
}

/// Raw element state, before any coercion to a typed value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NativeState {
    pub value: String,
    pub checked: bool,
    pub selected: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeOrigin {
    /// The user edited the element.
    User,
    /// The form wrote the element through `set_value`.
    Manual,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChangeEvent {
    pub origin: ChangeOrigin,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ListenerId(pub u64);

pub type ChangeListener = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Handle to a UI input as seen by a form.
///
/// The UI layer owns implementors; forms only keep weak references and look
/// them up by key, so every read must tolerate `is_mounted() == false`.
pub trait FormElement: Send + Sync {
    fn kind(&self) -> ElementKind;
    fn is_mounted(&self) -> bool;
    fn read_native(&self) -> NativeState;
    fn write_native(&self, state: NativeState);
    fn add_listener(&self, listener: ChangeListener) -> ListenerId;
    fn remove_listener(&self, id: ListenerId) -> bool;
    fn listener_count(&self) -> usize;
    /// Notifies every listener. Must not hold internal locks while calling out.
    fn dispatch(&self, event: ChangeEvent);
}

pub type ElementRef = Arc<dyn FormElement>;

/// In-memory input element, used by headless hosts and tests.
pub struct InputElement {
    kind: ElementKind,
    mounted: AtomicBool,
    native: RwLock<NativeState>,
    listeners: Mutex<BTreeMap<ListenerId, ChangeListener>>,
    next_listener: AtomicU64,
}

impl InputElement {
    pub fn new(kind: ElementKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            mounted: AtomicBool::new(true),
            native: RwLock::new(NativeState::default()),
            listeners: Mutex::new(BTreeMap::new()),
            next_listener: AtomicU64::new(1),
        })
    }

    pub fn text() -> Arc<Self> {
        Self::new(ElementKind::Text)
    }

    pub fn checkbox() -> Arc<Self> {
        Self::new(ElementKind::Checkbox)
    }

    pub fn number() -> Arc<Self> {
        Self::new(ElementKind::Number)
    }

    pub fn multiselect() -> Arc<Self> {
        Self::new(ElementKind::MultiSelect)
    }

    /// Replaces the text content as if typed, then notifies with `ChangeOrigin::User`.
    pub fn input_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.edit(|state| state.value = text);
    }

    pub fn set_checked(&self, checked: bool) {
        self.edit(|state| state.checked = checked);
    }

    pub fn click(&self) {
        self.edit(|state| state.checked = !state.checked);
    }

    pub fn choose<I, S>(&self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selected = options.into_iter().map(Into::into).collect::<Vec<_>>();
        self.edit(|state| state.selected = selected);
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub fn mount(&self) {
        self.mounted.store(true, Ordering::SeqCst);
    }

    fn edit(&self, f: impl FnOnce(&mut NativeState)) {
        {
            let mut native = match self.native.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            f(&mut native);
        }
        self.dispatch(ChangeEvent {
            origin: ChangeOrigin::User,
        });
    }

    fn listeners(&self) -> MutexGuard<'_, BTreeMap<ListenerId, ChangeListener>> {
        match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl FormElement for InputElement {
    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn read_native(&self) -> NativeState {
        match self.native.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write_native(&self, state: NativeState) {
        let mut native = match self.native.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *native = state;
    }

    fn add_listener(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners().insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners().remove(&id).is_some()
    }

    fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    fn dispatch(&self, event: ChangeEvent) {
        if !self.is_mounted() {
            return;
        }
        let listeners = self.listeners().values().cloned().collect::<Vec<_>>();
        for listener in listeners {
            listener(event);
        }
    }
}
