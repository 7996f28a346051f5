//! An in-process reference runtime.
//!
//! [`SimEnv`] implements [`ForeignEnv`] on top of a small managed heap that behaves like a JVM as
//! far as arrays are concerned: it has classes with a superclass chain, strings, plain
//! instances, primitive arrays and object arrays, separate local and global reference tables,
//! and Java-style exceptions that are left pending rather than returned.
//!
//! Primitive arrays can be pinned directly or by copy, see [`PinPolicy`]. Faults can be injected
//! to make the next call of an operation leave an exception pending, see
//! [`SimEnv::inject_fault`]. [`SimEnv::stats`] reports the number of live references and
//! outstanding pins, which makes it possible to check that nothing leaks.
//!
//! ```
//! use jarray::{env::sim::{PinPolicy, SimEnvBuilder}, prelude::*};
//!
//! let sim = SimEnvBuilder::new().pin_policy(PinPolicy::Copy).build();
//! let env: EnvRef = sim.clone();
//!
//! let array = JArray::new(&env, 3, PrimitiveKind::Int.into(), None).unwrap();
//! array.set(0, &HostValue::Int(7)).unwrap();
//! assert_eq!(array.get(0).unwrap(), HostValue::Int(7));
//!
//! drop(array);
//! assert_eq!(sim.stats().live_global_refs, 0);
//! ```

use std::{cell::RefCell, ffi::c_void, ptr::NonNull, rc::Rc};

use fnv::FnvHashMap;
use tracing::{trace, warn};

use super::{ForeignEnv, ObjectRef, RawElements, ReleaseMode};
use crate::{
    data::{component::PrimitiveKind, host::HostValue, layout::Primitive},
    dispatch_primitive,
};

const OBJECT_CLASS: &str = "java.lang.Object";
const STRING_CLASS: &str = "java.lang.String";
const CLASS_CLASS: &str = "java.lang.Class";
const THROWABLE_CLASS: &str = "java.lang.Throwable";
const RUNTIME_EXCEPTION_CLASS: &str = "java.lang.RuntimeException";
const ERROR_CLASS: &str = "java.lang.Error";

pub const ARRAY_INDEX_OUT_OF_BOUNDS: &str = "java.lang.ArrayIndexOutOfBoundsException";
pub const ARRAY_STORE: &str = "java.lang.ArrayStoreException";
pub const NEGATIVE_ARRAY_SIZE: &str = "java.lang.NegativeArraySizeException";
pub const NULL_POINTER: &str = "java.lang.NullPointerException";
pub const OUT_OF_MEMORY: &str = "java.lang.OutOfMemoryError";
pub const ILLEGAL_ARGUMENT: &str = "java.lang.IllegalArgumentException";
pub const NO_CLASS_DEF_FOUND: &str = "java.lang.NoClassDefFoundError";

// Largest primitive array the heap will allocate, in bytes.
const MAX_ARRAY_BYTES: usize = 1 << 28;

/// How primitive arrays are pinned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PinPolicy {
    /// Hand out a pointer to the array's backing storage.
    #[default]
    Direct,
    /// Hand out a private copy that's only written back on commit.
    Copy,
}

/// Counters of a [`SimEnv`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Local references that haven't been deleted.
    pub live_local_refs: usize,
    /// Global references that haven't been deleted.
    pub live_global_refs: usize,
    /// Private copies that haven't been freed. Direct views aren't counted.
    pub outstanding_pins: usize,
    /// Number of calls to `release_primitive_array_elements`.
    pub release_calls: usize,
    /// Number of those calls that committed the buffer.
    pub commits: usize,
}

/// Build a [`SimEnv`].
///
/// By default primitive arrays are pinned directly, a warning is logged when more than 16 local
/// references are live, and only the built-in classes exist.
#[derive(Debug, Clone)]
pub struct SimEnvBuilder {
    pin_policy: PinPolicy,
    local_capacity: usize,
    classes: Vec<(String, Option<String>)>,
}

impl SimEnvBuilder {
    pub fn new() -> Self {
        SimEnvBuilder {
            pin_policy: PinPolicy::Direct,
            local_capacity: 16,
            classes: Vec::new(),
        }
    }

    /// Set how primitive arrays are pinned.
    pub fn pin_policy(mut self, policy: PinPolicy) -> Self {
        self.pin_policy = policy;
        self
    }

    /// Set the number of live local references above which a warning is logged.
    pub fn local_capacity(mut self, capacity: usize) -> Self {
        self.local_capacity = capacity;
        self
    }

    /// Register a user class. If `superclass` is `None` the class extends `java.lang.Object`.
    pub fn class<S: Into<String>>(mut self, name: S, superclass: Option<&str>) -> Self {
        self.classes
            .push((name.into(), superclass.map(ToString::to_string)));
        self
    }

    /// Create the runtime.
    pub fn build(self) -> Rc<SimEnv> {
        let env = SimEnv {
            pin_policy: self.pin_policy,
            local_capacity: self.local_capacity,
            state: RefCell::new(SimState::new()),
        };

        for (name, superclass) in self.classes.iter() {
            env.define_class(name, superclass.as_deref());
        }

        Rc::new(env)
    }
}

impl Default for SimEnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The reference runtime.
pub struct SimEnv {
    pin_policy: PinPolicy,
    local_capacity: usize,
    state: RefCell<SimState>,
}

type ObjId = usize;

enum HeapObject {
    Class(ClassData),
    Instance {
        class: ObjId,
    },
    Str {
        class: ObjId,
        text: String,
    },
    Throwable {
        class: ObjId,
        message: String,
    },
    PrimitiveArray {
        class: ObjId,
        kind: PrimitiveKind,
        len: usize,
        // Words keep the storage aligned for every element type.
        data: Box<[u64]>,
    },
    ObjectArray {
        class: ObjId,
        elems: Vec<Option<ObjId>>,
    },
}

struct ClassData {
    name: String,
    superclass: Option<ObjId>,
    component: Option<ObjId>,
    primitive: Option<PrimitiveKind>,
    is_void: bool,
}

#[derive(Default)]
struct RefTable {
    slots: Vec<Option<ObjId>>,
    free: Vec<usize>,
    live: usize,
}

impl RefTable {
    fn insert(&mut self, id: ObjId) -> usize {
        self.live += 1;
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(id);
                slot
            }
            None => {
                self.slots.push(Some(id));
                self.slots.len() - 1
            }
        }
    }

    fn get(&self, slot: usize) -> Option<ObjId> {
        self.slots.get(slot).copied().flatten()
    }

    fn remove(&mut self, slot: usize) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry @ Some(_)) => {
                *entry = None;
                self.free.push(slot);
                self.live -= 1;
                true
            }
            _ => false,
        }
    }
}

// A private copy handed out by `get_primitive_array_elements`.
struct Pin {
    ptr: NonNull<c_void>,
    array: ObjId,
    copy: Box<[u64]>,
}

struct Fault {
    // Number of calls that succeed before the fault fires.
    skip: usize,
    class: String,
    message: String,
}

struct SimState {
    heap: Vec<HeapObject>,
    classes: FnvHashMap<String, ObjId>,
    locals: RefTable,
    globals: RefTable,
    pending: Option<ObjId>,
    faults: FnvHashMap<String, Fault>,
    pins: Vec<Pin>,
    release_calls: usize,
    commits: usize,
    warned_capacity: bool,
}

impl SimState {
    fn new() -> Self {
        let mut state = SimState {
            heap: Vec::new(),
            classes: FnvHashMap::default(),
            locals: RefTable::default(),
            globals: RefTable::default(),
            pending: None,
            faults: FnvHashMap::default(),
            pins: Vec::new(),
            release_calls: 0,
            commits: 0,
            warned_capacity: false,
        };

        let object = state.add_class(OBJECT_CLASS, None);
        state.add_class(STRING_CLASS, Some(object));
        state.add_class(CLASS_CLASS, Some(object));
        let throwable = state.add_class(THROWABLE_CLASS, Some(object));
        let exception = state.add_class("java.lang.Exception", Some(throwable));
        state.add_class(RUNTIME_EXCEPTION_CLASS, Some(exception));
        state.add_class(ERROR_CLASS, Some(throwable));

        for kind in PrimitiveKind::ALL {
            let id = state.add_class(kind.name(), None);
            if let HeapObject::Class(data) = &mut state.heap[id] {
                data.primitive = Some(kind);
            }
        }

        let void = state.add_class("void", None);
        if let HeapObject::Class(data) = &mut state.heap[void] {
            data.is_void = true;
        }

        state
    }

    fn alloc(&mut self, obj: HeapObject) -> ObjId {
        self.heap.push(obj);
        self.heap.len() - 1
    }

    fn add_class(&mut self, name: &str, superclass: Option<ObjId>) -> ObjId {
        let id = self.alloc(HeapObject::Class(ClassData {
            name: name.into(),
            superclass,
            component: None,
            primitive: None,
            is_void: false,
        }));
        self.classes.insert(name.into(), id);
        id
    }

    fn class_data(&self, id: ObjId) -> Option<&ClassData> {
        match &self.heap[id] {
            HeapObject::Class(data) => Some(data),
            _ => None,
        }
    }

    fn class_of(&self, id: ObjId) -> ObjId {
        match &self.heap[id] {
            HeapObject::Class(_) => self.classes[CLASS_CLASS],
            HeapObject::Instance { class }
            | HeapObject::Str { class, .. }
            | HeapObject::Throwable { class, .. }
            | HeapObject::PrimitiveArray { class, .. }
            | HeapObject::ObjectArray { class, .. } => *class,
        }
    }

    fn class_name(&self, class: ObjId) -> &str {
        self.class_data(class).map_or("", |data| data.name.as_str())
    }

    // Returns the array class whose component class is `component`, creating it if necessary.
    fn array_class(&mut self, component: ObjId) -> ObjId {
        let name = match self.class_data(component) {
            Some(ClassData {
                primitive: Some(kind),
                ..
            }) => format!("[{}", kind.descriptor()),
            Some(data) if data.component.is_some() => format!("[{}", data.name),
            Some(data) => format!("[L{};", data.name),
            None => format!("[L{OBJECT_CLASS};"),
        };

        if let Some(id) = self.classes.get(&name) {
            return *id;
        }

        let object = self.classes[OBJECT_CLASS];
        let id = self.add_class(&name, Some(object));
        if let HeapObject::Class(data) = &mut self.heap[id] {
            data.component = Some(component);
        }
        id
    }

    // Finds a class by name. Array classes are created on demand.
    fn find_class(&mut self, name: &str) -> Option<ObjId> {
        let name = name.replace('/', ".");
        if let Some(id) = self.classes.get(&name) {
            return Some(*id);
        }

        let component = name.strip_prefix('[')?;
        let component = match component.chars().next()? {
            'L' => self.find_class(component.strip_prefix('L')?.strip_suffix(';')?)?,
            '[' => self.find_class(component)?,
            c if component.len() == 1 => {
                let kind = PrimitiveKind::from_descriptor(c)?;
                self.classes[kind.name()]
            }
            _ => return None,
        };

        Some(self.array_class(component))
    }

    fn is_assignable(&self, sub: ObjId, sup: ObjId) -> bool {
        if sub == sup {
            return true;
        }

        let (Some(sub_data), Some(sup_data)) = (self.class_data(sub), self.class_data(sup)) else {
            return false;
        };

        if sub_data.primitive.is_some() || sub_data.is_void {
            return false;
        }

        if sup == self.classes[OBJECT_CLASS] {
            return true;
        }

        if let (Some(sub_comp), Some(sup_comp)) = (sub_data.component, sup_data.component) {
            let sub_primitive = self.class_data(sub_comp).and_then(|d| d.primitive);
            let sup_primitive = self.class_data(sup_comp).and_then(|d| d.primitive);
            return match (sub_primitive, sup_primitive) {
                (None, None) => self.is_assignable(sub_comp, sup_comp),
                _ => sub_comp == sup_comp,
            };
        }

        let mut current = sub_data.superclass;
        while let Some(class) = current {
            if class == sup {
                return true;
            }
            current = self.class_data(class).and_then(|d| d.superclass);
        }

        false
    }

    fn throw(&mut self, class_name: &str, message: impl Into<String>) {
        let class = match self.classes.get(class_name) {
            Some(class) => *class,
            None => {
                let parent = if class_name.ends_with("Error") {
                    self.classes[ERROR_CLASS]
                } else {
                    self.classes[RUNTIME_EXCEPTION_CLASS]
                };
                self.add_class(class_name, Some(parent))
            }
        };

        let message = message.into();
        trace!(class = class_name, message = message.as_str(), "throwing");
        let exc = self.alloc(HeapObject::Throwable { class, message });
        self.pending = Some(exc);
    }

    fn new_local(&mut self, id: ObjId, capacity: usize) -> ObjectRef {
        let slot = self.locals.insert(id);

        if self.locals.live > capacity {
            if !self.warned_capacity {
                warn!(live = self.locals.live, capacity, "local reference capacity exceeded");
                self.warned_capacity = true;
            }
        } else {
            self.warned_capacity = false;
        }

        encode(slot, false)
    }

    fn new_global(&mut self, id: ObjId) -> ObjectRef {
        encode(self.globals.insert(id), true)
    }

    fn deref(&self, obj: ObjectRef) -> Option<ObjId> {
        let (slot, global) = decode(obj);
        if global {
            self.globals.get(slot)
        } else {
            self.locals.get(slot)
        }
    }

    // Like `deref`, but a deleted reference leaves an exception pending.
    fn resolve(&mut self, obj: ObjectRef) -> Option<ObjId> {
        let id = self.deref(obj);
        if id.is_none() {
            self.throw(NULL_POINTER, format!("invalid reference {obj:?}"));
        }
        id
    }

    fn to_text(&self, id: ObjId) -> String {
        match &self.heap[id] {
            HeapObject::Class(data) => match (data.primitive, data.is_void) {
                (None, false) => format!("class {}", data.name),
                _ => data.name.clone(),
            },
            HeapObject::Str { text, .. } => text.clone(),
            HeapObject::Throwable { class, message } if message.is_empty() => {
                self.class_name(*class).to_string()
            }
            HeapObject::Throwable { class, message } => {
                format!("{}: {}", self.class_name(*class), message)
            }
            obj => {
                let class = match obj {
                    HeapObject::Instance { class }
                    | HeapObject::PrimitiveArray { class, .. }
                    | HeapObject::ObjectArray { class, .. } => *class,
                    _ => self.class_of(id),
                };
                format!("{}@{:x}", self.class_name(class), id)
            }
        }
    }

    fn new_primitive_array(&mut self, kind: PrimitiveKind, len: i32) -> Option<ObjId> {
        if len < 0 {
            self.throw(NEGATIVE_ARRAY_SIZE, len.to_string());
            return None;
        }

        let len = len as usize;
        let bytes = len * kind.size();
        if bytes > MAX_ARRAY_BYTES {
            self.throw(OUT_OF_MEMORY, "Requested array size exceeds VM limit");
            return None;
        }

        let component = self.classes[kind.name()];
        let class = self.array_class(component);
        let words = (bytes + 7) / 8;
        Some(self.alloc(HeapObject::PrimitiveArray {
            class,
            kind,
            len,
            data: vec![0u64; words].into_boxed_slice(),
        }))
    }

    fn check_store(&mut self, array_class: ObjId, value: Option<ObjId>) -> bool {
        let Some(value) = value else {
            return true;
        };

        let Some(component) = self.class_data(array_class).and_then(|d| d.component) else {
            return false;
        };

        let value_class = self.class_of(value);
        if self.is_assignable(value_class, component) {
            return true;
        }

        let name = self.class_name(value_class).to_string();
        self.throw(ARRAY_STORE, name);
        false
    }

    fn object_array(&mut self, array: ObjId) -> Option<(ObjId, &mut Vec<Option<ObjId>>)> {
        match &mut self.heap[array] {
            HeapObject::ObjectArray { class, elems } => Some((*class, elems)),
            _ => None,
        }
    }
}

fn encode(slot: usize, global: bool) -> ObjectRef {
    let raw = ((slot + 1) << 1 | global as usize) as *mut c_void;
    match ObjectRef::from_raw(raw) {
        Some(obj) => obj,
        None => unreachable!("handles are never zero"),
    }
}

fn decode(obj: ObjectRef) -> (usize, bool) {
    let raw = obj.as_raw() as usize;
    ((raw >> 1).wrapping_sub(1), raw & 1 == 1)
}

impl SimEnv {
    /// Create a runtime with the default configuration.
    pub fn new() -> Rc<Self> {
        SimEnvBuilder::new().build()
    }

    /// Returns the pin policy of this runtime.
    pub fn pin_policy(&self) -> PinPolicy {
        self.pin_policy
    }

    /// Returns the current counters.
    pub fn stats(&self) -> SimStats {
        let state = self.state.borrow();
        SimStats {
            live_local_refs: state.locals.live,
            live_global_refs: state.globals.live,
            outstanding_pins: state.pins.len(),
            release_calls: state.release_calls,
            commits: state.commits,
        }
    }

    /// Registers a user class. If `superclass` is `None` or unknown, the class extends
    /// `java.lang.Object`. Does nothing if a class with this name already exists.
    pub fn define_class(&self, name: &str, superclass: Option<&str>) {
        let mut state = self.state.borrow_mut();
        if state.classes.contains_key(name) {
            return;
        }

        let superclass = superclass
            .and_then(|s| state.classes.get(s).copied())
            .unwrap_or(state.classes[OBJECT_CLASS]);
        state.add_class(name, Some(superclass));
    }

    /// Creates a new instance of the class `class_name` and returns a new local reference to it.
    ///
    /// If the class doesn't exist, `NoClassDefFoundError` is left pending and `None` is
    /// returned.
    pub fn new_instance(&self, class_name: &str) -> Option<ObjectRef> {
        let mut state = self.state.borrow_mut();
        let Some(class) = state.classes.get(class_name).copied() else {
            state.throw(NO_CLASS_DEF_FOUND, class_name);
            return None;
        };

        let id = state.alloc(HeapObject::Instance { class });
        Some(state.new_local(id, self.local_capacity))
    }

    /// Makes the next call of `operation` leave an exception of class `class` pending. The call
    /// still returns its result. Operations are named after the methods of [`ForeignEnv`],
    /// e.g. `"get_array_length"`.
    pub fn inject_fault(&self, operation: &str, class: &str, message: &str) {
        self.inject_fault_after(operation, 0, class, message)
    }

    /// Like [`SimEnv::inject_fault`], but the first `calls` calls of `operation` succeed.
    pub fn inject_fault_after(&self, operation: &str, calls: usize, class: &str, message: &str) {
        self.state.borrow_mut().faults.insert(
            operation.into(),
            Fault {
                skip: calls,
                class: class.into(),
                message: message.into(),
            },
        );
    }

    /// Returns the class name of the pending exception without clearing it.
    pub fn pending_exception(&self) -> Option<String> {
        let state = self.state.borrow();
        let exc = state.pending?;
        let class = state.class_of(exc);
        Some(state.class_name(class).to_string())
    }

    /// Reads the backing storage of a primitive array, bypassing any pinned copy.
    pub fn primitive_elements(&self, array: ObjectRef) -> Option<Vec<HostValue>> {
        let state = self.state.borrow();
        let id = state.deref(array)?;
        match &state.heap[id] {
            HeapObject::PrimitiveArray { kind, len, data, .. } => {
                let elems = dispatch_primitive!(*kind, T => {
                    let ptr = data.as_ptr().cast::<T>();
                    (0..*len)
                        // Safety: the storage holds `len` elements of type `T`.
                        .map(|i| unsafe { ptr.add(i).read() }.into_host())
                        .collect()
                });
                Some(elems)
            }
            _ => None,
        }
    }

    // Applies an injected fault for `operation`, if any.
    fn finish<T>(&self, operation: &str, value: T) -> T {
        let mut state = self.state.borrow_mut();
        let fire = match state.faults.get_mut(operation) {
            Some(fault) if fault.skip > 0 => {
                fault.skip -= 1;
                false
            }
            Some(_) => true,
            None => false,
        };

        if fire {
            if let Some(fault) = state.faults.remove(operation) {
                state.throw(&fault.class, fault.message);
            }
        }
        value
    }

    fn with_state<T>(&self, operation: &str, func: impl FnOnce(&mut SimState) -> T) -> T {
        let value = func(&mut *self.state.borrow_mut());
        self.finish(operation, value)
    }

    // Runs `func` and returns its result as a new local reference.
    fn local<F>(&self, operation: &str, func: F) -> Option<ObjectRef>
    where
        F: FnOnce(&mut SimState) -> Option<ObjId>,
    {
        let capacity = self.local_capacity;
        self.with_state(operation, |state| {
            let id = func(state)?;
            Some(state.new_local(id, capacity))
        })
    }
}

impl ForeignEnv for SimEnv {
    fn exception_check(&self) -> bool {
        self.state.borrow().pending.is_some()
    }

    fn exception_occurred(&self) -> Option<ObjectRef> {
        let capacity = self.local_capacity;
        let mut state = self.state.borrow_mut();
        let exc = state.pending?;
        Some(state.new_local(exc, capacity))
    }

    fn exception_clear(&self) {
        self.state.borrow_mut().pending = None;
    }

    fn new_global_ref(&self, obj: ObjectRef) -> Option<ObjectRef> {
        self.with_state("new_global_ref", |state| {
            let id = state.resolve(obj)?;
            Some(state.new_global(id))
        })
    }

    fn delete_global_ref(&self, obj: ObjectRef) {
        let (slot, global) = decode(obj);
        if !global || !self.state.borrow_mut().globals.remove(slot) {
            warn!(?obj, "deleting invalid global reference");
        }
    }

    fn new_local_ref(&self, obj: ObjectRef) -> Option<ObjectRef> {
        self.local("new_local_ref", |state| state.resolve(obj))
    }

    fn delete_local_ref(&self, obj: ObjectRef) {
        let (slot, global) = decode(obj);
        if global || !self.state.borrow_mut().locals.remove(slot) {
            warn!(?obj, "deleting invalid local reference");
        }
    }

    fn is_same_object(&self, a: Option<ObjectRef>, b: Option<ObjectRef>) -> bool {
        let state = self.state.borrow();
        a.and_then(|a| state.deref(a)) == b.and_then(|b| state.deref(b))
    }

    fn get_object_class(&self, obj: ObjectRef) -> Option<ObjectRef> {
        self.local("get_object_class", |state| {
            let id = state.resolve(obj)?;
            Some(state.class_of(id))
        })
    }

    fn get_component_type(&self, class: ObjectRef) -> Option<ObjectRef> {
        self.local("get_component_type", |state| {
            let id = state.resolve(class)?;
            state.class_data(id)?.component
        })
    }

    fn get_class_name(&self, class: ObjectRef) -> Option<String> {
        self.with_state("get_class_name", |state| {
            let id = state.resolve(class)?;
            match state.class_data(id) {
                Some(data) => Some(data.name.clone()),
                None => {
                    state.throw(ILLEGAL_ARGUMENT, "not a class");
                    None
                }
            }
        })
    }

    fn find_class(&self, name: &str) -> Option<ObjectRef> {
        self.local("find_class", |state| {
            let class = state.find_class(name);
            if class.is_none() {
                state.throw(NO_CLASS_DEF_FOUND, name);
            }
            class
        })
    }

    fn is_instance_of(&self, obj: Option<ObjectRef>, class: ObjectRef) -> bool {
        self.with_state("is_instance_of", |state| {
            let Some(class) = state.resolve(class) else {
                return false;
            };
            let Some(obj) = obj else {
                return true;
            };

            match state.resolve(obj) {
                Some(id) => {
                    let obj_class = state.class_of(id);
                    state.is_assignable(obj_class, class)
                }
                None => false,
            }
        })
    }

    fn is_assignable_from(&self, sub: ObjectRef, sup: ObjectRef) -> bool {
        self.with_state("is_assignable_from", |state| {
            match (state.resolve(sub), state.resolve(sup)) {
                (Some(sub), Some(sup)) => state.is_assignable(sub, sup),
                _ => false,
            }
        })
    }

    fn new_string(&self, text: &str) -> Option<ObjectRef> {
        self.local("new_string", |state| {
            let class = state.classes[STRING_CLASS];
            Some(state.alloc(HeapObject::Str {
                class,
                text: text.into(),
            }))
        })
    }

    fn get_string(&self, string: ObjectRef) -> Option<String> {
        self.with_state("get_string", |state| {
            let id = state.resolve(string)?;
            match &state.heap[id] {
                HeapObject::Str { text, .. } => Some(text.clone()),
                _ => {
                    state.throw(ILLEGAL_ARGUMENT, "not a string");
                    None
                }
            }
        })
    }

    fn to_string(&self, obj: ObjectRef) -> Option<String> {
        self.with_state("to_string", |state| {
            let id = state.resolve(obj)?;
            Some(state.to_text(id))
        })
    }

    fn get_array_length(&self, array: ObjectRef) -> i32 {
        self.with_state("get_array_length", |state| {
            let Some(id) = state.resolve(array) else {
                return 0;
            };

            match &state.heap[id] {
                HeapObject::PrimitiveArray { len, .. } => *len as i32,
                HeapObject::ObjectArray { elems, .. } => elems.len() as i32,
                _ => {
                    state.throw(ILLEGAL_ARGUMENT, "not an array");
                    0
                }
            }
        })
    }

    fn new_primitive_array(&self, kind: PrimitiveKind, len: i32) -> Option<ObjectRef> {
        self.local("new_primitive_array", |state| {
            state.new_primitive_array(kind, len)
        })
    }

    fn new_object_array(
        &self,
        len: i32,
        class: ObjectRef,
        init: Option<ObjectRef>,
    ) -> Option<ObjectRef> {
        self.local("new_object_array", |state| {
            let component = state.resolve(class)?;
            let init = match init {
                Some(init) => Some(state.resolve(init)?),
                None => None,
            };

            if len < 0 {
                state.throw(NEGATIVE_ARRAY_SIZE, len.to_string());
                return None;
            }

            if len as usize * std::mem::size_of::<usize>() > MAX_ARRAY_BYTES {
                state.throw(OUT_OF_MEMORY, "Requested array size exceeds VM limit");
                return None;
            }

            let array_class = state.array_class(component);
            if !state.check_store(array_class, init) {
                return None;
            }

            Some(state.alloc(HeapObject::ObjectArray {
                class: array_class,
                elems: vec![init; len as usize],
            }))
        })
    }

    fn get_object_array_element(&self, array: ObjectRef, index: i32) -> Option<ObjectRef> {
        self.local("get_object_array_element", |state| {
            let id = state.resolve(array)?;
            let Some((_, elems)) = state.object_array(id) else {
                state.throw(ILLEGAL_ARGUMENT, "not an object array");
                return None;
            };

            let len = elems.len();
            match usize::try_from(index).ok().and_then(|i| elems.get(i)) {
                Some(elem) => *elem,
                None => {
                    state.throw(
                        ARRAY_INDEX_OUT_OF_BOUNDS,
                        format!("Index {index} out of bounds for length {len}"),
                    );
                    None
                }
            }
        })
    }

    fn set_object_array_element(&self, array: ObjectRef, index: i32, value: Option<ObjectRef>) {
        self.with_state("set_object_array_element", |state| {
            let Some(id) = state.resolve(array) else {
                return;
            };
            let value = match value {
                Some(value) => match state.resolve(value) {
                    Some(value) => Some(value),
                    None => return,
                },
                None => None,
            };

            let Some((class, elems)) = state.object_array(id) else {
                state.throw(ILLEGAL_ARGUMENT, "not an object array");
                return;
            };

            let len = elems.len();
            if index < 0 || index as usize >= len {
                state.throw(
                    ARRAY_INDEX_OUT_OF_BOUNDS,
                    format!("Index {index} out of bounds for length {len}"),
                );
                return;
            }

            if !state.check_store(class, value) {
                return;
            }

            if let Some((_, elems)) = state.object_array(id) {
                elems[index as usize] = value;
            }
        })
    }

    fn get_primitive_array_elements(
        &self,
        kind: PrimitiveKind,
        array: ObjectRef,
    ) -> Option<RawElements> {
        let policy = self.pin_policy;
        self.with_state("get_primitive_array_elements", |state| {
            let id = state.resolve(array)?;
            let (ptr, copy) = match &mut state.heap[id] {
                HeapObject::PrimitiveArray {
                    kind: array_kind,
                    data,
                    ..
                } if *array_kind == kind => match policy {
                    PinPolicy::Direct => (data.as_mut_ptr(), None),
                    PinPolicy::Copy => {
                        let mut copy = data.clone();
                        (copy.as_mut_ptr(), Some(copy))
                    }
                },
                _ => {
                    state.throw(ILLEGAL_ARGUMENT, format!("not a {} array", kind.name()));
                    return None;
                }
            };

            let ptr = NonNull::new(ptr.cast::<c_void>())?;
            let is_copy = copy.is_some();
            // Direct views aren't tracked, there's nothing to free.
            if let Some(copy) = copy {
                state.pins.push(Pin {
                    ptr,
                    array: id,
                    copy,
                });
            }

            Some(RawElements { ptr, is_copy })
        })
    }

    unsafe fn release_primitive_array_elements(
        &self,
        kind: PrimitiveKind,
        array: ObjectRef,
        elems: NonNull<c_void>,
        mode: ReleaseMode,
    ) {
        self.with_state("release_primitive_array_elements", |state| {
            state.release_calls += 1;
            if mode == ReleaseMode::Commit {
                state.commits += 1;
            }

            let Some(id) = state.resolve(array) else {
                return;
            };

            let Some(pos) = state
                .pins
                .iter()
                .position(|pin| pin.ptr == elems && pin.array == id)
            else {
                let is_direct = matches!(
                    &state.heap[id],
                    HeapObject::PrimitiveArray { data, .. }
                        if data.as_ptr() as usize == elems.as_ptr() as usize
                );
                if !is_direct {
                    warn!(kind = kind.name(), "releasing elements that aren't pinned");
                }
                return;
            };

            match mode {
                ReleaseMode::Commit => {
                    let SimState { pins, heap, .. } = &mut *state;
                    if let HeapObject::PrimitiveArray { data, .. } = &mut heap[id] {
                        data.copy_from_slice(&pins[pos].copy);
                    }
                }
                ReleaseMode::Abort => {
                    state.pins.remove(pos);
                }
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn handles_round_trip() {
        for (slot, global) in [(0, false), (0, true), (41, false), (41, true)] {
            assert_eq!(decode(encode(slot, global)), (slot, global));
        }
    }

    #[test]
    fn array_class_names() {
        let env = SimEnv::new();
        let int_array = env.find_class("[I").unwrap();
        assert_eq!(env.get_class_name(int_array).unwrap(), "[I");

        let strings = env.find_class("[Ljava/lang/String;").unwrap();
        assert_eq!(
            env.get_class_name(strings).unwrap(),
            "[Ljava.lang.String;"
        );

        let nested = env.find_class("[[I").unwrap();
        let component = env.get_component_type(nested).unwrap();
        assert!(env.is_same_object(Some(component), Some(int_array)));

        for obj in [int_array, strings, nested, component] {
            env.delete_local_ref(obj);
        }
        assert_eq!(env.stats().live_local_refs, 0);
    }

    #[test]
    fn array_store_is_checked() {
        let env = SimEnvBuilder::new()
            .class("com.example.Base", None)
            .class("com.example.Derived", Some("com.example.Base"))
            .build();

        let base = env.find_class("com.example.Base").unwrap();
        let array = env.new_object_array(1, base, None).unwrap();

        let derived = env.new_instance("com.example.Derived").unwrap();
        env.set_object_array_element(array, 0, Some(derived));
        assert!(!env.exception_check());

        let string = env.new_string("nope").unwrap();
        env.set_object_array_element(array, 0, Some(string));
        assert_eq!(env.pending_exception().unwrap(), ARRAY_STORE);
    }

    #[test]
    fn injected_faults_fire_once() {
        let env = SimEnv::new();
        env.inject_fault("get_array_length", OUT_OF_MEMORY, "boom");

        let array = env.new_primitive_array(PrimitiveKind::Int, 3).unwrap();
        assert_eq!(env.get_array_length(array), 3);
        assert_eq!(env.pending_exception().unwrap(), OUT_OF_MEMORY);

        env.exception_clear();
        assert_eq!(env.get_array_length(array), 3);
        assert!(!env.exception_check());

        env.inject_fault_after("get_array_length", 2, OUT_OF_MEMORY, "later");
        env.get_array_length(array);
        env.get_array_length(array);
        assert!(!env.exception_check());
        env.get_array_length(array);
        assert_eq!(env.pending_exception().unwrap(), OUT_OF_MEMORY);
    }

    #[test]
    fn copies_are_written_back_on_commit() {
        let env = SimEnvBuilder::new().pin_policy(PinPolicy::Copy).build();
        let array = env.new_primitive_array(PrimitiveKind::Int, 2).unwrap();

        let elems = env
            .get_primitive_array_elements(PrimitiveKind::Int, array)
            .unwrap();
        assert!(elems.is_copy);
        unsafe { elems.ptr.cast::<i32>().as_ptr().write(5) };
        assert_eq!(env.primitive_elements(array).unwrap()[0], HostValue::Int(0));

        unsafe {
            env.release_primitive_array_elements(
                PrimitiveKind::Int,
                array,
                elems.ptr,
                ReleaseMode::Commit,
            )
        };
        assert_eq!(env.primitive_elements(array).unwrap()[0], HostValue::Int(5));
        assert_eq!(env.stats().outstanding_pins, 1);

        unsafe {
            env.release_primitive_array_elements(
                PrimitiveKind::Int,
                array,
                elems.ptr,
                ReleaseMode::Abort,
            )
        };
        assert_eq!(env.stats().outstanding_pins, 0);
        assert_eq!(env.stats().release_calls, 2);
    }
}
