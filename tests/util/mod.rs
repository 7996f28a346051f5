#![allow(dead_code)]

use std::rc::Rc;

use jarray::prelude::*;

pub static SHAPE: &str = "com.example.Shape";
pub static CIRCLE: &str = "com.example.Circle";

/// A fresh runtime that pins primitive arrays directly.
pub fn new_env() -> (Rc<SimEnv>, EnvRef) {
    new_env_with(PinPolicy::Direct)
}

/// A fresh runtime with two user classes, `Circle` extends `Shape`.
pub fn new_env_with(policy: PinPolicy) -> (Rc<SimEnv>, EnvRef) {
    let sim = SimEnvBuilder::new()
        .pin_policy(policy)
        .class(SHAPE, None)
        .class(CIRCLE, Some(SHAPE))
        .build();
    let env: EnvRef = sim.clone();
    (sim, env)
}

pub fn new_object(sim: &SimEnv, env: &EnvRef, class: &str) -> ForeignObject {
    let local = sim.new_instance(class).unwrap();
    let object = ForeignObject::new(env, local).unwrap();
    env.delete_local_ref(local);
    object
}

pub fn int_array(env: &EnvRef, values: &[i64]) -> JArray {
    let array = JArray::new(env, values.len() as i64, PrimitiveKind::Int.into(), None).unwrap();
    for (i, v) in values.iter().enumerate() {
        array.set(i as i64, &HostValue::Int(*v)).unwrap();
    }
    array
}

pub fn string_array(env: &EnvRef, values: &[Option<&str>]) -> JArray {
    let array = JArray::new(env, values.len() as i64, TypeDescriptor::String, None).unwrap();
    for (i, v) in values.iter().enumerate() {
        array.set(i as i64, &HostValue::from(*v)).unwrap();
    }
    array
}

pub fn elements(array: &JArray) -> Vec<HostValue> {
    array.iter().collect::<JarrayResult<Vec<_>>>().unwrap()
}

pub fn ints(array: &JArray) -> Vec<i64> {
    elements(array)
        .into_iter()
        .map(|v| v.as_int().unwrap())
        .collect()
}

/// Asserts that every reference and pinned copy has been released.
pub fn assert_released(sim: &SimEnv) {
    let stats = sim.stats();
    assert_eq!(stats.live_local_refs, 0, "{stats:?}");
    assert_eq!(stats.live_global_refs, 0, "{stats:?}");
    assert_eq!(stats.outstanding_pins, 0, "{stats:?}");
    assert!(sim.pending_exception().is_none());
}

pub fn exception_class(err: &JarrayError) -> &str {
    err.as_exception().unwrap().class_name()
}
