mod util;

use jarray::prelude::*;
use util::*;

static ILLEGAL_STATE: &str = "java.lang.IllegalStateException";

#[test]
fn direct_views_are_never_aborted() {
    let (sim, env) = new_env_with(PinPolicy::Direct);

    let array = int_array(&env, &[1, 2]);
    assert_eq!(array.is_copy(), Some(false));
    assert_eq!(
        sim.primitive_elements(array.as_obj()).unwrap(),
        [HostValue::Int(1), HostValue::Int(2)]
    );

    drop(array);
    assert_eq!(sim.stats().release_calls, 0);
    assert_released(&sim);
}

#[test]
fn copies_are_released_exactly_once() {
    let (sim, env) = new_env_with(PinPolicy::Copy);

    let array = JArray::new(&env, 3, PrimitiveKind::Long.into(), None).unwrap();
    assert_eq!(array.is_copy(), Some(true));
    assert_eq!(sim.stats().outstanding_pins, 1);

    let clone = array.clone();
    drop(array);
    assert_eq!(sim.stats().outstanding_pins, 1);
    assert_eq!(sim.stats().release_calls, 0);

    drop(clone);
    let stats = sim.stats();
    assert_eq!(stats.outstanding_pins, 0);
    assert_eq!(stats.release_calls, 1);
    assert_eq!(stats.commits, 0);
    assert_released(&sim);
}

#[test]
fn commit_writes_copies_back() {
    let (sim, env) = new_env_with(PinPolicy::Copy);

    let array = JArray::new(&env, 2, PrimitiveKind::Int.into(), Some(&HostValue::Int(7))).unwrap();
    let zeros = [HostValue::Int(0), HostValue::Int(0)];
    assert_eq!(sim.primitive_elements(array.as_obj()).unwrap(), zeros);
    assert_eq!(ints(&array), [7, 7]);

    array.commit().unwrap();
    assert_eq!(ints(&array), [7, 7]);
    assert_eq!(
        sim.primitive_elements(array.as_obj()).unwrap(),
        [HostValue::Int(7), HostValue::Int(7)]
    );

    array.set(0, &HostValue::Int(1)).unwrap();
    array.commit().unwrap();
    assert_eq!(
        sim.primitive_elements(array.as_obj()).unwrap(),
        [HostValue::Int(1), HostValue::Int(7)]
    );

    assert!(array.is_pinned());
    let stats = sim.stats();
    assert_eq!(stats.commits, 2);
    assert_eq!(stats.outstanding_pins, 1);

    drop(array);
    assert_eq!(sim.stats().release_calls, 3);
    assert_released(&sim);
}

#[test]
fn uncommitted_changes_are_discarded() {
    let (sim, env) = new_env_with(PinPolicy::Copy);

    let raw = env.new_primitive_array(PrimitiveKind::Double, 1).unwrap();
    let array = JArray::wrap(&env, raw).unwrap();
    array.set(0, &HostValue::Float(3.5)).unwrap();
    drop(array);

    let array = JArray::wrap(&env, raw).unwrap();
    assert_eq!(array.get(0).unwrap(), HostValue::Float(0.0));

    env.delete_local_ref(raw);
    drop(array);
    assert_released(&sim);
}

#[test]
fn commit_on_direct_views_and_references() {
    let (sim, env) = new_env_with(PinPolicy::Direct);

    let array = int_array(&env, &[1]);
    array.commit().unwrap();
    assert_eq!(sim.stats().commits, 1);

    let strings = string_array(&env, &[Some("a")]);
    strings.commit().unwrap();
    assert!(!strings.is_pinned());
    assert_eq!(sim.stats().release_calls, 1);

    drop((array, strings));
    assert_released(&sim);
}

#[test]
fn class_reference_is_released_when_construction_fails() {
    let (sim, env) = new_env();

    let raw = {
        let class = env.find_class("java.lang.String").unwrap();
        let raw = env.new_object_array(2, class, None).unwrap();
        env.delete_local_ref(class);
        raw
    };

    sim.inject_fault("get_array_length", ILLEGAL_STATE, "boom");
    let err = JArray::wrap(&env, raw).unwrap_err();
    assert_eq!(exception_class(&err), ILLEGAL_STATE);
    assert_eq!(err.as_exception().unwrap().get_message(), "java.lang.IllegalStateException: boom");

    env.delete_local_ref(raw);
    assert_released(&sim);
}

#[test]
fn failed_pins_release_the_buffer() {
    for policy in [PinPolicy::Direct, PinPolicy::Copy] {
        let (sim, env) = new_env_with(policy);

        let raw = env.new_primitive_array(PrimitiveKind::Int, 4).unwrap();
        sim.inject_fault("get_primitive_array_elements", ILLEGAL_STATE, "pin");
        let err = JArray::wrap(&env, raw).unwrap_err();
        assert_eq!(exception_class(&err), ILLEGAL_STATE);

        env.delete_local_ref(raw);
        assert_released(&sim);
    }
}

#[test]
fn failed_releases_are_not_fatal() {
    let (sim, env) = new_env_with(PinPolicy::Copy);

    let array = int_array(&env, &[1, 2]);
    sim.inject_fault("release_primitive_array_elements", ILLEGAL_STATE, "commit");
    let err = array.commit().unwrap_err();
    assert_eq!(exception_class(&err), ILLEGAL_STATE);

    // The buffer is still pinned and usable.
    assert_eq!(ints(&array), [1, 2]);
    array.set(1, &HostValue::Int(3)).unwrap();
    array.commit().unwrap();

    sim.inject_fault("release_primitive_array_elements", ILLEGAL_STATE, "abort");
    drop(array);
    assert_released(&sim);
}

#[test]
fn foreign_exceptions_release_transient_references() {
    let (sim, env) = new_env();

    let array = string_array(&env, &[Some("a"), Some("b")]);
    sim.inject_fault("get_object_array_element", ILLEGAL_STATE, "get");
    let err = array.get(1).unwrap_err();
    assert!(err.is_exception());
    assert_eq!(sim.stats().live_local_refs, 0);

    sim.inject_fault("new_string", ILLEGAL_STATE, "set");
    assert!(array.set(0, &HostValue::from("c")).is_err());
    assert_eq!(array.get(0).unwrap(), HostValue::from("a"));
    assert_eq!(sim.stats().live_local_refs, 0);

    drop(array);
    assert_released(&sim);
}

#[test]
fn no_local_references_accumulate() {
    let (sim, env) = new_env();

    let values = (0..40).map(|i| i.to_string()).collect::<Vec<_>>();
    let array = string_array(&env, &values.iter().map(|s| Some(s.as_str())).collect::<Vec<_>>());
    assert_eq!(sim.stats().live_local_refs, 0);

    assert_eq!(array.index(&HostValue::from("39")).unwrap(), 39);
    assert!(!array.contains(&HostValue::None).unwrap());
    let slice = array.slice(10, 30).unwrap();
    assert_eq!(elements(&slice).len(), 20);
    assert_eq!(sim.stats().live_local_refs, 0);

    drop((array, slice));
    assert_released(&sim);
}

#[test]
fn iterators_are_independent() {
    let (sim, env) = new_env();
    let array = int_array(&env, &[1, 2, 3]);

    let mut first = array.iter();
    let mut second = array.iter();
    assert_eq!(first.next().unwrap().unwrap(), HostValue::Int(1));

    assert_eq!(second.by_ref().map(|v| v.unwrap()).count(), 3);
    assert!(second.next().is_none());

    // Writes are visible while iterating.
    array.set(1, &HostValue::Int(20)).unwrap();
    assert_eq!(first.next().unwrap().unwrap(), HostValue::Int(20));
    assert_eq!(first.len(), 1);
    assert_eq!(first.next().unwrap().unwrap(), HostValue::Int(3));
    assert!(first.next().is_none());
    assert!(first.next().is_none());

    let again = (&array).into_iter().map(|v| v.unwrap()).collect::<Vec<_>>();
    assert_eq!(again, [HostValue::Int(1), HostValue::Int(20), HostValue::Int(3)]);

    drop((array, first, second));
    assert_released(&sim);
}

#[test]
fn exceptions_raised_while_describing_are_discarded() {
    let (sim, env) = new_env();
    let array = string_array(&env, &[Some("a")]);

    sim.inject_fault("get_object_array_element", ILLEGAL_STATE, "get");
    sim.inject_fault("get_object_class", ILLEGAL_STATE, "class");
    sim.inject_fault("to_string", ILLEGAL_STATE, "text");

    let err = array.get(0).unwrap_err();
    let exc = err.as_exception().unwrap();
    assert_eq!(exc.class_name(), "<unknown exception>");
    assert_eq!(exc.get_message(), "<cannot display exception>");
    assert!(sim.pending_exception().is_none());
    assert_eq!(sim.stats().live_local_refs, 0);

    // `toString` wasn't called while the class lookup had failed, so its fault is still armed.
    assert_eq!(array.to_string(), "<cannot display array>");
    assert!(array.to_string().starts_with("[Ljava.lang.String;@"));

    drop(array);
    assert_released(&sim);
}

#[test]
fn failed_scans_release_transient_references() {
    let (sim, env) = new_env();
    let array = string_array(&env, &[Some("a"), Some("b"), None, Some("d")]);

    sim.inject_fault_after("get_object_array_element", 2, ILLEGAL_STATE, "index");
    let err = array.index(&HostValue::from("d")).unwrap_err();
    assert_eq!(exception_class(&err), ILLEGAL_STATE);
    assert_eq!(sim.stats().live_local_refs, 0);

    sim.inject_fault_after("get_string", 1, ILLEGAL_STATE, "contains");
    let err = array.contains(&HostValue::from("d")).unwrap_err();
    assert_eq!(exception_class(&err), ILLEGAL_STATE);
    assert_eq!(sim.stats().live_local_refs, 0);

    assert_eq!(array.index(&HostValue::from("d")).unwrap(), 3);
    assert!(array.contains(&HostValue::None).unwrap());

    drop(array);
    assert_released(&sim);
}

#[test]
fn failed_slices_do_not_escape() {
    let (sim, env) = new_env();
    let array = string_array(&env, &[Some("a"), Some("b"), Some("c"), Some("d")]);
    let globals = sim.stats().live_global_refs;

    for operation in ["get_object_array_element", "set_object_array_element"] {
        sim.inject_fault_after(operation, 2, ILLEGAL_STATE, "copy");
        let err = array.slice(0, 4).unwrap_err();
        assert_eq!(exception_class(&err), ILLEGAL_STATE);

        let stats = sim.stats();
        assert_eq!(stats.live_local_refs, 0, "{operation}");
        assert_eq!(stats.live_global_refs, globals, "{operation}");
    }

    let slice = array.slice(0, 4).unwrap();
    assert_eq!(elements(&slice), elements(&array));

    drop((array, slice));
    assert_released(&sim);
}
