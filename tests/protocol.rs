mod util;

use jarray::{
    error::{ArgumentError, IndexError, TypeError, ValueError},
    prelude::*,
    protocol::{self, invoke},
};
use util::*;

#[test]
fn type_descriptor() {
    let ty = protocol::init();
    assert_eq!(ty.name, "jarray.JArray");
    assert_eq!(ty.iter_name, "jarray.JArrayIter");
    assert!(std::ptr::eq(ty, protocol::init()));

    let names = ty.methods.iter().map(|m| m.name).collect::<Vec<_>>();
    assert_eq!(names, ["__getitem__", "index", "commit"]);
}

#[test]
fn getitem_by_name() {
    let (sim, env) = new_env();
    let array = int_array(&env, &[10, 20, 30]);

    assert_eq!(invoke(&array, "__getitem__", &[HostValue::Int(1)]).unwrap(), HostValue::Int(20));
    assert_eq!(invoke(&array, "__getitem__", &[HostValue::Int(-1)]).unwrap(), HostValue::Int(30));

    let err = invoke(&array, "__getitem__", &[HostValue::Int(3)]).unwrap_err();
    assert!(matches!(*err, JarrayError::IndexError(IndexError::OutOfRange { .. })));

    for arg in [HostValue::from("1"), HostValue::Float(1.0), HostValue::None] {
        let err = invoke(&array, "__getitem__", &[arg]).unwrap_err();
        assert_eq!(*err, JarrayError::TypeError(TypeError::Subscript));
    }

    drop(array);
    assert_released(&sim);
}

#[test]
fn getitem_slices_by_name() {
    let (sim, env) = new_env();
    let array = int_array(&env, &[10, 20, 30, 40]);

    let slice = invoke(&array, "__getitem__", &[SliceDescriptor::from(1..3).into()]).unwrap();
    assert_eq!(ints(slice.as_array().unwrap()), [20, 30]);

    let tail = SliceDescriptor::new(Some(-1), None, Some(1));
    let tail = invoke(&array, "__getitem__", &[tail.into()]).unwrap();
    assert_eq!(ints(tail.as_array().unwrap()), [40]);

    let strided = SliceDescriptor::new(None, None, Some(2));
    let err = invoke(&array, "__getitem__", &[strided.into()]).unwrap_err();
    assert_eq!(*err, JarrayError::TypeError(TypeError::UnsupportedStep { step: 2 }));

    drop((array, slice, tail));
    assert_released(&sim);
}

#[test]
fn index_by_name() {
    let (sim, env) = new_env();
    let array = string_array(&env, &[Some("x"), Some("y")]);

    assert_eq!(invoke(&array, "index", &[HostValue::from("y")]).unwrap(), HostValue::Int(1));
    let err = invoke(&array, "index", &[HostValue::from("z")]).unwrap_err();
    assert_eq!(*err, JarrayError::ValueError(ValueError::NotInArray));

    drop(array);
    assert_released(&sim);
}

#[test]
fn commit_by_name() {
    let (sim, env) = new_env_with(PinPolicy::Copy);
    let array = int_array(&env, &[1, 2]);

    assert_eq!(invoke(&array, "commit", &[]).unwrap(), HostValue::None);
    assert_eq!(
        sim.primitive_elements(array.as_obj()).unwrap(),
        [HostValue::Int(1), HostValue::Int(2)]
    );

    drop(array);
    assert_released(&sim);
}

#[test]
fn argument_counts_are_checked() {
    let (sim, env) = new_env();
    let array = int_array(&env, &[1]);

    let cases: [(&str, Vec<HostValue>); 3] = [
        ("__getitem__", vec![]),
        ("index", vec![HostValue::Int(1), HostValue::Int(2)]),
        ("commit", vec![HostValue::None]),
    ];

    for (name, args) in cases {
        let err = invoke(&array, name, &args).unwrap_err();
        assert_eq!(
            *err,
            JarrayError::ArgumentError(ArgumentError::ArgCount { n: args.len() }),
            "{name}"
        );
    }

    drop(array);
    assert_released(&sim);
}

#[test]
fn unknown_methods() {
    let (sim, env) = new_env();
    let array = int_array(&env, &[1]);

    let err = invoke(&array, "append", &[HostValue::Int(1)]).unwrap_err();
    assert_eq!(
        *err,
        JarrayError::TypeError(TypeError::NoSuchMethod { name: "append".into() })
    );

    drop(array);
    assert_released(&sim);
}

#[test]
fn iteration() {
    let (sim, env) = new_env();
    let array = string_array(&env, &[Some("a"), None, Some("c")]);

    let mut seen = Vec::new();
    for elem in &array {
        seen.push(elem.unwrap());
    }
    assert_eq!(seen, [HostValue::from("a"), HostValue::None, HostValue::from("c")]);

    let mut iter = array.clone().into_iter();
    assert_eq!(iter.len(), 3);
    assert!(!iter.is_exhausted());
    assert_eq!(iter.by_ref().count(), 3);
    assert!(iter.is_exhausted());
    assert_eq!(iter.remaining(), 0);

    let empty = JArray::new(&env, 0, PrimitiveKind::Int.into(), None).unwrap();
    assert!(empty.iter().next().is_none());

    drop((array, empty, iter));
    assert_released(&sim);
}
