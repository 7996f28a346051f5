mod util;

use jarray::{error::TypeError, prelude::*};
use util::*;

#[test]
fn slice_lengths_are_clamped() {
    let (sim, env) = new_env();
    let array = int_array(&env, &[0, 1, 2, 3, 4]);
    let length = array.len() as i64;

    for low in -2..=7 {
        for high in -2..=7 {
            let slice = array.slice(low, high).unwrap();
            let expected = (high.clamp(0, length) - low.clamp(0, length)).max(0);
            assert_eq!(slice.len() as i64, expected, "slice({low}, {high})");

            let start = low.clamp(0, length);
            let values = (start..start + expected).collect::<Vec<_>>();
            assert_eq!(ints(&slice), values);
        }
    }

    drop(array);
    assert_released(&sim);
}

#[test]
fn full_slice_is_equal_to_source() {
    let (sim, env) = new_env();

    for kind in PrimitiveKind::ALL {
        let array = JArray::new(&env, 4, kind.into(), None).unwrap();
        let value = if kind.is_floating() {
            HostValue::Float(2.0)
        } else if kind == PrimitiveKind::Boolean {
            HostValue::Bool(true)
        } else {
            HostValue::Int(65)
        };
        array.set(1, &value).unwrap();

        let slice = array.slice(0, array.len() as i64).unwrap();
        assert_eq!(elements(&slice), elements(&array), "{kind:?}");
        assert_eq!(slice.component_type(), array.component_type());
    }

    let strings = string_array(&env, &[Some("a"), None, Some("c")]);
    let slice = strings.slice(0, 3).unwrap();
    assert_eq!(elements(&slice), elements(&strings));

    drop((strings, slice));
    assert_released(&sim);
}

#[test]
fn slices_are_copies() {
    let (sim, env) = new_env();

    let array = int_array(&env, &[1, 2, 3]);
    let slice = array.slice(1, 3).unwrap();
    slice.set(0, &HostValue::Int(20)).unwrap();
    array.set(2, &HostValue::Int(30)).unwrap();

    assert_eq!(ints(&array), [1, 2, 30]);
    assert_eq!(ints(&slice), [20, 3]);
    assert_ne!(array, slice);

    drop((array, slice));
    assert_released(&sim);
}

#[test]
fn slices_of_objects_share_elements() {
    let (sim, env) = new_env();

    let circle = new_object(&sim, &env, CIRCLE);
    let array = JArray::new(&env, 3, TypeDescriptor::ObjectOf(&circle), None).unwrap();
    array.set(2, &circle.clone().into()).unwrap();

    let slice = array.slice(1, 3).unwrap();
    assert_eq!(slice.get(0).unwrap(), HostValue::None);
    assert_eq!(slice.get(1).unwrap(), HostValue::Object(circle.clone()));
    assert!(env.is_same_object(slice.component_class(), array.component_class()));

    drop((array, slice, circle));
    assert_released(&sim);
}

#[test]
fn subscripts() {
    let (sim, env) = new_env();
    let array = int_array(&env, &[0, 1, 2, 3, 4]);

    let slice = array.subscript(1i64..4).unwrap();
    assert_eq!(ints(slice.as_array().unwrap()), [1, 2, 3]);

    let tail = array
        .subscript(SliceDescriptor::new(Some(-2), None, Some(1)))
        .unwrap();
    assert_eq!(ints(tail.as_array().unwrap()), [3, 4]);

    let full = array.subscript(SliceDescriptor::full()).unwrap();
    assert_eq!(ints(full.as_array().unwrap()), [0, 1, 2, 3, 4]);

    for step in [2, -1, 0] {
        let err = array
            .subscript(SliceDescriptor::new(None, None, Some(step)))
            .unwrap_err();
        assert_eq!(*err, JarrayError::TypeError(TypeError::UnsupportedStep { step }));
    }

    drop((array, slice, tail, full));
    assert_released(&sim);
}
