//! Iteration over the elements of an array.

use std::iter::FusedIterator;

use super::JArray;
use crate::{data::host::HostValue, error::JarrayResult, protocol};

/// A forward iterator over the elements of a [`JArray`].
///
/// Every step reads the current element, so writes made while iterating are visible. The
/// iterator holds its own handle to the array until it's exhausted, then releases it. An
/// exhausted iterator keeps returning `None`, a new one must be created to iterate again.
#[derive(Debug, Clone)]
pub struct JArrayIter {
    array: Option<JArray>,
    index: usize,
}

impl JArrayIter {
    pub(crate) fn new(array: JArray) -> Self {
        protocol::init();
        JArrayIter {
            array: Some(array),
            index: 0,
        }
    }

    /// Returns the number of elements that haven't been visited yet.
    pub fn remaining(&self) -> usize {
        match self.array {
            Some(ref array) => array.len() - self.index,
            None => 0,
        }
    }

    /// Returns `true` if the iterator has released its handle.
    pub fn is_exhausted(&self) -> bool {
        self.array.is_none()
    }
}

impl Iterator for JArrayIter {
    type Item = JarrayResult<HostValue>;

    fn next(&mut self) -> Option<Self::Item> {
        let array = self.array.as_ref()?;

        if self.index >= array.len() {
            self.array = None;
            return None;
        }

        let elem = array.get(self.index as i64);
        self.index += 1;

        if self.index == array.len() {
            self.array = None;
        }

        Some(elem)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for JArrayIter {}

impl FusedIterator for JArrayIter {}

impl JArray {
    /// Returns an iterator over the elements of this array.
    pub fn iter(&self) -> JArrayIter {
        JArrayIter::new(self.clone())
    }
}

impl IntoIterator for &JArray {
    type Item = JarrayResult<HostValue>;
    type IntoIter = JArrayIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for JArray {
    type Item = JarrayResult<HostValue>;
    type IntoIter = JArrayIter;

    fn into_iter(self) -> Self::IntoIter {
        JArrayIter::new(self)
    }
}
