//! A bytecode stream and its line table built on the raw helpers, the way
//! an interpreter's chunk owns them.

use core::ptr::NonNull;
use lox_memory::runtime::memory::{grow_capacity, release_array, resize_array, DynArray};

/// Caller-managed array: count and capacity live beside the block
struct RawStream {
    code: Option<NonNull<u8>>,
    lines: Option<NonNull<u32>>,
    count: usize,
    capacity: usize,
    reallocations: usize,
}

impl RawStream {
    fn new() -> Self {
        Self {
            code: None,
            lines: None,
            count: 0,
            capacity: 0,
            reallocations: 0,
        }
    }

    fn write(
        &mut self,
        byte: u8,
        line: u32,
    ) {
        if self.capacity < self.count + 1 {
            let old = self.capacity;
            self.capacity = grow_capacity(old);
            // Safety: both blocks hold exactly `old` slots
            unsafe {
                self.code = resize_array(self.code, old, self.capacity);
                self.lines = resize_array(self.lines, old, self.capacity);
            }
            self.reallocations += 1;
        }
        // Safety: `count < capacity`
        unsafe {
            self.code.unwrap().as_ptr().add(self.count).write(byte);
            self.lines.unwrap().as_ptr().add(self.count).write(line);
        }
        self.count += 1;
    }

    fn code(&self) -> &[u8] {
        match self.code {
            // Safety: the first `count` bytes were written
            Some(ptr) => unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.count) },
            None => &[],
        }
    }

    fn free(&mut self) {
        // Safety: both blocks hold exactly `capacity` slots
        unsafe {
            self.code = release_array(self.code, self.capacity);
            self.lines = release_array(self.lines, self.capacity);
        }
        self.count = 0;
        self.capacity = 0;
    }
}

#[test]
fn test_raw_stream_grows_by_policy() {
    let mut stream = RawStream::new();
    for i in 0..9u8 {
        stream.write(i, 1);
    }
    assert_eq!(stream.capacity, 16);
    assert_eq!(stream.reallocations, 2);
    assert_eq!(stream.code(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);

    stream.free();
    assert!(stream.code.is_none());
    assert!(stream.lines.is_none());
    assert_eq!(stream.code(), &[] as &[u8]);
}

#[test]
fn test_raw_stream_empty_free() {
    let mut stream = RawStream::new();
    stream.free();
    assert_eq!(stream.capacity, 0);
}

#[test]
fn test_dyn_array_matches_raw_stream() {
    let mut raw = RawStream::new();
    let mut array = DynArray::new();
    for i in 0..1000u32 {
        raw.write(i as u8, i);
        array.push(i as u8);
        assert_eq!(raw.capacity, array.capacity());
    }
    assert_eq!(raw.code(), array.as_slice());
    raw.free();
}
