#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use roundtrip::{Clock, CodecBackend, Invocation};

pub const MIB: u64 = 1024 * 1024;

/// Backend that writes placeholder files of fixed sizes and remembers every call.
#[derive(Clone)]
pub struct FakeBackend {
    pub calls: Rc<RefCell<Vec<Invocation>>>,
    pub compressed_bytes: u64,
    pub restored_bytes: u64,
    pub fail_with: Option<String>,
}

impl FakeBackend {
    pub fn new(compressed_bytes: u64) -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
            compressed_bytes,
            restored_bytes: 16,
            fail_with: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::new(1)
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }
}

impl CodecBackend for FakeBackend {
    fn run(&self, invocation: &Invocation) -> Result<(), String> {
        self.calls.borrow_mut().push(invocation.clone());
        if let Some(reason) = &self.fail_with {
            return Err(reason.clone());
        }
        let (input, output, compressing) = match invocation {
            Invocation::Transform { input, output, morton_order, .. } => {
                let ext = output.extension().and_then(|e| e.to_str());
                (input, output, *morton_order || ext == Some("sog"))
            }
            Invocation::SpzPack { input, output } => (input, output, true),
            Invocation::SpzUnpack { input, output } => (input, output, false),
        };
        if !input.exists() {
            return Err(format!("missing input {}", input.display()));
        }
        let size = if compressing { self.compressed_bytes } else { self.restored_bytes };
        write_sized(output, size);
        Ok(())
    }
}

/// Clock that steps through fixed offsets, in seconds, from a common origin.
pub struct ScriptedClock {
    origin: Instant,
    offsets: Vec<f64>,
    next: Cell<usize>,
}

impl ScriptedClock {
    pub fn new(offsets: &[f64]) -> Self {
        Self {
            origin: Instant::now(),
            offsets: offsets.to_vec(),
            next: Cell::new(0),
        }
    }

    /// `round_trips` round trips, each taking `compress` then `decompress` seconds.
    pub fn repeating(compress: f64, decompress: f64, round_trips: usize) -> Self {
        let mut offsets = Vec::new();
        let mut t = 0.0;
        for _ in 0..round_trips {
            offsets.push(t);
            t += compress;
            offsets.push(t);
            t += decompress;
            offsets.push(t);
        }
        Self::new(&offsets)
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> Instant {
        let i = self.next.get();
        self.next.set(i + 1);
        let offset = self.offsets.get(i).copied().unwrap_or_else(|| self.offsets.last().copied().unwrap_or(0.0));
        self.origin + Duration::from_secs_f64(offset)
    }
}

pub fn write_sized(path: &Path, bytes: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().set_len(bytes).unwrap();
}
