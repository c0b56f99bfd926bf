//! In-memory store fakes with call counters and failure switches.

use crate::source::{CaptureError, FrameSource};
use crate::store::{PortraitStore, RecordStore, StoreError};
use crate::types::{DetectionFrame, Identity, Profile};
use chrono::{NaiveDate, NaiveDateTime};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryRecords {
    pub records: RefCell<HashMap<Identity, Profile>>,
    pub fetches: Cell<usize>,
    pub writes: Cell<usize>,
    pub fail_reads: Cell<bool>,
    pub fail_writes: Cell<bool>,
}

impl MemoryRecords {
    pub fn with(records: impl IntoIterator<Item = (&'static str, Profile)>) -> Self {
        let store = Self::default();
        for (id, profile) in records {
            store.records.borrow_mut().insert(Identity::from(id), profile);
        }
        store
    }

    pub fn get(&self, id: &str) -> Option<Profile> {
        self.records.borrow().get(&Identity::from(id)).cloned()
    }
}

impl RecordStore for MemoryRecords {
    fn fetch(&self, id: &Identity) -> Result<Option<Profile>, StoreError> {
        self.fetches.set(self.fetches.get() + 1);
        if self.fail_reads.get() {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(self.records.borrow().get(id).cloned())
    }

    fn record_attendance(
        &self,
        id: &Identity,
        total_attendance: u64,
        last_attendance_time: &str,
    ) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        self.writes.set(self.writes.get() + 1);
        let mut records = self.records.borrow_mut();
        let profile = records.entry(id.clone()).or_default();
        profile.total_attendance = Some(total_attendance);
        profile.last_attendance_time = Some(last_attendance_time.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPortraits {
    pub blobs: HashMap<Identity, Vec<u8>>,
    pub fetches: Cell<usize>,
    pub fail: Cell<bool>,
}

impl MemoryPortraits {
    pub fn with(blobs: impl IntoIterator<Item = (&'static str, Vec<u8>)>) -> Self {
        Self {
            blobs: blobs
                .into_iter()
                .map(|(id, bytes)| (Identity::from(id), bytes))
                .collect(),
            ..Default::default()
        }
    }
}

impl PortraitStore for MemoryPortraits {
    fn fetch(&self, id: &Identity) -> Result<Option<Vec<u8>>, StoreError> {
        self.fetches.set(self.fetches.get() + 1);
        if self.fail.get() {
            return Err(StoreError::Unavailable("injected blob failure".into()));
        }
        Ok(self.blobs.get(id).cloned())
    }
}

/// A tiny valid PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(hh, mm, ss)
        .unwrap()
}

pub fn student(total: u64, last: &str) -> Profile {
    Profile {
        name: Some("Murtaza Hassan".into()),
        major: Some("Robotics".into()),
        starting_year: Some(2017),
        standing: Some("G".into()),
        year: Some(4),
        total_attendance: Some(total),
        last_attendance_time: Some(last.into()),
    }
}

/// Frame source replaying a fixed script of frames and errors.
pub struct ScriptedSource {
    script: std::collections::VecDeque<Result<DetectionFrame, CaptureError>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<DetectionFrame, CaptureError>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<DetectionFrame>, CaptureError> {
        self.script.pop_front().transpose()
    }
}
