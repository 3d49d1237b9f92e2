//! Fixed-length HID reports.

use bytes::{BufMut, Bytes, BytesMut};

use crate::color::Rgb;
use crate::variant::{ReportKind, Route};

/// Encoded report, ready to be written to the device.
///
/// The first byte is always the report ID.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Report {
    kind: ReportKind,
    bytes: Bytes,
}

impl Report {
    pub fn id(&self) -> u8 {
        self.bytes[0]
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Sequential report builder.
///
/// Fields are appended in wire order and `finish` zero-fills the report up to
/// its fixed length, so unused slots never need to be written explicitly.
pub(crate) struct ReportWriter {
    kind: ReportKind,
    len: usize,
    buf: BytesMut,
}

impl ReportWriter {
    pub fn new(route: Route, len: usize) -> Self {
        let mut buf = BytesMut::with_capacity(len);
        buf.put_u8(route.id);
        Self { kind: route.kind, len, buf }
    }

    /// Bytes written so far, including the report ID.
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn put_u16_le(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16_le(value);
        self
    }

    pub fn put_i32_le(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32_le(value);
        self
    }

    pub fn put_rgb(&mut self, color: Rgb) -> &mut Self {
        self.buf.put_slice(&color.to_bytes());
        self
    }

    /// Zero-fill `count` bytes.
    pub fn zeros(&mut self, count: usize) -> &mut Self {
        self.buf.put_bytes(0, count);
        self
    }

    /// Zero-fill up to `position` bytes from the start of the report.
    pub fn pad_to(&mut self, position: usize) -> &mut Self {
        let count = position.saturating_sub(self.buf.len());
        self.zeros(count)
    }

    /// Zero-fill the report up to its fixed length.
    ///
    /// Panics if more bytes than the fixed length were written.
    pub fn finish(mut self) -> Report {
        assert!(
            self.buf.len() <= self.len,
            "report 0x{:02x} overflows its length of {} bytes",
            self.buf[0],
            self.len
        );
        let len = self.len;
        self.pad_to(len);
        Report { kind: self.kind, bytes: self.buf.freeze() }
    }
}
