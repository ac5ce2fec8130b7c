//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// Route library diagnostics to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Assemble a PDF with a classic xref table. `objects[i]` becomes object `i + 1`.
pub fn build_pdf(version: &str, objects: &[&[u8]], trailer_extra: &str) -> Vec<u8> {
    let mut content = format!("%PDF-{version}\n").into_bytes();
    content.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(content.len());
        content.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        content.extend_from_slice(body);
        content.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = content.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f\r\n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{offset:010} 00000 n\r\n"));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R{} >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        trailer_extra,
        xref_start
    ));
    content.extend_from_slice(xref.as_bytes());
    content
}

/// Catalog, empty page tree and an info dictionary.
pub fn simple_document(trailer_extra: &str) -> Vec<u8> {
    build_pdf(
        "1.4",
        &[
            b"<< /Type /Catalog /Pages 2 0 R >>",
            b"<< /Type /Pages /Kids [] /Count 0 >>",
            b"<< /Title (Fixture) /Producer (fixture builder) >>",
        ],
        &format!(" /Info 3 0 R{trailer_extra}"),
    )
}

/// One xref stream record with field widths `[1 2 1]`.
pub fn record(kind: u8, field2: u16, field3: u8) -> [u8; 4] {
    let [high, low] = field2.to_be_bytes();
    [kind, high, low, field3]
}

/// Seventeen records for objects 0..=16: 0 free, 1..=4 at offsets, 5..=10 compressed in
/// object stream 2, 11..=16 free.
pub fn seventeen_records() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&record(0, 0, 255));
    for number in 1..=4u16 {
        data.extend_from_slice(&record(1, number * 100, 0));
    }
    for index in 0..6u8 {
        data.extend_from_slice(&record(2, 2, index));
    }
    for _ in 11..=16 {
        data.extend_from_slice(&record(0, 0, 1));
    }
    data
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
