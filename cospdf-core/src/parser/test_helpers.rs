//! Helper functions for creating valid test PDFs with correct offsets

/// Assemble a PDF from numbered object bodies with a classic xref table.
///
/// `objects[i]` becomes object `i + 1`, generation 0.
pub fn build_pdf(version: &str, objects: &[&[u8]], trailer_extra: &str) -> Vec<u8> {
    let mut content = format!("%PDF-{version}\n").into_bytes();
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

/// Creates a minimal valid PDF with correct xref offsets
pub fn create_minimal_pdf() -> Vec<u8> {
    build_pdf(
        "1.4",
        &[
            b"<< /Type /Catalog /Pages 2 0 R >>",
            b"<< /Type /Pages /Kids [] /Count 0 >>",
        ],
        "",
    )
}

/// Creates a PDF with info dictionary and a file identifier
pub fn create_pdf_with_info() -> Vec<u8> {
    build_pdf(
        "1.4",
        &[
            b"<< /Type /Catalog /Pages 2 0 R >>",
            b"<< /Type /Pages /Kids [] /Count 0 >>",
            b"<< /Title (Test PDF) /Author (Test Author) >>",
        ],
        " /Info 3 0 R /ID [<00112233445566778899AABBCCDDEEFF> <00112233445566778899AABBCCDDEEFF>]",
    )
}

/// Creates a PDF 1.5 file whose objects 4 and 5 live in object stream 3 and whose
/// cross-reference section is an uncompressed xref stream (object 6).
pub fn create_pdf_with_xref_stream() -> Vec<u8> {
    let mut content = b"%PDF-1.5\n".to_vec();
    let mut offsets = Vec::new();

    let objstm_data = b"4 0 5 22 << /Title (Packed) >> [1 2 3]";
    let bodies: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        b"<< /Type /Pages /Kids [] /Count 0 >>".to_vec(),
        {
            let mut body = format!(
                "<< /Type /ObjStm /N 2 /First 9 /Length {} >>\nstream\n",
                objstm_data.len()
            )
            .into_bytes();
            body.extend_from_slice(objstm_data);
            body.extend_from_slice(b"\nendstream");
            body
        },
    ];
    for (i, body) in bodies.iter().enumerate() {
        offsets.push(content.len());
        content.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        content.extend_from_slice(body);
        content.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = content.len();
    // W [1 4 2], 7 records
    let mut records = vec![0u8, 0, 0, 0, 0, 0xFF, 0xFF];
    for offset in &offsets {
        records.push(1);
        records.extend_from_slice(&(*offset as u32).to_be_bytes());
        records.extend_from_slice(&[0, 0]);
    }
    records.extend_from_slice(&[2, 0, 0, 0, 3, 0, 0]);
    records.extend_from_slice(&[2, 0, 0, 0, 3, 0, 1]);
    records.push(1);
    records.extend_from_slice(&(xref_offset as u32).to_be_bytes());
    records.extend_from_slice(&[0, 0]);

    content.extend_from_slice(
        format!(
            "6 0 obj\n<< /Type /XRef /Size 7 /W [1 4 2] /Root 1 0 R /Info 4 0 R /Length {} >>\nstream\n",
            records.len()
        )
        .as_bytes(),
    );
    content.extend_from_slice(&records);
    content.extend_from_slice(
        format!("\nendstream\nendobj\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes(),
    );
    content
}
