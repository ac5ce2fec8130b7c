use crate::error::Result;
use crate::objects::{Dictionary, Name, Object, ObjectId, PdfString, Stream};
use std::io::Write;

const CRLF: &[u8] = b"\r\n";

/// Renders COS objects into PDF token syntax while tracking the output offset.
///
/// Arrays, dictionaries and streams are always followed by CRLF; scalars are not.
/// Dictionary entries with a `null` value are skipped.
pub struct CosWriter<W: Write> {
    writer: W,
    current_position: u64,
}

impl<W: Write> CosWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_position(writer, 0)
    }

    /// A writer whose first byte lands at `position` in the final file.
    pub fn with_position(writer: W, position: u64) -> Self {
        Self {
            writer,
            current_position: position,
        }
    }

    /// Absolute offset of the next byte written
    pub fn position(&self) -> u64 {
        self.current_position
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.current_position += data.len() as u64;
        Ok(())
    }

    pub fn write_eol(&mut self) -> Result<()> {
        self.write_bytes(CRLF)
    }

    /// Write `n g obj`, the value and `endobj`. Returns the offset of the object.
    pub fn write_indirect_object(&mut self, id: ObjectId, object: &mut Object) -> Result<u64> {
        let offset = self.current_position;
        self.write_bytes(format!("{} {} obj", id.number(), id.generation()).as_bytes())?;
        self.write_eol()?;
        self.write_object(object)?;
        if !object.is_complex() {
            self.write_eol()?;
        }
        self.write_bytes(b"endobj")?;
        self.write_eol()?;
        Ok(offset)
    }

    /// Write one value. Streams are encoded through their filters first.
    pub fn write_object(&mut self, object: &mut Object) -> Result<()> {
        match object {
            Object::Null => self.write_bytes(b"null"),
            Object::Boolean(b) => self.write_bytes(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => self.write_bytes(i.to_string().as_bytes()),
            Object::Real(f) => self.write_bytes(format_real(*f).as_bytes()),
            Object::String(s) => self.write_string(s),
            Object::Name(n) => self.write_name(n),
            Object::Array(elements) => self.write_array(elements),
            Object::Dictionary(dict) => self.write_dictionary(dict),
            Object::Stream(stream) => self.write_stream(stream),
            Object::Reference(id) => self.write_reference(*id),
        }
    }

    pub fn write_name(&mut self, name: &Name) -> Result<()> {
        let mut out = Vec::with_capacity(name.len() + 1);
        out.push(b'/');
        for &byte in name.as_bytes() {
            if byte.is_ascii_alphanumeric() {
                out.push(byte);
            } else {
                out.push(b'#');
                out.extend_from_slice(format!("{byte:02X}").as_bytes());
            }
        }
        self.write_bytes(&out)
    }

    pub fn write_string(&mut self, string: &PdfString) -> Result<()> {
        if string.is_force_hex() {
            let mut out = Vec::with_capacity(string.len() * 2 + 2);
            out.push(b'<');
            out.extend_from_slice(hex::encode_upper(string.as_bytes()).as_bytes());
            out.push(b'>');
            return self.write_bytes(&out);
        }

        let mut out = Vec::with_capacity(string.len() + 2);
        out.push(b'(');
        for &byte in string.as_bytes() {
            if matches!(
                byte,
                b'\n' | b'\r' | b'\t' | b'\x08' | b'\x0C' | b'(' | b')' | b'\\'
            ) {
                out.push(b'\\');
            }
            out.push(byte);
        }
        out.push(b')');
        self.write_bytes(&out)
    }

    fn write_array(&mut self, elements: &mut [Object]) -> Result<()> {
        self.write_bytes(b"[")?;
        let count = elements.len();
        for (i, element) in elements.iter_mut().enumerate() {
            self.write_object(element)?;
            if i + 1 < count {
                self.write_bytes(b" ")?;
            }
        }
        self.write_bytes(b"]")?;
        self.write_eol()
    }

    pub fn write_dictionary(&mut self, dict: &mut Dictionary) -> Result<()> {
        self.write_bytes(b"<<")?;
        self.write_eol()?;
        for (key, value) in dict.iter_mut() {
            if value.is_null() {
                continue;
            }
            self.write_name(key)?;
            self.write_bytes(b" ")?;
            self.write_object(value)?;
            self.write_eol()?;
        }
        self.write_bytes(b">>")?;
        self.write_eol()
    }

    /// The stream's `/Length` is set to the filtered byte count before the dictionary
    /// is written. The payload stays resident.
    fn write_stream(&mut self, stream: &mut Stream) -> Result<()> {
        let filtered = stream.prepare_for_output()?.to_vec();
        self.write_dictionary(stream.dictionary_mut())?;
        self.write_bytes(b"stream")?;
        self.write_eol()?;
        self.write_bytes(&filtered)?;
        self.write_eol()?;
        self.write_bytes(b"endstream")?;
        self.write_eol()
    }

    fn write_reference(&mut self, id: ObjectId) -> Result<()> {
        self.write_bytes(format!("{} {} R", id.number(), id.generation()).as_bytes())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Shortest decimal form without exponent. Non-finite values have no PDF form.
fn format_real(value: f64) -> String {
    if value.is_finite() {
        format!("{value}")
    } else {
        "0".to_string()
    }
}

/// Serialize a single value into a new buffer.
pub fn serialize(object: &mut Object) -> Result<Vec<u8>> {
    let mut writer = CosWriter::new(Vec::new());
    writer.write_object(object)?;
    Ok(writer.into_inner())
}
