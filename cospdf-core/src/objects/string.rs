/// A PDF string. `force_hex` selects the `<...>` form when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PdfString {
    bytes: Vec<u8>,
    force_hex: bool,
}

impl PdfString {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            force_hex: false,
        }
    }

    pub fn hex(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            force_hex: true,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn is_force_hex(&self) -> bool {
        self.force_hex
    }

    pub fn set_force_hex(&mut self, force_hex: bool) {
        self.force_hex = force_hex;
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
