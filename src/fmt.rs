use crate::Byte;

fn is_white_space(byte: Byte) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | 0x0C)
}

/// Renders a byte slice for diagnostics: printable ASCII and white space pass
/// through, everything else becomes a `\xHH` escape.
pub(crate) fn debug_bytes(bytes: &[Byte]) -> String {
    let mut result = String::new();
    for &byte in bytes {
        if byte.is_ascii_graphic() || is_white_space(byte) {
            result.push(char::from(byte));
        } else {
            result.push_str(&format!("\\x{:02X}", byte));
        }
    }
    result
}
