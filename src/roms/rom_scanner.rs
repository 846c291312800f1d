//! Heuristic detection of known ROM-format header prefixes (§3: "optional detected ROM-header
//! descriptor"). Recognises a handful of well-known copier/emulator header signatures by magic
//! bytes, falling back to a size-modulo heuristic for headers that have no fixed signature.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::file::HeaderInfo;

/// (name, signature offset, hex-encoded signature, header size in bytes)
const KNOWN_HEADERS: &[(&str, usize, &str, u64)] = &[
    // NES (iNES): "NES\x1A" at offset 0, 16-byte header.
    ("NES", 0, "4E45531A", 16),
    // Lynx: "LYNX" at offset 0, 64-byte header.
    ("LNX", 0, "4C594E58", 64),
];

/// Detects a ROM-format header by signature first, falling back to a size-modulo heuristic
/// (common copier headers are 128/256/512 bytes and leave the body a multiple of 512).
pub fn detect_header(path: &Path) -> anyhow::Result<Option<HeaderInfo>> {
    let meta = fs::metadata(path)?;
    let size = meta.len();

    let mut file = fs::File::open(path)?;
    let mut buf = vec![0u8; 1024.min(size as usize)];
    file.read_exact(&mut buf)?;

    for (_name, offset, hexpat, header_size) in KNOWN_HEADERS {
        let needed = offset + hexpat.len() / 2;
        if buf.len() >= needed {
            let slice = &buf[*offset..needed];
            let hex: String = slice.iter().map(|b| format!("{b:02X}")).collect();
            if hex == hexpat.to_uppercase() {
                return Ok(Some(HeaderInfo { size: *header_size }));
            }
        }
    }

    for &candidate in &[128u64, 256, 512] {
        if size > candidate && (size % 512 == 0 || (size - candidate) % 512 == 0) {
            return Ok(Some(HeaderInfo { size: candidate }));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn detects_nes_header_by_signature() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&[0x4E, 0x45, 0x53, 0x1A]).unwrap();
        f.write_all(&vec![0u8; 100]).unwrap();
        let header = detect_header(f.path()).unwrap();
        assert_eq!(header, Some(HeaderInfo { size: 16 }));
    }

    #[test]
    fn detects_header_by_size_modulo() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&vec![0u8; 1024]).unwrap();
        let header = detect_header(f.path()).unwrap();
        assert!(header.is_some());
    }

    #[test]
    fn no_header_small_file() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(&vec![0u8; 300]).unwrap();
        let header = detect_header(f.path()).unwrap();
        assert_eq!(header, None);
    }
}
