//! Adapter crate: the only place in the engine allowed to name a `dotscope`
//! type. Everything else consumes [`malscan_core::Assembly`].

mod mapping;

use std::path::Path;

use sha2::{Digest, Sha256};

use dotscope::CilObject;
use malscan_core::{Assembly, MalscanError, Module, Result};

const MIN_PE_SIZE: usize = 64;

/// Reads a .NET assembly from disk or memory and projects it onto the
/// engine's own entity model (§3, §6.1).
pub struct IlReader;

impl IlReader {
    pub fn from_path(path: &Path) -> Result<Assembly> {
        let bytes = std::fs::read(path)?;
        let virtual_path = path.to_string_lossy().to_string();
        Self::from_bytes(&bytes, Some(&virtual_path))
    }

    pub fn from_bytes(bytes: &[u8], virtual_path: Option<&str>) -> Result<Assembly> {
        validate_header(bytes)?;

        let sha256 = hex_sha256(bytes);
        let cil = CilObject::from_mem(bytes.to_vec())
            .map_err(|e| MalscanError::Malformed(e.to_string()))?;

        let module: Module = mapping::convert_module(&cil);

        Ok(Assembly {
            virtual_path: virtual_path.unwrap_or("<memory>").to_string(),
            size_bytes: bytes.len() as u64,
            sha256,
            modules: vec![module],
        })
    }
}

fn validate_header(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(MalscanError::InputError("empty input".into()));
    }
    if bytes.len() < MIN_PE_SIZE {
        return Err(MalscanError::InputError(format!(
            "input too small to be a PE image: {} bytes",
            bytes.len()
        )));
    }
    if bytes[0] != b'M' || bytes[1] != b'Z' {
        return Err(MalscanError::InputError(
            "missing MZ signature: not a PE image".into(),
        ));
    }
    Ok(())
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_input() {
        let err = IlReader::from_bytes(&[], None).unwrap_err();
        assert!(matches!(err, MalscanError::InputError(_)));
    }

    #[test]
    fn rejects_truncated_input() {
        let err = IlReader::from_bytes(&[b'M', b'Z', 0, 0], None).unwrap_err();
        assert!(matches!(err, MalscanError::InputError(_)));
    }

    #[test]
    fn rejects_missing_mz_signature() {
        let bytes = vec![0u8; MIN_PE_SIZE];
        let err = IlReader::from_bytes(&bytes, None).unwrap_err();
        assert!(matches!(err, MalscanError::InputError(_)));
    }

    #[test]
    fn sha256_is_deterministic_and_matches_direct_hash() {
        let bytes = b"hello world";
        let a = hex_sha256(bytes);
        let b = hex_sha256(bytes);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
