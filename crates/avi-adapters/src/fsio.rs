//! Escritura atómica de salidas y digests de contenido.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::AviError;

/// Escribe `bytes` en `path` vía fichero temporal en el mismo directorio y
/// rename; un fallo a mitad no deja una salida parcial.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AviError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| AviError::io(dir, e))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| AviError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| AviError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| AviError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| AviError::io(path, e.error))?;
    Ok(())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn read(path: &Path) -> Result<Vec<u8>, AviError> {
    fs::read(path).map_err(|e| AviError::io(path, e))
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out.vot");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second");
        // no quedan temporales junto a la salida
        assert_eq!(fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(sha256_hex(b"abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }
}
