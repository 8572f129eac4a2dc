//! `chunkwatch unseal`: decrypt a sealed payload back to CSV.

use std::io::Write;

fn unseal_file(key: &str, input: &str) -> Result<Vec<u8>, String> {
    let sealed = std::fs::read(input).map_err(|e| format!("cannot read {input}: {e}"))?;
    // Tolerate a trailing newline from copy/paste or `echo`.
    let trimmed = sealed.trim_ascii_end();
    chunkwatch_core::unseal(key.trim(), trimmed).map_err(|e| e.to_string())
}

pub fn run(key: &str, input: &str, output: Option<&str>) {
    let csv = match unseal_file(key, input) {
        Ok(csv) => csv,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let written = match output {
        Some(path) => std::fs::write(path, &csv).map(|_| {
            eprintln!("Wrote {} bytes of CSV to {path}", csv.len());
        }),
        None => std::io::stdout().write_all(&csv),
    };
    if let Err(e) = written {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkwatch_core::{
        Chunk, ChunkProcessor, ResultSealer, ResultSet, SealedResult, SquareProcessor,
    };

    fn sealed_fixture() -> SealedResult {
        let chunk = SquareProcessor
            .process(&Chunk::new(0, vec![Some(1.5), None, Some(-2.0)]))
            .unwrap();
        let set = ResultSet::concat(vec![chunk]);
        ResultSealer::new().seal_set(&set).unwrap()
    }

    #[test]
    fn unseals_file_with_trailing_newline() {
        let sealed = sealed_fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sealed.bin");
        let mut bytes = sealed.ciphertext().to_vec();
        bytes.push(b'\n');
        std::fs::write(&path, bytes).unwrap();

        let csv = unseal_file(sealed.key().expose(), path.to_str().unwrap()).unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert_eq!(text, "value,processed\n1.5,2.25\n-2,4\n");
    }

    #[test]
    fn wrong_key_is_an_error() {
        let sealed = sealed_fixture();
        let other = sealed_fixture();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sealed.bin");
        std::fs::write(&path, sealed.ciphertext()).unwrap();

        assert!(unseal_file(other.key().expose(), path.to_str().unwrap()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = unseal_file("k", "/nonexistent/sealed.bin").unwrap_err();
        assert!(err.contains("cannot read"));
    }
}
