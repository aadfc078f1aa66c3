// ZIP packaging of generated files

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Bundle `(file name, contents)` pairs into an in-memory ZIP archive.
pub fn zip_files(files: &[(&str, &[u8])]) -> Result<Vec<u8>, String> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in files {
        zip.start_file(*name, options)
            .map_err(|e| format!("Failed to add '{}' to archive: {}", name, e))?;
        zip.write_all(bytes)
            .map_err(|e| format!("Failed to write '{}' to archive: {}", name, e))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| format!("Failed to finish archive: {}", e))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn archive_holds_every_file() {
        let bytes = zip_files(&[
            ("ESTOQUE FISICO (analisado).xlsx", b"fisico".as_slice()),
            ("ESTOQUE SAP (analisado).xlsx", b"sap".as_slice()),
        ])
        .unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("ESTOQUE SAP (analisado).xlsx")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "sap");
    }
}
