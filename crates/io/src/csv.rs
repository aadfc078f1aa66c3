// CSV/TSV import

use std::io::Read;
use std::path::Path;

use stockrecon_recon::{CellValue, Sheet};

/// Characters Excel rejects in sheet names.
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

pub fn import(path: &Path) -> Result<Sheet, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&sheet_name_for(path), &content, delimiter)
}

pub fn import_tsv(path: &Path) -> Result<Sheet, String> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&sheet_name_for(path), &content, b'\t')
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // consistent lines * field count; wider wins ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel on Windows exports CSV as Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Parse delimited text into a sheet. Numeric fields become numbers so
/// quantity columns aggregate the same way as spreadsheet input.
fn import_from_string(name: &str, content: &str, delimiter: u8) -> Result<Sheet, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut sheet = Sheet::new(name);
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        sheet.push_row(record.iter().map(parse_field).collect());
    }
    Ok(sheet)
}

/// Numbers are kept only when they read back unchanged; lots like `24E05`,
/// `1.50` or `0042` and codes too long for an `f64` stay text.
fn parse_field(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Empty;
    }
    let trimmed = field.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => {
            let number = CellValue::Number(n);
            if number.as_text() == trimmed {
                number
            } else {
                CellValue::text(field)
            }
        }
        _ => CellValue::text(field),
    }
}

/// Sheet name for a delimited file: its stem, cleaned up for Excel.
fn sheet_name_for(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("Sheet1");
    let cleaned: String = stem
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(31)
        .collect();
    let cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() { "Sheet1".to_string() } else { cleaned }
}
