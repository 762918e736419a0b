//! N-Triples line parser.
//!
//! Parses a single `<subject> <predicate> object .` line into its three
//! components. `object` is returned verbatim as either a `<uri>` or a
//! `"literal"` (with its surrounding quotes), letting the caller decide
//! how to intern it into the vocabulary.

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

fn skip_whitespace(line: &str, mut i: usize) -> usize {
    let bytes = line.as_bytes();
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

fn parse_uri(line: &str, i: usize) -> Result<(String, usize), EngineError> {
    let bytes = line.as_bytes();
    if i >= bytes.len() || bytes[i] != b'<' {
        return Err(EngineError::BadInput(format!("illegal URI in: {line}")));
    }
    let mut j = i + 1;
    while j < bytes.len() && bytes[j] != b'\t' && bytes[j] != b' ' {
        j += 1;
    }
    if j == 0 || bytes[j - 1] != b'>' {
        return Err(EngineError::BadInput(format!("illegal URI in: {line}")));
    }
    Ok((line[i..j].to_string(), j))
}

fn parse_object(line: &str, i: usize) -> Result<(String, usize), EngineError> {
    let bytes = line.as_bytes();
    if i >= bytes.len() {
        return Err(EngineError::BadInput(format!("missing object in: {line}")));
    }
    if bytes[i] == b'<' {
        let j = match line[i + 1..].find('>') {
            Some(offset) => i + 1 + offset + 1,
            None => return Err(EngineError::BadInput(format!("illegal URI in: {line}"))),
        };
        Ok((line[i..j].to_string(), j))
    } else {
        let mut j = match line[i..].find('"') {
            Some(offset) => i + offset,
            None => return Err(EngineError::BadInput(format!("illegal literal in: {line}"))),
        };
        let mut escape = false;
        let mut closed = false;
        j += 1;
        while j < bytes.len() {
            let c = bytes[j];
            if !escape && c == b'\\' {
                escape = true;
            } else if !escape && c == b'"' {
                j += 1;
                closed = true;
                break;
            } else {
                escape = false;
            }
            j += 1;
        }
        if !closed {
            return Err(EngineError::BadInput(format!("illegal literal in: {line}")));
        }
        while j < bytes.len() && bytes[j] != b' ' && bytes[j] != b'\t' {
            j += 1;
        }
        Ok((line[i..j].to_string(), j))
    }
}

/// Parses one N-Triples data line. The trailing `.` and any whitespace
/// after the object are not validated beyond requiring the object be
/// followed by at least one space or tab.
pub fn parse_ntriples_line(line: &str) -> Result<RawTriple, EngineError> {
    let i = skip_whitespace(line, 0);
    if i >= line.len() {
        return Err(EngineError::BadInput("empty line".to_string()));
    }
    let (subject, j) = parse_uri(line, i)?;

    let i = skip_whitespace(line, j);
    let (predicate, j) = parse_uri(line, i)?;

    let i = skip_whitespace(line, j);
    let (object, j) = parse_object(line, i)?;

    match line.as_bytes().get(j) {
        Some(b' ') | Some(b'\t') => Ok(RawTriple { subject, predicate, object }),
        _ => Err(EngineError::BadInput(format!(
            "object not followed by space in: {line}"
        ))),
    }
}
