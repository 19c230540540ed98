use std::{
    fs::File,
    io::{self, BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Width assumed for data references that do not carry a length.
const DATA_ACCESS_BYTES: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
    InstructionFetch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub kind: AccessKind,
    pub address: u32,
    pub length: u32,
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("unable to open trace file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read trace line {line}")]
    Io {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: {reason}")]
    Format { line: usize, reason: String },
}

/// Lazily tokenizes a trace, one record at a time in file order.
///
/// Understands three line shapes:
/// - `EIP (LL): HHHHHHHH ...` instruction fetch of `LL` bytes
/// - `dstM: HHHHHHHH DDDDDDDD srcM: HHHHHHHH DDDDDDDD` write then read, zero addresses skipped
/// - `R <addr>` / `W <addr>`
///
/// Blank lines and `#` comments are ignored.
pub struct TraceReader<R> {
    lines: Lines<R>,
    line_no: usize,
    pending: Option<TraceRecord>,
}

impl TraceReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TraceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            pending: None,
        }
    }

    fn parse_line(&mut self, line: &str) -> Result<Option<TraceRecord>, TraceError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        match tokens[0] {
            "EIP" => {
                let length_token = tokens
                    .get(1)
                    .ok_or_else(|| self.error("EIP line missing length"))?;
                let length = parse_length(length_token).ok_or_else(|| {
                    self.error(format!("invalid length token '{length_token}'"))
                })?;
                let address = self.address_at(&tokens, 2)?;
                Ok(Some(TraceRecord {
                    kind: AccessKind::InstructionFetch,
                    address,
                    length,
                }))
            }
            "dstM:" => {
                if tokens.get(3) != Some(&"srcM:") {
                    return Err(self.error("data line missing 'srcM:'"));
                }
                let dst = self.address_at(&tokens, 1)?;
                let src = self.address_at(&tokens, 4)?;
                let write = (dst != 0).then_some(data_record(AccessKind::Write, dst));
                let read = (src != 0).then_some(data_record(AccessKind::Read, src));
                match (write, read) {
                    (Some(write), read) => {
                        self.pending = read;
                        Ok(Some(write))
                    }
                    (None, read) => Ok(read),
                }
            }
            op => {
                let kind = match op.to_ascii_lowercase().as_str() {
                    "r" => AccessKind::Read,
                    "w" => AccessKind::Write,
                    _ => return Err(self.error(format!("invalid op '{op}'"))),
                };
                if tokens.len() > 2 {
                    return Err(self.error("extra tokens"));
                }
                let address = self.address_at(&tokens, 1)?;
                Ok(Some(data_record(kind, address)))
            }
        }
    }

    fn address_at(&self, tokens: &[&str], idx: usize) -> Result<u32, TraceError> {
        let token = tokens
            .get(idx)
            .ok_or_else(|| self.error("missing address"))?;
        parse_address(token)
            .ok_or_else(|| self.error(format!("invalid address literal '{token}'")))
    }

    fn error(&self, reason: impl Into<String>) -> TraceError {
        TraceError::Format {
            line: self.line_no,
            reason: reason.into(),
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.pending.take() {
            return Some(Ok(record));
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(TraceError::Io {
                        line: self.line_no + 1,
                        source,
                    }));
                }
            };
            self.line_no += 1;
            match self.parse_line(&line) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Display name for a trace: its file name, or the whole path if it has none.
pub fn trace_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn data_record(kind: AccessKind, address: u32) -> TraceRecord {
    TraceRecord {
        kind,
        address,
        length: DATA_ACCESS_BYTES,
    }
}

fn parse_length(token: &str) -> Option<u32> {
    token
        .strip_prefix('(')?
        .strip_suffix("):")?
        .parse()
        .ok()
}

fn parse_address(token: &str) -> Option<u32> {
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn read_all(text: &str) -> Vec<Result<TraceRecord, TraceError>> {
        TraceReader::new(Cursor::new(text)).collect()
    }

    fn records(text: &str) -> Vec<TraceRecord> {
        read_all(text).into_iter().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn parses_eip_lines() {
        let recs = records("EIP (04): 7c809767 8b ff 55 8b\n");
        assert_eq!(
            recs,
            vec![TraceRecord {
                kind: AccessKind::InstructionFetch,
                address: 0x7c80_9767,
                length: 4
            }]
        );
    }

    #[test]
    fn parses_data_lines_and_skips_zero_addresses() {
        let text = "\
dstM: 00000000 --------    srcM: 00000000 --------
dstM: 0012ff44 00000000    srcM: 7ffdf034 0012ffb0
dstM: 00000000 --------    srcM: 0012ff48 7c80976b
";
        let recs = records(text);
        let summary: Vec<_> = recs.iter().map(|r| (r.kind, r.address)).collect();
        assert_eq!(
            summary,
            vec![
                (AccessKind::Write, 0x0012_ff44),
                (AccessKind::Read, 0x7ffd_f034),
                (AccessKind::Read, 0x0012_ff48),
            ]
        );
    }

    #[test]
    fn parses_simple_ops_and_skips_comments() {
        let text = "# header\n\nR 0x1000\nw 1010\n";
        let recs = records(text);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].kind, AccessKind::Read);
        assert_eq!(recs[0].address, 0x1000);
        assert_eq!(recs[1].kind, AccessKind::Write);
        assert_eq!(recs[1].address, 0x1010);
    }

    #[test]
    fn interleaved_trace_keeps_file_order() {
        let text = "\
EIP (02): 00401000 55
dstM: 0012ff00 00000000    srcM: 00000000 --------
EIP (03): 00401002 8b ec
";
        let addrs: Vec<_> = records(text).iter().map(|r| r.address).collect();
        assert_eq!(addrs, vec![0x0040_1000, 0x0012_ff00, 0x0040_1002]);
    }

    #[test]
    fn address_wider_than_32_bits_is_rejected() {
        let results = read_all("R 0x1000\nR 0x100000000\n");
        assert!(results[0].is_ok());
        match &results[1] {
            Err(TraceError::Format { line, reason }) => {
                assert_eq!(*line, 2);
                assert!(reason.contains("invalid address literal"));
            }
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_lines_report_line_numbers() {
        let cases = [
            ("EIP 7c809767\n", "invalid length token"),
            ("EIP (04):\n", "missing address"),
            ("dstM: 00000000 --------\n", "srcM"),
            ("X 1000\n", "invalid op"),
            ("R 1000 extra\n", "extra tokens"),
            ("R zzzz\n", "invalid address literal"),
        ];
        for (text, expected) in cases {
            let err = read_all(&format!("# comment\n{text}"))
                .into_iter()
                .find_map(Result::err)
                .unwrap();
            match err {
                TraceError::Format { line, reason } => {
                    assert_eq!(line, 2, "{text}");
                    assert!(reason.contains(expected), "{reason} for {text}");
                }
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn short_addresses_are_zero_extended() {
        assert_eq!(records("R 1f\n")[0].address, 0x0000_001f);
    }

    #[test]
    fn opening_missing_file_fails() {
        let err = TraceReader::open("does/not/exist.trc").err().unwrap();
        assert!(matches!(err, TraceError::Open { .. }));
    }

    #[test]
    fn trace_name_uses_file_name() {
        assert_eq!(trace_name(Path::new("traces/a.trc")), "a.trc");
    }
}
