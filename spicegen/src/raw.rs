//! Reader for SPICE raw waveform files.
//!
//! Supports the real-valued transient output written by LTspice (UTF-16LE
//! header, `f64` time with `f32` traces) and by SPICE3/ngspice (ASCII header,
//! all `f64`), in both `Binary:` and `Values:` forms.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RawError {
    #[error("RAW file not found: {}", .0.display())]
    NotFound(std::path::PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed RAW header: {0}")]
    Header(String),
    #[error("Unsupported RAW data: {0}")]
    Unsupported(String),
    #[error("RAW data truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("Malformed RAW values: {0}")]
    Values(String),
    #[error("Signal '{0}' not found in RAW file")]
    UnknownSignal(String),
    #[error("RAW file has no time axis (plot: {0})")]
    NoTimeAxis(String),
}

/// Read access to simulated waveforms.
pub trait WaveformSource {
    /// Names of every stored trace, including the axis.
    fn signal_names(&self) -> Vec<&str>;

    /// Sample times of a transient analysis.
    fn time_axis(&self) -> Result<&[f64], RawError>;

    /// Samples of the named trace. Lookup is case-insensitive.
    fn waveform(&self, name: &str) -> Result<&[f64], RawError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub index: usize,
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Utf16Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFormat {
    Binary,
    Ascii,
}

/// A parsed raw file held in memory.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub title: String,
    pub plotname: String,
    pub flags: Vec<String>,
    pub command: String,
    pub variables: Vec<Variable>,
    columns: Vec<Vec<f64>>,
    by_name: HashMap<String, usize>,
}

impl RawFile {
    pub fn open(path: &Path) -> Result<Self, RawError> {
        if !path.exists() {
            return Err(RawError::NotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, RawError> {
        let (encoding, start) = detect_encoding(bytes);
        let (header_text, format, data_start) = split_header(&bytes[start..], encoding)?;
        let header = Header::parse(&header_text)?;

        if header.flags.iter().any(|f| f == "complex") {
            return Err(RawError::Unsupported(
                "complex data (AC analysis) is not supported".to_string(),
            ));
        }
        if header.flags.iter().any(|f| f == "fastaccess") {
            return Err(RawError::Unsupported(
                "FastAccess layout is not supported".to_string(),
            ));
        }

        let data = &bytes[start + data_start..];
        let columns = match format {
            DataFormat::Binary => read_binary(&header, data)?,
            DataFormat::Ascii => read_ascii(&header, &decode(data, encoding))?,
        };

        let by_name = header
            .variables
            .iter()
            .map(|v| (v.name.to_lowercase(), v.index))
            .collect();

        Ok(Self {
            title: header.title,
            plotname: header.plotname,
            flags: header.flags,
            command: header.command,
            variables: header.variables,
            columns,
            by_name,
        })
    }

    pub fn point_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }
}

impl WaveformSource for RawFile {
    fn signal_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    fn time_axis(&self) -> Result<&[f64], RawError> {
        match self.variables.first() {
            Some(v) if v.kind.eq_ignore_ascii_case("time") || v.name.eq_ignore_ascii_case("time") => {
                Ok(self.columns[0].as_slice())
            }
            _ => Err(RawError::NoTimeAxis(self.plotname.clone())),
        }
    }

    fn waveform(&self, name: &str) -> Result<&[f64], RawError> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&i| self.columns[i].as_slice())
            .ok_or_else(|| RawError::UnknownSignal(name.to_string()))
    }
}

/// Min, max and final value of one trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSummary {
    pub name: String,
    pub points: usize,
    pub min: f64,
    pub max: f64,
    pub final_value: f64,
}

pub fn summarize<W: WaveformSource + ?Sized>(source: &W, name: &str) -> Result<SignalSummary, RawError> {
    let samples = source.waveform(name)?;
    let (min, max) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
    Ok(SignalSummary {
        name: name.to_string(),
        points: samples.len(),
        min,
        max,
        final_value: samples.last().copied().unwrap_or(f64::NAN),
    })
}

fn detect_encoding(bytes: &[u8]) -> (Encoding, usize) {
    match bytes {
        [0xFF, 0xFE, ..] => (Encoding::Utf16Le, 2),
        [_, 0, ..] => (Encoding::Utf16Le, 0),
        _ => (Encoding::Utf8, 0),
    }
}

fn decode(bytes: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        Encoding::Utf16Le => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
    }
}

/// Decode the header up to and including the `Binary:`/`Values:` line.
/// Returns the header text, the data format and the byte offset of the data.
fn split_header(bytes: &[u8], encoding: Encoding) -> Result<(String, DataFormat, usize), RawError> {
    let step = match encoding {
        Encoding::Utf8 => 1,
        Encoding::Utf16Le => 2,
    };

    let mut header = String::new();
    let mut line = String::new();
    let mut pos = 0;
    while pos + step <= bytes.len() {
        let ch = match encoding {
            Encoding::Utf8 => bytes[pos] as char,
            Encoding::Utf16Le => {
                let unit = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
                char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
        };
        pos += step;

        if ch != '\n' {
            line.push(ch);
            continue;
        }

        let format = match line.trim() {
            "Binary:" => Some(DataFormat::Binary),
            "Values:" => Some(DataFormat::Ascii),
            _ => None,
        };
        header.push_str(&line);
        header.push('\n');
        line.clear();
        if let Some(format) = format {
            return Ok((header, format, pos));
        }
    }

    Err(RawError::Header("missing Binary: or Values: section".to_string()))
}

struct Header {
    title: String,
    plotname: String,
    flags: Vec<String>,
    command: String,
    n_points: usize,
    variables: Vec<Variable>,
}

impl Header {
    fn parse(text: &str) -> Result<Self, RawError> {
        let mut fields: HashMap<String, String> = HashMap::new();
        let mut variables = Vec::new();
        let mut in_variables = false;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "Variables:" {
                in_variables = true;
                continue;
            }
            if trimmed == "Binary:" || trimmed == "Values:" {
                break;
            }
            if in_variables && line.starts_with(|c: char| c.is_whitespace()) {
                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                if parts.len() < 3 {
                    return Err(RawError::Header(format!("bad variable line: {:?}", trimmed)));
                }
                let index = parts[0]
                    .parse()
                    .map_err(|_| RawError::Header(format!("bad variable index: {:?}", parts[0])))?;
                variables.push(Variable {
                    index,
                    name: parts[1].to_string(),
                    kind: parts[2].to_string(),
                });
                continue;
            }
            in_variables = false;
            if let Some((key, value)) = trimmed.split_once(':') {
                fields.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
        }

        let count = |key: &str| -> Result<usize, RawError> {
            fields
                .get(key)
                .ok_or_else(|| RawError::Header(format!("missing '{}'", key)))?
                .parse()
                .map_err(|_| RawError::Header(format!("invalid '{}'", key)))
        };
        let n_vars = count("no. variables")?;
        let n_points = count("no. points")?;

        if n_vars == 0 || variables.len() != n_vars {
            return Err(RawError::Header(format!(
                "declared {} variables but listed {}",
                n_vars,
                variables.len()
            )));
        }
        if variables.iter().enumerate().any(|(i, v)| v.index != i) {
            return Err(RawError::Header("variable indices are not sequential".to_string()));
        }

        let field = |key: &str| fields.get(key).cloned().unwrap_or_default();
        Ok(Self {
            title: field("title"),
            plotname: field("plotname"),
            flags: field("flags")
                .split_whitespace()
                .map(str::to_lowercase)
                .collect(),
            command: field("command"),
            n_points,
            variables,
        })
    }

    /// LTspice stores traces as `f32` unless the `double` flag is set;
    /// other writers store every value as `f64`.
    fn traces_are_double(&self) -> bool {
        self.flags.iter().any(|f| f == "double") || !self.command.to_lowercase().contains("ltspice")
    }
}

fn read_binary(header: &Header, data: &[u8]) -> Result<Vec<Vec<f64>>, RawError> {
    let n_vars = header.variables.len();
    let trace_size = if header.traces_are_double() { 8 } else { 4 };
    let point_size = 8 + (n_vars - 1) * trace_size;
    let expected = header.n_points.checked_mul(point_size).ok_or_else(|| {
        RawError::Header(format!("point count {} is out of range", header.n_points))
    })?;
    if data.len() < expected {
        return Err(RawError::Truncated {
            expected,
            found: data.len(),
        });
    }

    let mut columns = vec![Vec::with_capacity(header.n_points); n_vars];
    for point in data[..expected].chunks_exact(point_size) {
        let mut time = [0u8; 8];
        time.copy_from_slice(&point[..8]);
        // LTspice marks compressed points with a negative time value.
        columns[0].push(f64::from_le_bytes(time).abs());

        for (column, raw) in columns[1..].iter_mut().zip(point[8..].chunks_exact(trace_size)) {
            let value = if trace_size == 8 {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(raw);
                f64::from_le_bytes(buf)
            } else {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(raw);
                f64::from(f32::from_le_bytes(buf))
            };
            column.push(value);
        }
    }
    Ok(columns)
}

fn read_ascii(header: &Header, text: &str) -> Result<Vec<Vec<f64>>, RawError> {
    let n_vars = header.variables.len();
    // Each point takes at least n_vars + 1 tokens, so the text bounds the count.
    let capacity = header.n_points.min(text.len() / (n_vars + 1));
    let mut columns = vec![Vec::with_capacity(capacity); n_vars];
    let mut tokens = text.split_whitespace();

    for point in 0..header.n_points {
        let index = tokens
            .next()
            .ok_or_else(|| RawError::Values(format!("missing point {}", point)))?;
        if index.parse::<usize>().ok() != Some(point) {
            return Err(RawError::Values(format!(
                "expected point index {}, found {:?}",
                point, index
            )));
        }
        for (var, column) in columns.iter_mut().enumerate() {
            let token = tokens
                .next()
                .ok_or_else(|| RawError::Values(format!("point {} is missing variable {}", point, var)))?;
            let value: f64 = token
                .parse()
                .map_err(|_| RawError::Values(format!("invalid number {:?} at point {}", token, point)))?;
            column.push(if var == 0 { value.abs() } else { value });
        }
    }
    Ok(columns)
}
