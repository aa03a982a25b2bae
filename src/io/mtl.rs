//! Parser for USGS MTL metadata files (Landsat, EO-1 ALI and Hyperion).
//!
//! The format is a line-oriented subset of ODL:
//!
//! ```text
//! GROUP = L1_METADATA_FILE
//!   GROUP = METADATA_FILE_INFO
//!     ORIGIN = "Image courtesy of the U.S. Geological Survey"
//!     PROCESSING_SOFTWARE_VERSION = "LPGS_2.2.2"
//!   END_GROUP = METADATA_FILE_INFO
//! END_GROUP = L1_METADATA_FILE
//! END
//! ```
//!
//! `OBJECT`/`END_OBJECT` blocks as found in HDF-EOS core metadata are also
//! understood: only their `VALUE` line is kept, stored under the object name.

use crate::metadata::{MetadataDocument, MetadataEntry, MetadataGroup, MetadataValue, ValueKind};
use crate::types::{MtlError, MtlResult};
use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Landsat and EO-1 metadata files end in `_MTL.txt` or `_MTL.TXT`
pub const METADATA_PATTERN: &str = "*_MTL*";

const FINAL: &str = "END";
const GROUP_START: &str = "GROUP";
const GROUP_END: &str = "END_GROUP";
const OBJECT_START: &str = "OBJECT";
const OBJECT_END: &str = "END_OBJECT";
const OBJECT_VALUE: &str = "VALUE";
const ATTRIBUTE_NAME_OBJECT: &str = "ADDITIONALATTRIBUTENAME";
const ATTRIBUTE_VALUE_OBJECT: &str = "PARAMETERVALUE";

/// What to do when a key appears twice in the same group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeyPolicy {
    /// Fail the parse with `DuplicateKey`
    #[default]
    Error,
    /// Later value replaces the earlier one, keeping its position
    Overwrite,
    /// Later value is dropped
    KeepFirst,
}

/// Ordered list of scalar kinds tried on every value
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionPolicy {
    /// Kinds tried in order; the first that parses wins, otherwise the
    /// value is kept as a string
    pub order: Vec<ValueKind>,
    /// Coerce the content of quoted values too (`"09"` becomes 9)
    pub strip_quotes: bool,
}

impl Default for CoercionPolicy {
    fn default() -> Self {
        Self {
            order: vec![
                ValueKind::Integer,
                ValueKind::Float,
                ValueKind::Date,
                ValueKind::DateTime,
                ValueKind::Time,
            ],
            strip_quotes: true,
        }
    }
}

impl CoercionPolicy {
    /// Convert the raw right-hand side of an assignment into a typed value
    pub fn coerce(&self, raw: &str) -> MetadataValue {
        let raw = raw.trim();
        let quoted = raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"');
        let inner = if quoted { &raw[1..raw.len() - 1] } else { raw };

        if quoted && !self.strip_quotes {
            return MetadataValue::String(inner.to_string());
        }

        let candidate = inner.trim();
        for kind in &self.order {
            if let Some(value) = coerce_as(*kind, candidate, inner) {
                return value;
            }
        }

        if !quoted {
            log::trace!("Value {} kept as string", raw);
        }
        MetadataValue::String(inner.to_string())
    }
}

/// `s` is the trimmed candidate; strings keep the unquoted text untrimmed
fn coerce_as(kind: ValueKind, s: &str, inner: &str) -> Option<MetadataValue> {
    match kind {
        ValueKind::Integer => s.parse::<i64>().ok().map(MetadataValue::Integer),
        ValueKind::Float => parse_float(s).map(MetadataValue::Float),
        ValueKind::Date => parse_date(s).map(MetadataValue::Date),
        ValueKind::DateTime => parse_datetime(s).map(MetadataValue::DateTime),
        ValueKind::Time => parse_time(s).map(MetadataValue::Time),
        ValueKind::Boolean => match s.to_ascii_uppercase().as_str() {
            "TRUE" => Some(MetadataValue::Boolean(true)),
            "FALSE" => Some(MetadataValue::Boolean(false)),
            _ => None,
        },
        ValueKind::String => Some(MetadataValue::String(inner.to_string())),
    }
}

const DATE_PATTERN: &str = r"^(\d{4})-(\d{2})-(\d{2})$";
const DATETIME_PATTERN: &str =
    r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?Z?$";
const TIME_PATTERN: &str = r"^(\d{2}):(\d{2}):(\d{2})(?:\.(\d+))?Z?$";
const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

static DATE_RE: OnceLock<Regex> = OnceLock::new();
static DATETIME_RE: OnceLock<Regex> = OnceLock::new();
static TIME_RE: OnceLock<Regex> = OnceLock::new();
static IDENTIFIER_RE: OnceLock<Regex> = OnceLock::new();

/// Compile a pattern on first use and keep it for the lifetime of the process
fn cached_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> MtlResult<&'static Regex> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(pattern).map_err(|e| MtlError::Processing(format!("Regex error: {}", e)))?;
    Ok(cell.get_or_init(|| re))
}

fn parse_float(s: &str) -> Option<f64> {
    // Words like "NaN" or "inf" parse as f64 but are not numbers in MTL files
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    // Integer literals outside i64 stay strings rather than losing digits
    if is_integer_literal(s) && s.parse::<i64>().is_err() {
        return None;
    }
    s.parse::<f64>().ok()
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let caps = cached_regex(&DATE_RE, DATE_PATTERN).ok()?.captures(s)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

/// Fractional seconds of any length, truncated to nanoseconds
fn fraction_to_nanos(digits: Option<&str>) -> Option<u32> {
    let digits = match digits {
        Some(d) => d,
        None => return Some(0),
    };
    let mut padded: String = digits.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let caps = cached_regex(&TIME_RE, TIME_PATTERN).ok()?.captures(s)?;
    NaiveTime::from_hms_nano_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
        fraction_to_nanos(caps.get(4).map(|m| m.as_str()))?,
    )
}

fn parse_datetime(s: &str) -> Option<chrono::NaiveDateTime> {
    let caps = cached_regex(&DATETIME_RE, DATETIME_PATTERN).ok()?.captures(s)?;
    let date = NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )?;
    let time = NaiveTime::from_hms_nano_opt(
        caps[4].parse().ok()?,
        caps[5].parse().ok()?,
        caps[6].parse().ok()?,
        fraction_to_nanos(caps.get(7).map(|m| m.as_str()))?,
    )?;
    Some(date.and_time(time))
}

/// Parser configuration
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub duplicate_keys: DuplicateKeyPolicy,
    pub coercion: CoercionPolicy,
    /// Groups whose own key/value lines are dropped. Objects and groups
    /// nested inside them land in the enclosing group.
    pub ignored_groups: Vec<String>,
    /// Deepest allowed nesting of GROUP and OBJECT blocks. Documents are
    /// dropped, cloned and written recursively, so this bounds stack use.
    pub max_depth: usize,
}

/// USGS files nest three or four levels; HDF-EOS core metadata a few more
pub const DEFAULT_MAX_DEPTH: usize = 256;

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            duplicate_keys: DuplicateKeyPolicy::default(),
            coercion: CoercionPolicy::default(),
            ignored_groups: vec!["INFORMATIONCONTENT".to_string()],
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// One classified, non-blank input line
#[derive(Debug, PartialEq)]
enum Line<'a> {
    GroupStart(&'a str),
    GroupEnd(&'a str),
    ObjectStart(&'a str),
    ObjectEnd(&'a str),
    Assignment { key: &'a str, value: &'a str },
    Final,
}

fn syntax_error(line: usize, text: &str, reason: &str) -> MtlError {
    MtlError::Syntax {
        line,
        text: text.to_string(),
        reason: reason.to_string(),
    }
}

fn classify<'a>(trimmed: &'a str, line_no: usize) -> MtlResult<Line<'a>> {
    if trimmed == FINAL {
        return Ok(Line::Final);
    }

    // Split at the first '=' only, so quoted values may contain '='
    let (key, value) = trimmed
        .split_once('=')
        .ok_or_else(|| syntax_error(line_no, trimmed, "expected KEY = VALUE"))?;
    let key = key.trim();
    let value = value.trim();

    let identifier = cached_regex(&IDENTIFIER_RE, IDENTIFIER_PATTERN)?;
    if !identifier.is_match(key) {
        return Err(syntax_error(line_no, trimmed, "invalid key"));
    }
    if value.is_empty() {
        return Err(syntax_error(line_no, trimmed, "missing value"));
    }

    let block_name = |name: &'a str| -> MtlResult<&'a str> {
        if identifier.is_match(name) {
            Ok(name)
        } else {
            Err(syntax_error(line_no, trimmed, "invalid block name"))
        }
    };

    match key {
        GROUP_START => Ok(Line::GroupStart(block_name(value)?)),
        GROUP_END => Ok(Line::GroupEnd(block_name(value)?)),
        OBJECT_START => Ok(Line::ObjectStart(block_name(value)?)),
        OBJECT_END => Ok(Line::ObjectEnd(block_name(value)?)),
        _ => {
            if value.starts_with('"') && (value.len() < 2 || !value.ends_with('"')) {
                return Err(syntax_error(line_no, trimmed, "unterminated quoted string"));
            }
            Ok(Line::Assignment { key, value })
        }
    }
}

/// An open GROUP or OBJECT block
#[derive(Debug)]
enum Frame {
    Group {
        name: String,
        /// `None` for ignored groups
        content: Option<MetadataGroup>,
    },
    Object {
        name: String,
    },
}

impl Frame {
    fn name(&self) -> &str {
        match self {
            Frame::Group { name, .. } | Frame::Object { name } => name,
        }
    }
}

/// Mutable state of one parse call
struct ParseState<'c> {
    config: &'c ParserConfig,
    root: MetadataGroup,
    stack: Vec<Frame>,
    /// Name announced by an `ADDITIONALATTRIBUTENAME` object, waiting for
    /// its `PARAMETERVALUE`
    pending_attribute: Option<String>,
    finished: bool,
    last_line: (usize, String),
}

impl<'c> ParseState<'c> {
    fn new(config: &'c ParserConfig) -> Self {
        Self {
            config,
            root: MetadataGroup::new(),
            stack: Vec::new(),
            pending_attribute: None,
            finished: false,
            last_line: (0, String::new()),
        }
    }

    /// Group that receives new entries: the innermost group that is not
    /// ignored, or the root
    fn target_mut(&mut self) -> &mut MetadataGroup {
        for frame in self.stack.iter_mut().rev() {
            if let Frame::Group { content: Some(group), .. } = frame {
                return group;
            }
        }
        &mut self.root
    }

    fn insert_entry(&mut self, key: String, entry: MetadataEntry, line_no: usize, text: &str) -> MtlResult<()> {
        let policy = self.config.duplicate_keys;
        let target = self.target_mut();
        if target.contains_key(&key) {
            match policy {
                DuplicateKeyPolicy::Error => {
                    return Err(MtlError::DuplicateKey {
                        line: line_no,
                        text: text.to_string(),
                        key,
                    });
                }
                DuplicateKeyPolicy::Overwrite => {
                    log::debug!("Line {}: overwriting duplicate key {}", line_no, key);
                    target.insert(key, entry);
                }
                DuplicateKeyPolicy::KeepFirst => {
                    log::debug!("Line {}: ignoring duplicate key {}", line_no, key);
                }
            }
        } else {
            target.insert(key, entry);
        }
        Ok(())
    }

    /// Values folded out of OBJECT blocks replace earlier ones: HDF-EOS
    /// metadata repeats containers such as MEASUREDPARAMETERCONTAINER
    fn insert_folded(&mut self, key: String, value: MetadataValue, line_no: usize) {
        if let Some(MetadataEntry::Group(_)) = self.target_mut().get(&key) {
            log::debug!("Line {}: object value {} shadows a group", line_no, key);
        }
        if self.target_mut().insert(key, MetadataEntry::Value(value)).is_some() {
            log::trace!("Line {}: object value replaced an earlier one", line_no);
        }
    }

    fn process(&mut self, line_no: usize, raw: &str) -> MtlResult<()> {
        let trimmed = raw.trim_start_matches('\u{feff}').trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        if self.finished {
            log::warn!(
                "Line {} follows END and is ignored: {}",
                line_no, trimmed
            );
            return Ok(());
        }
        self.last_line = (line_no, trimmed.to_string());

        match classify(trimmed, line_no)? {
            Line::GroupStart(name) => self.open_group(name, line_no, trimmed),
            Line::GroupEnd(name) => self.close_group(name, line_no, trimmed),
            Line::ObjectStart(name) => {
                self.check_depth(line_no, trimmed)?;
                self.stack.push(Frame::Object { name: name.to_string() });
                Ok(())
            }
            Line::ObjectEnd(name) => self.close_object(name, line_no, trimmed),
            Line::Assignment { key, value } => self.assign(key, value, line_no, trimmed),
            Line::Final => {
                if let Some(open) = self.stack.last() {
                    return Err(MtlError::UnterminatedGroup {
                        line: line_no,
                        text: trimmed.to_string(),
                        open: open.name().to_string(),
                    });
                }
                self.finished = true;
                Ok(())
            }
        }
    }

    fn check_depth(&self, line_no: usize, text: &str) -> MtlResult<()> {
        if self.stack.len() >= self.config.max_depth {
            let reason = format!("nesting deeper than {} blocks", self.config.max_depth);
            return Err(syntax_error(line_no, text, &reason));
        }
        Ok(())
    }

    fn open_group(&mut self, name: &str, line_no: usize, text: &str) -> MtlResult<()> {
        self.check_depth(line_no, text)?;
        let ignored = self.config.ignored_groups.iter().any(|g| g == name);
        if !ignored
            && self.config.duplicate_keys == DuplicateKeyPolicy::Error
            && self.target_mut().contains_key(name)
        {
            return Err(MtlError::DuplicateKey {
                line: line_no,
                text: text.to_string(),
                key: name.to_string(),
            });
        }
        self.stack.push(Frame::Group {
            name: name.to_string(),
            content: if ignored { None } else { Some(MetadataGroup::new()) },
        });
        Ok(())
    }

    fn structural_error(&self, line_no: usize, text: &str, found: &str) -> MtlError {
        MtlError::Structural {
            line: line_no,
            text: text.to_string(),
            expected: self.stack.last().map(|f| f.name().to_string()),
            found: found.to_string(),
        }
    }

    fn close_group(&mut self, name: &str, line_no: usize, text: &str) -> MtlResult<()> {
        let closes_top = matches!(self.stack.last(), Some(Frame::Group { name: open, .. }) if open == name);
        if !closes_top {
            return Err(self.structural_error(line_no, text, name));
        }
        if let Some(Frame::Group { name, content: Some(group) }) = self.stack.pop() {
            self.insert_entry(name, MetadataEntry::Group(group), line_no, text)?;
        }
        Ok(())
    }

    fn close_object(&mut self, name: &str, line_no: usize, text: &str) -> MtlResult<()> {
        let closes_top = matches!(self.stack.last(), Some(Frame::Object { name: open }) if open == name);
        if !closes_top {
            return Err(self.structural_error(line_no, text, name));
        }
        self.stack.pop();
        Ok(())
    }

    fn assign(&mut self, key: &str, raw_value: &str, line_no: usize, text: &str) -> MtlResult<()> {
        let object = match self.stack.last() {
            Some(Frame::Group { content: None, name }) => {
                log::trace!("Line {}: dropping {} inside ignored group {}", line_no, key, name);
                return Ok(());
            }
            Some(Frame::Object { name }) => Some(name.clone()),
            _ => None,
        };

        let object = match object {
            None => {
                let value = self.config.coercion.coerce(raw_value);
                return self.insert_entry(key.to_string(), MetadataEntry::Value(value), line_no, text);
            }
            Some(object) => object,
        };

        // Inside an object only the VALUE line carries data
        if key != OBJECT_VALUE {
            return Ok(());
        }
        let value = self.config.coercion.coerce(raw_value);
        if object == ATTRIBUTE_NAME_OBJECT {
            let name = match value {
                MetadataValue::String(s) => s,
                other => other.to_string(),
            };
            if let Some(previous) = self.pending_attribute.replace(name) {
                log::debug!("Additional attribute {} has no parameter value", previous);
            }
            Ok(())
        } else if object == ATTRIBUTE_VALUE_OBJECT {
            let key = self.pending_attribute.take().unwrap_or(object);
            self.insert_folded(key, value, line_no);
            Ok(())
        } else {
            self.insert_folded(object, value, line_no);
            Ok(())
        }
    }

    fn finish(self) -> MtlResult<MetadataDocument> {
        if let Some(open) = self.stack.last() {
            let (line, text) = self.last_line;
            return Err(MtlError::UnterminatedGroup {
                line,
                text,
                open: open.name().to_string(),
            });
        }
        if !self.finished {
            log::warn!("Metadata ends without a final END line");
        }
        Ok(MetadataDocument::new(self.root))
    }
}

/// MTL metadata parser
#[derive(Debug, Clone, Default)]
pub struct MtlParser {
    config: ParserConfig,
}

impl MtlParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parser with the default configuration
    pub fn standard() -> Self {
        Self::new(ParserConfig::default())
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse metadata held in memory
    pub fn parse_str(&self, text: &str) -> MtlResult<MetadataDocument> {
        self.parse_lines(text.lines().map(Ok::<_, MtlError>))
    }

    /// Parse metadata from any buffered reader
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> MtlResult<MetadataDocument> {
        self.parse_lines(reader.lines().map(|l| l.map_err(MtlError::from)))
    }

    /// Parse a metadata file
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> MtlResult<MetadataDocument> {
        let path = path.as_ref();
        log::info!("Reading metadata file: {}", path.display());
        let file = File::open(path)?;
        self.parse_reader(BufReader::new(file))
    }

    /// Parse a metadata file, or the MTL file inside a scene directory
    pub fn parse_location<P: AsRef<Path>>(&self, location: P) -> MtlResult<MetadataDocument> {
        let location = location.as_ref();
        if location.is_dir() {
            let path = find_metadata_file(location)?;
            self.parse_file(path)
        } else {
            self.parse_file(location)
        }
    }

    fn parse_lines<I, S>(&self, lines: I) -> MtlResult<MetadataDocument>
    where
        I: IntoIterator<Item = MtlResult<S>>,
        S: AsRef<str>,
    {
        let mut state = ParseState::new(&self.config);
        for (idx, line) in lines.into_iter().enumerate() {
            let line = line?;
            state.process(idx + 1, line.as_ref())?;
        }
        let document = state.finish()?;
        log::debug!("Parsed metadata with {} top-level entries", document.root().len());
        Ok(document)
    }
}

/// Locate the MTL file inside a scene directory. When several files match,
/// the first in lexical order is used.
pub fn find_metadata_file<P: AsRef<Path>>(dir: P) -> MtlResult<PathBuf> {
    let dir = dir.as_ref();
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let pattern = Path::new(&escaped).join(METADATA_PATTERN);

    let entries = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| MtlError::Processing(format!("Invalid metadata file pattern: {}", e)))?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    candidates.sort();

    if candidates.is_empty() {
        return Err(MtlError::MetadataNotFound(format!(
            "no file matching {} in {}",
            METADATA_PATTERN,
            dir.display()
        )));
    }
    if candidates.len() > 1 {
        log::warn!(
            "{} files in {} match the metadata file pattern. Using {}.",
            candidates.len(),
            dir.display(),
            candidates[0].display()
        );
    }
    Ok(candidates.swap_remove(0))
}

/// Parse a metadata file or scene directory with the default configuration
pub fn parse_metadata<P: AsRef<Path>>(location: P) -> MtlResult<MetadataDocument> {
    MtlParser::standard().parse_location(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> MtlResult<MetadataDocument> {
        MtlParser::standard().parse_str(text)
    }

    fn value(doc: &MetadataDocument, path: &[&str]) -> MetadataValue {
        doc.lookup(path)
            .and_then(MetadataEntry::as_value)
            .cloned()
            .unwrap_or_else(|| panic!("missing {:?}", path))
    }

    #[test]
    fn test_classify_lines() {
        assert_eq!(classify("END", 1).unwrap(), Line::Final);
        assert_eq!(classify("GROUP = A", 1).unwrap(), Line::GroupStart("A"));
        assert_eq!(classify("END_GROUP=A", 1).unwrap(), Line::GroupEnd("A"));
        assert_eq!(classify("OBJECT = B", 1).unwrap(), Line::ObjectStart("B"));
        assert_eq!(
            classify("ORIGIN = \"a = b\"", 1).unwrap(),
            Line::Assignment { key: "ORIGIN", value: "\"a = b\"" }
        );
        assert!(classify("JUST TEXT", 3).is_err());
        assert!(classify("KEY =", 3).is_err());
        assert!(classify("= 5", 3).is_err());
        assert!(classify("GROUP = two words", 3).is_err());
        assert!(classify("NAME = \"unterminated", 3).is_err());
    }

    #[test]
    fn test_coerce_integers() {
        let policy = CoercionPolicy::default();
        assert_eq!(policy.coerce("42"), MetadataValue::Integer(42));
        assert_eq!(policy.coerce("-17"), MetadataValue::Integer(-17));
        assert_eq!(policy.coerce("+3"), MetadataValue::Integer(3));
        assert_eq!(policy.coerce("09"), MetadataValue::Integer(9));
        assert_eq!(policy.coerce("\"09\""), MetadataValue::Integer(9));
    }

    #[test]
    fn test_coerce_floats() {
        let policy = CoercionPolicy::default();
        assert_eq!(policy.coerce("1.5"), MetadataValue::Float(1.5));
        assert_eq!(policy.coerce("-3.25893"), MetadataValue::Float(-3.25893));
        assert_eq!(policy.coerce("6.5179E-04"), MetadataValue::Float(6.5179e-4));
        assert_eq!(policy.coerce("NaN"), MetadataValue::String("NaN".to_string()));
        assert_eq!(policy.coerce("inf"), MetadataValue::String("inf".to_string()));
    }

    #[test]
    fn test_coerce_dates_and_times() {
        let policy = CoercionPolicy::default();
        assert_eq!(
            policy.coerce("2004-07-19"),
            MetadataValue::Date(NaiveDate::from_ymd_opt(2004, 7, 19).unwrap())
        );
        assert_eq!(
            policy.coerce("\"2004-07-19\""),
            MetadataValue::Date(NaiveDate::from_ymd_opt(2004, 7, 19).unwrap())
        );
        let expected = NaiveDate::from_ymd_opt(2014, 5, 14)
            .unwrap()
            .and_hms_opt(20, 16, 11)
            .unwrap();
        assert_eq!(policy.coerce("2014-05-14T20:16:11Z"), MetadataValue::DateTime(expected));
        assert_eq!(
            policy.coerce("\"21:30:51.4316290Z\""),
            MetadataValue::Time(NaiveTime::from_hms_nano_opt(21, 30, 51, 431_629_000).unwrap())
        );
        assert_eq!(
            policy.coerce("12:00:00"),
            MetadataValue::Time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
        );
        // Out-of-range components fall through to strings
        assert_eq!(policy.coerce("2004-13-40"), MetadataValue::String("2004-13-40".to_string()));
    }

    #[test]
    fn test_coerce_strings() {
        let policy = CoercionPolicy::default();
        assert_eq!(policy.coerce("\"LANDSAT_8\""), MetadataValue::from("LANDSAT_8"));
        assert_eq!(policy.coerce("UPPER_LEFT"), MetadataValue::from("UPPER_LEFT"));
        assert_eq!(policy.coerce("\"\""), MetadataValue::from(""));
        assert_eq!(
            policy.coerce("\"0501306252996_00005\""),
            MetadataValue::from("0501306252996_00005")
        );
    }

    #[test]
    fn test_coercion_policy_is_configurable() {
        let keep_quoted = CoercionPolicy {
            strip_quotes: false,
            ..CoercionPolicy::default()
        };
        assert_eq!(keep_quoted.coerce("\"09\""), MetadataValue::from("09"));
        assert_eq!(keep_quoted.coerce("09"), MetadataValue::Integer(9));

        let strings_only = CoercionPolicy {
            order: vec![],
            strip_quotes: true,
        };
        assert_eq!(strings_only.coerce("42"), MetadataValue::from("42"));

        let with_bool = CoercionPolicy {
            order: vec![ValueKind::Boolean, ValueKind::Integer],
            strip_quotes: true,
        };
        assert_eq!(with_bool.coerce("TRUE"), MetadataValue::Boolean(true));
        assert_eq!(with_bool.coerce("false"), MetadataValue::Boolean(false));
        assert_eq!(CoercionPolicy::default().coerce("TRUE"), MetadataValue::from("TRUE"));

        // Float before integer turns integer literals into floats
        let float_first = CoercionPolicy {
            order: vec![ValueKind::Float, ValueKind::Integer],
            strip_quotes: true,
        };
        assert_eq!(float_first.coerce("7"), MetadataValue::Float(7.0));
    }

    #[test]
    fn test_nested_groups() {
        let doc = parse(
            "GROUP = A\n  KEY = 1\n  GROUP = B\n    KEY2 = 2\n  END_GROUP = B\nEND_GROUP = A\nEND\n",
        )
        .unwrap();
        let expected = MetadataGroup::new().with(
            "A",
            MetadataGroup::new()
                .with("KEY", MetadataValue::Integer(1))
                .with("B", MetadataGroup::new().with("KEY2", MetadataValue::Integer(2))),
        );
        assert_eq!(doc.root(), &expected);
    }

    #[test]
    fn test_same_group_name_at_different_depths() {
        let doc = parse(
            "GROUP = A\nGROUP = A\nX = 1\nEND_GROUP = A\nX = 2\nEND_GROUP = A\nEND",
        )
        .unwrap();
        assert_eq!(value(&doc, &["A", "A", "X"]), MetadataValue::Integer(1));
        assert_eq!(value(&doc, &["A", "X"]), MetadataValue::Integer(2));
    }

    #[test]
    fn test_mismatched_end_group() {
        let err = parse("GROUP = A\nKEY = 1\nGROUP = B\nKEY2 = 2\nEND_GROUP = WRONG\nEND_GROUP = A\nEND")
            .unwrap_err();
        match err {
            MtlError::Structural { line, expected, found, text } => {
                assert_eq!(line, 5);
                assert_eq!(expected.as_deref(), Some("B"));
                assert_eq!(found, "WRONG");
                assert_eq!(text, "END_GROUP = WRONG");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_end_group_without_open_group() {
        let err = parse("KEY = 1\nEND_GROUP = A\nEND").unwrap_err();
        assert!(matches!(err, MtlError::Structural { line: 2, expected: None, .. }));
    }

    #[test]
    fn test_unterminated_group() {
        let err = parse("GROUP = A\nGROUP = B\nEND_GROUP = B\nEND\n").unwrap_err();
        match err {
            MtlError::UnterminatedGroup { line, open, .. } => {
                assert_eq!(line, 4);
                assert_eq!(open, "A");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // Input running out with a group open fails the same way
        let err = parse("GROUP = A\nX = 1\n").unwrap_err();
        assert!(matches!(err, MtlError::UnterminatedGroup { line: 2, .. }));
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse("GROUP = A\n\n  this is not valid\nEND_GROUP = A\nEND").unwrap_err();
        match err {
            MtlError::Syntax { line, text, .. } => {
                assert_eq!(line, 3);
                assert_eq!(text, "this is not valid");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_file_without_groups() {
        let doc = parse("A = 1\nB = \"two\"\nEND").unwrap();
        assert_eq!(doc.root().len(), 2);
        assert_eq!(value(&doc, &["B"]), MetadataValue::from("two"));
        assert!(doc.top_group().is_none());
    }

    #[test]
    fn test_missing_final_end_is_accepted() {
        let doc = parse("GROUP = A\nX = 1\nEND_GROUP = A\n").unwrap();
        assert_eq!(value(&doc, &["A", "X"]), MetadataValue::Integer(1));
    }

    #[test]
    fn test_lines_after_end_are_ignored() {
        let doc = parse("GROUP = A\nEND_GROUP = A\nEND\nGARBAGE LINE\n").unwrap();
        assert!(doc.root().group("A").unwrap().is_empty());
    }

    #[test]
    fn test_quoted_value_with_equals() {
        let doc = parse("NOTE = \"a=b = c\"\nEND").unwrap();
        assert_eq!(value(&doc, &["NOTE"]), MetadataValue::from("a=b = c"));
    }

    #[test]
    fn test_duplicate_key_policies() {
        let text = "GROUP = A\nX = 1\nY = 5\nX = 2\nEND_GROUP = A\nEND";

        let err = parse(text).unwrap_err();
        assert!(matches!(err, MtlError::DuplicateKey { line: 4, ref key, .. } if key == "X"));

        let overwrite = MtlParser::new(ParserConfig {
            duplicate_keys: DuplicateKeyPolicy::Overwrite,
            ..ParserConfig::default()
        });
        let doc = overwrite.parse_str(text).unwrap();
        assert_eq!(value(&doc, &["A", "X"]), MetadataValue::Integer(2));
        let keys: Vec<&str> = doc.root().group("A").unwrap().keys().collect();
        assert_eq!(keys, vec!["X", "Y"]);

        let keep_first = MtlParser::new(ParserConfig {
            duplicate_keys: DuplicateKeyPolicy::KeepFirst,
            ..ParserConfig::default()
        });
        let doc = keep_first.parse_str(text).unwrap();
        assert_eq!(value(&doc, &["A", "X"]), MetadataValue::Integer(1));
    }

    #[test]
    fn test_duplicate_group_name() {
        let err = parse("GROUP = A\nEND_GROUP = A\nGROUP = A\nEND_GROUP = A\nEND").unwrap_err();
        assert!(matches!(err, MtlError::DuplicateKey { line: 3, .. }));
    }

    #[test]
    fn test_objects_fold_into_enclosing_group() {
        let text = "\
GROUP = INVENTORYMETADATA
  OBJECT = SHORTNAME
    NUM_VAL = 1
    VALUE = \"MOD021KM\"
  END_OBJECT = SHORTNAME
  OBJECT = ADDITIONALATTRIBUTESCONTAINER
    CLASS = \"1\"
    OBJECT = ADDITIONALATTRIBUTENAME
      CLASS = \"1\"
      VALUE = \"QAPERCENTGOODQUALITY\"
    END_OBJECT = ADDITIONALATTRIBUTENAME
    GROUP = INFORMATIONCONTENT
      CLASS = \"1\"
      OBJECT = PARAMETERVALUE
        VALUE = \"100\"
      END_OBJECT = PARAMETERVALUE
    END_GROUP = INFORMATIONCONTENT
  END_OBJECT = ADDITIONALATTRIBUTESCONTAINER
END_GROUP = INVENTORYMETADATA
END
";
        let doc = parse(text).unwrap();
        let group = doc.root().group("INVENTORYMETADATA").unwrap();
        assert_eq!(group.value("SHORTNAME"), Some(&MetadataValue::from("MOD021KM")));
        assert_eq!(group.value("QAPERCENTGOODQUALITY"), Some(&MetadataValue::Integer(100)));
        assert!(!group.contains_key("CLASS"));
        assert!(!group.contains_key("INFORMATIONCONTENT"));
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_mismatched_end_object() {
        let err = parse("OBJECT = A\nVALUE = 1\nEND_OBJECT = B\nEND").unwrap_err();
        assert!(matches!(err, MtlError::Structural { line: 3, .. }));
        let err = parse("GROUP = A\nOBJECT = B\nEND_GROUP = A\nEND").unwrap_err();
        assert!(matches!(err, MtlError::Structural { line: 3, .. }));
    }

    #[test]
    fn test_repeated_object_containers() {
        let text = "\
GROUP = INVENTORYMETADATA
  GROUP = MEASUREDPARAMETER
    OBJECT = MEASUREDPARAMETERCONTAINER
      CLASS = \"1\"
      OBJECT = PARAMETERNAME
        CLASS = \"1\"
        NUM_VAL = 1
        VALUE = \"EV_1KM_RefSB\"
      END_OBJECT = PARAMETERNAME
      OBJECT = AUTOMATICQUALITYFLAG
        CLASS = \"1\"
        VALUE = \"Passed\"
      END_OBJECT = AUTOMATICQUALITYFLAG
    END_OBJECT = MEASUREDPARAMETERCONTAINER
    OBJECT = MEASUREDPARAMETERCONTAINER
      CLASS = \"2\"
      OBJECT = PARAMETERNAME
        CLASS = \"2\"
        NUM_VAL = 1
        VALUE = \"EV_1KM_Emissive\"
      END_OBJECT = PARAMETERNAME
      OBJECT = AUTOMATICQUALITYFLAG
        CLASS = \"2\"
        VALUE = \"Suspect\"
      END_OBJECT = AUTOMATICQUALITYFLAG
    END_OBJECT = MEASUREDPARAMETERCONTAINER
  END_GROUP = MEASUREDPARAMETER
END_GROUP = INVENTORYMETADATA
END
";
        let doc = parse(text).unwrap();
        let group = doc
            .lookup(&["INVENTORYMETADATA", "MEASUREDPARAMETER"])
            .and_then(MetadataEntry::as_group)
            .unwrap();
        assert_eq!(group.value("PARAMETERNAME"), Some(&MetadataValue::from("EV_1KM_Emissive")));
        assert_eq!(group.value("AUTOMATICQUALITYFLAG"), Some(&MetadataValue::from("Suspect")));
        assert_eq!(group.len(), 2);

        // Plain key/value lines still follow the duplicate key policy
        let err = parse("GROUP = A\nOBJECT = X\nVALUE = 1\nEND_OBJECT = X\nX = 2\nEND_GROUP = A\nEND")
            .unwrap_err();
        assert!(matches!(err, MtlError::DuplicateKey { line: 5, .. }));
    }

    fn nested(depth: usize) -> String {
        let mut text = String::new();
        for i in 0..depth {
            text.push_str(&format!("GROUP = G{}\n", i));
        }
        text.push_str("X = 1\n");
        for i in (0..depth).rev() {
            text.push_str(&format!("END_GROUP = G{}\n", i));
        }
        text.push_str("END\n");
        text
    }

    #[test]
    fn test_nesting_depth_limit() {
        let doc = parse(&nested(DEFAULT_MAX_DEPTH)).unwrap();
        assert_eq!(doc.root().len(), 1);

        let err = parse(&nested(50_000)).unwrap_err();
        match err {
            MtlError::Syntax { line, text, .. } => {
                assert_eq!(line, DEFAULT_MAX_DEPTH + 1);
                assert_eq!(text, format!("GROUP = G{}", DEFAULT_MAX_DEPTH));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let shallow = MtlParser::new(ParserConfig {
            max_depth: 2,
            ..ParserConfig::default()
        });
        assert!(shallow.parse_str(&nested(2)).is_ok());
        let err = shallow.parse_str("GROUP = A\nOBJECT = B\nOBJECT = C\nVALUE = 1\n").unwrap_err();
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_integer_literals_beyond_i64() {
        let policy = CoercionPolicy::default();
        assert_eq!(policy.coerce("9223372036854775807"), MetadataValue::Integer(i64::MAX));
        assert_eq!(
            policy.coerce("9223372036854775808"),
            MetadataValue::from("9223372036854775808")
        );
        assert_eq!(
            policy.coerce("-99999999999999999999"),
            MetadataValue::from("-99999999999999999999")
        );
        // Decimal and exponent forms are still floats
        assert_eq!(policy.coerce("9223372036854775808.0"), MetadataValue::Float(9.223372036854775808e18));
        assert_eq!(policy.coerce("1E30"), MetadataValue::Float(1e30));
    }

    #[test]
    fn test_string_kind_keeps_inner_text() {
        let explicit = CoercionPolicy {
            order: vec![ValueKind::Integer, ValueKind::String, ValueKind::Date],
            strip_quotes: true,
        };
        let fallback = CoercionPolicy {
            order: vec![ValueKind::Integer],
            strip_quotes: true,
        };
        assert_eq!(explicit.coerce("\" padded \""), MetadataValue::from(" padded "));
        assert_eq!(explicit.coerce("\" padded \""), fallback.coerce("\" padded \""));
        // String ends the search
        assert_eq!(explicit.coerce("2004-07-19"), MetadataValue::from("2004-07-19"));
    }
}
