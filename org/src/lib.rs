//! Org outline library: a typed tree for org-mode notes and tasks, a parser and
//! its printing inverse, a property model with inheritance, and a linter that
//! replays task-state history.
//!
//! Every entry point takes the `Config` explicitly; nothing here reads global state.

pub mod core {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};
    use std::path::{Path, PathBuf};

    /* ------------------------------ Aggregates ------------------------------ */

    /// Every parsed file of one run, keyed by path. Only cross-file checks need this.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct OrgData {
        pub files: IndexMap<PathBuf, OrgFile>,
    }

    impl OrgData {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&mut self, file: OrgFile) {
            self.files.insert(file.path.clone(), file);
        }

        /// Pre-order walk over every entry of every file, files in insertion order.
        pub fn all_entries(&self) -> Vec<&Entry> {
            let mut out = Vec::new();
            for file in self.files.values() {
                for entry in &file.entries {
                    entry.walk(&mut out);
                }
            }
            out
        }
    }

    impl FromIterator<OrgFile> for OrgData {
        fn from_iter<I: IntoIterator<Item = OrgFile>>(iter: I) -> Self {
            let mut data = OrgData::new();
            for file in iter {
                data.insert(file);
            }
            data
        }
    }

    /// Aggregate root: a single `.org` file.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct OrgFile {
        pub path: PathBuf,
        #[serde(default)]
        pub header: Header,
        /// Top-level entries in source order.
        #[serde(default)]
        pub entries: Vec<Entry>,
    }

    impl OrgFile {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                header: Header::default(),
                entries: vec![],
            }
        }

        pub fn all_entries(&self) -> Vec<&Entry> {
            let mut out = Vec::new();
            for entry in &self.entries {
                entry.walk(&mut out);
            }
            out
        }
    }

    /// Everything before the first headline.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Header {
        /// `:PROPERTIES:` drawer; `Some(vec![])` for an empty drawer.
        pub properties_drawer: Option<Vec<Property>>,
        /// `#+KEY: value` lines in order.
        #[serde(default)]
        pub file_properties: Vec<Property>,
        /// Remaining raw lines.
        #[serde(default)]
        pub preamble: Vec<String>,
    }

    /// Source provenance: 1-based line and column.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Loc {
        pub file: PathBuf,
        pub line: usize,
        pub column: usize,
    }

    impl Loc {
        pub fn new(file: &Path, line: usize, column: usize) -> Self {
            Self {
                file: file.to_path_buf(),
                line,
                column,
            }
        }
    }

    impl std::fmt::Display for Loc {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
        }
    }

    /* ------------------------------- Entries ------------------------------- */

    /// An outline node: headline, planning, drawers, log, body and children.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Entry {
        pub loc: Loc,
        /// Number of leading stars; children are always one deeper.
        pub depth: usize,
        pub keyword: Option<Keyword>,
        pub priority: Option<char>,
        /// `(context)` marker leading the title.
        pub context: Option<String>,
        pub title: String,
        /// `{locator}` marker trailing the title.
        pub locator: Option<String>,
        #[serde(default)]
        pub tags: Vec<Tag>,
        #[serde(default)]
        pub stamps: Vec<Stamp>,
        #[serde(default)]
        pub properties: Vec<Property>,
        /// Written with a `:PROPERTIES:` drawer, which may be empty.
        #[serde(default)]
        pub drawer: bool,
        #[serde(default)]
        pub log: Vec<LogEntry>,
        #[serde(default)]
        pub body: Body,
        #[serde(default)]
        pub children: Vec<Entry>,
    }

    impl Entry {
        pub fn new(loc: Loc, depth: usize, title: impl Into<String>) -> Self {
            Self {
                loc,
                depth,
                keyword: None,
                priority: None,
                context: None,
                title: title.into(),
                locator: None,
                tags: vec![],
                stamps: vec![],
                properties: vec![],
                drawer: false,
                log: vec![],
                body: Body::default(),
                children: vec![],
            }
        }

        /// Depth-first, pre-order collection of this entry and its descendants.
        pub fn walk<'a>(&'a self, out: &mut Vec<&'a Entry>) {
            out.push(self);
            for child in &self.children {
                child.walk(out);
            }
        }

        /// True when the keyword is of the open (unfinished) kind.
        pub fn is_active(&self) -> bool {
            matches!(self.keyword, Some(Keyword::Open(_)))
        }

        pub fn scheduled(&self) -> Option<&Time> {
            self.stamps.iter().find_map(|s| match s {
                Stamp::Scheduled(t) => Some(t),
                _ => None,
            })
        }

        pub fn deadline(&self) -> Option<&Time> {
            self.stamps.iter().find_map(|s| match s {
                Stamp::Deadline(t) => Some(t),
                _ => None,
            })
        }

        pub fn closed(&self) -> Option<&Time> {
            self.stamps.iter().find_map(|s| match s {
                Stamp::Closed(t) => Some(t),
                _ => None,
            })
        }
    }

    /// Status keyword; the variant, not the spelling, decides "active".
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Keyword {
        Open(String),
        Closed(String),
    }

    impl Keyword {
        pub fn text(&self) -> &str {
            match self {
                Keyword::Open(s) | Keyword::Closed(s) => s,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Tag {
        Plain(String),
        /// Written `[name]` inside the tag group; the name must be in `Config::special_tags`.
        Special(String),
    }

    impl Tag {
        pub fn name(&self) -> &str {
            match self {
                Tag::Plain(s) | Tag::Special(s) => s,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Property {
        pub name: String,
        pub value: String,
        /// Set only on copies injected by inheritance.
        #[serde(default)]
        pub inherited: bool,
    }

    impl Property {
        pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                value: value.into(),
                inherited: false,
            }
        }
    }

    /* ------------------------------ Timestamps ------------------------------ */

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Stamp {
        Closed(Time),
        Scheduled(Time),
        Deadline(Time),
    }

    impl Stamp {
        pub fn time(&self) -> &Time {
            match self {
                Stamp::Closed(t) | Stamp::Scheduled(t) | Stamp::Deadline(t) => t,
            }
        }
    }

    /// `<...>` is active, `[...]` inactive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum TimeKind {
        Active,
        Inactive,
    }

    impl TimeKind {
        pub fn brackets(self) -> (char, char) {
            match self {
                TimeKind::Active => ('<', '>'),
                TimeKind::Inactive => ('[', ']'),
            }
        }
    }

    /// A date, optionally with a time-of-day range, a range-end day and a repeater.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Time {
        pub kind: TimeKind,
        pub day: NaiveDate,
        /// Range end written as `<...>--<...>`.
        pub end_day: Option<NaiveDate>,
        pub start: Option<NaiveTime>,
        pub end: Option<NaiveTime>,
        pub suffix: Option<TimeSuffix>,
    }

    impl Time {
        pub fn new(kind: TimeKind, day: NaiveDate) -> Self {
            Self {
                kind,
                day,
                end_day: None,
                start: None,
                end: None,
                suffix: None,
            }
        }

        /// Start of the stamp as an instant; all-day stamps start at midnight.
        pub fn instant(&self) -> NaiveDateTime {
            self.day.and_time(self.start.unwrap_or(NaiveTime::MIN))
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum SuffixKind {
        /// `+`
        Repeat,
        /// `++`
        CatchUp,
        /// `.+`
        DottedRepeat,
        /// `-`, a warning period
        Within,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum SpanUnit {
        Day,
        Week,
        Month,
        Year,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TimeSpan {
        pub count: u32,
        pub unit: SpanUnit,
    }

    /// Repeater cookie such as `.+2d/4d`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TimeSuffix {
        pub kind: SuffixKind,
        pub span: TimeSpan,
        pub larger: Option<TimeSpan>,
    }

    /* --------------------------------- Log --------------------------------- */

    /// `CLOCK:` duration as written after `=>`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ClockDuration {
        pub hours: u32,
        pub minutes: u32,
    }

    /// One logged line (plus continuation text), or a `:LOGBOOK:` drawer of them.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub enum LogEntry {
        StateChange {
            loc: Loc,
            to: String,
            from: Option<String>,
            time: Time,
            text: Vec<String>,
        },
        Note {
            loc: Loc,
            time: Time,
            text: Vec<String>,
        },
        Closing {
            loc: Loc,
            time: Time,
            text: Vec<String>,
        },
        Rescheduled {
            loc: Loc,
            from: Time,
            time: Time,
            text: Vec<String>,
        },
        NotScheduled {
            loc: Loc,
            was: Time,
            time: Time,
            text: Vec<String>,
        },
        NewDeadline {
            loc: Loc,
            from: Time,
            time: Time,
            text: Vec<String>,
        },
        RemovedDeadline {
            loc: Loc,
            was: Time,
            time: Time,
            text: Vec<String>,
        },
        Refiled {
            loc: Loc,
            time: Time,
            text: Vec<String>,
        },
        Clock {
            loc: Loc,
            time: Time,
            duration: Option<ClockDuration>,
        },
        LogBook {
            loc: Loc,
            entries: Vec<LogEntry>,
        },
    }

    impl LogEntry {
        pub fn loc(&self) -> &Loc {
            match self {
                LogEntry::StateChange { loc, .. }
                | LogEntry::Note { loc, .. }
                | LogEntry::Closing { loc, .. }
                | LogEntry::Rescheduled { loc, .. }
                | LogEntry::NotScheduled { loc, .. }
                | LogEntry::NewDeadline { loc, .. }
                | LogEntry::RemovedDeadline { loc, .. }
                | LogEntry::Refiled { loc, .. }
                | LogEntry::Clock { loc, .. }
                | LogEntry::LogBook { loc, .. } => loc,
            }
        }

        /// Continuation lines; clocks and logbooks carry none.
        pub fn text(&self) -> &[String] {
            match self {
                LogEntry::StateChange { text, .. }
                | LogEntry::Note { text, .. }
                | LogEntry::Closing { text, .. }
                | LogEntry::Rescheduled { text, .. }
                | LogEntry::NotScheduled { text, .. }
                | LogEntry::NewDeadline { text, .. }
                | LogEntry::RemovedDeadline { text, .. }
                | LogEntry::Refiled { text, .. } => text,
                LogEntry::Clock { .. } | LogEntry::LogBook { .. } => &[],
            }
        }

        pub(crate) fn with_text(mut self, lines: Vec<String>) -> Self {
            match &mut self {
                LogEntry::StateChange { text, .. }
                | LogEntry::Note { text, .. }
                | LogEntry::Closing { text, .. }
                | LogEntry::Rescheduled { text, .. }
                | LogEntry::NotScheduled { text, .. }
                | LogEntry::NewDeadline { text, .. }
                | LogEntry::RemovedDeadline { text, .. }
                | LogEntry::Refiled { text, .. } => *text = lines,
                LogEntry::Clock { .. } | LogEntry::LogBook { .. } => {}
            }
            self
        }
    }

    /* ---------------------------- Content Model ---------------------------- */

    /// Free text under the headline, before any child.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Body {
        #[serde(default)]
        pub blocks: Vec<Block>,
    }

    impl Body {
        pub fn is_empty(&self) -> bool {
            self.blocks.is_empty()
        }

        /// Non-empty and made of blank lines only.
        pub fn is_whitespace(&self) -> bool {
            !self.blocks.is_empty()
                && self
                    .blocks
                    .iter()
                    .all(|b| matches!(b, Block::Whitespace { .. }))
        }

        pub fn leading_whitespace(&self) -> usize {
            match self.blocks.first() {
                Some(Block::Whitespace { lines, .. }) => *lines,
                _ => 0,
            }
        }

        pub fn trailing_whitespace(&self) -> usize {
            match self.blocks.last() {
                Some(Block::Whitespace { lines, .. }) => *lines,
                _ => 0,
            }
        }
    }

    /// Body content is opaque: runs of blank lines, paragraphs, and raw drawers.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Block {
        /// Number of consecutive blank lines.
        Whitespace { loc: Loc, lines: usize },
        Paragraph { loc: Loc, lines: Vec<String> },
        /// `:NAME:`..`:END:` or `#+begin_X`..`#+end_X`, kept verbatim.
        Drawer { loc: Loc, lines: Vec<String> },
    }

    impl Block {
        pub fn loc(&self) -> &Loc {
            match self {
                Block::Whitespace { loc, .. }
                | Block::Paragraph { loc, .. }
                | Block::Drawer { loc, .. } => loc,
            }
        }
    }
}

pub mod config {
    //! Read-only settings threaded through parser, printer and linter.

    use crate::core::Keyword;
    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};
    use std::{fs, path::Path};

    #[derive(Debug, thiserror::Error)]
    pub enum ConfigError {
        #[error("reading config {path}: {source}")]
        Io {
            path: String,
            #[source]
            source: std::io::Error,
        },
        #[error("invalid config: {0}")]
        Toml(#[from] toml::de::Error),
    }

    /// Direction in which recorded state changes are replayed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub enum ReplayOrder {
        /// Org records the newest change first, so replay walks the log backwards.
        #[default]
        OldestFirst,
        AsRecorded,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(default, rename_all = "kebab-case")]
    pub struct Config {
        pub open_keywords: Vec<String>,
        pub closed_keywords: Vec<String>,
        pub priorities: Vec<char>,
        pub special_tags: Vec<String>,
        /// Allowed destinations per origin keyword.
        pub transitions: IndexMap<String, Vec<String>>,
        /// Origins accepted for the first recorded state change.
        pub initial_states: Vec<String>,
        /// Column at which property values start.
        pub property_column: usize,
        /// Column at which the headline tag group starts.
        pub tags_column: usize,
        pub replay_order: ReplayOrder,
        pub max_category_length: usize,
    }

    fn words(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    impl Default for Config {
        fn default() -> Self {
            let mut transitions = IndexMap::new();
            let workflow: [(&str, &[&str]); 9] = [
                ("TODO", &["DOING", "WAIT", "DEFER", "DELEGATED", "DONE", "CANCELED"]),
                ("DOING", &["TODO", "WAIT", "DEFER", "DELEGATED", "DONE", "CANCELED"]),
                ("WAIT", &["TODO", "DOING", "DEFER", "DONE", "CANCELED"]),
                ("DEFER", &["TODO", "DOING", "WAIT", "DONE", "CANCELED"]),
                ("DELEGATED", &["TODO", "DOING", "WAIT", "DONE", "CANCELED"]),
                ("APPT", &["DONE", "CANCELED"]),
                ("PROJECT", &["DONE", "CANCELED"]),
                ("DONE", &[]),
                ("CANCELED", &[]),
            ];
            for (from, to) in workflow {
                transitions.insert(from.to_string(), words(to));
            }
            Self {
                open_keywords: words(&[
                    "TODO",
                    "DOING",
                    "WAIT",
                    "DEFER",
                    "DELEGATED",
                    "APPT",
                    "PROJECT",
                ]),
                closed_keywords: words(&["DONE", "CANCELED"]),
                priorities: vec!['A', 'B', 'C'],
                special_tags: words(&["ARCHIVE", "FILE", "URL"]),
                transitions,
                initial_states: words(&["TODO", "APPT", "PROJECT"]),
                property_column: 11,
                tags_column: 77,
                replay_order: ReplayOrder::default(),
                max_category_length: 10,
            }
        }
    }

    impl Config {
        pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
            Ok(toml::from_str(s)?)
        }

        pub fn load(path: &Path) -> Result<Self, ConfigError> {
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_toml_str(&text)
        }

        /// Classify a headline word; `None` when it is not a configured keyword.
        pub fn keyword(&self, word: &str) -> Option<Keyword> {
            if self.open_keywords.iter().any(|k| k == word) {
                Some(Keyword::Open(word.to_string()))
            } else if self.closed_keywords.iter().any(|k| k == word) {
                Some(Keyword::Closed(word.to_string()))
            } else {
                None
            }
        }

        pub fn transitions_of(&self, keyword: &str) -> &[String] {
            self.transitions
                .get(keyword)
                .map(Vec::as_slice)
                .unwrap_or(&[])
        }

        pub fn is_special_tag(&self, name: &str) -> bool {
            self.special_tags.iter().any(|t| t == name)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn keywords_classify_by_list() {
            let config = Config::default();
            assert_eq!(config.keyword("TODO"), Some(Keyword::Open("TODO".into())));
            assert_eq!(
                config.keyword("DONE"),
                Some(Keyword::Closed("DONE".into()))
            );
            assert_eq!(config.keyword("todo"), None);
            assert!(config.transitions_of("DONE").is_empty());
            assert!(config.transitions_of("UNKNOWN").is_empty());
            assert!(config.transitions_of("TODO").contains(&"DONE".to_string()));
        }

        #[test]
        fn toml_overrides_and_defaults() {
            let config = Config::from_toml_str(
                r#"
open-keywords = ["NEXT"]
tags-column = 40
replay-order = "as-recorded"

[transitions]
NEXT = ["DONE"]
"#,
            )
            .expect("config");
            assert_eq!(config.open_keywords, vec!["NEXT".to_string()]);
            assert_eq!(config.tags_column, 40);
            assert_eq!(config.replay_order, ReplayOrder::AsRecorded);
            assert_eq!(config.transitions_of("NEXT"), ["DONE".to_string()]);
            assert_eq!(config.closed_keywords, Config::default().closed_keywords);
            assert_eq!(config.property_column, 11);
        }

        #[test]
        fn load_reads_file_and_reports_bad_toml() {
            let dir = tempfile::tempdir().expect("tempdir");
            let good = dir.path().join("org.toml");
            fs::write(&good, "priorities = [\"A\", \"B\"]\n").expect("write");
            let config = Config::load(&good).expect("load");
            assert_eq!(config.priorities, vec!['A', 'B']);

            let bad = dir.path().join("bad.toml");
            fs::write(&bad, "tags-column = \"wide\"\n").expect("write");
            assert!(matches!(Config::load(&bad), Err(ConfigError::Toml(_))));
            assert!(matches!(
                Config::load(&dir.path().join("missing.toml")),
                Err(ConfigError::Io { .. })
            ));
        }
    }
}

pub mod parser {
    //! Org parser built on `nom`.
    //!
    //! Parsing strategy:
    //! - Line-oriented. Every rule threads the remaining input; positions are
    //!   recovered from where a slice sits inside the original text.
    //! - A headline is split from its right edge first (tag group, then locator),
    //!   then from the left (stars, keyword, priority, context). The rest is the title.
    //! - Under a headline, in order: planning lines, a property drawer, log entries
    //!   (bare or inside `:LOGBOOK:`), body blocks, then children one level deeper.
    //! - `Err::Error` backtracks; a malformed planning or log line falls through to
    //!   the body. An unclosed drawer or a depth jump is a `Failure` and aborts the file.

    use crate::config::Config;
    use crate::core::*;
    use chrono::{NaiveDate, NaiveTime};
    use nom::{
        IResult,
        branch::alt,
        bytes::complete::{tag, tag_no_case, take_till, take_till1, take_while1, take_while_m_n},
        character::complete::{
            anychar, char, digit1, line_ending, one_of, space0, space1,
        },
        combinator::{all_consuming, cut, eof, map, map_opt, map_res, opt, value, verify},
        error::{VerboseError, VerboseErrorKind, context},
        multi::{many0, many1, separated_list1},
        sequence::{delimited, pair, preceded, terminated, tuple},
    };
    use std::path::{Path, PathBuf};

    type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

    /// A file that could not be parsed, at the furthest position reached.
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    #[error(
        "{}:{}:{}: parse error: expected {}",
        .path.display(),
        .line,
        .column,
        .expected.join(" or ")
    )]
    pub struct ParseError {
        pub path: PathBuf,
        pub line: usize,
        pub column: usize,
        pub expected: Vec<String>,
    }

    /* ------------------------ Public entry points ------------------------ */

    /// Parse one file. Pure in its inputs; no partial tree on failure.
    pub fn parse_org_file(
        config: &Config,
        path: impl AsRef<Path>,
        content: &str,
    ) -> Result<OrgFile, ParseError> {
        let path = path.as_ref();
        let src = Source::new(config, path, content);
        tracing::debug!(path = %path.display(), bytes = content.len(), "parsing org file");

        let (rest, header) = header(content).map_err(|e| src.error(e))?;
        let (_, entries) = entries(&src, rest).map_err(|e| src.error(e))?;

        Ok(OrgFile {
            path: path.to_path_buf(),
            header,
            entries,
        })
    }

    /// Parse many `(path, content)` pairs. Failures are collected per file and
    /// never stop the others.
    pub fn parse_org_data<I, P, S>(config: &Config, inputs: I) -> (OrgData, Vec<ParseError>)
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let mut data = OrgData::new();
        let mut errors = Vec::new();
        for (path, content) in inputs {
            match parse_org_file(config, path, content.as_ref()) {
                Ok(file) => data.insert(file),
                Err(err) => {
                    tracing::debug!(%err, "skipping unparsable file");
                    errors.push(err);
                }
            }
        }
        (data, errors)
    }

    /* ------------------------------- Utils ------------------------------- */

    struct Source<'a> {
        config: &'a Config,
        path: &'a Path,
        text: &'a str,
        /// Byte offset at which each line starts; the first is always 0.
        line_starts: Vec<usize>,
    }

    impl<'a> Source<'a> {
        fn new(config: &'a Config, path: &'a Path, text: &'a str) -> Self {
            let line_starts = std::iter::once(0)
                .chain(text.match_indices('\n').map(|(pos, _)| pos + 1))
                .collect();
            Self {
                config,
                path,
                text,
                line_starts,
            }
        }

        /// `at` must be a slice of `self.text`.
        fn offset(&self, at: &str) -> usize {
            (at.as_ptr() as usize)
                .saturating_sub(self.text.as_ptr() as usize)
                .min(self.text.len())
        }

        fn loc(&self, at: &str) -> Loc {
            let offset = self.offset(at);
            let line = self.line_starts.partition_point(|start| *start <= offset);
            let line_start = self.line_starts[line - 1];
            let column = self.text[line_start..offset].chars().count() + 1;
            Loc::new(self.path, line, column)
        }

        fn error(&self, err: nom::Err<VerboseError<&str>>) -> ParseError {
            let errors = match err {
                nom::Err::Error(e) | nom::Err::Failure(e) => e.errors,
                nom::Err::Incomplete(_) => vec![],
            };
            let furthest = errors
                .iter()
                .map(|(i, _)| *i)
                .min_by_key(|i| i.len())
                .unwrap_or(&self.text[self.text.len()..]);

            let contexts: Vec<String> = errors
                .iter()
                .filter_map(|(_, kind)| match kind {
                    VerboseErrorKind::Context(c) => Some(c.to_string()),
                    _ => None,
                })
                .collect();
            let mut expected = if contexts.is_empty() {
                errors
                    .iter()
                    .map(|(_, kind)| match kind {
                        VerboseErrorKind::Char(c) => format!("'{c}'"),
                        VerboseErrorKind::Nom(k) => k.description().to_string(),
                        VerboseErrorKind::Context(c) => c.to_string(),
                    })
                    .collect()
            } else {
                contexts
            };
            let mut seen = Vec::new();
            expected.retain(|e| {
                let fresh = !seen.contains(e);
                seen.push(e.clone());
                fresh
            });

            let loc = self.loc(furthest);
            ParseError {
                path: self.path.to_path_buf(),
                line: loc.line,
                column: loc.column,
                expected,
            }
        }
    }

    fn fail<'a, T>(i: &'a str, ctx: &'static str) -> PResult<'a, T> {
        Err(nom::Err::Error(VerboseError {
            errors: vec![(i, VerboseErrorKind::Context(ctx))],
        }))
    }

    fn eol(i: &str) -> PResult<'_, &str> {
        alt((line_ending, eof))(i)
    }

    /// Text up to `\n`; a stray `\r` inside the line is kept, one before `\n` dropped.
    fn till_eol(i: &str) -> PResult<'_, &str> {
        let (i, line) = take_till(|c: char| c == '\n')(i)?;
        let (i, _) = opt(char('\n'))(i)?;
        Ok((i, line.strip_suffix('\r').unwrap_or(line)))
    }

    /// One non-empty-input line satisfying `pred`.
    fn line_where(pred: impl Fn(&str) -> bool) -> impl Fn(&str) -> PResult<'_, &str> {
        move |i: &str| {
            if i.is_empty() {
                return fail(i, "line");
            }
            let (rest, line) = till_eol(i)?;
            if pred(line) {
                Ok((rest, line))
            } else {
                fail(i, "line")
            }
        }
    }

    /// Stars followed by a space; the star count is the depth.
    fn headline_depth(i: &str) -> Option<usize> {
        let depth = i.chars().take_while(|c| *c == '*').count();
        (depth > 0 && i[depth..].starts_with(' ')).then_some(depth)
    }

    fn is_tag_char(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, '_' | '@' | '#' | '%' | '-' | '+')
    }

    /* ------------------------------ Header ------------------------------ */

    fn header(i: &str) -> PResult<'_, Header> {
        let (i, drawer) = opt(properties_drawer)(i)?;
        let (i, file_properties) = many0(file_property)(i)?;
        let (mut i, properties_drawer) = match drawer {
            Some(props) => (i, Some(props)),
            None => opt(properties_drawer)(i)?,
        };

        let mut preamble = Vec::new();
        while !i.is_empty() && headline_depth(i).is_none() {
            let (r, line) = till_eol(i)?;
            preamble.push(line.to_string());
            i = r;
        }

        Ok((
            i,
            Header {
                properties_drawer,
                file_properties,
                preamble,
            },
        ))
    }

    fn file_property(i: &str) -> PResult<'_, Property> {
        // #+KEY: value
        map(
            tuple((
                tag("#+"),
                take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
                char(':'),
                space0,
                till_eol,
            )),
            |(_, key, _, _, val): (&str, &str, char, &str, &str)| {
                Property::new(key, val.trim_end())
            },
        )(i)
    }

    /* ------------------------------- Entries ------------------------------- */

    fn entries<'a>(src: &Source<'_>, mut i: &'a str) -> PResult<'a, Vec<Entry>> {
        let mut out = Vec::new();
        while !i.is_empty() {
            if headline_depth(i).is_none() {
                return Err(nom::Err::Failure(VerboseError {
                    errors: vec![(i, VerboseErrorKind::Context("headline"))],
                }));
            }
            let (r, entry) = parse_entry(src, i)?;
            out.push(entry);
            i = r;
        }
        Ok((i, out))
    }

    /// One entry and its whole subtree.
    fn parse_entry<'a>(src: &Source<'_>, i: &'a str) -> PResult<'a, Entry> {
        let (i, line) = till_eol(i)?;
        let (_, mut entry) = headline(src, line)?;
        tracing::trace!(line = entry.loc.line, depth = entry.depth, "headline");

        let (i, planning) = many0(planning_line)(i)?;
        entry.stamps = planning.into_iter().flatten().collect();

        let (i, properties) = opt(properties_drawer)(i)?;
        entry.drawer = properties.is_some();
        entry.properties = properties.unwrap_or_default();

        let (i, log) = many0(alt((
            |i: &'a str| logbook(src, i),
            |i: &'a str| log_entry(src, i),
        )))(i)?;
        entry.log = log;

        let (mut i, body) = body(src, i)?;
        entry.body = body;

        while let Some(depth) = headline_depth(i) {
            if depth <= entry.depth {
                break;
            }
            if depth != entry.depth + 1 {
                return Err(nom::Err::Failure(VerboseError {
                    errors: vec![(
                        i,
                        VerboseErrorKind::Context("child headline exactly one level deeper"),
                    )],
                }));
            }
            let (r, child) = parse_entry(src, i)?;
            entry.children.push(child);
            i = r;
        }

        Ok((i, entry))
    }

    /// Parse a single headline line (no line ending).
    fn headline<'a>(src: &Source<'_>, line: &'a str) -> PResult<'a, Entry> {
        let config = src.config;
        let (rest, depth) = map(
            terminated(take_while1(|c: char| c == '*'), char(' ')),
            str::len,
        )(line)?;

        let (rest, tags) = split_tags(config, rest);
        let (rest, locator) = split_locator(rest);

        let (rest, keyword) = opt(terminated(
            map_opt(take_till1(char::is_whitespace), |w: &str| config.keyword(w)),
            alt((space1, eof)),
        ))(rest)?;
        let (rest, priority) = opt(terminated(
            delimited(
                tag("[#"),
                verify(anychar, |c: &char| config.priorities.contains(c)),
                char(']'),
            ),
            alt((space1, eof)),
        ))(rest)?;
        let (rest, entry_context) = opt(terminated(
            delimited(char('('), take_till1(|c: char| c == ')'), char(')')),
            alt((space1, eof)),
        ))(rest)?;

        let mut entry = Entry::new(src.loc(line), depth, rest.trim_end());
        entry.keyword = keyword;
        entry.priority = priority;
        entry.context = entry_context.map(str::to_string);
        entry.locator = locator;
        entry.tags = tags;
        Ok(("", entry))
    }

    /// Peel a `:a:b:` group off the right edge; only a group reaching line end counts.
    fn split_tags<'a>(config: &Config, text: &'a str) -> (&'a str, Vec<Tag>) {
        let trimmed = text.trim_end();
        let (before, candidate) = trimmed
            .rsplit_once(char::is_whitespace)
            .unwrap_or(("", trimmed));
        match all_consuming(|i: &'a str| tag_group(config, i))(candidate) {
            Ok((_, tags)) => (before, tags),
            Err(_) => (text, vec![]),
        }
    }

    fn tag_group<'a>(config: &Config, i: &'a str) -> PResult<'a, Vec<Tag>> {
        let (i, _) = char(':')(i)?;
        many1(terminated(|i: &'a str| tag_item(config, i), char(':')))(i)
    }

    fn tag_item<'a>(config: &Config, i: &'a str) -> PResult<'a, Tag> {
        alt((
            map(
                verify(
                    delimited(char('['), take_while1(is_tag_char), char(']')),
                    |name: &str| config.is_special_tag(name),
                ),
                |name: &str| Tag::Special(name.to_string()),
            ),
            map(take_while1(is_tag_char), |name: &str| {
                Tag::Plain(name.to_string())
            }),
        ))(i)
    }

    /// Peel a trailing `{locator}` that stands as its own word.
    fn split_locator(text: &str) -> (&str, Option<String>) {
        let trimmed = text.trim_end();
        if let Some(inner) = trimmed.strip_suffix('}') {
            if let Some(open) = inner.rfind('{') {
                let before = &trimmed[..open];
                let name = &inner[open + 1..];
                if !name.is_empty() && (before.is_empty() || before.ends_with(char::is_whitespace))
                {
                    return (before, Some(name.to_string()));
                }
            }
        }
        (text, None)
    }

    /* ------------------------- Planning & Drawers ------------------------- */

    fn planning_line(i: &str) -> PResult<'_, Vec<Stamp>> {
        // CLOSED: [2024-01-02 Tue 10:00] SCHEDULED: <2024-01-01 Mon>
        let (i, _) = space0(i)?;
        let (i, stamps) = separated_list1(space1, stamp)(i)?;
        let (i, _) = space0(i)?;
        let (i, _) = context("end of planning line", eol)(i)?;
        Ok((i, stamps))
    }

    fn stamp(i: &str) -> PResult<'_, Stamp> {
        fn after<'a>(prefix: &'static str) -> impl FnMut(&'a str) -> PResult<'a, Time> {
            preceded(pair(tag(prefix), space1), context("timestamp", time))
        }
        alt((
            map(after("CLOSED:"), Stamp::Closed),
            map(after("SCHEDULED:"), Stamp::Scheduled),
            map(after("DEADLINE:"), Stamp::Deadline),
        ))(i)
    }

    fn properties_drawer(i: &str) -> PResult<'_, Vec<Property>> {
        // :PROPERTIES:\n:KEY: value\n...\n:END:
        let (i, _) = tuple((space0, tag(":PROPERTIES:"), space0, eol))(i)?;
        cut(context(
            "property drawer closed by :END:",
            terminated(many0(property_line), drawer_end),
        ))(i)
    }

    fn property_line(i: &str) -> PResult<'_, Property> {
        let (i, _) = space0(i)?;
        let (i, name) = delimited(
            char(':'),
            verify(
                take_till1(|c: char| c == ':' || c.is_whitespace()),
                |n: &str| !n.eq_ignore_ascii_case("END"),
            ),
            char(':'),
        )(i)?;
        let (i, val) = till_eol(i)?;
        Ok((i, Property::new(name, val.trim())))
    }

    fn drawer_end(i: &str) -> PResult<'_, ()> {
        value((), tuple((space0, tag_no_case(":END:"), space0, eol)))(i)
    }

    /* ------------------------------- Log ------------------------------- */

    fn logbook<'a>(src: &Source<'_>, i: &'a str) -> PResult<'a, LogEntry> {
        let start = i;
        let (i, _) = tuple((space0, tag(":LOGBOOK:"), space0, eol))(i)?;
        let (i, entries) = cut(context(
            "logbook drawer closed by :END:",
            terminated(many0(|i: &'a str| log_entry(src, i)), drawer_end),
        ))(i)?;
        Ok((
            i,
            LogEntry::LogBook {
                loc: src.loc(start),
                entries,
            },
        ))
    }

    /// One log line, its optional `\\` marker, and lines indented past its marker.
    fn log_entry<'a>(src: &Source<'_>, i: &'a str) -> PResult<'a, LogEntry> {
        let start = i;
        let (i, indent) = space0(i)?;
        let loc = src.loc(start);
        let (i, entry) = alt((
            |i: &'a str| state_change(&loc, i),
            |i: &'a str| note(&loc, i),
            |i: &'a str| closing_note(&loc, i),
            |i: &'a str| rescheduled(&loc, i),
            |i: &'a str| not_scheduled(&loc, i),
            |i: &'a str| new_deadline(&loc, i),
            |i: &'a str| removed_deadline(&loc, i),
            |i: &'a str| refiled(&loc, i),
            |i: &'a str| clock(&loc, i),
        ))(i)?;
        let (i, _) = opt(preceded(space0, tag("\\\\")))(i)?;
        let (i, _) = space0(i)?;
        let (i, _) = eol(i)?;

        if matches!(entry, LogEntry::Clock { .. }) {
            return Ok((i, entry));
        }
        let (i, text) = continuation(indent.chars().count(), i)?;
        Ok((i, entry.with_text(text)))
    }

    fn continuation(column: usize, mut i: &str) -> PResult<'_, Vec<String>> {
        let mut lines = Vec::new();
        while !i.is_empty() {
            let (rest, line) = till_eol(i)?;
            let indent = line.chars().take_while(|c| c.is_whitespace()).count();
            if line.is_empty() || indent <= column {
                break;
            }
            lines.push(line.trim().to_string());
            i = rest;
        }
        Ok((i, lines))
    }

    fn quoted(i: &str) -> PResult<'_, &str> {
        delimited(char('"'), take_till(|c: char| c == '"'), char('"'))(i)
    }

    fn state_change<'a>(loc: &Loc, i: &'a str) -> PResult<'a, LogEntry> {
        // - State "DONE"       from "TODO"       [2024-01-01 Mon 10:00]
        let (i, _) = tag("- State")(i)?;
        let (i, to) = preceded(space1, quoted)(i)?;
        let (i, from) = opt(preceded(tuple((space1, tag("from"), space0)), opt(quoted)))(i)?;
        let (i, _) = space0(i)?;
        let (i, time) = time(i)?;
        Ok((
            i,
            LogEntry::StateChange {
                loc: loc.clone(),
                to: to.to_string(),
                from: from.flatten().map(str::to_string),
                time,
                text: vec![],
            },
        ))
    }

    fn note<'a>(loc: &Loc, i: &'a str) -> PResult<'a, LogEntry> {
        let (i, time) = preceded(pair(tag("- Note taken on"), space1), time)(i)?;
        Ok((
            i,
            LogEntry::Note {
                loc: loc.clone(),
                time,
                text: vec![],
            },
        ))
    }

    fn closing_note<'a>(loc: &Loc, i: &'a str) -> PResult<'a, LogEntry> {
        let (i, time) = preceded(pair(tag("- CLOSING NOTE"), space1), time)(i)?;
        Ok((
            i,
            LogEntry::Closing {
                loc: loc.clone(),
                time,
                text: vec![],
            },
        ))
    }

    /// `<prefix>"<time>" on <time>`
    fn was_on<'a>(prefix: &'static str, i: &'a str) -> PResult<'a, (Time, Time)> {
        let (i, _) = tag(prefix)(i)?;
        let (i, was) = delimited(char('"'), time, char('"'))(i)?;
        let (i, _) = tuple((space1, tag("on"), space1))(i)?;
        let (i, at) = time(i)?;
        Ok((i, (was, at)))
    }

    fn rescheduled<'a>(loc: &Loc, i: &'a str) -> PResult<'a, LogEntry> {
        let (i, (from, time)) = was_on("- Rescheduled from ", i)?;
        let loc = loc.clone();
        Ok((i, LogEntry::Rescheduled { loc, from, time, text: vec![] }))
    }

    fn not_scheduled<'a>(loc: &Loc, i: &'a str) -> PResult<'a, LogEntry> {
        let (i, (was, time)) = was_on("- Not scheduled, was ", i)?;
        let loc = loc.clone();
        Ok((i, LogEntry::NotScheduled { loc, was, time, text: vec![] }))
    }

    fn new_deadline<'a>(loc: &Loc, i: &'a str) -> PResult<'a, LogEntry> {
        let (i, (from, time)) = was_on("- New deadline from ", i)?;
        let loc = loc.clone();
        Ok((i, LogEntry::NewDeadline { loc, from, time, text: vec![] }))
    }

    fn removed_deadline<'a>(loc: &Loc, i: &'a str) -> PResult<'a, LogEntry> {
        let (i, (was, time)) = was_on("- Removed deadline, was ", i)?;
        let loc = loc.clone();
        Ok((i, LogEntry::RemovedDeadline { loc, was, time, text: vec![] }))
    }

    fn refiled<'a>(loc: &Loc, i: &'a str) -> PResult<'a, LogEntry> {
        let (i, time) = preceded(pair(tag("- Refiled on"), space1), time)(i)?;
        Ok((
            i,
            LogEntry::Refiled {
                loc: loc.clone(),
                time,
                text: vec![],
            },
        ))
    }

    fn clock<'a>(loc: &Loc, i: &'a str) -> PResult<'a, LogEntry> {
        // CLOCK: [2024-01-01 Mon 10:00]--[2024-01-01 Mon 11:30] =>  1:30
        let (i, _) = pair(tag("CLOCK:"), space1)(i)?;
        let (i, time) = time(i)?;
        let (i, duration) = opt(preceded(
            tuple((space0, tag("=>"), space0)),
            map(
                tuple((
                    map_res(digit1, |s: &str| s.parse::<u32>()),
                    char(':'),
                    map_res(digit1, |s: &str| s.parse::<u32>()),
                )),
                |(hours, _, minutes)| ClockDuration { hours, minutes },
            ),
        ))(i)?;
        Ok((
            i,
            LogEntry::Clock {
                loc: loc.clone(),
                time,
                duration,
            },
        ))
    }

    /* ------------------------------- Body ------------------------------- */

    fn body<'a>(src: &Source<'_>, mut i: &'a str) -> PResult<'a, Body> {
        let mut blocks = Vec::new();
        while !i.is_empty() && headline_depth(i).is_none() {
            let loc = src.loc(i);
            if let Ok((r, blanks)) = many1(line_where(|l| l.trim().is_empty()))(i) {
                blocks.push(Block::Whitespace {
                    loc,
                    lines: blanks.len(),
                });
                i = r;
                continue;
            }
            if let Ok((r, lines)) = raw_drawer(i) {
                blocks.push(Block::Drawer { loc, lines });
                i = r;
                continue;
            }
            let (r, lines) = paragraph(i)?;
            blocks.push(Block::Paragraph { loc, lines });
            i = r;
        }
        Ok((i, Body { blocks }))
    }

    /// Lowercased line that closes a drawer opened by `line`, if it opens one.
    fn drawer_closer(line: &str) -> Option<String> {
        let t = line.trim();
        if let Some(name) = t.strip_prefix(':').and_then(|s| s.strip_suffix(':')) {
            let named = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
            let reserved = ["PROPERTIES", "LOGBOOK", "END"]
                .iter()
                .any(|r| name.eq_ignore_ascii_case(r));
            return (named && !reserved).then(|| ":end:".to_string());
        }
        let lower = t.to_lowercase();
        let kind = lower.strip_prefix("#+begin_")?;
        let kind = kind.split_whitespace().next()?;
        Some(format!("#+end_{kind}"))
    }

    fn raw_drawer(i: &str) -> PResult<'_, Vec<String>> {
        let (mut rest, first) = line_where(|l| drawer_closer(l).is_some())(i)?;
        let Some(closer) = drawer_closer(first) else {
            return fail(i, "drawer");
        };
        let mut lines = vec![first.to_string()];
        loop {
            if rest.is_empty() || headline_depth(rest).is_some() {
                return fail(i, "drawer end");
            }
            let (r, line) = till_eol(rest)?;
            lines.push(line.to_string());
            rest = r;
            let lower = line.trim().to_lowercase();
            let closed = if closer == ":end:" {
                lower == closer
            } else {
                lower.starts_with(&closer)
            };
            if closed {
                return Ok((rest, lines));
            }
        }
    }

    fn paragraph(mut i: &str) -> PResult<'_, Vec<String>> {
        let mut lines = Vec::new();
        while !i.is_empty() && headline_depth(i).is_none() {
            if !lines.is_empty() && raw_drawer(i).is_ok() {
                break;
            }
            let (r, line) = till_eol(i)?;
            if line.trim().is_empty() {
                break;
            }
            lines.push(line.to_string());
            i = r;
        }
        Ok((i, lines))
    }

    /* ----------------------------- Timestamps ----------------------------- */

    /// `<2024-01-01 Mon 10:00-11:00 +1w>`, `[2024-01-01 Mon]--[2024-01-03 Wed]`
    pub(crate) fn time<'a>(i: &'a str) -> PResult<'a, Time> {
        let (i, open) = one_of("<[")(i)?;
        let kind = if open == '<' {
            TimeKind::Active
        } else {
            TimeKind::Inactive
        };
        let (_, close) = kind.brackets();
        let (i, day) = date(i)?;
        let (i, _) = opt(preceded(space1, take_while1(char::is_alphabetic)))(i)?;
        let (i, clock) = opt(preceded(
            space1,
            pair(clock_time, opt(preceded(char('-'), clock_time))),
        ))(i)?;
        let (i, suffix) = opt(preceded(space1, time_suffix))(i)?;
        let (i, _) = space0(i)?;
        let (i, _) = char(close)(i)?;
        let (i, range_end) = opt(preceded(tag("--"), |i: &'a str| range_end(kind, i)))(i)?;

        let (start, mut end) = match clock {
            Some((start, end)) => (Some(start), end),
            None => (None, None),
        };
        let mut end_day = None;
        if let Some((d, t)) = range_end {
            end_day = Some(d);
            if t.is_some() {
                end = t;
            }
        }
        Ok((
            i,
            Time {
                kind,
                day,
                end_day,
                start,
                end,
                suffix,
            },
        ))
    }

    fn range_end(kind: TimeKind, i: &str) -> PResult<'_, (NaiveDate, Option<NaiveTime>)> {
        let (open, close) = kind.brackets();
        let (i, _) = char(open)(i)?;
        let (i, day) = date(i)?;
        let (i, _) = opt(preceded(space1, take_while1(char::is_alphabetic)))(i)?;
        let (i, at) = opt(preceded(space1, clock_time))(i)?;
        let (i, _) = space0(i)?;
        let (i, _) = char(close)(i)?;
        Ok((i, (day, at)))
    }

    fn date(i: &str) -> PResult<'_, NaiveDate> {
        map_res(
            tuple((
                map_res(take_while_m_n(4, 4, |c: char| c.is_ascii_digit()), |s: &str| {
                    s.parse::<i32>()
                }),
                char('-'),
                map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_digit()), |s: &str| {
                    s.parse::<u32>()
                }),
                char('-'),
                map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_digit()), |s: &str| {
                    s.parse::<u32>()
                }),
            )),
            |(y, _, m, _, d)| NaiveDate::from_ymd_opt(y, m, d).ok_or("invalid date"),
        )(i)
    }

    fn clock_time(i: &str) -> PResult<'_, NaiveTime> {
        map_res(
            tuple((
                map_res(take_while_m_n(1, 2, |c: char| c.is_ascii_digit()), |s: &str| {
                    s.parse::<u32>()
                }),
                char(':'),
                map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_digit()), |s: &str| {
                    s.parse::<u32>()
                }),
            )),
            |(h, _, m)| NaiveTime::from_hms_opt(h, m, 0).ok_or("invalid time"),
        )(i)
    }

    fn time_suffix(i: &str) -> PResult<'_, TimeSuffix> {
        let (i, kind) = alt((
            value(SuffixKind::DottedRepeat, tag(".+")),
            value(SuffixKind::CatchUp, tag("++")),
            value(SuffixKind::Repeat, tag("+")),
            value(SuffixKind::Within, tag("-")),
        ))(i)?;
        let (i, span) = time_span(i)?;
        let (i, larger) = opt(preceded(char('/'), time_span))(i)?;
        Ok((i, TimeSuffix { kind, span, larger }))
    }

    fn time_span(i: &str) -> PResult<'_, TimeSpan> {
        let (i, count) = map_res(digit1, |s: &str| s.parse::<u32>())(i)?;
        let (i, unit) = alt((
            value(SpanUnit::Day, char('d')),
            value(SpanUnit::Week, char('w')),
            value(SpanUnit::Month, char('m')),
            value(SpanUnit::Year, char('y')),
        ))(i)?;
        Ok((i, TimeSpan { count, unit }))
    }

}

pub mod data {
    //! Property lookup, inheritance, and the cross-file identifier index.
    //!
    //! Lookups never mutate: inheritance returns a new annotated tree so callers can
    //! hold the parsed tree and the inherited view side by side.

    use crate::core::*;
    use crate::format::{body_lines, show_time};
    use indexmap::IndexMap;

    /// A virtual property org defines but this library does not compute.
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    #[error("virtual property {0} is not supported")]
    pub struct UnsupportedProperty(pub String);

    /// Names that always inherit, on top of whatever the caller asks for.
    pub const ALWAYS_INHERITED: [&str; 4] = ["COLUMNS", "CATEGORY", "ARCHIVE", "LOGGING"];

    pub const UNSUPPORTED_PROPERTIES: [&str; 7] = [
        "ALLTAGS",
        "BLOCKED",
        "CLOCKSUM",
        "CLOCKSUM_T",
        "TAGS",
        "TIMESTAMP",
        "TIMESTAMP_IA",
    ];

    type Extractor = fn(&Entry) -> Option<String>;

    /// Consulted after the entry's own properties, first match wins.
    const VIRTUAL_PROPERTIES: &[(&str, Extractor)] = &[
        ("CATEGORY", |e| {
            e.loc
                .file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
        }),
        ("CLOSED", |e| e.closed().map(show_time)),
        ("DEADLINE", |e| e.deadline().map(show_time)),
        ("FILE", |e| Some(e.loc.file.display().to_string())),
        ("ITEM", |e| Some(e.title.clone())),
        ("PRIORITY", |e| e.priority.map(String::from)),
        ("SCHEDULED", |e| e.scheduled().map(show_time)),
        ("TODO", |e| match &e.keyword {
            Some(Keyword::Open(k)) => Some(k.clone()),
            _ => None,
        }),
        ("LINE", |e| Some(e.loc.line.to_string())),
        ("COLUMN", |e| Some(e.loc.column.to_string())),
        ("DEPTH", |e| Some(e.depth.to_string())),
        ("KEYWORD", |e| e.keyword.as_ref().map(|k| k.text().to_string())),
        ("TITLE", |e| Some(e.title.clone())),
        ("CONTEXT", |e| e.context.clone()),
        ("LOCATOR", |e| e.locator.clone()),
        ("BODY", |e| {
            let lines = body_lines(&e.body);
            (!lines.is_empty()).then(|| lines.join("\n"))
        }),
    ];

    /// Own (or already inherited) property; no virtual fallback.
    pub fn property<'a>(entry: &'a Entry, name: &str) -> Option<&'a str> {
        entry
            .properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Own property, else the computed one. `Err` marks names that exist in org
    /// but are never computed here, as opposed to `Ok(None)` for plain absence.
    pub fn any_property(entry: &Entry, name: &str) -> Result<Option<String>, UnsupportedProperty> {
        if let Some(value) = property(entry, name) {
            return Ok(Some(value.to_string()));
        }
        if UNSUPPORTED_PROPERTIES.contains(&name) {
            return Err(UnsupportedProperty(name.to_string()));
        }
        Ok(VIRTUAL_PROPERTIES
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, get)| get(entry)))
    }

    /* ----------------------------- Inheritance ----------------------------- */

    fn eligible(names: &[String]) -> Vec<&str> {
        let mut out: Vec<&str> = ALWAYS_INHERITED.to_vec();
        for name in names {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        out
    }

    /// Copy of `entry` whose subtree carries ancestors' values for every eligible
    /// name it does not set itself, flagged `inherited`.
    pub fn inherit_properties(names: &[String], entry: &Entry) -> Entry {
        inherit(&eligible(names), &IndexMap::new(), entry)
    }

    /// Inheritance over a whole file; the header drawer acts as the root ancestor.
    pub fn inherit_file_properties(names: &[String], file: &OrgFile) -> OrgFile {
        let eligible = eligible(names);
        let mut scope = IndexMap::new();
        for prop in file.header.properties_drawer.iter().flatten() {
            if eligible.contains(&prop.name.as_str()) && !scope.contains_key(&prop.name) {
                scope.insert(prop.name.clone(), prop.value.clone());
            }
        }
        OrgFile {
            path: file.path.clone(),
            header: file.header.clone(),
            entries: file
                .entries
                .iter()
                .map(|e| inherit(&eligible, &scope, e))
                .collect(),
        }
    }

    /// `ancestors` maps each eligible name to its nearest defining ancestor's value.
    fn inherit(eligible: &[&str], ancestors: &IndexMap<String, String>, entry: &Entry) -> Entry {
        let mut properties = entry.properties.clone();
        let mut scope = ancestors.clone();
        for name in eligible {
            match property(entry, name) {
                Some(own) => {
                    scope.insert(name.to_string(), own.to_string());
                }
                None => {
                    if let Some(value) = ancestors.get(*name) {
                        properties.push(Property {
                            name: name.to_string(),
                            value: value.clone(),
                            inherited: true,
                        });
                    }
                }
            }
        }

        Entry {
            loc: entry.loc.clone(),
            depth: entry.depth,
            keyword: entry.keyword.clone(),
            priority: entry.priority,
            context: entry.context.clone(),
            title: entry.title.clone(),
            locator: entry.locator.clone(),
            tags: entry.tags.clone(),
            stamps: entry.stamps.clone(),
            properties,
            drawer: entry.drawer,
            log: entry.log.clone(),
            body: entry.body.clone(),
            children: entry
                .children
                .iter()
                .map(|c| inherit(eligible, &scope, c))
                .collect(),
        }
    }

    /* ------------------------------ Identifiers ------------------------------ */

    /// Every entry of the corpus grouped by `ID`; entries without one share `""`.
    pub fn entries_by_id(data: &OrgData) -> IndexMap<String, Vec<&Entry>> {
        let mut index: IndexMap<String, Vec<&Entry>> = IndexMap::new();
        for entry in data.all_entries() {
            let id = property(entry, "ID").unwrap_or_default();
            index.entry(id.to_string()).or_default().push(entry);
        }
        index
    }

}

pub mod format {
    //! Printer. Re-parsing its output yields the same tree up to the padding it
    //! inserts for column alignment.

    use crate::config::Config;
    use crate::core::*;

    /// Whole file as text, newline-terminated; empty for an empty file.
    pub fn format_org_file(config: &Config, file: &OrgFile) -> String {
        let lines = show_org_file(config, file);
        if lines.is_empty() {
            return String::new();
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    pub fn show_org_file(config: &Config, file: &OrgFile) -> Vec<String> {
        let mut out = Vec::new();
        show_header(config, &file.header, &mut out);
        for entry in &file.entries {
            show_entry(config, entry, &mut out);
        }
        out
    }

    fn show_header(config: &Config, header: &Header, out: &mut Vec<String>) {
        if let Some(props) = &header.properties_drawer {
            show_properties(config, props, out);
        }
        for prop in &header.file_properties {
            out.push(format!("#+{}: {}", prop.name, prop.value).trim_end().to_string());
        }
        out.extend(header.preamble.iter().cloned());
    }

    /// An entry and its subtree, depth-first.
    pub fn show_entry(config: &Config, entry: &Entry, out: &mut Vec<String>) {
        out.push(show_headline(config, entry));
        if !entry.stamps.is_empty() {
            let stamps: Vec<String> = entry.stamps.iter().map(show_stamp).collect();
            out.push(stamps.join(" "));
        }
        let own: Vec<Property> = entry
            .properties
            .iter()
            .filter(|p| !p.inherited)
            .cloned()
            .collect();
        if entry.drawer || !own.is_empty() {
            show_properties(config, &own, out);
        }
        for log in &entry.log {
            show_log_entry(log, out);
        }
        out.extend(body_lines(&entry.body));
        for child in &entry.children {
            show_entry(config, child, out);
        }
    }

    pub fn show_headline(config: &Config, entry: &Entry) -> String {
        let mut parts = vec!["*".repeat(entry.depth)];
        if let Some(keyword) = &entry.keyword {
            parts.push(keyword.text().to_string());
        }
        if let Some(priority) = entry.priority {
            parts.push(format!("[#{priority}]"));
        }
        if let Some(context) = &entry.context {
            parts.push(format!("({context})"));
        }
        if !entry.title.is_empty() {
            parts.push(entry.title.clone());
        }
        if let Some(locator) = &entry.locator {
            parts.push(format!("{{{locator}}}"));
        }

        let mut line = parts.join(" ");
        if parts.len() == 1 {
            line.push(' ');
        }
        if !entry.tags.is_empty() {
            let tags: Vec<String> = entry.tags.iter().map(show_tag).collect();
            let width = line.chars().count();
            let pad = config.tags_column.saturating_sub(width).max(2);
            line.push_str(&" ".repeat(pad));
            line.push_str(&format!(":{}:", tags.join(":")));
        }
        line
    }

    fn show_tag(tag: &Tag) -> String {
        match tag {
            Tag::Plain(name) => name.clone(),
            Tag::Special(name) => format!("[{name}]"),
        }
    }

    fn show_properties(config: &Config, props: &[Property], out: &mut Vec<String>) {
        out.push(":PROPERTIES:".to_string());
        for prop in props {
            let key = format!(":{}:", prop.name);
            let pad = config
                .property_column
                .saturating_sub(key.chars().count())
                .max(1);
            let line = format!("{key}{}{}", " ".repeat(pad), prop.value);
            out.push(line.trim_end().to_string());
        }
        out.push(":END:".to_string());
    }

    /* --------------------------------- Log --------------------------------- */

    fn show_log_entry(entry: &LogEntry, out: &mut Vec<String>) {
        let (head, text) = match entry {
            LogEntry::StateChange {
                to,
                from,
                time,
                text,
                ..
            } => {
                let to = format!("\"{to}\"");
                let head = match from {
                    Some(from) => format!(
                        "- State {:<12} from {:<12} {}",
                        to,
                        format!("\"{from}\""),
                        show_time(time)
                    ),
                    None => format!("- State {:<12} {}", to, show_time(time)),
                };
                (head, text)
            }
            LogEntry::Note { time, text, .. } => {
                (format!("- Note taken on {}", show_time(time)), text)
            }
            LogEntry::Closing { time, text, .. } => {
                (format!("- CLOSING NOTE {}", show_time(time)), text)
            }
            LogEntry::Rescheduled {
                from, time, text, ..
            } => (
                format!(
                    "- Rescheduled from \"{}\" on {}",
                    show_time(from),
                    show_time(time)
                ),
                text,
            ),
            LogEntry::NotScheduled { was, time, text, .. } => (
                format!(
                    "- Not scheduled, was \"{}\" on {}",
                    show_time(was),
                    show_time(time)
                ),
                text,
            ),
            LogEntry::NewDeadline {
                from, time, text, ..
            } => (
                format!(
                    "- New deadline from \"{}\" on {}",
                    show_time(from),
                    show_time(time)
                ),
                text,
            ),
            LogEntry::RemovedDeadline { was, time, text, .. } => (
                format!(
                    "- Removed deadline, was \"{}\" on {}",
                    show_time(was),
                    show_time(time)
                ),
                text,
            ),
            LogEntry::Refiled { time, text, .. } => {
                (format!("- Refiled on {}", show_time(time)), text)
            }
            LogEntry::Clock { time, duration, .. } => {
                let mut line = format!("CLOCK: {}", show_time(time));
                if let Some(d) = duration {
                    line.push_str(&format!(" => {:>2}:{:02}", d.hours, d.minutes));
                }
                out.push(line);
                return;
            }
            LogEntry::LogBook { entries, .. } => {
                out.push(":LOGBOOK:".to_string());
                for inner in entries {
                    show_log_entry(inner, out);
                }
                out.push(":END:".to_string());
                return;
            }
        };

        if text.is_empty() {
            out.push(head);
        } else {
            out.push(format!("{head} \\\\"));
            out.extend(text.iter().map(|line| format!("  {line}")));
        }
    }

    /// Body blocks as raw lines; a whitespace run of n prints n empty lines.
    pub fn body_lines(body: &Body) -> Vec<String> {
        let mut out = Vec::new();
        for block in &body.blocks {
            match block {
                Block::Whitespace { lines, .. } => {
                    out.extend(std::iter::repeat_n(String::new(), *lines))
                }
                Block::Paragraph { lines, .. } | Block::Drawer { lines, .. } => {
                    out.extend(lines.iter().cloned())
                }
            }
        }
        out
    }

    /* ----------------------------- Timestamps ----------------------------- */

    pub fn show_stamp(stamp: &Stamp) -> String {
        match stamp {
            Stamp::Closed(t) => format!("CLOSED: {}", show_time(t)),
            Stamp::Scheduled(t) => format!("SCHEDULED: {}", show_time(t)),
            Stamp::Deadline(t) => format!("DEADLINE: {}", show_time(t)),
        }
    }

    pub fn show_time(time: &Time) -> String {
        let (open, close) = time.kind.brackets();
        let mut out = format!("{open}{}", time.day.format("%Y-%m-%d %a"));
        if let Some(start) = time.start {
            out.push_str(&format!(" {}", start.format("%H:%M")));
            if let (None, Some(end)) = (time.end_day, time.end) {
                out.push_str(&format!("-{}", end.format("%H:%M")));
            }
        }
        if let Some(suffix) = &time.suffix {
            out.push(' ');
            out.push_str(&show_suffix(suffix));
        }
        out.push(close);

        if let Some(end_day) = time.end_day {
            out.push_str(&format!("--{open}{}", end_day.format("%Y-%m-%d %a")));
            if let Some(end) = time.end {
                out.push_str(&format!(" {}", end.format("%H:%M")));
            }
            out.push(close);
        }
        out
    }

    fn show_suffix(suffix: &TimeSuffix) -> String {
        let kind = match suffix.kind {
            SuffixKind::Repeat => "+",
            SuffixKind::CatchUp => "++",
            SuffixKind::DottedRepeat => ".+",
            SuffixKind::Within => "-",
        };
        let mut out = format!("{kind}{}", show_span(&suffix.span));
        if let Some(larger) = &suffix.larger {
            out.push('/');
            out.push_str(&show_span(larger));
        }
        out
    }

    fn show_span(span: &TimeSpan) -> String {
        let unit = match span.unit {
            SpanUnit::Day => 'd',
            SpanUnit::Week => 'w',
            SpanUnit::Month => 'm',
            SpanUnit::Year => 'y',
        };
        format!("{}{unit}", span.count)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::data::inherit_properties;
        use crate::parser::{parse_org_file, time};
        use serde_json::Value;

        const SAMPLE: &str = ":PROPERTIES:
:ID:       file-1
:END:
#+TITLE: Sample
Preamble line.

* TODO [#A] (work) Draft proposal {doc}    :work:[ARCHIVE]:
SCHEDULED: <2024-01-01 Mon 09:00-10:00 +1w> DEADLINE: <2024-01-05 Fri -2d>
:PROPERTIES:
:ID:       abc
:CREATED:  [2023-12-30 Sat]
:END:
- State \"TODO\"       from              [2023-12-30 Sat 10:00]
- Note taken on [2023-12-31 Sun 11:00] \\\\
  Called the vendor.
:LOGBOOK:
CLOCK: [2024-01-01 Mon 09:00]--[2024-01-01 Mon 10:15] =>  1:15
- Rescheduled from \"[2023-12-31 Sun]\" on [2023-12-30 Sat 12:00]
:END:

Body paragraph.

#+begin_quote
Quoted.
#+end_quote
** DONE Child
CLOSED: [2024-01-02 Tue 12:00]
- State \"DONE\"       from \"TODO\"       [2024-01-02 Tue 12:00]
*** Grandchild   :x:
";

        fn parse(config: &Config, text: &str) -> OrgFile {
            parse_org_file(config, "sample.org", text).unwrap()
        }

        /// The tree as JSON with every source position removed.
        fn shape(file: &OrgFile) -> Value {
            fn drop_locs(v: &mut Value) {
                match v {
                    Value::Object(map) => {
                        map.remove("loc");
                        map.values_mut().for_each(drop_locs);
                    }
                    Value::Array(items) => items.iter_mut().for_each(drop_locs),
                    _ => {}
                }
            }
            let mut v = serde_json::to_value(file).unwrap();
            drop_locs(&mut v);
            v
        }

        #[test]
        fn round_trip() {
            let config = Config::default();
            let first = parse(&config, SAMPLE);
            let printed = format_org_file(&config, &first);
            let second = parse(&config, &printed);
            assert_eq!(shape(&first), shape(&second));
            assert_eq!(printed, format_org_file(&config, &second));
        }

        #[test]
        fn round_trip_at_other_columns() {
            let config = Config {
                tags_column: 20,
                property_column: 4,
                ..Config::default()
            };
            let first = parse(&Config::default(), SAMPLE);
            let second = parse(&config, &format_org_file(&config, &first));
            assert_eq!(shape(&first), shape(&second));
        }

        #[test]
        fn tags_start_at_the_tag_column() {
            let config = Config {
                tags_column: 40,
                ..Config::default()
            };
            let file = parse(&config, "* TODO Buy milk :errand:urgent:\n");
            let lines = show_org_file(&config, &file);
            assert_eq!(&lines[0][40..], ":errand:urgent:");
            assert_eq!(lines[0][..40].trim_end(), "* TODO Buy milk");

            let reparsed = parse(&config, &lines.join("\n"));
            assert_eq!(
                reparsed.entries[0].tags,
                vec![Tag::Plain("errand".into()), Tag::Plain("urgent".into())]
            );
        }

        #[test]
        fn narrow_tag_column_keeps_two_spaces() {
            let config = Config {
                tags_column: 5,
                ..Config::default()
            };
            let file = parse(&config, "* Buy milk :errand:\n");
            assert_eq!(show_headline(&config, &file.entries[0]), "* Buy milk  :errand:");
        }

        #[test]
        fn property_values_align() {
            let config = Config::default();
            let file = parse(
                &config,
                "* Task\n:PROPERTIES:\n:ID: a\n:CREATED: [2024-01-01 Mon]\n:VERYLONGNAME: v\n:EMPTY:\n:END:\n",
            );
            assert_eq!(
                show_org_file(&config, &file),
                vec![
                    "* Task",
                    ":PROPERTIES:",
                    ":ID:       a",
                    ":CREATED:  [2024-01-01 Mon]",
                    ":VERYLONGNAME: v",
                    ":EMPTY:",
                    ":END:",
                ]
            );
        }

        #[test]
        fn inherited_properties_are_not_printed() {
            let config = Config::default();
            let file = parse(&config, "* A\n:PROPERTIES:\n:CATEGORY: x\n:END:\n** B\n");
            let tree = inherit_properties(&[], &file.entries[0]);
            let mut out = Vec::new();
            show_entry(&config, &tree, &mut out);
            assert_eq!(out, vec!["* A", ":PROPERTIES:", ":CATEGORY: x", ":END:", "** B"]);
        }

        #[test]
        fn log_lines() {
            let config = Config::default();
            let file = parse(
                &config,
                "* DONE X\n- State \"DONE\" from \"TODO\" [2024-01-02 Tue 12:00] \\\\\n    Wrapped up.\n- Note taken on [2024-01-01 Mon 08:00]\n",
            );
            assert_eq!(
                show_org_file(&config, &file),
                vec![
                    "* DONE X",
                    "- State \"DONE\"       from \"TODO\"       [2024-01-02 Tue 12:00] \\\\",
                    "  Wrapped up.",
                    "- Note taken on [2024-01-01 Mon 08:00]",
                ]
            );
        }

        #[test]
        fn time_rendering() {
            for text in [
                "<2024-01-01 Mon 10:00-11:30 .+2d/4d>",
                "[2024-01-01 Mon]--[2024-01-03 Wed]",
                "[2024-01-01 Mon 10:00]--[2024-01-01 Mon 11:30]",
                "<2024-01-01 Mon ++1y>",
                "<2024-01-01 Mon -3d>",
            ] {
                let (_, t) = time(text).unwrap();
                assert_eq!(show_time(&t), text);
            }
        }

        #[test]
        fn empty_drawer_survives_printing() {
            let config = Config::default();
            let text = "* A\n:PROPERTIES:\n:END:\nSCHEDULED: <2024-01-01 Mon>\n** B\n";
            let first = parse(&config, text);
            assert!(first.entries[0].drawer);
            assert!(first.entries[0].stamps.is_empty());

            let printed = format_org_file(&config, &first);
            assert_eq!(printed, text);
            let second = parse(&config, &printed);
            assert_eq!(shape(&first), shape(&second));

            let inherited = inherit_properties(&[], &first.entries[0]);
            let mut out = Vec::new();
            show_entry(&config, &inherited.children[0], &mut out);
            assert_eq!(out, vec!["** B"]);
        }

        #[test]
        fn empty_file_prints_nothing() {
            let config = Config::default();
            assert_eq!(format_org_file(&config, &OrgFile::new("e.org")), "");
        }
    }
}

pub mod lint {
    //! Consistency checks over parsed trees.
    //!
    //! Every finding is data: checks never fail and never stop early, and the
    //! minimum severity only filters what is returned.

    use crate::config::{Config, ReplayOrder};
    use crate::core::*;
    use crate::data::{entries_by_id, property};
    use crate::format::show_time;
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;

    #[derive(
        Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(rename_all = "UPPERCASE")]
    pub enum Severity {
        Debug,
        Info,
        Warn,
        Error,
    }

    impl fmt::Display for Severity {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Severity::Debug => "DEBUG",
                Severity::Info => "INFO",
                Severity::Warn => "WARN",
                Severity::Error => "ERROR",
            })
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    #[error("unknown severity {0:?}, expected DEBUG, INFO, WARN or ERROR")]
    pub struct UnknownSeverity(pub String);

    impl FromStr for Severity {
        type Err = UnknownSeverity;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.to_ascii_uppercase().as_str() {
                "DEBUG" => Ok(Severity::Debug),
                "INFO" => Ok(Severity::Info),
                "WARN" => Ok(Severity::Warn),
                "ERROR" => Ok(Severity::Error),
                _ => Err(UnknownSeverity(s.to_string())),
            }
        }
    }

    /// Why a recorded state change does not chain with its neighbours.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub enum TransitionProblem {
        /// The oldest change starts outside `Config::initial_states`.
        FirstTransition { from: String },
        /// A change does not start where the previous one ended.
        FromMismatch {
            expected: String,
            found: Option<String>,
        },
        /// The headline keyword is not where the history ends.
        EndMismatch {
            expected: String,
            found: Option<String>,
        },
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub enum LintCode {
        TodoMissingProperty(String),
        CategoryTooLong { category: String, max: usize },
        MisplacedProperty,
        MisplacedTimestamp(String),
        MisplacedLogEntry(String),
        MisplacedDrawerEnd(String),
        TitleWithExcessiveWhitespace,
        DuplicateTag(String),
        DuplicateProperty(String),
        DuplicateFileProperty(String),
        DuplicatedIdentifier { id: String, locations: Vec<Loc> },
        InvalidStateChangeTransitionNotAllowed {
            from: String,
            to: String,
            allowed: Vec<String>,
        },
        InvalidStateChangeInvalidTransition(TransitionProblem),
        InvalidStateChangeWrongTimeOrder { previous: Time, current: Time },
        InvalidStateChangeIdempotent(String),
        TimestampsOnNonTodo,
        UnevenBodyWhitespace { leading: usize, trailing: usize },
        EmptyBodyWhitespace,
        MultipleBlankLines(usize),
        MultipleLogbooks,
        MixedLogbooks,
    }

    impl LintCode {
        pub fn severity(&self) -> Severity {
            match self {
                LintCode::TitleWithExcessiveWhitespace => Severity::Info,
                LintCode::CategoryTooLong { .. }
                | LintCode::UnevenBodyWhitespace { .. }
                | LintCode::EmptyBodyWhitespace
                | LintCode::MultipleBlankLines(_) => Severity::Warn,
                _ => Severity::Error,
            }
        }
    }

    fn or_nothing(keyword: &Option<String>) -> &str {
        keyword.as_deref().unwrap_or("nothing")
    }

    impl fmt::Display for TransitionProblem {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                TransitionProblem::FirstTransition { from } => {
                    write!(f, "first recorded state change starts from {from}, not an initial state")
                }
                TransitionProblem::FromMismatch { expected, found } => write!(
                    f,
                    "state change starts from {} but the previous one ended in {expected}",
                    or_nothing(found)
                ),
                TransitionProblem::EndMismatch { expected, found } => write!(
                    f,
                    "keyword {} does not match the last recorded state {expected}",
                    or_nothing(found)
                ),
            }
        }
    }

    impl fmt::Display for LintCode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                LintCode::TodoMissingProperty(name) => {
                    write!(f, "entry with a keyword or category lacks property {name}")
                }
                LintCode::CategoryTooLong { category, max } => {
                    write!(f, "category {category:?} is longer than {max} characters")
                }
                LintCode::MisplacedProperty => write!(f, "property drawer found in body text"),
                LintCode::MisplacedTimestamp(marker) => {
                    write!(f, "planning stamp {marker:?} found in body text")
                }
                LintCode::MisplacedLogEntry(marker) => {
                    write!(f, "log entry {marker:?} found in body text")
                }
                LintCode::MisplacedDrawerEnd(marker) => {
                    write!(f, "drawer end {marker:?} found in body text")
                }
                LintCode::TitleWithExcessiveWhitespace => {
                    write!(f, "title contains consecutive spaces")
                }
                LintCode::DuplicateTag(name) => write!(f, "duplicate tag {name}"),
                LintCode::DuplicateProperty(name) => write!(f, "duplicate property {name}"),
                LintCode::DuplicateFileProperty(name) => {
                    write!(f, "duplicate file property {name}")
                }
                LintCode::DuplicatedIdentifier { id, locations } => {
                    let places: Vec<String> = locations.iter().map(Loc::to_string).collect();
                    write!(
                        f,
                        "identifier {id} is shared by {} entries: {}",
                        locations.len(),
                        places.join(", ")
                    )
                }
                LintCode::InvalidStateChangeTransitionNotAllowed { from, to, allowed } => {
                    if allowed.is_empty() {
                        write!(f, "{from} -> {to} is not allowed; {from} is final")
                    } else {
                        write!(
                            f,
                            "{from} -> {to} is not allowed; {from} may go to {}",
                            allowed.join(", ")
                        )
                    }
                }
                LintCode::InvalidStateChangeInvalidTransition(problem) => write!(f, "{problem}"),
                LintCode::InvalidStateChangeWrongTimeOrder { previous, current } => write!(
                    f,
                    "state change at {} is older than the one before it at {}",
                    show_time(current),
                    show_time(previous)
                ),
                LintCode::InvalidStateChangeIdempotent(keyword) => {
                    write!(f, "state change from {keyword} to itself")
                }
                LintCode::TimestampsOnNonTodo => {
                    write!(f, "planning stamps on an entry without an open keyword")
                }
                LintCode::UnevenBodyWhitespace { leading, trailing } => write!(
                    f,
                    "body has {leading} leading but {trailing} trailing blank lines"
                ),
                LintCode::EmptyBodyWhitespace => write!(f, "open entry has a whitespace-only body"),
                LintCode::MultipleBlankLines(n) => write!(f, "{n} consecutive blank lines"),
                LintCode::MultipleLogbooks => write!(f, "more than one logbook drawer"),
                LintCode::MixedLogbooks => {
                    write!(f, "log entries both inside and outside the logbook drawer")
                }
            }
        }
    }

    /// One finding, renderable as `path:line:col: SEVERITY message`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LintMessage {
        pub loc: Loc,
        pub severity: Severity,
        pub code: LintCode,
    }

    impl LintMessage {
        pub fn new(loc: Loc, code: LintCode) -> Self {
            Self {
                loc,
                severity: code.severity(),
                code,
            }
        }
    }

    impl fmt::Display for LintMessage {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}: {} {}", self.loc, self.severity, self.code)
        }
    }

    /* ---------------------------- Entry points ---------------------------- */

    /// Cross-file identifier check first, then every file in order.
    pub fn lint_org_data(config: &Config, min: Severity, data: &OrgData) -> Vec<LintMessage> {
        let mut out = Vec::new();
        check_identifiers(data, &mut out);
        for file in data.files.values() {
            check_file(config, file, &mut out);
        }
        tracing::debug!(files = data.files.len(), findings = out.len(), "lint finished");
        out.retain(|m| m.severity >= min);
        out
    }

    /// Per-file checks only; identifiers are not compared across files.
    pub fn lint_org_file(config: &Config, min: Severity, file: &OrgFile) -> Vec<LintMessage> {
        let mut out = Vec::new();
        check_file(config, file, &mut out);
        out.retain(|m| m.severity >= min);
        out
    }

    fn report(out: &mut Vec<LintMessage>, loc: &Loc, code: LintCode) {
        out.push(LintMessage::new(loc.clone(), code));
    }

    /// Names seen more than once, each reported once, in first-seen order.
    fn duplicates<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
        let mut seen = Vec::new();
        let mut dups = Vec::new();
        for name in names {
            if seen.contains(&name) {
                if !dups.contains(&name) {
                    dups.push(name);
                }
            } else {
                seen.push(name);
            }
        }
        dups
    }

    fn check_identifiers(data: &OrgData, out: &mut Vec<LintMessage>) {
        for (id, entries) in entries_by_id(data) {
            if id.is_empty() || entries.len() < 2 {
                continue;
            }
            let locations = entries.iter().map(|e| e.loc.clone()).collect();
            report(
                out,
                &entries[0].loc,
                LintCode::DuplicatedIdentifier { id, locations },
            );
        }
    }

    fn check_file(config: &Config, file: &OrgFile, out: &mut Vec<LintMessage>) {
        let names = file.header.file_properties.iter().map(|p| p.name.as_str());
        for name in duplicates(names) {
            report(
                out,
                &Loc::new(&file.path, 1, 1),
                LintCode::DuplicateFileProperty(name.to_string()),
            );
        }

        let entries = file.all_entries();
        for (i, entry) in entries.iter().enumerate() {
            tracing::trace!(line = entry.loc.line, "linting entry");
            check_entry(config, entry, i + 1 == entries.len(), out);
        }
    }

    fn check_entry(config: &Config, entry: &Entry, is_last: bool, out: &mut Vec<LintMessage>) {
        if entry.keyword.is_some() || property(entry, "CATEGORY").is_some() {
            for name in ["ID", "CREATED"] {
                if property(entry, name).is_none() {
                    report(out, &entry.loc, LintCode::TodoMissingProperty(name.into()));
                }
            }
        }
        if let Some(category) = property(entry, "CATEGORY") {
            if category.chars().count() > config.max_category_length {
                let code = LintCode::CategoryTooLong {
                    category: category.to_string(),
                    max: config.max_category_length,
                };
                report(out, &entry.loc, code);
            }
        }

        check_body_leaks(entry, out);

        if entry.title.contains("  ") {
            report(out, &entry.loc, LintCode::TitleWithExcessiveWhitespace);
        }
        for name in duplicates(entry.tags.iter().map(Tag::name)) {
            report(out, &entry.loc, LintCode::DuplicateTag(name.to_string()));
        }
        let own = entry
            .properties
            .iter()
            .filter(|p| !p.inherited)
            .map(|p| p.name.as_str());
        for name in duplicates(own) {
            report(out, &entry.loc, LintCode::DuplicateProperty(name.to_string()));
        }

        check_transitions(config, entry, out);

        if !entry.stamps.is_empty() && !entry.is_active() {
            report(out, &entry.loc, LintCode::TimestampsOnNonTodo);
        }

        check_whitespace(entry, is_last, out);
        check_logbooks(entry, out);
    }

    /* ----------------------------- Body leaks ----------------------------- */

    const PLANNING_MARKERS: [&str; 3] = ["SCHEDULED:", "DEADLINE:", "CLOSED:"];

    const LOG_MARKERS: [&str; 8] = [
        "- State \"",
        "- Note taken on ",
        "- CLOSING NOTE ",
        "- Rescheduled from ",
        "- Not scheduled, was ",
        "- New deadline from ",
        "- Removed deadline, was ",
        "- Refiled on ",
    ];

    /// Paragraph text that should have parsed as structure.
    fn check_body_leaks(entry: &Entry, out: &mut Vec<LintMessage>) {
        for block in &entry.body.blocks {
            let Block::Paragraph { loc, lines } = block else {
                continue;
            };
            for (n, line) in lines.iter().enumerate() {
                let at = Loc::new(&loc.file, loc.line + n, 1);
                let lower = line.to_lowercase();
                if lower.contains(":properties:") {
                    report(out, &at, LintCode::MisplacedProperty);
                }
                for marker in PLANNING_MARKERS {
                    if line.contains(marker) {
                        report(out, &at, LintCode::MisplacedTimestamp(marker.into()));
                    }
                }
                for marker in LOG_MARKERS {
                    if line.contains(marker) {
                        report(out, &at, LintCode::MisplacedLogEntry(marker.into()));
                    }
                }
                if lower.contains(":logbook:") {
                    report(out, &at, LintCode::MisplacedLogEntry(":logbook:".into()));
                }
                for marker in [":end:", "#+end"] {
                    if lower.contains(marker) {
                        report(out, &at, LintCode::MisplacedDrawerEnd(marker.into()));
                    }
                }
            }
        }
    }

    /* ------------------------- State transitions ------------------------- */

    struct Change<'a> {
        loc: &'a Loc,
        from: Option<&'a str>,
        to: &'a str,
        time: &'a Time,
    }

    fn collect_changes<'a>(log: &'a [LogEntry], out: &mut Vec<Change<'a>>) {
        for entry in log {
            match entry {
                LogEntry::StateChange {
                    loc, from, to, time, ..
                } => out.push(Change {
                    loc,
                    from: from.as_deref(),
                    to,
                    time,
                }),
                LogEntry::LogBook { entries, .. } => collect_changes(entries, out),
                _ => {}
            }
        }
    }

    /// Replay the state history and check each step against its predecessor.
    fn check_transitions(config: &Config, entry: &Entry, out: &mut Vec<LintMessage>) {
        let mut changes = Vec::new();
        collect_changes(&entry.log, &mut changes);
        if config.replay_order == ReplayOrder::OldestFirst {
            changes.reverse();
        }

        let mut previous: Option<(&str, &Time)> = None;
        for change in &changes {
            let mut in_order = true;
            if let Some((_, before)) = previous {
                if change.time.instant() < before.instant() {
                    in_order = false;
                    let code = LintCode::InvalidStateChangeWrongTimeOrder {
                        previous: before.clone(),
                        current: change.time.clone(),
                    };
                    report(out, change.loc, code);
                }
            }

            let problem = match (previous, change.from) {
                (None, Some(from)) if !config.initial_states.iter().any(|s| s == from) => {
                    Some(TransitionProblem::FirstTransition {
                        from: from.to_string(),
                    })
                }
                (Some((ended, _)), found) if found != Some(ended) => {
                    Some(TransitionProblem::FromMismatch {
                        expected: ended.to_string(),
                        found: found.map(str::to_string),
                    })
                }
                _ => None,
            };
            if let Some(problem) = problem {
                report(
                    out,
                    change.loc,
                    LintCode::InvalidStateChangeInvalidTransition(problem),
                );
            }

            match change.from {
                Some(from) if from == change.to => {
                    report(
                        out,
                        change.loc,
                        LintCode::InvalidStateChangeIdempotent(from.to_string()),
                    );
                }
                Some(from) if in_order => {
                    let allowed = config.transitions_of(from);
                    if !allowed.iter().any(|k| k == change.to) {
                        let code = LintCode::InvalidStateChangeTransitionNotAllowed {
                            from: from.to_string(),
                            to: change.to.to_string(),
                            allowed: allowed.to_vec(),
                        };
                        report(out, change.loc, code);
                    }
                }
                _ => {}
            }

            previous = Some((change.to, change.time));
        }

        if let Some((last, _)) = previous {
            let current = entry.keyword.as_ref().map(Keyword::text);
            if current != Some(last) {
                let problem = TransitionProblem::EndMismatch {
                    expected: last.to_string(),
                    found: current.map(str::to_string),
                };
                report(
                    out,
                    &entry.loc,
                    LintCode::InvalidStateChangeInvalidTransition(problem),
                );
            }
        }
    }

    /* ------------------------ Whitespace & Logbooks ------------------------ */

    fn check_whitespace(entry: &Entry, is_last: bool, out: &mut Vec<LintMessage>) {
        let body = &entry.body;
        let (leading, trailing) = (body.leading_whitespace(), body.trailing_whitespace());
        if !is_last && leading != trailing {
            report(
                out,
                &entry.loc,
                LintCode::UnevenBodyWhitespace { leading, trailing },
            );
        }

        if entry.is_active() {
            let blank_log = all_log_texts(&entry.log)
                .into_iter()
                .any(|text| !text.is_empty() && text.iter().all(|l| l.trim().is_empty()));
            if body.is_whitespace() || blank_log {
                report(out, &entry.loc, LintCode::EmptyBodyWhitespace);
            }
        }

        for block in &body.blocks {
            if let Block::Whitespace { loc, lines } = block {
                if *lines > 1 {
                    report(out, loc, LintCode::MultipleBlankLines(*lines));
                }
            }
        }
    }

    fn all_log_texts(log: &[LogEntry]) -> Vec<&[String]> {
        let mut out = Vec::new();
        for entry in log {
            match entry {
                LogEntry::LogBook { entries, .. } => out.extend(all_log_texts(entries)),
                other => out.push(other.text()),
            }
        }
        out
    }

    fn check_logbooks(entry: &Entry, out: &mut Vec<LintMessage>) {
        let logbooks: Vec<&LogEntry> = entry
            .log
            .iter()
            .filter(|l| matches!(l, LogEntry::LogBook { .. }))
            .collect();
        if logbooks.len() > 1 {
            report(out, logbooks[1].loc(), LintCode::MultipleLogbooks);
        }
        if !logbooks.is_empty() && logbooks.len() < entry.log.len() {
            report(out, &entry.loc, LintCode::MixedLogbooks);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::parser::parse_org_file;

        fn corpus(config: &Config, files: &[(&str, &str)]) -> OrgData {
            files
                .iter()
                .map(|(path, text)| parse_org_file(config, path, text).unwrap())
                .collect()
        }

        fn lint_with(config: &Config, min: Severity, text: &str) -> Vec<LintMessage> {
            lint_org_data(config, min, &corpus(config, &[("t.org", text)]))
        }

        fn codes(text: &str) -> Vec<LintCode> {
            lint_with(&Config::default(), Severity::Debug, text)
                .into_iter()
                .map(|m| m.code)
                .collect()
        }

        fn task(keyword: &str, log: &[&str]) -> String {
            let mut text = format!(
                "* {keyword} Task\n:PROPERTIES:\n:ID: t\n:CREATED: [2024-01-01 Mon]\n:END:\n"
            );
            for line in log {
                text.push_str(line);
                text.push('\n');
            }
            text
        }

        const REOPENED: [&str; 3] = [
            "- State \"TODO\"       from \"DONE\"       [2024-01-03 Wed 10:00]",
            "- State \"DONE\"       from \"TODO\"       [2024-01-02 Tue 10:00]",
            "- State \"TODO\"       from              [2024-01-01 Mon 10:00]",
        ];

        #[test]
        fn complete_task_is_clean() {
            let text = "* TODO Buy milk\n:PROPERTIES:\n:ID: abc\n:CREATED: [2024-01-01 Mon]\n:END:\n";
            assert!(lint_with(&Config::default(), Severity::Info, text).is_empty());
        }

        #[test]
        fn task_without_drawer_lacks_id_and_created() {
            let msgs = lint_with(&Config::default(), Severity::Info, "* TODO Buy milk\n");
            assert_eq!(
                msgs.iter().map(|m| m.code.clone()).collect::<Vec<_>>(),
                vec![
                    LintCode::TodoMissingProperty("ID".into()),
                    LintCode::TodoMissingProperty("CREATED".into())
                ]
            );
            assert!(msgs.iter().all(|m| m.severity == Severity::Error));
            assert_eq!(
                msgs[0].to_string(),
                "t.org:1:1: ERROR entry with a keyword or category lacks property ID"
            );
        }

        #[test]
        fn reopening_a_final_state_is_not_allowed() {
            assert_eq!(
                codes(&task("TODO", &REOPENED)),
                vec![LintCode::InvalidStateChangeTransitionNotAllowed {
                    from: "DONE".into(),
                    to: "TODO".into(),
                    allowed: vec![],
                }]
            );
        }

        #[test]
        fn out_of_order_history() {
            let log = [
                "- State \"TODO\"       from \"DONE\"       [2024-01-02 Tue 09:00]",
                REOPENED[1],
                REOPENED[2],
            ];
            let found = codes(&task("TODO", &log));
            assert_eq!(found.len(), 1);
            assert!(matches!(
                found[0],
                LintCode::InvalidStateChangeWrongTimeOrder { .. }
            ));
        }

        #[test]
        fn idempotent_change_skips_the_allow_list() {
            let log = [
                "- State \"DONE\"       from \"DONE\"       [2024-01-03 Wed 10:00]",
                REOPENED[1],
                REOPENED[2],
            ];
            assert_eq!(
                codes(&task("DONE", &log)),
                vec![LintCode::InvalidStateChangeIdempotent("DONE".into())]
            );
        }

        #[test]
        fn broken_chains() {
            let mismatch = task(
                "DONE",
                &[
                    "- State \"DONE\"       from \"WAIT\"       [2024-01-02 Tue 10:00]",
                    "- State \"TODO\"       from              [2024-01-01 Mon 10:00]",
                ],
            );
            assert_eq!(
                codes(&mismatch),
                vec![LintCode::InvalidStateChangeInvalidTransition(
                    TransitionProblem::FromMismatch {
                        expected: "TODO".into(),
                        found: Some("WAIT".into()),
                    }
                )]
            );

            let first = task(
                "DONE",
                &["- State \"DONE\"       from \"WAIT\"       [2024-01-01 Mon 10:00]"],
            );
            assert_eq!(
                codes(&first),
                vec![LintCode::InvalidStateChangeInvalidTransition(
                    TransitionProblem::FirstTransition {
                        from: "WAIT".into()
                    }
                )]
            );

            let end = task(
                "TODO",
                &["- State \"DONE\"       from \"TODO\"       [2024-01-01 Mon 10:00]"],
            );
            assert_eq!(
                codes(&end),
                vec![LintCode::InvalidStateChangeInvalidTransition(
                    TransitionProblem::EndMismatch {
                        expected: "DONE".into(),
                        found: Some("TODO".into()),
                    }
                )]
            );
        }

        #[test]
        fn replay_order_is_configurable() {
            let text = task("TODO", &REOPENED);
            let wrong_order = |config: &Config| {
                lint_with(config, Severity::Debug, &text)
                    .iter()
                    .filter(|m| {
                        matches!(m.code, LintCode::InvalidStateChangeWrongTimeOrder { .. })
                    })
                    .count()
            };
            assert_eq!(wrong_order(&Config::default()), 0);
            let as_recorded = Config {
                replay_order: ReplayOrder::AsRecorded,
                ..Config::default()
            };
            assert_eq!(wrong_order(&as_recorded), 2);
        }

        #[test]
        fn severity_filter_keeps_order() {
            let config = Config::default();
            let text = "* Title  with gap\n* TODO Buy\n\n\ntext\n* Last\n";
            let all = lint_with(&config, Severity::Debug, text);
            let warn = lint_with(&config, Severity::Warn, text);
            assert!(all.iter().any(|m| m.severity == Severity::Info));
            let expected: Vec<LintMessage> = all
                .into_iter()
                .filter(|m| m.severity >= Severity::Warn)
                .collect();
            assert_eq!(warn, expected);
            assert!(!warn.is_empty());
        }

        #[test]
        fn duplicate_ids_across_files() {
            let config = Config::default();
            let data = corpus(
                &config,
                &[
                    ("a.org", "* One\n:PROPERTIES:\n:ID: abc\n:END:\n"),
                    (
                        "b.org",
                        "* Two\n:PROPERTIES:\n:ID: abc\n:END:\n* Three\n:PROPERTIES:\n:ID: def\n:END:\n",
                    ),
                ],
            );
            let dups: Vec<LintCode> = lint_org_data(&config, Severity::Debug, &data)
                .into_iter()
                .map(|m| m.code)
                .filter(|c| matches!(c, LintCode::DuplicatedIdentifier { .. }))
                .collect();
            assert_eq!(dups.len(), 1);
            match &dups[0] {
                LintCode::DuplicatedIdentifier { id, locations } => {
                    assert_eq!(id, "abc");
                    let places: Vec<String> = locations.iter().map(Loc::to_string).collect();
                    assert_eq!(places, vec!["a.org:1:1", "b.org:1:1"]);
                }
                other => panic!("unexpected {other:?}"),
            }

            let unique = corpus(
                &config,
                &[
                    ("a.org", "* One\n:PROPERTIES:\n:ID: abc\n:END:\n"),
                    ("b.org", "* Two\n:PROPERTIES:\n:ID: def\n:END:\n"),
                ],
            );
            assert!(lint_org_data(&config, Severity::Debug, &unique).is_empty());
        }

        #[test]
        fn structure_leaking_into_body() {
            let text = "* Note\nSome text\n:PROPERTIES:\nSCHEDULED: <2024-01-01 Mon>\n- Note taken on [2024-01-01 Mon 10:00]\n:END:\n";
            let msgs = lint_with(&Config::default(), Severity::Debug, text);
            assert_eq!(
                msgs.iter().map(|m| m.code.clone()).collect::<Vec<_>>(),
                vec![
                    LintCode::MisplacedProperty,
                    LintCode::MisplacedTimestamp("SCHEDULED:".into()),
                    LintCode::MisplacedLogEntry("- Note taken on ".into()),
                    LintCode::MisplacedDrawerEnd(":end:".into()),
                ]
            );
            assert_eq!(
                msgs.iter().map(|m| m.loc.line).collect::<Vec<_>>(),
                vec![3, 4, 5, 6]
            );

            assert!(codes("* Src\n#+begin_example\nSCHEDULED: x\n#+end_example\n").is_empty());
        }

        #[test]
        fn body_whitespace() {
            assert_eq!(
                codes("* A\n\ntext\n* B\ntext\n\n\n* C\n"),
                vec![
                    LintCode::UnevenBodyWhitespace {
                        leading: 1,
                        trailing: 0
                    },
                    LintCode::UnevenBodyWhitespace {
                        leading: 0,
                        trailing: 2
                    },
                    LintCode::MultipleBlankLines(2),
                ]
            );
            assert!(codes("* A\ntext\n\n").is_empty());
            assert_eq!(
                codes("* TODO X\n:PROPERTIES:\n:ID: x\n:CREATED: [2024-01-01 Mon]\n:END:\n\n* B\n"),
                vec![LintCode::EmptyBodyWhitespace]
            );
        }

        #[test]
        fn blank_log_text_on_open_entries() {
            let blank_note = |keyword: &str| {
                let mut text = task(keyword, &["- Note taken on [2024-01-01 Mon 10:00] \\\\"]);
                text.push_str("   \n");
                text
            };
            assert_eq!(
                codes(&blank_note("TODO")),
                vec![LintCode::EmptyBodyWhitespace]
            );
            assert!(codes(&blank_note("DONE")).is_empty());

            let blank_state = task(
                "TODO",
                &[
                    "- State \"TODO\"       from              [2024-01-01 Mon 10:00] \\\\",
                    "  \t",
                ],
            );
            assert_eq!(codes(&blank_state), vec![LintCode::EmptyBodyWhitespace]);
        }

        #[test]
        fn logbook_placement() {
            let text = "* A\n- Note taken on [2024-01-01 Mon 10:00]\n:LOGBOOK:\n- Note taken on [2024-01-01 Mon 09:00]\n:END:\n:LOGBOOK:\n:END:\n";
            assert_eq!(
                codes(text),
                vec![LintCode::MultipleLogbooks, LintCode::MixedLogbooks]
            );
        }

        #[test]
        fn entry_level_checks() {
            let text = "* Title  with   gaps :a:b:a:\n:PROPERTIES:\n:X: 1\n:X: 2\n:CATEGORY: averyverylongcategory\n:END:\n";
            assert_eq!(
                codes(text),
                vec![
                    LintCode::TodoMissingProperty("ID".into()),
                    LintCode::TodoMissingProperty("CREATED".into()),
                    LintCode::CategoryTooLong {
                        category: "averyverylongcategory".into(),
                        max: 10
                    },
                    LintCode::TitleWithExcessiveWhitespace,
                    LintCode::DuplicateTag("a".into()),
                    LintCode::DuplicateProperty("X".into()),
                ]
            );
            assert_eq!(
                codes("* Plain\nSCHEDULED: <2024-01-01 Mon>\n"),
                vec![LintCode::TimestampsOnNonTodo]
            );
            let done = "* DONE Shipped\nCLOSED: [2024-01-02 Tue]\n:PROPERTIES:\n:ID: s\n:CREATED: [2024-01-01 Mon]\n:END:\n";
            assert_eq!(codes(done), vec![LintCode::TimestampsOnNonTodo]);
            let open = "* TODO Ship\nSCHEDULED: <2024-01-02 Tue>\n:PROPERTIES:\n:ID: s\n:CREATED: [2024-01-01 Mon]\n:END:\n";
            assert!(codes(open).is_empty());
            assert_eq!(
                codes("#+TITLE: a\n#+TITLE: b\n#+TITLE: c\n* X\n"),
                vec![LintCode::DuplicateFileProperty("TITLE".into())]
            );
        }

        #[test]
        fn severity_tokens() {
            assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warn));
            assert_eq!("ERROR".parse::<Severity>(), Ok(Severity::Error));
            assert!("loud".parse::<Severity>().is_err());
            assert!(Severity::Debug < Severity::Info && Severity::Warn < Severity::Error);
            assert_eq!(Severity::Info.to_string(), "INFO");
        }
    }
}

pub use crate::config::{Config, ConfigError, ReplayOrder};
pub use crate::core::*;
pub use crate::data::{
    UnsupportedProperty, any_property, entries_by_id, inherit_file_properties,
    inherit_properties, property,
};
pub use crate::format::{format_org_file, show_org_file};
pub use crate::lint::{LintCode, LintMessage, Severity, lint_org_data, lint_org_file};
pub use crate::parser::{ParseError, parse_org_data, parse_org_file};
