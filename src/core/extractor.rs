//! Turns schedule cells from the portal's week page into [`ScheduleEntry`] values.
//!
//! Each cell is an `<a>` element with exactly four attributes. The entry id
//! sits in the `absid` query parameter of `href` and every other field is a
//! line in the `data-additionalinfo` blob. Lines are matched in order against
//! a fixed rule table; homework and notes are greedy blocks.

use crate::core::abbreviations::GroupAbbreviations;
use crate::core::blacklist::Blacklist;
use crate::core::timespan::{find_span, parse_time_span};
use crate::domain::model::{EntryStatus, ScheduleEntry, ScheduleSnapshot};
use crate::utils::error::ParseError;
use chrono::DateTime;
use chrono_tz::Tz;
use scraper::{ElementRef, Html};

pub const ENTRY_ID_PARAM: &str = "absid";
pub const DETAILS_ATTR: &str = "data-additionalinfo";
const ENTRY_ATTR_COUNT: usize = 4;

const TEACHER_PREFIXES: [&str; 2] = ["Lærer: ", "Lærere: "];
const ROOM_PREFIXES: [&str; 2] = ["Lokale: ", "Lokaler: "];
const GROUP_PREFIX: &str = "Hold: ";
const HOMEWORK_MARKER: &str = "Lektier:";
const NOTES_MARKER: &str = "Note:";
const ROSTER_PREFIXES: [&str; 2] = ["Elever:", "Elev:"];
/// Title fragments are only taken from the first lines of the blob.
const TITLE_LINE_LIMIT: usize = 2;

/// Everything extraction depends on besides the markup itself.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub timezone: Tz,
    pub blacklist: Blacklist,
    pub abbreviations: GroupAbbreviations,
}

impl ExtractorConfig {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            blacklist: Blacklist::default(),
            abbreviations: GroupAbbreviations::disabled(),
        }
    }

    pub fn with_blacklist(mut self, blacklist: Blacklist) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn with_abbreviations(mut self, abbreviations: GroupAbbreviations) -> Self {
        self.abbreviations = abbreviations;
        self
    }
}

/// Pre-order walk over `document` yielding anchors that look like schedule cells.
pub fn schedule_fragments(document: &Html) -> impl Iterator<Item = ElementRef<'_>> + '_ {
    document
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| {
            let value = element.value();
            value.name() == "a" && value.attrs().count() == ENTRY_ATTR_COUNT
        })
}

/// Reads the `absid` query parameter from a cell link.
pub fn entry_id(href: &str) -> Option<String> {
    let (_, query) = href.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == ENTRY_ID_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    ScanningFields,
    ConsumingHomework,
    ConsumingNotes,
    Done,
}

#[derive(Debug, Default)]
struct EntryBuilder {
    title: Option<String>,
    group_resolved: bool,
    span: Option<(DateTime<Tz>, DateTime<Tz>)>,
    room: String,
    teacher: String,
    group: String,
    homework: String,
    notes: String,
    status: EntryStatus,
}

impl EntryBuilder {
    /// Applies the first matching field rule to `line` and returns the next state.
    fn apply_field(
        &mut self,
        index: usize,
        line: &str,
        config: &ExtractorConfig,
    ) -> Result<ScanState, ParseError> {
        if let Some(token) = find_span(line) {
            self.span = Some(parse_time_span(token, config.timezone)?);
        } else if let Some(status) = EntryStatus::from_marker(line) {
            self.status = status;
        } else if TEACHER_PREFIXES.iter().any(|p| line.starts_with(p)) {
            self.teacher = line.to_string();
        } else if ROOM_PREFIXES.iter().any(|p| line.starts_with(p)) {
            self.room = line.to_string();
        } else if let Some(raw_code) = line.strip_prefix(GROUP_PREFIX) {
            self.resolve_group(raw_code, config);
        } else if line.starts_with(HOMEWORK_MARKER) {
            return Ok(ScanState::ConsumingHomework);
        } else if line == NOTES_MARKER {
            return Ok(ScanState::ConsumingNotes);
        } else if is_title_fragment(index, line) {
            if self.group_resolved {
                tracing::trace!("Ignoring title fragment after group line: {}", line);
            } else {
                self.title = Some(line.to_string());
            }
        }
        Ok(ScanState::ScanningFields)
    }

    fn resolve_group(&mut self, raw_code: &str, config: &ExtractorConfig) {
        if self.group_resolved {
            tracing::debug!("Ignoring repeated group line: {}", raw_code);
            return;
        }
        let resolved = config
            .abbreviations
            .resolve(raw_code.trim(), self.title.as_deref());
        self.group = resolved.group;
        self.title = Some(resolved.title);
        self.group_resolved = true;
    }

    fn build(self, id: &str) -> Result<ScheduleEntry, ParseError> {
        let (start, end) = self.span.ok_or_else(|| ParseError::MissingSpan { id: id.to_string() })?;
        Ok(ScheduleEntry {
            id: id.to_string(),
            title: self.title.unwrap_or_default(),
            start,
            end,
            room: self.room,
            teacher: self.teacher,
            group: self.group,
            homework: self.homework,
            notes: self.notes,
            status: self.status,
        })
    }
}

fn is_title_fragment(index: usize, line: &str) -> bool {
    index < TITLE_LINE_LIMIT
        && !line.trim().is_empty()
        && !ROSTER_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Parses one cell's detail blob. Blacklist rules are not applied here.
pub fn parse_details(
    id: &str,
    details: &str,
    config: &ExtractorConfig,
) -> Result<ScheduleEntry, ParseError> {
    let lines: Vec<&str> = details
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .collect();

    let mut builder = EntryBuilder::default();
    let mut state = ScanState::ScanningFields;
    let mut cursor = 0;

    while state != ScanState::Done {
        let Some(&line) = lines.get(cursor) else {
            state = ScanState::Done;
            continue;
        };

        match state {
            ScanState::ScanningFields => {
                state = builder.apply_field(cursor, line, config)?;
                cursor += 1;
            }
            ScanState::ConsumingHomework => {
                if line.starts_with(NOTES_MARKER) {
                    // 交回欄位掃描，由筆記規則處理這一行
                    state = ScanState::ScanningFields;
                } else {
                    builder.homework.push_str(line);
                    builder.homework.push('\n');
                    cursor += 1;
                }
            }
            ScanState::ConsumingNotes => {
                builder.notes.push_str(line);
                builder.notes.push('\n');
                cursor += 1;
            }
            ScanState::Done => {}
        }
    }

    builder.build(id)
}

/// Extracts a single cell. `Ok(None)` means the fragment is not a schedule
/// entry or the entry is blacklisted.
pub fn extract_entry(
    fragment: ElementRef<'_>,
    config: &ExtractorConfig,
) -> Result<Option<ScheduleEntry>, ParseError> {
    let Some(id) = fragment.value().attr("href").and_then(entry_id) else {
        return Ok(None);
    };
    let details = fragment.value().attr(DETAILS_ATTR).unwrap_or_default();

    let entry = parse_details(&id, details, config)?;
    if config.blacklist.is_suppressed(&entry.title, &entry.start) {
        tracing::debug!("Suppressed blacklisted entry {} ({})", entry.id, entry.title);
        return Ok(None);
    }
    Ok(Some(entry))
}

/// Extracts every entry in one week's markup. Entries that fail to parse are
/// logged and skipped.
pub fn extract_week(markup: &str, config: &ExtractorConfig) -> ScheduleSnapshot {
    let document = Html::parse_fragment(markup);
    let mut entries = ScheduleSnapshot::new();

    for fragment in schedule_fragments(&document) {
        match extract_entry(fragment, config) {
            Ok(Some(entry)) => {
                entries.insert(entry.id.clone(), entry);
            }
            Ok(None) => {}
            Err(e) => {
                let id = fragment
                    .value()
                    .attr("href")
                    .and_then(entry_id)
                    .unwrap_or_default();
                tracing::warn!("⚠️ Skipping schedule entry {}: {}", id, e);
            }
        }
    }

    entries
}
