use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::amc::AmcProfile;
use crate::cells::to_clean_string;
use crate::workbook::{Sheet, Workbook};

#[derive(Debug, Clone, PartialEq)]
pub struct SchemeIndexEntry {
    pub short_code: String,
    pub display_name: Option<String>,
    /// AMC-assigned numeric scheme code, when the index carries one.
    pub scheme_code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SchemeIndex {
    entries: HashMap<String, SchemeIndexEntry>,
}

impl SchemeIndex {
    pub fn get(&self, short_code: &str) -> Option<&SchemeIndexEntry> {
        self.entries.get(short_code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, entry: SchemeIndexEntry) {
        // Last occurrence wins.
        self.entries.insert(entry.short_code.clone(), entry);
    }
}

/// Read the workbook's auxiliary index sheet. A workbook without one yields
/// an empty index; callers fall back through [`resolve_display_name`].
pub fn parse_scheme_index(workbook: &Workbook, profile: &AmcProfile) -> SchemeIndex {
    let mut index = SchemeIndex::default();
    if profile.index_sheets.is_empty() {
        return index;
    }
    let Some(sheet) = workbook.find_sheet(profile.index_sheets) else {
        warn!("No index sheet found (tried {:?})", profile.index_sheets);
        return index;
    };

    for row in sheet.rows.iter().skip(profile.index_header_rows) {
        let code = row.get(profile.index_code_column).and_then(to_clean_string);
        let name = row.get(profile.index_name_column).and_then(to_clean_string);
        let Some(code) = code else { continue };
        if name.is_none() && !profile.index_keeps_unnamed {
            continue;
        }
        let scheme_code = profile
            .index_scheme_code_column
            .and_then(|col| row.get(col))
            .and_then(to_clean_string);
        debug!("  {code} -> {}", name.as_deref().unwrap_or("(unnamed)"));
        index.insert(SchemeIndexEntry {
            short_code: code,
            display_name: name,
            scheme_code,
        });
    }

    info!("Parsed {} sheet: {} schemes", sheet.name, index.len());
    index
}

pub struct NameContext<'a> {
    pub short_code: &'a str,
    pub sheet: &'a Sheet,
    pub index: &'a SchemeIndex,
    pub profile: &'a AmcProfile,
}

type NameResolver = fn(&NameContext) -> Option<String>;

const NAME_RESOLVERS: &[(&str, NameResolver)] = &[
    ("index", name_from_index),
    ("static table", name_from_static_table),
    ("sheet title", name_from_sheet_title),
];

/// Display name for a scheme sheet. Never empty: when every source comes up
/// blank the result is `Unknown Scheme (<code>)`.
pub fn resolve_display_name(ctx: &NameContext) -> String {
    for (source, resolver) in NAME_RESOLVERS {
        if let Some(name) = resolver(ctx) {
            debug!("  {}: name from {source}", ctx.short_code);
            return name;
        }
    }
    format!("Unknown Scheme ({})", ctx.short_code)
}

fn name_from_index(ctx: &NameContext) -> Option<String> {
    ctx.index.get(ctx.short_code)?.display_name.clone()
}

fn name_from_static_table(ctx: &NameContext) -> Option<String> {
    ctx.profile
        .static_names
        .iter()
        .find(|(code, _)| *code == ctx.short_code)
        .map(|(_, name)| name.to_string())
}

fn name_from_sheet_title(ctx: &NameContext) -> Option<String> {
    let (row, col) = ctx.profile.title_cell?;
    let title = to_clean_string(ctx.sheet.cell(row, col))?;
    match ctx.profile.title_keyword {
        Some(keyword) if !title.to_lowercase().contains(keyword) => None,
        _ => Some(title),
    }
}
