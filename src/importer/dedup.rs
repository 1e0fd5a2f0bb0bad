use std::collections::HashMap;

use crate::models::{Keyed, NaturalKey, ParsedRow, RecordKind, RowStatus};

/// Read-only natural-key index over the records already persisted.
#[derive(Debug, Clone, Default)]
pub struct ExistingIndex {
    ids: HashMap<NaturalKey, String>,
}

impl ExistingIndex {
    /// If the snapshot holds two records with one key, the first one wins.
    pub fn from_records<R: Keyed>(records: &[R]) -> Self {
        let mut ids = HashMap::with_capacity(records.len());
        for record in records {
            ids.entry(record.natural_key())
                .or_insert_with(|| record.id().to_string());
        }
        Self { ids }
    }

    pub fn lookup(&self, key: &NaturalKey) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub is_update: bool,
    pub matched_id: Option<String>,
}

pub fn plan(key: &NaturalKey, existing: &ExistingIndex) -> MergePlan {
    let matched_id = existing.lookup(key).map(str::to_string);
    MergePlan {
        is_update: matched_id.is_some(),
        matched_id,
    }
}

/// Natural key of a row, when enough of it validated to build one.
pub fn row_key(kind: RecordKind, row: &ParsedRow) -> Option<NaturalKey> {
    let category = row.normalized.category.as_deref()?;
    match kind {
        RecordKind::Actual => {
            let period = &row.resolved_period.as_ref()?.period;
            Some(NaturalKey::actual(period, category))
        }
        RecordKind::Budget => {
            let year = row.normalized.year?;
            if row.normalized.teams.is_empty() {
                return None;
            }
            Some(NaturalKey::budget(year, category, &row.normalized.teams))
        }
    }
}

/// Match every row against the existing index.
///
/// Valid rows of the same batch sharing a natural key do not each hit the
/// database: the last one in the file wins and the earlier ones are held
/// back with a warning.
pub fn plan_batch(kind: RecordKind, rows: &mut [ParsedRow], existing: &ExistingIndex) {
    let keys: Vec<Option<NaturalKey>> = rows.iter().map(|r| row_key(kind, r)).collect();

    let mut last_valid: HashMap<&NaturalKey, usize> = HashMap::new();
    for (pos, key) in keys.iter().enumerate() {
        if let Some(key) = key {
            if rows[pos].status == RowStatus::Valid {
                last_valid.insert(key, pos);
            }
        }
    }

    for (pos, key) in keys.iter().enumerate() {
        let Some(key) = key else {
            rows[pos].is_update = false;
            rows[pos].matched_existing_id = None;
            continue;
        };
        let winner = last_valid.get(key).copied();
        if rows[pos].status == RowStatus::Valid && winner != Some(pos) {
            let winner_row = winner.map(|w| rows[w].sheet_row()).unwrap_or_default();
            let row = &mut rows[pos];
            row.warnings.push(format!("Superseded by row {winner_row}"));
            row.status = RowStatus::NeedsMapping;
            row.is_update = false;
            row.matched_existing_id = None;
            continue;
        }
        let MergePlan {
            is_update,
            matched_id,
        } = plan(key, existing);
        rows[pos].is_update = is_update;
        rows[pos].matched_existing_id = matched_id;
    }
}
