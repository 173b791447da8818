use crate::core::normalize::NormalizedQuery;
use ahash::AHashMap;

/// All executions of one canonical query, in original order.
#[derive(Debug, Clone)]
pub struct DuplicateGroup<'a> {
    pub canonical_sql: &'a str,
    pub members: Vec<&'a NormalizedQuery>,
}

impl<'a> DuplicateGroup<'a> {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// First `limit` members that carry a call stack worth printing.
    ///
    /// The window is taken before filtering, so members without a stack still
    /// use up a slot. The returned index is the member's 1-based position.
    pub fn traceback_members(&self, limit: usize) -> impl Iterator<Item = (usize, &'a NormalizedQuery)> + '_ {
        self.members
            .iter()
            .take(limit)
            .enumerate()
            .filter(|(_, q)| q.call_stack.as_ref().is_some_and(|tb| !tb.is_empty()))
            .map(|(idx, q)| (idx + 1, *q))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateReport<'a> {
    /// Every group, most-repeated first; ties keep encounter order.
    pub groups: Vec<DuplicateGroup<'a>>,
    /// Executions beyond the first, summed over repeated groups.
    pub excess: usize,
}

impl<'a> DuplicateReport<'a> {
    pub fn repeated(&self) -> impl Iterator<Item = &DuplicateGroup<'a>> + '_ {
        self.groups.iter().filter(|g| g.count() > 1)
    }
}

pub fn group_duplicates(queries: &[NormalizedQuery]) -> DuplicateReport<'_> {
    let mut index: AHashMap<&str, usize> = AHashMap::new();
    let mut groups: Vec<DuplicateGroup<'_>> = Vec::new();

    for q in queries {
        let slot = *index.entry(q.canonical_sql.as_str()).or_insert_with(|| {
            groups.push(DuplicateGroup { canonical_sql: q.canonical_sql.as_str(), members: Vec::new() });
            groups.len() - 1
        });
        groups[slot].members.push(q);
    }

    // stable: equal counts stay in encounter order
    groups.sort_by(|a, b| b.count().cmp(&a.count()));

    let excess = groups
        .iter()
        .filter(|g| g.count() > 1)
        .map(|g| g.count() - 1)
        .sum();

    DuplicateReport { groups, excess }
}
