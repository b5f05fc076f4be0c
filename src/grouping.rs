use std::collections::{HashMap, HashSet};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::GroupingError;
use crate::rows::{Assignment, Group, GroupId, GroupingOutcome, RawRow, Row, RowId};

/// How rows sharing URLs are gathered into groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupingStrategy {
    /// Forward scan where each unconsumed row absorbs later unconsumed rows that share
    /// one of its own URLs. Absorbed rows never pull in further rows, so the result
    /// depends on input order.
    #[default]
    Sequential,
    /// Connected components of the shares-a-URL relation.
    Transitive,
}

#[derive(Debug, Clone, Default)]
pub struct GroupingOptions {
    pub strategy: GroupingStrategy,
    /// Blank URL cells never count as an overlap.
    pub ignore_blank_urls: bool,
    /// Threads used to build the per-row URL sets.
    pub workers: Option<usize>,
}

/// Validates every row, then groups them. Fails before grouping if any row is incomplete.
pub fn group_raw_rows(
    raw_rows: &[RawRow],
    options: &GroupingOptions,
) -> Result<GroupingOutcome, GroupingError> {
    let rows = raw_rows
        .iter()
        .enumerate()
        .map(|(position, raw)| Row::from_raw(RowId::new(position), raw))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(group_rows(&rows, options))
}

/// Assigns every row a group id and a main topic.
///
/// Multi-row groups are numbered from 1 in discovery order. Rows left on their own follow,
/// numbered consecutively in input order, and keep their own phrase as main topic.
pub fn group_rows(rows: &[Row], options: &GroupingOptions) -> GroupingOutcome {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "grouping",
        row_count = rows.len(),
        strategy = ?options.strategy,
        "Starting phrase grouping"
    );

    if rows.is_empty() {
        info!(action = "complete", component = "grouping", "No rows to group");
        return GroupingOutcome::default();
    }

    let url_sets = build_url_sets(rows, options);
    let clusters = match options.strategy {
        GroupingStrategy::Sequential => sequential_groups(&url_sets),
        GroupingStrategy::Transitive => transitive_groups(&url_sets),
    };

    let outcome = number_groups(rows, clusters);

    info!(
        action = "complete",
        component = "grouping",
        multi_row_groups = outcome.multi_row_groups(),
        singleton_groups = outcome.singleton_groups(),
        duration_ms = start_time.elapsed().as_millis(),
        "Phrase grouping completed"
    );
    outcome
}

fn url_set<'a>(row: &'a Row, ignore_blank: bool) -> HashSet<&'a str> {
    row.urls
        .iter()
        .map(String::as_str)
        .filter(|url| !ignore_blank || !url.trim().is_empty())
        .collect()
}

fn build_url_sets<'a>(rows: &'a [Row], options: &GroupingOptions) -> Vec<HashSet<&'a str>> {
    let ignore_blank = options.ignore_blank_urls;
    let collect_sets = || -> Vec<HashSet<&'a str>> {
        rows.par_iter()
            .map(|row| url_set(row, ignore_blank))
            .collect()
    };

    // Use Rayon's global pool unless a worker count was requested
    let Some(workers) = options.workers else {
        return collect_sets();
    };

    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => {
            debug!(action = "configure", component = "url_sets", worker_count = workers, "Using workers for URL sets");
            pool.install(collect_sets)
        }
        Err(e) => {
            warn!(action = "configure", component = "url_sets", error = %e, "Thread pool unavailable, building URL sets serially");
            rows.iter().map(|row| url_set(row, ignore_blank)).collect()
        }
    }
}

/// Greedy forward absorption. Returns multi-row groups only, as ascending row positions.
fn sequential_groups(url_sets: &[HashSet<&str>]) -> Vec<Vec<usize>> {
    let mut consumed = vec![false; url_sets.len()];
    let mut groups = Vec::new();

    for i in 0..url_sets.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;

        let mut members = vec![i];
        for j in (i + 1)..url_sets.len() {
            if consumed[j] {
                continue;
            }
            if !url_sets[i].is_disjoint(&url_sets[j]) {
                members.push(j);
                consumed[j] = true;
            }
        }

        if members.len() > 1 {
            groups.push(members);
        }
    }
    groups
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // Path compression
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let (root_x, root_y) = (self.find(x), self.find(y));
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }
}

/// Connected components over shared URLs, ordered by their first row.
fn transitive_groups(url_sets: &[HashSet<&str>]) -> Vec<Vec<usize>> {
    let mut uf = UnionFind::new(url_sets.len());
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for (position, urls) in url_sets.iter().enumerate() {
        for url in urls {
            match first_seen.get(url) {
                Some(&owner) => uf.union(owner, position),
                None => {
                    first_seen.insert(*url, position);
                }
            }
        }
    }

    let mut by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots_in_order = Vec::new();
    for position in 0..url_sets.len() {
        let root = uf.find(position);
        by_root
            .entry(root)
            .or_insert_with(|| {
                roots_in_order.push(root);
                Vec::new()
            })
            .push(position);
    }

    roots_in_order
        .into_iter()
        .filter_map(|root| by_root.remove(&root))
        .filter(|members| members.len() > 1)
        .collect()
}

/// Position of the highest volume; the earliest row wins ties.
fn main_topic_position(rows: &[Row], members: &[usize]) -> usize {
    let mut best = members[0];
    for &candidate in &members[1..] {
        if rows[candidate].volume > rows[best].volume {
            best = candidate;
        }
    }
    best
}

fn number_groups(rows: &[Row], clusters: Vec<Vec<usize>>) -> GroupingOutcome {
    let mut slots: Vec<Option<(GroupId, String)>> = vec![None; rows.len()];
    let mut groups = Vec::with_capacity(clusters.len());
    let mut next_id = GroupId::first();

    for members in clusters {
        let topic = rows[main_topic_position(rows, &members)].phrase.clone();
        debug!(action = "group", component = "grouping", group_id = next_id.get(), size = members.len(), main_topic = %topic, "Discovered group");
        for &position in &members {
            slots[position] = Some((next_id, topic.clone()));
        }
        groups.push(Group {
            id: next_id,
            total_volume: members.iter().map(|&p| rows[p].volume).sum(),
            members: members.iter().map(|&p| rows[p].id).collect(),
            main_topic: topic,
        });
        next_id = next_id.next();
    }

    for (position, slot) in slots.iter_mut().enumerate() {
        if slot.is_some() {
            continue;
        }
        let row = &rows[position];
        *slot = Some((next_id, row.phrase.clone()));
        groups.push(Group {
            id: next_id,
            members: vec![row.id],
            main_topic: row.phrase.clone(),
            total_volume: row.volume,
        });
        next_id = next_id.next();
    }

    let assignments = rows
        .iter()
        .zip(slots)
        .filter_map(|(row, slot)| {
            slot.map(|(group, main_topic)| Assignment {
                row: row.id,
                group,
                main_topic,
            })
        })
        .collect();

    GroupingOutcome {
        assignments,
        groups,
    }
}
