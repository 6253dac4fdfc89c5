//! Store tags and tag aggregation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How many stores carry a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    /// The tag text.
    pub tag: String,
    /// Number of stores carrying it.
    pub count: u64,
}

/// Trim tags, drop blanks and duplicates, keep first-seen order.
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_owned());
        }
    }
    out
}

/// Unwind each store's tag list, group by tag and count occurrences.
///
/// The result is sorted by descending count. Equal counts keep the order in
/// which tags were first seen.
///
/// ```
/// use storefinder_core::count_tags;
///
/// let stores = vec![vec!["a", "b"], vec!["b"]];
/// let counts = count_tags(&stores);
/// assert_eq!(counts[0].tag, "b");
/// assert_eq!(counts[0].count, 2);
/// assert_eq!(counts[1].tag, "a");
/// ```
#[must_use]
pub fn count_tags<L, S>(tag_lists: &[L]) -> Vec<TagCount>
where
    L: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut counts: Vec<TagCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for tag in tag_lists.iter().flat_map(|list| list.as_ref()) {
        let tag: &str = tag.as_ref();
        if let Some(&i) = index.get(tag) {
            if let Some(entry) = counts.get_mut(i) {
                entry.count += 1;
            }
        } else {
            index.insert(tag.to_owned(), counts.len());
            counts.push(TagCount {
                tag: tag.to_owned(),
                count: 1,
            });
        }
    }

    // Stable sort keeps first-seen order between equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}
