use std::collections::BTreeMap;

use crate::models::ChannelId;
use crate::models::Message;
use crate::pattern::compile_case_insensitive;
use crate::pattern::count_matches;

pub fn channel_counts<'a, I>(messages: I) -> BTreeMap<ChannelId, usize>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut counts = BTreeMap::new();
    for message in messages {
        *counts.entry(message.channel.clone()).or_insert(0) += 1;
    }
    counts
}

/// Total case-insensitive matches of every keyword across all texts.
/// Keywords that never match are left out.
pub fn keyword_counts(messages: &[&Message], keywords: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for keyword in keywords {
        let Some(regex) = compile_case_insensitive(keyword) else {
            continue;
        };
        let total: usize = messages
            .iter()
            .map(|message| count_matches(&regex, &message.text))
            .sum();
        if total > 0 {
            counts.insert(keyword.clone(), total);
        }
    }
    counts
}

/// Highest count first, ties by keyword.
pub fn ranked_keyword_counts(counts: &BTreeMap<String, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts
        .iter()
        .map(|(keyword, count)| (keyword.clone(), *count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}
