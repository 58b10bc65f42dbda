use std::{collections::HashSet, sync::LazyLock};

use unicode_segmentation::UnicodeSegmentation;

use crate::script;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
	[
		"a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are",
		"as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
		"by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
		"for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
		"him", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me",
		"more", "most", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or",
		"other", "our", "ours", "out", "over", "own", "same", "she", "should", "so", "some",
		"such", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
		"those", "through", "to", "too", "under", "until", "up", "use", "using", "very", "was",
		"we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
		"with", "would", "you", "your",
	]
	.into_iter()
	.collect()
});

pub fn is_stop_word(term: &str) -> bool {
	STOP_WORDS.contains(term)
}

/// Ordered terms of `text`, duplicates kept.
///
/// Segmented text is split on Unicode word boundaries, then on compound boundaries inside each
/// word (`TypeScript` -> `type`, `script`; `snake_case` -> `snake`, `case`; `HTTPServer` ->
/// `http`, `server`). Runs of scripts written without spaces are kept whole. Terms are lowercased;
/// stop words and single-character segmented terms are dropped.
pub fn terms(text: &str) -> Vec<String> {
	let mut out = Vec::new();

	for run in split_runs(text) {
		match run {
			Run::Unsegmented(chunk) => {
				let chunk = chunk.trim();

				if !chunk.is_empty() {
					out.push(chunk.to_lowercase());
				}
			},
			Run::Segmented(chunk) =>
				for word in chunk.unicode_words() {
					for part in split_compound(word) {
						push_term(&mut out, part);
					}
				},
		}
	}

	out
}

/// Distinct terms of `text` in first-seen order. Used to derive a plan's expected keywords.
pub fn extract_keywords(text: &str) -> Vec<String> {
	let mut seen = HashSet::new();

	terms(text).into_iter().filter(|term| seen.insert(term.clone())).collect()
}

/// Fraction of `query_terms` present in `text`. Unsegmented terms match by substring because the
/// surrounding text has no boundaries to compare against.
pub fn lexical_overlap_ratio(query_terms: &[String], text: &str) -> f32 {
	if query_terms.is_empty() {
		return 0.0;
	}

	let lowered = text.to_lowercase();
	let text_terms: HashSet<String> = terms(text).into_iter().collect();

	if text_terms.is_empty() {
		return 0.0;
	}

	let matched = query_terms
		.iter()
		.filter(|term| term_present(term, &text_terms, &lowered))
		.count();

	matched as f32 / query_terms.len() as f32
}

/// Fraction of adjacent query term pairs that also appear adjacent in `text`. A single-term query
/// degrades to plain presence of that term.
pub fn adjacent_pair_ratio(query_terms: &[String], text: &str) -> f32 {
	match query_terms {
		[] => 0.0,
		[only] => {
			let lowered = text.to_lowercase();
			let text_terms: HashSet<String> = terms(text).into_iter().collect();

			if term_present(only, &text_terms, &lowered) { 1.0 } else { 0.0 }
		},
		_ => {
			let sequence = terms(text);
			let text_pairs: HashSet<(&str, &str)> =
				sequence.windows(2).map(|pair| (pair[0].as_str(), pair[1].as_str())).collect();
			let total = query_terms.len() - 1;
			let matched = query_terms
				.windows(2)
				.filter(|pair| text_pairs.contains(&(pair[0].as_str(), pair[1].as_str())))
				.count();

			matched as f32 / total as f32
		},
	}
}

enum Run<'a> {
	Segmented(&'a str),
	Unsegmented(&'a str),
}

fn split_runs(text: &str) -> Vec<Run<'_>> {
	let mut runs = Vec::new();
	let mut start = 0;
	let mut unsegmented = false;

	for (idx, ch) in text.char_indices() {
		let next_unsegmented = if unsegmented {
			script::continues_unsegmented(ch)
		} else {
			script::is_unsegmented(ch)
		};

		if next_unsegmented != unsegmented {
			if idx > start {
				runs.push(make_run(&text[start..idx], unsegmented));
			}

			start = idx;
			unsegmented = next_unsegmented;
		}
	}

	if start < text.len() {
		runs.push(make_run(&text[start..], unsegmented));
	}

	runs
}

fn make_run(chunk: &str, unsegmented: bool) -> Run<'_> {
	if unsegmented { Run::Unsegmented(chunk) } else { Run::Segmented(chunk) }
}

fn split_compound(word: &str) -> Vec<&str> {
	let chars: Vec<(usize, char)> = word.char_indices().collect();
	let mut parts = Vec::new();
	let mut start: Option<usize> = None;

	for (pos, &(idx, ch)) in chars.iter().enumerate() {
		if !ch.is_alphanumeric() {
			if let Some(begin) = start.take() {
				parts.push(&word[begin..idx]);
			}

			continue;
		}

		let Some(begin) = start else {
			start = Some(idx);

			continue;
		};
		let prev = chars[pos - 1].1;
		let next = chars.get(pos + 1).map(|&(_, c)| c);
		let lower_to_upper = prev.is_lowercase() && ch.is_uppercase();
		let acronym_end = prev.is_uppercase()
			&& ch.is_uppercase()
			&& next.map(|c| c.is_lowercase()).unwrap_or(false);

		if lower_to_upper || acronym_end {
			parts.push(&word[begin..idx]);

			start = Some(idx);
		}
	}

	if let Some(begin) = start {
		parts.push(&word[begin..]);
	}

	parts
}

fn push_term(out: &mut Vec<String>, part: &str) {
	if part.chars().count() < 2 {
		return;
	}

	let lowered = part.to_lowercase();

	if is_stop_word(&lowered) {
		return;
	}

	out.push(lowered);
}

fn term_present(term: &str, text_terms: &HashSet<String>, lowered_text: &str) -> bool {
	if script::contains_unsegmented(term) {
		return lowered_text.contains(term);
	}

	text_terms.contains(term)
}
