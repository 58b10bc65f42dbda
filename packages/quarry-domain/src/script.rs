use unicode_script::{Script, UnicodeScript};

/// Scripts that are conventionally written without spaces between words.
pub fn is_unsegmented(ch: char) -> bool {
	matches!(
		ch.script(),
		Script::Han
			| Script::Hiragana
			| Script::Katakana
			| Script::Thai
			| Script::Lao
			| Script::Khmer
			| Script::Myanmar
	)
}

/// Whether `ch` extends a run that started with an unsegmented script character. Covers shared
/// marks such as the katakana prolonged sound mark, which Unicode assigns to the Common script.
pub fn continues_unsegmented(ch: char) -> bool {
	is_unsegmented(ch)
		|| (ch.is_alphabetic() && matches!(ch.script(), Script::Common | Script::Inherited))
}

pub fn contains_unsegmented(input: &str) -> bool {
	input.chars().any(is_unsegmented)
}

#[cfg(test)]
mod tests {
	use super::{contains_unsegmented, continues_unsegmented, is_unsegmented};

	#[test]
	fn detects_scripts_without_word_boundaries() {
		assert!(is_unsegmented('\u{4F60}'));
		assert!(is_unsegmented('\u{30AB}'));
		assert!(is_unsegmented('\u{0E01}'));
		assert!(!is_unsegmented('a'));
		assert!(!is_unsegmented('\u{D55C}'));
	}

	#[test]
	fn prolonged_sound_mark_continues_a_run() {
		assert!(!is_unsegmented('\u{30FC}'));
		assert!(continues_unsegmented('\u{30FC}'));
		assert!(!continues_unsegmented(' '));
	}

	#[test]
	fn mixed_text_is_flagged() {
		assert!(contains_unsegmented("configure \u{8A2D}\u{5B9A}"));
		assert!(!contains_unsegmented("plain ascii text"));
	}
}
