const ALEF: char = '\u{0627}';
const YEH: char = '\u{064A}';
const ALEF_MAQSURA: char = '\u{0649}';

/// Canonicalizes EN/AR menu text before it reaches the keyword scorer or the embedder.
///
/// Lower-cases, maps Arabic-Indic digits to ASCII, optionally strips Arabic harakat, folds
/// hamza-bearing alef forms to bare alef and alif maqsura to yeh. The result is trimmed on both
/// ends, so the function is idempotent.
pub fn normalize(input: &str, strip_diacritics: bool) -> String {
	let trimmed = input.trim();

	if trimmed.is_empty() {
		return String::new();
	}

	let mut out = String::with_capacity(trimmed.len());

	for ch in trimmed.to_lowercase().chars() {
		if let Some(digit) = ascii_digit(ch) {
			out.push(digit);

			continue;
		}
		if strip_diacritics && is_arabic_diacritic(ch) {
			continue;
		}

		out.push(unify_letter(ch));
	}

	if out.starts_with(char::is_whitespace) || out.ends_with(char::is_whitespace) {
		return out.trim().to_string();
	}

	out
}

pub fn normalize_batch<S>(texts: &[S], strip_diacritics: bool) -> Vec<String>
where
	S: AsRef<str>,
{
	texts.iter().map(|text| normalize(text.as_ref(), strip_diacritics)).collect()
}

fn ascii_digit(ch: char) -> Option<char> {
	let offset = match ch {
		'\u{0660}'..='\u{0669}' => ch as u32 - 0x0660,
		'\u{06F0}'..='\u{06F9}' => ch as u32 - 0x06F0,
		_ => return None,
	};

	char::from_digit(offset, 10)
}

fn is_arabic_diacritic(ch: char) -> bool {
	matches!(ch, '\u{0617}'..='\u{061A}' | '\u{064B}'..='\u{0652}')
}

fn unify_letter(ch: char) -> char {
	match ch {
		'\u{0622}' | '\u{0623}' | '\u{0625}' => ALEF,
		ALEF_MAQSURA => YEH,
		_ => ch,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn maps_both_arabic_digit_blocks() {
		assert_eq!(ascii_digit('\u{0663}'), Some('3'));
		assert_eq!(ascii_digit('\u{06F9}'), Some('9'));
		assert_eq!(ascii_digit('7'), None);
	}

	#[test]
	fn diacritic_range_excludes_base_letters() {
		assert!(is_arabic_diacritic('\u{064E}'));
		assert!(is_arabic_diacritic('\u{0618}'));
		assert!(!is_arabic_diacritic(ALEF));
		assert!(!is_arabic_diacritic('\u{0653}'));
	}

	#[test]
	fn trailing_whitespace_exposed_by_stripping_is_removed() {
		assert_eq!(normalize("kebab \u{064B}", true), "kebab");
		assert_eq!(normalize("\u{064B} kebab", true), "kebab");
	}
}
