//! Word splitting over raw bytes.
//!
//! A text is partitioned into word slices whose concatenation reproduces the
//! text exactly. A single space glues to the following word (the usual BPE
//! convention); longer space runs produce lone separator tokens in between.
//! Leading and trailing punctuation split off as their own slices.

/// Space bytes: space, tab, CR, LF.
#[inline]
pub fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

/// Punctuation bytes recognized by the splitter.
#[inline]
pub fn is_punctuation(byte: u8) -> bool {
    matches!(
        byte,
        b',' | b'.'
            | b'?'
            | b'-'
            | b'"'
            | b':'
            | b';'
            | b'('
            | b')'
            | b'['
            | b']'
            | b'<'
            | b'>'
            | b'{'
            | b'}'
            | b'%'
            | b'\''
            | b'!'
            | b'/'
            | b'#'
            | b'$'
            | b'^'
            | b'&'
            | b'*'
            | b'~'
            | b'|'
            | b'+'
            | b'='
            | b'_'
    )
}

/// Split a word into `(prefix, body, suffix)`.
///
/// The prefix is leading spaces followed by leading punctuation; the suffix is
/// trailing spaces preceded by trailing punctuation, computed against the
/// prefix-trimmed region. Degenerate words (empty, all-space, all-punctuation,
/// or space/punctuation only) come back as `("", word, "")` so the body always
/// carries the full content.
pub fn split_prefix_body_suffix(word: &[u8]) -> (&[u8], &[u8], &[u8]) {
    const EMPTY: &[u8] = b"";

    let mut begin = 0;
    while begin < word.len() && is_space(word[begin]) {
        begin += 1;
    }
    if begin == word.len() {
        return (EMPTY, word, EMPTY);
    }

    let mut body_start = begin;
    while body_start < word.len() && is_punctuation(word[body_start]) {
        body_start += 1;
    }
    if body_start == word.len() {
        return (EMPTY, word, EMPTY);
    }

    let mut end = word.len();
    while end > body_start && is_space(word[end - 1]) {
        end -= 1;
    }
    if end == body_start {
        return (EMPTY, word, EMPTY);
    }

    let mut body_end = end;
    while body_end > body_start && is_punctuation(word[body_end - 1]) {
        body_end -= 1;
    }
    if body_end == body_start {
        return (EMPTY, word, EMPTY);
    }

    // A prefix exists only when punctuation followed the leading spaces; bare
    // leading spaces stay glued to the body.
    let prefix = if body_start > begin { &word[..body_start] } else { EMPTY };
    let suffix = if body_end < end { &word[body_end..] } else { EMPTY };
    let body = &word[prefix.len()..word.len() - suffix.len()];
    (prefix, body, suffix)
}

/// Split `text` into word slices; concatenating the slices reproduces `text`.
///
/// Every position inside a run of spaces is a split point, so a run of length
/// `k` yields `k - 1` lone-space tokens and attaches one leading space to the
/// word that follows.
pub fn split_by_words(text: &[u8]) -> Vec<&[u8]> {
    // Maximal space runs as half-open intervals.
    let mut spaces: Vec<(usize, usize)> = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &byte) in text.iter().enumerate() {
        if is_space(byte) {
            run_start.get_or_insert(i);
        } else if let Some(start) = run_start.take() {
            spaces.push((start, i));
        }
    }

    let mut split_points = Vec::with_capacity(text.len() / 4 + 2);
    split_points.push(0);
    for &(start, end) in &spaces {
        for point in start..end {
            split_points.push(point);
        }
    }
    split_points.push(text.len());

    let mut words = Vec::with_capacity(split_points.len());
    for window in split_points.windows(2) {
        let word = &text[window[0]..window[1]];

        let (prefix, body, suffix) = split_prefix_body_suffix(word);
        if !prefix.is_empty() {
            words.push(prefix);
        }
        if !body.is_empty() {
            words.push(body);
        }
        if !suffix.is_empty() {
            words.push(suffix);
        }
    }
    words
}
