//! Word counting and reading time

/// Count whitespace-delimited words in plain text
///
/// Repeated whitespace is tolerated and empty input yields zero.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated reading time in whole minutes, rounded up
///
/// Zero words read in zero minutes; there is no minimum of one.
pub fn reading_time(words: usize, words_per_minute: usize) -> usize {
    if words_per_minute == 0 {
        return 0;
    }
    words.div_ceil(words_per_minute)
}
