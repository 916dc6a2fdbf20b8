//! Span bookkeeping shared by the taggers.

/// Try to insert `[begin, end)` into a sorted list of disjoint ranges.
///
/// Returns `false` and leaves `spans` untouched when the range overlaps a
/// stored range or is empty. The insertion point is found by binary search.
pub fn spanset_insert(spans: &mut Vec<(usize, usize)>, begin: usize, end: usize) -> bool {
    if begin >= end {
        return false;
    }
    let idx = spans.partition_point(|&(b, _)| b < begin);
    if idx > 0 && spans[idx - 1].1 > begin {
        return false;
    }
    if let Some(&(next_begin, _)) = spans.get(idx)
        && next_begin < end
    {
        return false;
    }
    spans.insert(idx, (begin, end));
    true
}

/// Sorted set of disjoint `[begin, end)` ranges with insert-if-free semantics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpanSet {
    spans: Vec<(usize, usize)>,
}

impl SpanSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a range unless it conflicts with one already stored.
    pub fn insert(&mut self, begin: usize, end: usize) -> bool {
        spanset_insert(&mut self.spans, begin, end)
    }

    pub fn spans(&self) -> &[(usize, usize)] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Byte offset to character index lookup for one UTF-8 string.
///
/// Only offsets that start a character are keys, plus the end-of-text
/// offset which maps to the character count.
#[derive(Clone, Debug)]
pub struct ByteCharMap {
    chars: Vec<Option<usize>>,
}

impl ByteCharMap {
    /// Character index starting at `byte`, or `None` if `byte` falls inside a
    /// multi-byte sequence or past the end.
    pub fn get(&self, byte: usize) -> Option<usize> {
        self.chars.get(byte).copied().flatten()
    }

    /// Number of characters in the mapped text.
    pub fn char_len(&self) -> usize {
        self.chars.last().copied().flatten().unwrap_or(0)
    }

    /// Number of bytes in the mapped text.
    pub fn byte_len(&self) -> usize {
        self.chars.len() - 1
    }
}

/// Build a [`ByteCharMap`] for the UTF-8 encoding of `text`.
pub fn byte_to_char_map(text: &str) -> ByteCharMap {
    let mut chars = vec![None; text.len() + 1];
    let mut count = 0;
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        chars[byte_idx] = Some(char_idx);
        count = char_idx + 1;
    }
    chars[text.len()] = Some(count);
    ByteCharMap { chars }
}

/// Character index to byte offset lookup for one UTF-8 string.
///
/// Slicing through the table costs the same wherever the range falls, so it
/// suits callers that cut many spans out of one long text.
#[derive(Clone, Debug)]
pub struct CharByteMap {
    bytes: Vec<usize>,
}

impl CharByteMap {
    /// Byte offset of character `ch`; the character count maps to the text length.
    pub fn get(&self, ch: usize) -> Option<usize> {
        self.bytes.get(ch).copied()
    }

    pub fn char_len(&self) -> usize {
        self.bytes.len() - 1
    }

    /// Substring of `text` between character offsets. `text` must be the
    /// string the table was built from.
    pub fn slice<'t>(&self, text: &'t str, begin: usize, end: usize) -> Option<&'t str> {
        if begin > end {
            return None;
        }
        text.get(self.get(begin)?..self.get(end)?)
    }
}

/// Build a [`CharByteMap`] for `text`.
pub fn char_to_byte_map(text: &str) -> CharByteMap {
    let mut bytes: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
    bytes.push(text.len());
    CharByteMap { bytes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_overlaps_on_both_sides() {
        let mut spans = Vec::new();
        assert!(spanset_insert(&mut spans, 10, 20));
        assert!(spanset_insert(&mut spans, 30, 40));
        assert!(!spanset_insert(&mut spans, 15, 25));
        assert!(!spanset_insert(&mut spans, 25, 31));
        assert!(!spanset_insert(&mut spans, 0, 50));
        assert!(!spanset_insert(&mut spans, 12, 18));
        assert!(!spanset_insert(&mut spans, 10, 20));
        assert_eq!(spans, vec![(10, 20), (30, 40)]);
    }

    #[test]
    fn accepts_touching_ranges() {
        let mut set = SpanSet::new();
        assert!(set.insert(10, 20));
        assert!(set.insert(20, 30));
        assert!(set.insert(0, 10));
        assert_eq!(set.spans(), &[(0, 10), (10, 20), (20, 30)]);
    }

    #[test]
    fn empty_ranges_are_never_stored() {
        let mut set = SpanSet::new();
        assert!(!set.insert(5, 5));
        assert!(!set.insert(6, 5));
        assert!(set.is_empty());
    }

    #[test]
    fn maps_multibyte_offsets() {
        // 'é' is two bytes, '€' three.
        let map = byte_to_char_map("aé€b");
        assert_eq!(map.get(0), Some(0));
        assert_eq!(map.get(1), Some(1));
        assert_eq!(map.get(2), None);
        assert_eq!(map.get(3), Some(2));
        assert_eq!(map.get(4), None);
        assert_eq!(map.get(5), None);
        assert_eq!(map.get(6), Some(3));
        assert_eq!(map.get(7), Some(4));
        assert_eq!(map.get(8), None);
        assert_eq!(map.char_len(), 4);
        assert_eq!(map.byte_len(), 7);
    }

    #[test]
    fn maps_empty_text() {
        let map = byte_to_char_map("");
        assert_eq!(map.get(0), Some(0));
        assert_eq!(map.char_len(), 0);
    }

    #[test]
    fn slices_by_character_offsets() {
        let text = "Genève, Zürich";
        let map = char_to_byte_map(text);
        assert_eq!(map.char_len(), 14);
        assert_eq!(map.slice(text, 0, 6), Some("Genève"));
        assert_eq!(map.slice(text, 8, 14), Some("Zürich"));
        assert_eq!(map.slice(text, 8, 15), None);
        assert_eq!(map.slice(text, 6, 5), None);
        assert_eq!(map.slice(text, 3, 3), Some(""));
    }

    proptest! {
        #[test]
        fn table_slices_agree_with_scanning(
            text in "\\PC{0,40}",
            begin in 0usize..45,
            len in 0usize..10,
        ) {
            let map = char_to_byte_map(&text);
            prop_assert_eq!(
                map.slice(&text, begin, begin + len),
                crate::char_slice(&text, begin, begin + len)
            );
        }


        #[test]
        fn stored_ranges_stay_sorted_and_disjoint(
            ranges in proptest::collection::vec((0usize..200, 1usize..30), 0..60)
        ) {
            let mut spans = Vec::new();
            for (begin, len) in ranges {
                let before = spans.clone();
                if !spanset_insert(&mut spans, begin, begin + len) {
                    prop_assert_eq!(&spans, &before);
                }
            }
            for pair in spans.windows(2) {
                prop_assert!(pair[0].1 <= pair[1].0);
            }
        }

        #[test]
        fn every_char_start_recovers_its_index(text in "\\PC{0,60}") {
            let map = byte_to_char_map(&text);
            for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
                prop_assert_eq!(map.get(byte_idx), Some(char_idx));
            }
            prop_assert_eq!(map.char_len(), text.chars().count());
            prop_assert_eq!(map.get(text.len()), Some(text.chars().count()));
        }
    }
}
