//! Naive coreference over the mentions of one document.
//!
//! Mentions are consumed latest-first. Each seed pulls in earlier mentions it
//! looks like an acronym of, then keeps absorbing mentions that are a
//! case-insensitive prefix or suffix of (or have as prefix/suffix) the longest
//! chain member, until a pass leaves the longest member unchanged.

use std::collections::VecDeque;

use nel_types::{Chain, Mention};

/// Group mentions into chains.
///
/// Chains come out in the order their seeds were taken, i.e. reverse
/// document order of each chain's latest mention. Within a chain, later
/// absorbed mentions sit in front of earlier ones.
pub fn cluster_mentions(mentions: Vec<Mention>) -> Vec<Chain> {
    let mut slots: Vec<Option<Mention>> = mentions.into_iter().map(Some).collect();

    // Indices into `slots`, latest begin first; ties keep input order.
    let mut pool: Vec<usize> = (0..slots.len()).collect();
    pool.sort_by(|&a, &b| begin_of(&slots, b).cmp(&begin_of(&slots, a)));
    let mut pool: VecDeque<usize> = pool.into();

    let mut chains = Vec::new();
    while let Some(seed) = pool.pop_front() {
        let members = grow_chain(&slots, &mut pool, seed);
        let chain = members
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();
        chains.push(Chain::new(chain));
    }
    chains
}

fn grow_chain(slots: &[Option<Mention>], pool: &mut VecDeque<usize>, seed: usize) -> VecDeque<usize> {
    let text = move |idx: usize| slots[idx].as_ref().map(|m| m.text.as_str()).unwrap_or_default();
    let seed_text = text(seed);

    let mut chain = VecDeque::from([seed]);
    let mut likely_acronym = false;

    if seed_text.to_uppercase() == seed_text {
        let mut kept = VecDeque::with_capacity(pool.len());
        for idx in pool.drain(..) {
            if is_acronym_of(seed_text, text(idx)) {
                chain.push_front(idx);
                likely_acronym = true;
            } else {
                kept.push_back(idx);
            }
        }
        *pool = kept;
    }

    let mut last = None;
    let mut longest = seed;
    while last != Some(longest) && !pool.is_empty() {
        let needle = text(longest).to_lowercase();
        let mut kept = VecDeque::with_capacity(pool.len());
        for idx in pool.drain(..) {
            let candidate = text(idx);
            let matched = if likely_acronym {
                candidate == seed_text
            } else {
                affix_related(&candidate.to_lowercase(), &needle)
            };
            if matched {
                chain.push_front(idx);
            } else {
                kept.push_back(idx);
            }
        }
        *pool = kept;

        last = Some(longest);
        longest = longest_member(&chain, &text);
    }

    chain
}

/// First chain member (front to back) with the most characters.
fn longest_member<'a>(chain: &VecDeque<usize>, text: &impl Fn(usize) -> &'a str) -> usize {
    let mut best = chain[0];
    let mut best_len = text(best).chars().count();
    for &idx in chain.iter().skip(1) {
        let len = text(idx).chars().count();
        if len > best_len {
            best = idx;
            best_len = len;
        }
    }
    best
}

fn is_acronym_of(acronym: &str, phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split(' ').filter(|w| !w.is_empty()).collect();
    let all_initials: String = words.iter().filter_map(|w| w.chars().next()).collect();
    if all_initials.to_uppercase() == acronym {
        return true;
    }
    let capital_initials: String = words
        .iter()
        .filter_map(|w| w.chars().next())
        .filter(|c| c.is_uppercase())
        .collect();
    capital_initials.to_uppercase() == acronym
}

fn affix_related(a: &str, b: &str) -> bool {
    a.starts_with(b) || a.ends_with(b) || b.starts_with(a) || b.ends_with(a)
}

fn begin_of(slots: &[Option<Mention>], idx: usize) -> usize {
    slots[idx].as_ref().map(|m| m.begin).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentions(items: &[(usize, &str)]) -> Vec<Mention> {
        items
            .iter()
            .map(|(begin, text)| Mention::new(*begin, *text, None))
            .collect()
    }

    fn texts(chain: &Chain) -> Vec<&str> {
        chain.mentions.iter().map(|m| m.text.as_str()).collect()
    }

    #[test]
    fn empty_input_gives_no_chains() {
        assert!(cluster_mentions(Vec::new()).is_empty());
    }

    #[test]
    fn acronym_joins_expanded_name() {
        let chains = cluster_mentions(mentions(&[
            (0, "International Business Machines"),
            (40, "IBM"),
        ]));
        assert_eq!(chains.len(), 1);
        assert_eq!(texts(&chains[0]), vec!["International Business Machines", "IBM"]);
    }

    #[test]
    fn acronym_ignores_lowercase_function_words() {
        let chains = cluster_mentions(mentions(&[
            (0, "Bank of America"),
            (30, "Ford"),
            (50, "BA"),
        ]));
        assert_eq!(chains.len(), 2);
        assert_eq!(texts(&chains[0]), vec!["Bank of America", "BA"]);
        assert_eq!(texts(&chains[1]), vec!["Ford"]);
    }

    #[test]
    fn acronym_chain_only_absorbs_exact_repeats() {
        let chains = cluster_mentions(mentions(&[
            (0, "International Business Machines"),
            (20, "Ibm Corp"),
            (40, "IBM"),
            (50, "IBM"),
        ]));
        assert_eq!(chains.len(), 2);
        assert_eq!(
            texts(&chains[0]),
            vec!["IBM", "International Business Machines", "IBM"]
        );
        assert_eq!(chains[0].mentions[0].begin, 40);
        assert_eq!(texts(&chains[1]), vec!["Ibm Corp"]);
    }

    #[test]
    fn longer_phrase_seed_absorbs_acronym_by_prefix() {
        let chains = cluster_mentions(mentions(&[
            (0, "International Business Machines"),
            (40, "IBM"),
            (50, "IBM"),
            (60, "IBM Research"),
        ]));
        assert_eq!(chains.len(), 2);
        assert_eq!(texts(&chains[0]), vec!["IBM", "IBM", "IBM Research"]);
        assert_eq!(texts(&chains[1]), vec!["International Business Machines"]);
    }

    #[test]
    fn substrings_chain_together() {
        let chains = cluster_mentions(mentions(&[
            (0, "Barack Obama"),
            (20, "Obama"),
            (30, "Obama"),
        ]));
        assert_eq!(chains.len(), 1);
        assert_eq!(texts(&chains[0]), vec!["Barack Obama", "Obama", "Obama"]);
        assert_eq!(chains[0].mentions[2].begin, 30);
    }

    #[test]
    fn growth_follows_the_longest_member() {
        // "Obama" links to "President Obama"; only then does the longer form
        // pull in "President".
        let chains = cluster_mentions(mentions(&[
            (0, "President"),
            (10, "President Obama"),
            (40, "Obama"),
        ]));
        assert_eq!(chains.len(), 1);
        assert_eq!(texts(&chains[0]), vec!["President", "President Obama", "Obama"]);
    }

    #[test]
    fn unrelated_mentions_stay_apart_in_reverse_order() {
        let chains = cluster_mentions(mentions(&[(0, "Paris"), (10, "London"), (20, "Berlin")]));
        let seeds: Vec<&str> = chains.iter().map(|c| c.mentions[0].text.as_str()).collect();
        assert_eq!(seeds, vec!["Berlin", "London", "Paris"]);
    }

    #[test]
    fn equal_length_tie_picks_front_of_chain() {
        // Both longer forms have 11 characters; the one nearer the front of
        // the chain is taken as longest.
        let chains = cluster_mentions(mentions(&[
            (0, "Jones Smith"),
            (5, "Smith Jrrrr"),
            (20, "Smith"),
        ]));
        assert_eq!(chains.len(), 1);
        assert_eq!(texts(&chains[0]), vec!["Jones Smith", "Smith Jrrrr", "Smith"]);
        assert_eq!(
            longest_member(&VecDeque::from([0, 1]), &|i| ["Jones Smith", "Smith Jrrrr"][i]),
            0
        );
    }

    #[test]
    fn membership_is_stable_when_reclustered() {
        let input = mentions(&[
            (0, "International Business Machines"),
            (10, "Barack Obama"),
            (40, "IBM"),
            (50, "Obama"),
        ]);
        let chains = cluster_mentions(input);
        assert_eq!(chains.len(), 2);
        for chain in &chains {
            let again = cluster_mentions(chain.mentions.clone());
            assert_eq!(again.len(), 1);
            assert_eq!(again[0].mentions.len(), chain.mentions.len());
        }
    }

    #[test]
    fn every_mention_lands_in_exactly_one_chain() {
        let input = mentions(&[
            (0, "Paris"),
            (6, "PARIS"),
            (12, "Paris Hilton"),
            (30, "Hilton"),
            (40, "UN"),
            (50, "United Nations"),
        ]);
        let chains = cluster_mentions(input.clone());
        let total: usize = chains.iter().map(|c| c.mentions.len()).sum();
        assert_eq!(total, input.len());
    }
}
