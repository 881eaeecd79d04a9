//! Part-of-speech tagging boundary.
//!
//! The keyword model only needs to know which heading tokens carry meaning.
//! Anything that can label tokens with a coarse grammatical role plugs in
//! through [`Tagger`]; [`RuleTagger`] is the built-in, dependency-free one.

use std::collections::HashSet;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOfSpeech {
    Noun,
    ProperNoun,
    Verb,
    Adjective,
    Adverb,
    Determiner,
    Adposition,
    Conjunction,
    Pronoun,
    Auxiliary,
    Numeral,
    Punctuation,
    Other,
}

impl PartOfSpeech {
    /// Roles whose tokens can become heading keywords.
    pub fn is_keyword_role(self) -> bool {
        matches!(
            self,
            PartOfSpeech::Noun
                | PartOfSpeech::ProperNoun
                | PartOfSpeech::Verb
                | PartOfSpeech::Adjective
                | PartOfSpeech::Adverb
        )
    }
}

pub trait Tagger: Send + Sync {
    fn tag(&self, text: &str) -> Vec<(String, PartOfSpeech)>;
}

const ABBREVIATIONS: &[&str] = &["cont.", "inc.", "co.", "corp.", "no.", "ltd.", "u.s."];

const DETERMINERS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "each", "every", "any", "all", "some",
    "no", "such",
];
const ADPOSITIONS: &[&str] = &[
    "of", "in", "on", "at", "by", "for", "with", "to", "from", "under", "over", "between",
    "among", "into", "upon", "regarding", "per", "as", "through", "during", "after", "before",
];
const CONJUNCTIONS: &[&str] = &["and", "or", "but", "nor", "if", "whether", "than", "&"];
const PRONOUNS: &[&str] = &[
    "it", "its", "we", "our", "us", "you", "your", "they", "their", "them", "he", "she", "his",
    "her", "which", "who", "whom", "whose", "what",
];
const AUXILIARIES: &[&str] = &[
    "is", "are", "was", "were", "be", "been", "being", "has", "have", "had", "will", "shall",
    "may", "might", "must", "can", "could", "would", "should", "do", "does", "did",
];

fn closed_class() -> &'static [(&'static [&'static str], PartOfSpeech)] {
    &[
        (DETERMINERS, PartOfSpeech::Determiner),
        (ADPOSITIONS, PartOfSpeech::Adposition),
        (CONJUNCTIONS, PartOfSpeech::Conjunction),
        (PRONOUNS, PartOfSpeech::Pronoun),
        (AUXILIARIES, PartOfSpeech::Auxiliary),
    ]
}

/// Deterministic suffix-and-wordlist tagger.
///
/// Good enough to separate content words from function words in short
/// headings; it is not a general-purpose tagger.
#[derive(Debug, Default, Clone)]
pub struct RuleTagger;

impl RuleTagger {
    pub fn new() -> Self {
        RuleTagger
    }

    fn role(token: &str) -> PartOfSpeech {
        let lower = token.to_lowercase();
        if lower.chars().all(|c| !c.is_alphanumeric()) {
            return PartOfSpeech::Punctuation;
        }
        if lower.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
            return PartOfSpeech::Numeral;
        }
        if lower.chars().any(|c| c.is_ascii_digit()) {
            // alphanumeric codes such as "12b-1" or "n-1a"
            return PartOfSpeech::Other;
        }
        for (words, role) in closed_class() {
            if words.contains(&lower.as_str()) {
                return *role;
            }
        }
        if token.chars().next().is_some_and(|c| c.is_uppercase())
            && token.chars().skip(1).any(|c| c.is_uppercase())
            && token.chars().all(|c| c.is_uppercase() || !c.is_alphabetic())
            && token.len() <= 5
        {
            // short all-caps tokens are usually acronyms: "SEC", "LLC"
            return PartOfSpeech::ProperNoun;
        }
        if lower.len() > 4 && lower.ends_with("ly") {
            return PartOfSpeech::Adverb;
        }
        if lower.len() > 5 && (lower.ends_with("ing") || lower.ends_with("ed")) {
            return PartOfSpeech::Verb;
        }
        const ADJ_SUFFIXES: &[&str] = &["al", "ive", "ous", "ful", "able", "ible", "ary", "ic"];
        if lower.len() > 5 && ADJ_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            return PartOfSpeech::Adjective;
        }
        PartOfSpeech::Noun
    }
}

impl Tagger for RuleTagger {
    fn tag(&self, text: &str) -> Vec<(String, PartOfSpeech)> {
        tokenize(text)
            .into_iter()
            .map(|tok| {
                let role = RuleTagger::role(&tok);
                (tok, role)
            })
            .collect()
    }
}

/// Whitespace split, with leading/trailing punctuation peeled into their
/// own tokens. Known abbreviations keep their trailing period.
pub fn tokenize(text: &str) -> Vec<String> {
    static ABBREV: OnceLock<HashSet<&'static str>> = OnceLock::new();
    let abbrev = ABBREV.get_or_init(|| ABBREVIATIONS.iter().copied().collect());

    let mut tokens = Vec::new();
    for word in text.split_whitespace() {
        if abbrev.contains(word.to_lowercase().as_str()) {
            tokens.push(word.to_string());
            continue;
        }
        let chars: Vec<char> = word.chars().collect();
        let mut start = 0;
        let mut end = chars.len();
        while start < end && is_edge_punct(chars[start]) {
            tokens.push(chars[start].to_string());
            start += 1;
        }
        let mut trailing = Vec::new();
        while end > start && is_edge_punct(chars[end - 1]) {
            trailing.push(chars[end - 1].to_string());
            end -= 1;
        }
        if start < end {
            tokens.push(chars[start..end].iter().collect());
        }
        tokens.extend(trailing.into_iter().rev());
    }
    tokens
}

fn is_edge_punct(c: char) -> bool {
    !c.is_alphanumeric() && c != '&'
}
