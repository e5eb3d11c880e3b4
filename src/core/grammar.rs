//! Small grammar for the attacker annotation in tribe log lines.
//!
//! After the level marker the killer phrase carries parenthesized groups:
//! `(Tribe)` for a player acting directly, `(Creature)(Tribe)` for a player
//! using a tamed creature. The group count is the only signal that tells the two
//! apart, so the tokenizer and classifier below keep every other count explicit.

/// Token produced by scanning a killer-phrase segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Text outside parentheses
    Text(&'a str),
    /// Contents of a `( ... )` group, trimmed
    Group(&'a str),
    /// A `(` that never closes; carries the text after it
    Unterminated(&'a str),
}

/// Split a segment into text and parenthesized group tokens.
pub fn tokenize(segment: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = segment;

    while !rest.is_empty() {
        match rest.find('(') {
            Some(open) => {
                let text = rest[..open].trim();
                if !text.is_empty() {
                    tokens.push(Token::Text(text));
                }
                let after = &rest[open + 1..];
                match after.find(')') {
                    Some(close) => {
                        tokens.push(Token::Group(after[..close].trim()));
                        rest = &after[close + 1..];
                    }
                    None => {
                        tokens.push(Token::Unterminated(after.trim()));
                        rest = "";
                    }
                }
            }
            None => {
                let text = rest.trim();
                if !text.is_empty() {
                    tokens.push(Token::Text(text));
                }
                rest = "";
            }
        }
    }

    tokens
}

/// Parenthesized groups found in a segment, in order.
pub fn groups<'a>(tokens: &[Token<'a>]) -> Vec<&'a str> {
    tokens
        .iter()
        .filter_map(|token| match token {
            Token::Group(group) => Some(*group),
            _ => None,
        })
        .collect()
}

/// Classification of the attacker annotation by group count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupShape<'a> {
    /// No groups at all (wild creature, environment, missing tribe)
    Zero,
    /// `(Tribe)`
    TribeOnly { tribe: &'a str },
    /// `(Creature)(Tribe)`
    CreatureAndTribe { creature: &'a str, tribe: &'a str },
    /// Three or more groups
    Many(usize),
    /// A group was opened but never closed
    Unterminated,
}

impl<'a> GroupShape<'a> {
    pub fn classify(segment: &'a str) -> Self {
        let tokens = tokenize(segment);
        if tokens.iter().any(|t| matches!(t, Token::Unterminated(_))) {
            return Self::Unterminated;
        }

        match groups(&tokens).as_slice() {
            [] => Self::Zero,
            [tribe] => Self::TribeOnly { tribe: *tribe },
            [creature, tribe] => Self::CreatureAndTribe {
                creature: *creature,
                tribe: *tribe,
            },
            many => Self::Many(many.len()),
        }
    }

    /// Human readable description used in warnings.
    pub fn describe(&self) -> String {
        match self {
            Self::Zero => "no parenthesized groups".to_string(),
            Self::TribeOnly { .. } => "tribe only".to_string(),
            Self::CreatureAndTribe { .. } => "creature and tribe".to_string(),
            Self::Many(n) => format!("{n} parenthesized groups"),
            Self::Unterminated => "unterminated parenthesis".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("Lvl 100 (Rex)(TribeName)");
        assert_eq!(
            tokens,
            vec![
                Token::Text("Lvl 100"),
                Token::Group("Rex"),
                Token::Group("TribeName"),
            ]
        );
    }

    #[test]
    fn test_tokenize_spaced_groups() {
        let tokens = tokenize("Lvl 5 ( Rex ) ( The Tribe ) trailing");
        assert_eq!(
            tokens,
            vec![
                Token::Text("Lvl 5"),
                Token::Group("Rex"),
                Token::Group("The Tribe"),
                Token::Text("trailing"),
            ]
        );
    }

    #[test]
    fn test_tokenize_unterminated() {
        let tokens = tokenize("Lvl 5 (Tribe");
        assert_eq!(tokens, vec![Token::Text("Lvl 5"), Token::Unterminated("Tribe")]);
    }

    #[test]
    fn test_classify_counts() {
        assert_eq!(GroupShape::classify("Lvl 100"), GroupShape::Zero);
        assert_eq!(
            GroupShape::classify("Lvl 100 (TribeName)"),
            GroupShape::TribeOnly { tribe: "TribeName" }
        );
        assert_eq!(
            GroupShape::classify("Lvl 100 (Rex)(TribeName)"),
            GroupShape::CreatureAndTribe {
                creature: "Rex",
                tribe: "TribeName"
            }
        );
        assert_eq!(GroupShape::classify("Lvl 1 (a)(b)(c)"), GroupShape::Many(3));
        assert_eq!(GroupShape::classify("Lvl 1 (a)(b"), GroupShape::Unterminated);
    }

    #[test]
    fn test_empty_group_is_still_a_group() {
        assert_eq!(GroupShape::classify("Lvl 1 ()"), GroupShape::TribeOnly { tribe: "" });
    }
}
