// SPDX-FileCopyrightText: 2026 Perks Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-message point commands: a card number and a signed amount.
//!
//! Accepted shapes, whitespace-tolerant, exactly two tokens:
//! `<card> <n>`, `<card> +<n>`, `<card> -<n>`, `+<n> <card>`, `-<n> <card>`.
//! A bare amount is an earn; a leading `-` is a spend.

use perks_core::types::is_card_number;

/// A parsed quick command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickCommand {
    pub card: String,
    /// Positive to earn, negative to spend. Never zero.
    pub delta: i64,
}

/// Why quick-shaped text was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickRejection {
    /// The amount was zero.
    ZeroAmount,
    /// The amount is above the per-command ceiling.
    OverLimit { limit: i64 },
    /// The card token is not 1-10 digits without a leading zero.
    BadCard,
    /// Both tokens carry a sign, so neither is a card.
    Ambiguous,
}

impl std::fmt::Display for QuickRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuickRejection::ZeroAmount => write!(f, "amount must be greater than zero"),
            QuickRejection::OverLimit { limit } => {
                write!(f, "amount must not exceed {limit}")
            }
            QuickRejection::BadCard => write!(f, "card number must be 1-10 digits"),
            QuickRejection::Ambiguous => write!(f, "one of the two numbers must be a card"),
        }
    }
}

/// Outcome of classifying a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickParse {
    Command(QuickCommand),
    /// Two numeric tokens that do not form a valid command.
    Rejected(QuickRejection),
    /// Anything else. Not ours to consume.
    NotQuick,
}

/// Parser with a configured per-command ceiling.
#[derive(Debug, Clone, Copy)]
pub struct QuickCommandParser {
    ceiling: i64,
}

impl QuickCommandParser {
    pub fn new(ceiling: i64) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> i64 {
        self.ceiling
    }

    pub fn parse(&self, text: &str) -> Option<QuickCommand> {
        match self.classify(text) {
            QuickParse::Command(cmd) => Some(cmd),
            QuickParse::Rejected(_) | QuickParse::NotQuick => None,
        }
    }

    pub fn classify(&self, text: &str) -> QuickParse {
        let mut tokens = text.split_whitespace();
        let (Some(first), Some(second), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return QuickParse::NotQuick;
        };
        let (Some(a), Some(b)) = (Token::read(first), Token::read(second)) else {
            return QuickParse::NotQuick;
        };

        // The card is the unsigned token; with two unsigned tokens it is the first.
        let (card, amount) = match (a.sign, b.sign) {
            (None, _) => (a, b),
            (Some(_), None) => (b, a),
            (Some(_), Some(_)) => return QuickParse::Rejected(QuickRejection::Ambiguous),
        };

        if !is_card_number(card.digits) {
            return QuickParse::Rejected(QuickRejection::BadCard);
        }
        let Ok(value) = amount.digits.parse::<i64>() else {
            return QuickParse::Rejected(QuickRejection::OverLimit {
                limit: self.ceiling,
            });
        };
        if value == 0 {
            return QuickParse::Rejected(QuickRejection::ZeroAmount);
        }
        if value > self.ceiling {
            return QuickParse::Rejected(QuickRejection::OverLimit {
                limit: self.ceiling,
            });
        }

        let delta = if amount.sign == Some(Sign::Minus) {
            -value
        } else {
            value
        };
        QuickParse::Command(QuickCommand {
            card: card.digits.to_string(),
            delta,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Plus,
    Minus,
}

/// An optional sign followed by one or more ASCII digits.
#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    sign: Option<Sign>,
    digits: &'a str,
}

impl<'a> Token<'a> {
    fn read(raw: &'a str) -> Option<Self> {
        let (sign, digits) = match raw.as_bytes().first()? {
            b'+' => (Some(Sign::Plus), &raw[1..]),
            b'-' => (Some(Sign::Minus), &raw[1..]),
            _ => (None, raw),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self { sign, digits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parser() -> QuickCommandParser {
        QuickCommandParser::new(1000)
    }

    fn cmd(card: &str, delta: i64) -> Option<QuickCommand> {
        Some(QuickCommand {
            card: card.to_string(),
            delta,
        })
    }

    #[test]
    fn earn_shapes() {
        let p = parser();
        assert_eq!(p.parse("42 +5"), cmd("42", 5));
        assert_eq!(p.parse("42 5"), cmd("42", 5));
        assert_eq!(p.parse("+5 42"), cmd("42", 5));
    }

    #[test]
    fn spend_shapes() {
        let p = parser();
        assert_eq!(p.parse("42 -5"), cmd("42", -5));
        assert_eq!(p.parse("-5 42"), cmd("42", -5));
        assert_eq!(p.parse("7 -3"), cmd("7", -3));
    }

    #[test]
    fn non_matches() {
        let p = parser();
        assert_eq!(p.parse("42 abc"), None);
        assert_eq!(p.parse("42"), None);
        assert_eq!(p.parse(""), None);
        assert_eq!(p.parse("42 5 6"), None);
        assert_eq!(p.parse("Ann Smith"), None);
        assert_eq!(p.parse("42 +"), None);
        assert_eq!(p.classify("42 abc"), QuickParse::NotQuick);
    }

    #[test]
    fn whitespace_is_tolerated() {
        assert_eq!(parser().parse("  42 \t -5\n"), cmd("42", -5));
    }

    #[test]
    fn rejections_are_reported() {
        let p = parser();
        assert_eq!(
            p.classify("42 0"),
            QuickParse::Rejected(QuickRejection::ZeroAmount)
        );
        assert_eq!(
            p.classify("42 1001"),
            QuickParse::Rejected(QuickRejection::OverLimit { limit: 1000 })
        );
        assert_eq!(
            p.classify("42 99999999999999999999"),
            QuickParse::Rejected(QuickRejection::OverLimit { limit: 1000 })
        );
        assert_eq!(
            p.classify("042 5"),
            QuickParse::Rejected(QuickRejection::BadCard)
        );
        assert_eq!(
            p.classify("12345678901 5"),
            QuickParse::Rejected(QuickRejection::BadCard)
        );
        assert_eq!(
            p.classify("+5 -42"),
            QuickParse::Rejected(QuickRejection::Ambiguous)
        );
        assert_eq!(p.parse("42 1000"), cmd("42", 1000));
    }

    proptest! {
        #[test]
        fn all_five_shapes_agree(card in 1u64..=9_999_999_999u64, n in 1i64..=1000) {
            let p = parser();
            let card = card.to_string();
            let plus = cmd(&card, n);
            let minus = cmd(&card, -n);
            prop_assert_eq!(p.parse(&format!("{card} {n}")), plus.clone());
            prop_assert_eq!(p.parse(&format!("{card} +{n}")), plus.clone());
            prop_assert_eq!(p.parse(&format!("+{n} {card}")), plus);
            prop_assert_eq!(p.parse(&format!("{card} -{n}")), minus.clone());
            prop_assert_eq!(p.parse(&format!("-{n} {card}")), minus);
        }

        #[test]
        fn classify_never_panics(text in ".*") {
            let _ = parser().classify(&text);
        }
    }
}
