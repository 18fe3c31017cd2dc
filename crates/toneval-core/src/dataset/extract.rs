//! Final-answer extraction and scoring.
//!
//! No answer found is not an error: extraction returns an empty string, which
//! never scores as correct.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref GSM8K_FINAL: Regex = Regex::new(r"(?i)Final:\s*([-+]?\d+(?:\.\d+)?)").unwrap();
    static ref NUMBER: Regex = Regex::new(r"[-+]?\d+(?:\.\d+)?").unwrap();
    static ref ARC_FINAL: Regex = Regex::new(r"(?i)Final:\s*([A-D])").unwrap();
    static ref ARC_LETTER: Regex = Regex::new(r"\b([A-D])\b").unwrap();
}

/// `Final: <number>`, then the token after the last `####`, then the last number.
pub fn extract_gsm8k_final(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    if let Some(caps) = GSM8K_FINAL.captures(text) {
        return caps[1].to_string();
    }
    if let Some((_, tail)) = text.rsplit_once("####") {
        return tail
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
    }
    NUMBER
        .find_iter(text)
        .last()
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// `Final: <A-D>`, then the first standalone option letter; upper-cased.
pub fn extract_arc_final(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    if let Some(caps) = ARC_FINAL.captures(text) {
        return caps[1].to_uppercase();
    }
    ARC_LETTER
        .captures(text)
        .map(|caps| caps[1].to_uppercase())
        .unwrap_or_default()
}

/// Gold answer of a GSM8K solution: text after the last `####`, else the last line.
pub fn parse_gsm8k_answer(answer: &str) -> String {
    if let Some((_, tail)) = answer.rsplit_once("####") {
        return tail.trim().to_string();
    }
    answer
        .trim()
        .lines()
        .last()
        .unwrap_or_default()
        .trim()
        .to_string()
}

pub fn is_correct_gsm8k(pred: &str, gold: &str) -> bool {
    pred.trim() == gold.trim()
}

pub fn is_correct_arc(pred: &str, gold: &str) -> bool {
    pred.trim().to_uppercase() == gold.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gsm8k_prefers_final_marker() {
        assert_eq!(extract_gsm8k_final("3 apples, 4 pears\nfinal: 12"), "12");
        assert_eq!(extract_gsm8k_final("Final: -3.5 dollars"), "-3.5");
    }

    #[test]
    fn gsm8k_falls_back_to_hashes_then_last_number() {
        assert_eq!(extract_gsm8k_final("work 1 2 3\n#### 18 total"), "18");
        assert_eq!(extract_gsm8k_final("####   "), "");
        assert_eq!(extract_gsm8k_final("first 3 then 9 then 27."), "27");
        assert_eq!(extract_gsm8k_final("no digits here"), "");
        assert_eq!(extract_gsm8k_final(""), "");
    }

    #[test]
    fn arc_marker_then_standalone_letter() {
        assert_eq!(extract_arc_final("Reasoning...\nFinal: c"), "C");
        assert_eq!(extract_arc_final("I think B is right, not A"), "B");
        assert_eq!(extract_arc_final("Apples are best"), "");
        assert_eq!(extract_arc_final(""), "");
    }

    #[test]
    fn gold_answer_parsing() {
        assert_eq!(parse_gsm8k_answer("She has 3+4=7 apples.\n#### 7"), "7");
        assert_eq!(parse_gsm8k_answer("line one\n  72  \n"), "72");
    }

    #[test]
    fn correctness_rules() {
        assert!(is_correct_gsm8k(" 18", "18 "));
        assert!(!is_correct_gsm8k("18.0", "18"));
        assert!(!is_correct_gsm8k("", "18"));
        assert!(is_correct_arc("b", "B"));
        assert!(!is_correct_arc("", "B"));
    }
}
