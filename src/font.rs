use crate::backend::FontWeight;
use crate::types::Pt;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

// Advance widths (1/1000 em) for U+0020..=U+007E, from the base-14 AFM files.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const MISSING_WIDTH: u16 = 556;

fn char_width(weight: FontWeight, ch: char) -> u16 {
    let table = match weight {
        FontWeight::Regular | FontWeight::Italic => &HELVETICA_WIDTHS,
        FontWeight::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    let code = ch as u32;
    if (0x20..=0x7e).contains(&code) {
        return table[(code - 0x20) as usize];
    }
    match ch {
        '\u{2014}' => 1000,
        '\u{2013}' => 556,
        '\u{2022}' => 350,
        '\u{2026}' => 1000,
        '\u{00a0}' => 278,
        '\u{2018}' | '\u{2019}' => 222,
        '\u{201c}' | '\u{201d}' => 333,
        _ => MISSING_WIDTH,
    }
}

pub(crate) fn postscript_name(weight: FontWeight) -> &'static str {
    match weight {
        FontWeight::Regular => "Helvetica",
        FontWeight::Bold => "Helvetica-Bold",
        FontWeight::Italic => "Helvetica-Oblique",
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct TextWidthKey {
    weight: FontWeight,
    size_milli: i64,
    text: String,
}

#[derive(Debug)]
struct TextWidthCache {
    map: HashMap<TextWidthKey, Pt>,
    order: VecDeque<TextWidthKey>,
    max_entries: usize,
}

impl TextWidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn insert(&mut self, key: TextWidthKey, value: Pt) {
        if self.map.insert(key.clone(), value).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            match self.order.pop_front() {
                Some(old) => {
                    self.map.remove(&old);
                }
                None => break,
            }
        }
    }
}

/// Measures and wraps text set in the built-in Helvetica family.
#[derive(Debug)]
pub struct FontMetrics {
    cache: RefCell<TextWidthCache>,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            cache: RefCell::new(TextWidthCache::new(4096)),
        }
    }
}

impl FontMetrics {
    pub fn measure(&self, text: &str, weight: FontWeight, size: Pt) -> Pt {
        let key = TextWidthKey {
            weight,
            size_milli: size.to_milli(),
            text: text.to_string(),
        };
        if let Some(width) = self.cache.borrow().map.get(&key) {
            return *width;
        }
        let units: u32 = text.chars().map(|ch| u32::from(char_width(weight, ch))).sum();
        let width = Pt::from_milli((i64::from(units) * size.to_milli()) / 1000);
        self.cache.borrow_mut().insert(key, width);
        width
    }

    /// Greedy word wrap. Words wider than `max_width` are broken by character.
    pub fn wrap(&self, text: &str, weight: FontWeight, size: Pt, max_width: Pt) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut line = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if line.is_empty() {
                    word.to_string()
                } else {
                    format!("{line} {word}")
                };
                if self.measure(&candidate, weight, size) <= max_width {
                    line = candidate;
                    continue;
                }
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                if self.measure(word, weight, size) <= max_width {
                    line = word.to_string();
                    continue;
                }
                for piece in self.break_word(word, weight, size, max_width) {
                    if !line.is_empty() {
                        lines.push(std::mem::take(&mut line));
                    }
                    line = piece;
                }
            }
            lines.push(line);
        }
        lines
    }

    fn break_word(&self, word: &str, weight: FontWeight, size: Pt, max_width: Pt) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        for ch in word.chars() {
            current.push(ch);
            if current.chars().count() > 1 && self.measure(&current, weight, size) > max_width {
                current.pop();
                pieces.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_with_afm_widths() {
        let metrics = FontMetrics::default();
        let size = Pt::from_f32(10.0);
        // H=722 i=222 -> 0.944em
        assert_eq!(metrics.measure("Hi", FontWeight::Regular, size).to_milli(), 9_440);
        assert_eq!(metrics.measure("Hi", FontWeight::Bold, size).to_milli(), 10_000);
        assert_eq!(metrics.measure("", FontWeight::Regular, size), Pt::ZERO);
    }

    #[test]
    fn wrap_keeps_lines_within_width() {
        let metrics = FontMetrics::default();
        let size = Pt::from_f32(9.0);
        let width = Pt::from_f32(80.0);
        let lines = metrics.wrap(
            "Labour and materials for the north wall, including scaffolding hire",
            FontWeight::Regular,
            size,
            width,
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(metrics.measure(line, FontWeight::Regular, size) <= width, "{line}");
        }
    }

    #[test]
    fn wrap_breaks_overlong_words_and_keeps_blank_lines() {
        let metrics = FontMetrics::default();
        let size = Pt::from_f32(9.0);
        let lines = metrics.wrap(
            "INV-0000000000000000000000000000\n\nend",
            FontWeight::Regular,
            size,
            Pt::from_f32(40.0),
        );
        assert!(lines.len() >= 4);
        assert!(lines.iter().any(String::is_empty));
        assert_eq!(lines.last().map(String::as_str), Some("end"));
    }
}
