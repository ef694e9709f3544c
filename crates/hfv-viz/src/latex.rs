//! ROOT TLatex markup to display text.
//!
//! Analysis labels are written in TLatex (`#it{p}_{T}`, `#Lambda_{c}^{#plus}`).
//! [`parse`] turns them into styled spans for the SVG renderer, [`to_unicode`]
//! into a flat string for terminals and text measurement.

use serde::{Deserialize, Serialize};

/// Vertical placement of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    #[default]
    Normal,
    Sub,
    Sup,
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub shift: Shift,
    pub italic: bool,
    pub bold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct SpanStyle {
    shift: Shift,
    italic: bool,
    bold: bool,
}

/// Parse TLatex markup into spans. Unknown commands are kept as their name.
pub fn parse(markup: &str) -> Vec<Span> {
    let mut p = Parser { chars: markup.chars().collect(), pos: 0 };
    let mut out = Vec::new();
    p.parse_seq(SpanStyle::default(), false, &mut out);
    out
}

/// Flatten TLatex markup to Unicode text.
///
/// Sub- and superscripts use the Unicode forms when every character has one
/// and are written inline otherwise.
pub fn to_unicode(markup: &str) -> String {
    let mut s = String::new();
    for span in parse(markup) {
        match span.shift {
            Shift::Normal => s.push_str(&span.text),
            Shift::Sup => s.push_str(&convert_all(&span.text, superscript_char)),
            Shift::Sub => s.push_str(&convert_all(&span.text, subscript_char)),
        }
    }
    s
}

fn convert_all(text: &str, f: fn(char) -> Option<char>) -> String {
    let mapped: Option<String> = text.chars().map(f).collect();
    mapped.unwrap_or_else(|| text.to_string())
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn parse_seq(&mut self, style: SpanStyle, in_group: bool, out: &mut Vec<Span>) {
        while let Some(c) = self.peek() {
            match c {
                '}' if in_group => {
                    self.pos += 1;
                    return;
                }
                '{' => {
                    self.pos += 1;
                    self.parse_seq(style, true, out);
                }
                '_' | '^' => {
                    self.pos += 1;
                    let shift = if c == '_' { Shift::Sub } else { Shift::Sup };
                    self.parse_arg(SpanStyle { shift, ..style }, out);
                }
                '#' => {
                    self.pos += 1;
                    self.parse_command(style, out);
                }
                _ => {
                    self.pos += 1;
                    push(out, style, &c.to_string());
                }
            }
        }
    }

    /// A braced group or a single atom.
    fn parse_arg(&mut self, style: SpanStyle, out: &mut Vec<Span>) {
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.parse_seq(style, true, out);
            }
            Some('#') => {
                self.pos += 1;
                self.parse_command(style, out);
            }
            Some(c) => {
                self.pos += 1;
                push(out, style, &c.to_string());
            }
            None => {}
        }
    }

    fn arg_spans(&mut self, style: SpanStyle) -> Vec<Span> {
        let mut v = Vec::new();
        self.parse_arg(style, &mut v);
        v
    }

    fn skip_bracket_option(&mut self) {
        if self.peek() == Some('[') {
            while let Some(c) = self.next() {
                if c == ']' {
                    break;
                }
            }
        }
    }

    fn parse_command(&mut self, style: SpanStyle, out: &mut Vec<Span>) {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        if name.is_empty() {
            // `#{`, `#}` and `##` escape the following character
            if let Some(c) = self.next() {
                push(out, style, &c.to_string());
            }
            return;
        }
        match name.as_str() {
            "it" => self.parse_arg(SpanStyle { italic: true, ..style }, out),
            "bf" => self.parse_arg(SpanStyle { bold: true, ..style }, out),
            "rm" | "mathrm" => self.parse_arg(SpanStyle { italic: false, ..style }, out),
            "sqrt" => {
                self.skip_bracket_option();
                push(out, style, "\u{221A}");
                self.parse_arg(style, out);
            }
            "bar" | "overline" => {
                for span in self.arg_spans(style) {
                    let text: String = span.text.chars().flat_map(|c| [c, '\u{0305}']).collect();
                    push(out, SpanStyle { shift: span.shift, italic: span.italic, bold: span.bold }, &text);
                }
            }
            "frac" => {
                self.parse_arg(style, out);
                push(out, style, "/");
                self.parse_arg(style, out);
            }
            "splitline" => {
                self.parse_arg(style, out);
                push(out, style, " ");
                self.parse_arg(style, out);
            }
            "color" | "font" | "scale" | "kern" | "lower" => {
                self.skip_bracket_option();
                self.parse_arg(style, out);
            }
            other => match symbol(other) {
                Some(s) => push(out, style, s),
                None => push(out, style, other),
            },
        }
    }
}

fn push(out: &mut Vec<Span>, style: SpanStyle, text: &str) {
    if let Some(last) = out.last_mut()
        && last.shift == style.shift
        && last.italic == style.italic
        && last.bold == style.bold
    {
        last.text.push_str(text);
        return;
    }
    out.push(Span {
        text: text.to_string(),
        shift: style.shift,
        italic: style.italic,
        bold: style.bold,
    });
}

fn symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        "alpha" => "\u{03B1}",
        "beta" => "\u{03B2}",
        "gamma" => "\u{03B3}",
        "delta" => "\u{03B4}",
        "epsilon" | "varepsilon" => "\u{03B5}",
        "zeta" => "\u{03B6}",
        "eta" => "\u{03B7}",
        "theta" => "\u{03B8}",
        "iota" => "\u{03B9}",
        "kappa" => "\u{03BA}",
        "lambda" => "\u{03BB}",
        "mu" => "\u{03BC}",
        "nu" => "\u{03BD}",
        "xi" => "\u{03BE}",
        "pi" => "\u{03C0}",
        "rho" => "\u{03C1}",
        "sigma" => "\u{03C3}",
        "tau" => "\u{03C4}",
        "upsilon" => "\u{03C5}",
        "phi" | "varphi" => "\u{03C6}",
        "chi" => "\u{03C7}",
        "psi" => "\u{03C8}",
        "omega" => "\u{03C9}",
        "Gamma" => "\u{0393}",
        "Delta" => "\u{0394}",
        "Theta" => "\u{0398}",
        "Lambda" => "\u{039B}",
        "Xi" => "\u{039E}",
        "Pi" => "\u{03A0}",
        "Sigma" => "\u{03A3}",
        "Upsilon" => "\u{03A5}",
        "Phi" => "\u{03A6}",
        "Psi" => "\u{03A8}",
        "Omega" => "\u{03A9}",
        "plus" => "+",
        "minus" => "\u{2212}",
        "pm" => "\u{00B1}",
        "mp" => "\u{2213}",
        "times" => "\u{00D7}",
        "cdot" => "\u{00B7}",
        "leq" => "\u{2264}",
        "geq" => "\u{2265}",
        "neq" => "\u{2260}",
        "approx" => "\u{2248}",
        "sim" => "\u{223C}",
        "infty" => "\u{221E}",
        "rightarrow" | "to" => "\u{2192}",
        "leftarrow" => "\u{2190}",
        "circ" => "\u{00B0}",
        "langle" => "\u{27E8}",
        "rangle" => "\u{27E9}",
        "void" => "",
        _ => return None,
    })
}

fn superscript_char(c: char) -> Option<char> {
    Some(match c {
        '0' => '\u{2070}',
        '1' => '\u{00B9}',
        '2' => '\u{00B2}',
        '3' => '\u{00B3}',
        '4' => '\u{2074}',
        '5' => '\u{2075}',
        '6' => '\u{2076}',
        '7' => '\u{2077}',
        '8' => '\u{2078}',
        '9' => '\u{2079}',
        '+' => '\u{207A}',
        '-' | '\u{2212}' => '\u{207B}',
        '=' => '\u{207C}',
        '(' => '\u{207D}',
        ')' => '\u{207E}',
        'n' => '\u{207F}',
        'i' => '\u{2071}',
        '*' => '*',
        _ => return None,
    })
}

fn subscript_char(c: char) -> Option<char> {
    Some(match c {
        '0' => '\u{2080}',
        '1' => '\u{2081}',
        '2' => '\u{2082}',
        '3' => '\u{2083}',
        '4' => '\u{2084}',
        '5' => '\u{2085}',
        '6' => '\u{2086}',
        '7' => '\u{2087}',
        '8' => '\u{2088}',
        '9' => '\u{2089}',
        '+' => '\u{208A}',
        '-' | '\u{2212}' => '\u{208B}',
        'a' => '\u{2090}',
        'e' => '\u{2091}',
        'o' => '\u{2092}',
        'x' => '\u{2093}',
        'h' => '\u{2095}',
        'k' => '\u{2096}',
        'l' => '\u{2097}',
        'm' => '\u{2098}',
        'n' => '\u{2099}',
        'p' => '\u{209A}',
        's' => '\u{209B}',
        't' => '\u{209C}',
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transverse_momentum() {
        let spans = parse("#it{p}_{T} (GeV/#it{c})");
        assert_eq!(spans[0], Span { text: "p".into(), shift: Shift::Normal, italic: true, bold: false });
        assert_eq!(spans[1].text, "T");
        assert_eq!(spans[1].shift, Shift::Sub);
        assert!(!spans[1].italic);
        assert_eq!(to_unicode("#it{p}_{T} (GeV/#it{c})"), "pT (GeV/c)");
    }

    #[test]
    fn hadron_labels() {
        assert_eq!(to_unicode("D^{#plus}"), "D\u{207A}");
        assert_eq!(to_unicode("D_{s}^{#plus}"), "D\u{209B}\u{207A}");
        assert_eq!(to_unicode("#Lambda_{c}^{#plus}"), "\u{039B}c\u{207A}");
        assert_eq!(to_unicode("D^{0}"), "D\u{2070}");
    }

    #[test]
    fn symbols_and_commands() {
        assert_eq!(to_unicode("#sqrt{#it{s}_{NN}} = 5.36 TeV"), "\u{221A}sNN = 5.36 TeV");
        assert_eq!(to_unicode("#mu #pm #sigma"), "\u{03BC} \u{00B1} \u{03C3}");
        assert_eq!(to_unicode("10^{-3}"), "10\u{207B}\u{00B3}");
        assert_eq!(to_unicode("#minus1"), "\u{2212}1");
        assert_eq!(to_unicode("#frac{S}{B}"), "S/B");
        assert_eq!(to_unicode("#color[2]{red}"), "red");
        assert_eq!(to_unicode("#unknown"), "unknown");
    }

    #[test]
    fn cos_pointing_angle() {
        let spans = parse("cos(#it{#theta}_{P})");
        let text: String = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(text, "cos(\u{03B8}P)");
        assert!(spans.iter().any(|s| s.italic && s.text == "\u{03B8}"));
        assert!(spans.iter().any(|s| s.shift == Shift::Sub && s.text == "P"));
    }

    #[test]
    fn unbalanced_braces_do_not_panic() {
        assert_eq!(to_unicode("x_{abc"), "xabc");
        assert_eq!(to_unicode("}"), "}");
        assert_eq!(to_unicode("#"), "");
    }
}
