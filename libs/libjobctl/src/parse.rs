//! Command line tokenizer
//!
//! Splits a line into an argument vector and decides whether it runs in the
//! background:
//!
//! - arguments are separated by spaces or tabs
//! - an argument that starts with `'` runs to the next `'`, spaces included
//! - a last argument starting with `&` marks the line as background and is
//!   dropped from the vector
//! - at most `MAXARGS` arguments are kept, after the `&` check

use crate::MAXARGS;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLine {
    pub argv: Vec<String>,
    pub background: bool,
}

impl ParsedLine {
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut argv = Vec::new();
    let mut rest = line.trim_start_matches(is_blank);

    while !rest.is_empty() {
        let (arg, tail) = if let Some(quoted) = rest.strip_prefix('\'') {
            match quoted.find('\'') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                // Unterminated quote runs to end of line
                None => (quoted, ""),
            }
        } else {
            let end = rest.find(is_blank).unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        };
        argv.push(arg.to_string());
        rest = tail.trim_start_matches(is_blank);
    }

    let background = argv.last().is_some_and(|last| last.starts_with('&'));
    if background {
        argv.pop();
    }
    argv.truncate(MAXARGS);

    ParsedLine { argv, background }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        parse_line(line).argv
    }

    #[test]
    fn splits_on_blanks() {
        assert_eq!(args("/bin/echo  hello\tworld\n"), vec!["/bin/echo", "hello", "world"]);
    }

    #[test]
    fn blank_line_is_empty() {
        assert!(parse_line("").is_empty());
        assert!(parse_line("   \t \n").is_empty());
        assert!(parse_line("\n").argv.first().is_none());
    }

    #[test]
    fn trailing_ampersand_means_background() {
        let parsed = parse_line("/bin/sleep 5 &\n");
        assert!(parsed.background);
        assert_eq!(parsed.argv, vec!["/bin/sleep", "5"]);

        let parsed = parse_line("/bin/sleep 5&");
        assert!(!parsed.background);
        assert_eq!(parsed.argv, vec!["/bin/sleep", "5&"]);
    }

    #[test]
    fn lone_ampersand_is_empty_background_line() {
        let parsed = parse_line("&");
        assert!(parsed.background);
        assert!(parsed.is_empty());
    }

    #[test]
    fn leading_ampersand_is_a_program_name() {
        let parsed = parse_line("& foo");
        assert!(!parsed.background);
        assert_eq!(parsed.argv, vec!["&", "foo"]);
    }

    #[test]
    fn single_quotes_group_words() {
        assert_eq!(
            args("/bin/echo 'hello   world' done"),
            vec!["/bin/echo", "hello   world", "done"]
        );
        assert_eq!(args("/bin/echo ''"), vec!["/bin/echo", ""]);
        assert_eq!(args("/bin/echo 'open ended"), vec!["/bin/echo", "open ended"]);
    }

    #[test]
    fn argument_count_is_capped() {
        let line = "x ".repeat(MAXARGS + 20);
        assert_eq!(args(&line).len(), MAXARGS);
    }

    #[test]
    fn long_background_line_keeps_its_ampersand() {
        let line = format!("{}&\n", "x ".repeat(MAXARGS + 20));
        let parsed = parse_line(&line);
        assert!(parsed.background);
        assert_eq!(parsed.argv.len(), MAXARGS);
    }
}
