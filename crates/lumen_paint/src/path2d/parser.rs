//! Path data mini-language
//!
//! ```text
//! path     := command*
//! command  := letter args*     (letters: M L H V Q T C S A Z, lower case = relative)
//! args     := number | flag    (separated by whitespace and/or commas)
//! ```
//!
//! Extra argument groups repeat the previous command; after `M`/`m` they
//! are treated as `L`/`l`.

use lumen_core::{Point, Vec2};

use super::Path2D;
use crate::error::PathParseError;

type Result<T> = std::result::Result<T, PathParseError>;

pub(crate) fn parse_path(source: &str) -> Result<Path2D> {
    let mut lexer = Lexer::new(source);
    let mut path = Path2D::new();
    let mut first = true;

    loop {
        lexer.skip_separators();
        let Some(byte) = lexer.peek() else {
            break;
        };

        let offset = lexer.pos;
        if !byte.is_ascii_alphabetic() {
            if first {
                return Err(PathParseError::ExpectedMoveTo { offset });
            }
            return Err(PathParseError::UnknownCommand {
                command: lexer.char_at(offset),
                offset,
            });
        }
        lexer.pos += 1;

        let mut command = byte as char;
        if first && !matches!(command, 'M' | 'm') {
            return Err(PathParseError::ExpectedMoveTo { offset });
        }
        first = false;

        match command {
            'Z' | 'z' => {
                path.close();
                continue;
            }
            'M' | 'm' | 'L' | 'l' | 'H' | 'h' | 'V' | 'v' | 'Q' | 'q' | 'T' | 't' | 'C' | 'c' | 'S'
            | 's' | 'A' | 'a' => {}
            _ => return Err(PathParseError::UnknownCommand { command, offset }),
        }

        loop {
            apply_segment(&mut lexer, &mut path, command)?;

            lexer.skip_separators();
            if !lexer.at_number() {
                break;
            }
            command = match command {
                'M' => 'L',
                'm' => 'l',
                other => other,
            };
        }
    }

    Ok(path)
}

fn apply_segment(lexer: &mut Lexer<'_>, path: &mut Path2D, command: char) -> Result<()> {
    let relative = command.is_ascii_lowercase();
    let base = if relative { path.current_point() } else { Point::ZERO };
    let at = |x: f32, y: f32| Point::new(base.x + x, base.y + y);

    match command.to_ascii_uppercase() {
        'M' => {
            let (x, y) = (lexer.number(command)?, lexer.number(command)?);
            path.move_to(at(x, y));
        }
        'L' => {
            let (x, y) = (lexer.number(command)?, lexer.number(command)?);
            path.line_to(at(x, y));
        }
        'H' => {
            let x = lexer.number(command)?;
            path.horizontal_to(base.x + x);
        }
        'V' => {
            let y = lexer.number(command)?;
            path.vertical_to(base.y + y);
        }
        'Q' => {
            let ctrl = at(lexer.number(command)?, lexer.number(command)?);
            let end = at(lexer.number(command)?, lexer.number(command)?);
            path.quad_to(ctrl, end);
        }
        'T' => {
            let end = at(lexer.number(command)?, lexer.number(command)?);
            path.smooth_quad_to(end);
        }
        'C' => {
            let c1 = at(lexer.number(command)?, lexer.number(command)?);
            let c2 = at(lexer.number(command)?, lexer.number(command)?);
            let end = at(lexer.number(command)?, lexer.number(command)?);
            path.cubic_to(c1, c2, end);
        }
        'S' => {
            let c2 = at(lexer.number(command)?, lexer.number(command)?);
            let end = at(lexer.number(command)?, lexer.number(command)?);
            path.smooth_cubic_to(c2, end);
        }
        'A' => {
            let rx = lexer.number(command)?;
            let ry = lexer.number(command)?;
            let rotation = lexer.number(command)?;
            let large_arc = lexer.flag(command)?;
            let sweep = lexer.flag(command)?;
            let end = at(lexer.number(command)?, lexer.number(command)?);
            path.arc_to(Vec2::new(rx, ry), rotation, large_arc, sweep, end);
        }
        _ => {}
    }

    Ok(())
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn char_at(&self, offset: usize) -> char {
        self.source[offset..].chars().next().unwrap_or('\u{FFFD}')
    }

    fn skip_separators(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn at_number(&self) -> bool {
        matches!(self.peek(), Some(b'0'..=b'9' | b'-' | b'+' | b'.'))
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        self.pos - start
    }

    /// Next numeric argument of `command`
    fn number(&mut self, command: char) -> Result<f32> {
        self.skip_separators();
        let start = self.pos;

        if !self.at_number() {
            return Err(PathParseError::MissingArguments {
                command,
                offset: start,
            });
        }

        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let mut digits = self.eat_digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            digits += self.eat_digits();
        }
        if digits == 0 {
            return Err(PathParseError::InvalidNumber { offset: start });
        }

        // Exponent only when digits follow, so "1e" stays a number plus junk
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.pos += 1;
            }
            if self.eat_digits() == 0 {
                self.pos = mark;
            }
        }

        self.source[start..self.pos]
            .parse::<f32>()
            .map_err(|_| PathParseError::InvalidNumber { offset: start })
    }

    /// Arc flag: a single `0` or `1`, which may run into the next number
    fn flag(&mut self, command: char) -> Result<bool> {
        self.skip_separators();
        let offset = self.pos;
        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                Ok(false)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(true)
            }
            None => Err(PathParseError::MissingArguments { command, offset }),
            Some(b) if b.is_ascii_alphabetic() => {
                Err(PathParseError::MissingArguments { command, offset })
            }
            Some(_) => Err(PathParseError::InvalidFlag { offset }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_cache::Command;

    #[test]
    fn test_triangle_with_close() {
        let path = parse_path("M0 0 L10 0 L10 10 Z").unwrap();
        assert_eq!(
            path.commands(),
            &[
                Command::MoveTo(Point::new(0.0, 0.0)),
                Command::LineTo(Point::new(10.0, 0.0)),
                Command::LineTo(Point::new(10.0, 10.0)),
                Command::Close,
            ]
        );
    }

    #[test]
    fn test_unknown_command_fails() {
        assert_eq!(
            parse_path("M0 0 X").unwrap_err(),
            PathParseError::UnknownCommand {
                command: 'X',
                offset: 5
            }
        );
    }

    #[test]
    fn test_relative_and_implicit_repeat() {
        let path = parse_path("m10,10 5,0 0,5 h-5 z").unwrap();
        assert_eq!(
            path.commands(),
            &[
                Command::MoveTo(Point::new(10.0, 10.0)),
                Command::LineTo(Point::new(15.0, 10.0)),
                Command::LineTo(Point::new(15.0, 15.0)),
                Command::LineTo(Point::new(10.0, 15.0)),
                Command::Close,
            ]
        );
    }

    #[test]
    fn test_compact_numbers() {
        let path = parse_path("M-1.5-2.5L.5.5 1e1,2E-1").unwrap();
        assert_eq!(
            path.commands(),
            &[
                Command::MoveTo(Point::new(-1.5, -2.5)),
                Command::LineTo(Point::new(0.5, 0.5)),
                Command::LineTo(Point::new(10.0, 0.2)),
            ]
        );
    }

    #[test]
    fn test_arc_flags_may_run_together() {
        let path = parse_path("M0 0 A10 10 0 0110 10").unwrap();
        assert_eq!(path.current_point(), Point::new(10.0, 10.0));
        assert!(matches!(path.commands().last(), Some(Command::BezierTo(..))));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse_path("L1 1").unwrap_err(),
            PathParseError::ExpectedMoveTo { offset: 0 }
        );
        assert_eq!(
            parse_path("M1").unwrap_err(),
            PathParseError::MissingArguments {
                command: 'M',
                offset: 2
            }
        );
        assert_eq!(
            parse_path("M1 -").unwrap_err(),
            PathParseError::InvalidNumber { offset: 3 }
        );
        assert_eq!(
            parse_path("M0 0 A1 1 0 2 0 5 5").unwrap_err(),
            PathParseError::InvalidFlag { offset: 12 }
        );
        assert!(parse_path("").unwrap().is_empty());
    }
}
