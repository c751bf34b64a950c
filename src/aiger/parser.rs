use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::{
    Result,
    aig::error::{FormatError, ParserError},
    aiger::{Aiger, Header, Literal, Mode},
};

type ParseResult<T> = std::result::Result<T, FormatError>;

fn is_space(ch: Option<u8>) -> bool {
    ch.is_some_and(|c| c.is_ascii_whitespace())
}

/// Byte cursor keeping track of where we are, for error reporting.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Current character, `None` once the input is exhausted.
    ch: Option<u8>,
    lineno: usize,
    charno: usize,
    lineno_at_last_token_start: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader {
            buf,
            pos: 0,
            ch: Some(b' '),
            lineno: 1,
            charno: 0,
            lineno_at_last_token_start: 0,
        }
    }

    fn next_ch(&mut self) -> Option<u8> {
        let res = self.buf.get(self.pos).copied();
        if res.is_some() {
            self.pos += 1;
            self.charno += 1;
        }
        if is_space(self.ch) && !is_space(res) {
            self.lineno_at_last_token_start = self.lineno;
        }
        self.ch = res;
        if res == Some(b'\n') {
            self.lineno += 1;
        }
        res
    }

    /// Read a decimal number, the current character being its first digit.
    fn read_number(&mut self) -> ParseResult<u32> {
        let mut res: u32 = 0;
        while let Some(c) = self.ch.filter(u8::is_ascii_digit) {
            res = res
                .checked_mul(10)
                .and_then(|r| r.checked_add(u32::from(c - b'0')))
                .ok_or(FormatError::LiteralOverflow { line: self.lineno })?;
            self.next_ch();
        }
        Ok(res)
    }

    /// Read a number which must be followed by exactly `followed_by` (a space or a new line).
    fn read_literal(&mut self, followed_by: u8) -> ParseResult<u32> {
        if !self.ch.is_some_and(|c| c.is_ascii_digit()) {
            return Err(FormatError::ExpectedLiteral { line: self.lineno });
        }
        let res = self.read_number()?;
        if self.ch != Some(followed_by) {
            let line = self.lineno_at_last_token_start;
            return Err(if followed_by == b' ' {
                FormatError::ExpectedSpace { line, lit: res }
            } else {
                FormatError::ExpectedNewline { line, lit: res }
            });
        }
        self.next_ch();
        Ok(res)
    }

    fn expect_header_char(&mut self, expected: u8, reason: &'static str) -> ParseResult<()> {
        if self.next_ch() != Some(expected) {
            return Err(FormatError::InvalidHeader {
                line: self.lineno,
                reason,
            });
        }
        Ok(())
    }

    fn read_header(&mut self) -> ParseResult<(Header, Mode)> {
        self.expect_header_char(b'a', "expected 'a' as first character")?;
        let mode = match self.next_ch() {
            Some(b'a') => Mode::Ascii,
            Some(b'i') => Mode::Binary,
            _ => {
                return Err(FormatError::InvalidHeader {
                    line: self.lineno,
                    reason: "expected 'i' or 'a' after 'a'",
                });
            }
        };
        self.expect_header_char(b'g', "expected 'g' after 'a[ai]'")?;
        self.expect_header_char(b' ', "expected ' ' after 'a[ai]g'")?;
        self.next_ch();

        let header = Header {
            maxvar: self.read_literal(b' ')?,
            inputs: self.read_literal(b' ')?,
            latches: self.read_literal(b' ')?,
            outputs: self.read_literal(b' ')?,
            ands: self.read_literal(b'\n')?,
        };

        if mode == Mode::Binary {
            let sum = u64::from(header.inputs) + u64::from(header.latches) + u64::from(header.ands);
            if sum != u64::from(header.maxvar) {
                return Err(FormatError::InvalidMaxVar { line: self.lineno });
            }
            // Implicit literals go up to 2 * M.
            if header.maxvar > u32::MAX >> 1 {
                return Err(FormatError::InvalidHeader {
                    line: self.lineno,
                    reason: "maximal variable index too large for binary mode",
                });
            }
        }
        Ok((header, mode))
    }

    /// Read a variable-length encoded delta: 7 bits per byte, least significant group first.
    fn read_delta(&mut self) -> ParseResult<u32> {
        let Some(mut ch) = self.ch else {
            return Err(FormatError::UnexpectedEof {
                charno: self.charno,
            });
        };
        let charno = self.charno;
        let mut res: u32 = 0;
        let mut i = 0;
        while ch & 0x80 != 0 {
            // A 32-bit value takes at most 5 bytes, the last one can't continue.
            if i == 4 {
                return Err(FormatError::InvalidCode { charno });
            }
            res |= u32::from(ch & 0x7f) << (7 * i);
            i += 1;
            ch = self.next_ch().ok_or(FormatError::UnexpectedEof {
                charno: self.charno,
            })?;
        }
        // Only 4 bits are left for the 5th byte.
        if i == 4 && ch >= 16 {
            return Err(FormatError::InvalidCode { charno });
        }
        res |= u32::from(ch) << (7 * i);
        self.next_ch();
        Ok(res)
    }
}

/// Checks shared by both modes for literals defining a variable.
fn check_definition(
    aiger: &Aiger,
    reader: &Reader,
    lit: u32,
    what: &'static str,
) -> ParseResult<Literal> {
    let line = reader.lineno_at_last_token_start;
    let literal = Literal(lit);
    if lit == 0 || literal.is_inverted() || literal.variable() > aiger.header.maxvar {
        return Err(FormatError::InvalidLiteral { line, lit, what });
    }
    if let Some(kind) = aiger
        .get_var_type(literal.variable())
        .and_then(|t| t.get_kind())
    {
        return Err(FormatError::AlreadyDefined { line, lit, kind });
    }
    Ok(literal)
}

/// Checks for literals used (not defined) on a line.
fn check_reference(
    aiger: &Aiger,
    reader: &Reader,
    lit: u32,
    what: &'static str,
) -> ParseResult<Literal> {
    let literal = Literal(lit);
    if literal.variable() > aiger.header.maxvar {
        return Err(FormatError::InvalidLiteral {
            line: reader.lineno_at_last_token_start,
            lit,
            what,
        });
    }
    Ok(literal)
}

fn read_inputs(reader: &mut Reader, aiger: &mut Aiger) -> ParseResult<()> {
    for i in 0..aiger.header.inputs {
        let lit = match aiger.mode {
            Mode::Ascii => {
                let lit = reader.read_literal(b'\n')?;
                check_definition(aiger, reader, lit, "input")?
            }
            Mode::Binary => Literal::from_variable(i + 1, false),
        };
        aiger.add_input(lit);
    }
    Ok(())
}

fn read_latches(reader: &mut Reader, aiger: &mut Aiger) -> ParseResult<()> {
    for i in 0..aiger.header.latches {
        let lit = match aiger.mode {
            Mode::Ascii => {
                let lit = reader.read_literal(b' ')?;
                check_definition(aiger, reader, lit, "latch")?
            }
            Mode::Binary => Literal::from_variable(i + aiger.header.inputs + 1, false),
        };
        let next = reader.read_literal(b'\n')?;
        let next = check_reference(aiger, reader, next, "literal")?;
        aiger.add_latch(lit, next);
    }
    Ok(())
}

fn read_outputs(reader: &mut Reader, aiger: &mut Aiger) -> ParseResult<()> {
    for _ in 0..aiger.header.outputs {
        let lit = reader.read_literal(b'\n')?;
        let lit = check_reference(aiger, reader, lit, "output")?;
        aiger.add_output(lit);
    }
    Ok(())
}

/// AND gates of the ASCII format, one `lhs rhs0 rhs1` triple per line.
mod ascii {
    use super::{ParseResult, Reader, check_definition, check_reference};
    use crate::aiger::Aiger;

    pub(super) fn read_ands(reader: &mut Reader, aiger: &mut Aiger) -> ParseResult<()> {
        for _ in 0..aiger.header.ands {
            let lhs = reader.read_literal(b' ')?;
            let lhs = check_definition(aiger, reader, lhs, "LHS of AND")?;
            let rhs0 = reader.read_literal(b' ')?;
            let rhs0 = check_reference(aiger, reader, rhs0, "literal")?;
            let rhs1 = reader.read_literal(b'\n')?;
            let rhs1 = check_reference(aiger, reader, rhs1, "literal")?;
            aiger.add_and(lhs, rhs0, rhs1);
        }
        Ok(())
    }
}

/// AND gates of the binary format: implicit left-hand sides, delta-encoded right-hand sides.
mod bin {
    use super::{ParseResult, Reader};
    use crate::{
        aig::error::FormatError,
        aiger::{Aiger, Literal},
    };

    pub(super) fn read_ands(reader: &mut Reader, aiger: &mut Aiger) -> ParseResult<()> {
        let mut lhs = aiger.max_input_or_latch().0;
        for _ in 0..aiger.header.ands {
            lhs += 2;

            let charno = reader.charno;
            let delta = reader.read_delta()?;
            if delta > lhs {
                return Err(FormatError::InvalidDelta { charno });
            }
            let rhs0 = lhs - delta;

            let charno = reader.charno;
            let delta = reader.read_delta()?;
            if delta > rhs0 {
                return Err(FormatError::InvalidDelta { charno });
            }
            let rhs1 = rhs0 - delta;

            aiger.add_and(Literal(lhs), Literal(rhs0), Literal(rhs1));
        }
        Ok(())
    }
}

fn read_aiger(src: &[u8]) -> ParseResult<Aiger> {
    let mut reader = Reader::new(src);
    let (header, mode) = reader.read_header()?;
    let mut aiger = Aiger::new(header, mode);
    read_inputs(&mut reader, &mut aiger)?;
    read_latches(&mut reader, &mut aiger)?;
    read_outputs(&mut reader, &mut aiger)?;
    match mode {
        Mode::Ascii => ascii::read_ands(&mut reader, &mut aiger)?,
        Mode::Binary => bin::read_ands(&mut reader, &mut aiger)?,
    }
    // Whatever follows (symbol table, comments) is ignored.
    Ok(aiger)
}

impl Aiger {
    /// Parse an AIGER file (ASCII or binary) from memory, and check its consistency.
    pub fn parse(src: &[u8]) -> Result<Aiger> {
        let aiger = read_aiger(src).map_err(ParserError::from)?;
        aiger.check().map_err(ParserError::from)?;
        log::info!(
            "parsed {:?} AIGER: {} inputs, {} latches, {} outputs, {} ands",
            aiger.mode,
            aiger.inputs.len(),
            aiger.latches.len(),
            aiger.outputs.len(),
            aiger.ands.len()
        );
        Ok(aiger)
    }

    /// Read a whole AIGER stream, then parse it.
    pub fn from_reader(mut reader: impl Read) -> Result<Aiger> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| ParserError::IoError(e.to_string()))?;
        Aiger::parse(&buf)
    }

    /// Read an AIGER file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Aiger> {
        let file = File::open(path.as_ref())
            .map_err(|e| ParserError::IoError(format!("{}: {}", path.as_ref().display(), e)))?;
        Aiger::from_reader(BufReader::new(file))
    }
}
