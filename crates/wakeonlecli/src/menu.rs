//! Interactive menu
//!
//! Input is read like `scanf`: whitespace separated tokens that may span
//! lines. A token that does not parse throws away the rest of its line.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use wakeonle::apcf::MANUFACTURER_PATTERN_MAX_LEN;
use wakeonle::{FilterSpec, FilterUuid, ManufacturerPattern};

pub const MENU: &str = "
------------WakeOnLE MENU-----------------------

    0.  Exit
    1.  Print Menu
    2.  Disable WakeOnLE
    3.  Enable WakeOnLE with 16bit UUID
    4.  Enable WakeOnLE with 32bit UUID
    5.  Enable WakeOnLE with 32bit UUID AND MANUFACTURE DATA
Choose option -> ";

/// Why a prompt produced no value
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    /// End of input at the option prompt
    #[error("End of input")]
    Cancelled,

    /// End of input while a request was being entered
    #[error("User cancelled input")]
    PromptCancelled,

    /// Token that does not parse as the expected kind
    #[error("User input format wrong: '{0}'")]
    Format(String),

    /// Well formed value outside the accepted range
    #[error("{0}")]
    Invalid(String),

    #[error("Reading input failed: {0}")]
    Io(String),
}

impl From<io::Error> for InputError {
    fn from(e: io::Error) -> Self {
        InputError::Io(e.to_string())
    }
}

/// What the operator picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    Exit,
    PrintMenu,
    Disable,
    Enable(FilterSpec),
    /// Enable picked while the controller sleeps
    InSleep,
    Unknown(i32),
}

/// Whitespace separated tokens over a line based reader
pub struct TokenReader<R> {
    input: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> TokenReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            pending: VecDeque::new(),
        }
    }

    /// Next token, reading more lines as needed; `None` at end of input
    pub fn next_token(&mut self) -> io::Result<Option<String>> {
        while self.pending.is_empty() {
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_owned));
        }
        Ok(self.pending.pop_front())
    }

    /// Drop what is left of the current line
    pub fn discard_line(&mut self) {
        self.pending.clear();
    }

    fn parse<T>(&mut self, parse: impl FnOnce(&str) -> Option<T>) -> Result<T, InputError> {
        let token = self.next_token()?.ok_or(InputError::Cancelled)?;
        match parse(&token) {
            Some(value) => Ok(value),
            None => {
                self.discard_line();
                Err(InputError::Format(token))
            }
        }
    }
}

/// A byte written as one or two hex digits, optionally prefixed with `0x`
pub fn parse_hex_byte(token: &str) -> Option<u8> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

/// Prompts and parsing for the menu
pub struct Menu<R, W> {
    reader: TokenReader<R>,
    output: W,
    company_id: u16,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W, company_id: u16) -> Self {
        Self {
            reader: TokenReader::new(input),
            output,
            company_id,
        }
    }

    pub fn print_menu(&mut self) -> io::Result<()> {
        write!(self.output, "{}", MENU)?;
        self.output.flush()
    }

    pub fn say(&mut self, message: impl fmt::Display) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    /// Read one menu choice and whatever it prompts for
    ///
    /// `is_asleep` is asked before prompting for an enable request.
    pub fn next_command(&mut self, is_asleep: impl FnOnce() -> bool) -> Result<MenuCommand, InputError> {
        let option = self.reader.parse(|token| token.parse::<i32>().ok())?;
        if (3..=5).contains(&option) && is_asleep() {
            return Ok(MenuCommand::InSleep);
        }

        self.read_request(option).map_err(|e| match e {
            InputError::Cancelled => InputError::PromptCancelled,
            other => other,
        })
    }

    fn read_request(&mut self, option: i32) -> Result<MenuCommand, InputError> {
        let command = match option {
            0 => MenuCommand::Exit,
            1 => MenuCommand::PrintMenu,
            2 => MenuCommand::Disable,
            3 => {
                self.say("Enter 16bit uuid XX XX. eg: AA BB")?;
                let uuid = self.read_bytes(2)?.iter().fold(0u16, |acc, b| (acc << 8) | u16::from(*b));
                self.say(format_args!("INPUT UUID is: 0x{:04X}", uuid))?;
                MenuCommand::Enable(FilterSpec::uuid(FilterUuid::Uuid16(uuid)))
            }
            4 => {
                let uuid = self.read_uuid32()?;
                MenuCommand::Enable(FilterSpec::uuid(FilterUuid::Uuid32(uuid)))
            }
            5 => {
                let uuid = self.read_uuid32()?;
                let pattern = self.read_pattern()?;
                self.say(format_args!("INPUT DATA PATTERN is {}", pattern))?;
                MenuCommand::Enable(FilterSpec::uuid_and_manufacturer(
                    FilterUuid::Uuid32(uuid),
                    self.company_id,
                    pattern,
                ))
            }
            other => MenuCommand::Unknown(other),
        };
        Ok(command)
    }

    fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, InputError> {
        (0..count).map(|_| self.reader.parse(parse_hex_byte)).collect()
    }

    fn read_uuid32(&mut self) -> Result<u32, InputError> {
        self.say("Enter 32bit uuid XX XX XX XX. eg: 11 22 33 44")?;
        let uuid = self.read_bytes(4)?.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
        self.say(format_args!("INPUT UUID is: 0x{:08X}", uuid))?;
        Ok(uuid)
    }

    fn read_pattern(&mut self) -> Result<ManufacturerPattern, InputError> {
        self.say(format_args!(
            "Enter Manufacture Data Pattern length limited {} bytes:",
            MANUFACTURER_PATTERN_MAX_LEN
        ))?;
        let len = self.reader.parse(|token| token.parse::<usize>().ok())?;
        if len > MANUFACTURER_PATTERN_MAX_LEN {
            self.reader.discard_line();
            return Err(InputError::Invalid(format!(
                "data pattern length {} is over {} bytes",
                len, MANUFACTURER_PATTERN_MAX_LEN
            )));
        }

        self.say("Enter Manufacture Data Pattern in Hex. XX XX ... XX")?;
        let bytes = self.read_bytes(len)?;
        ManufacturerPattern::new(bytes).map_err(|e| InputError::Invalid(e.to_string()))
    }
}
