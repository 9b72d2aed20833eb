//! Frame builders and typed messages of the device-addressed protocol.
//!
//! | Command     | Query payload                | Answer payload                     |
//! |-------------|------------------------------|------------------------------------|
//! | control (0) | actuation i16                | angle i16, moment i16              |
//! | info (1)    | -                            | three i16 state values             |
//! | write (5)   | index u16, value i32         | stored value i32                   |
//! | read (6)    | index u16                    | value i32                          |
//! | flash (7)   | address u32, word u32        | status+id u8, address/value u32    |

use tracing::trace;

use crate::command::{
    is_header, Command, LengthTable, ANSWER_HEADER, CMD_CONTROL, CMD_FLASH, CMD_INFO, CMD_READ,
    CMD_WRITE,
};
use crate::error::{CodecError, Result};
use crate::packer::MessageOut;
use crate::unpacker::MessageIn;

/// Flash status: no error.
pub const FLASH_OK: u8 = 0;
/// Flash status: switching into flash mode failed.
pub const FLASH_SWITCH_FAILED: u8 = 1;
/// Flash status: erasing program memory failed.
pub const FLASH_ERASE_FAILED: u8 = 2;
/// Flash status: writing failed; the answer echoes the failing address.
pub const FLASH_WRITE_FAILED: u8 = 3;

/// Pack a flash status (3 bits) and device id (4 bits) into one byte.
pub fn flash_status_byte(status: u8, id: u8) -> u8 {
    ((status & 0x07) << 4) | (id & 0x0F)
}

impl<const N: usize> MessageOut<N> {
    /// Control query: actuation value for device `id`.
    pub fn make_query_control(&mut self, id: u8, value: i16) {
        self.begin_query(CMD_CONTROL, id);
        self.add_int16(value as u16);
        self.end();
    }

    /// Control answer: current angle and moment.
    pub fn make_answer_control(&mut self, angle: i16, moment: i16) {
        self.begin_answer();
        self.add_int16(angle as u16);
        self.add_int16(moment as u16);
        self.end();
    }

    pub fn make_query_info(&mut self, id: u8) {
        self.begin_query(CMD_INFO, id);
        self.end();
    }

    pub fn make_answer_info(&mut self, val0: i16, val1: i16, val2: i16) {
        self.begin_answer();
        self.add_int16(val0 as u16);
        self.add_int16(val1 as u16);
        self.add_int16(val2 as u16);
        self.end();
    }

    /// Write parameter `index` of device `id`.
    pub fn make_query_write(&mut self, id: u8, index: u16, value: i32) {
        self.begin_query(CMD_WRITE, id);
        self.add_int16(index);
        self.add_int32(value as u32);
        self.end();
    }

    /// Answer to a write: the value now stored in the parameter.
    pub fn make_answer_write(&mut self, value: i32) {
        self.begin_answer();
        self.add_int32(value as u32);
        self.end();
    }

    pub fn make_query_read(&mut self, id: u8, index: u16) {
        self.begin_query(CMD_READ, id);
        self.add_int16(index);
        self.end();
    }

    pub fn make_answer_read(&mut self, value: i32) {
        self.begin_answer();
        self.add_int32(value as u32);
        self.end();
    }

    /// Flash query. Devices in flash mode are addressed with the broadcast id,
    /// which makes the header `0x7F`.
    pub fn make_query_flash(&mut self, id: u8, address: u32, word: u32) {
        self.begin_query(CMD_FLASH, id);
        self.add_int32(address);
        self.add_int32(word);
        self.end();
    }

    /// Flash answer: status and id in one byte, then the address or value echo.
    pub fn make_answer_flash(&mut self, status: u8, id: u8, value: u32) {
        self.begin_answer();
        self.add_int8(flash_status_byte(status, id));
        self.add_int32(value);
        self.end();
    }
}

/// A decoded device-addressed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Control { id: u8, value: i16 },
    Info { id: u8 },
    Write { id: u8, index: u16, value: i32 },
    Read { id: u8, index: u16 },
    Flash { id: u8, address: u32, word: u32 },
}

impl Query {
    pub fn command(&self) -> Command {
        match self {
            Query::Control { .. } => Command::Control,
            Query::Info { .. } => Command::Info,
            Query::Write { .. } => Command::Write,
            Query::Read { .. } => Command::Read,
            Query::Flash { .. } => Command::Flash,
        }
    }

    /// Addressed device.
    pub fn id(&self) -> u8 {
        match *self {
            Query::Control { id, .. }
            | Query::Info { id }
            | Query::Write { id, .. }
            | Query::Read { id, .. }
            | Query::Flash { id, .. } => id,
        }
    }

    /// Encode into `out`, replacing whatever it held.
    pub fn encode<const N: usize>(&self, out: &mut MessageOut<N>) {
        match *self {
            Query::Control { id, value } => out.make_query_control(id, value),
            Query::Info { id } => out.make_query_info(id),
            Query::Write { id, index, value } => out.make_query_write(id, index, value),
            Query::Read { id, index } => out.make_query_read(id, index),
            Query::Flash { id, address, word } => out.make_query_flash(id, address, word),
        }
    }

    /// Verify and decode the frame `msg` is positioned on.
    ///
    /// The checksum is checked against `lengths` before any field is read.
    pub fn decode(msg: &mut MessageIn<'_>, lengths: &LengthTable) -> Result<Self> {
        let header = msg.header();
        if !is_header(header) {
            return Err(CodecError::NotAHeader(header));
        }
        let code = msg.cmd();
        let length = lengths.require(code)?;
        msg.verify(length)?;
        let command = Command::try_from(code)?;
        let id = msg.id();
        msg.seek(1);

        let query = match command {
            Command::Control => Query::Control {
                id,
                value: msg.get_int16(),
            },
            Command::Info => Query::Info { id },
            Command::Write => Query::Write {
                id,
                index: msg.get_uint16(),
                value: msg.get_int32(),
            },
            Command::Read => Query::Read {
                id,
                index: msg.get_uint16(),
            },
            Command::Flash => Query::Flash {
                id,
                address: msg.get_uint32(),
                word: msg.get_uint32(),
            },
        };
        trace!(?query, length, "decoded query");
        Ok(query)
    }
}

/// A decoded answer. Answers do not name their command, so decoding needs the
/// command of the query being answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Control { angle: i16, moment: i16 },
    Info { values: [i16; 3] },
    Write { value: i32 },
    Read { value: i32 },
    Flash { status: u8, id: u8, value: u32 },
}

impl Answer {
    /// Command of the query this answers.
    pub fn command(&self) -> Command {
        match self {
            Answer::Control { .. } => Command::Control,
            Answer::Info { .. } => Command::Info,
            Answer::Write { .. } => Command::Write,
            Answer::Read { .. } => Command::Read,
            Answer::Flash { .. } => Command::Flash,
        }
    }

    pub fn encode<const N: usize>(&self, out: &mut MessageOut<N>) {
        match *self {
            Answer::Control { angle, moment } => out.make_answer_control(angle, moment),
            Answer::Info { values: [a, b, c] } => out.make_answer_info(a, b, c),
            Answer::Write { value } => out.make_answer_write(value),
            Answer::Read { value } => out.make_answer_read(value),
            Answer::Flash { status, id, value } => out.make_answer_flash(status, id, value),
        }
    }

    /// Verify and decode an answer to a `query` command. `lengths` is keyed by
    /// the query command (see [`LengthTable::device_answers`]).
    pub fn decode(msg: &mut MessageIn<'_>, query: Command, lengths: &LengthTable) -> Result<Self> {
        let header = msg.header();
        if !is_header(header) {
            return Err(CodecError::NotAHeader(header));
        }
        if header != ANSWER_HEADER {
            return Err(CodecError::NotAnAnswer(header));
        }
        let length = lengths.require(query.code())?;
        msg.verify(length)?;
        msg.seek(1);

        let answer = match query {
            Command::Control => Answer::Control {
                angle: msg.get_int16(),
                moment: msg.get_int16(),
            },
            Command::Info => Answer::Info {
                values: [msg.get_int16(), msg.get_int16(), msg.get_int16()],
            },
            Command::Write => Answer::Write {
                value: msg.get_int32(),
            },
            Command::Read => Answer::Read {
                value: msg.get_int32(),
            },
            Command::Flash => {
                let packed = msg.get_uint8();
                Answer::Flash {
                    status: (packed >> 4) & 0x07,
                    id: packed & 0x0F,
                    value: msg.get_uint32(),
                }
            }
        };
        trace!(?answer, length, "decoded answer");
        Ok(answer)
    }
}
