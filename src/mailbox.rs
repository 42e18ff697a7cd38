//! # VideoCore Mailbox Driver
//!
//! Communicates with the VideoCore GPU via the mailbox property interface.
//! Used to negotiate the framebuffer and to query firmware information.
//!
//! ## Protocol
//!
//! The ARM side writes the bus address of a 16-byte aligned property buffer
//! (low nibble = channel) into mailbox 1, then waits for the same value to
//! come back through mailbox 0. Firmware rewrites the buffer in place and
//! sets word 1 to `0x8000_0000` on success.
//!
//! All polling is bounded: an unresponsive firmware turns into
//! [`MailboxError::Timeout`] instead of a hang.
//!
//! ## Reference
//! - https://github.com/raspberrypi/firmware/wiki/Mailbox-property-interface

use core::cell::UnsafeCell;
use core::ptr::{read_volatile, write_volatile};
use core::sync::atomic::{fence, Ordering};

use log::{debug, trace};
use spin::Mutex;

use crate::mmio::{Mmio, RegisterBus};

/// Mailbox register offsets from base
pub(crate) const MAILBOX_READ: usize = 0x00;
pub(crate) const MAILBOX_STATUS: usize = 0x18;
pub(crate) const MAILBOX_WRITE: usize = 0x20;
pub(crate) const MAILBOX_WRITE_STATUS: usize = 0x38;

/// Status register bits
pub(crate) const MAILBOX_FULL: u32 = 0x8000_0000;
pub(crate) const MAILBOX_EMPTY: u32 = 0x4000_0000;

/// Property tags channel (ARM to VideoCore)
pub const CHANNEL_PROPERTY: u8 = 8;

/// Property buffer request/response codes
pub const REQUEST_CODE: u32 = 0x0000_0000;
pub const RESPONSE_SUCCESS: u32 = 0x8000_0000;
pub const RESPONSE_ERROR: u32 = 0x8000_0001;

/// Set in a tag's third word once firmware has answered that tag
pub const TAG_RESPONSE: u32 = 0x8000_0000;

/// Default number of status polls before giving up
pub const DEFAULT_SPIN_LIMIT: u32 = 1_000_000;

/// Size of the shared property buffer in 32-bit words
pub const PROPERTY_BUFFER_WORDS: usize = 36;

/// Property tags
pub mod tags {
    pub const END: u32 = 0x0000_0000;

    pub const GET_FIRMWARE_REV: u32 = 0x0000_0001;
    pub const GET_BOARD_REVISION: u32 = 0x0001_0002;

    pub const ALLOCATE_BUFFER: u32 = 0x0004_0001;
    pub const GET_PITCH: u32 = 0x0004_0008;
    pub const SET_PHYSICAL_SIZE: u32 = 0x0004_8003;
    pub const SET_VIRTUAL_SIZE: u32 = 0x0004_8004;
    pub const SET_DEPTH: u32 = 0x0004_8005;
    pub const SET_PIXEL_ORDER: u32 = 0x0004_8006;
    pub const SET_VIRTUAL_OFFSET: u32 = 0x0004_8009;
}

/// Mailbox communication errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    /// Status flag never changed within the spin limit
    #[error("mailbox timed out waiting for firmware")]
    Timeout,
    /// Firmware answered, but did not acknowledge the request
    #[error("mailbox request failed with response code {code:#010x}")]
    RequestFailed { code: u32 },
    /// Buffer was acknowledged but a required tag was left unanswered
    #[error("firmware did not answer tag {tag:#010x}")]
    TagNotAcknowledged { tag: u32 },
}

/// 16-byte aligned request/response buffer shared with the GPU.
///
/// Firmware rewrites the words behind the compiler's back, so every access
/// goes through volatile loads and stores.
///
/// The only instance outside this crate is [`PROPERTY_BUFFER`]; callers
/// lock it for the whole exchange and cannot build their own:
///
/// ```compile_fail
/// let buffer = libredash::PropertyBuffer::new();
/// ```
///
/// ```
/// let buffer = libredash::PROPERTY_BUFFER.lock();
/// assert_eq!(buffer.as_ptr() as usize % 16, 0);
/// ```
#[repr(C, align(16))]
pub struct PropertyBuffer {
    words: UnsafeCell<[u32; PROPERTY_BUFFER_WORDS]>,
}

/// The one property buffer the firmware talks to.
///
/// Holding the lock serializes the whole mailbox exchange.
pub static PROPERTY_BUFFER: Mutex<PropertyBuffer> = Mutex::new(PropertyBuffer::new());

impl PropertyBuffer {
    /// Create a zeroed buffer
    pub(crate) const fn new() -> Self {
        Self {
            words: UnsafeCell::new([0; PROPERTY_BUFFER_WORDS]),
        }
    }

    /// Number of words in the buffer
    pub const fn len(&self) -> usize {
        PROPERTY_BUFFER_WORDS
    }

    /// Read word `index`
    #[inline]
    pub fn get(&self, index: usize) -> u32 {
        unsafe { read_volatile(&(*self.words.get())[index]) }
    }

    /// Write word `index`
    #[inline]
    pub fn set(&self, index: usize, value: u32) {
        unsafe { write_volatile(&mut (*self.words.get())[index], value) }
    }

    /// Zero every word
    pub fn clear(&self) {
        for i in 0..PROPERTY_BUFFER_WORDS {
            self.set(i, 0);
        }
    }

    /// Raw pointer to the first word (what the GPU is handed)
    pub fn as_ptr(&self) -> *mut u32 {
        self.words.get() as *mut u32
    }

    /// Address of the buffer as seen from the GPU bus
    pub fn bus_address(&self) -> u32 {
        crate::arm_to_gpu(self.as_ptr() as usize)
    }

    /// Whether firmware marked the tag starting at `tag_index` as answered
    pub fn tag_acknowledged(&self, tag_index: usize) -> bool {
        self.get(tag_index + 2) & TAG_RESPONSE != 0
    }
}

/// Sequential writer for a property message.
///
/// Each tag is laid out as `id, value buffer size, request length, values`
/// and the message is closed with the end tag.
pub struct Message<'a> {
    buffer: &'a PropertyBuffer,
    cursor: usize,
}

impl<'a> Message<'a> {
    /// Start a new request in `buffer`, discarding its previous contents
    pub fn begin(buffer: &'a PropertyBuffer) -> Self {
        buffer.clear();
        buffer.set(1, REQUEST_CODE);
        Self { buffer, cursor: 2 }
    }

    /// Append a tag and return the index of its header word.
    ///
    /// `value_words` reserves room for the response; `request` fills the
    /// leading value words, the rest stay zero.
    pub fn tag(&mut self, id: u32, value_words: usize, request: &[u32]) -> usize {
        debug_assert!(request.len() <= value_words);
        let header = self.cursor;

        self.buffer.set(header, id);
        self.buffer.set(header + 1, (value_words * 4) as u32);
        self.buffer.set(header + 2, (request.len() * 4) as u32);
        for (i, &word) in request.iter().enumerate() {
            self.buffer.set(header + 3 + i, word);
        }

        self.cursor = header + 3 + value_words;
        header
    }

    /// Write the end tag and the total size; returns the size in bytes
    pub fn finish(self) -> u32 {
        self.buffer.set(self.cursor, tags::END);
        let size = ((self.cursor + 1) * 4) as u32;
        self.buffer.set(0, size);
        size
    }
}

/// Mailbox driver for VideoCore communication
pub struct Mailbox<B: RegisterBus = Mmio> {
    bus: B,
    base: usize,
    spin_limit: u32,
}

impl<B: RegisterBus> Mailbox<B> {
    /// Create a mailbox driver for the registers at `base`
    pub fn new(bus: B, base: usize) -> Self {
        Self {
            bus,
            base,
            spin_limit: DEFAULT_SPIN_LIMIT,
        }
    }

    /// Override how many status polls a single wait may take
    pub fn with_spin_limit(mut self, spin_limit: u32) -> Self {
        self.spin_limit = spin_limit;
        self
    }

    pub fn spin_limit(&self) -> u32 {
        self.spin_limit
    }

    #[inline]
    fn read_reg(&self, offset: usize) -> u32 {
        self.bus.read(self.base + offset)
    }

    #[inline]
    fn write_reg(&self, offset: usize, value: u32) {
        self.bus.write(self.base + offset, value)
    }

    /// Poll `status` until `flag` clears or the spin limit runs out
    fn wait_while(&self, status: usize, flag: u32) -> Result<(), MailboxError> {
        let mut remaining = self.spin_limit;
        while self.read_reg(status) & flag != 0 {
            if remaining == 0 {
                return Err(MailboxError::Timeout);
            }
            remaining -= 1;
            core::hint::spin_loop();
        }
        Ok(())
    }

    /// Send the message in `buffer` on `channel` and wait for the answer.
    ///
    /// Responses carrying a different buffer/channel word are discarded.
    pub fn call(&self, buffer: &PropertyBuffer, channel: u8) -> Result<(), MailboxError> {
        let message = (buffer.bus_address() & !0xF) | (channel as u32 & 0xF);
        debug!("mailbox call {:#010x} ({} bytes)", message, buffer.get(0));

        // Buffer contents must be visible before the GPU is told about them
        fence(Ordering::SeqCst);

        self.wait_while(MAILBOX_WRITE_STATUS, MAILBOX_FULL)?;
        self.write_reg(MAILBOX_WRITE, message);

        let mut discards = self.spin_limit;
        loop {
            self.wait_while(MAILBOX_STATUS, MAILBOX_EMPTY)?;

            let response = self.read_reg(MAILBOX_READ);
            if response == message {
                break;
            }

            trace!("discarding mailbox response {:#010x}", response);
            if discards == 0 {
                return Err(MailboxError::Timeout);
            }
            discards -= 1;
        }

        fence(Ordering::SeqCst);

        match buffer.get(1) {
            RESPONSE_SUCCESS => Ok(()),
            code => Err(MailboxError::RequestFailed { code }),
        }
    }

    /// Issue a single-tag query with one response word
    fn query_word(&self, buffer: &PropertyBuffer, tag: u32) -> Result<u32, MailboxError> {
        let mut msg = Message::begin(buffer);
        let header = msg.tag(tag, 1, &[]);
        msg.finish();

        self.call(buffer, CHANNEL_PROPERTY)?;

        if !buffer.tag_acknowledged(header) {
            return Err(MailboxError::TagNotAcknowledged { tag });
        }
        Ok(buffer.get(header + 3))
    }

    /// Get firmware revision
    pub fn firmware_revision(&self, buffer: &PropertyBuffer) -> Result<u32, MailboxError> {
        self.query_word(buffer, tags::GET_FIRMWARE_REV)
    }

    /// Get board revision code
    pub fn board_revision(&self, buffer: &PropertyBuffer) -> Result<u32, MailboxError> {
        self.query_word(buffer, tags::GET_BOARD_REVISION)
    }
}
