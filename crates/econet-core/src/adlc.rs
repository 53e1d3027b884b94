//! Link controller register interface.
//!
//! The ADLC exposes two readable status registers, four control registers
//! and a shared FIFO. Which physical register a control write lands in is
//! selected by address lines and the CR1 `AC` bit on real hardware; the
//! [`Adlc`] trait hides that behind logical register names so the engine
//! never deals with address decoding.
//!
//! Implementations must be usable from a single thread only. The engine is
//! the sole caller.

use bitflags::bitflags;

/// Readable registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadRegister {
    /// Status register 1
    Status1,
    /// Status register 2
    Status2,
    /// Receive FIFO
    Fifo,
}

/// Writable registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteRegister {
    /// Control register 1
    Control1,
    /// Control register 2
    Control2,
    /// Control register 3
    Control3,
    /// Control register 4
    Control4,
    /// Transmit FIFO
    Fifo,
}

/// Byte-wide access to a link controller.
///
/// Reads of the FIFO consume a byte; reads of status registers have no side
/// effects. `irq` reports the level of the controller's interrupt line.
pub trait Adlc: Send {
    /// Read a register.
    fn read(&mut self, register: ReadRegister) -> u8;

    /// Write a register.
    fn write(&mut self, register: WriteRegister, value: u8);

    /// Pulse the controller's hardware reset line.
    fn reset(&mut self);

    /// Whether the interrupt line is asserted.
    fn irq(&mut self) -> bool;

    /// Read and decode status register 1.
    fn status1(&mut self) -> Status1 {
        Status1::from_bits_retain(self.read(ReadRegister::Status1))
    }

    /// Read and decode status register 2.
    fn status2(&mut self) -> Status2 {
        Status2::from_bits_retain(self.read(ReadRegister::Status2))
    }

    /// Write control register 1.
    fn write_cr1(&mut self, value: Control1) {
        self.write(WriteRegister::Control1, value.bits());
    }

    /// Write control register 2.
    fn write_cr2(&mut self, value: Control2) {
        self.write(WriteRegister::Control2, value.bits());
    }

    /// Write control register 3.
    fn write_cr3(&mut self, value: Control3) {
        self.write(WriteRegister::Control3, value.bits());
    }

    /// Write control register 4.
    fn write_cr4(&mut self, value: Control4) {
        self.write(WriteRegister::Control4, value.bits());
    }
}

impl<A: Adlc + ?Sized> Adlc for Box<A> {
    fn read(&mut self, register: ReadRegister) -> u8 {
        (**self).read(register)
    }

    fn write(&mut self, register: WriteRegister, value: u8) {
        (**self).write(register, value);
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn irq(&mut self) -> bool {
        (**self).irq()
    }
}

bitflags! {
    /// Status register 1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status1: u8 {
        /// Receiver data available
        const RDA = 0x01;
        /// Status register 2 needs attention
        const S2_RD_REQ = 0x02;
        /// Receiver entered loop mode
        const LOOP = 0x04;
        /// Flag pattern detected
        const FLAG_DETECTED = 0x08;
        /// Clear-to-send line deasserted
        const NOT_CTS = 0x10;
        /// Transmitter underrun
        const TX_UNDERRUN = 0x20;
        /// Transmit FIFO ready for data / frame complete
        const TDRA = 0x40;
        /// Interrupt pending
        const IRQ = 0x80;
    }
}

impl Status1 {
    /// Alias of `TDRA`: after the last byte the same bit signals that the
    /// closing flag has gone out.
    pub const FRAME_COMPLETE: Self = Self::TDRA;
}

bitflags! {
    /// Status register 2.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status2: u8 {
        /// First byte of a frame (the address) is in the FIFO
        const ADDR_PRESENT = 0x01;
        /// Closing flag received with a good frame check sequence
        const FRAME_VALID = 0x02;
        /// Receiver has been idle
        const RX_IDLE = 0x04;
        /// Abort sequence received
        const RX_ABORT = 0x08;
        /// Frame check sequence error
        const FCS_ERROR = 0x10;
        /// Carrier lost
        const NOT_DCD = 0x20;
        /// Receive FIFO overrun
        const RX_OVERRUN = 0x40;
        /// Receiver data available
        const RDA = 0x80;
    }
}

impl Status2 {
    /// Any condition that ends or advances a frame read.
    pub const FRAME_EVENTS: Self = Self::FRAME_VALID
        .union(Self::RX_ABORT)
        .union(Self::FCS_ERROR)
        .union(Self::NOT_DCD)
        .union(Self::RX_OVERRUN)
        .union(Self::RDA);
}

bitflags! {
    /// Control register 1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Control1: u8 {
        /// Address control: selects CR3/CR4 on the shared address
        const AC = 0x01;
        /// Receive interrupt enable
        const RIE = 0x02;
        /// Transmit interrupt enable
        const TIE = 0x04;
        /// Receive data DMA mode
        const RDSR_MODE = 0x08;
        /// Transmit data DMA mode
        const TDSR_MODE = 0x10;
        /// Discontinue the frame being received
        const RX_FRAME_DISCONTINUE = 0x20;
        /// Hold the receiver in reset
        const RX_RESET = 0x40;
        /// Hold the transmitter in reset
        const TX_RESET = 0x80;
    }
}

bitflags! {
    /// Control register 2.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Control2: u8 {
        /// Prioritised status reporting
        const PRIO_STATUS = 0x01;
        /// Two-byte transfer mode
        const TWO_BYTE = 0x02;
        /// Idle with flags instead of marks between frames
        const FLAG_IDLE = 0x04;
        /// TDRA reports frame complete after the last byte
        const FRAME_COMPLETE = 0x08;
        /// Next FIFO write is the last byte of the frame
        const TX_LAST_DATA = 0x10;
        /// Clear receive status
        const CLEAR_RX_STATUS = 0x20;
        /// Clear transmit status
        const CLEAR_TX_STATUS = 0x40;
        /// Request to send
        const RTS = 0x80;
    }
}

bitflags! {
    /// Control register 3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Control3: u8 {
        /// Logical control field select
        const LCF_SELECT = 0x01;
        /// Extended control field select
        const ECF_SELECT = 0x02;
        /// Extended address mode
        const ADDRESS_EXTEND = 0x04;
        /// Idle with ones instead of flags
        const IDLE_TYPE = 0x08;
        /// Flag detect status enable
        const FLAG_DETECT = 0x10;
        /// Loop mode
        const LOOP_MODE = 0x20;
        /// Go active on poll
        const ACTIVE_ON_POLL = 0x40;
        /// Loop on-line control / DTR
        const LOOP_ONLINE_DTR = 0x80;
    }
}

bitflags! {
    /// Control register 4.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Control4: u8 {
        /// Interframe time fill control
        const INTERFRAME_CONTROL = 0x01;
        /// Transmit word length bit 0
        const TX_WORD_LEN_0 = 0x02;
        /// Transmit word length bit 1
        const TX_WORD_LEN_1 = 0x04;
        /// Receive word length bit 0
        const RX_WORD_LEN_0 = 0x08;
        /// Receive word length bit 1
        const RX_WORD_LEN_1 = 0x10;
        /// Abort the frame being transmitted
        const TX_ABORT = 0x20;
        /// Extended abort
        const ABORT_EXTEND = 0x40;
        /// NRZI encoding
        const NRZI = 0x80;
    }
}

impl Control4 {
    /// Eight-bit words in both directions.
    pub const EIGHT_BIT_WORDS: Self = Self::TX_WORD_LEN_0
        .union(Self::TX_WORD_LEN_1)
        .union(Self::RX_WORD_LEN_0)
        .union(Self::RX_WORD_LEN_1);
}
