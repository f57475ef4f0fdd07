//! Conversion groups

use super::AdcDriver;
use crate::error::AdcError;

/// Called when a half or the whole of the sample buffer is filled
///
/// Use [`AdcDriver::is_buffer_complete`] to tell the two apart.
pub type EndCallback = fn(&AdcDriver<'_>);

/// Called when the conversion stops on an error
pub type ErrorCallback = fn(&AdcDriver<'_>, AdcError);

/// A sequence of ordinary conversions
///
/// The register fields are written as-is when the conversion starts. The
/// driver adds the bits it needs: the sequence length in `osq1`, the overflow
/// interrupt in `ctrl1`, and the DMA, repeat and enable bits in `ctrl2`.
/// Set `CTRL2.OCSWTRG` in `ctrl2` to start with a software trigger.
///
/// Groups are usually constants.
///
/// ```
/// use at32_lld::adc::ConversionGroup;
///
/// // Channel 0, then channel 1, software triggered.
/// const PAIR: ConversionGroup = ConversionGroup {
///     circular: true,
///     osq3: 1 << 5,
///     ctrl2: 1 << 30,
///     ..ConversionGroup::new(2)
/// };
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConversionGroup {
    /// Restart from the top of the buffer when it's full
    pub circular: bool,
    /// Conversions in the sequence, 1 to 16
    pub num_channels: u8,
    pub end_cb: Option<EndCallback>,
    pub error_cb: Option<ErrorCallback>,
    pub ctrl1: u32,
    pub ctrl2: u32,
    /// Sample times, channels 10 to 18
    pub spt1: u32,
    /// Sample times, channels 0 to 9
    pub spt2: u32,
    /// Watchdog high threshold
    pub vmhb: u32,
    /// Watchdog low threshold
    pub vmlb: u32,
    /// Sequence positions 13 to 16
    pub osq1: u32,
    /// Sequence positions 7 to 12
    pub osq2: u32,
    /// Sequence positions 1 to 6
    pub osq3: u32,
}

impl ConversionGroup {
    /// The longest sequence
    pub const MAX_CHANNELS: u8 = 16;

    /// A one-shot group of `num_channels` conversions, without callbacks
    ///
    /// Every register field is zero.
    pub const fn new(num_channels: u8) -> Self {
        ConversionGroup {
            circular: false,
            num_channels,
            end_cb: None,
            error_cb: None,
            ctrl1: 0,
            ctrl2: 0,
            spt1: 0,
            spt2: 0,
            vmhb: 0,
            vmlb: 0,
            osq1: 0,
            osq2: 0,
            osq3: 0,
        }
    }

    /// Returns the number of samples for `depth` sequences
    pub const fn samples(&self, depth: usize) -> usize {
        self.num_channels as usize * depth
    }

    /// Returns the samples before the half-transfer point
    pub(crate) const fn half(&self, depth: usize) -> usize {
        self.num_channels as usize * (depth / 2)
    }

    /// Returns `true` if the group wants half-buffer notifications
    pub(crate) const fn streams_halves(&self, depth: usize) -> bool {
        self.circular && depth > 1
    }
}
