//! DMA request sources
//!
//! A request source is the peripheral signal that paces a DMA stream. On
//! devices with a request multiplexer, any stream can serve any source; see
//! [`Stream::bind`](crate::Stream::bind).

/// A DMAMUX request source
///
/// The discriminant is the value written to the multiplexer's request
/// selection field. Gaps in the numbering are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Request {
    ReqGen0 = 1,
    ReqGen1 = 2,
    ReqGen2 = 3,
    ReqGen3 = 4,
    Adc1 = 5,
    Dac1Ch1 = 6,
    Tim6Up = 8,
    Tim7Up = 9,
    Spi1Rx = 10,
    Spi1Tx = 11,
    Spi2Rx = 12,
    Spi2Tx = 13,
    Spi3Rx = 14,
    Spi3Tx = 15,
    I2c1Rx = 16,
    I2c1Tx = 17,
    I2c2Rx = 18,
    I2c2Tx = 19,
    I2c3Rx = 20,
    I2c3Tx = 21,
    Usart1Rx = 24,
    Usart1Tx = 25,
    Usart2Rx = 26,
    Usart2Tx = 27,
    Usart3Rx = 28,
    Usart3Tx = 29,
    Uart4Rx = 30,
    Uart4Tx = 31,
    Uart5Rx = 32,
    Uart5Tx = 33,
    Adc2 = 36,
    Adc3 = 37,
    Sdio1 = 39,
    Qspi1 = 40,
    Dac2 = 41,
    Tim1Ch1 = 42,
    Tim1Ch2 = 43,
    Tim1Ch3 = 44,
    Tim1Ch4 = 45,
    Tim1Up = 46,
    Tim1Trig = 47,
    Tim1Com = 48,
    Tim8Ch1 = 49,
    Tim8Ch2 = 50,
    Tim8Ch3 = 51,
    Tim8Ch4 = 52,
    Tim8Up = 53,
    Tim8Trig = 54,
    Tim8Com = 55,
    Tim2Ch1 = 56,
    Tim2Ch2 = 57,
    Tim2Ch3 = 58,
    Tim2Ch4 = 59,
    Tim2Up = 60,
    Tim3Ch1 = 61,
    Tim3Ch2 = 62,
    Tim3Ch3 = 63,
    Tim3Ch4 = 64,
    Tim3Up = 65,
    Tim3Trig = 66,
    Tim4Ch1 = 67,
    Tim4Ch2 = 68,
    Tim4Ch3 = 69,
    Tim4Ch4 = 70,
    Tim4Up = 71,
    Tim5Ch1 = 72,
    Tim5Ch2 = 73,
    Tim5Ch3 = 74,
    Tim5Ch4 = 75,
    Tim5Up = 76,
    Tim20Ch1 = 86,
    Tim20Ch2 = 87,
    Tim20Ch3 = 88,
    Tim20Ch4 = 89,
    Tim20Up = 90,
    Tim20Trig = 93,
    Tim20Com = 94,
    Sdio2 = 103,
    Qspi2 = 104,
    Dvp = 105,
    Spi4Rx = 106,
    Spi4Tx = 107,
    /// Also paces SAI3 receive
    Sai2Rx = 110,
    /// Also paces SAI3 transmit
    Sai2Tx = 111,
    Usart6Rx = 112,
    Usart6Tx = 113,
    Uart7Rx = 114,
    Uart7Tx = 115,
    Uart8Rx = 116,
    Uart8Tx = 117,
    Tim2Trig = 126,
}

impl Request {
    /// The raw request selection value
    pub const fn raw(self) -> u32 {
        self as u32
    }
}
