//! DMA elements

/// The size of one element moved by a DMA transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// 8 bits
    Byte,
    /// 16 bits
    HalfWord,
    /// 32 bits
    Word,
}

impl Width {
    /// The `PSIZE` / `MSIZE` encoding, shared by both controllers
    pub(crate) const fn raw(self) -> u32 {
        match self {
            Width::Byte => 0,
            Width::HalfWord => 1,
            Width::Word => 2,
        }
    }
}

mod private {
    pub trait Sealed {}
}

/// An element that the DMA controller can move in a single transfer
///
/// This trait is sealed. It's implemented for the primitive integers that
/// fit into a peripheral data register.
pub trait Element: Copy + private::Sealed {
    /// The transfer width for this element
    const WIDTH: Width;
}

macro_rules! element {
    ($($ty:ty => $width:expr),* $(,)?) => {
        $(
            impl private::Sealed for $ty {}
            impl Element for $ty {
                const WIDTH: Width = $width;
            }
        )*
    };
}

element! {
    u8 => Width::Byte,
    i8 => Width::Byte,
    u16 => Width::HalfWord,
    i16 => Width::HalfWord,
    u32 => Width::Word,
    i32 => Width::Word,
}
