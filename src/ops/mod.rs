pub mod brush;
pub mod fill;
pub mod sticker;
