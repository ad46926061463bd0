use thiserror::Error;

use crate::sprite::SpriteKey;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid atlas dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(
        "Sprite '{name}' ({width}x{height}) does not fit an empty {max_width}x{max_height} atlas"
    )]
    SpriteTooLarge {
        name: String,
        width: i32,
        height: i32,
        max_width: u32,
        max_height: u32,
    },
    #[error("Sprite '{name}' has no visible pixels after trimming")]
    EmptySprite { name: String },
    #[error("Placement references unknown sprite {0}")]
    UnknownSprite(SpriteKey),
    #[error("Nothing to pack")]
    Empty,
}

pub type Result<T> = std::result::Result<T, PackError>;
