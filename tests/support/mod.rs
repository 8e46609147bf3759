#![allow(dead_code)]

use std::path::Path;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, Rgba, RgbaImage};

pub fn ffmpeg_available() -> bool {
    gifloom::is_tool_on_path(Path::new("ffmpeg"))
}

/// `count` opaque frames, each a distinct flat colour.
pub fn solid_frames(count: u32, w: u32, h: u32) -> Vec<RgbaImage> {
    (0..count)
        .map(|i| {
            let v = ((i * 29) % 220) as u8;
            RgbaImage::from_pixel(w, h, Rgba([v, 40, 255 - v, 255]))
        })
        .collect()
}

pub fn gif_bytes(frames: &[RgbaImage], delay_ms: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut enc = GifEncoder::new(&mut buf);
        enc.set_repeat(Repeat::Infinite).unwrap();
        enc.encode_frames(
            frames
                .iter()
                .map(|f| Frame::from_parts(f.clone(), 0, 0, Delay::from_numer_denom_ms(delay_ms, 1))),
        )
        .unwrap();
    }
    buf
}

pub fn png_bytes(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img.clone())
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// GIF loops forever: NETSCAPE2.0 application extension with a zero loop count.
pub fn loops_forever(gif: &[u8]) -> bool {
    gif.windows(15).any(|w| w == b"NETSCAPE2.0\x03\x01\x00\x00")
}

/// Number of frames and logical screen size of an encoded GIF.
pub fn gif_shape(gif: &[u8]) -> (usize, u32, u32) {
    let src = gifloom::decode_animation("output", gif.to_vec()).unwrap();
    (src.frame_count() as usize, src.width(), src.height())
}
