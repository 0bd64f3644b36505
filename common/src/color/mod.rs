mod rgb;

pub use self::rgb::SRgb;

pub type Color = SRgb<u8>;

/// Colors cycled through by layer index when tagging slices.
pub const PALETTE: [Color; 10] = [
    Color::from_hex(0xff0000), // red
    Color::from_hex(0x00ff00), // green
    Color::from_hex(0x0000ff), // blue
    Color::from_hex(0xffff00), // yellow
    Color::from_hex(0xff00ff), // magenta
    Color::from_hex(0x00ffff), // cyan
    Color::from_hex(0xffffff), // white
    Color::from_hex(0x000000), // black
    Color::from_hex(0x800000), // maroon
    Color::from_hex(0x808000), // olive
];

/// Color of the slice at `layer`, cycling through [`PALETTE`].
pub fn slice_color(layer: usize) -> Color {
    palette_color(&PALETTE, layer)
}

/// Same as [`slice_color`] but over a caller supplied palette. An empty
/// palette falls back to the default one.
pub fn palette_color(palette: &[Color], layer: usize) -> Color {
    if palette.is_empty() {
        return slice_color(layer);
    }

    palette[layer % palette.len()]
}
