use super::raster::FrameTarget;
use crate::app::KeyDisplay;

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
const TEXT_SCALE: i32 = 4;
const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;
const KEY_PADDING: i32 = 3 * TEXT_SCALE;
const KEY_PANEL_COLOR: [u8; 4] = [245, 245, 245, 255];

type Glyph = [u8; GLYPH_HEIGHT as usize];

const BLANK: Glyph = [0; 5];

// Rows top to bottom, bit 2 is the leftmost column.
#[rustfmt::skip]
const LETTERS: [Glyph; 26] = [
    [0b010, 0b101, 0b111, 0b101, 0b101], // A
    [0b110, 0b101, 0b110, 0b101, 0b110], // B
    [0b011, 0b100, 0b100, 0b100, 0b011], // C
    [0b110, 0b101, 0b101, 0b101, 0b110], // D
    [0b111, 0b100, 0b110, 0b100, 0b111], // E
    [0b111, 0b100, 0b110, 0b100, 0b100], // F
    [0b011, 0b100, 0b101, 0b101, 0b011], // G
    [0b101, 0b101, 0b111, 0b101, 0b101], // H
    [0b111, 0b010, 0b010, 0b010, 0b111], // I
    [0b001, 0b001, 0b001, 0b101, 0b010], // J
    [0b101, 0b101, 0b110, 0b101, 0b101], // K
    [0b100, 0b100, 0b100, 0b100, 0b111], // L
    [0b101, 0b111, 0b111, 0b101, 0b101], // M
    [0b110, 0b101, 0b101, 0b101, 0b101], // N
    [0b010, 0b101, 0b101, 0b101, 0b010], // O
    [0b110, 0b101, 0b110, 0b100, 0b100], // P
    [0b010, 0b101, 0b101, 0b110, 0b011], // Q
    [0b110, 0b101, 0b110, 0b101, 0b101], // R
    [0b011, 0b100, 0b010, 0b001, 0b110], // S
    [0b111, 0b010, 0b010, 0b010, 0b010], // T
    [0b101, 0b101, 0b101, 0b101, 0b111], // U
    [0b101, 0b101, 0b101, 0b101, 0b010], // V
    [0b101, 0b101, 0b111, 0b111, 0b101], // W
    [0b101, 0b101, 0b010, 0b101, 0b101], // X
    [0b101, 0b101, 0b010, 0b010, 0b010], // Y
    [0b111, 0b001, 0b010, 0b100, 0b111], // Z
];

fn glyph_for(ch: char) -> Glyph {
    let upper = ch.to_ascii_uppercase();
    if upper.is_ascii_uppercase() {
        LETTERS[(upper as u8 - b'A') as usize]
    } else {
        BLANK
    }
}

pub(crate) fn text_width_px(text: &str) -> i32 {
    let chars = text.chars().count() as i32;
    if chars == 0 {
        0
    } else {
        chars * GLYPH_ADVANCE - TEXT_SCALE
    }
}

pub(crate) fn draw_text(
    target: &mut FrameTarget<'_>,
    mut x: i32,
    y: i32,
    text: &str,
    color: [u8; 4],
) {
    for ch in text.chars() {
        let glyph = glyph_for(ch);
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                target.fill_rect(
                    x + col * TEXT_SCALE,
                    y + row as i32 * TEXT_SCALE,
                    TEXT_SCALE,
                    TEXT_SCALE,
                    color,
                );
            }
        }
        x += GLYPH_ADVANCE;
    }
}

/// Each key is a light panel anchored at its top-left position, with the
/// label and border drawn in the key's up/down color.
pub(crate) fn draw_key_display(target: &mut FrameTarget<'_>, display: &KeyDisplay) {
    for entry in display.entries() {
        let label = entry.key.label();
        let panel_width = text_width_px(label) + KEY_PADDING * 2;
        let panel_height = GLYPH_HEIGHT * TEXT_SCALE + KEY_PADDING * 2;
        let color = entry.color();

        target.fill_rect(entry.left_px, entry.top_px, panel_width, panel_height, KEY_PANEL_COLOR);
        target.rect_outline(entry.left_px, entry.top_px, panel_width, panel_height, color);
        draw_text(
            target,
            entry.left_px + KEY_PADDING,
            entry.top_px + KEY_PADDING,
            label,
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::key_display::{DisplayKey, KEY_DOWN_COLOR, KEY_UP_COLOR};
    use crate::app::Viewport;

    #[test]
    fn unknown_characters_render_blank() {
        assert_eq!(glyph_for('?'), BLANK);
        assert_eq!(glyph_for('w'), glyph_for('W'));
        assert_eq!(text_width_px("SHIFT"), 5 * GLYPH_ADVANCE - TEXT_SCALE);
        assert_eq!(text_width_px(""), 0);
    }

    #[test]
    fn key_panels_use_down_and_up_colors() {
        let viewport = Viewport {
            width: 640,
            height: 360,
        };
        let mut frame = vec![0; viewport.pixel_count() * 4];
        let mut depth = vec![f32::INFINITY; viewport.pixel_count()];
        let mut target = FrameTarget::new(&mut frame, &mut depth, viewport);

        let mut display = KeyDisplay::new(viewport.width, viewport.height);
        display.down(DisplayKey::W);
        draw_key_display(&mut target, &display);

        // Top-left corner of each panel is on its border.
        assert_eq!(target.pixel(300, 360 - 150), KEY_DOWN_COLOR);
        assert_eq!(target.pixel(200, 360 - 100), KEY_UP_COLOR);
        assert_eq!(target.pixel(50, 360 - 100), KEY_UP_COLOR);
        // Just inside the border is panel fill.
        assert_eq!(target.pixel(401, 360 - 99), KEY_PANEL_COLOR);
    }
}
