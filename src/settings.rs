//! Persisted device settings. The EEPROM holds a flat layout of named
//! byte offsets guarded by a version word; a version mismatch on load
//! rewrites the whole block with defaults, which doubles as first-boot
//! initialization.

use crate::{Eeprom, LedColor};

const SETTINGS_VERSION: u16 = 3;

const VERSION_ADDRESS: u16 = 0x0000;
const CONTRAST_ADDRESS: u16 = 0x0002;
const BRIGHTNESS_ADDRESS: u16 = 0x0003;
const LED_BRIGHTNESS_ADDRESS: u16 = 0x0004;
const CLICK_LIST_ADDRESS: u16 = 0x0005;
const DEFAULT_TOOL_ADDRESS: u16 = 0x0006;
const SHIFT_ITEMS_ADDRESS: u16 = 0x0007;
const LED_COLORS_ADDRESS: u16 = 0x000a;

const DEFAULT_CONTRAST: u8 = 127;
const DEFAULT_BRIGHTNESS: u8 = 2;
const DEFAULT_LED_BRIGHTNESS: u8 = 50;

const SHIFT_ITEM_COUNT: usize = 3;
const LED_COLOR_SLOTS: usize = 7;

/// In-memory copy of the persisted block. Mutations go through the
/// setters so the EEPROM never drifts from what the UI shows.
pub struct Settings<E> {
    eeprom: E,
    pub display_contrast: u8,
    pub display_brightness: u8,
    pub led_brightness: u8,
    pub click_list_behavior: u8,
    pub default_tool: u8,
    pub shift_items: [u8; SHIFT_ITEM_COUNT],
    pub led_colors: [LedColor; LED_COLOR_SLOTS],
}

fn color_from_code(code: u8) -> LedColor {
    match code {
        0 => LedColor::White,
        1 => LedColor::Red,
        2 => LedColor::Green,
        3 => LedColor::Blue,
        4 => LedColor::Yellow,
        5 => LedColor::Cyan,
        6 => LedColor::Magenta,
        _ => LedColor::Amber,
    }
}

fn color_to_code(color: LedColor) -> u8 {
    match color {
        LedColor::White => 0,
        LedColor::Red => 1,
        LedColor::Green => 2,
        LedColor::Blue => 3,
        LedColor::Yellow => 4,
        LedColor::Cyan => 5,
        LedColor::Magenta => 6,
        LedColor::Amber => 7,
    }
}

impl<E: Eeprom> Settings<E> {
    /// Reads the stored block, migrating to defaults when the version
    /// word does not match.
    pub fn load(mut eeprom: E) -> Settings<E> {
        let mut word = [0u8; 2];
        eeprom.read(VERSION_ADDRESS, &mut word);
        let version = u16::from_le_bytes(word);

        let mut settings = Settings {
            eeprom,
            display_contrast: DEFAULT_CONTRAST,
            display_brightness: DEFAULT_BRIGHTNESS,
            led_brightness: DEFAULT_LED_BRIGHTNESS,
            click_list_behavior: 0,
            default_tool: 0,
            shift_items: [0, 1, 2],
            led_colors: [LedColor::White; LED_COLOR_SLOTS],
        };

        if version == SETTINGS_VERSION {
            settings.read_all();
        } else {
            settings.write_all();
        }
        settings
    }

    fn read_all(&mut self) {
        let mut byte = [0u8; 1];
        self.eeprom.read(CONTRAST_ADDRESS, &mut byte);
        self.display_contrast = byte[0];
        self.eeprom.read(BRIGHTNESS_ADDRESS, &mut byte);
        self.display_brightness = byte[0];
        self.eeprom.read(LED_BRIGHTNESS_ADDRESS, &mut byte);
        self.led_brightness = byte[0];
        self.eeprom.read(CLICK_LIST_ADDRESS, &mut byte);
        self.click_list_behavior = byte[0];
        self.eeprom.read(DEFAULT_TOOL_ADDRESS, &mut byte);
        self.default_tool = byte[0];

        let mut items = [0u8; SHIFT_ITEM_COUNT];
        self.eeprom.read(SHIFT_ITEMS_ADDRESS, &mut items);
        self.shift_items = items;

        let mut colors = [0u8; LED_COLOR_SLOTS];
        self.eeprom.read(LED_COLORS_ADDRESS, &mut colors);
        for (slot, code) in colors.iter().enumerate() {
            self.led_colors[slot] = color_from_code(*code);
        }
    }

    fn write_all(&mut self) {
        self.eeprom
            .write(VERSION_ADDRESS, &SETTINGS_VERSION.to_le_bytes());
        self.eeprom.write(CONTRAST_ADDRESS, &[self.display_contrast]);
        self.eeprom
            .write(BRIGHTNESS_ADDRESS, &[self.display_brightness]);
        self.eeprom
            .write(LED_BRIGHTNESS_ADDRESS, &[self.led_brightness]);
        self.eeprom
            .write(CLICK_LIST_ADDRESS, &[self.click_list_behavior]);
        self.eeprom.write(DEFAULT_TOOL_ADDRESS, &[self.default_tool]);
        self.eeprom.write(SHIFT_ITEMS_ADDRESS, &self.shift_items);

        let mut colors = [0u8; LED_COLOR_SLOTS];
        for (slot, code) in colors.iter_mut().enumerate() {
            *code = color_to_code(self.led_colors[slot]);
        }
        self.eeprom.write(LED_COLORS_ADDRESS, &colors);
    }

    pub fn set_display_contrast(&mut self, contrast: u8) {
        self.display_contrast = contrast;
        self.eeprom.write(CONTRAST_ADDRESS, &[contrast]);
    }

    pub fn set_display_brightness(&mut self, brightness: u8) {
        self.display_brightness = brightness;
        self.eeprom.write(BRIGHTNESS_ADDRESS, &[brightness]);
    }

    pub fn set_led_brightness(&mut self, brightness: u8) {
        self.led_brightness = brightness;
        self.eeprom.write(LED_BRIGHTNESS_ADDRESS, &[brightness]);
    }

    pub fn set_click_list_behavior(&mut self, behavior: u8) {
        self.click_list_behavior = behavior;
        self.eeprom.write(CLICK_LIST_ADDRESS, &[behavior]);
    }

    pub fn set_default_tool(&mut self, tool: u8) {
        self.default_tool = tool;
        self.eeprom.write(DEFAULT_TOOL_ADDRESS, &[tool]);
    }

    pub fn set_shift_item(&mut self, slot: usize, item: u8) {
        if slot >= SHIFT_ITEM_COUNT {
            return;
        }
        self.shift_items[slot] = item;
        self.eeprom.write(SHIFT_ITEMS_ADDRESS, &self.shift_items);
    }

    pub fn set_led_color(&mut self, slot: usize, color: LedColor) {
        if slot >= LED_COLOR_SLOTS {
            return;
        }
        self.led_colors[slot] = color;
        let mut colors = [0u8; LED_COLOR_SLOTS];
        for (i, code) in colors.iter_mut().enumerate() {
            *code = color_to_code(self.led_colors[i]);
        }
        self.eeprom.write(LED_COLORS_ADDRESS, &colors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemoryEeprom {
        bytes: [u8; 64],
        writes: usize,
    }

    impl MemoryEeprom {
        fn blank() -> MemoryEeprom {
            MemoryEeprom {
                bytes: [0xff; 64],
                writes: 0,
            }
        }
    }

    impl Eeprom for MemoryEeprom {
        fn read(&mut self, address: u16, buffer: &mut [u8]) {
            let start = address as usize;
            buffer.copy_from_slice(&self.bytes[start..start + buffer.len()]);
        }

        fn write(&mut self, address: u16, data: &[u8]) {
            let start = address as usize;
            self.bytes[start..start + data.len()].copy_from_slice(data);
            self.writes += 1;
        }
    }

    #[test]
    fn blank_eeprom_should_migrate_to_defaults() {
        let settings = Settings::load(MemoryEeprom::blank());
        assert_eq!(DEFAULT_CONTRAST, settings.display_contrast);
        assert_eq!(
            SETTINGS_VERSION,
            u16::from_le_bytes([settings.eeprom.bytes[0], settings.eeprom.bytes[1]])
        );
    }

    #[test]
    fn stored_values_should_survive_a_reload() {
        let mut settings = Settings::load(MemoryEeprom::blank());
        settings.set_display_contrast(200);
        settings.set_default_tool(2);
        settings.set_led_color(3, LedColor::Magenta);

        let eeprom = MemoryEeprom {
            bytes: settings.eeprom.bytes,
            writes: 0,
        };
        let reloaded = Settings::load(eeprom);
        assert_eq!(200, reloaded.display_contrast);
        assert_eq!(2, reloaded.default_tool);
        assert_eq!(LedColor::Magenta, reloaded.led_colors[3]);
        assert_eq!(0, reloaded.eeprom.writes);
    }

    #[test]
    fn version_mismatch_should_rewrite_the_block() {
        let mut eeprom = MemoryEeprom::blank();
        eeprom.bytes[0] = 0x01;
        eeprom.bytes[1] = 0x00;
        eeprom.bytes[CONTRAST_ADDRESS as usize] = 33;

        let settings = Settings::load(eeprom);
        assert_eq!(DEFAULT_CONTRAST, settings.display_contrast);
        assert!(settings.eeprom.writes > 0);
    }
}
